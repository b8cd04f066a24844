//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is not negative
pub fn validate_non_negative_amount(amount: &BigDecimal) -> ReconciliationResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(ReconciliationError::Validation(
            "Amount cannot be negative".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an identifier is valid
pub fn validate_identifier(id: &str) -> ReconciliationResult<()> {
    if id.trim().is_empty() {
        return Err(ReconciliationError::Validation(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if id.len() > 64 {
        return Err(ReconciliationError::Validation(
            "Identifier cannot exceed 64 characters".to_string(),
        ));
    }

    // Check for valid characters (alphanumeric, dashes, underscores)
    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ReconciliationError::Validation(
            "Identifier can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate an ISO 4217 currency code
pub fn validate_currency_code(currency: &str) -> ReconciliationResult<()> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ReconciliationError::Validation(format!(
            "'{}' is not a valid ISO 4217 currency code",
            currency
        )));
    }

    Ok(())
}

/// Enhanced settlement validator with detailed checks
pub struct EnhancedSettlementValidator;

impl SettlementValidator for EnhancedSettlementValidator {
    fn validate_settlement(&self, settlement: &Settlement) -> ReconciliationResult<()> {
        validate_identifier(&settlement.id)?;
        validate_currency_code(&settlement.currency)?;

        if settlement.period_end < settlement.period_start {
            return Err(ReconciliationError::Validation(
                "Settlement period end cannot precede period start".to_string(),
            ));
        }

        if settlement.settlement_date < settlement.period_start {
            return Err(ReconciliationError::Validation(
                "Settlement cannot be dated before its period starts".to_string(),
            ));
        }

        for amount in [
            &settlement.total_amount,
            &settlement.order_amount,
            &settlement.refund_amount,
            &settlement.commission_amount,
            &settlement.shipping_fee,
            &settlement.other_fees,
            &settlement.tax_amount,
        ] {
            validate_non_negative_amount(amount)?;
        }

        Ok(())
    }
}

/// Enhanced line validator with detailed checks
pub struct EnhancedItemValidator;

impl ItemValidator for EnhancedItemValidator {
    fn validate_item(&self, item: &SettlementItem) -> ReconciliationResult<()> {
        validate_identifier(&item.id)?;
        validate_identifier(&item.settlement_id)?;

        if item.marketplace_order_id.trim().is_empty() {
            return Err(ReconciliationError::Validation(
                "Marketplace order ID cannot be empty".to_string(),
            ));
        }

        validate_non_negative_amount(&item.amount)?;
        validate_non_negative_amount(&item.commission_fee)?;
        validate_non_negative_amount(&item.shipping_fee)?;
        validate_non_negative_amount(&item.other_fees)?;

        // A matched line must carry the order it was matched to.
        if item.status == ItemStatus::Matched && item.local_order_id.is_none() {
            return Err(ReconciliationError::Validation(format!(
                "Matched item '{}' must reference a local order",
                item.id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn identifier_rules() {
        assert!(validate_identifier("stl-2024_03").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("has space").is_err());
        assert!(validate_identifier(&"x".repeat(65)).is_err());
    }

    #[test]
    fn currency_code_rules() {
        assert!(validate_currency_code("INR").is_ok());
        assert!(validate_currency_code("inr").is_err());
        assert!(validate_currency_code("RUPEES").is_err());
    }

    #[test]
    fn enhanced_settlement_validator_rejects_inverted_period() {
        let settlement = Settlement::new(
            "stl-1".to_string(),
            Channel::Amazon,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "INR".to_string(),
        );

        assert!(EnhancedSettlementValidator
            .validate_settlement(&settlement)
            .is_err());
    }

    #[test]
    fn enhanced_item_validator_requires_order_on_matched_lines() {
        let mut item = SettlementItem::new(
            "item-1".to_string(),
            "stl-1".to_string(),
            "mo-1".to_string(),
            TransactionType::Order,
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            BigDecimal::from(100),
        );
        item.status = ItemStatus::Matched;

        assert!(EnhancedItemValidator.validate_item(&item).is_err());

        item.local_order_id = Some("ord-1".to_string());
        assert!(EnhancedItemValidator.validate_item(&item).is_ok());
    }
}
