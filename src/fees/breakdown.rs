//! Net amount computation for marketplace payouts
//!
//! A marketplace pays out gross proceeds minus refunds and a stack of fee
//! deductions; tax collected on behalf of the seller is added back. This
//! module keeps that arithmetic in one place so settlement headers cannot
//! drift from their components.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Full amount decomposition of one payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountBreakdown {
    /// Gross proceeds before any deduction
    pub total_amount: BigDecimal,
    /// Refunds deducted
    pub refund_amount: BigDecimal,
    /// Commission deducted
    pub commission_amount: BigDecimal,
    /// Shipping fees deducted
    pub shipping_fee: BigDecimal,
    /// Remaining deductions
    pub other_fees: BigDecimal,
    /// Tax added back
    pub tax_amount: BigDecimal,
    /// Amount actually paid out
    pub net_amount: BigDecimal,
}

impl AmountBreakdown {
    /// Compute the net payout from its components
    ///
    /// `net = total − refund − commission − shipping − other + tax`
    pub fn calculate(
        total_amount: BigDecimal,
        refund_amount: BigDecimal,
        commission_amount: BigDecimal,
        shipping_fee: BigDecimal,
        other_fees: BigDecimal,
        tax_amount: BigDecimal,
    ) -> Result<Self, FeeError> {
        for (name, amount) in [
            ("total", &total_amount),
            ("refund", &refund_amount),
            ("commission", &commission_amount),
            ("shipping fee", &shipping_fee),
            ("other fees", &other_fees),
            ("tax", &tax_amount),
        ] {
            if *amount < BigDecimal::from(0) {
                return Err(FeeError::NegativeComponent(name.to_string()));
            }
        }

        let net_amount = &total_amount
            - &refund_amount
            - &commission_amount
            - &shipping_fee
            - &other_fees
            + &tax_amount;

        Ok(Self {
            total_amount,
            refund_amount,
            commission_amount,
            shipping_fee,
            other_fees,
            tax_amount,
            net_amount,
        })
    }

    /// Sum of everything the marketplace withheld
    pub fn total_deductions(&self) -> BigDecimal {
        &self.refund_amount + &self.commission_amount + &self.shipping_fee + &self.other_fees
    }

    /// Recover the combined deductions from gross, tax, and net amounts
    ///
    /// Useful when a marketplace statement reports only the endpoints.
    pub fn reverse_calculate(
        total_amount: &BigDecimal,
        tax_amount: &BigDecimal,
        net_amount: &BigDecimal,
    ) -> Result<BigDecimal, FeeError> {
        let deductions = total_amount + tax_amount - net_amount;
        if deductions < BigDecimal::from(0) {
            return Err(FeeError::Inconsistent(format!(
                "net amount {} exceeds gross {} plus tax {}",
                net_amount, total_amount, tax_amount
            )));
        }
        Ok(deductions)
    }
}

/// Errors in payout amount arithmetic
#[derive(Debug, thiserror::Error)]
pub enum FeeError {
    #[error("Amount component '{0}' cannot be negative")]
    NegativeComponent(String),
    #[error("Inconsistent amounts: {0}")]
    Inconsistent(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn net_amount_subtracts_deductions_and_adds_tax() {
        let breakdown = AmountBreakdown::calculate(
            BigDecimal::from(1000),
            BigDecimal::from(100),
            BigDecimal::from(150),
            BigDecimal::from(50),
            BigDecimal::from(25),
            BigDecimal::from(45),
        )
        .unwrap();

        assert_eq!(breakdown.net_amount, BigDecimal::from(720));
        assert_eq!(breakdown.total_deductions(), BigDecimal::from(325));
    }

    #[test]
    fn fractional_amounts_are_exact() {
        let breakdown = AmountBreakdown::calculate(
            BigDecimal::from_str("999.99").unwrap(),
            BigDecimal::from(0),
            BigDecimal::from_str("149.99").unwrap(),
            BigDecimal::from_str("49.50").unwrap(),
            BigDecimal::from(0),
            BigDecimal::from(0),
        )
        .unwrap();

        assert_eq!(
            breakdown.net_amount,
            BigDecimal::from_str("800.50").unwrap()
        );
    }

    #[test]
    fn negative_component_rejected() {
        let result = AmountBreakdown::calculate(
            BigDecimal::from(1000),
            BigDecimal::from(-1),
            BigDecimal::from(0),
            BigDecimal::from(0),
            BigDecimal::from(0),
            BigDecimal::from(0),
        );

        assert!(matches!(result, Err(FeeError::NegativeComponent(_))));
    }

    #[test]
    fn reverse_recovers_deductions() {
        let deductions = AmountBreakdown::reverse_calculate(
            &BigDecimal::from(1000),
            &BigDecimal::from(45),
            &BigDecimal::from(720),
        )
        .unwrap();

        assert_eq!(deductions, BigDecimal::from(325));
    }

    #[test]
    fn reverse_rejects_net_above_gross_plus_tax() {
        let result = AmountBreakdown::reverse_calculate(
            &BigDecimal::from(100),
            &BigDecimal::from(0),
            &BigDecimal::from(200),
        );

        assert!(matches!(result, Err(FeeError::Inconsistent(_))));
    }

    #[test]
    fn net_may_be_negative_when_refunds_dominate() {
        let breakdown = AmountBreakdown::calculate(
            BigDecimal::from(100),
            BigDecimal::from(300),
            BigDecimal::from(0),
            BigDecimal::from(0),
            BigDecimal::from(0),
            BigDecimal::from(0),
        )
        .unwrap();

        assert_eq!(breakdown.net_amount, BigDecimal::from(-200));
    }
}
