//! Settlement line ingestion and management

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::fees::AmountBreakdown;
use crate::traits::*;
use crate::types::*;

/// Manager for settlement line operations
pub struct ItemManager<S: SettlementStorage> {
    pub(crate) storage: S,
    validator: Box<dyn ItemValidator>,
}

impl<S: SettlementStorage> ItemManager<S> {
    /// Create a new item manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultItemValidator),
        }
    }

    /// Create a new item manager with a custom validator
    pub fn with_validator(storage: S, validator: Box<dyn ItemValidator>) -> Self {
        Self { storage, validator }
    }

    /// Add a line to an existing settlement
    ///
    /// The owning settlement must already exist; lines are owned by exactly
    /// one settlement and are never reassigned.
    pub async fn add_item(&mut self, item: SettlementItem) -> ReconciliationResult<SettlementItem> {
        self.validator.validate_item(&item)?;

        if self
            .storage
            .get_settlement(&item.settlement_id)
            .await?
            .is_none()
        {
            return Err(ReconciliationError::SettlementNotFound(
                item.settlement_id.clone(),
            ));
        }

        if self.storage.get_item(&item.id).await?.is_some() {
            return Err(ReconciliationError::Validation(format!(
                "Settlement item with ID '{}' already exists",
                item.id
            )));
        }

        self.storage.save_item(&item).await?;

        Ok(item)
    }

    /// Get a line by ID
    pub async fn get_item(&self, item_id: &str) -> ReconciliationResult<Option<SettlementItem>> {
        self.storage.get_item(item_id).await
    }

    /// Get a line by ID, returning an error if not found
    pub async fn get_item_required(&self, item_id: &str) -> ReconciliationResult<SettlementItem> {
        self.storage
            .get_item(item_id)
            .await?
            .ok_or_else(|| ReconciliationError::ItemNotFound(item_id.to_string()))
    }

    /// List the lines of a settlement, optionally filtered by status
    pub async fn get_settlement_items(
        &self,
        settlement_id: &str,
        status: Option<ItemStatus>,
    ) -> ReconciliationResult<Vec<SettlementItem>> {
        self.storage.get_settlement_items(settlement_id, status).await
    }
}

/// Builder for ingesting a settlement together with its lines
///
/// Settlement-level amounts are computed from the lines on `build`, so the
/// header can never disagree with its constituents.
#[derive(Debug)]
pub struct SettlementBuilder {
    settlement: Settlement,
    items: Vec<SettlementItem>,
}

impl SettlementBuilder {
    /// Start building a settlement
    pub fn new(
        id: String,
        channel: Channel,
        settlement_date: NaiveDate,
        period_start: NaiveDate,
        period_end: NaiveDate,
        currency: String,
    ) -> Self {
        Self {
            settlement: Settlement::new(
                id,
                channel,
                settlement_date,
                period_start,
                period_end,
                currency,
            ),
            items: Vec::new(),
        }
    }

    /// Set the operator notes
    pub fn notes(mut self, notes: String) -> Self {
        self.settlement.notes = Some(notes);
        self
    }

    /// Set the tax component of the payout
    pub fn tax_amount(mut self, tax_amount: BigDecimal) -> Self {
        self.settlement.tax_amount = tax_amount;
        self
    }

    /// Add a sale proceeds line
    pub fn order_line(
        mut self,
        marketplace_order_id: String,
        transaction_date: NaiveDate,
        amount: BigDecimal,
        commission_fee: BigDecimal,
        shipping_fee: BigDecimal,
    ) -> Self {
        self.items.push(patterns::order_line(
            self.settlement.id.clone(),
            marketplace_order_id,
            transaction_date,
            amount,
            commission_fee,
            shipping_fee,
        ));
        self
    }

    /// Add a refund line
    pub fn refund_line(
        mut self,
        marketplace_order_id: String,
        transaction_date: NaiveDate,
        amount: BigDecimal,
    ) -> Self {
        self.items.push(patterns::refund_line(
            self.settlement.id.clone(),
            marketplace_order_id,
            transaction_date,
            amount,
        ));
        self
    }

    /// Add a marketplace fee line
    pub fn fee_line(
        mut self,
        reference: String,
        description: String,
        transaction_date: NaiveDate,
        amount: BigDecimal,
    ) -> Self {
        self.items.push(patterns::fee_line(
            self.settlement.id.clone(),
            reference,
            description,
            transaction_date,
            amount,
        ));
        self
    }

    /// Add a pre-built line
    pub fn line(mut self, mut item: SettlementItem) -> Self {
        item.settlement_id = self.settlement.id.clone();
        self.items.push(item);
        self
    }

    /// Compute settlement amounts from the lines and finish building
    pub fn build(mut self) -> ReconciliationResult<(Settlement, Vec<SettlementItem>)> {
        let mut order_amount = BigDecimal::from(0);
        let mut refund_amount = BigDecimal::from(0);
        let mut commission_amount = BigDecimal::from(0);
        let mut shipping_fee = BigDecimal::from(0);
        let mut other_fees = BigDecimal::from(0);

        for item in &self.items {
            match item.transaction_type {
                TransactionType::Order | TransactionType::Adjustment => {
                    order_amount += &item.amount;
                }
                TransactionType::Refund => refund_amount += &item.amount,
                TransactionType::Fee => other_fees += &item.amount,
            }
            commission_amount += &item.commission_fee;
            shipping_fee += &item.shipping_fee;
            other_fees += &item.other_fees;
        }

        let breakdown = AmountBreakdown::calculate(
            order_amount,
            refund_amount,
            commission_amount,
            shipping_fee,
            other_fees,
            self.settlement.tax_amount.clone(),
        )
        .map_err(|e| ReconciliationError::Validation(e.to_string()))?;

        self.settlement.total_amount = breakdown.total_amount.clone();
        self.settlement.order_amount = breakdown.total_amount;
        self.settlement.refund_amount = breakdown.refund_amount;
        self.settlement.commission_amount = breakdown.commission_amount;
        self.settlement.shipping_fee = breakdown.shipping_fee;
        self.settlement.other_fees = breakdown.other_fees;
        self.settlement.net_amount = breakdown.net_amount;

        Ok((self.settlement, self.items))
    }
}

/// Common settlement line shapes
pub mod patterns {
    use super::*;
    use uuid::Uuid;

    /// Sale proceeds line for a marketplace order
    pub fn order_line(
        settlement_id: String,
        marketplace_order_id: String,
        transaction_date: NaiveDate,
        amount: BigDecimal,
        commission_fee: BigDecimal,
        shipping_fee: BigDecimal,
    ) -> SettlementItem {
        let mut item = SettlementItem::new(
            Uuid::new_v4().to_string(),
            settlement_id,
            marketplace_order_id,
            TransactionType::Order,
            transaction_date,
            amount,
        );
        item.net_amount = &item.amount - &commission_fee - &shipping_fee;
        item.commission_fee = commission_fee;
        item.shipping_fee = shipping_fee;
        item
    }

    /// Refund line for a marketplace order
    pub fn refund_line(
        settlement_id: String,
        marketplace_order_id: String,
        transaction_date: NaiveDate,
        amount: BigDecimal,
    ) -> SettlementItem {
        SettlementItem::new(
            Uuid::new_v4().to_string(),
            settlement_id,
            marketplace_order_id,
            TransactionType::Refund,
            transaction_date,
            amount,
        )
    }

    /// Marketplace fee line not attached to an order
    pub fn fee_line(
        settlement_id: String,
        reference: String,
        description: String,
        transaction_date: NaiveDate,
        amount: BigDecimal,
    ) -> SettlementItem {
        let mut item = SettlementItem::new(
            Uuid::new_v4().to_string(),
            settlement_id,
            reference,
            TransactionType::Fee,
            transaction_date,
            amount,
        );
        item.description = Some(description);
        item
    }
}
