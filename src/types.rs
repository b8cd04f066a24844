//! Core types and data structures for settlement reconciliation

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Marketplace channels that produce settlement payouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Amazon,
    Flipkart,
    Shopify,
    Myntra,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Amazon => write!(f, "AMAZON"),
            Channel::Flipkart => write!(f, "FLIPKART"),
            Channel::Shopify => write!(f, "SHOPIFY"),
            Channel::Myntra => write!(f, "MYNTRA"),
        }
    }
}

/// Kind of transaction a settlement line represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Sale proceeds for an order
    Order,
    /// Money returned to a buyer
    Refund,
    /// Marketplace fee line with no order attached
    Fee,
    /// Manual correction issued by the marketplace
    Adjustment,
}

/// Aggregate reconciliation state of a settlement
///
/// A settlement starts PENDING and moves to one of the other states when a
/// reconciliation run or a manual item action recomputes the aggregate.
/// DISPUTED is only ever entered through an explicit manual action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Matched,
    Partial,
    Unmatched,
    Disputed,
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementStatus::Pending => write!(f, "PENDING"),
            SettlementStatus::Matched => write!(f, "MATCHED"),
            SettlementStatus::Partial => write!(f, "PARTIAL"),
            SettlementStatus::Unmatched => write!(f, "UNMATCHED"),
            SettlementStatus::Disputed => write!(f, "DISPUTED"),
        }
    }
}

/// Reconciliation state of a single settlement line
///
/// MATCHED and IGNORED are stable end-states. UNMATCHED and DISCREPANCY can be
/// retried by another run or resolved manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    Matched,
    Unmatched,
    Discrepancy,
    Ignored,
}

impl ItemStatus {
    /// Whether a human can still assign a local order to a line in this state
    pub fn accepts_manual_match(&self) -> bool {
        matches!(self, ItemStatus::Unmatched | ItemStatus::Discrepancy)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "PENDING"),
            ItemStatus::Matched => write!(f, "MATCHED"),
            ItemStatus::Unmatched => write!(f, "UNMATCHED"),
            ItemStatus::Discrepancy => write!(f, "DISCREPANCY"),
            ItemStatus::Ignored => write!(f, "IGNORED"),
        }
    }
}

/// One marketplace payout batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Unique identifier for the settlement
    pub id: String,
    /// Marketplace the payout came from
    pub channel: Channel,
    /// Date the marketplace issued the payout
    pub settlement_date: NaiveDate,
    /// First day covered by the payout
    pub period_start: NaiveDate,
    /// Last day covered by the payout
    pub period_end: NaiveDate,
    /// ISO 4217 currency code
    pub currency: String,
    /// Gross payout amount
    pub total_amount: BigDecimal,
    /// Sale proceeds portion of the payout
    pub order_amount: BigDecimal,
    /// Refunds deducted by the marketplace
    pub refund_amount: BigDecimal,
    /// Commission deducted by the marketplace
    pub commission_amount: BigDecimal,
    /// Shipping fees deducted by the marketplace
    pub shipping_fee: BigDecimal,
    /// Remaining fee deductions
    pub other_fees: BigDecimal,
    /// Tax component of the payout
    pub tax_amount: BigDecimal,
    /// Net amount after deductions
    pub net_amount: BigDecimal,
    /// Aggregate reconciliation state
    pub status: SettlementStatus,
    /// Lines matched to a local order; derived from items, never set directly
    pub matched_count: usize,
    /// Lines with no local candidate; derived from items
    pub unmatched_count: usize,
    /// Lines with ambiguous or amount-mismatched candidates; derived from items
    pub discrepancy_count: usize,
    /// Lines excluded from reconciliation by an operator; derived from items
    pub ignored_count: usize,
    /// When the settlement was last reconciled
    pub reconciled_at: Option<NaiveDateTime>,
    /// Actor that triggered the last reconciliation
    pub reconciled_by: Option<String>,
    /// Free-text operator notes
    pub notes: Option<String>,
    /// Optimistic concurrency token, bumped on every committed mutation
    pub version: u64,
    /// When the settlement was created
    pub created_at: NaiveDateTime,
    /// When the settlement was last updated
    pub updated_at: NaiveDateTime,
}

impl Settlement {
    /// Create a new pending settlement with zeroed amounts
    pub fn new(
        id: String,
        channel: Channel,
        settlement_date: NaiveDate,
        period_start: NaiveDate,
        period_end: NaiveDate,
        currency: String,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            channel,
            settlement_date,
            period_start,
            period_end,
            currency,
            total_amount: BigDecimal::from(0),
            order_amount: BigDecimal::from(0),
            refund_amount: BigDecimal::from(0),
            commission_amount: BigDecimal::from(0),
            shipping_fee: BigDecimal::from(0),
            other_fees: BigDecimal::from(0),
            tax_amount: BigDecimal::from(0),
            net_amount: BigDecimal::from(0),
            status: SettlementStatus::Pending,
            matched_count: 0,
            unmatched_count: 0,
            discrepancy_count: 0,
            ignored_count: 0,
            reconciled_at: None,
            reconciled_by: None,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fraction of counted lines matched to a local order, as a percentage
    pub fn match_rate(&self) -> BigDecimal {
        let counted = self.matched_count + self.unmatched_count + self.discrepancy_count;
        if counted == 0 {
            return BigDecimal::from(0);
        }
        BigDecimal::from(self.matched_count as u64) * BigDecimal::from(100)
            / BigDecimal::from(counted as u64)
    }

    /// Whether any line still needs operator attention
    pub fn needs_review(&self) -> bool {
        self.unmatched_count > 0 || self.discrepancy_count > 0
    }

    /// Append a line to the operator notes
    pub fn append_note(&mut self, note: &str) {
        match &mut self.notes {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(note);
            }
            None => self.notes = Some(note.to_string()),
        }
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// One transaction line within a settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementItem {
    /// Unique identifier for the line
    pub id: String,
    /// Owning settlement; lines are never reassigned across settlements
    pub settlement_id: String,
    /// Order reference as the marketplace reports it
    pub marketplace_order_id: String,
    /// Local order the line was matched to; None until matched
    pub local_order_id: Option<String>,
    /// What kind of transaction the line represents
    pub transaction_type: TransactionType,
    /// Date of the underlying transaction
    pub transaction_date: NaiveDate,
    /// Gross line amount
    pub amount: BigDecimal,
    /// Commission deducted on this line
    pub commission_fee: BigDecimal,
    /// Shipping fee deducted on this line
    pub shipping_fee: BigDecimal,
    /// Remaining deductions on this line
    pub other_fees: BigDecimal,
    /// Line amount after deductions
    pub net_amount: BigDecimal,
    /// Reconciliation state of the line
    pub status: ItemStatus,
    /// Free-text description or operator note
    pub description: Option<String>,
    /// When the line was created
    pub created_at: NaiveDateTime,
    /// When the line was last updated
    pub updated_at: NaiveDateTime,
}

impl SettlementItem {
    /// Create a new pending line with no fee deductions
    pub fn new(
        id: String,
        settlement_id: String,
        marketplace_order_id: String,
        transaction_type: TransactionType,
        transaction_date: NaiveDate,
        amount: BigDecimal,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            settlement_id,
            marketplace_order_id,
            local_order_id: None,
            transaction_type,
            transaction_date,
            net_amount: amount.clone(),
            amount,
            commission_fee: BigDecimal::from(0),
            shipping_fee: BigDecimal::from(0),
            other_fees: BigDecimal::from(0),
            status: ItemStatus::Pending,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the line matched to a local order
    pub fn mark_matched(&mut self, local_order_id: String) {
        self.local_order_id = Some(local_order_id);
        self.status = ItemStatus::Matched;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Move the line to a non-matched state, clearing any stale order link
    pub fn mark_unresolved(&mut self, status: ItemStatus) {
        debug_assert!(matches!(
            status,
            ItemStatus::Unmatched | ItemStatus::Discrepancy | ItemStatus::Ignored
        ));
        self.local_order_id = None;
        self.status = status;
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// Outcome of a single reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Lines examined in this run
    pub processed: usize,
    /// Lines transitioned to MATCHED in this run
    pub matched: usize,
    /// Lines transitioned to UNMATCHED in this run
    pub unmatched: usize,
    /// Lines transitioned to DISCREPANCY in this run
    pub discrepancies: usize,
    /// Whether the run stopped early on a cancellation request
    pub cancelled: bool,
    /// Settlement status after the run
    pub status: SettlementStatus,
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Settlement not found: {0}")]
    SettlementNotFound(String),
    #[error("Settlement item not found: {0}")]
    ItemNotFound(String),
    #[error("Local order not found: {0}")]
    OrderNotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Settlement '{0}' was modified concurrently")]
    VersionConflict(String),
    #[error("Matcher error: {0}")]
    Matcher(#[from] MatcherError),
}

/// Failures of the external order lookup
///
/// Inside a reconciliation run these degrade the affected line to UNMATCHED
/// instead of failing the batch. Manual operations surface them directly.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("order lookup timed out")]
    Timeout,
    #[error("order lookup unavailable: {0}")]
    Unavailable(String),
}

/// Result type for reconciliation operations
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;
