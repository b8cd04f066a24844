//! Traits for storage abstraction, the external order lookup, and validation

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Storage abstraction for settlements and their lines
///
/// This trait allows the reconciliation core to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these methods.
/// There are deliberately no delete methods: settlements are never deleted,
/// only superseded by status transitions.
#[async_trait]
pub trait SettlementStorage: Send + Sync {
    /// Save a new settlement to storage
    async fn save_settlement(&mut self, settlement: &Settlement) -> ReconciliationResult<()>;

    /// Get a settlement by ID
    async fn get_settlement(&self, settlement_id: &str)
        -> ReconciliationResult<Option<Settlement>>;

    /// List settlements, optionally filtered by channel and/or status
    async fn list_settlements(
        &self,
        channel: Option<Channel>,
        status: Option<SettlementStatus>,
    ) -> ReconciliationResult<Vec<Settlement>>;

    /// Save a new settlement line to storage
    async fn save_item(&mut self, item: &SettlementItem) -> ReconciliationResult<()>;

    /// Get a settlement line by ID
    async fn get_item(&self, item_id: &str) -> ReconciliationResult<Option<SettlementItem>>;

    /// List the lines of a settlement, optionally filtered by status
    async fn get_settlement_items(
        &self,
        settlement_id: &str,
        status: Option<ItemStatus>,
    ) -> ReconciliationResult<Vec<SettlementItem>>;

    /// Update a single settlement line in place
    async fn update_item(&mut self, item: &SettlementItem) -> ReconciliationResult<()>;

    /// Atomically persist a settlement aggregate together with changed lines
    ///
    /// The settlement's `version` field must equal the stored version; on a
    /// mismatch the whole commit is rejected with
    /// [`ReconciliationError::VersionConflict`] and nothing is applied. On
    /// success the stored version is the given version plus one.
    async fn commit(
        &mut self,
        settlement: &Settlement,
        items: &[SettlementItem],
    ) -> ReconciliationResult<()>;
}

/// A local order returned by the external lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalOrder {
    /// Local order identifier
    pub id: String,
    /// Order total in the settlement currency
    pub amount: BigDecimal,
}

/// External capability that locates local orders for marketplace references
///
/// The lookup is the only potentially slow external call in a reconciliation
/// run; implementations should time out rather than block, reporting
/// [`MatcherError::Timeout`].
#[async_trait]
pub trait OrderMatcher: Send + Sync {
    /// Find candidate local orders for a marketplace order reference
    async fn find_candidates(
        &self,
        marketplace_order_id: &str,
    ) -> Result<Vec<LocalOrder>, MatcherError>;

    /// Look up a single local order by its identifier
    async fn get_order(&self, local_order_id: &str) -> Result<Option<LocalOrder>, MatcherError>;
}

/// Trait for implementing custom settlement validation rules
pub trait SettlementValidator: Send + Sync {
    /// Validate a settlement before saving
    fn validate_settlement(&self, settlement: &Settlement) -> ReconciliationResult<()>;
}

/// Trait for implementing custom settlement line validation rules
pub trait ItemValidator: Send + Sync {
    /// Validate a settlement line before saving
    fn validate_item(&self, item: &SettlementItem) -> ReconciliationResult<()>;
}

/// Default settlement validator with basic rules
pub struct DefaultSettlementValidator;

impl SettlementValidator for DefaultSettlementValidator {
    fn validate_settlement(&self, settlement: &Settlement) -> ReconciliationResult<()> {
        if settlement.id.trim().is_empty() {
            return Err(ReconciliationError::Validation(
                "Settlement ID cannot be empty".to_string(),
            ));
        }

        if settlement.period_end < settlement.period_start {
            return Err(ReconciliationError::Validation(
                "Settlement period end cannot precede period start".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default line validator with basic rules
pub struct DefaultItemValidator;

impl ItemValidator for DefaultItemValidator {
    fn validate_item(&self, item: &SettlementItem) -> ReconciliationResult<()> {
        if item.id.trim().is_empty() {
            return Err(ReconciliationError::Validation(
                "Item ID cannot be empty".to_string(),
            ));
        }

        if item.marketplace_order_id.trim().is_empty() {
            return Err(ReconciliationError::Validation(
                "Marketplace order ID cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
