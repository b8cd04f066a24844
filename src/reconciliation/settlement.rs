//! Settlement management functionality

use crate::traits::*;
use crate::types::*;

/// Manager for settlement-level operations
pub struct SettlementManager<S: SettlementStorage> {
    pub(crate) storage: S,
    validator: Box<dyn SettlementValidator>,
}

impl<S: SettlementStorage> SettlementManager<S> {
    /// Create a new settlement manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultSettlementValidator),
        }
    }

    /// Create a new settlement manager with a custom validator
    pub fn with_validator(storage: S, validator: Box<dyn SettlementValidator>) -> Self {
        Self { storage, validator }
    }

    /// Register a new settlement
    pub async fn create_settlement(
        &mut self,
        settlement: Settlement,
    ) -> ReconciliationResult<Settlement> {
        self.validator.validate_settlement(&settlement)?;

        if self.storage.get_settlement(&settlement.id).await?.is_some() {
            return Err(ReconciliationError::Validation(format!(
                "Settlement with ID '{}' already exists",
                settlement.id
            )));
        }

        self.storage.save_settlement(&settlement).await?;

        Ok(settlement)
    }

    /// Get a settlement by ID
    pub async fn get_settlement(
        &self,
        settlement_id: &str,
    ) -> ReconciliationResult<Option<Settlement>> {
        self.storage.get_settlement(settlement_id).await
    }

    /// Get a settlement by ID, returning an error if not found
    pub async fn get_settlement_required(
        &self,
        settlement_id: &str,
    ) -> ReconciliationResult<Settlement> {
        self.storage
            .get_settlement(settlement_id)
            .await?
            .ok_or_else(|| ReconciliationError::SettlementNotFound(settlement_id.to_string()))
    }

    /// List settlements, optionally filtered by channel and/or status
    pub async fn list_settlements(
        &self,
        channel: Option<Channel>,
        status: Option<SettlementStatus>,
    ) -> ReconciliationResult<Vec<Settlement>> {
        self.storage.list_settlements(channel, status).await
    }

    /// Append a note to a settlement
    pub async fn update_notes(
        &mut self,
        settlement_id: &str,
        note: &str,
    ) -> ReconciliationResult<Settlement> {
        let mut settlement = self.get_settlement_required(settlement_id).await?;
        settlement.append_note(note);
        self.storage.commit(&settlement, &[]).await?;
        settlement.version += 1;
        Ok(settlement)
    }
}
