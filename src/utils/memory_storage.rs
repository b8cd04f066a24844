//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
///
/// Clones share the underlying maps, so a cloned handle sees the same data.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    settlements: Arc<RwLock<HashMap<String, Settlement>>>,
    items: Arc<RwLock<HashMap<String, SettlementItem>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            settlements: Arc::new(RwLock::new(HashMap::new())),
            items: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.settlements.write().unwrap().clear();
        self.items.write().unwrap().clear();
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettlementStorage for MemoryStorage {
    async fn save_settlement(&mut self, settlement: &Settlement) -> ReconciliationResult<()> {
        self.settlements
            .write()
            .unwrap()
            .insert(settlement.id.clone(), settlement.clone());
        Ok(())
    }

    async fn get_settlement(
        &self,
        settlement_id: &str,
    ) -> ReconciliationResult<Option<Settlement>> {
        Ok(self
            .settlements
            .read()
            .unwrap()
            .get(settlement_id)
            .cloned())
    }

    async fn list_settlements(
        &self,
        channel: Option<Channel>,
        status: Option<SettlementStatus>,
    ) -> ReconciliationResult<Vec<Settlement>> {
        let settlements = self.settlements.read().unwrap();
        let mut filtered: Vec<Settlement> = settlements
            .values()
            .filter(|s| channel.is_none_or(|c| s.channel == c))
            .filter(|s| status.is_none_or(|st| s.status == st))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.settlement_date.cmp(&b.settlement_date).then(a.id.cmp(&b.id)));
        Ok(filtered)
    }

    async fn save_item(&mut self, item: &SettlementItem) -> ReconciliationResult<()> {
        self.items
            .write()
            .unwrap()
            .insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn get_item(&self, item_id: &str) -> ReconciliationResult<Option<SettlementItem>> {
        Ok(self.items.read().unwrap().get(item_id).cloned())
    }

    async fn get_settlement_items(
        &self,
        settlement_id: &str,
        status: Option<ItemStatus>,
    ) -> ReconciliationResult<Vec<SettlementItem>> {
        let items = self.items.read().unwrap();
        let mut filtered: Vec<SettlementItem> = items
            .values()
            .filter(|i| i.settlement_id == settlement_id)
            .filter(|i| status.is_none_or(|st| i.status == st))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then(a.id.cmp(&b.id))
        });
        Ok(filtered)
    }

    async fn update_item(&mut self, item: &SettlementItem) -> ReconciliationResult<()> {
        if self.items.read().unwrap().contains_key(&item.id) {
            self.items
                .write()
                .unwrap()
                .insert(item.id.clone(), item.clone());
            Ok(())
        } else {
            Err(ReconciliationError::ItemNotFound(item.id.clone()))
        }
    }

    async fn commit(
        &mut self,
        settlement: &Settlement,
        items: &[SettlementItem],
    ) -> ReconciliationResult<()> {
        // Both maps stay locked for the whole commit so readers never observe
        // a settlement aggregate that disagrees with its lines.
        let mut settlements = self.settlements.write().unwrap();
        let mut stored_items = self.items.write().unwrap();

        let stored = settlements
            .get(&settlement.id)
            .ok_or_else(|| ReconciliationError::SettlementNotFound(settlement.id.clone()))?;

        if stored.version != settlement.version {
            return Err(ReconciliationError::VersionConflict(settlement.id.clone()));
        }

        for item in items {
            if !stored_items.contains_key(&item.id) {
                return Err(ReconciliationError::ItemNotFound(item.id.clone()));
            }
            if item.settlement_id != settlement.id {
                return Err(ReconciliationError::Validation(format!(
                    "item '{}' does not belong to settlement '{}'",
                    item.id, settlement.id
                )));
            }
        }

        let mut updated = settlement.clone();
        updated.version += 1;
        settlements.insert(updated.id.clone(), updated);

        for item in items {
            stored_items.insert(item.id.clone(), item.clone());
        }

        Ok(())
    }
}
