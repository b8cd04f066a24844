//! Main reconciliation orchestrator coordinating settlements and their lines

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::reconciliation::status::ItemTally;
use crate::reconciliation::{ItemManager, SettlementManager};
use crate::traits::*;
use crate::types::*;

/// Cooperative cancellation flag for long reconciliation runs
///
/// Checked between lines; lines already processed keep their new state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// What a reconciliation run decided for one pending line
enum LineDecision {
    Matched(String),
    Unmatched,
    Discrepancy(String),
}

/// Reconciliation system orchestrating settlement and line operations
///
/// Mutating methods take `&mut self`, giving each settlement a single logical
/// owner at compile time; the version token enforced by
/// [`SettlementStorage::commit`] rejects lost updates across handles that
/// share a backend.
pub struct Reconciler<S: SettlementStorage> {
    settlement_manager: SettlementManager<S>,
    item_manager: ItemManager<S>,
    amount_tolerance: BigDecimal,
}

impl<S: SettlementStorage + Clone> Reconciler<S> {
    /// Create a new reconciler with the given storage backend
    ///
    /// The match amount tolerance defaults to 0.01, one minor currency unit.
    pub fn new(storage: S) -> Self {
        Self::with_tolerance(storage, BigDecimal::from(1) / BigDecimal::from(100))
    }

    /// Create a new reconciler with a custom match amount tolerance
    pub fn with_tolerance(storage: S, amount_tolerance: BigDecimal) -> Self {
        Self {
            settlement_manager: SettlementManager::new(storage.clone()),
            item_manager: ItemManager::new(storage),
            amount_tolerance,
        }
    }

    /// Create a new reconciler with custom validators
    pub fn with_validators(
        storage: S,
        settlement_validator: Box<dyn SettlementValidator>,
        item_validator: Box<dyn ItemValidator>,
    ) -> Self {
        Self {
            settlement_manager: SettlementManager::with_validator(
                storage.clone(),
                settlement_validator,
            ),
            item_manager: ItemManager::with_validator(storage, item_validator),
            amount_tolerance: BigDecimal::from(1) / BigDecimal::from(100),
        }
    }

    // Settlement operations
    /// Register a new settlement
    pub async fn create_settlement(
        &mut self,
        settlement: Settlement,
    ) -> ReconciliationResult<Settlement> {
        self.settlement_manager.create_settlement(settlement).await
    }

    /// Register a settlement together with its lines
    pub async fn ingest(
        &mut self,
        settlement: Settlement,
        items: Vec<SettlementItem>,
    ) -> ReconciliationResult<Settlement> {
        let settlement = self.settlement_manager.create_settlement(settlement).await?;
        for item in items {
            self.item_manager.add_item(item).await?;
        }
        Ok(settlement)
    }

    /// Get a settlement by ID
    pub async fn get_settlement(
        &self,
        settlement_id: &str,
    ) -> ReconciliationResult<Option<Settlement>> {
        self.settlement_manager.get_settlement(settlement_id).await
    }

    /// List settlements, optionally filtered by channel and/or status
    pub async fn list_settlements(
        &self,
        channel: Option<Channel>,
        status: Option<SettlementStatus>,
    ) -> ReconciliationResult<Vec<Settlement>> {
        self.settlement_manager
            .list_settlements(channel, status)
            .await
    }

    /// Append a note to a settlement
    pub async fn update_notes(
        &mut self,
        settlement_id: &str,
        note: &str,
    ) -> ReconciliationResult<Settlement> {
        self.settlement_manager.update_notes(settlement_id, note).await
    }

    // Line operations
    /// Add a line to an existing settlement
    pub async fn add_item(&mut self, item: SettlementItem) -> ReconciliationResult<SettlementItem> {
        self.item_manager.add_item(item).await
    }

    /// Get a line by ID
    pub async fn get_item(&self, item_id: &str) -> ReconciliationResult<Option<SettlementItem>> {
        self.item_manager.get_item(item_id).await
    }

    /// List the lines of a settlement, optionally filtered by status
    pub async fn get_settlement_items(
        &self,
        settlement_id: &str,
        status: Option<ItemStatus>,
    ) -> ReconciliationResult<Vec<SettlementItem>> {
        self.item_manager
            .get_settlement_items(settlement_id, status)
            .await
    }

    // Reconciliation operations
    /// Run reconciliation over the open lines of a settlement
    ///
    /// PENDING lines are examined and UNMATCHED lines are retried; MATCHED,
    /// IGNORED, and DISCREPANCY lines are left untouched (discrepancies wait
    /// for manual review), so re-running a settlement with no new lines and
    /// an unchanged matcher is idempotent. Matcher failures degrade the
    /// affected line to UNMATCHED and the batch continues.
    /// `reconciled_at`/`reconciled_by` are refreshed on every run.
    pub async fn run_reconciliation(
        &mut self,
        settlement_id: &str,
        matcher: &dyn OrderMatcher,
        actor: &str,
    ) -> ReconciliationResult<RunSummary> {
        self.run_reconciliation_cancellable(settlement_id, matcher, actor, &CancelToken::new())
            .await
    }

    /// Run reconciliation with cooperative cancellation between lines
    ///
    /// On cancellation, lines already processed keep their new state; the
    /// settlement aggregate is recomputed from whatever the lines now are.
    pub async fn run_reconciliation_cancellable(
        &mut self,
        settlement_id: &str,
        matcher: &dyn OrderMatcher,
        actor: &str,
        cancel: &CancelToken,
    ) -> ReconciliationResult<RunSummary> {
        let mut settlement = self
            .settlement_manager
            .get_settlement_required(settlement_id)
            .await?;
        let mut items = self
            .item_manager
            .get_settlement_items(settlement_id, None)
            .await?;

        let is_open =
            |status: ItemStatus| matches!(status, ItemStatus::Pending | ItemStatus::Unmatched);

        info!(
            settlement_id,
            actor,
            open = items.iter().filter(|i| is_open(i.status)).count(),
            "starting reconciliation run"
        );

        let mut summary = RunSummary {
            processed: 0,
            matched: 0,
            unmatched: 0,
            discrepancies: 0,
            cancelled: false,
            status: settlement.status,
        };

        for item in items.iter_mut().filter(|i| is_open(i.status)) {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                info!(settlement_id, processed = summary.processed, "run cancelled");
                break;
            }

            let decision = match matcher.find_candidates(&item.marketplace_order_id).await {
                Ok(candidates) => self.decide(item, candidates),
                Err(err) => {
                    warn!(
                        settlement_id,
                        item_id = %item.id,
                        error = %err,
                        "order lookup failed, leaving line unmatched"
                    );
                    LineDecision::Unmatched
                }
            };

            match decision {
                LineDecision::Matched(local_order_id) => {
                    debug!(item_id = %item.id, local_order_id = %local_order_id, "line matched");
                    item.mark_matched(local_order_id);
                    summary.matched += 1;
                }
                LineDecision::Unmatched => {
                    debug!(item_id = %item.id, "no candidate found");
                    item.mark_unresolved(ItemStatus::Unmatched);
                    summary.unmatched += 1;
                }
                LineDecision::Discrepancy(reason) => {
                    debug!(item_id = %item.id, reason = %reason, "line flagged as discrepancy");
                    item.mark_unresolved(ItemStatus::Discrepancy);
                    if item.description.is_none() {
                        item.description = Some(reason);
                    }
                    summary.discrepancies += 1;
                }
            }
            summary.processed += 1;

            // Persist each line as it is decided; a cancelled run keeps its
            // partial progress rather than rolling back.
            self.item_manager.storage.update_item(item).await?;
        }

        ItemTally::of(&items).apply_to(&mut settlement);
        settlement.reconciled_at = Some(chrono::Utc::now().naive_utc());
        settlement.reconciled_by = Some(actor.to_string());
        self.settlement_manager
            .storage
            .commit(&settlement, &[])
            .await?;

        summary.status = settlement.status;
        info!(
            settlement_id,
            matched = summary.matched,
            unmatched = summary.unmatched,
            discrepancies = summary.discrepancies,
            status = %summary.status,
            "reconciliation run finished"
        );

        Ok(summary)
    }

    /// Manually match a line to a local order
    ///
    /// Only UNMATCHED and DISCREPANCY lines accept a manual match; re-matching
    /// a settled line is rejected. The line and settlement update commit
    /// atomically. `reconciled_at`/`reconciled_by` are not touched.
    pub async fn match_item(
        &mut self,
        item_id: &str,
        local_order_id: &str,
        matcher: &dyn OrderMatcher,
    ) -> ReconciliationResult<Settlement> {
        let mut item = self.item_manager.get_item_required(item_id).await?;

        if !item.status.accepts_manual_match() {
            return Err(ReconciliationError::InvalidTransition(format!(
                "cannot match item '{}' in state {}",
                item.id, item.status
            )));
        }

        let order = matcher
            .get_order(local_order_id)
            .await?
            .ok_or_else(|| ReconciliationError::OrderNotFound(local_order_id.to_string()))?;

        let mut settlement = self
            .settlement_manager
            .get_settlement_required(&item.settlement_id)
            .await?;

        item.mark_matched(order.id);
        info!(
            settlement_id = %settlement.id,
            item_id = %item.id,
            local_order_id,
            "line matched manually"
        );

        self.retally_and_commit(&mut settlement, item).await?;
        Ok(settlement)
    }

    /// Exclude a line from reconciliation
    ///
    /// An ignored line never blocks its settlement from reaching MATCHED.
    /// Ignoring an already-ignored line is a no-op; ignoring a MATCHED line
    /// is rejected.
    pub async fn ignore_item(&mut self, item_id: &str) -> ReconciliationResult<Settlement> {
        let mut item = self.item_manager.get_item_required(item_id).await?;

        match item.status {
            ItemStatus::Matched => {
                return Err(ReconciliationError::InvalidTransition(format!(
                    "cannot ignore item '{}': already matched",
                    item.id
                )));
            }
            ItemStatus::Ignored => {
                return self
                    .settlement_manager
                    .get_settlement_required(&item.settlement_id)
                    .await;
            }
            _ => {}
        }

        let mut settlement = self
            .settlement_manager
            .get_settlement_required(&item.settlement_id)
            .await?;

        item.mark_unresolved(ItemStatus::Ignored);
        info!(settlement_id = %settlement.id, item_id = %item.id, "line ignored");

        self.retally_and_commit(&mut settlement, item).await?;
        Ok(settlement)
    }

    /// Escalate a settlement with discrepancy lines to DISPUTED
    ///
    /// Explicit manual action; automatic runs never produce DISPUTED. A later
    /// successful mutation re-derives the status, so resolving every
    /// discrepancy clears the dispute.
    pub async fn dispute_settlement(
        &mut self,
        settlement_id: &str,
        actor: &str,
        note: &str,
    ) -> ReconciliationResult<Settlement> {
        let mut settlement = self
            .settlement_manager
            .get_settlement_required(settlement_id)
            .await?;

        if settlement.discrepancy_count == 0 {
            return Err(ReconciliationError::InvalidTransition(format!(
                "cannot dispute settlement '{}': no discrepancy lines",
                settlement.id
            )));
        }

        settlement.status = SettlementStatus::Disputed;
        settlement.append_note(&format!("Disputed by {}: {}", actor, note));
        info!(settlement_id, actor, "settlement disputed");

        self.settlement_manager
            .storage
            .commit(&settlement, &[])
            .await?;
        settlement.version += 1;
        Ok(settlement)
    }

    /// Verify the stored counters of a settlement against its lines
    pub async fn verify_counts(
        &self,
        settlement_id: &str,
    ) -> ReconciliationResult<CountIntegrityReport> {
        let settlement = self
            .settlement_manager
            .get_settlement_required(settlement_id)
            .await?;
        let items = self
            .item_manager
            .get_settlement_items(settlement_id, None)
            .await?;
        let tally = ItemTally::of(&items);

        let mut issues = Vec::new();

        for (name, stored, actual) in [
            ("matched", settlement.matched_count, tally.matched),
            ("unmatched", settlement.unmatched_count, tally.unmatched),
            ("discrepancy", settlement.discrepancy_count, tally.discrepancy),
            ("ignored", settlement.ignored_count, tally.ignored),
        ] {
            if stored != actual {
                issues.push(format!(
                    "stored {} count is {} but lines tally to {}",
                    name, stored, actual
                ));
            }
        }

        if tally.counted() > tally.total {
            issues.push(format!(
                "counted lines {} exceed total lines {}",
                tally.counted(),
                tally.total
            ));
        }

        for item in &items {
            if item.status == ItemStatus::Matched && item.local_order_id.is_none() {
                issues.push(format!(
                    "matched item '{}' carries no local order id",
                    item.id
                ));
            }
        }

        Ok(CountIntegrityReport {
            settlement_id: settlement.id,
            is_consistent: issues.is_empty(),
            issues,
            tally,
        })
    }

    /// Apply the manual decision on one line and commit it with the
    /// re-derived settlement aggregate in one atomic step.
    async fn retally_and_commit(
        &mut self,
        settlement: &mut Settlement,
        item: SettlementItem,
    ) -> ReconciliationResult<()> {
        let mut items = self
            .item_manager
            .get_settlement_items(&settlement.id, None)
            .await?;
        if let Some(slot) = items.iter_mut().find(|i| i.id == item.id) {
            *slot = item.clone();
        }

        ItemTally::of(&items).apply_to(settlement);
        self.settlement_manager
            .storage
            .commit(settlement, std::slice::from_ref(&item))
            .await?;
        settlement.version += 1;
        Ok(())
    }

    /// Decide the fate of one pending line given the matcher's candidates
    fn decide(&self, item: &SettlementItem, candidates: Vec<LocalOrder>) -> LineDecision {
        if candidates.is_empty() {
            return LineDecision::Unmatched;
        }

        let within_tolerance: Vec<&LocalOrder> = candidates
            .iter()
            .filter(|c| (&c.amount - &item.amount).abs() <= self.amount_tolerance)
            .collect();

        match within_tolerance.as_slice() {
            [single] => LineDecision::Matched(single.id.clone()),
            [] => LineDecision::Discrepancy(format!(
                "amount mismatch: no candidate within {} of {}",
                self.amount_tolerance, item.amount
            )),
            multiple => LineDecision::Discrepancy(format!(
                "ambiguous match: {} candidates within tolerance",
                multiple.len()
            )),
        }
    }
}

/// Report on the consistency of a settlement's derived counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountIntegrityReport {
    pub settlement_id: String,
    pub is_consistent: bool,
    pub issues: Vec<String>,
    pub tally: ItemTally,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct FixedMatcher {
        orders: HashMap<String, Vec<LocalOrder>>,
    }

    impl FixedMatcher {
        fn new(entries: &[(&str, &str, i64)]) -> Self {
            let mut orders: HashMap<String, Vec<LocalOrder>> = HashMap::new();
            for (marketplace_id, local_id, amount) in entries {
                orders.entry(marketplace_id.to_string()).or_default().push(LocalOrder {
                    id: local_id.to_string(),
                    amount: BigDecimal::from(*amount),
                });
            }
            Self { orders }
        }
    }

    #[async_trait]
    impl OrderMatcher for FixedMatcher {
        async fn find_candidates(
            &self,
            marketplace_order_id: &str,
        ) -> Result<Vec<LocalOrder>, MatcherError> {
            Ok(self.orders.get(marketplace_order_id).cloned().unwrap_or_default())
        }

        async fn get_order(
            &self,
            local_order_id: &str,
        ) -> Result<Option<LocalOrder>, MatcherError> {
            Ok(self
                .orders
                .values()
                .flatten()
                .find(|o| o.id == local_order_id)
                .cloned())
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    async fn seed(reconciler: &mut Reconciler<MemoryStorage>) -> Settlement {
        let (settlement, items) = crate::SettlementBuilder::new(
            "stl-1".to_string(),
            Channel::Amazon,
            date(15),
            date(1),
            date(14),
            "INR".to_string(),
        )
        .order_line(
            "mo-1".to_string(),
            date(2),
            BigDecimal::from(100),
            BigDecimal::from(0),
            BigDecimal::from(0),
        )
        .order_line(
            "mo-2".to_string(),
            date(3),
            BigDecimal::from(200),
            BigDecimal::from(0),
            BigDecimal::from(0),
        )
        .build()
        .unwrap();

        reconciler.ingest(settlement, items).await.unwrap()
    }

    #[tokio::test]
    async fn run_matches_unique_in_tolerance_candidates() {
        let mut reconciler = Reconciler::new(MemoryStorage::new());
        seed(&mut reconciler).await;
        let matcher = FixedMatcher::new(&[("mo-1", "ord-1", 100), ("mo-2", "ord-2", 200)]);

        let summary = reconciler
            .run_reconciliation("stl-1", &matcher, "tester")
            .await
            .unwrap();

        assert_eq!(summary.matched, 2);
        assert_eq!(summary.status, SettlementStatus::Matched);
    }

    #[tokio::test]
    async fn ambiguous_candidates_flag_discrepancy() {
        let mut reconciler = Reconciler::new(MemoryStorage::new());
        seed(&mut reconciler).await;
        let matcher = FixedMatcher::new(&[
            ("mo-1", "ord-1a", 100),
            ("mo-1", "ord-1b", 100),
            ("mo-2", "ord-2", 200),
        ]);

        let summary = reconciler
            .run_reconciliation("stl-1", &matcher, "tester")
            .await
            .unwrap();

        assert_eq!(summary.matched, 1);
        assert_eq!(summary.discrepancies, 1);
        assert_eq!(summary.status, SettlementStatus::Partial);
    }

    #[tokio::test]
    async fn amount_mismatch_flags_discrepancy() {
        let mut reconciler = Reconciler::new(MemoryStorage::new());
        seed(&mut reconciler).await;
        let matcher = FixedMatcher::new(&[("mo-1", "ord-1", 150), ("mo-2", "ord-2", 200)]);

        let summary = reconciler
            .run_reconciliation("stl-1", &matcher, "tester")
            .await
            .unwrap();

        assert_eq!(summary.discrepancies, 1);
        let settlement = reconciler.get_settlement("stl-1").await.unwrap().unwrap();
        assert_eq!(settlement.discrepancy_count, 1);
    }

    #[tokio::test]
    async fn candidate_within_tolerance_still_matches() {
        let storage = MemoryStorage::new();
        let mut reconciler =
            Reconciler::with_tolerance(storage, BigDecimal::from(1) / BigDecimal::from(100));
        seed(&mut reconciler).await;

        let matcher = FixedMatcher {
            orders: HashMap::from([
                (
                    "mo-1".to_string(),
                    vec![LocalOrder {
                        id: "ord-1".to_string(),
                        amount: BigDecimal::from(100) + BigDecimal::from(1) / BigDecimal::from(100),
                    }],
                ),
                (
                    "mo-2".to_string(),
                    vec![LocalOrder {
                        id: "ord-2".to_string(),
                        amount: BigDecimal::from(200),
                    }],
                ),
            ]),
        };

        let summary = reconciler
            .run_reconciliation("stl-1", &matcher, "tester")
            .await
            .unwrap();

        assert_eq!(summary.matched, 2);
    }
}
