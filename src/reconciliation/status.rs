//! Settlement status derivation from line-level states
//!
//! Counts on a settlement are always derived by tallying its lines, never set
//! independently. DISPUTED is excluded from derivation on purpose: it is only
//! entered through an explicit manual action.

use serde::{Deserialize, Serialize};

use crate::types::{ItemStatus, Settlement, SettlementItem, SettlementStatus};

/// Per-status line counts for one settlement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTally {
    pub total: usize,
    pub pending: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub discrepancy: usize,
    pub ignored: usize,
}

impl ItemTally {
    /// Tally the lines of a settlement by status
    pub fn of(items: &[SettlementItem]) -> Self {
        let mut tally = Self {
            total: items.len(),
            ..Self::default()
        };
        for item in items {
            match item.status {
                ItemStatus::Pending => tally.pending += 1,
                ItemStatus::Matched => tally.matched += 1,
                ItemStatus::Unmatched => tally.unmatched += 1,
                ItemStatus::Discrepancy => tally.discrepancy += 1,
                ItemStatus::Ignored => tally.ignored += 1,
            }
        }
        tally
    }

    /// Lines counted toward the reconciliation denominator (IGNORED excluded)
    pub fn counted(&self) -> usize {
        self.matched + self.unmatched + self.discrepancy
    }

    /// Derive the settlement status from this tally
    ///
    /// Priority order, first match wins:
    /// 1. nothing unmatched, nothing in discrepancy, nothing still pending,
    ///    at least one line -> MATCHED (every line is MATCHED or IGNORED)
    /// 2. some lines matched and some unmatched or in discrepancy -> PARTIAL
    /// 3. nothing matched but unmatched or discrepancy lines exist -> UNMATCHED
    /// 4. otherwise the current status stands (an empty settlement or a run
    ///    cancelled before reaching any unresolved line changes nothing)
    pub fn derive_status(&self, current: SettlementStatus) -> SettlementStatus {
        if self.total > 0 && self.unmatched == 0 && self.discrepancy == 0 && self.pending == 0 {
            SettlementStatus::Matched
        } else if self.matched > 0 && (self.unmatched > 0 || self.discrepancy > 0) {
            SettlementStatus::Partial
        } else if self.matched == 0 && (self.unmatched > 0 || self.discrepancy > 0) {
            SettlementStatus::Unmatched
        } else {
            current
        }
    }

    /// Write this tally and the derived status onto a settlement
    pub fn apply_to(&self, settlement: &mut Settlement) {
        settlement.matched_count = self.matched;
        settlement.unmatched_count = self.unmatched;
        settlement.discrepancy_count = self.discrepancy;
        settlement.ignored_count = self.ignored;
        settlement.status = self.derive_status(settlement.status);
        settlement.updated_at = chrono::Utc::now().naive_utc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(
        pending: usize,
        matched: usize,
        unmatched: usize,
        discrepancy: usize,
        ignored: usize,
    ) -> ItemTally {
        ItemTally {
            total: pending + matched + unmatched + discrepancy + ignored,
            pending,
            matched,
            unmatched,
            discrepancy,
            ignored,
        }
    }

    #[test]
    fn all_matched_derives_matched() {
        let status = tally(0, 3, 0, 0, 0).derive_status(SettlementStatus::Pending);
        assert_eq!(status, SettlementStatus::Matched);
    }

    #[test]
    fn matched_and_ignored_derives_matched() {
        let status = tally(0, 2, 0, 0, 1).derive_status(SettlementStatus::Pending);
        assert_eq!(status, SettlementStatus::Matched);
    }

    #[test]
    fn all_ignored_derives_matched() {
        let status = tally(0, 0, 0, 0, 2).derive_status(SettlementStatus::Pending);
        assert_eq!(status, SettlementStatus::Matched);
    }

    #[test]
    fn mixed_derives_partial() {
        let status = tally(0, 2, 1, 0, 0).derive_status(SettlementStatus::Pending);
        assert_eq!(status, SettlementStatus::Partial);

        let status = tally(0, 1, 0, 2, 0).derive_status(SettlementStatus::Pending);
        assert_eq!(status, SettlementStatus::Partial);
    }

    #[test]
    fn nothing_matched_derives_unmatched() {
        let status = tally(0, 0, 3, 0, 0).derive_status(SettlementStatus::Pending);
        assert_eq!(status, SettlementStatus::Unmatched);

        let status = tally(0, 0, 1, 1, 1).derive_status(SettlementStatus::Pending);
        assert_eq!(status, SettlementStatus::Unmatched);
    }

    #[test]
    fn empty_settlement_keeps_current_status() {
        let status = tally(0, 0, 0, 0, 0).derive_status(SettlementStatus::Pending);
        assert_eq!(status, SettlementStatus::Pending);
    }

    #[test]
    fn pending_remainder_without_unresolved_lines_keeps_current_status() {
        // A run cancelled after two matches but before the rest was examined.
        let status = tally(3, 2, 0, 0, 0).derive_status(SettlementStatus::Pending);
        assert_eq!(status, SettlementStatus::Pending);
    }

    #[test]
    fn pending_remainder_does_not_satisfy_full_match() {
        let status = tally(1, 2, 0, 0, 0).derive_status(SettlementStatus::Partial);
        assert_ne!(status, SettlementStatus::Matched);
    }

    #[test]
    fn derivation_never_produces_disputed() {
        let status = tally(0, 1, 0, 2, 0).derive_status(SettlementStatus::Disputed);
        assert_eq!(status, SettlementStatus::Partial);
    }

    #[test]
    fn ignored_lines_excluded_from_counted_denominator() {
        let t = tally(0, 2, 1, 0, 4);
        assert_eq!(t.counted(), 3);
        assert_eq!(t.total, 7);
    }
}
