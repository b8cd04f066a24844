//! Manual review example: resolve discrepancies by hand with match, ignore,
//! and dispute operations

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;

use settlement_core::utils::MemoryStorage;
use settlement_core::{
    Channel, ItemStatus, LocalOrder, MatcherError, OrderMatcher, Reconciler, SettlementBuilder,
};

struct DemoOrderStore {
    orders: HashMap<String, Vec<LocalOrder>>,
}

#[async_trait]
impl OrderMatcher for DemoOrderStore {
    async fn find_candidates(
        &self,
        marketplace_order_id: &str,
    ) -> Result<Vec<LocalOrder>, MatcherError> {
        Ok(self
            .orders
            .get(marketplace_order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_order(&self, local_order_id: &str) -> Result<Option<LocalOrder>, MatcherError> {
        Ok(self
            .orders
            .values()
            .flatten()
            .find(|o| o.id == local_order_id)
            .cloned())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧐 Settlement Core - Manual Review Example\n");

    let mut reconciler = Reconciler::new(MemoryStorage::new());
    let date = |d| NaiveDate::from_ymd_opt(2024, 4, d).unwrap();

    let (settlement, items) = SettlementBuilder::new(
        "stl-fk-2024-04-10".to_string(),
        Channel::Flipkart,
        date(10),
        date(1),
        date(9),
        "INR".to_string(),
    )
    .order_line(
        "OD-100".to_string(),
        date(2),
        BigDecimal::from(550),
        BigDecimal::from(80),
        BigDecimal::from(40),
    )
    .order_line(
        "OD-200".to_string(),
        date(3),
        BigDecimal::from(1200),
        BigDecimal::from(180),
        BigDecimal::from(40),
    )
    .order_line(
        "OD-300".to_string(),
        date(6),
        BigDecimal::from(900),
        BigDecimal::from(135),
        BigDecimal::from(40),
    )
    .build()?;
    let settlement = reconciler.ingest(settlement, items).await?;

    // OD-100 matches cleanly, OD-200 was shortpaid by the marketplace, and
    // OD-300 is missing from the local order store entirely.
    let store = DemoOrderStore {
        orders: HashMap::from([
            (
                "OD-100".to_string(),
                vec![LocalOrder {
                    id: "ord-2001".to_string(),
                    amount: BigDecimal::from(550),
                }],
            ),
            (
                "OD-200".to_string(),
                vec![LocalOrder {
                    id: "ord-2002".to_string(),
                    amount: BigDecimal::from(1350),
                }],
            ),
        ]),
    };

    let summary = reconciler
        .run_reconciliation(&settlement.id, &store, "ops-team")
        .await?;
    println!(
        "🔍 Automatic run: {} matched, {} unmatched, {} discrepancies → {}\n",
        summary.matched, summary.unmatched, summary.discrepancies, summary.status
    );

    // 1. Dispute the settlement while finance chases the shortpayment
    let settlement = reconciler
        .dispute_settlement(&settlement.id, "ops-team", "OD-200 shortpaid by 150")
        .await?;
    println!("⚠️  Disputed: status = {}", settlement.status);

    // 2. Finance confirms the payout was correct after all; match it manually
    let discrepancies = reconciler
        .get_settlement_items(&settlement.id, Some(ItemStatus::Discrepancy))
        .await?;
    let settlement = reconciler
        .match_item(&discrepancies[0].id, "ord-2002", &store)
        .await?;
    println!(
        "✅ Manually matched {} → status = {}",
        discrepancies[0].marketplace_order_id, settlement.status
    );

    // 3. OD-300 turns out to be a test order; exclude it
    let unmatched = reconciler
        .get_settlement_items(&settlement.id, Some(ItemStatus::Unmatched))
        .await?;
    let settlement = reconciler.ignore_item(&unmatched[0].id).await?;
    println!(
        "🙈 Ignored {} → status = {}",
        unmatched[0].marketplace_order_id, settlement.status
    );

    println!(
        "\n📊 Final counts: {} matched / {} unmatched / {} discrepancy / {} ignored",
        settlement.matched_count,
        settlement.unmatched_count,
        settlement.discrepancy_count,
        settlement.ignored_count
    );
    if let Some(notes) = &settlement.notes {
        println!("🗒  Notes:\n{}", notes);
    }

    Ok(())
}
