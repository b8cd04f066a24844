//! Basic reconciliation example: ingest a payout and run it against a
//! small in-memory order store

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;

use settlement_core::utils::MemoryStorage;
use settlement_core::{
    Channel, LocalOrder, MatcherError, OrderMatcher, Reconciler, SettlementBuilder,
};

/// Order lookup backed by a fixed map, standing in for the order service.
struct DemoOrderStore {
    orders: HashMap<String, LocalOrder>,
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
            .into_iter()
            .collect())
    }

    async fn get_order(&self, local_order_id: &str) -> Result<Option<LocalOrder>, MatcherError> {
        Ok(self
            .orders
            .values()
            .find(|o| o.id == local_order_id)
            .cloned())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("💸 Settlement Core - Basic Reconciliation Example\n");

    let mut reconciler = Reconciler::new(MemoryStorage::new());

    // 1. Ingest a marketplace payout with its transaction lines
    println!("📥 Ingesting Amazon payout for 1-14 March...");
    let date = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    let (settlement, items) = SettlementBuilder::new(
        "stl-amz-2024-03-15".to_string(),
        Channel::Amazon,
        date(15),
        date(1),
        date(14),
        "INR".to_string(),
    )
    .order_line(
        "403-1111".to_string(),
        date(2),
        BigDecimal::from(1499),
        BigDecimal::from(225),
        BigDecimal::from(60),
    )
    .order_line(
        "403-2222".to_string(),
        date(5),
        BigDecimal::from(2999),
        BigDecimal::from(450),
        BigDecimal::from(60),
    )
    .order_line(
        "403-3333".to_string(),
        date(9),
        BigDecimal::from(799),
        BigDecimal::from(120),
        BigDecimal::from(60),
    )
    .refund_line("403-0001".to_string(), date(7), BigDecimal::from(1499))
    .build()?;

    let settlement = reconciler.ingest(settlement, items).await?;
    println!(
        "  ✓ Settlement {} ingested: gross {}, net {}\n",
        settlement.id, settlement.total_amount, settlement.net_amount
    );

    // 2. Run reconciliation against the local order store
    println!("🔍 Running reconciliation...");
    let store = DemoOrderStore {
        orders: HashMap::from([
            (
                "403-1111".to_string(),
                LocalOrder {
                    id: "ord-1001".to_string(),
                    amount: BigDecimal::from(1499),
                },
            ),
            (
                "403-2222".to_string(),
                LocalOrder {
                    id: "ord-1002".to_string(),
                    amount: BigDecimal::from(2999),
                },
            ),
            // 403-3333 has no local order yet; the refund line never will.
        ]),
    };

    let summary = reconciler
        .run_reconciliation(&settlement.id, &store, "demo")
        .await?;
    println!(
        "  ✓ Run finished: {} matched, {} unmatched, {} discrepancies → {}\n",
        summary.matched, summary.unmatched, summary.discrepancies, summary.status
    );

    // 3. Inspect the result
    let settlement = reconciler
        .get_settlement(&settlement.id)
        .await?
        .expect("settlement was just ingested");
    println!("📊 Settlement after reconciliation:");
    println!("  status:       {}", settlement.status);
    println!("  match rate:   {}%", settlement.match_rate());
    println!(
        "  counts:       {} matched / {} unmatched / {} discrepancy / {} ignored",
        settlement.matched_count,
        settlement.unmatched_count,
        settlement.discrepancy_count,
        settlement.ignored_count
    );

    for item in reconciler.get_settlement_items(&settlement.id, None).await? {
        println!(
            "  line {} [{}] {} → {}",
            item.marketplace_order_id,
            item.amount,
            item.status,
            item.local_order_id.as_deref().unwrap_or("-")
        );
    }

    let report = reconciler.verify_counts(&settlement.id).await?;
    println!("\n🔒 Count integrity: consistent = {}", report.is_consistent);

    Ok(())
}
