//! # Settlement Core
//!
//! A settlement reconciliation library for marketplace payouts: matching
//! payout line-items to local orders, tracking match/unmatch/discrepancy
//! counts, and driving manual review workflows.
//!
//! ## Features
//!
//! - **Settlement tracking**: payout batches from Amazon, Flipkart, Shopify,
//!   and Myntra with full amount breakdowns
//! - **Automatic matching**: reconciliation runs match pending lines to local
//!   orders through a pluggable lookup, within a configurable amount tolerance
//! - **Manual review**: match, ignore, and dispute operations with strict
//!   transition rules
//! - **Derived aggregates**: settlement counts and status are always computed
//!   from line states, never set directly
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use settlement_core::{Channel, Reconciler, SettlementBuilder};
//! use settlement_core::utils::MemoryStorage;
//!
//! // Build a settlement with its lines, then reconcile it - you need an
//! // OrderMatcher implementation for your order store.
//! // let mut reconciler = Reconciler::new(MemoryStorage::new());
//! // let summary = reconciler.run_reconciliation("stl-1", &matcher, "ops").await?;
//! ```

pub mod fees;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use fees::breakdown::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;

// Re-export line patterns for convenience
pub use reconciliation::item::patterns;
