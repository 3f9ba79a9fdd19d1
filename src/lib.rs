// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod card;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod monitor;
pub mod relevance;
pub mod seed;
pub mod snapshot;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::card::{DiscoveryCard, DiscoveryType, Snapshot};
pub use crate::config::MonitorConfig;
pub use crate::monitor::{DiscoveryFeed, DiscoveryMonitor, FeedOrigin};
