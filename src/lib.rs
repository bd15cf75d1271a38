//! aliddns - dynamic DNS client for Alibaba Cloud DNS (Alidns)
//!
//! Keeps configured A/AAAA records pointed at the machine's current public
//! IP address.
//!
//! Architecture:
//! - Public IP discovery races multiple HTTP echo services per address
//!   family; the first valid answer wins and is cached for a short window
//! - Per-record reconciliation queries the provider and performs the
//!   minimal corrective action (create / update / no-op)
//! - A sync pass fans reconciliations out onto a bounded worker pool with
//!   per-record failure isolation
//! - Retries use a shared exponential-backoff combinator
//! - Uses reqwest for HTTP (rustls)

pub mod alidns;
pub mod config;
pub mod constants;
pub mod daemon;
pub mod error;
pub mod provider;
pub mod reconcile;
pub mod resolver;
pub mod retry;
pub mod sync;
pub mod validation;

// Re-export core types for convenience
pub use alidns::AlidnsClient;
pub use config::{Config, RecordSpec};
pub use error::{Error, Result};
pub use provider::{CreateOutcome, DnsProvider, ProviderRecord, RecordType};
pub use reconcile::{Reconciler, SyncAction, SyncOutcome};
pub use resolver::{IpFamily, IpResolver, ResolvedIp};
pub use retry::RetryPolicy;
pub use sync::{BatchSummary, SyncOrchestrator};
