//! Batch sync orchestration
//!
//! One sync pass: resolve the public IP once per needed address family,
//! then fan every configured record out onto a bounded worker pool of
//! reconciliation tasks. Records are fully independent; a failing record
//! only affects the aggregate counts, never a sibling's execution.

use std::cmp;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::RecordSpec;
use crate::constants::{MAX_SYNC_WORKERS, SYNC_TASK_TIMEOUT_SECS};
use crate::error::{Error, Result};
use crate::provider::DnsProvider;
use crate::reconcile::{Reconciler, SyncOutcome};
use crate::resolver::{IpFamily, IpResolver};
use crate::retry::RetryPolicy;

//==============================================================================
// Types
//==============================================================================

/// Aggregate result of one sync pass
///
/// The pass counts as successful when at least one record reached the
/// desired state, even if others failed; per-record detail (including each
/// failure) is always retained in `outcomes` so callers can impose stricter
/// semantics.
#[derive(Debug)]
pub struct BatchSummary {
    /// Number of records the pass attempted
    pub attempted: usize,
    /// Number of records that ended in `noop`/`created`/`updated` without error
    pub succeeded: usize,
    /// Wall-clock duration of the pass
    pub duration: Duration,
    /// One outcome per attempted record
    pub outcomes: Vec<SyncOutcome>,
}

impl BatchSummary {
    /// Best-effort aggregate: true iff any record succeeded
    pub fn is_success(&self) -> bool {
        self.succeeded > 0
    }
}

//==============================================================================
// Orchestrator
//==============================================================================

/// Top-level entry point driving a full multi-record sync pass
pub struct SyncOrchestrator {
    provider: Arc<dyn DnsProvider>,
    resolver: Arc<IpResolver>,
    retry: RetryPolicy,
    domain: String,
    default_ttl: u64,
    max_concurrent: usize,
    task_timeout: Duration,
}

impl SyncOrchestrator {
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        resolver: Arc<IpResolver>,
        domain: impl Into<String>,
        default_ttl: u64,
    ) -> Self {
        Self {
            provider,
            resolver,
            retry: RetryPolicy::default(),
            domain: domain.into(),
            default_ttl,
            max_concurrent: MAX_SYNC_WORKERS,
            task_timeout: Duration::from_secs(SYNC_TASK_TIMEOUT_SECS),
        }
    }

    /// Overrides the retry policy shared by resolution and provider calls
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the record fan-out concurrency cap
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Overrides the per-record task deadline
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Runs one sync pass over the given records
    ///
    /// 1. Resolve the public IP once per address family present in
    ///    `records` (the resolver cache absorbs duplicates); a family
    ///    resolution failure fails only that family's records.
    /// 2. Fan out one reconciliation task per record, capped at
    ///    `min(max_concurrent, records.len())` concurrent tasks, each under
    ///    its own deadline.
    /// 3. Aggregate the outcomes into a [`BatchSummary`].
    pub async fn sync_all(&self, records: &[RecordSpec]) -> BatchSummary {
        let start = Instant::now();
        let attempted = records.len();

        if records.is_empty() {
            warn!("no records configured; nothing to sync");
            return BatchSummary {
                attempted: 0,
                succeeded: 0,
                duration: start.elapsed(),
                outcomes: Vec::new(),
            };
        }

        info!("starting sync of {} records for {}", attempted, self.domain);

        let families: HashSet<IpFamily> =
            records.iter().map(|r| r.record_type.family()).collect();
        let mut addresses: HashMap<IpFamily, Result<String>> = HashMap::new();
        for family in families {
            let resolved = self.retry.run(|| self.resolver.resolve(family)).await;
            if let Err(ref e) = resolved {
                error!("{} resolution failed: {}", family, e);
            }
            addresses.insert(family, resolved);
        }

        let semaphore = Arc::new(Semaphore::new(cmp::min(self.max_concurrent, attempted)));
        let mut tasks: JoinSet<SyncOutcome> = JoinSet::new();

        for spec in records.iter().cloned() {
            let address = addresses
                .get(&spec.record_type.family())
                .cloned()
                .unwrap_or_else(|| Err(Error::resolution("address family not resolved")));
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let retry = self.retry;
            let domain = self.domain.clone();
            let default_ttl = self.default_ttl;
            let task_timeout = self.task_timeout;

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return SyncOutcome::failure(
                            &spec,
                            None,
                            Error::timeout("worker pool closed"),
                        )
                    }
                };

                let ip = match address {
                    Ok(ip) => ip,
                    Err(e) => return SyncOutcome::failure(&spec, None, e),
                };

                let reconciler =
                    Reconciler::new(provider.as_ref(), retry, &domain, default_ttl);
                match tokio::time::timeout(task_timeout, reconciler.reconcile(&spec, &ip)).await {
                    Ok(outcome) => outcome,
                    Err(_) => SyncOutcome::failure(
                        &spec,
                        Some(&ip),
                        Error::timeout(format!(
                            "record sync exceeded {}s",
                            task_timeout.as_secs()
                        )),
                    ),
                }
            });
        }

        let mut outcomes = Vec::with_capacity(attempted);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("sync task failed to complete: {}", e),
            }
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let duration = start.elapsed();
        info!(
            "sync finished: {}/{} succeeded ({:.1}s)",
            succeeded,
            attempted,
            duration.as_secs_f64()
        );

        BatchSummary {
            attempted,
            succeeded,
            duration,
            outcomes,
        }
    }
}

//==============================================================================
// Tests
//==============================================================================
