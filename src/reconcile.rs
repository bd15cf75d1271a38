//! Per-record reconciliation
//!
//! For one (domain, rr, type) the reconciler compares desired state (the
//! freshly resolved public IP) against observed state (the provider's
//! record) and performs the minimal corrective action:
//!
//! - no existing record -> create (a duplicate conflict counts as success:
//!   a concurrent creator won the race)
//! - existing value equals the desired IP -> no-op, no provider write
//! - existing value differs -> update against the record's identity
//!
//! Every provider call is individually wrapped in the retry policy. An
//! error that survives retries becomes this record's outcome; it never
//! aborts sibling reconciliations.

use tracing::{debug, info, warn};

use crate::config::RecordSpec;
use crate::error::Error;
use crate::provider::{CreateOutcome, DnsProvider, RecordType};
use crate::retry::RetryPolicy;

//==============================================================================
// Types
//==============================================================================

/// Corrective action taken for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Record already held the desired value; nothing written
    Noop,
    /// Record did not exist and was created
    Created,
    /// Record existed with a stale value and was rewritten
    Updated,
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAction::Noop => write!(f, "noop"),
            SyncAction::Created => write!(f, "created"),
            SyncAction::Updated => write!(f, "updated"),
        }
    }
}

/// Result of reconciling one record, immutable once produced
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Host label of the record
    pub rr: String,
    /// Record type
    pub record_type: RecordType,
    /// Action taken; `None` when the record failed before any decision
    pub action: Option<SyncAction>,
    /// Previous record value, when one existed
    pub old_value: Option<String>,
    /// Desired value, when resolution got far enough to produce one
    pub new_value: Option<String>,
    /// Error that failed this record, if any
    pub error: Option<Error>,
}

impl SyncOutcome {
    /// Builds a success outcome
    pub fn success(
        spec: &RecordSpec,
        action: SyncAction,
        old_value: Option<String>,
        new_value: &str,
    ) -> Self {
        Self {
            rr: spec.rr.clone(),
            record_type: spec.record_type,
            action: Some(action),
            old_value,
            new_value: Some(new_value.to_string()),
            error: None,
        }
    }

    /// Builds a failure outcome
    pub fn failure(spec: &RecordSpec, new_value: Option<&str>, error: Error) -> Self {
        Self {
            rr: spec.rr.clone(),
            record_type: spec.record_type,
            action: None,
            old_value: None,
            new_value: new_value.map(|v| v.to_string()),
            error: Some(error),
        }
    }

    /// Whether this record was brought into the desired state
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.action.is_some()
    }
}

//==============================================================================
// Reconciler
//==============================================================================

/// Drives the query -> decide -> act state machine for single records
pub struct Reconciler<'a> {
    provider: &'a dyn DnsProvider,
    retry: RetryPolicy,
    domain: &'a str,
    default_ttl: u64,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        provider: &'a dyn DnsProvider,
        retry: RetryPolicy,
        domain: &'a str,
        default_ttl: u64,
    ) -> Self {
        Self {
            provider,
            retry,
            domain,
            default_ttl,
        }
    }

    /// Reconciles one record against the desired IP
    ///
    /// Never returns an error: failures are folded into the outcome so the
    /// caller's fan-out can aggregate them without aborting siblings.
    pub async fn reconcile(&self, spec: &RecordSpec, ip: &str) -> SyncOutcome {
        let rr = spec.rr.as_str();
        let record_type = spec.record_type;
        let ttl = spec.ttl.unwrap_or(self.default_ttl);
        let name = format!("{}.{}", rr, self.domain);

        let existing = match self
            .retry
            .run(|| self.provider.describe(self.domain, rr, record_type))
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                warn!("[{}] query failed: {}", name, e);
                return SyncOutcome::failure(spec, Some(ip), e);
            }
        };

        match existing {
            Some(record) if record.value == ip => {
                info!("[{}] value unchanged: {}", name, ip);
                SyncOutcome::success(spec, SyncAction::Noop, Some(record.value), ip)
            }
            Some(record) => {
                match self
                    .retry
                    .run(|| self.provider.update(&record.id, rr, record_type, ip, ttl))
                    .await
                {
                    Ok(()) => {
                        info!("[{}] value updated: {} -> {}", name, record.value, ip);
                        SyncOutcome::success(spec, SyncAction::Updated, Some(record.value), ip)
                    }
                    Err(e) => {
                        warn!("[{}] update failed: {}", name, e);
                        SyncOutcome::failure(spec, Some(ip), e)
                    }
                }
            }
            None => {
                match self
                    .retry
                    .run(|| self.provider.create(self.domain, rr, record_type, ip, ttl))
                    .await
                {
                    Ok(CreateOutcome::Created(id)) => {
                        info!("[{}] record created: {} (id {})", name, ip, id);
                        SyncOutcome::success(spec, SyncAction::Created, None, ip)
                    }
                    Ok(CreateOutcome::AlreadyExists) => {
                        debug!("[{}] record already exists; create treated as success", name);
                        SyncOutcome::success(spec, SyncAction::Created, None, ip)
                    }
                    Err(e) => {
                        warn!("[{}] create failed: {}", name, e);
                        SyncOutcome::failure(spec, Some(ip), e)
                    }
                }
            }
        }
    }
}

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::provider::ProviderRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory provider double with call counters and failure injection
    struct MockProvider {
        record: Mutex<Option<ProviderRecord>>,
        describe_calls: AtomicUsize,
        create_calls: AtomicUsize,
        update_calls: AtomicUsize,
        fail_describe: bool,
        duplicate_on_create: bool,
    }

    impl MockProvider {
        fn empty() -> Self {
            Self {
                record: Mutex::new(None),
                describe_calls: AtomicUsize::new(0),
                create_calls: AtomicUsize::new(0),
                update_calls: AtomicUsize::new(0),
                fail_describe: false,
                duplicate_on_create: false,
            }
        }

        fn holding(value: &str) -> Self {
            let mock = Self::empty();
            *mock.record.lock().unwrap() = Some(ProviderRecord {
                id: "rec-1".to_string(),
                rr: "www".to_string(),
                record_type: RecordType::A,
                value: value.to_string(),
            });
            mock
        }
    }

    #[async_trait]
    impl DnsProvider for MockProvider {
        async fn describe(
            &self,
            _domain: &str,
            _rr: &str,
            _record_type: RecordType,
        ) -> Result<Option<ProviderRecord>> {
            self.describe_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_describe {
                return Err(Error::provider_server("InternalError", "backend down"));
            }
            Ok(self.record.lock().unwrap().clone())
        }

        async fn create(
            &self,
            _domain: &str,
            rr: &str,
            record_type: RecordType,
            value: &str,
            _ttl: u64,
        ) -> Result<CreateOutcome> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.duplicate_on_create {
                return Ok(CreateOutcome::AlreadyExists);
            }
            *self.record.lock().unwrap() = Some(ProviderRecord {
                id: "rec-new".to_string(),
                rr: rr.to_string(),
                record_type,
                value: value.to_string(),
            });
            Ok(CreateOutcome::Created("rec-new".to_string()))
        }

        async fn update(
            &self,
            _record_id: &str,
            _rr: &str,
            _record_type: RecordType,
            value: &str,
            _ttl: u64,
        ) -> Result<()> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(record) = self.record.lock().unwrap().as_mut() {
                record.value = value.to_string();
            }
            Ok(())
        }
    }

    fn spec() -> RecordSpec {
        RecordSpec {
            rr: "www".to_string(),
            record_type: RecordType::A,
            ttl: None,
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), 2.0)
    }

    #[tokio::test]
    async fn test_reconcile_noop_is_idempotent_and_writes_nothing() {
        let provider = MockProvider::holding("203.0.113.7");
        let reconciler = Reconciler::new(&provider, fast_retry(), "example.com", 600);

        for _ in 0..2 {
            let outcome = reconciler.reconcile(&spec(), "203.0.113.7").await;
            assert!(outcome.is_success());
            assert_eq!(outcome.action, Some(SyncAction::Noop));
            assert_eq!(outcome.old_value.as_deref(), Some("203.0.113.7"));
        }

        assert_eq!(provider.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reconcile_creates_missing_record() {
        let provider = MockProvider::empty();
        let reconciler = Reconciler::new(&provider, fast_retry(), "example.com", 600);

        let outcome = reconciler.reconcile(&spec(), "203.0.113.7").await;
        assert!(outcome.is_success());
        assert_eq!(outcome.action, Some(SyncAction::Created));
        assert_eq!(outcome.old_value, None);
        assert_eq!(outcome.new_value.as_deref(), Some("203.0.113.7"));
        assert_eq!(provider.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reconcile_create_conflict_is_success() {
        let mut provider = MockProvider::empty();
        provider.duplicate_on_create = true;
        let reconciler = Reconciler::new(&provider, fast_retry(), "example.com", 600);

        let outcome = reconciler.reconcile(&spec(), "203.0.113.7").await;
        assert!(outcome.is_success());
        assert_eq!(outcome.action, Some(SyncAction::Created));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_updates_stale_record() {
        let provider = MockProvider::holding("198.51.100.1");
        let reconciler = Reconciler::new(&provider, fast_retry(), "example.com", 600);

        let outcome = reconciler.reconcile(&spec(), "203.0.113.7").await;
        assert!(outcome.is_success());
        assert_eq!(outcome.action, Some(SyncAction::Updated));
        assert_eq!(outcome.old_value.as_deref(), Some("198.51.100.1"));
        assert_eq!(outcome.new_value.as_deref(), Some("203.0.113.7"));
        assert_eq!(provider.update_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.record.lock().unwrap().as_ref().unwrap().value, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_reconcile_query_failure_is_retried_then_reported() {
        let mut provider = MockProvider::empty();
        provider.fail_describe = true;
        let reconciler = Reconciler::new(&provider, fast_retry(), "example.com", 600);

        let outcome = reconciler.reconcile(&spec(), "203.0.113.7").await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.action, None);
        // Both attempts of the retry policy hit the provider.
        assert_eq!(provider.describe_calls.load(Ordering::SeqCst), 2);
        match outcome.error {
            Some(Error::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, Error::ProviderServer { .. }));
            }
            other => panic!("expected exhausted provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_sync_action_display() {
        assert_eq!(SyncAction::Noop.to_string(), "noop");
        assert_eq!(SyncAction::Created.to_string(), "created");
        assert_eq!(SyncAction::Updated.to_string(), "updated");
    }
}
