//! Daemon module for aliddns
//!
//! Long-running variant: re-runs a sync pass every `interval` seconds.
//! SIGHUP reloads the configuration from disk and forces an immediate
//! pass; SIGTERM stops the loop. The active configuration sits behind a
//! read-write lock so a reload serializes against a pass the timer is
//! driving.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::alidns::AlidnsClient;
use crate::config::{Config, RecordSpec};
use crate::provider::DnsProvider;
use crate::resolver::{IpFamily, IpResolver};
use crate::sync::SyncOrchestrator;

//==============================================================================
// State
//==============================================================================

/// Bookkeeping for the daemon loop
#[derive(Debug, Default)]
pub struct AppState {
    /// Timestamp of the last pass that synced at least one record (UTC)
    pub last_sync: Option<DateTime<Utc>>,
    /// Number of consecutive passes without a single synced record
    pub consecutive_failures: u64,
}

impl AppState {
    /// Records a successful pass
    pub fn mark_success(&mut self) {
        self.last_sync = Some(Utc::now());
        self.consecutive_failures = 0;
    }

    /// Records a failed pass
    pub fn mark_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

//==============================================================================
// Wiring
//==============================================================================

/// Builds the orchestrator stack (provider client + resolver) from a
/// validated configuration
pub fn build_orchestrator(config: &Config) -> Result<SyncOrchestrator> {
    let provider: Arc<dyn DnsProvider> = Arc::new(AlidnsClient::new(
        config.access_key_id.as_str(),
        config.access_key_secret.as_str(),
        &config.region,
        config.timeout,
    )?);

    let mut resolver = IpResolver::new(config.timeout)?;
    if let Some(services) = &config.ipv4_services {
        resolver = resolver.with_services(IpFamily::V4, services.clone());
    }
    if let Some(services) = &config.ipv6_services {
        resolver = resolver.with_services(IpFamily::V6, services.clone());
    }

    Ok(SyncOrchestrator::new(
        provider,
        Arc::new(resolver),
        config.domain.clone(),
        config.ttl,
    ))
}

/// The parts of the configuration the loop reads on every tick
struct Runtime {
    interval: Duration,
    records: Vec<RecordSpec>,
    orchestrator: SyncOrchestrator,
}

impl Runtime {
    fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            interval: config.interval,
            records: config.records.clone(),
            orchestrator: build_orchestrator(config)?,
        })
    }
}

//==============================================================================
// Daemon
//==============================================================================

/// Interval-driven sync daemon
pub struct Daemon {
    config_path: Option<PathBuf>,
    runtime: RwLock<Runtime>,
    state: Mutex<AppState>,
}

impl Daemon {
    /// Creates a daemon from an already-validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - the active configuration
    /// * `config_path` - path the configuration was loaded from; used by
    ///   SIGHUP reloads
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            config_path,
            runtime: RwLock::new(Runtime::from_config(&config)?),
            state: Mutex::new(AppState::default()),
        })
    }

    /// Runs the daemon main loop
    ///
    /// Performs an initial pass immediately, then one pass per interval
    /// tick until SIGTERM. SIGHUP reloads the configuration and forces an
    /// immediate pass.
    pub async fn run(&self) -> Result<()> {
        {
            let runtime = self.runtime.read().await;
            info!("Starting aliddns daemon");
            info!("Records: {}", runtime.records.len());
            info!("Interval: {}s", runtime.interval.as_secs());
        }

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sighup = signal(SignalKind::hangup())?;

        self.run_pass().await;

        loop {
            let interval = self.runtime.read().await.interval;
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("SIGTERM received");
                    break;
                }
                _ = sighup.recv() => {
                    info!("SIGHUP received: reloading configuration");
                    self.reload().await;
                    self.run_pass().await;
                }
                _ = tokio::time::sleep(interval) => {
                    self.run_pass().await;
                }
            }
        }

        info!("Daemon stopped");
        Ok(())
    }

    /// Runs one sync pass under the configuration read lock
    async fn run_pass(&self) {
        let runtime = self.runtime.read().await;
        let summary = runtime.orchestrator.sync_all(&runtime.records).await;
        drop(runtime);

        let mut state = self.state.lock().await;
        if summary.is_success() {
            state.mark_success();
        } else {
            state.mark_failure();
            warn!(
                "sync pass failed ({} consecutive failures)",
                state.consecutive_failures
            );
        }
    }

    /// Reloads the configuration from disk; on any error the previous
    /// configuration stays active
    async fn reload(&self) {
        let loaded = Config::load(self.config_path.clone()).and_then(|config| {
            Runtime::from_config(&config)
        });
        match loaded {
            Ok(runtime) => {
                *self.runtime.write().await = runtime;
                info!("configuration reloaded");
            }
            Err(e) => {
                error!("configuration reload failed, keeping previous configuration: {:#}", e);
            }
        }
    }
}

//==============================================================================
// Tests
//==============================================================================
