//! Concurrent public IP discovery
//!
//! The resolver races a list of third-party IP echo services: one request
//! per service, bounded concurrency, first transport-success that passes
//! format validation wins. The winner is cached per address family for a
//! short window so that a multi-record sync pass resolves each family at
//! most once.
//!
//! Losing requests are abandoned, not canceled: their tasks run to
//! completion and their results are discarded when the winner has already
//! been taken.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex, Semaphore};
use tracing::debug;

use crate::constants::{
    DEFAULT_IPV4_SERVICES, DEFAULT_IPV6_SERVICES, IP_CACHE_TTL_SECS, MAX_RESOLVE_WORKERS,
    USER_AGENT,
};
use crate::error::{Error, Result};
use crate::validation::is_valid_ip;

//==============================================================================
// Types
//==============================================================================

/// Address family of a public IP lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    /// IPv4 (`A` records)
    V4,
    /// IPv6 (`AAAA` records)
    V6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "IPv4"),
            IpFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// A successfully discovered public IP address
#[derive(Debug, Clone)]
pub struct ResolvedIp {
    /// Textual address as returned by the winning echo service
    pub address: String,
    /// Address family of the lookup
    pub family: IpFamily,
    /// When the address was obtained; drives cache expiry
    pub obtained_at: Instant,
}

//==============================================================================
// Resolver
//==============================================================================

/// Races IP echo services and caches the winner per address family
///
/// The cache is keyed by [`IpFamily`] and holds at most one entry per
/// family. Entries expire purely by time (default 60 seconds) and are never
/// explicitly cleared. The resolver is shared behind an `Arc` by all
/// concurrent sync tasks; the mutex around the cache makes the
/// synchronization contract explicit.
pub struct IpResolver {
    client: reqwest::Client,
    ipv4_services: Vec<String>,
    ipv6_services: Vec<String>,
    cache: Mutex<HashMap<IpFamily, ResolvedIp>>,
    cache_ttl: Duration,
    max_concurrent: usize,
}

impl IpResolver {
    /// Creates a resolver with the default service lists
    ///
    /// # Arguments
    ///
    /// * `timeout` - per-request timeout applied to every echo service call
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            ipv4_services: DEFAULT_IPV4_SERVICES.iter().map(|s| s.to_string()).collect(),
            ipv6_services: DEFAULT_IPV6_SERVICES.iter().map(|s| s.to_string()).collect(),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: Duration::from_secs(IP_CACHE_TTL_SECS),
            max_concurrent: MAX_RESOLVE_WORKERS,
        })
    }

    /// Replaces the echo service list for one family
    pub fn with_services(mut self, family: IpFamily, services: Vec<String>) -> Self {
        match family {
            IpFamily::V4 => self.ipv4_services = services,
            IpFamily::V6 => self.ipv6_services = services,
        }
        self
    }

    /// Overrides the cache validity window
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Overrides the in-flight request cap for the race
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Resolves the public IP for the given family
    ///
    /// Returns the cached address when one is still within its validity
    /// window; otherwise races the configured echo services and caches the
    /// first valid answer. Fails with [`Error::Resolution`] only when every
    /// service fails or times out.
    pub async fn resolve(&self, family: IpFamily) -> Result<String> {
        if let Some(address) = self.cached(family).await {
            debug!("using cached {} address: {}", family, address);
            return Ok(address);
        }

        let services = self.services(family);
        if services.is_empty() {
            return Err(Error::resolution(format!(
                "no {} echo services configured",
                family
            )));
        }

        let (tx, mut rx) = mpsc::channel::<String>(services.len());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent.min(services.len())));

        for url in services.iter().cloned() {
            let client = self.client.clone();
            let tx = tx.clone();
            let semaphore = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                if let Some(ip) = fetch_ip(&client, &url, family).await {
                    // Send fails once the winner has been taken; losers
                    // are discarded here.
                    let _ = tx.send(ip).await;
                }
            });
        }
        drop(tx);

        match rx.recv().await {
            Some(address) => {
                debug!("resolved {} address: {}", family, address);
                self.store(family, &address).await;
                Ok(address)
            }
            None => Err(Error::resolution(format!(
                "all {} {} echo services failed",
                services.len(),
                family
            ))),
        }
    }

    fn services(&self, family: IpFamily) -> &[String] {
        match family {
            IpFamily::V4 => &self.ipv4_services,
            IpFamily::V6 => &self.ipv6_services,
        }
    }

    async fn cached(&self, family: IpFamily) -> Option<String> {
        let cache = self.cache.lock().await;
        cache
            .get(&family)
            .filter(|entry| entry.obtained_at.elapsed() < self.cache_ttl)
            .map(|entry| entry.address.clone())
    }

    async fn store(&self, family: IpFamily, address: &str) {
        let mut cache = self.cache.lock().await;
        cache.insert(
            family,
            ResolvedIp {
                address: address.to_string(),
                family,
                obtained_at: Instant::now(),
            },
        );
    }
}

/// Fetches one echo service and validates its answer
///
/// Any transport failure, non-2xx status, or malformed body makes this
/// service lose the race; it never fails the race as a whole.
async fn fetch_ip(client: &reqwest::Client, url: &str, family: IpFamily) -> Option<String> {
    debug!("querying {} for {} address", url, family);
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("{}: request failed: {}", url, e);
            return None;
        }
    };
    let response = match response.error_for_status() {
        Ok(response) => response,
        Err(e) => {
            debug!("{}: error status: {}", url, e);
            return None;
        }
    };
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!("{}: body read failed: {}", url, e);
            return None;
        }
    };

    let ip = body.trim();
    if is_valid_ip(ip, family) {
        debug!("{} answered {}", url, ip);
        Some(ip.to_string())
    } else {
        debug!("{}: invalid {} address in response: {:?}", url, family, ip);
        None
    }
}

//==============================================================================
// Tests
//==============================================================================
