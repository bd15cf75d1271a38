//! Configuration module for aliddns
//!
//! This module handles loading and validating configuration from a TOML
//! file and environment variables. Loading order: file values, then
//! environment overrides, then validation. Validation failures are fatal
//! and happen before any sync attempt.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use zeroize::ZeroizeOnDrop;

use crate::constants::{
    DEFAULT_INTERVAL_SECS, DEFAULT_RECORD_TTL, DEFAULT_REGION, DEFAULT_TIMEOUT_SECS,
    ENV_ACCESS_KEY_ID, ENV_ACCESS_KEY_SECRET, ENV_DOMAIN, ENV_REGION, MAX_INTERVAL_SECS,
    MAX_RECORD_TTL, MAX_TIMEOUT_SECS, MIN_INTERVAL_SECS, MIN_RECORD_TTL, MIN_TIMEOUT_SECS,
};
use crate::error::Error;
use crate::provider::RecordType;
use crate::validation::validate_rr;

//==============================================================================
// Types
//==============================================================================

/// One DNS record to keep synchronized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    /// Host label (e.g. "www", "@" for the zone apex)
    pub rr: String,
    /// Record type; determines the address family resolved for it
    pub record_type: RecordType,
    /// Per-record TTL override; falls back to the global `ttl` when unset
    pub ttl: Option<u64>,
}

/// Configuration for the aliddns client
///
/// Credentials are wrapped in `Zeroizing` so they are cleared from memory
/// when the config is dropped.
///
/// # Configuration Loading Priority
///
/// 1. Environment variables (highest priority)
/// 2. Config file (TOML)
/// 3. Defaults (lowest priority)
#[derive(Debug, Clone, ZeroizeOnDrop)]
pub struct Config {
    /// Alibaba Cloud access key id
    #[zeroize(skip)]
    pub access_key_id: zeroize::Zeroizing<String>,
    /// Alibaba Cloud access key secret
    #[zeroize(skip)]
    pub access_key_secret: zeroize::Zeroizing<String>,
    /// Domain all records belong to (e.g. "example.com")
    #[zeroize(skip)]
    pub domain: String,
    /// Records to keep synchronized
    #[zeroize(skip)]
    pub records: Vec<RecordSpec>,
    /// Alidns region
    #[zeroize(skip)]
    pub region: String,
    /// Daemon sync interval
    #[zeroize(skip)]
    pub interval: Duration,
    /// Global record TTL in seconds, applied when a record has no override
    #[zeroize(skip)]
    pub ttl: u64,
    /// HTTP request timeout for echo services and provider calls
    #[zeroize(skip)]
    pub timeout: Duration,
    /// Enable verbose logging
    #[zeroize(skip)]
    pub verbose: bool,
    /// Optional override of the IPv4 echo service list
    #[zeroize(skip)]
    pub ipv4_services: Option<Vec<String>>,
    /// Optional override of the IPv6 echo service list
    #[zeroize(skip)]
    pub ipv6_services: Option<Vec<String>>,
}

impl Config {
    /// Loads configuration from file and environment variables
    ///
    /// # Arguments
    ///
    /// * `config_path` - Optional path to a TOML config file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, when a record entry is
    /// malformed, or when the final configuration does not validate.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load_from_file(config_path)?;
        Self::override_with_env(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file, applying defaults for any
    /// missing fields
    fn load_from_file(config_path: Option<PathBuf>) -> Result<Self> {
        let mut access_key_id = String::new();
        let mut access_key_secret = String::new();
        let mut domain = String::new();
        let mut records = Vec::new();
        let mut region = DEFAULT_REGION.to_string();
        let mut interval = DEFAULT_INTERVAL_SECS;
        let mut ttl = DEFAULT_RECORD_TTL;
        let mut timeout = DEFAULT_TIMEOUT_SECS;
        let mut verbose = false;
        let mut ipv4_services = None;
        let mut ipv6_services = None;

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                let toml_config: TomlConfig =
                    toml::from_str(&content).with_context(|| "Failed to parse config file")?;

                access_key_id = toml_config.access_key_id.unwrap_or_default();
                access_key_secret = toml_config.access_key_secret.unwrap_or_default();
                domain = toml_config.domain.unwrap_or_default();
                records = parse_records(toml_config.records.unwrap_or_default())?;
                if let Some(v) = toml_config.region {
                    region = v;
                }
                interval = toml_config.interval.unwrap_or(DEFAULT_INTERVAL_SECS);
                ttl = toml_config.ttl.unwrap_or(DEFAULT_RECORD_TTL);
                timeout = toml_config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
                verbose = toml_config.verbose.unwrap_or(false);
                ipv4_services = toml_config.ipv4_services;
                ipv6_services = toml_config.ipv6_services;
            }
        }

        Ok(Self {
            access_key_id: zeroize::Zeroizing::new(access_key_id),
            access_key_secret: zeroize::Zeroizing::new(access_key_secret),
            domain,
            records,
            region,
            interval: Duration::from_secs(interval),
            ttl,
            timeout: Duration::from_secs(timeout),
            verbose,
            ipv4_services,
            ipv6_services,
        })
    }

    /// Overrides configuration values with environment variables, when set
    /// and non-empty
    fn override_with_env(config: &mut Self) {
        if let Ok(v) = env::var(ENV_ACCESS_KEY_ID) {
            if !v.is_empty() {
                config.access_key_id = zeroize::Zeroizing::new(v);
            }
        }
        if let Ok(v) = env::var(ENV_ACCESS_KEY_SECRET) {
            if !v.is_empty() {
                config.access_key_secret = zeroize::Zeroizing::new(v);
            }
        }
        if let Ok(v) = env::var(ENV_DOMAIN) {
            if !v.is_empty() {
                config.domain = v;
            }
        }
        if let Ok(v) = env::var(ENV_REGION) {
            if !v.is_empty() {
                config.region = v;
            }
        }
    }

    /// Validates the final configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a required field is missing, a
    /// record's RR is malformed, or a numeric setting is out of range.
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.access_key_id.is_empty() {
            return Err(Error::validation("access_key_id is required"));
        }
        if self.access_key_secret.is_empty() {
            return Err(Error::validation("access_key_secret is required"));
        }
        if self.domain.is_empty() {
            return Err(Error::validation("domain is required"));
        }
        if self.records.is_empty() {
            return Err(Error::validation("at least one record is required"));
        }
        for record in &self.records {
            validate_rr(&record.rr)?;
            if let Some(ttl) = record.ttl {
                if !(MIN_RECORD_TTL..=MAX_RECORD_TTL).contains(&ttl) {
                    return Err(Error::validation(format!(
                        "record {} ttl must be between {} and {} seconds, got {}",
                        record.rr, MIN_RECORD_TTL, MAX_RECORD_TTL, ttl
                    )));
                }
            }
        }

        if !(MIN_RECORD_TTL..=MAX_RECORD_TTL).contains(&self.ttl) {
            return Err(Error::validation(format!(
                "ttl must be between {} and {} seconds, got {}",
                MIN_RECORD_TTL, MAX_RECORD_TTL, self.ttl
            )));
        }

        let interval_secs = self.interval.as_secs();
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&interval_secs) {
            return Err(Error::validation(format!(
                "interval must be between {} and {} seconds, got {}",
                MIN_INTERVAL_SECS, MAX_INTERVAL_SECS, interval_secs
            )));
        }

        let timeout_secs = self.timeout.as_secs();
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(Error::validation(format!(
                "timeout must be between {} and {} seconds, got {}",
                MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS, timeout_secs
            )));
        }

        Ok(())
    }
}

/// Converts raw TOML record entries, collecting every problem into one
/// validation error so the user sees all mistakes at once
fn parse_records(raw: Vec<TomlRecord>) -> std::result::Result<Vec<RecordSpec>, Error> {
    let mut errors = Vec::new();
    let mut records = Vec::new();

    for (i, entry) in raw.into_iter().enumerate() {
        let index = i + 1;
        let rr = match entry.rr {
            Some(rr) if !rr.trim().is_empty() => Some(rr),
            _ => {
                errors.push(format!("record {} is missing rr", index));
                None
            }
        };
        let record_type = match entry.record_type.as_deref().and_then(RecordType::parse) {
            Some(record_type) => Some(record_type),
            None => {
                errors.push(format!("record {} type must be A or AAAA", index));
                None
            }
        };
        if let (Some(rr), Some(record_type)) = (rr, record_type) {
            records.push(RecordSpec {
                rr,
                record_type,
                ttl: entry.ttl,
            });
        }
    }

    if errors.is_empty() {
        Ok(records)
    } else {
        Err(Error::validation(errors.join("; ")))
    }
}

/// TOML configuration file structure
#[derive(Debug, serde::Deserialize)]
struct TomlConfig {
    access_key_id: Option<String>,
    access_key_secret: Option<String>,
    domain: Option<String>,
    region: Option<String>,
    interval: Option<u64>,
    ttl: Option<u64>,
    timeout: Option<u64>,
    verbose: Option<bool>,
    ipv4_services: Option<Vec<String>>,
    ipv6_services: Option<Vec<String>>,
    records: Option<Vec<TomlRecord>>,
}

/// One `[[records]]` entry as it appears in the file
#[derive(Debug, serde::Deserialize)]
struct TomlRecord {
    rr: Option<String>,
    #[serde(rename = "type")]
    record_type: Option<String>,
    ttl: Option<u64>,
}

//==============================================================================
// Tests
//==============================================================================
