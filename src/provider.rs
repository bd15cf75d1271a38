//! DNS provider abstraction layer
//!
//! This module defines the capability the reconciler consumes: look up one
//! record by exact rr+type, create a record, update a record. Concrete
//! providers (see [`crate::alidns`]) implement it; tests substitute mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::resolver::IpFamily;

//==============================================================================
// Types
//==============================================================================

/// DNS record type managed by this system
///
/// Only address records are supported; the record type determines which
/// address family is resolved for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    AAAA,
}

impl RecordType {
    /// Wire representation of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
        }
    }

    /// Address family resolved for this record type
    pub fn family(self) -> IpFamily {
        match self {
            RecordType::A => IpFamily::V4,
            RecordType::AAAA => IpFamily::V6,
        }
    }

    /// Parses the configuration/wire spelling of a record type
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::AAAA),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The provider's view of an existing DNS record
///
/// Fetched fresh for every reconciliation; never cached beyond one
/// reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    /// Opaque provider-assigned record handle
    pub id: String,
    /// Host label of the record
    pub rr: String,
    /// Record type
    pub record_type: RecordType,
    /// Current record value (an IP address)
    pub value: String,
}

/// Outcome of a create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The record was created; carries the new record id
    Created(String),
    /// The provider reported a duplicate; a concurrent creator won the race
    AlreadyExists,
}

//==============================================================================
// Trait
//==============================================================================

/// Abstract record-management capability of a DNS provider
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Looks up the record matching exactly `rr` + `record_type` under
    /// `domain`, or `None` when no such record exists
    async fn describe(
        &self,
        domain: &str,
        rr: &str,
        record_type: RecordType,
    ) -> Result<Option<ProviderRecord>>;

    /// Creates a record; a provider-side duplicate conflict is reported as
    /// [`CreateOutcome::AlreadyExists`], not as an error
    async fn create(
        &self,
        domain: &str,
        rr: &str,
        record_type: RecordType,
        value: &str,
        ttl: u64,
    ) -> Result<CreateOutcome>;

    /// Rewrites the record identified by `record_id` with a new value and TTL
    async fn update(
        &self,
        record_id: &str,
        rr: &str,
        record_type: RecordType,
        value: &str,
        ttl: u64,
    ) -> Result<()>;
}

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_round_trip() {
        assert_eq!(RecordType::parse("A"), Some(RecordType::A));
        assert_eq!(RecordType::parse("AAAA"), Some(RecordType::AAAA));
        assert_eq!(RecordType::parse("TXT"), None);
        assert_eq!(RecordType::parse("a"), None);
        assert_eq!(RecordType::A.as_str(), "A");
        assert_eq!(RecordType::AAAA.to_string(), "AAAA");
    }

    #[test]
    fn test_record_type_family() {
        assert_eq!(RecordType::A.family(), IpFamily::V4);
        assert_eq!(RecordType::AAAA.family(), IpFamily::V6);
    }

    #[test]
    fn test_record_type_serde_spelling() {
        assert_eq!(serde_json::to_string(&RecordType::AAAA).unwrap(), "\"AAAA\"");
        let parsed: RecordType = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(parsed, RecordType::A);
    }

    #[test]
    fn test_provider_record_equality() {
        let a = ProviderRecord {
            id: "r1".to_string(),
            rr: "www".to_string(),
            record_type: RecordType::A,
            value: "203.0.113.7".to_string(),
        };
        let b = a.clone();
        assert_eq!(a, b);
    }
}
