//! Alibaba Cloud DNS (Alidns) API client
//!
//! Speaks the RPC-style API: every operation is a GET against the regional
//! endpoint with a sorted, percent-encoded query string signed with
//! HMAC-SHA1. Uses reqwest with rustls for HTTP requests.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde::Deserialize;
use sha1::Sha1;
use tracing::{debug, info};
use urlencoding::encode;
use zeroize::Zeroizing;

use crate::constants::{ALIDNS_API_VERSION, USER_AGENT};
use crate::error::{Error, Result};
use crate::provider::{CreateOutcome, DnsProvider, ProviderRecord, RecordType};

type HmacSha1 = Hmac<Sha1>;

//==============================================================================
// Wire Types
//==============================================================================

#[derive(Debug, Deserialize)]
struct DescribeDomainRecordsResponse {
    #[serde(rename = "DomainRecords", default)]
    domain_records: DomainRecords,
}

#[derive(Debug, Default, Deserialize)]
struct DomainRecords {
    #[serde(rename = "Record", default)]
    record: Vec<WireRecord>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(rename = "RecordId")]
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AddDomainRecordResponse {
    #[serde(rename = "RecordId")]
    record_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "Code")]
    code: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

//==============================================================================
// Client
//==============================================================================

/// Alidns API client implementing [`DnsProvider`]
pub struct AlidnsClient {
    access_key_id: String,
    access_key_secret: Zeroizing<String>,
    endpoint: String,
    client: reqwest::Client,
}

impl AlidnsClient {
    /// Creates a client for the given region
    ///
    /// # Arguments
    ///
    /// * `access_key_id` - Alibaba Cloud access key id
    /// * `access_key_secret` - matching access key secret
    /// * `region` - Alidns region (e.g. "cn-hangzhou")
    /// * `timeout` - connect and request timeout for every API call
    pub fn new(
        access_key_id: &str,
        access_key_secret: &str,
        region: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            access_key_id: access_key_id.to_string(),
            access_key_secret: Zeroizing::new(access_key_secret.to_string()),
            endpoint: format!("https://alidns.{}.aliyuncs.com", region),
            client,
        })
    }

    /// Issues one signed RPC call and returns the raw response body
    async fn call(&self, action: &str, params: Vec<(&'static str, String)>) -> Result<String> {
        let mut all: BTreeMap<String, String> = BTreeMap::new();
        all.insert("Action".to_string(), action.to_string());
        all.insert("Format".to_string(), "JSON".to_string());
        all.insert("Version".to_string(), ALIDNS_API_VERSION.to_string());
        all.insert("AccessKeyId".to_string(), self.access_key_id.clone());
        all.insert("SignatureMethod".to_string(), "HMAC-SHA1".to_string());
        all.insert("SignatureVersion".to_string(), "1.0".to_string());
        all.insert("SignatureNonce".to_string(), nonce());
        all.insert(
            "Timestamp".to_string(),
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        for (key, value) in params {
            all.insert(key.to_string(), value);
        }

        let signature = self.sign("GET", &all)?;
        all.insert("Signature".to_string(), signature);

        let url = format!("{}/?{}", self.endpoint, canonical_query(&all));
        debug!("GET {} ({})", action, self.endpoint);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(map_api_error(status, &body))
        }
    }

    /// Signs the canonicalized request per the Alidns signature scheme
    ///
    /// `StringToSign = Method & encode("/") & encode(canonical_query)`,
    /// keyed with `access_key_secret + "&"`, base64-encoded.
    fn sign(&self, method: &str, params: &BTreeMap<String, String>) -> Result<String> {
        let string_to_sign = format!(
            "{}&{}&{}",
            method,
            encode("/"),
            encode(&canonical_query(params))
        );
        let key = Zeroizing::new(format!("{}&", self.access_key_secret.as_str()));
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| Error::provider_client("SignatureError", e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl DnsProvider for AlidnsClient {
    async fn describe(
        &self,
        domain: &str,
        rr: &str,
        record_type: RecordType,
    ) -> Result<Option<ProviderRecord>> {
        let body = self
            .call(
                "DescribeDomainRecords",
                vec![
                    ("DomainName", domain.to_string()),
                    ("RRKeyWord", rr.to_string()),
                    ("TypeKeyWord", record_type.as_str().to_string()),
                    ("SearchMode", "EXACT".to_string()),
                ],
            )
            .await?;
        let parsed: DescribeDomainRecordsResponse = parse_body(&body)?;
        Ok(exact_match(parsed.domain_records.record, rr, record_type))
    }

    async fn create(
        &self,
        domain: &str,
        rr: &str,
        record_type: RecordType,
        value: &str,
        ttl: u64,
    ) -> Result<CreateOutcome> {
        let result = self
            .call(
                "AddDomainRecord",
                vec![
                    ("DomainName", domain.to_string()),
                    ("RR", rr.to_string()),
                    ("Type", record_type.as_str().to_string()),
                    ("Value", value.to_string()),
                    ("TTL", ttl.to_string()),
                ],
            )
            .await;

        match result {
            Ok(body) => {
                let parsed: AddDomainRecordResponse = parse_body(&body)?;
                info!("created record {}.{} -> {}", rr, domain, value);
                Ok(CreateOutcome::Created(parsed.record_id))
            }
            Err(Error::ProviderClient { ref code, .. }) if is_duplicate_code(code) => {
                info!("record {}.{} already exists", rr, domain);
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        record_id: &str,
        rr: &str,
        record_type: RecordType,
        value: &str,
        ttl: u64,
    ) -> Result<()> {
        self.call(
            "UpdateDomainRecord",
            vec![
                ("RecordId", record_id.to_string()),
                ("RR", rr.to_string()),
                ("Type", record_type.as_str().to_string()),
                ("Value", value.to_string()),
                ("TTL", ttl.to_string()),
            ],
        )
        .await?;
        info!("updated record {} ({}) -> {}", rr, record_id, value);
        Ok(())
    }
}

//==============================================================================
// Helpers
//==============================================================================

/// Sorted, percent-encoded query string; BTreeMap iteration gives the
/// byte-order key sorting the signature scheme requires
fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Unique-enough nonce for request replay protection
fn nonce() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}", nanos, std::process::id())
}

fn parse_body<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::provider_client("MalformedResponse", e.to_string()))
}

/// Picks the record matching exactly rr+type; the EXACT search mode already
/// narrows server-side, this guards against keyword-style matches
fn exact_match(records: Vec<WireRecord>, rr: &str, record_type: RecordType) -> Option<ProviderRecord> {
    records
        .into_iter()
        .find(|r| r.rr == rr && r.record_type == record_type.as_str())
        .map(|r| ProviderRecord {
            id: r.record_id,
            rr: r.rr,
            record_type,
            value: r.value,
        })
}

fn is_duplicate_code(code: &str) -> bool {
    code.contains("DomainRecordDuplicate") || code.contains("AlreadyExists")
}

fn map_api_error(status: StatusCode, body: &str) -> Error {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or(ApiErrorBody {
        code: None,
        message: None,
    });
    let code = parsed
        .code
        .unwrap_or_else(|| format!("HTTP{}", status.as_u16()));
    let message = parsed
        .message
        .unwrap_or_else(|| "no error message in response".to_string());

    if status.is_server_error() {
        Error::ProviderServer { code, message }
    } else {
        Error::ProviderClient { code, message }
    }
}

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_response_parsing() {
        let json = r#"{
            "TotalCount": 2,
            "PageSize": 20,
            "RequestId": "536E9CAD-DB30-4647-AC87-AA5CC38C5382",
            "DomainRecords": {
                "Record": [
                    {
                        "RecordId": "9999985",
                        "RR": "www",
                        "Type": "A",
                        "Value": "203.0.113.7",
                        "TTL": 600,
                        "Line": "default",
                        "Status": "ENABLE"
                    },
                    {
                        "RecordId": "9999986",
                        "RR": "wwwtest",
                        "Type": "A",
                        "Value": "203.0.113.9",
                        "TTL": 600
                    }
                ]
            }
        }"#;

        let parsed: DescribeDomainRecordsResponse = parse_body(json).unwrap();
        assert_eq!(parsed.domain_records.record.len(), 2);

        let matched = exact_match(parsed.domain_records.record, "www", RecordType::A)
            .expect("exact match");
        assert_eq!(matched.id, "9999985");
        assert_eq!(matched.value, "203.0.113.7");
    }

    #[test]
    fn test_describe_response_without_records() {
        let json = r#"{"TotalCount": 0, "RequestId": "x"}"#;
        let parsed: DescribeDomainRecordsResponse = parse_body(json).unwrap();
        assert!(parsed.domain_records.record.is_empty());
    }

    #[test]
    fn test_exact_match_filters_type_and_rr() {
        let records = vec![
            WireRecord {
                record_id: "1".to_string(),
                rr: "www".to_string(),
                record_type: "AAAA".to_string(),
                value: "2001:db8::1".to_string(),
            },
            WireRecord {
                record_id: "2".to_string(),
                rr: "wwwx".to_string(),
                record_type: "A".to_string(),
                value: "203.0.113.9".to_string(),
            },
        ];
        assert!(exact_match(records, "www", RecordType::A).is_none());
    }

    #[test]
    fn test_map_api_error_server_vs_client() {
        let body = r#"{"Code": "InternalError", "Message": "backend failure"}"#;
        let err = map_api_error(StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(err, Error::provider_server("InternalError", "backend failure"));

        let body = r#"{"Code": "InvalidAccessKeyId.NotFound", "Message": "bad key"}"#;
        let err = map_api_error(StatusCode::NOT_FOUND, body);
        assert_eq!(
            err,
            Error::provider_client("InvalidAccessKeyId.NotFound", "bad key")
        );
    }

    #[test]
    fn test_map_api_error_unparseable_body() {
        let err = map_api_error(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        match err {
            Error::ProviderServer { code, .. } => assert_eq!(code, "HTTP502"),
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn test_is_duplicate_code() {
        assert!(is_duplicate_code("DomainRecordDuplicate"));
        assert!(is_duplicate_code("Record.AlreadyExists"));
        assert!(!is_duplicate_code("InvalidRR.Malformed"));
    }

    #[test]
    fn test_canonical_query_is_sorted_and_encoded() {
        let mut params = BTreeMap::new();
        params.insert("Type".to_string(), "A".to_string());
        params.insert("Action".to_string(), "AddDomainRecord".to_string());
        params.insert("RR".to_string(), "my host".to_string());

        let query = canonical_query(&params);
        assert_eq!(query, "Action=AddDomainRecord&RR=my%20host&Type=A");
    }

    #[test]
    fn test_signature_is_base64_of_sha1_digest() {
        let client = AlidnsClient::new("testid", "testsecret", "cn-hangzhou", Duration::from_secs(5))
            .expect("client");
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "DescribeDomainRecords".to_string());
        params.insert("DomainName".to_string(), "example.com".to_string());

        let signature = client.sign("GET", &params).expect("sign");
        // A SHA-1 digest is 20 bytes; its base64 encoding is 28 characters.
        assert_eq!(signature.len(), 28);
        assert!(BASE64.decode(&signature).is_ok());

        // Deterministic for identical input.
        assert_eq!(signature, client.sign("GET", &params).expect("sign"));
    }

    #[test]
    fn test_nonce_changes_between_calls() {
        let first = nonce();
        std::thread::sleep(Duration::from_millis(2));
        assert_ne!(first, nonce());
    }
}
