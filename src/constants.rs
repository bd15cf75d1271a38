//! Common constants used throughout the aliddns application

//==============================================================================
// Alidns API Constants
//==============================================================================

/// Alidns RPC API version
pub const ALIDNS_API_VERSION: &str = "2015-01-09";

/// User agent string for outgoing HTTP requests
pub const USER_AGENT: &str = "aliddns/1.0";

/// Default Alidns region
pub const DEFAULT_REGION: &str = "cn-hangzhou";

//==============================================================================
// IP Echo Services
//==============================================================================

/// Default IPv4 echo services (plain GET, response body is the address)
pub const DEFAULT_IPV4_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://ipinfo.io/ip",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
    "https://ident.me",
    "https://myexternalip.com/raw",
    "https://ipecho.net/plain",
];

/// Default IPv6 echo services (resolve only over IPv6 transport)
pub const DEFAULT_IPV6_SERVICES: &[&str] = &[
    "https://api64.ipify.org",
    "https://v6.ident.me",
    "https://ipv6.icanhazip.com",
    "https://6.ident.me",
];

//==============================================================================
// Timeout and Interval Constants
//==============================================================================

/// Default per-request timeout for IP echo and provider calls in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Minimum HTTP request timeout in seconds
pub const MIN_TIMEOUT_SECS: u64 = 1;

/// Maximum HTTP request timeout in seconds
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Default daemon sync interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Minimum daemon sync interval in seconds
pub const MIN_INTERVAL_SECS: u64 = 10;

/// Maximum daemon sync interval in seconds
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Per-record sync task deadline in seconds
pub const SYNC_TASK_TIMEOUT_SECS: u64 = 30;

/// Validity window of a cached public IP in seconds
pub const IP_CACHE_TTL_SECS: u64 = 60;

//==============================================================================
// Concurrency Limits
//==============================================================================

/// Upper bound on in-flight IP echo requests per resolution race
pub const MAX_RESOLVE_WORKERS: usize = 5;

/// Upper bound on concurrent record sync tasks per pass
pub const MAX_SYNC_WORKERS: usize = 10;

//==============================================================================
// Retry Constants
//==============================================================================

/// Default number of attempts for retried operations
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay before the first retry in seconds
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 1;

/// Default exponential backoff multiplier
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;

//==============================================================================
// DNS Record Constants
//==============================================================================

/// Default record TTL in seconds, applied when a record has no override
pub const DEFAULT_RECORD_TTL: u64 = 600;

/// Minimum record TTL accepted by configuration validation
pub const MIN_RECORD_TTL: u64 = 1;

/// Maximum record TTL accepted by configuration validation
pub const MAX_RECORD_TTL: u64 = 86_400;

/// Maximum RR name length in characters
pub const MAX_RR_LENGTH: usize = 253;

/// Maximum RR label length in characters
pub const MAX_LABEL_LENGTH: usize = 63;

//==============================================================================
// Environment Variable Names
//==============================================================================

/// Environment variable name for the Alibaba Cloud access key id
pub const ENV_ACCESS_KEY_ID: &str = "ALIDDNS_ACCESS_KEY_ID";

/// Environment variable name for the Alibaba Cloud access key secret
pub const ENV_ACCESS_KEY_SECRET: &str = "ALIDDNS_ACCESS_KEY_SECRET";

/// Environment variable name for the managed domain
pub const ENV_DOMAIN: &str = "ALIDDNS_DOMAIN";

/// Environment variable name for the Alidns region
pub const ENV_REGION: &str = "ALIDDNS_REGION";
