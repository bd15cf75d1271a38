//! Validation utilities for aliddns
//!
//! This module provides validation functions for public IP address strings
//! returned by echo services and for configured RR host labels.

use crate::constants::{MAX_LABEL_LENGTH, MAX_RR_LENGTH};
use crate::error::{Error, Result};
use crate::resolver::IpFamily;

/// Validates that a string is a well-formed textual IPv4 address
///
/// Exactly four dot-separated decimal groups, each in `0..=255`, with no
/// leading or trailing garbage. Leading zeros inside a group are tolerated
/// (`"01"` parses as `1`), matching what the echo services emit in practice.
///
/// # Examples
///
/// ```
/// use aliddns::validation::is_valid_ipv4;
///
/// assert!(is_valid_ipv4("203.0.113.7"));
/// assert!(is_valid_ipv4("0.0.0.0"));
/// assert!(!is_valid_ipv4("256.1.1.1"));
/// assert!(!is_valid_ipv4("192.168.1"));
/// assert!(!is_valid_ipv4("1.2.3.4 "));
/// ```
pub fn is_valid_ipv4(ip: &str) -> bool {
    let groups: Vec<&str> = ip.split('.').collect();
    if groups.len() != 4 {
        return false;
    }
    groups.iter().all(|group| {
        !group.is_empty()
            && group.chars().all(|c| c.is_ascii_digit())
            && group.parse::<u32>().is_ok_and(|n| n <= 255)
    })
}

/// Validates that a string is plausibly a textual IPv6 address
///
/// This is a permissive syntactic check, not full RFC 4291 conformance:
/// the string must consist of hexadecimal digits and colons only, contain
/// at least one colon, and contain at most one `::` compression marker.
/// It exists to reject echo-service responses that are error pages or
/// IPv4 addresses, not to catalogue every invalid IPv6 spelling.
///
/// # Examples
///
/// ```
/// use aliddns::validation::is_valid_ipv6;
///
/// assert!(is_valid_ipv6("2001:db8::1"));
/// assert!(is_valid_ipv6("fe80:0:0:0:0:0:0:1"));
/// assert!(!is_valid_ipv6("1::2::3"));
/// assert!(!is_valid_ipv6("2001:db8::g"));
/// assert!(!is_valid_ipv6("192.168.1.1"));
/// ```
pub fn is_valid_ipv6(ip: &str) -> bool {
    if ip.is_empty() || !ip.contains(':') {
        return false;
    }
    if !ip.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
        return false;
    }
    ip.matches("::").count() <= 1
}

/// Validates an IP string against the expected address family
pub fn is_valid_ip(ip: &str, family: IpFamily) -> bool {
    match family {
        IpFamily::V4 => is_valid_ipv4(ip),
        IpFamily::V6 => is_valid_ipv6(ip),
    }
}

/// Validates a configured RR host label
///
/// Accepts `@` for the zone apex, wildcard labels (`*`), and dotted
/// multi-label prefixes (`a.b`). Labels follow LDH rules plus underscore;
/// length limits are the usual 63 per label / 253 total.
///
/// # Errors
///
/// Returns [`Error::Validation`] with a descriptive message when the RR
/// is empty, contains spaces or invalid characters, has an empty label,
/// or exceeds the length limits.
pub fn validate_rr(rr: &str) -> Result<()> {
    let trimmed = rr.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("rr cannot be empty"));
    }
    if trimmed == "@" {
        return Ok(());
    }
    if trimmed.contains(' ') {
        return Err(Error::validation("rr cannot contain spaces"));
    }
    if trimmed.len() > MAX_RR_LENGTH {
        return Err(Error::validation(format!(
            "rr too long (max {} characters, got {})",
            MAX_RR_LENGTH,
            trimmed.len()
        )));
    }
    if trimmed.starts_with('.') || trimmed.ends_with('.') {
        return Err(Error::validation("rr cannot start or end with a dot"));
    }

    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(Error::validation("rr contains empty label"));
        }
        if label == "*" {
            continue;
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(Error::validation(format!(
                "rr label too long (max {} characters, got {})",
                MAX_LABEL_LENGTH,
                label.len()
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::validation(
                "rr label cannot start or end with hyphen",
            ));
        }
        for ch in label.chars() {
            if !ch.is_ascii_alphanumeric() && ch != '-' && ch != '_' {
                return Err(Error::validation(format!(
                    "rr contains invalid character: '{}' (allowed: letters, digits, '-', '_', or wildcard labels)",
                    ch
                )));
            }
        }
    }

    Ok(())
}

//==============================================================================
// Tests
//==============================================================================
