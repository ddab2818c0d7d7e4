//! IPv4 codec and log-line extraction.
//!
//! All matching works on the canonical `u32` representation of an IPv4
//! address (big-endian interpretation of the four octets). This module
//! provides the string codec and the per-line extractor used on the
//! ingest hot path.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::WatchError;

/// Parse a dotted-decimal IPv4 string into its `u32` representation.
///
/// Fails unless the input splits into exactly four decimal octets in
/// `[0, 255]`.
///
/// # Examples
/// ```
/// use riskwatch::ip::parse_ipv4;
/// assert_eq!(parse_ipv4("10.0.0.1").unwrap(), 0x0a000001);
/// assert!(parse_ipv4("10.0.0.256").is_err());
/// assert!(parse_ipv4("10.0.0").is_err());
/// ```
pub fn parse_ipv4(s: &str) -> Result<u32, WatchError> {
    let mut result: u32 = 0;
    let mut octets = 0;
    for part in s.split('.') {
        let value: u32 = part
            .parse()
            .map_err(|_| WatchError::InvalidAddress(s.to_string()))?;
        if value > 255 || octets == 4 {
            return Err(WatchError::InvalidAddress(s.to_string()));
        }
        result = (result << 8) | value;
        octets += 1;
    }
    if octets != 4 {
        return Err(WatchError::InvalidAddress(s.to_string()));
    }
    Ok(result)
}

/// Format a `u32` back into dotted-decimal notation.
///
/// # Examples
/// ```
/// use riskwatch::ip::format_ipv4;
/// assert_eq!(format_ipv4(0x0a000001), "10.0.0.1");
/// ```
pub fn format_ipv4(ip: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (ip >> 24) & 0xff,
        (ip >> 16) & 0xff,
        (ip >> 8) & 0xff,
        ip & 0xff
    )
}

fn ipv4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b((25[0-5]|(2[0-4]|1\d|[1-9]|)\d)\.?\b){4}\b").expect("ipv4 pattern")
    })
}

/// Extract the first IPv4 literal from a log line.
///
/// Lines can mention several addresses (proxy chains, forwarded-for
/// headers); only the first match is reported. Returns `None` when the
/// line contains no IPv4 literal.
pub fn extract_ipv4(line: &str) -> Option<u32> {
    let found = ipv4_regex().find(line)?;
    parse_ipv4(found.as_str()).ok()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// String -> u32 -> string is the identity on canonical addresses.
        #[test]
        fn prop_roundtrip(a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255) {
            let s = format!("{}.{}.{}.{}", a, b, c, d);
            let ip = parse_ipv4(&s).unwrap();
            prop_assert_eq!(format_ipv4(ip), s);
        }

        /// u32 -> string -> u32 is the identity everywhere.
        #[test]
        fn prop_roundtrip_numeric(ip: u32) {
            prop_assert_eq!(parse_ipv4(&format_ipv4(ip)).unwrap(), ip);
        }

        /// The extractor finds a lone canonical address wherever it sits in a
        /// line, as long as a word boundary separates it from its neighbors.
        #[test]
        fn prop_extract_finds_address(a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255,
                                      prefix in "[ =:,-]{0,12}", suffix in "[ =:,-]{0,12}") {
            let s = format!("{}.{}.{}.{}", a, b, c, d);
            let ip = parse_ipv4(&s).unwrap();
            let line = format!("{}{}{}", prefix, s, suffix);
            prop_assert_eq!(extract_ipv4(&line), Some(ip));
        }

        /// The extractor never panics on arbitrary input.
        #[test]
        fn prop_extract_no_panic(line in ".{0,200}") {
            let _ = extract_ipv4(&line);
        }
    }
}
