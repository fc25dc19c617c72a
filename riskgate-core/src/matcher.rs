//! IP Matcher: exact-IPv4 and CIDR-range membership testing.

use std::sync::Arc;

use tracing::warn;

use crate::index::CategoryIndex;

/// Parse a syntactically valid dotted-quad IPv4 address into its 32-bit
/// unsigned form. Rejects leading `+`, out-of-range octets, and any dot count
/// other than three.
fn parse_ipv4(s: &str) -> Option<u32> {
    let mut octets = [0u32; 4];
    let mut parts = s.split('.');

    for slot in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 {
            return None;
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u32 = part.parse().ok()?;
        if value > 255 {
            return None;
        }
        // Reject non-canonical leading zeros (e.g. "01") to stay strict.
        if part.len() > 1 && part.starts_with('0') {
            return None;
        }
        *slot = value;
    }
    if parts.next().is_some() {
        return None;
    }

    Some((octets[0] << 24) | (octets[1] << 16) | (octets[2] << 8) | octets[3])
}

/// Parse a `base_ip/prefix_len` entry into `(base, mask)`. Returns `None` for
/// malformed entries, which are silently dropped from matching.
pub(crate) fn parse_cidr(entry: &str) -> Option<(u32, u32)> {
    let (base_str, prefix_str) = entry.split_once('/')?;
    let base = parse_ipv4(base_str)?;
    let prefix_len: u32 = prefix_str.parse().ok()?;
    if prefix_len > 32 {
        return None;
    }
    let mask = if prefix_len == 0 {
        0
    } else {
        0xFFFF_FFFFu32 << (32 - prefix_len)
    };
    Some((base & mask, mask))
}

/// Membership test against a category index: exact lookup first, then a CIDR
/// scan. Any input that doesn't parse as a dotted-quad IPv4 returns `false`
/// and logs a warning — it is never reachable via classification, which only
/// ever supplies strings already validated by its own caller, but external
/// callers of this function get the same defensive behavior the source has.
pub fn matches(index: &Arc<CategoryIndex>, ip_string: &str) -> bool {
    let Some(query) = parse_ipv4(ip_string) else {
        warn!(ip = %ip_string, "ip matcher rejected syntactically invalid IPv4");
        return false;
    };

    if index.contains(ip_string) {
        return true;
    }

    index
        .cidr_ranges()
        .iter()
        .any(|(base, mask)| (query & mask) == *base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Registry;

    fn index_with(entries: &[&str]) -> Arc<CategoryIndex> {
        let reg = Registry::new();
        reg.create("t");
        reg.load_staging(
            "staging:t",
            entries.iter().map(|s| s.to_string()).collect(),
        );
        reg.swap("staging:t", "t").unwrap();
        reg.handle("t").unwrap()
    }

    #[test]
    fn exact_match() {
        let idx = index_with(&["1.2.3.4"]);
        assert!(matches(&idx, "1.2.3.4"));
        assert!(!matches(&idx, "1.2.3.5"));
    }

    #[test]
    fn cidr_slash_zero_matches_everything() {
        let idx = index_with(&["0.0.0.0/0"]);
        assert!(matches(&idx, "8.8.8.8"));
        assert!(matches(&idx, "255.255.255.255"));
    }

    #[test]
    fn cidr_slash_32_is_singleton() {
        let idx = index_with(&["10.0.0.1/32"]);
        assert!(matches(&idx, "10.0.0.1"));
        assert!(!matches(&idx, "10.0.0.2"));
    }

    #[test]
    fn cidr_range_membership() {
        let idx = index_with(&["192.168.1.0/24"]);
        assert!(matches(&idx, "192.168.1.100"));
        assert!(!matches(&idx, "192.168.2.1"));

        let idx = index_with(&["10.0.0.0/8"]);
        assert!(matches(&idx, "10.0.0.1"));
    }

    #[test]
    fn malformed_ip_returns_false() {
        let idx = index_with(&["1.2.3.4"]);
        assert!(!matches(&idx, "999.1.1.1"));
        assert!(!matches(&idx, "1.2.3"));
        assert!(!matches(&idx, "+1.2.3.4"));
        assert!(!matches(&idx, "1.2.3.4.5"));
    }

    #[test]
    fn malformed_cidr_entries_are_skipped() {
        let idx = index_with(&["not-a-cidr/abc", "1.2.3.0/24"]);
        assert!(matches(&idx, "1.2.3.1"));
    }
}
