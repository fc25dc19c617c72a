//! The fixed catalog of blocklist categories.
//!
//! Each category is a compile-time constant: a name, a risk tier, an entry
//! kind (`ip` or `email`), and the feed URL it is refreshed from. The catalog
//! never changes at runtime; the loader and classifier both iterate it by
//! reference rather than constructing it per call.

use std::sync::LazyLock;

use crate::types::Tier;

/// What kind of entry a category's feed contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Ip,
    Email,
}

/// One row of the compile-time category catalog.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub name: &'static str,
    pub tier: Tier,
    pub kind: Kind,
    pub feed_url: &'static str,
}

macro_rules! category {
    ($name:literal, $tier:expr, $kind:expr, $url:literal) => {
        Category {
            name: $name,
            tier: $tier,
            kind: $kind,
            feed_url: $url,
        }
    };
}

/// The full catalog, in the order tiers are consulted by the IP
/// sub-classifier: high, then medium, then low.
pub static CATALOG: &[Category] = &[
    category!(
        "criminal_network_ip",
        Tier::High,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/criminal_network_ip.txt"
    ),
    category!(
        "malicious_ip",
        Tier::High,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/malicious_ip.txt"
    ),
    category!(
        "tor_network_ip",
        Tier::High,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/tor_network_ip.txt"
    ),
    category!(
        "recent_attacker_ip",
        Tier::High,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/recent_attacker_ip.txt"
    ),
    category!(
        "disposable_email",
        Tier::High,
        Kind::Email,
        "https://blocklist.riskgate.invalid/feeds/disposable_email.txt"
    ),
    category!(
        "week_attacker_ip",
        Tier::Medium,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/week_attacker_ip.txt"
    ),
    category!(
        "suspicious_ip",
        Tier::Medium,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/suspicious_ip.txt"
    ),
    category!(
        "vpn_ip",
        Tier::Medium,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/vpn_ip.txt"
    ),
    category!(
        "datacenter_ip",
        Tier::Medium,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/datacenter_ip.txt"
    ),
    category!(
        "privacy_email",
        Tier::Medium,
        Kind::Email,
        "https://blocklist.riskgate.invalid/feeds/privacy_email.txt"
    ),
    category!(
        "reported_ip",
        Tier::Low,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/reported_ip.txt"
    ),
    category!(
        "old_attacker_ip",
        Tier::Low,
        Kind::Ip,
        "https://blocklist.riskgate.invalid/feeds/old_attacker_ip.txt"
    ),
];

/// High-tier IP categories, in the strict consultation order.
pub static IP_ORDER_HIGH: &[&str] = &[
    "criminal_network_ip",
    "malicious_ip",
    "tor_network_ip",
    "recent_attacker_ip",
];

/// Medium-tier IP categories, in consultation order.
pub static IP_ORDER_MEDIUM: &[&str] = &["week_attacker_ip", "suspicious_ip", "vpn_ip", "datacenter_ip"];

/// Low-tier IP categories, in consultation order.
pub static IP_ORDER_LOW: &[&str] = &["reported_ip", "old_attacker_ip"];

/// All IP categories in the exact priority order the classifier scans them.
pub static IP_SCAN_ORDER: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    IP_ORDER_HIGH
        .iter()
        .chain(IP_ORDER_MEDIUM)
        .chain(IP_ORDER_LOW)
        .copied()
        .collect()
});

/// The reserved registry slot name for the MX result cache.
pub const MX_CACHE_NAME: &str = "mx_cache";

pub fn lookup(name: &str) -> Option<&'static Category> {
    CATALOG.iter().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_twelve_categories() {
        assert_eq!(CATALOG.len(), 12);
    }

    #[test]
    fn scan_order_matches_precedence() {
        assert_eq!(IP_SCAN_ORDER[0], "criminal_network_ip");
        assert_eq!(IP_SCAN_ORDER[4], "week_attacker_ip");
        assert_eq!(IP_SCAN_ORDER[8], "reported_ip");
        assert_eq!(IP_SCAN_ORDER[9], "old_attacker_ip");
        assert_eq!(IP_SCAN_ORDER.len(), 10);
    }

    #[test]
    fn lookup_finds_known_category() {
        let cat = lookup("disposable_email").expect("category exists");
        assert_eq!(cat.kind, Kind::Email);
        assert_eq!(cat.tier, Tier::High);
    }
}
