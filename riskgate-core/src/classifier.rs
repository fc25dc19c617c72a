//! Risk Classifier: the policy engine merging IP and email
//! verdicts into a final `(level, reasons)` tuple.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::category::{IP_SCAN_ORDER, MX_CACHE_NAME};
use crate::index::Registry;
use crate::matcher;
use crate::mx::MxResolver;
use crate::types::{MxStatus, SubVerdict, Tier, Verdict};

/// Lowercased domains treated as trusted free-mail providers.
static TRUSTED_FREE_PROVIDERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "gmail.com",
        "googlemail.com",
        "outlook.com",
        "hotmail.com",
        "live.com",
        "msn.com",
        "yahoo.com",
        "ymail.com",
        "icloud.com",
        "me.com",
        "mac.com",
        "aol.com",
        "protonmail.com",
        "proton.me",
        "zoho.com",
    ]
    .into_iter()
    .collect()
});

/// Request payload: `classify({email?, ip?})`.
#[derive(Debug, Clone, Default)]
pub struct ClassifyRequest {
    pub email: Option<String>,
    pub ip: Option<String>,
}

/// The IP sub-classifier: the first category hit (in strict tier order)
/// wins.
fn classify_ip(registry: &Registry, ip: &str) -> SubVerdict {
    for name in IP_SCAN_ORDER.iter() {
        let Some(index) = registry.handle(name) else {
            continue;
        };
        if matcher::matches(&index, ip) {
            let tier = crate::category::lookup(name).expect("catalog entry").tier;
            return SubVerdict::new(tier, *name);
        }
    }
    SubVerdict::none()
}

fn domain_of(email: &str) -> String {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// The email sub-classifier, consulting disposable/privacy indexes, the
/// trusted-provider set, and finally the MX cache/live lookup in that order.
async fn classify_email(registry: &Registry, resolver: &MxResolver, email: &str) -> SubVerdict {
    let domain = domain_of(email);
    if domain.is_empty() {
        return SubVerdict::none();
    }

    if registry.lookup("disposable_email", &domain) {
        return SubVerdict::new(Tier::High, "disposable_email");
    }
    if registry.lookup("privacy_email", &domain) {
        return SubVerdict::new(Tier::Medium, "privacy_email");
    }
    if TRUSTED_FREE_PROVIDERS.contains(domain.as_str()) {
        return SubVerdict::new(Tier::Low, "free_email");
    }

    let status = match registry.mx_get(&domain) {
        Some(status) => status,
        None => {
            let resolved = match resolver.resolve(&domain).await {
                Ok(records) if !records.is_empty() => MxStatus::ValidMx,
                // Empty record set, lookup failure, or rate-limited all
                // collapse to `no_mx`.
                _ => MxStatus::NoMx,
            };
            registry.mx_insert_if_absent(&domain, resolved);
            // Another writer may have beaten us to the insert; read back the
            // cached value so concurrent callers observe a consistent result.
            registry.mx_get(&domain).unwrap_or(resolved)
        }
    };

    match status {
        MxStatus::ValidMx => SubVerdict::none(),
        MxStatus::NoMx => SubVerdict::new(Tier::High, "invalid_email"),
    }
}

/// Merge two sub-verdicts under the priority/override algebra.
/// `cur` is the IP result (classified first); `new` is the email result.
fn merge(cur: SubVerdict, new: SubVerdict) -> Verdict {
    let (low_to_none, none_to_low) = (
        cur.tier == Tier::Low && new.tier == Tier::None,
        cur.tier == Tier::None && new.tier == Tier::Low,
    );

    let final_tier = if low_to_none {
        Tier::None
    } else if none_to_low {
        Tier::Low
    } else {
        cur.tier.max(new.tier)
    };

    let reasons = if low_to_none {
        Vec::new()
    } else if final_tier == new.tier && new.tier != Tier::None {
        unique_preserving_order(new.reasons.iter().chain(cur.reasons.iter()))
    } else if final_tier == cur.tier {
        cur.reasons
    } else {
        unique_preserving_order(new.reasons.iter().chain(cur.reasons.iter()))
    };

    Verdict {
        level: final_tier,
        reasons,
    }
}

fn unique_preserving_order<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.as_str()) {
            out.push(item.clone());
        }
    }
    out
}

/// Pure function `classify({email?, ip?}) -> {level, reasons[]}`. Never
/// fails: any MX error collapses to `no_mx` before it reaches the merge.
pub async fn classify(registry: &Registry, resolver: &MxResolver, request: &ClassifyRequest) -> Verdict {
    let ip_verdict = match &request.ip {
        Some(ip) => classify_ip(registry, ip),
        None => SubVerdict::none(),
    };
    let email_verdict = match &request.email {
        Some(email) => classify_email(registry, resolver, email).await,
        None => SubVerdict::none(),
    };

    merge(ip_verdict, email_verdict)
}

/// Ensure the reserved `mx_cache` name is never confused with a blocklist
/// category; referenced by the loader's boot sequence.
pub fn mx_cache_slot_name() -> &'static str {
    MX_CACHE_NAME
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(category: &str, entries: &[&str]) -> Registry {
        let reg = Registry::new();
        reg.create(category);
        reg.load_staging(
            &format!("staging:{category}"),
            entries.iter().map(|s| s.to_string()).collect(),
        );
        reg.swap(&format!("staging:{category}"), category).unwrap();
        reg
    }

    #[tokio::test]
    async fn empty_request_is_none() {
        let registry = Registry::new();
        let resolver = MxResolver::new();
        let verdict = classify(&registry, &resolver, &ClassifyRequest::default()).await;
        assert_eq!(verdict.level, Tier::None);
        assert!(verdict.reasons.is_empty());
    }

    #[tokio::test]
    async fn disposable_email_is_high_regardless_of_mx_cache() {
        let registry = registry_with("disposable_email", &["tempmail.com"]);
        registry.mx_insert_if_absent("tempmail.com", MxStatus::ValidMx);
        let resolver = MxResolver::new();

        let verdict = classify(
            &registry,
            &resolver,
            &ClassifyRequest {
                email: Some("test@tempmail.com".to_string()),
                ip: None,
            },
        )
        .await;

        assert_eq!(verdict.level, Tier::High);
        assert_eq!(verdict.reasons, vec!["disposable_email".to_string()]);
    }

    #[tokio::test]
    async fn ip_hit_reports_first_matching_category() {
        let registry = registry_with("tor_network_ip", &["185.220.101.1"]);
        let resolver = MxResolver::new();

        let verdict = classify(
            &registry,
            &resolver,
            &ClassifyRequest {
                ip: Some("185.220.101.1".to_string()),
                email: None,
            },
        )
        .await;

        assert_eq!(verdict.level, Tier::High);
        assert_eq!(verdict.reasons, vec!["tor_network_ip".to_string()]);
    }

    #[tokio::test]
    async fn mx_cache_hit_skips_live_lookup() {
        // `MxResolver::new()` carries no nameservers, so any call that
        // actually reaches `resolve` collapses to `no_mx` / Tier::High. A
        // pre-populated cache entry must short-circuit before that happens.
        let registry = Registry::new();
        registry.mx_insert_if_absent("acme.com", MxStatus::ValidMx);
        let resolver = MxResolver::new();

        let verdict = classify(
            &registry,
            &resolver,
            &ClassifyRequest {
                email: Some("john@acme.com".to_string()),
                ip: None,
            },
        )
        .await;

        assert_eq!(verdict.level, Tier::None);
        assert_eq!(registry.mx_get("acme.com"), Some(MxStatus::ValidMx));
    }

    #[tokio::test]
    async fn free_email_with_clean_ip_is_low() {
        let registry = Registry::new();
        let resolver = MxResolver::new();

        let verdict = classify(
            &registry,
            &resolver,
            &ClassifyRequest {
                email: Some("john@gmail.com".to_string()),
                ip: Some("8.8.8.8".to_string()),
            },
        )
        .await;

        assert_eq!(verdict.level, Tier::Low);
        assert_eq!(verdict.reasons, vec!["free_email".to_string()]);
    }

    #[tokio::test]
    async fn corporate_email_cleans_low_tier_ip() {
        let registry = registry_with("reported_ip", &["198.51.100.1"]);
        registry.mx_insert_if_absent("acme.com", MxStatus::ValidMx);
        let resolver = MxResolver::new();

        let verdict = classify(
            &registry,
            &resolver,
            &ClassifyRequest {
                email: Some("john@acme.com".to_string()),
                ip: Some("198.51.100.1".to_string()),
            },
        )
        .await;

        assert_eq!(verdict.level, Tier::None);
        assert!(verdict.reasons.is_empty());
    }

    #[tokio::test]
    async fn high_tier_ip_dominates_valid_corporate_email() {
        let registry = registry_with("tor_network_ip", &["185.220.101.1"]);
        registry.mx_insert_if_absent("acme.com", MxStatus::ValidMx);
        let resolver = MxResolver::new();

        let verdict = classify(
            &registry,
            &resolver,
            &ClassifyRequest {
                email: Some("john@acme.com".to_string()),
                ip: Some("185.220.101.1".to_string()),
            },
        )
        .await;

        assert_eq!(verdict.level, Tier::High);
        assert_eq!(verdict.reasons, vec!["tor_network_ip".to_string()]);
    }

    #[test]
    fn merge_algebra_is_numeric_max_outside_special_cells() {
        let cases = [
            (Tier::High, Tier::Medium, Tier::High),
            (Tier::Medium, Tier::Medium, Tier::Medium),
            (Tier::Low, Tier::Low, Tier::Low),
            (Tier::Medium, Tier::None, Tier::Medium),
            (Tier::None, Tier::None, Tier::None),
        ];
        for (cur_tier, new_tier, expected) in cases {
            let cur = SubVerdict {
                tier: cur_tier,
                reasons: vec![],
            };
            let new = SubVerdict {
                tier: new_tier,
                reasons: vec![],
            };
            assert_eq!(merge(cur, new).level, expected);
        }
    }

    #[test]
    fn domain_of_trims_and_lowercases() {
        assert_eq!(domain_of("John@ACME.com "), "acme.com");
        assert_eq!(domain_of("no-at-sign"), "");
    }
}
