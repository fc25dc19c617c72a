//! DNS MX lookup against a single selected resolver.

use std::net::SocketAddr;
use std::time::Duration;

use hickory_resolver::config::{NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use tracing::debug;

use super::pool::ResolverEntry;
use crate::error::{MxError, MxResult};

/// DNS query timeout.
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Issue a DNS MX query for `domain` using only `resolver` as the
/// nameserver (no fallthrough to system resolvers). Returns the MX hosts
/// sorted ascending by priority; an empty record set is `Ok([])`.
pub async fn lookup_mx(domain: &str, resolver: &ResolverEntry) -> MxResult<Vec<(u16, String)>> {
    let socket = SocketAddr::new(resolver.ip, resolver.port);
    let ns_config = NameServerConfig::new(socket, Protocol::Udp);
    let group = NameServerConfigGroup::from(vec![ns_config]);
    let config = ResolverConfig::from_parts(None, vec![], group);

    let mut opts = ResolverOpts::default();
    opts.timeout = QUERY_TIMEOUT;
    opts.attempts = 1;
    // Only query the single nameserver we selected for this call.
    opts.num_concurrent_reqs = 1;

    let resolver_client = TokioAsyncResolver::tokio(config, opts);

    match tokio::time::timeout(QUERY_TIMEOUT, resolver_client.mx_lookup(domain)).await {
        Ok(Ok(response)) => {
            let mut records: Vec<(u16, String)> = response
                .iter()
                .map(|mx| (mx.preference(), mx.exchange().to_utf8()))
                .collect();
            records.sort_by_key(|(priority, _)| *priority);
            Ok(records)
        }
        Ok(Err(err)) => {
            if err.is_no_records_found() {
                Ok(Vec::new())
            } else {
                debug!(domain, resolver = resolver.name, error = %err, "mx lookup validation error");
                Err(MxError::LookupFailed(err.to_string()))
            }
        }
        Err(_) => {
            debug!(domain, resolver = resolver.name, "mx lookup timed out");
            Err(MxError::LookupFailed("timed out".to_string()))
        }
    }
}
