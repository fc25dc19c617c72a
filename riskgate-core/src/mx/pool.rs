//! Resolver pool, rate limiting, and round-robin selection.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::interval;
use tracing::debug;

use crate::error::{MxError, MxResult};

/// Token bucket capacity per resolver, refilled to full every second.
const BUCKET_CAPACITY: u32 = 100;

/// One entry in the compile-time resolver pool.
#[derive(Debug, Clone, Copy)]
pub struct ResolverEntry {
    pub ip: IpAddr,
    pub port: u16,
    pub name: &'static str,
}

macro_rules! resolver {
    ($a:expr, $b:expr, $c:expr, $d:expr, $port:expr, $name:literal) => {
        ResolverEntry {
            ip: IpAddr::V4(Ipv4Addr::new($a, $b, $c, $d)),
            port: $port,
            name: $name,
        }
    };
}

/// The fixed pool of public resolvers, retaining the round-robin shape with
/// headroom over the round-robin floor of 3.
pub static RESOLVER_POOL: &[ResolverEntry] = &[
    resolver!(1, 1, 1, 1, 53, "cloudflare-primary"),
    resolver!(1, 0, 0, 1, 53, "cloudflare-secondary"),
    resolver!(8, 8, 8, 8, 53, "google-primary"),
    resolver!(8, 8, 4, 4, 53, "google-secondary"),
    resolver!(9, 9, 9, 9, 53, "quad9-primary"),
    resolver!(149, 112, 112, 112, 53, "quad9-secondary"),
    resolver!(208, 67, 222, 222, 53, "opendns-primary"),
    resolver!(208, 67, 220, 220, 53, "opendns-secondary"),
    resolver!(64, 6, 64, 6, 53, "verisign-primary"),
    resolver!(64, 6, 65, 6, 53, "verisign-secondary"),
];

struct SelectionState {
    cursor: usize,
    tokens: Vec<u32>,
}

/// Shared resolver-selection state: a rotating cursor plus per-resolver token
/// buckets, mutated under the shortest possible critical section.
pub struct ResolverPool {
    state: Mutex<SelectionState>,
}

impl Default for ResolverPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverPool {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SelectionState {
                cursor: 0,
                tokens: vec![BUCKET_CAPACITY; RESOLVER_POOL.len()],
            }),
        }
    }

    /// Scan up to N resolvers starting at the cursor; pick the first with
    /// tokens > 0, decrement it, advance the cursor, and return its index.
    /// Fails with `rate_limited` if every resolver is exhausted this second.
    pub fn select(&self) -> MxResult<usize> {
        let n = RESOLVER_POOL.len();
        let mut state = self.state.lock();

        for offset in 0..n {
            let idx = (state.cursor + offset) % n;
            if state.tokens[idx] > 0 {
                state.tokens[idx] -= 1;
                state.cursor = (idx + 1) % n;
                return Ok(idx);
            }
        }

        Err(MxError::RateLimited)
    }

    fn refill(&self) {
        let mut state = self.state.lock();
        for tokens in state.tokens.iter_mut() {
            *tokens = BUCKET_CAPACITY;
        }
    }

    /// Spawn the background refill tick. Runs for the lifetime of the
    /// process; there is no shutdown handle because the pool itself is a
    /// process-wide singleton.
    pub fn spawn_refill_task(self: std::sync::Arc<Self>) {
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(1));
            loop {
                tick.tick().await;
                self.refill();
                debug!("mx resolver token buckets refilled");
            }
        });
    }
}
