//! MX Resolver: a rate-limited, rotation-based DNS proxy
//! fronting a fixed pool of public resolvers.

mod lookup;
mod pool;

use std::sync::Arc;

use crate::error::MxResult;

pub use pool::{ResolverEntry, RESOLVER_POOL};

/// Process-wide MX resolver: resolver selection (serialized, short critical
/// section) followed by DNS I/O (concurrent, outside any lock).
pub struct MxResolver {
    pool: Arc<pool::ResolverPool>,
}

impl Default for MxResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MxResolver {
    pub fn new() -> Self {
        Self {
            pool: Arc::new(pool::ResolverPool::new()),
        }
    }

    /// Start the background token-bucket refill task. Call once at process
    /// startup.
    pub fn spawn_refill_task(&self) {
        self.pool.clone().spawn_refill_task();
    }

    /// Resolve MX records for `domain`. Selection is synchronous and
    /// serialized; the DNS I/O itself runs outside that critical section so
    /// concurrent queries to the same or different resolvers proceed in
    /// parallel.
    pub async fn resolve(&self, domain: &str) -> MxResult<Vec<(u16, String)>> {
        let idx = self.pool.select()?;
        let resolver = RESOLVER_POOL[idx];
        lookup::lookup_mx(domain, &resolver).await
    }
}
