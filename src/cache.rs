//! Single-slot client cache with idle expiry.
//!
//! Building a conduit client means reading credentials and settings, so
//! callers issuing several calls in quick succession share one client
//! through a [`ClientCache`]. The cache holds at most one client plus the
//! time it was last used successfully:
//!
//! ```text
//! with_client(f):
//!   empty slot, or idle > budget ──> build fresh client (factory)
//!   fresh enough ────────────────> reuse cached client
//!   then: slot is cleared, f(client) runs, and the client is stored back
//!         only if f succeeded
//! ```
//!
//! The idle budget hedges against the remote side silently closing a
//! long-unused connection. Clearing the slot before use guarantees that a
//! client whose call just failed is never handed to the next caller — the
//! next acquisition rebuilds from scratch, re-reading credentials.
//!
//! The slot lives behind a mutex held for the whole scope of `with_client`,
//! so acquisitions are exclusive critical sections; there is no hidden
//! global state, the cache is an ordinary value handed to whoever needs it.

use std::{fmt, time::Duration};

use serde_json::{Map, Value};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, instrument};

use crate::{
    client::{Client, Conduit},
    config::Settings,
    error::Result,
};

/// Factory type used by the production cache: builds a [`Client`] from
/// captured settings on every cache miss.
pub type BuildFn<C> = Box<dyn Fn() -> Result<C> + Send + Sync>;

struct CacheEntry<C> {
    client: C,
    last_used: Instant,
}

/// Process-lifetime cache holding at most one live client.
///
/// Generic over the client type and the factory so tests can inject
/// counting fakes; production code uses
/// [`from_settings`](ClientCache::from_settings).
pub struct ClientCache<C, F> {
    max_idle: Duration,
    timeout: Duration,
    build: F,
    slot: Mutex<Option<CacheEntry<C>>>,
}

impl<C, F> fmt::Debug for ClientCache<C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCache")
            .field("max_idle", &self.max_idle)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<C, F> ClientCache<C, F>
where
    C: Conduit,
    F: Fn() -> Result<C>,
{
    /// Creates a cache with the given idle budget, default per-call timeout,
    /// and client factory.
    pub fn new(max_idle: Duration, timeout: Duration, build: F) -> Self {
        Self { max_idle, timeout, build, slot: Mutex::new(None) }
    }

    /// Runs `f` with a usable client — scoped acquisition.
    ///
    /// A cached client is reused if its last successful use is within the
    /// idle budget; otherwise a fresh one is built via the factory. The
    /// slot is cleared before `f` runs and the client is stored back, with
    /// a fresh timestamp, only after `f` returns successfully. A failure in
    /// `f` propagates unmodified and leaves the slot empty, so the next
    /// acquisition rebuilds.
    ///
    /// # Errors
    ///
    /// Factory errors and anything `f` returns.
    #[instrument(skip(self, f))]
    pub async fn with_client<T, G>(&self, f: G) -> Result<T>
    where
        G: AsyncFnOnce(&C) -> Result<T>,
    {
        let mut slot = self.slot.lock().await;
        // take() clears the slot: if f fails below, nothing is left behind.
        let client = match slot.take() {
            Some(entry) if entry.last_used.elapsed() <= self.max_idle => {
                debug!("reusing cached conduit client");
                entry.client
            }
            _ => {
                debug!("building a fresh conduit client");
                (self.build)()?
            }
        };

        let value = f(&client).await?;

        *slot = Some(CacheEntry { client, last_used: Instant::now() });
        Ok(value)
    }

    /// Calls `method` with `args` through a cached client, using the
    /// cache's default timeout.
    ///
    /// # Errors
    ///
    /// Any [`ConduitError`](crate::ConduitError) from acquisition or the
    /// call itself.
    pub async fn call(&self, method: &str, args: &Map<String, Value>) -> Result<Value> {
        let timeout = self.timeout;
        self.with_client(async |client| client.call(method, args, timeout).await).await
    }
}

impl ClientCache<Client, BuildFn<Client>> {
    /// Builds the production cache: idle budget and timeout from the
    /// settings, factory = [`Client::from_settings`] over a captured copy
    /// (each rebuild re-reads credentials, or reloads the mock script).
    #[must_use]
    pub fn from_settings(settings: Settings) -> Self {
        let max_idle = settings.max_idle();
        let timeout = settings.timeout();
        Self::new(max_idle, timeout, Box::new(move || Client::from_settings(&settings)))
    }
}
