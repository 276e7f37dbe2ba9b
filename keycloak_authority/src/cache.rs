//! A time-bounded cache of the provider's signing keys

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use arc_swap::ArcSwapOption;
use keycloak_jose::{
    clock::{Clock, System, UnixTime},
    KeySet,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{error::KeyFetchError, source::KeySource};

/// How long a fetched key set is used before it is fetched again
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a single fetch may take
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum time between two forced refreshes, and between retries of a
/// failed fetch
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(10);

/// What to do when a refresh fails while an older key set is held
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaleKeyPolicy {
    /// Keep serving the older key set, logging a warning
    #[default]
    ServeStale,

    /// Report the failure to the caller
    Fail,
}

#[derive(Debug, Default)]
struct RefreshState {
    last_attempt: Option<UnixTime>,
    last_forced: Option<UnixTime>,
    last_error: Option<KeyFetchError>,
}

struct Inner {
    source: Box<dyn KeySource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    fetch_timeout: Duration,
    refresh_cooldown: Duration,
    stale_policy: StaleKeyPolicy,
    current: ArcSwapOption<KeySet>,
    attempts: AtomicU64,
    refresh: Mutex<RefreshState>,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Inner")
            .field("source", &self.source)
            .field("ttl", &self.ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("refresh_cooldown", &self.refresh_cooldown)
            .field("stale_policy", &self.stale_policy)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

/// The provider's signing keys, fetched on demand and kept for a while
///
/// The cached [`KeySet`] is an immutable snapshot that is swapped out as a
/// whole. Readers never block on one another, and a failed fetch never
/// disturbs the snapshot already held.
///
/// Fetches are single-flight: when many callers find the cache stale at the
/// same time, one of them fetches and the others wait for and share its
/// result. Every fetch is bounded by a timeout.
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Clone, Debug)]
pub struct KeySetCache {
    inner: Arc<Inner>,
}

impl KeySetCache {
    /// A cache over `source` with the default settings
    pub fn new(source: impl KeySource + 'static) -> Self {
        Self::builder(source).build()
    }

    /// Starts configuring a cache over `source`
    pub fn builder(source: impl KeySource + 'static) -> KeySetCacheBuilder {
        KeySetCacheBuilder {
            source: Box::new(source),
            clock: Arc::new(System),
            ttl: DEFAULT_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
            stale_policy: StaleKeyPolicy::default(),
        }
    }

    /// The current key set, fetching a new one if the cached set has aged
    /// past the time-to-live
    ///
    /// # Errors
    ///
    /// The fetch failed and either no key set is held yet or the stale key
    /// policy is [`Fail`][StaleKeyPolicy::Fail]. A failure is retried at most
    /// once per refresh cooldown; callers arriving in between share it.
    pub async fn keys(&self) -> Result<Arc<KeySet>, KeyFetchError> {
        if let Some(fresh) = self.fresh_snapshot() {
            return Ok(fresh);
        }

        let seen = self.inner.attempts.load(Ordering::Acquire);
        let mut state = self.inner.refresh.lock().await;

        if let Some(fresh) = self.fresh_snapshot() {
            tracing::trace!("key set refreshed while waiting");
            return Ok(fresh);
        }

        if seen != self.inner.attempts.load(Ordering::Acquire)
            || (state.last_error.is_some() && self.cooling_down(state.last_attempt))
        {
            return self.settle(&state);
        }

        self.fetch_locked(&mut state).await
    }

    /// Fetches a new key set regardless of the age of the cached one
    ///
    /// Used when a token names a key the cached set does not hold. If a fetch
    /// completed while waiting, or the previous forced refresh is more recent
    /// than the refresh cooldown, the last outcome is returned without
    /// fetching again. Fetches made because the cached set aged past its
    /// time-to-live do not count against the cooldown.
    ///
    /// # Errors
    ///
    /// As for [`keys()`][Self::keys].
    pub async fn refresh(&self) -> Result<Arc<KeySet>, KeyFetchError> {
        let seen = self.inner.attempts.load(Ordering::Acquire);
        let mut state = self.inner.refresh.lock().await;

        if seen != self.inner.attempts.load(Ordering::Acquire) {
            tracing::trace!("sharing the outcome of a concurrent fetch");
            return self.settle(&state);
        }

        if self.cooling_down(state.last_forced)
            || (state.last_error.is_some() && self.cooling_down(state.last_attempt))
        {
            tracing::debug!("refresh suppressed; key set was refreshed recently");
            return self.settle(&state);
        }

        state.last_forced = Some(self.inner.clock.now());
        self.fetch_locked(&mut state).await
    }

    async fn reload(&self) -> Result<Arc<KeySet>, KeyFetchError> {
        let mut state = self.inner.refresh.lock().await;
        self.fetch_locked(&mut state).await
    }

    /// The key set currently held, if any, without fetching or waiting
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.inner.current.load_full()
    }

    /// Periodically refreshes the key set in the background
    ///
    /// The first refresh happens one `interval` from now. Failures are logged
    /// and retried on the next tick. Abort the returned handle to stop.
    pub fn spawn_refresh(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let this = self.clone();

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await;

            loop {
                timer.tick().await;
                // Failures are logged by the fetch; try again next tick
                let _ = this.reload().await;
            }
        })
    }

    fn fresh_snapshot(&self) -> Option<Arc<KeySet>> {
        let current = self.inner.current.load_full()?;
        let age = self.inner.clock.now().duration_since(current.fetched_at());
        (age < self.inner.ttl).then_some(current)
    }

    fn cooling_down(&self, since: Option<UnixTime>) -> bool {
        since.map_or(false, |last| {
            self.inner.clock.now().duration_since(last) < self.inner.refresh_cooldown
        })
    }

    /// The outcome of the last fetch, subject to the stale key policy
    fn settle(&self, state: &RefreshState) -> Result<Arc<KeySet>, KeyFetchError> {
        let current = self.inner.current.load_full();

        match (&state.last_error, current) {
            (None, Some(current)) => Ok(current),
            (Some(err), Some(current)) if self.inner.stale_policy == StaleKeyPolicy::ServeStale => {
                let error: &dyn std::error::Error = err;
                tracing::warn!(
                    error,
                    jwks.fetched_at = current.fetched_at().0,
                    "serving stale key set; refresh failed",
                );
                Ok(current)
            }
            (Some(err), _) => Err(err.clone()),
            (None, None) => Err(KeyFetchError::other("key set has not been fetched")),
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn fetch_locked(
        &self,
        state: &mut RefreshState,
    ) -> Result<Arc<KeySet>, KeyFetchError> {
        let timeout = self.inner.fetch_timeout;
        let outcome = match tokio::time::timeout(timeout, self.inner.source.fetch()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(timeout = ?timeout, "JWKS fetch timed out");
                Err(KeyFetchError::Timeout(timeout))
            }
        };

        let now = self.inner.clock.now();
        state.last_attempt = Some(now);

        match outcome {
            Ok(jwks) => {
                let keys = Arc::new(KeySet::new(jwks, now));
                tracing::info!(jwks.keys = keys.len(), "key set refreshed");
                self.inner.current.store(Some(Arc::clone(&keys)));
                state.last_error = None;
                self.inner.attempts.fetch_add(1, Ordering::Release);
                Ok(keys)
            }
            Err(err) => {
                state.last_error = Some(err);
                self.inner.attempts.fetch_add(1, Ordering::Release);
                self.settle(state)
            }
        }
    }
}

/// Configures a [`KeySetCache`]
#[must_use]
pub struct KeySetCacheBuilder {
    source: Box<dyn KeySource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    fetch_timeout: Duration,
    refresh_cooldown: Duration,
    stale_policy: StaleKeyPolicy,
}

impl fmt::Debug for KeySetCacheBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeySetCacheBuilder")
            .field("source", &self.source)
            .field("ttl", &self.ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("refresh_cooldown", &self.refresh_cooldown)
            .field("stale_policy", &self.stale_policy)
            .finish_non_exhaustive()
    }
}

impl KeySetCacheBuilder {
    /// How long a fetched key set stays fresh
    pub fn ttl(self, ttl: Duration) -> Self {
        Self { ttl, ..self }
    }

    /// Upper bound on the duration of a single fetch
    pub fn fetch_timeout(self, fetch_timeout: Duration) -> Self {
        Self {
            fetch_timeout,
            ..self
        }
    }

    /// Minimum time between forced refreshes
    pub fn refresh_cooldown(self, refresh_cooldown: Duration) -> Self {
        Self {
            refresh_cooldown,
            ..self
        }
    }

    /// What to do when a refresh fails while an older key set is held
    pub fn stale_policy(self, stale_policy: StaleKeyPolicy) -> Self {
        Self {
            stale_policy,
            ..self
        }
    }

    /// The clock used to age key sets
    pub fn clock(self, clock: Arc<dyn Clock>) -> Self {
        Self { clock, ..self }
    }

    /// Builds the cache, initially empty
    pub fn build(self) -> KeySetCache {
        KeySetCache {
            inner: Arc::new(Inner {
                source: self.source,
                clock: self.clock,
                ttl: self.ttl,
                fetch_timeout: self.fetch_timeout,
                refresh_cooldown: self.refresh_cooldown,
                stale_policy: self.stale_policy,
                current: ArcSwapOption::empty(),
                attempts: AtomicU64::new(0),
                refresh: Mutex::new(RefreshState::default()),
            }),
        }
    }
}
