//! Pending-verification store keyed by the OAuth `state` correlation token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use log::*;
use rand::Rng;

use crate::error::{store_error, Error, StoreErrorKind};

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by `Utc::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock whose time only moves when advanced explicitly.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One outstanding verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    /// Correlation token sent as the OAuth `state` parameter.
    pub token: String,
    /// Member being verified.
    pub subject_id: String,
    /// Guild the verification applies to.
    pub scope_id: String,
    /// When the attempt was started.
    pub created_at: DateTime<Utc>,
}

/// In-memory table of outstanding verification attempts.
///
/// Every entry is removed exactly once: by the callback that consumes it, by
/// [`PendingStore::expire`], or by [`PendingStore::sweep_expired`] once it is
/// older than the TTL. All operations run under a single lock, so a token raced
/// between consumption and expiry is won by whichever call locks first.
pub struct PendingStore {
    entries: Mutex<HashMap<String, PendingVerification>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PendingStore {
    /// Create a store with the default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a store with a custom TTL and clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert a new pending entry.
    ///
    /// Fails with `DuplicateToken` if the token is already pending, which means
    /// the token generator produced a collision.
    pub fn put(&self, token: &str, subject_id: &str, scope_id: &str) -> Result<(), Error> {
        let mut entries = self.lock();

        if entries.contains_key(token) {
            error!("Refusing to overwrite pending verification for an existing token");
            return Err(store_error(
                StoreErrorKind::DuplicateToken,
                "correlation token already pending",
            ));
        }

        entries.insert(
            token.to_string(),
            PendingVerification {
                token: token.to_string(),
                subject_id: subject_id.to_string(),
                scope_id: scope_id.to_string(),
                created_at: self.clock.now(),
            },
        );

        Ok(())
    }

    /// Generate a fresh token and store a pending entry under it.
    ///
    /// Returns the token.
    pub fn mint(&self, subject_id: &str, scope_id: &str) -> Result<String, Error> {
        let token = Self::generate_token();
        self.put(&token, subject_id, scope_id)?;
        debug!("Stored pending verification for subject {subject_id} in scope {scope_id}");
        Ok(token)
    }

    /// Atomically remove and return the entry for `token`.
    ///
    /// Entries older than the TTL are dropped and reported as absent even if
    /// the sweep has not reached them yet.
    pub fn take_if_present(&self, token: &str) -> Option<PendingVerification> {
        let entry = self.lock().remove(token)?;

        if self.is_expired(&entry, self.clock.now()) {
            debug!(
                "Pending verification for subject {} expired before use",
                entry.subject_id
            );
            return None;
        }

        Some(entry)
    }

    /// Remove the entry for `token` if present.
    pub fn expire(&self, token: &str) {
        self.lock().remove(token);
    }

    /// Remove every entry older than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    /// Number of live entries, expired-but-unswept ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Generate a cryptographically random correlation token.
    pub fn generate_token() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(random_bytes)
    }

    fn is_expired(&self, entry: &PendingVerification, now: DateTime<Utc>) -> bool {
        now - entry.created_at >= self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingVerification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PendingStore {
    fn default() -> Self {
        Self::new()
    }
}
