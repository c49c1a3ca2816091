use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{AuthBackend, LoginRequest, ProfileUpdate, RegisterRequest};
use crate::config::SessionConfig;
use crate::errors::SessionError;
use crate::models::session::{token_is_usable, SESSION_KEY};
use crate::models::{PersistedSession, SessionSnapshot, UserProfile};
use crate::store::SecureStore;

/// What a completed refresh call actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The new token was applied to the session and storage.
    Refreshed,
    /// The session was cleared or replaced while the call was in flight;
    /// the result was discarded.
    Stale,
}

struct Inner {
    snapshot: SessionSnapshot,
    /// Advanced by `clear` and `persist`. An in-flight refresh records the
    /// generation it started under and applies nothing if it has moved on,
    /// so a logout cannot be resurrected by a late refresh completion.
    generation: u64,
}

/// Owns the session snapshot and performs every lifecycle transition.
///
/// One process-wide instance is expected, handed to the route gate and the
/// screens by the host shell. All mutation happens under the inner mutex,
/// which is never held across an await; every transition publishes the new
/// snapshot over a watch channel so observers react in the same tick.
pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SecureStore>,
    timeout_ms: i64,
    inner: Mutex<Inner>,
    tx: watch::Sender<SessionSnapshot>,
    /// Single-flight guard: only one refresh call talks to the backend at a
    /// time; latecomers queue behind it and re-read the snapshot.
    refresh_gate: tokio::sync::Mutex<()>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn SecureStore>,
        config: &SessionConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        SessionManager {
            backend,
            store,
            timeout_ms: config.timeout_in_secs * 1000,
            inner: Mutex::new(Inner {
                snapshot: SessionSnapshot::default(),
                generation: 0,
            }),
            tx,
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Current snapshot, cloned out from under the lock.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.locked().snapshot.clone()
    }

    /// Observers (the route gate, screens) get a watch receiver; every
    /// transition sends the new snapshot through it.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("session state mutex poisoned")
    }

    /// Apply a mutation under the lock, then publish the result.
    fn apply<F: FnOnce(&mut Inner)>(&self, f: F) {
        let snapshot = {
            let mut inner = self.locked();
            f(&mut inner);
            inner.snapshot.clone()
        };
        self.tx.send_replace(snapshot);
    }

    async fn write_record(&self, record: &PersistedSession) {
        let serialized = match serde_json::to_string(record) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize session record; skipping write: {}", e);
                return;
            }
        };
        // Best-effort: a failed write does not roll back the in-memory
        // transition. The session lives on for this run and the next start
        // fails open to unauthenticated.
        if let Err(e) = self.store.set(SESSION_KEY, &serialized).await {
            warn!("Failed to persist session record: {}", e);
        }
    }

    /// One-shot load at process start. Reads the persisted record and, if it
    /// carries a usable token and a user, restores the authenticated session.
    /// Always ends with `is_initialized = true`, including on storage or
    /// parse failure: the gate must never stay blocked on a bad disk.
    pub async fn load_persisted(&self) {
        let record = match self.store.get(SESSION_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedSession>(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Persisted session record unreadable; failing open: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Secure storage read failed; failing open: {}", e);
                None
            }
        };

        self.apply(|inner| {
            match record {
                Some(record) if token_is_usable(&record.access_token) => {
                    debug!("Restored persisted session for user '{}'", record.user.id);
                    inner.snapshot = SessionSnapshot {
                        user: Some(record.user),
                        access_token: Some(record.access_token),
                        refresh_token: record.refresh_token,
                        last_activity_ms: Some(record.last_activity_ms),
                        is_authenticated: true,
                        is_initialized: true,
                    };
                }
                _ => {
                    inner.snapshot.is_initialized = true;
                }
            }
        });
    }

    /// Store a fresh session after a successful login or registration. The
    /// only path from unauthenticated to authenticated after start-up.
    ///
    /// Rejects a missing or junk token without touching state or storage.
    pub async fn persist(
        &self,
        user: UserProfile,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Result<(), SessionError> {
        if !token_is_usable(&access_token) {
            warn!("Refusing to persist session without a usable access token");
            return Err(SessionError::MissingToken);
        }

        let record = PersistedSession {
            access_token,
            refresh_token,
            user,
            last_activity_ms: now_ms(),
        };
        self.write_record(&record).await;

        info!("Session persisted for user '{}'", record.user.id);
        self.apply(|inner| {
            inner.generation += 1;
            inner.snapshot = SessionSnapshot {
                user: Some(record.user),
                access_token: Some(record.access_token),
                refresh_token: record.refresh_token,
                last_activity_ms: Some(record.last_activity_ms),
                is_authenticated: true,
                is_initialized: true,
            };
        });
        Ok(())
    }

    /// Login against the backend and persist the normalized result.
    pub async fn login(&self, request: &LoginRequest) -> Result<(), SessionError> {
        let auth = self.backend.login(request).await?;
        self.persist(auth.user, auth.access_token, auth.refresh_token)
            .await
    }

    /// Register against the backend and persist the normalized result.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), SessionError> {
        let auth = self.backend.register(request).await?;
        self.persist(auth.user, auth.access_token, auth.refresh_token)
            .await
    }

    /// Exchange the current access token for a fresh one. Called on app
    /// resume and by screens after a 401.
    ///
    /// A rejected or unreachable refresh clears the whole session: a failed
    /// refresh means the session is no longer valid, not a transient error
    /// to retry. No retry loop, no backoff.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SessionError> {
        let _flight = self.refresh_gate.lock().await;

        let (token, start_generation) = {
            let inner = self.locked();
            (inner.snapshot.access_token.clone(), inner.generation)
        };
        let Some(token) = token else {
            return Err(SessionError::MissingToken);
        };

        let auth = match self.backend.refresh(&token).await {
            Ok(auth) => auth,
            Err(e) => {
                // A refresh superseded by a logout or re-login while it was
                // in flight says nothing about the current session; its
                // failure is discarded the same way its success would be.
                if self.locked().generation != start_generation {
                    debug!("Discarding failed refresh for a superseded session");
                    return Ok(RefreshOutcome::Stale);
                }
                warn!("Token refresh failed; clearing session: {}", e);
                self.clear().await;
                return Err(SessionError::RefreshRejected(e.to_string()));
            }
        };

        // Build the record and apply the new token in one critical section,
        // skipping both if the session moved on while the call was in flight.
        let record = {
            let mut inner = self.locked();
            if inner.generation != start_generation {
                debug!("Discarding refresh result for a superseded session");
                return Ok(RefreshOutcome::Stale);
            }
            let record = PersistedSession {
                access_token: auth.access_token,
                // Refresh responses carry no refresh token; keep the one we have.
                refresh_token: auth
                    .refresh_token
                    .or_else(|| inner.snapshot.refresh_token.clone()),
                user: auth.user,
                last_activity_ms: now_ms(),
            };
            inner.snapshot = SessionSnapshot {
                user: Some(record.user.clone()),
                access_token: Some(record.access_token.clone()),
                refresh_token: record.refresh_token.clone(),
                last_activity_ms: Some(record.last_activity_ms),
                is_authenticated: true,
                is_initialized: true,
            };
            record
        };
        self.tx.send_replace(self.snapshot());
        if !self.write_record_guarded(&record, start_generation).await {
            return Ok(RefreshOutcome::Stale);
        }

        debug!("Access token refreshed");
        Ok(RefreshOutcome::Refreshed)
    }

    /// Write the record, then drop it again if the session moved on while
    /// the write was in flight: a clear that raced the write would have
    /// removed the record this just rewrote. Returns false when superseded.
    async fn write_record_guarded(
        &self,
        record: &PersistedSession,
        start_generation: u64,
    ) -> bool {
        self.write_record(record).await;
        if self.locked().generation != start_generation {
            if let Err(e) = self.store.remove(SESSION_KEY).await {
                warn!("Failed to remove superseded session record: {}", e);
            }
            return false;
        }
        true
    }

    /// Expiry check against the wall clock.
    pub async fn check_expiry(&self) -> bool {
        self.check_expiry_at(now_ms()).await
    }

    /// Expiry check against a supplied "now", in epoch milliseconds.
    ///
    /// Not authenticated or no activity recorded reads as not expired, with
    /// no side effects. The boundary is strict: a session idle for exactly
    /// the timeout is still live; one millisecond past it is not.
    pub async fn check_expiry_at(&self, now_ms: i64) -> bool {
        let expired = {
            let inner = self.locked();
            inner.snapshot.is_authenticated
                && inner
                    .snapshot
                    .last_activity_ms
                    .is_some_and(|last| now_ms - last > self.timeout_ms)
        };
        if expired {
            info!("Session expired after inactivity; clearing");
            self.clear().await;
        }
        expired
    }

    /// Stamp the current time as the last authenticated activity, extending
    /// the expiry window. No-op when unauthenticated; never touches the
    /// authenticated flag.
    pub async fn update_activity(&self) {
        let (record, start_generation) = {
            let mut inner = self.locked();
            if !inner.snapshot.is_authenticated {
                return;
            }
            let stamped = now_ms();
            inner.snapshot.last_activity_ms = Some(stamped);
            (Self::record_from(&inner.snapshot), inner.generation)
        };
        self.tx.send_replace(self.snapshot());
        if let Some(record) = record {
            self.write_record_guarded(&record, start_generation).await;
        }
    }

    /// Guard to run before any state-mutating user action: clears and fails
    /// if the session has gone stale, otherwise extends the window.
    pub async fn guard_action(&self) -> Result<(), SessionError> {
        if self.check_expiry().await {
            return Err(SessionError::Expired);
        }
        self.update_activity().await;
        Ok(())
    }

    /// Replace the profile attached to the session, in state and storage.
    /// Fed by profile-update responses.
    pub async fn update_user(&self, user: UserProfile) {
        let (record, start_generation) = {
            let mut inner = self.locked();
            if !inner.snapshot.is_authenticated {
                return;
            }
            inner.snapshot.user = Some(user);
            (Self::record_from(&inner.snapshot), inner.generation)
        };
        self.tx.send_replace(self.snapshot());
        if let Some(record) = record {
            self.write_record_guarded(&record, start_generation).await;
        }
    }

    /// Re-fetch the profile from the backend and fold it into the session.
    pub async fn sync_profile(&self) -> Result<UserProfile, SessionError> {
        let token = self
            .snapshot()
            .access_token
            .ok_or(SessionError::MissingToken)?;
        let user = self.backend.fetch_profile(&token).await?;
        self.update_user(user.clone()).await;
        Ok(user)
    }

    /// Push a partial profile update to the backend and fold the answer in.
    pub async fn submit_profile_update(
        &self,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, SessionError> {
        let token = self
            .snapshot()
            .access_token
            .ok_or(SessionError::MissingToken)?;
        let user = self.backend.update_profile(&token, update).await?;
        self.update_user(user.clone()).await;
        Ok(user)
    }

    /// Request a password-reset email. Does not touch the session.
    pub async fn forgot_password(&self, email: &str) -> Result<(), SessionError> {
        self.backend.forgot_password(email).await
    }

    /// Complete a password reset with the emailed token. Does not touch the
    /// session; the user logs in afterwards.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), SessionError> {
        self.backend.reset_password(token, password).await
    }

    /// Reset to the empty, initialized snapshot and drop the persisted
    /// record. Invoked by logout, detected expiry, and failed refresh.
    /// Idempotent; best-effort on the storage side.
    pub async fn clear(&self) {
        self.apply(|inner| {
            inner.generation += 1;
            inner.snapshot = SessionSnapshot::empty_initialized();
        });
        if let Err(e) = self.store.remove(SESSION_KEY).await {
            warn!("Failed to remove persisted session record: {}", e);
        }
    }

    fn record_from(snapshot: &SessionSnapshot) -> Option<PersistedSession> {
        // Authenticated snapshots always carry token, user, and activity by
        // construction; bail quietly if an invariant is ever broken.
        Some(PersistedSession {
            access_token: snapshot.access_token.clone()?,
            refresh_token: snapshot.refresh_token.clone(),
            user: snapshot.user.clone()?,
            last_activity_ms: snapshot.last_activity_ms?,
        })
    }
}
