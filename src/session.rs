//! Per-visitor session state.
//!
//! Each browser gets its own [`Session`], found through a cookie. The access flag,
//! the stored generative credential and the last upload all live here, never in
//! process-wide globals, so two visitors cannot see or unlock each other's state.

use crate::image::UploadedImage;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, RwLock, Semaphore};
use uuid::Uuid;

/// Opaque session identifier carried in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A user-supplied generative API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a key, or returns `None` if it is blank.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// The key itself, for building a provider.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Mutable state of one session.
#[derive(Debug, Default)]
pub struct SessionState {
    email_submitted: bool,
    credential: Option<Credential>,
    prompt: String,
    uploaded: Option<UploadedImage>,
}

impl SessionState {
    /// Whether the access gate has been passed.
    pub fn is_unlocked(&self) -> bool {
        self.email_submitted
    }

    /// Passes the gate. There is no way back within a session.
    pub(crate) fn unlock(&mut self) {
        self.email_submitted = true;
    }

    /// The stored generative credential.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Replaces the stored credential.
    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }

    /// Last prompt entered, kept so the form can be refilled.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Remembers the prompt for the next render.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Last accepted upload.
    pub fn uploaded(&self) -> Option<&UploadedImage> {
        self.uploaded.as_ref()
    }

    /// Replaces the stored upload.
    pub fn set_uploaded(&mut self, image: UploadedImage) {
        self.uploaded = Some(image);
    }
}

/// One visitor's session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: Mutex<SessionState>,
    generation: Arc<Semaphore>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::default()),
            generation: Arc::new(Semaphore::new(1)),
        }
    }

    /// This session's identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Locks the session state.
    ///
    /// Do not hold the guard across a vendor call; page renders for the same
    /// session would wait on it. The one exception is the access gate, which keeps
    /// it across the mailing-list call so concurrent submissions register once.
    pub async fn state(&self) -> tokio::sync::MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    /// Claims the single generation slot, or `None` if a generation is already running.
    pub fn try_begin_generation(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.generation).try_acquire_owned().ok()
    }
}

#[derive(Debug)]
struct Entry {
    session: Arc<Session>,
    last_seen: Instant,
}

/// In-memory session registry with idle expiry.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    idle_ttl: Duration,
}

impl SessionStore {
    /// Creates an empty store; sessions idle for longer than `idle_ttl` are dropped.
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Returns the session for `id`, or starts a new one.
    ///
    /// The boolean is `true` when a new session was created, meaning the caller
    /// must (re)issue the cookie.
    pub async fn get_or_create(&self, id: Option<SessionId>) -> (Arc<Session>, bool) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "expired idle sessions");
        }

        if let Some(entry) = id.and_then(|id| sessions.get_mut(&id)) {
            entry.last_seen = now;
            return (Arc::clone(&entry.session), false);
        }

        let id = SessionId::new();
        let session = Arc::new(Session::new(id));
        sessions.insert(
            id,
            Entry {
                session: Arc::clone(&session),
                last_seen: now,
            },
        );
        tracing::debug!(session = %id, "started session");
        (session, true)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
