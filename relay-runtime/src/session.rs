use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::RuntimeError;

/// Identity used when the caller supplies none
pub const ANONYMOUS: &str = "anonymous";

/// Session state as stored by the runtime
pub type SessionState = Map<String, Value>;

/// Key of a conversation inside the runtime's session store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId {
    pub user_id: String,
    pub thread_id: String,
}

impl ConversationId {
    pub fn new(user_id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            thread_id: thread_id.into(),
        }
    }

    /// Uses the caller token verbatim as both user and thread id.
    /// The token is not validated.
    pub fn from_token(token: Option<&str>) -> Self {
        let token = non_empty_or_anonymous(token);
        Self::new(token, token)
    }

    pub fn from_ids(user_id: Option<&str>, thread_id: Option<&str>) -> Self {
        Self::new(non_empty_or_anonymous(user_id), non_empty_or_anonymous(thread_id))
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS && self.thread_id == ANONYMOUS
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.thread_id)
    }
}

fn non_empty_or_anonymous(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => ANONYMOUS,
    }
}

/// A conversation as seen by the session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: ConversationId,
    #[serde(default)]
    pub state: SessionState,
}

/// Conversation store owned by an agent runtime.
/// Implementations provide their own synchronization.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &ConversationId) -> Result<Option<SessionRecord>, RuntimeError>;

    async fn create(
        &self,
        id: &ConversationId,
        state: SessionState,
    ) -> Result<SessionRecord, RuntimeError>;
}

/// In-process session store
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<ConversationId, SessionRecord>>,
    max_sessions: Option<usize>,
}

impl MemorySessionStore {
    /// `max_sessions`: maximum number of stored sessions (None = unlimited)
    pub fn new(max_sessions: Option<usize>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Apply `f` to the stored state of an existing session
    pub async fn update<F>(&self, id: &ConversationId, f: F) -> Result<SessionRecord, RuntimeError>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut sessions = self.sessions.lock().await;
        let record = sessions
            .get_mut(id)
            .ok_or_else(|| RuntimeError::SessionNotFound(id.to_string()))?;
        f(&mut record.state);
        Ok(record.clone())
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &ConversationId) -> Result<Option<SessionRecord>, RuntimeError> {
        Ok(self.sessions.lock().await.get(id).cloned())
    }

    async fn create(
        &self,
        id: &ConversationId,
        state: SessionState,
    ) -> Result<SessionRecord, RuntimeError> {
        let mut sessions = self.sessions.lock().await;

        // A concurrent request may have created it between get and create
        if let Some(existing) = sessions.get(id) {
            return Ok(existing.clone());
        }

        if let Some(max) = self.max_sessions {
            if sessions.len() >= max {
                return Err(RuntimeError::SessionLimit(max));
            }
        }

        debug!("[{}] Creating in-memory session", id);
        let record = SessionRecord {
            id: id.clone(),
            state,
        };
        sessions.insert(id.clone(), record.clone());
        Ok(record)
    }
}
