//! In-memory session store shared by the runtime and the workflow.

use crate::agent::PausedInvocation;
use crate::types::Event;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub key: SessionKey,
    pub events: Vec<Event>,
    paused: HashMap<String, PausedInvocation>,
}

impl Session {
    fn new(key: SessionKey) -> Self {
        Self {
            key,
            events: Vec::new(),
            paused: HashMap::new(),
        }
    }

    pub fn is_paused(&self, invocation_id: &str) -> bool {
        self.paused.contains_key(invocation_id)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session '{session_id}' already exists for user '{user_id}'")]
    AlreadyExists { user_id: String, session_id: String },
    #[error("session '{session_id}' not found for user '{user_id}'")]
    NotFound { user_id: String, session_id: String },
}

impl SessionError {
    fn not_found(key: &SessionKey) -> Self {
        Self::NotFound {
            user_id: key.user_id.clone(),
            session_id: key.session_id.clone(),
        }
    }
}

/// Process-wide session store keyed by (app, user, session id).
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: Mutex<HashMap<SessionKey, Session>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_session(&self, key: SessionKey) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&key) {
            return Err(SessionError::AlreadyExists {
                user_id: key.user_id,
                session_id: key.session_id,
            });
        }
        debug!(
            app = key.app_name.as_str(),
            user = key.user_id.as_str(),
            session = key.session_id.as_str(),
            "Session created"
        );
        let session = Session::new(key.clone());
        sessions.insert(key, session.clone());
        Ok(session)
    }

    pub async fn get_session(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.lock().await.get(key).cloned()
    }

    /// Drop a session together with any invocation still paused in it.
    pub async fn delete_session(&self, key: &SessionKey) -> Option<Session> {
        let removed = self.sessions.lock().await.remove(key);
        if let Some(session) = &removed {
            debug!(
                session = key.session_id.as_str(),
                events = session.events.len(),
                paused = session.paused.len(),
                "Session deleted"
            );
        }
        removed
    }

    pub async fn append_event(&self, key: &SessionKey, event: Event) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| SessionError::not_found(key))?;
        session.events.push(event);
        Ok(())
    }

    pub(crate) async fn pause(
        &self,
        key: &SessionKey,
        paused: PausedInvocation,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| SessionError::not_found(key))?;
        session.paused.insert(paused.invocation_id.clone(), paused);
        Ok(())
    }

    /// Remove and return the paused state of an invocation.
    pub(crate) async fn take_paused(
        &self,
        key: &SessionKey,
        invocation_id: &str,
    ) -> Result<Option<PausedInvocation>, SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| SessionError::not_found(key))?;
        Ok(session.paused.remove(invocation_id))
    }
}
