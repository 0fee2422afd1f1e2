//! Per-session copilot instances.
//!
//! Every session id gets its own `MaintenanceCopilot`, so conversations never
//! see each other's transcripts. Chats within one session are serialised by
//! the session's mutex. Sessions idle longer than the TTL are evicted by
//! `evict_expired`, which the server runs on `sweep_interval`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use copilot_completion::CompletionProvider;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::copilot::MaintenanceCopilot;
use crate::error::{AgentError, Result};

/// Longest accepted session id.
const MAX_SESSION_ID_LEN: usize = 128;

/// Session lifetime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle time after which a session is evicted.
    pub ttl: Duration,

    /// How often the server sweeps for expired sessions.
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    /// Set the idle TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// A reply together with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReply {
    pub session_id: String,
    pub reply: String,
}

struct SessionEntry {
    copilot: Arc<Mutex<MaintenanceCopilot>>,
    last_used: Instant,
}

/// Copilot conversations keyed by session id.
pub struct CopilotSessions {
    provider: Arc<CompletionProvider>,
    config: SessionConfig,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl CopilotSessions {
    /// Create an empty session table over a shared completion provider.
    pub fn new(provider: Arc<CompletionProvider>) -> Self {
        Self {
            provider,
            config: SessionConfig::default(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Use the given lifetime settings.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Active lifetime settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Chat within a session, creating it when `session_id` is `None` or
    /// unknown.
    pub async fn chat(&self, session_id: Option<&str>, message: &str) -> Result<SessionReply> {
        if message.trim().is_empty() {
            return Err(AgentError::Validation(
                "message must not be empty".to_string(),
            ));
        }
        let session_id = match session_id {
            Some(id) => validate_session_id(id)?.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let copilot = self.checkout(&session_id).await;
        let outcome = copilot.lock().await.chat(message).await;
        self.touch(&session_id).await;

        Ok(SessionReply {
            session_id,
            reply: outcome?,
        })
    }

    /// End a session. Returns whether it existed.
    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(session_id).is_some();
        if removed {
            info!("Removed copilot session {session_id}");
        }
        removed
    }

    /// Drop sessions idle longer than the TTL. Sessions with a chat in
    /// flight are kept. Returns the number evicted.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.config.ttl;
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();

        sessions.retain(|_, entry| {
            now.saturating_duration_since(entry.last_used) <= ttl
                || entry.copilot.try_lock().is_err()
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle copilot sessions");
        }
        evicted
    }

    /// Run `evict_expired` every `sweep_interval`, forever.
    pub async fn sweep_forever(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.sweep_interval);
        loop {
            interval.tick().await;
            self.evict_expired().await;
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    async fn checkout(&self, session_id: &str) -> Arc<Mutex<MaintenanceCopilot>> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Starting copilot session {session_id}");
                SessionEntry {
                    copilot: Arc::new(Mutex::new(MaintenanceCopilot::new(
                        self.provider.clone(),
                    ))),
                    last_used: Instant::now(),
                }
            });
        entry.last_used = Instant::now();
        entry.copilot.clone()
    }

    async fn touch(&self, session_id: &str) {
        if let Some(entry) = self.sessions.lock().await.get_mut(session_id) {
            entry.last_used = Instant::now();
        }
    }
}

fn validate_session_id(id: &str) -> Result<&str> {
    if id.trim().is_empty() {
        return Err(AgentError::Validation(
            "session id must not be empty".to_string(),
        ));
    }
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(AgentError::Validation(format!(
            "session id longer than {MAX_SESSION_ID_LEN} bytes"
        )));
    }
    Ok(id)
}
