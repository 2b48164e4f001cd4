use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed coaching session as kept in local history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    /// Role the candidate practiced for (e.g. "Backend Engineer").
    pub role: String,
    pub company: Option<String>,
    /// Overall score out of 100, when the session produced one.
    pub score: Option<u8>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when recording a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSession {
    pub role: String,
    pub company: Option<String>,
    pub score: Option<u8>,
    pub summary: Option<String>,
}

impl SessionRecord {
    pub fn new(session: NewSession) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: session.role,
            company: session.company,
            score: session.score.map(|s| s.min(100)),
            summary: session.summary,
            created_at: Utc::now(),
        }
    }
}

/// User-visible action recorded for later review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEvent {
    pub id: Uuid,
    /// Dotted action name, e.g. `session.saved`.
    pub action: String,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.into(),
            detail,
            at: Utc::now(),
        }
    }
}

/// Persistence contract for session history. Newest sessions come first.
pub trait SessionHistory: Send + Sync {
    fn list(&self) -> anyhow::Result<Vec<SessionRecord>>;
    fn record(&self, session: NewSession) -> anyhow::Result<SessionRecord>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Persistence contract for the audit log. Oldest events come first.
pub trait AuditLog: Send + Sync {
    fn list(&self) -> anyhow::Result<Vec<AuditEvent>>;
    fn append(&self, action: &str, detail: Option<String>) -> anyhow::Result<AuditEvent>;
}
