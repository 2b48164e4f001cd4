//! Session history and audit log kept in the encrypted local store.
//!
//! Retention is enforced here, before each write: the store itself never
//! truncates, so every collection decides how much it keeps.

use std::sync::Arc;

use anyhow::{Context, Result};
use prep_core::{
    history::{AuditEvent, AuditLog, NewSession, SessionHistory, SessionRecord},
    storage::LocalStorage,
};
use prep_storage::EncryptedStore;
use tracing::{debug, instrument};

pub const HISTORY_KEY: &str = "prep.session-history";
pub const AUDIT_KEY: &str = "prep.audit-log";

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Session history backed by an `EncryptedStore`, newest first.
pub struct LocalSessionHistory<S> {
    store: Arc<EncryptedStore<S>>,
    limit: usize,
}

impl<S: LocalStorage + Clone> LocalSessionHistory<S> {
    pub fn new(store: Arc<EncryptedStore<S>>) -> Self {
        Self::with_limit(store, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(store: Arc<EncryptedStore<S>>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
        }
    }

    fn load(&self) -> Vec<SessionRecord> {
        self.store.get_item(HISTORY_KEY).unwrap_or_default()
    }

    fn save(&self, sessions: &[SessionRecord]) -> Result<()> {
        self.store
            .set_item(HISTORY_KEY, sessions)
            .context("saving session history")
    }
}

impl<S: LocalStorage + Clone> SessionHistory for LocalSessionHistory<S> {
    #[instrument(skip(self))]
    fn list(&self) -> Result<Vec<SessionRecord>> {
        Ok(self.load())
    }

    #[instrument(skip(self, session))]
    fn record(&self, session: NewSession) -> Result<SessionRecord> {
        let mut sessions = self.load();
        let record = SessionRecord::new(session);
        sessions.insert(0, record.clone());
        if sessions.len() > self.limit {
            debug!(dropped = sessions.len() - self.limit, "trimming session history");
            sessions.truncate(self.limit);
        }
        self.save(&sessions)?;
        Ok(record)
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<()> {
        self.store
            .remove_item(HISTORY_KEY)
            .context("clearing session history")
    }
}

/// Audit log backed by an `EncryptedStore`, oldest first.
pub struct LocalAuditLog<S> {
    store: Arc<EncryptedStore<S>>,
    limit: usize,
}

impl<S: LocalStorage + Clone> LocalAuditLog<S> {
    pub fn new(store: Arc<EncryptedStore<S>>) -> Self {
        Self::with_limit(store, DEFAULT_AUDIT_LIMIT)
    }

    pub fn with_limit(store: Arc<EncryptedStore<S>>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
        }
    }
}

impl<S: LocalStorage + Clone> AuditLog for LocalAuditLog<S> {
    #[instrument(skip(self))]
    fn list(&self) -> Result<Vec<AuditEvent>> {
        Ok(self.store.get_item(AUDIT_KEY).unwrap_or_default())
    }

    #[instrument(skip(self, detail))]
    fn append(&self, action: &str, detail: Option<String>) -> Result<AuditEvent> {
        let mut events: Vec<AuditEvent> = self.store.get_item(AUDIT_KEY).unwrap_or_default();
        let event = AuditEvent::new(action, detail);
        events.push(event.clone());
        if events.len() > self.limit {
            let excess = events.len() - self.limit;
            events.drain(..excess);
        }
        self.store
            .set_item(AUDIT_KEY, &events)
            .context("saving audit log")?;
        Ok(event)
    }
}
