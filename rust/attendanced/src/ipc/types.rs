use std::path::PathBuf;

use crate::class_draft::ClassWorkflow;
use crate::session::Session;
use crate::store::SqliteStore;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<SqliteStore>,
    pub session: Option<Session>,
    pub class: ClassWorkflow,
}

impl AppState {
    /// Ends the in-memory session. Persisted roster and counters are kept so
    /// the next login with the same credentials restores them.
    pub fn logout(&mut self) -> bool {
        self.class = ClassWorkflow::Idle;
        match self.session.take() {
            Some(s) => {
                tracing::info!(teacher = %s.key(), "session ended");
                true
            }
            None => false,
        }
    }
}
