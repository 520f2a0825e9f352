use crate::class_draft::ClassWorkflow;
use crate::error::AttendanceError;
use crate::ipc::error::{err, from_attendance};
use crate::ipc::types::AppState;
use crate::session::Session;
use crate::store::SqliteStore;

pub fn get_required_str(
    id: &str,
    params: &serde_json::Value,
    key: &str,
) -> Result<String, serde_json::Value> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| err(id, "bad_params", format!("missing {}", key), None))
}

pub fn require_store<'a>(state: &'a AppState, id: &str) -> Result<&'a SqliteStore, serde_json::Value> {
    state
        .store
        .as_ref()
        .ok_or_else(|| err(id, "no_workspace", "select a workspace first", None))
}

/// Borrowed view of everything an authenticated request may touch.
pub struct Active<'a> {
    pub store: &'a SqliteStore,
    pub session: &'a mut Session,
    pub class: &'a mut ClassWorkflow,
}

pub fn active<'a>(state: &'a mut AppState, id: &str) -> Result<Active<'a>, serde_json::Value> {
    let Some(store) = state.store.as_ref() else {
        return Err(err(id, "no_workspace", "select a workspace first", None));
    };
    let Some(session) = state.session.as_mut() else {
        return Err(from_attendance(id, &AttendanceError::NotAuthenticated));
    };
    Ok(Active {
        store,
        session,
        class: &mut state.class,
    })
}
