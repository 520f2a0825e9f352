use crate::ipc::error::{err, ok};
use crate::ipc::helpers::require_store;
use crate::ipc::types::{AppState, Request};
use crate::settings::Settings;
use serde_json::json;

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, &req.id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match Settings::load(store) {
        Ok(s) => ok(&req.id, json!({ "settings": s })),
        Err(e) => err(&req.id, "storage_failed", e.to_string(), None),
    }
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, &req.id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };
    let mut current = match Settings::load(store) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "storage_failed", e.to_string(), None),
    };
    if let Err(msg) = current.merge_patch(patch) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = current.save(store) {
        return err(&req.id, "storage_failed", e.to_string(), None);
    }
    tracing::info!(?current, "settings updated");
    ok(&req.id, json!({ "settings": current }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
