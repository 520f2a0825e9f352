use crate::class_draft::{ClassDraft, Presence};
use crate::ipc::error::{err, from_attendance, ok};
use crate::ipc::helpers::{active, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::settings::Settings;
use serde_json::json;

fn draft_json(d: &ClassDraft) -> serde_json::Value {
    let present = d.present_count();
    json!({
        "entries": d.entries(),
        "present": present,
        "absent": d.entries().len() - present,
    })
}

fn handle_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let preselect_all = match req.params.get("preselectAll") {
        Some(v) if !v.is_null() => match v.as_bool() {
            Some(b) => b,
            None => return err(&req.id, "bad_params", "preselectAll must be a boolean", None),
        },
        _ => match Settings::load(a.store) {
            Ok(s) => s.preselect_all_default,
            Err(e) => return err(&req.id, "storage_failed", e.to_string(), None),
        },
    };
    match a.class.start(a.session.roster(), preselect_all) {
        Ok(draft) => ok(&req.id, json!({ "draft": draft_json(draft) })),
        Err(e) => from_attendance(&req.id, &e),
    }
}

fn handle_preselect_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match a.class.preselect_all() {
        Ok(draft) => ok(&req.id, json!({ "draft": draft_json(draft) })),
        Err(e) => from_attendance(&req.id, &e),
    }
}

fn handle_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let student_id = match get_required_str(&req.id, &req.params, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status_raw = match get_required_str(&req.id, &req.params, "status") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(status) = Presence::parse(&status_raw) else {
        return err(
            &req.id,
            "bad_params",
            "status must be present or absent",
            Some(json!({ "status": status_raw })),
        );
    };
    if let Err(e) = a.class.toggle(&student_id, status) {
        return from_attendance(&req.id, &e);
    }
    match a.class.draft() {
        Some(d) => ok(&req.id, json!({ "draft": draft_json(d) })),
        None => ok(&req.id, json!({ "draft": null })),
    }
}

fn handle_commit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match a.class.commit(a.session, a.store) {
        Ok(tally) => ok(&req.id, json!({ "tally": tally })),
        Err(e) => from_attendance(&req.id, &e),
    }
}

fn handle_cancel(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match a.class.cancel() {
        Ok(()) => ok(&req.id, json!({ "cancelled": true })),
        Err(e) => from_attendance(&req.id, &e),
    }
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match a.class.draft() {
        Some(d) => ok(
            &req.id,
            json!({ "state": "drafting", "draft": draft_json(d) }),
        ),
        None => ok(&req.id, json!({ "state": "idle", "draft": null })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "class.start" => Some(handle_start(state, req)),
        "class.preselectAll" => Some(handle_preselect_all(state, req)),
        "class.toggle" => Some(handle_toggle(state, req)),
        "class.commit" => Some(handle_commit(state, req)),
        "class.cancel" => Some(handle_cancel(state, req)),
        "class.status" => Some(handle_status(state, req)),
        _ => None,
    }
}
