use crate::ipc::error::{err, from_attendance, ok};
use crate::ipc::helpers::require_store;
use crate::ipc::types::{AppState, Request};
use crate::report::student_rows;
use crate::session::{self, LoginInput, Session};
use crate::settings::Settings;
use serde_json::json;

pub fn session_json(s: &Session) -> serde_json::Value {
    json!({
        "teacherInfo": s.identity(),
        "students": student_rows(s.roster(), s.total_classes()),
        "totalClasses": s.total_classes(),
    })
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, &req.id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let input: LoginInput = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let settings = match Settings::load(store) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "storage_failed", e.to_string(), None),
    };

    match session::login(store, &input, &settings) {
        Ok((new_session, outcome)) => {
            let mut result = session_json(&new_session);
            result["outcome"] = json!(outcome);
            state.logout();
            state.session = Some(new_session);
            ok(&req.id, result)
        }
        Err(e) => from_attendance(&req.id, &e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was_active = state.logout();
    ok(&req.id, json!({ "loggedOut": was_active }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.session.as_ref() {
        Some(s) => ok(&req.id, session_json(s)),
        None => ok(&req.id, json!({ "teacherInfo": null, "students": [], "totalClasses": 0 })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        "session.get" => Some(handle_get(state, req)),
        _ => None,
    }
}
