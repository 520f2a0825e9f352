use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
use std::path::PathBuf;

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let out_path = match get_required_str(&req.id, &req.params, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "outPath": out_path.to_string_lossy(),
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
                "dbSha256": summary.db_sha256,
            }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": out_path.to_string_lossy() })),
        ),
    }
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let in_path = match get_required_str(&req.id, &req.params, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };

    let staged = match backup::stage_workspace_bundle(&in_path, &workspace) {
        Ok(staged) => staged,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "backup import rejected");
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": in_path.to_string_lossy() })),
            );
        }
    };

    // The restored database replaces whatever the session was built from.
    state.logout();
    state.store = None;

    let committed = staged.commit();
    let reopened = store::open_store(&workspace);
    match (committed, reopened) {
        (Ok(summary), Ok(opened)) => {
            state.store = Some(opened);
            tracing::info!(workspace = %workspace.display(), sha256 = %summary.db_sha256, "workspace restored");
            ok(
                &req.id,
                json!({
                    "workspacePath": workspace.to_string_lossy(),
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "dbSha256": summary.db_sha256,
                }),
            )
        }
        (Err(e), reopened) => {
            state.store = reopened.ok();
            tracing::error!(error = %format!("{e:#}"), "backup import failed");
            err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": in_path.to_string_lossy() })),
            )
        }
        (Ok(_), Err(e)) => {
            state.workspace = None;
            err(&req.id, "db_open_failed", format!("{e:#}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}
