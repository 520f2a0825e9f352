use crate::ipc::error::{err, ok};
use crate::ipc::helpers::active;
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::json;
use std::path::PathBuf;

fn handle_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let workspace = state.workspace.clone();
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let out = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => match workspace {
            Some(dir) => dir
                .join("exports")
                .join(report::default_file_name(a.session.key().as_str())),
            None => return err(&req.id, "bad_params", "missing outPath", None),
        },
    };

    match report::write_csv(&out, a.session.roster(), a.session.total_classes()) {
        Ok(rows) => {
            tracing::info!(teacher = %a.session.key(), path = %out.display(), rows, "csv exported");
            ok(
                &req.id,
                json!({ "outPath": out.to_string_lossy(), "rowsExported": rows }),
            )
        }
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": out.to_string_lossy() })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.csv" => Some(handle_export_csv(state, req)),
        _ => None,
    }
}
