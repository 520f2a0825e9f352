use crate::error::AttendanceError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn from_attendance(id: &str, e: &AttendanceError) -> serde_json::Value {
    let details = match e {
        AttendanceError::NotFound(student_id) => Some(json!({ "studentId": student_id })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
