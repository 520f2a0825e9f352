use crate::ipc::error::{from_attendance, ok};
use crate::ipc::helpers::{active, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::report::{attendance_percentage, student_rows};
use serde_json::json;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    ok(
        &req.id,
        json!({
            "students": student_rows(a.session.roster(), a.session.total_classes()),
            "totalClasses": a.session.total_classes(),
        }),
    )
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let name = match get_required_str(&req.id, &req.params, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let roll_no = match get_required_str(&req.id, &req.params, "rollNo") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match a.session.add_student(a.store, &name, &roll_no) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => from_attendance(&req.id, &e),
    }
}

#[derive(Clone, Copy)]
enum Mark {
    Present,
    Absent,
}

fn handle_mark(state: &mut AppState, req: &Request, mark: Mark) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let student_id = match get_required_str(&req.id, &req.params, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let res = match mark {
        Mark::Present => a.session.mark_present(a.store, &student_id),
        Mark::Absent => a.session.mark_absent(a.store, &student_id),
    };
    match res {
        Ok(changed) => {
            let total = a.session.total_classes();
            let student = a.session.student(&student_id).map(|s| {
                json!({
                    "student": s,
                    "percentage": attendance_percentage(s.attendance_count, total),
                })
            });
            ok(&req.id, json!({ "changed": changed, "student": student }))
        }
        Err(e) => from_attendance(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let student_id = match get_required_str(&req.id, &req.params, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match a.session.delete_student(a.store, &student_id) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => from_attendance(&req.id, &e),
    }
}

fn handle_end_semester(state: &mut AppState, req: &Request) -> serde_json::Value {
    let a = match active(state, &req.id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match a.session.end_semester(a.store) {
        Ok(()) => ok(
            &req.id,
            json!({
                "message": "Semester data reset.",
                "studentCount": a.session.roster().len(),
                "totalClasses": a.session.total_classes(),
            }),
        ),
        Err(e) => from_attendance(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.add" => Some(handle_add(state, req)),
        "students.markPresent" => Some(handle_mark(state, req, Mark::Present)),
        "students.markAbsent" => Some(handle_mark(state, req, Mark::Absent)),
        "students.delete" => Some(handle_delete(state, req)),
        "semester.end" => Some(handle_end_semester(state, req)),
        _ => None,
    }
}
