use crate::roster::Student;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

pub const CSV_HEADER: &str = "Name,Roll No,Attendance,Absents,Percentage";

/// Attendance as a percentage of all classes, rounded to 2 decimals.
/// `None` until at least one class has been taken.
pub fn attendance_percentage(attended: u64, total_classes: u64) -> Option<f64> {
    if total_classes == 0 {
        return None;
    }
    let pct = attended as f64 / total_classes as f64 * 100.0;
    Some((pct * 100.0).round() / 100.0)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow<'a> {
    #[serde(flatten)]
    pub student: &'a Student,
    pub percentage: Option<f64>,
}

pub fn student_rows(roster: &[Student], total_classes: u64) -> Vec<StudentRow<'_>> {
    roster
        .iter()
        .map(|s| StudentRow {
            student: s,
            percentage: attendance_percentage(s.attendance_count, total_classes),
        })
        .collect()
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn render_csv(roster: &[Student], total_classes: u64) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    for row in student_rows(roster, total_classes) {
        let pct = row
            .percentage
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "N/A".to_string());
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_quote(&row.student.name),
            csv_quote(&row.student.roll_no),
            row.student.attendance_count,
            row.student.absent_count,
            pct
        ));
    }
    csv
}

/// Writes the CSV report and returns the number of student rows.
pub fn write_csv(out_path: &Path, roster: &[Student], total_classes: u64) -> anyhow::Result<usize> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(out_path, render_csv(roster, total_classes))
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))?;
    Ok(roster.len())
}

/// File name offered when the caller does not pick one.
pub fn default_file_name(teacher_key: &str) -> String {
    format!(
        "attendance-{}-{}.csv",
        teacher_key.replace(' ', "-"),
        chrono::Local::now().format("%Y-%m-%d")
    )
}
