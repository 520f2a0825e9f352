use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const TEACHERS_KEY: &str = "teachers";
pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("teacher {0} is required")]
    MissingField(&'static str),
}

/// Normalized namespace for one (name, subject, semester) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeacherKey(String);

impl TeacherKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn students_key(&self) -> String {
        format!("{}-students", self.0)
    }

    pub fn total_classes_key(&self) -> String {
        format!("{}-totalClasses", self.0)
    }
}

impl fmt::Display for TeacherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn derive_key(name: &str, subject: &str, semester: &str) -> Result<TeacherKey, KeyError> {
    let name = non_empty(name, "name")?;
    let subject = non_empty(subject, "subject")?;
    let semester = non_empty(semester, "semester")?;
    Ok(TeacherKey(
        format!("{}_{}_{}", name, subject, semester).to_lowercase(),
    ))
}

fn non_empty<'a>(v: &'a str, field: &'static str) -> Result<&'a str, KeyError> {
    let t = v.trim();
    if t.is_empty() {
        return Err(KeyError::MissingField(field));
    }
    Ok(t)
}
