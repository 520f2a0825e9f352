//! Teacher login and the active session.
//!
//! The first login for a derived key registers it; later logins must present
//! the same password. Credentials live in plaintext under [`TEACHERS_KEY`].

use crate::error::AttendanceError;
use crate::keys::{derive_key, TeacherKey, TEACHERS_KEY};
use crate::roster::Student;
use crate::settings::Settings;
use crate::store::{self, Batch, KvStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub semester: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<String>,
}

pub type CredentialTable = BTreeMap<String, Credential>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherIdentity {
    pub name: String,
    pub subject: String,
    pub semester: String,
    pub key: TeacherKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginOutcome {
    Registered,
    Authenticated,
}

#[derive(Debug)]
pub struct Session {
    pub(crate) identity: TeacherIdentity,
    pub(crate) roster: Vec<Student>,
    pub(crate) total_classes: u64,
}

impl Session {
    pub fn identity(&self) -> &TeacherIdentity {
        &self.identity
    }

    pub fn key(&self) -> &TeacherKey {
        &self.identity.key
    }

    pub fn roster(&self) -> &[Student] {
        &self.roster
    }

    pub fn total_classes(&self) -> u64 {
        self.total_classes
    }
}

/// Trims every field and checks it against the login form rules.
pub fn validate_login(input: &LoginInput, settings: &Settings) -> Result<LoginInput, AttendanceError> {
    let trimmed = LoginInput {
        name: input.name.trim().to_string(),
        subject: input.subject.trim().to_string(),
        semester: input.semester.trim().to_string(),
        password: input.password.trim().to_string(),
    };
    if trimmed.name.is_empty()
        || trimmed.subject.is_empty()
        || trimmed.semester.is_empty()
        || trimmed.password.is_empty()
    {
        return Err(AttendanceError::validation("Please fill in all fields."));
    }
    if !trimmed.semester.chars().all(|c| c.is_ascii_digit()) {
        return Err(AttendanceError::validation("Semester must be a number."));
    }
    if !trimmed.subject.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AttendanceError::validation(
            "Subject must contain only letters.",
        ));
    }
    if trimmed.password.chars().count() < settings.min_password_length {
        return Err(AttendanceError::validation(format!(
            "Password should be at least {} characters.",
            settings.min_password_length
        )));
    }
    Ok(trimmed)
}

pub fn login(
    store: &dyn KvStore,
    input: &LoginInput,
    settings: &Settings,
) -> Result<(Session, LoginOutcome), AttendanceError> {
    let input = validate_login(input, settings)?;
    let key = derive_key(&input.name, &input.subject, &input.semester)?;

    let mut teachers: CredentialTable =
        store::get_json(store, TEACHERS_KEY)?.unwrap_or_default();

    let outcome = match teachers.get(key.as_str()) {
        Some(existing) => {
            if existing.password != input.password {
                tracing::info!(teacher = %key, "login rejected: password mismatch");
                return Err(AttendanceError::Authentication);
            }
            LoginOutcome::Authenticated
        }
        None => {
            teachers.insert(
                key.as_str().to_string(),
                Credential {
                    password: input.password.clone(),
                    registered_at: Some(chrono::Utc::now().to_rfc3339()),
                },
            );
            let mut batch = Batch::default();
            batch.put(TEACHERS_KEY, &teachers)?;
            store.apply(batch)?;
            LoginOutcome::Registered
        }
    };

    let roster: Vec<Student> = store::get_json(store, &key.students_key())?.unwrap_or_default();
    let total_classes: u64 = store::get_json(store, &key.total_classes_key())?.unwrap_or(0);

    tracing::info!(
        teacher = %key,
        outcome = ?outcome,
        students = roster.len(),
        total_classes,
        "session started"
    );

    Ok((
        Session {
            identity: TeacherIdentity {
                name: input.name,
                subject: input.subject,
                semester: input.semester,
                key,
            },
            roster,
            total_classes,
        },
        outcome,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;

    fn input(name: &str, subject: &str, semester: &str, password: &str) -> LoginInput {
        LoginInput {
            name: name.into(),
            subject: subject.into(),
            semester: semester.into(),
            password: password.into(),
        }
    }

    #[test]
    fn first_login_registers_then_same_credentials_authenticate() {
        let store = MemoryStore::default();
        let settings = Settings::default();

        let (s, outcome) =
            login(&store, &input("Alice", "Math", "3", "secret1"), &settings).expect("register");
        assert_eq!(outcome, LoginOutcome::Registered);
        assert_eq!(s.key().as_str(), "alice_math_3");
        assert!(s.roster().is_empty());
        assert_eq!(s.total_classes(), 0);

        let (_, outcome) = login(&store, &input(" alice ", "MATH", "3", "secret1"), &settings)
            .expect("authenticate");
        assert_eq!(outcome, LoginOutcome::Authenticated);
    }

    #[test]
    fn wrong_password_leaves_credentials_untouched() {
        let store = MemoryStore::default();
        let settings = Settings::default();
        login(&store, &input("Alice", "Math", "3", "secret1"), &settings).expect("register");
        let before = store.raw(TEACHERS_KEY);

        let res = login(&store, &input("Alice", "Math", "3", "wrong-pass"), &settings);
        assert!(matches!(res, Err(AttendanceError::Authentication)));
        assert_eq!(store.raw(TEACHERS_KEY), before);
    }

    #[test]
    fn validation_rules_follow_login_form() {
        let settings = Settings::default();
        let cases = [
            input("", "Math", "3", "secret1"),
            input("Alice", "Math", "third", "secret1"),
            input("Alice", "Math 101", "3", "secret1"),
            input("Alice", "Math", "3", "short"),
        ];
        for case in cases {
            let res = validate_login(&case, &settings);
            assert!(
                matches!(res, Err(AttendanceError::Validation(_))),
                "expected validation error for {:?}",
                case
            );
        }
    }

    #[test]
    fn login_restores_persisted_roster() {
        let store = MemoryStore::default();
        let settings = Settings::default();
        let (mut s, _) =
            login(&store, &input("Alice", "Math", "3", "secret1"), &settings).expect("register");
        s.add_student(&store, "Bob", "102").expect("add");
        drop(s);

        let (s, _) =
            login(&store, &input("Alice", "Math", "3", "secret1"), &settings).expect("login");
        assert_eq!(s.roster().len(), 1);
        assert_eq!(s.roster()[0].name, "Bob");
    }

    #[test]
    fn credentials_without_registration_time_still_load() {
        let store = MemoryStore::default();
        store::set_json(
            &store,
            TEACHERS_KEY,
            &serde_json::json!({ "alice_math_3": { "password": "secret1" } }),
        )
        .expect("seed");
        let (_, outcome) = login(
            &store,
            &input("Alice", "Math", "3", "secret1"),
            &Settings::default(),
        )
        .expect("login");
        assert_eq!(outcome, LoginOutcome::Authenticated);
    }
}
