use crate::class_draft::{ClassDraft, Presence};
use crate::error::AttendanceError;
use crate::session::Session;
use crate::store::{Batch, KvStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub roll_no: String,
    #[serde(default)]
    pub attendance_count: u64,
    #[serde(default)]
    pub absent_count: u64,
    #[serde(default)]
    pub teacher_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTally {
    pub present: usize,
    pub absent: usize,
    pub total_classes: u64,
}

impl Session {
    /// Writes `roster` and `total_classes` together, then adopts them.
    ///
    /// Memory is only updated after the store accepted the write, so a failed
    /// write leaves both sides at the previous state.
    fn commit_state(
        &mut self,
        store: &dyn KvStore,
        roster: Vec<Student>,
        total_classes: u64,
    ) -> Result<(), AttendanceError> {
        let key = self.key();
        let mut batch = Batch::default();
        batch.put(&key.students_key(), &roster)?;
        batch.put(&key.total_classes_key(), &total_classes)?;
        if let Err(e) = store.apply(batch) {
            tracing::error!(teacher = %key, error = %e, "failed to persist roster");
            return Err(e.into());
        }
        self.roster = roster;
        self.total_classes = total_classes;
        Ok(())
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.roster.iter().find(|s| s.id == id)
    }

    pub fn add_student(
        &mut self,
        store: &dyn KvStore,
        name: &str,
        roll_no: &str,
    ) -> Result<Student, AttendanceError> {
        let name = name.trim();
        let roll_no = roll_no.trim();
        if name.is_empty() || roll_no.is_empty() {
            return Err(AttendanceError::validation(
                "Student name and roll number are required.",
            ));
        }
        let wanted = roll_no.to_lowercase();
        if self
            .roster
            .iter()
            .any(|s| s.roll_no.trim().to_lowercase() == wanted)
        {
            return Err(AttendanceError::validation(
                "Student with this roll number already exists.",
            ));
        }

        let student = Student {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            roll_no: roll_no.to_string(),
            attendance_count: 0,
            absent_count: 0,
            teacher_key: self.key().as_str().to_string(),
        };
        let mut next = self.roster.clone();
        next.push(student.clone());
        self.commit_state(store, next, self.total_classes)?;
        tracing::info!(teacher = %self.key(), student = %student.id, "student added");
        Ok(student)
    }

    /// Returns `false` when no student has `id`; nothing is written then.
    pub fn mark_present(&mut self, store: &dyn KvStore, id: &str) -> Result<bool, AttendanceError> {
        self.bump(store, id, Presence::Present)
    }

    pub fn mark_absent(&mut self, store: &dyn KvStore, id: &str) -> Result<bool, AttendanceError> {
        self.bump(store, id, Presence::Absent)
    }

    fn bump(
        &mut self,
        store: &dyn KvStore,
        id: &str,
        status: Presence,
    ) -> Result<bool, AttendanceError> {
        let Some(idx) = self.roster.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        let mut next = self.roster.clone();
        next[idx].record(status);
        self.commit_state(store, next, self.total_classes)?;
        Ok(true)
    }

    pub fn delete_student(&mut self, store: &dyn KvStore, id: &str) -> Result<bool, AttendanceError> {
        let next: Vec<Student> = self.roster.iter().filter(|s| s.id != id).cloned().collect();
        if next.len() == self.roster.len() {
            return Ok(false);
        }
        self.commit_state(store, next, self.total_classes)?;
        tracing::info!(teacher = %self.key(), student = %id, "student deleted");
        Ok(true)
    }

    /// Zeroes every counter. Students themselves are kept.
    pub fn end_semester(&mut self, store: &dyn KvStore) -> Result<(), AttendanceError> {
        let next: Vec<Student> = self
            .roster
            .iter()
            .map(|s| Student {
                attendance_count: 0,
                absent_count: 0,
                ..s.clone()
            })
            .collect();
        self.commit_state(store, next, 0)?;
        tracing::info!(teacher = %self.key(), students = self.roster.len(), "semester reset");
        Ok(())
    }

    /// Applies one class: every roster student gets exactly one increment.
    /// Students without a draft entry count as absent.
    pub fn record_class(
        &mut self,
        store: &dyn KvStore,
        draft: &ClassDraft,
    ) -> Result<ClassTally, AttendanceError> {
        let mut present = 0usize;
        let mut absent = 0usize;
        let mut next = self.roster.clone();
        for s in next.iter_mut() {
            let status = draft.status_of(&s.id).unwrap_or(Presence::Absent);
            match status {
                Presence::Present => present += 1,
                Presence::Absent => absent += 1,
            }
            s.record(status);
        }
        let total = self.total_classes + 1;
        self.commit_state(store, next, total)?;
        tracing::info!(teacher = %self.key(), present, absent, total_classes = total, "class recorded");
        Ok(ClassTally {
            present,
            absent,
            total_classes: total,
        })
    }
}

impl Student {
    fn record(&mut self, status: Presence) {
        match status {
            Presence::Present => self.attendance_count += 1,
            Presence::Absent => self.absent_count += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{login, LoginInput};
    use crate::settings::Settings;
    use crate::store::testing::MemoryStore;
    use crate::store::{self, KvStore};

    fn session(store: &MemoryStore) -> Session {
        let input = LoginInput {
            name: "Alice".into(),
            subject: "Math".into(),
            semester: "3".into(),
            password: "secret1".into(),
        };
        login(store, &input, &Settings::default()).expect("login").0
    }

    #[test]
    fn duplicate_roll_number_is_rejected_case_insensitively() {
        let store = MemoryStore::default();
        let mut s = session(&store);
        s.add_student(&store, "Bob", "A101").expect("add");
        let res = s.add_student(&store, "Robert", " a101 ");
        assert!(matches!(res, Err(AttendanceError::Validation(_))));
        assert_eq!(s.roster().len(), 1);
    }

    #[test]
    fn added_student_is_tagged_and_persisted() {
        let store = MemoryStore::default();
        let mut s = session(&store);
        let added = s.add_student(&store, "  Bob ", " 102 ").expect("add");
        assert_eq!(added.name, "Bob");
        assert_eq!(added.roll_no, "102");
        assert_eq!(added.teacher_key, "alice_math_3");

        let saved: Vec<Student> = store::get_json(&store, "alice_math_3-students")
            .expect("get")
            .expect("present");
        assert_eq!(saved, s.roster());
    }

    #[test]
    fn empty_fields_are_rejected() {
        let store = MemoryStore::default();
        let mut s = session(&store);
        assert!(s.add_student(&store, " ", "1").is_err());
        assert!(s.add_student(&store, "Bob", "").is_err());
        assert!(s.roster().is_empty());
    }

    #[test]
    fn direct_marking_increments_one_counter() {
        let store = MemoryStore::default();
        let mut s = session(&store);
        let bob = s.add_student(&store, "Bob", "1").expect("add");
        assert!(s.mark_present(&store, &bob.id).expect("mark"));
        assert!(s.mark_present(&store, &bob.id).expect("mark"));
        assert!(s.mark_absent(&store, &bob.id).expect("mark"));
        assert!(!s.mark_present(&store, "missing").expect("mark"));

        let b = s.student(&bob.id).expect("bob");
        assert_eq!((b.attendance_count, b.absent_count), (2, 1));
        assert_eq!(s.total_classes(), 0);
    }

    #[test]
    fn end_semester_keeps_students_and_zeroes_counters() {
        let store = MemoryStore::default();
        let mut s = session(&store);
        let bob = s.add_student(&store, "Bob", "1").expect("add");
        let eve = s.add_student(&store, "Eve", "2").expect("add");
        let mut draft = ClassDraft::new(s.roster(), true);
        draft.set(&eve.id, Presence::Absent).expect("toggle");
        s.record_class(&store, &draft).expect("class");
        s.mark_present(&store, &bob.id).expect("mark");

        s.end_semester(&store).expect("reset");
        assert_eq!(s.total_classes(), 0);
        let ids: Vec<&str> = s.roster().iter().map(|x| x.id.as_str()).collect();
        assert_eq!(ids, vec![bob.id.as_str(), eve.id.as_str()]);
        assert!(s
            .roster()
            .iter()
            .all(|x| x.attendance_count == 0 && x.absent_count == 0));
        let total: Option<u64> =
            store::get_json(&store, "alice_math_3-totalClasses").expect("get");
        assert_eq!(total, Some(0));
    }

    #[test]
    fn delete_removes_only_that_student() {
        let store = MemoryStore::default();
        let mut s = session(&store);
        let bob = s.add_student(&store, "Bob", "1").expect("add");
        s.add_student(&store, "Eve", "2").expect("add");
        assert!(s.delete_student(&store, &bob.id).expect("delete"));
        assert!(!s.delete_student(&store, &bob.id).expect("delete again"));
        assert_eq!(s.roster().len(), 1);
        assert_eq!(s.roster()[0].name, "Eve");
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let store = MemoryStore::default();
        let mut s = session(&store);
        let bob = s.add_student(&store, "Bob", "1").expect("add");
        let before = store.get_raw("alice_math_3-students").expect("get");

        store.fail_writes.set(true);
        let res = s.mark_present(&store, &bob.id);
        assert!(matches!(res, Err(AttendanceError::Storage(_))));
        assert_eq!(s.student(&bob.id).expect("bob").attendance_count, 0);
        assert!(s.add_student(&store, "Eve", "2").is_err());
        assert_eq!(s.roster().len(), 1);
        assert_eq!(store.get_raw("alice_math_3-students").expect("get"), before);
    }

    #[test]
    fn older_records_without_counters_load_as_zero() {
        let raw = r#"[{"id":"1700000000000","name":"Bob","rollNo":"7"}]"#;
        let parsed: Vec<Student> = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed[0].attendance_count, 0);
        assert_eq!(parsed[0].absent_count, 0);
        assert_eq!(parsed[0].teacher_key, "");
    }
}
