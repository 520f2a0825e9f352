//! Staging area for taking one class.
//!
//! ```text
//! Idle --start--> Drafting --commit--> Idle
//!                  Drafting --cancel--> Idle
//! ```
//!
//! Counters are only touched on commit.

use crate::error::AttendanceError;
use crate::roster::{ClassTally, Student};
use crate::session::Session;
use crate::store::KvStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Present,
    Absent,
}

impl Presence {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftEntry {
    pub student_id: String,
    pub status: Presence,
}

/// One entry per student in the roster snapshot, in roster order.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDraft {
    entries: Vec<DraftEntry>,
}

impl ClassDraft {
    pub fn new(roster: &[Student], preselect_all: bool) -> Self {
        let status = if preselect_all {
            Presence::Present
        } else {
            Presence::Absent
        };
        Self {
            entries: roster
                .iter()
                .map(|s| DraftEntry {
                    student_id: s.id.clone(),
                    status,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[DraftEntry] {
        &self.entries
    }

    pub fn status_of(&self, student_id: &str) -> Option<Presence> {
        self.entries
            .iter()
            .find(|e| e.student_id == student_id)
            .map(|e| e.status)
    }

    pub fn set(&mut self, student_id: &str, status: Presence) -> Result<(), AttendanceError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.student_id == student_id)
            .ok_or_else(|| AttendanceError::NotFound(student_id.to_string()))?;
        entry.status = status;
        Ok(())
    }

    pub fn mark_all_present(&mut self) {
        for e in self.entries.iter_mut() {
            e.status = Presence::Present;
        }
    }

    pub fn present_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == Presence::Present)
            .count()
    }
}

#[derive(Debug, Default)]
pub enum ClassWorkflow {
    #[default]
    Idle,
    Drafting(ClassDraft),
}

const NO_CLASS: AttendanceError = AttendanceError::Workflow("no class is in progress");

impl ClassWorkflow {
    pub fn draft(&self) -> Option<&ClassDraft> {
        match self {
            Self::Idle => None,
            Self::Drafting(d) => Some(d),
        }
    }

    pub fn start(
        &mut self,
        roster: &[Student],
        preselect_all: bool,
    ) -> Result<&ClassDraft, AttendanceError> {
        if let Self::Drafting(_) = self {
            return Err(AttendanceError::Workflow("a class is already in progress"));
        }
        *self = Self::Drafting(ClassDraft::new(roster, preselect_all));
        match self {
            Self::Drafting(d) => Ok(&*d),
            Self::Idle => Err(NO_CLASS),
        }
    }

    fn draft_mut(&mut self) -> Result<&mut ClassDraft, AttendanceError> {
        match self {
            Self::Drafting(d) => Ok(d),
            Self::Idle => Err(NO_CLASS),
        }
    }

    pub fn preselect_all(&mut self) -> Result<&ClassDraft, AttendanceError> {
        let draft = self.draft_mut()?;
        draft.mark_all_present();
        Ok(&*draft)
    }

    pub fn toggle(&mut self, student_id: &str, status: Presence) -> Result<(), AttendanceError> {
        self.draft_mut()?.set(student_id, status)
    }

    /// Records the class. On a storage failure the draft is kept so the
    /// teacher can retry.
    pub fn commit(
        &mut self,
        session: &mut Session,
        store: &dyn KvStore,
    ) -> Result<ClassTally, AttendanceError> {
        let draft = self.draft_mut()?;
        let tally = session.record_class(store, draft)?;
        *self = Self::Idle;
        Ok(tally)
    }

    pub fn cancel(&mut self) -> Result<(), AttendanceError> {
        self.draft_mut()?;
        *self = Self::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{login, LoginInput};
    use crate::settings::Settings;
    use crate::store::testing::MemoryStore;

    fn session_with(store: &MemoryStore, names: &[(&str, &str)]) -> Session {
        let input = LoginInput {
            name: "Alice".into(),
            subject: "Math".into(),
            semester: "3".into(),
            password: "secret1".into(),
        };
        let (mut s, _) = login(store, &input, &Settings::default()).expect("login");
        for (name, roll) in names {
            s.add_student(store, name, roll).expect("add");
        }
        s
    }

    fn counters(s: &Session) -> Vec<(u64, u64)> {
        s.roster()
            .iter()
            .map(|x| (x.attendance_count, x.absent_count))
            .collect()
    }

    #[test]
    fn commit_counts_present_and_absent_once() {
        let store = MemoryStore::default();
        let mut s = session_with(&store, &[("Ann", "1"), ("Ben", "2"), ("Cal", "3")]);
        let ids: Vec<String> = s.roster().iter().map(|x| x.id.clone()).collect();

        let mut wf = ClassWorkflow::default();
        wf.start(s.roster(), false).expect("start");
        wf.toggle(&ids[0], Presence::Present).expect("toggle");
        wf.toggle(&ids[2], Presence::Present).expect("toggle");
        let tally = wf.commit(&mut s, &store).expect("commit");

        assert_eq!((tally.present, tally.absent, tally.total_classes), (2, 1, 1));
        assert_eq!(counters(&s), vec![(1, 0), (0, 1), (1, 0)]);
        assert_eq!(s.total_classes(), 1);
        assert!(wf.draft().is_none());
    }

    #[test]
    fn student_added_after_start_counts_absent() {
        let store = MemoryStore::default();
        let mut s = session_with(&store, &[("Ann", "1")]);
        let mut wf = ClassWorkflow::default();
        wf.start(s.roster(), true).expect("start");
        s.add_student(&store, "Late", "9").expect("add");
        wf.commit(&mut s, &store).expect("commit");
        assert_eq!(counters(&s), vec![(1, 0), (0, 1)]);
    }

    #[test]
    fn cancel_leaves_counters_untouched() {
        let store = MemoryStore::default();
        let mut s = session_with(&store, &[("Ann", "1"), ("Ben", "2")]);
        let before = counters(&s);
        let id = s.roster()[0].id.clone();

        let mut wf = ClassWorkflow::default();
        wf.start(s.roster(), false).expect("start");
        wf.toggle(&id, Presence::Present).expect("toggle");
        wf.preselect_all().expect("preselect");
        wf.cancel().expect("cancel");

        assert_eq!(counters(&s), before);
        assert_eq!(s.total_classes(), 0);
        assert!(matches!(
            wf.commit(&mut s, &store),
            Err(AttendanceError::Workflow(_))
        ));
    }

    #[test]
    fn transitions_outside_drafting_are_rejected() {
        let mut wf = ClassWorkflow::default();
        assert!(wf.toggle("x", Presence::Present).is_err());
        assert!(wf.cancel().is_err());
        assert!(wf.preselect_all().is_err());

        wf.start(&[], false).expect("start");
        assert!(wf.start(&[], false).is_err());
        assert!(matches!(
            wf.toggle("unknown", Presence::Present),
            Err(AttendanceError::NotFound(_))
        ));
    }

    #[test]
    fn preselect_defaults_every_entry() {
        let store = MemoryStore::default();
        let s = session_with(&store, &[("Ann", "1"), ("Ben", "2")]);
        let draft = ClassDraft::new(s.roster(), true);
        assert_eq!(draft.present_count(), 2);
        let draft = ClassDraft::new(s.roster(), false);
        assert_eq!(draft.present_count(), 0);
    }

    #[test]
    fn failed_commit_keeps_draft() {
        let store = MemoryStore::default();
        let mut s = session_with(&store, &[("Ann", "1")]);
        let mut wf = ClassWorkflow::default();
        wf.start(s.roster(), true).expect("start");
        store.fail_writes.set(true);
        assert!(wf.commit(&mut s, &store).is_err());
        assert!(wf.draft().is_some());
        assert_eq!(s.total_classes(), 0);

        store.fail_writes.set(false);
        wf.commit(&mut s, &store).expect("retry");
        assert_eq!(s.total_classes(), 1);
    }

    #[test]
    fn presence_parses_case_insensitively() {
        assert_eq!(Presence::parse("Present"), Some(Presence::Present));
        assert_eq!(Presence::parse(" absent"), Some(Presence::Absent));
        assert_eq!(Presence::parse("late"), None);
    }
}
