use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Label applied when the user starts a timer without naming the task.
pub const UNLABELED: &str = "Unlabeled";

/// One completed or manually ended focus interval.
///
/// Immutable once written except for `notes`, which the user may attach
/// after the fact. Breaks never produce a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Local calendar day the session ended on.
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Seconds of focus, always > 0.
    pub duration: u64,
    pub label: String,
    #[serde(default)]
    pub notes: String,
}

/// In-memory session history plus the append-only label registry used for
/// autocomplete. Mutated by the timer controller, persisted via the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionLedger {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl SessionLedger {
    /// Append a session that ended at `ended_at` and lasted `duration`
    /// seconds. Returns the index of the new record so notes can be attached
    /// later.
    pub fn add(&mut self, duration: u64, label: &str, ended_at: DateTime<Utc>) -> usize {
        let trimmed = label.trim();
        let session = Session {
            date: ended_at.with_timezone(&Local).date_naive(),
            start: ended_at - chrono::Duration::seconds(duration as i64),
            end: ended_at,
            duration,
            label: if trimmed.is_empty() {
                UNLABELED.to_string()
            } else {
                trimmed.to_string()
            },
            notes: String::new(),
        };
        self.sessions.push(session);

        if !trimmed.is_empty() && !self.labels.iter().any(|l| l == trimmed) {
            self.labels.push(trimmed.to_string());
        }

        self.sessions.len() - 1
    }

    /// The only mutation allowed on a recorded session.
    pub fn attach_notes(&mut self, index: usize, notes: &str) -> bool {
        match self.sessions.get_mut(index) {
            Some(session) => {
                session.notes = notes.trim().to_string();
                true
            }
            None => false,
        }
    }

    /// Explicit user removal, by index.
    pub fn delete(&mut self, index: usize) -> bool {
        if index < self.sessions.len() {
            self.sessions.remove(index);
            true
        } else {
            false
        }
    }

    /// Case-insensitive substring match over the label registry.
    pub fn matching_labels(&self, query: &str) -> Vec<String> {
        let needle = query.to_lowercase();
        self.labels
            .iter()
            .filter(|l| l.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn add_fills_in_start_and_date() {
        let mut ledger = SessionLedger::default();
        let end = at(0);
        let idx = ledger.add(1500, "writing", end);
        assert_eq!(idx, 0);

        let session = &ledger.sessions[0];
        assert_eq!(session.end - session.start, chrono::Duration::seconds(1500));
        assert_eq!(session.duration, 1500);
        assert_eq!(session.date, end.with_timezone(&Local).date_naive());
    }

    #[test]
    fn empty_label_normalizes_to_unlabeled() {
        let mut ledger = SessionLedger::default();
        ledger.add(60, "   ", at(0));
        assert_eq!(ledger.sessions[0].label, UNLABELED);
        // The registry only accumulates real labels.
        assert!(ledger.labels.is_empty());
    }

    #[test]
    fn label_registry_is_append_only_and_distinct() {
        let mut ledger = SessionLedger::default();
        ledger.add(60, "deep work", at(0));
        ledger.add(60, "deep work", at(100));
        ledger.add(60, "email", at(200));
        assert_eq!(ledger.labels, vec!["deep work", "email"]);
        ledger.delete(0);
        assert_eq!(ledger.labels.len(), 2);
    }

    #[test]
    fn notes_attach_only_to_existing_indices() {
        let mut ledger = SessionLedger::default();
        let idx = ledger.add(120, "reading", at(0));
        assert!(ledger.attach_notes(idx, "chapter 4 "));
        assert_eq!(ledger.sessions[idx].notes, "chapter 4");
        assert!(!ledger.attach_notes(idx + 1, "nope"));
    }

    #[test]
    fn delete_out_of_range_is_refused() {
        let mut ledger = SessionLedger::default();
        ledger.add(60, "a", at(0));
        assert!(!ledger.delete(5));
        assert!(ledger.delete(0));
        assert!(ledger.sessions.is_empty());
    }

    #[test]
    fn matching_labels_is_case_insensitive() {
        let mut ledger = SessionLedger::default();
        ledger.add(60, "Deep Work", at(0));
        ledger.add(60, "email", at(100));
        assert_eq!(ledger.matching_labels("deep"), vec!["Deep Work"]);
        assert_eq!(ledger.matching_labels(""), vec!["Deep Work", "email"]);
        assert!(ledger.matching_labels("zzz").is_empty());
    }
}
