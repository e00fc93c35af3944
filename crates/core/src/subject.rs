//! Subject collections and the per-question subject selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two fixed textbook collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// Textbook on innovations
    Innovations,
    /// Textbook on institutional economics
    Economics,
}

impl Subject {
    /// All subjects in canonical order. Evidence is always concatenated in
    /// this order.
    pub const ALL: [Subject; 2] = [Subject::Innovations, Subject::Economics];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Innovations => "innovations",
            Subject::Economics => "economics",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which collection(s) a question was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectSelection {
    Innovations,
    Economics,
    Both,
    Unknown,
}

impl SubjectSelection {
    /// Derive the selection from per-subject hit flags
    pub fn from_hits(innovations: bool, economics: bool) -> Self {
        match (innovations, economics) {
            (true, true) => SubjectSelection::Both,
            (true, false) => SubjectSelection::Innovations,
            (false, true) => SubjectSelection::Economics,
            (false, false) => SubjectSelection::Unknown,
        }
    }

    /// Derive the selection from the list of subjects that produced hits
    pub fn from_subjects(subjects: &[Subject]) -> Self {
        Self::from_hits(
            subjects.contains(&Subject::Innovations),
            subjects.contains(&Subject::Economics),
        )
    }

    /// Subjects covered by this selection, in canonical order
    pub fn subjects(&self) -> &'static [Subject] {
        match self {
            SubjectSelection::Innovations => &[Subject::Innovations],
            SubjectSelection::Economics => &[Subject::Economics],
            SubjectSelection::Both => &Subject::ALL,
            SubjectSelection::Unknown => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectSelection::Innovations => "innovations",
            SubjectSelection::Economics => "economics",
            SubjectSelection::Both => "both",
            SubjectSelection::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SubjectSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_from_hits() {
        assert_eq!(SubjectSelection::from_hits(true, true), SubjectSelection::Both);
        assert_eq!(
            SubjectSelection::from_hits(true, false),
            SubjectSelection::Innovations
        );
        assert_eq!(
            SubjectSelection::from_hits(false, true),
            SubjectSelection::Economics
        );
        assert_eq!(
            SubjectSelection::from_hits(false, false),
            SubjectSelection::Unknown
        );
    }

    #[test]
    fn test_selection_subjects_order() {
        assert_eq!(
            SubjectSelection::Both.subjects(),
            &[Subject::Innovations, Subject::Economics]
        );
        assert!(SubjectSelection::Unknown.subjects().is_empty());
        assert_eq!(
            SubjectSelection::from_subjects(&[Subject::Economics]),
            SubjectSelection::Economics
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SubjectSelection::Both).unwrap();
        assert_eq!(json, "\"both\"");
        let subject: Subject = serde_json::from_str("\"economics\"").unwrap();
        assert_eq!(subject, Subject::Economics);
    }
}
