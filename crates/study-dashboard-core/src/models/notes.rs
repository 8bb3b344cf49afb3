//! Nurse note models.

use serde::{Deserialize, Serialize};

/// The three free-text care note fields attached to a patient.
///
/// A patient without a row in the note store has all three fields empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    /// SMART objectives
    pub objectives: String,
    /// Behavioural activation tasks
    pub tasks: String,
    pub comments: String,
}

impl NoteFields {
    pub fn new(
        objectives: impl Into<String>,
        tasks: impl Into<String>,
        comments: impl Into<String>,
    ) -> Self {
        Self {
            objectives: objectives.into(),
            tasks: tasks.into(),
            comments: comments.into(),
        }
    }

    /// True when no field has content.
    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty() && self.tasks.is_empty() && self.comments.is_empty()
    }

    /// Field values in column order: objectives, tasks, comments.
    pub fn values(&self) -> [&str; 3] {
        [&self.objectives, &self.tasks, &self.comments]
    }
}

/// Whether a save touched an existing row or added one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    Updated,
    Appended,
}
