//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted note record.
//! - Provide the caller-side text validation used before submitting writes.
//!
//! # Invariants
//! - `id` is assigned by the store on insert and stays stable across updates.
//! - The store accepts any text; blank input is rejected by callers through
//!   [`validate_note_text`].

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned note identifier. Strictly increasing, never reused.
pub type NoteId = i64;

/// One persisted note row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub text: String,
    /// Insert time in epoch milliseconds; `0` for rows older than the column.
    pub created_at: i64,
}

impl Note {
    /// Returns a copy carrying `text`, keeping identity and creation time.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            id: self.id,
            text: text.into(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValidationError {
    BlankText,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankText => write!(f, "note text must not be blank"),
        }
    }
}

impl Error for NoteValidationError {}

/// Rejects text that is empty or whitespace-only.
pub fn validate_note_text(text: &str) -> Result<(), NoteValidationError> {
    if text.trim().is_empty() {
        return Err(NoteValidationError::BlankText);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_note_text, Note, NoteValidationError};

    #[test]
    fn with_text_keeps_identity() {
        let note = Note {
            id: 7,
            text: "draft".to_string(),
            created_at: 1_700_000_000_000,
        };
        let edited = note.with_text("final");
        assert_eq!(edited.id, 7);
        assert_eq!(edited.created_at, note.created_at);
        assert_eq!(edited.text, "final");
        assert_eq!(note.text, "draft");
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(
            validate_note_text("  \n\t"),
            Err(NoteValidationError::BlankText)
        );
        assert_eq!(validate_note_text(""), Err(NoteValidationError::BlankText));
        assert!(validate_note_text(" buy milk ").is_ok());
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let note = Note {
            id: 1,
            text: "buy milk".to_string(),
            created_at: 0,
        };
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"id": 1, "text": "buy milk", "created_at": 0})
        );
    }
}
