//! Proof-of-completion records.
//!
//! # Invariants
//! - A proof is append-only: it is never mutated after creation.
//! - `habit_id` always resolves to a habit in the same snapshot.
//! - `evidence` is an opaque path/URI reference; no binary is stored.

use crate::model::habit::{check_epoch_ms, check_text_len, ValidationError};
use crate::model::ids::{HabitId, ProofId};
use serde::{Deserialize, Serialize};

/// Timestamped record asserting a habit was completed on some occasion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub id: ProofId,
    pub habit_id: HabitId,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub evidence: Option<String>,
}

/// Caller input for a new proof.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofInput {
    pub note: Option<String>,
    pub evidence: Option<String>,
    /// Defaults to the current time when `None`.
    pub timestamp: Option<i64>,
}

impl ProofInput {
    /// Proof with just a note, stamped at the current time.
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::default()
        }
    }
}

impl Proof {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text_len("note", self.note.as_deref())?;
        check_text_len("evidence", self.evidence.as_deref())?;
        check_epoch_ms("timestamp", self.timestamp)?;
        Ok(())
    }

    /// Sort key that keeps proofs ordered by time, then by allocation.
    pub fn order_key(&self) -> (i64, ProofId) {
        (self.timestamp, self.id)
    }
}
