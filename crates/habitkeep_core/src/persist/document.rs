//! On-disk JSON document schema.
//!
//! Shape: `{ version, next_ids, habits: [..], proofs: [..] }`. `version`
//! and `next_ids` may be absent in hand-written documents; `habits` and
//! `proofs` are required.

use super::LoadError;
use crate::model::habit::Habit;
use crate::model::ids::IdCounters;
use crate::model::proof::Proof;
use crate::store::Snapshot;
use serde::{Deserialize, Serialize};

/// Latest document version written by this binary.
pub const STATE_DOCUMENT_VERSION: u32 = 1;

/// Wire form of the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub next_ids: Option<IdCounters>,
    pub habits: Vec<Habit>,
    pub proofs: Vec<Proof>,
}

fn default_version() -> u32 {
    STATE_DOCUMENT_VERSION
}

impl StateDocument {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            version: STATE_DOCUMENT_VERSION,
            next_ids: Some(snapshot.next_ids()),
            habits: snapshot.habits().cloned().collect(),
            proofs: snapshot.proofs().to_vec(),
        }
    }

    pub fn into_snapshot(self) -> Result<Snapshot, LoadError> {
        if self.version > STATE_DOCUMENT_VERSION {
            return Err(LoadError::Corrupt(format!(
                "document version {} is newer than supported {}",
                self.version, STATE_DOCUMENT_VERSION
            )));
        }
        Snapshot::from_parts(self.habits, self.proofs, self.next_ids).map_err(LoadError::Corrupt)
    }
}

pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(&StateDocument::from_snapshot(snapshot))?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot, LoadError> {
    let document: StateDocument = serde_json::from_slice(bytes)
        .map_err(|err| LoadError::Corrupt(format!("invalid JSON document: {err}")))?;
    document.into_snapshot()
}
