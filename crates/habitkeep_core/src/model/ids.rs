//! Stable entity identifiers and their allocation counters.
//!
//! # Responsibility
//! - Give habits and proofs short, human-readable ids (`h1`, `p7`).
//! - Allocate ids from per-kind monotonic counters stored in the snapshot.
//!
//! # Invariants
//! - Counters only move forward; an id is never handed out twice, even
//!   after the entity carrying it was deleted.
//! - The textual form is `<prefix><n>` with `n >= 1`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Error returned when an id string does not match `<prefix><n>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIdError {
    pub kind: &'static str,
    pub value: String,
}

impl Display for InvalidIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} id `{}`", self.kind, self.value)
    }
}

impl std::error::Error for InvalidIdError {}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(u64);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Builds an id from its sequence number. `0` is never allocated.
            pub fn from_seq(seq: u64) -> Self {
                Self(seq)
            }

            /// Returns the allocation sequence number.
            pub fn seq(self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = InvalidIdError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let invalid = || InvalidIdError {
                    kind: $kind,
                    value: value.to_string(),
                };
                let digits = value.trim().strip_prefix($prefix).ok_or_else(invalid)?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                match digits.parse::<u64>() {
                    Ok(0) | Err(_) => Err(invalid()),
                    Ok(seq) => Ok(Self(seq)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_string()
            }
        }
    };
}

entity_id!(
    /// Stable identifier of a habit (`h<n>`).
    HabitId,
    "h",
    "habit"
);

entity_id!(
    /// Stable identifier of a proof (`p<n>`).
    ProofId,
    "p",
    "proof"
);

/// Per-kind allocation counters, persisted with the snapshot.
///
/// Each counter holds the last sequence number handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    pub habit: u64,
    pub proof: u64,
}

impl IdCounters {
    /// Allocates the next habit id; `None` once the counter is exhausted.
    pub fn next_habit_id(&mut self) -> Option<HabitId> {
        self.habit = self.habit.checked_add(1)?;
        Some(HabitId::from_seq(self.habit))
    }

    /// Allocates the next proof id; `None` once the counter is exhausted.
    pub fn next_proof_id(&mut self) -> Option<ProofId> {
        self.proof = self.proof.checked_add(1)?;
        Some(ProofId::from_seq(self.proof))
    }
}

#[cfg(test)]
mod tests {
    use super::{HabitId, IdCounters, ProofId};

    #[test]
    fn ids_render_with_prefix_and_parse_back() {
        let id = HabitId::from_seq(12);
        assert_eq!(id.to_string(), "h12");
        assert_eq!("h12".parse::<HabitId>().unwrap(), id);
        assert_eq!(" p3 ".parse::<ProofId>().unwrap(), ProofId::from_seq(3));
    }

    #[test]
    fn parse_rejects_wrong_prefix_zero_and_garbage() {
        assert!("p1".parse::<HabitId>().is_err());
        assert!("h0".parse::<HabitId>().is_err());
        assert!("h".parse::<HabitId>().is_err());
        assert!("h-1".parse::<HabitId>().is_err());
        assert!("h1x".parse::<HabitId>().is_err());
    }

    #[test]
    fn counters_are_monotonic_per_kind() {
        let mut counters = IdCounters::default();
        assert_eq!(counters.next_habit_id(), Some(HabitId::from_seq(1)));
        assert_eq!(counters.next_habit_id(), Some(HabitId::from_seq(2)));
        assert_eq!(counters.next_proof_id(), Some(ProofId::from_seq(1)));
        assert_eq!(counters.habit, 2);
        assert_eq!(counters.proof, 1);
    }

    #[test]
    fn exhausted_counters_stop_allocating() {
        let mut counters = IdCounters {
            habit: u64::MAX,
            proof: u64::MAX - 1,
        };
        assert_eq!(counters.next_habit_id(), None);
        assert_eq!(counters.habit, u64::MAX);
        assert_eq!(counters.next_proof_id(), Some(ProofId::from_seq(u64::MAX)));
        assert_eq!(counters.next_proof_id(), None);
    }

    #[test]
    fn ids_serialize_as_strings() {
        let json = serde_json::to_string(&HabitId::from_seq(4)).unwrap();
        assert_eq!(json, "\"h4\"");
        let parsed: ProofId = serde_json::from_str("\"p9\"").unwrap();
        assert_eq!(parsed.seq(), 9);
    }
}
