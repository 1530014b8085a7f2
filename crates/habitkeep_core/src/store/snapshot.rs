//! In-memory snapshot of all habits and proofs, plus the mutations that
//! transform it.
//!
//! # Invariants
//! - Habit ids are unique; proof ids are unique.
//! - Every proof's `habit_id` resolves to a habit in the same snapshot.
//! - Proofs are kept ordered by `(timestamp, id)`.
//! - `next_ids` never falls behind the highest allocated id.

use super::{EntityRef, StoreError, StoreResult};
use crate::model::habit::{Habit, HabitChanges, HabitConfig};
use crate::model::ids::{HabitId, IdCounters, ProofId};
use crate::model::proof::{Proof, ProofInput};
use std::collections::{BTreeMap, HashSet};

/// Complete state of the store at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    habits: BTreeMap<HabitId, Habit>,
    proofs: Vec<Proof>,
    next_ids: IdCounters,
}

/// Described change to a snapshot, applied by the state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateHabit { name: String, config: HabitConfig },
    UpdateHabit { id: HabitId, changes: HabitChanges },
    DeleteHabit(HabitId),
    AddProof { habit_id: HabitId, input: ProofInput },
    DeleteProof(ProofId),
}

impl Mutation {
    /// Stable operation name used in log events.
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::CreateHabit { .. } => "create_habit",
            Self::UpdateHabit { .. } => "update_habit",
            Self::DeleteHabit(_) => "delete_habit",
            Self::AddProof { .. } => "add_proof",
            Self::DeleteProof(_) => "delete_proof",
        }
    }
}

/// Result of a successfully applied mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    HabitCreated(Habit),
    HabitUpdated(Habit),
    /// Deleting a habit cascades to its proofs.
    HabitDeleted { habit: Habit, proofs_removed: usize },
    ProofAdded(Proof),
    ProofDeleted(Proof),
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuilds a snapshot from persisted parts, rejecting any state that
    /// breaks the snapshot invariants.
    ///
    /// When `next_ids` is absent it is derived from the highest ids present.
    pub(crate) fn from_parts(
        habits: Vec<Habit>,
        mut proofs: Vec<Proof>,
        next_ids: Option<IdCounters>,
    ) -> Result<Self, String> {
        let mut by_id = BTreeMap::new();
        for habit in habits {
            habit
                .validate()
                .map_err(|err| format!("habit {}: {err}", habit.id))?;
            let id = habit.id;
            if by_id.insert(id, habit).is_some() {
                return Err(format!("duplicate habit id {id}"));
            }
        }

        let mut proof_ids = HashSet::with_capacity(proofs.len());
        for proof in &proofs {
            proof
                .validate()
                .map_err(|err| format!("proof {}: {err}", proof.id))?;
            if !proof_ids.insert(proof.id) {
                return Err(format!("duplicate proof id {}", proof.id));
            }
            if !by_id.contains_key(&proof.habit_id) {
                return Err(format!(
                    "proof {} references missing habit {}",
                    proof.id, proof.habit_id
                ));
            }
        }
        proofs.sort_by_key(Proof::order_key);

        let max_habit = by_id.keys().next_back().map_or(0, |id| id.seq());
        let max_proof = proof_ids.iter().map(|id| id.seq()).max().unwrap_or(0);
        let next_ids = match next_ids {
            Some(counters) => {
                if counters.habit < max_habit || counters.proof < max_proof {
                    return Err(format!(
                        "id counters (habit={}, proof={}) are behind stored ids (habit={}, proof={})",
                        counters.habit, counters.proof, max_habit, max_proof
                    ));
                }
                counters
            }
            None => IdCounters {
                habit: max_habit,
                proof: max_proof,
            },
        };

        Ok(Self {
            habits: by_id,
            proofs,
            next_ids,
        })
    }

    /// Habits ordered by id.
    pub fn habits(&self) -> impl Iterator<Item = &Habit> + '_ {
        self.habits.values()
    }

    pub fn habit(&self, id: HabitId) -> Option<&Habit> {
        self.habits.get(&id)
    }

    pub fn contains_habit(&self, id: HabitId) -> bool {
        self.habits.contains_key(&id)
    }

    /// All proofs ordered by `(timestamp, id)`.
    pub fn proofs(&self) -> &[Proof] {
        &self.proofs
    }

    pub fn proof(&self, id: ProofId) -> Option<&Proof> {
        self.proofs.iter().find(|proof| proof.id == id)
    }

    /// Proofs of one habit, ordered by `(timestamp, id)`.
    pub fn proofs_for(&self, habit_id: HabitId) -> impl Iterator<Item = &Proof> + '_ {
        self.proofs
            .iter()
            .filter(move |proof| proof.habit_id == habit_id)
    }

    pub fn habit_count(&self) -> usize {
        self.habits.len()
    }

    pub fn proof_count(&self) -> usize {
        self.proofs.len()
    }

    pub fn next_ids(&self) -> IdCounters {
        self.next_ids
    }

    /// Validates and applies one mutation in place.
    ///
    /// On error the snapshot may be partially touched; callers apply
    /// mutations to a scratch copy and discard it on failure.
    pub(crate) fn apply(&mut self, mutation: Mutation, now_ms: i64) -> StoreResult<Applied> {
        match mutation {
            Mutation::CreateHabit { name, config } => {
                let id = self
                    .next_ids
                    .next_habit_id()
                    .ok_or_else(|| {
                        StoreError::CorruptState("habit id counter exhausted".to_string())
                    })?;
                let habit = Habit::new(id, &name, config, now_ms);
                habit.validate()?;
                self.habits.insert(id, habit.clone());
                Ok(Applied::HabitCreated(habit))
            }
            Mutation::UpdateHabit { id, changes } => {
                let habit = self
                    .habits
                    .get_mut(&id)
                    .ok_or(StoreError::NotFound(EntityRef::Habit(id)))?;
                habit.apply_changes(changes);
                habit.validate()?;
                Ok(Applied::HabitUpdated(habit.clone()))
            }
            Mutation::DeleteHabit(id) => {
                let habit = self
                    .habits
                    .remove(&id)
                    .ok_or(StoreError::NotFound(EntityRef::Habit(id)))?;
                let before = self.proofs.len();
                self.proofs.retain(|proof| proof.habit_id != id);
                Ok(Applied::HabitDeleted {
                    habit,
                    proofs_removed: before - self.proofs.len(),
                })
            }
            Mutation::AddProof { habit_id, input } => {
                if !self.habits.contains_key(&habit_id) {
                    return Err(StoreError::NotFound(EntityRef::Habit(habit_id)));
                }
                let id = self
                    .next_ids
                    .next_proof_id()
                    .ok_or_else(|| {
                        StoreError::CorruptState("proof id counter exhausted".to_string())
                    })?;
                let proof = Proof {
                    id,
                    habit_id,
                    timestamp: input.timestamp.unwrap_or(now_ms),
                    note: input.note,
                    evidence: input.evidence,
                };
                proof.validate()?;
                let key = proof.order_key();
                let position = self
                    .proofs
                    .partition_point(|existing| existing.order_key() <= key);
                self.proofs.insert(position, proof.clone());
                Ok(Applied::ProofAdded(proof))
            }
            Mutation::DeleteProof(id) => {
                let position = self
                    .proofs
                    .iter()
                    .position(|proof| proof.id == id)
                    .ok_or(StoreError::NotFound(EntityRef::Proof(id)))?;
                Ok(Applied::ProofDeleted(self.proofs.remove(position)))
            }
        }
    }
}
