//! Habit/proof repository contract and its state-store implementation.
//!
//! # Responsibility
//! - Expose domain-shaped operations, hiding the `Mutation` format.
//! - Keep read results consistent by serving them from one snapshot.
//!
//! # Invariants
//! - Every write goes through `StateStore::apply` and is durable on return.
//! - Lookups of unknown ids return `StoreError::NotFound`, except `get_*`
//!   which report absence as `Ok(None)`.

use crate::model::habit::{Habit, HabitChanges, HabitConfig};
use crate::model::ids::{HabitId, ProofId};
use crate::model::proof::{Proof, ProofInput};
use crate::store::{Applied, EntityRef, Mutation, Snapshot, StateStore, StoreError, StoreResult};
use std::sync::Arc;

/// Outcome of deleting a habit together with its proofs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitDeletion {
    pub habit: Habit,
    pub proofs_removed: usize,
}

/// Repository interface for habits and their proofs.
pub trait HabitRepository {
    fn create_habit(&self, name: &str, config: HabitConfig) -> StoreResult<Habit>;
    fn update_habit(&self, id: HabitId, changes: HabitChanges) -> StoreResult<Habit>;
    fn delete_habit(&self, id: HabitId) -> StoreResult<HabitDeletion>;
    fn get_habit(&self, id: HabitId) -> StoreResult<Option<Habit>>;
    fn list_habits(&self, include_archived: bool) -> StoreResult<Vec<Habit>>;
    fn add_proof(&self, habit_id: HabitId, input: ProofInput) -> StoreResult<Proof>;
    fn list_proofs(&self, habit_id: HabitId) -> StoreResult<ProofCursor>;
    fn delete_proof(&self, id: ProofId) -> StoreResult<Proof>;
    fn snapshot(&self) -> Arc<Snapshot>;
}

/// Lazy, restartable view over one habit's proofs.
///
/// The view is pinned to the snapshot taken when it was created, so every
/// pass yields the same finite sequence ordered by timestamp.
#[derive(Debug, Clone)]
pub struct ProofCursor {
    snapshot: Arc<Snapshot>,
    habit_id: HabitId,
}

impl ProofCursor {
    pub fn habit_id(&self) -> HabitId {
        self.habit_id
    }

    /// Starts a new pass from the earliest proof.
    pub fn iter(&self) -> impl Iterator<Item = &Proof> + '_ {
        self.snapshot.proofs_for(self.habit_id)
    }

    pub fn to_vec(&self) -> Vec<Proof> {
        self.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a ProofCursor {
    type Item = &'a Proof;
    type IntoIter = Box<dyn Iterator<Item = &'a Proof> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Repository backed by a shared `StateStore`.
#[derive(Clone)]
pub struct StoreHabitRepository {
    store: Arc<StateStore>,
}

impl StoreHabitRepository {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }
}

impl HabitRepository for StoreHabitRepository {
    fn create_habit(&self, name: &str, config: HabitConfig) -> StoreResult<Habit> {
        match self.store.apply(Mutation::CreateHabit {
            name: name.to_string(),
            config,
        })? {
            Applied::HabitCreated(habit) => Ok(habit),
            other => Err(unexpected("create_habit", &other)),
        }
    }

    fn update_habit(&self, id: HabitId, changes: HabitChanges) -> StoreResult<Habit> {
        match self.store.apply(Mutation::UpdateHabit { id, changes })? {
            Applied::HabitUpdated(habit) => Ok(habit),
            other => Err(unexpected("update_habit", &other)),
        }
    }

    fn delete_habit(&self, id: HabitId) -> StoreResult<HabitDeletion> {
        match self.store.apply(Mutation::DeleteHabit(id))? {
            Applied::HabitDeleted {
                habit,
                proofs_removed,
            } => Ok(HabitDeletion {
                habit,
                proofs_removed,
            }),
            other => Err(unexpected("delete_habit", &other)),
        }
    }

    fn get_habit(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        Ok(self.store.get_snapshot().habit(id).cloned())
    }

    fn list_habits(&self, include_archived: bool) -> StoreResult<Vec<Habit>> {
        Ok(self
            .store
            .get_snapshot()
            .habits()
            .filter(|habit| include_archived || !habit.archived)
            .cloned()
            .collect())
    }

    fn add_proof(&self, habit_id: HabitId, input: ProofInput) -> StoreResult<Proof> {
        match self.store.apply(Mutation::AddProof { habit_id, input })? {
            Applied::ProofAdded(proof) => Ok(proof),
            other => Err(unexpected("add_proof", &other)),
        }
    }

    fn list_proofs(&self, habit_id: HabitId) -> StoreResult<ProofCursor> {
        let snapshot = self.store.get_snapshot();
        if !snapshot.contains_habit(habit_id) {
            return Err(StoreError::NotFound(EntityRef::Habit(habit_id)));
        }
        Ok(ProofCursor { snapshot, habit_id })
    }

    fn delete_proof(&self, id: ProofId) -> StoreResult<Proof> {
        match self.store.apply(Mutation::DeleteProof(id))? {
            Applied::ProofDeleted(proof) => Ok(proof),
            other => Err(unexpected("delete_proof", &other)),
        }
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.store.get_snapshot()
    }
}

fn unexpected(op: &str, applied: &Applied) -> StoreError {
    StoreError::CorruptState(format!("{op} produced unexpected result {applied:?}"))
}
