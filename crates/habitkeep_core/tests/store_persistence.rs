use habitkeep_core::persist::decode_snapshot;
use habitkeep_core::{
    HabitConfig, HabitId, HabitRepository, JsonFileStorage, MemoryStorage, PersistError,
    ProofInput, SnapshotStorage, StateStore, StorageLock, StoreConfig, StoreError,
    StoreHabitRepository,
};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// File storage whose next `n` writes fail with an I/O error.
struct FlakyFileStorage {
    inner: JsonFileStorage,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl FlakyFileStorage {
    fn new(path: &Path) -> Self {
        Self {
            inner: JsonFileStorage::new(path),
            failures_left: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        }
    }

    fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
        self.attempts.store(0, Ordering::SeqCst);
    }
}

impl SnapshotStorage for FlakyFileStorage {
    fn lock(&self) -> io::Result<StorageLock> {
        self.inner.lock()
    }

    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        self.inner.read()
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(io::Error::new(io::ErrorKind::Other, "simulated disk failure"));
        }
        self.inner.write_atomic(bytes)
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

fn file_store(path: &Path) -> Arc<StateStore> {
    Arc::new(
        StateStore::open_file(&StoreConfig::new(path))
            .unwrap()
            .with_retry_backoff(Duration::ZERO),
    )
}

fn assert_disk_matches_memory(path: &Path, store: &StateStore) {
    let on_disk = decode_snapshot(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(on_disk, *store.get_snapshot());
}

#[test]
fn missing_document_opens_empty_and_is_not_created_until_first_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let store = file_store(&path);
    assert_eq!(store.get_snapshot().habit_count(), 0);
    assert!(!path.exists());

    let repo = StoreHabitRepository::new(store);
    repo.create_habit("Run", HabitConfig::default()).unwrap();
    assert!(path.exists());
}

#[test]
fn every_mutation_is_written_through_and_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = file_store(&path);
    let repo = StoreHabitRepository::new(Arc::clone(&store));

    let run = repo.create_habit("Run", HabitConfig::default()).unwrap();
    assert_disk_matches_memory(&path, &store);
    let read = repo
        .create_habit(
            "Read",
            HabitConfig {
                due_weekdays: vec![1, 3],
                duration_days: Some(30),
                ..HabitConfig::default()
            },
        )
        .unwrap();
    assert_disk_matches_memory(&path, &store);
    repo.add_proof(run.id, ProofInput::note("5k")).unwrap();
    assert_disk_matches_memory(&path, &store);
    repo.add_proof(read.id, ProofInput::default()).unwrap();
    assert_disk_matches_memory(&path, &store);
    repo.delete_habit(run.id).unwrap();
    assert_disk_matches_memory(&path, &store);

    let reopened = file_store(&path);
    assert_eq!(*reopened.get_snapshot(), *store.get_snapshot());

    // Counters survive the reload, so ids keep moving forward.
    let reopened_repo = StoreHabitRepository::new(reopened);
    let next = reopened_repo
        .create_habit("Run again", HabitConfig::default())
        .unwrap();
    assert_eq!(next.id.to_string(), "h3");
}

#[test]
fn document_uses_stable_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let repo = StoreHabitRepository::new(file_store(&path));
    let habit = repo.create_habit("Run", HabitConfig::default()).unwrap();
    repo.add_proof(habit.id, ProofInput::note("5k")).unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["version"], 1);
    assert_eq!(raw["next_ids"]["habit"], 1);
    assert_eq!(raw["habits"][0]["id"], "h1");
    assert_eq!(raw["habits"][0]["name"], "Run");
    assert_eq!(raw["habits"][0]["archived"], false);
    assert_eq!(raw["proofs"][0]["id"], "p1");
    assert_eq!(raw["proofs"][0]["habit_id"], "h1");
    assert_eq!(raw["proofs"][0]["note"], "5k");
    assert!(raw["proofs"][0]["timestamp"].is_i64());
}

#[test]
fn failed_write_leaves_memory_and_disk_at_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let storage = Arc::new(FlakyFileStorage::new(&path));
    let store = Arc::new(
        StateStore::open(Arc::clone(&storage))
            .unwrap()
            .with_retry_backoff(Duration::ZERO),
    );
    let repo = StoreHabitRepository::new(Arc::clone(&store));
    let habit = repo.create_habit("Run", HabitConfig::default()).unwrap();

    let memory_before = store.get_snapshot();
    let disk_before = std::fs::read(&path).unwrap();

    storage.fail_next(2);
    let err = repo.add_proof(habit.id, ProofInput::note("5k")).unwrap_err();
    assert!(matches!(err, StoreError::Persistence(PersistError::Io(_))));
    assert_eq!(storage.attempts.load(Ordering::SeqCst), 2);

    assert_eq!(*store.get_snapshot(), *memory_before);
    assert_eq!(std::fs::read(&path).unwrap(), disk_before);

    // The failed attempt must not burn an id either.
    let proof = repo.add_proof(habit.id, ProofInput::note("5k")).unwrap();
    assert_eq!(proof.id.to_string(), "p1");
}

#[test]
fn transient_write_failure_is_retried_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let storage = Arc::new(FlakyFileStorage::new(&path));
    let store = Arc::new(
        StateStore::open(Arc::clone(&storage))
            .unwrap()
            .with_retry_backoff(Duration::ZERO),
    );
    let repo = StoreHabitRepository::new(Arc::clone(&store));

    storage.fail_next(1);
    let habit = repo.create_habit("Run", HabitConfig::default()).unwrap();
    assert_eq!(storage.attempts.load(Ordering::SeqCst), 2);
    assert_disk_matches_memory(&path, &store);
    assert!(store.get_snapshot().contains_habit(habit.id));
}

#[test]
fn corrupt_documents_fail_to_open() {
    let cases: [&[u8]; 5] = [
        b"{ not json",
        b"",
        br#"{"version":99,"habits":[],"proofs":[]}"#,
        br#"{"habits":[{"id":"h1","name":"Run","created_at":0,"start_at":0}],
             "proofs":[{"id":"p1","habit_id":"h2","timestamp":0}]}"#,
        br#"{"habits":[{"id":"h1","name":"A","created_at":0,"start_at":0},
                       {"id":"h1","name":"B","created_at":0,"start_at":0}],
             "proofs":[]}"#,
    ];

    for raw in cases {
        let err = StateStore::open(MemoryStorage::with_bytes(raw)).err().unwrap();
        assert!(
            matches!(err, StoreError::CorruptState(_)),
            "expected corrupt state for {}",
            String::from_utf8_lossy(raw)
        );
    }
}

#[test]
fn corrupt_file_is_left_in_place_for_the_operator() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, b"{ truncated").unwrap();

    let err = StateStore::open_file(&StoreConfig::new(&path)).err().unwrap();
    assert!(matches!(err, StoreError::CorruptState(_)));
    assert_eq!(std::fs::read(&path).unwrap(), b"{ truncated");
}

#[test]
fn stray_temp_file_from_interrupted_write_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    {
        let repo = StoreHabitRepository::new(file_store(&path));
        repo.create_habit("Run", HabitConfig::default()).unwrap();
    }
    std::fs::write(dir.path().join(".habitkeep-state-abc123.tmp"), b"{\"habits\":[").unwrap();

    let store = file_store(&path);
    assert_eq!(store.get_snapshot().habit_count(), 1);
}

#[test]
fn reload_picks_up_external_document_changes() {
    let storage = Arc::new(MemoryStorage::new());
    let store = StateStore::open(Arc::clone(&storage)).unwrap();
    assert_eq!(store.get_snapshot().habit_count(), 0);

    storage
        .write_atomic(
            br#"{"habits":[{"id":"h4","name":"Imported","created_at":0,"start_at":0}],"proofs":[]}"#,
        )
        .unwrap();
    store.load().unwrap();
    assert_eq!(store.get_snapshot().habit_count(), 1);
    assert_eq!(store.get_snapshot().next_ids().habit, 4);

    storage.write_atomic(b"garbage").unwrap();
    assert!(matches!(store.load(), Err(StoreError::CorruptState(_))));
    assert_eq!(store.get_snapshot().habit_count(), 1);
}

#[test]
fn stores_sharing_one_document_see_each_others_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let server = StoreHabitRepository::new(file_store(&path));
    let admin = StoreHabitRepository::new(file_store(&path));

    let run = server.create_habit("Run", HabitConfig::default()).unwrap();
    let read = admin.create_habit("Read", HabitConfig::default()).unwrap();
    assert_eq!(run.id, HabitId::from_seq(1));
    assert_eq!(read.id, HabitId::from_seq(2));

    server.add_proof(read.id, ProofInput::note("chapter 1")).unwrap();
    admin.delete_habit(run.id).unwrap();

    let on_disk = decode_snapshot(&std::fs::read(&path).unwrap()).unwrap();
    let names: Vec<_> = on_disk.habits().map(|habit| habit.name.as_str()).collect();
    assert_eq!(names, ["Read"]);
    assert_eq!(on_disk.proof_count(), 1);
    assert_eq!(*admin.snapshot(), on_disk);

    // The server picks the admin's delete up on its next write.
    let walk = server.create_habit("Walk", HabitConfig::default()).unwrap();
    assert_eq!(walk.id, HabitId::from_seq(3));
    assert!(!server.snapshot().contains_habit(run.id));
    let on_disk = decode_snapshot(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(*server.snapshot(), on_disk);
}

#[test]
fn exhausted_id_counter_is_reported_instead_of_wrapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(
        &path,
        r#"{"version":1,"next_ids":{"habit":18446744073709551615,"proof":0},"habits":[],"proofs":[]}"#,
    )
    .unwrap();
    let repo = StoreHabitRepository::new(file_store(&path));

    let err = repo.create_habit("Run", HabitConfig::default()).unwrap_err();
    assert!(matches!(err, StoreError::CorruptState(_)));
    assert_eq!(err.code(), "corrupt_state");
    assert_eq!(repo.snapshot().habit_count(), 0);
    assert_eq!(
        repo.snapshot().next_ids().habit,
        u64::MAX,
        "counter must not wrap back to zero"
    );
}
