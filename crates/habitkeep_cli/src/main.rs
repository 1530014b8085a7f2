//! CLI smoke and inspection entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `habitkeep_core` linkage.
//! - Summarize a state document without modifying it.
//!
//! Usage: `habitkeep_cli [STATE_PATH]`. Without a path the document from
//! `HABITKEEP_DATA_PATH` (or its default) is inspected.

use habitkeep_core::{StateStore, StoreConfig};
use std::process::ExitCode;

fn next_seq(last: u64) -> String {
    last.checked_add(1)
        .map_or_else(|| "exhausted".to_string(), |seq| seq.to_string())
}

fn main() -> ExitCode {
    println!("habitkeep_core ping={}", habitkeep_core::ping());
    println!("habitkeep_core version={}", habitkeep_core::core_version());

    let config = match std::env::args_os().nth(1) {
        Some(path) => StoreConfig::new(path),
        None => StoreConfig::from_env(),
    };
    println!("state path={}", config.data_path.display());

    // Opening only reads; nothing is written until a mutation is applied.
    let store = match StateStore::open_file(&config) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("state error code={} message={err}", err.code());
            return ExitCode::FAILURE;
        }
    };

    let snapshot = store.get_snapshot();
    let archived = snapshot.habits().filter(|habit| habit.archived).count();
    println!(
        "state habits={} archived={} proofs={} next_habit_seq={} next_proof_seq={}",
        snapshot.habit_count(),
        archived,
        snapshot.proof_count(),
        next_seq(snapshot.next_ids().habit),
        next_seq(snapshot.next_ids().proof)
    );
    for habit in snapshot.habits() {
        println!(
            "habit id={} proofs={} archived={}",
            habit.id,
            snapshot.proofs_for(habit.id).count(),
            habit.archived
        );
    }
    ExitCode::SUCCESS
}
