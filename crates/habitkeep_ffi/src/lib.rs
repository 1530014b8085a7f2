//! Flutter bridge for the HabitKeep admin GUI.

pub mod api;
