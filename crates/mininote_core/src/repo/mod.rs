//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store and preference store contracts.
//! - Isolate SQLite query details from the live feeds and the coordinator.
//!
//! # Invariants
//! - Each SQLite-backed repository exclusively owns its connection.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod note_repo;
pub mod preference_repo;
