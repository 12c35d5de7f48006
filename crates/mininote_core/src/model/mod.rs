//! Domain model for the note list and theme preference.
//!
//! # Responsibility
//! - Define the values handed between the store, the feeds and observers.
//!
//! # Invariants
//! - A `Note` is identified by a store-assigned `NoteId` that is never reused.
//! - Values given to observers are snapshots; changing one does not change
//!   storage.

pub mod note;
pub mod preference;
