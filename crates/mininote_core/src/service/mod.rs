//! Core use-case services.
//!
//! # Responsibility
//! - Turn repository calls into live, observable state.
//! - Keep presentation code decoupled from storage details and threading.

pub mod note_coordinator;
pub mod note_feed;
pub mod theme_service;
