//! Application state for Mandira
//!
//! This crate bridges the request layer to the UI: it derives reactive
//! authentication status from credential store events so navigation can
//! react to session changes without polling.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod session;

pub use session::{AuthStatus, SessionState};
