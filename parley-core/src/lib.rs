//! # Parley Core Library
//!
//! Persistent, bounded conversation memory for game NPCs.
//!
//! Every NPC owns a time-ordered append log of [`MemoryRecord`]s. Three
//! pieces of policy live here:
//!
//! - **Store** — the [`DocumentStore`] seam and its SQLite implementation.
//! - **Window** — the most recent records for an NPC, rendered oldest-first
//!   into a prompt block ([`window`]).
//! - **Retention** — trimming every NPC back down to a keep-count
//!   ([`retention`]).
//!
//! ## Retention Contract
//!
//! After a sweep, every NPC holds at most `keep` records, and the survivors
//! are exactly the `keep` newest by timestamp.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod retention;
pub mod store;
pub mod types;
pub mod window;

pub use config::ParleyConfig;
pub use credentials::ServiceAccount;
pub use error::ParleyError;
pub use store::{DocumentStore, SqliteStore};
pub use types::*;
