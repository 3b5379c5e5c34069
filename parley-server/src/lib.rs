//! # parley-server — HTTP surface for Parley
//!
//! | route                      | methods   | handler |
//! |----------------------------|-----------|---------|
//! | `/api/npc-interaction`     | GET, POST | recent flat log / memory-aware reply |
//! | `/api/legacy/interactions` | GET, POST | deprecated flat logger |
//! | `/api/cleanup-memories`    | GET, POST | retention sweep, needs `x-cleanup-secret` |
//! | `/health`                  | GET       | liveness |
//!
//! Every route answers `OPTIONS` with permissive CORS headers.

#![warn(missing_docs)]

pub mod error;
pub mod interaction;
pub mod legacy;
pub mod maintenance;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
