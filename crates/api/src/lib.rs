//! Defectra API server library.
//!
//! Exposes the building blocks (config, state, error handling, router,
//! sync orchestrator) so integration tests and the binary entrypoint share
//! the exact same middleware stack and wiring.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
pub mod sync;
