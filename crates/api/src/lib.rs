//! shortgen HTTP service library.
//!
//! Exposes the building blocks (config, state, error handling, routes, job
//! registry, output sink) so integration tests and the binary entrypoint
//! can both access them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod response;
pub mod router;
pub mod routes;
pub mod sink;
pub mod state;
