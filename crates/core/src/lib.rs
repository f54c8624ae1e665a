//! Shared domain types for the shortgen generation service.
//!
//! Holds the job vocabulary ([`types`]), the provider adapter seam
//! ([`provider`]), the model catalog that replaces per-server registries
//! ([`catalog`]) and the ffmpeg helpers used to mux still images into
//! video ([`ffmpeg`]).

pub mod catalog;
pub mod error;
pub mod ffmpeg;
pub mod provider;
pub mod types;
