//! Replicate prediction API client.
//!
//! Provides typed prediction messages, an HTTP wrapper around the
//! prediction endpoints and the [`ProviderAdapter`] implementation the
//! job poller drives.
//!
//! [`ProviderAdapter`]: shortgen_core::provider::ProviderAdapter

pub mod api;
pub mod messages;
pub mod provider;

pub use api::{ReplicateApi, ReplicateApiError, ReplicateConfig};
