//! Test utilities shared by the integration tests.
//!
//! Provides manifest fixtures and temporary project directories so tests can
//! exercise the loader, the resolver and the binary from the same YAML.

pub mod manifest;

pub use manifest::{Project, graph_from_yaml, manifest_yaml};
