//! Reviewer assignment for pull requests.
//!
//! Opens pull requests with randomly chosen reviewers from the author's
//! team, merges them, and rotates reviewers when someone is unavailable.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
