//! Reviewer rotation: automatic reviewer assignment for pull requests.
//!
//! Users belong to teams. Opening a pull request assigns up to two active
//! teammates of the author as reviewers; reviewers can later be swapped for
//! another active teammate, and inactive reviewers can be replaced in bulk.
//! Merged pull requests are frozen.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Repository and unit-of-work traits
//! - **Adapters**: In-memory and `PostgreSQL` implementations of the ports
//!
//! # Modules
//!
//! - [`assignment`]: Teams, pull requests and reviewer assignment
//! - [`config`]: Store configuration from the environment
//! - [`telemetry`]: `tracing` subscriber setup

pub mod assignment;
pub mod config;
pub mod telemetry;
