//! Port contracts for reviewer assignment.
//!
//! Ports define infrastructure-agnostic interfaces used by the assignment
//! service.

pub mod repository;
pub mod unit_of_work;

pub use repository::{
    PullRequestRepository, StoreError, StoreResult, TeamRepository, UserRepository,
};
pub use unit_of_work::{AssignmentTransaction, UnitOfWork};
