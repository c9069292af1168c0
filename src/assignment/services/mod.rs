//! Application services for reviewer assignment.

mod assignment;
mod error;
mod observer;
mod pull_requests;
mod requests;
mod selector;
mod teams;

pub use assignment::ReviewerAssignmentService;
pub use error::{AssignmentError, AssignmentResult, ConflictKind, ErrorCode, Resource};
pub use observer::{AssignmentObserver, AssignmentOperation, NoopObserver};
pub use requests::{
    CreatePullRequestRequest, CreateTeamRequest, InactiveReassignmentReport, ReassignOutcome,
    ReassignReviewerRequest,
};
pub use selector::CandidateSelector;
