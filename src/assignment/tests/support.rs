//! Shared fixtures for assignment unit tests.

use crate::assignment::{
    adapters::memory::InMemoryAssignmentStore,
    services::{CreateTeamRequest, ReviewerAssignmentService},
};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;
use std::sync::{Arc, Mutex};

pub type TestService = ReviewerAssignmentService<InMemoryAssignmentStore, SteppingClock>;

/// Clock that starts at a fixed instant and advances one second per read.
#[derive(Debug)]
pub struct SteppingClock {
    now: Mutex<DateTime<Utc>>,
}

impl SteppingClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self::starting_at(
            Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0)
                .single()
                .expect("valid start instant"),
        )
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().expect("clock lock");
        let current = *now;
        *now = current + Duration::seconds(1);
        current
    }
}

#[fixture]
pub fn store() -> Arc<InMemoryAssignmentStore> {
    Arc::new(InMemoryAssignmentStore::new())
}

#[fixture]
pub fn service(store: Arc<InMemoryAssignmentStore>) -> TestService {
    ReviewerAssignmentService::new(store, Arc::new(SteppingClock::default()))
}

/// `backend`: alice, bob, carol, dave (all active).
pub fn backend_team() -> CreateTeamRequest {
    CreateTeamRequest::new("backend")
        .with_member("u1", "Alice", true)
        .with_member("u2", "Bob", true)
        .with_member("u3", "Carol", true)
        .with_member("u4", "Dave", true)
}

pub async fn seed(service: &TestService, team: CreateTeamRequest) {
    service
        .create_team(team)
        .await
        .expect("team creation should succeed");
}
