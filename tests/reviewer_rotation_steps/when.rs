//! When steps for reviewer rotation BDD scenarios.

use super::world::{RotationWorld, run_async};
use eyre::WrapErr;
use reviewer_rotation::assignment::services::{CreatePullRequestRequest, ReassignReviewerRequest};
use rstest_bdd_macros::when;

#[when(r#""{author}" opens pull request "{id}""#)]
fn open_pull_request(
    world: &mut RotationWorld,
    author: String,
    id: String,
) -> Result<(), eyre::Report> {
    let created = run_async(world.service.create_pull_request(CreatePullRequestRequest::new(
        id,
        "Scenario change",
        author,
    )))
    .wrap_err("open pull request")?;
    world.last_pull_request = Some(created);
    Ok(())
}

#[when("the first reviewer of the pull request is deactivated")]
fn deactivate_first_reviewer(world: &mut RotationWorld) -> Result<(), eyre::Report> {
    let reviewer = world.first_reviewer()?;
    run_async(world.service.set_user_active(reviewer.as_str(), false))
        .wrap_err("deactivate reviewer")?;
    world.deactivated_reviewer = Some(reviewer);
    Ok(())
}

#[when(r#"inactive reviewers of "{id}" are reassigned"#)]
fn reassign_inactive(world: &mut RotationWorld, id: String) {
    world.last_bulk_result = Some(run_async(world.service.reassign_inactive_reviewers(&id)));
}

#[when(r#"pull request "{id}" is merged"#)]
fn merge_pull_request(world: &mut RotationWorld, id: String) -> Result<(), eyre::Report> {
    let merged = run_async(world.service.merge_pull_request(&id)).wrap_err("merge")?;
    world.last_pull_request = Some(merged);
    Ok(())
}

#[when(r#"the first reviewer of "{id}" is reassigned"#)]
fn reassign_first_reviewer(world: &mut RotationWorld, id: String) -> Result<(), eyre::Report> {
    let reviewer = world.first_reviewer()?;
    let request = ReassignReviewerRequest::new(id, reviewer.as_str());
    world.last_reassign_result = Some(run_async(world.service.reassign_pull_request(request)));
    Ok(())
}
