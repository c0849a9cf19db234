//! Behavioural tests for the server bootstrap sequence.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::catalog::{CatalogCounts, EventId};
use crate::lifecycle::{EventState, compute_state};

use super::support::{self, BootstrapWorld, HealthEvent};

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<BootstrapWorld> {
    support::world()
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().load_from_tempdir();
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().load_invalid_port();
}

#[given("a configuration whose data directory cannot be created")]
fn given_blocked_storage(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().block_data_dir();
}

#[given("snapshots holding one account and one event")]
fn given_snapshots(world: &RefCell<BootstrapWorld>) -> StepResult {
    world.borrow().seed_snapshots(
        "123456 abcdef12\n",
        "001 123456 TEST 03-03-2099 10:00 15 0 0 pic.jpg 5\n",
    )
}

#[when("the server bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().bootstrap();
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<BootstrapWorld>) -> StepResult {
    world.borrow().server().map(drop)
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<BootstrapWorld>) -> StepResult {
    world.borrow().failure().map(drop)
}

#[then("the reporter recorded bootstrap {milestone}")]
fn then_reporter_milestone(world: &RefCell<BootstrapWorld>, milestone: String) -> StepResult {
    let recorded = world.borrow().health.events();
    let seen = recorded.iter().any(|event| match milestone.as_str() {
        "start" => *event == HealthEvent::BootstrapStarting,
        "success" => *event == HealthEvent::BootstrapSucceeded,
        "failure" => matches!(event, HealthEvent::BootstrapFailed(_)),
        _ => false,
    });
    if seen {
        Ok(())
    } else {
        Err(format!("no bootstrap {milestone} in {recorded:?}"))
    }
}

#[then("the reporter recorded a catalog of {accounts} accounts and {events} events")]
fn then_reporter_catalog(
    world: &RefCell<BootstrapWorld>,
    accounts: String,
    events: String,
) -> StepResult {
    let expected = HealthEvent::CatalogLoaded(CatalogCounts {
        accounts: parse_count(&accounts)?,
        events: parse_count(&events)?,
        reservations: 0,
    });
    let recorded = world.borrow().health.events();
    if recorded.contains(&expected) {
        Ok(())
    } else {
        Err(format!("expected {expected:?}, got {recorded:?}"))
    }
}

#[then("the loaded event {event} is open")]
fn then_event_open(world: &RefCell<BootstrapWorld>, event: String) -> StepResult {
    let world = world.borrow();
    let id = EventId::parse(&event).ok_or("invalid event id")?;
    let loaded = world.server()?.catalog().event(id).ok_or("event missing")?;
    match compute_state(loaded, support::NOW) {
        EventState::Open => Ok(()),
        state => Err(format!("event {event} is {state:?}")),
    }
}

#[scenario(
    path = "tests/features/server_bootstrap.feature",
    name = "Bootstrap succeeds with a healthy configuration"
)]
fn bootstrap_succeeds(world: RefCell<BootstrapWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/server_bootstrap.feature",
    name = "Bootstrap reads existing snapshots"
)]
fn bootstrap_reads_snapshots(world: RefCell<BootstrapWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/server_bootstrap.feature",
    name = "Bootstrap fails when configuration cannot load"
)]
fn bootstrap_fails_on_configuration(world: RefCell<BootstrapWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/server_bootstrap.feature",
    name = "Bootstrap fails when storage cannot be prepared"
)]
fn bootstrap_fails_on_storage(world: RefCell<BootstrapWorld>) {
    let _ = world;
}

fn parse_count(text: &str) -> Result<usize, String> {
    text.parse()
        .map_err(|error| format!("invalid count '{text}': {error}"))
}
