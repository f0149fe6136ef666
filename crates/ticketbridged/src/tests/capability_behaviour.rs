//! Behavioural tests for on-demand capability resolution.
//!
//! Registry call counts are checked when the pipeline's context, and with it
//! the mock, is dropped.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::capability::{require_backend_client, require_upstream};
use crate::dispatch::{Action, ActionError, BasicAction, RequestContext, Script};
use crate::services::{BackendUser, ServiceError, Upstream};

use super::support::{MockRegistry, SECRET, UPSTREAM_URL, context_with_registry};

#[derive(Default)]
struct CapabilityWorld {
    registry: Option<MockRegistry>,
    handled: Arc<AtomicUsize>,
    result: Option<Result<(), ActionError>>,
    account_id: Option<String>,
}

#[fixture]
fn world() -> RefCell<CapabilityWorld> {
    RefCell::new(CapabilityWorld::default())
}

#[given("a registry serving an upstream and a linked account")]
fn given_serving_registry(world: &RefCell<CapabilityWorld>) {
    let mut registry = MockRegistry::new();
    registry
        .expect_load_current_upstream()
        .times(1)
        .returning(|| Ok(Upstream::cloud(UPSTREAM_URL, SECRET)));
    registry
        .expect_load_backend_user()
        .times(1)
        .returning(|_, caller_id| Ok(BackendUser::new(caller_id, "acc-1", "Alice Backend")));
    world.borrow_mut().registry = Some(registry);
}

#[given("a registry without a current upstream")]
fn given_empty_registry(world: &RefCell<CapabilityWorld>) {
    let mut registry = MockRegistry::new();
    registry
        .expect_load_current_upstream()
        .times(1)
        .returning(|| Err(ServiceError::NoCurrentUpstream));
    registry.expect_load_backend_user().never();
    world.borrow_mut().registry = Some(registry);
}

#[when("a pipeline requiring the upstream and then a backend client runs for caller \"{caller}\"")]
fn when_pipeline_runs(world: &RefCell<CapabilityWorld>, caller: String) {
    let mut world = world.borrow_mut();
    let registry = world.registry.take().expect("registry configured");
    let handled = Arc::clone(&world.handled);
    let script = Script::of(&[require_upstream, require_backend_client]).then(move |_| {
        handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let context = RequestContext::new(context_with_registry(Arc::new(registry)))
        .with_caller_id(caller);
    let mut action = BasicAction::new(context);
    world.result = Some(script.run(&mut action));
    world.account_id = action
        .context()
        .backend_client()
        .map(|client| client.account_id().to_owned());
}

#[then("the pipeline succeeds")]
fn then_succeeds(world: &RefCell<CapabilityWorld>) {
    let world = world.borrow();
    assert!(matches!(world.result, Some(Ok(()))), "result {:?}", world.result);
    assert_eq!(world.handled.load(Ordering::SeqCst), 1);
}

#[then("the backend client acts for account \"{account}\"")]
fn then_client_account(world: &RefCell<CapabilityWorld>, account: String) {
    assert_eq!(world.borrow().account_id.as_deref(), Some(account.as_str()));
}

#[then("the pipeline fails with status {status}")]
fn then_fails(world: &RefCell<CapabilityWorld>, status: u16) {
    let world = world.borrow();
    match &world.result {
        Some(Err(error)) => assert_eq!(error.status().as_u16(), status),
        other => panic!("expected a failure, got {other:?}"),
    }
}

#[then("the handler did not run")]
fn then_handler_skipped(world: &RefCell<CapabilityWorld>) {
    assert_eq!(world.borrow().handled.load(Ordering::SeqCst), 0);
}

#[scenario(
    path = "tests/features/capability.feature",
    name = "The upstream is loaded once across dependent resolvers"
)]
fn upstream_loaded_once(#[from(world)] world: RefCell<CapabilityWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/capability.feature",
    name = "A missing upstream stops the pipeline"
)]
fn missing_upstream_stops_pipeline(#[from(world)] world: RefCell<CapabilityWorld>) {
    drop(world);
}
