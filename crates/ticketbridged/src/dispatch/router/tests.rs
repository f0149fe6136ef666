//! Route resolution and pipeline ordering tests.

use std::sync::{Arc, Mutex};

use http::StatusCode;
use rstest::{fixture, rstest};

use super::*;
use crate::dispatch::{BasicAction, BasicResponse, RequestContext};
use crate::tests::support::service_context;

type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, entry: &'static str) -> Script {
    let journal = Arc::clone(journal);
    Script::new().then(move |_| {
        journal.lock().expect("journal lock").push(entry.to_owned());
        Ok(())
    })
}

fn reject(message: &'static str) -> Script {
    Script::new().then(move |action| Err(action.respond_error(ActionError::unauthorized(message))))
}

fn action() -> BasicAction {
    BasicAction::new(RequestContext::new(service_context()))
}

#[fixture]
fn wildcard_router() -> Router {
    Router::builder()
        .add_route("/a", Route::new(Script::new()))
        .add_route("/a/*", Route::new(Script::new()))
        .add_route("/a/b/*", Route::new(Script::new()))
        .add_route("/api/v2/userinfo", Route::new(Script::new()))
        .add_route("settings/*", Route::new(Script::new()))
        .build()
}

#[rstest]
#[case("/a", Some("/a"))]
#[case("/a/", Some("/a"))]
#[case("/a/x", Some("/a/*"))]
#[case("/a/b", Some("/a/b/*"))]
#[case("/a/b/c", Some("/a/b/*"))]
#[case("/a/b/c/d/e", Some("/a/b/*"))]
#[case("/a/c/d", Some("/a/*"))]
#[case("/api/v2/userinfo", Some("/api/v2/userinfo"))]
#[case("settings/notifications", Some("settings/*"))]
#[case("settings", Some("settings/*"))]
#[case("/unknown", None)]
#[case("", None)]
fn resolves_most_specific_route(
    wildcard_router: Router,
    #[case] key: &str,
    #[case] expected: Option<&str>,
) {
    assert_eq!(wildcard_router.resolve(key).matched.as_deref(), expected);
}

#[fixture]
fn starred_router() -> Router {
    Router::builder()
        .add_route("a/b", Route::new(Script::new()))
        .add_route("a/*", Route::new(Script::new()))
        .add_route("*", Route::new(Script::new()))
        .build()
}

/// A bare `*` is an ordinary key; only `/*` suffixes are wildcards.
#[rstest]
#[case("a/b", Some("a/b"))]
#[case("a/b/c", Some("a/*"))]
#[case("a", Some("a/*"))]
#[case("*", Some("*"))]
#[case("other", None)]
#[case("other/page", None)]
fn exact_keys_beat_wildcards_and_bare_stars(
    starred_router: Router,
    #[case] key: &str,
    #[case] expected: Option<&str>,
) {
    assert_eq!(starred_router.resolve(key).matched.as_deref(), expected);
}

#[test]
fn root_wildcard_catches_everything_else() {
    let router = Router::builder()
        .add_route("/*", Route::new(Script::new()))
        .add_route("/ac/*", Route::new(Script::new()))
        .build();
    assert_eq!(router.resolve("/ac/install").matched.as_deref(), Some("/ac/*"));
    assert_eq!(router.resolve("/other/page").matched.as_deref(), Some("/*"));
}

#[rstest]
fn lookup_is_exact(wildcard_router: Router) {
    assert!(wildcard_router.lookup("/a").is_some());
    assert!(wildcard_router.lookup("/a/x").is_none());
}

#[test]
fn later_registration_replaces_earlier_one() {
    let journal = Journal::default();
    let router = Router::builder()
        .add_route("/x", Route::new(record(&journal, "first")))
        .add_routes([("/x", Route::new(record(&journal, "second")))])
        .build();

    router.dispatch("/x", &mut action());
    assert_eq!(*journal.lock().expect("journal lock"), vec!["second"]);
}

#[test]
fn runs_before_route_and_after_in_order() {
    let journal = Journal::default();
    let router = Router::builder()
        .before(record(&journal, "before"))
        .after(record(&journal, "after"))
        .add_route("/x", Route::new(record(&journal, "route")))
        .build();

    let mut action = action();
    router.dispatch("/x", &mut action);

    assert_eq!(
        *journal.lock().expect("journal lock"),
        vec!["before", "route", "after"]
    );
    assert!(action.context().last_error().is_none());
}

#[test]
fn before_failure_skips_route_but_not_after() {
    let journal = Journal::default();
    let seen = Arc::new(Mutex::new(None));
    let seen_by_after = Arc::clone(&seen);
    let router = Router::builder()
        .before(reject("not authorized"))
        .after(Script::new().then(move |action| {
            *seen_by_after.lock().expect("seen lock") =
                action.context().last_error().map(ActionError::status);
            Ok(())
        }))
        .add_route("/x", Route::new(record(&journal, "route")))
        .build();

    let mut action = action();
    router.dispatch("/x", &mut action);

    assert!(journal.lock().expect("journal lock").is_empty());
    assert_eq!(*seen.lock().expect("seen lock"), Some(StatusCode::UNAUTHORIZED));
    assert!(matches!(action.response(), Some(BasicResponse::Error(_))));
}

#[test]
fn route_failure_is_recorded() {
    let router = Router::builder()
        .add_route("/x", Route::new(reject("nope")))
        .build();

    let mut action = action();
    router.dispatch("/x", &mut action);

    assert_eq!(
        action.context().last_error().map(ToString::to_string).as_deref(),
        Some("nope")
    );
}

#[test]
fn after_failure_is_not_recorded() {
    let router = Router::builder()
        .add_route("/x", Route::new(Script::new()))
        .after(reject("after broke"))
        .build();

    let mut action = action();
    router.dispatch("/x", &mut action);

    assert!(action.context().last_error().is_none());
}

#[test]
fn unmatched_key_uses_default_not_found() {
    let router = Router::builder().build();
    let mut action = action();
    router.dispatch("/missing", &mut action);

    assert_eq!(
        action.context().last_error().map(ActionError::status),
        Some(StatusCode::NOT_FOUND)
    );
}

#[test]
fn explicit_default_route_runs_for_unmatched_keys() {
    let journal = Journal::default();
    let router = Router::builder()
        .default_route(Route::new(record(&journal, "help")))
        .build();

    let resolution = router.resolve("anything/at/all");
    assert!(resolution.matched.is_none());

    router.dispatch("anything/at/all", &mut action());
    assert_eq!(*journal.lock().expect("journal lock"), vec!["help"]);
}
