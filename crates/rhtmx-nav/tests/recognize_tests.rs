/// Integration tests for route recognition
///
/// Builds snapshot trees from parsed URLs and checks params, outlets and
/// the inheritance rules between levels.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rhtmx_nav::recognize::recognize;
use rhtmx_nav::route::{into_shared, Route};
use rhtmx_nav::url::{DefaultUrlSerializer, UrlSerializer};
use rhtmx_nav::{ParamsInheritance, RecognizeError, RouterStateSnapshot};

fn run_with(
    routes: &[Arc<Route>],
    url: &str,
    inheritance: ParamsInheritance,
) -> Result<RouterStateSnapshot, RecognizeError> {
    let tree = DefaultUrlSerializer.parse(url).unwrap();
    recognize(None, routes, &tree, url, inheritance)
}

fn run(routes: &[Arc<Route>], url: &str) -> Result<RouterStateSnapshot, RecognizeError> {
    run_with(routes, url, ParamsInheritance::default())
}

fn param<'a>(state: &'a RouterStateSnapshot, level: usize, name: &str) -> Option<&'a str> {
    state.primary_chain()[level].params.get(name).map(String::as_str)
}

// ============================================================================
// Params
// ============================================================================

#[test]
fn test_componentless_parent_passes_params_down() {
    let routes = into_shared([Route::componentless("team/:id")
        .with_children([Route::component("user/:name", "UserCmp")])]);
    let state = run(&routes, "/team/11/user/bob").unwrap();

    assert_eq!(state.primary_chain()[1].params.len(), 1);
    assert_eq!(param(&state, 1, "id"), Some("11"));
    assert_eq!(param(&state, 2, "id"), Some("11"));
    assert_eq!(param(&state, 2, "name"), Some("bob"));
}

#[test]
fn test_component_parent_keeps_params_to_itself() {
    let routes = into_shared([Route::component("team/:id", "TeamCmp")
        .with_children([Route::component("user/:name", "UserCmp")])]);
    let state = run(&routes, "/team/11/user/bob").unwrap();

    assert_eq!(param(&state, 2, "id"), None);
    assert_eq!(param(&state, 2, "name"), Some("bob"));
}

#[test]
fn test_always_inheritance() {
    let routes = into_shared([Route::component("team/:id", "TeamCmp")
        .with_children([Route::component("user/:name", "UserCmp")])]);
    let state = run_with(&routes, "/team/11/user/bob", ParamsInheritance::Always).unwrap();
    assert_eq!(param(&state, 2, "id"), Some("11"));
}

#[test]
fn test_static_data_follows_params_inheritance() {
    let routes = into_shared([Route::componentless("admin")
        .with_data("section", "admin")
        .with_children([Route::component("users", "UsersCmp").with_data("title", "Users")])]);
    let state = run(&routes, "/admin/users").unwrap();

    let users = state.primary_chain()[2];
    assert_eq!(users.data().get("section"), Some(&serde_json::json!("admin")));
    assert_eq!(users.data().get("title"), Some(&serde_json::json!("Users")));
}

#[test]
fn test_query_params_and_fragment_reach_every_level() {
    let routes = into_shared([Route::component("team/:id", "TeamCmp")]);
    let state = run(&routes, "/team/1?tab=files#top").unwrap();
    let team = state.primary_chain()[1];
    assert_eq!(team.query_params.get("tab").map(String::as_str), Some("files"));
    assert_eq!(team.fragment.as_deref(), Some("top"));
}

// ============================================================================
// Outlets
// ============================================================================

fn team_routes() -> Vec<Arc<Route>> {
    into_shared([Route::component("team/:id", "TeamCmp").with_children([
        Route::component("user/:name", "UserCmp"),
        Route::component("chat", "ChatCmp").with_outlet("aux"),
        Route::component("help", "HelpCmp").with_outlet("side"),
    ])])
}

#[test]
fn test_outlets_are_ordered_primary_first() {
    let state = run(&team_routes(), "/team/33/(side:help//user/victor//aux:chat)").unwrap();
    let team = &state.tree.root.children[0];
    let outlets: Vec<_> = team.children.iter().map(|c| c.value.outlet.as_str()).collect();
    assert_eq!(outlets, vec!["primary", "aux", "side"]);
}

#[test]
fn test_recognition_is_deterministic() {
    let routes = team_routes();
    let url = "/team/33/(user/victor//aux:chat)";
    let first = run(&routes, url).unwrap().to_string();
    let second = run(&routes, url).unwrap().to_string();
    assert_eq!(first, second);
}

#[test]
fn test_named_empty_path_routes_fill_their_outlets() {
    let routes = into_shared([
        Route::component("", "MainCmp"),
        Route::component("", "NavCmp").with_outlet("nav"),
    ]);
    let state = run(&routes, "/").unwrap();
    let outlets: Vec<_> = state
        .tree
        .root
        .children
        .iter()
        .map(|c| (c.value.outlet.clone(), c.value.component.as_ref().unwrap().name().to_string()))
        .collect();
    assert_eq!(
        outlets,
        vec![
            ("primary".to_string(), "MainCmp".to_string()),
            ("nav".to_string(), "NavCmp".to_string())
        ]
    );
}

#[test]
fn test_two_routes_for_one_outlet_is_an_error() {
    let routes = into_shared([
        Route::component("", "MainCmp"),
        Route::component("", "ChatCmp").with_outlet("aux"),
        Route::component("", "HelpCmp").with_outlet("aux"),
    ]);
    let err = run(&routes, "/").unwrap_err();
    match err {
        RecognizeError::DuplicateOutlet { outlet, first, second } => {
            assert_eq!(outlet, "aux");
            assert!(first.contains("ChatCmp"));
            assert!(second.contains("HelpCmp"));
        }
        other => panic!("expected DuplicateOutlet, got {other:?}"),
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unmatched_segments_fail() {
    let err = run(&team_routes(), "/team/33/unknown").unwrap_err();
    assert!(matches!(err, RecognizeError::NoMatch { .. }));
}

#[test]
fn test_wildcard_matches_anything() {
    let routes = into_shared([
        Route::component("home", "HomeCmp"),
        Route::component("**", "NotFoundCmp"),
    ]);
    let state = run(&routes, "/no/such/page").unwrap();
    let leaf = state.primary_chain()[1];
    assert_eq!(leaf.component.as_ref().unwrap().name(), "NotFoundCmp");
    assert_eq!(leaf.url.len(), 3);
}
