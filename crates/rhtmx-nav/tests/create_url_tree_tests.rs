/// Integration tests for building URL trees from navigation commands
///
/// Every case recognizes a real URL first so relative commands have a
/// matched route to start from.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rhtmx_nav::recognize::recognize;
use rhtmx_nav::route::{into_shared, Route};
use rhtmx_nav::url::{DefaultUrlSerializer, Params, UrlSerializer, UrlTree};
use rhtmx_nav::url_builder::{create_url_tree, Command};
use rhtmx_nav::{ParamsInheritance, RouteSnapshot, RouterStateSnapshot, UrlTreeError};

struct Fixture {
    tree: UrlTree,
    state: RouterStateSnapshot,
}

impl Fixture {
    fn new(url: &str) -> Self {
        let routes = into_shared([
            Route::component("team/:id", "TeamCmp")
                .with_children([Route::component("user/:name", "UserCmp")]),
            Route::component("other", "OtherCmp"),
            Route::component("chat", "ChatCmp").with_outlet("aux"),
        ]);
        let tree = DefaultUrlSerializer.parse(url).unwrap();
        let state = recognize(None, &routes, &tree, url, ParamsInheritance::default()).unwrap();
        Self { tree, state }
    }

    fn level(&self, level: usize) -> Arc<RouteSnapshot> {
        Arc::clone(self.state.primary_chain()[level])
    }

    fn build(
        &self,
        relative_to: Option<&Arc<RouteSnapshot>>,
        commands: &[Command],
    ) -> Result<String, UrlTreeError> {
        create_url_tree(&self.state, relative_to, &self.tree, commands, Params::new(), None)
            .map(|tree| DefaultUrlSerializer.serialize(&tree))
    }
}

// ============================================================================
// Relative commands
// ============================================================================

#[test]
fn test_double_dot_climbs_one_route() {
    let fx = Fixture::new("/team/11");
    let team = fx.level(1);
    assert_eq!(fx.build(Some(&team), &["../other".into()]).unwrap(), "/other");
}

#[test]
fn test_relative_to_matched_route_replaces_what_follows() {
    let fx = Fixture::new("/team/33/user/victor");
    let team = fx.level(1);
    assert_eq!(
        fx.build(Some(&team), &["user".into(), "bob".into()]).unwrap(),
        "/team/33/user/bob"
    );
}

#[test]
fn test_matrix_params_follow_their_path() {
    let fx = Fixture::new("/team/33");
    let team = fx.level(1);
    let commands = [
        Command::path("user"),
        Command::path("bob"),
        Command::params([("mode", "edit")]),
    ];
    assert_eq!(
        fx.build(Some(&team), &commands).unwrap(),
        "/team/33/user/bob;mode=edit"
    );
}

#[test]
fn test_too_many_double_dots() {
    let fx = Fixture::new("/team/11");
    let team = fx.level(1);
    assert_eq!(
        fx.build(Some(&team), &["../../x".into()]),
        Err(UrlTreeError::InvalidDoubleDots {
            requested: 2,
            available: 1
        })
    );
}

// ============================================================================
// Absolute commands
// ============================================================================

#[test]
fn test_absolute_commands_ignore_reference() {
    let fx = Fixture::new("/team/33/user/victor");
    let user = fx.level(2);
    assert_eq!(fx.build(Some(&user), &["/other".into()]).unwrap(), "/other");
}

#[test]
fn test_root_command_keeps_query_and_fragment_given() {
    let fx = Fixture::new("/team/33");
    let query = Params::from([("tab".to_string(), "files".to_string())]);
    let tree = create_url_tree(&fx.state, None, &fx.tree, &["/".into()], query, Some("top".into())).unwrap();
    assert_eq!(DefaultUrlSerializer.serialize(&tree), "/?tab=files#top");
}

#[test]
fn test_empty_commands_only_change_query() {
    let fx = Fixture::new("/team/33?a=1");
    let query = Params::from([("b".to_string(), "2".to_string())]);
    let tree = create_url_tree(&fx.state, None, &fx.tree, &[], query, None).unwrap();
    assert_eq!(DefaultUrlSerializer.serialize(&tree), "/team/33?b=2");
}

// ============================================================================
// Outlets
// ============================================================================

#[test]
fn test_outlet_is_added_next_to_primary() {
    let fx = Fixture::new("/team/33");
    assert_eq!(
        fx.build(None, &[Command::outlets([("aux", Some("chat"))])]).unwrap(),
        "/team/33(aux:chat)"
    );
}

#[test]
fn test_outlet_is_removed() {
    let fx = Fixture::new("/team/33(aux:chat)");
    assert_eq!(
        fx.build(None, &[Command::outlets([("aux", None)])]).unwrap(),
        "/team/33"
    );
}

#[test]
fn test_outlets_must_come_last() {
    let fx = Fixture::new("/team/33");
    let commands = [Command::outlets([("aux", Some("chat"))]), Command::path("x")];
    assert_eq!(fx.build(None, &commands), Err(UrlTreeError::OutletsNotLast));
}

#[test]
fn test_input_tree_is_untouched() {
    let fx = Fixture::new("/team/33/user/victor");
    let team = fx.level(1);
    let before = fx.tree.clone();
    fx.build(Some(&team), &["user".into(), "bob".into()]).unwrap();
    assert_eq!(fx.tree, before);
}
