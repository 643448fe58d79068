use std::sync::Arc;

use tracing::debug;

use super::{ActivatedRoute, RouteReuseStrategy, RouteSnapshot, RouterState, RouterStateSnapshot};
use crate::tree::{Tree, TreeNode};

/// Builds the live state for `current`, reusing nodes of `previous`
///
/// A node is kept when the strategy says so (by default: the same route
/// config matched again). Children are paired by that rule, not by
/// position, so reordering outlets does not recreate nodes. Kept nodes get
/// `current`'s snapshot as their pending future; nothing observable changes
/// until activation advances them.
pub fn create_router_state(
    strategy: &dyn RouteReuseStrategy,
    current: &RouterStateSnapshot,
    previous: Option<&RouterState>,
) -> RouterState {
    let root = create_node(strategy, &current.tree.root, previous.map(|p| &p.tree.root));
    RouterState {
        tree: Tree::new(root),
        snapshot: current.clone(),
    }
}

fn create_node(
    strategy: &dyn RouteReuseStrategy,
    current: &TreeNode<Arc<RouteSnapshot>>,
    previous: Option<&TreeNode<Arc<ActivatedRoute>>>,
) -> TreeNode<Arc<ActivatedRoute>> {
    if let Some(previous) = previous {
        if strategy.should_reuse_route(&current.value, &previous.value.snapshot()) {
            previous.value.set_future(Arc::clone(&current.value));
            let children = create_or_reuse_children(strategy, current, previous);
            return TreeNode::new(Arc::clone(&previous.value), children);
        }
    }

    if strategy.should_attach(&current.value) {
        if let Some(handle) = strategy.retrieve(&current.value) {
            if same_shape(&handle.node, current) {
                debug!(route = %current.value, "Reattaching detached route");
                set_future_snapshots(&handle.node, current);
                strategy.store(&current.value, None);
                return handle.node;
            }
            debug!(route = %current.value, "Detached route no longer fits, recreating");
        }
    }

    TreeNode::new(
        ActivatedRoute::new(Arc::clone(&current.value)),
        current
            .children
            .iter()
            .map(|child| create_node(strategy, child, None))
            .collect(),
    )
}

fn create_or_reuse_children(
    strategy: &dyn RouteReuseStrategy,
    current: &TreeNode<Arc<RouteSnapshot>>,
    previous: &TreeNode<Arc<ActivatedRoute>>,
) -> Vec<TreeNode<Arc<ActivatedRoute>>> {
    current
        .children
        .iter()
        .map(|child| {
            let matching = previous
                .children
                .iter()
                .find(|p| strategy.should_reuse_route(&child.value, &p.value.snapshot()));
            create_node(strategy, child, matching)
        })
        .collect()
}

fn same_config(route: &ActivatedRoute, snapshot: &RouteSnapshot) -> bool {
    match (route.route_config(), &snapshot.route_config) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn same_shape(detached: &TreeNode<Arc<ActivatedRoute>>, current: &TreeNode<Arc<RouteSnapshot>>) -> bool {
    same_config(&detached.value, &current.value)
        && detached.children.len() == current.children.len()
        && detached
            .children
            .iter()
            .zip(&current.children)
            .all(|(d, c)| same_shape(d, c))
}

fn set_future_snapshots(
    detached: &TreeNode<Arc<ActivatedRoute>>,
    current: &TreeNode<Arc<RouteSnapshot>>,
) {
    detached.value.set_future(Arc::clone(&current.value));
    for (d, c) in detached.children.iter().zip(&current.children) {
        set_future_snapshots(d, c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamsInheritance;
    use crate::recognize::recognize;
    use crate::route::{into_shared, Route};
    use crate::state::{DefaultRouteReuseStrategy, DetachedRouteHandle, KeepAliveReuseStrategy};
    use crate::url::{DefaultUrlSerializer, UrlSerializer};
    use pretty_assertions::assert_eq;

    fn routes() -> Vec<Arc<Route>> {
        into_shared([
            Route::component("team/:id", "TeamCmp")
                .with_children([Route::component("user/:name", "UserCmp")]),
            Route::component("other", "OtherCmp"),
        ])
    }

    fn snapshot(routes: &[Arc<Route>], url: &str) -> RouterStateSnapshot {
        let tree = DefaultUrlSerializer.parse(url).unwrap();
        recognize(None, routes, &tree, url, ParamsInheritance::default()).unwrap()
    }

    fn settle(state: &RouterState) {
        for route in state.routes() {
            route.advance();
        }
    }

    #[test]
    fn test_same_config_keeps_node_until_advanced() {
        let routes = routes();
        let strategy = DefaultRouteReuseStrategy;
        let first = create_router_state(&strategy, &snapshot(&routes, "/team/1/user/a"), None);
        settle(&first);

        let second = create_router_state(&strategy, &snapshot(&routes, "/team/2/user/a"), Some(&first));
        let team = second.find_by_component("TeamCmp").unwrap();
        assert!(Arc::ptr_eq(first.find_by_component("TeamCmp").unwrap(), team));
        assert_eq!(team.snapshot().params.get("id").map(String::as_str), Some("1"));

        settle(&second);
        assert_eq!(team.snapshot().params.get("id").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_other_config_gets_new_node() {
        let routes = routes();
        let strategy = DefaultRouteReuseStrategy;
        let first = create_router_state(&strategy, &snapshot(&routes, "/team/1"), None);
        settle(&first);

        let second = create_router_state(&strategy, &snapshot(&routes, "/other"), Some(&first));
        assert!(Arc::ptr_eq(first.root(), second.root()));
        assert!(second.find_by_component("TeamCmp").is_none());
        assert!(second.find_by_component("OtherCmp").is_some());
    }

    #[test]
    fn test_stored_subtree_is_reattached() {
        let routes = routes();
        let strategy = KeepAliveReuseStrategy::new();
        let first = create_router_state(&strategy, &snapshot(&routes, "/team/1/user/a"), None);
        settle(&first);

        let team = &first.tree.root.children[0];
        strategy.store(
            &team.value.snapshot(),
            Some(DetachedRouteHandle { node: team.clone() }),
        );
        let away = create_router_state(&strategy, &snapshot(&routes, "/other"), Some(&first));
        settle(&away);

        let back = create_router_state(&strategy, &snapshot(&routes, "/team/1/user/b"), Some(&away));
        let user = back.find_by_component("UserCmp").unwrap();
        assert!(Arc::ptr_eq(first.find_by_component("UserCmp").unwrap(), user));
        assert_eq!(strategy.stored_count(), 0);

        settle(&back);
        assert_eq!(user.snapshot().params.get("name").map(String::as_str), Some("b"));
    }
}
