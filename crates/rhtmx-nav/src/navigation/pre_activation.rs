//! Guard and resolver stage
//!
//! Diffs the recognized snapshot tree against the committed one, runs the
//! guards for every route that changes and resolves data for every route
//! that activates. Routes kept with unchanged params are neither checked
//! nor resolved again; they inherit the previous resolved data.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument};

use crate::error::NavigationError;
use crate::route::{Data, GuardResult, Resolve};
use crate::state::{RouteSnapshot, RouterStateSnapshot};
use crate::tree::TreeNode;

type SnapshotNode = TreeNode<Arc<RouteSnapshot>>;

/// Work found by diffing the future tree against the current one
#[derive(Debug, Default)]
pub(crate) struct Checks {
    /// Current routes being left, with their depth
    deactivate: Vec<(usize, Arc<RouteSnapshot>)>,
    /// Root-to-route chains of future routes being activated, top-down
    activate: Vec<Vec<Arc<RouteSnapshot>>>,
}

/// Outcome of the guard run
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GuardVerdict {
    Pass,
    Reject { guard: &'static str, route: String },
    Redirect(String),
}

impl Checks {
    pub(crate) fn collect(future: &RouterStateSnapshot, current: &RouterStateSnapshot) -> Self {
        let mut checks = Checks::default();
        let mut path = vec![Arc::clone(future.root())];
        checks.traverse_children(&future.tree.root, Some(&current.tree.root), &mut path);
        // leaves first across the whole tree
        checks.deactivate.sort_by(|a, b| b.0.cmp(&a.0));
        checks
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.deactivate.is_empty() && self.activate.is_empty()
    }

    fn traverse_children(
        &mut self,
        future: &SnapshotNode,
        current: Option<&SnapshotNode>,
        path: &mut Vec<Arc<RouteSnapshot>>,
    ) {
        for child in &future.children {
            let previous = current.and_then(|node| {
                node.children
                    .iter()
                    .find(|c| c.value.outlet == child.value.outlet)
            });
            path.push(Arc::clone(&child.value));
            self.traverse_route(child, previous, path);
            path.pop();
        }

        if let Some(current) = current {
            for left in current
                .children
                .iter()
                .filter(|c| !future.children.iter().any(|f| f.value.outlet == c.value.outlet))
            {
                self.deactivate_subtree(left, path.len());
            }
        }
    }

    fn traverse_route(
        &mut self,
        future: &SnapshotNode,
        current: Option<&SnapshotNode>,
        path: &mut Vec<Arc<RouteSnapshot>>,
    ) {
        match current {
            Some(current) if same_config(&future.value, &current.value) => {
                if future.value.params != current.value.params || future.value.url != current.value.url {
                    self.deactivate.push((path.len(), Arc::clone(&current.value)));
                    self.activate.push(path.clone());
                } else if let Some(data) = current.value.resolved() {
                    future.value.set_resolved(data.clone());
                }
                self.traverse_children(future, Some(current), path);
            }
            other => {
                if let Some(current) = other {
                    self.deactivate_subtree(current, path.len());
                }
                self.activate.push(path.clone());
                self.traverse_children(future, None, path);
            }
        }
    }

    fn deactivate_subtree(&mut self, node: &SnapshotNode, depth: usize) {
        for child in &node.children {
            self.deactivate_subtree(child, depth + 1);
        }
        self.deactivate.push((depth, Arc::clone(&node.value)));
    }

    /// Runs every guard in order and stops at the first non-`Allow`
    #[instrument(skip_all)]
    pub(crate) async fn run_guards(
        &self,
        current: &RouterStateSnapshot,
        future: &RouterStateSnapshot,
    ) -> GuardVerdict {
        for (_, route) in &self.deactivate {
            let Some(config) = &route.route_config else { continue };
            for guard in &config.guards.can_deactivate {
                let result = guard.can_deactivate(route, current, future).await;
                if let Some(verdict) = verdict("CanDeactivate", route, result) {
                    return verdict;
                }
            }
        }

        for chain in &self.activate {
            let Some((route, ancestors)) = chain.split_last() else { continue };

            // nearest ancestor first
            for ancestor in ancestors.iter().rev() {
                let Some(config) = &ancestor.route_config else { continue };
                for guard in &config.guards.can_activate_child {
                    let result = guard.can_activate_child(route, future).await;
                    if let Some(verdict) = verdict("CanActivateChild", route, result) {
                        return verdict;
                    }
                }
            }

            let Some(config) = &route.route_config else { continue };
            for guard in &config.guards.can_activate {
                let result = guard.can_activate(route, future).await;
                if let Some(verdict) = verdict("CanActivate", route, result) {
                    return verdict;
                }
            }
        }

        GuardVerdict::Pass
    }

    /// Resolves data level by level
    ///
    /// Resolvers of one depth run concurrently; a level finishes before the
    /// next one starts. The first failure aborts the navigation.
    #[instrument(skip_all)]
    pub(crate) async fn run_resolvers(&self, future: &RouterStateSnapshot) -> Result<(), NavigationError> {
        let mut levels: BTreeMap<usize, Vec<&Arc<RouteSnapshot>>> = BTreeMap::new();
        for chain in &self.activate {
            if let Some(route) = chain.last() {
                levels.entry(chain.len()).or_default().push(route);
            }
        }

        for (depth, routes) in levels {
            let mut tasks = Vec::new();
            for route in &routes {
                let Some(config) = &route.route_config else { continue };
                for (key, resolver) in &config.resolvers {
                    tasks.push(resolve_one(Arc::clone(route), key.clone(), Arc::clone(resolver), future));
                }
            }
            debug!(depth, resolvers = tasks.len(), "Resolving level");

            let mut resolved: Vec<Data> = vec![Data::new(); routes.len()];
            for (route, key, result) in join_all(tasks).await {
                let value = result.map_err(|source| NavigationError::Resolver {
                    key: key.clone(),
                    route: route.route_path().to_string(),
                    source,
                })?;
                if let Some(slot) = routes.iter().position(|r| Arc::ptr_eq(r, &route)) {
                    resolved[slot].insert(key, value);
                }
            }

            for (route, data) in routes.into_iter().zip(resolved) {
                route.set_resolved(data);
            }
        }
        Ok(())
    }
}

async fn resolve_one(
    route: Arc<RouteSnapshot>,
    key: String,
    resolver: Arc<dyn Resolve>,
    state: &RouterStateSnapshot,
) -> (Arc<RouteSnapshot>, String, anyhow::Result<serde_json::Value>) {
    let result = resolver.resolve(&route, state).await;
    (route, key, result)
}

fn verdict(guard: &'static str, route: &RouteSnapshot, result: GuardResult) -> Option<GuardVerdict> {
    match result {
        GuardResult::Allow => None,
        GuardResult::Deny => {
            debug!(guard, route = %route, "Guard rejected");
            Some(GuardVerdict::Reject {
                guard,
                route: route.route_path().to_string(),
            })
        }
        GuardResult::Redirect(target) => {
            debug!(guard, route = %route, target = %target, "Guard redirected");
            Some(GuardVerdict::Redirect(target))
        }
    }
}

fn same_config(a: &RouteSnapshot, b: &RouteSnapshot) -> bool {
    match (&a.route_config, &b.route_config) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamsInheritance;
    use crate::recognize::recognize;
    use crate::route::{guard_fn, into_shared, Route};
    use crate::url::{DefaultUrlSerializer, UrlSerializer};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Echo(&'static str);

    #[async_trait]
    impl Resolve for Echo {
        async fn resolve(
            &self,
            route: &RouteSnapshot,
            _state: &RouterStateSnapshot,
        ) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!(format!(
                "{}:{}",
                self.0,
                route.params.get("id").cloned().unwrap_or_default()
            )))
        }
    }

    fn snapshot(routes: &[Arc<Route>], url: &str) -> RouterStateSnapshot {
        let tree = DefaultUrlSerializer.parse(url).unwrap();
        recognize(None, routes, &tree, url, ParamsInheritance::ComponentlessOnly).unwrap()
    }

    fn activated_paths(checks: &Checks) -> Vec<String> {
        checks
            .activate
            .iter()
            .map(|chain| chain.last().unwrap().route_path().to_string())
            .collect()
    }

    #[test]
    fn test_same_params_are_kept() {
        let routes = into_shared([Route::component("team/:id", "TeamCmp")
            .with_children([Route::component("user/:name", "UserCmp")])]);
        let current = snapshot(&routes, "/team/1/user/a");
        let future = snapshot(&routes, "/team/1/user/b");

        let checks = Checks::collect(&future, &current);
        assert_eq!(activated_paths(&checks), vec!["user/:name"]);
        assert_eq!(checks.deactivate.len(), 1);
    }

    #[test]
    fn test_left_subtree_is_deactivated_leaves_first() {
        let routes = into_shared([
            Route::component("team/:id", "TeamCmp")
                .with_children([Route::component("user/:name", "UserCmp")]),
            Route::component("home", "HomeCmp"),
        ]);
        let current = snapshot(&routes, "/team/1/user/a");
        let future = snapshot(&routes, "/home");

        let checks = Checks::collect(&future, &current);
        let left: Vec<_> = checks
            .deactivate
            .iter()
            .map(|(_, r)| r.route_path().to_string())
            .collect();
        assert_eq!(left, vec!["user/:name", "team/:id"]);
        assert_eq!(activated_paths(&checks), vec!["home"]);
    }

    #[tokio::test]
    async fn test_child_guard_blocks() {
        let routes = into_shared([Route::component("team/:id", "TeamCmp")
            .with_can_activate_child(guard_fn(|child, _| {
                GuardResult::from(child.params.get("name").map(String::as_str) != Some("x"))
            }))
            .with_children([Route::component("user/:name", "UserCmp")])]);
        let current = snapshot(&routes, "/team/1/user/a");
        let future = snapshot(&routes, "/team/1/user/x");

        let checks = Checks::collect(&future, &current);
        assert_eq!(
            checks.run_guards(&current, &future).await,
            GuardVerdict::Reject {
                guard: "CanActivateChild",
                route: "user/:name".into()
            }
        );
    }

    #[tokio::test]
    async fn test_resolvers_fill_data_and_kept_routes_inherit() {
        let routes = into_shared([Route::component("team/:id", "TeamCmp")
            .with_resolver("team", Echo("team"))
            .with_children([Route::component("user/:name", "UserCmp").with_resolver("user", Echo("user"))])]);
        let first = snapshot(&routes, "/team/7/user/a");

        // against a bare root everything activates
        let initial = RouterStateSnapshot::new("/".into(), TreeNode::leaf(Arc::clone(first.root())));
        let checks = Checks::collect(&first, &initial);
        checks.run_resolvers(&first).await.unwrap();
        let team = &first.tree.root.children[0].value;
        assert_eq!(team.data().get("team"), Some(&serde_json::json!("team:7")));

        let second = snapshot(&routes, "/team/7/user/b");
        let checks = Checks::collect(&second, &first);
        checks.run_resolvers(&second).await.unwrap();
        let team = &second.tree.root.children[0].value;
        assert_eq!(team.data().get("team"), Some(&serde_json::json!("team:7")));
        assert_eq!(activated_paths(&checks), vec!["user/:name"]);
    }
}
