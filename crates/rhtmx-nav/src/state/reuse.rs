use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ActivatedRoute, RouteSnapshot};
use crate::tree::TreeNode;

/// A detached subtree of activated routes, kept aside for later reattachment
#[derive(Debug, Clone)]
pub struct DetachedRouteHandle {
    pub(crate) node: TreeNode<Arc<ActivatedRoute>>,
}

impl DetachedRouteHandle {
    pub fn route(&self) -> &Arc<ActivatedRoute> {
        &self.node.value
    }
}

/// Policy deciding which activated routes survive a navigation
///
/// `should_reuse_route` keeps a node in place; the detach/attach pair
/// parks a whole subtree when it is left and restores it on return.
pub trait RouteReuseStrategy: Send + Sync {
    fn should_detach(&self, route: &RouteSnapshot) -> bool;

    /// Stores (or with `None`, forgets) a detached subtree
    fn store(&self, route: &RouteSnapshot, handle: Option<DetachedRouteHandle>);

    fn should_attach(&self, route: &RouteSnapshot) -> bool;

    fn retrieve(&self, route: &RouteSnapshot) -> Option<DetachedRouteHandle>;

    fn should_reuse_route(&self, future: &RouteSnapshot, current: &RouteSnapshot) -> bool;
}

/// Reuses a node when the same route config matched again; never detaches
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRouteReuseStrategy;

impl RouteReuseStrategy for DefaultRouteReuseStrategy {
    fn should_detach(&self, _route: &RouteSnapshot) -> bool {
        false
    }

    fn store(&self, _route: &RouteSnapshot, _handle: Option<DetachedRouteHandle>) {}

    fn should_attach(&self, _route: &RouteSnapshot) -> bool {
        false
    }

    fn retrieve(&self, _route: &RouteSnapshot) -> Option<DetachedRouteHandle> {
        None
    }

    fn should_reuse_route(&self, future: &RouteSnapshot, current: &RouteSnapshot) -> bool {
        same_config(future, current)
    }
}

/// Keeps every left subtree, keyed by route path, and restores it on return
///
/// Useful for tab-like layouts where coming back should find the same
/// activated routes (and their stream subscribers) as before.
#[derive(Debug, Default)]
pub struct KeepAliveReuseStrategy {
    stored: Mutex<HashMap<String, DetachedRouteHandle>>,
}

impl KeepAliveReuseStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored_count(&self) -> usize {
        self.stored.lock().len()
    }

    fn key(route: &RouteSnapshot) -> Option<String> {
        route.route_config.as_ref().map(|r| r.path().to_string())
    }
}

impl RouteReuseStrategy for KeepAliveReuseStrategy {
    fn should_detach(&self, route: &RouteSnapshot) -> bool {
        route.component.is_some()
    }

    fn store(&self, route: &RouteSnapshot, handle: Option<DetachedRouteHandle>) {
        let Some(key) = Self::key(route) else {
            return;
        };
        let mut stored = self.stored.lock();
        match handle {
            Some(handle) => {
                stored.insert(key, handle);
            }
            None => {
                stored.remove(&key);
            }
        }
    }

    fn should_attach(&self, route: &RouteSnapshot) -> bool {
        Self::key(route)
            .map(|key| self.stored.lock().contains_key(&key))
            .unwrap_or(false)
    }

    fn retrieve(&self, route: &RouteSnapshot) -> Option<DetachedRouteHandle> {
        let key = Self::key(route)?;
        self.stored.lock().get(&key).cloned()
    }

    fn should_reuse_route(&self, future: &RouteSnapshot, current: &RouteSnapshot) -> bool {
        same_config(future, current)
    }
}

fn same_config(a: &RouteSnapshot, b: &RouteSnapshot) -> bool {
    match (&a.route_config, &b.route_config) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}
