//! Router state
//!
//! Two trees describe "where the router is":
//!
//! - [`RouterStateSnapshot`]: immutable, one per recognized URL, made of
//!   [`RouteSnapshot`]s. Guards and resolvers look at these.
//! - [`RouterState`]: the live tree of [`ActivatedRoute`]s. Nodes survive
//!   navigations that match the same route config, so subscribers keep
//!   their streams.

use std::sync::Arc;

use crate::route::{ComponentRef, Data};
use crate::tree::{Tree, TreeNode};
use crate::url::{Params, UrlTree, PRIMARY_OUTLET};

mod activated;
mod reconcile;
mod reuse;
mod snapshot;

pub use activated::{ActivatedRoute, RouteChange, RouteNodeState};
pub use reconcile::create_router_state;
pub use reuse::{
    DefaultRouteReuseStrategy, DetachedRouteHandle, KeepAliveReuseStrategy, RouteReuseStrategy,
};
pub use snapshot::{RouteSnapshot, RouterStateSnapshot};

/// Live tree of activated routes plus the snapshot it was built from
#[derive(Debug, Clone)]
pub struct RouterState {
    pub tree: Tree<Arc<ActivatedRoute>>,
    pub snapshot: RouterStateSnapshot,
}

impl RouterState {
    /// State before the first navigation: just the root, matched against `url`
    pub fn empty(url: &UrlTree, root_component: Option<ComponentRef>) -> Self {
        let root = Arc::new(RouteSnapshot::new(
            Vec::new(),
            Params::new(),
            url.query_params.clone(),
            url.fragment.clone(),
            Data::new(),
            PRIMARY_OUTLET.to_string(),
            root_component,
            None,
            Arc::clone(&url.root),
            None,
        ));
        let snapshot = RouterStateSnapshot::new(url.to_string(), TreeNode::leaf(Arc::clone(&root)));
        let activated = ActivatedRoute::new(root);
        activated.advance();
        Self {
            tree: Tree::new(TreeNode::leaf(activated)),
            snapshot,
        }
    }

    pub fn root(&self) -> &Arc<ActivatedRoute> {
        self.tree.root()
    }

    /// Every activated route, parents before children
    pub fn routes(&self) -> Vec<&Arc<ActivatedRoute>> {
        self.tree.root.walk().into_iter().map(|n| &n.value).collect()
    }

    /// Deepest route along the primary outlet chain
    pub fn primary_leaf(&self) -> &Arc<ActivatedRoute> {
        let mut node = &self.tree.root;
        while let Some(next) = node
            .children
            .iter()
            .find(|c| c.value.outlet() == PRIMARY_OUTLET)
        {
            node = next;
        }
        &node.value
    }

    /// Activated route for the component `name`, first in pre-order
    pub fn find_by_component(&self, name: &str) -> Option<&Arc<ActivatedRoute>> {
        self.routes()
            .into_iter()
            .find(|r| r.component().map(|c| c.name() == name).unwrap_or(false))
    }
}
