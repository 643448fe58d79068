use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::route::{ComponentRef, Data, Route};
use crate::tree::{Tree, TreeNode};
use crate::url::{serializer::serialize_paths, Params, UrlSegment, UrlSegmentGroup};

/// Immutable picture of one matched route at one moment
#[derive(Debug)]
pub struct RouteSnapshot {
    /// Segments this route consumed
    pub url: Vec<UrlSegment>,
    /// Positional, matrix and inherited params
    pub params: Params,
    pub query_params: Params,
    pub fragment: Option<String>,
    /// Static data, own plus inherited
    pub static_data: Data,
    pub outlet: String,
    pub component: Option<ComponentRef>,
    pub route_config: Option<Arc<Route>>,
    url_segment_group: Arc<UrlSegmentGroup>,
    last_matched_index: Option<usize>,
    resolved: OnceLock<Data>,
}

impl RouteSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        url: Vec<UrlSegment>,
        params: Params,
        query_params: Params,
        fragment: Option<String>,
        static_data: Data,
        outlet: String,
        component: Option<ComponentRef>,
        route_config: Option<Arc<Route>>,
        url_segment_group: Arc<UrlSegmentGroup>,
        last_matched_index: Option<usize>,
    ) -> Self {
        Self {
            url,
            params,
            query_params,
            fragment,
            static_data,
            outlet,
            component,
            route_config,
            url_segment_group,
            last_matched_index,
            resolved: OnceLock::new(),
        }
    }

    /// Segment group this route was matched against
    pub fn url_segment_group(&self) -> &Arc<UrlSegmentGroup> {
        &self.url_segment_group
    }

    /// Index of the last segment consumed in [`Self::url_segment_group`];
    /// `None` when nothing was consumed at or before this route in that group
    pub fn last_matched_index(&self) -> Option<usize> {
        self.last_matched_index
    }

    /// Static data with resolved entries layered on top
    pub fn data(&self) -> Data {
        let mut data = self.static_data.clone();
        if let Some(resolved) = self.resolved.get() {
            data.extend(resolved.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        data
    }

    /// Resolver output, once the resolve stage ran
    pub fn resolved(&self) -> Option<&Data> {
        self.resolved.get()
    }

    /// Stores resolver output; later calls are ignored
    pub(crate) fn set_resolved(&self, data: Data) {
        let _ = self.resolved.set(data);
    }

    pub fn route_path(&self) -> &str {
        self.route_config.as_ref().map(|r| r.path()).unwrap_or("")
    }
}

impl fmt::Display for RouteSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Route(url:'{}', path:'{}'",
            serialize_paths(&self.url),
            self.route_path()
        )?;
        if let Some(component) = &self.component {
            write!(f, ", component:'{}'", component)?;
        }
        f.write_str(")")
    }
}

/// Snapshot of every matched route for one URL
#[derive(Debug, Clone)]
pub struct RouterStateSnapshot {
    pub url: String,
    pub tree: Tree<Arc<RouteSnapshot>>,
}

impl RouterStateSnapshot {
    pub fn new(url: String, root: TreeNode<Arc<RouteSnapshot>>) -> Self {
        Self {
            url,
            tree: Tree::new(root),
        }
    }

    pub fn root(&self) -> &Arc<RouteSnapshot> {
        self.tree.root()
    }

    /// Primary-outlet chain from the root down
    pub fn primary_chain(&self) -> Vec<&Arc<RouteSnapshot>> {
        let mut out = vec![self.tree.root()];
        let mut node = &self.tree.root;
        while let Some(next) = node
            .children
            .iter()
            .find(|c| c.value.outlet == crate::url::PRIMARY_OUTLET)
        {
            out.push(&next.value);
            node = next;
        }
        out
    }
}

impl fmt::Display for RouterStateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(
            f: &mut fmt::Formatter<'_>,
            node: &TreeNode<Arc<RouteSnapshot>>,
        ) -> fmt::Result {
            write!(f, "{}", node.value)?;
            if !node.children.is_empty() {
                f.write_str(" { ")?;
                for (i, child) in node.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_node(f, child)?;
                }
                f.write_str(" }")?;
            }
            Ok(())
        }
        write_node(f, &self.tree.root)
    }
}
