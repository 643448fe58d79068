//! Route recognition
//!
//! Matches a redirect-free [`UrlTree`] against the route table and builds a
//! [`RouterStateSnapshot`]. The walk follows the same shape as redirect
//! expansion but skips redirect routes and accumulates params on the way
//! down.
//!
//! Empty-path routes complicate the picture: they consume nothing, so an
//! outlet can be satisfied without any URL group of its own. The matcher
//! therefore works on [`GroupView`]s, which remember the real group a
//! synthetic one was carved from and how far into it matching already got.
//! That pair ends up in every snapshot, so relative navigation can find the
//! exact place a route was matched.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::ParamsInheritance;
use crate::error::RecognizeError;
use crate::redirects::match_route;
use crate::route::{ComponentRef, Data, Route};
use crate::state::{RouteSnapshot, RouterStateSnapshot};
use crate::tree::TreeNode;
use crate::url::{Params, UrlSegment, UrlSegmentGroup, UrlTree, PRIMARY_OUTLET};

type Node = TreeNode<Arc<RouteSnapshot>>;

/// Matches `tree` against `routes`
///
/// `url` is only recorded on the snapshot. Sibling nodes come out with the
/// primary outlet first and the rest sorted by outlet name.
///
/// # Examples
///
/// ```
/// use rhtmx_nav::config::ParamsInheritance;
/// use rhtmx_nav::recognize::recognize;
/// use rhtmx_nav::route::{into_shared, Route};
/// use rhtmx_nav::url::{DefaultUrlSerializer, UrlSerializer};
///
/// let routes = into_shared([Route::componentless("team/:id")
///     .with_children([Route::component("user/:name", "UserCmp")])]);
/// let tree = DefaultUrlSerializer.parse("/team/11/user/bob").unwrap();
/// let state = recognize(None, &routes, &tree, "/team/11/user/bob", ParamsInheritance::default()).unwrap();
///
/// let chain = state.primary_chain();
/// assert_eq!(chain[2].params["id"], "11");
/// assert_eq!(chain[2].params["name"], "bob");
/// ```
#[instrument(level = "debug", skip(root_component, routes, tree))]
pub fn recognize(
    root_component: Option<ComponentRef>,
    routes: &[Arc<Route>],
    tree: &UrlTree,
    url: &str,
    inheritance: ParamsInheritance,
) -> Result<RouterStateSnapshot, RecognizeError> {
    let recognizer = Recognizer {
        query_params: &tree.query_params,
        fragment: &tree.fragment,
        inheritance,
    };

    let root_view = GroupView::real(&tree.root);
    let root_split = split(&root_view, &[], &[], routes);
    let inherited = Inherited::default();

    let children = if root_split.sliced.is_empty() && !root_split.slots.is_empty() {
        recognizer.process_children(routes, root_split.slots, &inherited)
    } else {
        recognizer.process_segment(routes, &root_split.view, &[], PRIMARY_OUTLET, &inherited)
    }
    .map_err(Miss::into_error)?;

    let root = Arc::new(RouteSnapshot::new(
        Vec::new(),
        Params::new(),
        tree.query_params.clone(),
        tree.fragment.clone(),
        Data::new(),
        PRIMARY_OUTLET.to_string(),
        root_component,
        None,
        Arc::clone(&tree.root),
        None,
    ));

    let snapshot = RouterStateSnapshot::new(url.to_string(), TreeNode::new(root, children));
    debug!(state = %snapshot, "Recognized");
    Ok(snapshot)
}

// ============================================================================
// Internals
// ============================================================================

/// Why a branch produced no nodes
#[derive(Debug)]
enum Miss {
    NoMatch(Arc<UrlSegmentGroup>),
    Fatal(RecognizeError),
}

impl Miss {
    fn into_error(self) -> RecognizeError {
        match self {
            Miss::NoMatch(group) => RecognizeError::NoMatch {
                segment_group: group.to_string(),
            },
            Miss::Fatal(err) => err,
        }
    }
}

type MatchResult<T> = Result<T, Miss>;

/// A segment group plus its position inside the real URL group
#[derive(Debug, Clone)]
struct GroupView {
    group: Arc<UrlSegmentGroup>,
    /// Group of the parsed URL this view was carved from
    source: Arc<UrlSegmentGroup>,
    /// Segments of `source` consumed before this view starts
    shift: usize,
}

impl GroupView {
    fn real(group: &Arc<UrlSegmentGroup>) -> Self {
        Self {
            group: Arc::clone(group),
            source: Arc::clone(group),
            shift: 0,
        }
    }

    /// View starting `consumed` segments further into the same source
    fn advanced(&self, group: Arc<UrlSegmentGroup>, consumed: usize) -> Self {
        Self {
            group,
            source: Arc::clone(&self.source),
            shift: self.shift + consumed,
        }
    }

    fn last_index(&self, consumed: usize) -> Option<usize> {
        (self.shift + consumed).checked_sub(1)
    }

    fn real_slots(&self) -> Vec<Slot> {
        self.group
            .children_primary_first()
            .into_iter()
            .map(|(outlet, child)| Slot {
                outlet: outlet.to_string(),
                view: GroupView::real(child),
                only: None,
            })
            .collect()
    }
}

/// One outlet to recognize at a level
#[derive(Debug)]
struct Slot {
    outlet: String,
    view: GroupView,
    /// Set for synthetic slots opened by one empty-path route
    only: Option<Arc<Route>>,
}

/// Params and static data handed to descendants
#[derive(Debug, Default, Clone)]
struct Inherited {
    params: Params,
    data: Data,
}

struct Recognizer<'a> {
    query_params: &'a Params,
    fragment: &'a Option<String>,
    inheritance: ParamsInheritance,
}

impl Recognizer<'_> {
    fn process_segment_group(
        &self,
        config: &[Arc<Route>],
        view: &GroupView,
        outlet: &str,
        inherited: &Inherited,
    ) -> MatchResult<Vec<Node>> {
        if view.group.is_outlet_splitter() {
            self.process_children(config, view.real_slots(), inherited)
        } else {
            self.process_segment(config, view, &view.group.segments, outlet, inherited)
        }
    }

    fn process_children(
        &self,
        config: &[Arc<Route>],
        slots: Vec<Slot>,
        inherited: &Inherited,
    ) -> MatchResult<Vec<Node>> {
        let mut nodes = Vec::new();
        for slot in slots {
            let routes = match &slot.only {
                Some(route) => std::slice::from_ref(route),
                None => config,
            };
            nodes.extend(self.process_segment_group(routes, &slot.view, &slot.outlet, inherited)?);
        }

        check_outlet_uniqueness(&nodes).map_err(Miss::Fatal)?;
        nodes.sort_by(|a, b| compare_outlets(&a.value.outlet, &b.value.outlet));
        Ok(nodes)
    }

    fn process_segment(
        &self,
        config: &[Arc<Route>],
        view: &GroupView,
        segments: &[UrlSegment],
        outlet: &str,
        inherited: &Inherited,
    ) -> MatchResult<Vec<Node>> {
        for route in config {
            match self.process_segment_against_route(route, view, segments, outlet, inherited) {
                Err(Miss::NoMatch(_)) => continue,
                result => return result,
            }
        }

        if segments.is_empty() && view.group.child(outlet).is_none() {
            return Ok(Vec::new());
        }
        Err(Miss::NoMatch(Arc::clone(&view.group)))
    }

    fn process_segment_against_route(
        &self,
        route: &Arc<Route>,
        view: &GroupView,
        segments: &[UrlSegment],
        outlet: &str,
        inherited: &Inherited,
    ) -> MatchResult<Vec<Node>> {
        if route.redirect_to().is_some() || route.outlet() != outlet {
            return Err(Miss::NoMatch(Arc::clone(&view.group)));
        }

        if route.is_wildcard() {
            let mut params = inherited.params.clone();
            if let Some(last) = segments.last() {
                params.extend(last.parameters.clone());
            }
            let snapshot = self.snapshot(
                route,
                segments.to_vec(),
                params,
                inherited,
                view,
                view.last_index(segments.len()),
            );
            return Ok(vec![TreeNode::leaf(snapshot)]);
        }

        let matched = match_route(&view.group, route, segments)
            .ok_or_else(|| Miss::NoMatch(Arc::clone(&view.group)))?;

        // inherited, then positional, then matrix: later writes win
        let mut params = inherited.params.clone();
        params.extend(
            matched
                .positional
                .iter()
                .map(|(name, segment)| (name.clone(), segment.path.clone())),
        );
        if let Some(last) = matched.consumed.last() {
            params.extend(last.parameters.clone());
        }

        let consumed = matched.consumed.len();
        let snapshot = self.snapshot(
            route,
            matched.consumed.clone(),
            params,
            inherited,
            view,
            view.last_index(consumed),
        );

        let descendants = self.inherited_for_children(route, &snapshot);
        let child_config = route.children();
        let split = split(view, &matched.consumed, &segments[matched.last_child..], child_config);

        let children = if split.sliced.is_empty() && !split.slots.is_empty() {
            self.process_children(child_config, split.slots, &descendants)?
        } else if child_config.is_empty() && split.sliced.is_empty() {
            Vec::new()
        } else {
            self.process_segment(
                child_config,
                &split.view,
                &split.sliced,
                PRIMARY_OUTLET,
                &descendants,
            )?
        };

        Ok(vec![TreeNode::new(snapshot, children)])
    }

    fn snapshot(
        &self,
        route: &Arc<Route>,
        url: Vec<UrlSegment>,
        params: Params,
        inherited: &Inherited,
        view: &GroupView,
        last_matched_index: Option<usize>,
    ) -> Arc<RouteSnapshot> {
        let mut data = inherited.data.clone();
        data.extend(route.data.iter().map(|(k, v)| (k.clone(), v.clone())));

        Arc::new(RouteSnapshot::new(
            url,
            params,
            self.query_params.clone(),
            self.fragment.clone(),
            data,
            route.outlet().to_string(),
            route.component_ref().cloned(),
            Some(Arc::clone(route)),
            Arc::clone(&view.source),
            last_matched_index,
        ))
    }

    /// Params and data stop at a route that owns a component
    fn inherited_for_children(&self, route: &Route, snapshot: &RouteSnapshot) -> Inherited {
        let passes_down = match self.inheritance {
            ParamsInheritance::Always => true,
            ParamsInheritance::ComponentlessOnly => route.component_ref().is_none(),
        };
        if passes_down {
            Inherited {
                params: snapshot.params.clone(),
                data: snapshot.static_data.clone(),
            }
        } else {
            Inherited::default()
        }
    }
}

// ============================================================================
// Outlet bookkeeping
// ============================================================================

fn compare_outlets(a: &str, b: &str) -> Ordering {
    match (a == PRIMARY_OUTLET, b == PRIMARY_OUTLET) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

fn check_outlet_uniqueness(nodes: &[Node]) -> Result<(), RecognizeError> {
    let mut seen: BTreeMap<&str, &RouteSnapshot> = BTreeMap::new();
    for node in nodes {
        let snapshot = node.value.as_ref();
        if let Some(first) = seen.insert(snapshot.outlet.as_str(), snapshot) {
            return Err(RecognizeError::DuplicateOutlet {
                outlet: snapshot.outlet.clone(),
                first: first.to_string(),
                second: snapshot.to_string(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Empty-path splitting
// ============================================================================

/// Result of making room for empty-path routes after a match
struct Split {
    /// Where matching continues when there are leftover segments
    view: GroupView,
    /// Outlets to recognize when nothing is left on the primary path
    slots: Vec<Slot>,
    sliced: Vec<UrlSegment>,
}

/// Could `route` match here without consuming anything?
fn empty_path_match(group: &UrlSegmentGroup, sliced: &[UrlSegment], route: &Route) -> bool {
    if (group.has_children() || !sliced.is_empty())
        && route.path_match == crate::route::PathMatch::Full
    {
        return false;
    }
    route.is_empty_path() && route.redirect_to().is_none()
}

/// Opens outlet slots for empty-path routes
///
/// With leftover segments and named-outlet empty-path routes, the leftover
/// moves into a synthetic primary slot and each such route gets its own
/// empty slot. With nothing left, outlets not present in the URL get an
/// empty slot per empty-path route (primary at most once). Otherwise the
/// real children of the group are the slots.
fn split(
    view: &GroupView,
    consumed: &[UrlSegment],
    sliced: &[UrlSegment],
    config: &[Arc<Route>],
) -> Split {
    let group = &view.group;
    let next = view.advanced(Arc::clone(group), consumed.len());

    let named_empty: Vec<&Arc<Route>> = config
        .iter()
        .filter(|r| empty_path_match(group, sliced, r) && r.outlet() != PRIMARY_OUTLET)
        .collect();

    if !sliced.is_empty() && !named_empty.is_empty() {
        let primary = Arc::new(UrlSegmentGroup::new(sliced.to_vec(), group.children.clone()));
        let mut slots = vec![Slot {
            outlet: PRIMARY_OUTLET.to_string(),
            view: view.advanced(primary, consumed.len()),
            only: None,
        }];
        slots.extend(named_empty.into_iter().map(|route| Slot {
            outlet: route.outlet().to_string(),
            view: view.advanced(Arc::new(UrlSegmentGroup::empty()), consumed.len()),
            only: Some(Arc::clone(route)),
        }));
        return Split {
            view: next,
            slots,
            sliced: Vec::new(),
        };
    }

    let mut slots = next.real_slots();
    if sliced.is_empty() {
        let mut primary_added = false;
        for route in config.iter().filter(|r| empty_path_match(group, sliced, r)) {
            let outlet = route.outlet();
            if group.child(outlet).is_some() {
                continue;
            }
            let is_primary = outlet == PRIMARY_OUTLET;
            if is_primary && primary_added {
                continue;
            }
            primary_added |= is_primary;
            slots.push(Slot {
                outlet: outlet.to_string(),
                view: view.advanced(Arc::new(UrlSegmentGroup::empty()), consumed.len()),
                // The primary slot keeps first-match semantics over the whole level
                only: if is_primary { None } else { Some(Arc::clone(route)) },
            });
        }
    }

    Split {
        view: next,
        slots,
        sliced: sliced.to_vec(),
    }
}
