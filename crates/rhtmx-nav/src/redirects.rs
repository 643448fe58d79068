//! Redirect expansion
//!
//! Rewrites a [`UrlTree`] until no route on its matching path is a
//! redirect. Matching walks the tree one segment group (outlet) at a time,
//! trying routes in declaration order.
//!
//! Control flow is carried by [`Expand`] instead of unwinding: `NoMatch`
//! makes the caller try the next route, anything else short-circuits all
//! the way up. An absolute redirect (`/...`) surfaces as `Global` and makes
//! [`apply_redirects`] restart from a fresh root.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::RedirectError;
use crate::route::{PathMatch, Route, RoutePath};
use crate::url::{UrlSegment, UrlSegmentGroup, UrlTree, PRIMARY_OUTLET};

/// Bound on consecutive absolute redirects in one expansion
const MAX_ABSOLUTE_REDIRECTS: usize = 16;

/// Why expansion stopped at some level
#[derive(Debug)]
enum Expand {
    /// This route does not fit; try the next one
    NoMatch(Arc<UrlSegmentGroup>),
    /// Restart from the root with these primary segments
    Global(Vec<UrlSegment>),
    Load(Arc<Route>),
    MissingParam { redirect_to: String, param: String },
}

impl Expand {
    fn into_error(self) -> RedirectError {
        match self {
            Expand::NoMatch(group) => RedirectError::NoMatch {
                segment_group: group.to_string(),
            },
            Expand::Load(route) => RedirectError::LoadRequired(route),
            Expand::MissingParam { redirect_to, param } => {
                RedirectError::MissingRedirectParam { redirect_to, param }
            }
            // apply_redirects consumes these before converting
            Expand::Global(_) => RedirectError::RedirectLoop {
                hops: MAX_ABSOLUTE_REDIRECTS,
            },
        }
    }
}

type ExpandResult<T> = Result<T, Expand>;

/// Expands every redirect on the matching path of `tree`
///
/// Query params and fragment are carried over unchanged. A tree that is
/// already redirect-free comes back equal to the input.
///
/// # Examples
///
/// ```
/// use rhtmx_nav::redirects::apply_redirects;
/// use rhtmx_nav::route::{into_shared, PathMatch, Route};
/// use rhtmx_nav::url::{DefaultUrlSerializer, UrlSerializer};
///
/// let routes = into_shared([
///     Route::redirect("", "main").with_path_match(PathMatch::Full),
///     Route::component("main", "MainCmp"),
/// ]);
/// let tree = DefaultUrlSerializer.parse("/").unwrap();
/// let expanded = apply_redirects(&tree, &routes).unwrap();
/// assert_eq!(expanded.to_string(), "/main");
/// ```
#[instrument(level = "debug", skip_all, fields(url = %tree))]
pub fn apply_redirects(tree: &UrlTree, routes: &[Arc<Route>]) -> Result<UrlTree, RedirectError> {
    let mut current = tree.clone();
    let mut allow_redirects = true;

    for hop in 0..=MAX_ABSOLUTE_REDIRECTS {
        match expand_segment_group(routes, &current.root, PRIMARY_OUTLET, allow_redirects) {
            Ok(root) => return Ok(wrap_root(&current, root)),
            Err(Expand::Global(segments)) => {
                current = UrlTree::from_primary_segments(
                    segments,
                    tree.query_params.clone(),
                    tree.fragment.clone(),
                );
                debug!(hop, target = %current, "Absolute redirect, restarting from root");
                // The target itself is taken literally at the top level
                allow_redirects = false;
            }
            Err(other) => return Err(other.into_error()),
        }
    }

    Err(RedirectError::RedirectLoop {
        hops: MAX_ABSOLUTE_REDIRECTS,
    })
}

/// Root groups that carry segments move under the primary outlet
fn wrap_root(tree: &UrlTree, root: UrlSegmentGroup) -> UrlTree {
    let root = if root.segments.is_empty() {
        root
    } else {
        UrlSegmentGroup::new(
            Vec::new(),
            BTreeMap::from([(PRIMARY_OUTLET.to_string(), Arc::new(root))]),
        )
    };
    UrlTree::new(root, tree.query_params.clone(), tree.fragment.clone())
}

// ============================================================================
// Expansion
// ============================================================================

fn expand_segment_group(
    routes: &[Arc<Route>],
    group: &Arc<UrlSegmentGroup>,
    outlet: &str,
    allow_redirects: bool,
) -> ExpandResult<UrlSegmentGroup> {
    if group.is_outlet_splitter() {
        Ok(UrlSegmentGroup::new(
            Vec::new(),
            expand_children(routes, group, allow_redirects)?,
        ))
    } else {
        expand_segment(group, routes, &group.segments, outlet, allow_redirects)
    }
}

fn expand_children(
    routes: &[Arc<Route>],
    group: &UrlSegmentGroup,
    allow_redirects: bool,
) -> ExpandResult<BTreeMap<String, Arc<UrlSegmentGroup>>> {
    let mut children = BTreeMap::new();
    for (outlet, child) in group.children_primary_first() {
        let expanded = expand_segment_group(routes, child, outlet, allow_redirects)?;
        // Outlets that matched nothing and carry nothing are dropped
        if !expanded.segments.is_empty() || expanded.has_children() {
            children.insert(outlet.to_string(), Arc::new(expanded));
        }
    }
    Ok(children)
}

fn expand_segment(
    group: &Arc<UrlSegmentGroup>,
    routes: &[Arc<Route>],
    segments: &[UrlSegment],
    outlet: &str,
    allow_redirects: bool,
) -> ExpandResult<UrlSegmentGroup> {
    for route in routes {
        match expand_segment_against_route(group, routes, route, segments, outlet, allow_redirects)
        {
            Err(Expand::NoMatch(_)) => continue,
            result => return result,
        }
    }

    if segments.is_empty() && group.child(outlet).is_none() {
        return Ok(UrlSegmentGroup::empty());
    }
    Err(Expand::NoMatch(Arc::clone(group)))
}

fn expand_segment_against_route(
    group: &Arc<UrlSegmentGroup>,
    routes: &[Arc<Route>],
    route: &Arc<Route>,
    segments: &[UrlSegment],
    outlet: &str,
    allow_redirects: bool,
) -> ExpandResult<UrlSegmentGroup> {
    if route.outlet() != outlet {
        return Err(Expand::NoMatch(Arc::clone(group)));
    }

    match route.redirect_to() {
        Some(_) if !allow_redirects => Err(Expand::NoMatch(Arc::clone(group))),
        Some(target) if route.is_wildcard() => expand_wildcard_redirect(target, segments),
        Some(target) => expand_regular_redirect(group, routes, route, target, segments, outlet),
        None => match_segment_against_route(group, route, segments),
    }
}

/// `**` redirect: positional params come from the last segment's matrix params
fn expand_wildcard_redirect(target: &str, segments: &[UrlSegment]) -> ExpandResult<UrlSegmentGroup> {
    let positional: BTreeMap<String, UrlSegment> = segments
        .last()
        .map(|last| {
            last.parameters
                .iter()
                .map(|(k, v)| (k.clone(), UrlSegment::from_path(v.clone())))
                .collect()
        })
        .unwrap_or_default();

    let new_segments = apply_redirect_commands(&[], target, &positional)?;
    if target.starts_with('/') {
        Err(Expand::Global(new_segments))
    } else {
        Ok(UrlSegmentGroup::leaf(new_segments))
    }
}

fn expand_regular_redirect(
    group: &Arc<UrlSegmentGroup>,
    routes: &[Arc<Route>],
    route: &Route,
    target: &str,
    segments: &[UrlSegment],
    outlet: &str,
) -> ExpandResult<UrlSegmentGroup> {
    let matched = match_route(group, route, segments).ok_or_else(|| Expand::NoMatch(Arc::clone(group)))?;

    let mut new_segments = apply_redirect_commands(&matched.consumed, target, &matched.positional)?;
    if target.starts_with('/') {
        return Err(Expand::Global(new_segments));
    }

    debug!(from = %route.path(), to = %target, "Relative redirect");
    new_segments.extend_from_slice(&segments[matched.last_child..]);
    expand_segment(group, routes, &new_segments, outlet, false)
}

fn match_segment_against_route(
    raw_group: &Arc<UrlSegmentGroup>,
    route: &Arc<Route>,
    segments: &[UrlSegment],
) -> ExpandResult<UrlSegmentGroup> {
    if route.is_wildcard() {
        return Ok(UrlSegmentGroup::leaf(segments.to_vec()));
    }

    let matched =
        match_route(raw_group, route, segments).ok_or_else(|| Expand::NoMatch(Arc::clone(raw_group)))?;
    if route.needs_load() {
        return Err(Expand::Load(Arc::clone(route)));
    }
    let child_config = route.children();

    let (group, sliced) = split(
        raw_group,
        &matched.consumed,
        &segments[matched.last_child..],
        child_config,
    );

    if sliced.is_empty() && group.has_children() {
        let children = expand_children(child_config, &group, true)?;
        Ok(UrlSegmentGroup::new(matched.consumed, children))
    } else if child_config.is_empty() && sliced.is_empty() {
        Ok(UrlSegmentGroup::leaf(matched.consumed))
    } else {
        let expanded = expand_segment(&group, child_config, &sliced, PRIMARY_OUTLET, true)?;
        let mut consumed = matched.consumed;
        consumed.extend(expanded.segments);
        Ok(UrlSegmentGroup::new(consumed, expanded.children))
    }
}

/// Replaces `target`'s parts with segments
///
/// `:name` takes the positional capture; a literal reuses a consumed
/// segment with the same path (keeping its matrix params) or becomes a
/// fresh segment.
fn apply_redirect_commands(
    consumed: &[UrlSegment],
    target: &str,
    positional: &BTreeMap<String, UrlSegment>,
) -> ExpandResult<Vec<UrlSegment>> {
    let relative = target.strip_prefix('/').unwrap_or(target);
    if relative.is_empty() {
        return Ok(Vec::new());
    }

    relative
        .split('/')
        .map(|part| match part.strip_prefix(':') {
            Some(name) => positional.get(name).cloned().ok_or_else(|| Expand::MissingParam {
                redirect_to: target.to_string(),
                param: name.to_string(),
            }),
            None => Ok(consumed
                .iter()
                .find(|s| s.path == part)
                .cloned()
                .unwrap_or_else(|| UrlSegment::from_path(part))),
        })
        .collect()
}

// ============================================================================
// Path matching (shared with recognition)
// ============================================================================

/// Outcome of matching one route path against the head of `segments`
#[derive(Debug, Clone, Default)]
pub(crate) struct PathMatchResult {
    pub consumed: Vec<UrlSegment>,
    /// Index into `segments` of the first unconsumed segment
    pub last_child: usize,
    /// `:name` captures
    pub positional: BTreeMap<String, UrlSegment>,
}

/// Matches `route`'s path against `segments` inside `group`
///
/// An empty path consumes nothing; with [`PathMatch::Full`] it only matches
/// when nothing is left at this level, children included.
pub(crate) fn match_route(
    group: &UrlSegmentGroup,
    route: &Route,
    segments: &[UrlSegment],
) -> Option<PathMatchResult> {
    let path = match route.route_path() {
        RoutePath::Wildcard => {
            return Some(PathMatchResult {
                consumed: segments.to_vec(),
                last_child: segments.len(),
                positional: BTreeMap::new(),
            })
        }
        RoutePath::Pattern(path) => path,
    };

    let full = route.path_match == PathMatch::Full;

    if path.is_empty() {
        if full && (group.has_children() || !segments.is_empty()) {
            return None;
        }
        return Some(PathMatchResult::default());
    }

    let mut consumed = Vec::new();
    let mut positional = BTreeMap::new();
    for (index, part) in path.split('/').enumerate() {
        let current = segments.get(index)?;
        match part.strip_prefix(':') {
            Some(name) => {
                positional.insert(name.to_string(), current.clone());
            }
            None if part != current.path => return None,
            None => {}
        }
        consumed.push(current.clone());
    }

    let last_child = consumed.len();
    if full && (group.has_children() || last_child < segments.len()) {
        return None;
    }

    Some(PathMatchResult {
        consumed,
        last_child,
        positional,
    })
}

// ============================================================================
// Empty-path redirects into outlets
// ============================================================================

/// Could the empty-path redirect `route` apply here without consuming anything?
fn is_empty_path_redirect(group: &UrlSegmentGroup, sliced: &[UrlSegment], route: &Route) -> bool {
    if (group.has_children() || !sliced.is_empty()) && route.path_match == PathMatch::Full {
        return false;
    }
    route.is_empty_path() && route.redirect_to().is_some()
}

/// Makes room for empty-path redirects so they get a group to match in
///
/// With segments left over, named-outlet empty redirects need the leftover
/// moved under a primary child next to empty groups for their outlets. With
/// nothing left, every outlet declaring an empty redirect gets an empty
/// group if it has none yet.
fn split(
    group: &Arc<UrlSegmentGroup>,
    consumed: &[UrlSegment],
    sliced: &[UrlSegment],
    config: &[Arc<Route>],
) -> (Arc<UrlSegmentGroup>, Vec<UrlSegment>) {
    let named_redirects = config
        .iter()
        .filter(|r| is_empty_path_redirect(group, sliced, r) && r.outlet() != PRIMARY_OUTLET);

    if !sliced.is_empty() && named_redirects.clone().next().is_some() {
        let mut children = BTreeMap::from([(
            PRIMARY_OUTLET.to_string(),
            Arc::new(UrlSegmentGroup::new(sliced.to_vec(), group.children.clone())),
        )]);
        for route in named_redirects {
            children
                .entry(route.outlet().to_string())
                .or_insert_with(|| Arc::new(UrlSegmentGroup::empty()));
        }
        let merged = merge_trivial_children(UrlSegmentGroup::new(consumed.to_vec(), children));
        return (Arc::new(merged), Vec::new());
    }

    if sliced.is_empty() && config.iter().any(|r| is_empty_path_redirect(group, sliced, r)) {
        let mut children = group.children.clone();
        for route in config.iter().filter(|r| is_empty_path_redirect(group, sliced, r)) {
            children
                .entry(route.outlet().to_string())
                .or_insert_with(|| Arc::new(UrlSegmentGroup::empty()));
        }
        let merged = merge_trivial_children(UrlSegmentGroup::new(group.segments.clone(), children));
        return (Arc::new(merged), Vec::new());
    }

    (Arc::clone(group), sliced.to_vec())
}

/// A lone primary child folds into its parent
fn merge_trivial_children(group: UrlSegmentGroup) -> UrlSegmentGroup {
    if group.number_of_children() == 1 {
        if let Some(primary) = group.child(PRIMARY_OUTLET) {
            let mut segments = group.segments.clone();
            segments.extend(primary.segments.iter().cloned());
            return UrlSegmentGroup::new(segments, primary.children.clone());
        }
    }
    group
}
