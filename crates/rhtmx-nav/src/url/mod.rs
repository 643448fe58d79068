//! URL tree model
//!
//! A URL is not a flat string here: it is a tree of segment groups, one group
//! per outlet, so that `/team/33/(user/victor//aux:chat)` can address several
//! outlets at once.
//!
//! All types are immutable values. Operations that "change" a tree return a
//! new tree; untouched groups are shared through `Arc`, which also gives the
//! URL-tree builder a cheap identity check (`Arc::ptr_eq`) for locating the
//! group a route was matched against.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub mod serializer;

pub use serializer::{DefaultUrlSerializer, UrlSerializer};

/// Name of the default (unnamed) outlet
pub const PRIMARY_OUTLET: &str = "primary";

/// Matrix or query parameters, kept sorted for deterministic output
pub type Params = BTreeMap<String, String>;

// ============================================================================
// UrlSegment
// ============================================================================

/// One path element plus the matrix parameters attached to it
///
/// # Examples
///
/// ```
/// use rhtmx_nav::url::{Params, UrlSegment};
///
/// let segment = UrlSegment::new("team", Params::from([("id".into(), "33".into())]));
/// assert_eq!(segment.to_string(), "team;id=33");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlSegment {
    pub path: String,
    pub parameters: Params,
}

impl UrlSegment {
    pub fn new(path: impl Into<String>, parameters: Params) -> Self {
        Self {
            path: path.into(),
            parameters,
        }
    }

    /// Segment without matrix parameters
    pub fn from_path(path: impl Into<String>) -> Self {
        Self::new(path, Params::new())
    }
}

impl fmt::Display for UrlSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serializer::serialize_path(self))
    }
}

// ============================================================================
// UrlSegmentGroup
// ============================================================================

/// A run of segments plus the outlet branches hanging below it
///
/// A group with no segments but with children is a pure outlet splitter:
/// it consumes no path at its own level.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlSegmentGroup {
    pub segments: Vec<UrlSegment>,
    pub children: BTreeMap<String, Arc<UrlSegmentGroup>>,
}

impl UrlSegmentGroup {
    pub fn new(
        segments: Vec<UrlSegment>,
        children: BTreeMap<String, Arc<UrlSegmentGroup>>,
    ) -> Self {
        Self { segments, children }
    }

    /// Group holding only segments
    pub fn leaf(segments: Vec<UrlSegment>) -> Self {
        Self::new(segments, BTreeMap::new())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn number_of_children(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, outlet: &str) -> Option<&Arc<UrlSegmentGroup>> {
        self.children.get(outlet)
    }

    /// True when this level consumes no path and only splits into outlets
    pub fn is_outlet_splitter(&self) -> bool {
        self.segments.is_empty() && self.has_children()
    }

    /// Children with the primary outlet first, the rest in lexical order
    pub fn children_primary_first(&self) -> Vec<(&str, &Arc<UrlSegmentGroup>)> {
        let primary = self
            .children
            .get_key_value(PRIMARY_OUTLET)
            .map(|(k, v)| (k.as_str(), v));

        primary
            .into_iter()
            .chain(
                self.children
                    .iter()
                    .filter(|(k, _)| k.as_str() != PRIMARY_OUTLET)
                    .map(|(k, v)| (k.as_str(), v)),
            )
            .collect()
    }
}

impl fmt::Display for UrlSegmentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serializer::serialize_paths(&self.segments))
    }
}

// ============================================================================
// UrlTree
// ============================================================================

/// Parsed URL: root segment group plus query parameters and fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTree {
    pub root: Arc<UrlSegmentGroup>,
    pub query_params: Params,
    pub fragment: Option<String>,
}

impl UrlTree {
    pub fn new(root: UrlSegmentGroup, query_params: Params, fragment: Option<String>) -> Self {
        Self {
            root: Arc::new(root),
            query_params,
            fragment,
        }
    }

    /// The tree for `/`
    pub fn empty() -> Self {
        Self::new(UrlSegmentGroup::empty(), Params::new(), None)
    }

    /// Tree whose root has only a primary child with `segments`
    pub fn from_primary_segments(
        segments: Vec<UrlSegment>,
        query_params: Params,
        fragment: Option<String>,
    ) -> Self {
        let root = if segments.is_empty() {
            UrlSegmentGroup::empty()
        } else {
            UrlSegmentGroup::new(
                Vec::new(),
                BTreeMap::from([(
                    PRIMARY_OUTLET.to_string(),
                    Arc::new(UrlSegmentGroup::leaf(segments)),
                )]),
            )
        };
        Self::new(root, query_params, fragment)
    }

    /// Same tree with another query string and fragment
    pub fn with_query(&self, query_params: Params, fragment: Option<String>) -> Self {
        Self {
            root: Arc::clone(&self.root),
            query_params,
            fragment,
        }
    }
}

impl fmt::Display for UrlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DefaultUrlSerializer.serialize(self))
    }
}

// ============================================================================
// Containment (link-active checks)
// ============================================================================

/// Structural subset / equality check between two trees
///
/// With `exact`, both trees must have identical segment paths, outlets and
/// query params. Otherwise `containee` only has to be a prefix of
/// `container` (every query param of `containee` present with the same value).
///
/// Matrix parameters are ignored; only paths are compared.
///
/// # Examples
///
/// ```
/// use rhtmx_nav::url::{contains_tree, DefaultUrlSerializer, UrlSerializer};
///
/// let s = DefaultUrlSerializer;
/// let current = s.parse("/team/33/user/victor").unwrap();
/// assert!(contains_tree(&current, &s.parse("/team/33").unwrap(), false));
/// assert!(!contains_tree(&current, &s.parse("/team/33").unwrap(), true));
/// ```
pub fn contains_tree(container: &UrlTree, containee: &UrlTree, exact: bool) -> bool {
    if exact {
        container.query_params == containee.query_params
            && equal_segment_groups(&container.root, &containee.root)
    } else {
        contains_query_params(&container.query_params, &containee.query_params)
            && contains_segment_group(&container.root, &containee.root)
    }
}

fn contains_query_params(container: &Params, containee: &Params) -> bool {
    containee
        .iter()
        .all(|(k, v)| container.get(k).map(|c| c == v).unwrap_or(false))
}

fn equal_path(a: &[UrlSegment], b: &[UrlSegment]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.path == y.path)
}

fn equal_segment_groups(container: &UrlSegmentGroup, containee: &UrlSegmentGroup) -> bool {
    if !equal_path(&container.segments, &containee.segments) {
        return false;
    }
    if container.number_of_children() != containee.number_of_children() {
        return false;
    }
    containee.children.iter().all(|(outlet, child)| {
        container
            .child(outlet)
            .map(|c| equal_segment_groups(c, child))
            .unwrap_or(false)
    })
}

fn contains_segment_group(container: &UrlSegmentGroup, containee: &UrlSegmentGroup) -> bool {
    contains_segment_group_helper(container, containee, &containee.segments)
}

fn contains_segment_group_helper(
    container: &UrlSegmentGroup,
    containee: &UrlSegmentGroup,
    containee_paths: &[UrlSegment],
) -> bool {
    let own = container.segments.len();

    if own > containee_paths.len() {
        equal_path(&container.segments[..containee_paths.len()], containee_paths)
            && !containee.has_children()
    } else if own == containee_paths.len() {
        equal_path(&container.segments, containee_paths)
            && containee.children.iter().all(|(outlet, child)| {
                container
                    .child(outlet)
                    .map(|c| contains_segment_group(c, child))
                    .unwrap_or(false)
            })
    } else {
        let (current, next) = containee_paths.split_at(own);
        if !equal_path(&container.segments, current) {
            return false;
        }
        match container.child(PRIMARY_OUTLET) {
            Some(primary) => contains_segment_group_helper(primary, containee, next),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(url: &str) -> UrlTree {
        DefaultUrlSerializer.parse(url).unwrap()
    }

    #[test]
    fn test_children_primary_first() {
        let tree = parse("/a(zeta:z//aux:b)");
        let outlets: Vec<&str> = tree
            .root
            .children_primary_first()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(outlets, vec!["primary", "aux", "zeta"]);
    }

    #[test]
    fn test_outlet_splitter() {
        let tree = parse("/a(aux:b)");
        assert!(tree.root.is_outlet_splitter());
        assert!(!tree.root.child(PRIMARY_OUTLET).unwrap().is_outlet_splitter());
    }

    #[test]
    fn test_contains_tree_exact() {
        let t = parse("/one/two?a=1");
        assert!(contains_tree(&t, &parse("/one/two?a=1"), true));
        assert!(!contains_tree(&t, &parse("/one/two?a=2"), true));
        assert!(!contains_tree(&t, &parse("/one"), true));
        assert!(!contains_tree(&t, &parse("/one/two(aux:x)?a=1"), true));
    }

    #[test]
    fn test_contains_tree_prefix() {
        let t = parse("/one/(two//left:three)?a=1&b=2");
        assert!(contains_tree(&t, &parse("/one"), false));
        assert!(contains_tree(&t, &parse("/one/two"), false));
        assert!(contains_tree(&t, &parse("/one/(two//left:three)?b=2"), false));
        assert!(!contains_tree(&t, &parse("/one/four"), false));
        assert!(!contains_tree(&t, &parse("/one?a=5"), false));
    }

    #[test]
    fn test_contains_tree_ignores_matrix_params() {
        let t = parse("/one;x=1/two");
        assert!(contains_tree(&t, &parse("/one/two"), true));
    }

    #[test]
    fn test_from_primary_segments() {
        let tree = UrlTree::from_primary_segments(
            vec![UrlSegment::from_path("not-found")],
            Params::new(),
            None,
        );
        assert_eq!(tree, parse("/not-found"));
        assert_eq!(
            UrlTree::from_primary_segments(Vec::new(), Params::new(), None),
            parse("/")
        );
    }
}
