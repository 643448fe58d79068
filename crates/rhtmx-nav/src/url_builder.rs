//! Building URL trees from navigation commands
//!
//! Commands describe a change relative to some matched route:
//!
//! ```text
//! ["/team", "33"]            absolute
//! ["../other"]               one route level up, then "other"
//! ["user", {name: "x"}]      segment plus matrix params
//! [{outlets: {aux: "chat"}}] per-outlet sub-commands, None deletes
//! ```
//!
//! The result shares nothing mutable with the input: the group the
//! reference route was matched in is replaced by a new one and every
//! ancestor group is rebuilt around it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::UrlTreeError;
use crate::state::{RouteSnapshot, RouterStateSnapshot};
use crate::url::{Params, UrlSegment, UrlSegmentGroup, UrlTree, PRIMARY_OUTLET};

/// One navigation command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Path text; the first command may hold `/`, `..`, `.` and several parts
    Path(String),
    /// Matrix params for the preceding path (or, first, for the current segment)
    Params(Params),
    /// Sub-commands per outlet; `None` removes that outlet
    Outlets(BTreeMap<String, Option<Vec<Command>>>),
}

impl Command {
    pub fn path(path: impl Into<String>) -> Self {
        Command::Path(path.into())
    }

    pub fn params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Command::Params(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Outlet command from `(outlet, path)` pairs; a `None` path clears the outlet
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_nav::url_builder::Command;
    ///
    /// let cmd = Command::outlets([("aux", Some("chat/1")), ("popup", None)]);
    /// if let Command::Outlets(outlets) = cmd {
    ///     assert_eq!(outlets["aux"].as_ref().unwrap().len(), 2);
    ///     assert!(outlets["popup"].is_none());
    /// }
    /// ```
    pub fn outlets<I, K>(outlets: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<&'static str>)>,
        K: Into<String>,
    {
        Command::Outlets(
            outlets
                .into_iter()
                .map(|(name, path)| (name.into(), path.map(split_path)))
                .collect(),
        )
    }
}

impl From<&str> for Command {
    fn from(path: &str) -> Self {
        Command::Path(path.to_string())
    }
}

impl From<String> for Command {
    fn from(path: String) -> Self {
        Command::Path(path)
    }
}

fn split_path(path: &str) -> Vec<Command> {
    path.split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .map(Command::from)
        .collect()
}

// ============================================================================
// Entry point
// ============================================================================

/// Applies `commands` to `url_tree`, relative to `relative_to`
///
/// `relative_to` must be a node of `state` (the snapshot `url_tree` was
/// recognized into); `None` means the root. Each leading `..` climbs one
/// matched route.
///
/// # Examples
///
/// ```
/// use rhtmx_nav::config::ParamsInheritance;
/// use rhtmx_nav::recognize::recognize;
/// use rhtmx_nav::route::{into_shared, Route};
/// use rhtmx_nav::url::{DefaultUrlSerializer, Params, UrlSerializer};
/// use rhtmx_nav::url_builder::{create_url_tree, Command};
///
/// let routes = into_shared([Route::component("team/:id", "TeamCmp")]);
/// let tree = DefaultUrlSerializer.parse("/team/11").unwrap();
/// let state = recognize(None, &routes, &tree, "/team/11", ParamsInheritance::default()).unwrap();
/// let team = state.primary_chain()[1].clone();
///
/// let next = create_url_tree(&state, Some(&team), &tree, &["../other".into()], Params::new(), None).unwrap();
/// assert_eq!(next.to_string(), "/other");
/// ```
pub fn create_url_tree(
    state: &RouterStateSnapshot,
    relative_to: Option<&Arc<RouteSnapshot>>,
    url_tree: &UrlTree,
    commands: &[Command],
    query_params: Params,
    fragment: Option<String>,
) -> Result<UrlTree, UrlTreeError> {
    if commands.is_empty() {
        return Ok(url_tree.with_query(query_params, fragment));
    }

    let normalized = normalize_commands(commands);
    validate_commands(&normalized)?;

    if normalized.navigates_to_root() {
        return Ok(UrlTree::new(UrlSegmentGroup::empty(), query_params, fragment));
    }

    let position = find_starting_position(&normalized, url_tree, state, relative_to)?;
    debug!(
        index = position.index,
        process_children = position.process_children,
        "Applying navigation commands"
    );

    let group = if position.process_children {
        update_segment_group_children(&position.group, position.index, &normalized.commands)
    } else {
        update_segment_group(Some(&position.group), position.index, &normalized.commands)
    };

    Ok(replace_in_tree(url_tree, &position.group, group, query_params, fragment))
}

fn replace_in_tree(
    url_tree: &UrlTree,
    old: &Arc<UrlSegmentGroup>,
    new: UrlSegmentGroup,
    query_params: Params,
    fragment: Option<String>,
) -> UrlTree {
    if Arc::ptr_eq(&url_tree.root, old) {
        UrlTree::new(new, query_params, fragment)
    } else {
        let root = replace_segment(&url_tree.root, old, &Arc::new(new));
        UrlTree::new(root, query_params, fragment)
    }
}

/// Rebuilds `current` with `old` swapped for `new`, found by identity
fn replace_segment(
    current: &UrlSegmentGroup,
    old: &Arc<UrlSegmentGroup>,
    new: &Arc<UrlSegmentGroup>,
) -> UrlSegmentGroup {
    let children = current
        .children
        .iter()
        .map(|(outlet, child)| {
            let replaced = if Arc::ptr_eq(child, old) {
                Arc::clone(new)
            } else {
                Arc::new(replace_segment(child, old, new))
            };
            (outlet.clone(), replaced)
        })
        .collect();
    UrlSegmentGroup::new(current.segments.clone(), children)
}

// ============================================================================
// Normalization
// ============================================================================

#[derive(Debug)]
struct Normalized {
    is_absolute: bool,
    double_dots: usize,
    commands: Vec<Command>,
}

impl Normalized {
    fn navigates_to_root(&self) -> bool {
        self.is_absolute
            && self.commands.len() == 1
            && matches!(&self.commands[0], Command::Path(p) if p == "/")
    }
}

fn normalize_commands(commands: &[Command]) -> Normalized {
    if let [Command::Path(p)] = commands {
        if p == "/" {
            return Normalized {
                is_absolute: true,
                double_dots: 0,
                commands: commands.to_vec(),
            };
        }
    }

    let mut is_absolute = false;
    let mut double_dots = 0;
    let mut out = Vec::new();

    for (i, command) in commands.iter().enumerate() {
        match command {
            Command::Outlets(outlets) => {
                let outlets = outlets
                    .iter()
                    .map(|(name, cmds)| {
                        (
                            name.clone(),
                            cmds.as_ref().map(|c| c.iter().flat_map(expand_outlet_command).collect()),
                        )
                    })
                    .collect();
                out.push(Command::Outlets(outlets));
            }
            Command::Params(_) => out.push(command.clone()),
            Command::Path(path) if i == 0 => {
                for (j, part) in path.split('/').enumerate() {
                    if j == 0 && part == "." {
                        // "./a" is the same as "a"
                    } else if j == 0 && part.is_empty() {
                        is_absolute = true;
                    } else if part == ".." {
                        double_dots += 1;
                    } else if !part.is_empty() {
                        out.push(Command::Path(part.to_string()));
                    }
                }
            }
            Command::Path(_) => out.push(command.clone()),
        }
    }

    Normalized {
        is_absolute,
        double_dots,
        commands: out,
    }
}

fn expand_outlet_command(command: &Command) -> Vec<Command> {
    match command {
        Command::Path(path) => split_path(path),
        other => vec![other.clone()],
    }
}

fn validate_commands(normalized: &Normalized) -> Result<(), UrlTreeError> {
    if normalized.is_absolute && matches!(normalized.commands.first(), Some(Command::Params(_))) {
        return Err(UrlTreeError::RootMatrixParams);
    }

    let outlets_at = normalized
        .commands
        .iter()
        .position(|c| matches!(c, Command::Outlets(_)));
    if let Some(index) = outlets_at {
        if index != normalized.commands.len() - 1 {
            return Err(UrlTreeError::OutletsNotLast);
        }
    }
    Ok(())
}

// ============================================================================
// Starting position
// ============================================================================

#[derive(Debug)]
struct Position {
    group: Arc<UrlSegmentGroup>,
    process_children: bool,
    index: usize,
}

fn find_starting_position(
    normalized: &Normalized,
    url_tree: &UrlTree,
    state: &RouterStateSnapshot,
    relative_to: Option<&Arc<RouteSnapshot>>,
) -> Result<Position, UrlTreeError> {
    if normalized.is_absolute {
        return Ok(Position {
            group: Arc::clone(&url_tree.root),
            process_children: true,
            index: 0,
        });
    }

    let reference = relative_to.unwrap_or_else(|| state.root());
    let ancestry = state.tree.path_from_root(reference);
    if ancestry.is_empty() {
        return Err(UrlTreeError::DetachedReference);
    }

    let available = ancestry.len() - 1;
    if normalized.double_dots > available {
        return Err(UrlTreeError::InvalidDoubleDots {
            requested: normalized.double_dots,
            available,
        });
    }
    let target = ancestry[available - normalized.double_dots];

    Ok(match target.last_matched_index() {
        None => Position {
            group: Arc::clone(target.url_segment_group()),
            process_children: true,
            index: 0,
        },
        Some(last) => {
            let modifier = match normalized.commands.first() {
                Some(Command::Params(_)) => 0,
                _ => 1,
            };
            Position {
                group: Arc::clone(target.url_segment_group()),
                process_children: false,
                index: last + modifier,
            }
        }
    })
}

// ============================================================================
// Group updates
// ============================================================================

fn update_segment_group(
    group: Option<&Arc<UrlSegmentGroup>>,
    start: usize,
    commands: &[Command],
) -> UrlSegmentGroup {
    let group = group
        .cloned()
        .unwrap_or_else(|| Arc::new(UrlSegmentGroup::empty()));

    if group.is_outlet_splitter() {
        return update_segment_group_children(&group, start, commands);
    }

    let prefix = prefixed_with(&group, start, commands);
    let Some(prefix) = prefix else {
        return create_new_segment_group(&group, start, commands);
    };
    let sliced = &commands[prefix.command_index..];

    if prefix.path_index < group.segments.len() {
        let rest = UrlSegmentGroup::new(
            group.segments[prefix.path_index..].to_vec(),
            group.children.clone(),
        );
        let head = UrlSegmentGroup::new(
            group.segments[..prefix.path_index].to_vec(),
            BTreeMap::from([(PRIMARY_OUTLET.to_string(), Arc::new(rest))]),
        );
        update_segment_group_children(&head, 0, sliced)
    } else if sliced.is_empty() {
        UrlSegmentGroup::leaf(group.segments.clone())
    } else if !group.has_children() {
        create_new_segment_group(&group, start, commands)
    } else {
        update_segment_group_children(&group, 0, sliced)
    }
}

fn update_segment_group_children(
    group: &UrlSegmentGroup,
    start: usize,
    commands: &[Command],
) -> UrlSegmentGroup {
    if commands.is_empty() {
        return UrlSegmentGroup::leaf(group.segments.clone());
    }

    let outlets = outlets_of(commands);
    let mut children = BTreeMap::new();
    for (outlet, cmds) in &outlets {
        if let Some(cmds) = cmds {
            children.insert(
                outlet.clone(),
                Arc::new(update_segment_group(group.child(outlet), start, cmds)),
            );
        }
    }
    for (outlet, child) in &group.children {
        if !outlets.contains_key(outlet) {
            children.insert(outlet.clone(), Arc::clone(child));
        }
    }
    UrlSegmentGroup::new(group.segments.clone(), children)
}

fn outlets_of(commands: &[Command]) -> BTreeMap<String, Option<Vec<Command>>> {
    match commands.first() {
        Some(Command::Outlets(outlets)) => outlets.clone(),
        _ => BTreeMap::from([(PRIMARY_OUTLET.to_string(), Some(commands.to_vec()))]),
    }
}

#[derive(Debug)]
struct Prefix {
    path_index: usize,
    command_index: usize,
}

/// How far `commands` agree with the segments of `group` from `start` on
fn prefixed_with(group: &UrlSegmentGroup, start: usize, commands: &[Command]) -> Option<Prefix> {
    let mut command_index = 0;
    let mut path_index = start;

    while path_index < group.segments.len() {
        let command = commands.get(command_index)?;
        let segment = &group.segments[path_index];

        let path = match command {
            Command::Path(path) => path,
            Command::Outlets(_) if path_index > 0 => break,
            _ => return None,
        };

        match commands.get(command_index + 1) {
            Some(Command::Params(params)) => {
                if !same_segment(path, params, segment) {
                    return None;
                }
                command_index += 2;
            }
            _ => {
                if !same_segment(path, &Params::new(), segment) {
                    return None;
                }
                command_index += 1;
            }
        }
        path_index += 1;
    }

    Some(Prefix {
        path_index,
        command_index,
    })
}

fn same_segment(path: &str, params: &Params, segment: &UrlSegment) -> bool {
    path == segment.path && params == &segment.parameters
}

fn create_new_segment_group(
    group: &UrlSegmentGroup,
    start: usize,
    commands: &[Command],
) -> UrlSegmentGroup {
    let keep = start.min(group.segments.len());
    let mut paths = group.segments[..keep].to_vec();

    let mut i = 0;
    while i < commands.len() {
        match &commands[i] {
            Command::Outlets(outlets) => {
                return UrlSegmentGroup::new(paths, create_new_children(outlets));
            }
            Command::Params(params) => {
                // Leading params re-apply to the segment at the start position
                if i == 0 {
                    if let Some(segment) = group.segments.get(start) {
                        paths.push(UrlSegment::new(segment.path.clone(), params.clone()));
                    }
                }
                i += 1;
            }
            Command::Path(path) => match commands.get(i + 1) {
                Some(Command::Params(params)) => {
                    paths.push(UrlSegment::new(path.clone(), params.clone()));
                    i += 2;
                }
                _ => {
                    paths.push(UrlSegment::from_path(path.clone()));
                    i += 1;
                }
            },
        }
    }
    UrlSegmentGroup::leaf(paths)
}

fn create_new_children(
    outlets: &BTreeMap<String, Option<Vec<Command>>>,
) -> BTreeMap<String, Arc<UrlSegmentGroup>> {
    outlets
        .iter()
        .filter_map(|(outlet, cmds)| {
            cmds.as_ref().map(|cmds| {
                (
                    outlet.clone(),
                    Arc::new(create_new_segment_group(&UrlSegmentGroup::empty(), 0, cmds)),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamsInheritance;
    use crate::recognize::recognize;
    use crate::route::{into_shared, Route};
    use crate::url::{DefaultUrlSerializer, UrlSerializer};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_leading_path() {
        let n = normalize_commands(&["../../a/b".into(), "c".into()]);
        assert!(!n.is_absolute);
        assert_eq!(n.double_dots, 2);
        assert_eq!(
            n.commands,
            vec![Command::path("a"), Command::path("b"), Command::path("c")]
        );
    }

    #[test]
    fn test_normalize_absolute_and_dot() {
        let n = normalize_commands(&["/a".into()]);
        assert!(n.is_absolute);
        let n = normalize_commands(&["./a".into()]);
        assert!(!n.is_absolute);
        assert_eq!(n.commands, vec![Command::path("a")]);
    }

    #[test]
    fn test_validate_outlets_last() {
        let n = normalize_commands(&[
            Command::outlets([("aux", Some("x"))]),
            Command::path("a"),
        ]);
        assert_eq!(validate_commands(&n), Err(UrlTreeError::OutletsNotLast));
    }

    #[test]
    fn test_validate_root_matrix_params() {
        let n = Normalized {
            is_absolute: true,
            double_dots: 0,
            commands: vec![Command::params([("a", "1")])],
        };
        assert_eq!(validate_commands(&n), Err(UrlTreeError::RootMatrixParams));
    }

    #[test]
    fn test_replace_segment_is_structural() {
        let tree = DefaultUrlSerializer.parse("/a/(b//aux:c)").unwrap();
        let primary = Arc::clone(tree.root.child(PRIMARY_OUTLET).unwrap());
        let aux = Arc::clone(primary.child("aux").unwrap());
        let replaced = replace_segment(
            &tree.root,
            &aux,
            &Arc::new(UrlSegmentGroup::leaf(vec![UrlSegment::from_path("d")])),
        );
        let out = UrlTree::new(replaced, Params::new(), None);
        assert_eq!(out.to_string(), "/a/(b//aux:d)");
        // The input is untouched
        assert_eq!(tree.to_string(), "/a/(b//aux:c)");
    }

    #[test]
    fn test_detached_reference() {
        let routes = into_shared([Route::component("a", "A")]);
        let tree = DefaultUrlSerializer.parse("/a").unwrap();
        let state = recognize(None, &routes, &tree, "/a", ParamsInheritance::default()).unwrap();
        let other = recognize(None, &routes, &tree, "/a", ParamsInheritance::default()).unwrap();
        let foreign = other.primary_chain()[1].clone();

        let result = create_url_tree(&state, Some(&foreign), &tree, &["b".into()], Params::new(), None);
        assert_eq!(result, Err(UrlTreeError::DetachedReference));
    }
}
