//! Route table configuration
//!
//! A route table is an ordered list of [`Route`]s, first match wins,
//! recursively nested through children. What a route *does* once matched
//! is a tagged [`RouteKind`], so a redirect can never also carry a
//! component or children:
//!
//! ```text
//! Component      renders something, may have children
//! Componentless  groups children, passes params down
//! Redirect       rewrites the URL, never activated
//! Lazy           children fetched on demand by a RouteLoader
//! ```
//!
//! Routes are shared as `Arc<Route>`; pointer identity of that `Arc` is
//! what "the same route" means when deciding whether to reuse an
//! activated node.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::ConfigError;
use crate::url::PRIMARY_OUTLET;

pub mod guards;
mod validate;

pub use guards::{
    guard_fn, CanActivate, CanActivateChild, CanDeactivate, CanLoad, FnGuard, GuardResult,
    LoadedRoutes, Resolve, RouteLoader,
};
pub use validate::validate_routes;

/// Static or resolved route data
pub type Data = BTreeMap<String, serde_json::Value>;

/// Path sentinel matching everything
pub const WILDCARD: &str = "**";

// ============================================================================
// Route payload types
// ============================================================================

/// Opaque handle to whatever the rendering layer shows for a route
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentRef(Arc<str>);

impl ComponentRef {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// How much of the URL a route path must account for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMatch {
    /// The route path must be a prefix of the remaining URL
    #[default]
    Prefix,
    /// The route path must consume everything left at its level
    Full,
}

/// Parsed route path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePath {
    /// `**`
    Wildcard,
    /// `team/:id`, `''`, ...
    Pattern(String),
}

impl RoutePath {
    fn parse(path: &str) -> Self {
        if path == WILDCARD {
            RoutePath::Wildcard
        } else {
            RoutePath::Pattern(path.to_string())
        }
    }
}

/// What a matched route does
pub enum RouteKind {
    Component {
        component: ComponentRef,
        children: Vec<Arc<Route>>,
    },
    Componentless {
        children: Vec<Arc<Route>>,
    },
    Redirect {
        target: String,
    },
    Lazy {
        key: String,
        loaded: OnceLock<Arc<LoadedRoutes>>,
    },
}

impl RouteKind {
    fn label(&self) -> &'static str {
        match self {
            RouteKind::Component { .. } => "component",
            RouteKind::Componentless { .. } => "componentless",
            RouteKind::Redirect { .. } => "redirect",
            RouteKind::Lazy { .. } => "lazy",
        }
    }
}

/// Guards attached to a route
#[derive(Default, Clone)]
pub struct RouteGuards {
    pub can_activate: Vec<Arc<dyn CanActivate>>,
    pub can_activate_child: Vec<Arc<dyn CanActivateChild>>,
    pub can_deactivate: Vec<Arc<dyn CanDeactivate>>,
    pub can_load: Vec<Arc<dyn CanLoad>>,
}

// ============================================================================
// Route
// ============================================================================

/// One entry of the route table
///
/// # Examples
///
/// ```
/// use rhtmx_nav::route::{PathMatch, Route};
///
/// let routes = vec![
///     Route::redirect("", "main").with_path_match(PathMatch::Full),
///     Route::component("main", "MainCmp"),
///     Route::component("team/:id", "TeamCmp")
///         .with_children([Route::component("user/:name", "UserCmp")]),
///     Route::component("chat", "ChatCmp").with_outlet("aux"),
/// ];
/// assert_eq!(routes[2].children().len(), 1);
/// ```
pub struct Route {
    raw_path: String,
    path: RoutePath,
    pub path_match: PathMatch,
    pub outlet: String,
    pub kind: RouteKind,
    pub data: Data,
    pub guards: RouteGuards,
    pub resolvers: Vec<(String, Arc<dyn Resolve>)>,
    misconfigured: Option<ConfigError>,
}

impl Route {
    fn with_kind(path: impl Into<String>, kind: RouteKind) -> Self {
        let raw_path = path.into();
        Self {
            path: RoutePath::parse(&raw_path),
            raw_path,
            path_match: PathMatch::default(),
            outlet: PRIMARY_OUTLET.to_string(),
            kind,
            data: Data::new(),
            guards: RouteGuards::default(),
            resolvers: Vec::new(),
            misconfigured: None,
        }
    }

    /// Route rendering `component`
    pub fn component(path: impl Into<String>, component: impl Into<ComponentRef>) -> Self {
        Self::with_kind(
            path,
            RouteKind::Component {
                component: component.into(),
                children: Vec::new(),
            },
        )
    }

    /// Route that only groups children
    pub fn componentless(path: impl Into<String>) -> Self {
        Self::with_kind(
            path,
            RouteKind::Componentless {
                children: Vec::new(),
            },
        )
    }

    /// Route rewriting the matched URL to `target`
    ///
    /// A target starting with `/` is absolute and restarts matching from the
    /// root; otherwise the matched segments are replaced in place.
    pub fn redirect(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self::with_kind(
            path,
            RouteKind::Redirect {
                target: target.into(),
            },
        )
    }

    /// Route whose children come from a [`RouteLoader`] under `key`
    pub fn lazy(path: impl Into<String>, key: impl Into<String>) -> Self {
        Self::with_kind(
            path,
            RouteKind::Lazy {
                key: key.into(),
                loaded: OnceLock::new(),
            },
        )
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Sets child routes
    ///
    /// Only component and componentless routes take children; on any other
    /// kind the misuse is reported by [`validate_routes`].
    pub fn with_children<I>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = Route>,
    {
        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        match &mut self.kind {
            RouteKind::Component { children, .. } | RouteKind::Componentless { children } => {
                *children = routes;
            }
            other => {
                self.misconfigured = Some(ConfigError::ChildrenNotAllowed {
                    path: self.raw_path.clone(),
                    kind: other.label(),
                });
            }
        }
        self
    }

    pub fn with_outlet(mut self, outlet: impl Into<String>) -> Self {
        self.outlet = outlet.into();
        self
    }

    pub fn with_path_match(mut self, path_match: PathMatch) -> Self {
        self.path_match = path_match;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_resolver(mut self, key: impl Into<String>, resolver: impl Resolve + 'static) -> Self {
        self.resolvers.push((key.into(), Arc::new(resolver)));
        self
    }

    pub fn with_can_activate(mut self, guard: impl CanActivate + 'static) -> Self {
        self.guards.can_activate.push(Arc::new(guard));
        self
    }

    pub fn with_can_activate_child(mut self, guard: impl CanActivateChild + 'static) -> Self {
        self.guards.can_activate_child.push(Arc::new(guard));
        self
    }

    pub fn with_can_deactivate(mut self, guard: impl CanDeactivate + 'static) -> Self {
        self.guards.can_deactivate.push(Arc::new(guard));
        self
    }

    pub fn with_can_load(mut self, guard: impl CanLoad + 'static) -> Self {
        self.guards.can_load.push(Arc::new(guard));
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Path as written in the table
    pub fn path(&self) -> &str {
        &self.raw_path
    }

    pub fn route_path(&self) -> &RoutePath {
        &self.path
    }

    pub fn is_wildcard(&self) -> bool {
        self.path == RoutePath::Wildcard
    }

    pub fn is_empty_path(&self) -> bool {
        matches!(&self.path, RoutePath::Pattern(p) if p.is_empty())
    }

    pub fn outlet(&self) -> &str {
        &self.outlet
    }

    pub fn component_ref(&self) -> Option<&ComponentRef> {
        match &self.kind {
            RouteKind::Component { component, .. } => Some(component),
            _ => None,
        }
    }

    pub fn redirect_to(&self) -> Option<&str> {
        match &self.kind {
            RouteKind::Redirect { target } => Some(target),
            _ => None,
        }
    }

    pub fn lazy_key(&self) -> Option<&str> {
        match &self.kind {
            RouteKind::Lazy { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Children currently known for this route
    ///
    /// Empty for redirects and for lazy routes that are not loaded yet.
    pub fn children(&self) -> &[Arc<Route>] {
        match &self.kind {
            RouteKind::Component { children, .. } | RouteKind::Componentless { children } => {
                children
            }
            RouteKind::Lazy { loaded, .. } => loaded.get().map(|l| &l.routes[..]).unwrap_or(&[]),
            RouteKind::Redirect { .. } => &[],
        }
    }

    /// Loaded configuration of a lazy route
    pub fn loaded(&self) -> Option<&Arc<LoadedRoutes>> {
        match &self.kind {
            RouteKind::Lazy { loaded, .. } => loaded.get(),
            _ => None,
        }
    }

    /// True when this is a lazy route whose children have not arrived yet
    pub fn needs_load(&self) -> bool {
        matches!(&self.kind, RouteKind::Lazy { loaded, .. } if loaded.get().is_none())
    }

    /// Installs loaded children; the first load wins
    pub(crate) fn set_loaded(&self, routes: Arc<LoadedRoutes>) {
        if let RouteKind::Lazy { loaded, .. } = &self.kind {
            let _ = loaded.set(routes);
        }
    }

    pub(crate) fn misconfiguration(&self) -> Option<&ConfigError> {
        self.misconfigured.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Route");
        s.field("path", &self.raw_path)
            .field("kind", &self.kind.label())
            .field("outlet", &self.outlet)
            .field("path_match", &self.path_match);
        match &self.kind {
            RouteKind::Component { component, .. } => {
                s.field("component", component);
            }
            RouteKind::Redirect { target } => {
                s.field("redirect_to", target);
            }
            RouteKind::Lazy { key, .. } => {
                s.field("key", key);
            }
            RouteKind::Componentless { .. } => {}
        }
        s.field("children", &self.children()).finish()
    }
}

/// Wraps a list of routes into the shared form the router works on
pub fn into_shared<I>(routes: I) -> Vec<Arc<Route>>
where
    I: IntoIterator<Item = Route>,
{
    routes.into_iter().map(Arc::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let route = Route::component("team/:id", "TeamCmp");
        assert_eq!(route.component_ref().map(|c| c.name()), Some("TeamCmp"));
        assert!(route.redirect_to().is_none());

        let route = Route::redirect("", "main").with_path_match(PathMatch::Full);
        assert_eq!(route.redirect_to(), Some("main"));
        assert!(route.is_empty_path());
        assert_eq!(route.path_match, PathMatch::Full);
    }

    #[test]
    fn test_wildcard_path() {
        assert!(Route::redirect("**", "/not-found").is_wildcard());
        assert!(!Route::component("a", "A").is_wildcard());
    }

    #[test]
    fn test_children_on_redirect_is_recorded() {
        let route = Route::redirect("a", "b").with_children([Route::component("c", "C")]);
        assert!(route.children().is_empty());
        assert!(matches!(
            route.misconfiguration(),
            Some(ConfigError::ChildrenNotAllowed { kind: "redirect", .. })
        ));
    }

    #[test]
    fn test_lazy_children_after_load() {
        let route = Route::lazy("admin", "admin");
        assert!(route.needs_load());
        assert!(route.children().is_empty());

        route.set_loaded(Arc::new(LoadedRoutes::new(vec![Route::component("", "AdminCmp")])));
        assert!(!route.needs_load());
        assert_eq!(route.children().len(), 1);
    }

    #[test]
    fn test_builder_data_and_outlet() {
        let route = Route::component("chat", "ChatCmp")
            .with_outlet("aux")
            .with_data("title", "Chat");
        assert_eq!(route.outlet(), "aux");
        assert_eq!(route.data.get("title"), Some(&serde_json::json!("Chat")));
    }
}
