//! Error types
//!
//! Each stage owns its error enum; [`NavigationError`] is the taxonomy a
//! failed navigation surfaces to callers.

use thiserror::Error;

/// Malformed raw URL string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlParseError {
    #[error("expected \"{expected}\" at '{remaining}'")]
    Expected { expected: String, remaining: String },

    #[error("empty path url segment cannot have parameters: '{remaining}'")]
    EmptySegmentParams { remaining: String },

    #[error("cannot parse url '{url}'")]
    UnexpectedToken { url: String },

    #[error("invalid percent-encoding in '{input}'")]
    Decode { input: String },
}

/// Invalid route table, detected when the table is installed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration of route '{path}': path cannot start with a slash")]
    LeadingSlash { path: String },

    #[error(
        "invalid configuration of route '{path}': please provide 'path_match'. \
         The default is 'prefix', but an empty-path redirect usually wants 'full'"
    )]
    EmptyRedirectNeedsFullMatch { path: String },

    #[error("invalid configuration of route '**': wildcard routes cannot have children")]
    WildcardWithChildren,

    #[error("invalid configuration of route '{path}': outlet name cannot be empty")]
    EmptyOutletName { path: String },

    #[error("invalid configuration of route '{path}': lazy route key cannot be empty")]
    EmptyLazyKey { path: String },

    #[error("invalid configuration of route '{path}': resolver key '{key}' is declared twice")]
    DuplicateResolverKey { path: String, key: String },

    #[error("invalid configuration of route '{path}': a {kind} route cannot have children")]
    ChildrenNotAllowed { path: String, kind: &'static str },
}

/// Failure while expanding `redirect_to` rules
#[derive(Debug, Clone, Error)]
pub enum RedirectError {
    #[error("cannot match any routes. URL segment: '{segment_group}'")]
    NoMatch { segment_group: String },

    #[error("cannot redirect to '{redirect_to}': cannot find ':{param}'")]
    MissingRedirectParam { redirect_to: String, param: String },

    #[error("absolute redirects did not settle after {hops} hops")]
    RedirectLoop { hops: usize },

    /// A lazy route on the matching path has not been loaded yet
    #[error("route '{}' needs its children loaded", .0.path())]
    LoadRequired(std::sync::Arc<crate::route::Route>),
}

/// Failure while matching a redirect-free tree against the route table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognizeError {
    #[error("cannot match any routes. URL segment: '{segment_group}'")]
    NoMatch { segment_group: String },

    #[error("two segments cannot have the same outlet name '{outlet}': '{first}' and '{second}'")]
    DuplicateOutlet {
        outlet: String,
        first: String,
        second: String,
    },
}

/// Invalid command list passed to the URL-tree builder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlTreeError {
    #[error("root segment cannot have matrix parameters")]
    RootMatrixParams,

    #[error("an outlets command has to be the last command")]
    OutletsNotLast,

    #[error("invalid number of '../': requested {requested}, only {available} available")]
    InvalidDoubleDots { requested: usize, available: usize },

    #[error("reference route is not part of the current router state")]
    DetachedReference,
}

/// Why a navigation ended without an error and without activating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// A newer navigation started before this one finished
    Superseded { current: u64 },
    /// A guard returned `Deny`
    GuardRejected { guard: &'static str, route: String },
    /// A guard asked for another URL; the router restarts there
    GuardRedirect { target: String },
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::Superseded { current } => {
                write!(f, "superseded by navigation {}", current)
            }
            CancelReason::GuardRejected { guard, route } => {
                write!(f, "{} guard rejected '{}'", guard, route)
            }
            CancelReason::GuardRedirect { target } => write!(f, "guard redirected to '{}'", target),
        }
    }
}

/// Failed navigation
///
/// The committed router state is never touched when one of these is
/// returned.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error(transparent)]
    UrlParse(#[from] UrlParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Redirect(#[from] RedirectError),

    #[error(transparent)]
    Recognize(#[from] RecognizeError),

    #[error(transparent)]
    InvalidCommands(#[from] UrlTreeError),

    #[error("resolver '{key}' failed for route '{route}': {source}")]
    Resolver {
        key: String,
        route: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("loading children of '{key}' failed: {source}")]
    LazyLoad {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("lazy route loading did not settle after {passes} passes")]
    LazyLoadLimit { passes: usize },

    #[error("guard redirects did not settle after {redirects} restarts")]
    GuardRedirectLimit { redirects: usize },

    #[error("illegal navigation transition from {from:?} to {to:?}")]
    IllegalTransition {
        from: crate::navigation::NavigationPhase,
        to: crate::navigation::NavigationPhase,
    },
}

impl NavigationError {
    /// True for the "no route matches" failures of either matching stage
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            NavigationError::Redirect(RedirectError::NoMatch { .. })
                | NavigationError::Recognize(RecognizeError::NoMatch { .. })
        )
    }
}
