use std::fmt;
use std::sync::Arc;

use crate::error::CancelReason;
use crate::state::{RouteSnapshot, RouterStateSnapshot};

/// What started a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTrigger {
    /// `navigate` / `navigate_by_url`
    Imperative,
    /// The platform moved through its history
    PopState,
    /// First navigation from the platform URL
    Initial,
}

/// Lifecycle notifications, in pipeline order
///
/// Every event carries the navigation id so observers can tell concurrent
/// attempts apart.
#[derive(Debug, Clone)]
pub enum Event {
    NavigationStart {
        id: u64,
        url: String,
        trigger: NavigationTrigger,
    },
    RouteConfigLoadStart {
        id: u64,
        path: String,
    },
    RouteConfigLoadEnd {
        id: u64,
        path: String,
    },
    Redirected {
        id: u64,
        url: String,
        url_after_redirects: String,
    },
    RoutesRecognized {
        id: u64,
        url: String,
        url_after_redirects: String,
        state: RouterStateSnapshot,
    },
    GuardsChecked {
        id: u64,
        url: String,
        should_activate: bool,
    },
    ResolveStart {
        id: u64,
        url: String,
    },
    ResolveEnd {
        id: u64,
        url: String,
    },
    ActivationStart {
        id: u64,
        route: Arc<RouteSnapshot>,
    },
    ActivationEnd {
        id: u64,
        route: Arc<RouteSnapshot>,
    },
    NavigationEnd {
        id: u64,
        url: String,
        url_after_redirects: String,
    },
    NavigationCancel {
        id: u64,
        url: String,
        reason: CancelReason,
    },
    NavigationError {
        id: u64,
        url: String,
        error: String,
    },
}

impl Event {
    pub fn id(&self) -> u64 {
        match self {
            Event::NavigationStart { id, .. }
            | Event::RouteConfigLoadStart { id, .. }
            | Event::RouteConfigLoadEnd { id, .. }
            | Event::Redirected { id, .. }
            | Event::RoutesRecognized { id, .. }
            | Event::GuardsChecked { id, .. }
            | Event::ResolveStart { id, .. }
            | Event::ResolveEnd { id, .. }
            | Event::ActivationStart { id, .. }
            | Event::ActivationEnd { id, .. }
            | Event::NavigationEnd { id, .. }
            | Event::NavigationCancel { id, .. }
            | Event::NavigationError { id, .. } => *id,
        }
    }

    /// Short event name, stable across versions
    pub fn kind(&self) -> &'static str {
        match self {
            Event::NavigationStart { .. } => "NavigationStart",
            Event::RouteConfigLoadStart { .. } => "RouteConfigLoadStart",
            Event::RouteConfigLoadEnd { .. } => "RouteConfigLoadEnd",
            Event::Redirected { .. } => "Redirected",
            Event::RoutesRecognized { .. } => "RoutesRecognized",
            Event::GuardsChecked { .. } => "GuardsChecked",
            Event::ResolveStart { .. } => "ResolveStart",
            Event::ResolveEnd { .. } => "ResolveEnd",
            Event::ActivationStart { .. } => "ActivationStart",
            Event::ActivationEnd { .. } => "ActivationEnd",
            Event::NavigationEnd { .. } => "NavigationEnd",
            Event::NavigationCancel { .. } => "NavigationCancel",
            Event::NavigationError { .. } => "NavigationError",
        }
    }

    /// True for the events that end a navigation
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::NavigationEnd { .. } | Event::NavigationCancel { .. } | Event::NavigationError { .. }
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::NavigationStart { id, url, .. } => write!(f, "NavigationStart(id: {}, url: '{}')", id, url),
            Event::RouteConfigLoadStart { path, .. } => write!(f, "RouteConfigLoadStart(path: {})", path),
            Event::RouteConfigLoadEnd { path, .. } => write!(f, "RouteConfigLoadEnd(path: {})", path),
            Event::Redirected {
                id,
                url,
                url_after_redirects,
            } => write!(
                f,
                "Redirected(id: {}, url: '{}', urlAfterRedirects: '{}')",
                id, url, url_after_redirects
            ),
            Event::RoutesRecognized {
                id,
                url,
                url_after_redirects,
                state,
            } => write!(
                f,
                "RoutesRecognized(id: {}, url: '{}', urlAfterRedirects: '{}', state: {})",
                id, url, url_after_redirects, state
            ),
            Event::GuardsChecked {
                id,
                url,
                should_activate,
            } => write!(
                f,
                "GuardsChecked(id: {}, url: '{}', shouldActivate: {})",
                id, url, should_activate
            ),
            Event::ResolveStart { id, url } => write!(f, "ResolveStart(id: {}, url: '{}')", id, url),
            Event::ResolveEnd { id, url } => write!(f, "ResolveEnd(id: {}, url: '{}')", id, url),
            Event::ActivationStart { route, .. } => write!(f, "ActivationStart(path: '{}')", route.route_path()),
            Event::ActivationEnd { route, .. } => write!(f, "ActivationEnd(path: '{}')", route.route_path()),
            Event::NavigationEnd {
                id,
                url,
                url_after_redirects,
            } => write!(
                f,
                "NavigationEnd(id: {}, url: '{}', urlAfterRedirects: '{}')",
                id, url, url_after_redirects
            ),
            Event::NavigationCancel { id, url, reason } => {
                write!(f, "NavigationCancel(id: {}, url: '{}', reason: {})", id, url, reason)
            }
            Event::NavigationError { id, url, error } => {
                write!(f, "NavigationError(id: {}, url: '{}', error: {})", id, url, error)
            }
        }
    }
}
