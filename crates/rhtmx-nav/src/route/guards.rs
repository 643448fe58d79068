//! Guard, resolver and loader hooks
//!
//! All hooks are async and object-safe so a route table can hold them as
//! `Arc<dyn ...>`. Guards answer with a [`GuardResult`]; resolvers and
//! loaders may fail with any error, which the router wraps into a
//! navigation error.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::Route;
use crate::state::{RouteSnapshot, RouterStateSnapshot};

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardResult {
    Allow,
    Deny,
    /// Cancel this navigation and start a new one to this URL
    Redirect(String),
}

impl From<bool> for GuardResult {
    fn from(allow: bool) -> Self {
        if allow {
            GuardResult::Allow
        } else {
            GuardResult::Deny
        }
    }
}

/// May the router activate `route`?
#[async_trait]
pub trait CanActivate: Send + Sync {
    async fn can_activate(&self, route: &RouteSnapshot, state: &RouterStateSnapshot)
        -> GuardResult;
}

/// May the router activate `child` below the route owning this guard?
#[async_trait]
pub trait CanActivateChild: Send + Sync {
    async fn can_activate_child(
        &self,
        child: &RouteSnapshot,
        state: &RouterStateSnapshot,
    ) -> GuardResult;
}

/// May the router leave the currently active `route`?
#[async_trait]
pub trait CanDeactivate: Send + Sync {
    async fn can_deactivate(
        &self,
        route: &RouteSnapshot,
        current: &RouterStateSnapshot,
        next: &RouterStateSnapshot,
    ) -> GuardResult;
}

/// May the router fetch the children of a lazy route?
#[async_trait]
pub trait CanLoad: Send + Sync {
    async fn can_load(&self, route: &Route) -> GuardResult;
}

/// Produces one data entry before a route activates
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(
        &self,
        route: &RouteSnapshot,
        state: &RouterStateSnapshot,
    ) -> anyhow::Result<serde_json::Value>;
}

/// Fetches the children of lazy routes by key
#[async_trait]
pub trait RouteLoader: Send + Sync {
    async fn load(&self, key: &str) -> anyhow::Result<LoadedRoutes>;
}

/// Children delivered by a [`RouteLoader`]
///
/// `context` is whatever scope the loaded module wants to carry along
/// (injectors, service registries); the router only stores it.
pub struct LoadedRoutes {
    pub routes: Vec<Arc<Route>>,
    pub context: Option<Arc<dyn Any + Send + Sync>>,
}

impl LoadedRoutes {
    pub fn new<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = Route>,
    {
        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: Arc<dyn Any + Send + Sync>) -> Self {
        self.context = Some(context);
        self
    }
}

impl fmt::Debug for LoadedRoutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedRoutes")
            .field("routes", &self.routes)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

// ============================================================================
// Closure guards
// ============================================================================

/// Synchronous closure usable as a `CanActivate` or `CanActivateChild` guard
pub struct FnGuard<F>(F);

/// Wraps a closure into a guard
///
/// # Examples
///
/// ```
/// use rhtmx_nav::route::{guard_fn, GuardResult, Route};
///
/// let route = Route::component("admin", "AdminCmp")
///     .with_can_activate(guard_fn(|_route, _state| GuardResult::Deny));
/// assert_eq!(route.guards.can_activate.len(), 1);
/// ```
pub fn guard_fn<F>(f: F) -> FnGuard<F>
where
    F: Fn(&RouteSnapshot, &RouterStateSnapshot) -> GuardResult + Send + Sync,
{
    FnGuard(f)
}

#[async_trait]
impl<F> CanActivate for FnGuard<F>
where
    F: Fn(&RouteSnapshot, &RouterStateSnapshot) -> GuardResult + Send + Sync,
{
    async fn can_activate(
        &self,
        route: &RouteSnapshot,
        state: &RouterStateSnapshot,
    ) -> GuardResult {
        (self.0)(route, state)
    }
}

#[async_trait]
impl<F> CanActivateChild for FnGuard<F>
where
    F: Fn(&RouteSnapshot, &RouterStateSnapshot) -> GuardResult + Send + Sync,
{
    async fn can_activate_child(
        &self,
        child: &RouteSnapshot,
        state: &RouterStateSnapshot,
    ) -> GuardResult {
        (self.0)(child, state)
    }
}
