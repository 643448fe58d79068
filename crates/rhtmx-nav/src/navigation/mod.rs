//! Navigation pipeline
//!
//! A navigation runs these stages in order:
//!
//! 1. expand redirects, loading lazy children as they are reached
//! 2. recognize the redirected tree into a snapshot tree
//! 3. run `CanDeactivate`, `CanActivateChild` and `CanActivate` guards
//! 4. run resolvers
//! 5. reconcile, advance activated routes and commit
//! 6. update the platform location
//!
//! Only the newest navigation may commit. Every stage boundary compares the
//! running [`NavigationContext`] with the latest one issued; an older
//! attempt stops there with [`CancelReason::Superseded`]. A failed or
//! cancelled navigation leaves the committed state untouched.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

mod context;
mod events;
pub mod location;
mod pre_activation;

pub use context::{NavigationContext, NavigationPhase};
pub use events::{Event, NavigationTrigger};
pub use location::{Location, MemoryLocation};

use crate::config::{MalformedUrlPolicy, OnSameUrlNavigation, RouterOptions};
use crate::error::{CancelReason, ConfigError, NavigationError, RedirectError, UrlParseError};
use crate::recognize::recognize;
use crate::redirects::apply_redirects;
use crate::route::{into_shared, validate_routes, ComponentRef, GuardResult, Route, RouteLoader};
use crate::state::{
    create_router_state, ActivatedRoute, DefaultRouteReuseStrategy, DetachedRouteHandle, RouteReuseStrategy,
    RouterState, RouterStateSnapshot,
};
use crate::tree::TreeNode;
use crate::url::{contains_tree, DefaultUrlSerializer, Params, UrlSerializer, UrlTree};
use crate::url_builder::{self, Command};
use pre_activation::{Checks, GuardVerdict};

// ============================================================================
// Request / outcome types
// ============================================================================

/// How `navigate` treats the current query params
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParamsHandling {
    /// Current params overlaid with the given ones
    Merge,
    /// Current params, the given ones are ignored
    Preserve,
}

/// Options for a single navigation call
#[derive(Debug, Clone, Default)]
pub struct NavigationExtras {
    /// Resolve relative commands against this route instead of the root
    pub relative_to: Option<Arc<ActivatedRoute>>,
    pub query_params: Option<Params>,
    pub fragment: Option<String>,
    pub query_params_handling: Option<QueryParamsHandling>,
    pub preserve_fragment: bool,
    /// Commit without touching the platform location
    pub skip_location_change: bool,
    /// Replace the current history entry instead of pushing one
    pub replace_url: bool,
}

impl NavigationExtras {
    pub fn relative_to(route: Arc<ActivatedRoute>) -> Self {
        Self {
            relative_to: Some(route),
            ..Self::default()
        }
    }

    pub fn with_query_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params = Some(params.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    pub fn with_query_params_handling(mut self, handling: QueryParamsHandling) -> Self {
        self.query_params_handling = Some(handling);
        self
    }

    pub fn preserving_fragment(mut self) -> Self {
        self.preserve_fragment = true;
        self
    }

    pub fn skipping_location_change(mut self) -> Self {
        self.skip_location_change = true;
        self
    }

    pub fn replacing_url(mut self) -> Self {
        self.replace_url = true;
        self
    }

    /// Location flags only; used when a guard redirect restarts navigation
    fn carried(&self) -> Self {
        Self {
            skip_location_change: self.skip_location_change,
            replace_url: self.replace_url,
            ..Self::default()
        }
    }
}

/// How a navigation call ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Completed,
    /// Same URL as the committed one and the policy is `Ignore`
    Ignored,
    Cancelled(CancelReason),
}

impl NavigationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, NavigationOutcome::Completed)
    }
}

// ============================================================================
// Collaborators
// ============================================================================

pub type ErrorHandler = Arc<dyn Fn(&NavigationError) + Send + Sync>;
pub type MalformedUrlHandler = Arc<dyn Fn(&UrlParseError, &str) + Send + Sync>;

/// Everything the router talks to besides its route table
pub struct RouterDeps {
    pub options: RouterOptions,
    pub location: Arc<dyn Location>,
    pub serializer: Arc<dyn UrlSerializer>,
    pub reuse_strategy: Arc<dyn RouteReuseStrategy>,
    pub loader: Option<Arc<dyn RouteLoader>>,
    /// Component shown by the root route
    pub root_component: Option<ComponentRef>,
    pub error_handler: ErrorHandler,
    pub malformed_url_handler: MalformedUrlHandler,
}

impl Default for RouterDeps {
    fn default() -> Self {
        Self {
            options: RouterOptions::default(),
            location: Arc::new(MemoryLocation::default()),
            serializer: Arc::new(DefaultUrlSerializer),
            reuse_strategy: Arc::new(DefaultRouteReuseStrategy),
            loader: None,
            root_component: None,
            error_handler: Arc::new(|err: &NavigationError| {
                error!(error = %err, "Navigation failed");
            }),
            malformed_url_handler: Arc::new(|err: &UrlParseError, url: &str| {
                warn!(url = %url, error = %err, "Malformed url");
            }),
        }
    }
}

impl RouterDeps {
    pub fn with_options(mut self, options: RouterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_location(mut self, location: Arc<dyn Location>) -> Self {
        self.location = location;
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn UrlSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_reuse_strategy(mut self, strategy: Arc<dyn RouteReuseStrategy>) -> Self {
        self.reuse_strategy = strategy;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn RouteLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_root_component(mut self, component: impl Into<ComponentRef>) -> Self {
        self.root_component = Some(component.into());
        self
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&NavigationError) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    pub fn with_malformed_url_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&UrlParseError, &str) + Send + Sync + 'static,
    {
        self.malformed_url_handler = Arc::new(handler);
        self
    }
}

// ============================================================================
// Router
// ============================================================================

struct Committed {
    url_tree: UrlTree,
    state: RouterState,
}

enum Step {
    Done(NavigationOutcome),
    /// Cancelled by a guard redirect; start over at this tree
    Restart(UrlTree, NavigationExtras),
}

/// The navigation engine
///
/// # Examples
///
/// ```
/// use rhtmx_nav::navigation::{NavigationExtras, Router, RouterDeps};
/// use rhtmx_nav::route::{PathMatch, Route};
///
/// let router = Router::new(
///     [
///         Route::redirect("", "home").with_path_match(PathMatch::Full),
///         Route::component("home", "HomeCmp"),
///     ],
///     RouterDeps::default(),
/// )
/// .unwrap();
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let outcome = rt.block_on(router.navigate_by_url("/", NavigationExtras::default())).unwrap();
/// assert!(outcome.is_completed());
/// assert_eq!(router.url(), "/home");
/// ```
pub struct Router {
    config: RwLock<Vec<Arc<Route>>>,
    deps: RouterDeps,
    committed: RwLock<Committed>,
    latest: Mutex<Option<Arc<NavigationContext>>>,
    next_id: AtomicU64,
    navigated: AtomicBool,
    events: broadcast::Sender<Event>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("url", &self.url())
            .field("routes", &self.config.read().len())
            .field("options", &self.deps.options)
            .finish()
    }
}

impl Router {
    pub fn new<I>(routes: I, deps: RouterDeps) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Route>,
    {
        Self::from_shared(into_shared(routes), deps)
    }

    /// Like [`Router::new`], for tables whose routes are already shared
    pub fn from_shared(routes: Vec<Arc<Route>>, deps: RouterDeps) -> Result<Self, ConfigError> {
        validate_routes(&routes)?;

        let url_tree = UrlTree::empty();
        let state = RouterState::empty(&url_tree, deps.root_component.clone());
        let (events, _) = broadcast::channel(deps.options.event_capacity.max(1));
        info!(routes = routes.len(), "Router created");

        Ok(Self {
            config: RwLock::new(routes),
            deps,
            committed: RwLock::new(Committed { url_tree, state }),
            latest: Mutex::new(None),
            next_id: AtomicU64::new(0),
            navigated: AtomicBool::new(false),
            events,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Serialized committed URL
    pub fn url(&self) -> String {
        self.deps.serializer.serialize(&self.committed.read().url_tree)
    }

    pub fn url_tree(&self) -> UrlTree {
        self.committed.read().url_tree.clone()
    }

    pub fn router_state(&self) -> RouterState {
        self.committed.read().state.clone()
    }

    pub fn config(&self) -> Vec<Arc<Route>> {
        self.config.read().clone()
    }

    pub fn options(&self) -> &RouterOptions {
        &self.deps.options
    }

    /// Lifecycle events of every navigation from now on
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Is `url` part of the committed URL? `exact` also requires equal
    /// query params and no extra segments.
    pub fn is_active(&self, url: &UrlTree, exact: bool) -> bool {
        contains_tree(&self.committed.read().url_tree, url, exact)
    }

    pub fn parse_url(&self, url: &str) -> Result<UrlTree, UrlParseError> {
        self.deps.serializer.parse(url)
    }

    pub fn serialize_url(&self, tree: &UrlTree) -> String {
        self.deps.serializer.serialize(tree)
    }

    /// Installs a new route table; the committed state is left as is
    pub fn reset_config<I>(&self, routes: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Route>,
    {
        let routes = into_shared(routes);
        validate_routes(&routes)?;
        info!(routes = routes.len(), "Route table replaced");
        *self.config.write() = routes;
        Ok(())
    }

    /// Builds a tree from `commands` against the committed state
    pub fn create_url_tree(
        &self,
        commands: &[Command],
        extras: &NavigationExtras,
    ) -> Result<UrlTree, NavigationError> {
        let committed = self.committed.read();
        let current = &committed.url_tree;

        let query_params = match extras.query_params_handling {
            Some(QueryParamsHandling::Preserve) => current.query_params.clone(),
            Some(QueryParamsHandling::Merge) => {
                let mut merged = current.query_params.clone();
                merged.extend(extras.query_params.clone().unwrap_or_default());
                merged
            }
            None => extras.query_params.clone().unwrap_or_default(),
        };
        let fragment = if extras.preserve_fragment {
            current.fragment.clone()
        } else {
            extras.fragment.clone()
        };
        let relative_to = extras.relative_to.as_ref().map(|route| route.snapshot());

        let tree = url_builder::create_url_tree(
            &committed.state.snapshot,
            relative_to.as_ref(),
            current,
            commands,
            query_params,
            fragment,
        )?;
        Ok(tree)
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    #[instrument(skip(self, extras))]
    pub async fn navigate_by_url(
        &self,
        url: &str,
        extras: NavigationExtras,
    ) -> Result<NavigationOutcome, NavigationError> {
        match self.deps.serializer.parse(url) {
            Ok(tree) => {
                self.schedule_navigation(tree, NavigationTrigger::Imperative, extras)
                    .await
            }
            Err(err) => self.malformed(url, err).await,
        }
    }

    /// Navigates along `commands`, relative to `extras.relative_to` or the root
    pub async fn navigate(
        &self,
        commands: &[Command],
        extras: NavigationExtras,
    ) -> Result<NavigationOutcome, NavigationError> {
        let tree = self.create_url_tree(commands, &extras)?;
        self.schedule_navigation(tree, NavigationTrigger::Imperative, extras)
            .await
    }

    /// Navigates to whatever URL the platform location holds
    pub async fn initial_navigation(&self) -> Result<NavigationOutcome, NavigationError> {
        let url = self.deps.location.path();
        match self.deps.serializer.parse(&url) {
            Ok(tree) => {
                self.schedule_navigation(
                    tree,
                    NavigationTrigger::Initial,
                    NavigationExtras::default().replacing_url(),
                )
                .await
            }
            Err(err) => self.malformed(&url, err).await,
        }
    }

    /// The platform moved through its history to `url`
    pub async fn handle_pop_state(&self, url: &str) -> Result<NavigationOutcome, NavigationError> {
        match self.deps.serializer.parse(url) {
            Ok(tree) => {
                self.schedule_navigation(
                    tree,
                    NavigationTrigger::PopState,
                    NavigationExtras::default().skipping_location_change(),
                )
                .await
            }
            Err(err) => self.malformed(url, err).await,
        }
    }

    async fn malformed(&self, url: &str, err: UrlParseError) -> Result<NavigationOutcome, NavigationError> {
        (self.deps.malformed_url_handler)(&err, url);
        if self.deps.options.malformed_url == MalformedUrlPolicy::Reset {
            let reset = self
                .schedule_navigation(
                    UrlTree::empty(),
                    NavigationTrigger::Imperative,
                    NavigationExtras::default().replacing_url(),
                )
                .await;
            if let Err(reset) = reset {
                warn!(error = %reset, "Reset after malformed url failed");
            }
        }
        Err(err.into())
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    async fn schedule_navigation(
        &self,
        tree: UrlTree,
        trigger: NavigationTrigger,
        extras: NavigationExtras,
    ) -> Result<NavigationOutcome, NavigationError> {
        let mut request = (tree, trigger, extras);
        let mut redirect_depth = 0;

        loop {
            let (tree, trigger, extras) = request;
            if self.is_ignored_same_url(&tree) {
                debug!(url = %tree, "Ignoring navigation to the current url");
                return Ok(NavigationOutcome::Ignored);
            }

            let ctx = self.begin(tree, trigger, extras, redirect_depth);
            let step = match self.run_stages(&ctx).await {
                Ok(step) => step,
                Err(err) => {
                    self.fail(&ctx, &err);
                    return Err(err);
                }
            };

            match step {
                Step::Done(outcome) => return Ok(outcome),
                Step::Restart(next, extras) => {
                    redirect_depth = ctx.redirect_depth + 1;
                    if redirect_depth > self.deps.options.max_guard_redirects {
                        let err = NavigationError::GuardRedirectLimit {
                            redirects: self.deps.options.max_guard_redirects,
                        };
                        (self.deps.error_handler)(&err);
                        return Err(err);
                    }
                    request = (next, NavigationTrigger::Imperative, extras);
                }
            }
        }
    }

    /// Same url as the committed one, with nothing in flight to supersede
    fn is_ignored_same_url(&self, tree: &UrlTree) -> bool {
        let in_flight = self
            .latest
            .lock()
            .as_ref()
            .is_some_and(|latest| !latest.phase().is_terminal());
        self.deps.options.on_same_url_navigation == OnSameUrlNavigation::Ignore
            && self.navigated.load(Ordering::SeqCst)
            && !in_flight
            && self.deps.serializer.serialize(tree) == self.url()
    }

    fn begin(
        &self,
        tree: UrlTree,
        trigger: NavigationTrigger,
        extras: NavigationExtras,
        redirect_depth: usize,
    ) -> Arc<NavigationContext> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let ctx = Arc::new(NavigationContext::new(id, trigger, tree, extras, redirect_depth));
        *self.latest.lock() = Some(Arc::clone(&ctx));
        ctx
    }

    #[instrument(skip_all, fields(id = ctx.id, redirect_depth = ctx.redirect_depth))]
    async fn run_stages(&self, ctx: &Arc<NavigationContext>) -> Result<Step, NavigationError> {
        ctx.advance(NavigationPhase::Started)?;
        let url = self.serialize_url(&ctx.url);
        self.emit(Event::NavigationStart {
            id: ctx.id,
            url: url.clone(),
            trigger: ctx.trigger,
        });

        // Redirects, loading lazy children whenever matching reaches one
        let mut passes = 0;
        let redirected = loop {
            let routes = self.config();
            match apply_redirects(&ctx.url, &routes) {
                Ok(tree) => break tree,
                Err(RedirectError::LoadRequired(route)) => {
                    passes += 1;
                    if passes > self.deps.options.max_lazy_load_passes {
                        return Err(NavigationError::LazyLoadLimit {
                            passes: self.deps.options.max_lazy_load_passes,
                        });
                    }
                    if let Some(step) = self.load_children(ctx, &route).await? {
                        return Ok(step);
                    }
                    if let Some(step) = self.superseded(ctx) {
                        return Ok(step);
                    }
                    ctx.advance(NavigationPhase::Redirected)?;
                    ctx.advance(NavigationPhase::Started)?;
                }
                Err(err) => return Err(err.into()),
            }
        };

        ctx.advance(NavigationPhase::Redirected)?;
        let url_after_redirects = self.serialize_url(&redirected);
        self.emit(Event::Redirected {
            id: ctx.id,
            url: url.clone(),
            url_after_redirects: url_after_redirects.clone(),
        });

        let future = recognize(
            self.deps.root_component.clone(),
            &self.config(),
            &redirected,
            &url_after_redirects,
            self.deps.options.params_inheritance,
        )?;
        ctx.advance(NavigationPhase::Recognized)?;
        self.emit(Event::RoutesRecognized {
            id: ctx.id,
            url: url.clone(),
            url_after_redirects: url_after_redirects.clone(),
            state: future.clone(),
        });

        let current = self.committed.read().state.snapshot.clone();
        let checks = Checks::collect(&future, &current);
        let verdict = if checks.is_empty() {
            GuardVerdict::Pass
        } else {
            checks.run_guards(&current, &future).await
        };
        if let Some(step) = self.superseded(ctx) {
            return Ok(step);
        }
        self.emit(Event::GuardsChecked {
            id: ctx.id,
            url: url.clone(),
            should_activate: verdict == GuardVerdict::Pass,
        });
        match verdict {
            GuardVerdict::Pass => {}
            GuardVerdict::Reject { guard, route } => {
                return Ok(Step::Done(self.cancel(ctx, CancelReason::GuardRejected { guard, route })));
            }
            GuardVerdict::Redirect(target) => return self.guard_redirect(ctx, target),
        }
        ctx.advance(NavigationPhase::GuardsChecked)?;

        self.emit(Event::ResolveStart {
            id: ctx.id,
            url: url.clone(),
        });
        checks.run_resolvers(&future).await?;
        if let Some(step) = self.superseded(ctx) {
            return Ok(step);
        }
        self.emit(Event::ResolveEnd {
            id: ctx.id,
            url: url.clone(),
        });
        ctx.advance(NavigationPhase::Resolved)?;

        // No suspension point from here on
        if let Some(step) = self.activate(ctx, redirected, &future) {
            return Ok(step);
        }
        ctx.advance(NavigationPhase::Activated)?;
        self.update_location(ctx, &url_after_redirects);

        ctx.advance(NavigationPhase::Completed)?;
        self.navigated.store(true, Ordering::SeqCst);
        self.emit(Event::NavigationEnd {
            id: ctx.id,
            url,
            url_after_redirects,
        });
        Ok(Step::Done(NavigationOutcome::Completed))
    }

    async fn load_children(
        &self,
        ctx: &Arc<NavigationContext>,
        route: &Arc<Route>,
    ) -> Result<Option<Step>, NavigationError> {
        for guard in &route.guards.can_load {
            match guard.can_load(route).await {
                GuardResult::Allow => {}
                GuardResult::Deny => {
                    let reason = CancelReason::GuardRejected {
                        guard: "CanLoad",
                        route: route.path().to_string(),
                    };
                    return Ok(Some(Step::Done(self.cancel(ctx, reason))));
                }
                GuardResult::Redirect(target) => return self.guard_redirect(ctx, target).map(Some),
            }
        }

        let key = route.lazy_key().unwrap_or_default().to_string();
        let loader = self.deps.loader.as_ref().ok_or_else(|| NavigationError::LazyLoad {
            key: key.clone(),
            source: anyhow::anyhow!("no route loader configured"),
        })?;

        self.emit(Event::RouteConfigLoadStart {
            id: ctx.id,
            path: route.path().to_string(),
        });
        let loaded = loader
            .load(&key)
            .await
            .map_err(|source| NavigationError::LazyLoad {
                key: key.clone(),
                source,
            })?;
        validate_routes(&loaded.routes)?;
        info!(key = %key, routes = loaded.routes.len(), "Loaded lazy routes");
        route.set_loaded(Arc::new(loaded));
        self.emit(Event::RouteConfigLoadEnd {
            id: ctx.id,
            path: route.path().to_string(),
        });
        Ok(None)
    }

    fn guard_redirect(&self, ctx: &Arc<NavigationContext>, target: String) -> Result<Step, NavigationError> {
        let next = self.deps.serializer.parse(&target)?;
        self.cancel(ctx, CancelReason::GuardRedirect { target });
        Ok(Step::Restart(next, ctx.extras.carried()))
    }

    /// Swaps in the new state and pushes changes to activated routes
    ///
    /// Returns the cancellation when a newer navigation started after the
    /// last check; nothing is committed then.
    fn activate(
        &self,
        ctx: &Arc<NavigationContext>,
        url_tree: UrlTree,
        future: &RouterStateSnapshot,
    ) -> Option<Step> {
        let mut committed = self.committed.write();
        if let Some(step) = self.superseded(ctx) {
            return Some(step);
        }
        let strategy = self.deps.reuse_strategy.as_ref();

        let next = create_router_state(strategy, future, Some(&committed.state));
        self.detach_left(&committed.state.tree.root, &next);

        // parents before children
        for node in next.tree.root.walk() {
            let route = node.value.future_snapshot();
            self.emit(Event::ActivationStart {
                id: ctx.id,
                route: Arc::clone(&route),
            });
            let changes = node.value.advance();
            if !changes.is_empty() {
                debug!(route = %route, ?changes, "Route updated");
            }
            self.emit(Event::ActivationEnd { id: ctx.id, route });
        }

        committed.url_tree = url_tree;
        committed.state = next;
        None
    }

    /// Hands subtrees that left the tree to the reuse strategy
    fn detach_left(&self, node: &TreeNode<Arc<ActivatedRoute>>, next: &RouterState) {
        if next.tree.find_node(&node.value).is_some() {
            for child in &node.children {
                self.detach_left(child, next);
            }
            return;
        }

        let snapshot = node.value.snapshot();
        if self.deps.reuse_strategy.should_detach(&snapshot) {
            debug!(route = %snapshot, "Detaching route");
            self.deps
                .reuse_strategy
                .store(&snapshot, Some(DetachedRouteHandle { node: node.clone() }));
        }
    }

    fn update_location(&self, ctx: &NavigationContext, url: &str) {
        if ctx.extras.skip_location_change {
            return;
        }
        let location = &self.deps.location;
        if ctx.extras.replace_url || location.is_current_path_equal_to(url) {
            location.replace_state(url);
        } else {
            location.go(url);
        }
    }

    // ========================================================================
    // Outcomes
    // ========================================================================

    fn superseded(&self, ctx: &Arc<NavigationContext>) -> Option<Step> {
        let latest = self.latest.lock().clone();
        match latest {
            Some(latest) if Arc::ptr_eq(&latest, ctx) => None,
            latest => {
                let current = latest.map(|l| l.id).unwrap_or_default();
                Some(Step::Done(self.cancel(ctx, CancelReason::Superseded { current })))
            }
        }
    }

    fn cancel(&self, ctx: &NavigationContext, reason: CancelReason) -> NavigationOutcome {
        if let Err(err) = ctx.advance(NavigationPhase::Cancelled) {
            warn!(error = %err, "Cancelling a finished navigation");
        }
        debug!(id = ctx.id, reason = %reason, "Navigation cancelled");
        self.emit(Event::NavigationCancel {
            id: ctx.id,
            url: self.serialize_url(&ctx.url),
            reason: reason.clone(),
        });
        NavigationOutcome::Cancelled(reason)
    }

    fn fail(&self, ctx: &NavigationContext, err: &NavigationError) {
        if let Err(transition) = ctx.advance(NavigationPhase::Errored) {
            warn!(error = %transition, "Failing a finished navigation");
        }
        self.emit(Event::NavigationError {
            id: ctx.id,
            url: self.serialize_url(&ctx.url),
            error: err.to_string(),
        });
        (self.deps.error_handler)(err);
    }

    fn emit(&self, event: Event) {
        debug!(id = event.id(), kind = event.kind(), "{}", event);
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
