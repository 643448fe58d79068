//! # RHTMX Nav
//!
//! Client-side navigation engine for single-page apps:
//! - URL trees with named outlets (`/team/33/(user/victor//aux:chat)`)
//! - Matrix params (`/team;id=33`), query params and fragments
//! - Declarative route tables with redirects, wildcards and lazy children
//! - Guards (`CanActivate`, `CanActivateChild`, `CanDeactivate`, `CanLoad`) and resolvers
//! - Activated routes that survive navigations and publish changes as streams
//!
//! ## Pipeline
//!
//! A navigation parses the URL, expands redirects, recognizes the result
//! against the route table, runs guards and resolvers, then reconciles and
//! commits the new state in one step. A newer navigation cancels any older
//! one still in flight. Failures never touch the committed state.
//!
//! ## Example
//!
//! ```
//! use rhtmx_nav::navigation::{NavigationExtras, Router, RouterDeps};
//! use rhtmx_nav::route::Route;
//!
//! let router = Router::new(
//!     [Route::component("team/:id", "TeamCmp")
//!         .with_children([Route::component("user/:name", "UserCmp")])],
//!     RouterDeps::default(),
//! )
//! .unwrap();
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! rt.block_on(router.navigate_by_url("/team/33/user/victor", NavigationExtras::default()))
//!     .unwrap();
//!
//! let user = router.router_state().primary_leaf().snapshot();
//! assert_eq!(user.params["name"], "victor");
//! assert_eq!(router.url(), "/team/33/user/victor");
//! ```

pub mod config;
pub mod error;
pub mod navigation;
pub mod recognize;
pub mod redirects;
pub mod route;
pub mod state;
pub mod tree;
pub mod url;
pub mod url_builder;

// Re-export commonly used types
pub use config::{MalformedUrlPolicy, OnSameUrlNavigation, ParamsInheritance, RouterOptions};
pub use error::{
    CancelReason, ConfigError, NavigationError, RecognizeError, RedirectError, UrlParseError, UrlTreeError,
};
pub use navigation::{
    Event, Location, MemoryLocation, NavigationExtras, NavigationOutcome, QueryParamsHandling, Router,
    RouterDeps,
};
pub use route::{ComponentRef, GuardResult, PathMatch, Route};
pub use state::{ActivatedRoute, RouteSnapshot, RouterState, RouterStateSnapshot};
pub use url::{DefaultUrlSerializer, UrlSegment, UrlSegmentGroup, UrlSerializer, UrlTree, PRIMARY_OUTLET};
pub use url_builder::{create_url_tree, Command};
