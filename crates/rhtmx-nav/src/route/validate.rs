use std::collections::HashSet;
use std::sync::Arc;

use super::{PathMatch, Route, RouteKind};
use crate::error::ConfigError;

/// Checks a route table before the router accepts it
///
/// Loaded lazy children are validated too; unloaded ones are checked when
/// they arrive.
pub fn validate_routes(routes: &[Arc<Route>]) -> Result<(), ConfigError> {
    routes.iter().try_for_each(|route| validate_route(route))
}

fn validate_route(route: &Route) -> Result<(), ConfigError> {
    if let Some(err) = route.misconfiguration() {
        return Err(err.clone());
    }

    let path = route.path();
    if path.starts_with('/') {
        return Err(ConfigError::LeadingSlash {
            path: path.to_string(),
        });
    }
    if route.outlet.is_empty() {
        return Err(ConfigError::EmptyOutletName {
            path: path.to_string(),
        });
    }

    match &route.kind {
        RouteKind::Redirect { .. } if path.is_empty() && route.path_match == PathMatch::Prefix => {
            return Err(ConfigError::EmptyRedirectNeedsFullMatch {
                path: path.to_string(),
            });
        }
        RouteKind::Lazy { key, .. } if key.is_empty() => {
            return Err(ConfigError::EmptyLazyKey {
                path: path.to_string(),
            });
        }
        _ => {}
    }

    let mut keys = HashSet::new();
    if let Some((key, _)) = route.resolvers.iter().find(|(key, _)| !keys.insert(key.as_str())) {
        return Err(ConfigError::DuplicateResolverKey {
            path: path.to_string(),
            key: key.clone(),
        });
    }

    if route.is_wildcard() && !route.children().is_empty() {
        return Err(ConfigError::WildcardWithChildren);
    }

    validate_routes(route.children())
}
