//! Live route nodes
//!
//! An [`ActivatedRoute`] outlives individual navigations: while the same
//! route config stays matched, the node is kept and only its snapshot
//! moves forward. Consumers watch the node's streams and see a new value
//! only when that part actually changed.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::RouteSnapshot;
use crate::route::{ComponentRef, Data, Route};
use crate::url::{Params, UrlSegment};

/// Which observable part of a route moved during [`RouteNodeState::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    Url,
    Params,
    QueryParams,
    Fragment,
    Data,
}

/// Snapshot bookkeeping of one activated route
#[derive(Debug, Clone)]
pub enum RouteNodeState {
    /// A navigation has decided on `future`; `current` is what observers see
    Pending {
        current: Option<Arc<RouteSnapshot>>,
        future: Arc<RouteSnapshot>,
    },
    /// Settled
    Current(Arc<RouteSnapshot>),
}

impl RouteNodeState {
    /// Snapshot observers should read right now
    pub fn visible(&self) -> &Arc<RouteSnapshot> {
        match self {
            RouteNodeState::Pending {
                current: Some(current),
                ..
            } => current,
            RouteNodeState::Pending { future, .. } => future,
            RouteNodeState::Current(snapshot) => snapshot,
        }
    }

    /// Snapshot the node is heading to (the visible one when settled)
    pub fn future(&self) -> &Arc<RouteSnapshot> {
        match self {
            RouteNodeState::Pending { future, .. } => future,
            RouteNodeState::Current(snapshot) => snapshot,
        }
    }

    /// Records a new target snapshot
    pub fn with_future(&self, future: Arc<RouteSnapshot>) -> RouteNodeState {
        let current = match self {
            RouteNodeState::Pending { current, .. } => current.clone(),
            RouteNodeState::Current(snapshot) => Some(Arc::clone(snapshot)),
        };
        RouteNodeState::Pending { current, future }
    }

    /// Promotes the future snapshot and lists what changed
    ///
    /// A node seen for the first time reports nothing: its streams were
    /// seeded with the future values when it was created.
    pub fn advance(&self) -> (RouteNodeState, Vec<RouteChange>) {
        match self {
            RouteNodeState::Current(snapshot) => {
                (RouteNodeState::Current(Arc::clone(snapshot)), Vec::new())
            }
            RouteNodeState::Pending {
                current: None,
                future,
            } => (RouteNodeState::Current(Arc::clone(future)), Vec::new()),
            RouteNodeState::Pending {
                current: Some(current),
                future,
            } => {
                let mut changes = Vec::new();
                if current.url != future.url {
                    changes.push(RouteChange::Url);
                }
                if current.params != future.params {
                    changes.push(RouteChange::Params);
                }
                if current.query_params != future.query_params {
                    changes.push(RouteChange::QueryParams);
                }
                if current.fragment != future.fragment {
                    changes.push(RouteChange::Fragment);
                }
                if current.data() != future.data() {
                    changes.push(RouteChange::Data);
                }
                (RouteNodeState::Current(Arc::clone(future)), changes)
            }
        }
    }
}

/// A route node of the live router state
pub struct ActivatedRoute {
    outlet: String,
    component: Option<ComponentRef>,
    route_config: Option<Arc<Route>>,
    state: RwLock<RouteNodeState>,
    url: watch::Sender<Vec<UrlSegment>>,
    params: watch::Sender<Params>,
    query_params: watch::Sender<Params>,
    fragment: watch::Sender<Option<String>>,
    data: watch::Sender<Data>,
}

impl ActivatedRoute {
    /// New node whose streams start at `snapshot`'s values
    pub(crate) fn new(snapshot: Arc<RouteSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            outlet: snapshot.outlet.clone(),
            component: snapshot.component.clone(),
            route_config: snapshot.route_config.clone(),
            url: watch::Sender::new(snapshot.url.clone()),
            params: watch::Sender::new(snapshot.params.clone()),
            query_params: watch::Sender::new(snapshot.query_params.clone()),
            fragment: watch::Sender::new(snapshot.fragment.clone()),
            data: watch::Sender::new(snapshot.data()),
            state: RwLock::new(RouteNodeState::Pending {
                current: None,
                future: snapshot,
            }),
        })
    }

    pub fn outlet(&self) -> &str {
        &self.outlet
    }

    pub fn component(&self) -> Option<&ComponentRef> {
        self.component.as_ref()
    }

    pub fn route_config(&self) -> Option<&Arc<Route>> {
        self.route_config.as_ref()
    }

    /// Snapshot observers currently see
    pub fn snapshot(&self) -> Arc<RouteSnapshot> {
        Arc::clone(self.state.read().visible())
    }

    pub(crate) fn future_snapshot(&self) -> Arc<RouteSnapshot> {
        Arc::clone(self.state.read().future())
    }

    pub(crate) fn set_future(&self, future: Arc<RouteSnapshot>) {
        let mut state = self.state.write();
        *state = state.with_future(future);
    }

    /// Promotes the pending snapshot and pushes changed values to subscribers
    pub(crate) fn advance(&self) -> Vec<RouteChange> {
        let (next, changes) = {
            let mut state = self.state.write();
            let (next, changes) = state.advance();
            *state = next.clone();
            (next, changes)
        };

        let snapshot = next.visible();
        for change in &changes {
            match change {
                RouteChange::Url => {
                    self.url.send_replace(snapshot.url.clone());
                }
                RouteChange::Params => {
                    self.params.send_replace(snapshot.params.clone());
                }
                RouteChange::QueryParams => {
                    self.query_params.send_replace(snapshot.query_params.clone());
                }
                RouteChange::Fragment => {
                    self.fragment.send_replace(snapshot.fragment.clone());
                }
                RouteChange::Data => {
                    self.data.send_replace(snapshot.data());
                }
            }
        }
        changes
    }

    // ========================================================================
    // Streams
    // ========================================================================

    pub fn url(&self) -> watch::Receiver<Vec<UrlSegment>> {
        self.url.subscribe()
    }

    pub fn params(&self) -> watch::Receiver<Params> {
        self.params.subscribe()
    }

    pub fn query_params(&self) -> watch::Receiver<Params> {
        self.query_params.subscribe()
    }

    pub fn fragment(&self) -> watch::Receiver<Option<String>> {
        self.fragment.subscribe()
    }

    pub fn data(&self) -> watch::Receiver<Data> {
        self.data.subscribe()
    }
}

impl std::fmt::Debug for ActivatedRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivatedRoute")
            .field("outlet", &self.outlet)
            .field("component", &self.component)
            .field("snapshot", &self.snapshot().to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::UrlSegmentGroup;
    use pretty_assertions::assert_eq;

    fn snapshot(id: &str) -> Arc<RouteSnapshot> {
        Arc::new(RouteSnapshot::new(
            vec![UrlSegment::from_path("team"), UrlSegment::from_path(id)],
            Params::from([("id".to_string(), id.to_string())]),
            Params::new(),
            None,
            Data::new(),
            "primary".to_string(),
            Some(ComponentRef::new("TeamCmp")),
            None,
            Arc::new(UrlSegmentGroup::empty()),
            Some(1),
        ))
    }

    #[test]
    fn test_first_advance_reports_nothing() {
        let state = RouteNodeState::Pending {
            current: None,
            future: snapshot("1"),
        };
        let (next, changes) = state.advance();
        assert!(changes.is_empty());
        assert!(matches!(next, RouteNodeState::Current(_)));
    }

    #[test]
    fn test_advance_reports_only_changes() {
        let state = RouteNodeState::Current(snapshot("1")).with_future(snapshot("2"));
        let (_, changes) = state.advance();
        assert_eq!(changes, vec![RouteChange::Url, RouteChange::Params]);

        let state = RouteNodeState::Current(snapshot("1")).with_future(snapshot("1"));
        let (_, changes) = state.advance();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_visible_stays_current_until_advance() {
        let first = snapshot("1");
        let state = RouteNodeState::Current(Arc::clone(&first)).with_future(snapshot("2"));
        assert!(Arc::ptr_eq(state.visible(), &first));
        assert_eq!(state.future().params["id"], "2");
    }

    #[test]
    fn test_streams_follow_advance() {
        let route = ActivatedRoute::new(snapshot("1"));
        let mut params = route.params();
        route.advance();
        assert!(!params.has_changed().unwrap());

        route.set_future(snapshot("2"));
        assert_eq!(route.snapshot().params["id"], "1");
        route.advance();
        assert!(params.has_changed().unwrap());
        assert_eq!(params.borrow_and_update().get("id").map(String::as_str), Some("2"));

        route.set_future(snapshot("2"));
        route.advance();
        assert!(!params.has_changed().unwrap());
    }
}
