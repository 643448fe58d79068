use parking_lot::Mutex;

use super::events::NavigationTrigger;
use super::NavigationExtras;
use crate::error::NavigationError;
use crate::url::UrlTree;

/// Where one navigation attempt is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPhase {
    Idle,
    Started,
    Redirected,
    Recognized,
    GuardsChecked,
    Resolved,
    Activated,
    Completed,
    Cancelled,
    Errored,
}

impl NavigationPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NavigationPhase::Completed | NavigationPhase::Cancelled | NavigationPhase::Errored
        )
    }

    /// Stages run strictly in order; `Redirected` may loop back to `Started`
    /// while lazy children load, and any live phase may fail.
    pub fn can_transition_to(self, next: NavigationPhase) -> bool {
        use NavigationPhase::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Cancelled)
                | (_, Errored)
                | (Idle, Started)
                | (Started, Redirected)
                | (Redirected, Started)
                | (Redirected, Recognized)
                | (Recognized, GuardsChecked)
                | (GuardsChecked, Resolved)
                | (Resolved, Activated)
                | (Activated, Completed)
        )
    }
}

/// One navigation attempt
///
/// The router keeps the latest context and compares by identity at every
/// stage boundary; an attempt that is no longer the latest stops there.
#[derive(Debug)]
pub struct NavigationContext {
    pub id: u64,
    pub trigger: NavigationTrigger,
    /// Requested tree, before redirects
    pub url: UrlTree,
    pub extras: NavigationExtras,
    /// Guard redirects followed before this attempt
    pub redirect_depth: usize,
    phase: Mutex<NavigationPhase>,
}

impl NavigationContext {
    pub(crate) fn new(
        id: u64,
        trigger: NavigationTrigger,
        url: UrlTree,
        extras: NavigationExtras,
        redirect_depth: usize,
    ) -> Self {
        Self {
            id,
            trigger,
            url,
            extras,
            redirect_depth,
            phase: Mutex::new(NavigationPhase::Idle),
        }
    }

    pub fn phase(&self) -> NavigationPhase {
        *self.phase.lock()
    }

    pub(crate) fn advance(&self, to: NavigationPhase) -> Result<(), NavigationError> {
        let mut phase = self.phase.lock();
        if !phase.can_transition_to(to) {
            return Err(NavigationError::IllegalTransition { from: *phase, to });
        }
        *phase = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use NavigationPhase::*;

    #[rstest]
    #[case(Idle, Started, true)]
    #[case(Started, Redirected, true)]
    #[case(Redirected, Started, true)]
    #[case(Redirected, Recognized, true)]
    #[case(Recognized, GuardsChecked, true)]
    #[case(GuardsChecked, Resolved, true)]
    #[case(Resolved, Activated, true)]
    #[case(Activated, Completed, true)]
    #[case(Resolved, Cancelled, true)]
    #[case(Started, Errored, true)]
    #[case(Started, Recognized, false)]
    #[case(Recognized, Resolved, false)]
    #[case(Completed, Started, false)]
    #[case(Cancelled, Errored, false)]
    fn test_transitions(
        #[case] from: NavigationPhase,
        #[case] to: NavigationPhase,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_context_rejects_skipping() {
        let ctx = NavigationContext::new(
            1,
            NavigationTrigger::Imperative,
            UrlTree::empty(),
            NavigationExtras::default(),
            0,
        );
        ctx.advance(Started).unwrap();
        let err = ctx.advance(Resolved).unwrap_err();
        assert!(matches!(
            err,
            NavigationError::IllegalTransition {
                from: Started,
                to: Resolved
            }
        ));
        assert_eq!(ctx.phase(), Started);
    }
}
