//! Single-flight access-credential renewal.
//!
//! Any number of requests may fail authorization at the same time. The
//! coordinator makes sure only the first one starts a renewal; everybody else
//! awaits that same attempt and receives its outcome.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use super::token::AccessCredential;

/// Result of one renewal attempt, shared by every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    Renewed(AccessCredential),
    Failed,
}

impl RenewalOutcome {
    pub fn is_renewed(&self) -> bool {
        matches!(self, RenewalOutcome::Renewed(_))
    }
}

type PendingRenewal = Shared<BoxFuture<'static, RenewalOutcome>>;

struct InFlight {
    id: u64,
    replaces: Option<AccessCredential>,
    pending: PendingRenewal,
}

/// Last finished renewal and the credential it replaced.
struct Settled {
    replaced: AccessCredential,
    outcome: RenewalOutcome,
}

#[derive(Default)]
struct State {
    next_id: u64,
    in_flight: Option<InFlight>,
    settled: Option<Settled>,
}

#[derive(Default)]
pub struct RenewalCoordinator {
    state: Mutex<State>,
}

impl RenewalCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a renewal outcome for a request that was rejected while carrying
    /// `sent_with`.
    ///
    /// - A renewal already in flight is joined; `start` is not called.
    /// - If the most recent renewal already replaced `sent_with`, its outcome is
    ///   returned without a new attempt.
    /// - Otherwise `start` is called once and its future becomes the in-flight
    ///   renewal.
    ///
    /// Dropping a waiter does not cancel the renewal for the others.
    pub async fn renew<F, Fut>(&self, sent_with: Option<&AccessCredential>, start: F) -> RenewalOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RenewalOutcome> + Send + 'static,
    {
        let (id, pending) = {
            let mut state = self.lock();

            if let Some(in_flight) = &state.in_flight {
                debug!(renewal = in_flight.id, "Joining in-flight renewal");
                (in_flight.id, in_flight.pending.clone())
            } else if let Some(settled) = state
                .settled
                .as_ref()
                .filter(|settled| Some(&settled.replaced) == sent_with)
            {
                debug!("Credential was already renewed, reusing outcome");
                return settled.outcome.clone();
            } else {
                let id = state.next_id;
                state.next_id += 1;
                debug!(renewal = id, "Starting renewal");

                let pending = start().boxed().shared();
                state.in_flight = Some(InFlight {
                    id,
                    replaces: sent_with.cloned(),
                    pending: pending.clone(),
                });
                (id, pending)
            }
        };

        let outcome = pending.await;

        let mut state = self.lock();
        if state.in_flight.as_ref().is_some_and(|in_flight| in_flight.id == id) {
            if let Some(finished) = state.in_flight.take() {
                state.settled = finished.replaces.map(|replaced| Settled {
                    replaced,
                    outcome: outcome.clone(),
                });
            }
            debug!(renewal = id, renewed = outcome.is_renewed(), "Renewal settled");
        }
        outcome
    }

    /// Drop the memo of the last settled renewal. An in-flight renewal is
    /// left running.
    pub fn reset(&self) {
        if self.lock().settled.take().is_some() {
            debug!("Forgot settled renewal");
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
