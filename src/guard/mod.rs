//! Single-flight guard.
//!
//! At most one request may be in flight per guard. The `Idle -> InFlight`
//! transition is a single compare-and-swap; a trigger that loses the race is
//! dropped, not queued. The returned [`FlightPermit`] puts the guard back to
//! `Idle` when it is dropped, so success, failure and early return all
//! release it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Observable guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Idle,
    InFlight,
}

/// Result of a guarded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FlightOutcome<T> {
    /// The operation ran to completion.
    Completed(T),
    /// Another operation was already in flight; nothing ran.
    Dropped,
}

impl<T> FlightOutcome<T> {
    pub fn is_dropped(&self) -> bool {
        matches!(self, FlightOutcome::Dropped)
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            FlightOutcome::Completed(value) => Some(value),
            FlightOutcome::Dropped => None,
        }
    }
}

/// One guard per triggering context.
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: AtomicBool,
}

/// Proof that the guard is held. Releases on drop.
#[derive(Debug)]
pub struct FlightPermit<'a> {
    guard: &'a SingleFlight,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FlightState {
        if self.in_flight.load(Ordering::Acquire) {
            FlightState::InFlight
        } else {
            FlightState::Idle
        }
    }

    /// Try the `Idle -> InFlight` transition.
    pub fn try_begin(&self) -> Option<FlightPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit { guard: self })
    }

    /// Run `op` if the guard is idle, releasing it afterwards.
    pub async fn run<F, T>(&self, op: F) -> FlightOutcome<T>
    where
        F: Future<Output = T>,
    {
        let Some(_permit) = self.try_begin() else {
            debug!("Request already in flight, dropping trigger");
            return FlightOutcome::Dropped;
        };
        FlightOutcome::Completed(op.await)
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}
