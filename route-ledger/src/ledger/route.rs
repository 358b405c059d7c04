//! Route Selector
//!
//! The active route day, read from local persisted state on start and
//! written back on every change.

use super::error::LedgerResult;
use crate::local_state::LocalState;
use shared::models::RouteDay;
use std::sync::Arc;

pub struct RouteSelector {
    state: Arc<dyn LocalState>,
    current: RouteDay,
}

impl RouteSelector {
    /// Previously persisted day, or the default tag on a cold start
    pub fn load(state: Arc<dyn LocalState>) -> Self {
        let current = state.route_day();
        tracing::debug!(day = %current, "Route day restored");
        Self { state, current }
    }

    pub fn get(&self) -> RouteDay {
        self.current
    }

    /// Persist `day` immediately; the in-memory value only changes once persisted
    ///
    /// Reconciling the Entity Store for the new scope is the caller's job
    /// (see [`ReconcilerHandle::set_day`](super::ReconcilerHandle::set_day)).
    pub fn set(&mut self, day: RouteDay) -> LedgerResult<()> {
        self.state.set_route_day(day)?;
        if day != self.current {
            tracing::info!(from = %self.current, to = %day, "Route day changed");
        }
        self.current = day;
        Ok(())
    }
}
