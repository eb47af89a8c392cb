//! WebSocket liveness indicator.
//!
//! ```text
//! Dead --(open/message)--> Alive --(1.8s silence)--> Stale --(2.1s silence)--> Dead
//! ```
//!
//! Both silence timers run from the last activity and restart on every
//! inbound message. Alive and Stale only differ in how the badge is drawn.

use std::time::{Duration, Instant};

/// Silence after which the "alive" badge greys out.
pub const STALE_AFTER: Duration = Duration::from_millis(1800);

/// Silence after which the link is reported dead.
pub const DEAD_AFTER: Duration = Duration::from_millis(2100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Dead,
    Alive,
    Stale,
}

impl LinkState {
    /// Badge text.
    pub fn label(&self) -> &'static str {
        match self {
            LinkState::Dead => "WS dead",
            LinkState::Alive | LinkState::Stale => "WS alive",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LivenessMonitor {
    /// Last open or inbound message while connected
    last_activity: Option<Instant>,
}

impl LivenessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    pub fn on_message(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    pub fn on_close(&mut self) {
        self.last_activity = None;
    }

    pub fn state(&self, now: Instant) -> LinkState {
        let Some(last) = self.last_activity else {
            return LinkState::Dead;
        };
        let silence = now.saturating_duration_since(last);
        if silence > DEAD_AFTER {
            LinkState::Dead
        } else if silence > STALE_AFTER {
            LinkState::Stale
        } else {
            LinkState::Alive
        }
    }

    /// When the state will next change without further input.
    pub fn next_transition(&self, now: Instant) -> Option<Instant> {
        let last = self.last_activity?;
        [last + STALE_AFTER, last + DEAD_AFTER]
            .into_iter()
            .find(|at| *at >= now)
            // the boundary itself still counts as the earlier state
            .map(|at| at + Duration::from_millis(1))
    }
}
