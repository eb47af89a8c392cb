//! Transient status message.

use std::time::{Duration, Instant};

/// How long a non-persistent message stays up by default.
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    message: Option<String>,
    expires_at: Option<Instant>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the message. Unless `keep` is set it clears after `timeout`.
    pub fn show(
        &mut self,
        message: impl Into<String>,
        keep: bool,
        timeout: Duration,
        now: Instant,
    ) {
        self.message = Some(message.into());
        self.expires_at = if keep { None } else { Some(now + timeout) };
    }

    pub fn clear(&mut self) {
        self.message = None;
        self.expires_at = None;
    }

    pub fn current(&self, now: Instant) -> Option<&str> {
        match self.expires_at {
            Some(at) if now >= at => None,
            _ => self.message.as_deref(),
        }
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Drop the message once it has expired.
    pub fn tick(&mut self, now: Instant) {
        if matches!(self.expires_at, Some(at) if now >= at) {
            self.clear();
        }
    }
}
