//! Programmatic-Scroll Guard
//!
//! A navigation click sets the active section optimistically and starts a
//! smooth scroll. While that animation runs, intersection batches report the
//! sections scrolled past; the guard holds them off for a grace period so the
//! highlight does not flicker between origin and destination. Manual scrolling
//! inside the grace period is suppressed as well.

use crate::clock::Timestamp;
use std::time::Duration;

/// Default grace period; must cover the platform's smooth-scroll duration
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuppressionFlag {
    pub active: bool,
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct ProgrammaticScrollGuard {
    grace_period: Duration,
    flag: SuppressionFlag,
    target: Option<String>,
}

impl ProgrammaticScrollGuard {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            grace_period,
            flag: SuppressionFlag::default(),
            target: None,
        }
    }

    /// Raise the flag for a jump to `target`; a new jump restarts the period
    pub fn engage(&mut self, target: &str, now: Timestamp) {
        self.flag = SuppressionFlag {
            active: true,
            expires_at: now.saturating_add(self.grace_period),
        };
        self.target = Some(target.to_string());
    }

    /// Clear an expired flag; true if it was cleared by this call
    pub fn release_if_expired(&mut self, now: Timestamp) -> bool {
        if self.flag.active && now >= self.flag.expires_at {
            tracing::debug!("Navigation grace period ended ({:?})", self.target);
            self.clear();
            return true;
        }
        false
    }

    pub fn is_suppressing(&mut self, now: Timestamp) -> bool {
        self.release_if_expired(now);
        self.flag.active
    }

    /// Drop the emission while suppressing, pass it through otherwise
    pub fn filter(&mut self, emission: Option<String>, now: Timestamp) -> Option<String> {
        let id = emission?;
        if self.is_suppressing(now) {
            tracing::debug!("Suppressed '{}' during navigation to {:?}", id, self.target);
            None
        } else {
            Some(id)
        }
    }

    pub fn clear(&mut self) {
        self.flag = SuppressionFlag::default();
        self.target = None;
    }

    pub fn flag(&self) -> SuppressionFlag {
        self.flag
    }

    /// Expiry of an active flag
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.flag.active.then_some(self.flag.expires_at)
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }
}

impl Default for ProgrammaticScrollGuard {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}
