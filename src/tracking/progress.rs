//! Scroll-Progress Estimator
//!
//! Maps raw scroll metrics to a normalized ratio for the progress bar. Runs
//! independently of section tracking. Scroll events only record the latest
//! metrics; the ratio is recomputed at most once per animation frame.

use serde::{Deserialize, Serialize};

/// Scroll metrics of the scrollable container, in px
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// Scrollable distance, floored at 1 so content that fits never divides by zero
    pub fn max_scroll(&self) -> f64 {
        (self.scroll_height - self.client_height).max(1.0)
    }

    /// Whether the content overflows the viewport at all
    pub fn is_scrollable(&self) -> bool {
        self.scroll_height > self.client_height
    }

    /// Whether the viewport bottom is within `tolerance` px of the content end
    pub fn is_at_bottom(&self, tolerance: f64) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height - tolerance
    }
}

/// Normalized scroll position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollProgressState {
    /// Always within [0, 1]
    pub ratio: f64,
}

/// `clamp(scroll_top / max_scroll, 0, 1)`; non-finite input maps to 0
pub fn scroll_ratio(metrics: &ScrollMetrics) -> f64 {
    let ratio = metrics.scroll_top / metrics.max_scroll();
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Default scroll offset past which the back-to-top button shows
pub const DEFAULT_BACK_TO_TOP_THRESHOLD: f64 = 300.0;

/// Frame-throttled progress estimator
#[derive(Debug, Clone)]
pub struct ScrollProgressEstimator {
    state: ScrollProgressState,
    pending: Option<ScrollMetrics>,
    last_scroll_top: f64,
    back_to_top_threshold: f64,
}

impl ScrollProgressEstimator {
    pub fn new(back_to_top_threshold: f64) -> Self {
        Self {
            state: ScrollProgressState::default(),
            pending: None,
            last_scroll_top: 0.0,
            back_to_top_threshold,
        }
    }

    /// Record metrics; intermediate events between frames are dropped
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) {
        self.pending = Some(metrics);
    }

    /// Recompute once per frame; returns the new state only if it changed
    pub fn on_animation_frame(&mut self) -> Option<ScrollProgressState> {
        let metrics = self.pending.take()?;
        self.last_scroll_top = metrics.scroll_top;

        let next = ScrollProgressState { ratio: scroll_ratio(&metrics) };
        if next == self.state {
            return None;
        }
        self.state = next;
        Some(next)
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    pub fn state(&self) -> ScrollProgressState {
        self.state
    }

    pub fn ratio(&self) -> f64 {
        self.state.ratio
    }

    pub fn show_back_to_top(&self) -> bool {
        self.last_scroll_top > self.back_to_top_threshold
    }

    /// Drop any unrendered frame
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }
}

impl Default for ScrollProgressEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_BACK_TO_TOP_THRESHOLD)
    }
}
