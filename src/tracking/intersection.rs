//! Viewport Intersection Source
//!
//! Thin wrapper over the host's visibility primitive (an `IntersectionObserver`
//! in a browser). The source knows nothing about application state: it
//! registers the layout's anchors with the platform and forwards each batch of
//! observations untouched while it is connected.
//!
//! Degradation rules:
//! - no platform, or the platform refuses to observe → `Unavailable` (no-op)
//! - a section without a DOM anchor → skipped with a warning, others observed

use crate::error::TrackerError;
use crate::sections::SectionLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Snapshot of one section's visibility, delivered on a threshold crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityObservation {
    pub section_id: String,
    pub is_intersecting: bool,
    /// Visible fraction of the section, 0-1
    pub intersection_ratio: f64,
    /// Top edge relative to the viewport top, in px
    pub bounding_top: f64,
    pub bounding_height: f64,
}

impl VisibilityObservation {
    /// Build an observation; the ratio is clamped into [0, 1] (NaN becomes 0)
    pub fn new(
        section_id: impl Into<String>,
        is_intersecting: bool,
        intersection_ratio: f64,
        bounding_top: f64,
        bounding_height: f64,
    ) -> Self {
        Self {
            section_id: section_id.into(),
            is_intersecting,
            intersection_ratio: clamp_unit(intersection_ratio),
            bounding_top,
            bounding_height,
        }
    }

    /// Observation for a section that has left the viewport
    pub fn hidden(section_id: impl Into<String>) -> Self {
        Self::new(section_id, false, 0.0, 0.0, 0.0)
    }
}

/// One platform callback worth of observations
pub type VisibilityBatch = Vec<VisibilityObservation>;

pub(crate) fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Root margin
// ============================================================================

/// A single root margin offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginValue {
    Px(f64),
    Percent(f64),
}

impl MarginValue {
    /// Offset in px against a viewport extent (height for top/bottom)
    pub fn resolve(self, extent: f64) -> f64 {
        match self {
            MarginValue::Px(px) => px,
            MarginValue::Percent(pct) => extent * pct / 100.0,
        }
    }
}

impl fmt::Display for MarginValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginValue::Px(v) => write!(f, "{}px", v),
            MarginValue::Percent(v) => write!(f, "{}%", v),
        }
    }
}

impl FromStr for MarginValue {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TrackerError::InvalidRootMargin(s.to_string());
        let parse = |num: &str| num.parse::<f64>().ok().filter(|v| v.is_finite());

        if let Some(num) = s.strip_suffix("px") {
            parse(num).map(MarginValue::Px).ok_or_else(invalid)
        } else if let Some(num) = s.strip_suffix('%') {
            parse(num).map(MarginValue::Percent).ok_or_else(invalid)
        } else if s == "0" {
            Ok(MarginValue::Px(0.0))
        } else {
            Err(invalid())
        }
    }
}

/// CSS-style margin grown/shrunk around the viewport before intersecting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl RootMargin {
    pub const ZERO: RootMargin = RootMargin {
        top: MarginValue::Px(0.0),
        right: MarginValue::Px(0.0),
        bottom: MarginValue::Px(0.0),
        left: MarginValue::Px(0.0),
    };
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::ZERO
    }
}

impl FromStr for RootMargin {
    type Err = TrackerError;

    /// Parses the 1-4 value shorthand, e.g. `"-10% 0px -70% 0px"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split_whitespace()
            .map(MarginValue::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| TrackerError::InvalidRootMargin(s.to_string()))?;

        let (top, right, bottom, left) = match values.as_slice() {
            [all] => (*all, *all, *all, *all),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return Err(TrackerError::InvalidRootMargin(s.to_string())),
        };

        Ok(Self { top, right, bottom, left })
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

// ============================================================================
// Observer options
// ============================================================================

/// Thresholds from 0 to 1 inclusive in `step` increments
pub fn threshold_steps(step: f64) -> Vec<f64> {
    if !(step > 0.0 && step <= 1.0) {
        return vec![0.0, 1.0];
    }
    let n = (1.0 / step).round() as usize;
    (0..=n)
        .map(|i| ((i as f64 * step) * 1000.0).round() / 1000.0)
        .map(|t| t.min(1.0))
        .collect()
}

/// Sensitivity settings handed to the platform
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    thresholds: Vec<f64>,
    pub root_margin: RootMargin,
}

impl ObserverOptions {
    /// Thresholds must lie in [0, 1]; they are sorted and deduplicated
    pub fn new(mut thresholds: Vec<f64>, root_margin: RootMargin) -> Result<Self, TrackerError> {
        if let Some(bad) = thresholds.iter().find(|t| !(0.0..=1.0).contains(*t)) {
            return Err(TrackerError::InvalidThreshold(*bad));
        }
        if thresholds.is_empty() {
            thresholds.push(0.0);
        }
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();
        Ok(Self { thresholds, root_margin })
    }

    /// Single mid-range threshold with a narrow detection band; stable on short pages
    pub fn coarse() -> Self {
        Self {
            thresholds: vec![0.1],
            root_margin: RootMargin {
                top: MarginValue::Percent(-10.0),
                right: MarginValue::Px(0.0),
                bottom: MarginValue::Percent(-70.0),
                left: MarginValue::Px(0.0),
            },
        }
    }

    /// Tenth-step thresholds; gives the resolver fine ratio data for scoring
    pub fn fine_grained() -> Self {
        Self {
            thresholds: threshold_steps(0.1),
            root_margin: RootMargin::ZERO,
        }
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self::fine_grained()
    }
}

// ============================================================================
// Platform seam
// ============================================================================

/// Handle of a platform observer registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Host-provided visibility primitive
pub trait IntersectionPlatform {
    /// Whether the page currently has an element for this section
    fn has_anchor(&self, section_id: &str) -> bool;

    /// Start observing the given sections
    fn observe(&mut self, section_ids: &[String], options: &ObserverOptions) -> Result<ObserverId, TrackerError>;

    /// Stop delivering callbacks for this registration
    fn disconnect(&mut self, observer: ObserverId);
}

/// Outcome of [`IntersectionSource::observe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationStatus {
    Active { observed: usize, skipped: Vec<String> },
    Unavailable,
}

impl ObservationStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ObservationStatus::Active { .. })
    }
}

/// Observes the layout's sections through an optional platform
pub struct IntersectionSource<P: IntersectionPlatform> {
    platform: Option<P>,
    observer: Option<ObserverId>,
    observed: Vec<String>,
}

impl<P: IntersectionPlatform> IntersectionSource<P> {
    pub fn new(platform: Option<P>) -> Self {
        Self {
            platform,
            observer: None,
            observed: Vec::new(),
        }
    }

    /// Register every section that has an anchor
    ///
    /// Re-observing replaces the previous registration.
    pub fn observe(&mut self, layout: &SectionLayout, options: &ObserverOptions) -> ObservationStatus {
        self.disconnect();

        let Some(platform) = self.platform.as_mut() else {
            tracing::debug!("No intersection platform; active-section highlighting disabled");
            return ObservationStatus::Unavailable;
        };

        let mut observed = Vec::with_capacity(layout.len());
        let mut skipped = Vec::new();
        for id in layout.ids() {
            if platform.has_anchor(id) {
                observed.push(id.to_string());
            } else {
                tracing::warn!("Section '{}' has no anchor on the page, skipping", id);
                skipped.push(id.to_string());
            }
        }

        if observed.is_empty() {
            tracing::warn!("No section anchors found; active-section highlighting disabled");
            return ObservationStatus::Unavailable;
        }

        match platform.observe(&observed, options) {
            Ok(id) => {
                tracing::debug!(
                    "Observing {} sections (thresholds {:?}, margin {})",
                    observed.len(),
                    options.thresholds(),
                    options.root_margin
                );
                let count = observed.len();
                self.observer = Some(id);
                self.observed = observed;
                ObservationStatus::Active { observed: count, skipped }
            }
            Err(e) => {
                tracing::warn!("Intersection platform unavailable: {}", e);
                ObservationStatus::Unavailable
            }
        }
    }

    /// Pass a batch through while connected; `None` after disconnect
    pub fn forward(&self, batch: VisibilityBatch) -> Option<VisibilityBatch> {
        self.observer.map(|_| batch)
    }

    pub fn is_connected(&self) -> bool {
        self.observer.is_some()
    }

    pub fn observed(&self) -> &[String] {
        &self.observed
    }

    pub fn disconnect(&mut self) {
        if let (Some(observer), Some(platform)) = (self.observer.take(), self.platform.as_mut()) {
            platform.disconnect(observer);
            tracing::debug!("Disconnected intersection observer {:?}", observer);
        }
        self.observed.clear();
    }

    pub fn platform(&self) -> Option<&P> {
        self.platform.as_ref()
    }
}

impl<P: IntersectionPlatform> Drop for IntersectionSource<P> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashSet;

    /// Platform double recording registrations
    #[derive(Debug, Default)]
    pub struct FakePlatform {
        pub anchors: HashSet<String>,
        pub fail_observe: bool,
        pub next_id: u64,
        pub connected: Vec<ObserverId>,
        pub last_options: Option<ObserverOptions>,
    }

    impl FakePlatform {
        pub fn with_anchors(ids: &[&str]) -> Self {
            Self {
                anchors: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl IntersectionPlatform for FakePlatform {
        fn has_anchor(&self, section_id: &str) -> bool {
            self.anchors.contains(section_id)
        }

        fn observe(&mut self, _section_ids: &[String], options: &ObserverOptions) -> Result<ObserverId, TrackerError> {
            if self.fail_observe {
                return Err(TrackerError::Platform("IntersectionObserver is not defined".to_string()));
            }
            self.next_id += 1;
            let id = ObserverId(self.next_id);
            self.connected.push(id);
            self.last_options = Some(options.clone());
            Ok(id)
        }

        fn disconnect(&mut self, observer: ObserverId) {
            self.connected.retain(|o| *o != observer);
        }
    }
}
