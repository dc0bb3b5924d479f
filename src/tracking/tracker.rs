//! Section Tracker
//!
//! Wires the pipeline together and owns the state the UI sinks read:
//!
//! ```text
//! platform batch → IntersectionSource → ActiveSectionResolver → guard → ActiveSection → subscribers
//! scroll metrics → ScrollProgressEstimator (frame-throttled)
//!               └→ bottom-of-page rule
//! nav click      → ActiveSection (optimistic) + guard → ScrollCommand for the host
//! ```
//!
//! Single-threaded and event-driven. The host calls `tick` whenever
//! `next_wakeup` comes due; nothing here spawns timers of its own.

use crate::clock::{Clock, Timestamp};
use crate::config::{TrackerConfig, ViewportSettings};
use crate::error::TrackerError;
use crate::sections::SectionLayout;
use crate::state::{ActiveSection, DrawerState, SubscriptionId};
use crate::tracking::guard::ProgrammaticScrollGuard;
use crate::tracking::intersection::{
    IntersectionPlatform, IntersectionSource, ObservationStatus, ObserverOptions, VisibilityBatch,
};
use crate::tracking::progress::{ScrollMetrics, ScrollProgressEstimator, ScrollProgressState};
use crate::tracking::resolver::ActiveSectionResolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where a navigation click came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationOrigin {
    Sidebar,
    Drawer,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// Instruction for the host to bring a section into view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollCommand {
    pub section_id: String,
    pub behavior: ScrollBehavior,
    /// Distance to keep between the section top and the viewport top
    pub offset_px: f64,
}

pub struct SectionTracker<P: IntersectionPlatform, C: Clock> {
    layout: Arc<SectionLayout>,
    source: IntersectionSource<P>,
    observer_options: ObserverOptions,
    resolver: ActiveSectionResolver,
    guard: ProgrammaticScrollGuard,
    active: ActiveSection,
    progress: ScrollProgressEstimator,
    drawer: DrawerState,
    clock: C,
    viewport: ViewportSettings,
    status: ObservationStatus,
    last_scroll: Option<ScrollMetrics>,
    viewport_width: Option<f64>,
    torn_down: bool,
}

impl<P: IntersectionPlatform, C: Clock> SectionTracker<P, C> {
    /// Build a tracker; nothing is observed until `start`
    pub fn new(platform: Option<P>, clock: C, config: &TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;

        let layout = Arc::new(config.layout()?);
        Ok(Self {
            source: IntersectionSource::new(platform),
            observer_options: config.observer_options()?,
            resolver: ActiveSectionResolver::new(Arc::clone(&layout), config.resolver_config()),
            guard: ProgrammaticScrollGuard::new(config.grace_period()),
            active: ActiveSection::new(Arc::clone(&layout)),
            progress: ScrollProgressEstimator::new(config.viewport.back_to_top_threshold_px),
            drawer: DrawerState::new(),
            clock,
            viewport: config.viewport.clone(),
            status: ObservationStatus::Unavailable,
            last_scroll: None,
            viewport_width: None,
            torn_down: false,
            layout,
        })
    }

    /// Register the section anchors with the platform
    pub fn start(&mut self) -> ObservationStatus {
        if self.torn_down {
            return ObservationStatus::Unavailable;
        }
        self.status = self.source.observe(&self.layout, &self.observer_options);
        self.resolver.restrict_to(self.source.observed());
        self.status.clone()
    }

    /// Platform callback; returns the newly active section, if any
    pub fn on_visibility_batch(&mut self, batch: VisibilityBatch) -> Option<String> {
        if self.torn_down {
            return None;
        }
        let batch = self.source.forward(batch)?;
        let now = self.clock.now();
        let emission = self.resolver.accept(batch, self.last_scroll.as_ref(), now);
        self.apply(emission, now)
    }

    /// Record scroll metrics; may activate the last section at the page bottom
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Option<String> {
        if self.torn_down {
            return None;
        }
        self.last_scroll = Some(metrics);
        self.progress.on_scroll(metrics);

        let now = self.clock.now();
        let emission = self.resolver.accept_scroll(&metrics);
        self.apply(emission, now)
    }

    /// Display refresh; returns the progress state when it changed
    pub fn on_animation_frame(&mut self) -> Option<ScrollProgressState> {
        if self.torn_down {
            return None;
        }
        self.progress.on_animation_frame()
    }

    /// Crossing into desktop width closes the drawer
    pub fn on_viewport_resize(&mut self, width: f64) {
        if self.torn_down {
            return;
        }
        self.viewport_width = Some(width);
        if !self.is_mobile() && self.drawer.close() {
            tracing::debug!("Closed navigation drawer on resize to {}px", width);
        }
    }

    /// Timer callback: expire the guard and flush a due debounce buffer
    pub fn tick(&mut self) -> Option<String> {
        if self.torn_down {
            return None;
        }
        let now = self.clock.now();
        self.guard.release_if_expired(now);
        let emission = self.resolver.poll(now, self.last_scroll.as_ref());
        self.apply(emission, now)
    }

    /// Earliest time `tick` has work to do
    pub fn next_wakeup(&self) -> Option<Timestamp> {
        if self.torn_down {
            return None;
        }
        match (self.resolver.pending_deadline(), self.guard.expires_at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Navigation click
    ///
    /// The section becomes active at once and observer updates are held off
    /// for the grace period. After `teardown` only the command is produced.
    pub fn navigate_to(&mut self, section_id: &str, origin: NavigationOrigin) -> Result<ScrollCommand, TrackerError> {
        if !self.layout.contains(section_id) {
            return Err(TrackerError::UnknownSection(section_id.to_string()));
        }
        let offset_px = if self.is_mobile() {
            self.viewport.mobile_header_offset_px
        } else {
            0.0
        };
        let command = ScrollCommand {
            section_id: section_id.to_string(),
            behavior: ScrollBehavior::Smooth,
            offset_px,
        };
        if self.torn_down {
            return Ok(command);
        }

        let now = self.clock.now();
        self.active.set(section_id)?;
        self.resolver.discard_pending();
        self.resolver.acknowledge(section_id);
        self.guard.engage(section_id, now);
        if origin == NavigationOrigin::Drawer {
            self.drawer.close();
        }
        tracing::debug!("Navigating to '{}' from {:?}", section_id, origin);
        Ok(command)
    }

    /// Back-to-top button
    pub fn scroll_to_top(&mut self) -> ScrollCommand {
        let first = self.layout.first().id.clone();
        if !self.torn_down {
            let now = self.clock.now();
            if let Err(e) = self.active.set(&first) {
                tracing::warn!("Failed to activate first section: {}", e);
            }
            self.resolver.discard_pending();
            self.resolver.acknowledge(&first);
            self.guard.engage(&first, now);
        }
        ScrollCommand {
            section_id: first,
            behavior: ScrollBehavior::Smooth,
            offset_px: 0.0,
        }
    }

    pub fn active_section(&self) -> &str {
        self.active.current()
    }

    /// The callback receives the current id immediately, then every change
    pub fn subscribe_active<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&String) + 'static,
    {
        self.active.subscribe(callback)
    }

    pub fn unsubscribe_active(&mut self, id: SubscriptionId) -> bool {
        self.active.unsubscribe(id)
    }

    pub fn progress(&self) -> ScrollProgressState {
        self.progress.state()
    }

    pub fn show_back_to_top(&self) -> bool {
        self.progress.show_back_to_top()
    }

    pub fn drawer(&self) -> &DrawerState {
        &self.drawer
    }

    pub fn drawer_mut(&mut self) -> &mut DrawerState {
        &mut self.drawer
    }

    pub fn layout(&self) -> &SectionLayout {
        &self.layout
    }

    pub fn status(&self) -> &ObservationStatus {
        &self.status
    }

    /// Whether observer updates are currently held off by a navigation
    pub fn is_navigating(&self) -> bool {
        self.guard
            .expires_at()
            .is_some_and(|expires| self.clock.now() < expires)
    }

    pub fn source(&self) -> &IntersectionSource<P> {
        &self.source
    }

    /// Release everything; later events are ignored
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.source.disconnect();
        self.resolver.discard_pending();
        self.guard.clear();
        self.progress.cancel_pending();
        self.active.clear_subscribers();
        self.drawer.clear_subscribers();
        self.status = ObservationStatus::Unavailable;
        self.torn_down = true;
        tracing::debug!("Section tracker torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn is_mobile(&self) -> bool {
        self.viewport_width
            .is_some_and(|w| w < self.viewport.desktop_breakpoint_px)
    }

    /// Gate a resolver emission through the guard and commit it
    fn apply(&mut self, emission: Option<String>, now: Timestamp) -> Option<String> {
        let id = emission?;
        let Some(id) = self.guard.filter(Some(id), now) else {
            // keep the resolver in sync so the same winner can emit after the guard
            self.resolver.acknowledge(self.active.current());
            return None;
        };
        match self.active.set(&id) {
            Ok(true) => Some(id),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!("Resolver produced an unknown section: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::tracking::intersection::test_support::FakePlatform;
    use crate::tracking::intersection::VisibilityObservation;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn config(ids: &[&str]) -> TrackerConfig {
        let mut config = TrackerConfig::eager();
        config.sections = Some(ids.iter().map(|s| s.to_string()).collect());
        config
    }

    fn visible(id: &str, ratio: f64, top: f64, height: f64) -> VisibilityObservation {
        VisibilityObservation::new(id, true, ratio, top, height)
    }

    fn tracker<'a>(ids: &[&str], clock: &'a ManualClock) -> SectionTracker<FakePlatform, &'a ManualClock> {
        let mut t = SectionTracker::new(Some(FakePlatform::with_anchors(ids)), clock, &config(ids)).unwrap();
        assert!(t.start().is_active());
        t
    }

    #[test]
    fn test_single_intersecting_section_becomes_active() {
        let clock = ManualClock::new();
        let mut t = tracker(&["a", "b", "c"], &clock);
        assert_eq!(t.active_section(), "a");

        assert_eq!(t.on_visibility_batch(vec![visible("b", 0.4, 100.0, 500.0)]), Some("b".to_string()));
        assert_eq!(t.active_section(), "b");

        // empty or non-intersecting batches hold state
        assert_eq!(t.on_visibility_batch(vec![]), None);
        assert_eq!(t.on_visibility_batch(vec![VisibilityObservation::hidden("b")]), None);
        assert_eq!(t.active_section(), "b");
    }

    #[test]
    fn test_navigation_suppresses_observer_for_grace_period() {
        let clock = ManualClock::new();
        let mut t = tracker(&["a", "b", "c", "d"], &clock);

        let cmd = t.navigate_to("d", NavigationOrigin::Sidebar).unwrap();
        assert_eq!(cmd.section_id, "d");
        assert_eq!(cmd.behavior, ScrollBehavior::Smooth);
        assert_eq!(t.active_section(), "d");
        assert!(t.is_navigating());
        assert_eq!(t.next_wakeup(), Some(Timestamp::from_millis(800)));

        // sections scrolled past during the animation
        clock.advance(Duration::from_millis(200));
        assert_eq!(t.on_visibility_batch(vec![visible("b", 1.0, 0.0, 400.0)]), None);
        clock.advance(Duration::from_millis(300));
        assert_eq!(t.on_visibility_batch(vec![visible("c", 1.0, 0.0, 400.0)]), None);
        assert_eq!(t.active_section(), "d");

        clock.advance(Duration::from_millis(300));
        assert_eq!(t.tick(), None);
        assert!(!t.is_navigating());

        // the observer drives state again, including a previously suppressed winner
        assert_eq!(t.on_visibility_batch(vec![visible("c", 1.0, 0.0, 400.0)]), Some("c".to_string()));
    }

    #[test]
    fn test_unknown_navigation_target() {
        let clock = ManualClock::new();
        let mut t = tracker(&["a", "b"], &clock);
        assert_eq!(
            t.navigate_to("nope", NavigationOrigin::Content),
            Err(TrackerError::UnknownSection("nope".to_string()))
        );
        assert_eq!(t.active_section(), "a");
        assert!(!t.is_navigating());
    }

    #[test]
    fn test_drawer_navigation_on_mobile() {
        let clock = ManualClock::new();
        let mut t = tracker(&["a", "b"], &clock);
        t.on_viewport_resize(390.0);
        t.drawer_mut().open();

        let cmd = t.navigate_to("b", NavigationOrigin::Drawer).unwrap();
        assert_relative_eq!(cmd.offset_px, 80.0);
        assert!(!t.drawer().is_open());

        // sidebar clicks leave the drawer alone
        t.drawer_mut().open();
        t.navigate_to("a", NavigationOrigin::Sidebar).unwrap();
        assert!(t.drawer().is_open());

        t.on_viewport_resize(1280.0);
        assert!(!t.drawer().is_open());
        let cmd = t.navigate_to("b", NavigationOrigin::Sidebar).unwrap();
        assert_relative_eq!(cmd.offset_px, 0.0);
    }

    #[test]
    fn test_bottom_of_page_on_scroll() {
        let clock = ManualClock::new();
        let mut t = tracker(&["a", "b", "c"], &clock);

        assert_eq!(t.on_scroll(ScrollMetrics::new(500.0, 3000.0, 900.0)), None);
        assert_eq!(t.on_scroll(ScrollMetrics::new(2050.0, 3000.0, 900.0)), Some("c".to_string()));

        // a stale batch near the bottom still resolves to the last section
        assert_eq!(t.on_visibility_batch(vec![visible("b", 0.3, -200.0, 800.0)]), None);
        assert_eq!(t.active_section(), "c");
    }

    #[test]
    fn test_bottom_of_page_skips_missing_last_anchor() {
        let clock = ManualClock::new();
        let ids = ["a", "b", "contact"];
        let mut t = SectionTracker::new(Some(FakePlatform::with_anchors(&["a", "b"])), &clock, &config(&ids)).unwrap();
        assert_eq!(
            t.start(),
            ObservationStatus::Active { observed: 2, skipped: vec!["contact".to_string()] }
        );

        assert_eq!(t.on_scroll(ScrollMetrics::new(2950.0, 4000.0, 1000.0)), Some("b".to_string()));
        assert_eq!(t.active_section(), "b");
    }

    #[test]
    fn test_short_page_does_not_pin_last_section() {
        let clock = ManualClock::new();
        let mut t = tracker(&["a", "b", "c"], &clock);

        assert_eq!(t.on_visibility_batch(vec![visible("b", 1.0, 0.0, 300.0)]), Some("b".to_string()));
        // no overflow, so the bottom rule stays out of the way
        assert_eq!(t.on_scroll(ScrollMetrics::new(0.0, 800.0, 900.0)), None);
        assert_eq!(t.on_visibility_batch(vec![visible("a", 1.0, 0.0, 300.0)]), Some("a".to_string()));
        assert_eq!(t.active_section(), "a");
    }

    #[test]
    fn test_progress_is_frame_throttled() {
        let clock = ManualClock::new();
        let mut t = tracker(&["a", "b"], &clock);

        t.on_scroll(ScrollMetrics::new(100.0, 1100.0, 100.0));
        t.on_scroll(ScrollMetrics::new(500.0, 1100.0, 100.0));
        let state = t.on_animation_frame().unwrap();
        assert_relative_eq!(state.ratio, 0.5, epsilon = 0.0001);
        assert!(t.show_back_to_top());
        assert_eq!(t.on_animation_frame(), None);
    }

    #[test]
    fn test_debounced_flush_via_tick() {
        let clock = ManualClock::new();
        let mut cfg = TrackerConfig::default();
        cfg.sections = Some(vec!["a".into(), "b".into(), "c".into()]);
        let mut t = SectionTracker::new(Some(FakePlatform::with_anchors(&["a", "b", "c"])), &clock, &cfg).unwrap();
        t.start();

        assert_eq!(t.on_visibility_batch(vec![visible("b", 0.5, 50.0, 400.0)]), None);
        clock.advance(Duration::from_millis(40));
        assert_eq!(t.on_visibility_batch(vec![visible("c", 0.9, 10.0, 400.0)]), None);
        assert_eq!(t.next_wakeup(), Some(Timestamp::from_millis(100)));

        clock.advance(Duration::from_millis(59));
        assert_eq!(t.tick(), None);
        clock.advance(Duration::from_millis(1));
        assert_eq!(t.tick(), Some("c".to_string()));
        assert_eq!(t.next_wakeup(), None);
    }

    #[test]
    fn test_teardown_stops_updates() {
        let clock = ManualClock::new();
        let mut t = tracker(&["a", "b"], &clock);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        t.subscribe_active(move |id| sink.borrow_mut().push(id.clone()));

        t.navigate_to("b", NavigationOrigin::Sidebar).unwrap();
        t.teardown();
        assert!(t.is_torn_down());
        assert!(!t.source().is_connected());
        assert!(t.source().platform().unwrap().connected.is_empty());
        assert_eq!(t.next_wakeup(), None);

        clock.advance(Duration::from_secs(2));
        assert_eq!(t.on_visibility_batch(vec![visible("a", 1.0, 0.0, 100.0)]), None);
        assert_eq!(t.on_scroll(ScrollMetrics::new(0.0, 100.0, 100.0)), None);
        assert_eq!(t.tick(), None);
        assert_eq!(t.active_section(), "b");
        assert_eq!(*seen.borrow(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_platform_unavailable_is_a_noop() {
        let clock = ManualClock::new();
        let mut t: SectionTracker<FakePlatform, _> = SectionTracker::new(None, &clock, &config(&["a", "b"])).unwrap();
        assert_eq!(t.start(), ObservationStatus::Unavailable);
        assert_eq!(t.on_visibility_batch(vec![visible("b", 1.0, 0.0, 100.0)]), None);
        assert_eq!(t.active_section(), "a");

        // navigation keeps working without the observer
        t.navigate_to("b", NavigationOrigin::Content).unwrap();
        assert_eq!(t.active_section(), "b");
    }

    #[test]
    fn test_scroll_to_top() {
        let clock = ManualClock::new();
        let mut t = tracker(&["a", "b"], &clock);
        t.navigate_to("b", NavigationOrigin::Sidebar).unwrap();
        clock.advance(Duration::from_secs(1));

        let cmd = t.scroll_to_top();
        assert_eq!(cmd.section_id, "a");
        assert_relative_eq!(cmd.offset_px, 0.0);
        assert_eq!(t.active_section(), "a");
        assert!(t.is_navigating());
    }
}
