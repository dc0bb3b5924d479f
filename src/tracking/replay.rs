//! Trace replay
//!
//! Drives a `SectionTracker` from a recorded event log on a manual clock and
//! collects every active-section transition. Used offline to tune scoring
//! constants, tolerances and windows against real scroll sessions.
//!
//! Trace format: one JSON object per line, `#` comments and blank lines
//! ignored.
//!
//! ```text
//! {"type":"batch","at_ms":120,"observations":[{"sectionId":"about","isIntersecting":true,...}]}
//! {"type":"scroll","at_ms":130,"metrics":{"scrollTop":400,"scrollHeight":5000,"clientHeight":900}}
//! {"type":"navigate","at_ms":900,"section_id":"contact","origin":"drawer"}
//! {"type":"frame","at_ms":140}
//! {"type":"resize","at_ms":0,"width":390}
//! ```

use crate::clock::{Clock, ManualClock, Timestamp};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::tracking::intersection::{IntersectionPlatform, ObservationStatus, ObserverId, ObserverOptions, VisibilityBatch};
use crate::tracking::progress::ScrollMetrics;
use crate::tracking::tracker::{NavigationOrigin, SectionTracker};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_origin() -> NavigationOrigin {
    NavigationOrigin::Sidebar
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    Batch { at_ms: u64, observations: VisibilityBatch },
    Scroll { at_ms: u64, metrics: ScrollMetrics },
    Navigate {
        at_ms: u64,
        section_id: String,
        #[serde(default = "default_origin")]
        origin: NavigationOrigin,
    },
    Frame { at_ms: u64 },
    Resize { at_ms: u64, width: f64 },
}

impl TraceEvent {
    pub fn at_ms(&self) -> u64 {
        match self {
            TraceEvent::Batch { at_ms, .. }
            | TraceEvent::Scroll { at_ms, .. }
            | TraceEvent::Navigate { at_ms, .. }
            | TraceEvent::Frame { at_ms }
            | TraceEvent::Resize { at_ms, .. } => *at_ms,
        }
    }
}

/// What produced a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionCause {
    Observer,
    Scroll,
    Navigation,
    Timer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub at_ms: u64,
    pub section_id: String,
    pub cause: TransitionCause,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub events: usize,
    pub transitions: Vec<Transition>,
    pub final_section: String,
    pub final_progress: f64,
    /// Navigations to sections outside the layout
    pub rejected_navigations: usize,
}

/// Platform stand-in for recorded sessions: every section has an anchor
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayPlatform;

impl IntersectionPlatform for ReplayPlatform {
    fn has_anchor(&self, _section_id: &str) -> bool {
        true
    }

    fn observe(&mut self, _section_ids: &[String], _options: &ObserverOptions) -> Result<ObserverId, TrackerError> {
        Ok(ObserverId(1))
    }

    fn disconnect(&mut self, _observer: ObserverId) {}
}

/// Parse a JSON-lines trace
pub fn parse_trace(input: &str) -> Result<Vec<TraceEvent>> {
    let mut events = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(line)
            .with_context(|| format!("Invalid trace event on line {}", idx + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// Replay `events` in order; timers fire at their exact due time
pub fn replay(events: &[TraceEvent], config: &TrackerConfig) -> Result<ReplayReport, TrackerError> {
    let clock = ManualClock::new();
    let mut tracker = SectionTracker::new(Some(ReplayPlatform), &clock, config)?;
    if let ObservationStatus::Unavailable = tracker.start() {
        return Err(TrackerError::Platform("replay platform refused to observe".to_string()));
    }

    let mut transitions = Vec::new();
    let mut rejected_navigations = 0;

    for event in events {
        let at = Timestamp::from_millis(event.at_ms());
        if at < clock.now() {
            tracing::warn!("Trace event at {}ms is out of order; applying at {}ms", event.at_ms(), clock.now().as_millis());
        }
        run_timers(&mut tracker, &clock, Some(at), &mut transitions);
        clock.set(at);
        let now = clock.now().as_millis();

        let (changed, cause) = match event {
            TraceEvent::Batch { observations, .. } => {
                (tracker.on_visibility_batch(observations.clone()), TransitionCause::Observer)
            }
            TraceEvent::Scroll { metrics, .. } => (tracker.on_scroll(*metrics), TransitionCause::Scroll),
            TraceEvent::Navigate { section_id, origin, .. } => {
                let before = tracker.active_section().to_string();
                match tracker.navigate_to(section_id, *origin) {
                    Ok(_) if before != *section_id => (Some(section_id.clone()), TransitionCause::Navigation),
                    Ok(_) => (None, TransitionCause::Navigation),
                    Err(e) => {
                        tracing::warn!("Skipping navigation at {}ms: {}", now, e);
                        rejected_navigations += 1;
                        (None, TransitionCause::Navigation)
                    }
                }
            }
            TraceEvent::Frame { .. } => {
                tracker.on_animation_frame();
                (None, TransitionCause::Observer)
            }
            TraceEvent::Resize { width, .. } => {
                tracker.on_viewport_resize(*width);
                (None, TransitionCause::Observer)
            }
        };

        if let Some(section_id) = changed {
            transitions.push(Transition { at_ms: now, section_id, cause });
        }
    }
    run_timers(&mut tracker, &clock, None, &mut transitions);

    let report = ReplayReport {
        events: events.len(),
        transitions,
        final_section: tracker.active_section().to_string(),
        final_progress: tracker.progress().ratio,
        rejected_navigations,
    };
    tracker.teardown();
    Ok(report)
}

/// Fire every wake-up due up to `until` (all of them when `None`)
fn run_timers(
    tracker: &mut SectionTracker<ReplayPlatform, &ManualClock>,
    clock: &ManualClock,
    until: Option<Timestamp>,
    transitions: &mut Vec<Transition>,
) {
    while let Some(wake) = tracker.next_wakeup() {
        if until.is_some_and(|limit| wake > limit) {
            break;
        }
        clock.set(wake);
        if let Some(section_id) = tracker.tick() {
            transitions.push(Transition {
                at_ms: wake.as_millis(),
                section_id,
                cause: TransitionCause::Timer,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = r#"
# desktop session: read about, skim skills, jump to contact
{"type":"batch","at_ms":0,"observations":[{"sectionId":"about","isIntersecting":true,"intersectionRatio":1.0,"boundingTop":0,"boundingHeight":800}]}
{"type":"scroll","at_ms":400,"metrics":{"scrollTop":700,"scrollHeight":6000,"clientHeight":900}}
{"type":"batch","at_ms":420,"observations":[{"sectionId":"about","isIntersecting":true,"intersectionRatio":0.2,"boundingTop":-700,"boundingHeight":800},{"sectionId":"technical-skills","isIntersecting":true,"intersectionRatio":0.6,"boundingTop":100,"boundingHeight":900}]}
{"type":"frame","at_ms":430}
{"type":"navigate","at_ms":2000,"section_id":"contact"}
{"type":"batch","at_ms":2200,"observations":[{"sectionId":"portfolio","isIntersecting":true,"intersectionRatio":1.0,"boundingTop":0,"boundingHeight":900}]}
"#;

    #[test]
    fn test_parse_trace() {
        let events = parse_trace(TRACE).unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(events[4].at_ms(), 2000);
        assert!(matches!(
            &events[4],
            TraceEvent::Navigate { origin: NavigationOrigin::Sidebar, .. }
        ));

        let err = parse_trace("{\"type\":\"teleport\",\"at_ms\":1}").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_replay_debounced_session() {
        let events = parse_trace(TRACE).unwrap();
        let report = replay(&events, &TrackerConfig::default()).unwrap();

        let ids: Vec<(&str, TransitionCause)> = report
            .transitions
            .iter()
            .map(|t| (t.section_id.as_str(), t.cause))
            .collect();
        // "about" is already active, so its first flush changes nothing
        assert_eq!(
            ids,
            vec![
                ("technical-skills", TransitionCause::Timer),
                ("contact", TransitionCause::Navigation),
            ]
        );
        assert_eq!(report.transitions[0].at_ms, 520);
        assert_eq!(report.final_section, "contact");
        assert_eq!(report.rejected_navigations, 0);
    }

    #[test]
    fn test_replay_counts_rejected_navigation() {
        let events = vec![TraceEvent::Navigate {
            at_ms: 10,
            section_id: "blog".to_string(),
            origin: NavigationOrigin::Content,
        }];
        let report = replay(&events, &TrackerConfig::eager()).unwrap();
        assert_eq!(report.rejected_navigations, 1);
        assert!(report.transitions.is_empty());
        assert_eq!(report.final_section, "about");
    }
}
