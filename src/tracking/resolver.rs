//! Active-Section Resolver
//!
//! Reduces batches of visibility observations to a single active section id.
//!
//! Algorithm:
//! 1. Keep intersecting observations of known sections
//! 2. One candidate wins outright
//! 3. Several candidates are scored:
//!    `score = (height × ratio) / area_divisor + proximity_numerator / (|top| + proximity_offset)`
//!    The first term rewards visible area, the second rewards the section whose
//!    top edge is nearest the viewport top. Equal scores go to the earlier section.
//! 4. At the bottom of a scrollable page (within `bottom_tolerance_px`) the
//!    last observed section wins regardless of score, so short final sections
//!    stay reachable. A batch with no candidates emits nothing, bottom or not
//! 5. A winner is emitted only when it differs from the previous emission
//!
//! In debounced mode batches accumulate in a pending buffer and are resolved
//! together once the window, measured from the first buffered batch, elapses.

use crate::clock::Timestamp;
use crate::sections::SectionLayout;
use crate::tracking::intersection::{VisibilityBatch, VisibilityObservation};
use crate::tracking::progress::ScrollMetrics;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Duration;

/// Scores closer than this are treated as a tie
const SCORE_EPSILON: f64 = 1e-9;

/// Normalization constants of the tie-break score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub area_divisor: f64,
    pub proximity_numerator: f64,
    pub proximity_offset: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            area_divisor: 100.0,
            proximity_numerator: 1000.0,
            proximity_offset: 100.0,
        }
    }
}

/// Tie-break score of one observation; larger-and-closer-to-top scores higher
pub fn score_observation(obs: &VisibilityObservation, weights: &ScoreWeights) -> f64 {
    let visible_area = (obs.bounding_height * obs.intersection_ratio) / weights.area_divisor;
    let proximity = weights.proximity_numerator / (obs.bounding_top.abs() + weights.proximity_offset);
    let score = visible_area + proximity;
    if score.is_nan() {
        0.0
    } else {
        score
    }
}

/// When batches are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Resolve every batch as it arrives
    Eager,
    /// Buffer batches and resolve once per window
    Debounced { window: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    pub weights: ScoreWeights,
    pub bottom_tolerance_px: f64,
    pub mode: ResolutionMode,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            bottom_tolerance_px: 60.0,
            mode: ResolutionMode::Debounced {
                window: Duration::from_millis(100),
            },
        }
    }
}

impl ResolverConfig {
    pub fn eager() -> Self {
        Self {
            mode: ResolutionMode::Eager,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct PendingBatch {
    observations: Vec<VisibilityObservation>,
    flush_at: Timestamp,
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    id: &'a str,
    position: usize,
    score: f64,
}

/// Later observations of a section replace earlier ones
fn merge_observations(into: &mut Vec<VisibilityObservation>, batch: VisibilityBatch) {
    for obs in batch {
        match into.iter_mut().find(|o| o.section_id == obs.section_id) {
            Some(existing) => *existing = obs,
            None => into.push(obs),
        }
    }
}

/// Stateful resolver; remembers its last emission to suppress repeats
#[derive(Debug, Clone)]
pub struct ActiveSectionResolver {
    layout: Arc<SectionLayout>,
    config: ResolverConfig,
    last_emitted: Option<String>,
    pending: Option<PendingBatch>,
    /// Layout position forced at the bottom; `None` disables the rule
    bottom_position: Option<usize>,
}

impl ActiveSectionResolver {
    pub fn new(layout: Arc<SectionLayout>, config: ResolverConfig) -> Self {
        let bottom_position = Some(layout.len() - 1);
        Self {
            layout,
            config,
            last_emitted: None,
            pending: None,
            bottom_position,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Limit the bottom rule to sections actually present on the page
    pub fn restrict_to(&mut self, observed: &[String]) {
        self.bottom_position = observed.iter().filter_map(|id| self.layout.position(id)).max();
        if self.bottom_position.is_none() {
            tracing::debug!("No observed sections; bottom-of-page rule disabled");
        }
    }

    /// Section forced active at the bottom of the page
    pub fn bottom_section(&self) -> Option<&str> {
        self.bottom_position.map(|p| self.layout.at(p).id.as_str())
    }

    fn bottom_override(&self, scroll: Option<&ScrollMetrics>) -> Option<&str> {
        let metrics = scroll?;
        if metrics.is_scrollable() && metrics.is_at_bottom(self.config.bottom_tolerance_px) {
            self.bottom_section()
        } else {
            None
        }
    }

    /// Pick the winning section for a set of observations, without side effects
    pub fn resolve(&self, observations: &[VisibilityObservation], scroll: Option<&ScrollMetrics>) -> Option<&str> {
        let mut candidates: SmallVec<[Candidate; 8]> = SmallVec::new();
        for obs in observations.iter().filter(|o| o.is_intersecting) {
            let Some(position) = self.layout.position(&obs.section_id) else {
                tracing::debug!("Ignoring observation for unknown section '{}'", obs.section_id);
                continue;
            };
            candidates.push(Candidate {
                id: self.layout.at(position).id.as_str(),
                position,
                score: score_observation(obs, &self.config.weights),
            });
        }

        if candidates.is_empty() {
            return None;
        }
        if let Some(last) = self.bottom_override(scroll) {
            return Some(last);
        }

        match candidates.len() {
            1 => Some(candidates[0].id),
            _ => {
                candidates.sort_by_key(|c| c.position);
                let mut best = candidates[0];
                for c in &candidates[1..] {
                    if c.score > best.score + SCORE_EPSILON {
                        best = *c;
                    }
                }
                tracing::trace!("Resolved '{}' (score {:.2}) from {} candidates", best.id, best.score, candidates.len());
                Some(best.id)
            }
        }
    }

    /// Feed a batch; returns a new active id when one is resolved immediately
    pub fn accept(&mut self, batch: VisibilityBatch, scroll: Option<&ScrollMetrics>, now: Timestamp) -> Option<String> {
        match self.config.mode {
            ResolutionMode::Eager => {
                let mut observations = Vec::with_capacity(batch.len());
                merge_observations(&mut observations, batch);
                let winner = self.resolve(&observations, scroll).map(str::to_string);
                self.emit(winner)
            }
            ResolutionMode::Debounced { window } => {
                match self.pending.as_mut() {
                    Some(pending) => merge_observations(&mut pending.observations, batch),
                    None => {
                        let mut observations = Vec::with_capacity(batch.len());
                        merge_observations(&mut observations, batch);
                        self.pending = Some(PendingBatch {
                            observations,
                            flush_at: now.saturating_add(window),
                        });
                    }
                }
                None
            }
        }
    }

    /// Resolve the pending buffer if its window has elapsed
    pub fn poll(&mut self, now: Timestamp, scroll: Option<&ScrollMetrics>) -> Option<String> {
        let due = self.pending.as_ref().is_some_and(|p| p.flush_at <= now);
        if due {
            self.flush(scroll)
        } else {
            None
        }
    }

    /// Resolve the pending buffer now
    pub fn flush(&mut self, scroll: Option<&ScrollMetrics>) -> Option<String> {
        let pending = self.pending.take()?;
        let winner = self.resolve(&pending.observations, scroll).map(str::to_string);
        self.emit(winner)
    }

    /// Bottom-of-page rule on a plain scroll event
    pub fn accept_scroll(&mut self, metrics: &ScrollMetrics) -> Option<String> {
        let last = self.bottom_override(Some(metrics)).map(str::to_string);
        self.emit(last)
    }

    pub fn pending_deadline(&self) -> Option<Timestamp> {
        self.pending.as_ref().map(|p| p.flush_at)
    }

    /// Align the repeat filter with the section actually shown
    pub fn acknowledge(&mut self, id: &str) {
        if self.last_emitted.as_deref() != Some(id) {
            self.last_emitted = Some(id.to_string());
        }
    }

    pub fn discard_pending(&mut self) {
        self.pending = None;
    }

    pub fn last_emitted(&self) -> Option<&str> {
        self.last_emitted.as_deref()
    }

    fn emit(&mut self, winner: Option<String>) -> Option<String> {
        let winner = winner?;
        if self.last_emitted.as_deref() == Some(winner.as_str()) {
            return None;
        }
        self.last_emitted = Some(winner.clone());
        Some(winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layout(ids: &[&str]) -> Arc<SectionLayout> {
        Arc::new(SectionLayout::from_ids(ids.iter().copied()).unwrap())
    }

    fn obs(id: &str, ratio: f64, top: f64, height: f64) -> VisibilityObservation {
        VisibilityObservation::new(id, true, ratio, top, height)
    }

    #[test]
    fn test_score_formula() {
        let w = ScoreWeights::default();
        // (600 × 0.8) / 100 + 1000 / 110
        assert_relative_eq!(score_observation(&obs("b", 0.8, 10.0, 600.0), &w), 4.8 + 1000.0 / 110.0, epsilon = 1e-9);
        // (200 × 0.2) / 100 + 1000 / 590
        assert_relative_eq!(score_observation(&obs("c", 0.2, 490.0, 200.0), &w), 0.4 + 1000.0 / 590.0, epsilon = 1e-9);
        // Negative top counts by distance
        assert_relative_eq!(
            score_observation(&obs("x", 0.5, -90.0, 100.0), &w),
            score_observation(&obs("x", 0.5, 90.0, 100.0), &w),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_single_candidate_wins() {
        let r = ActiveSectionResolver::new(layout(&["a", "b", "c"]), ResolverConfig::eager());
        let batch = vec![
            VisibilityObservation::hidden("a"),
            obs("c", 0.05, 900.0, 50.0),
        ];
        assert_eq!(r.resolve(&batch, None), Some("c"));
    }

    #[test]
    fn test_no_candidates_no_emission() {
        let mut r = ActiveSectionResolver::new(layout(&["a", "b"]), ResolverConfig::eager());
        let batch = vec![VisibilityObservation::hidden("a"), VisibilityObservation::hidden("b")];
        assert_eq!(r.accept(batch, None, Timestamp::ZERO), None);
        assert_eq!(r.accept(Vec::new(), None, Timestamp::ZERO), None);
        assert_eq!(r.last_emitted(), None);
    }

    #[test]
    fn test_area_and_proximity_tie_break() {
        let r = ActiveSectionResolver::new(layout(&["a", "b", "c"]), ResolverConfig::eager());
        let batch = vec![obs("b", 0.8, 10.0, 600.0), obs("c", 0.2, 490.0, 200.0)];
        assert_eq!(r.resolve(&batch, None), Some("b"));
    }

    #[test]
    fn test_equal_scores_prefer_navigation_order() {
        let r = ActiveSectionResolver::new(layout(&["a", "b", "c"]), ResolverConfig::eager());
        // Batch order reversed on purpose
        let batch = vec![obs("c", 0.5, 200.0, 400.0), obs("b", 0.5, 200.0, 400.0)];
        assert_eq!(r.resolve(&batch, None), Some("b"));
    }

    #[test]
    fn test_bottom_forces_last_section() {
        let r = ActiveSectionResolver::new(layout(&["a", "b", "contact"]), ResolverConfig::eager());
        let batch = vec![obs("b", 1.0, 0.0, 900.0), obs("contact", 0.4, 850.0, 150.0)];
        let bottom = ScrollMetrics::new(2950.0, 4000.0, 1000.0);
        assert_eq!(r.resolve(&batch, Some(&bottom)), Some("contact"));

        let mid = ScrollMetrics::new(1200.0, 4000.0, 1000.0);
        assert_eq!(r.resolve(&batch, Some(&mid)), Some("b"));
    }

    #[test]
    fn test_bottom_never_fills_an_empty_batch() {
        let mut r = ActiveSectionResolver::new(layout(&["a", "b", "c"]), ResolverConfig::eager());
        let bottom = ScrollMetrics::new(2000.0, 3000.0, 1000.0);
        assert_eq!(r.accept(vec![VisibilityObservation::hidden("a")], Some(&bottom), Timestamp::ZERO), None);
        assert_eq!(r.accept(Vec::new(), Some(&bottom), Timestamp::ZERO), None);
        assert_eq!(r.last_emitted(), None);
    }

    #[test]
    fn test_bottom_uses_last_observed_section() {
        let mut r = ActiveSectionResolver::new(layout(&["a", "b", "contact"]), ResolverConfig::eager());
        r.restrict_to(&["a".to_string(), "b".to_string()]);
        assert_eq!(r.bottom_section(), Some("b"));

        let bottom = ScrollMetrics::new(2950.0, 4000.0, 1000.0);
        assert_eq!(r.resolve(&[obs("a", 0.2, -700.0, 900.0), obs("b", 0.1, 850.0, 150.0)], Some(&bottom)), Some("b"));
        assert_eq!(r.accept_scroll(&bottom), Some("b".to_string()));

        r.restrict_to(&[]);
        assert_eq!(r.bottom_section(), None);
        assert_eq!(r.accept_scroll(&bottom), None);
    }

    #[test]
    fn test_bottom_rule_needs_scrollable_page() {
        let mut r = ActiveSectionResolver::new(layout(&["a", "b", "c"]), ResolverConfig::eager());
        let fits = ScrollMetrics::new(0.0, 800.0, 900.0);
        assert_eq!(r.accept_scroll(&fits), None);
        assert_eq!(r.resolve(&[obs("a", 1.0, 0.0, 300.0), obs("c", 1.0, 600.0, 100.0)], Some(&fits)), Some("a"));
    }

    #[test]
    fn test_unknown_sections_ignored() {
        let r = ActiveSectionResolver::new(layout(&["a", "b"]), ResolverConfig::eager());
        let batch = vec![obs("hero", 1.0, 0.0, 2000.0), obs("a", 0.1, 700.0, 100.0)];
        assert_eq!(r.resolve(&batch, None), Some("a"));
    }

    #[test]
    fn test_repeated_winner_not_reemitted() {
        let mut r = ActiveSectionResolver::new(layout(&["a", "b"]), ResolverConfig::eager());
        assert_eq!(r.accept(vec![obs("a", 0.6, 0.0, 500.0)], None, Timestamp::ZERO), Some("a".to_string()));
        assert_eq!(r.accept(vec![obs("a", 0.9, 0.0, 500.0)], None, Timestamp::ZERO), None);
        assert_eq!(r.accept(vec![obs("b", 0.9, 0.0, 500.0)], None, Timestamp::ZERO), Some("b".to_string()));
    }

    #[test]
    fn test_debounced_buffers_until_window() {
        let config = ResolverConfig {
            mode: ResolutionMode::Debounced { window: Duration::from_millis(100) },
            ..ResolverConfig::default()
        };
        let mut r = ActiveSectionResolver::new(layout(&["a", "b", "c"]), config);

        assert_eq!(r.accept(vec![obs("a", 1.0, 0.0, 300.0)], None, Timestamp::from_millis(0)), None);
        assert_eq!(r.accept(vec![obs("b", 0.9, 40.0, 800.0)], None, Timestamp::from_millis(30)), None);
        // "a" scrolled out in a later batch of the same window
        assert_eq!(r.accept(vec![VisibilityObservation::hidden("a")], None, Timestamp::from_millis(60)), None);
        assert_eq!(r.pending_deadline(), Some(Timestamp::from_millis(100)));

        assert_eq!(r.poll(Timestamp::from_millis(99), None), None);
        assert_eq!(r.poll(Timestamp::from_millis(100), None), Some("b".to_string()));
        assert_eq!(r.pending_deadline(), None);
    }

    #[test]
    fn test_acknowledge_resets_repeat_filter() {
        let mut r = ActiveSectionResolver::new(layout(&["a", "b"]), ResolverConfig::eager());
        assert_eq!(r.accept(vec![obs("a", 1.0, 0.0, 500.0)], None, Timestamp::ZERO), Some("a".to_string()));
        r.acknowledge("b");
        assert_eq!(r.accept(vec![obs("a", 1.0, 0.0, 500.0)], None, Timestamp::ZERO), Some("a".to_string()));
    }

    #[test]
    fn test_accept_scroll_bottom_rule() {
        let mut r = ActiveSectionResolver::new(layout(&["a", "b", "c"]), ResolverConfig::eager());
        assert_eq!(r.accept_scroll(&ScrollMetrics::new(100.0, 3000.0, 1000.0)), None);
        assert_eq!(r.accept_scroll(&ScrollMetrics::new(2000.0, 3000.0, 1000.0)), Some("c".to_string()));
        assert_eq!(r.accept_scroll(&ScrollMetrics::new(2000.0, 3000.0, 1000.0)), None);
    }
}
