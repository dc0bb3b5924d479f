//! Active-section tracking pipeline
//!
//! - `intersection`: platform visibility source and observer options
//! - `resolver`: reduces observation batches to one active section
//! - `progress`: frame-throttled scroll progress
//! - `guard`: holds off observer updates during programmatic scrolls
//! - `tracker`: wires the above to the state containers
//! - `replay`: drives a tracker from a recorded trace

pub mod intersection;
pub mod resolver;
pub mod progress;
pub mod guard;
pub mod tracker;
pub mod replay;

pub use intersection::{
    IntersectionPlatform, IntersectionSource, MarginValue, ObservationStatus, ObserverId, ObserverOptions,
    RootMargin, VisibilityBatch, VisibilityObservation,
};
pub use resolver::{score_observation, ActiveSectionResolver, ResolutionMode, ResolverConfig, ScoreWeights};
pub use progress::{scroll_ratio, ScrollMetrics, ScrollProgressEstimator, ScrollProgressState};
pub use guard::{ProgrammaticScrollGuard, SuppressionFlag};
pub use tracker::{NavigationOrigin, ScrollBehavior, ScrollCommand, SectionTracker};
pub use replay::{parse_trace, replay, ReplayPlatform, ReplayReport, TraceEvent, Transition, TransitionCause};
