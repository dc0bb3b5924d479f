//! Portfolio Site Core
//!
//! Client-side active-section tracking for a single-page portfolio, plus the
//! contact mail relay behind it.
//!
//! - `sections`: ordered section layout
//! - `tracking/`: intersection source, resolver, progress estimator, scroll guard, tracker
//! - `state/`: observable containers (active section, theme, drawer)
//! - `contact/`: contact form validation, composition and transports
//! - `api_server` (feature `api`): Axum contact relay

pub mod clock;
pub mod config;
pub mod contact;
pub mod error;
pub mod sections;
pub mod state;
pub mod tracking;

// API server module (only compiled with "api" feature)
#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{RelayConfig, TrackerConfig};
pub use error::{PreferenceError, TrackerError};
pub use sections::{SectionDescriptor, SectionLayout, PORTFOLIO_SECTIONS};
pub use state::{ActiveSection, DrawerState, StateCell, SubscriptionId, Theme, ThemeState};
pub use tracking::{
    NavigationOrigin, ScrollBehavior, ScrollCommand, ScrollMetrics, SectionTracker, VisibilityObservation,
};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppError, AppState};
