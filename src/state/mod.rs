//! Owned state containers read by the UI sinks
//!
//! - `cell`: observable value with subscribe/unsubscribe handles
//! - `active_section`: the current section id
//! - `theme`: light/dark preference backed by a key-value store
//! - `drawer`: mobile drawer open/closed

pub mod cell;
pub mod active_section;
pub mod theme;
pub mod drawer;

pub use cell::{StateCell, SubscriptionId};
pub use active_section::ActiveSection;
pub use theme::{Theme, ThemeState, PreferenceStore, MemoryPreferenceStore, JsonFilePreferenceStore, THEME_KEY};
pub use drawer::DrawerState;
