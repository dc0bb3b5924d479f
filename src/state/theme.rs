//! Theme preference
//!
//! Light/dark mode as an owned, injectable container. The choice is written
//! through to a `PreferenceStore` under the `"theme"` key and restored on load.

use crate::error::PreferenceError;
use crate::state::cell::{StateCell, SubscriptionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

// ============================================================================
// Preference stores
// ============================================================================

/// Key-value persistence for user preferences
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences kept in a flat JSON object on disk
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
    /// Set when the file on disk could not be parsed and has not been rewritten yet
    malformed: bool,
}

impl JsonFilePreferenceStore {
    /// Open the store; a missing or unreadable file starts empty
    ///
    /// A malformed file is kept as-is until the first write, which moves it
    /// to `<path>.bak` before replacing it.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut malformed = false;
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed preference file {:?}: {}", path, e);
                malformed = true;
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, values, malformed }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a malformed file is moved before it is overwritten
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&self.values)?;
        if self.malformed {
            let backup = self.backup_path();
            fs::rename(&self.path, &backup)?;
            tracing::warn!("Moved malformed preference file {:?} to {:?} before rewriting", self.path, backup);
            self.malformed = false;
        }
        fs::write(&self.path, json)?;
        Ok(())
    }
}

// ============================================================================
// Theme state
// ============================================================================

pub struct ThemeState<S: PreferenceStore> {
    store: S,
    cell: StateCell<Theme>,
}

impl<S: PreferenceStore> ThemeState<S> {
    /// Restore the saved theme; missing or unknown values fall back to dark
    pub fn load(store: S) -> Self {
        let theme = store
            .get(THEME_KEY)
            .and_then(|v| v.parse::<Theme>().ok())
            .unwrap_or_default();
        Self {
            store,
            cell: StateCell::new(theme),
        }
    }

    pub fn current(&self) -> Theme {
        *self.cell.get()
    }

    /// Apply and persist; a store failure is logged and the theme still applies
    pub fn set(&mut self, theme: Theme) {
        self.cell.set(theme);
        if let Err(e) = self.store.set(THEME_KEY, theme.as_str()) {
            tracing::warn!("Failed to persist theme preference: {}", e);
        }
    }

    pub fn toggle(&mut self) -> Theme {
        let next = self.current().toggled();
        self.set(next);
        next
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Theme) + 'static,
    {
        self.cell.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.cell.unsubscribe(id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
