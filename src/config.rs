//! Configuration
//!
//! `TrackerConfig` collects every tunable of the tracker (scoring constants,
//! bottom tolerance, debounce window, grace period, viewport breakpoints).
//! The values are empirical; any of them can be overridden from a JSON file.
//!
//! `RelayConfig` holds the contact relay settings, read from the environment.

use crate::error::TrackerError;
use crate::sections::SectionLayout;
use crate::tracking::intersection::{ObserverOptions, RootMargin};
use crate::tracking::resolver::{ResolutionMode, ResolverConfig, ScoreWeights};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverSettings {
    pub thresholds: Vec<f64>,
    pub root_margin: String,
}

impl Default for ObserverSettings {
    fn default() -> Self {
        let fine = ObserverOptions::fine_grained();
        Self {
            thresholds: fine.thresholds().to_vec(),
            root_margin: fine.root_margin.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub weights: ScoreWeights,
    pub bottom_tolerance_px: f64,
    /// `None` resolves every batch eagerly
    pub debounce_ms: Option<u64>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            bottom_tolerance_px: 60.0,
            debounce_ms: Some(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    pub grace_period_ms: u64,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self { grace_period_ms: 800 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub back_to_top_threshold_px: f64,
    /// Fixed mobile header height compensated when jumping to a section
    pub mobile_header_offset_px: f64,
    /// Widths at or above this use the desktop sidebar
    pub desktop_breakpoint_px: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            back_to_top_threshold_px: 300.0,
            mobile_header_offset_px: 80.0,
            desktop_breakpoint_px: 1024.0,
        }
    }
}

/// All tracker tunables
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Section ids in navigation order; the portfolio layout when absent
    pub sections: Option<Vec<String>>,
    pub observer: ObserverSettings,
    pub resolver: ResolverSettings,
    pub guard: GuardSettings,
    pub viewport: ViewportSettings,
}

impl TrackerConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tracker config: {:?}", path))?;

        let config: TrackerConfig = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse tracker config JSON")?;

        config
            .validate()
            .with_context(|| format!("Invalid tracker config: {:?}", path))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        self.observer_options()?;
        self.layout()?;

        let w = &self.resolver.weights;
        if !(w.area_divisor > 0.0) || !(w.proximity_offset > 0.0) || !(w.proximity_numerator >= 0.0) {
            return Err(TrackerError::InvalidConfig(
                "score weights must be positive (proximity numerator may be zero)".to_string(),
            ));
        }
        if !(self.resolver.bottom_tolerance_px >= 0.0) {
            return Err(TrackerError::InvalidConfig("bottom tolerance must be >= 0".to_string()));
        }
        if self.resolver.debounce_ms == Some(0) {
            return Err(TrackerError::InvalidConfig(
                "debounce window must be > 0 ms; use null for eager resolution".to_string(),
            ));
        }
        if self.guard.grace_period_ms == 0 {
            return Err(TrackerError::InvalidConfig("grace period must be > 0 ms".to_string()));
        }
        let v = &self.viewport;
        if !(v.mobile_header_offset_px >= 0.0) || !(v.desktop_breakpoint_px > 0.0) || !(v.back_to_top_threshold_px >= 0.0) {
            return Err(TrackerError::InvalidConfig("viewport settings must be non-negative".to_string()));
        }
        Ok(())
    }

    pub fn observer_options(&self) -> Result<ObserverOptions, TrackerError> {
        let margin: RootMargin = self.observer.root_margin.parse()?;
        ObserverOptions::new(self.observer.thresholds.clone(), margin)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        let mode = match self.resolver.debounce_ms {
            Some(ms) if ms > 0 => ResolutionMode::Debounced {
                window: Duration::from_millis(ms),
            },
            _ => ResolutionMode::Eager,
        };
        ResolverConfig {
            weights: self.resolver.weights,
            bottom_tolerance_px: self.resolver.bottom_tolerance_px,
            mode,
        }
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.guard.grace_period_ms)
    }

    pub fn layout(&self) -> Result<SectionLayout, TrackerError> {
        match &self.sections {
            Some(ids) => SectionLayout::from_ids(ids.iter().cloned()),
            None => Ok(SectionLayout::portfolio()),
        }
    }

    /// Defaults with eager resolution
    pub fn eager() -> Self {
        let mut config = Self::default();
        config.resolver.debounce_ms = None;
        config
    }
}

// ============================================================================
// Contact relay
// ============================================================================

/// Contact relay settings
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub port: u16,
    /// Mailbox receiving contact messages
    pub recipient: String,
    /// Sender address used on outgoing mail
    pub from_address: String,
    pub from_name: String,
    /// HTTP mail API endpoint; messages are only logged when absent
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    /// Window in which an identical submission is not sent again
    pub dedup_ttl: Duration,
}

impl RelayConfig {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup` (an environment stand-in)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(p) => p.parse().with_context(|| format!("Invalid PORT: {}", p))?,
            None => 3000,
        };

        let recipient = get("CONTACT_RECIPIENT").context("CONTACT_RECIPIENT must be set")?;
        let from_address = get("MAIL_FROM").unwrap_or_else(|| recipient.clone());

        let dedup_ttl = match get("DEDUP_TTL_SECS") {
            Some(s) => Duration::from_secs(
                s.parse()
                    .with_context(|| format!("Invalid DEDUP_TTL_SECS: {}", s))?,
            ),
            None => Duration::from_secs(60),
        };

        Ok(Self {
            port,
            recipient,
            from_address,
            from_name: get("MAIL_FROM_NAME").unwrap_or_else(|| "Portfolio Contact".to_string()),
            mail_api_url: get("MAIL_API_URL"),
            mail_api_key: get("MAIL_API_KEY"),
            dedup_ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrackerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.layout().unwrap().len(), 8);
        assert_eq!(config.grace_period(), Duration::from_millis(800));
        assert_eq!(
            config.resolver_config().mode,
            ResolutionMode::Debounced { window: Duration::from_millis(100) }
        );
        assert_eq!(TrackerConfig::eager().resolver_config().mode, ResolutionMode::Eager);
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "sections": ["intro", "work", "contact"],
            "observer": { "thresholds": [0.6], "root_margin": "-10% 0px -70% 0px" },
            "resolver": { "bottom_tolerance_px": 40.0, "debounce_ms": null },
            "guard": { "grace_period_ms": 700 }
        }"#;
        let config: TrackerConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.layout().unwrap().last().id, "contact");
        assert_eq!(config.observer_options().unwrap().thresholds(), &[0.6]);
        assert_eq!(config.resolver_config().mode, ResolutionMode::Eager);
        assert_eq!(config.resolver.weights, ScoreWeights::default());
        assert_eq!(config.viewport.desktop_breakpoint_px, 1024.0);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = TrackerConfig::default();
        config.guard.grace_period_ms = 0;
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.observer.root_margin = "ten px".to_string();
        assert!(matches!(config.validate(), Err(TrackerError::InvalidRootMargin(_))));

        let mut config = TrackerConfig::default();
        config.sections = Some(vec![]);
        assert_eq!(config.validate(), Err(TrackerError::EmptyLayout));

        let mut config = TrackerConfig::default();
        config.resolver.weights.area_divisor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = TrackerConfig::load(Path::new("/nonexistent/tracker.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read tracker config"));
    }

    #[test]
    fn test_relay_config_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("CONTACT_RECIPIENT", "owner@example.com"),
            ("PORT", "8080"),
            ("MAIL_API_URL", "https://mail.example.com/send"),
        ]
        .into_iter()
        .collect();

        let config = RelayConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.from_address, "owner@example.com");
        assert_eq!(config.mail_api_url.as_deref(), Some("https://mail.example.com/send"));
        assert_eq!(config.dedup_ttl, Duration::from_secs(60));

        assert!(RelayConfig::from_lookup(|_| None).is_err());
        assert!(RelayConfig::from_lookup(|k| match k {
            "CONTACT_RECIPIENT" => Some("a@b.co".to_string()),
            "PORT" => Some("not-a-port".to_string()),
            _ => None,
        })
        .is_err());
    }
}
