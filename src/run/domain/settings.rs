//! Typed view of the report pipeline's settings document.
//!
//! Only the platform scope, report mode, and schedule flag are typed. Every
//! other key is carried through untouched.

use crate::task::domain::ReportMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or writing the settings document.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The document is not valid TOML or has an unexpected shape.
    #[error("settings document is malformed: {0}")]
    Parse(#[from] toml::de::Error),
    /// The document could not be serialised.
    #[error("settings document could not be written: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Settings document shared with the report pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Platform scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<PlatformSettings>,
    /// Report options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportSettings>,
    /// Recurring schedule options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleSettings>,
    /// Untyped keys.
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// `[platforms]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Configured platform sources.
    #[serde(default)]
    pub sources: Vec<PlatformSource>,
    /// Untyped keys.
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// One `[[platforms.sources]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSource {
    /// Platform identifier.
    pub id: String,
    /// Untyped keys such as the display name.
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// `[report]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Report mode name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Untyped keys.
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// `[schedule]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Whether recurring runs may fire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Untyped keys.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl WatchSettings {
    /// Parses a settings document. Empty text yields default settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] for malformed documents.
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Serialises the settings document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Render`] when serialisation fails.
    pub fn render(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string(self)?)
    }

    /// Narrows the platform scope, sets the report mode, and disables the
    /// recurring schedule for one run.
    ///
    /// An empty `scope` leaves the platform list untouched. Returns the
    /// number of platforms in effect afterwards.
    pub fn apply_run_override(&mut self, scope: &[String], report_mode: ReportMode) -> usize {
        if let Some(platforms) = self.platforms.as_mut().filter(|_| !scope.is_empty()) {
            platforms
                .sources
                .retain(|source| scope.iter().any(|id| *id == source.id));
        }
        self.report.get_or_insert_with(ReportSettings::default).mode =
            Some(report_mode.as_str().to_owned());
        self.schedule
            .get_or_insert_with(ScheduleSettings::default)
            .enabled = Some(false);
        self.platform_count()
    }

    /// Returns the number of configured platforms.
    #[must_use]
    pub fn platform_count(&self) -> usize {
        self.platforms
            .as_ref()
            .map_or(0, |platforms| platforms.sources.len())
    }

    /// Returns the configured report mode name, if any.
    #[must_use]
    pub fn report_mode(&self) -> Option<&str> {
        self.report.as_ref().and_then(|report| report.mode.as_deref())
    }

    /// Returns the schedule flag, if set.
    #[must_use]
    pub fn schedule_enabled(&self) -> Option<bool> {
        self.schedule.as_ref().and_then(|schedule| schedule.enabled)
    }
}
