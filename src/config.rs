//! TOML configuration for the jobscout daemon.
//!
//! The file lives at `~/.config/jobscout/config.toml` (overridable with the
//! `JOBSCOUT_CONFIG` env var); a missing file means all defaults. Drivers
//! never read this struct directly: filter values are seeded into the
//! settings store at startup and read back through the `JobStore` contract,
//! so a UI shell can change them at runtime without touching the file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierSettings, Industry, JobCategory};
use crate::models::Platform;

fn default_true() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_element_timeout() -> u64 {
    10
}

fn default_endpoint() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_min_interval_ms() -> u64 {
    6000
}

fn default_min_content_len() -> usize {
    400
}

fn default_classifier_timeout() -> u64 {
    120
}

fn default_stale_after_days() -> u32 {
    7
}

fn default_platform_cooldown() -> u64 {
    30
}

fn default_cycle_cooldown() -> u64 {
    600
}

fn default_query() -> String {
    "software engineer".to_string()
}

fn default_max_pages() -> u32 {
    15
}

/// `[browser]` section. Shared by the session controller and every driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Explicit Chrome binary. When unset, discovery tries the `CHROME` env
    /// var, a PATH lookup, then a fixed list of install locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
    /// DevTools websocket URL of an already-running browser. Overridden by
    /// `JOBSCOUT_BROWSER_URL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_element_timeout")]
    pub element_timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            remote_url: None,
            navigation_timeout_secs: default_navigation_timeout(),
            element_timeout_secs: default_element_timeout(),
        }
    }
}

/// `[classifier]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
    /// Free-text industry names, folded into the taxonomy on load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_industries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_categories: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            min_interval_ms: default_min_interval_ms(),
            min_content_len: default_min_content_len(),
            timeout_secs: default_classifier_timeout(),
            blocked_industries: Vec::new(),
            blocked_categories: Vec::new(),
        }
    }
}

impl ClassifierConfig {
    pub fn to_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            min_interval: Duration::from_millis(self.min_interval_ms),
            min_content_len: self.min_content_len,
            blocked_industries: self
                .blocked_industries
                .iter()
                .map(|name| Industry::from_text(name))
                .collect(),
            blocked_categories: self
                .blocked_categories
                .iter()
                .map(|name| JobCategory::from_text(name))
                .collect(),
            ..ClassifierSettings::default()
        }
    }
}

/// `[filters]` section: seed values for the settings store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_salary_annual: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_salary_monthly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_salary_hourly: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_domains: Vec<String>,
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: u32,
}

/// `[schedule]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Pause between platforms within one cycle.
    #[serde(default = "default_platform_cooldown")]
    pub platform_cooldown_secs: u64,
    /// Pause between full cycles.
    #[serde(default = "default_cycle_cooldown")]
    pub cycle_cooldown_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            platform_cooldown_secs: default_platform_cooldown(),
            cycle_cooldown_secs: default_cycle_cooldown(),
        }
    }
}

/// One `[platforms.<name>]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Cookie-set JSON files imported into the store at startup, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookie_files: Vec<PathBuf>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            query: default_query(),
            max_pages: default_max_pages(),
            cookie_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobScoutConfig {
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub platforms: HashMap<String, PlatformConfig>,
}

impl JobScoutConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Per-platform section, or defaults when the file has none.
    pub fn platform(&self, platform: Platform) -> PlatformConfig {
        self.platforms
            .get(platform.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Enabled platforms in the fixed scheduling order. A platform with no
    /// section counts as enabled.
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .iter()
            .copied()
            .filter(|p| self.platform(*p).enabled)
            .collect()
    }
}

/// Config file location: `JOBSCOUT_CONFIG` env override, then the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("JOBSCOUT_CONFIG") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobscout")
        .join("config.toml")
}
