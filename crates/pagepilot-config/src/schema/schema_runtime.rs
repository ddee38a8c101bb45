//! Timing, screenshot and logging configuration.

use serde::{Deserialize, Serialize};

/// Delays used by page actions and the orchestrator, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause after showing the click indicator, before the click fires.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Gap between the single-click sequences of a double or triple click.
    #[serde(default = "default_inter_click_delay_ms")]
    pub inter_click_delay_ms: u64,

    /// How long the key-press toast stays visible.
    #[serde(default = "default_key_indicator_hide_ms")]
    pub key_indicator_hide_ms: u64,

    /// Upper bound on waiting for a navigated tab to finish loading.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            inter_click_delay_ms: default_inter_click_delay_ms(),
            key_indicator_hide_ms: default_key_indicator_hide_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    400
}

fn default_inter_click_delay_ms() -> u64 {
    50
}

fn default_key_indicator_hide_ms() -> u64 {
    1000
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

/// Encoding of processed screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotFormat {
    #[default]
    Webp,
    Png,
}

impl ScreenshotFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ScreenshotFormat::Webp => "image/webp",
            ScreenshotFormat::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    #[serde(default)]
    pub format: ScreenshotFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines on stderr.
    #[serde(default)]
    pub json: bool,

    /// Directory for daily rolling log files.
    #[serde(default)]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            dir: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
