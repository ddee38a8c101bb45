//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_runtime;

pub use schema_runtime::*;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub screenshot: ScreenshotConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where to find Chrome, and how to start it when nothing is listening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Remote debugging port.
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    /// Launch a local Chrome if the debug port is not answering.
    #[serde(default = "default_true")]
    pub launch: bool,

    #[serde(default)]
    pub headless: bool,

    /// Persistent profile directory for a launched Chrome.
    #[serde(default = "default_profile_dir")]
    pub profile_dir: String,

    /// Chrome executable. Searched in well-known locations when unset.
    #[serde(default)]
    pub chrome_path: Option<String>,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

impl BrowserConfig {
    /// The HTTP endpoint Chrome serves `/json/version` on.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.debug_port)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            debug_port: default_debug_port(),
            launch: default_true(),
            headless: false,
            profile_dir: default_profile_dir(),
            chrome_path: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_debug_port() -> u16 {
    9222
}

fn default_profile_dir() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("pagepilot").join("chrome-profile"))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "~/.pagepilot/chrome-profile".to_string())
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    800
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
