//! Delays used by page actions.

use std::time::Duration;

use pagepilot_config::TimingConfig;

/// Pause between showing the click ring and firing the click.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(400);
/// Gap between the single-click sequences of a multi-click.
pub const DEFAULT_INTER_CLICK_DELAY: Duration = Duration::from_millis(50);
/// Lifetime of the key-press toast.
pub const DEFAULT_KEY_INDICATOR_HIDE: Duration = Duration::from_millis(1000);
/// Longest an indicator waits for `document.body` before the action goes on
/// without it.
pub const DEFAULT_BODY_WAIT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub settle_delay: Duration,
    pub inter_click_delay: Duration,
    pub key_indicator_hide: Duration,
    pub body_wait: Duration,
}

impl Timings {
    /// All delays zero, for tests that do not care about pacing. The body
    /// wait is a bound rather than a delay and keeps its default.
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            inter_click_delay: Duration::ZERO,
            key_indicator_hide: Duration::ZERO,
            body_wait: DEFAULT_BODY_WAIT,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            inter_click_delay: DEFAULT_INTER_CLICK_DELAY,
            key_indicator_hide: DEFAULT_KEY_INDICATOR_HIDE,
            body_wait: DEFAULT_BODY_WAIT,
        }
    }
}

impl From<&TimingConfig> for Timings {
    fn from(config: &TimingConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            inter_click_delay: Duration::from_millis(config.inter_click_delay_ms),
            key_indicator_hide: Duration::from_millis(config.key_indicator_hide_ms),
            body_wait: DEFAULT_BODY_WAIT,
        }
    }
}
