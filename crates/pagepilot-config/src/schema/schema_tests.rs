use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.browser.host, "127.0.0.1");
    assert_eq!(config.browser.debug_port, 9222);
    assert!(config.browser.launch);
    assert!(!config.browser.headless);
    assert!(config.browser.chrome_path.is_none());
}

#[test]
fn test_browser_endpoint() {
    let browser = BrowserConfig {
        host: "localhost".to_string(),
        debug_port: 9333,
        ..BrowserConfig::default()
    };
    assert_eq!(browser.endpoint(), "http://localhost:9333");
}

#[test]
fn test_timing_defaults() {
    let timing = TimingConfig::default();
    assert_eq!(timing.settle_delay_ms, 400);
    assert_eq!(timing.inter_click_delay_ms, 50);
    assert_eq!(timing.key_indicator_hide_ms, 1000);
    assert_eq!(timing.navigation_timeout_ms, 30_000);
}

#[test]
fn test_screenshot_format() {
    assert_eq!(ScreenshotFormat::default(), ScreenshotFormat::Webp);
    assert_eq!(ScreenshotFormat::Webp.mime_type(), "image/webp");
    assert_eq!(ScreenshotFormat::Png.mime_type(), "image/png");
    let f: ScreenshotFormat = serde_json::from_str("\"png\"").unwrap();
    assert_eq!(f, ScreenshotFormat::Png);
}

#[test]
fn test_logging_defaults() {
    let logging = LoggingConfig::default();
    assert_eq!(logging.level, "info");
    assert!(!logging.json);
    assert!(logging.dir.is_none());
}

#[test]
fn test_config_serialization() {
    let json = serde_json::to_string(&Config::default()).unwrap();
    assert!(json.contains("127.0.0.1"));
    assert!(json.contains("9222"));
    assert!(json.contains("webp"));
}
