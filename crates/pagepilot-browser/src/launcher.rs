//! Finding, starting and stopping a local Chrome.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use pagepilot_config::{BrowserConfig, ConfigLoader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cdp::CdpClient;
use crate::error::BrowserError;

const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(200);
const STARTUP_POLL_ATTEMPTS: u32 = 30;

/// Makes sure a Chrome with remote debugging is listening on the configured
/// endpoint, starting one when allowed.
pub struct ChromeLauncher {
    config: BrowserConfig,
    child: Mutex<Option<Child>>,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            child: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> String {
        self.config.endpoint()
    }

    /// Locate the Chrome executable, preferring the configured path.
    pub fn find_chrome(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config.chrome_path {
            let path = PathBuf::from(ConfigLoader::expand_path(path));
            return path.exists().then_some(path);
        }
        Self::find_installed_chrome()
    }

    fn find_installed_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];

        #[cfg(target_os = "linux")]
        let paths: &[&str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths: &[&str] = &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let paths: &[&str] = &[];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Whether something answers `/json/version` on the endpoint.
    pub async fn is_running(&self) -> bool {
        CdpClient::browser_version(&self.endpoint()).await.is_ok()
    }

    fn command(&self, chrome: &Path) -> Command {
        let profile_dir = ConfigLoader::expand_path(&self.config.profile_dir);
        if let Err(e) = std::fs::create_dir_all(&profile_dir) {
            warn!("Failed to create profile directory {}: {}", profile_dir, e);
        }

        let mut cmd = Command::new(chrome);
        cmd.arg(format!("--remote-debugging-port={}", self.config.debug_port))
            .arg(format!("--user-data-dir={}", profile_dir))
            .arg(format!(
                "--window-size={},{}",
                self.config.viewport_width, self.config.viewport_height
            ))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if self.config.headless {
            cmd.arg("--headless=new");
        }
        cmd
    }

    /// Start Chrome. Does not wait for it to listen.
    pub async fn launch(&self) -> Result<(), BrowserError> {
        let chrome = self.find_chrome().ok_or(BrowserError::ChromeNotFound)?;
        info!("Launching Chrome at {}", chrome.display());

        let child = self
            .command(&chrome)
            .spawn()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        info!("Chrome launched with PID: {:?}", child.id());
        *self.child.lock().await = Some(child);
        Ok(())
    }

    /// Return once the endpoint answers, launching Chrome first if needed
    /// and allowed.
    pub async fn ensure_running(&self) -> Result<(), BrowserError> {
        if self.is_running().await {
            info!("Chrome already running at {}", self.endpoint());
            return Ok(());
        }
        if !self.config.launch {
            return Err(BrowserError::LaunchFailed(format!(
                "Nothing is listening at {} and launching is disabled",
                self.endpoint()
            )));
        }

        info!("Chrome not running on port {}, launching...", self.config.debug_port);
        self.launch().await?;

        for _ in 0..STARTUP_POLL_ATTEMPTS {
            tokio::time::sleep(STARTUP_POLL_INTERVAL).await;
            if self.is_running().await {
                return Ok(());
            }
        }
        Err(BrowserError::LaunchFailed(
            "Chrome failed to start within timeout".to_string(),
        ))
    }

    /// Stop Chrome if this launcher started it.
    pub async fn shutdown(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            info!("Shutting down Chrome...");
            if let Err(e) = child.kill().await {
                warn!("Failed to stop Chrome: {}", e);
            }
        }
    }
}
