//! PagePilot - browser page automation for LLM tool loops.
//!
//! Main entry point for the PagePilot CLI.

mod cli;
mod session;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pagepilot_browser::{
    CdpClient, CdpTabHost, ChromeLauncher, MemoryTabHost, ToolDispatcher,
};
use pagepilot_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use pagepilot_page::Timings;
use pagepilot_protocols::{TabId, ToolContext, ToolInvocation};

use crate::cli::{CatalogFormat, Cli, Commands};

/// Initialize tracing: stderr always, plus a daily rolling file when
/// `logging.dir` is set. The returned guard flushes the file on drop.
fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    // Stdout carries tool output, so console logs go to stderr.
    let console = if config.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (file, guard) = match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("pagepilot")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)
                .context("Failed to create log file appender")?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = ConfigLoader::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);
    Ok(config)
}

/// A dispatcher wired to a running Chrome.
struct Browser {
    launcher: ChromeLauncher,
    dispatcher: ToolDispatcher,
}

impl Browser {
    async fn connect(config: &Config) -> Result<Self> {
        let launcher = ChromeLauncher::new(config.browser.clone());
        launcher.ensure_running().await?;

        let client = CdpClient::connect(&launcher.endpoint())
            .await
            .with_context(|| format!("Failed to connect to Chrome at {}", launcher.endpoint()))?;
        info!("Connected to Chrome at {}", launcher.endpoint());

        let host = Arc::new(CdpTabHost::new(
            Arc::new(client),
            Timings::from(&config.timing),
            config.screenshot.format,
        ));
        let dispatcher = ToolDispatcher::with_default_tools(host, navigation_timeout(config))?;
        Ok(Self {
            launcher,
            dispatcher,
        })
    }
}

fn navigation_timeout(config: &Config) -> Duration {
    Duration::from_millis(config.timing.navigation_timeout_ms)
}

fn print_tools(config: &Config, format: CatalogFormat) -> Result<()> {
    // Definitions do not touch the browser, so an in-memory host will do.
    let dispatcher = ToolDispatcher::with_default_tools(
        Arc::new(MemoryTabHost::default()),
        navigation_timeout(config),
    )?;
    let catalog: Vec<_> = dispatcher
        .definitions()
        .iter()
        .map(|definition| match format {
            CatalogFormat::Native => serde_json::to_value(definition),
            CatalogFormat::Openai => Ok(definition.to_openai_function()),
            CatalogFormat::Anthropic => Ok(definition.to_anthropic_tool()),
        })
        .collect::<Result<_, _>>()?;
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}

async fn call_tool(config: &Config, tool: String, args: String, tab: Option<String>) -> Result<()> {
    let arguments: serde_json::Value =
        serde_json::from_str(&args).context("--args must be a JSON value")?;
    let browser = Browser::connect(config).await?;

    let mut ctx = ToolContext::new("cli");
    if let Some(tab) = tab {
        ctx = ctx.with_tab(TabId::new(tab));
    }
    let outcome = browser
        .dispatcher
        .invoke(&ToolInvocation::new(tool, arguments), ctx)
        .await;
    println!("{}", serde_json::to_string(&outcome)?);

    // Chrome is left running so the next call sees the same tabs.
    Ok(())
}

async fn run_session(config: &Config, id: String) -> Result<()> {
    let browser = Browser::connect(config).await?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let handled = session::run_session(&browser.dispatcher, &id, stdin, tokio::io::stdout()).await?;
    info!(handled, "Stdin closed");
    browser.launcher.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let warnings = ConfigValidator::validate(&config).into_result()?;
    let _guard = init_tracing(&config.logging)?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    match cli.command {
        Commands::Tools { format } => print_tools(&config, format),
        Commands::Call { tool, args, tab } => call_tool(&config, tool, args, tab).await,
        Commands::Session { id } => run_session(&config, id).await,
    }
}
