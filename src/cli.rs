//! CLI definitions for PagePilot.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pagepilot_config::Config;

/// PagePilot CLI.
#[derive(Parser)]
#[command(name = "pagepilot")]
#[command(about = "Drive a browser page from an LLM tool loop")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    /// Chrome host, overriding `browser.host`
    #[arg(long, env = "PAGEPILOT_CHROME_HOST", global = true)]
    pub host: Option<String>,

    /// Chrome remote debugging port, overriding `browser.debug_port`
    #[arg(long, env = "PAGEPILOT_CHROME_PORT", global = true)]
    pub port: Option<u16>,

    /// Run a launched Chrome headless
    #[arg(long, global = true)]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.browser.host = host.clone();
        }
        if let Some(port) = self.port {
            config.browser.debug_port = port;
        }
        if self.headless {
            config.browser.headless = true;
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Print the tool catalog
    Tools {
        /// Output format
        #[arg(long, value_enum, default_value = "native")]
        format: CatalogFormat,
    },

    /// Run one tool against the browser and print its outcome
    Call {
        /// Tool id, e.g. click
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Act on this tab instead of the active one
        #[arg(long)]
        tab: Option<String>,
    },

    /// Read JSON-lines invocations from stdin and write outcomes to stdout
    Session {
        /// Session id attached to every invocation
        #[arg(long, default_value = "stdio")]
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CatalogFormat {
    Native,
    Openai,
    Anthropic,
}
