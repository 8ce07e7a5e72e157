//! Typist agent binary.
//!
//! Polls the configured spreadsheet and types every new row into whatever
//! window has focus on the host PC, through the USB HID gadget keyboard.
//!
//! # Usage
//!
//! ```text
//! typist-agent [--config typist-agent.toml] [--api-key KEY] [--hid-device /dev/hidg0]
//!              [--once] [--dry-run]
//! typist-agent --config typist-agent.toml --write-default-config
//! ```
//!
//! Environment variables (override CLI defaults):
//! - `TYPIST_CONFIG`     – path to the TOML configuration file
//! - `TYPIST_API_KEY`    – spreadsheet API key
//! - `TYPIST_HID_DEVICE` – HID gadget device node
//! - `RUST_LOG`          – log filter (overrides `logging.log_level`)

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use typist_agent::application::automation::AutomationLoop;
use typist_agent::application::typist::{KeystrokeSink, Typist};
use typist_agent::infrastructure::config::{AgentConfig, LoggingConfig};
use typist_agent::infrastructure::hid_gadget::HidGadgetSink;
use typist_agent::infrastructure::ledger::CsvLedger;
use typist_agent::infrastructure::recording::RecordingSink;
use typist_agent::infrastructure::sheets::SheetsClient;
use typist_agent::infrastructure::sleeper::TokioSleeper;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Types new spreadsheet rows into a legacy terminal over a USB HID gadget.
#[derive(Debug, Parser)]
#[command(
    name = "typist-agent",
    about = "Types new spreadsheet rows into a legacy terminal over a USB HID gadget",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.  Missing files fall back to
    /// defaults.
    #[arg(short, long, env = "TYPIST_CONFIG", default_value = "typist-agent.toml")]
    config: PathBuf,

    /// Spreadsheet API key.  Overrides `sheet.api_key` from the file.
    #[arg(long, env = "TYPIST_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// HID gadget device node.  Overrides `device.hid_device`.
    #[arg(long, env = "TYPIST_HID_DEVICE")]
    hid_device: Option<PathBuf>,

    /// Run a single polling pass and exit.
    #[arg(long)]
    once: bool,

    /// Record keystrokes in memory instead of writing to the device, and do
    /// not mark entries as processed.
    #[arg(long)]
    dry_run: bool,

    /// Write a configuration file with every default value to `--config`
    /// and exit.  An existing file is left alone.
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    /// Applies command-line overrides on top of a loaded configuration.
    fn apply_overrides(&self, config: &mut AgentConfig) {
        if let Some(key) = &self.api_key {
            config.sheet.api_key = key.clone();
        }
        if let Some(device) = &self.hid_device {
            config.device.hid_device = device.clone();
        }
    }

    /// Writes the default configuration to `--config`, refusing to replace
    /// an existing file.
    fn write_default_config(&self) -> anyhow::Result<()> {
        if self.config.exists() {
            anyhow::bail!("{} already exists, not overwriting", self.config.display());
        }
        AgentConfig::default()
            .save(&self.config)
            .with_context(|| format!("writing {}", self.config.display()))
    }

    /// Loads the configuration file and applies overrides.
    fn load_config(&self) -> anyhow::Result<AgentConfig> {
        let mut config = AgentConfig::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        self.apply_overrides(&mut config);
        Ok(config)
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

/// Installs a stdout layer and, when configured, a plain-text file layer.
/// `RUST_LOG` wins over `logging.log_level`.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.write_default_config {
        cli.write_default_config()?;
        println!("wrote default configuration to {}", cli.config.display());
        return Ok(());
    }

    let config = cli.load_config()?;
    init_logging(&config.logging)?;
    config.validate().context("invalid configuration")?;

    info!(
        config = %cli.config.display(),
        once = cli.once,
        dry_run = cli.dry_run,
        "typist agent starting"
    );

    let sink: Arc<dyn KeystrokeSink> = if cli.dry_run {
        warn!("dry run: keystrokes are recorded, nothing is typed");
        Arc::new(RecordingSink::new())
    } else {
        let device = HidGadgetSink::open(&config.device.hid_device).with_context(|| {
            format!(
                "opening HID gadget {} (is the USB gadget configured?)",
                config.device.hid_device.display()
            )
        })?;
        info!(device = %device.path().display(), "HID gadget opened");
        Arc::new(device)
    };

    let ledger = if cli.dry_run {
        CsvLedger::read_only(&config.ledger.path)
    } else {
        CsvLedger::new(&config.ledger.path)
    };

    let source = SheetsClient::new(&config.sheet, &config.sheet.api_key, config.request_timeout())
        .context("building sheets client")?;

    let sleeper = Arc::new(TokioSleeper);
    let typist = Typist::new(sink, sleeper.clone()).with_key_press_delay(config.key_press_delay());

    let mut automation = AutomationLoop::new(
        Arc::new(source),
        Arc::new(ledger),
        sleeper,
        typist,
        config.transformer(),
        config.plan(),
        config.pacing(),
    );

    if cli.once {
        let report = automation.poll_once().await.context("polling pass failed")?;
        info!(
            fetched = report.fetched,
            new = report.new_entries,
            typed = report.typed,
            "single pass complete"
        );
        return Ok(());
    }

    info!(
        interval = ?config.pacing().check_interval,
        "automation running, press Ctrl+C to stop"
    );

    tokio::select! {
        () = automation.run() => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl+C")?;
            info!("received Ctrl+C, shutting down");
            Ok(())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
