//! Typist control binary: runs the control server, or calls one.
//!
//! # Usage
//!
//! ```text
//! typist-control serve [--bind 0.0.0.0] [--port 5000] [--hid-device /dev/hidg0] [--dry-run]
//! typist-control --host 192.168.1.50 status
//! typist-control --host 192.168.1.50 type "Hello" [--delay 0.05]
//! typist-control --host 192.168.1.50 key enter
//! ```
//!
//! Client subcommands print the server's JSON reply.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use typist_agent::application::typist::{KeystrokeSink, Typist};
use typist_agent::infrastructure::hid_gadget::{HidGadgetSink, DEFAULT_HID_DEVICE};
use typist_agent::infrastructure::recording::RecordingSink;
use typist_agent::infrastructure::sleeper::TokioSleeper;
use typist_control::application::ControlService;
use typist_control::domain::config::{ControlConfig, DEFAULT_PORT};
use typist_control::infrastructure::{run_server, ControlClient};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Remote control for the HID gadget keyboard.
#[derive(Debug, Parser)]
#[command(
    name = "typist-control",
    about = "Serve or call the HTTP remote control for the HID gadget keyboard",
    version
)]
struct Cli {
    /// Control server host, for the client subcommands.
    #[arg(long, global = true, default_value = "127.0.0.1", env = "TYPIST_CONTROL_HOST")]
    host: String,

    /// Control server port.  `serve` listens on it; the client calls it.
    #[arg(long, global = true, default_value_t = DEFAULT_PORT, env = "TYPIST_CONTROL_PORT")]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the control server.
    Serve {
        /// Address to bind.  `0.0.0.0` accepts LAN connections.
        #[arg(long, default_value = "0.0.0.0", env = "TYPIST_CONTROL_BIND")]
        bind: String,

        /// HID gadget device node.
        #[arg(long, default_value = DEFAULT_HID_DEVICE, env = "TYPIST_HID_DEVICE")]
        hid_device: PathBuf,

        /// Record keystrokes in memory instead of writing to the device.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print server status.
    Status,

    /// Type text on the host.
    Type {
        text: String,

        /// Seconds between characters.
        #[arg(long, default_value_t = 0.05)]
        delay: f64,
    },

    /// Press one key (`enter`, `tab`, `space`, `escape`, `backspace`, or a
    /// single character).
    Key { key: String },
}

impl Cli {
    /// Builds the server configuration for `serve`.
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn server_config(&self, bind: &str, hid_device: PathBuf) -> anyhow::Result<ControlConfig> {
        let bind_addr: SocketAddr = format!("{bind}:{}", self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{bind}:{}'", self.port))?;
        Ok(ControlConfig {
            bind_addr,
            hid_device,
            ..ControlConfig::default()
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Serve {
            bind,
            hid_device,
            dry_run,
        } => {
            let config = cli.server_config(bind, hid_device.clone())?;
            serve(config, *dry_run).await
        }
        Command::Status => {
            let client = ControlClient::new(&cli.host, cli.port)?;
            print_json(&client.status().await?)
        }
        Command::Type { text, delay } => {
            let client = ControlClient::new(&cli.host, cli.port)?;
            println!("Sending text '{text}' to {}...", client.base_url());
            print_json(&client.type_text(text, *delay).await?)
        }
        Command::Key { key } => {
            let client = ControlClient::new(&cli.host, cli.port)?;
            println!("Sending keypress '{key}' to {}...", client.base_url());
            print_json(&client.press_key(key).await?)
        }
    }
}

async fn serve(config: ControlConfig, dry_run: bool) -> anyhow::Result<()> {
    let sink: Arc<dyn KeystrokeSink> = if dry_run {
        warn!("dry run: keystrokes are recorded, nothing is typed");
        Arc::new(RecordingSink::new())
    } else {
        let device = HidGadgetSink::open(&config.hid_device).with_context(|| {
            format!(
                "opening HID gadget {} (is the USB gadget configured?)",
                config.hid_device.display()
            )
        })?;
        Arc::new(device)
    };
    let typist = Typist::new(sink, Arc::new(TokioSleeper)).with_key_press_delay(config.key_press_delay);
    let service = Arc::new(ControlService::new(typist, config.default_type_delay));

    info!(
        bind = %config.bind_addr,
        device = %config.hid_device.display(),
        "typist control server starting"
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    run_server(config, service, running).await?;
    info!("typist control server stopped");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
