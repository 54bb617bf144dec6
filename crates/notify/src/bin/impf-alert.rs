//! impf-alert — send one appointment alert through every enabled channel.
//!
//! Channels and credentials come from the environment (or a `.env` file):
//! `SEND_EMAIL`, `SEND_TELEGRAM_MSG`, `SEND_ZULIP`, `OPEN_BROWSER` and the
//! per-channel settings next to them.

use clap::Parser;
use tracing::info;

use impf_core::config::{load_dotenv, AlertConfig};
use impf_notify::Dispatcher;

// ── CLI ─────────────────────────────────────────────────────────────

/// Fan an alert out to email, Telegram, Zulip and the local browser.
#[derive(Parser, Debug)]
#[command(name = "impf-alert", version, about)]
struct Cli {
    /// Alert text (email subject, bold Telegram line, Zulip content).
    #[arg(default_value = "[TEST] impf notifier test")]
    message: String,

    /// Log trying/delivered/skipped notes for every channel.
    #[arg(short, long, env = "IMPF_VERBOSE")]
    verbose: bool,

    /// Print the redacted configuration as JSON and exit.
    #[arg(long)]
    show_config: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = AlertConfig::from_env();

    if cli.show_config {
        println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
        return Ok(());
    }

    if cli.verbose {
        config.log_summary();
    }

    let dispatcher = Dispatcher::from_config(&config);
    info!(channels = ?dispatcher.enabled_channels(), "sending alert");
    dispatcher.alert(&cli.message, cli.verbose).await;
    info!("impf-alert finished");

    Ok(())
}
