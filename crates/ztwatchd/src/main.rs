//! ztwatchd — the ztwatch daemon.
//!
//! Single binary that assembles the monitor:
//! - Configuration (`ztwatch.toml` plus CLI/env overrides)
//! - State store (redb)
//! - ZeroTier Central and GitHub clients
//! - Telegram report sink
//! - Poll monitor loop
//!
//! # Usage
//!
//! ```text
//! ztwatchd init --network-id 8056c2e21c000001 --token $ZT_TOKEN --member abcdef0123
//! ztwatchd run --config ztwatch.toml --data-dir /var/lib/ztwatch
//! ```

mod monitor_mode;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ztwatch_core::MonitorConfig;

const DEFAULT_LOG_FILTER: &str = "info,ztwatchd=debug,ztwatch=debug";

#[derive(Parser)]
#[command(name = "ztwatchd", version, about = "ZeroTier member monitor")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll members until interrupted.
    Run(RunArgs),

    /// Write a starter configuration file.
    Init {
        /// Where to write the file.
        #[arg(long, short, default_value = "ztwatch.toml")]
        output: PathBuf,

        #[arg(long, default_value = "YOUR_NETWORK_ID")]
        network_id: String,

        /// ZeroTier Central API token.
        #[arg(long, env = "ZT_API_TOKEN", default_value = "YOUR_API_TOKEN", hide_env_values = true)]
        token: String,

        /// Node id to monitor; repeat for several members.
        #[arg(long = "member")]
        members: Vec<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RunArgs {
    /// Configuration file.
    #[arg(long, short, env = "ZTWATCH_CONFIG", default_value = "ztwatch.toml")]
    config: PathBuf,

    /// Data directory for persistent state.
    #[arg(long, env = "ZTWATCH_DATA_DIR", default_value = "/var/lib/ztwatch")]
    data_dir: PathBuf,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<String>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run(args) => {
            let mut config = MonitorConfig::from_file(&args.config)
                .with_context(|| format!("loading {}", args.config.display()))?;
            apply_overrides(&mut config, &args);
            monitor_mode::run(config, &args.data_dir, args.once).await
        }
        Command::Init {
            output,
            network_id,
            token,
            members,
            force,
        } => {
            let ids: Vec<&str> = members.iter().map(String::as_str).collect();
            write_scaffold(&output, &network_id, &token, &ids, force)
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// CLI and environment values win over the file.
fn apply_overrides(config: &mut MonitorConfig, args: &RunArgs) {
    if let Some(token) = &args.telegram_bot_token {
        config.telegram.bot_token = Some(token.clone());
    }
    if let Some(chat) = &args.telegram_chat_id {
        config.telegram.chat_id = Some(chat.clone());
    }
}

fn write_scaffold(
    output: &std::path::Path,
    network_id: &str,
    token: &str,
    members: &[&str],
    force: bool,
) -> anyhow::Result<()> {
    if output.exists() && !force {
        bail!("{} already exists, pass --force to overwrite", output.display());
    }
    let config = MonitorConfig::scaffold(network_id, token, members);
    std::fs::write(output, config.to_toml_string()?)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), "configuration written");
    Ok(())
}
