//! Bad Bot Agent CLI.

use anyhow::Result;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zentinel_agent_bad_bot::{server, BadBotAgent, Config};

#[derive(Parser, Debug)]
#[command(name = "zentinel-agent-bad-bot")]
#[command(about = "Bad Bot agent for Zentinel - block known abusive crawlers and blocked networks")]
#[command(version)]
struct Args {
    /// Path to configuration file (built-in defaults when absent)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unix socket path
    #[arg(short, long, default_value = "/tmp/zentinel-bad-bot.sock")]
    socket: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Classify a single client address, print the verdict and exit
    #[arg(long, value_name = "IP")]
    check_ip: Option<IpAddr>,

    /// Classify a single User-Agent, print the verdict and exit
    #[arg(long, value_name = "UA")]
    check_user_agent: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --print-config
    if args.print_config {
        println!("{}", Config::example());
        return Ok(());
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            Config::load(path)?
        }
        None => {
            info!("No configuration file given, using built-in lists");
            Config::default()
        }
    };

    // Compiling the block list is part of validation
    let agent = BadBotAgent::new(config)?;

    // Handle --validate
    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    // Handle one-shot checks
    if args.check_ip.is_some() || args.check_user_agent.is_some() {
        let result = agent
            .classifier()
            .explain(args.check_ip, args.check_user_agent.as_deref());
        let output = serde_json::json!({
            "verdict": result.verdict,
            "rule": result.rule,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let listener = server::bind(&args.socket)?;
    info!(socket = %args.socket.display(), "Starting Bad Bot agent");

    server::serve(listener, Arc::new(agent), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await?;

    let _ = std::fs::remove_file(&args.socket);

    Ok(())
}
