//! Quorum CLI - Main entry point

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use quorum_audit::{AuditSink, JsonlAuditLog, Severity};
use quorum_rpc::{server, AppConfig, AppContext};

#[derive(Parser)]
#[command(name = "quorum")]
#[command(about = "Quorum - weighted multi-party authorization and recovery", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory path (overrides config and QUORUM_DATA_DIR)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Screen transaction proposals through the compliance engine
    #[arg(long)]
    screening: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC over stdin/stdout, one message per line
    Serve,

    /// Serve JSON-RPC over HTTP (POST /rpc)
    ServeHttp {
        /// Bind address (overrides config and QUORUM_HTTP_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Print the audit log
    Audit {
        /// Only events about this request, account or principal
        #[arg(long)]
        subject: Option<String>,

        /// Only events at or above this severity (info, warning, critical)
        #[arg(long, default_value = "info")]
        min_severity: Severity,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries JSON-RPC
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    }
    .with_env_overrides();
    if let Some(data) = cli.data {
        config.data_dir = data;
    }
    if cli.screening {
        config.screening = true;
    }

    match cli.command {
        Commands::Serve => {
            let ctx = Arc::new(AppContext::new(&config)?);
            tokio::task::spawn_blocking(move || {
                let stdin = std::io::stdin();
                let stdout = std::io::stdout();
                server::serve_stdio(&ctx, stdin.lock(), stdout.lock())
            })
            .await??;
        }

        Commands::ServeHttp { addr } => {
            let addr = addr.unwrap_or_else(|| config.http_addr.clone());
            let ctx = Arc::new(AppContext::new(&config)?);
            server::serve_http(ctx, &addr).await?;
        }

        Commands::Audit {
            subject,
            min_severity,
        } => {
            let log = JsonlAuditLog::open(config.data_dir.join("audit.jsonl"))?;
            let events = match &subject {
                Some(subject) => log.events_for(subject)?,
                None => log.events()?,
            };

            let shown: Vec<_> = events
                .into_iter()
                .filter(|e| e.severity >= min_severity)
                .collect();
            for event in &shown {
                let marker = match event.severity {
                    Severity::Info => " ",
                    Severity::Warning => "!",
                    Severity::Critical => "‼",
                };
                println!(
                    "{} #{} {} {:<30} {} by {}",
                    marker,
                    event.sequence,
                    event.timestamp.to_rfc3339(),
                    event.action,
                    event.subject,
                    event.actor
                );
            }
            println!("✅ {} events ({})", shown.len(), log.path().display());
        }
    }

    Ok(())
}
