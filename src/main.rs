use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use egp::{
    build_engine, open_store, EngineApiBuilder, EngineServiceConfig, NodeConfig, StoreBackend,
};
use egp_protocol::duration::{Duration, SpanCeiling};
use egp_rules::{ReviewSchedule, RevocationEngine};
use tracing::info;
use url::Url;

#[derive(Parser)]
#[command(name = "egp-node")]
#[command(about = "Emergent Governance Protocol node", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serves the governance HTTP API
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,
        /// Keep objects in memory instead of IPFS
        #[arg(long)]
        memory: bool,
        /// IPFS RPC endpoint
        #[arg(long)]
        ipfs_url: Option<Url>,
        /// Identifier stamped on created objects
        #[arg(long)]
        node_id: Option<String>,
        /// Revocation rule file or directory
        #[arg(long, env = "EGP_REVOCATION_RULES")]
        rules: Option<PathBuf>,
    },
    /// Parses a duration and shows where it lands
    Duration {
        /// ISO-8601 duration such as P3M or P1Y2M10D
        value: String,
        /// Instant to add it to (RFC 3339); defaults to now
        #[arg(long)]
        from: Option<DateTime<Utc>>,
    },
    /// Prints the review instants of a trial
    Schedule {
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
        /// Monitoring frequency such as P1W
        #[arg(long)]
        frequency: String,
    },
    /// Prints the revocation conditions derived for a success criterion
    Conditions {
        /// Success criterion of the proposal
        criterion: String,
        /// Monitor identifiers, in order
        #[arg(long = "monitor")]
        monitors: Vec<String>,
        /// Revocation rule file or directory
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            memory,
            ipfs_url,
            node_id,
            rules,
        } => {
            let mut config = NodeConfig::from_env().context("failed to load node configuration")?;
            if let Err(err) = egp_core::logging::init_for(&config) {
                eprintln!("failed to initialise tracing: {err}");
            }
            if let Some(bind) = bind {
                config.http_bind = bind;
            }
            if memory {
                config.store = StoreBackend::Memory;
            }
            if let Some(url) = ipfs_url {
                config.ipfs_api_url = url;
            }
            if let Some(node_id) = node_id {
                config.node_id = node_id;
            }
            if rules.is_some() {
                config.revocation_rules = rules;
            }
            serve(config).await
        }
        Commands::Duration { value, from } => {
            let duration = Duration::parse(&value)?;
            let from = from.unwrap_or_else(Utc::now);
            let ceiling = SpanCeiling::default();
            println!("duration:   {duration}");
            println!("total days: {}", duration.total_days());
            println!("from:       {}", from.to_rfc3339());
            println!("until:      {}", duration.add_to(from)?.to_rfc3339());
            if let Err(err) = ceiling.check(&duration) {
                println!("note:       {err}");
            }
            Ok(())
        }
        Commands::Schedule {
            start,
            end,
            frequency,
        } => {
            let frequency = Duration::parse_span(&frequency)?;
            let reviews = ReviewSchedule::from_duration(frequency).between(start, end);
            println!("{}", serde_json::to_string_pretty(&reviews)?);
            Ok(())
        }
        Commands::Conditions {
            criterion,
            monitors,
            rules,
        } => {
            let engine = match rules {
                Some(path) => RevocationEngine::from_path(&path)
                    .with_context(|| format!("failed to load rules from {}", path.display()))?,
                None => RevocationEngine::default(),
            };
            let conditions = engine.generate(&criterion, &monitors);
            println!("{}", serde_json::to_string_pretty(&conditions)?);
            Ok(())
        }
    }
}

async fn serve(config: NodeConfig) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let engine = Arc::new(build_engine(&config, store)?);
    let service = EngineServiceConfig {
        bind_address: config.http_bind.clone(),
        request_timeout_secs: config.request_timeout.as_secs().max(1),
    };

    let shutdown = EngineApiBuilder::new(engine)
        .serve(service)
        .await
        .context("failed to start governance node")?;

    shutdown_signal().await;
    info!("shutting down governance node");
    let _ = shutdown.send(());
    // Let in-flight requests drain before the runtime stops.
    tokio::time::sleep(StdDuration::from_millis(200)).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
