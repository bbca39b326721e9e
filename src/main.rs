use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use outreach_channels::{sender_from_config, DomainEnricher, MockCallPlacer};
use outreach_core::config::AppConfig;
use outreach_engine::{CampaignProcessor, Capabilities, GraphBuilder, RunCoordinator};
use outreach_llm::OpenAiGenerator;
use outreach_store::SqliteStore;

#[derive(Parser)]
#[command(name = "outreach", version, about = "Outbound-contact campaign engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "outreach.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every pending lead of a campaign
    Campaign {
        /// Campaign id
        id: String,
    },
    /// Process a single campaign lead
    Lead {
        /// Campaign-lead id
        id: String,
    },
    /// Show the persisted conversation for a campaign lead
    Conversation {
        /// Campaign-lead id
        id: String,
    },
    /// Show the persisted processing log for a campaign lead
    Logs {
        /// Campaign-lead id
        id: String,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("outreach=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        warn!(path = %cli.config.display(), "Config file not found, using defaults");
        AppConfig::default()
    };

    if let Commands::Config = cli.command {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let store = Arc::new(SqliteStore::open(
        PathBuf::from(&config.database.path).as_path(),
    )?);

    match cli.command {
        Commands::Campaign { id } => {
            let processor = CampaignProcessor::new(
                store.clone(),
                Arc::new(coordinator(&config, store.clone())),
            );
            let outcome = processor.process_campaign(&id).await?;
            if outcome.paused {
                info!(campaign_id = %id, "Campaign paused before all leads were processed");
            }
            println!(
                "processed: {}  succeeded: {}  failed: {}{}",
                outcome.processed,
                outcome.succeeded,
                outcome.failed,
                if outcome.paused { "  (paused)" } else { "" }
            );
        }
        Commands::Lead { id } => {
            let coordinator = coordinator(&config, store.clone());
            let result = coordinator.run(&id).await?;
            println!(
                "status: {}  sms_sent: {}  call_made: {}{}",
                result.status,
                result.sms_sent,
                result.call_made,
                if result.error_message.is_empty() {
                    String::new()
                } else {
                    format!("  error: {}", result.error_message)
                }
            );
        }
        Commands::Conversation { id } => {
            for entry in store.conversation(&id)? {
                let agent = entry.agent.map(|a| format!(" [{}]", a)).unwrap_or_default();
                println!("{}{}: {}", entry.role.as_str(), agent, entry.content);
            }
        }
        Commands::Logs { id } => {
            for (level, entry) in store.logs(&id)? {
                println!(
                    "{} {} [{}] {}",
                    entry.timestamp.to_rfc3339(),
                    level.as_str(),
                    entry.node,
                    entry.message
                );
            }
        }
        Commands::Config => unreachable!(),
    }

    Ok(())
}

fn coordinator(config: &AppConfig, store: Arc<SqliteStore>) -> RunCoordinator {
    if config.llm.api_key.is_empty() {
        warn!("No LLM API key configured, message generation will fail");
    }
    let caps = Capabilities {
        generator: Arc::new(OpenAiGenerator::new(&config.llm)),
        sender: sender_from_config(&config.sms),
        placer: Arc::new(MockCallPlacer),
        enricher: Arc::new(DomainEnricher),
    };
    let builder = GraphBuilder::new(caps, config.working_hours.clone());
    RunCoordinator::new(store, builder, config.tracing.enabled)
}
