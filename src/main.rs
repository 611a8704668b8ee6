use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nodeflow_core::config::{dirs_home, AppConfig};
use nodeflow_core::types::ModelInfo;
use nodeflow_engine::{Graph, WorkflowEngine};
use nodeflow_llm::GeminiClient;

#[derive(Parser)]
#[command(name = "nodeflow", version, about = "Run node-graph automation workflows")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "nodeflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway (default)
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Execute a workflow graph file and print the run report
    Run {
        /// Graph JSON file, or `-` for stdin
        graph: PathBuf,
    },
    /// Show current configuration (secrets redacted)
    Config,
    /// List text-generation models available to the configured key
    Models,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nodeflow=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "nodeflow", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Config) => {
            println!("{}", toml::to_string_pretty(&redacted(&config))?);
        }
        Some(Commands::Models) => {
            let models = GeminiClient::new().list_models(&config.ai).await?;
            for model in models.iter().filter(|m| m.supports_generate) {
                println!("{}", model_line(model));
            }
        }
        Some(Commands::Run { graph }) => {
            let graph = read_graph(&graph)?;
            let engine = WorkflowEngine::from_config(&config)?;
            let report = engine.run(&graph).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Commands::Serve { bind }) => serve(config, bind).await?,
        None => serve(config, None).await?,
        // Handled above.
        Some(Commands::Completions { .. }) => {}
    }

    Ok(())
}

async fn serve(config: AppConfig, bind: Option<String>) -> anyhow::Result<()> {
    let mut gateway_config = config.gateway.clone().unwrap_or_default();
    if let Some(bind) = bind {
        gateway_config.bind = bind;
    }

    let engine = Arc::new(WorkflowEngine::from_config(&config)?);
    info!(bind = %gateway_config.bind, model = %config.ai.model_id, "Starting gateway");
    let server = nodeflow_gateway::GatewayServer::new(gateway_config, engine);

    let cancel = tokio_util::sync::CancellationToken::new();
    let cancel_clone = cancel.clone();

    // Graceful shutdown on Ctrl-C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down gateway...");
        cancel_clone.cancel();
    });

    server.run(cancel).await
}

/// `nodeflow.toml` (or `--config`), then `~/.nodeflow/config.toml`, then the
/// environment alone.
fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let config = if path.exists() {
        AppConfig::load(path)?
    } else {
        match dirs_home().map(|h| h.join(".nodeflow").join("config.toml")) {
            Some(home_config) if home_config.exists() => {
                info!(path = %home_config.display(), "Loading config from home directory");
                AppConfig::load(&home_config)?
            }
            _ => {
                info!("No config file found, using environment");
                AppConfig::from_env()
            }
        }
    };
    Ok(config.with_env_fallbacks())
}

fn read_graph(path: &Path) -> anyhow::Result<Graph> {
    let bytes = if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
    };
    Ok(Graph::from_slice(&bytes)?)
}

fn redacted(config: &AppConfig) -> AppConfig {
    const MASK: &str = "********";
    let mut shown = config.clone();
    if shown.ai.api_key.is_some() {
        shown.ai.api_key = Some(MASK.into());
    }
    if shown.mail.password.is_some() {
        shown.mail.password = Some(MASK.into());
    }
    if let Some(gateway) = shown.gateway.as_mut() {
        if gateway.token.is_some() {
            gateway.token = Some(MASK.into());
        }
    }
    shown
}

fn model_line(model: &ModelInfo) -> String {
    format!("{:<40} {}", model.name, model.display_name.as_deref().unwrap_or(""))
        .trim_end()
        .to_string()
}
