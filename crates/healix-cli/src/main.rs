use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod import;

use config::{HealixConfig, expand_path};
use healix_core::{
    ChatReply, ChatRequest, LlmProvider, OpenAiCompatProvider, Orchestrator, RetryingProvider,
    Specialty, ThreadStore,
};
use healix_store::{Collection, EvidenceStore, OllamaEmbedder, RecordDb, RecordStore, UserProfile};

#[derive(Parser)]
#[command(name = "healix")]
#[command(version)]
#[command(about = "Healix — clinical, nutrition, exercise and risk agents over your health records")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,

    /// Build or load the evidence indexes for every domain
    Index,

    /// Load records from a JSONL file into the record store
    Import {
        /// One JSON record per line
        file: PathBuf,
    },

    /// Send a one-shot message
    Ask {
        /// User whose records the agents read
        #[arg(short, long)]
        user: String,

        /// Skip routing and use this specialty
        #[arg(short, long)]
        specialty: Option<Specialty>,

        /// The message to send
        message: String,
    },

    /// Interactive session; the conversation is remembered until exit
    Chat {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        specialty: Option<Specialty>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config),
        Commands::Index => cmd_index(&cli.config).await,
        Commands::Import { file } => cmd_import(&cli.config, &file).await,
        Commands::Ask {
            user,
            specialty,
            message,
        } => cmd_ask(&cli.config, &user, specialty, &message).await,
        Commands::Chat { user, specialty } => cmd_chat(&cli.config, &user, specialty).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        tokio::fs::write(&config_path, include_str!("../../../config/default.toml")).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("Healix initialized at {}", config_dir.display());
    println!(
        "Edit {} to point at your model server, then run `healix index`.",
        config_path.display()
    );
    Ok(())
}

fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = HealixConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

async fn cmd_index(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = HealixConfig::load(config_path)?;
    let evidence = open_evidence(&cfg)?;

    let mut failed = 0;
    for (domain, outcome) in evidence.warm_up().await {
        match outcome {
            Ok(()) => println!("  {:<10} ready", domain),
            Err(e) => {
                failed += 1;
                println!("  {:<10} FAILED: {:#}", domain, e);
            }
        }
    }
    println!("Evidence indexes at {}", evidence.index_dir().display());
    if failed > 0 {
        anyhow::bail!("{} evidence domain(s) failed to initialize", failed);
    }
    Ok(())
}

async fn cmd_import(config_path: &Option<PathBuf>, file: &Path) -> Result<()> {
    let cfg = HealixConfig::load(config_path)?;
    let db = open_records(&cfg)?;
    let imported = import::import_file(&db, file).await?;
    println!("Imported {} record(s) from {}", imported, file.display());
    Ok(())
}

async fn cmd_ask(
    config_path: &Option<PathBuf>,
    user: &str,
    specialty: Option<Specialty>,
    message: &str,
) -> Result<()> {
    let cfg = HealixConfig::load(config_path)?;
    let db = open_records(&cfg)?;
    let profile = load_profile(&db, user).await?;
    let orchestrator = build_orchestrator(&cfg, db)?;

    let reply = orchestrator
        .handle(ChatRequest {
            message: message.to_string(),
            user_id: user.to_string(),
            profile,
            history: Vec::new(),
            requested_specialty: specialty.map(|s| s.as_str().to_string()),
        })
        .await;
    print_reply(&reply);
    Ok(())
}

async fn cmd_chat(
    config_path: &Option<PathBuf>,
    user: &str,
    specialty: Option<Specialty>,
) -> Result<()> {
    let cfg = HealixConfig::load(config_path)?;
    let db = open_records(&cfg)?;
    let orchestrator = build_orchestrator(&cfg, db.clone())?;

    println!("Healix chat for {}. Type 'exit' to quit.", user);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }

        // Re-read each turn so profile edits made mid-session are picked up
        let profile = load_profile(&db, user).await?;
        let reply = orchestrator
            .handle(ChatRequest {
                message: message.to_string(),
                user_id: user.to_string(),
                profile,
                history: Vec::new(),
                requested_specialty: specialty.map(|s| s.as_str().to_string()),
            })
            .await;
        print_reply(&reply);
    }
    Ok(())
}

fn print_reply(reply: &ChatReply) {
    println!("{}", reply.response);
    let tools = if reply.tools_used.is_empty() {
        "none".to_string()
    } else {
        reply.tools_used.join(", ")
    };
    println!(
        "\n[{} agent | tools: {} | sources: {}]",
        reply.specialty,
        tools,
        reply.sources.len()
    );
}

/// Latest `profiles` record, or an empty profile for unknown users
async fn load_profile(db: &RecordDb, user: &str) -> Result<UserProfile> {
    match db.latest(Collection::Profiles, user).await? {
        Some(record) => record.parse(),
        None => {
            warn!("No profile found for user {}, continuing without one", user);
            Ok(UserProfile::default())
        }
    }
}

fn open_records(cfg: &HealixConfig) -> Result<Arc<RecordDb>> {
    let path = expand_path(&cfg.store.db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = RecordDb::new(&path)?.with_max_concurrent_queries(cfg.store.max_concurrent_queries);
    Ok(Arc::new(db))
}

fn open_evidence(cfg: &HealixConfig) -> Result<Arc<EvidenceStore>> {
    let mut evidence = EvidenceStore::new(expand_path(&cfg.store.index_dir));
    if cfg.embeddings.enabled {
        let embedder = OllamaEmbedder::new(
            cfg.embeddings.base_url.clone(),
            cfg.embeddings.model.clone(),
            Duration::from_secs(cfg.embeddings.timeout_secs),
        )?;
        evidence = evidence.with_embedder(Arc::new(embedder));
    } else {
        info!("Embeddings disabled, evidence search is keyword-only");
    }
    Ok(Arc::new(evidence))
}

fn build_orchestrator(cfg: &HealixConfig, db: Arc<RecordDb>) -> Result<Orchestrator> {
    let model = &cfg.model;
    let provider = OpenAiCompatProvider::new(
        &model.base_url,
        model.model.clone(),
        model.api_key(),
        model.sampling(),
        Duration::from_secs(model.timeout_secs),
    )?;
    let provider: Arc<dyn LlmProvider> = Arc::new(
        RetryingProvider::new(Arc::new(provider))
            .with_max_retries(model.max_retries)
            .with_base_delay(Duration::from_millis(model.retry_base_delay_ms)),
    );
    info!("Using model {} at {}", provider.model(), model.base_url);

    let threads = Arc::new(ThreadStore::new(
        cfg.threads.capacity,
        Duration::from_secs(cfg.threads.idle_ttl_secs),
    ));
    Ok(
        Orchestrator::new(provider, db, open_evidence(cfg)?)
            .with_config(cfg.orchestrator.to_runtime())
            .with_threads(threads),
    )
}
