use agent_analytics::aggregations::{format_cost, format_tokens};
use agent_analytics::{Fleet, ReportGenerator};
use agent_core::config::AppConfig;
use agent_core::scanner::{ListOptions, SessionStore};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "agent-monitor",
    about = "Summarize AI agent session logs and serve them to a dashboard",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/agent-monitor/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the session log directory
    #[arg(long, global = true)]
    sessions_dir: Option<PathBuf>,

    /// Override the agent id used in session keys
    #[arg(long, global = true)]
    agent_id: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// List recently updated sessions
    List {
        /// Recency window in minutes
        #[arg(short, long)]
        minutes: Option<u64>,
        /// Leave out archived sessions
        #[arg(long)]
        no_deleted: bool,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show one session by id
    Show {
        /// Session id (file name without extension)
        id: String,
    },

    /// Show fleet statistics
    Stats {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print a markdown report
    Report {
        /// Recency window in minutes for the session table
        #[arg(short, long)]
        minutes: Option<u64>,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "agent_monitor=info,warn".into()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config.
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Apply CLI overrides.
    if let Some(dir) = &cli.sessions_dir {
        config.logs.sessions_dir = Some(dir.clone());
    }
    if let Some(agent_id) = &cli.agent_id {
        config.logs.agent_id = agent_id.clone();
    }

    let store = SessionStore::from_config(&config.logs);
    tracing::debug!("Reading sessions from {}", store.dir().display());

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(h) = host {
                config.server.host = h;
            }
            if let Some(p) = port {
                config.server.port = p;
            }
            agent_server::serve(config).await?;
        }
        None => {
            agent_server::serve(config).await?;
        }
        Some(Commands::List {
            minutes,
            no_deleted,
            format,
        }) => {
            let options = ListOptions::new(
                minutes.unwrap_or(config.logs.window_minutes),
                config.logs.include_deleted && !no_deleted,
            );
            handle_list(&store, &options, format)?;
        }
        Some(Commands::Show { id }) => {
            let summary = store.get(&id)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Some(Commands::Stats { format }) => {
            let fleet = Fleet::from_store(&store)?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&fleet.stats())?),
                Format::Text => print!("{}", ReportGenerator::text_summary(&fleet)),
            }
        }
        Some(Commands::Report { minutes }) => {
            let options = ListOptions::new(
                minutes.unwrap_or(config.logs.window_minutes),
                config.logs.include_deleted,
            );
            let fleet = Fleet::from_store(&store)?;
            let listing = store.list(&options)?;
            print!("{}", ReportGenerator::markdown(&fleet, &listing.sessions));
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, &config)?;
        }
    }

    Ok(())
}

fn handle_list(store: &SessionStore, options: &ListOptions, format: Format) -> Result<()> {
    let listing = store.list(options)?;

    if format == Format::Json {
        let body = serde_json::json!({
            "count": listing.sessions.len(),
            "sessions": listing.sessions,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if listing.sessions.is_empty() {
        println!("No sessions in the last {} minutes.", options.window.num_minutes());
    } else {
        println!(
            "{:<36}  {:<20}  {:<24}  {:<9}  {:>5}  {:>8}  {:>9}  {}",
            "SESSION", "LABEL", "MODEL", "STATUS", "MSGS", "TOKENS", "COST", "UPDATED"
        );
        for s in &listing.sessions {
            println!(
                "{:<36}  {:<20}  {:<24}  {:<9}  {:>5}  {:>8}  {:>9}  {}",
                s.session_id,
                truncate(&s.label, 20),
                truncate(&s.model, 24),
                s.status.as_str(),
                s.message_count,
                format_tokens(s.total_tokens),
                format_cost(s.total_cost),
                s.last_updated
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M"),
            );
        }
    }

    for failure in &listing.failures {
        eprintln!("warning: skipped {}: {}", failure.path.display(), failure.error);
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn handle_config_command(action: Option<ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            // Defaults only; command-line overrides are not persisted.
            let path = AppConfig::default_path();
            if AppConfig::init_at(&path)? {
                println!("Created default config at: {}", path.display());
            } else {
                println!("Config already exists at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}
