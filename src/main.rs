//! Ontoclaw: conversational ontology assistant (terminal chat + gateway)

use clap::{Parser, Subcommand, ValueEnum};
use ontoclaw_agent::{ExecutorConfig, SessionKey, TaskExecutor};
use ontoclaw_core::{AuthMode, BindMode, OntoclawConfig};
use ontoclaw_gateway::{start_gateway, Terminal};
use ontoclaw_llm::{ExtractionService, IntentResolver, PlaceholderLlm, RuleResolver};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "ontoclaw", about = "Ontoclaw: talk to an ontology and your documents")]
struct Cli {
    /// Config file (default: ./ontoclaw.toml, then ~/.ontoclaw/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// How free text is turned into actions
    #[arg(long, value_enum, default_value = "rules", global = true)]
    resolver: ResolverKind,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ResolverKind {
    /// Deterministic pattern rules
    Rules,
    /// Offline placeholder model (every request comes back unrecognised)
    Placeholder,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat in the terminal
    Chat {
        /// Session name (default: auto-generated)
        #[arg(short, long)]
        session: Option<String>,
        /// Ontology to load before the first prompt
        #[arg(short, long)]
        ontology: Option<String>,
    },
    /// Start the WebSocket gateway
    Gateway {
        #[arg(short, long)]
        port: Option<u16>,
        /// loopback or lan
        #[arg(short, long)]
        bind: Option<String>,
        #[arg(short, long)]
        token: Option<String>,
        #[arg(long)]
        no_auth: bool,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Show version
    Version,
}

fn load_config(path: Option<&PathBuf>) -> OntoclawConfig {
    match path {
        Some(path) => OntoclawConfig::load(path),
        None => OntoclawConfig::discover(),
    }
    .with_env_overrides()
}

fn build_executor(kind: ResolverKind, config: &OntoclawConfig) -> TaskExecutor {
    let extractor: Arc<dyn ExtractionService> = Arc::new(PlaceholderLlm::new());
    let resolver: Arc<dyn IntentResolver> = match kind {
        ResolverKind::Rules => Arc::new(RuleResolver::new()),
        ResolverKind::Placeholder => Arc::new(PlaceholderLlm::new()),
    };
    TaskExecutor::new(resolver, extractor, ExecutorConfig::from(config))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "ontoclaw=info".into())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Gateway {
            port,
            bind,
            token,
            no_auth,
        }) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer())
                .init();

            let mut config = load_config(cli.config.as_ref());
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(bind) = bind {
                config.gateway.bind = match bind.as_str() {
                    "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
                    _ => BindMode::Lan,
                };
            }
            if token.is_some() {
                config.gateway.auth.token = token;
            }
            if no_auth {
                config.gateway.auth.mode = AuthMode::None;
            }

            let executor = build_executor(cli.resolver, &config);
            start_gateway(config, executor).await?;
        }

        Some(Commands::Config) => {
            print!("{}", load_config(cli.config.as_ref()).to_toml());
        }

        Some(Commands::Version) => {
            println!("ontoclaw v{}", env!("CARGO_PKG_VERSION"));
        }

        Some(Commands::Chat { session, ontology }) => {
            run_chat(cli.config.as_ref(), cli.resolver, session, ontology).await?;
        }

        // No subcommand = chat
        None => {
            run_chat(cli.config.as_ref(), cli.resolver, None, None).await?;
        }
    }

    Ok(())
}

/// Terminal chat. Logs go to a daily file so they stay out of the conversation.
async fn run_chat(
    config_path: Option<&PathBuf>,
    resolver: ResolverKind,
    session: Option<String>,
    ontology: Option<String>,
) -> anyhow::Result<()> {
    let log_dir = OntoclawConfig::default_path()
        .parent()
        .map(|p| p.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let appender = tracing_appender::rolling::daily(&log_dir, "ontoclaw.log");
    let (writer, _guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    let config = load_config(config_path);
    let executor = Arc::new(build_executor(resolver, &config));
    let key = session.unwrap_or_else(|| format!("chat-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]));
    let mut terminal = Terminal::new(executor, SessionKey::new(key), config);
    println!("{}", terminal.banner());

    if let Some(path) = ontology {
        if let Some(out) = terminal.handle_line(&format!("/load \"{}\"", path)).await {
            println!("{}", out);
        }
    }
    terminal.run().await
}
