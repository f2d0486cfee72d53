use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "miniapp-bot")]
#[command(about = "Telegram bot that opens a web app and relays its results to the chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: MINIAPP_CONFIG_PATH or ~/.miniapp-bot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the bot (the default when no subcommand is given). Uses webhook mode when channels.telegram.webhookUrl is set, long polling otherwise.
    Run {
        /// Config file path (default: MINIAPP_CONFIG_PATH or ~/.miniapp-bot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port for health and webhook (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("miniapp-bot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config, port }) => {
            if let Err(e) = run_bot(config, port).await {
                log::error!("bot failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = run_bot(None, None).await {
                log::error!("bot failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(miniapp::config::default_config_path);
    let dir = miniapp::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_bot(config_path: Option<std::path::PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = miniapp::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting bot on {}:{}", config.gateway.bind, config.gateway.port);
    miniapp::bot::run_bot(config).await
}
