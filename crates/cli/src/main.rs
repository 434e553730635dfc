use clap::{Parser, Subcommand};
use haul::routing::IntentRouter;
use haul::store::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "haul")]
#[command(about = "Haul CLI: classify and route truck-driver messages", long_about = None)]
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
        /// Config file path (default: HAUL_CONFIG_PATH or ~/.haul/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Print the intent a message would be routed to.
    Classify {
        /// Config file path (default: HAUL_CONFIG_PATH or ~/.haul/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Message text.
        text: String,
    },

    /// Route one message and print the response envelope as JSON.
    Route {
        /// Config file path (default: HAUL_CONFIG_PATH or ~/.haul/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Driver id (default from config).
        #[arg(long, short, value_name = "ID")]
        driver: Option<String>,

        /// Message text.
        text: String,
    },

    /// Interactive loop: each line is routed as a driver message. /status shows the stored status, /exit quits.
    Chat {
        /// Config file path (default: HAUL_CONFIG_PATH or ~/.haul/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Driver id (default from config).
        #[arg(long, short, value_name = "ID")]
        driver: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("haul {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Classify { config, text }) => match build_router(config) {
            Ok(router) => println!("{}", router.classify(&text)),
            Err(e) => {
                log::error!("classify failed: {:#}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Route {
            config,
            driver,
            text,
        }) => {
            if let Err(e) = run_route(config, driver, text).await {
                log::error!("route failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, driver }) => {
            if let Err(e) = run_chat(config, driver).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(haul::config::default_config_path);
    let dir = haul::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn build_router(config_path: Option<PathBuf>) -> anyhow::Result<IntentRouter> {
    let (config, path) = haul::config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    Ok(IntentRouter::from_config(&config, Arc::new(MemoryStore::new())))
}

async fn run_route(
    config_path: Option<PathBuf>,
    driver: Option<String>,
    text: String,
) -> anyhow::Result<()> {
    let router = build_router(config_path)?;
    let driver = driver.unwrap_or_else(|| router.default_driver_id().to_string());
    let envelope = router.route(&text, &driver).await;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

async fn run_chat(config_path: Option<PathBuf>, driver: Option<String>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let router = build_router(config_path)?;
    let driver = driver.unwrap_or_else(|| router.default_driver_id().to_string());
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if input.eq_ignore_ascii_case("/status") {
            match router.driver_status(&driver).await {
                Ok(Some(record)) => println!(
                    "< {} is {} (location: {}, updated {})",
                    record.driver_id,
                    record.status,
                    if record.location.is_empty() { "-" } else { &record.location },
                    record.last_updated
                ),
                Ok(None) => println!("< no status recorded for {}", driver),
                Err(e) => eprintln!("status error: {}", e),
            }
            continue;
        }

        let envelope = router.route(input, &driver).await;
        log::debug!("routed to {} ({:?})", envelope.routed_to, envelope.status);
        println!("< {}", envelope.response.trim());
    }

    Ok(())
}
