use clap::{Parser, Subcommand};
use std::sync::Arc;

use mmbot::infrastructure::adapters::{ConsoleAdapter, ConsoleInput};
use mmbot::infrastructure::logging::{self, LogFeed};
use mmbot::infrastructure::storage::open_brain;
use mmbot::{BotError, Config, Robot, ScriptRegistry};

#[derive(Parser)]
#[command(name = "mmbot")]
#[command(about = "A chat robot driven by scripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Robot name (overrides config)
    #[arg(short, long)]
    name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the robot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run(cli.config, cli.name) {
                eprintln!("mmbot: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("mmbot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => match Config::default_yaml() {
            Ok(yaml) => {
                println!("{}", yaml);
                println!("\nSave this to config.yaml and adjust as needed.");
            }
            Err(e) => {
                eprintln!("mmbot: {}", e);
                std::process::exit(1);
            }
        },
    }
}

fn load_config(config_path: &str) -> Config {
    if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    }
}

fn run(config_path: String, name_override: Option<String>) -> Result<(), BotError> {
    let mut config = load_config(&config_path);
    if let Some(name) = name_override {
        config.bot.name = name;
    }

    let feed = logging::init(&config.logging)?;
    tracing::info!(name = %config.bot.name, "Starting mmbot");

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))?;
    rt.block_on(serve(config, feed))
}

/// Build and run robots until Ctrl-C; a reset request rebuilds the robot
async fn serve(config: Config, feed: LogFeed) -> Result<(), BotError> {
    let scripts = Arc::new(ScriptRegistry::with_builtins());
    let console_input = if config.adapters.console.enabled {
        Some(ConsoleInput::stdin()?)
    } else {
        None
    };

    loop {
        let mut builder = Robot::builder()
            .config(config.clone())
            .brain(open_brain(&config.brain))
            .scripts(scripts.clone())
            .log_feed(feed.clone());

        if let Some(input) = &console_input {
            let console = ConsoleAdapter::new()
                .with_input(input.clone())
                .with_log_rooms(config.adapters.console.log_rooms.clone());
            builder = builder.adapter(Arc::new(console));
        }

        let robot = builder.build().await?;
        let reset = robot.reset_requested();
        robot.run().await?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                }
                return robot.shutdown().await;
            }
            _ = reset.notified() => {
                tracing::info!("Reset requested, rebuilding robot");
            }
        }
    }
}
