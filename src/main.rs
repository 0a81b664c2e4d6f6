use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ipgetter::{config::Settings, ip::IpGetter};

#[derive(Parser)]
#[command(name = "ipgetter")]
#[command(about = "Fetches your external IP address from a random public echo server")]
#[command(version)]
struct Cli {
    /// Path to a configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the external IP address (default)
    Get,

    /// Query every server once and report whether they agree
    Test {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the configured servers
    Servers,

    /// Show configuration file location and contents
    Config,
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(&settings.log_level);

    match cli.command.unwrap_or(Commands::Get) {
        Commands::Get => {
            let getter = IpGetter::from_settings(&settings)?;
            let ip = getter
                .resolve()
                .await
                .ok_or_else(|| anyhow!("Could not determine external IP address"))?;
            println!("{}", ip);
        }

        Commands::Test { json } => {
            let getter = IpGetter::from_settings(&settings)?;
            let report = getter.consistency_check().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                println!("{}", report);
            }
        }

        Commands::Servers => {
            for server in &settings.servers {
                println!("{}", server);
            }
        }

        Commands::Config => {
            show_config(&settings, cli.config)?;
        }
    }

    Ok(())
}

fn show_config(settings: &Settings, explicit_path: Option<PathBuf>) -> Result<()> {
    let config_path = explicit_path.unwrap_or_else(Settings::config_path);

    println!("Configuration file location: {}\n", config_path.display());

    if !config_path.exists() {
        println!("Configuration file not found, using built-in defaults.");
        println!("\nExample configuration:\n");
        println!(
            r#"log_level = "warn"
servers = [
    "https://api.ipify.org",
    "https://icanhazip.com/",
]

[fetch]
timeout_ms = 2000
max_attempts = 5
accept_invalid_certs = true
"#
        );
    }

    println!("Effective configuration:\n");
    println!("{}", toml::to_string_pretty(settings)?);

    Ok(())
}
