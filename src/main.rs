pub mod classify;
pub mod config;
pub mod data;
pub mod popup;
pub mod server;
pub mod stats;
pub mod style;
pub mod types;
pub mod view;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the walkability map and its API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the unsuitable-segment percentage for every profile
    Stats {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            server::start_server(app_config).await?;
        }
        Commands::Stats { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let loader = data::DatasetLoader::from_config(&app_config.data);
            let entries = server::compute_startup_stats(&app_config, &loader).await;

            println!("Percentage of unsuitable road segments in Salzburg");
            for entry in &entries {
                println!("  {}: {}%", entry.profile, entry.percent_unsuitable);
            }
            println!();
            println!("{}", stats::ATTRIBUTION);
        }
    }

    Ok(())
}
