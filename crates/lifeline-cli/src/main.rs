use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod ops;

#[cfg(test)]
mod tests;

#[derive(Debug, Parser)]
#[command(name = "lifeline-cli")]
#[command(about = "Lifeline dispatch network operations toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Upsert the hospital catalog into the database
    Seed {
        /// Catalog file (defaults to the configured hospitals path)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Fire a dispatch from the terminal and print the report
    Drill {
        /// Caller latitude in degrees
        #[arg(long)]
        lat: f64,
        /// Caller longitude in degrees
        #[arg(long)]
        lng: f64,
        /// Emergency category: medical or safety
        #[arg(long, default_value = "medical")]
        category: String,
        /// Free-text note describing the situation
        #[arg(long)]
        note: Option<String>,
    },
    /// Run one blood-request expiry sweep
    Expire,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Migrate => ops::run_migrate().await,
        Commands::Seed { file } => ops::run_seed(file.as_deref()).await,
        Commands::Drill {
            lat,
            lng,
            category,
            note,
        } => ops::run_drill(lat, lng, &category, note).await,
        Commands::Expire => ops::run_expire().await,
    }
}
