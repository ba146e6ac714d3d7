mod commands;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "aigov-cli")]
#[command(about = "AI governance metrics command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sync brands from config/brands.yaml into the database.
    Seed,
    /// Recompute governance metrics and persist a snapshot per brand.
    Recompute {
        /// Restrict the run to one brand slug.
        #[arg(long)]
        brand: Option<String>,
    },
    /// Print the current governance assessment for one brand.
    Report {
        /// Brand slug to report on.
        #[arg(long)]
        brand: String,
        /// Emit the assessment as JSON instead of the text report.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = aigov_core::load_app_config()?;
    let pool_config = aigov_db::PoolConfig::from_app_config(&config);
    let pool = aigov_db::connect_pool(&config.database_url, pool_config).await?;
    aigov_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Seed => commands::run_seed(&pool, &config).await?,
        Commands::Recompute { brand } => {
            commands::run_recompute(&pool, &config, brand.as_deref()).await?;
        }
        Commands::Report { brand, json } => {
            commands::run_report(&pool, &config, &brand, json).await?;
        }
    }

    Ok(())
}
