//! Point d'entrée CLI pour roads-pg

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Importer le réseau routier Ordnance Survey (GML) dans PostGIS
#[derive(Parser)]
#[command(name = "roads-pg")]
#[command(author, version)]
#[command(about = "Import Ordnance Survey road network GML into PostGIS")]
#[command(long_about = "Streaming importer for OS road network GML (RoadLink, RoadNode, MotorwayJunction).\n\nReference dictionaries must be loaded first with 'refdata'; 'import' resolves every coded attribute against them.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Import {
            path,
            config,
            lookup,
            report,
            db,
        } => {
            info!(path = %path.display(), config = %config, "Import vers PostGIS");
            cli::cmd_import(&path, &config, lookup, report.as_deref(), db).await?;
        }
        Commands::Refdata { table, path, db } => {
            info!(table = %table, path = %path.display(), "Import du dictionnaire");
            cli::cmd_refdata(&table, &path, db).await?;
        }
        Commands::Ping { db } => {
            cli::cmd_ping(db).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
