//! Définition et implémentation des commandes CLI
//!
//! - `import`: GML → PostGIS
//! - `refdata`: dictionnaire de codes → table de référence
//! - `ping`: test de connexion

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use roads_pg::store::refdata::{RefDataRepository, ReferenceCaches};
use roads_pg::store::pool::{self, SslMode};
use roads_pg::store::PostgresGateway;
use roads_pg::{run_import, DatabaseConfig, ImportConfig, LookupPolicy};

#[derive(Subcommand)]
pub enum Commands {
    /// Import road network GML (RoadLink, RoadNode, MotorwayJunction) into PostGIS
    Import {
        /// Path to a GML document (.gml, .gml.bz2) or a directory
        #[arg(short, long)]
        path: PathBuf,

        /// Config preset name (default) or path to a JSON config
        #[arg(long, default_value = "default")]
        config: String,

        /// Unknown reference codes: strict (fail) or lenient (store NULL)
        #[arg(long)]
        lookup: Option<LookupPolicy>,

        /// Write the import report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Load a reference dictionary (gml:Dictionary) into a reference table
    Refdata {
        /// Target table (road_classifications, road_functions, form_of_way_types, form_of_road_types)
        #[arg(short, long)]
        table: String,

        /// Path to the dictionary document
        #[arg(short, long)]
        path: PathBuf,

        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Check the database connection
    Ping {
        #[command(flatten)]
        db: DatabaseArgs,
    },
}

/// Surcharges de la configuration PostgreSQL
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / routing)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// Schema placed first in search_path (défaut : env PGSCHEMA)
    #[arg(long)]
    pub schema: Option<String>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<SslMode>,
}

/// Exécute la commande import
pub async fn cmd_import(
    path: &Path,
    config_name: &str,
    lookup: Option<LookupPolicy>,
    report_path: Option<&Path>,
    db: DatabaseArgs,
) -> Result<()> {
    let mut config = ImportConfig::resolve(config_name)?;
    if let Some(policy) = lookup {
        config.lookup_policy = policy;
    }

    let files = collect_documents(path)?;
    if files.is_empty() {
        anyhow::bail!("No GML documents (.gml, .gml.bz2) found in {}", path.display());
    }

    info!(
        path = %path.display(),
        documents = files.len(),
        config = config_name,
        "Starting import"
    );

    println!("=== Import ===");
    println!("Path: {}", path.display());
    println!("Documents: {}", files.len());
    println!("Config: {}", config_name);
    println!("SRID: {} -> {}", config.source_srid, config.target_srid);
    println!("Lookup policy: {:?}", config.lookup_policy);

    let pool = connect(db).await?;

    let caches = ReferenceCaches::load(&pool, config.preload_timeout())
        .await
        .context("Failed to load reference data")?;

    let mut gateway = PostgresGateway::new(&pool, &caches, &config);
    let report = run_import(&mut gateway, &files)
        .await
        .context("Import failed")?;

    report.display();
    if let Some(report_path) = report_path {
        report
            .save_to_file(report_path)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        println!("Report: {}", report_path.display());
    }

    info!("Import complete: {}", report.summary());
    Ok(())
}

/// Exécute la commande refdata
pub async fn cmd_refdata(table: &str, path: &Path, db: DatabaseArgs) -> Result<()> {
    let entries = osgml::read_dictionary(path)
        .with_context(|| format!("Failed to read dictionary {}", path.display()))?;

    info!(table, path = %path.display(), entries = entries.len(), "Importing reference data");

    let pool = connect(db).await?;
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;

    let stored = RefDataRepository::new(table)
        .store_all(&client, &entries)
        .await
        .with_context(|| format!("Failed to store reference data into {}", table))?;

    println!("{}: {} entries stored", table, stored);
    Ok(())
}

/// Exécute la commande ping
pub async fn cmd_ping(db: DatabaseArgs) -> Result<()> {
    let pool = connect(db).await?;
    let version = pool::test_connection(&pool).await?;
    println!("Connected: {}", version);
    Ok(())
}

async fn connect(db: DatabaseArgs) -> Result<deadpool_postgres::Pool> {
    let mut db_config = DatabaseConfig::from_env();
    apply_database_overrides(&mut db_config, db);
    println!(
        "Database: {}@{}:{}/{} (SSL: {:?})",
        db_config.user, db_config.host, db_config.port, db_config.dbname, db_config.ssl_mode
    );

    let pool = pool::create_pool(&db_config).await?;
    pool::test_connection(&pool).await?;
    Ok(pool)
}

fn apply_database_overrides(config: &mut DatabaseConfig, args: DatabaseArgs) {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(database) = args.database {
        config.dbname = database;
    }
    if let Some(user) = args.user {
        config.user = user;
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(schema) = args.schema {
        config.schema = Some(schema);
    }
    if let Some(ssl_mode) = args.ssl {
        config.ssl_mode = ssl_mode;
    }
}

fn is_document(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    name.ends_with(".gml") || name.ends_with(".gml.bz2")
}

/// Collecte récursivement les documents GML, triés par chemin
fn collect_documents(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut documents = Vec::new();
    walk(path, &mut documents)
        .with_context(|| format!("Cannot read directory {}", path.display()))?;
    documents.sort();
    Ok(documents)
}

fn walk(dir: &Path, documents: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry_path = entry?.path();

        if entry_path.is_dir() {
            walk(&entry_path, documents)?;
        } else if is_document(&entry_path) {
            documents.push(entry_path);
        }
    }
    Ok(())
}
