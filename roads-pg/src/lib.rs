//! # roads-pg
//!
//! Import du réseau routier Ordnance Survey (GML) vers PostGIS.
//!
//! ## Features
//!
//! - Lecture en flux des documents, lots de 1000 features par type
//! - Upserts idempotents (clé dérivée de l'identifiant GML)
//! - Résolution des codes contre les dictionnaires de référence préchargés
//! - Reprojection par PostGIS (EPSG:27700 → EPSG:4326 par défaut)
//!
//! ## Usage CLI
//!
//! ```bash
//! # Dictionnaires de référence
//! roads-pg refdata --table road_functions --path ./RoadFunctionValue.xml
//!
//! # Import d'un fichier ou d'un répertoire
//! roads-pg import --path ./data/
//! ```

pub mod config;
pub mod error;
pub mod import;
pub mod report;
pub mod store;

pub use config::{ImportConfig, LookupPolicy};
pub use error::ImportError;
pub use import::{run_import, FeatureStore};
pub use report::ImportReport;
pub use store::pool::{create_pool, DatabaseConfig};
