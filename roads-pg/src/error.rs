//! Erreurs de l'import vers PostGIS

use std::path::PathBuf;

use osgml::GmlError;
use thiserror::Error;

/// Erreurs fatales d'un import. Aucune n'est rattrapée: l'import s'arrête à la
/// première, après restauration des triggers.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Document illisible, mal formé ou contenant une feature inconnue
    #[error("Failed to read {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: GmlError,
    },

    /// Géométrie ou longueur inutilisable
    #[error("Invalid geometry on {gml_id}: {source}")]
    Geometry {
        gml_id: String,
        #[source]
        source: GmlError,
    },

    /// Code absent du dictionnaire de référence (politique stricte)
    #[error("Unknown {dictionary} code {value:?} on {gml_id}")]
    UnknownCode {
        dictionary: String,
        value: String,
        gml_id: String,
    },

    /// Échec d'une requête dans un lot
    #[error("Failed to upsert {gml_id} into {table} (row {index} of batch): {source}")]
    Persistence {
        table: &'static str,
        index: usize,
        gml_id: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Échec d'une requête hors lot (préparation, dictionnaires)
    #[error("Database error on {table}: {source}")]
    Database {
        table: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Échec de suspension ou de restauration des triggers
    #[error("Failed to {action} triggers on {table}: {source}")]
    Trigger {
        action: &'static str,
        table: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Préchargement des dictionnaires trop long
    #[error("Reference preload timed out after {0:?}")]
    ReferencePreload(std::time::Duration),

    /// Connexion indisponible
    #[error("Failed to get connection from pool: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
}

impl ImportError {
    /// Rattache une erreur de décodage au fichier en cours
    pub fn input(path: impl Into<PathBuf>, source: GmlError) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }

    pub fn geometry(gml_id: impl Into<String>, source: GmlError) -> Self {
        Self::Geometry {
            gml_id: gml_id.into(),
            source,
        }
    }

    pub fn database(table: impl Into<String>, source: tokio_postgres::Error) -> Self {
        Self::Database {
            table: table.into(),
            source,
        }
    }
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;
