//! Configuration de l'import

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

/// Comportement quand un code est absent d'un dictionnaire de référence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupPolicy {
    /// Erreur fatale (défaut)
    #[default]
    Strict,
    /// Warning et clé étrangère NULL
    Lenient,
}

impl std::str::FromStr for LookupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(LookupPolicy::Strict),
            "lenient" => Ok(LookupPolicy::Lenient),
            _ => Err(format!("Invalid lookup policy: {}. Use: strict, lenient", s)),
        }
    }
}

/// Configuration principale de l'import
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImportConfig {
    /// SRID des coordonnées du document (British National Grid)
    #[serde(default = "default_source_srid")]
    pub source_srid: i32,

    /// SRID de stockage
    #[serde(default = "default_target_srid")]
    pub target_srid: i32,

    #[serde(default)]
    pub lookup_policy: LookupPolicy,

    /// Délai maximal du préchargement des dictionnaires
    #[serde(default = "default_preload_timeout")]
    pub preload_timeout_secs: u64,
}

fn default_source_srid() -> i32 {
    27700
}

fn default_target_srid() -> i32 {
    4326
}

fn default_preload_timeout() -> u64 {
    15 * 60
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            source_srid: default_source_srid(),
            target_srid: default_target_srid(),
            lookup_policy: LookupPolicy::default(),
            preload_timeout_secs: default_preload_timeout(),
        }
    }
}

impl ImportConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Configuration embarquée
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "default" => Self::load_embedded(include_str!("presets/default.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: default", preset),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }

    /// Preset embarqué ou chemin vers un fichier JSON
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        match name_or_path {
            "default" => Self::from_preset(name_or_path),
            _ => Self::load(Path::new(name_or_path)),
        }
    }

    pub fn preload_timeout(&self) -> Duration {
        Duration::from_secs(self.preload_timeout_secs)
    }
}
