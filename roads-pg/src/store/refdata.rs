//! Dictionnaires de référence (classifications, fonctions, formes de voie)
//!
//! Chaque dictionnaire est une table `(id, value, description)`. Les quatre
//! tables sont chargées une seule fois en début d'import dans des caches
//! immuables, partagés par référence avec la passerelle d'écriture.

use std::collections::HashMap;
use std::time::Duration;

use deadpool_postgres::Pool;
use futures::future::join_all;
use osgml::{CodeValue, DictionaryEntry};
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;
use tracing::{debug, info, warn};

use crate::config::LookupPolicy;
use crate::error::{ImportError, Result};

pub const ROAD_CLASSIFICATIONS: &str = "road_classifications";
pub const ROAD_FUNCTIONS: &str = "road_functions";
pub const FORM_OF_WAY_TYPES: &str = "form_of_way_types";
pub const FORM_OF_ROAD_TYPES: &str = "form_of_road_types";

/// Entrée d'un dictionnaire chargée depuis la base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub id: i32,
    pub value: String,
    pub description: Option<String>,
}

/// Correspondance valeur codée → entrée, pour un dictionnaire
#[derive(Debug, Clone, Default)]
pub struct ReferenceCache {
    dictionary: String,
    entries: HashMap<String, ReferenceEntry>,
}

impl ReferenceCache {
    pub fn new(dictionary: impl Into<String>) -> Self {
        Self {
            dictionary: dictionary.into(),
            entries: HashMap::new(),
        }
    }

    /// Construit un cache depuis des entrées déjà lues
    pub fn from_entries(
        dictionary: impl Into<String>,
        entries: impl IntoIterator<Item = ReferenceEntry>,
    ) -> Self {
        let mut cache = Self::new(dictionary);
        for entry in entries {
            cache.entries.insert(entry.value.clone(), entry);
        }
        cache
    }

    pub fn get(&self, value: &str) -> Option<&ReferenceEntry> {
        self.entries.get(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Résout un code en clé étrangère.
    ///
    /// En mode strict un code inconnu est une erreur; en mode lenient il est
    /// signalé et la clé vaut `None` (jamais 0).
    pub fn resolve(
        &self,
        code: &CodeValue,
        policy: LookupPolicy,
        gml_id: &str,
    ) -> Result<Option<i32>> {
        if let Some(entry) = self.entries.get(&code.value) {
            return Ok(Some(entry.id));
        }

        match policy {
            LookupPolicy::Strict => Err(ImportError::UnknownCode {
                dictionary: self.dictionary.clone(),
                value: code.value.clone(),
                gml_id: gml_id.to_string(),
            }),
            LookupPolicy::Lenient => {
                warn!(
                    dictionary = %self.dictionary,
                    value = %code.value,
                    gml_id = %gml_id,
                    "Unknown code, storing NULL"
                );
                Ok(None)
            }
        }
    }
}

/// Les quatre dictionnaires utilisés par l'import
#[derive(Debug, Clone, Default)]
pub struct ReferenceCaches {
    pub road_classifications: ReferenceCache,
    pub road_functions: ReferenceCache,
    pub form_of_way_types: ReferenceCache,
    pub form_of_road_types: ReferenceCache,
}

impl ReferenceCaches {
    /// Charge les quatre dictionnaires, sous un délai global
    pub async fn load(pool: &Pool, timeout: Duration) -> Result<Self> {
        let client = pool.get().await?;

        let caches = tokio::time::timeout(timeout, async {
            Ok::<_, ImportError>(Self {
                road_classifications: RefDataRepository::new(ROAD_CLASSIFICATIONS)
                    .fetch_all(&client)
                    .await?,
                road_functions: RefDataRepository::new(ROAD_FUNCTIONS)
                    .fetch_all(&client)
                    .await?,
                form_of_way_types: RefDataRepository::new(FORM_OF_WAY_TYPES)
                    .fetch_all(&client)
                    .await?,
                form_of_road_types: RefDataRepository::new(FORM_OF_ROAD_TYPES)
                    .fetch_all(&client)
                    .await?,
            })
        })
        .await
        .map_err(|_| ImportError::ReferencePreload(timeout))??;

        info!(
            road_classifications = caches.road_classifications.len(),
            road_functions = caches.road_functions.len(),
            form_of_way_types = caches.form_of_way_types.len(),
            form_of_road_types = caches.form_of_road_types.len(),
            "Reference data loaded"
        );

        Ok(caches)
    }
}

/// Accès générique à une table de dictionnaire
#[derive(Debug, Clone)]
pub struct RefDataRepository {
    table: String,
}

impl RefDataRepository {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Lit toute la table. Une table vide donne un cache vide.
    pub async fn fetch_all(&self, client: &Client) -> Result<ReferenceCache> {
        let sql = format!(
            "SELECT id, value, description FROM {}",
            quote_ident(&self.table)
        );
        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| ImportError::database(&self.table, e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = ReferenceEntry {
                id: row
                    .try_get(0)
                    .map_err(|e| ImportError::database(&self.table, e))?,
                value: row
                    .try_get(1)
                    .map_err(|e| ImportError::database(&self.table, e))?,
                description: row
                    .try_get(2)
                    .map_err(|e| ImportError::database(&self.table, e))?,
            };
            entries.push(entry);
        }

        debug!(table = %self.table, entries = entries.len(), "Fetched reference table");
        Ok(ReferenceCache::from_entries(self.table.clone(), entries))
    }

    /// Insère ou met à jour les entrées d'un dictionnaire (clé: `value`)
    pub async fn store_all(&self, client: &Client, entries: &[DictionaryEntry]) -> Result<u64> {
        let sql = format!(
            "INSERT INTO {} (value, description) VALUES ($1, $2) \
             ON CONFLICT (value) DO UPDATE SET description = EXCLUDED.description",
            quote_ident(&self.table)
        );
        let statement = client
            .prepare(&sql)
            .await
            .map_err(|e| ImportError::database(&self.table, e))?;

        let descriptions: Vec<Option<&str>> = entries
            .iter()
            .map(|entry| nullable_text(entry.description.as_deref()))
            .collect();
        let params: Vec<[&(dyn ToSql + Sync); 2]> = entries
            .iter()
            .zip(&descriptions)
            .map(|(entry, description)| [&entry.value as &(dyn ToSql + Sync), description])
            .collect();
        let results = join_all(
            params
                .iter()
                .map(|row_params| client.execute(&statement, row_params)),
        )
        .await;

        let mut stored = 0;
        for result in results {
            stored += result.map_err(|e| ImportError::database(&self.table, e))?;
        }

        info!(table = %self.table, entries = stored, "Reference data stored");
        Ok(stored)
    }
}

/// Texte vide ou fait de blancs → NULL
fn nullable_text(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Identifiant SQL entre guillemets doubles
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
