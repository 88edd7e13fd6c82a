//! Suspension des triggers d'intégrité pendant l'import
//!
//! Les tronçons référencent des noeuds pas encore écrits: les triggers (dont
//! ceux des clés étrangères) sont désactivés avant l'import et réactivés après.

use std::future::Future;

use tokio_postgres::Client;
use tracing::{debug, error};

use crate::error::{ImportError, Result};
use crate::store::gateway::{ROAD_LINKS, ROAD_NODES};

/// Tables dont les triggers sont suspendus, dans l'ordre d'exécution
pub const TRIGGER_TABLES: [&str; 2] = [ROAD_LINKS, ROAD_NODES];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    Suspend,
    Restore,
}

impl TriggerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerAction::Suspend => "suspend",
            TriggerAction::Restore => "restore",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            TriggerAction::Suspend => "DISABLE",
            TriggerAction::Restore => "ENABLE",
        }
    }

    /// Requête `ALTER TABLE` pour une table
    pub fn statement(self, table: &str) -> String {
        format!("ALTER TABLE {} {} TRIGGER ALL", table, self.keyword())
    }
}

/// Applique l'action sur chaque table.
///
/// La suspension s'arrête à la première erreur. La restauration est tentée
/// sur toutes les tables; la première erreur est rendue.
pub async fn apply(client: &Client, action: TriggerAction) -> Result<()> {
    apply_each(action, |sql| async move { client.batch_execute(&sql).await })
        .await
        .map_err(|(table, source)| ImportError::Trigger {
            action: action.as_str(),
            table,
            source,
        })
}

async fn apply_each<E, F, Fut>(
    action: TriggerAction,
    mut run: F,
) -> std::result::Result<(), (&'static str, E)>
where
    E: std::fmt::Display,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = std::result::Result<(), E>>,
{
    let mut first_error = None;

    for table in TRIGGER_TABLES {
        match run(action.statement(table)).await {
            Ok(()) => debug!(table, action = action.as_str(), "Triggers updated"),
            Err(e) if action == TriggerAction::Suspend => return Err((table, e)),
            Err(e) => {
                error!(table, error = %e, "Failed to restore triggers");
                if first_error.is_none() {
                    first_error = Some((table, e));
                }
            }
        }
    }

    match first_error {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}
