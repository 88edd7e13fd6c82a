//! Écriture des features dans PostGIS
//!
//! Chaque lot est traduit en lignes de paramètres (résolution des codes,
//! WKT, clés de substitution), puis envoyé en une seule fois: une requête
//! préparée, toutes les exécutions lancées ensemble et pipelinées par
//! tokio-postgres sur la connexion, dans une transaction par lot.

use deadpool_postgres::Pool;
use futures::future::join_all;
use osgml::{MotorwayJunction, RoadLink, RoadNode};
use tokio_postgres::types::ToSql;
use tracing::debug;

use crate::config::{ImportConfig, LookupPolicy};
use crate::error::{ImportError, Result};
use crate::import::FeatureStore;
use crate::store::identity::surrogate_id;
use crate::store::refdata::ReferenceCaches;
use crate::store::triggers::{self, TriggerAction};

pub const ROAD_LINKS: &str = "road_links";
pub const ROAD_NODES: &str = "road_nodes";

const ROAD_NODE_COLUMNS: [&str; 4] = ["id", "gml_id", "location", "form_of_road_id"];

const ROAD_LINK_COLUMNS: [&str; 16] = [
    "id",
    "source_id",
    "target_id",
    "gml_id",
    "center_line",
    "start_node_id",
    "end_node_id",
    "road_classification_id",
    "road_function_id",
    "form_of_way_id",
    "road_classification_number",
    "name1",
    "length_m",
    "loop",
    "primary_route",
    "trunk_road",
];

/// Ligne prête à être liée à une requête préparée
pub trait UpsertRow {
    /// Identifiant GML, pour les messages d'erreur
    fn gml_id(&self) -> &str;

    /// Paramètres dans l'ordre des colonnes
    fn params(&self) -> Vec<&(dyn ToSql + Sync)>;
}

/// Ligne `road_nodes`
#[derive(Debug, Clone, PartialEq)]
pub struct RoadNodeRow {
    pub id: i64,
    pub gml_id: String,
    pub location: String,
    pub form_of_road_id: Option<i32>,
}

impl RoadNodeRow {
    pub fn translate(
        node: &RoadNode,
        caches: &ReferenceCaches,
        policy: LookupPolicy,
    ) -> Result<Self> {
        Ok(Self {
            id: surrogate_id(&node.id),
            gml_id: node.id.clone(),
            location: node
                .geometry
                .to_wkt()
                .map_err(|e| ImportError::geometry(&node.id, e))?,
            form_of_road_id: caches
                .form_of_road_types
                .resolve(&node.form_of_road_node, policy, &node.id)?,
        })
    }
}

impl UpsertRow for RoadNodeRow {
    fn gml_id(&self) -> &str {
        &self.gml_id
    }

    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        let params: [&(dyn ToSql + Sync); 4] =
            [&self.id, &self.gml_id, &self.location, &self.form_of_road_id];
        params.to_vec()
    }
}

/// Ligne `road_links`
#[derive(Debug, Clone, PartialEq)]
pub struct RoadLinkRow {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub gml_id: String,
    pub center_line: String,
    pub start_node_id: String,
    pub end_node_id: String,
    pub road_classification_id: Option<i32>,
    pub road_function_id: Option<i32>,
    pub form_of_way_id: Option<i32>,
    pub road_classification_number: Option<String>,
    pub name1: Option<String>,
    pub length_m: f64,
    pub is_loop: bool,
    pub primary_route: bool,
    pub trunk_road: bool,
}

impl RoadLinkRow {
    pub fn translate(
        link: &RoadLink,
        caches: &ReferenceCaches,
        policy: LookupPolicy,
    ) -> Result<Self> {
        let start_node = link.start_node.bare_id();
        let end_node = link.end_node.bare_id();

        Ok(Self {
            id: surrogate_id(&link.id),
            source_id: surrogate_id(start_node),
            target_id: surrogate_id(end_node),
            gml_id: link.id.clone(),
            center_line: link
                .centreline
                .to_wkt()
                .map_err(|e| ImportError::geometry(&link.id, e))?,
            start_node_id: start_node.to_string(),
            end_node_id: end_node.to_string(),
            road_classification_id: caches.road_classifications.resolve(
                &link.road_classification,
                policy,
                &link.id,
            )?,
            road_function_id: caches
                .road_functions
                .resolve(&link.road_function, policy, &link.id)?,
            form_of_way_id: caches
                .form_of_way_types
                .resolve(&link.form_of_way, policy, &link.id)?,
            road_classification_number: link.road_classification_number.clone(),
            name1: link.name1.clone(),
            length_m: link
                .length
                .convert_to("m")
                .map_err(|e| ImportError::geometry(&link.id, e))?,
            is_loop: link.is_loop,
            primary_route: link.primary_route,
            trunk_road: link.trunk_road,
        })
    }
}

impl UpsertRow for RoadLinkRow {
    fn gml_id(&self) -> &str {
        &self.gml_id
    }

    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        let params: [&(dyn ToSql + Sync); 16] = [
            &self.id,
            &self.source_id,
            &self.target_id,
            &self.gml_id,
            &self.center_line,
            &self.start_node_id,
            &self.end_node_id,
            &self.road_classification_id,
            &self.road_function_id,
            &self.form_of_way_id,
            &self.road_classification_number,
            &self.name1,
            &self.length_m,
            &self.is_loop,
            &self.primary_route,
            &self.trunk_road,
        ];
        params.to_vec()
    }
}

/// Requête d'upsert: la colonne géométrique est reprojetée, toutes les
/// colonnes hors clé sont écrasées en cas de conflit sur `id`.
pub fn upsert_sql(
    table: &str,
    columns: &[&str],
    geometry_column: &str,
    source_srid: i32,
    target_srid: i32,
) -> String {
    let values: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            if *column == geometry_column {
                format!(
                    "ST_Transform(ST_SetSRID(ST_GeomFromText(${}), {}), {})",
                    i + 1,
                    source_srid,
                    target_srid
                )
            } else {
                format!("${}", i + 1)
            }
        })
        .collect();

    let updates: Vec<String> = columns
        .iter()
        .filter(|column| **column != "id")
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (id) DO UPDATE SET {}",
        table,
        columns.join(", "),
        values.join(", "),
        updates.join(", ")
    )
}

/// Passerelle PostGIS: upserts par lot et gestion des triggers
pub struct PostgresGateway<'a> {
    pool: &'a Pool,
    caches: &'a ReferenceCaches,
    policy: LookupPolicy,
    road_nodes_sql: String,
    road_links_sql: String,
}

impl<'a> PostgresGateway<'a> {
    pub fn new(pool: &'a Pool, caches: &'a ReferenceCaches, config: &ImportConfig) -> Self {
        Self {
            pool,
            caches,
            policy: config.lookup_policy,
            road_nodes_sql: upsert_sql(
                ROAD_NODES,
                &ROAD_NODE_COLUMNS,
                "location",
                config.source_srid,
                config.target_srid,
            ),
            road_links_sql: upsert_sql(
                ROAD_LINKS,
                &ROAD_LINK_COLUMNS,
                "center_line",
                config.source_srid,
                config.target_srid,
            ),
        }
    }

    /// Exécute un lot dans une transaction. La première ligne en échec (dans
    /// l'ordre du lot) est rapportée avec son identifiant GML.
    async fn execute_batch<R: UpsertRow>(
        &self,
        table: &'static str,
        sql: &str,
        rows: &[R],
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut client = self.pool.get().await?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| ImportError::database(table, e))?;
        let statement = transaction
            .prepare_cached(sql)
            .await
            .map_err(|e| ImportError::database(table, e))?;

        let params: Vec<Vec<&(dyn ToSql + Sync)>> = rows.iter().map(UpsertRow::params).collect();
        let results = join_all(
            params
                .iter()
                .map(|row_params| transaction.execute(&statement, row_params)),
        )
        .await;

        let mut affected = 0;
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(count) => affected += count,
                Err(source) => {
                    return Err(ImportError::Persistence {
                        table,
                        index,
                        gml_id: rows[index].gml_id().to_string(),
                        source,
                    })
                }
            }
        }

        transaction
            .commit()
            .await
            .map_err(|e| ImportError::database(table, e))?;

        debug!(table, rows = rows.len(), affected, "Batch upserted");
        Ok(affected)
    }

    async fn set_triggers(&self, action: TriggerAction) -> Result<()> {
        let client = self.pool.get().await?;
        triggers::apply(&client, action).await
    }
}

impl FeatureStore for PostgresGateway<'_> {
    async fn suspend_triggers(&mut self) -> Result<()> {
        self.set_triggers(TriggerAction::Suspend).await
    }

    async fn restore_triggers(&mut self) -> Result<()> {
        self.set_triggers(TriggerAction::Restore).await
    }

    async fn store_road_links(&mut self, links: &[RoadLink]) -> Result<()> {
        let rows = links
            .iter()
            .map(|link| RoadLinkRow::translate(link, self.caches, self.policy))
            .collect::<Result<Vec<_>>>()?;
        self.execute_batch(ROAD_LINKS, &self.road_links_sql, &rows)
            .await?;
        Ok(())
    }

    async fn store_road_nodes(&mut self, nodes: &[RoadNode]) -> Result<()> {
        let rows = nodes
            .iter()
            .map(|node| RoadNodeRow::translate(node, self.caches, self.policy))
            .collect::<Result<Vec<_>>>()?;
        self.execute_batch(ROAD_NODES, &self.road_nodes_sql, &rows)
            .await?;
        Ok(())
    }

    /// Les échangeurs ne sont pas encore stockés: le lot est accepté tel quel
    async fn store_motorway_junctions(&mut self, junctions: &[MotorwayJunction]) -> Result<()> {
        debug!(count = junctions.len(), "Motorway junctions accepted, not stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::refdata::{
        ReferenceCache, ReferenceEntry, FORM_OF_ROAD_TYPES, FORM_OF_WAY_TYPES,
        ROAD_CLASSIFICATIONS, ROAD_FUNCTIONS,
    };
    use osgml::{CodeValue, Length, LineString, NodeRef, Point};

    fn entry(id: i32, value: &str) -> ReferenceEntry {
        ReferenceEntry {
            id,
            value: value.into(),
            description: None,
        }
    }

    fn caches() -> ReferenceCaches {
        ReferenceCaches {
            road_classifications: ReferenceCache::from_entries(
                ROAD_CLASSIFICATIONS,
                [entry(1, "A Road"), entry(2, "Unclassified")],
            ),
            road_functions: ReferenceCache::from_entries(ROAD_FUNCTIONS, [entry(5, "Local Road")]),
            form_of_way_types: ReferenceCache::from_entries(
                FORM_OF_WAY_TYPES,
                [entry(9, "Single Carriageway")],
            ),
            form_of_road_types: ReferenceCache::from_entries(FORM_OF_ROAD_TYPES, [entry(17, "pseudo")]),
        }
    }

    fn node(id: &str, pos: &str, form: &str) -> RoadNode {
        RoadNode {
            id: id.into(),
            geometry: Point {
                srs_name: "urn:ogc:def:crs:EPSG::27700".into(),
                srs_dimension: 2,
                pos: pos.into(),
            },
            form_of_road_node: CodeValue::new("urn:x", form),
        }
    }

    fn link() -> RoadLink {
        RoadLink {
            id: "osgb100".into(),
            centreline: LineString {
                srs_name: "urn:ogc:def:crs:EPSG::27700".into(),
                srs_dimension: 2,
                pos_list: "1.0 2.0 3.0 4.0".into(),
            },
            start_node: NodeRef::new("#osgbA"),
            end_node: NodeRef::new("#osgbB"),
            road_classification: CodeValue::new("urn:x", "A Road"),
            road_function: CodeValue::new("urn:x", "Local Road"),
            form_of_way: CodeValue::new("urn:x", "Single Carriageway"),
            road_classification_number: Some("A303".into()),
            name1: Some("High Street".into()),
            name1_lang: Some("en".into()),
            road_name_toid: None,
            road_number_toid: None,
            length: Length {
                uom: "m".into(),
                value: 2.83,
            },
            is_loop: false,
            primary_route: true,
            trunk_road: false,
        }
    }

    #[test]
    fn test_translate_road_node() {
        let row = RoadNodeRow::translate(&node("osgb1", "0 0", "pseudo"), &caches(), LookupPolicy::Strict)
            .unwrap();
        assert_eq!(row.id, surrogate_id("osgb1"));
        assert_eq!(row.gml_id, "osgb1");
        assert_eq!(row.location, "POINT(0 0)");
        assert_eq!(row.form_of_road_id, Some(17));
        assert_eq!(row.params().len(), ROAD_NODE_COLUMNS.len());
    }

    #[test]
    fn test_translate_road_node_unknown_code() {
        let node = node("osgb2", "1 1", "roundabout");
        assert!(matches!(
            RoadNodeRow::translate(&node, &caches(), LookupPolicy::Strict),
            Err(ImportError::UnknownCode { .. })
        ));
        let row = RoadNodeRow::translate(&node, &caches(), LookupPolicy::Lenient).unwrap();
        assert_eq!(row.form_of_road_id, None);
    }

    #[test]
    fn test_translate_road_node_bad_geometry() {
        let node = node("osgb3", "1 2 3", "pseudo");
        assert!(matches!(
            RoadNodeRow::translate(&node, &caches(), LookupPolicy::Strict),
            Err(ImportError::Geometry { gml_id, .. }) if gml_id == "osgb3"
        ));
    }

    #[test]
    fn test_translate_road_link() {
        let row = RoadLinkRow::translate(&link(), &caches(), LookupPolicy::Strict).unwrap();
        assert_eq!(row.id, surrogate_id("osgb100"));
        assert_eq!(row.source_id, surrogate_id("osgbA"));
        assert_eq!(row.target_id, surrogate_id("osgbB"));
        assert_eq!(row.start_node_id, "osgbA");
        assert_eq!(row.end_node_id, "osgbB");
        assert_eq!(row.center_line, "LINESTRING(1.0 2.0,3.0 4.0)");
        assert_eq!(row.road_classification_id, Some(1));
        assert_eq!(row.road_function_id, Some(5));
        assert_eq!(row.form_of_way_id, Some(9));
        assert_eq!(row.length_m, 2.83);
        assert!(row.primary_route);
        assert_eq!(row.params().len(), ROAD_LINK_COLUMNS.len());
    }

    #[test]
    fn test_link_source_matches_node_id() {
        let row = RoadLinkRow::translate(&link(), &caches(), LookupPolicy::Strict).unwrap();
        let start = RoadNodeRow::translate(&node("osgbA", "1.0 2.0", "pseudo"), &caches(), LookupPolicy::Strict)
            .unwrap();
        assert_eq!(row.source_id, start.id);
    }

    #[test]
    fn test_translate_road_link_unsupported_unit() {
        let mut link = link();
        link.length.uom = "km".into();
        assert!(matches!(
            RoadLinkRow::translate(&link, &caches(), LookupPolicy::Strict),
            Err(ImportError::Geometry { .. })
        ));
    }

    #[test]
    fn test_road_nodes_sql() {
        let sql = upsert_sql(ROAD_NODES, &ROAD_NODE_COLUMNS, "location", 27700, 4326);
        assert_eq!(
            sql,
            "INSERT INTO road_nodes (id, gml_id, location, form_of_road_id) \
             VALUES ($1, $2, ST_Transform(ST_SetSRID(ST_GeomFromText($3), 27700), 4326), $4) \
             ON CONFLICT (id) DO UPDATE SET gml_id = EXCLUDED.gml_id, \
             location = EXCLUDED.location, form_of_road_id = EXCLUDED.form_of_road_id"
        );
    }

    #[test]
    fn test_road_links_sql_updates_every_column() {
        let sql = upsert_sql(ROAD_LINKS, &ROAD_LINK_COLUMNS, "center_line", 27700, 4326);
        assert!(sql.contains("ST_Transform(ST_SetSRID(ST_GeomFromText($5), 27700), 4326)"));
        assert!(sql.contains("$16)"));
        for column in &ROAD_LINK_COLUMNS[1..] {
            assert!(sql.contains(&format!("{column} = EXCLUDED.{column}")));
        }
        assert!(!sql.contains("SET id = "));
        assert!(!sql.contains(", id = "));
    }
}
