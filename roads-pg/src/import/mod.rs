//! Pipeline d'import: lecture → classification → lots → stockage
//!
//! Séquentiel: un document à la fois, une feature à la fois. Les triggers
//! sont suspendus avant le premier lot et toujours restaurés à la fin, y
//! compris après une erreur.

pub mod batch;

use std::path::PathBuf;
use std::time::Instant;

use osgml::{MotorwayJunction, RoadLink, RoadNode};
use tracing::{debug, error, info};

use crate::error::{ImportError, Result};
use crate::report::ImportReport;

pub use batch::{Batch, BatchAccumulator, BATCH_SIZE};

/// Intervalle de log de progression (en features)
pub const PROGRESS_INTERVAL: u64 = 100_000;

/// Destination des lots
#[allow(async_fn_in_trait)]
pub trait FeatureStore {
    async fn suspend_triggers(&mut self) -> Result<()>;

    async fn restore_triggers(&mut self) -> Result<()>;

    async fn store_road_links(&mut self, links: &[RoadLink]) -> Result<()>;

    async fn store_road_nodes(&mut self, nodes: &[RoadNode]) -> Result<()>;

    async fn store_motorway_junctions(&mut self, junctions: &[MotorwayJunction]) -> Result<()>;
}

/// Importe les documents dans l'ordre donné
pub async fn run_import<S: FeatureStore>(store: &mut S, files: &[PathBuf]) -> Result<ImportReport> {
    let started_at = Instant::now();

    let outcome = match store.suspend_triggers().await {
        Ok(()) => import_files(store, files).await,
        Err(e) => Err(e),
    };

    let restored = store.restore_triggers().await;

    match (outcome, restored) {
        (Ok(mut report), Ok(())) => {
            report.set_duration(started_at.elapsed());
            info!(
                files = report.files_processed,
                features = report.features_read,
                "Import complete"
            );
            Ok(report)
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(restore_error)) => {
            error!(error = %restore_error, "Failed to restore triggers after import failure");
            Err(e)
        }
    }
}

async fn import_files<S: FeatureStore>(store: &mut S, files: &[PathBuf]) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let mut accumulator = BatchAccumulator::new();

    for (index, path) in files.iter().enumerate() {
        info!("processing file {} of {}: {}", index + 1, files.len(), path.display());

        let document = osgml::open_document(path).map_err(|e| ImportError::input(path, e))?;
        for feature in document.into_features() {
            let feature = feature.map_err(|e| ImportError::input(path, e))?;

            report.features_read += 1;
            if report.features_read % PROGRESS_INTERVAL == 0 {
                info!(features = report.features_read, "Import progress");
            }

            if let Some(batch) = accumulator.push(feature) {
                flush(store, batch, &mut report).await?;
            }
        }

        report.record_file();
    }

    for batch in accumulator.finish() {
        flush(store, batch, &mut report).await?;
    }

    Ok(report)
}

async fn flush<S: FeatureStore>(store: &mut S, batch: Batch, report: &mut ImportReport) -> Result<()> {
    debug!(kind = %batch.kind(), size = batch.len(), "Flushing batch");

    match &batch {
        Batch::RoadLinks(links) => store.store_road_links(links).await?,
        Batch::RoadNodes(nodes) => store.store_road_nodes(nodes).await?,
        Batch::MotorwayJunctions(junctions) => store.store_motorway_junctions(junctions).await?,
    }

    report.record_batch(batch.kind(), batch.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use osgml::{FeatureKind, GmlError};
    use std::fmt::Write;
    use std::path::Path;

    /// Stockage en mémoire qui journalise chaque appel
    #[derive(Default)]
    struct MemoryStore {
        calls: Vec<String>,
        nodes: Vec<String>,
        links: Vec<String>,
        fail_on_nodes: bool,
        fail_on_suspend: bool,
    }

    impl FeatureStore for MemoryStore {
        async fn suspend_triggers(&mut self) -> Result<()> {
            self.calls.push("suspend".into());
            if self.fail_on_suspend {
                return Err(ImportError::ReferencePreload(std::time::Duration::ZERO));
            }
            Ok(())
        }

        async fn restore_triggers(&mut self) -> Result<()> {
            self.calls.push("restore".into());
            Ok(())
        }

        async fn store_road_links(&mut self, links: &[RoadLink]) -> Result<()> {
            self.calls.push(format!("links:{}", links.len()));
            self.links.extend(links.iter().map(|l| l.id.clone()));
            Ok(())
        }

        async fn store_road_nodes(&mut self, nodes: &[RoadNode]) -> Result<()> {
            self.calls.push(format!("nodes:{}", nodes.len()));
            if self.fail_on_nodes && !nodes.is_empty() {
                return Err(ImportError::UnknownCode {
                    dictionary: "form_of_road_types".into(),
                    value: "roundabout".into(),
                    gml_id: nodes[0].id.clone(),
                });
            }
            self.nodes.extend(nodes.iter().map(|n| n.id.clone()));
            Ok(())
        }

        async fn store_motorway_junctions(&mut self, junctions: &[MotorwayJunction]) -> Result<()> {
            self.calls.push(format!("junctions:{}", junctions.len()));
            Ok(())
        }
    }

    fn node_member(id: &str) -> String {
        format!(
            r#"<gml:featureMember><road:RoadNode gml:id="{id}"><net:geometry><gml:Point srsDimension="2"><gml:pos>0 0</gml:pos></gml:Point></net:geometry><road:formOfRoadNode codeSpace="urn:x">pseudo</road:formOfRoadNode></road:RoadNode></gml:featureMember>"#
        )
    }

    fn link_member(id: &str) -> String {
        format!(
            r##"<gml:featureMember><road:RoadLink gml:id="{id}"><road:centrelineGeometry><gml:LineString srsDimension="2"><gml:posList>0 0 1 1</gml:posList></gml:LineString></road:centrelineGeometry><road:startNode xlink:href="#osgbA"/><road:endNode xlink:href="#osgbB"/><road:roadClassification codeSpace="urn:x">Unclassified</road:roadClassification><road:roadFunction codeSpace="urn:x">Local Road</road:roadFunction><road:formOfWay codeSpace="urn:x">Single Carriageway</road:formOfWay><road:length uom="m">1.4</road:length></road:RoadLink></gml:featureMember>"##
        )
    }

    fn junction_member(id: &str) -> String {
        format!(
            r#"<gml:featureMember><road:MotorwayJunction gml:id="{id}"><net:geometry><gml:Point><gml:pos>5 6</gml:pos></gml:Point></net:geometry><road:junctionNumber>4</road:junctionNumber></road:MotorwayJunction></gml:featureMember>"#
        )
    }

    fn write_document(dir: &Path, name: &str, members: &[String]) -> PathBuf {
        let mut doc = String::from("<gml:FeatureCollection>");
        for member in members {
            let _ = write!(doc, "{}", member);
        }
        doc.push_str("</gml:FeatureCollection>");
        let path = dir.join(name);
        std::fs::write(&path, doc).unwrap();
        path
    }

    #[tokio::test]
    async fn test_import_across_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_document(
            dir.path(),
            "a.gml",
            &[node_member("osgb1"), link_member("osgb10"), junction_member("osgbJ1")],
        );
        let second = write_document(dir.path(), "b.gml", &[node_member("osgb2")]);

        let mut store = MemoryStore::default();
        let report = run_import(&mut store, &[first, second]).await.unwrap();

        assert_eq!(
            store.calls,
            vec!["suspend", "links:1", "nodes:2", "junctions:1", "restore"]
        );
        assert_eq!(store.nodes, vec!["osgb1", "osgb2"]);
        assert_eq!(store.links, vec!["osgb10"]);
        assert_eq!(report.files_processed, 2);
        assert_eq!(report.features_read, 4);
        assert_eq!(report.features(FeatureKind::RoadNode), 2);
        assert_eq!(report.features(FeatureKind::MotorwayJunction), 1);
    }

    #[tokio::test]
    async fn test_import_flushes_full_and_partial_batches() {
        let dir = tempfile::tempdir().unwrap();
        let members: Vec<String> = (0..2500).map(|i| node_member(&format!("osgb{i}"))).collect();
        let path = write_document(dir.path(), "nodes.gml", &members);

        let mut store = MemoryStore::default();
        let report = run_import(&mut store, &[path]).await.unwrap();

        assert_eq!(
            store.calls,
            vec![
                "suspend",
                "nodes:1000",
                "nodes:1000",
                "links:0",
                "nodes:500",
                "junctions:0",
                "restore"
            ]
        );
        assert_eq!(store.nodes.len(), 2500);
        assert_eq!(store.nodes.first().map(String::as_str), Some("osgb0"));
        assert_eq!(store.nodes.last().map(String::as_str), Some("osgb2499"));
        assert_eq!(report.by_kind["RoadNode"].batches, 3);
    }

    #[tokio::test]
    async fn test_triggers_restored_after_store_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_document(dir.path(), "a.gml", &[node_member("osgb1")]);

        let mut store = MemoryStore {
            fail_on_nodes: true,
            ..Default::default()
        };
        let result = run_import(&mut store, &[path]).await;

        assert!(matches!(
            result,
            Err(ImportError::UnknownCode { ref gml_id, .. }) if gml_id == "osgb1"
        ));
        assert_eq!(store.calls.last().map(String::as_str), Some("restore"));
    }

    #[tokio::test]
    async fn test_triggers_restored_after_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gml");
        std::fs::write(&path, "<c><featureMember><RoadNode gml:id=\"x\"></featureMember>").unwrap();

        let mut store = MemoryStore::default();
        let result = run_import(&mut store, &[path.clone()]).await;

        match result {
            Err(ImportError::Input { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("Expected Input error, got {:?}", other),
        }
        assert_eq!(store.calls, vec!["suspend", "restore"]);
    }

    #[tokio::test]
    async fn test_unrecognized_feature_aborts_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_document(
            dir.path(),
            "a.gml",
            &[
                node_member("osgb1"),
                "<gml:featureMember><road:FerryLink gml:id=\"osgbF\"/></gml:featureMember>".into(),
                node_member("osgb2"),
            ],
        );

        let mut store = MemoryStore::default();
        let result = run_import(&mut store, &[path]).await;

        assert!(matches!(
            result,
            Err(ImportError::Input {
                source: GmlError::UnrecognizedFeature { .. },
                ..
            })
        ));
        assert!(store.nodes.is_empty());
        assert_eq!(store.calls, vec!["suspend", "restore"]);
    }

    #[tokio::test]
    async fn test_suspend_failure_still_restores() {
        let mut store = MemoryStore {
            fail_on_suspend: true,
            ..Default::default()
        };
        let result = run_import(&mut store, &[PathBuf::from("/nonexistent.gml")]).await;

        assert!(matches!(result, Err(ImportError::ReferencePreload(_))));
        assert_eq!(store.calls, vec!["suspend", "restore"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_input_error() {
        let mut store = MemoryStore::default();
        let result = run_import(&mut store, &[PathBuf::from("/nonexistent/roads.gml")]).await;

        assert!(matches!(
            result,
            Err(ImportError::Input {
                source: GmlError::Io(_),
                ..
            })
        ));
        assert_eq!(store.calls, vec!["suspend", "restore"]);
    }
}
