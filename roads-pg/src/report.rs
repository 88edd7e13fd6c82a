//! Rapport d'import
//!
//! Compteurs par type de feature, nombre de lots et durée totale.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use osgml::FeatureKind;
use serde::Serialize;

/// Statistiques par type de feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    /// Features transmises au stockage
    pub features: usize,
    /// Lots non vides transmis
    pub batches: usize,
}

/// Rapport complet d'import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Nombre de documents entièrement lus
    pub files_processed: usize,
    /// Nombre de features décodées
    pub features_read: u64,
    /// Durée de l'import
    pub duration_secs: f64,
    /// Statistiques par type (`RoadLink`, `RoadNode`, `MotorwayJunction`)
    pub by_kind: BTreeMap<String, KindStats>,
}

impl ImportReport {
    /// Enregistre un document lu jusqu'au bout
    pub fn record_file(&mut self) {
        self.files_processed += 1;
    }

    /// Enregistre un lot transmis au stockage
    pub fn record_batch(&mut self, kind: FeatureKind, size: usize) {
        let stats = self.by_kind.entry(kind.to_string()).or_default();
        stats.features += size;
        if size > 0 {
            stats.batches += 1;
        }
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    pub fn features(&self, kind: FeatureKind) -> usize {
        self.by_kind
            .get(kind.element_name())
            .map_or(0, |stats| stats.features)
    }

    /// Nombre total de features transmises
    pub fn total_features(&self) -> usize {
        self.by_kind.values().map(|stats| stats.features).sum()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n=== Summary ===");
        println!("Files: {}", self.files_processed);
        println!("Features read: {}", self.features_read);
        println!("Duration: {:.2}s", self.duration_secs);

        if !self.by_kind.is_empty() {
            println!("\nPer-kind:");
            for (kind, stats) in &self.by_kind {
                println!("- {}: {} features in {} batches", kind, stats.features, stats.batches);
            }
        }
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} files, {} features ({} links, {} nodes, {} junctions) in {:.2}s",
            self.files_processed,
            self.total_features(),
            self.features(FeatureKind::RoadLink),
            self.features(FeatureKind::RoadNode),
            self.features(FeatureKind::MotorwayJunction),
            self.duration_secs
        )
    }
}
