//! Accumulation des features en lots homogènes

use osgml::{Feature, FeatureKind, MotorwayJunction, RoadLink, RoadNode};

/// Taille fixe d'un lot envoyé à la base
pub const BATCH_SIZE: usize = 1000;

/// Lot d'un seul type de feature
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    RoadLinks(Vec<RoadLink>),
    RoadNodes(Vec<RoadNode>),
    MotorwayJunctions(Vec<MotorwayJunction>),
}

impl Batch {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Batch::RoadLinks(_) => FeatureKind::RoadLink,
            Batch::RoadNodes(_) => FeatureKind::RoadNode,
            Batch::MotorwayJunctions(_) => FeatureKind::MotorwayJunction,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Batch::RoadLinks(links) => links.len(),
            Batch::RoadNodes(nodes) => nodes.len(),
            Batch::MotorwayJunctions(junctions) => junctions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trois files indépendantes, une par type, vidées au seuil `BATCH_SIZE`
#[derive(Debug)]
pub struct BatchAccumulator {
    threshold: usize,
    road_links: Vec<RoadLink>,
    road_nodes: Vec<RoadNode>,
    motorway_junctions: Vec<MotorwayJunction>,
}

impl Default for BatchAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::with_threshold(BATCH_SIZE)
    }

    pub(crate) fn with_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            threshold,
            road_links: Vec::with_capacity(threshold),
            road_nodes: Vec::with_capacity(threshold),
            motorway_junctions: Vec::with_capacity(threshold),
        }
    }

    /// Ajoute une feature. Quand sa file atteint le seuil, la file entière
    /// est rendue et remplacée par une file vide.
    pub fn push(&mut self, feature: Feature) -> Option<Batch> {
        let threshold = self.threshold;
        match feature {
            Feature::RoadLink(link) => {
                self.road_links.push(link);
                take_full(&mut self.road_links, threshold).map(Batch::RoadLinks)
            }
            Feature::RoadNode(node) => {
                self.road_nodes.push(node);
                take_full(&mut self.road_nodes, threshold).map(Batch::RoadNodes)
            }
            Feature::MotorwayJunction(junction) => {
                self.motorway_junctions.push(junction);
                take_full(&mut self.motorway_junctions, threshold).map(Batch::MotorwayJunctions)
            }
        }
    }

    /// Vide toutes les files, y compris partielles ou vides
    pub fn finish(self) -> [Batch; 3] {
        [
            Batch::RoadLinks(self.road_links),
            Batch::RoadNodes(self.road_nodes),
            Batch::MotorwayJunctions(self.motorway_junctions),
        ]
    }

    /// Nombre de features en attente, tous types confondus
    pub fn pending(&self) -> usize {
        self.road_links.len() + self.road_nodes.len() + self.motorway_junctions.len()
    }
}

fn take_full<T>(queue: &mut Vec<T>, threshold: usize) -> Option<Vec<T>> {
    if queue.len() >= threshold {
        Some(std::mem::replace(queue, Vec::with_capacity(threshold)))
    } else {
        None
    }
}
