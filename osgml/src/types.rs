//! Types de données pour le crate osgml

use std::fmt;

/// Dimension utilisée quand `srsDimension` est absent (CRS plans, ex: EPSG:27700)
pub const DEFAULT_SRS_DIMENSION: usize = 2;

/// Une feature du réseau routier: exactement une variante renseignée
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    RoadLink(RoadLink),
    RoadNode(RoadNode),
    MotorwayJunction(MotorwayJunction),
}

impl Feature {
    /// Identifiant GML (`gml:id`) de la feature
    pub fn id(&self) -> &str {
        match self {
            Feature::RoadLink(link) => &link.id,
            Feature::RoadNode(node) => &node.id,
            Feature::MotorwayJunction(junction) => &junction.id,
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::RoadLink(_) => FeatureKind::RoadLink,
            Feature::RoadNode(_) => FeatureKind::RoadNode,
            Feature::MotorwayJunction(_) => FeatureKind::MotorwayJunction,
        }
    }
}

/// Type de feature, sans données
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    RoadLink,
    RoadNode,
    MotorwayJunction,
}

impl FeatureKind {
    /// Nom de l'élément GML correspondant
    pub fn element_name(self) -> &'static str {
        match self {
            FeatureKind::RoadLink => "RoadLink",
            FeatureKind::RoadNode => "RoadNode",
            FeatureKind::MotorwayJunction => "MotorwayJunction",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Tronçon de route
#[derive(Debug, Clone, PartialEq)]
pub struct RoadLink {
    /// Identifiant GML (ex: "osgb4000000023145678")
    pub id: String,

    /// Géométrie de l'axe
    pub centreline: LineString,

    /// Noeud de départ
    pub start_node: NodeRef,

    /// Noeud d'arrivée
    pub end_node: NodeRef,

    /// Classification (ex: "A Road", "Motorway")
    pub road_classification: CodeValue,

    /// Fonction (ex: "Local Road")
    pub road_function: CodeValue,

    /// Forme de la voie (ex: "Single Carriageway")
    pub form_of_way: CodeValue,

    /// Numéro de route (ex: "A303")
    pub road_classification_number: Option<String>,

    /// Nom principal
    pub name1: Option<String>,

    /// Langue du nom principal (`xml:lang`)
    pub name1_lang: Option<String>,

    pub road_name_toid: Option<String>,

    pub road_number_toid: Option<String>,

    /// Longueur déclarée
    pub length: Length,

    pub is_loop: bool,

    pub primary_route: bool,

    pub trunk_road: bool,
}

/// Noeud du réseau
#[derive(Debug, Clone, PartialEq)]
pub struct RoadNode {
    pub id: String,
    pub geometry: Point,
    /// Forme du noeud (ex: "junction", "pseudo node")
    pub form_of_road_node: CodeValue,
}

/// Échangeur autoroutier
#[derive(Debug, Clone, PartialEq)]
pub struct MotorwayJunction {
    pub id: String,
    pub geometry: Point,
    pub junction_number: String,
}

/// Géométrie linéaire brute (`gml:LineString`)
#[derive(Debug, Clone, PartialEq)]
pub struct LineString {
    /// Système de référence déclaré (`srsName`)
    pub srs_name: String,

    /// Nombre de valeurs par position (`srsDimension`)
    pub srs_dimension: usize,

    /// Liste de coordonnées brute (`gml:posList`)
    pub pos_list: String,
}

/// Géométrie ponctuelle brute (`gml:Point`)
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub srs_name: String,
    pub srs_dimension: usize,
    /// Position brute (`gml:pos`)
    pub pos: String,
}

/// Référence vers un noeud (`xlink:href="#osgb..."`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub href: String,
}

impl NodeRef {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    /// Identifiant nu du noeud référencé
    pub fn bare_id(&self) -> &str {
        strip_fragment(&self.href)
    }
}

/// Retire le marqueur de fragment local (`#`). Idempotent.
pub fn strip_fragment(href: &str) -> &str {
    href.trim_start_matches('#')
}

/// Valeur codée avec son espace de codes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeValue {
    pub code_space: String,
    pub value: String,
}

impl CodeValue {
    pub fn new(code_space: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            code_space: code_space.into(),
            value: value.into(),
        }
    }
}

/// Longueur avec son unité de mesure (`uom`)
#[derive(Debug, Clone, PartialEq)]
pub struct Length {
    pub uom: String,
    pub value: f64,
}
