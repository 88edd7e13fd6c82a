//! # osgml
//!
//! Lecture en flux du réseau routier Ordnance Survey au format GML
//! (OS Open Roads: `RoadLink`, `RoadNode`, `MotorwayJunction`).
//!
//! ## Features
//!
//! - Lecture paresseuse avec `quick-xml`: mémoire bornée par une feature
//! - Classification typée des features (somme à une seule variante)
//! - Validation des coordonnées et sérialisation WKT sans perte de précision
//! - Dictionnaires de codes (`gml:Dictionary`)
//! - Documents `.bz2` décompressés à la volée
//!
//! ## Usage
//!
//! ```rust,ignore
//! use osgml::{open_document, Feature};
//! use std::path::Path;
//!
//! for feature in open_document(Path::new("SU_RoadLink.gml"))?.into_features() {
//!     match feature? {
//!         Feature::RoadLink(link) => println!("{}: {}", link.id, link.centreline.to_wkt()?),
//!         other => println!("{}", other.id()),
//!     }
//! }
//! ```

pub mod dictionary;
pub mod error;
pub mod geometry;
pub mod reader;
pub mod router;
pub mod types;

pub use dictionary::DictionaryEntry;
pub use error::GmlError;
pub use geometry::{parse_coordinates, CoordinateProvider};
pub use reader::{MemberReader, RawElement};
pub use types::{
    strip_fragment, CodeValue, Feature, FeatureKind, Length, LineString, MotorwayJunction,
    NodeRef, Point, RoadLink, RoadNode,
};

use std::io::BufRead;
use std::path::Path;

/// Lecteur de document ouvert depuis un fichier
pub type DocumentReader = MemberReader<Box<dyn BufRead + Send>>;

impl<R: BufRead> MemberReader<R> {
    /// Adapte le lecteur brut en flux de features typées
    pub fn into_features(self) -> impl Iterator<Item = Result<Feature, GmlError>> {
        self.map(|element| element.and_then(Feature::from_raw))
    }
}

/// Ouvre un document GML de features (`.gml` ou `.gml.bz2`)
pub fn open_document(path: &Path) -> Result<DocumentReader, GmlError> {
    let reader = reader::open_buffered(path)?;
    Ok(MemberReader::features(reader))
}

/// Décode les features d'un flux GML déjà ouvert
pub fn read_features<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Feature, GmlError>> {
    MemberReader::features(reader).into_features()
}

/// Lit un dictionnaire de codes complet (quelques centaines d'entrées au plus)
pub fn read_dictionary(path: &Path) -> Result<Vec<DictionaryEntry>, GmlError> {
    let reader = reader::open_buffered(path)?;
    dictionary::parse(reader)
}
