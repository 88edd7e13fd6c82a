//! Types d'erreurs pour le crate osgml

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture d'un document GML
#[derive(Debug, Error)]
pub enum GmlError {
    /// Erreur d'I/O lors de la lecture du document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Flux XML mal formé
    #[error("Malformed XML at byte {position}: {reason}")]
    Xml { position: u64, reason: String },

    /// Document tronqué à l'intérieur d'une enveloppe
    #[error("Unexpected end of document inside <{element}>")]
    UnexpectedEof { element: String },

    /// Enveloppe (featureMember, dictionaryEntry) sans élément enfant
    #[error("Empty <{wrapper}> (member #{index})")]
    EmptyMember { wrapper: &'static str, index: u64 },

    /// Enveloppe contenant plusieurs éléments
    #[error("<{wrapper}> #{index} wraps {count} elements, expected exactly one")]
    AmbiguousMember {
        wrapper: &'static str,
        index: u64,
        count: usize,
    },

    /// Type de feature inconnu
    #[error("Unrecognized feature <{element}> (gml:id={id:?})")]
    UnrecognizedFeature { element: String, id: Option<String> },

    /// Champ obligatoire absent
    #[error("Missing field '{field}' on {feature} {id}")]
    MissingField {
        feature: &'static str,
        id: String,
        field: &'static str,
    },

    /// Valeur non interprétable
    #[error("Invalid value for '{field}' on {id}: {value:?}")]
    InvalidValue {
        id: String,
        field: &'static str,
        value: String,
    },

    /// Dimension déclarée invalide (0)
    #[error("Invalid srsDimension: {0}")]
    InvalidDimension(usize),

    /// Nombre de coordonnées incompatible avec la dimension déclarée
    #[error("coordinates length ({tokens}) is not divisible by srsDimension ({dimension})")]
    DimensionMismatch { tokens: usize, dimension: usize },

    /// Coordonnée non numérique
    #[error("Failed to parse coordinate token {token:?}")]
    InvalidCoordinate { token: String },

    /// Géométrie inutilisable (nombre de positions incorrect)
    #[error("Invalid {kind} geometry: {reason}")]
    InvalidGeometry { kind: &'static str, reason: String },

    /// Conversion d'unité non supportée
    #[error("Unsupported unit conversion from '{from}' to '{to}'")]
    UnsupportedConversion { from: String, to: String },
}

impl GmlError {
    /// Crée une erreur XML avec position
    pub fn xml(position: u64, reason: impl std::fmt::Display) -> Self {
        Self::Xml {
            position,
            reason: reason.to_string(),
        }
    }

    /// Crée une erreur de champ manquant
    pub fn missing(feature: &'static str, id: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            feature,
            id: id.into(),
            field,
        }
    }

    /// Crée une erreur de valeur invalide
    pub fn invalid_value(
        id: impl Into<String>,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            id: id.into(),
            field,
            value: value.into(),
        }
    }
}
