//! Lecture des coordonnées GML et sérialisation WKT
//!
//! Les coordonnées sont validées (dimension, valeurs numériques) puis
//! réécrites en WKT à partir des tokens d'origine, sans aller-retour par
//! `f64`, pour ne pas perdre de précision.

use geo::Coord;

use crate::types::{Length, LineString, Point};
use crate::GmlError;

/// Source de coordonnées brutes: liste de tokens et dimension déclarée
pub trait CoordinateProvider {
    /// Texte brut des coordonnées, séparées par des blancs
    fn pos_list(&self) -> &str;

    /// Nombre de valeurs par position
    fn srs_dimension(&self) -> usize;
}

impl CoordinateProvider for LineString {
    fn pos_list(&self) -> &str {
        &self.pos_list
    }

    fn srs_dimension(&self) -> usize {
        self.srs_dimension
    }
}

impl CoordinateProvider for Point {
    fn pos_list(&self) -> &str {
        &self.pos
    }

    fn srs_dimension(&self) -> usize {
        self.srs_dimension
    }
}

/// Découpe les coordonnées en tokens et vérifie la dimension
fn split_tokens<P: CoordinateProvider + ?Sized>(provider: &P) -> Result<Vec<&str>, GmlError> {
    let dimension = provider.srs_dimension();
    if dimension == 0 {
        return Err(GmlError::InvalidDimension(dimension));
    }

    let tokens: Vec<&str> = provider.pos_list().split_whitespace().collect();
    if tokens.len() % dimension != 0 {
        return Err(GmlError::DimensionMismatch {
            tokens: tokens.len(),
            dimension,
        });
    }

    Ok(tokens)
}

fn parse_token(token: &str) -> Result<f64, GmlError> {
    match fast_float::parse::<f64, _>(token) {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(GmlError::InvalidCoordinate {
            token: token.to_string(),
        }),
    }
}

/// Parse les coordonnées en tuples de `srs_dimension` valeurs
pub fn parse_coordinates<P: CoordinateProvider + ?Sized>(
    provider: &P,
) -> Result<Vec<Vec<f64>>, GmlError> {
    let dimension = provider.srs_dimension();
    let tokens = split_tokens(provider)?;

    tokens
        .chunks(dimension)
        .map(|tuple| tuple.iter().map(|t| parse_token(t)).collect())
        .collect()
}

/// Tuples validés, sous forme de tokens d'origine
fn checked_tuples<P: CoordinateProvider + ?Sized>(provider: &P) -> Result<Vec<String>, GmlError> {
    let dimension = provider.srs_dimension();
    let tokens = split_tokens(provider)?;
    for token in &tokens {
        parse_token(token)?;
    }

    Ok(tokens.chunks(dimension).map(|tuple| tuple.join(" ")).collect())
}

impl Point {
    /// Sérialise en WKT: `POINT(x y)`
    pub fn to_wkt(&self) -> Result<String, GmlError> {
        let tuples = checked_tuples(self)?;
        match tuples.as_slice() {
            [single] => Ok(format!("POINT({})", single)),
            _ => Err(GmlError::InvalidGeometry {
                kind: "Point",
                reason: format!("expected 1 position, got {}", tuples.len()),
            }),
        }
    }

    /// Convertit en point `geo` (x, y; la composante z est ignorée)
    pub fn to_geo(&self) -> Result<geo::Point<f64>, GmlError> {
        let coords = parse_coordinates(self)?;
        match coords.as_slice() {
            [single] => Ok(geo::Point::from(to_coord(single))),
            _ => Err(GmlError::InvalidGeometry {
                kind: "Point",
                reason: format!("expected 1 position, got {}", coords.len()),
            }),
        }
    }
}

impl LineString {
    /// Sérialise en WKT: `LINESTRING(x1 y1,x2 y2,...)`, ordre et texte conservés
    pub fn to_wkt(&self) -> Result<String, GmlError> {
        let tuples = checked_tuples(self)?;
        if tuples.len() < 2 {
            return Err(GmlError::InvalidGeometry {
                kind: "LineString",
                reason: format!("expected at least 2 positions, got {}", tuples.len()),
            });
        }
        Ok(format!("LINESTRING({})", tuples.join(",")))
    }

    /// Convertit en ligne `geo`
    pub fn to_geo(&self) -> Result<geo::LineString<f64>, GmlError> {
        let coords = parse_coordinates(self)?;
        Ok(geo::LineString::new(coords.iter().map(|c| to_coord(c)).collect()))
    }
}

fn to_coord(tuple: &[f64]) -> Coord<f64> {
    Coord {
        x: tuple.first().copied().unwrap_or_default(),
        y: tuple.get(1).copied().unwrap_or_default(),
    }
}

impl Length {
    /// Convertit la longueur dans l'unité demandée.
    ///
    /// Seule l'identité est supportée: toute autre combinaison est une erreur.
    pub fn convert_to(&self, unit: &str) -> Result<f64, GmlError> {
        if self.uom == unit {
            Ok(self.value)
        } else {
            Err(GmlError::UnsupportedConversion {
                from: self.uom.clone(),
                to: unit.to_string(),
            })
        }
    }
}
