//! Identifiant numérique stable dérivé de l'identifiant GML
//!
//! La clé primaire des tables de features est un `BIGINT` calculé à partir de
//! l'identifiant nu (sans `#`). Le calcul est pur: le même identifiant donne
//! toujours la même clé, d'un import à l'autre.

use osgml::strip_fragment;

/// Clé de substitution d'une feature (`blake3`, 8 premiers octets, little-endian)
pub fn surrogate_id(gml_id: &str) -> i64 {
    let hash = blake3::hash(strip_fragment(gml_id).as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    i64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surrogate_id_is_deterministic() {
        assert_eq!(surrogate_id("osgb1"), surrogate_id("osgb1"));
    }

    #[test]
    fn test_surrogate_id_ignores_fragment_marker() {
        assert_eq!(surrogate_id("#osgb4000000023145678"), surrogate_id("osgb4000000023145678"));
    }

    #[test]
    fn test_surrogate_id_distinguishes_ids() {
        assert_ne!(surrogate_id("osgb1"), surrogate_id("osgb2"));
        assert_ne!(surrogate_id("osgb12"), surrogate_id("osgb21"));
    }

    #[test]
    fn test_surrogate_id_matches_blake3_prefix() {
        let hash = blake3::hash(b"osgb123");
        let expected = i64::from_le_bytes(hash.as_bytes()[..8].try_into().unwrap());
        assert_eq!(surrogate_id("#osgb123"), expected);
    }
}
