//! Parser pour les dictionnaires de codes (`gml:Dictionary`)

use std::io::BufRead;

use crate::reader::{MemberReader, RawElement};
use crate::GmlError;

/// Entrée d'un dictionnaire: valeur codée et description optionnelle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub value: String,
    pub description: Option<String>,
}

impl DictionaryEntry {
    fn from_raw(element: &RawElement) -> Result<Self, GmlError> {
        let id = element.attr("id").unwrap_or("<no gml:id>");
        if element.name != "Definition" {
            return Err(GmlError::UnrecognizedFeature {
                element: element.name.clone(),
                id: element.attr("id").map(str::to_string),
            });
        }

        let value = element
            .child_text("identifier")
            .ok_or_else(|| GmlError::missing("Definition", id, "identifier"))?
            .to_string();

        // Une description faite uniquement de blancs est traitée comme absente
        let description = element.child_text("description").map(str::to_string);

        Ok(Self { value, description })
    }
}

/// Lit les entrées d'un dictionnaire, dans l'ordre du document
pub fn parse<R: BufRead>(reader: R) -> Result<Vec<DictionaryEntry>, GmlError> {
    MemberReader::dictionary_entries(reader)
        .map(|element| element.and_then(|e| DictionaryEntry::from_raw(&e)))
        .collect()
}
