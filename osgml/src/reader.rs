//! Lecture en flux des documents GML
//!
//! Le document n'est jamais chargé en entier: seul le contenu de l'enveloppe
//! courante (`featureMember`, `dictionaryEntry`) est matérialisé sous forme
//! d'arbre [`RawElement`], puis rendu à l'appelant.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bzip2::read::MultiBzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::GmlError;

/// Enveloppe des features dans un document GML
pub const FEATURE_MEMBER: &str = "featureMember";

/// Enveloppe des entrées d'un dictionnaire de référence
pub const DICTIONARY_ENTRY: &str = "dictionaryEntry";

const READ_BUFFER_SIZE: usize = 1 << 16;

/// Élément XML brut (noms locaux, sans préfixe de namespace)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<RawElement>,
}

impl RawElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn from_start(start: &BytesStart<'_>, position: u64) -> Result<Self, GmlError> {
        let mut element = Self::new(String::from_utf8_lossy(start.local_name().as_ref()));
        for attr in start.attributes() {
            let attr = attr.map_err(|e| GmlError::xml(position, e))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| GmlError::xml(position, e))?
                .into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    /// Valeur d'un attribut, par nom local (`id` pour `gml:id`)
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Premier enfant portant ce nom local
    pub fn child(&self, name: &str) -> Option<&RawElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Descend un chemin d'enfants (`["geometry", "Point", "pos"]`)
    pub fn find(&self, path: &[&str]) -> Option<&RawElement> {
        path.iter().try_fold(self, |element, name| element.child(name))
    }

    /// Texte d'un enfant, `None` si absent ou vide
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Lecteur paresseux des éléments enveloppés d'un document.
///
/// Chaque appel à `next()` avance jusqu'à la prochaine enveloppe et rend son
/// unique enfant. Après une erreur, l'itérateur est terminé.
pub struct MemberReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    wrapper: &'static str,
    members: u64,
    /// Éléments ouverts hors enveloppe (racine comprise)
    open: Vec<String>,
    done: bool,
}

impl<R: BufRead> MemberReader<R> {
    /// Lecteur de `featureMember`
    pub fn features(inner: R) -> Self {
        Self::new(inner, FEATURE_MEMBER)
    }

    /// Lecteur de `dictionaryEntry`
    pub fn dictionary_entries(inner: R) -> Self {
        Self::new(inner, DICTIONARY_ENTRY)
    }

    pub fn new(inner: R, wrapper: &'static str) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::with_capacity(4096),
            wrapper,
            members: 0,
            open: Vec::new(),
            done: false,
        }
    }

    fn byte_position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn next_member(&mut self) -> Result<Option<RawElement>, GmlError> {
        loop {
            self.buf.clear();
            let is_wrapper = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(start)) => {
                    let name = start.local_name();
                    if name.as_ref() == self.wrapper.as_bytes() {
                        true
                    } else {
                        self.open.push(String::from_utf8_lossy(name.as_ref()).into_owned());
                        false
                    }
                }
                Ok(Event::End(_)) => {
                    self.open.pop();
                    false
                }
                Ok(Event::Empty(start)) if start.local_name().as_ref() == self.wrapper.as_bytes() => {
                    let index = self.members;
                    self.members += 1;
                    return Err(GmlError::EmptyMember {
                        wrapper: self.wrapper,
                        index,
                    });
                }
                Ok(Event::Eof) => {
                    return match self.open.pop() {
                        Some(element) => Err(GmlError::UnexpectedEof { element }),
                        None => Ok(None),
                    }
                }
                Ok(_) => false,
                Err(e) => return Err(GmlError::xml(self.reader.buffer_position() as u64, e)),
            };

            if is_wrapper {
                let index = self.members;
                self.members += 1;
                let wrapper = self.read_subtree()?;
                return self.unwrap_single(wrapper, index).map(Some);
            }
        }
    }

    /// Lit le contenu de l'enveloppe courante jusqu'à sa balise fermante
    fn read_subtree(&mut self) -> Result<RawElement, GmlError> {
        let mut stack = vec![RawElement::new(self.wrapper)];

        loop {
            self.buf.clear();
            let position = self.byte_position();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(start)) => {
                    stack.push(RawElement::from_start(&start, position)?);
                }
                Ok(Event::Empty(start)) => {
                    let element = RawElement::from_start(&start, position)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(element);
                    }
                }
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(|e| GmlError::xml(position, e))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Ok(Event::End(_)) => {
                    let Some(mut finished) = stack.pop() else {
                        return Err(GmlError::xml(position, "unbalanced end tag"));
                    };
                    let trimmed = finished.text.trim();
                    if trimmed.len() != finished.text.len() {
                        finished.text = trimmed.to_string();
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(finished),
                        None => return Ok(finished),
                    }
                }
                Ok(Event::Eof) => {
                    return Err(GmlError::UnexpectedEof {
                        element: self.wrapper.to_string(),
                    })
                }
                Ok(_) => {}
                Err(e) => return Err(GmlError::xml(position, e)),
            }
        }
    }

    fn unwrap_single(&self, mut wrapper: RawElement, index: u64) -> Result<RawElement, GmlError> {
        match wrapper.children.len() {
            1 => Ok(wrapper.children.remove(0)),
            0 => Err(GmlError::EmptyMember {
                wrapper: self.wrapper,
                index,
            }),
            count => Err(GmlError::AmbiguousMember {
                wrapper: self.wrapper,
                index,
                count,
            }),
        }
    }
}

impl<R: BufRead> Iterator for MemberReader<R> {
    type Item = Result<RawElement, GmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_member() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Ouvre un fichier en lecture bufferisée (`.bz2` décompressé à la volée)
pub fn open_buffered(path: &Path) -> Result<Box<dyn BufRead + Send>, GmlError> {
    let file = File::open(path)?;
    let compressed = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("bz2"));

    debug!(path = %path.display(), compressed, "Opening document");

    if compressed {
        Ok(Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            MultiBzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)))
    }
}
