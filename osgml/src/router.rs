//! Classification des éléments bruts en features typées

use crate::reader::RawElement;
use crate::types::{
    CodeValue, Feature, FeatureKind, Length, LineString, MotorwayJunction, NodeRef, Point,
    RoadLink, RoadNode, DEFAULT_SRS_DIMENSION,
};
use crate::GmlError;

impl Feature {
    /// Interprète un élément brut comme RoadLink, RoadNode ou MotorwayJunction.
    ///
    /// Tout autre élément est une erreur fatale identifiant l'élément.
    pub fn from_raw(element: RawElement) -> Result<Self, GmlError> {
        match element.name.as_str() {
            "RoadLink" => road_link(&element).map(Feature::RoadLink),
            "RoadNode" => road_node(&element).map(Feature::RoadNode),
            "MotorwayJunction" => motorway_junction(&element).map(Feature::MotorwayJunction),
            _ => Err(GmlError::UnrecognizedFeature {
                id: element.attr("id").map(str::to_string),
                element: element.name,
            }),
        }
    }
}

impl TryFrom<RawElement> for Feature {
    type Error = GmlError;

    fn try_from(element: RawElement) -> Result<Self, Self::Error> {
        Feature::from_raw(element)
    }
}

/// Champs d'une feature en cours de décodage
struct Fields<'a> {
    element: &'a RawElement,
    kind: &'static str,
    id: String,
}

impl<'a> Fields<'a> {
    fn new(element: &'a RawElement, kind: FeatureKind) -> Result<Self, GmlError> {
        let kind = kind.element_name();
        let id = element
            .attr("id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GmlError::missing(kind, "<no gml:id>", "gml:id"))?
            .to_string();
        Ok(Self { element, kind, id })
    }

    fn required(&self, name: &'static str) -> Result<&'a RawElement, GmlError> {
        self.element
            .child(name)
            .ok_or_else(|| GmlError::missing(self.kind, &self.id, name))
    }

    fn text(&self, name: &'static str) -> Result<String, GmlError> {
        self.element
            .child_text(name)
            .map(str::to_string)
            .ok_or_else(|| GmlError::missing(self.kind, &self.id, name))
    }

    fn optional_text(&self, name: &str) -> Option<String> {
        self.element.child_text(name).map(str::to_string)
    }

    fn code(&self, name: &'static str) -> Result<CodeValue, GmlError> {
        let element = self.required(name)?;
        if element.text.is_empty() {
            return Err(GmlError::missing(self.kind, &self.id, name));
        }
        Ok(CodeValue {
            code_space: element.attr("codeSpace").unwrap_or_default().to_string(),
            value: element.text.clone(),
        })
    }

    fn node_ref(&self, name: &'static str) -> Result<NodeRef, GmlError> {
        self.required(name)?
            .attr("href")
            .filter(|href| !href.is_empty())
            .map(NodeRef::new)
            .ok_or_else(|| GmlError::missing(self.kind, &self.id, name))
    }

    /// Booléen optionnel: absent = false
    fn flag(&self, name: &'static str) -> Result<bool, GmlError> {
        match self.element.child_text(name) {
            None => Ok(false),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(other) => Err(GmlError::invalid_value(&self.id, name, other)),
        }
    }

    fn length(&self) -> Result<Length, GmlError> {
        let element = self.required("length")?;
        let uom = element
            .attr("uom")
            .filter(|uom| !uom.is_empty())
            .ok_or_else(|| GmlError::missing(self.kind, &self.id, "length@uom"))?;
        let value = fast_float::parse::<f64, _>(&element.text)
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GmlError::invalid_value(&self.id, "length", &element.text))?;
        Ok(Length {
            uom: uom.to_string(),
            value,
        })
    }

    fn srs_dimension(&self, geometry: &RawElement) -> Result<usize, GmlError> {
        match geometry.attr("srsDimension") {
            None => Ok(DEFAULT_SRS_DIMENSION),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| GmlError::invalid_value(&self.id, "srsDimension", raw)),
        }
    }

    fn line_string(&self, path: &[&str], field: &'static str) -> Result<LineString, GmlError> {
        let geometry = self
            .element
            .find(path)
            .ok_or_else(|| GmlError::missing(self.kind, &self.id, field))?;
        let pos_list = geometry
            .child("posList")
            .ok_or_else(|| GmlError::missing(self.kind, &self.id, "posList"))?;
        Ok(LineString {
            srs_name: geometry.attr("srsName").unwrap_or_default().to_string(),
            srs_dimension: self.srs_dimension(geometry)?,
            pos_list: pos_list.text.clone(),
        })
    }

    fn point(&self, path: &[&str], field: &'static str) -> Result<Point, GmlError> {
        let geometry = self
            .element
            .find(path)
            .ok_or_else(|| GmlError::missing(self.kind, &self.id, field))?;
        let pos = geometry
            .child("pos")
            .ok_or_else(|| GmlError::missing(self.kind, &self.id, "pos"))?;
        Ok(Point {
            srs_name: geometry.attr("srsName").unwrap_or_default().to_string(),
            srs_dimension: self.srs_dimension(geometry)?,
            pos: pos.text.clone(),
        })
    }
}

fn road_link(element: &RawElement) -> Result<RoadLink, GmlError> {
    let fields = Fields::new(element, FeatureKind::RoadLink)?;

    Ok(RoadLink {
        centreline: fields.line_string(&["centrelineGeometry", "LineString"], "centrelineGeometry")?,
        start_node: fields.node_ref("startNode")?,
        end_node: fields.node_ref("endNode")?,
        road_classification: fields.code("roadClassification")?,
        road_function: fields.code("roadFunction")?,
        form_of_way: fields.code("formOfWay")?,
        road_classification_number: fields.optional_text("roadClassificationNumber"),
        name1: fields.optional_text("name1"),
        name1_lang: element
            .child("name1")
            .and_then(|name| name.attr("lang"))
            .map(str::to_string),
        road_name_toid: fields.optional_text("roadNameTOID"),
        road_number_toid: fields.optional_text("roadNumberTOID"),
        length: fields.length()?,
        is_loop: fields.flag("loop")?,
        primary_route: fields.flag("primaryRoute")?,
        trunk_road: fields.flag("trunkRoad")?,
        id: fields.id,
    })
}

fn road_node(element: &RawElement) -> Result<RoadNode, GmlError> {
    let fields = Fields::new(element, FeatureKind::RoadNode)?;

    Ok(RoadNode {
        geometry: fields.point(&["geometry", "Point"], "geometry")?,
        form_of_road_node: fields.code("formOfRoadNode")?,
        id: fields.id,
    })
}

fn motorway_junction(element: &RawElement) -> Result<MotorwayJunction, GmlError> {
    let fields = Fields::new(element, FeatureKind::MotorwayJunction)?;

    Ok(MotorwayJunction {
        geometry: fields.point(&["geometry", "Point"], "geometry")?,
        junction_number: fields.text("junctionNumber")?,
        id: fields.id,
    })
}
