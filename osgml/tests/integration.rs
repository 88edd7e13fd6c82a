//! Tests d'intégration: documents GML complets

use std::io::Write;

use osgml::{open_document, read_features, Feature, GmlError};

const DOCUMENT: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<gml:FeatureCollection xmlns:gml="http://www.opengis.net/gml/3.2"
    xmlns:road="http://namespaces.os.uk/Open/Roads/1.0"
    xmlns:net="urn:x-inspire:specification:gmlas:Network:3.2"
    xmlns:xlink="http://www.w3.org/1999/xlink" gml:id="SU">
  <gml:featureMember>
    <road:RoadNode gml:id="osgb1">
      <net:geometry>
        <gml:Point gml:id="osgb1_p" srsName="urn:ogc:def:crs:EPSG::27700" srsDimension="2">
          <gml:pos>0 0</gml:pos>
        </gml:Point>
      </net:geometry>
      <road:formOfRoadNode codeSpace="http://example/FormOfRoadNodeValue">pseudo</road:formOfRoadNode>
    </road:RoadNode>
  </gml:featureMember>
  <gml:featureMember>
    <road:RoadLink gml:id="osgb100">
      <road:centrelineGeometry>
        <gml:LineString gml:id="osgb100_g" srsName="urn:ogc:def:crs:EPSG::27700" srsDimension="2">
          <gml:posList>0 0 10.5 20.25 30 40</gml:posList>
        </gml:LineString>
      </road:centrelineGeometry>
      <road:startNode xlink:href="#osgb1"/>
      <road:endNode xlink:href="#osgb2"/>
      <road:roadClassification codeSpace="http://example/RoadClassificationValue">Unclassified</road:roadClassification>
      <road:roadFunction codeSpace="http://example/RoadFunctionValue">Local Road</road:roadFunction>
      <road:formOfWay codeSpace="http://example/FormOfWayTypeValue">Single Carriageway</road:formOfWay>
      <road:length uom="m">50.2</road:length>
      <road:loop>false</road:loop>
      <road:primaryRoute>false</road:primaryRoute>
      <road:trunkRoad>false</road:trunkRoad>
    </road:RoadLink>
  </gml:featureMember>
  <gml:featureMember>
    <road:MotorwayJunction gml:id="osgbJ1">
      <net:geometry>
        <gml:Point srsName="urn:ogc:def:crs:EPSG::27700" srsDimension="2"><gml:pos>5 6</gml:pos></gml:Point>
      </net:geometry>
      <road:junctionNumber>3a</road:junctionNumber>
    </road:MotorwayJunction>
  </gml:featureMember>
  <gml:featureMember>
    <road:RoadNode gml:id="osgb2">
      <net:geometry>
        <gml:Point srsName="urn:ogc:def:crs:EPSG::27700" srsDimension="2"><gml:pos>30 40</gml:pos></gml:Point>
      </net:geometry>
      <road:formOfRoadNode codeSpace="http://example/FormOfRoadNodeValue">junction</road:formOfRoadNode>
    </road:RoadNode>
  </gml:featureMember>
</gml:FeatureCollection>
"##;

fn decode(document: &str) -> Vec<Feature> {
    read_features(document.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("document should decode")
}

#[test]
fn test_decode_preserves_document_order() {
    let ids: Vec<String> = decode(DOCUMENT)
        .iter()
        .map(|f| f.id().to_string())
        .collect();
    assert_eq!(ids, vec!["osgb1", "osgb100", "osgbJ1", "osgb2"]);
}

#[test]
fn test_decode_is_repeatable() {
    assert_eq!(decode(DOCUMENT), decode(DOCUMENT));
}

#[test]
fn test_decoded_geometries_serialize() {
    for feature in decode(DOCUMENT) {
        match feature {
            Feature::RoadLink(link) => {
                assert_eq!(
                    link.centreline.to_wkt().unwrap(),
                    "LINESTRING(0 0,10.5 20.25,30 40)"
                );
                assert_eq!(link.length.convert_to("m").unwrap(), 50.2);
            }
            Feature::RoadNode(node) if node.id == "osgb1" => {
                assert_eq!(node.geometry.to_wkt().unwrap(), "POINT(0 0)");
            }
            Feature::RoadNode(node) => {
                assert_eq!(node.geometry.to_wkt().unwrap(), "POINT(30 40)");
            }
            Feature::MotorwayJunction(junction) => {
                assert_eq!(junction.junction_number, "3a");
            }
        }
    }
}

#[test]
fn test_unrecognized_feature_aborts_stream() {
    let document = DOCUMENT.replacen(
        "<gml:featureMember>",
        "<gml:featureMember><road:FerryNode gml:id=\"osgbF\"/></gml:featureMember><gml:featureMember>",
        1,
    );
    let results: Vec<_> = read_features(document.as_bytes()).collect();
    assert!(matches!(
        results.first(),
        Some(Err(GmlError::UnrecognizedFeature { .. }))
    ));
}

#[test]
fn test_document_cut_between_members_is_error() {
    let cut = DOCUMENT
        .match_indices("</gml:featureMember>")
        .nth(1)
        .map(|(i, end)| i + end.len())
        .unwrap();
    let results: Vec<_> = read_features(DOCUMENT[..cut].as_bytes()).collect();

    assert_eq!(results.len(), 3);
    assert!(results[..2].iter().all(Result::is_ok));
    assert!(matches!(
        &results[2],
        Err(GmlError::UnexpectedEof { element }) if element == "FeatureCollection"
    ));
}

#[test]
fn test_open_plain_and_compressed_documents() {
    let dir = tempfile::tempdir().unwrap();

    let plain = dir.path().join("SU_RoadNode.gml");
    std::fs::write(&plain, DOCUMENT).unwrap();

    let compressed = dir.path().join("SU_RoadNode.gml.bz2");
    let mut encoder = bzip2::write::BzEncoder::new(
        std::fs::File::create(&compressed).unwrap(),
        bzip2::Compression::fast(),
    );
    encoder.write_all(DOCUMENT.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let from_plain: Vec<Feature> = open_document(&plain)
        .unwrap()
        .into_features()
        .collect::<Result<_, _>>()
        .unwrap();
    let from_compressed: Vec<Feature> = open_document(&compressed)
        .unwrap()
        .into_features()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(from_plain.len(), 4);
    assert_eq!(from_plain, from_compressed);
}

#[test]
fn test_open_missing_document() {
    let result = open_document(std::path::Path::new("/nonexistent/roads.gml"));
    assert!(matches!(result, Err(GmlError::Io(_))));
}
