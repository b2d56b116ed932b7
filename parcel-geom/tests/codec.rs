//! Tests d'intégration : payload JSON → géométrie → blob GeoPackage / WGS84

use parcel_geom::{codec, extract, Coord, CoordTree, Envelope, GeomError, Geometry, GpkgHeader};

fn payload(geometry: &str) -> String {
    format!(
        r#"{{"data":{{"type":"FeatureCollection","features":[{{"type":"Feature","geometry":{},"properties":{{}}}}]}}}}"#,
        geometry
    )
}

fn u32_at(b: &[u8], i: usize) -> u32 {
    u32::from_le_bytes(b[i..i + 4].try_into().unwrap())
}

#[test]
fn test_polygon_end_to_end() {
    let geometry = extract(&payload(
        r#"{"type":"Polygon","coordinates":[[[0,0],[0,10],[10,10],[10,0],[0,0]]]}"#,
    ))
    .unwrap();

    let encoded = codec::encode(&geometry).unwrap();
    let (header, envelope, wkb) = GpkgHeader::parse(&encoded.blob).unwrap();

    assert_eq!(header.srs_id, 3857);
    assert_eq!(wkb[0], 1);
    assert_eq!(u32_at(wkb, 1), 3);
    assert_eq!(u32_at(wkb, 5), 1);
    assert_eq!(u32_at(wkb, 9), 5);
    assert_eq!(
        (envelope.min_x, envelope.max_x, envelope.min_y, envelope.max_y),
        (0.0, 10.0, 0.0, 10.0)
    );
    assert_eq!(envelope, encoded.envelope);
}

#[test]
fn test_header_bytes() {
    let geometry = extract(&payload(r#"{"type":"Point","coordinates":[4865942.28,7558235.0]}"#))
        .unwrap();
    let blob = codec::encode(&geometry).unwrap().blob;

    assert_eq!(&blob[0..3], &[0x47, 0x00, 0x01]);
    assert_eq!(i32::from_le_bytes(blob[3..7].try_into().unwrap()), 3857);
    assert_eq!(blob[7], 0x00);

    let env: Vec<f64> = (0..4)
        .map(|i| f64::from_le_bytes(blob[8 + i * 8..16 + i * 8].try_into().unwrap()))
        .collect();
    assert_eq!(env, vec![4865942.28, 4865942.28, 7558235.0, 7558235.0]);
}

#[test]
fn test_point_payload_bit_exact() {
    let (x, y) = (4_865_942.123_456_789_f64, -7_558_235.000_000_1_f64);
    let blob = codec::encode(&Geometry::Point(Coord::new(x, y))).unwrap().blob;
    let (_, _, wkb) = GpkgHeader::parse(&blob).unwrap();

    let rx = f64::from_le_bytes(wkb[5..13].try_into().unwrap());
    let ry = f64::from_le_bytes(wkb[13..21].try_into().unwrap());
    assert_eq!(rx.to_bits(), x.to_bits());
    assert_eq!(ry.to_bits(), y.to_bits());
}

#[test]
fn test_multipolygon_length_identity() {
    let geometry = extract(&payload(
        r#"{"type":"MultiPolygon","coordinates":[
            [[[0,0],[0,1],[1,1],[0,0]]],
            [[[5,5],[5,6],[6,6],[5,5]],[[5.2,5.2],[5.4,5.4],[5.2,5.2]]]
        ]}"#,
    ))
    .unwrap();
    let Geometry::MultiPolygon(polygons) = &geometry else {
        panic!("Expected MultiPolygon");
    };

    let whole = codec::encode_wkb(&geometry).unwrap();
    let parts: usize = polygons
        .iter()
        .map(|p| codec::encode_wkb(&Geometry::Polygon(p.clone())).unwrap().len() - 5)
        .sum();
    assert_eq!(whole.len(), 9 + parts);
}

#[test]
fn test_envelope_bounds_every_leaf() {
    let geometry = extract(&payload(
        r#"{"type":"MultiPolygon","coordinates":[
            [[[-3,7],[12,-4],[0.5,100],[-3,7]]],
            [[[44,44],[45,-45],[44,44]]]
        ]}"#,
    ))
    .unwrap();
    let env = geometry.envelope();
    assert!(env.min_x <= env.max_x && env.min_y <= env.max_y);

    let Geometry::MultiPolygon(polygons) = &geometry else {
        panic!("Expected MultiPolygon");
    };
    let mut leaves = 0;
    polygons.visit(&mut |c| {
        leaves += 1;
        assert!(env.contains(c), "{:?} outside {:?}", c, env);
    });
    assert_eq!(leaves, 7);
}

#[test]
fn test_unsupported_type_yields_no_bytes() {
    let result = extract(&payload(r#"{"type":"MultiPoint","coordinates":[[1,2],[3,4]]}"#))
        .and_then(|g| codec::encode(&g));
    assert!(matches!(result, Err(GeomError::UnsupportedGeometryType(_))));
}

#[test]
fn test_global_envelope_fold() {
    let rows = [
        r#"{"type":"Point","coordinates":[1,1]}"#,
        r#"{"type":"Point","coordinates":"bad"}"#,
        r#"{"type":"LineString","coordinates":[[-5,2],[3,9]]}"#,
    ];
    let extent = rows
        .iter()
        .filter_map(|g| extract(&payload(g)).ok())
        .filter_map(|g| codec::encode(&g).ok())
        .fold(Envelope::EMPTY, |acc, e| acc.union(e.envelope));

    assert_eq!(
        (extent.min_x, extent.max_x, extent.min_y, extent.max_y),
        (-5.0, 3.0, 1.0, 9.0)
    );
}

#[test]
fn test_wgs84_linestring() {
    let geometry = extract(&payload(
        r#"{"type":"LineString","coordinates":[[0,0],[20037508.34,0]]}"#,
    ))
    .unwrap();
    let Geometry::LineString(line) = codec::to_wgs84(&geometry).unwrap() else {
        panic!("Expected LineString");
    };
    assert_eq!(line[0], Coord::new(0.0, 0.0));
    assert!((line[1].x - 180.0).abs() < 1e-6);
    assert!(line[1].y.abs() < 1e-6);
}
