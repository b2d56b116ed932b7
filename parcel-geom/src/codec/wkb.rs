//! Encodage WKB (Well-Known Binary) standard, little-endian, sans SRID
//!
//! Le SRID n'est porté que par l'en-tête GeoPackage.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::tree::CoordTree;
use crate::types::{Geometry, GeometryType};

/// Marqueur d'ordre des octets little-endian
pub const WKB_LITTLE_ENDIAN: u8 = 1;

/// Préfixe commun : ordre des octets (1) + code de type (4)
pub const WKB_PREFIX_LEN: usize = 5;

/// Encode une géométrie en WKB.
///
/// Un MultiPolygon contient ses polygones sans leur propre préfixe
/// ordre/type : chaque polygone apporte son nombre d'anneaux puis ses
/// anneaux, soit `9 + Σ(len(polygone_i) - 5)` octets au total.
pub fn encode_wkb(geom: &Geometry) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(encoded_len(geom));
    write_geometry(geom, &mut buf)?;
    Ok(buf.freeze())
}

/// Taille exacte de [`encode_wkb`]
pub fn encoded_len(geom: &Geometry) -> usize {
    WKB_PREFIX_LEN
        + match geom {
            Geometry::Point(c) => c.wkb_len(),
            Geometry::LineString(line) => line.wkb_len(),
            Geometry::Polygon(rings) => rings.wkb_len(),
            Geometry::MultiPolygon(polygons) => polygons.wkb_len(),
        }
}

/// Écrit le WKB complet d'une géométrie dans `buf`
pub fn write_geometry<B: BufMut>(geom: &Geometry, buf: &mut B) -> Result<()> {
    match geom {
        Geometry::Point(c) => write_tagged(GeometryType::Point, c, buf),
        Geometry::LineString(line) => write_tagged(GeometryType::LineString, line, buf),
        Geometry::Polygon(rings) => write_tagged(GeometryType::Polygon, rings, buf),
        Geometry::MultiPolygon(polygons) => {
            write_tagged(GeometryType::MultiPolygon, polygons, buf)
        }
    }
}

fn write_tagged<T: CoordTree, B: BufMut>(
    geometry_type: GeometryType,
    tree: &T,
    buf: &mut B,
) -> Result<()> {
    buf.put_u8(WKB_LITTLE_ENDIAN);
    buf.put_u32_le(geometry_type.wkb_code());
    tree.write_wkb(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;

    fn u32_at(b: &[u8], i: usize) -> u32 {
        u32::from_le_bytes(b[i..i + 4].try_into().unwrap())
    }

    fn f64_at(b: &[u8], i: usize) -> f64 {
        f64::from_le_bytes(b[i..i + 8].try_into().unwrap())
    }

    fn square(offset: f64) -> Vec<Vec<Coord>> {
        vec![vec![
            Coord::new(offset, offset),
            Coord::new(offset, offset + 10.0),
            Coord::new(offset + 10.0, offset + 10.0),
            Coord::new(offset, offset),
        ]]
    }

    #[test]
    fn test_point() {
        let wkb = encode_wkb(&Geometry::Point(Coord::new(1.5, -2.25))).unwrap();
        assert_eq!(wkb.len(), 21);
        assert_eq!(wkb[0], 1);
        assert_eq!(u32_at(&wkb, 1), 1);
        assert_eq!(f64_at(&wkb, 5), 1.5);
        assert_eq!(f64_at(&wkb, 13), -2.25);
    }

    #[test]
    fn test_point_bit_exact() {
        for (x, y) in [
            (0.1 + 0.2, -0.0),
            (f64::MIN_POSITIVE, f64::MAX),
            (4_865_942.279_503_176, 7_558_234.998_001_1),
        ] {
            let wkb = encode_wkb(&Geometry::Point(Coord::new(x, y))).unwrap();
            assert_eq!(f64_at(&wkb, 5).to_bits(), x.to_bits());
            assert_eq!(f64_at(&wkb, 13).to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_linestring() {
        let line = vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0), Coord::new(2.0, 0.0)];
        let wkb = encode_wkb(&Geometry::LineString(line)).unwrap();
        assert_eq!(u32_at(&wkb, 1), 2);
        assert_eq!(u32_at(&wkb, 5), 3);
        assert_eq!(wkb.len(), 9 + 3 * 16);
        assert_eq!(f64_at(&wkb, 9 + 2 * 16), 2.0);
    }

    #[test]
    fn test_polygon_with_hole() {
        let mut rings = square(0.0);
        rings.push(vec![Coord::new(2.0, 2.0), Coord::new(3.0, 3.0), Coord::new(2.0, 2.0)]);
        let wkb = encode_wkb(&Geometry::Polygon(rings)).unwrap();

        assert_eq!(u32_at(&wkb, 1), 3);
        assert_eq!(u32_at(&wkb, 5), 2);
        assert_eq!(u32_at(&wkb, 9), 4);
        let second_ring = 9 + 4 + 4 * 16;
        assert_eq!(u32_at(&wkb, second_ring), 3);
        assert_eq!(wkb.len(), second_ring + 4 + 3 * 16);
    }

    #[test]
    fn test_multipolygon_strips_nested_prefix() {
        let polygons = vec![square(0.0), square(100.0), square(-50.0)];
        let wkb = encode_wkb(&Geometry::MultiPolygon(polygons.clone())).unwrap();

        let nested: Vec<Bytes> = polygons
            .iter()
            .map(|p| encode_wkb(&Geometry::Polygon(p.clone())).unwrap())
            .collect();
        let expected_len = 9 + nested.iter().map(|p| p.len() - 5).sum::<usize>();
        assert_eq!(wkb.len(), expected_len);

        assert_eq!(u32_at(&wkb, 1), 6);
        assert_eq!(u32_at(&wkb, 5), 3);

        let mut offset = 9;
        for p in &nested {
            let body = &p[WKB_PREFIX_LEN..];
            assert_eq!(&wkb[offset..offset + body.len()], body);
            offset += body.len();
        }
        assert_eq!(offset, wkb.len());
    }

    #[test]
    fn test_encoded_len_matches() {
        let geoms = [
            Geometry::Point(Coord::new(0.0, 0.0)),
            Geometry::LineString(vec![Coord::new(0.0, 0.0); 7]),
            Geometry::Polygon(square(1.0)),
            Geometry::MultiPolygon(vec![square(1.0), square(2.0)]),
        ];
        for g in &geoms {
            assert_eq!(encode_wkb(g).unwrap().len(), encoded_len(g));
        }
    }
}
