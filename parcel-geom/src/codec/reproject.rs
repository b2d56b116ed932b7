//! Reprojection d'une géométrie Web Mercator vers WGS84

use crate::error::Result;
use crate::project::project_coord;
use crate::tree::CoordTree;
use crate::types::Geometry;

/// Copie la géométrie en projetant chaque coordonnée en WGS84.
///
/// Le type et l'imbrication sont conservés. Échoue avec
/// `NonFiniteProjection` dès qu'une coordonnée donne NaN ou l'infini.
pub fn to_wgs84(geom: &Geometry) -> Result<Geometry> {
    let f = &mut project_coord;
    Ok(match geom {
        Geometry::Point(c) => Geometry::Point(c.try_map(f)?),
        Geometry::LineString(line) => Geometry::LineString(line.try_map(f)?),
        Geometry::Polygon(rings) => Geometry::Polygon(rings.try_map(f)?),
        Geometry::MultiPolygon(polygons) => Geometry::MultiPolygon(polygons.try_map(f)?),
    })
}
