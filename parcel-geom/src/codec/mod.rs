//! Codec de géométries : reprojection WGS84 et encodage WKB / GeoPackage
//!
//! Les deux sorties partagent le même dispatch sur [`Geometry`] et la même
//! récursion [`CoordTree`](crate::tree::CoordTree).

pub mod gpkg;
pub mod reproject;
pub mod wkb;

pub use gpkg::{encode, EncodedGeometry, GpkgHeader};
pub use reproject::to_wgs84;
pub use wkb::encode_wkb;

use crate::envelope::Envelope;
use crate::types::Geometry;

impl Geometry {
    /// Emprise de la géométrie, en coordonnées natives
    pub fn envelope(&self) -> Envelope {
        match self {
            Geometry::Point(c) => Envelope::of(c),
            Geometry::LineString(line) => Envelope::of(line),
            Geometry::Polygon(rings) => Envelope::of(rings),
            Geometry::MultiPolygon(polygons) => Envelope::of(polygons),
        }
    }
}
