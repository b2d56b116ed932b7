//! Types de données pour le crate parcel-geom

use std::fmt;

/// Une coordonnée 2D (x, y). Les dimensions Z/M ne sont pas gérées.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Anneau : suite de points
pub type Ring = Vec<Coord>;

/// Polygone : suite d'anneaux (extérieur puis trous)
pub type PolygonCoords = Vec<Ring>;

/// Géométrie typée, décodée une seule fois à la frontière JSON.
///
/// Invariants garantis par le décodage : chaque niveau de liste contient
/// au moins un élément et chaque feuille a deux composantes finies.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(PolygonCoords),
    MultiPolygon(Vec<PolygonCoords>),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }
}

/// Types de géométrie supportés
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
}

impl GeometryType {
    /// Résout un nom GeoJSON (`"Polygon"`, ...). `None` pour les autres types.
    pub fn from_geojson_name(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(Self::Point),
            "LineString" => Some(Self::LineString),
            "Polygon" => Some(Self::Polygon),
            "MultiPolygon" => Some(Self::MultiPolygon),
            _ => None,
        }
    }

    pub fn geojson_name(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
        }
    }

    /// Code de type WKB (OGC Simple Features, sans SRID)
    pub fn wkb_code(self) -> u32 {
        match self {
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
            Self::MultiPolygon => 6,
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.geojson_name())
    }
}
