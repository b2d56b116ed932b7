//! Écriture des sorties

pub mod geojson;
pub mod gpkg;

pub use gpkg::GeoPackage;
