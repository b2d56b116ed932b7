//! Extraction de la géométrie depuis le payload JSON stocké en base
//!
//! Le payload a la forme `{"data": {"features": [{"geometry": {...}}, ...]}}`.
//! Seule la première feature est lue : une ligne source correspond à une
//! parcelle.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{GeomError, Result};
use crate::tree::CoordTree;
use crate::types::{Geometry, GeometryType};

/// Objet JSON (membres d'une feature ou d'une géométrie)
pub type JsonObject = Map<String, Value>;

/// Retourne la géométrie typée de la première feature du payload
pub fn extract(payload: &str) -> Result<Geometry> {
    let feature = first_feature(payload)?;
    geometry_of(&feature)
}

/// Retourne la première feature du payload, intacte
pub fn first_feature(payload: &str) -> Result<JsonObject> {
    let root: Value = serde_json::from_str(payload)?;
    first_feature_of(root)
}

/// Variante de [`first_feature`] sur un document déjà parsé
pub fn first_feature_of(root: Value) -> Result<JsonObject> {
    let Value::Object(mut root) = root else {
        return Err(GeomError::MissingField("data"));
    };
    let Some(Value::Object(mut data)) = root.remove("data") else {
        return Err(GeomError::MissingField("data"));
    };
    let features = match data.remove("features") {
        Some(Value::Array(features)) if !features.is_empty() => features,
        _ => return Err(GeomError::MissingField("features")),
    };
    if features.len() > 1 {
        debug!(ignored = features.len() - 1, "Payload has several features, keeping the first");
    }

    match features.into_iter().next() {
        Some(Value::Object(feature)) => Ok(feature),
        _ => Err(GeomError::MissingField("features[0]")),
    }
}

/// Décode le membre `geometry` d'une feature
pub fn geometry_of(feature: &JsonObject) -> Result<Geometry> {
    match feature.get("geometry") {
        Some(Value::Object(geometry)) => Geometry::from_json(geometry),
        _ => Err(GeomError::MissingField("geometry")),
    }
}

impl Geometry {
    /// Décode un objet géométrie GeoJSON `{"type": ..., "coordinates": ...}`.
    ///
    /// Les membres supplémentaires (`crs`, `bbox`...) sont ignorés.
    pub fn from_json(geometry: &JsonObject) -> Result<Geometry> {
        let type_name = geometry
            .get("type")
            .and_then(Value::as_str)
            .ok_or(GeomError::MissingField("type"))?;
        let geometry_type = GeometryType::from_geojson_name(type_name)
            .ok_or_else(|| GeomError::UnsupportedGeometryType(type_name.to_string()))?;
        let coordinates = geometry
            .get("coordinates")
            .ok_or(GeomError::MissingField("coordinates"))?;

        Ok(match geometry_type {
            GeometryType::Point => Geometry::Point(CoordTree::from_json(coordinates)?),
            GeometryType::LineString => Geometry::LineString(CoordTree::from_json(coordinates)?),
            GeometryType::Polygon => Geometry::Polygon(CoordTree::from_json(coordinates)?),
            GeometryType::MultiPolygon => {
                Geometry::MultiPolygon(CoordTree::from_json(coordinates)?)
            }
        })
    }
}
