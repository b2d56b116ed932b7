//! Types d'erreurs pour le crate parcel-geom

use thiserror::Error;

/// Erreurs pouvant survenir lors du décodage ou de l'encodage d'une géométrie.
///
/// Toutes ces erreurs portent sur une seule ligne source : l'appelant
/// ignore la ligne et continue.
#[derive(Debug, Error)]
pub enum GeomError {
    /// Payload JSON illisible
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Champ attendu absent, vide ou de mauvaise forme
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Type de géométrie hors Point, LineString, Polygon, MultiPolygon
    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),

    /// Coordonnées ne respectant pas la forme minimale
    #[error("Malformed coordinates: {0}")]
    MalformedCoordinates(String),

    /// La projection a produit NaN ou l'infini
    #[error("Non-finite projection of ({x}, {y})")]
    NonFiniteProjection { x: f64, y: f64 },

    /// Blob GeoPackage illisible
    #[error("Invalid GeoPackage blob: {0}")]
    InvalidBlob(String),
}

impl GeomError {
    /// Crée une erreur de coordonnées mal formées
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedCoordinates(reason.into())
    }

    /// Crée une erreur de blob invalide
    pub fn invalid_blob(reason: impl Into<String>) -> Self {
        Self::InvalidBlob(reason.into())
    }

    /// Nom court de la catégorie, utilisé dans les rapports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "InvalidJson",
            Self::MissingField(_) => "MissingField",
            Self::UnsupportedGeometryType(_) => "UnsupportedGeometryType",
            Self::MalformedCoordinates(_) => "MalformedCoordinates",
            Self::NonFiniteProjection { .. } => "NonFiniteProjection",
            Self::InvalidBlob(_) => "InvalidBlob",
        }
    }
}

pub type Result<T> = std::result::Result<T, GeomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            GeomError::MissingField("features").to_string(),
            "Missing field: features"
        );
        assert_eq!(
            GeomError::UnsupportedGeometryType("MultiPoint".into()).to_string(),
            "Unsupported geometry type: MultiPoint"
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(GeomError::malformed("x").kind(), "MalformedCoordinates");
        assert_eq!(
            GeomError::NonFiniteProjection { x: 0.0, y: f64::MAX }.kind(),
            "NonFiniteProjection"
        );
    }
}
