//! # cadastral-export
//!
//! Export des objets cadastraux stockés dans PostgreSQL (payload GeoJSON
//! en Web Mercator) vers un GeoPackage ou un GeoJSON WGS84.
//!
//! ## Features
//!
//! - Lecture via un pool de connexions (TLS optionnel)
//! - Encodage des géométries en parallèle
//! - GeoPackage : métadonnées OGC, table attributaire, emprise globale
//! - GeoJSON : reprojection WGS84, regroupement par propriété
//! - Rapport d'export (console et JSON)
//!
//! ## Usage CLI
//!
//! ```bash
//! cadastral-export gpkg --output kazan.gpkg
//! cadastral-export geojson --output exports/kazan.geojson --group-by right_type
//! ```

pub mod cli;
pub mod pipeline;
pub mod properties;
pub mod report;
pub mod sink;
pub mod source;

pub use report::{ExportReport, ExportStatus};
pub use source::{create_pool, CadastralObject, DatabaseConfig};
