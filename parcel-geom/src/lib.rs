//! # parcel-geom
//!
//! Moteur géométrique pour l'export de parcelles cadastrales stockées en
//! GeoJSON Web Mercator (EPSG:3857).
//!
//! ## Features
//!
//! - Décodage typé des géométries (Point, LineString, Polygon, MultiPolygon)
//! - Reprojection Web Mercator → WGS84
//! - Calcul d'emprise sur un arbre de coordonnées de profondeur quelconque
//! - Encodage WKB et blobs GeoPackage (en-tête + emprise + WKB)
//!
//! ## Usage
//!
//! ```rust
//! use parcel_geom::{codec, extract};
//!
//! let payload = r#"{"data":{"features":[{"geometry":
//!     {"type":"Polygon","coordinates":[[[0,0],[0,10],[10,10],[10,0],[0,0]]]}}]}}"#;
//!
//! let geometry = extract(payload)?;
//! let encoded = codec::encode(&geometry)?;
//! assert_eq!(encoded.envelope.max_x, 10.0);
//!
//! let wgs84 = codec::to_wgs84(&geometry)?;
//! # let _ = wgs84;
//! # Ok::<(), parcel_geom::GeomError>(())
//! ```

pub mod codec;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod project;
pub mod tree;
pub mod types;

pub use codec::{encode, encode_wkb, to_wgs84, EncodedGeometry, GpkgHeader};
pub use envelope::Envelope;
pub use error::{GeomError, Result};
pub use extract::{extract, first_feature, JsonObject};
pub use project::web_mercator_to_wgs84;
pub use tree::CoordTree;
pub use types::{Coord, Geometry, GeometryType};
