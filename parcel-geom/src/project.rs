//! Projection Web Mercator (EPSG:3857) vers WGS84 (EPSG:4326)
//!
//! Aussi connu sous le nom de Pseudo-Mercator ou Spherical Mercator.
//! Les données sources sont stockées en 3857 ; le GeoJSON exporté doit être
//! en WGS84 (lon, lat en degrés).

use std::f64::consts::PI;

use crate::error::{GeomError, Result};
use crate::types::Coord;

/// Demi-circonférence équatoriale du modèle sphérique (mètres)
pub const ORIGIN_SHIFT: f64 = 20037508.34;

/// Convertit Web Mercator vers (longitude, latitude) en degrés.
///
/// Aucune validation : des entrées extrêmes peuvent donner NaN ou l'infini,
/// voir [`project_coord`].
pub fn web_mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x / ORIGIN_SHIFT * 180.0;
    let lat = y / ORIGIN_SHIFT * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lon, lat)
}

/// Projette une coordonnée et rejette les résultats non finis
pub fn project_coord(coord: Coord) -> Result<Coord> {
    let (lon, lat) = web_mercator_to_wgs84(coord.x, coord.y);
    if !lon.is_finite() || !lat.is_finite() {
        return Err(GeomError::NonFiniteProjection {
            x: coord.x,
            y: coord.y,
        });
    }
    Ok(Coord::new(lon, lat))
}
