//! Blob géométrique GeoPackage : en-tête 8 octets + emprise 32 octets + WKB
//!
//! Disposition de l'en-tête :
//!
//! | octet | contenu                                   |
//! |-------|-------------------------------------------|
//! | 0     | magic `0x47`                              |
//! | 1     | version `0x00`                            |
//! | 2     | flags `0x01` (emprise standard présente)  |
//! | 3..7  | SRS id, i32 little-endian                 |
//! | 7     | réservé `0x00`                            |
//!
//! Les outils en aval lisent ce format octet par octet ; il ne doit pas
//! être modifié.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::wkb;
use crate::envelope::Envelope;
use crate::error::{GeomError, Result};
use crate::types::Geometry;

pub const GPKG_MAGIC: u8 = 0x47;
pub const GPKG_VERSION: u8 = 0x00;
/// Aucune emprise après l'en-tête
pub const GPKG_FLAGS_NO_ENVELOPE: u8 = 0x00;
/// Emprise standard [min_x, max_x, min_y, max_y] après l'en-tête
pub const GPKG_FLAGS_ENVELOPE_XY: u8 = 0x01;
pub const GPKG_HEADER_LEN: usize = 8;

/// SRS des géométries stockées (Web Mercator)
pub const WEB_MERCATOR_SRS_ID: i32 = 3857;

/// Blob GeoPackage prêt à insérer, avec l'emprise déjà calculée pour
/// l'agrégation par l'appelant
#[derive(Debug, Clone)]
pub struct EncodedGeometry {
    pub blob: Bytes,
    pub envelope: Envelope,
}

/// Encode une géométrie en blob GeoPackage (SRS 3857, emprise XY)
pub fn encode(geom: &Geometry) -> Result<EncodedGeometry> {
    let body = wkb::encode_wkb(geom)?;
    let envelope = geom.envelope();

    let mut buf = BytesMut::with_capacity(GPKG_HEADER_LEN + Envelope::ENCODED_LEN + body.len());
    GpkgHeader {
        version: GPKG_VERSION,
        flags: GPKG_FLAGS_ENVELOPE_XY,
        srs_id: WEB_MERCATOR_SRS_ID,
    }
    .write(&mut buf);
    envelope.write_le(&mut buf);
    buf.put_slice(&body);

    Ok(EncodedGeometry {
        blob: buf.freeze(),
        envelope,
    })
}

/// En-tête d'un blob GeoPackage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpkgHeader {
    pub version: u8,
    pub flags: u8,
    pub srs_id: i32,
}

impl GpkgHeader {
    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(GPKG_MAGIC);
        buf.put_u8(self.version);
        buf.put_u8(self.flags);
        buf.put_i32_le(self.srs_id);
        buf.put_u8(0x00);
    }

    /// Découpe un blob en (en-tête, emprise, WKB).
    ///
    /// Sans emprise (flags `0x00`), l'emprise retournée est
    /// [`Envelope::EMPTY`].
    pub fn parse(blob: &[u8]) -> Result<(GpkgHeader, Envelope, &[u8])> {
        if blob.len() < GPKG_HEADER_LEN {
            return Err(GeomError::invalid_blob(format!(
                "got {} bytes, header needs {}",
                blob.len(),
                GPKG_HEADER_LEN
            )));
        }
        if blob[0] != GPKG_MAGIC {
            return Err(GeomError::invalid_blob(format!("bad magic {:#04x}", blob[0])));
        }
        if blob[7] != 0 {
            return Err(GeomError::invalid_blob(format!(
                "reserved byte is {:#04x}",
                blob[7]
            )));
        }

        let header = GpkgHeader {
            version: blob[1],
            flags: blob[2],
            srs_id: i32::from_le_bytes([blob[3], blob[4], blob[5], blob[6]]),
        };

        let rest = &blob[GPKG_HEADER_LEN..];
        match header.flags {
            GPKG_FLAGS_NO_ENVELOPE => Ok((header, Envelope::EMPTY, rest)),
            GPKG_FLAGS_ENVELOPE_XY => {
                let (env, body) = rest
                    .split_first_chunk::<{ Envelope::ENCODED_LEN }>()
                    .ok_or_else(|| {
                        GeomError::invalid_blob(format!(
                            "got {} bytes, envelope needs {}",
                            blob.len(),
                            GPKG_HEADER_LEN + Envelope::ENCODED_LEN
                        ))
                    })?;
                Ok((header, Envelope::read_le(env), body))
            }
            other => Err(GeomError::invalid_blob(format!(
                "unsupported flags {:#04x}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;

    #[test]
    fn test_header_layout() {
        let geom = Geometry::LineString(vec![Coord::new(-1.0, 2.0), Coord::new(3.0, -4.0)]);
        let encoded = encode(&geom).unwrap();
        let blob = &encoded.blob;

        assert_eq!(blob[0], 0x47);
        assert_eq!(blob[1], 0x00);
        assert_eq!(blob[2], 0x01);
        assert_eq!(i32::from_le_bytes(blob[3..7].try_into().unwrap()), 3857);
        assert_eq!(blob[7], 0x00);

        let read = |i: usize| f64::from_le_bytes(blob[8 + i * 8..16 + i * 8].try_into().unwrap());
        assert_eq!((read(0), read(1), read(2), read(3)), (-1.0, 3.0, -4.0, 2.0));
    }

    #[test]
    fn test_body_is_wkb() {
        let geom = Geometry::Point(Coord::new(10.0, 20.0));
        let encoded = encode(&geom).unwrap();
        let wkb = wkb::encode_wkb(&geom).unwrap();
        assert_eq!(encoded.blob.len(), 40 + wkb.len());
        assert_eq!(&encoded.blob[40..], &wkb[..]);
    }

    #[test]
    fn test_parse_roundtrip() {
        let geom = Geometry::Point(Coord::new(5.0, 6.0));
        let encoded = encode(&geom).unwrap();
        let (header, env, body) = GpkgHeader::parse(&encoded.blob).unwrap();

        assert_eq!(header.srs_id, WEB_MERCATOR_SRS_ID);
        assert_eq!(header.flags, GPKG_FLAGS_ENVELOPE_XY);
        assert_eq!(env, encoded.envelope);
        assert_eq!(body.len(), 21);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(matches!(
            GpkgHeader::parse(&[0x47, 0, 1]),
            Err(GeomError::InvalidBlob(_))
        ));
        assert!(matches!(
            GpkgHeader::parse(&[0x00, 0, 0, 0, 0, 0, 0, 0]),
            Err(GeomError::InvalidBlob(_))
        ));
        // Emprise annoncée mais tronquée
        let mut blob = vec![0x47, 0, 1, 0x11, 0x0f, 0, 0, 0];
        blob.extend_from_slice(&[0; 16]);
        assert!(matches!(
            GpkgHeader::parse(&blob),
            Err(GeomError::InvalidBlob(_))
        ));
        // Flags inconnus
        assert!(matches!(
            GpkgHeader::parse(&[0x47, 0, 0x0a, 0, 0, 0, 0, 0]),
            Err(GeomError::InvalidBlob(_))
        ));
    }

    #[test]
    fn test_parse_without_envelope() {
        let mut blob = Vec::new();
        GpkgHeader {
            version: 0,
            flags: GPKG_FLAGS_NO_ENVELOPE,
            srs_id: 4326,
        }
        .write(&mut blob);
        blob.extend_from_slice(&[1, 1, 0, 0, 0]);

        let (header, env, body) = GpkgHeader::parse(&blob).unwrap();
        assert_eq!(header.srs_id, 4326);
        assert!(env.is_empty());
        assert_eq!(body, &[1, 1, 0, 0, 0]);
    }
}
