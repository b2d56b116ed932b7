//! Traitement des objets : transformations par ligne et écriture des sorties
//!
//! Les transformations (décodage, encodage, reprojection) sont pures et
//! tournent en parallèle avec rayon ; l'ordre des lignes est conservé.
//! L'écriture est séquentielle et synchrone.

use std::path::Path;

use anyhow::Result;
use geojson::Feature;
use parcel_geom::{codec, extract, EncodedGeometry, Envelope, GeomError};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::report::ExportReport;
use crate::sink::geojson::{build_feature, write_collection, write_grouped, GroupFile};
use crate::sink::gpkg::GeoPackage;
use crate::source::CadastralObject;

/// Intervalle de log de progression, en lignes
pub const PROGRESS_INTERVAL: usize = 100;

/// Échec de transformation d'une ligne
#[derive(Debug, Error)]
#[error("object {code}: {source}")]
pub struct RowError {
    pub code: i64,
    #[source]
    pub source: GeomError,
}

impl RowError {
    fn wrap(code: i64) -> impl FnOnce(GeomError) -> RowError {
        move |source| RowError { code, source }
    }
}

/// Extrait et encode la géométrie de chaque objet en blob GeoPackage
pub fn encode_objects(objects: &[CadastralObject]) -> Vec<Result<EncodedGeometry, RowError>> {
    objects
        .par_iter()
        .map(|object| {
            extract(&object.data)
                .and_then(|geometry| codec::encode(&geometry))
                .map_err(RowError::wrap(object.code))
        })
        .collect()
}

/// Construit la feature WGS84 de chaque objet
pub fn build_features(objects: &[CadastralObject]) -> Vec<Result<Feature, RowError>> {
    objects
        .par_iter()
        .map(|object| build_feature(object).map_err(RowError::wrap(object.code)))
        .collect()
}

/// Union d'emprises ; [`Envelope::EMPTY`] si la séquence est vide
pub fn fold_envelopes<I>(envelopes: I) -> Envelope
where
    I: IntoParallelIterator<Item = Envelope>,
{
    envelopes
        .into_par_iter()
        .reduce(|| Envelope::EMPTY, Envelope::union)
}

fn skip_row(report: &mut ExportReport, error: &RowError) {
    warn!(code = error.code, kind = error.source.kind(), error = %error.source, "Skipping object");
    report.record_skip(Some(error.code), error.source.kind(), &error.source.to_string());
}

fn log_progress(report: &ExportReport, total: usize) {
    if report.objects_exported % PROGRESS_INTERVAL == 0 {
        info!(exported = report.objects_exported, total, "Progress");
    }
}

/// Résultat d'un export GeoPackage
#[derive(Debug, Clone, PartialEq)]
pub struct GpkgExport {
    pub written: usize,
    /// Emprise enregistrée, absente si aucune ligne n'a été écrite
    pub extent: Option<Envelope>,
}

/// Écrit les objets dans un nouveau GeoPackage
///
/// Seules les lignes effectivement insérées contribuent à l'emprise.
pub fn export_gpkg(
    output: &Path,
    objects: &[CadastralObject],
    report: &mut ExportReport,
) -> Result<GpkgExport> {
    let encoded = encode_objects(objects);

    let mut gpkg = GeoPackage::create(output)?;
    let writer = gpkg.writer()?;
    let mut envelopes = Vec::with_capacity(objects.len());

    for (object, result) in objects.iter().zip(encoded) {
        let geometry = match result {
            Ok(geometry) => geometry,
            Err(e) => {
                skip_row(report, &e);
                continue;
            }
        };
        match writer.insert(object, &geometry) {
            Ok(()) => {
                envelopes.push(geometry.envelope);
                report.record_exported();
                log_progress(report, objects.len());
            }
            Err(e) => {
                warn!(code = object.code, error = %e, "Failed to insert object");
                report.record_skip(Some(object.code), "InsertFailed", &e.to_string());
            }
        }
    }
    writer.commit()?;

    let written = envelopes.len();
    let extent = if written > 0 {
        let extent = fold_envelopes(envelopes);
        gpkg.update_extent(&extent)?;
        Some(extent)
    } else {
        None
    };

    report.record_file(output);
    info!(written, path = %output.display(), "GeoPackage written");
    Ok(GpkgExport { written, extent })
}

/// Écrit les objets en GeoJSON WGS84, regroupés ou non par propriété
pub fn export_geojson(
    output: &Path,
    group_by: Option<&str>,
    objects: &[CadastralObject],
    report: &mut ExportReport,
) -> Result<Vec<GroupFile>> {
    let mut features = Vec::with_capacity(objects.len());
    for result in build_features(objects) {
        match result {
            Ok(feature) => {
                features.push(feature);
                report.record_exported();
                log_progress(report, objects.len());
            }
            Err(e) => skip_row(report, &e),
        }
    }

    let files = match group_by {
        Some(property) => {
            info!(property, "Grouping features by property");
            write_grouped(output, property, features)?
        }
        None => {
            let count = features.len();
            write_collection(output, features)?;
            vec![GroupFile {
                path: output.to_path_buf(),
                features: count,
            }]
        }
    };

    for file in &files {
        report.record_file(&file.path);
    }
    info!(
        features = report.objects_exported,
        files = files.len(),
        "GeoJSON written"
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::objects::fixtures;

    fn broken(code: i64, data: &str) -> CadastralObject {
        let mut object = fixtures::square(code, 1.0);
        object.data = data.to_string();
        object
    }

    fn sample() -> Vec<CadastralObject> {
        vec![
            fixtures::square(1, 10.0),
            broken(2, r#"{"data":{"features":[{"geometry":{"type":"MultiPoint","coordinates":[[0,0]]}}]}}"#),
            fixtures::square(3, 40.0),
            broken(4, "{oops"),
        ]
    }

    #[test]
    fn test_encode_preserves_order() {
        let objects: Vec<_> = (1..=50).map(|i| fixtures::square(i, i as f64)).collect();
        let encoded = encode_objects(&objects);
        assert_eq!(encoded.len(), 50);
        for (i, result) in encoded.iter().enumerate() {
            assert_eq!(result.as_ref().unwrap().envelope.max_x, (i + 1) as f64);
        }
    }

    #[test]
    fn test_row_errors_carry_code() {
        let results = encode_objects(&sample());
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.code, 2);
        assert_eq!(err.source.kind(), "UnsupportedGeometryType");
        assert_eq!(results[3].as_ref().unwrap_err().source.kind(), "InvalidJson");
    }

    #[test]
    fn test_fold_envelopes() {
        assert!(fold_envelopes(Vec::<Envelope>::new()).is_empty());

        let objects = [fixtures::square(1, 10.0), fixtures::square(2, 40.0)];
        let envelopes: Vec<_> = encode_objects(&objects)
            .into_iter()
            .map(|r| r.unwrap().envelope)
            .collect();
        let folded = fold_envelopes(envelopes);
        assert_eq!((folded.min_x, folded.max_x), (0.0, 40.0));
        assert_eq!((folded.min_y, folded.max_y), (0.0, 40.0));
    }

    #[test]
    fn test_export_gpkg() {
        let path = std::env::temp_dir().join("cadastral_export_pipeline_test.gpkg");
        let mut objects = sample();
        // Code déjà présent : l'insertion échoue et l'emprise l'ignore
        objects.push(fixtures::square(1, 1000.0));

        let mut report = ExportReport::new("gpkg");
        let export = export_gpkg(&path, &objects, &mut report).unwrap();

        assert_eq!(export.written, 2);
        let extent = export.extent.unwrap();
        assert_eq!((extent.max_x, extent.max_y), (40.0, 40.0));
        assert_eq!(report.objects_exported, 2);
        assert_eq!(report.objects_skipped, 3);
        assert_eq!(report.skipped_by_kind["InsertFailed"], 1);
        assert_eq!(report.skipped_by_kind["InvalidJson"], 1);

        let gpkg_extent = {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.query_row(
                "SELECT max_x FROM gpkg_contents WHERE table_name = 'cadastral_objects'",
                [],
                |r| r.get::<_, f64>(0),
            )
            .unwrap()
        };
        assert_eq!(gpkg_extent, 40.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_export_gpkg_nothing_written() {
        let path = std::env::temp_dir().join("cadastral_export_pipeline_empty.gpkg");
        let objects = vec![broken(1, "{}")];

        let mut report = ExportReport::new("gpkg");
        let export = export_gpkg(&path, &objects, &mut report).unwrap();
        assert_eq!(export, GpkgExport { written: 0, extent: None });
        let min_x: Option<f64> = rusqlite::Connection::open(&path)
            .unwrap()
            .query_row("SELECT min_x FROM gpkg_contents", [], |r| r.get(0))
            .unwrap();
        assert_eq!(min_x, None);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_export_geojson_single_file() {
        let path = std::env::temp_dir().join("cadastral_export_pipeline_test.geojson");
        let mut report = ExportReport::new("geojson");
        let files = export_geojson(&path, None, &sample(), &mut report).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].features, 2);
        assert_eq!(report.objects_skipped, 2);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 2);
        assert_eq!(value["features"][1]["properties"]["code"], 3);
        std::fs::remove_file(&path).ok();
    }
}
