//! Export GeoJSON (WGS84) des objets cadastraux

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geojson::{feature::Id, Feature, FeatureCollection};
use parcel_geom::{codec, first_feature, CoordTree, GeomError, Geometry, JsonObject};
use serde_json::Value;
use tracing::{debug, info};

use crate::properties::{derive_properties, group_value, merge_properties};
use crate::source::CadastralObject;

/// Nom de base des fichiers groupés quand la sortie n'a pas d'extension
pub const DEFAULT_BASE_NAME: &str = "cadastral";

const INVALID_FILENAME_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', ' '];

/// Construit la feature WGS84 d'un objet.
///
/// La géométrie est reprojetée et perd son `crs`, les propriétés sont
/// remplacées par le jeu dérivé (les autres clés existantes restent), `id`
/// et les membres étrangers sont conservés. Un `bbox` existant, exprimé en
/// Web Mercator, est retiré.
pub fn build_feature(object: &CadastralObject) -> parcel_geom::Result<Feature> {
    let mut member = first_feature(&object.data)?;

    let mut geometry = match member.remove("geometry") {
        Some(Value::Object(geometry)) => geometry,
        _ => return Err(GeomError::MissingField("geometry")),
    };
    let wgs84 = codec::to_wgs84(&Geometry::from_json(&geometry)?)?;
    for key in ["type", "coordinates", "crs", "bbox"] {
        geometry.remove(key);
    }

    let id = member.remove("id").and_then(feature_id);
    let properties = merge_properties(member.remove("properties"), derive_properties(object));
    member.remove("type");
    member.remove("bbox");

    Ok(Feature {
        bbox: None,
        geometry: Some(geojson::Geometry {
            bbox: None,
            value: geojson_value(&wgs84),
            foreign_members: non_empty(geometry),
        }),
        id,
        properties: Some(properties),
        foreign_members: non_empty(member),
    })
}

fn geojson_value(geometry: &Geometry) -> geojson::Value {
    match geometry {
        Geometry::Point(c) => geojson::Value::Point(c.to_positions()),
        Geometry::LineString(line) => geojson::Value::LineString(line.to_positions()),
        Geometry::Polygon(rings) => geojson::Value::Polygon(rings.to_positions()),
        Geometry::MultiPolygon(polygons) => geojson::Value::MultiPolygon(polygons.to_positions()),
    }
}

fn feature_id(value: Value) -> Option<Id> {
    match value {
        Value::String(s) => Some(Id::String(s)),
        Value::Number(n) => Some(Id::Number(n)),
        _ => None,
    }
}

fn non_empty(members: JsonObject) -> Option<JsonObject> {
    (!members.is_empty()).then_some(members)
}

/// Écrit une FeatureCollection (JSON indenté)
pub fn write_collection(path: &Path, features: Vec<Feature>) -> Result<()> {
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &collection)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Remplace les caractères interdits dans un nom de fichier
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Répertoire de sortie et nom de base des fichiers groupés.
///
/// `dir/out.geojson` donne `dir` et `out` ; `out.geojson` donne `out` et
/// `out` ; un chemin sans extension est le répertoire lui-même, avec le
/// nom de base [`DEFAULT_BASE_NAME`].
pub fn grouped_layout(output: &Path) -> (PathBuf, String) {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned());

    match (output.extension(), stem) {
        (Some(_), Some(stem)) => {
            let dir = match output.parent() {
                Some(parent) if !parent.as_os_str().is_empty() && parent != Path::new(".") => {
                    parent.to_path_buf()
                }
                _ => PathBuf::from(&stem),
            };
            (dir, stem)
        }
        _ => (output.to_path_buf(), DEFAULT_BASE_NAME.to_string()),
    }
}

/// Un fichier produit par [`write_grouped`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFile {
    pub path: PathBuf,
    pub features: usize,
}

/// Écrit une FeatureCollection par valeur de `property`.
///
/// Les valeurs qui donnent le même nom de fichier une fois nettoyées sont
/// réunies dans le même fichier.
pub fn write_grouped(
    output: &Path,
    property: &str,
    features: Vec<Feature>,
) -> Result<Vec<GroupFile>> {
    let (dir, base) = grouped_layout(output);

    if dir.exists() && !dir.is_dir() {
        debug!(path = %dir.display(), "Removing file in place of output directory");
        std::fs::remove_file(&dir)
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
    }
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut groups: BTreeMap<String, Vec<Feature>> = BTreeMap::new();
    for feature in features {
        let value = match &feature.properties {
            Some(props) => group_value(props, property),
            None => group_value(&JsonObject::new(), property),
        };
        groups
            .entry(sanitize_filename(&value))
            .or_default()
            .push(feature);
    }

    let mut files = Vec::with_capacity(groups.len());
    for (safe_value, features) in groups {
        let path = dir.join(format!("{}_{}_{}.geojson", base, property, safe_value));
        let count = features.len();
        write_collection(&path, features)?;
        info!(path = %path.display(), features = count, "Created group file");
        files.push(GroupFile {
            path,
            features: count,
        });
    }
    Ok(files)
}
