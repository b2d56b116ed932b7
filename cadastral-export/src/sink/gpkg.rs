//! Écriture d'un GeoPackage (SQLite) des objets cadastraux

use std::path::Path;

use anyhow::{Context, Result};
use parcel_geom::codec::gpkg::WEB_MERCATOR_SRS_ID;
use parcel_geom::{EncodedGeometry, Envelope};
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info};

use crate::source::CadastralObject;

/// Table attributaire des objets
pub const TABLE_NAME: &str = "cadastral_objects";

/// Colonne géométrie de [`TABLE_NAME`]
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Nom de type déclaré dans `gpkg_geometry_columns`, quel que soit le type
/// réel des géométries écrites
pub const DECLARED_GEOMETRY_TYPE: &str = "POLYGON";

/// `PRAGMA application_id` d'un GeoPackage ("GPKG")
pub const GPKG_APPLICATION_ID: i32 = 0x4750_4B47;

/// `PRAGMA user_version` d'un GeoPackage 1.2
pub const GPKG_USER_VERSION: i32 = 10200;

const SQL_GPKG_SPATIAL_REF_SYS: &str = "
CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
  srs_name TEXT NOT NULL,
  srs_id INTEGER NOT NULL PRIMARY KEY,
  organization TEXT NOT NULL,
  organization_coordsys_id INTEGER NOT NULL,
  definition TEXT NOT NULL,
  description TEXT
);
";

const SQL_GPKG_CONTENTS: &str = "
CREATE TABLE IF NOT EXISTS gpkg_contents (
  table_name TEXT NOT NULL PRIMARY KEY,
  data_type TEXT NOT NULL,
  identifier TEXT UNIQUE,
  description TEXT,
  last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
  min_x DOUBLE,
  min_y DOUBLE,
  max_x DOUBLE,
  max_y DOUBLE,
  srs_id INTEGER,
  CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
";

const SQL_GPKG_GEOMETRY_COLUMNS: &str = "
CREATE TABLE IF NOT EXISTS gpkg_geometry_columns (
  table_name TEXT NOT NULL,
  column_name TEXT NOT NULL,
  geometry_type_name TEXT NOT NULL,
  srs_id INTEGER NOT NULL,
  z TINYINT NOT NULL,
  m TINYINT NOT NULL,
  CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
  CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
  CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
";

const SQL_CADASTRAL_OBJECTS: &str = "
CREATE TABLE IF NOT EXISTS cadastral_objects (
  code INTEGER NOT NULL PRIMARY KEY,
  quarter_code INTEGER NOT NULL,
  load_status TEXT,
  update_date DATE,
  area INTEGER,
  cost_value REAL,
  permitted_use_established_by_document TEXT,
  right_type TEXT,
  status TEXT,
  land_record_type TEXT,
  land_record_subtype TEXT,
  land_record_category_type TEXT,
  geometry BLOB NOT NULL
);
";

const SQL_INSERT_SRS: &str = "
INSERT OR REPLACE INTO gpkg_spatial_ref_sys
  (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
VALUES
  (?1, ?2, 'EPSG', ?2, ?3, ?4)
";

const SQL_INSERT_CONTENTS: &str = "
INSERT OR REPLACE INTO gpkg_contents
  (table_name, data_type, identifier, description, srs_id)
VALUES
  (?1, 'features', 'Cadastral Objects', 'Cadastral objects from Kazan', ?2)
";

const SQL_INSERT_GEOMETRY_COLUMN: &str = "
INSERT OR REPLACE INTO gpkg_geometry_columns
  (table_name, column_name, geometry_type_name, srs_id, z, m)
VALUES
  (?1, ?2, ?3, ?4, 0, 0)
";

const SQL_INSERT_OBJECT: &str = "
INSERT INTO cadastral_objects
  (code, quarter_code, load_status, update_date, area, cost_value,
   permitted_use_established_by_document, right_type, status,
   land_record_type, land_record_subtype, land_record_category_type, geometry)
VALUES
  (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
";

const SQL_UPDATE_EXTENT: &str = "
UPDATE gpkg_contents SET min_x = ?1, min_y = ?2, max_x = ?3, max_y = ?4
WHERE table_name = ?5
";

/// Définition d'un système de référence enregistré
struct SpatialRefSys {
    name: &'static str,
    id: i32,
    definition: &'static str,
    description: &'static str,
}

const SPATIAL_REF_SYSTEMS: [SpatialRefSys; 2] = [
    SpatialRefSys {
        name: "WGS 84 / Pseudo-Mercator",
        id: WEB_MERCATOR_SRS_ID,
        definition: r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["X",EAST],AXIS["Y",NORTH],EXTENSION["PROJ4","+proj=merc +a=6378137 +b=6378137 +lat_ts=0.0 +lon_0=0.0 +x_0=0.0 +y_0=0 +k=1.0 +units=m +nadgrids=@null +wktext +no_defs"],AUTHORITY["EPSG","3857"]]"#,
        description: "Popular Visualisation CRS / Mercator",
    },
    SpatialRefSys {
        name: "WGS 84",
        id: 4326,
        definition: r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#,
        description: "WGS 84",
    },
];

/// GeoPackage en cours d'écriture
pub struct GeoPackage {
    conn: Connection,
}

impl GeoPackage {
    /// Crée le fichier (en remplaçant un fichier existant) et son schéma
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!(path = %path.display(), "Removing existing GeoPackage");
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove existing file {}", path.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to create GeoPackage {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// GeoPackage en mémoire
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let gpkg = Self { conn };
        gpkg.initialize()?;
        Ok(gpkg)
    }

    fn initialize(&self) -> Result<()> {
        self.conn
            .execute_batch(&format!(
                "PRAGMA foreign_keys = ON;
                 PRAGMA application_id = {GPKG_APPLICATION_ID};
                 PRAGMA user_version = {GPKG_USER_VERSION};"
            ))
            .context("Failed to set GeoPackage pragmas")?;

        self.conn
            .execute_batch(SQL_GPKG_SPATIAL_REF_SYS)
            .context("Failed to create gpkg_spatial_ref_sys")?;
        for srs in &SPATIAL_REF_SYSTEMS {
            self.conn
                .execute(
                    SQL_INSERT_SRS,
                    params![srs.name, srs.id, srs.definition, srs.description],
                )
                .with_context(|| format!("Failed to insert EPSG:{}", srs.id))?;
        }

        self.conn
            .execute_batch(SQL_GPKG_CONTENTS)
            .context("Failed to create gpkg_contents")?;
        self.conn
            .execute_batch(SQL_GPKG_GEOMETRY_COLUMNS)
            .context("Failed to create gpkg_geometry_columns")?;
        self.conn
            .execute_batch(SQL_CADASTRAL_OBJECTS)
            .context("Failed to create cadastral_objects table")?;

        self.conn
            .execute(SQL_INSERT_CONTENTS, params![TABLE_NAME, WEB_MERCATOR_SRS_ID])
            .context("Failed to register table in gpkg_contents")?;
        self.conn
            .execute(
                SQL_INSERT_GEOMETRY_COLUMN,
                params![
                    TABLE_NAME,
                    GEOMETRY_COLUMN,
                    DECLARED_GEOMETRY_TYPE,
                    WEB_MERCATOR_SRS_ID
                ],
            )
            .context("Failed to register geometry column")?;

        info!(table = TABLE_NAME, "GeoPackage initialized");
        Ok(())
    }

    /// Ouvre une transaction d'insertion
    pub fn writer(&mut self) -> Result<ObjectWriter<'_>> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin GeoPackage transaction")?;
        Ok(ObjectWriter { tx })
    }

    /// Enregistre l'emprise globale de la table
    pub fn update_extent(&self, envelope: &Envelope) -> Result<()> {
        self.conn
            .execute(
                SQL_UPDATE_EXTENT,
                params![
                    envelope.min_x,
                    envelope.min_y,
                    envelope.max_x,
                    envelope.max_y,
                    TABLE_NAME
                ],
            )
            .context("Failed to update gpkg_contents extent")?;
        Ok(())
    }

    /// Emprise enregistrée dans `gpkg_contents`, si elle a été renseignée
    pub fn extent(&self) -> Result<Option<Envelope>> {
        let bounds: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) = self
            .conn
            .query_row(
                "SELECT min_x, min_y, max_x, max_y FROM gpkg_contents WHERE table_name = ?1",
                params![TABLE_NAME],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .context("Failed to read gpkg_contents extent")?;

        Ok(match bounds {
            (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) => Some(Envelope {
                min_x,
                max_x,
                min_y,
                max_y,
            }),
            _ => None,
        })
    }

    /// Nombre d'objets écrits
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cadastral_objects", [], |row| row.get(0))
            .context("Failed to count cadastral objects")?;
        Ok(count as usize)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Insertion des objets dans une transaction unique
pub struct ObjectWriter<'c> {
    tx: Transaction<'c>,
}

impl ObjectWriter<'_> {
    /// Insère un objet et son blob.
    ///
    /// Un échec (code déjà présent...) n'annule que cette ligne.
    pub fn insert(
        &self,
        object: &CadastralObject,
        geometry: &EncodedGeometry,
    ) -> rusqlite::Result<()> {
        let mut stmt = self.tx.prepare_cached(SQL_INSERT_OBJECT)?;
        stmt.execute(params![
            object.code,
            object.quarter_code,
            object.load_status,
            object.update_date,
            object.area,
            object.cost_value,
            object.permitted_use_established_by_document,
            object.right_type,
            object.status,
            object.land_record_type,
            object.land_record_subtype,
            object.land_record_category_type,
            &geometry.blob[..],
        ])?;
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .context("Failed to commit GeoPackage transaction")
    }
}
