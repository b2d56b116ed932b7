//! Lecture des objets cadastraux depuis la table `object`

use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tracing::{debug, info, warn};

/// Requête source : seuls les objets chargés avec succès et porteurs d'un
/// payload sont exportés
pub const SELECT_OBJECTS_SQL: &str = r#"
SELECT o.code::bigint AS code,
       o.quarter_code::bigint AS quarter_code,
       o.load_status::text AS load_status,
       to_char(o.update_date, 'YYYY-MM-DD') AS update_date,
       o.data::text AS data,
       o.area::bigint AS area,
       o.cost_value::float8 AS cost_value,
       o.permitted_use_established_by_document::text AS permitted_use_established_by_document,
       o.right_type::text AS right_type,
       o.status::text AS status,
       o.land_record_type::text AS land_record_type,
       o.land_record_subtype::text AS land_record_subtype,
       o.land_record_category_type::text AS land_record_category_type
FROM object o
WHERE o.data IS NOT NULL AND o.load_status = 'SUCCESS'
"#;

/// Une ligne de la table `object`
#[derive(Debug, Clone, PartialEq)]
pub struct CadastralObject {
    pub code: i64,
    pub quarter_code: i64,
    pub load_status: String,
    /// Date au format `YYYY-MM-DD`
    pub update_date: Option<String>,
    /// Payload GeoJSON brut (`{"data": {"features": [...]}}`)
    pub data: String,
    pub area: Option<i64>,
    pub cost_value: Option<f64>,
    pub permitted_use_established_by_document: Option<String>,
    pub right_type: Option<String>,
    pub status: Option<String>,
    pub land_record_type: Option<String>,
    pub land_record_subtype: Option<String>,
    pub land_record_category_type: Option<String>,
}

impl CadastralObject {
    /// Décode une ligne de [`SELECT_OBJECTS_SQL`]
    pub fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            code: row.try_get("code")?,
            quarter_code: row.try_get("quarter_code")?,
            load_status: row.try_get("load_status")?,
            update_date: row.try_get("update_date")?,
            data: row.try_get("data")?,
            area: row.try_get("area")?,
            cost_value: row.try_get("cost_value")?,
            permitted_use_established_by_document: row
                .try_get("permitted_use_established_by_document")?,
            right_type: row.try_get("right_type")?,
            status: row.try_get("status")?,
            land_record_type: row.try_get("land_record_type")?,
            land_record_subtype: row.try_get("land_record_subtype")?,
            land_record_category_type: row.try_get("land_record_category_type")?,
        })
    }
}

/// Résultat de la lecture : objets décodés et lignes écartées
#[derive(Debug, Default)]
pub struct FetchedObjects {
    pub objects: Vec<CadastralObject>,
    /// Lignes illisibles (index dans le résultat, message)
    pub rejected: Vec<(usize, String)>,
}

/// Lit tous les objets exportables.
///
/// Une ligne qui ne se décode pas est écartée avec un warning ; une
/// erreur de requête est fatale.
pub async fn fetch_objects(pool: &Pool) -> Result<FetchedObjects> {
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;

    debug!("Querying cadastral objects");
    let rows = client
        .query(SELECT_OBJECTS_SQL, &[])
        .await
        .context("Failed to query cadastral objects")?;

    let mut fetched = FetchedObjects {
        objects: Vec::with_capacity(rows.len()),
        rejected: Vec::new(),
    };
    for (index, row) in rows.iter().enumerate() {
        match CadastralObject::from_row(row) {
            Ok(object) => fetched.objects.push(object),
            Err(e) => {
                warn!(row = index, error = %e, "Skipping undecodable row");
                fetched.rejected.push((index, e.to_string()));
            }
        }
    }

    info!(
        rows = rows.len(),
        objects = fetched.objects.len(),
        rejected = fetched.rejected.len(),
        "Fetched cadastral objects"
    );
    Ok(fetched)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_filters() {
        assert!(SELECT_OBJECTS_SQL.contains("o.data IS NOT NULL"));
        assert!(SELECT_OBJECTS_SQL.contains("o.load_status = 'SUCCESS'"));
        assert!(SELECT_OBJECTS_SQL.contains("'YYYY-MM-DD'"));
    }

    #[test]
    fn test_fixture_payload_is_valid() {
        let object = fixtures::square(1, 10.0);
        let value: serde_json::Value = serde_json::from_str(&object.data).unwrap();
        assert_eq!(value["data"]["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(value["data"]["features"][0]["properties"]["label"], "lot 1");
    }
}
