//! Propriétés dérivées d'un objet cadastral

use parcel_geom::JsonObject;
use serde_json::Value;

use crate::source::CadastralObject;

/// Clés produites par [`derive_properties`], `update_date` compris
pub const DERIVED_KEYS: [&str; 12] = [
    "code",
    "quarter_code",
    "load_status",
    "area",
    "cost_value",
    "permitted_use_established_by_document",
    "right_type",
    "status",
    "land_record_type",
    "land_record_subtype",
    "land_record_category_type",
    "update_date",
];

/// Valeur de regroupement d'une propriété absente
pub const UNKNOWN_GROUP: &str = "unknown";

/// Construit le jeu de propriétés d'un objet.
///
/// Une colonne NULL donne `null`, sauf `update_date` qui est omise.
pub fn derive_properties(object: &CadastralObject) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("code".into(), object.code.into());
    props.insert("quarter_code".into(), object.quarter_code.into());
    props.insert("load_status".into(), object.load_status.clone().into());
    props.insert("area".into(), object.area.into());
    props.insert("cost_value".into(), object.cost_value.into());

    let text_columns = [
        (
            "permitted_use_established_by_document",
            &object.permitted_use_established_by_document,
        ),
        ("right_type", &object.right_type),
        ("status", &object.status),
        ("land_record_type", &object.land_record_type),
        ("land_record_subtype", &object.land_record_subtype),
        ("land_record_category_type", &object.land_record_category_type),
    ];
    for (key, value) in text_columns {
        props.insert(key.into(), value.clone().into());
    }

    if let Some(date) = &object.update_date {
        props.insert("update_date".into(), date.clone().into());
    }
    props
}

/// Fusionne les propriétés existantes d'une feature avec le jeu dérivé.
///
/// Les clés dérivées l'emportent ; les autres clés existantes sont conservées.
pub fn merge_properties(existing: Option<Value>, derived: JsonObject) -> JsonObject {
    let mut merged = match existing {
        Some(Value::Object(map)) => map,
        _ => JsonObject::new(),
    };
    merged.extend(derived);
    merged
}

/// Valeur textuelle d'une propriété pour le regroupement.
///
/// Chaînes telles quelles, nombres sans partie décimale, `null` pour une
/// valeur nulle, [`UNKNOWN_GROUP`] pour une clé absente.
pub fn group_value(props: &JsonObject, key: &str) -> String {
    match props.get(key) {
        None => UNKNOWN_GROUP.to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(u)) => u.to_string(),
            _ => format!("{:.0}", n.as_f64().unwrap_or_default()),
        },
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}
