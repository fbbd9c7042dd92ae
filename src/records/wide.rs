//! Wide storage rows: one single-level row per version.
//!
//! Identity attributes keep their own keys; version attributes are flattened under
//! `techRecord_<path>`, with array indices as path segments (`techRecord_axles_0_gbWeight`).
//! Nulls and empty containers are not written and come back as their defaults.
//! Free-form subtrees such as `regulatoryDetails` are written as one JSON-encoded column
//! so their keys survive unchanged.

use serde_json::{Map, Value};

use super::domain::VehicleRecord;
use super::error::TechRecordError;
use super::processor::VehicleTypeProcessor;

pub type WideRow = Map<String, Value>;

const VERSIONS_KEY: &str = "techRecord";
const SEPARATOR: char = '_';
const OPAQUE_FIELDS: [&str; 1] = ["regulatoryDetails"];

pub fn flatten_record(vehicle: &VehicleRecord) -> Result<Vec<WideRow>, TechRecordError> {
    let identity = identity_fields(vehicle)?;

    vehicle
        .tech_records
        .iter()
        .map(|version| {
            let mut value = serde_json::to_value(version).map_err(malformed)?;
            let mut row = identity.clone();
            if let Value::Object(fields) = &mut value {
                for field in OPAQUE_FIELDS {
                    if let Some(subtree) = fields.remove(field).filter(|v| !v.is_null()) {
                        let encoded = serde_json::to_string(&subtree).map_err(malformed)?;
                        row.insert(opaque_key(field), Value::String(encoded));
                    }
                }
            }
            flatten_into(&mut row, VERSIONS_KEY, value);
            Ok(row)
        })
        .collect()
}

/// Rebuilds one vehicle from the rows stored for its system number.
pub fn nest_rows(rows: &[WideRow]) -> Result<VehicleRecord, TechRecordError> {
    let Some(first) = rows.first() else {
        return Err(TechRecordError::NotFound("no rows to assemble".to_string()));
    };

    let mut identity: WideRow = first
        .iter()
        .filter(|(key, _)| !is_version_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let system_number = identity.get("systemNumber").cloned();
    identity.insert(VERSIONS_KEY.to_string(), Value::Array(Vec::new()));

    let mut vehicle: VehicleRecord =
        serde_json::from_value(Value::Object(identity)).map_err(malformed)?;

    for row in rows {
        if row.get("systemNumber").cloned() != system_number {
            return Err(TechRecordError::Internal(
                "wide rows belong to different vehicles".to_string(),
            ));
        }

        let mut version = Value::Object(Map::new());
        for (key, value) in row {
            let Some(path) = key
                .strip_prefix(VERSIONS_KEY)
                .and_then(|rest| rest.strip_prefix(SEPARATOR))
            else {
                continue;
            };
            if OPAQUE_FIELDS.contains(&path) {
                let Value::String(encoded) = value else {
                    return Err(TechRecordError::Internal(format!(
                        "wide column {key} must hold encoded JSON"
                    )));
                };
                let subtree: Value = serde_json::from_str(encoded).map_err(malformed)?;
                if let Value::Object(fields) = &mut version {
                    fields.insert(path.to_string(), subtree);
                }
                continue;
            }
            let segments: Vec<&str> = path.split(SEPARATOR).collect();
            insert_path(&mut version, &segments, value.clone());
        }
        vehicle
            .tech_records
            .push(VehicleTypeProcessor::parse_version(version)?);
    }

    Ok(vehicle)
}

fn identity_fields(vehicle: &VehicleRecord) -> Result<WideRow, TechRecordError> {
    let Value::Object(mut fields) = serde_json::to_value(vehicle).map_err(malformed)? else {
        return Err(TechRecordError::Internal(
            "vehicle did not serialize to an object".to_string(),
        ));
    };
    fields.remove(VERSIONS_KEY);
    fields.retain(|_, value| !value.is_null());
    Ok(fields)
}

fn opaque_key(field: &str) -> String {
    format!("{VERSIONS_KEY}{SEPARATOR}{field}")
}

fn is_version_key(key: &str) -> bool {
    key.strip_prefix(VERSIONS_KEY)
        .is_some_and(|rest| rest.starts_with(SEPARATOR))
}

fn flatten_into(row: &mut WideRow, prefix: &str, value: Value) {
    match value {
        Value::Null => {}
        Value::Object(fields) => {
            for (key, child) in fields {
                flatten_into(row, &format!("{prefix}{SEPARATOR}{key}"), child);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.into_iter().enumerate() {
                flatten_into(row, &format!("{prefix}{SEPARATOR}{index}"), child);
            }
        }
        scalar => {
            row.insert(prefix.to_string(), scalar);
        }
    }
}

fn insert_path(node: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    let child = if let Ok(index) = head.parse::<usize>() {
        if !node.is_array() {
            *node = Value::Array(Vec::new());
        }
        let Value::Array(items) = node else {
            return;
        };
        if items.len() <= index {
            items.resize(index + 1, Value::Null);
        }
        &mut items[index]
    } else {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(fields) = node else {
            return;
        };
        fields.entry(head.to_string()).or_insert(Value::Null)
    };

    insert_path(child, rest, value);
}

fn malformed(err: serde_json::Error) -> TechRecordError {
    TechRecordError::Internal(format!("wide row is malformed: {err}"))
}
