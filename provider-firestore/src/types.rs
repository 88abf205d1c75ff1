//! Firestore REST response types
//!
//! Data structures for deserializing Firestore v1 responses and turning
//! typed field values into plain JSON.

use std::collections::BTreeMap;

use bridge_traits::catalog::CatalogDocument;
use serde::Deserialize;
use serde_json::{Map, Number, Value};

use crate::error::{FirestoreError, Result};

/// Firestore `documents.list` response
///
/// See: https://firebase.google.com/docs/firestore/reference/rest/v1/projects.databases.documents/list
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    /// Documents in this page (absent for an empty collection)
    #[serde(default)]
    pub documents: Vec<FirestoreDocument>,

    /// Token for next page
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Firestore document resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreDocument {
    /// Full resource name, ending in `/{collection}/{documentId}`
    pub name: String,

    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,

    #[serde(default)]
    pub create_time: Option<String>,

    #[serde(default)]
    pub update_time: Option<String>,
}

impl FirestoreDocument {
    /// Last path segment of the resource name
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn into_catalog_document(self) -> Result<CatalogDocument> {
        let id = self.id().to_string();
        let data = decode_fields(self.fields)?;
        Ok(CatalogDocument::new(id, data))
    }
}

/// Geographic point value
#[derive(Debug, Clone, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FirestoreValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

/// A Firestore typed value, e.g. `{"stringValue": "E"}`
///
/// See: https://firebase.google.com/docs/firestore/reference/rest/v1/Value
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    NullValue(Value),
    BooleanValue(bool),
    /// int64 encoded as a decimal string
    IntegerValue(Value),
    /// A number, or `"NaN"` / `"Infinity"` / `"-Infinity"`
    DoubleValue(Value),
    TimestampValue(String),
    StringValue(String),
    /// Base64 encoded
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

impl FirestoreValue {
    /// Plain JSON for this value. `field` names the value in errors.
    pub fn into_json(self, field: &str) -> Result<Value> {
        Ok(match self {
            FirestoreValue::NullValue(_) => Value::Null,
            FirestoreValue::BooleanValue(b) => Value::Bool(b),
            FirestoreValue::IntegerValue(v) => Value::Number(decode_integer(field, &v)?),
            FirestoreValue::DoubleValue(v) => decode_double(field, &v)?,
            FirestoreValue::TimestampValue(s)
            | FirestoreValue::StringValue(s)
            | FirestoreValue::BytesValue(s)
            | FirestoreValue::ReferenceValue(s) => Value::String(s),
            FirestoreValue::GeoPointValue(point) => {
                let mut map = Map::new();
                map.insert("latitude".to_string(), float(field, point.latitude)?);
                map.insert("longitude".to_string(), float(field, point.longitude)?);
                Value::Object(map)
            }
            FirestoreValue::ArrayValue(array) => Value::Array(
                array
                    .values
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| v.into_json(&format!("{}[{}]", field, i)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            FirestoreValue::MapValue(map) => decode_nested(field, map.fields)?,
        })
    }
}

/// Decode a document's `fields` into a JSON object
pub fn decode_fields(fields: BTreeMap<String, FirestoreValue>) -> Result<Value> {
    let mut out = Map::new();
    for (name, value) in fields {
        let json = value.into_json(&name)?;
        out.insert(name, json);
    }
    Ok(Value::Object(out))
}

fn decode_nested(parent: &str, fields: BTreeMap<String, FirestoreValue>) -> Result<Value> {
    let mut out = Map::new();
    for (name, value) in fields {
        let json = value.into_json(&format!("{}.{}", parent, name))?;
        out.insert(name, json);
    }
    Ok(Value::Object(out))
}

fn decode_integer(field: &str, value: &Value) -> Result<Number> {
    let parsed = match value {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    parsed.map(Number::from).ok_or_else(|| FirestoreError::InvalidValue {
        field: field.to_string(),
        message: format!("not an int64: {}", value),
    })
}

fn decode_double(field: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Number(n) => Ok(Value::Number(n.clone())),
        // JSON has no NaN or infinities
        Value::String(s) if matches!(s.as_str(), "NaN" | "Infinity" | "-Infinity") => {
            Ok(Value::Null)
        }
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| invalid_double(field, value))
            .and_then(|f| float(field, f)),
        _ => Err(invalid_double(field, value)),
    }
}

fn float(field: &str, f: f64) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| invalid_double(field, &Value::String(f.to_string())))
}

fn invalid_double(field: &str, value: &Value) -> FirestoreError {
    FirestoreError::InvalidValue {
        field: field.to_string(),
        message: format!("not a double: {}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(body: Value) -> FirestoreDocument {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_decode_song_document() {
        let doc = document(json!({
            "name": "projects/p/databases/(default)/documents/songs/abc123",
            "fields": {
                "name": { "stringValue": "Way Maker" },
                "tempo": { "integerValue": "68" },
                "gain": { "doubleValue": 0.8 },
                "published": { "booleanValue": true },
                "notes": { "nullValue": null },
                "createdAt": { "timestampValue": "2024-03-01T10:00:00Z" },
                "tracks": { "arrayValue": { "values": [
                    { "mapValue": { "fields": {
                        "name": { "stringValue": "Click" },
                        "downloadUrl": { "stringValue": "https://cdn/click.mp3" }
                    } } }
                ] } },
                "tags": { "arrayValue": {} }
            },
            "createTime": "2024-03-01T10:00:00.000000Z",
            "updateTime": "2024-03-02T10:00:00.000000Z"
        }));

        assert_eq!(doc.id(), "abc123");
        let catalog_doc = doc.into_catalog_document().unwrap();

        assert_eq!(catalog_doc.id, "abc123");
        assert_eq!(
            catalog_doc.data,
            json!({
                "name": "Way Maker",
                "tempo": 68,
                "gain": 0.8,
                "published": true,
                "notes": null,
                "createdAt": "2024-03-01T10:00:00Z",
                "tracks": [{ "name": "Click", "downloadUrl": "https://cdn/click.mp3" }],
                "tags": []
            })
        );
    }

    #[test]
    fn test_special_doubles_and_geo_points() {
        let value: FirestoreValue = serde_json::from_value(json!({ "doubleValue": "NaN" })).unwrap();
        assert_eq!(value.into_json("x").unwrap(), Value::Null);

        let value: FirestoreValue =
            serde_json::from_value(json!({ "geoPointValue": { "latitude": 4.6, "longitude": -74.1 } }))
                .unwrap();
        assert_eq!(
            value.into_json("venue").unwrap(),
            json!({ "latitude": 4.6, "longitude": -74.1 })
        );
    }

    #[test]
    fn test_bad_integer_names_the_field() {
        let doc = document(json!({
            "name": "projects/p/databases/(default)/documents/songs/s1",
            "fields": {
                "meta": { "mapValue": { "fields": { "bpm": { "integerValue": "fast" } } } }
            }
        }));

        match doc.into_catalog_document() {
            Err(FirestoreError::InvalidValue { field, .. }) => assert_eq!(field, "meta.bpm"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_empty_list_response() {
        let response: ListDocumentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.documents.is_empty());
        assert!(response.next_page_token.is_none());
    }
}
