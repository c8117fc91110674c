//! Firestore REST wire format.
//!
//! Firestore wraps every field value in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "3"}` and so on). These types
//! mirror that encoding and convert to and from plain JSON.
//!
//! The mapping is lossy in one direction only: timestamps, references and
//! bytes come back as strings, and geo points as `{latitude, longitude}`
//! objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::Fields;

/// A single typed Firestore value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireValue {
    NullValue(()),
    BooleanValue(bool),
    /// 64-bit integer, sent as a decimal string
    IntegerValue(String),
    DoubleValue(f64),
    /// RFC 3339 text
    TimestampValue(String),
    StringValue(String),
    /// Base64 text
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<WireValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, WireValue>,
}

/// A Firestore document resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireDocument {
    /// Full resource name, ending in `/{collection}/{id}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub fields: BTreeMap<String, WireValue>,
}

impl WireDocument {
    pub fn from_fields(fields: &Fields) -> Self {
        Self {
            name: None,
            fields: fields
                .iter()
                .map(|(k, v)| (k.clone(), to_wire(v)))
                .collect(),
        }
    }

    /// The document id: the last segment of the resource name.
    pub fn id(&self) -> Option<&str> {
        self.name
            .as_deref()
            .and_then(|name| name.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }

    pub fn into_fields(self) -> Fields {
        self.fields
            .into_iter()
            .map(|(k, v)| (k, from_wire(v)))
            .collect()
    }
}

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
pub struct RunQueryItem {
    pub document: Option<WireDocument>,
}

/// Encode plain JSON as a Firestore value.
pub fn to_wire(value: &Value) -> WireValue {
    match value {
        Value::Null => WireValue::NullValue(()),
        Value::Bool(b) => WireValue::BooleanValue(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => WireValue::IntegerValue(i.to_string()),
            None => WireValue::DoubleValue(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => WireValue::StringValue(s.clone()),
        Value::Array(items) => WireValue::ArrayValue(ArrayValue {
            values: items.iter().map(to_wire).collect(),
        }),
        Value::Object(map) => WireValue::MapValue(MapValue {
            fields: map.iter().map(|(k, v)| (k.clone(), to_wire(v))).collect(),
        }),
    }
}

/// Decode a Firestore value to plain JSON.
pub fn from_wire(value: WireValue) -> Value {
    match value {
        WireValue::NullValue(()) => Value::Null,
        WireValue::BooleanValue(b) => Value::Bool(b),
        WireValue::IntegerValue(s) => match s.parse::<i64>() {
            Ok(i) => Value::Number(i.into()),
            Err(_) => Value::String(s),
        },
        WireValue::DoubleValue(d) => Number::from_f64(d).map_or(Value::Null, Value::Number),
        WireValue::TimestampValue(s)
        | WireValue::StringValue(s)
        | WireValue::BytesValue(s)
        | WireValue::ReferenceValue(s) => Value::String(s),
        WireValue::GeoPointValue(p) => {
            let mut map = Fields::new();
            map.insert("latitude".into(), from_wire(WireValue::DoubleValue(p.latitude)));
            map.insert("longitude".into(), from_wire(WireValue::DoubleValue(p.longitude)));
            Value::Object(map)
        }
        WireValue::ArrayValue(a) => Value::Array(a.values.into_iter().map(from_wire).collect()),
        WireValue::MapValue(m) => Value::Object(
            m.fields
                .into_iter()
                .map(|(k, v)| (k, from_wire(v)))
                .collect(),
        ),
    }
}
