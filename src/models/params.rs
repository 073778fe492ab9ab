//! Inbound `data` query parameter.
//!
//! Browsers send it either as a JSON object (`?data={"id":..}`) or in
//! bracket notation (`?data[id]=..&data[latitude]=..`). `/location` sends a
//! bare string.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CoordinateParams {
    pub id: Uuid,
    #[serde(deserialize_with = "parse_f64")]
    pub latitude: f64,
    #[serde(deserialize_with = "parse_f64")]
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MovieParams {
    pub id: Uuid,
    pub search_query: String,
}

fn parse_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    match StringOrFloat::deserialize(deserializer)? {
        StringOrFloat::Float(f) => Ok(f),
        StringOrFloat::String(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

/// Extracts and decodes the `data` parameter from a raw query string.
pub fn parse_data<T: DeserializeOwned>(raw_query: &str) -> Result<T> {
    let mut whole: Option<Value> = None;
    let mut fields = Map::new();

    for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
        if key == "data" {
            let value = value.into_owned();
            whole = Some(if value.trim_start().starts_with('{') {
                serde_json::from_str(&value)
                    .map_err(|e| AppError::BadRequest(format!("data is not valid JSON: {}", e)))?
            } else {
                Value::String(value)
            });
        } else if let Some(field) = key
            .strip_prefix("data[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            fields.insert(field.to_string(), Value::String(value.into_owned()));
        }
    }

    let data = match whole {
        Some(Value::Object(mut object)) => {
            object.extend(fields);
            Value::Object(object)
        }
        Some(other) if fields.is_empty() => other,
        None if !fields.is_empty() => Value::Object(fields),
        _ => return Err(AppError::BadRequest("missing data parameter".to_string())),
    };

    serde_json::from_value(data).map_err(|e| AppError::BadRequest(e.to_string()))
}
