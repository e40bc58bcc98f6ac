use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;
use thiserror::Error;

/// Body returned by the spot price endpoint, as decoded from the wire.
pub type RawApiResponse = Value;

/// 一筆現貨報價
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SpotPrice {
    /// Price kept as text, exactly as the API sent it.
    pub amount: String,
    /// Asset symbol, e.g. `BTC`.
    pub base: String,
    /// Quote currency, e.g. `USD`.
    pub currency: String,
}

/// A response that has passed shape validation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub data: SpotPrice,
}

/// JSON value kinds used in validation messages.
#[derive(Display, Debug, Copy, Clone, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum JsonType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Bool,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaValidationError {
    #[error("field `{field}` is missing, expected {expected}")]
    Missing {
        field: &'static str,
        expected: JsonType,
    },
    #[error("field `{field}` expected {expected} but found {found}")]
    WrongType {
        field: &'static str,
        expected: JsonType,
        found: JsonType,
    },
}

impl TryFrom<&RawApiResponse> for ApiResponse {
    type Error = SchemaValidationError;

    /// Checks the whole shape before copying anything out, so a failure never
    /// leaves a half-built quote behind.
    fn try_from(raw: &RawApiResponse) -> Result<Self, Self::Error> {
        let root = expect_object("$", Some(raw))?;
        let data = expect_object("data", root.get("data"))?;

        let amount = expect_str("data.amount", data.get("amount"))?;
        let base = expect_str("data.base", data.get("base"))?;
        let currency = expect_str("data.currency", data.get("currency"))?;

        Ok(ApiResponse {
            data: SpotPrice {
                amount: amount.to_string(),
                base: base.to_string(),
                currency: currency.to_string(),
            },
        })
    }
}

fn expect_object<'a>(
    field: &'static str,
    value: Option<&'a Value>,
) -> Result<&'a serde_json::Map<String, Value>, SchemaValidationError> {
    match value {
        None => Err(SchemaValidationError::Missing {
            field,
            expected: JsonType::Object,
        }),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(SchemaValidationError::WrongType {
            field,
            expected: JsonType::Object,
            found: JsonType::of(other),
        }),
    }
}

fn expect_str<'a>(
    field: &'static str,
    value: Option<&'a Value>,
) -> Result<&'a str, SchemaValidationError> {
    match value {
        None => Err(SchemaValidationError::Missing {
            field,
            expected: JsonType::String,
        }),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(SchemaValidationError::WrongType {
            field,
            expected: JsonType::String,
            found: JsonType::of(other),
        }),
    }
}
