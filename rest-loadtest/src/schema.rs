//! Request and response schemas.
//!
//! Every record goes through [`parse`], which checks the shape (an object), deserializes it and
//! then applies the field bounds declared with `validator`.
use crate::config::APP_NAME;
use crate::error::SchemaError;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::error;
use validator::Validate;

/// A record type that can be checked with [`parse`].
pub trait Schema: DeserializeOwned + Validate {
    const NAME: &'static str;
}

/// Body of a request to the endpoint under test; the endpoint echoes it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RequestPayload {
    /// Name of the service calling the endpoint, used for logging and usage statistics.
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 45))]
    pub requesting_service_name: String,
}

impl Schema for RequestPayload {
    const NAME: &'static str = "RequestPayload";
}

pub fn parse<S: Schema>(record: &Value) -> Result<S, SchemaError> {
    if !record.is_object() {
        return Err(SchemaError::Type {
            schema: S::NAME,
            found: json_type(record),
            record: record.to_string(),
        });
    }

    let parsed = S::deserialize(record).map_err(|err| SchemaError::Validation {
        schema: S::NAME,
        errors: json!([{ "msg": err.to_string() }]),
    })?;

    parsed
        .validate()
        .map_err(|errors| SchemaError::Validation {
            schema: S::NAME,
            errors: serde_json::to_value(&errors)
                .unwrap_or_else(|_| Value::String(errors.to_string())),
        })?;

    Ok(parsed)
}

/// Build the payload sent with every request.
///
/// A record that fails its schema is logged and returned as an error; the caller must not send
/// anything in that case.
pub fn build_request_payload() -> Result<RequestPayload, SchemaError> {
    parse_request_payload(&json!({ "requesting_service_name": APP_NAME }))
}

pub fn parse_request_payload(raw: &Value) -> Result<RequestPayload, SchemaError> {
    parse::<RequestPayload>(raw).map_err(|err| {
        error!(kind = err.kind(), schema = err.schema(), "{err}");
        err
    })
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}
