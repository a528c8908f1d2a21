//! Response validation: decides whether a parsed response is a success, an
//! update that did not take effect, or a protocol violation.
//!
//! | Operation kind | Success requires | Otherwise |
//! |----------------|------------------|-----------|
//! | find / launch | non-null body with a non-null named field | [`ClientError::Protocol`] |
//! | list | non-null body whose named field is an array | [`ClientError::Protocol`] |
//! | workitem update / proceed | echoed `workitem.fields` equal to the fields sent | [`ClientError::Conflict`] |
//! | expression cancel / kill | `status == "ok"` | [`ClientError::Protocol`] |
//!
//! Process cancel and kill are not validated at all; the agent returns the
//! raw body.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ClientError, Fei, Fields};

/// Returns the non-null value of `field` in `response`.
pub(crate) fn require_field<'a>(
    response: &'a Value,
    field: &str,
    operation: &'static str,
) -> Result<&'a Value, ClientError> {
    if response.is_null() {
        return Err(ClientError::protocol(operation, "response body is null"));
    }
    match response.get(field) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(ClientError::protocol(
            operation,
            format!("field '{field}' is missing or null"),
        )),
    }
}

/// Returns the elements of the array stored under `field` in `response`.
pub(crate) fn require_array<'a>(
    response: &'a Value,
    field: &str,
    operation: &'static str,
) -> Result<&'a [Value], ClientError> {
    require_field(response, field, operation)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ClientError::protocol(operation, format!("field '{field}' is not an array")))
}

/// Decodes one payload element into `T`.
pub(crate) fn decode<T: DeserializeOwned>(
    value: &Value,
    operation: &'static str,
) -> Result<T, ClientError> {
    T::deserialize(value).map_err(|e| ClientError::protocol(operation, e.to_string()))
}

/// Checks that the server echoed back exactly the fields that were sent.
///
/// Numbers compare by value, so an engine echoing `1.0` for a sent `1`
/// still counts as a match. Everything else must be structurally equal.
pub(crate) fn require_echoed_fields(
    response: &Value,
    sent: &Fields,
    fei: &Fei,
) -> Result<(), ClientError> {
    let echoed = response
        .get("workitem")
        .and_then(|workitem| workitem.get("fields"))
        .and_then(Value::as_object);

    match echoed {
        Some(echoed) if same_fields(echoed, sent) => Ok(()),
        _ => Err(ClientError::Conflict { fei: fei.clone() }),
    }
}

fn same_fields(a: &Fields, b: &Fields) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(name, value)| b.get(name).is_some_and(|other| same_value(value, other)))
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(x), Value::Object(y)) => same_fields(x, y),
        _ => a == b,
    }
}

/// Checks for an explicit `"status": "ok"`.
pub(crate) fn require_status_ok(response: &Value, operation: &'static str) -> Result<(), ClientError> {
    match response.get("status").and_then(Value::as_str) {
        Some("ok") => Ok(()),
        Some(other) => Err(ClientError::protocol(
            operation,
            format!("status is '{other}', expected 'ok'"),
        )),
        None => Err(ClientError::protocol(operation, "no status in response")),
    }
}
