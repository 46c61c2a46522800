//! Row representation and payload parsing
//!
//! A row is an ordered mapping from field name to a JSON-compatible value.
//! The core never looks inside a row; it only moves rows between queues and
//! the sink channel. Field order is preserved so the sink sees exactly what
//! the producer sent.

use serde_json::Value;

use crate::error::ProtocolError;

/// One buffered row: field name to value, insertion-ordered.
///
/// `serde_json::Map` is insertion-ordered here because the workspace enables
/// the `preserve_order` feature.
pub type Row = serde_json::Map<String, Value>;

/// Parse a producer payload into rows.
///
/// Accepts either a single JSON object (one row) or an array of objects.
/// Anything else is rejected: array elements that are not objects, bare
/// scalars, or bodies that fail to parse at all.
pub fn parse_rows(body: &str) -> Result<Vec<Row>, ProtocolError> {
    let value: Value = serde_json::from_str(body)?;
    match value {
        Value::Object(row) => Ok(vec![row]),
        Value::Array(items) => {
            let mut rows = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(row) => rows.push(row),
                    _ => return Err(ProtocolError::UnexpectedPayloadShape),
                }
            }
            Ok(rows)
        }
        _ => Err(ProtocolError::UnexpectedPayloadShape),
    }
}

/// Serialize a row to the text form stored in the durable log.
pub fn row_to_text(row: &Row) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(row)?)
}

/// Parse a durable-log value back into a row.
pub fn row_from_text(text: &str) -> Result<Row, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(row) => Ok(row),
        _ => Err(ProtocolError::UnexpectedPayloadShape),
    }
}
