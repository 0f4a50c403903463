//! Document parsing and formatting.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::{LensError, LensResult};

/// Turns editor text into a document value.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, text: &str) -> LensResult<Value>;
}

/// JSON5 parser: accepts comments, trailing commas, unquoted keys,
/// single-quoted strings and the rest of plain JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct Json5Parser;

impl DocumentParser for Json5Parser {
    fn parse(&self, text: &str) -> LensResult<Value> {
        json5::from_str::<Value>(text).map_err(|error| LensError::Parse(error.to_string()))
    }
}

/// Serialize `document` as indented text with `indent` spaces per level.
pub fn format_document(document: &Value, indent: usize) -> LensResult<String> {
    let indent = " ".repeat(indent);
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut serializer).map_err(|error| {
        LensError::Internal(format!("failed to serialize document: {error}"))
    })?;
    String::from_utf8(out)
        .map_err(|error| LensError::Internal(format!("formatted document is not UTF-8: {error}")))
}
