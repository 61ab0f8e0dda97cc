//! Loading documents from a record file.
//!
//! Two layouts are recognized: a JSON array of objects, or JSON Lines (one
//! object per non-blank line). Each record needs `id` (string or number),
//! `title` (string) and `categories` (array of strings, or a single string).
//! Unknown fields are ignored.

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{Corpus, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    JsonArray,
    JsonLines,
}

impl RecordFormat {
    /// `.jsonl` and `.ndjson` are line-delimited; everything else is a JSON array.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("jsonl" | "ndjson") => RecordFormat::JsonLines,
            _ => RecordFormat::JsonArray,
        }
    }
}

pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::InputFormat(format!("cannot read {}: {}", path.display(), e)))?;
    let format = RecordFormat::from_path(path);
    debug!(path = %path.display(), ?format, "parsing records");
    let corpus = parse_corpus(&raw, format)?;
    info!(path = %path.display(), documents = corpus.len(), "loaded corpus");
    Ok(corpus)
}

pub fn parse_corpus(raw: &str, format: RecordFormat) -> Result<Corpus> {
    let docs = match format {
        RecordFormat::JsonArray => parse_json_array(raw)?,
        RecordFormat::JsonLines => parse_json_lines(raw)?,
    };
    Corpus::new(docs)
}

fn parse_json_array(raw: &str) -> Result<Vec<Document>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Error::InputFormat(format!("invalid JSON: {}", e)))?;
    let Value::Array(records) = value else {
        return Err(Error::InputFormat("expected a JSON array of records".to_string()));
    };
    records.iter().enumerate().map(|(pos, v)| document_from_value(pos, v)).collect()
}

fn parse_json_lines(raw: &str) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() { continue; }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| Error::InputFormat(format!("line {}: invalid JSON: {}", line_no + 1, e)))?;
        docs.push(document_from_value(docs.len(), &value)?);
    }
    Ok(docs)
}

fn document_from_value(pos: usize, value: &Value) -> Result<Document> {
    let Value::Object(record) = value else {
        return Err(Error::InputFormat(format!("record {}: expected an object", pos)));
    };
    let id = match required(record, pos, "id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(wrong_type(pos, "id", "a string or number", other)),
    };
    let text = match required(record, pos, "title")? {
        Value::String(s) => s.clone(),
        other => return Err(wrong_type(pos, "title", "a string", other)),
    };
    let categories = match required(record, pos, "categories")? {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(wrong_type(pos, "categories", "an array of strings", other)),
            })
            .collect::<Result<Vec<_>>>()?,
        other => return Err(wrong_type(pos, "categories", "an array of strings", other)),
    };
    Ok(Document::new(id, text, categories))
}

fn required<'a>(record: &'a Map<String, Value>, pos: usize, field: &str) -> Result<&'a Value> {
    record
        .get(field)
        .ok_or_else(|| Error::InputFormat(format!("record {}: missing field '{}'", pos, field)))
}

fn wrong_type(pos: usize, field: &str, expected: &str, got: &Value) -> Error {
    let kind = match got {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    Error::InputFormat(format!("record {}: field '{}' must be {}, got {}", pos, field, expected, kind))
}
