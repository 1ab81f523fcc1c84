//! Format parsers: raw source bytes in, records inserted into a builder out.
//!
//! Each parser distinguishes between a file it cannot read as its declared
//! shape (returned as [`ParseError`], fatal for the unit) and individual
//! elements it cannot use (counted in [`ParseStats::skipped`] and logged).

pub mod custom;
pub mod frequency;
pub mod names;
pub mod pitch;
pub mod words;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;

/// Per-file ingestion counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ParseStats {
    /// Elements turned into records (before fan-out).
    pub records: usize,
    /// Malformed elements skipped.
    pub skipped: usize,
    /// Well-formed elements intentionally dropped (no accent data, duplicates).
    pub discarded: usize,
}

impl ParseStats {
    pub fn merge(&mut self, other: ParseStats) {
        self.records += other.records;
        self.skipped += other.skipped;
        self.discarded += other.discarded;
    }
}

/// Top-level shape shared by word and name dictionaries.
///
/// Term banks are a bare array of rows; JMdict-style exports wrap entry
/// objects in `{"words": [...]}`. Elements stay as raw values so that one bad
/// element is skipped instead of failing the file. `Rows` is tried first: a
/// derived struct also accepts a sequence, which would swallow a one-row bank.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum BankFile {
    Rows(Vec<Value>),
    Entries { words: Vec<Value> },
}

pub(crate) fn read_bank(bytes: &[u8]) -> Result<BankFile, ParseError> {
    Ok(serde_json::from_slice(strip_bom(bytes))?)
}

pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// One row of a term bank:
/// `[expression, reading, definitionTags, rules, score, glossary, sequence, termTags]`.
#[derive(Debug)]
pub(crate) struct TermRow<'a> {
    pub expression: &'a str,
    pub reading: &'a str,
    pub definition_tags: &'a str,
    pub rules: &'a str,
    pub glossary: Vec<String>,
    pub sequence: u64,
    pub term_tags: &'a str,
}

impl<'a> TermRow<'a> {
    pub fn parse(value: &'a Value) -> Option<Self> {
        let fields = value.as_array()?;
        if fields.len() < 6 {
            return None;
        }
        let expression = fields[0].as_str().filter(|s| !s.is_empty())?;
        let reading = fields[1].as_str()?;
        let glossary = match &fields[5] {
            Value::Array(items) => items.iter().filter_map(gloss_text).collect(),
            Value::String(s) => vec![s.clone()],
            _ => return None,
        };
        Some(Self {
            expression,
            reading,
            definition_tags: opt_str(&fields[2]),
            rules: opt_str(&fields[3]),
            glossary,
            sequence: fields.get(6).map(parse_id).unwrap_or(0),
            term_tags: fields.get(7).map(opt_str).unwrap_or(""),
        })
    }

    /// Reading, or `None` when the row's reading is empty or repeats the
    /// expression.
    pub fn distinct_reading(&self) -> Option<&'a str> {
        Some(self.reading).filter(|r| !r.is_empty() && *r != self.expression)
    }
}

/// Entry identifier given as a JSON number or a numeric string.
pub(crate) fn parse_id(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Whitespace-separated tag list.
pub(crate) fn split_tags(raw: &str) -> impl Iterator<Item = &str> {
    raw.split_whitespace()
}

/// Append `item` unless an equal item is already present.
pub(crate) fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn opt_str(value: &Value) -> &str {
    value.as_str().unwrap_or("")
}

/// Flatten a glossary item to plain text.
///
/// Plain strings pass through; `{"type": "text", "text": ...}` and structured
/// content nodes are reduced to their text, images and other media dropped.
fn gloss_text(value: &Value) -> Option<String> {
    let mut out = String::new();
    collect_text(value, &mut out);
    let trimmed = out.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("image") {
                return;
            }
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
            if let Some(content) = map.get("content") {
                collect_text(content, out);
            }
        }
        _ => {}
    }
}
