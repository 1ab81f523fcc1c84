//! Pitch-accent banks.
//!
//! Two row shapes are accepted. The structured shape is
//! `[spelling, "pitch", {"reading": ..., "pitches": [{"position": n}, ...]}]`;
//! the legacy shape is `[spelling, reading, ..., "annotation [n]"]`, where the
//! accent must be recovered from a single bracketed digit in the trailing
//! annotation. The only disambiguation is whether field 2 is an object.

use std::sync::Arc;

use lexicon_types::{PitchAccentEntry, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::{ParseStats, strip_bom};
use crate::container::ContainerBuilder;
use crate::error::ParseError;
use crate::intern::Interner;

/// Sentinel for "no valid accent data"; such rows are never indexed.
pub const NO_ACCENT: i64 = -1;

static BRACKETED_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d)\]").expect("static pitch annotation regex"));

/// The two row shapes, split before any field is interpreted.
#[derive(Debug)]
pub enum PitchRow<'a> {
    Structured {
        spelling: &'a str,
        data: &'a Map<String, Value>,
    },
    Legacy {
        spelling: &'a str,
        reading: &'a str,
        annotation: &'a str,
    },
}

/// A row resolved to spelling, reading and accent position.
#[derive(Debug, Eq, PartialEq)]
pub struct ResolvedPitch<'a> {
    pub spelling: &'a str,
    pub reading: Option<&'a str>,
    pub position: i64,
}

impl<'a> PitchRow<'a> {
    pub fn classify(value: &'a Value) -> Option<Self> {
        let fields = value.as_array()?;
        let spelling = fields.first()?.as_str().filter(|s| !s.is_empty())?;
        if let Some(data) = fields.get(2).and_then(Value::as_object) {
            return Some(PitchRow::Structured { spelling, data });
        }
        if fields.len() < 3 {
            return None;
        }
        let reading = fields[1].as_str()?;
        let annotation = fields.last()?.as_str()?;
        Some(PitchRow::Legacy {
            spelling,
            reading,
            annotation,
        })
    }

    pub fn resolve(&self) -> ResolvedPitch<'a> {
        let (spelling, reading, position) = match *self {
            PitchRow::Structured { spelling, data } => {
                let reading = data.get("reading").and_then(Value::as_str).unwrap_or("");
                let position = data
                    .get("pitches")
                    .and_then(Value::as_array)
                    .and_then(|p| p.first())
                    .and_then(|p| p.get("position"))
                    .and_then(Value::as_i64)
                    .unwrap_or(NO_ACCENT);
                (spelling, reading, position)
            }
            PitchRow::Legacy {
                spelling,
                reading,
                annotation,
            } => (spelling, reading, legacy_position(annotation)),
        };
        ResolvedPitch {
            spelling,
            reading: Some(reading).filter(|r| !r.is_empty() && *r != spelling),
            position,
        }
    }
}

/// Accent index from a legacy annotation such as `"はし [1]"`.
pub fn legacy_position(annotation: &str) -> i64 {
    BRACKETED_DIGIT
        .captures(annotation)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(NO_ACCENT)
}

/// Parse one pitch bank and fan every usable row out by spelling and reading.
pub fn ingest_pitch(
    bytes: &[u8],
    interner: &Interner,
    out: &mut ContainerBuilder<Arc<Record>>,
) -> Result<ParseStats, ParseError> {
    let rows: Value = serde_json::from_slice(strip_bom(bytes))?;
    let Value::Array(rows) = rows else {
        return Err(ParseError::Shape("pitch bank must be a JSON array".into()));
    };

    let mut stats = ParseStats::default();
    for (idx, value) in rows.iter().enumerate() {
        let Some(row) = PitchRow::classify(value) else {
            debug!("pitch row {idx} is malformed; skipped");
            stats.skipped += 1;
            continue;
        };
        let resolved = row.resolve();
        let Ok(position) = u32::try_from(resolved.position) else {
            stats.discarded += 1;
            continue;
        };
        let record = Arc::new(Record::PitchAccent(PitchAccentEntry {
            spelling: interner.intern(resolved.spelling),
            reading: resolved.reading.map(|r| interner.intern(r)),
            position,
        }));
        out.insert(interner, record, resolved.spelling, resolved.reading);
        stats.records += 1;
    }
    Ok(stats)
}
