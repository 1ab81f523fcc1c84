//! Frequency lists: `{reading: [[spelling, rank], ...], ...}`.

use lexicon_types::FrequencyRecord;
use serde_json::Value;
use tracing::debug;

use super::{ParseStats, strip_bom};
use crate::container::ContainerBuilder;
use crate::error::ParseError;
use crate::intern::Interner;

/// Best-effort rank: integers, truncated floats and numeric strings are
/// accepted, everything else is 0.
pub fn parse_rank(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Parse one frequency file, preserving member and pair order.
pub fn ingest_frequency(
    bytes: &[u8],
    interner: &Interner,
    out: &mut ContainerBuilder<FrequencyRecord>,
) -> Result<ParseStats, ParseError> {
    let root: Value = serde_json::from_slice(strip_bom(bytes))?;
    let Value::Object(readings) = root else {
        return Err(ParseError::Shape(
            "frequency list must be a JSON object keyed by reading".into(),
        ));
    };

    let mut stats = ParseStats::default();
    for (reading, pairs) in &readings {
        if reading.is_empty() {
            stats.skipped += 1;
            continue;
        }
        let Some(pairs) = pairs.as_array() else {
            debug!("frequency entry for {reading:?} is not a list; skipped");
            stats.skipped += 1;
            continue;
        };
        for pair in pairs {
            match pair.as_array().map(Vec::as_slice) {
                Some([spelling, rank]) => match spelling.as_str().filter(|s| !s.is_empty()) {
                    Some(spelling) => {
                        out.insert_frequency(interner, reading, spelling, parse_rank(rank));
                        stats.records += 1;
                    }
                    None => stats.skipped += 1,
                },
                _ => {
                    debug!("frequency pair under {reading:?} is malformed; skipped");
                    stats.skipped += 1;
                }
            }
        }
    }
    Ok(stats)
}
