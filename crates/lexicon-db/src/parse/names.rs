//! Proper-name dictionaries and the spelling-keyed merge builder.
//!
//! A name entry lists kanji spellings, kana readings and translation groups.
//! It becomes one [`NameEntry`] per distinct normalized kanji spelling (or,
//! for kana-only entries, per distinct normalized reading). Within an entry
//! the first spelling to claim a key wins. Name records are indexed under
//! their own spelling key only; readings are carried on the record but are
//! not lookup keys.

use std::sync::Arc;

use lexicon_types::{NameEntry, Record, Text};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{BankFile, ParseStats, TermRow, parse_id, push_unique, read_bank, split_tags};
use crate::container::ContainerBuilder;
use crate::error::ParseError;
use crate::intern::Interner;
use crate::normalize::normalized_key;

/// Source-neutral view of one name entry, ready for merging.
#[derive(Debug, Default)]
pub struct NameSource<'a> {
    pub id: u64,
    pub kanji: Vec<&'a str>,
    pub kana: Vec<&'a str>,
    pub translations: Vec<&'a str>,
    pub name_types: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct JmnedictEntry {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    kanji: Vec<JmnedictText>,
    #[serde(default)]
    kana: Vec<JmnedictText>,
    #[serde(default)]
    translation: Vec<JmnedictTranslation>,
}

#[derive(Debug, Deserialize)]
struct JmnedictText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct JmnedictTranslation {
    #[serde(default, rename = "type")]
    name_types: Vec<String>,
    #[serde(default)]
    translation: Vec<JmnedictText>,
}

impl<'a> NameSource<'a> {
    fn from_jmnedict(entry: &'a JmnedictEntry) -> Self {
        let mut source = NameSource {
            id: parse_id(&entry.id),
            kanji: entry.kanji.iter().map(|k| k.text.as_str()).collect(),
            kana: entry.kana.iter().map(|k| k.text.as_str()).collect(),
            ..NameSource::default()
        };
        for group in &entry.translation {
            for name_type in &group.name_types {
                push_unique(&mut source.name_types, name_type.as_str());
            }
            source
                .translations
                .extend(group.translation.iter().map(|t| t.text.as_str()));
        }
        source
    }

    /// A term row is an entry with one spelling and one reading; the spelling
    /// only counts as kanji when it differs from the reading.
    fn from_row(row: &'a TermRow<'a>) -> Self {
        let (kanji, kana) = match row.distinct_reading() {
            Some(reading) => (vec![row.expression], vec![reading]),
            None => (Vec::new(), vec![row.expression]),
        };
        NameSource {
            id: row.sequence,
            kanji,
            kana,
            translations: row.glossary.iter().map(String::as_str).collect(),
            name_types: split_tags(row.definition_tags).collect(),
        }
    }
}

/// Build the merged records for one entry, in spelling order.
///
/// Returned pairs are `(own normalized key, record)`; every optional
/// collection has already been compacted.
pub fn merge_name_entry(interner: &Interner, source: &NameSource<'_>) -> Vec<(Text, NameEntry)> {
    let definitions: Vec<Text> = source
        .translations
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| Arc::from(*t))
        .collect();
    let name_types = interner.intern_all(source.name_types.iter().copied());

    let spellings: Vec<&str> = source
        .kanji
        .iter()
        .copied()
        .filter(|s| !s.is_empty())
        .collect();
    let kana: Vec<&str> = source.kana.iter().copied().filter(|s| !s.is_empty()).collect();
    let by_kanji = !spellings.is_empty();
    let candidates = if by_kanji { &spellings } else { &kana };

    let keys: Vec<Text> = candidates
        .iter()
        .map(|s| normalized_key(interner, s))
        .collect();
    let all_readings = interner.intern_all(kana.iter().copied());

    let mut seen: Vec<&Text> = Vec::new();
    let mut out = Vec::new();
    for (idx, spelling) in candidates.iter().enumerate() {
        let own_key = &keys[idx];
        if seen.contains(&own_key) {
            continue;
        }
        seen.push(own_key);

        let mut others = Vec::new();
        for key in &keys {
            if key != own_key {
                push_unique(&mut others, Arc::clone(key));
            }
        }

        let mut entry = NameEntry {
            id: source.id,
            spelling: interner.intern(spelling),
            readings: by_kanji.then(|| all_readings.clone()),
            alt_spellings: Some(others),
            definitions: definitions.clone(),
            name_types: Some(name_types.clone()),
        };
        entry.compact();
        out.push((Arc::clone(own_key), entry));
    }
    out
}

/// Parse one name-dictionary file (term rows or JMnedict-style entries).
pub fn ingest_names(
    bytes: &[u8],
    interner: &Interner,
    out: &mut ContainerBuilder<Arc<Record>>,
) -> Result<ParseStats, ParseError> {
    let mut stats = ParseStats::default();
    match read_bank(bytes)? {
        BankFile::Rows(rows) => {
            for (idx, value) in rows.iter().enumerate() {
                let Some(row) = TermRow::parse(value) else {
                    debug!("name row {idx} is malformed; skipped");
                    stats.skipped += 1;
                    continue;
                };
                insert_merged(interner, &NameSource::from_row(&row), out, &mut stats);
            }
        }
        BankFile::Entries { words } => {
            for (idx, value) in words.into_iter().enumerate() {
                let entry: JmnedictEntry = match serde_json::from_value(value) {
                    Ok(entry) => entry,
                    Err(err) => {
                        debug!("name entry {idx} is malformed: {err}");
                        stats.skipped += 1;
                        continue;
                    }
                };
                insert_merged(interner, &NameSource::from_jmnedict(&entry), out, &mut stats);
            }
        }
    }
    Ok(stats)
}

fn insert_merged(
    interner: &Interner,
    source: &NameSource<'_>,
    out: &mut ContainerBuilder<Arc<Record>>,
    stats: &mut ParseStats,
) {
    let merged = merge_name_entry(interner, source);
    if merged.is_empty() {
        stats.skipped += 1;
        return;
    }
    for (key, entry) in merged {
        out.push(key, Arc::new(Record::Name(entry)));
        stats.records += 1;
    }
}
