//! User-authored dictionaries in line-oriented text.
//!
//! Words: `spelling ⇥ alt-spellings ⇥ readings ⇥ definitions ⇥ word-classes`
//! Names: `spelling ⇥ reading ⇥ name-types`
//!
//! List fields separate items with `;`, an empty field means "none". Blank
//! lines and lines starting with `#` are ignored. A malformed line is
//! skipped on its own; entries structurally equal to one already loaded from
//! the same file set are dropped.

use std::collections::HashSet;
use std::sync::Arc;

use lexicon_types::{CustomNameEntry, CustomWordEntry, Record, Text};
use tracing::debug;

use super::{ParseStats, strip_bom};
use crate::container::ContainerBuilder;
use crate::error::ParseError;
use crate::intern::Interner;

pub const FIELD_DELIMITER: char = '\t';
pub const LIST_DELIMITER: char = ';';
const COMMENT_PREFIX: char = '#';

/// Entries seen so far by one ingestion unit, for structural dedup.
#[derive(Debug, Default)]
pub struct CustomSeen {
    words: HashSet<CustomWordEntry>,
    names: HashSet<CustomNameEntry>,
}

impl CustomSeen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_word(&self, entry: &CustomWordEntry) -> bool {
        self.words.contains(entry)
    }

    pub fn contains_name(&self, entry: &CustomNameEntry) -> bool {
        self.names.contains(entry)
    }
}

fn content_lines(bytes: &[u8]) -> Result<impl Iterator<Item = (usize, &str)>, ParseError> {
    let text = std::str::from_utf8(strip_bom(bytes))?;
    Ok(text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with(COMMENT_PREFIX)))
}

fn list_field(interner: &Interner, raw: &str) -> Option<Vec<Text>> {
    let items = interner.intern_all(raw.split(LIST_DELIMITER).map(str::trim));
    Some(items)
}

/// Parse one custom word line.
pub fn parse_word_line(interner: &Interner, line: &str) -> Option<CustomWordEntry> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if !(4..=5).contains(&fields.len()) {
        return None;
    }
    let spelling = fields[0].trim();
    let definitions: Vec<Text> = fields[3]
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(Arc::from)
        .collect();
    if spelling.is_empty() || definitions.is_empty() {
        return None;
    }
    let mut entry = CustomWordEntry {
        spelling: interner.intern(spelling),
        alt_spellings: list_field(interner, fields[1]),
        readings: list_field(interner, fields[2]),
        definitions,
        word_classes: fields.get(4).and_then(|raw| list_field(interner, raw)),
    };
    entry.compact();
    Some(entry)
}

/// Parse one custom name line.
pub fn parse_name_line(interner: &Interner, line: &str) -> Option<CustomNameEntry> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if !(2..=3).contains(&fields.len()) {
        return None;
    }
    let spelling = fields[0].trim();
    if spelling.is_empty() {
        return None;
    }
    let reading = fields[1].trim();
    let mut entry = CustomNameEntry {
        spelling: interner.intern(spelling),
        reading: Some(reading)
            .filter(|r| !r.is_empty() && *r != spelling)
            .map(|r| interner.intern(r)),
        name_types: fields.get(2).and_then(|raw| list_field(interner, raw)),
    };
    entry.compact();
    Some(entry)
}

/// Ingest a custom word file; words fan out by spelling, alternatives and
/// readings.
pub fn ingest_custom_words(
    bytes: &[u8],
    interner: &Interner,
    seen: &mut CustomSeen,
    out: &mut ContainerBuilder<Arc<Record>>,
) -> Result<ParseStats, ParseError> {
    let mut stats = ParseStats::default();
    for (lineno, line) in content_lines(bytes)? {
        let Some(entry) = parse_word_line(interner, line) else {
            debug!("custom word line {lineno} is malformed; skipped");
            stats.skipped += 1;
            continue;
        };
        if !seen.words.insert(entry.clone()) {
            stats.discarded += 1;
            continue;
        }
        let keys: Vec<Text> = std::iter::once(Arc::clone(&entry.spelling))
            .chain(entry.alt_spellings.iter().flatten().cloned())
            .chain(entry.readings.iter().flatten().cloned())
            .collect();
        let record = Arc::new(Record::CustomWord(entry));
        out.insert_keys(interner, record, keys.iter().map(|k| &**k));
        stats.records += 1;
    }
    Ok(stats)
}

/// Ingest a custom name file; names fan out by spelling and reading.
pub fn ingest_custom_names(
    bytes: &[u8],
    interner: &Interner,
    seen: &mut CustomSeen,
    out: &mut ContainerBuilder<Arc<Record>>,
) -> Result<ParseStats, ParseError> {
    let mut stats = ParseStats::default();
    for (lineno, line) in content_lines(bytes)? {
        let Some(entry) = parse_name_line(interner, line) else {
            debug!("custom name line {lineno} is malformed; skipped");
            stats.skipped += 1;
            continue;
        };
        if !seen.names.insert(entry.clone()) {
            stats.discarded += 1;
            continue;
        }
        let spelling = Arc::clone(&entry.spelling);
        let reading = entry.reading.clone();
        let record = Arc::new(Record::CustomName(entry));
        out.insert(interner, record, &spelling, reading.as_deref());
        stats.records += 1;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_lines_split_into_fields() {
        let interner = Interner::new();
        let entry = parse_word_line(&interner, "猫\tネコ;貓\tねこ\tcat; feline\tn").unwrap();
        assert_eq!(&*entry.spelling, "猫");
        assert_eq!(entry.alt_spellings.as_ref().map(Vec::len), Some(2));
        assert_eq!(entry.definitions.len(), 2);
        assert_eq!(&*entry.definitions[1], "feline");
        assert_eq!(entry.word_classes.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn empty_list_fields_are_absent() {
        let interner = Interner::new();
        let entry = parse_word_line(&interner, "猫\t\t\tcat").unwrap();
        assert!(entry.alt_spellings.is_none());
        assert!(entry.readings.is_none());
        assert!(entry.word_classes.is_none());
    }

    #[test]
    fn malformed_word_lines_are_rejected() {
        let interner = Interner::new();
        assert!(parse_word_line(&interner, "猫 ねこ cat").is_none());
        assert!(parse_word_line(&interner, "\t\t\tcat").is_none());
        assert!(parse_word_line(&interner, "猫\t\tねこ\t").is_none());
        assert!(parse_word_line(&interner, "a\tb\tc\td\te\tf").is_none());
    }

    #[test]
    fn name_reading_equal_to_spelling_is_absent() {
        let interner = Interner::new();
        let entry = parse_name_line(&interner, "さくら\tさくら\tgiven").unwrap();
        assert!(entry.reading.is_none());
        let entry = parse_name_line(&interner, "桜\tさくら").unwrap();
        assert_eq!(entry.reading.as_deref(), Some("さくら"));
        assert!(entry.name_types.is_none());
    }

    #[test]
    fn duplicate_lines_are_loaded_once() {
        let interner = Interner::new();
        let mut seen = CustomSeen::new();
        let mut builder = ContainerBuilder::new();
        let text = "# my words\n猫\t\tねこ\tcat\tn\n\n猫\t\tねこ\tcat\tn\r\n猫\t\tねこ\tcat;kitty\tn\nbroken line\n";
        let stats = ingest_custom_words(text.as_bytes(), &interner, &mut seen, &mut builder).unwrap();
        let container = builder.finish();

        assert_eq!(stats.records, 2);
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(container.lookup("ねこ").len(), 2);
        assert_eq!(container.lookup("猫").len(), 2);

        let probe = parse_word_line(&interner, "猫\t\tねこ\tcat\tn").unwrap();
        assert!(seen.contains_word(&probe));
    }

    #[test]
    fn custom_names_fan_out_by_reading() {
        let interner = Interner::new();
        let mut seen = CustomSeen::new();
        let mut builder = ContainerBuilder::new();
        let text = "桜\tさくら\tgiven;fem\nサクラ\t\t\n";
        let stats = ingest_custom_names(text.as_bytes(), &interner, &mut seen, &mut builder).unwrap();
        let container = builder.finish();
        assert_eq!(stats.records, 2);
        assert_eq!(container.lookup("桜").len(), 1);
        assert_eq!(container.lookup("さくら").len(), 2);
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        let interner = Interner::new();
        let mut seen = CustomSeen::new();
        let mut builder = ContainerBuilder::new();
        let err = ingest_custom_words(&[0xff, 0xfe, 0x00], &interner, &mut seen, &mut builder)
            .unwrap_err();
        assert!(matches!(err, ParseError::Utf8(_)));
    }
}
