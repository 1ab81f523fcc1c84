//! Shared record types for word, name, pitch-accent and frequency dictionaries.
//!
//! Every dictionary source is parsed into one closed set of records:
//! [`Record`] is a sum type with one case per record kind, and
//! [`FrequencyRecord`] is a separate lightweight `(token, rank)` pair. Text is
//! held as [`Text`] (`Arc<str>`) so that equal strings interned once can be
//! shared by every container that references them.
//!
//! Optional collections follow a sparse-storage convention: a list field is
//! `None` exactly when it has no elements. Builders produce records with
//! possibly-empty lists and call [`Record::compact`] (or the per-entry
//! `compact` methods) before the record is indexed, so callers can test
//! "has alternative spellings" with a single `is_some()`.
//!
//! ```rust
//! use std::sync::Arc;
//! use lexicon_types::{CustomWordEntry, Record, RecordKind};
//!
//! let mut entry = CustomWordEntry {
//!     spelling: Arc::from("猫"),
//!     alt_spellings: Some(Vec::new()),
//!     readings: Some(vec![Arc::from("ねこ")]),
//!     definitions: vec![Arc::from("cat")],
//!     word_classes: None,
//! };
//! entry.compact();
//! assert!(entry.alt_spellings.is_none());
//!
//! let record = Record::CustomWord(entry);
//! assert_eq!(record.kind(), RecordKind::CustomWord);
//! assert_eq!(record.spelling(), "猫");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Shared, immutable text. Interned instances are reused across sources.
pub type Text = Arc<str>;

/// Collapse an empty list to `None`, trimming spare capacity otherwise.
pub fn sparse<T>(list: Option<Vec<T>>) -> Option<Vec<T>> {
    match list {
        Some(v) if v.is_empty() => None,
        Some(mut v) => {
            v.shrink_to_fit();
            Some(v)
        }
        None => None,
    }
}

/// Discriminant of a [`Record`], handy for logging and filtering.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Word,
    Name,
    CustomWord,
    CustomName,
    PitchAccent,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Word => "word",
            RecordKind::Name => "name",
            RecordKind::CustomWord => "custom word",
            RecordKind::CustomName => "custom name",
            RecordKind::PitchAccent => "pitch accent",
        })
    }
}

/// One group of definitions (a JMdict sense or a term-bank glossary).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct Sense {
    pub glosses: Vec<Text>,
}

/// A reading that only applies to some of the entry's spellings.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct Restriction {
    pub reading: Text,
    pub spellings: Vec<Text>,
}

/// Built-in dictionary word.
#[derive(Clone, Debug, Serialize)]
pub struct WordEntry {
    pub id: u64,
    pub spelling: Text,
    pub alt_spellings: Option<Vec<Text>>,
    pub readings: Option<Vec<Text>>,
    pub restrictions: Option<Vec<Restriction>>,
    pub senses: Vec<Sense>,
    pub word_classes: Option<Vec<Text>>,
    pub dialects: Option<Vec<Text>>,
    pub tags: Option<Vec<Text>>,
}

impl WordEntry {
    /// Apply the sparse-storage convention to every optional list.
    pub fn compact(&mut self) {
        self.alt_spellings = sparse(self.alt_spellings.take());
        self.readings = sparse(self.readings.take());
        self.restrictions = sparse(self.restrictions.take());
        self.word_classes = sparse(self.word_classes.take());
        self.dialects = sparse(self.dialects.take());
        self.tags = sparse(self.tags.take());
        self.senses.shrink_to_fit();
    }
}

/// Built-in proper-name entry.
#[derive(Clone, Debug, Serialize)]
pub struct NameEntry {
    pub id: u64,
    pub spelling: Text,
    pub readings: Option<Vec<Text>>,
    pub alt_spellings: Option<Vec<Text>>,
    pub definitions: Vec<Text>,
    pub name_types: Option<Vec<Text>>,
}

impl NameEntry {
    pub fn compact(&mut self) {
        self.readings = sparse(self.readings.take());
        self.alt_spellings = sparse(self.alt_spellings.take());
        self.name_types = sparse(self.name_types.take());
        self.definitions.shrink_to_fit();
    }
}

/// User-authored word.
///
/// Compared and hashed over every field, list order included, so a reload can
/// recognise an entry that is already present without any identifier.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct CustomWordEntry {
    pub spelling: Text,
    pub alt_spellings: Option<Vec<Text>>,
    pub readings: Option<Vec<Text>>,
    pub definitions: Vec<Text>,
    pub word_classes: Option<Vec<Text>>,
}

impl CustomWordEntry {
    pub fn compact(&mut self) {
        self.alt_spellings = sparse(self.alt_spellings.take());
        self.readings = sparse(self.readings.take());
        self.word_classes = sparse(self.word_classes.take());
    }
}

/// User-authored name. Same equality rules as [`CustomWordEntry`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct CustomNameEntry {
    pub spelling: Text,
    pub reading: Option<Text>,
    pub name_types: Option<Vec<Text>>,
}

impl CustomNameEntry {
    pub fn compact(&mut self) {
        self.name_types = sparse(self.name_types.take());
    }
}

/// Pitch-accent data for one spelling/reading pair.
///
/// `reading` is `None` when it would repeat the spelling. `position` is the
/// 0-based mora index of the pitch drop; entries without valid accent data
/// are never constructed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PitchAccentEntry {
    pub spelling: Text,
    pub reading: Option<Text>,
    pub position: u32,
}

/// Indexable lexical record.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Word(WordEntry),
    Name(NameEntry),
    CustomWord(CustomWordEntry),
    CustomName(CustomNameEntry),
    PitchAccent(PitchAccentEntry),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Word(_) => RecordKind::Word,
            Record::Name(_) => RecordKind::Name,
            Record::CustomWord(_) => RecordKind::CustomWord,
            Record::CustomName(_) => RecordKind::CustomName,
            Record::PitchAccent(_) => RecordKind::PitchAccent,
        }
    }

    /// Primary written form.
    pub fn spelling(&self) -> &str {
        match self {
            Record::Word(w) => &w.spelling,
            Record::Name(n) => &n.spelling,
            Record::CustomWord(w) => &w.spelling,
            Record::CustomName(n) => &n.spelling,
            Record::PitchAccent(p) => &p.spelling,
        }
    }

    /// Apply the sparse-storage convention for whichever variant this is.
    pub fn compact(&mut self) {
        match self {
            Record::Word(w) => w.compact(),
            Record::Name(n) => n.compact(),
            Record::CustomWord(w) => w.compact(),
            Record::CustomName(n) => n.compact(),
            Record::PitchAccent(_) => {}
        }
    }
}

/// Which end of a frequency list holds the most frequent tokens.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    /// Rank 1 is the most frequent token.
    #[default]
    LowerIsFrequent,
    /// Larger values (e.g. raw occurrence counts) mean more frequent.
    HigherIsFrequent,
}

impl RankOrder {
    /// Order two ranks so that the more frequent one sorts first.
    pub fn compare(self, a: i64, b: i64) -> Ordering {
        match self {
            RankOrder::LowerIsFrequent => a.cmp(&b),
            RankOrder::HigherIsFrequent => b.cmp(&a),
        }
    }

    pub fn more_frequent(self, a: i64, b: i64) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

/// Frequency information: the counterpart token and its rank.
///
/// Stored under a reading key, `token` is the written form; stored under a
/// written-form key, `token` is the reading.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct FrequencyRecord {
    pub token: Text,
    pub rank: i64,
}
