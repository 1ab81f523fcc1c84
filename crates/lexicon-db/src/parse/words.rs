//! Word dictionaries: term-bank rows or JMdict-style entry objects.

use std::sync::Arc;

use lexicon_types::{Record, Restriction, Sense, WordEntry};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{BankFile, ParseStats, TermRow, parse_id, push_unique, read_bank, split_tags};
use crate::container::ContainerBuilder;
use crate::error::ParseError;
use crate::intern::Interner;

/// JMdict dialect codes; any other definition tag is kept as a plain tag.
const DIALECT_TAGS: &[&str] = &[
    "hob", "ksb", "ktb", "kyb", "kyu", "nab", "osb", "rkb", "thb", "tsb", "tsug",
];

/// `appliesToKanji` value meaning "every spelling".
const ALL_SPELLINGS: &str = "*";

#[derive(Debug, Deserialize)]
struct JmdictWord {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    kanji: Vec<JmdictKanji>,
    #[serde(default)]
    kana: Vec<JmdictKana>,
    #[serde(default)]
    sense: Vec<JmdictSense>,
}

#[derive(Debug, Deserialize)]
struct JmdictKanji {
    text: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JmdictKana {
    text: String,
    #[serde(default)]
    applies_to_kanji: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JmdictSense {
    #[serde(default)]
    part_of_speech: Vec<String>,
    #[serde(default)]
    dialect: Vec<String>,
    #[serde(default)]
    misc: Vec<String>,
    #[serde(default)]
    gloss: Vec<JmdictGloss>,
}

#[derive(Debug, Deserialize)]
struct JmdictGloss {
    text: String,
}

/// Parse one word-dictionary file and fan every entry out into `out`.
pub fn ingest_words(
    bytes: &[u8],
    interner: &Interner,
    out: &mut ContainerBuilder<Arc<Record>>,
) -> Result<ParseStats, ParseError> {
    let mut stats = ParseStats::default();
    match read_bank(bytes)? {
        BankFile::Rows(rows) => {
            for (idx, row) in rows.iter().enumerate() {
                let Some(row) = TermRow::parse(row) else {
                    debug!("word row {idx} is malformed; skipped");
                    stats.skipped += 1;
                    continue;
                };
                let reading = row.distinct_reading();
                let record = Arc::new(Record::Word(word_from_row(interner, &row)));
                out.insert(interner, record, row.expression, reading);
                stats.records += 1;
            }
        }
        BankFile::Entries { words } => {
            for (idx, value) in words.into_iter().enumerate() {
                let word: JmdictWord = match serde_json::from_value(value) {
                    Ok(word) => word,
                    Err(err) => {
                        debug!("word entry {idx} is malformed: {err}");
                        stats.skipped += 1;
                        continue;
                    }
                };
                let Some(entry) = word_from_jmdict(interner, &word) else {
                    debug!("word entry {idx} has neither kanji nor kana; skipped");
                    stats.skipped += 1;
                    continue;
                };
                let record = Arc::new(Record::Word(entry));
                if let Record::Word(entry) = &*record {
                    out.insert_keys(interner, Arc::clone(&record), word_keys(entry));
                }
                stats.records += 1;
            }
        }
    }
    Ok(stats)
}

/// Spelling, alternative spellings, then readings.
fn word_keys(entry: &WordEntry) -> impl Iterator<Item = &str> {
    std::iter::once(&*entry.spelling)
        .chain(entry.alt_spellings.iter().flatten().map(|s| &**s))
        .chain(entry.readings.iter().flatten().map(|s| &**s))
}

fn word_from_row(interner: &Interner, row: &TermRow<'_>) -> WordEntry {
    let mut dialects = Vec::new();
    let mut tags = Vec::new();
    for tag in split_tags(row.definition_tags).chain(split_tags(row.term_tags)) {
        if DIALECT_TAGS.contains(&tag) {
            push_unique(&mut dialects, interner.intern(tag));
        } else {
            push_unique(&mut tags, interner.intern(tag));
        }
    }

    let mut entry = WordEntry {
        id: row.sequence,
        spelling: interner.intern(row.expression),
        alt_spellings: None,
        readings: row.distinct_reading().map(|r| vec![interner.intern(r)]),
        restrictions: None,
        senses: vec![Sense {
            glosses: row.glossary.iter().map(|g| Arc::from(g.as_str())).collect(),
        }],
        word_classes: Some(interner.intern_all(split_tags(row.rules))),
        dialects: Some(dialects),
        tags: Some(tags),
    };
    entry.compact();
    entry
}

fn word_from_jmdict(interner: &Interner, word: &JmdictWord) -> Option<WordEntry> {
    let spelling = word
        .kanji
        .first()
        .map(|k| k.text.as_str())
        .or_else(|| word.kana.first().map(|k| k.text.as_str()))
        .filter(|s| !s.is_empty())?;

    let alt_spellings = interner.intern_all(word.kanji.iter().skip(1).map(|k| k.text.as_str()));

    let mut readings = Vec::new();
    let mut restrictions = Vec::new();
    for kana in &word.kana {
        if kana.text.is_empty() || kana.text == spelling {
            continue;
        }
        let reading = interner.intern(&kana.text);
        let restricted = !kana.applies_to_kanji.is_empty()
            && !kana.applies_to_kanji.iter().any(|k| k == ALL_SPELLINGS);
        if restricted {
            restrictions.push(Restriction {
                reading: Arc::clone(&reading),
                spellings: interner.intern_all(kana.applies_to_kanji.iter().map(String::as_str)),
            });
        }
        push_unique(&mut readings, reading);
    }

    let mut word_classes = Vec::new();
    let mut dialects = Vec::new();
    let mut tags = Vec::new();
    for kanji in &word.kanji {
        for tag in &kanji.tags {
            push_unique(&mut tags, interner.intern(tag));
        }
    }
    let senses = word
        .sense
        .iter()
        .map(|sense| {
            for pos in &sense.part_of_speech {
                push_unique(&mut word_classes, interner.intern(pos));
            }
            for dialect in &sense.dialect {
                push_unique(&mut dialects, interner.intern(dialect));
            }
            for misc in &sense.misc {
                push_unique(&mut tags, interner.intern(misc));
            }
            Sense {
                glosses: sense
                    .gloss
                    .iter()
                    .filter(|g| !g.text.is_empty())
                    .map(|g| Arc::from(g.text.as_str()))
                    .collect(),
            }
        })
        .collect();

    let mut entry = WordEntry {
        id: parse_id(&word.id),
        spelling: interner.intern(spelling),
        alt_spellings: Some(alt_spellings),
        readings: Some(readings),
        restrictions: Some(restrictions),
        senses,
        word_classes: Some(word_classes),
        dialects: Some(dialects),
        tags: Some(tags),
    };
    entry.compact();
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RecordContainer;

    fn load(json: &str) -> (RecordContainer, ParseStats) {
        let interner = Interner::new();
        let mut builder = ContainerBuilder::new();
        let stats = ingest_words(json.as_bytes(), &interner, &mut builder).expect("parse");
        (builder.finish(), stats)
    }

    fn word(record: &Record) -> &WordEntry {
        match record {
            Record::Word(w) => w,
            other => panic!("expected word, got {:?}", other.kind()),
        }
    }

    #[test]
    fn term_rows_fan_out_by_spelling_and_reading() {
        let (container, stats) = load(
            r#"[
                ["猫", "ねこ", "ksb", "n", 5, ["cat"], 1467640, "P"],
                ["ネコ", "ねこ", "", "", 1, ["cat (katakana)"], 1467641, ""]
            ]"#,
        );
        assert_eq!(stats.records, 2);
        assert_eq!(container.lookup("ねこ").len(), 2);
        assert_eq!(container.lookup("猫").len(), 1);

        let cat = word(&container.lookup("猫")[0]);
        assert_eq!(cat.id, 1467640);
        assert_eq!(cat.readings.as_ref().unwrap()[0].as_ref(), "ねこ");
        assert_eq!(cat.dialects.as_ref().unwrap()[0].as_ref(), "ksb");
        assert_eq!(cat.tags.as_ref().unwrap()[0].as_ref(), "P");
        assert_eq!(cat.word_classes.as_ref().unwrap()[0].as_ref(), "n");
        assert!(cat.alt_spellings.is_none());

        // ネコ and ねこ normalize identically: one bucket, no reading stored twice.
        let katakana = word(&container.lookup("ねこ")[1]);
        assert_eq!(katakana.spelling.as_ref(), "ネコ");
        assert!(katakana.word_classes.is_none());
        assert!(katakana.dialects.is_none());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let (container, stats) = load(r#"[["猫"], 7, ["犬", "いぬ", "", "", 0, ["dog"]]]"#);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.records, 1);
        assert_eq!(container.lookup("いぬ").len(), 1);
    }

    #[test]
    fn jmdict_entries_carry_alternatives_and_restrictions() {
        let (container, stats) = load(
            r#"{"words": [
                {
                    "id": "1000220",
                    "kanji": [{"text": "明白", "tags": []}, {"text": "偸白", "tags": ["rK"]}],
                    "kana": [
                        {"text": "めいはく", "appliesToKanji": ["*"]},
                        {"text": "ちゅうはく", "appliesToKanji": ["偸白"]}
                    ],
                    "sense": [
                        {"partOfSpeech": ["adj-na"], "dialect": [], "misc": [], "gloss": [{"text": "obvious"}, {"text": "clear"}]},
                        {"partOfSpeech": ["adj-na", "n"], "dialect": ["ksb"], "misc": ["uk"], "gloss": [{"text": "plain"}]}
                    ]
                },
                {"id": 5, "kanji": [], "kana": []}
            ]}"#,
        );
        assert_eq!(stats.records, 1);
        assert_eq!(stats.skipped, 1);

        for key in ["明白", "偸白", "めいはく", "ちゅうはく"] {
            assert_eq!(container.lookup(key).len(), 1, "missing key {key}");
        }
        let entry = word(&container.lookup("明白")[0]);
        assert_eq!(entry.id, 1000220);
        assert_eq!(entry.alt_spellings.as_ref().unwrap().len(), 1);
        assert_eq!(entry.readings.as_ref().unwrap().len(), 2);
        let restrictions = entry.restrictions.as_ref().unwrap();
        assert_eq!(restrictions.len(), 1);
        assert_eq!(restrictions[0].reading.as_ref(), "ちゅうはく");
        assert_eq!(entry.senses.len(), 2);
        assert_eq!(entry.senses[0].glosses.len(), 2);
        let classes: Vec<&str> = entry.word_classes.iter().flatten().map(|c| &**c).collect();
        assert_eq!(classes, vec!["adj-na", "n"]);
        let tags: Vec<&str> = entry.tags.iter().flatten().map(|c| &**c).collect();
        assert_eq!(tags, vec!["rK", "uk"]);
    }

    #[test]
    fn kana_only_entry_uses_first_kana_as_spelling() {
        let (container, _) = load(
            r#"{"words": [{"id": "9", "kana": [{"text": "ありがとう"}], "sense": []}]}"#,
        );
        let entry = word(&container.lookup("アリガトウ")[0]);
        assert_eq!(entry.spelling.as_ref(), "ありがとう");
        assert!(entry.readings.is_none());
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn non_bank_shape_is_fatal() {
        let interner = Interner::new();
        let mut builder = ContainerBuilder::new();
        assert!(ingest_words(br#"{"terms": []}"#, &interner, &mut builder).is_err());
        assert!(ingest_words(b"[[\"a\", ", &interner, &mut builder).is_err());
    }
}
