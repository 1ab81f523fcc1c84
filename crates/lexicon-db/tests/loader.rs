use std::path::PathBuf;
use std::sync::Arc;

use lexicon_db::{
    Engine, Interner, LoadError, LoadMode, LoadOutcome, SourceDescriptor, SourceKind,
};
use lexicon_types::{RankOrder, Record};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn engine(mode: LoadMode) -> Arc<Engine> {
    Arc::new(Engine::new(Arc::new(Interner::new()), mode))
}

fn fixture_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new("jmdict", SourceKind::Words, fixture("jmdict")).with_priority(10),
        SourceDescriptor::new("jmnedict", SourceKind::Names, fixture("jmnedict.json")),
        SourceDescriptor::new("freq", SourceKind::Frequency, fixture("freq.json")),
        SourceDescriptor::new("pitch", SourceKind::Pitch, fixture("pitch")),
        SourceDescriptor::new("mine", SourceKind::CustomWords, fixture("custom_words.txt"))
            .with_priority(20),
    ]
}

#[tokio::test]
async fn loads_every_fixture_source() {
    let engine = engine(LoadMode::Mmap);
    let reports = engine.load_all(fixture_sources()).await;

    let summary: Vec<(&str, &str)> = reports
        .iter()
        .map(|r| (r.source.as_str(), r.outcome.label()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("jmdict", "loaded"),
            ("jmnedict", "loaded"),
            ("freq", "loaded"),
            ("pitch", "loaded"),
            ("mine", "loaded"),
        ]
    );
    assert!(matches!(
        reports[0].outcome,
        LoadOutcome::Loaded { records: 4, keys: 6 }
    ));
    assert_eq!(reports[0].files, 2);
    assert_eq!(reports[3].discarded, 1);

    // Katakana input reaches both the kanji and katakana words.
    let cats = engine.lookup("jmdict", "ネコ");
    let spellings: Vec<&str> = cats.iter().map(|r| r.spelling()).collect();
    assert_eq!(spellings, vec!["猫", "ネコ"]);

    let Record::Word(eat) = &*engine.lookup("jmdict", "たべる")[0] else {
        panic!("expected a word record");
    };
    assert_eq!(eat.senses[0].glosses[0].as_ref(), "to eat");

    let pitch = engine.lookup("pitch", "はし");
    assert_eq!(pitch.len(), 2);
    assert!(engine.lookup("pitch", "端").is_empty());

    assert_eq!(engine.lookup("mine", "ねこ").len(), 1);
    assert_eq!(engine.lookup("mine", "推し").len(), 1);
}

#[tokio::test]
async fn names_are_keyed_by_spelling_only() {
    let engine = engine(LoadMode::Owned);
    engine
        .load_all([SourceDescriptor::new(
            "jmnedict",
            SourceKind::Names,
            fixture("jmnedict.json"),
        )])
        .await;

    let tokyo = engine.lookup("jmnedict", "東京");
    assert_eq!(tokyo.len(), 1);
    let Record::Name(entry) = &*tokyo[0] else {
        panic!("expected a name record");
    };
    assert_eq!(entry.readings.as_deref().map(<[_]>::len), Some(1));
    assert_eq!(entry.definitions[0].as_ref(), "Tokyo");
    assert!(engine.lookup("jmnedict", "とうきょう").is_empty());

    let sakura = engine.lookup("jmnedict", "サクラ");
    assert_eq!(sakura.len(), 1);
    assert_eq!(sakura[0].spelling(), "さくら");
}

#[tokio::test]
async fn frequency_lookups_resolve_both_directions() {
    let engine = engine(LoadMode::Mmap);
    engine
        .load_all([
            SourceDescriptor::new("freq", SourceKind::Frequency, fixture("freq.json"))
                .with_rank_order(RankOrder::LowerIsFrequent),
        ])
        .await;

    let cat = engine.lookup_frequency("freq", "猫");
    assert_eq!(cat.len(), 1);
    assert_eq!((cat[0].token.as_ref(), cat[0].rank), ("ねこ", 3));

    let dog = engine.lookup_frequency("freq", "イヌ");
    assert_eq!((dog[0].token.as_ref(), dog[0].rank), ("犬", 7));

    assert!(engine.lookup("freq", "猫").is_empty());
    let container = engine.frequencies("freq").expect("frequency container");
    assert_eq!(container.rank_order(), RankOrder::LowerIsFrequent);
    assert_eq!(container.container().len(), 4);
}

#[tokio::test]
async fn one_corrupt_source_does_not_affect_the_rest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corrupt = dir.path().join("broken.json");
    std::fs::write(&corrupt, r#"{"ねこ": [["猫", 3]"#).expect("write corrupt file");

    let engine = engine(LoadMode::Mmap);
    let reports = engine
        .load_all([
            SourceDescriptor::new("jmdict", SourceKind::Words, fixture("jmdict")),
            SourceDescriptor::new("broken", SourceKind::Frequency, &corrupt),
            SourceDescriptor::new("pitch", SourceKind::Pitch, fixture("pitch")),
        ])
        .await;

    let failures: Vec<_> = reports.iter().filter(|r| r.outcome.is_failure()).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].source, "broken");
    let LoadOutcome::Failed { error, .. } = &failures[0].outcome else {
        unreachable!();
    };
    assert!(matches!(**error, LoadError::Parse { .. }));

    assert_eq!(engine.records("jmdict").expect("jmdict").len(), 6);
    assert_eq!(engine.lookup("pitch", "箸").len(), 1);
    assert!(engine.frequencies("broken").expect("empty container").container().is_empty());
}

#[tokio::test]
async fn missing_and_inactive_sources() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine(LoadMode::Owned);
    let reports = engine
        .load_all([
            SourceDescriptor::new("gone", SourceKind::Words, dir.path().join("missing")),
            SourceDescriptor::new("off", SourceKind::Pitch, fixture("pitch")).inactive(),
        ])
        .await;

    assert!(matches!(reports[0].outcome, LoadOutcome::NotFound));
    assert!(matches!(reports[1].outcome, LoadOutcome::Inactive));
    assert!(engine.records("gone").expect("empty container").is_empty());
    assert!(engine.records("off").is_none());
    assert_eq!(engine.reports().len(), 2);
}

#[tokio::test]
async fn lookup_all_prefers_higher_priority_sources() {
    let engine = engine(LoadMode::Mmap);
    engine.load_all(fixture_sources()).await;

    let hits = engine.lookup_all("ねこ");
    let order: Vec<(&str, usize)> = hits
        .iter()
        .map(|h| (h.source.as_str(), h.records.len()))
        .collect();
    assert_eq!(order, vec![("mine", 1), ("jmdict", 2)]);
}

#[tokio::test]
async fn reload_replaces_the_container() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("mine.txt");
    std::fs::write(&path, "猫\t\tねこ\tcat\tn\n").expect("write");

    let engine = engine(LoadMode::Owned);
    engine
        .load_all([SourceDescriptor::new("mine", SourceKind::CustomWords, &path)])
        .await;
    assert_eq!(engine.lookup("mine", "猫").len(), 1);

    std::fs::write(&path, "犬\t\tいぬ\tdog\tn\n").expect("rewrite");
    let report = engine.reload_source("mine").await.expect("registered source");
    assert!(matches!(report.outcome, LoadOutcome::Loaded { records: 1, .. }));
    assert!(engine.lookup("mine", "猫").is_empty());
    assert_eq!(engine.lookup("mine", "いぬ").len(), 1);

    assert!(engine.reload_source("unknown").await.is_none());
}

#[tokio::test]
async fn concurrent_reloads_install_the_newest_request() {
    let engine = engine(LoadMode::Owned);
    let words = SourceDescriptor::new("jmdict", SourceKind::Words, fixture("jmdict"));
    let pitch_as_words = SourceDescriptor::new("jmdict", SourceKind::Pitch, fixture("pitch"));

    // Requests are ticketed when the futures are first polled, in join order.
    let (_, second) = tokio::join!(engine.reload(words), engine.reload(pitch_as_words));
    assert!(!matches!(second.outcome, LoadOutcome::Superseded));
    assert_eq!(engine.descriptor("jmdict").expect("slot").kind, SourceKind::Pitch);
    assert_eq!(engine.lookup("jmdict", "箸").len(), 1);
}
