//! Per-source keyed containers and the dual-key fan-out insert.
//!
//! A [`ContainerBuilder`] is owned by exactly one ingestion unit. Once every
//! file of the source has been inserted, [`ContainerBuilder::finish`] reclaims
//! spare capacity and yields a read-only [`Container`]. Because `finish`
//! consumes the builder, the reclamation pass runs once, after the last
//! insert.

use std::collections::HashMap;
use std::sync::Arc;

use lexicon_types::{FrequencyRecord, RankOrder, Record, Text};
use tracing::debug;

use crate::intern::Interner;
use crate::normalize::{normalize, normalized_key};

/// Container of shared records; fan-out stores the same `Arc` in each bucket.
pub type RecordContainer = Container<Arc<Record>>;

/// Mutable container used while a source is being ingested.
#[derive(Debug)]
pub struct ContainerBuilder<T> {
    buckets: HashMap<Text, Vec<T>>,
    entries: usize,
}

/// Frozen map from normalized key to an insertion-ordered bucket.
#[derive(Debug)]
pub struct Container<T> {
    buckets: HashMap<Text, Vec<T>>,
    entries: usize,
}

impl<T> Default for ContainerBuilder<T> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            entries: 0,
        }
    }
}

impl<T> ContainerBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the bucket for an already-normalized `key`.
    pub(crate) fn push(&mut self, key: Text, value: T) {
        self.buckets.entry(key).or_default().push(value);
        self.entries += 1;
    }

    /// Number of bucket slots written so far (a fanned-out value counts once
    /// per bucket).
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Reclaim over-allocated storage and freeze the container.
    pub fn finish(mut self) -> Container<T> {
        let before: usize = self.buckets.values().map(Vec::capacity).sum();
        for bucket in self.buckets.values_mut() {
            bucket.shrink_to_fit();
        }
        self.buckets.shrink_to_fit();
        debug!(
            keys = self.buckets.len(),
            entries = self.entries,
            reclaimed_slots = before.saturating_sub(self.entries),
            "container frozen"
        );
        Container {
            buckets: self.buckets,
            entries: self.entries,
        }
    }
}

impl ContainerBuilder<Arc<Record>> {
    /// Insert `record` under its spelling key and, when present and distinct,
    /// its reading key.
    ///
    /// Both keys are normalized first; if they coincide the record lands in
    /// one bucket exactly once.
    pub fn insert(
        &mut self,
        interner: &Interner,
        record: Arc<Record>,
        spelling: &str,
        reading: Option<&str>,
    ) {
        let spelling_key = normalized_key(interner, spelling);
        let reading_key = reading
            .filter(|r| !r.is_empty())
            .map(|r| normalized_key(interner, r));

        match reading_key {
            Some(reading_key) if reading_key != spelling_key => {
                self.push(spelling_key, Arc::clone(&record));
                self.push(reading_key, record);
            }
            _ => self.push(spelling_key, record),
        }
    }

    /// Insert `record` under every distinct normalized form of `surfaces`.
    ///
    /// Generalises [`insert`](Self::insert) to entries with several spellings
    /// and readings. Keys keep first-seen order and empty surfaces are ignored.
    pub fn insert_keys<'a, I>(&mut self, interner: &Interner, record: Arc<Record>, surfaces: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut keys: Vec<Text> = Vec::new();
        for surface in surfaces {
            if surface.is_empty() {
                continue;
            }
            let key = normalized_key(interner, surface);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        for key in keys {
            self.push(key, Arc::clone(&record));
        }
    }
}

impl ContainerBuilder<FrequencyRecord> {
    /// Frequency fan-out: the reading bucket receives `(spelling, rank)`, and
    /// the spelling bucket receives `(reading, rank)` when the spelling
    /// normalizes to a different key than the reading.
    pub fn insert_frequency(
        &mut self,
        interner: &Interner,
        reading: &str,
        spelling: &str,
        rank: i64,
    ) {
        let reading_key = normalized_key(interner, reading);
        let spelling_key = normalized_key(interner, spelling);

        self.push(
            Arc::clone(&reading_key),
            FrequencyRecord {
                token: interner.intern(spelling),
                rank,
            },
        );
        if spelling_key != reading_key {
            self.push(
                spelling_key,
                FrequencyRecord {
                    token: interner.intern(reading),
                    rank,
                },
            );
        }
    }
}

impl<T> Container<T> {
    /// An empty container, used for sources whose path does not exist.
    pub fn empty() -> Self {
        Self {
            buckets: HashMap::new(),
            entries: 0,
        }
    }

    /// Bucket for an already-normalized key, or an empty slice.
    pub fn get(&self, key: &str) -> &[T] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Normalize a caller-supplied surface form, then fetch its bucket.
    pub fn lookup(&self, surface: &str) -> &[T] {
        self.get(&normalize(surface))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.buckets.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total bucket slots across all keys.
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.buckets.keys().map(|k| &**k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> + '_ {
        self.buckets.iter().map(|(k, v)| (&**k, v.as_slice()))
    }
}

/// Frequency entries together with the list's rank polarity.
#[derive(Debug)]
pub struct FrequencyContainer {
    entries: Container<FrequencyRecord>,
    rank_order: RankOrder,
}

impl FrequencyContainer {
    pub fn new(entries: Container<FrequencyRecord>, rank_order: RankOrder) -> Self {
        Self {
            entries,
            rank_order,
        }
    }

    pub fn empty(rank_order: RankOrder) -> Self {
        Self::new(Container::empty(), rank_order)
    }

    pub fn rank_order(&self) -> RankOrder {
        self.rank_order
    }

    pub fn lookup(&self, surface: &str) -> &[FrequencyRecord] {
        self.entries.lookup(surface)
    }

    /// Most frequent record for `surface` under this list's polarity.
    pub fn best(&self, surface: &str) -> Option<&FrequencyRecord> {
        let order = self.rank_order;
        self.lookup(surface)
            .iter()
            .min_by(|a, b| order.compare(a.rank, b.rank))
    }

    pub fn container(&self) -> &Container<FrequencyRecord> {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexicon_types::PitchAccentEntry;

    fn pitch(spelling: &str, reading: Option<&str>) -> Arc<Record> {
        Arc::new(Record::PitchAccent(PitchAccentEntry {
            spelling: Arc::from(spelling),
            reading: reading.map(Arc::from),
            position: 1,
        }))
    }

    #[test]
    fn fans_out_to_spelling_and_reading() {
        let interner = Interner::new();
        let mut builder = ContainerBuilder::new();
        let record = pitch("猫", Some("ねこ"));
        builder.insert(&interner, Arc::clone(&record), "猫", Some("ねこ"));
        let container = builder.finish();

        assert_eq!(container.len(), 2);
        assert!(Arc::ptr_eq(&container.lookup("ねこ")[0], &record));
        assert!(Arc::ptr_eq(&container.lookup("猫")[0], &record));
        assert!(Arc::ptr_eq(&container.lookup("ネコ")[0], &record));
    }

    #[test]
    fn identical_normalized_keys_insert_once() {
        let interner = Interner::new();
        let mut builder = ContainerBuilder::new();
        builder.insert(&interner, pitch("ネコ", Some("ねこ")), "ネコ", Some("ねこ"));
        let container = builder.finish();

        assert_eq!(container.len(), 1);
        assert_eq!(container.get("ねこ").len(), 1);
        assert_eq!(container.entries(), 1);
        assert!(!container.contains_key("ネコ"));
    }

    #[test]
    fn empty_reading_is_ignored() {
        let interner = Interner::new();
        let mut builder = ContainerBuilder::new();
        builder.insert(&interner, pitch("猫", None), "猫", Some(""));
        let container = builder.finish();
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn buckets_keep_insertion_order() {
        let interner = Interner::new();
        let mut builder = ContainerBuilder::new();
        let first = pitch("箸", Some("はし"));
        let second = pitch("橋", Some("はし"));
        builder.insert(&interner, Arc::clone(&first), "箸", Some("はし"));
        builder.insert(&interner, Arc::clone(&second), "橋", Some("はし"));
        let container = builder.finish();

        let bucket = container.get("はし");
        assert_eq!(bucket.len(), 2);
        assert!(Arc::ptr_eq(&bucket[0], &first));
        assert!(Arc::ptr_eq(&bucket[1], &second));
    }

    #[test]
    fn insert_keys_dedups_per_record() {
        let interner = Interner::new();
        let mut builder = ContainerBuilder::new();
        let record = pitch("猫", None);
        builder.insert_keys(&interner, record, ["猫", "ネコ", "ねこ", "", "猫"]);
        let container = builder.finish();
        assert_eq!(container.len(), 2);
        assert_eq!(container.get("ねこ").len(), 1);
        assert_eq!(container.get("猫").len(), 1);
    }

    #[test]
    fn frequency_reverse_mapping() {
        let interner = Interner::new();
        let mut builder = ContainerBuilder::new();
        builder.insert_frequency(&interner, "ねこ", "猫", 5);
        builder.insert_frequency(&interner, "ねこ", "ネコ", 9);
        let container = FrequencyContainer::new(builder.finish(), RankOrder::default());

        let by_reading = container.lookup("ねこ");
        assert_eq!(by_reading.len(), 2);
        assert_eq!(&*by_reading[0].token, "猫");
        assert_eq!(by_reading[0].rank, 5);
        assert_eq!(&*by_reading[1].token, "ネコ");

        let by_spelling = container.lookup("猫");
        assert_eq!(by_spelling.len(), 1);
        assert_eq!(&*by_spelling[0].token, "ねこ");
        assert_eq!(by_spelling[0].rank, 5);
    }

    #[test]
    fn best_respects_rank_order() {
        let interner = Interner::new();
        let mut builder = ContainerBuilder::new();
        builder.insert_frequency(&interner, "はし", "橋", 40);
        builder.insert_frequency(&interner, "はし", "箸", 12);

        let lower = FrequencyContainer::new(builder.finish(), RankOrder::LowerIsFrequent);
        assert_eq!(lower.best("はし").map(|r| r.rank), Some(12));

        let mut builder = ContainerBuilder::new();
        builder.insert_frequency(&interner, "はし", "橋", 40);
        builder.insert_frequency(&interner, "はし", "箸", 12);
        let higher = FrequencyContainer::new(builder.finish(), RankOrder::HigherIsFrequent);
        assert_eq!(higher.best("はし").map(|r| r.rank), Some(40));
    }
}
