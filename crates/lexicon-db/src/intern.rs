//! Process-wide string pool shared by every ingestion unit.

use std::sync::Arc;

use dashmap::DashMap;
use lexicon_types::Text;

/// Thread-safe string interner.
///
/// Equal content always resolves to the same `Arc<str>`: the insert path goes
/// through the shard's entry lock, so two units racing on a new string both
/// receive whichever instance won. The pool only grows. Shard locks are held
/// for the duration of one hash lookup and never across I/O.
#[derive(Debug, Default)]
pub struct Interner {
    pool: DashMap<Text, ()>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pooled instance for `text`, adding it on first sight.
    pub fn intern(&self, text: &str) -> Text {
        if let Some(hit) = self.pool.get(text) {
            return Arc::clone(hit.key());
        }
        let entry = self.pool.entry(Arc::from(text)).or_insert(());
        Arc::clone(entry.key())
    }

    /// Intern every non-empty item, preserving order.
    pub fn intern_all<'a, I>(&self, items: I) -> Vec<Text>
    where
        I: IntoIterator<Item = &'a str>,
    {
        items
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(|s| self.intern(s))
            .collect()
    }

    /// Number of distinct strings pooled so far.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
