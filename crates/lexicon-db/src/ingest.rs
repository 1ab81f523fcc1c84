//! One ingestion unit: every file of one source into one container.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lexicon_types::{RankOrder, Record};
use tracing::{debug, info, warn};

use crate::container::{Container, ContainerBuilder, FrequencyContainer, RecordContainer};
use crate::error::{LoadError, ParseError};
use crate::intern::Interner;
use crate::parse::custom::{CustomSeen, ingest_custom_names, ingest_custom_words};
use crate::parse::frequency::ingest_frequency;
use crate::parse::names::ingest_names;
use crate::parse::pitch::ingest_pitch;
use crate::parse::words::ingest_words;
use crate::parse::ParseStats;
use crate::source::{LoadMode, SourceDescriptor, SourceKind, load_file, source_files};

/// A frozen container of either shape.
#[derive(Clone, Debug)]
pub enum SourceIndex {
    Records(Arc<RecordContainer>),
    Frequency(Arc<FrequencyContainer>),
}

impl SourceIndex {
    fn empty(kind: SourceKind, rank_order: RankOrder) -> Self {
        if kind.is_frequency() {
            SourceIndex::Frequency(Arc::new(FrequencyContainer::empty(rank_order)))
        } else {
            SourceIndex::Records(Arc::new(Container::empty()))
        }
    }

    /// Number of distinct keys.
    pub fn keys(&self) -> usize {
        match self {
            SourceIndex::Records(c) => c.len(),
            SourceIndex::Frequency(c) => c.container().len(),
        }
    }
}

/// How a load request for one source ended.
#[derive(Clone, Debug)]
pub enum LoadOutcome {
    Loaded {
        records: usize,
        keys: usize,
    },
    /// Loaded, but some elements were malformed and skipped.
    Partial {
        records: usize,
        keys: usize,
        skipped: usize,
    },
    /// The path does not exist; the container is empty.
    NotFound,
    /// A file could not be read or parsed; earlier files remain loaded.
    Failed {
        error: Arc<LoadError>,
        records: usize,
    },
    /// The descriptor is switched off; nothing was loaded.
    Inactive,
    /// A newer request for the same source replaced this one.
    Superseded,
}

impl LoadOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, LoadOutcome::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadOutcome::Loaded { .. } => "loaded",
            LoadOutcome::Partial { .. } => "partial",
            LoadOutcome::NotFound => "not_found",
            LoadOutcome::Failed { .. } => "failed",
            LoadOutcome::Inactive => "inactive",
            LoadOutcome::Superseded => "superseded",
        }
    }
}

/// Per-source load summary handed back to callers.
#[derive(Clone, Debug)]
pub struct LoadReport {
    pub source: String,
    pub kind: SourceKind,
    pub outcome: LoadOutcome,
    pub files: usize,
    /// Well-formed elements intentionally dropped (no pitch data, duplicates).
    pub discarded: usize,
    pub elapsed: Duration,
}

impl LoadReport {
    pub(crate) fn bare(descriptor: &SourceDescriptor, outcome: LoadOutcome) -> Self {
        Self {
            source: descriptor.name.clone(),
            kind: descriptor.kind,
            outcome,
            files: 0,
            discarded: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Result of one ingestion unit. `index` is `None` only when the unit never
/// ran to completion.
#[derive(Debug)]
pub struct Ingested {
    pub index: Option<SourceIndex>,
    pub report: LoadReport,
}

/// Load every file of `descriptor` sequentially into a fresh container.
///
/// Never fails as a whole: missing paths yield an empty container and
/// unreadable files yield a `Failed` report with whatever was inserted before
/// the failing file.
pub fn ingest_source(descriptor: &SourceDescriptor, interner: &Interner, mode: LoadMode) -> Ingested {
    let start = Instant::now();
    let files = match source_files(&descriptor.path, descriptor.kind) {
        Ok(Some(files)) => files,
        Ok(None) => {
            info!(
                "source `{}` not found at {}; leaving it empty",
                descriptor.name,
                descriptor.path.display()
            );
            return Ingested {
                index: Some(SourceIndex::empty(descriptor.kind, descriptor.rank_order)),
                report: LoadReport {
                    elapsed: start.elapsed(),
                    ..LoadReport::bare(descriptor, LoadOutcome::NotFound)
                },
            };
        }
        Err(err) => {
            warn!("source `{}` could not be listed: {err}", descriptor.name);
            return Ingested {
                index: Some(SourceIndex::empty(descriptor.kind, descriptor.rank_order)),
                report: LoadReport {
                    elapsed: start.elapsed(),
                    ..LoadReport::bare(
                        descriptor,
                        LoadOutcome::Failed {
                            error: Arc::new(err),
                            records: 0,
                        },
                    )
                },
            };
        }
    };

    let (index, stats, error) = if descriptor.kind.is_frequency() {
        let mut builder = ContainerBuilder::new();
        let (stats, error) =
            run_files(&files, mode, |bytes| ingest_frequency(bytes, interner, &mut builder));
        let container = FrequencyContainer::new(builder.finish(), descriptor.rank_order);
        (SourceIndex::Frequency(Arc::new(container)), stats, error)
    } else {
        let mut builder = ContainerBuilder::new();
        let mut seen = CustomSeen::new();
        let (stats, error) = run_files(&files, mode, |bytes| {
            parse_records(descriptor.kind, bytes, interner, &mut seen, &mut builder)
        });
        (SourceIndex::Records(Arc::new(builder.finish())), stats, error)
    };

    let keys = index.keys();
    let outcome = match error {
        Some(err) => {
            warn!("source `{}` failed to load: {err}", descriptor.name);
            LoadOutcome::Failed {
                error: Arc::new(err),
                records: stats.records,
            }
        }
        None if stats.skipped > 0 => {
            warn!(
                "source `{}`: skipped {} malformed elements",
                descriptor.name, stats.skipped
            );
            LoadOutcome::Partial {
                records: stats.records,
                keys,
                skipped: stats.skipped,
            }
        }
        None => LoadOutcome::Loaded {
            records: stats.records,
            keys,
        },
    };

    let elapsed = start.elapsed();
    info!(
        "source `{}` ({:?}): {} records under {} keys from {} files in {} ms",
        descriptor.name,
        descriptor.kind,
        stats.records,
        keys,
        files.len(),
        elapsed.as_millis()
    );

    Ingested {
        index: Some(index),
        report: LoadReport {
            source: descriptor.name.clone(),
            kind: descriptor.kind,
            outcome,
            files: files.len(),
            discarded: stats.discarded,
            elapsed,
        },
    }
}

fn parse_records(
    kind: SourceKind,
    bytes: &[u8],
    interner: &Interner,
    seen: &mut CustomSeen,
    builder: &mut ContainerBuilder<Arc<Record>>,
) -> Result<ParseStats, ParseError> {
    match kind {
        SourceKind::Words => ingest_words(bytes, interner, builder),
        SourceKind::Names => ingest_names(bytes, interner, builder),
        SourceKind::Pitch => ingest_pitch(bytes, interner, builder),
        SourceKind::CustomWords => ingest_custom_words(bytes, interner, seen, builder),
        SourceKind::CustomNames => ingest_custom_names(bytes, interner, seen, builder),
        SourceKind::Frequency => Err(ParseError::Shape(
            "frequency lists do not produce records".into(),
        )),
    }
}

/// Feed each file to `parse` in order, stopping at the first unreadable one.
fn run_files<F>(files: &[PathBuf], mode: LoadMode, mut parse: F) -> (ParseStats, Option<LoadError>)
where
    F: FnMut(&[u8]) -> Result<ParseStats, ParseError>,
{
    let mut total = ParseStats::default();
    for path in files {
        let buffer = match load_file(path, mode) {
            Ok(buffer) => buffer,
            Err(err) => return (total, Some(err)),
        };
        match parse(buffer.as_slice()) {
            Ok(stats) => {
                debug!(
                    "{}: {} records, {} skipped, {} discarded",
                    path.display(),
                    stats.records,
                    stats.skipped,
                    stats.discarded
                );
                total.merge(stats);
            }
            Err(err) => return (total, Some(LoadError::parse(path, err))),
        }
    }
    (total, None)
}
