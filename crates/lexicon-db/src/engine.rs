//! Concurrent loading of many sources and read access to their containers.
//!
//! Each active source is one ingestion unit run on tokio's blocking pool.
//! Units share only the [`Interner`]; every unit writes its own builder and
//! publishes the frozen container into its slot when done. A slot only
//! accepts the result of the newest request made for it, so a slow reload
//! can never overwrite a faster, later one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use lexicon_types::{FrequencyRecord, Record};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::container::{FrequencyContainer, RecordContainer};
use crate::error::LoadError;
use crate::ingest::{Ingested, LoadOutcome, LoadReport, SourceIndex, ingest_source};
use crate::intern::Interner;
use crate::source::{LoadMode, SourceDescriptor};

#[derive(Debug)]
struct Slot {
    descriptor: SourceDescriptor,
    /// Ticket of the newest request for this source.
    requested: u64,
    index: Option<SourceIndex>,
    report: Option<LoadReport>,
}

/// Records found for a key in one source, as returned by [`Engine::lookup_all`].
#[derive(Clone, Debug)]
pub struct SourceHits {
    pub source: String,
    pub priority: i32,
    pub records: Vec<Arc<Record>>,
}

/// Registry of loaded sources.
#[derive(Debug)]
pub struct Engine {
    interner: Arc<Interner>,
    mode: LoadMode,
    slots: DashMap<String, Slot>,
    tickets: AtomicU64,
}

impl Engine {
    pub fn new(interner: Arc<Interner>, mode: LoadMode) -> Self {
        Self {
            interner,
            mode,
            slots: DashMap::new(),
            tickets: AtomicU64::new(0),
        }
    }

    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    pub fn load_mode(&self) -> LoadMode {
        self.mode
    }

    /// Load every descriptor concurrently and wait for all of them.
    ///
    /// One report is returned per descriptor, in the order given. A failing
    /// source never prevents the others from finishing.
    pub async fn load_all<I>(self: &Arc<Self>, descriptors: I) -> Vec<LoadReport>
    where
        I: IntoIterator<Item = SourceDescriptor>,
    {
        let mut tasks = JoinSet::new();
        let mut pending: Vec<(SourceDescriptor, Option<LoadReport>)> = Vec::new();
        for (slot, descriptor) in descriptors.into_iter().enumerate() {
            let ticket = self.request(&descriptor);
            if !descriptor.active {
                let report = self.deactivate(ticket, &descriptor);
                pending.push((descriptor, Some(report)));
                continue;
            }
            let engine = Arc::clone(self);
            let unit = descriptor.clone();
            tasks.spawn(async move { (slot, engine.run_unit(unit, ticket).await) });
            pending.push((descriptor, None));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, report)) => pending[slot].1 = Some(report),
                Err(err) => warn!("load task ended abnormally: {err}"),
            }
        }

        let reports = settle(pending);
        let failed = reports.iter().filter(|r| r.outcome.is_failure()).count();
        info!("loaded {} sources ({} failed)", reports.len(), failed);
        reports
    }

    /// Load (or reload) one source. The previous container stays readable
    /// until the new one is installed.
    pub async fn reload(self: &Arc<Self>, descriptor: SourceDescriptor) -> LoadReport {
        let ticket = self.request(&descriptor);
        if !descriptor.active {
            return self.deactivate(ticket, &descriptor);
        }
        Arc::clone(self).run_unit(descriptor, ticket).await
    }

    /// Reload a registered source from its current descriptor.
    pub async fn reload_source(self: &Arc<Self>, name: &str) -> Option<LoadReport> {
        let descriptor = self.descriptor(name)?;
        Some(self.reload(descriptor).await)
    }

    async fn run_unit(self: Arc<Self>, descriptor: SourceDescriptor, ticket: u64) -> LoadReport {
        let engine = Arc::clone(&self);
        let unit = descriptor.clone();
        let joined = tokio::task::spawn_blocking(move || {
            ingest_source(&unit, &engine.interner, engine.mode)
        })
        .await;

        let ingested = match joined {
            Ok(ingested) => ingested,
            Err(err) => task_failure(&descriptor, err.to_string()),
        };
        self.install(ticket, descriptor, ingested)
    }

    /// Register a request for `descriptor` and return its ticket.
    fn request(&self, descriptor: &SourceDescriptor) -> u64 {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let mut slot = self
            .slots
            .entry(descriptor.name.clone())
            .or_insert_with(|| Slot {
                descriptor: descriptor.clone(),
                requested: 0,
                index: None,
                report: None,
            });
        slot.requested = ticket;
        ticket
    }

    /// Publish a finished unit unless a newer request exists for its source.
    fn install(&self, ticket: u64, descriptor: SourceDescriptor, ingested: Ingested) -> LoadReport {
        let Some(mut slot) = self.slots.get_mut(&descriptor.name) else {
            // Unloaded while the unit was running.
            return LoadReport::bare(&descriptor, LoadOutcome::Superseded);
        };
        if slot.requested != ticket {
            info!(
                "discarding stale load of `{}` (ticket {ticket}, newest {})",
                descriptor.name, slot.requested
            );
            return LoadReport {
                outcome: LoadOutcome::Superseded,
                ..ingested.report
            };
        }
        if let Some(index) = ingested.index {
            slot.index = Some(index);
        }
        slot.descriptor = descriptor;
        slot.report = Some(ingested.report.clone());
        ingested.report
    }

    fn deactivate(&self, ticket: u64, descriptor: &SourceDescriptor) -> LoadReport {
        let report = LoadReport::bare(descriptor, LoadOutcome::Inactive);
        if let Some(mut slot) = self.slots.get_mut(&descriptor.name) {
            if slot.requested == ticket {
                slot.index = None;
                slot.descriptor = descriptor.clone();
                slot.report = Some(report.clone());
            }
        }
        info!("source `{}` is inactive; not loaded", descriptor.name);
        report
    }

    /// Record container of a loaded word, name, pitch or custom source.
    pub fn records(&self, source: &str) -> Option<Arc<RecordContainer>> {
        match self.slots.get(source)?.index.as_ref()? {
            SourceIndex::Records(c) => Some(Arc::clone(c)),
            SourceIndex::Frequency(_) => None,
        }
    }

    /// Container of a loaded frequency source.
    pub fn frequencies(&self, source: &str) -> Option<Arc<FrequencyContainer>> {
        match self.slots.get(source)?.index.as_ref()? {
            SourceIndex::Frequency(c) => Some(Arc::clone(c)),
            SourceIndex::Records(_) => None,
        }
    }

    /// Records under `key` in one source; empty when the source or key is unknown.
    pub fn lookup(&self, source: &str, key: &str) -> Vec<Arc<Record>> {
        self.records(source)
            .map(|c| c.lookup(key).to_vec())
            .unwrap_or_default()
    }

    pub fn lookup_frequency(&self, source: &str, key: &str) -> Vec<FrequencyRecord> {
        self.frequencies(source)
            .map(|c| c.lookup(key).to_vec())
            .unwrap_or_default()
    }

    /// Records under `key` in every loaded record source holding it, highest
    /// priority first, ties broken by source name.
    pub fn lookup_all(&self, key: &str) -> Vec<SourceHits> {
        let containers: Vec<(String, i32, Arc<RecordContainer>)> = self
            .slots
            .iter()
            .filter_map(|slot| match slot.index.as_ref()? {
                SourceIndex::Records(c) => Some((
                    slot.key().clone(),
                    slot.descriptor.priority,
                    Arc::clone(c),
                )),
                SourceIndex::Frequency(_) => None,
            })
            .collect();

        let mut hits: Vec<SourceHits> = containers
            .into_iter()
            .filter_map(|(source, priority, container)| {
                let records = container.lookup(key);
                (!records.is_empty()).then(|| SourceHits {
                    source,
                    priority,
                    records: records.to_vec(),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.source.cmp(&b.source)));
        hits
    }

    pub fn descriptor(&self, name: &str) -> Option<SourceDescriptor> {
        self.slots.get(name).map(|slot| slot.descriptor.clone())
    }

    /// Latest installed report of every registered source, sorted by name.
    pub fn reports(&self) -> Vec<LoadReport> {
        let mut reports: Vec<LoadReport> = self
            .slots
            .iter()
            .filter_map(|slot| slot.report.clone())
            .collect();
        reports.sort_by(|a, b| a.source.cmp(&b.source));
        reports
    }

    /// Forget a source. In-flight loads for it are discarded when they finish.
    pub fn unload(&self, name: &str) -> bool {
        let removed = self.slots.remove(name).is_some();
        if removed {
            info!("source `{name}` unloaded");
        }
        removed
    }
}

/// Result of a unit whose task never returned.
fn task_failure(descriptor: &SourceDescriptor, reason: String) -> Ingested {
    let error = LoadError::Task {
        name: descriptor.name.clone(),
        reason,
    };
    warn!("{error}");
    Ingested {
        index: None,
        report: LoadReport::bare(
            descriptor,
            LoadOutcome::Failed {
                error: Arc::new(error),
                records: 0,
            },
        ),
    }
}

/// One report per descriptor, in order; slots whose task vanished become
/// task failures.
fn settle(pending: Vec<(SourceDescriptor, Option<LoadReport>)>) -> Vec<LoadReport> {
    pending
        .into_iter()
        .map(|(descriptor, report)| {
            report.unwrap_or_else(|| {
                task_failure(&descriptor, "load task ended abnormally".into()).report
            })
        })
        .collect()
}
