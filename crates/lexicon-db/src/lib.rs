//! Ingest Japanese lexical sources into normalized, dual-keyed containers.
//!
//! A source is a word dictionary, a name dictionary, a frequency list, a
//! pitch-accent bank, or a user-authored custom dictionary. Every source is
//! loaded by its own ingestion unit into its own [`Container`]; the units run
//! concurrently and share only the string [`Interner`].
//!
//! Records are reachable by both spelling and reading. Keys are normalized by
//! folding katakana onto hiragana ([`normalize`]), so `ネコ`, `ねこ` and `猫`
//! lead to the same word when the dictionary says they should.
//!
//! Callers choose between memory-mapped files or owned buffers at runtime via
//! [`LoadMode`].
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use lexicon_db::{Engine, Interner, LoadMode, SourceDescriptor, SourceKind};
//!
//! # async fn run() {
//! let engine = Arc::new(Engine::new(Arc::new(Interner::new()), LoadMode::Mmap));
//! let reports = engine
//!     .load_all([
//!         SourceDescriptor::new("jmdict", SourceKind::Words, "/dicts/jmdict"),
//!         SourceDescriptor::new("freq", SourceKind::Frequency, "/dicts/freq.json"),
//!     ])
//!     .await;
//! for report in &reports {
//!     println!("{}: {}", report.source, report.outcome.label());
//! }
//!
//! for record in engine.lookup("jmdict", "ネコ") {
//!     println!("{}", record.spelling());
//! }
//! # }
//! ```
//!
//! For a runnable demo, see `cargo run -p lexicon-db --example stats -- <kind> <path>`.

pub mod container;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod intern;
pub mod normalize;
pub mod parse;
pub mod source;

pub use container::{Container, ContainerBuilder, FrequencyContainer, RecordContainer};
pub use engine::{Engine, SourceHits};
pub use error::{LoadError, ParseError};
pub use ingest::{Ingested, LoadOutcome, LoadReport, SourceIndex, ingest_source};
pub use intern::Interner;
pub use normalize::{normalize, normalized_key};
pub use parse::ParseStats;
pub use source::{LoadMode, SourceDescriptor, SourceKind};
