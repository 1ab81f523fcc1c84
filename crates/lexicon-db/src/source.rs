//! Source descriptors and raw file access.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use lexicon_types::RankOrder;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Strategy for reading source files.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Memory-map each file.
    #[default]
    Mmap,
    /// Read each file into an owned buffer (portable fallback).
    Owned,
}

impl LoadMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mmap" => Some(LoadMode::Mmap),
            "owned" => Some(LoadMode::Owned),
            _ => None,
        }
    }
}

pub(crate) enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// Bundle metadata that sits next to dictionary banks and is never loaded.
const BUNDLE_INDEX: &str = "index.json";
const TAG_BANK_PREFIX: &str = "tag_bank";

/// What a source contains, and therefore which parser reads it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Words,
    Names,
    Frequency,
    Pitch,
    CustomWords,
    CustomNames,
}

impl SourceKind {
    pub fn is_frequency(self) -> bool {
        matches!(self, SourceKind::Frequency)
    }

    /// Whether a file inside a directory source belongs to this kind.
    fn accepts(self, file_name: &str) -> bool {
        match self {
            SourceKind::Words | SourceKind::Names => {
                file_name.starts_with("term_bank") && file_name.ends_with(".json")
            }
            SourceKind::Pitch => {
                file_name.starts_with("term_meta_bank") && file_name.ends_with(".json")
            }
            SourceKind::Frequency => {
                file_name.ends_with(".json")
                    && file_name != BUNDLE_INDEX
                    && !file_name.starts_with(TAG_BANK_PREFIX)
            }
            SourceKind::CustomWords | SourceKind::CustomNames => !file_name.starts_with('.'),
        }
    }
}

/// One dictionary, frequency or pitch source as handed over by configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub kind: SourceKind,
    pub path: PathBuf,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Higher priorities are listed first by cross-source lookups.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub rank_order: RankOrder,
}

fn default_active() -> bool {
    true
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            path: path.into(),
            active: true,
            priority: 0,
            rank_order: RankOrder::default(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_rank_order(mut self, rank_order: RankOrder) -> Self {
        self.rank_order = rank_order;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Files making up a source, in load order. `None` when the path is absent.
///
/// Directory members are ordered by the number embedded in their name
/// (`term_bank_2.json` before `term_bank_10.json`), then by name.
pub(crate) fn source_files(
    path: &Path,
    kind: SourceKind,
) -> Result<Option<Vec<PathBuf>>, LoadError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(LoadError::io(path, err)),
    };
    if !meta.is_dir() {
        return Ok(Some(vec![path.to_path_buf()]));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| LoadError::io(path, e))? {
        let entry = entry.map_err(|e| LoadError::io(path, e))?;
        let file_type = entry.file_type().map_err(|e| LoadError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if kind.accepts(name) {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| {
        let key = |p: &PathBuf| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_owned();
            (bank_number(&name), name)
        };
        key(a).cmp(&key(b))
    });
    Ok(Some(files))
}

/// Last run of ASCII digits in a file name.
fn bank_number(name: &str) -> Option<u64> {
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    let digits: String = stem
        .chars()
        .rev()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.chars().rev().collect::<String>().parse().ok()
}

pub(crate) fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer, LoadError> {
    let mut file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    match mode {
        LoadMode::Mmap => {
            // Empty files cannot be mapped on every platform.
            let len = file.metadata().map_err(|e| LoadError::io(path, e))?.len();
            if len == 0 {
                return Ok(Buffer::Owned(Vec::new()));
            }
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .map_err(|e| LoadError::io(path, e))
        }
        LoadMode::Owned => {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .map_err(|e| LoadError::io(path, e))?;
            Ok(Buffer::Owned(buf))
        }
    }
}
