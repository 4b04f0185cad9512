//! File-backed save-set store.
//!
//! # Responsibilities
//! - Keep named save sets and the name list in memory
//! - Mark changed entries dirty; identical re-saves are ignored
//! - Write dirty entries to disk on `flush_if_dirty`
//!
//! # Layout
//! ```text
//! <dir>/names.json        JSON array of save-set names
//! <dir>/ss_<name>.json    one JSON object per save set
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use dashmap::DashMap;
use serde_json::{json, Value};
use thiserror::Error;

const NAMES_FILE: &str = "names.json";
const SET_PREFIX: &str = "ss_";
const SET_SUFFIX: &str = ".json";

/// Name used when no names were ever saved.
pub const DEFAULT_SET_NAME: &str = "default";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid save-set name [{0}]")]
    InvalidName(String),

    #[error("name list must be a JSON array of strings")]
    InvalidNames,
}

/// Persistence for named client-side state.
pub trait SaveSetStore: Send + Sync {
    /// Stored bytes for `name`, if any.
    fn load(&self, name: &str) -> Result<Option<Bytes>, StoreError>;

    /// Store `bytes` under `name`. Written to disk later.
    fn save(&self, name: &str, bytes: Bytes) -> Result<(), StoreError>;

    /// Replace the name list.
    fn save_names(&self, bytes: Bytes) -> Result<(), StoreError>;

    /// `{"names": [...], "saveset": <first name's save set>}`.
    fn initial_state(&self) -> Result<Value, StoreError>;

    /// Write dirty entries. Returns the number of files written.
    fn flush_if_dirty(&self) -> Result<usize, StoreError>;

    /// When the last accepted change happened.
    fn last_change(&self) -> Option<Instant>;
}

#[derive(Debug, Clone)]
struct Entry {
    bytes: Bytes,
    dirty: bool,
}

impl Entry {
    fn clean(bytes: Bytes) -> Self {
        Self { bytes, dirty: false }
    }

    /// Returns true when the content changed.
    fn update(&mut self, bytes: Bytes) -> bool {
        if self.bytes == bytes {
            return false;
        }
        self.bytes = bytes;
        self.dirty = true;
        true
    }
}

/// Save sets as JSON files in one directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    sets: DashMap<String, Entry>,
    names: Mutex<Entry>,
    last_change: Mutex<Option<Instant>>,
    flush: Mutex<()>,
}

impl FileStore {
    /// Open (and create) the storage directory and load what is there.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|source| io_error(root, source))?;

        let sets = DashMap::new();
        let mut files: Vec<(String, PathBuf)> = fs::read_dir(root)
            .map_err(|source| io_error(root, source))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|path| {
                let name = set_name_of(&path)?;
                Some((name, path))
            })
            .collect();
        files.sort();

        for (name, path) in files {
            let bytes = fs::read(&path).map_err(|source| io_error(&path, source))?;
            tracing::info!(saveset = %name, bytes = bytes.len(), "Loaded save set");
            sets.insert(name, Entry::clean(Bytes::from(bytes)));
        }

        let names_path = root.join(NAMES_FILE);
        let stored: Vec<String> = match fs::read(&names_path) {
            Ok(bytes) => parse_names(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(io_error(&names_path, source)),
        };

        let mut names = stored.clone();
        let known: BTreeSet<&String> = stored.iter().collect();
        let mut extra: Vec<String> = sets
            .iter()
            .map(|e| e.key().clone())
            .filter(|n| !known.contains(n))
            .collect();
        extra.sort();
        names.extend(extra);

        let names_entry = Entry {
            bytes: Bytes::from(serde_json::to_vec(&names)?),
            dirty: names != stored,
        };
        tracing::info!(dir = ?root, names = ?names, "Store opened");

        Ok(Self {
            root: root.to_path_buf(),
            sets,
            names: Mutex::new(names_entry),
            last_change: Mutex::new(None),
            flush: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current name list; `["default"]` when empty.
    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        let bytes = self.names.lock().unwrap_or_else(PoisonError::into_inner).bytes.clone();
        let mut names = parse_names(&bytes)?;
        if names.is_empty() {
            names.push(DEFAULT_SET_NAME.to_string());
        }
        Ok(names)
    }

    fn set_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}{}{}", SET_PREFIX, name, SET_SUFFIX))
    }

    fn touch(&self) {
        *self.last_change.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }
}

impl SaveSetStore for FileStore {
    fn load(&self, name: &str) -> Result<Option<Bytes>, StoreError> {
        check_name(name)?;
        if let Some(entry) = self.sets.get(name) {
            tracing::info!(saveset = %name, bytes = entry.bytes.len(), "LOAD save set");
            return Ok(Some(entry.bytes.clone()));
        }

        let path = self.set_path(name);
        match fs::read(&path) {
            Ok(bytes) => {
                let bytes = Bytes::from(bytes);
                self.sets
                    .entry(name.to_string())
                    .or_insert_with(|| Entry::clean(bytes.clone()));
                tracing::info!(saveset = %name, bytes = bytes.len(), "LOAD save set from disk");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(saveset = %name, "LOAD save set: not found");
                Ok(None)
            }
            Err(source) => Err(io_error(&path, source)),
        }
    }

    fn save(&self, name: &str, bytes: Bytes) -> Result<(), StoreError> {
        check_name(name)?;
        serde_json::from_slice::<Value>(&bytes)?;
        self.touch();

        let outcome = match self.sets.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut e) => {
                if e.get_mut().update(bytes) {
                    "mark dirty"
                } else {
                    "ignored (equal)"
                }
            }
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(Entry { bytes, dirty: true });
                "created new"
            }
        };
        tracing::info!(saveset = %name, "Update save set: {}", outcome);
        Ok(())
    }

    fn save_names(&self, bytes: Bytes) -> Result<(), StoreError> {
        parse_names(&bytes)?;
        self.touch();
        let changed = self.names.lock().unwrap_or_else(PoisonError::into_inner).update(bytes);
        tracing::info!(changed, "Update name list");
        Ok(())
    }

    fn initial_state(&self) -> Result<Value, StoreError> {
        let names = self.names()?;
        let mut state = json!({ "names": names });
        if let Some(first) = names.first() {
            if let Some(bytes) = self.load(first)? {
                state["saveset"] = serde_json::from_slice(&bytes)?;
            }
        }
        Ok(state)
    }

    fn flush_if_dirty(&self) -> Result<usize, StoreError> {
        let _guard = self.flush.lock().unwrap_or_else(PoisonError::into_inner);
        let mut written = 0;

        for mut entry in self.sets.iter_mut() {
            if !entry.dirty {
                continue;
            }
            let path = self.set_path(entry.key());
            write_file(&path, &entry.bytes)?;
            entry.dirty = false;
            written += 1;
        }

        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        if names.dirty {
            write_file(&self.root.join(NAMES_FILE), &names.bytes)?;
            names.dirty = false;
            written += 1;
        }

        if written > 0 {
            tracing::info!(files = written, "Wrote unsaved data");
        }
        Ok(written)
    }

    fn last_change(&self) -> Option<Instant> {
        *self.last_change.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write via a temporary file so a crash never leaves a half-written set.
fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|source| io_error(&tmp, source))?;
    fs::rename(&tmp, path).map_err(|source| io_error(path, source))
}

fn set_name_of(path: &Path) -> Option<String> {
    let file = path.file_name()?.to_str()?;
    let name = file.strip_prefix(SET_PREFIX)?.strip_suffix(SET_SUFFIX)?;
    check_name(name).ok()?;
    Some(name.to_string())
}

fn check_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

fn parse_names(bytes: &[u8]) -> Result<Vec<String>, StoreError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(StoreError::InvalidNames),
            })
            .collect(),
        _ => Err(StoreError::InvalidNames),
    }
}
