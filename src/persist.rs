//! Debounced saving and tolerant loading of per-chart drawing documents.

use crate::error::PersistError;
use crate::model::{ChartDocument, ChartKey, Drawing};
use crate::store::DrawingStore;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where drawing documents live. One JSON document per chart key.
pub trait DrawingBackend {
    fn load(&self, key: &ChartKey) -> Result<Option<String>, PersistError>;
    fn save(&self, key: &ChartKey, json: &str) -> Result<(), PersistError>;
}

/// One pretty-printed JSON file per chart in a directory.
#[derive(Clone, Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{symbol}_{timeframe}.json` with every byte outside `[A-Za-z0-9.-]`
    /// (and a leading dot) percent-encoded, so distinct keys never share a file.
    pub fn path_for(&self, key: &ChartKey) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.json",
            encode_component(&key.symbol),
            encode_component(&key.timeframe)
        ))
    }
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || (b == b'.' && !out.is_empty()) {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

impl DrawingBackend for FileBackend {
    fn load(&self, key: &ChartKey) -> Result<Option<String>, PersistError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &ChartKey, json: &str) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), json)?;
        Ok(())
    }
}

/// In-process backend. Clones share state, so a test can keep a handle and
/// inspect what was written or make the next saves fail.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    docs: Rc<RefCell<HashMap<ChartKey, String>>>,
    failing_saves: Rc<Cell<u32>>,
    saves: Rc<Cell<u32>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &ChartKey, json: impl Into<String>) {
        self.docs.borrow_mut().insert(key.clone(), json.into());
    }

    pub fn document(&self, key: &ChartKey) -> Option<String> {
        self.docs.borrow().get(key).cloned()
    }

    /// The next `count` saves fail.
    pub fn fail_next_saves(&self, count: u32) {
        self.failing_saves.set(count);
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> u32 {
        self.saves.get()
    }
}

impl DrawingBackend for MemoryBackend {
    fn load(&self, key: &ChartKey) -> Result<Option<String>, PersistError> {
        Ok(self.document(key))
    }

    fn save(&self, key: &ChartKey, json: &str) -> Result<(), PersistError> {
        let failing = self.failing_saves.get();
        if failing > 0 {
            self.failing_saves.set(failing - 1);
            return Err(PersistError::Backend("injected save failure".to_string()));
        }
        self.docs.borrow_mut().insert(key.clone(), json.to_string());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncOptions {
    pub debounce: Duration,
    pub retry: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(750),
            retry: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    Nothing,
    /// A mutation was seen; the quiet period restarted.
    Scheduled,
    Saved,
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub dropped: usize,
}

/// Decodes a chart document, dropping individual drawings that are not
/// well formed. Only a document without a `drawings` array is an error.
pub fn parse_document(json: &str) -> Result<(Vec<Drawing>, usize), PersistError> {
    decode(&serde_json::from_str::<serde_json::Value>(json)?)
}

/// Like [`parse_document`], but refuses a document stamped with another chart.
pub fn parse_document_for(key: &ChartKey, json: &str) -> Result<(Vec<Drawing>, usize), PersistError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    for (field, expected) in [("symbol", &key.symbol), ("timeframe", &key.timeframe)] {
        if let Some(found) = value.get(field).and_then(|v| v.as_str()) {
            if found != expected.as_str() {
                return Err(PersistError::Malformed(format!(
                    "document {field} is {found:?}, expected {expected:?}"
                )));
            }
        }
    }
    decode(&value)
}

fn decode(value: &serde_json::Value) -> Result<(Vec<Drawing>, usize), PersistError> {
    let items = value
        .get("drawings")
        .and_then(|d| d.as_array())
        .ok_or_else(|| PersistError::Malformed("missing drawings array".to_string()))?;
    let mut drawings = Vec::with_capacity(items.len());
    let mut dropped = 0;
    let mut ids = HashSet::new();
    for (i, item) in items.iter().enumerate() {
        match serde_json::from_value::<Drawing>(item.clone()) {
            Ok(d) if !d.id.is_empty() && ids.contains(&d.id) => {
                warn!(index = i, id = %d.id, "dropping drawing with duplicate id");
                dropped += 1;
            }
            Ok(mut d) if d.is_well_formed() => {
                ids.insert(d.id.clone());
                if !d.kind.has_fill() {
                    d.fill_color = None;
                    d.fill_opacity = None;
                }
                drawings.push(d);
            }
            Ok(d) => {
                warn!(index = i, id = %d.id, kind = ?d.kind, points = d.points.len(), "dropping drawing with bad anchors");
                dropped += 1;
            }
            Err(e) => {
                warn!(index = i, error = %e, "dropping undecodable drawing");
                dropped += 1;
            }
        }
    }
    Ok((drawings, dropped))
}

pub fn encode_document(key: &ChartKey, store: &DrawingStore) -> Result<String, PersistError> {
    let doc = ChartDocument {
        symbol: key.symbol.clone(),
        timeframe: key.timeframe.clone(),
        drawings: store.snapshot(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Mirrors the store to a backend, last write wins. Polled from the frame
/// loop; a mutation restarts the quiet period and the full collection is
/// written once it elapses.
pub struct PersistenceSync {
    backend: Box<dyn DrawingBackend>,
    options: SyncOptions,
    key: Option<ChartKey>,
    seen_revision: u64,
    saved_revision: u64,
    deadline: Option<Instant>,
    last_error: Option<String>,
}

impl PersistenceSync {
    pub fn new(backend: Box<dyn DrawingBackend>, options: SyncOptions) -> Self {
        Self {
            backend,
            options,
            key: None,
            seen_revision: 0,
            saved_revision: 0,
            deadline: None,
            last_error: None,
        }
    }

    pub fn key(&self) -> Option<&ChartKey> {
        self.key.as_ref()
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    pub fn set_options(&mut self, options: SyncOptions) {
        self.options = options;
    }

    pub fn is_dirty(&self) -> bool {
        self.seen_revision != self.saved_revision
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replaces the store with the document for `key`. On a backend error the
    /// store is emptied and autosave stays off so the stored document is not
    /// overwritten.
    pub fn load(&mut self, key: ChartKey, store: &mut DrawingStore) -> Result<LoadReport, PersistError> {
        self.deadline = None;
        let result = self
            .backend
            .load(&key)
            .and_then(|doc| match doc {
                Some(json) => parse_document_for(&key, &json),
                None => Ok((Vec::new(), 0)),
            });
        match result {
            Ok((drawings, dropped)) => {
                let report = LoadReport {
                    loaded: drawings.len(),
                    dropped,
                };
                store.replace_all(drawings);
                info!(%key, loaded = report.loaded, dropped, "drawings loaded");
                self.key = Some(key);
                self.seen_revision = store.revision();
                self.saved_revision = store.revision();
                self.last_error = None;
                Ok(report)
            }
            Err(e) => {
                warn!(%key, error = %e, "cannot load drawings");
                store.replace_all(Vec::new());
                self.key = None;
                self.seen_revision = store.revision();
                self.saved_revision = store.revision();
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Saves pending work for the current chart, then loads `key`.
    pub fn switch_chart(&mut self, key: ChartKey, store: &mut DrawingStore) -> Result<LoadReport, PersistError> {
        if let Err(e) = self.flush(store) {
            warn!(error = %e, "unsaved drawings left behind on chart switch");
        }
        self.load(key, store)
    }

    pub fn poll(&mut self, now: Instant, store: &DrawingStore) -> SyncEvent {
        if self.key.is_none() {
            return SyncEvent::Nothing;
        }
        let revision = store.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.deadline = Some(now + self.options.debounce);
            return SyncEvent::Scheduled;
        }
        if !self.is_dirty() {
            return SyncEvent::Nothing;
        }
        match self.deadline {
            Some(deadline) if deadline <= now => {}
            _ => return SyncEvent::Nothing,
        }
        match self.write(store) {
            Ok(()) => SyncEvent::Saved,
            Err(_) => {
                self.deadline = Some(now + self.options.retry);
                SyncEvent::Failed
            }
        }
    }

    /// Writes now if anything is unsaved.
    pub fn flush(&mut self, store: &DrawingStore) -> Result<(), PersistError> {
        if self.key.is_none() {
            return Ok(());
        }
        self.seen_revision = store.revision();
        if !self.is_dirty() {
            return Ok(());
        }
        self.write(store)
    }

    fn write(&mut self, store: &DrawingStore) -> Result<(), PersistError> {
        let Some(key) = &self.key else {
            return Ok(());
        };
        let result = encode_document(key, store).and_then(|json| self.backend.save(key, &json));
        match result {
            Ok(()) => {
                debug!(%key, drawings = store.len(), revision = self.seen_revision, "drawings saved");
                self.saved_revision = self.seen_revision;
                self.deadline = None;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(%key, error = %e, "saving drawings failed, will retry");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
