use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::{Result, SearchError};
use crate::loader::{self, DataSource};
use crate::saving;
use crate::table::Tables;

/// Load-once holder for the two read-only tables.
///
/// The first successful [`TableStore::load`] parses the source and every later call
/// returns the same `Arc`. Concurrent first calls are serialized so the source is
/// read exactly once. A failed load is not cached; the next call tries again.
pub struct TableStore {
    source: Option<DataSource>,
    snapshot: Option<PathBuf>,
    tables: OnceLock<Arc<Tables>>,
    guard: Mutex<()>,
    loads: AtomicUsize,
}

impl TableStore {
    pub fn new(source: DataSource) -> Self {
        TableStore {
            source: Some(source),
            snapshot: None,
            tables: OnceLock::new(),
            guard: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Store that already holds `tables` and never reads a source.
    pub fn preloaded(tables: Tables) -> Self {
        let store = TableStore {
            source: None,
            snapshot: None,
            tables: OnceLock::new(),
            guard: Mutex::new(()),
            loads: AtomicUsize::new(0),
        };
        let _ = store.tables.set(Arc::new(tables));
        store
    }

    /// Use a compressed snapshot next to the source to skip workbook parsing.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<Arc<Tables>> {
        if let Some(tables) = self.tables.get() {
            return Ok(Arc::clone(tables));
        }

        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tables) = self.tables.get() {
            return Ok(Arc::clone(tables));
        }

        let tables = Arc::new(self.read_source()?);
        self.loads.fetch_add(1, Ordering::SeqCst);
        let _ = self.tables.set(Arc::clone(&tables));
        Ok(tables)
    }

    /// Number of times the backing source has actually been read.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        self.tables.get().is_some()
    }

    fn read_source(&self) -> Result<Tables> {
        let Some(source) = &self.source else {
            return Err(SearchError::Config(
                "table store has no data source".to_string(),
            ));
        };

        if let Some(snapshot) = &self.snapshot {
            if saving::is_fresh(snapshot, &source.paths()) {
                match saving::load_snapshot(snapshot) {
                    Ok(tables) => {
                        info!("loaded tables from snapshot {}", snapshot.display());
                        return Ok(tables);
                    }
                    Err(e) => warn!("ignoring snapshot {}: {}", snapshot.display(), e),
                }
            }
        }

        info!("reading {}", source.describe());
        let tables = loader::load_tables(source)?;

        if let Some(snapshot) = &self.snapshot {
            match saving::save_snapshot(&tables, snapshot) {
                Ok(()) => info!("wrote snapshot {}", snapshot.display()),
                Err(e) => warn!("could not write snapshot {}: {}", snapshot.display(), e),
            }
        }

        Ok(tables)
    }
}
