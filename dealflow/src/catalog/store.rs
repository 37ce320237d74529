//! Catalog stores.

use parking_lot::Mutex;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::merge::{batch_day, merge_by_day};
use crate::core::Item;
use crate::errors::{DealflowError, Result};

/// Outcome of reading the stored catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLoad {
    /// Every entry of the document was read.
    Loaded(Vec<Item>),
    /// The document is a list, but some entries do not read as items.
    Partial {
        /// Entries that were read, in document order.
        items: Vec<Item>,
        /// One message per unreadable entry.
        rejected: Vec<String>,
    },
    /// No document exists yet.
    Missing,
    /// A document exists but is not a JSON list.
    Corrupt {
        /// Parser message.
        reason: String,
    },
}

impl CatalogLoad {
    /// Parses raw document text entry by entry.
    ///
    /// An entry that does not read as an item is set aside without losing
    /// its neighbours; only a document that is not a JSON list is corrupt.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
            Ok(entries) => entries,
            Err(e) => {
                return Self::Corrupt {
                    reason: e.to_string(),
                }
            }
        };

        let mut items = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Item>(entry) {
                Ok(item) => items.push(item),
                Err(e) => rejected.push(format!("entry {index}: {e}")),
            }
        }

        if rejected.is_empty() {
            Self::Loaded(items)
        } else {
            Self::Partial { items, rejected }
        }
    }

    /// The items to merge against; missing and corrupt both mean empty.
    #[must_use]
    pub fn into_items(self) -> Vec<Item> {
        match self {
            Self::Loaded(items) => items,
            Self::Partial { items, rejected } => {
                for reason in &rejected {
                    warn!(%reason, "Dropping unreadable catalog entry");
                }
                items
            }
            Self::Missing => Vec::new(),
            Self::Corrupt { reason } => {
                warn!(%reason, "Stored catalog is corrupt, rebuilding it from this batch");
                Vec::new()
            }
        }
    }

    /// Returns true if the stored document was unreadable as a catalog.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Storage for the catalog document.
///
/// Implementors provide whole-document load and replace; [`persist`] layers
/// the merge-by-day upsert on top.
///
/// [`persist`]: CatalogStore::persist
pub trait CatalogStore: Send + Sync {
    /// Reads the current catalog.
    fn load(&self) -> Result<CatalogLoad>;

    /// Replaces the whole catalog in one step.
    fn replace(&self, items: &[Item]) -> Result<()>;

    /// Upserts one day's batch and returns the full merged catalog.
    ///
    /// An empty batch fails before anything is read or written.
    fn persist(&self, new_items: &[Item]) -> Result<Vec<Item>> {
        let day = batch_day(new_items)?;
        let existing = self.load()?.into_items();
        let previous = existing.len();

        let merged = merge_by_day(existing, new_items)?;
        self.replace(&merged)?;

        info!(
            day,
            batch = new_items.len(),
            previous,
            total = merged.len(),
            "Catalog persisted"
        );
        Ok(merged)
    }
}

/// A catalog kept as a pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonCatalogStore {
    path: PathBuf,
}

impl JsonCatalogStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "catalog.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CatalogStore for JsonCatalogStore {
    fn load(&self) -> Result<CatalogLoad> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(CatalogLoad::parse(&raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No catalog yet");
                Ok(CatalogLoad::Missing)
            }
            // Invalid UTF-8 is a damaged document, not an environment failure.
            Err(e) if e.kind() == ErrorKind::InvalidData => Ok(CatalogLoad::Corrupt {
                reason: e.to_string(),
            }),
            Err(e) => Err(DealflowError::catalog(&self.path, e)),
        }
    }

    fn replace(&self, items: &[Item]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DealflowError::catalog(parent, e))?;
        }

        let body = serde_json::to_vec_pretty(items)?;
        let staging = self.staging_path();

        // Readers see either the old document or the new one, never a prefix.
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&staging)?;
            file.write_all(&body)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            fs::rename(&staging, &self.path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&staging);
            DealflowError::catalog(&self.path, e)
        })
    }
}

/// In-memory catalog, mostly for tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    document: Mutex<Option<String>>,
    writes: Mutex<usize>,
}

impl InMemoryCatalogStore {
    /// Creates an empty store (no document).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding raw document text, which may be invalid.
    #[must_use]
    pub fn with_document(raw: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(raw.into())),
            writes: Mutex::new(0),
        }
    }

    /// Creates a store holding the given items.
    pub fn with_items(items: &[Item]) -> Result<Self> {
        Ok(Self::with_document(serde_json::to_string(items)?))
    }

    /// The raw stored document.
    #[must_use]
    pub fn document(&self) -> Option<String> {
        self.document.lock().clone()
    }

    /// Number of successful replaces.
    #[must_use]
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn load(&self) -> Result<CatalogLoad> {
        Ok(match self.document.lock().as_deref() {
            Some(raw) => CatalogLoad::parse(raw),
            None => CatalogLoad::Missing,
        })
    }

    fn replace(&self, items: &[Item]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        *self.document.lock() = Some(raw);
        *self.writes.lock() += 1;
        Ok(())
    }
}
