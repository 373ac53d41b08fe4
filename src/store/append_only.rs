//! Append-only store
//!
//! Command interface above one message set: `append`, `import` and
//! `read_all`. The page file lives at `<dir>/<name>.pages` next to its
//! manifest; the manifest is rewritten after every append that moved the
//! content size, so another process can replay up to that size.
//!
//! One writer per store. Callers serialize appends themselves.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::messageset::{Geometry, MessageSet, MessageSetError, RecordReader, StorageOffset};
use crate::naming::validate_stream_key;
use crate::observability::Logger;
use crate::pagestore::{FilePageStore, PageStore, PageStoreError};
use crate::staging::StagingReader;

use super::errors::{StoreError, StoreResult};
use super::manifest::Manifest;

/// File locations of one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub pages: PathBuf,
    pub manifest: PathBuf,
}

impl StorePaths {
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            pages: dir.join(format!("{}.pages", name)),
            manifest: dir.join(format!("{}.manifest.json", name)),
        }
    }

    /// Returns whether the manifest exists.
    pub fn exists(&self) -> bool {
        self.manifest.exists()
    }
}

/// Outcome of one bulk import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportStats {
    pub records: u64,
    pub bytes: u64,
    pub elapsed: Duration,
    pub content_size: u64,
}

impl ImportStats {
    pub fn records_per_sec(&self) -> f64 {
        rate(self.records, self.elapsed)
    }

    pub fn bytes_per_sec(&self) -> f64 {
        rate(self.bytes, self.elapsed)
    }
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds > 0.0 {
        count as f64 / seconds
    } else {
        0.0
    }
}

/// Append-only event log persisted as a page file plus manifest.
#[derive(Debug)]
pub struct AppendOnlyStore {
    set: MessageSet,
    manifest: Manifest,
    paths: StorePaths,
    logger: Logger,
}

impl AppendOnlyStore {
    /// Opens the store if its manifest exists, creates it otherwise.
    pub fn open_or_create(
        dir: &Path,
        name: &str,
        geometry: Geometry,
        logger: Logger,
    ) -> StoreResult<Self> {
        if StorePaths::new(dir, name).exists() {
            Self::open(dir, name, geometry, logger)
        } else {
            Self::create(dir, name, geometry, logger)
        }
    }

    /// Creates an empty store. Fails if a manifest is already present.
    pub fn create(dir: &Path, name: &str, geometry: Geometry, logger: Logger) -> StoreResult<Self> {
        check_log_name(name)?;
        geometry.validate()?;
        let paths = StorePaths::new(dir, name);
        if paths.exists() {
            return Err(StoreError::AlreadyExists(paths.manifest.display().to_string()));
        }

        let store_logger = logger.with_component("store");
        if paths.pages.exists() {
            // Without a manifest the page file never acknowledged a record.
            store_logger.warn(
                "STORE_ORPHAN_PAGES_REMOVED",
                &[("path", &paths.pages.display().to_string())],
            );
            remove_page_file(&paths.pages)?;
        }

        let store: Arc<dyn PageStore> =
            Arc::new(FilePageStore::create(&paths.pages, geometry.page_size, 0)?);
        let set = MessageSet::create_new(store, geometry, logger)?;

        let manifest = Manifest::new(&geometry);
        if let Err(e) = manifest.save(&paths.manifest) {
            let _ = remove_page_file(&paths.pages);
            return Err(e);
        }

        let logger = store_logger;
        logger.info(
            "STORE_CREATE",
            &[
                ("capacity", &set.capacity().to_string()),
                ("name", name),
                ("set_id", &manifest.set_id.to_string()),
            ],
        );

        Ok(Self {
            set,
            manifest,
            paths,
            logger,
        })
    }

    /// Opens an existing store for appending.
    pub fn open(dir: &Path, name: &str, geometry: Geometry, logger: Logger) -> StoreResult<Self> {
        let (paths, manifest, store) = Self::load(dir, name, &geometry)?;
        let set = MessageSet::open_existing(store, geometry, manifest.content_size, logger.clone())?;
        Ok(Self::opened(set, manifest, paths, logger, "append"))
    }

    /// Opens an existing store for replay only.
    pub fn read_only(
        dir: &Path,
        name: &str,
        geometry: Geometry,
        logger: Logger,
    ) -> StoreResult<Self> {
        let (paths, manifest, store) = Self::load(dir, name, &geometry)?;
        let set =
            MessageSet::open_for_reading(store, geometry, manifest.content_size, logger.clone())?;
        Ok(Self::opened(set, manifest, paths, logger, "read"))
    }

    fn load(
        dir: &Path,
        name: &str,
        geometry: &Geometry,
    ) -> StoreResult<(StorePaths, Manifest, Arc<dyn PageStore>)> {
        check_log_name(name)?;
        geometry.validate()?;
        let paths = StorePaths::new(dir, name);
        if !paths.exists() {
            return Err(StoreError::NotFound(paths.manifest.display().to_string()));
        }

        let manifest = Manifest::load(&paths.manifest)?;
        manifest.check_geometry(geometry)?;
        let store: Arc<dyn PageStore> =
            Arc::new(FilePageStore::open(&paths.pages, geometry.page_size)?);
        Ok((paths, manifest, store))
    }

    fn opened(
        set: MessageSet,
        manifest: Manifest,
        paths: StorePaths,
        logger: Logger,
        mode: &str,
    ) -> Self {
        let logger = logger.with_component("store");
        logger.info(
            "STORE_OPEN",
            &[
                ("capacity", &set.capacity().to_string()),
                ("content_size", &manifest.content_size.to_string()),
                ("mode", mode),
                ("set_id", &manifest.set_id.to_string()),
            ],
        );
        Self {
            set,
            manifest,
            paths,
            logger,
        }
    }

    /// Appends `payloads` under `stream_key` and returns the new content size.
    ///
    /// The stream key is validated before any I/O.
    pub fn append<I, B>(&mut self, stream_key: &str, payloads: I) -> StoreResult<u64>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        check_stream_key(stream_key)?;
        let result = self.set.append(stream_key, payloads);
        self.sync_manifest()?;
        Ok(result?)
    }

    /// Streams every payload of a staging stream into one append.
    ///
    /// A corrupt staging stream aborts the import; batches flushed before
    /// the failure stay in the log.
    pub fn import<R: Read>(
        &mut self,
        stream_key: &str,
        staging: StagingReader<R>,
    ) -> StoreResult<ImportStats> {
        check_stream_key(stream_key)?;

        let started = Instant::now();
        let mut records = 0u64;
        let mut bytes = 0u64;
        let payloads = staging.map(|item| {
            item.map(|payload| {
                records += 1;
                bytes += payload.len() as u64;
                payload
            })
            .map_err(StoreError::from)
        });
        let result = self.set.try_append(stream_key, payloads);
        self.sync_manifest()?;
        let content_size = result?;

        let stats = ImportStats {
            records,
            bytes,
            elapsed: started.elapsed(),
            content_size,
        };
        self.logger.info(
            "IMPORT_COMPLETE",
            &[
                ("bytes", &stats.bytes.to_string()),
                ("bytes_per_sec", &format!("{:.0}", stats.bytes_per_sec())),
                ("records", &stats.records.to_string()),
                ("records_per_sec", &format!("{:.0}", stats.records_per_sec())),
                ("seconds", &format!("{:.4}", stats.elapsed.as_secs_f64())),
                ("stream_key", stream_key),
            ],
        );
        Ok(stats)
    }

    /// Lazily replays records from `start`, never past the content size.
    pub fn read_all(
        &self,
        start: StorageOffset,
        end: Option<StorageOffset>,
        max_records: usize,
    ) -> StoreResult<RecordReader> {
        Ok(self.set.read_all(start, end, max_records)?)
    }

    /// Empties the log under a fresh `set_id`.
    ///
    /// Existing capacity is kept and overwritten. Checkpoints taken against
    /// the old contents no longer bind to this store.
    pub fn reset(&mut self) -> StoreResult<()> {
        if !self.set.is_writable() {
            return Err(MessageSetError::invalid("cannot reset a read-only store").into());
        }

        let mut updated = self.manifest.clone();
        updated.set_id = Uuid::new_v4();
        updated.content_size = 0;
        updated.save(&self.paths.manifest)?;
        self.set.reset();

        self.logger.info(
            "STORE_RESET",
            &[
                ("previous_set_id", &self.manifest.set_id.to_string()),
                ("set_id", &updated.set_id.to_string()),
            ],
        );
        self.manifest = updated;
        Ok(())
    }

    fn sync_manifest(&mut self) -> StoreResult<()> {
        let content_size = self.set.content_size();
        if content_size == self.manifest.content_size {
            return Ok(());
        }
        let mut updated = self.manifest.clone();
        updated.content_size = content_size;
        updated.save(&self.paths.manifest)?;
        self.manifest = updated;
        Ok(())
    }

    pub fn set_id(&self) -> Uuid {
        self.manifest.set_id
    }

    pub fn content_size(&self) -> u64 {
        self.set.content_size()
    }

    pub fn capacity(&self) -> u64 {
        self.set.capacity()
    }

    pub fn geometry(&self) -> &Geometry {
        self.set.geometry()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }
}

fn check_stream_key(key: &str) -> StoreResult<()> {
    let validity = validate_stream_key(key);
    if !validity.is_valid() {
        return Err(StoreError::InvalidStreamKey {
            key: key.to_string(),
            validity,
        });
    }
    Ok(())
}

fn remove_page_file(path: &Path) -> StoreResult<()> {
    fs::remove_file(path).map_err(|e| {
        PageStoreError::io(format!("Failed to remove page file: {}", path.display()), e).into()
    })
}

fn check_log_name(name: &str) -> StoreResult<()> {
    let validity = validate_stream_key(name);
    if !validity.is_valid() {
        return Err(StoreError::InvalidLogName {
            name: name.to_string(),
            validity,
        });
    }
    Ok(())
}
