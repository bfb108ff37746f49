//! JSON-file implementation of `DocumentStore`.
//!
//! The whole state document lives in one pretty-printed JSON file.
//!
//! - Saves write a temp file in the same directory, fsync it, then rename it
//!   over the target, so readers see either the old or the new document.
//! - A missing file loads as a fresh default document.
//! - An unreadable, oversized, or structurally invalid file is renamed to
//!   `<file>.corrupt` (or `<file>.corrupt.N`) and replaced with a fresh
//!   default. Recovery is logged at warn level and never fails the caller.
//! - `exclusive` takes an advisory `flock` on a `<file>.lock` sibling, so
//!   separate processes sharing the file serialize their load → save cycles.
//!   The lock file is left in place between runs.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, info, warn};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use cadenas_contracts::{
    document::StateDocument,
    error::{CadenasError, CadenasResult},
    settings::Settings,
};
use cadenas_core::traits::{DocumentStore, StoreGuard};

/// Documents larger than this are treated as corrupt.
pub const MAX_DOCUMENT_BYTES: u64 = 16 * 1024 * 1024;

const MAX_QUARANTINE_SLOTS: u32 = 1000;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    defaults: Settings,
}

impl JsonFileStore {
    /// A store backed by `path`. `defaults` seed any freshly created document.
    pub fn new(path: impl Into<PathBuf>, defaults: Settings) -> Self {
        Self { path: path.into(), defaults }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<file>.lock`, next to the document.
    pub fn lock_path(&self) -> CadenasResult<PathBuf> {
        Ok(self.path.with_file_name(format!("{}.lock", self.file_name()?)))
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn file_name(&self) -> CadenasResult<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CadenasError::PersistenceFailure {
                reason: format!("'{}' has no file name", self.path.display()),
            })
    }

    fn fresh(&self) -> StateDocument {
        StateDocument::new(self.defaults.clone())
    }

    fn read_bytes(&self) -> CadenasResult<Option<Vec<u8>>> {
        let meta = match fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CadenasError::PersistenceFailure {
                    reason: format!("cannot stat '{}': {}", self.path.display(), e),
                })
            }
        };

        if meta.len() > MAX_DOCUMENT_BYTES {
            return Err(CadenasError::StorageCorruption {
                reason: format!(
                    "document is {} bytes, larger than the {} byte limit",
                    meta.len(),
                    MAX_DOCUMENT_BYTES
                ),
            });
        }

        fs::read(&self.path).map(Some).map_err(|e| CadenasError::PersistenceFailure {
            reason: format!("cannot read '{}': {}", self.path.display(), e),
        })
    }

    /// Move the corrupt file aside and write a fresh default in its place.
    fn recover(&self, reason: &str) -> CadenasResult<StateDocument> {
        let backup = quarantine(&self.path)?;
        warn!(
            path = %self.path.display(),
            backup = %backup.display(),
            reason = %reason,
            "state document corrupt; preserved original and reset to defaults"
        );

        let doc = self.fresh();
        self.save(&doc)?;
        Ok(doc)
    }
}

/// Parse and structurally check a serialized document.
///
/// Any failure is reported as `StorageCorruption`.
pub fn parse_document(bytes: &[u8]) -> CadenasResult<StateDocument> {
    let doc: StateDocument =
        serde_json::from_slice(bytes).map_err(|e| CadenasError::StorageCorruption {
            reason: format!("invalid state document JSON: {}", e),
        })?;
    doc.check_integrity()?;
    Ok(doc)
}

impl DocumentStore for JsonFileStore {
    fn exclusive(&self) -> CadenasResult<StoreGuard> {
        let lock_path = self.lock_path()?;
        let fail = |what: &str, e: std::io::Error| CadenasError::PersistenceFailure {
            reason: format!("{} '{}': {}", what, lock_path.display(), e),
        };

        fs::create_dir_all(self.parent_dir()).map_err(|e| fail("cannot create directory for", e))?;
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| fail("cannot open lock", e))?;
        FileExt::lock_exclusive(&lock_file).map_err(|e| fail("cannot lock", e))?;

        debug!(lock = %lock_path.display(), "state document locked");
        Ok(StoreGuard::holding(lock_file))
    }

    fn load(&self) -> CadenasResult<StateDocument> {
        let parsed = match self.read_bytes() {
            Ok(None) => {
                info!(path = %self.path.display(), "no state document yet, starting from defaults");
                return Ok(self.fresh());
            }
            Ok(Some(bytes)) => parse_document(&bytes),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(doc) => {
                debug!(path = %self.path.display(), "state document loaded");
                Ok(doc)
            }
            Err(CadenasError::StorageCorruption { reason }) => self.recover(&reason),
            Err(e) => Err(e),
        }
    }

    fn save(&self, doc: &StateDocument) -> CadenasResult<()> {
        let fail = |what: &str, e: std::io::Error| CadenasError::PersistenceFailure {
            reason: format!("{} '{}': {}", what, self.path.display(), e),
        };

        let json = serde_json::to_vec_pretty(doc).map_err(|e| CadenasError::PersistenceFailure {
            reason: format!("cannot serialize state document: {}", e),
        })?;

        let parent = self.parent_dir();
        fs::create_dir_all(&parent).map_err(|e| fail("cannot create directory for", e))?;

        let file_name = self.file_name()?;

        let mut rnd = [0u8; 8];
        OsRng.fill_bytes(&mut rnd);
        let tmp = parent.join(format!(".{}.{}.tmp", file_name, hex::encode(rnd)));

        let mut opts = OpenOptions::new();
        opts.create_new(true).write(true);
        #[cfg(unix)]
        {
            opts.mode(0o600);
        }

        let written: CadenasResult<()> = (|| {
            let mut f = opts.open(&tmp).map_err(|e| fail("cannot create temp file for", e))?;
            f.write_all(&json).map_err(|e| fail("cannot write", e))?;
            f.sync_all().map_err(|e| fail("cannot sync", e))?;
            fs::rename(&tmp, &self.path).map_err(|e| fail("cannot replace", e))?;
            Ok(())
        })();

        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written?;

        // Best effort: persist the rename itself.
        if let Ok(dir) = OpenOptions::new().read(true).open(&parent) {
            let _ = dir.sync_all();
        }

        debug!(path = %self.path.display(), bytes = json.len(), "state document saved");
        Ok(())
    }
}

/// Rename `path` to the first free `<name>.corrupt[.N]` sibling.
fn quarantine(path: &Path) -> CadenasResult<PathBuf> {
    let fail = |reason: String| CadenasError::PersistenceFailure { reason };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| fail(format!("'{}' has no file name", path.display())))?;

    for i in 0..MAX_QUARANTINE_SLOTS {
        let candidate = if i == 0 {
            path.with_file_name(format!("{}.corrupt", file_name))
        } else {
            path.with_file_name(format!("{}.corrupt.{}", file_name, i))
        };

        if candidate.exists() {
            continue;
        }

        return fs::rename(path, &candidate).map(|()| candidate).map_err(|e| {
            fail(format!("cannot preserve corrupt document '{}': {}", path.display(), e))
        });
    }

    Err(fail(format!(
        "no free quarantine slot for '{}' after {} attempts",
        path.display(),
        MAX_QUARANTINE_SLOTS
    )))
}
