//! Content-addressed temporary storage for image payloads.
//!
//! Every distinct payload is written once to a uniquely named temp file and
//! keyed by its SHA-256 digest. Images holding identical bytes share that
//! file; each [`BlobHandle`] counts as one reference and the file is removed
//! when the last reference is released.
//!
//! Files still registered when the last clone of the store goes away are
//! deleted at that point, which covers process teardown.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Prefix for temp file names.
const FILE_PREFIX: &str = "cover-minder";

/// One registered payload.
#[derive(Debug)]
struct Entry {
    path: PathBuf,
    refs: usize,
}

#[derive(Debug)]
struct StoreInner {
    dir: PathBuf,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        for (hash, entry) in self.entries.get_mut().drain() {
            if let Err(e) = fs::remove_file(&entry.path) {
                tracing::debug!("Failed to remove image data {} at {:?}: {}", hash, entry.path, e);
            }
        }
    }
}

/// Shared, thread-safe content store. Cloning is cheap and shares the registry.
#[derive(Debug, Clone)]
pub struct ContentStore {
    inner: Arc<StoreInner>,
}

impl ContentStore {
    /// Store files in the system temp directory.
    pub fn new() -> Self {
        Self::in_dir(std::env::temp_dir())
    }

    /// Store files in the given directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                dir: dir.into(),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Directory holding the temp files.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Persist `data` and return a handle referencing it.
    ///
    /// Identical payloads are written only once; later calls add a reference
    /// to the existing file. `suffix` (e.g. ".jpg") is only used when a new
    /// file has to be created.
    pub fn store(&self, data: &[u8], suffix: &str) -> io::Result<BlobHandle> {
        let hash = content_hash(data);
        let mut entries = self.inner.entries.lock();

        if let Some(entry) = entries.get_mut(&hash) {
            entry.refs += 1;
            return Ok(self.handle(hash, entry.path.clone()));
        }

        fs::create_dir_all(&self.inner.dir)?;
        let mut file = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.inner.dir)?;
        file.write_all(data)?;
        let (_, path) = file.keep().map_err(|e| e.error)?;

        tracing::debug!("Saving image data {} to {:?}", hash, path);
        entries.insert(
            hash.clone(),
            Entry {
                path: path.clone(),
                refs: 1,
            },
        );
        Ok(self.handle(hash, path))
    }

    /// Read the bytes behind a handle.
    pub fn read(&self, handle: &BlobHandle) -> io::Result<Vec<u8>> {
        handle.read()
    }

    /// Drop one reference; the file is deleted when none remain.
    pub fn release(&self, handle: &BlobHandle) {
        handle.release();
    }

    /// Whether a payload with this digest is currently stored.
    pub fn contains(&self, hash: &str) -> bool {
        self.inner.entries.lock().contains_key(hash)
    }

    /// Number of distinct payloads currently stored.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete every stored file regardless of outstanding references.
    pub fn cleanup(&self) {
        let drained: Vec<(String, Entry)> = self.inner.entries.lock().drain().collect();
        for (hash, entry) in drained {
            if let Err(e) = fs::remove_file(&entry.path) {
                tracing::debug!("Failed to remove image data {} at {:?}: {}", hash, entry.path, e);
            }
        }
    }

    fn handle(&self, hash: String, path: PathBuf) -> BlobHandle {
        BlobHandle {
            store: Arc::clone(&self.inner),
            hash,
            path,
            released: AtomicBool::new(false),
        }
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// One reference into a [`ContentStore`].
///
/// Not `Clone`: every handle is exactly one reference. The reference is
/// released explicitly or when the handle is dropped.
#[derive(Debug)]
pub struct BlobHandle {
    store: Arc<StoreInner>,
    hash: String,
    path: PathBuf,
    released: AtomicBool,
}

impl BlobHandle {
    /// SHA-256 digest of the payload, lowercase hex.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Path of the backing temp file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Read the payload back from disk.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        if self.is_released() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("image data {} was released", self.hash),
            ));
        }
        fs::read(&self.path)
    }

    /// Release this reference. Idempotent; unlink failures are ignored.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut entries = self.store.entries.lock();
        let Some(entry) = entries.get_mut(&self.hash) else {
            return;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs > 0 {
            return;
        }

        if let Some(entry) = entries.remove(&self.hash) {
            match fs::remove_file(&entry.path) {
                Ok(()) => tracing::debug!("Removed image data {} at {:?}", self.hash, entry.path),
                Err(e) => tracing::debug!("Failed to remove {:?}: {}", entry.path, e),
            }
        }
    }
}

impl Drop for BlobHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// SHA-256 of `data` as a lowercase hex string (64 characters).
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_store;

    #[test]
    fn test_store_and_read() {
        let (store, _dir) = temp_store();
        let handle = store.store(b"some image bytes", ".jpg").unwrap();

        assert_eq!(store.read(&handle).unwrap(), b"some image bytes");
        assert_eq!(handle.hash().len(), 64);
        assert!(handle.path().to_string_lossy().ends_with(".jpg"));
        assert!(handle.path().starts_with(store.dir()));
    }

    #[test]
    fn test_identical_bytes_share_file() {
        let (store, _dir) = temp_store();
        let first = store.store(b"same bytes", ".png").unwrap();
        let second = store.store(b"same bytes", ".png").unwrap();

        assert_eq!(first.path(), second.path());
        assert_eq!(first.hash(), second.hash());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_release_keeps_file_while_referenced() {
        let (store, _dir) = temp_store();
        let first = store.store(b"shared", ".png").unwrap();
        let second = store.store(b"shared", ".png").unwrap();

        store.release(&first);
        assert!(second.path().exists());
        assert_eq!(store.read(&second).unwrap(), b"shared");

        store.release(&second);
        assert!(!second.path().exists());
        assert!(store.is_empty());
    }

    #[test]
    fn test_release_is_idempotent() {
        let (store, _dir) = temp_store();
        let first = store.store(b"payload", "").unwrap();
        let second = store.store(b"payload", "").unwrap();

        first.release();
        first.release();
        // The double release must not have consumed the second reference
        assert!(second.path().exists());
        assert!(store.contains(second.hash()));
    }

    #[test]
    fn test_read_after_release_fails() {
        let (store, _dir) = temp_store();
        let handle = store.store(b"gone soon", "").unwrap();
        handle.release();

        let err = store.read(&handle).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_missing_file_fails() {
        let (store, _dir) = temp_store();
        let handle = store.store(b"deleted behind our back", "").unwrap();
        fs::remove_file(handle.path()).unwrap();

        assert!(store.read(&handle).is_err());
        // Releasing a handle whose file vanished is still fine
        handle.release();
        assert!(store.is_empty());
    }

    #[test]
    fn test_cleanup_removes_everything() {
        let (store, _dir) = temp_store();
        let a = store.store(b"a-bytes", "").unwrap();
        let b = store.store(b"b-bytes", "").unwrap();

        store.cleanup();
        assert!(!a.path().exists());
        assert!(!b.path().exists());
        assert!(store.is_empty());
    }

    #[test]
    fn test_drop_of_last_reference_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let store = ContentStore::in_dir(dir.path());
            let handle = store.store(b"teardown", "").unwrap();
            handle.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_concurrent_stores_share_one_entry() {
        let (store, _dir) = temp_store();
        let handles: Vec<BlobHandle> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| s.spawn(|| store.store(b"concurrent", ".gif").unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(store.len(), 1);
        for handle in &handles[1..] {
            handle.release();
        }
        assert!(handles[0].path().exists());
        handles[0].release();
        assert!(store.is_empty());
    }

    #[test]
    fn test_dropping_handles_releases_references() {
        let (store, _dir) = temp_store();
        let first = store.store(b"dropped", ".png").unwrap();
        let second = store.store(b"dropped", ".png").unwrap();
        let path = first.path().to_path_buf();

        drop(first);
        assert!(path.exists());
        assert_eq!(store.len(), 1);

        drop(second);
        assert!(!path.exists());
        assert!(store.is_empty());
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
    }
}
