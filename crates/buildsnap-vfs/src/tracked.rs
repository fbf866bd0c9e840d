//! Tracking storage wrapper.
//!
//! [`TrackedFs`] wraps any [`Storage`] and records two derived sets while
//! the compiler (or a test mutator) works against it:
//!
//! - the *library* set: environment assets auto-provisioned by the harness,
//!   from which a path is dropped the first time its content is really read;
//! - the *written* set: paths (re)written during the current generation.
//!
//! The harness itself snapshots through [`TrackedFs::inner`] so that taking
//! a capture never disturbs either set.

use buildsnap_error::{Result, SnapError};
use buildsnap_types::Timestamp;
use tracing::debug;

use crate::path_set::PathSet;
use crate::traits::{FileInfo, Storage, WalkEntry};
use crate::vpath;

/// A storage wrapper that maintains the library and written path sets.
#[derive(Debug)]
pub struct TrackedFs<S: Storage> {
    inner: S,
    libraries: PathSet,
    written: PathSet,
}

impl<S: Storage> TrackedFs<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            libraries: PathSet::new(),
            written: PathSet::new(),
        }
    }

    /// The untracked store underneath.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn libraries(&self) -> &PathSet {
        &self.libraries
    }

    pub fn written(&self) -> &PathSet {
        &self.written
    }

    /// Forget every write recorded for the current generation.
    pub fn reset_written(&self) {
        self.written.clear();
    }

    /// Make sure an environment asset exists at `path`.
    ///
    /// A missing asset is created with `content` through the inner store
    /// (not counted as a write) and joins the library set. Returns whether
    /// the asset had to be created.
    pub fn provision_library(&self, path: &str, content: &str) -> Result<bool> {
        let path = vpath::normalize(path);
        if self.inner.read_if_exists(&path)?.is_some() {
            return Ok(false);
        }
        self.inner
            .write_file(&path, content, false)
            .map_err(|err| SnapError::write_failed(&path, err.to_string()))?;
        debug!(path = %path, "library asset provisioned");
        self.libraries.insert(path);
        Ok(true)
    }
}

impl<S: Storage> Storage for TrackedFs<S> {
    fn name(&self) -> &'static str {
        "tracked"
    }

    fn read_file(&self, path: &str) -> Result<String> {
        let content = self.inner.read_file(path)?;
        let path = vpath::normalize(path);
        if self.libraries.remove(&path) {
            debug!(path = %path, "library asset consumed");
        }
        Ok(content)
    }

    fn write_file(&self, path: &str, content: &str, write_byte_order_mark: bool) -> Result<()> {
        self.inner.write_file(path, content, write_byte_order_mark)?;
        self.written.insert(vpath::normalize(path));
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.inner.remove(path)
    }

    fn stat(&self, path: &str) -> Result<FileInfo> {
        self.inner.stat(path)
    }

    fn chtimes(&self, path: &str, atime: Option<Timestamp>, mtime: Timestamp) -> Result<()> {
        self.inner.chtimes(path, atime, mtime)
    }

    fn walk_dir(&self, root: &str) -> Result<Vec<WalkEntry>> {
        self.inner.walk_dir(root)
    }
}
