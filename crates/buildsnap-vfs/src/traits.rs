use buildsnap_error::{Result, SnapError};
use buildsnap_types::{EntryKind, Timestamp};

/// Metadata returned by [`Storage::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub kind: EntryKind,
    pub size: u64,
    pub mtime: Timestamp,
    pub atime: Timestamp,
}

/// One path yielded by [`Storage::walk_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: String,
    pub kind: EntryKind,
}

/// A virtual storage capability over absolute POSIX-style paths.
///
/// This is the only surface through which the harness and the compiler
/// under test touch files. Implementations must take modification times
/// from an injected clock, never from the host.
pub trait Storage: Send + Sync {
    /// The name of this backend (e.g., "memory", "tracked").
    fn name(&self) -> &'static str;

    /// Read a file's full content.
    ///
    /// A leading byte-order marker is stripped. Returns
    /// [`SnapError::NotFound`] when the path is absent.
    fn read_file(&self, path: &str) -> Result<String>;

    /// Create or replace a file, creating parent directories as needed.
    ///
    /// When `write_byte_order_mark` is set the stored bytes are prefixed
    /// with U+FEFF.
    fn write_file(&self, path: &str, content: &str, write_byte_order_mark: bool) -> Result<()>;

    /// Remove a file, or a directory together with everything below it.
    fn remove(&self, path: &str) -> Result<()>;

    /// Metadata for `path`.
    fn stat(&self, path: &str) -> Result<FileInfo>;

    /// Set access and modification times. `atime == None` keeps the
    /// current access time.
    fn chtimes(&self, path: &str, atime: Option<Timestamp>, mtime: Timestamp) -> Result<()>;

    /// Depth-first, pre-order walk of everything at and below `root`, in
    /// byte order of entry names within each directory.
    ///
    /// Returns [`SnapError::NotFound`] if `root` does not exist.
    fn walk_dir(&self, root: &str) -> Result<Vec<WalkEntry>>;

    fn file_exists(&self, path: &str) -> bool {
        matches!(self.stat(path), Ok(info) if info.kind == EntryKind::File)
    }

    fn directory_exists(&self, path: &str) -> bool {
        matches!(self.stat(path), Ok(info) if info.kind == EntryKind::Directory)
    }

    /// Read a file, folding "does not exist" into `None`.
    fn read_if_exists(&self, path: &str) -> Result<Option<String>> {
        match self.read_file(path) {
            Ok(content) => Ok(Some(content)),
            Err(SnapError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read_file(&self, path: &str) -> Result<String> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &str, content: &str, write_byte_order_mark: bool) -> Result<()> {
        (**self).write_file(path, content, write_byte_order_mark)
    }

    fn remove(&self, path: &str) -> Result<()> {
        (**self).remove(path)
    }

    fn stat(&self, path: &str) -> Result<FileInfo> {
        (**self).stat(path)
    }

    fn chtimes(&self, path: &str, atime: Option<Timestamp>, mtime: Timestamp) -> Result<()> {
        (**self).chtimes(path, atime, mtime)
    }

    fn walk_dir(&self, root: &str) -> Result<Vec<WalkEntry>> {
        (**self).walk_dir(root)
    }
}
