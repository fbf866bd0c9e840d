use std::collections::BTreeMap;
use std::sync::Arc;

use buildsnap_error::{Result, SnapError};
use buildsnap_types::{EntryKind, MonotonicClock, Timestamp};
use parking_lot::RwLock;

use crate::traits::{FileInfo, Storage, WalkEntry};
use crate::vpath;

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// One node of the in-memory tree.
#[derive(Debug, Clone)]
struct Node {
    kind: EntryKind,
    data: String,
    mtime: Timestamp,
    atime: Timestamp,
}

impl Node {
    fn directory(now: Timestamp) -> Self {
        Self {
            kind: EntryKind::Directory,
            data: String::new(),
            mtime: now,
            atime: now,
        }
    }
}

/// An in-memory store keyed by normalized absolute path.
///
/// Directories are materialized implicitly by writes. Every mutation stamps
/// the touched node with a fresh tick of the shared [`MonotonicClock`], so
/// the order of modification times equals the order of writes.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    clock: Arc<MonotonicClock>,
    nodes: Arc<RwLock<BTreeMap<String, Node>>>,
}

impl MemoryStore {
    /// Create an empty store containing only `/`.
    pub fn new(clock: Arc<MonotonicClock>) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(vpath::ROOT.to_owned(), Node::directory(clock.now()));
        Self {
            clock,
            nodes: Arc::new(RwLock::new(nodes)),
        }
    }

    /// The clock this store stamps modification times with.
    pub fn clock(&self) -> &Arc<MonotonicClock> {
        &self.clock
    }

    /// Number of regular files currently stored.
    pub fn file_count(&self) -> usize {
        self.nodes
            .read()
            .values()
            .filter(|node| node.kind == EntryKind::File)
            .count()
    }

    fn walk_into(nodes: &BTreeMap<String, Node>, dir: &str, out: &mut Vec<WalkEntry>) {
        let prefix = vpath::child_prefix(dir);
        let children: Vec<(&String, EntryKind)> = nodes
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| {
                let rest = &path[prefix.len()..];
                !rest.is_empty() && !rest.contains('/')
            })
            .map(|(path, node)| (path, node.kind))
            .collect();
        for (path, kind) in children {
            out.push(WalkEntry {
                path: path.clone(),
                kind,
            });
            if kind == EntryKind::Directory {
                Self::walk_into(nodes, path, out);
            }
        }
    }
}

impl Storage for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read_file(&self, path: &str) -> Result<String> {
        let path = vpath::normalize(path);
        let nodes = self.nodes.read();
        match nodes.get(&path) {
            Some(node) if node.kind == EntryKind::File => Ok(node
                .data
                .strip_prefix(BYTE_ORDER_MARK)
                .unwrap_or(&node.data)
                .to_owned()),
            Some(_) => Err(SnapError::IsADirectory { path }),
            None => Err(SnapError::NotFound { path }),
        }
    }

    #[allow(clippy::significant_drop_tightening)]
    fn write_file(&self, path: &str, content: &str, write_byte_order_mark: bool) -> Result<()> {
        let path = vpath::normalize(path);
        if path == vpath::ROOT {
            return Err(SnapError::IsADirectory { path });
        }
        let mut nodes = self.nodes.write();
        for dir in vpath::ancestors(&path) {
            match nodes.get(dir) {
                Some(node) if node.kind == EntryKind::File => {
                    return Err(SnapError::NotADirectory {
                        path: dir.to_owned(),
                    });
                }
                Some(_) => {}
                None => {
                    nodes.insert(dir.to_owned(), Node::directory(self.clock.tick()));
                }
            }
        }
        if matches!(nodes.get(&path), Some(node) if node.kind == EntryKind::Directory) {
            return Err(SnapError::IsADirectory { path });
        }

        let mut data = String::with_capacity(content.len() + BYTE_ORDER_MARK.len_utf8());
        if write_byte_order_mark {
            data.push(BYTE_ORDER_MARK);
        }
        data.push_str(content);
        let now = self.clock.tick();
        nodes.insert(
            path,
            Node {
                kind: EntryKind::File,
                data,
                mtime: now,
                atime: now,
            },
        );
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        let path = vpath::normalize(path);
        if path == vpath::ROOT {
            return Err(SnapError::IsADirectory { path });
        }
        let mut nodes = self.nodes.write();
        if nodes.remove(&path).is_none() {
            return Err(SnapError::NotFound { path });
        }
        let prefix = vpath::child_prefix(&path);
        nodes.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    fn stat(&self, path: &str) -> Result<FileInfo> {
        let path = vpath::normalize(path);
        let nodes = self.nodes.read();
        let node = nodes
            .get(&path)
            .ok_or(SnapError::NotFound { path: path.clone() })?;
        Ok(FileInfo {
            kind: node.kind,
            size: node.data.len() as u64,
            mtime: node.mtime,
            atime: node.atime,
        })
    }

    fn chtimes(&self, path: &str, atime: Option<Timestamp>, mtime: Timestamp) -> Result<()> {
        let path = vpath::normalize(path);
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(&path)
            .ok_or(SnapError::NotFound { path: path.clone() })?;
        node.mtime = mtime;
        if let Some(atime) = atime {
            node.atime = atime;
        }
        Ok(())
    }

    fn walk_dir(&self, root: &str) -> Result<Vec<WalkEntry>> {
        let root = vpath::normalize(root);
        let nodes = self.nodes.read();
        let kind = nodes
            .get(&root)
            .map(|node| node.kind)
            .ok_or(SnapError::NotFound { path: root.clone() })?;
        let mut out = vec![WalkEntry {
            path: root.clone(),
            kind,
        }];
        if kind == EntryKind::Directory {
            Self::walk_into(&nodes, &root, &mut out);
        }
        Ok(out)
    }
}
