//! Generation snapshots and the storage diff report.
//!
//! At every generation boundary the engine walks the whole store, records a
//! [`DiffEntry`] per regular file and classifies each path against the
//! previous [`Snapshot`] with an explicit, ordered rule table
//! ([`DIFF_RULES`]). The first rule that matches decides the
//! [`DiffReason`]; a path no rule matches is unchanged and stays silent.
//!
//! Captures read through the *untracked* store so that snapshotting never
//! consumes library paths or counts as a write.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use buildsnap_error::{Result, SnapError};
use buildsnap_types::{DiffReason, Timestamp};
use buildsnap_vfs::{PathSet, Storage, TrackedFs, vpath};
use tracing::{debug, info};
use xxhash_rust::xxh3::Xxh3;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable record of one regular file at a generation boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub content: String,
    pub mtime: Timestamp,
    pub is_written: bool,
}

/// Complete state of the store at a generation boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, DiffEntry>,
    libraries: BTreeSet<String>,
}

impl Snapshot {
    pub fn entries(&self) -> &BTreeMap<String, DiffEntry> {
        &self.entries
    }

    pub fn get(&self, path: &str) -> Option<&DiffEntry> {
        self.entries.get(path)
    }

    /// Library paths as of this boundary.
    pub fn libraries(&self) -> &BTreeSet<String> {
        &self.libraries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Order-stable digest of paths, contents, modification times and the
    /// library set. Write flags are excluded.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh3::new();
        for (path, entry) in &self.entries {
            hasher.update(path.as_bytes());
            hasher.update(&[0]);
            hasher.update(entry.content.as_bytes());
            hasher.update(&[0]);
            hasher.update(&entry.mtime.as_millis().to_le_bytes());
        }
        hasher.update(b"\xfflibraries");
        for path in &self.libraries {
            hasher.update(path.as_bytes());
            hasher.update(&[0]);
        }
        hasher.digest()
    }
}

// ---------------------------------------------------------------------------
// Classification rules
// ---------------------------------------------------------------------------

/// Everything a rule may look at for one path.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub path: &'a str,
    pub previous: Option<&'a DiffEntry>,
    pub current: Option<&'a DiffEntry>,
    /// Library set of the previous snapshot; `None` before the first capture.
    pub previous_libraries: Option<&'a BTreeSet<String>>,
    /// Library set at capture time.
    pub current_libraries: &'a BTreeSet<String>,
}

impl Transition<'_> {
    fn both(&self) -> Option<(&DiffEntry, &DiffEntry)> {
        self.previous.zip(self.current)
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct DiffRule {
    pub reason: DiffReason,
    pub matches: fn(&Transition<'_>) -> bool,
}

fn is_new(t: &Transition<'_>) -> bool {
    t.previous.is_none() && t.current.is_some() && !t.current_libraries.contains(t.path)
}

fn is_deleted(t: &Transition<'_>) -> bool {
    t.previous.is_some() && t.current.is_none()
}

fn is_modified(t: &Transition<'_>) -> bool {
    matches!(t.both(), Some((old, new)) if old.content != new.content)
}

fn is_rewritten(t: &Transition<'_>) -> bool {
    t.both().is_some_and(|(_, new)| new.is_written)
}

fn is_mtime_changed(t: &Transition<'_>) -> bool {
    t.both().is_some_and(|(old, new)| old.mtime != new.mtime)
}

/// A path that was a library at the last boundary and has since been read.
fn is_library_consumed(t: &Transition<'_>) -> bool {
    match t.previous_libraries {
        Some(previous) if t.both().is_some() => {
            previous.contains(t.path) && !t.current_libraries.contains(t.path)
        }
        _ => false,
    }
}

/// Classification precedence, first match wins.
pub const DIFF_RULES: [DiffRule; 6] = [
    DiffRule {
        reason: DiffReason::New,
        matches: is_new,
    },
    DiffRule {
        reason: DiffReason::Deleted,
        matches: is_deleted,
    },
    DiffRule {
        reason: DiffReason::Modified,
        matches: is_modified,
    },
    DiffRule {
        reason: DiffReason::RewrittenSameContent,
        matches: is_rewritten,
    },
    DiffRule {
        reason: DiffReason::MtimeChanged,
        matches: is_mtime_changed,
    },
    DiffRule {
        reason: DiffReason::LibraryFileConsumed,
        matches: is_library_consumed,
    },
];

/// Classify one transition; `None` means unchanged.
pub fn classify(transition: &Transition<'_>) -> Option<DiffReason> {
    DIFF_RULES
        .iter()
        .find(|rule| (rule.matches)(transition))
        .map(|rule| rule.reason)
}

// ---------------------------------------------------------------------------
// Diff report
// ---------------------------------------------------------------------------

/// One reported path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    pub path: String,
    pub reason: DiffReason,
    /// Current content, present only for reasons that carry it.
    pub content: Option<String>,
}

/// Diff of one generation boundary, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    records: Vec<DiffRecord>,
}

impl DiffReport {
    pub fn records(&self) -> &[DiffRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn reason_for(&self, path: &str) -> Option<DiffReason> {
        self.records
            .iter()
            .find(|record| record.path == path)
            .map(|record| record.reason)
    }

    /// Render as `//// [<path>] <tag>` blocks plus a trailing blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    pub fn render_into(&self, out: &mut String) {
        for record in &self.records {
            let _ = write!(out, "//// [{}] {}", record.path, record.reason.tag());
            if let Some(content) = &record.content {
                out.push('\n');
                out.push_str(content);
            }
            out.push('\n');
        }
        out.push('\n');
    }
}

/// Capture the store and diff it against `previous`.
///
/// `libraries` and `written` are read, never modified. A missing root is an
/// empty tree; any other walk, read or stat failure is returned.
pub fn capture<S: Storage + ?Sized>(
    store: &S,
    libraries: &PathSet,
    written: &PathSet,
    previous: Option<&Snapshot>,
) -> Result<(Snapshot, DiffReport)> {
    let walked = match store.walk_dir(vpath::ROOT) {
        Ok(entries) => entries,
        Err(err) if err.is_not_found() => Vec::new(),
        Err(err) => return Err(SnapError::walk_failed(vpath::ROOT, err.to_string())),
    };

    let mut entries = BTreeMap::new();
    for item in walked.into_iter().filter(|entry| entry.kind.is_regular()) {
        let Some(content) = store.read_if_exists(&item.path)? else {
            continue;
        };
        let info = store
            .stat(&item.path)
            .map_err(|_| SnapError::StatUnavailable {
                path: item.path.clone(),
            })?;
        let is_written = written.contains(&item.path);
        entries.insert(
            item.path,
            DiffEntry {
                content,
                mtime: info.mtime,
                is_written,
            },
        );
    }

    let current = Snapshot {
        entries,
        libraries: libraries.snapshot(),
    };

    let mut paths: BTreeSet<&str> = current.entries.keys().map(String::as_str).collect();
    if let Some(previous) = previous {
        paths.extend(previous.entries.keys().map(String::as_str));
    }

    let mut records = Vec::new();
    for path in paths {
        let transition = Transition {
            path,
            previous: previous.and_then(|snapshot| snapshot.get(path)),
            current: current.get(path),
            previous_libraries: previous.map(Snapshot::libraries),
            current_libraries: &current.libraries,
        };
        if let Some(reason) = classify(&transition) {
            debug!(path = path, reason = %reason, "storage diff");
            let content = transition
                .current
                .filter(|_| reason.carries_content())
                .map(|entry| entry.content.clone());
            records.push(DiffRecord {
                path: path.to_owned(),
                reason,
                content,
            });
        }
    }

    Ok((current, DiffReport { records }))
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Holds the previous snapshot across generations.
#[derive(Debug, Default)]
pub struct DiffEngine {
    previous: Option<Snapshot>,
    boundaries: u64,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot retained from the last boundary.
    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Number of boundaries captured so far.
    pub fn boundaries(&self) -> u64 {
        self.boundaries
    }

    /// Capture `fs`, diff against the retained snapshot, retain the new
    /// one and clear the written set.
    pub fn diff<S: Storage>(&mut self, fs: &TrackedFs<S>) -> Result<DiffReport> {
        let previous = self.previous.as_ref();
        let (snapshot, report) = capture(fs.inner(), fs.libraries(), fs.written(), previous)?;
        info!(
            boundary = self.boundaries,
            files = snapshot.len(),
            changed = report.len(),
            fingerprint = snapshot.fingerprint(),
            "generation snapshot captured"
        );
        self.previous = Some(snapshot);
        self.boundaries += 1;
        fs.reset_written();
        Ok(report)
    }
}
