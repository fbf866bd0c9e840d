pub mod clock;

pub use clock::{DEFAULT_EPOCH, MonotonicClock, TICK};

use std::fmt;
use std::time::Duration;

/// A point in simulated time, in milliseconds since the Unix epoch.
///
/// Every modification time in the store is a `Timestamp` read from the
/// harness [`MonotonicClock`], never from the operating system.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch itself.
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Saturating addition of a duration.
    #[must_use]
    pub fn saturating_add(self, delta: Duration) -> Self {
        let millis = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Elapsed duration from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub fn duration_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Kind of entry yielded by a storage walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    #[inline]
    pub const fn is_regular(self) -> bool {
        matches!(self, Self::File)
    }
}

/// Why a storage path shows up in a generation's diff report.
///
/// Declaration order is the classification precedence: the first reason
/// whose rule matches wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum DiffReason {
    New,
    Deleted,
    Modified,
    RewrittenSameContent,
    MtimeChanged,
    LibraryFileConsumed,
}

impl DiffReason {
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Deleted,
        Self::Modified,
        Self::RewrittenSameContent,
        Self::MtimeChanged,
        Self::LibraryFileConsumed,
    ];

    /// Tag written after `//// [<path>] ` in the baseline.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::New => "*new* ",
            Self::Deleted => "*deleted*",
            Self::Modified => "*modified* ",
            Self::RewrittenSameContent => "*rewrite with same content*",
            Self::MtimeChanged => "*mTime changed*",
            Self::LibraryFileConsumed => "*Lib*",
        }
    }

    /// Whether the rendered block carries the file's current content.
    pub const fn carries_content(self) -> bool {
        matches!(self, Self::New | Self::Modified | Self::LibraryFileConsumed)
    }
}

impl fmt::Display for DiffReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().trim_end())
    }
}

/// How a source file's externally visible signature became known in a
/// generation. Reported by the compiler, consumed read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SignatureUpdateKind {
    /// Computed from the declaration output.
    ComputedDts,
    /// Stored while emitting.
    StoredAtEmit,
    /// Reused the prior version.
    UsedVersion,
}

impl SignatureUpdateKind {
    /// Fixed-width label used by the build-state report.
    pub const fn label(self) -> &'static str {
        match self {
            Self::ComputedDts => "(computed .d.ts)",
            Self::StoredAtEmit => "(stored at emit)",
            Self::UsedVersion => "(used version)  ",
        }
    }
}

/// Exit status reported by one compiler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum ExitStatus {
    #[default]
    Success,
    DiagnosticsPresentOutputsSkipped,
    DiagnosticsPresentOutputsGenerated,
    InvalidProjectOutputsSkipped,
    ProjectReferenceCycleOutputsSkipped,
    NotImplemented,
}

impl ExitStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::DiagnosticsPresentOutputsSkipped => "DiagnosticsPresentOutputsSkipped",
            Self::DiagnosticsPresentOutputsGenerated => "DiagnosticsPresentOutputsGenerated",
            Self::InvalidProjectOutputsSkipped => "InvalidProjectOutputsSkipped",
            Self::ProjectReferenceCycleOutputsSkipped => "ProjectReferenceCycleOutputsSkipped",
            Self::NotImplemented => "NotImplemented",
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
