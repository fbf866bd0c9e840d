use thiserror::Error;

/// Primary error type for buildsnap operations.
///
/// Variants are structured so that the offending path always travels with
/// the failure. The harness driver turns most of these into test-terminating
/// panics; see [`SnapError::class`].
#[derive(Error, Debug)]
pub enum SnapError {
    // === Storage Errors ===
    /// Path does not exist in the store.
    #[error("no such file or directory: '{path}'")]
    NotFound { path: String },

    /// A file operation targeted a directory.
    #[error("is a directory: '{path}'")]
    IsADirectory { path: String },

    /// A path component that must be a directory is a regular file.
    #[error("not a directory: '{path}'")]
    NotADirectory { path: String },

    /// The store rejected a write.
    #[error("write to '{path}' failed: {detail}")]
    WriteFailed { path: String, detail: String },

    /// A path that was just written reports no metadata.
    #[error("stat unavailable for '{path}' after successful write")]
    StatUnavailable { path: String },

    /// Depth-first walk aborted.
    #[error("walk failed at '{path}': {detail}")]
    WalkFailed { path: String, detail: String },

    // === Mutator Errors ===
    /// A test mutator referenced a path that is not in the store.
    #[error("{operation}: file not found: '{path}'")]
    MutationTargetMissing {
        operation: &'static str,
        path: String,
    },

    // === Baseline Errors ===
    /// Freshly produced baseline differs from the recorded reference.
    #[error("baseline '{name}' differs at line {line}: expected {expected:?}, got {actual:?}")]
    BaselineMismatch {
        name: String,
        line: usize,
        expected: String,
        actual: String,
    },

    /// No reference baseline has been recorded yet.
    #[error("no reference baseline for '{name}' (local copy written to '{local}')")]
    MissingBaseline { name: String, local: String },

    // === Configuration Errors ===
    /// Configuration could not be loaded or is inconsistent.
    #[error("invalid harness configuration: {detail}")]
    Config { detail: String },

    // === Host Errors ===
    /// Host file I/O error (baseline store, config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse failure taxonomy used by the driver to decide between folding a
/// failure into an empty result and halting the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The test itself is malformed (missing mutation target, write failure).
    TestAuthoring,
    /// Absence that callers treat as an empty result.
    ExpectedAbsence,
    /// Storage misbehaved in a way that would make the capture misleading.
    UnexpectedStorage,
    /// Recorded and produced baselines disagree.
    Baseline,
    /// Harness bug.
    Internal,
}

impl SnapError {
    /// Map this error onto the failure taxonomy.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::ExpectedAbsence,
            Self::MutationTargetMissing { .. }
            | Self::WriteFailed { .. }
            | Self::StatUnavailable { .. }
            | Self::Config { .. } => ErrorClass::TestAuthoring,
            Self::IsADirectory { .. }
            | Self::NotADirectory { .. }
            | Self::WalkFailed { .. }
            | Self::Io(_) => ErrorClass::UnexpectedStorage,
            Self::BaselineMismatch { .. } | Self::MissingBaseline { .. } => ErrorClass::Baseline,
            Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Whether this is the "does not exist" condition.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the driver must halt the current test on this error.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self.class(), ErrorClass::ExpectedAbsence)
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MutationTargetMissing { .. } => {
                Some("Seed the file in the scenario's file map before editing it")
            }
            Self::MissingBaseline { .. } => {
                Some("Re-run with BUILDSNAP_ACCEPT=1 to record the reference baseline")
            }
            Self::BaselineMismatch { .. } => {
                Some("Inspect the local baseline; accept it with BUILDSNAP_ACCEPT=1 if intended")
            }
            Self::NotADirectory { .. } => Some("A parent path component is a regular file"),
            _ => None,
        }
    }

    /// Create a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a write failure.
    pub fn write_failed(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create a walk failure.
    pub fn walk_failed(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::WalkFailed {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create a missing-mutation-target error.
    pub fn mutation_target_missing(operation: &'static str, path: impl Into<String>) -> Self {
        Self::MutationTargetMissing {
            operation,
            path: path.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `SnapError`.
pub type Result<T> = std::result::Result<T, SnapError>;
