//! Build-state report: which files had their diagnostics recomputed and how
//! each signature became known in this generation.
//!
//! The report is diagnostic text only. It reads program state through the
//! [`BuildProgram`] seam and never mutates anything.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use buildsnap_types::SignatureUpdateKind;

pub const REFRESH_PREFIX: &str = "*refresh*    ";
pub const NOT_CACHED_PREFIX: &str = "*not cached* ";

/// A cached semantic-diagnostics entry.
///
/// Equality is identity: two handles are "the same" only when they point at
/// the same allocation, mirroring a cache that either kept or replaced its
/// entry.
#[derive(Clone, Default)]
pub struct CachedDiagnostics(Arc<Vec<String>>);

impl CachedDiagnostics {
    pub fn new(messages: Vec<String>) -> Self {
        Self(Arc::new(messages))
    }

    pub fn same_entry(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Debug for CachedDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedDiagnostics")
            .field("ptr", &Arc::as_ptr(&self.0))
            .field("messages", &self.0.len())
            .finish()
    }
}

/// One source file known to a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Stable key used for cache lookups.
    pub path: String,
    /// Name shown in the report.
    pub file_name: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
        }
    }
}

/// Read-only view of one compiled program, as reported by the compiler.
pub trait BuildProgram: Send + Sync {
    fn config_file_path(&self) -> Option<&str>;

    /// Source files in the program's own order.
    fn source_files(&self) -> &[SourceFile];

    /// Diagnostics cached for `path` in this generation.
    fn semantic_diagnostics(&self, path: &str) -> Option<CachedDiagnostics>;

    /// Diagnostics cached for `path` in the previous generation.
    fn prior_semantic_diagnostics(&self, path: &str) -> Option<CachedDiagnostics>;

    fn signature_update(&self, path: &str) -> Option<SignatureUpdateKind>;
}

/// A long-lived session whose current program supersedes any returned list.
pub trait WatchSession: Send + Sync {
    fn current_program(&self) -> Option<Arc<dyn BuildProgram>>;
}

/// Plain-data [`BuildProgram`] built by compilers that keep no richer state.
#[derive(Debug, Clone, Default)]
pub struct BuildProgramSnapshot {
    config_file_path: Option<String>,
    source_files: Vec<SourceFile>,
    diagnostics: BTreeMap<String, CachedDiagnostics>,
    prior_diagnostics: BTreeMap<String, CachedDiagnostics>,
    signatures: BTreeMap<String, SignatureUpdateKind>,
}

impl BuildProgramSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config_file_path(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_source_file(mut self, file: SourceFile) -> Self {
        self.source_files.push(file);
        self
    }

    #[must_use]
    pub fn with_diagnostics(
        mut self,
        path: impl Into<String>,
        diagnostics: CachedDiagnostics,
    ) -> Self {
        self.diagnostics.insert(path.into(), diagnostics);
        self
    }

    #[must_use]
    pub fn with_prior_diagnostics(
        mut self,
        path: impl Into<String>,
        diagnostics: CachedDiagnostics,
    ) -> Self {
        self.prior_diagnostics.insert(path.into(), diagnostics);
        self
    }

    #[must_use]
    pub fn with_signature(mut self, path: impl Into<String>, kind: SignatureUpdateKind) -> Self {
        self.signatures.insert(path.into(), kind);
        self
    }
}

impl BuildProgram for BuildProgramSnapshot {
    fn config_file_path(&self) -> Option<&str> {
        self.config_file_path.as_deref()
    }

    fn source_files(&self) -> &[SourceFile] {
        &self.source_files
    }

    fn semantic_diagnostics(&self, path: &str) -> Option<CachedDiagnostics> {
        self.diagnostics.get(path).cloned()
    }

    fn prior_semantic_diagnostics(&self, path: &str) -> Option<CachedDiagnostics> {
        self.prior_diagnostics.get(path).cloned()
    }

    fn signature_update(&self, path: &str) -> Option<SignatureUpdateKind> {
        self.signatures.get(path).copied()
    }
}

/// Render the report for `programs`, or for the watch session's current
/// program when one is supplied.
pub fn report_programs(
    programs: &[Arc<dyn BuildProgram>],
    watch: Option<&dyn WatchSession>,
) -> String {
    let watched;
    let programs: Vec<Option<&dyn BuildProgram>> = match watch {
        Some(session) => {
            watched = session.current_program();
            vec![watched.as_deref()]
        }
        None => programs.iter().map(|program| Some(&**program)).collect(),
    };

    let mut out = String::new();
    for (index, program) in programs.into_iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        if let Some(program) = program {
            report_program(&mut out, program);
        }
    }
    out
}

fn report_program(out: &mut String, program: &dyn BuildProgram) {
    if let Some(config) = program.config_file_path().filter(|path| !path.is_empty()) {
        out.push_str(config);
        out.push_str("::\n");
    }

    out.push_str("SemanticDiagnostics::\n");
    for file in program.source_files() {
        match program.semantic_diagnostics(&file.path) {
            Some(current) => {
                let unchanged = program
                    .prior_semantic_diagnostics(&file.path)
                    .is_some_and(|prior| prior.same_entry(&current));
                if !unchanged {
                    out.push_str(REFRESH_PREFIX);
                    out.push_str(&file.file_name);
                    out.push('\n');
                }
            }
            None => {
                out.push_str(NOT_CACHED_PREFIX);
                out.push_str(&file.file_name);
                out.push('\n');
            }
        }
    }

    out.push_str("Signatures::\n");
    for file in program.source_files() {
        if let Some(kind) = program.signature_update(&file.path) {
            out.push_str(kind.label());
            out.push(' ');
            out.push_str(&file.file_name);
            out.push('\n');
        }
    }
}
