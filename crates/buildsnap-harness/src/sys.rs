//! The per-test harness context.
//!
//! [`TestSys`] owns the clock, the tracked store, the captured output and
//! the diff engine for exactly one test. It is what the compiler under test
//! sees (through [`System`]) and what the test drives between generations.
//!
//! Storage failures inside the harness are never folded into a partial
//! baseline. The `try_*` methods surface them as [`SnapError`]; the plain
//! methods turn them into a panic naming the operation and path, which is
//! how a malformed test reports itself.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use buildsnap_error::{Result, SnapError};
use buildsnap_types::{ExitStatus, MonotonicClock, Timestamp};
use buildsnap_vfs::{MemoryStore, PathSet, Storage, TrackedFs, vpath};
use parking_lot::Mutex;
use tracing::{error, info};

use crate::config::HarnessConfig;
use crate::normalize::{NormalizeMode, Normalizer};
use crate::report::{BuildProgram, WatchSession, report_programs};
use crate::snapshot::{DiffEngine, DiffReport, Snapshot};

// ---------------------------------------------------------------------------
// Compiler seam
// ---------------------------------------------------------------------------

/// The environment a compiler run sees.
pub trait System: Send + Sync {
    /// Tracked storage. Reads consume library paths, writes are recorded.
    fn fs(&self) -> &dyn Storage;

    /// Append text to the captured output stream.
    fn write_output(&self, text: &str);

    fn now(&self) -> Timestamp;

    fn since_start(&self) -> Duration;

    fn default_library_path(&self) -> &str;

    fn current_directory(&self) -> &str;
}

/// What one compiler invocation reports back.
#[derive(Default)]
pub struct CompileOutcome {
    pub exit_status: ExitStatus,
    /// Files written by this run; their modification times get reordered.
    pub emitted_files: Vec<String>,
    pub programs: Vec<Arc<dyn BuildProgram>>,
    pub watch: Option<Arc<dyn WatchSession>>,
}

impl CompileOutcome {
    pub fn new(exit_status: ExitStatus) -> Self {
        Self {
            exit_status,
            ..Self::default()
        }
    }
}

impl fmt::Debug for CompileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOutcome")
            .field("exit_status", &self.exit_status)
            .field("emitted_files", &self.emitted_files)
            .field("programs", &self.programs.len())
            .field("watch", &self.watch.is_some())
            .finish()
    }
}

/// An incremental compiler driven by the harness.
pub trait Compiler {
    fn run(&mut self, sys: &dyn System, args: &[String]) -> CompileOutcome;
}

// ---------------------------------------------------------------------------
// TestSys
// ---------------------------------------------------------------------------

#[track_caller]
fn fatal(operation: &str, err: &SnapError) -> ! {
    error!(operation, error = %err, class = ?err.class(), "fatal harness error");
    // Mutation errors already name their operation.
    let message = match err {
        SnapError::MutationTargetMissing { .. } => err.to_string(),
        _ => format!("{operation}: {err}"),
    };
    match err.suggestion() {
        Some(hint) => panic!("{message} (hint: {hint})"),
        None => panic!("{message}"),
    }
}

/// Per-test harness context.
pub struct TestSys {
    config: HarnessConfig,
    clock: Arc<MonotonicClock>,
    fs: TrackedFs<MemoryStore>,
    output: Mutex<String>,
    engine: DiffEngine,
    normalizer: Normalizer,
    runs: u64,
}

impl fmt::Debug for TestSys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSys")
            .field("cwd", &self.config.current_directory)
            .field("now", &self.clock.now())
            .field("files", &self.fs.inner().file_count())
            .field("boundaries", &self.engine.boundaries())
            .field("runs", &self.runs)
            .finish_non_exhaustive()
    }
}

impl TestSys {
    /// Build a context seeded with `files`.
    ///
    /// Relative paths resolve against the configured current directory.
    /// Seeding is not tracked as writing. Library assets the files do not
    /// already provide are provisioned afterwards.
    pub fn new<I, P, C>(config: HarnessConfig, files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: AsRef<str>,
    {
        config.validate()?;
        let clock = Arc::new(MonotonicClock::new(config.epoch()));
        let store = MemoryStore::new(Arc::clone(&clock));
        for (path, content) in files {
            let path = vpath::resolve(&config.current_directory, path.as_ref());
            store
                .write_file(&path, content.as_ref(), false)
                .map_err(|err| SnapError::write_failed(&path, err.to_string()))?;
        }

        let fs = TrackedFs::new(store);
        let mut provisioned = 0_usize;
        for asset in config.library_asset_paths() {
            if fs.provision_library(&asset, &config.default_library_content)? {
                provisioned += 1;
            }
        }
        info!(
            cwd = %config.current_directory,
            files = fs.inner().file_count(),
            provisioned,
            epoch = %config.epoch(),
            "test system created"
        );

        let normalizer = Normalizer::new(config.live_version.clone(), config.fake_version.clone());
        Ok(Self {
            config,
            clock,
            fs,
            output: Mutex::new(String::new()),
            engine: DiffEngine::new(),
            normalizer,
            runs: 0,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<MonotonicClock> {
        &self.clock
    }

    pub fn tracked_fs(&self) -> &TrackedFs<MemoryStore> {
        &self.fs
    }

    pub fn libraries(&self) -> &PathSet {
        self.fs.libraries()
    }

    pub fn written(&self) -> &PathSet {
        self.fs.written()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Snapshot retained from the last generation boundary.
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.engine.previous()
    }

    fn resolve(&self, path: &str) -> String {
        vpath::resolve(&self.config.current_directory, path)
    }

    /// Current content of `path`, read without consuming library status.
    pub fn read_file(&self, path: &str) -> Option<String> {
        let path = self.resolve(path);
        match self.fs.inner().read_if_exists(&path) {
            Ok(content) => content,
            Err(err) => fatal("read_file", &err),
        }
    }

    // --- mutators --------------------------------------------------------

    pub fn try_write_file(
        &self,
        path: &str,
        content: &str,
        write_byte_order_mark: bool,
    ) -> Result<()> {
        let path = self.resolve(path);
        self.fs
            .write_file(&path, content, write_byte_order_mark)
            .map_err(|err| SnapError::write_failed(&path, err.to_string()))?;
        self.fs
            .inner()
            .stat(&path)
            .map_err(|_| SnapError::StatUnavailable { path })?;
        Ok(())
    }

    fn existing_content(&self, operation: &'static str, path: &str) -> Result<String> {
        self.fs
            .inner()
            .read_if_exists(path)?
            .ok_or_else(|| SnapError::mutation_target_missing(operation, path))
    }

    /// Replace the first occurrence of `old_text`.
    pub fn try_replace_file_text(&self, path: &str, old_text: &str, new_text: &str) -> Result<()> {
        let path = self.resolve(path);
        let content = self.existing_content("replace_file_text", &path)?;
        let content = content.replacen(old_text, new_text, 1);
        self.try_write_file(&path, &content, false)
    }

    pub fn try_append_file(&self, path: &str, text: &str) -> Result<()> {
        let path = self.resolve(path);
        let mut content = self.existing_content("append_file", &path)?;
        content.push_str(text);
        self.try_write_file(&path, &content, false)
    }

    pub fn try_prepend_file(&self, path: &str, text: &str) -> Result<()> {
        let path = self.resolve(path);
        let content = self.existing_content("prepend_file", &path)?;
        self.try_write_file(&path, &format!("{text}{content}"), false)
    }

    pub fn try_remove_file(&self, path: &str) -> Result<()> {
        let path = self.resolve(path);
        if self.fs.inner().stat(&path).is_err() {
            return Err(SnapError::mutation_target_missing("remove_file", path));
        }
        self.fs.remove(&path)
    }

    #[track_caller]
    pub fn write_file(&self, path: &str, content: &str, write_byte_order_mark: bool) {
        if let Err(err) = self.try_write_file(path, content, write_byte_order_mark) {
            fatal("write_file", &err);
        }
    }

    #[track_caller]
    pub fn replace_file_text(&self, path: &str, old_text: &str, new_text: &str) {
        if let Err(err) = self.try_replace_file_text(path, old_text, new_text) {
            fatal("replace_file_text", &err);
        }
    }

    #[track_caller]
    pub fn append_file(&self, path: &str, text: &str) {
        if let Err(err) = self.try_append_file(path, text) {
            fatal("append_file", &err);
        }
    }

    #[track_caller]
    pub fn prepend_file(&self, path: &str, text: &str) {
        if let Err(err) = self.try_prepend_file(path, text) {
            fatal("prepend_file", &err);
        }
    }

    #[track_caller]
    pub fn remove_file(&self, path: &str) {
        if let Err(err) = self.try_remove_file(path) {
            fatal("remove_file", &err);
        }
    }

    // --- generations -----------------------------------------------------

    /// Run the compiler once and reorder the modification times of every
    /// file it emitted.
    pub fn run_compiler(&mut self, compiler: &mut dyn Compiler, args: &[String]) -> CompileOutcome {
        self.runs += 1;
        info!(run = self.runs, args = ?args, "compiler run starting");
        let outcome = compiler.run(&*self, args);
        self.on_emitted_files(&outcome.emitted_files);
        info!(
            run = self.runs,
            exit_status = %outcome.exit_status,
            emitted = outcome.emitted_files.len(),
            programs = outcome.programs.len(),
            "compiler run finished"
        );
        outcome
    }

    pub fn try_stamp_emitted(&self, paths: &[String]) -> Result<()> {
        for path in paths {
            let path = self.resolve(path);
            let stamp = self.clock.tick();
            self.fs.inner().chtimes(&path, None, stamp)?;
        }
        Ok(())
    }

    /// Give every emitted file a fresh, strictly increasing stamp.
    #[track_caller]
    pub fn on_emitted_files(&self, paths: &[String]) {
        if let Err(err) = self.try_stamp_emitted(paths) {
            fatal("stamp emitted file", &err);
        }
    }

    /// Capture a generation boundary.
    pub fn try_diff(&mut self) -> Result<DiffReport> {
        self.engine.diff(&self.fs)
    }

    #[track_caller]
    pub fn diff(&mut self) -> DiffReport {
        match self.try_diff() {
            Ok(report) => report,
            Err(err) => fatal("storage diff", &err),
        }
    }

    // --- output ----------------------------------------------------------

    pub fn raw_output(&self) -> String {
        self.output.lock().clone()
    }

    pub fn output(&self, mode: NormalizeMode) -> String {
        self.normalizer.normalize(&self.output.lock(), mode)
    }

    /// Output with every volatile line removed, for comparing two runs.
    pub fn output_for_comparison(&self) -> String {
        self.output(NormalizeMode::Compare)
    }

    pub fn clear_output(&self) {
        self.output.lock().clear();
    }

    // --- baseline sections -----------------------------------------------

    pub fn baseline_output(&self, doc: &mut String) {
        doc.push_str("\nOutput::\n");
        doc.push_str(&self.output(NormalizeMode::Record));
    }

    #[track_caller]
    pub fn baseline_fs_diff(&mut self, doc: &mut String) {
        self.diff().render_into(doc);
    }

    /// Output section followed by the storage diff.
    #[track_caller]
    pub fn serialize_state(&mut self, doc: &mut String) {
        self.baseline_output(doc);
        self.baseline_fs_diff(doc);
    }

    pub fn baseline_programs(&self, doc: &mut String, outcome: &CompileOutcome) {
        let report = report_programs(&outcome.programs, outcome.watch.as_deref());
        doc.push_str(&report);
    }
}

impl System for TestSys {
    fn fs(&self) -> &dyn Storage {
        &self.fs
    }

    fn write_output(&self, text: &str) {
        self.output.lock().push_str(text);
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn since_start(&self) -> Duration {
        self.clock.since_start()
    }

    fn default_library_path(&self) -> &str {
        &self.config.library_path
    }

    fn current_directory(&self) -> &str {
        &self.config.current_directory
    }
}
