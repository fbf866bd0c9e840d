//! Deterministic baseline harness for incremental build generations.
//!
//! A test builds a [`TestSys`], lets a [`Compiler`] run against it, and
//! captures each generation as normalized output, a storage diff and a
//! build-state report. The accumulated text is compared against a recorded
//! reference by [`BaselineStore`].
//!
//! Nothing here reads the host clock: modification times come from the
//! injected [`MonotonicClock`](buildsnap_types::MonotonicClock), and every
//! volatile value in compiler output is replaced with a placeholder.

pub mod baseline;
pub mod config;
pub mod logging;
pub mod normalize;
pub mod report;
pub mod scenario;
pub mod snapshot;
pub mod sys;

pub use baseline::BaselineStore;
pub use config::{BaselineConfig, BaselineMode, HarnessConfig};
pub use normalize::{NormalizeMode, Normalizer};
pub use report::{
    BuildProgram, BuildProgramSnapshot, CachedDiagnostics, SourceFile, WatchSession,
    report_programs,
};
pub use scenario::{Edit, Scenario, ScenarioRun, run_scenario, verify_scenario};
pub use snapshot::{DiffEngine, DiffEntry, DiffRecord, DiffReport, Snapshot};
pub use sys::{CompileOutcome, Compiler, System, TestSys};
