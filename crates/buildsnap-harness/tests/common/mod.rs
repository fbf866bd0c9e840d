#![allow(dead_code)]

//! A small incremental "compiler" used to drive the harness end to end.
//!
//! It treats every `.ts` file under the current directory (excluding
//! `.d.ts`) as a source, reads the default library once sources exist,
//! emits `<name>.js` next to each source when its output changed and caches
//! per-file diagnostics across runs so identity comparisons mean something.
//!
//! Recognized arguments: `--force` (re-emit everything), `--listEmittedFiles`,
//! `--version`, `-w` (report through a watch session), `--noLib`.

use std::collections::BTreeMap;
use std::sync::Arc;

use buildsnap_harness::{
    BuildProgram, BuildProgramSnapshot, CachedDiagnostics, CompileOutcome, Compiler, HarnessConfig,
    SourceFile, System, TestSys, WatchSession,
};
use buildsnap_types::{EntryKind, ExitStatus, SignatureUpdateKind, Timestamp};

pub const LIVE_VERSION: &str = "7.0.0-dev.20250101";

pub fn config() -> HarnessConfig {
    HarnessConfig {
        live_version: LIVE_VERSION.to_owned(),
        ..HarnessConfig::default()
    }
}

pub fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|arg| (*arg).to_owned()).collect()
}

pub fn sys_with(files: &[(&str, &str)]) -> TestSys {
    buildsnap_harness::logging::init_test_logging();
    TestSys::new(config(), files.iter().copied())
        .expect("test system should build")
}

/// `hh:mm:ss AM` for a simulated timestamp.
pub fn clock_face(at: Timestamp) -> String {
    let seconds_of_day = (at.as_millis() / 1000) % 86_400;
    let hour = seconds_of_day / 3600;
    let minute = (seconds_of_day / 60) % 60;
    let second = seconds_of_day % 60;
    let (display_hour, meridiem) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!("{display_hour:02}:{minute:02}:{second:02} {meridiem}")
}

/// The error reported for a source line containing `error`.
pub fn diagnostic(path: &str, line: usize) -> String {
    format!("{path}({line},1): error TS1000: found error")
}

pub struct CurrentProgram(pub Option<Arc<dyn BuildProgram>>);

impl WatchSession for CurrentProgram {
    fn current_program(&self) -> Option<Arc<dyn BuildProgram>> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct FakeCompiler {
    /// Source content and diagnostics cached by the previous run.
    cache: BTreeMap<String, (String, CachedDiagnostics)>,
    pub runs: usize,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn sources(sys: &dyn System) -> Vec<String> {
        let cwd = sys.current_directory();
        match sys.fs().walk_dir(cwd) {
            Ok(entries) => entries
                .into_iter()
                .filter(|entry| entry.kind == EntryKind::File)
                .map(|entry| entry.path)
                .filter(|path| {
                    std::path::Path::new(path)
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("ts"))
                        && !path.ends_with(".d.ts")
                })
                .collect(),
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => panic!("source walk failed: {err}"),
        }
    }
}

impl Compiler for FakeCompiler {
    fn run(&mut self, sys: &dyn System, args: &[String]) -> CompileOutcome {
        self.runs += 1;
        let has = |flag: &str| args.iter().any(|arg| arg == flag);
        let watch = has("-w");

        if has("--version") {
            sys.write_output(&format!("Version {LIVE_VERSION}\n"));
        }
        if watch {
            sys.write_output(&format!(
                "[\u{1b}[90m{}\u{1b}[0m] Starting compilation in watch mode...\n\n",
                clock_face(sys.now())
            ));
        } else {
            sys.write_output(&format!("build starting at {}\n", clock_face(sys.now())));
        }

        let sources = Self::sources(sys);
        let mut program = BuildProgramSnapshot::new();
        let config_path = format!("{}/tsconfig.json", sys.current_directory());
        if sys.fs().file_exists(&config_path) {
            program = program.with_config_file_path(config_path);
        }

        if !sources.is_empty() && !has("--noLib") {
            let lib = format!("{}/lib.d.ts", sys.default_library_path());
            if sys.fs().read_file(&lib).is_ok() {
                program = program.with_source_file(SourceFile::new(&lib, &lib));
            }
        }

        let mut next_cache = BTreeMap::new();
        let mut emitted = Vec::new();
        let mut listed = Vec::new();
        let mut errors = 0_usize;
        for path in &sources {
            let content = sys.fs().read_file(path).expect("source should be readable");
            let prior = self.cache.get(path);
            let changed = prior.is_none_or(|(old, _)| *old != content);
            let diagnostics = match prior {
                Some((old, cached)) if *old == content => cached.clone(),
                _ => {
                    let messages: Vec<String> = content
                        .lines()
                        .enumerate()
                        .filter(|(_, line)| line.contains("error"))
                        .map(|(index, _)| diagnostic(path, index + 1))
                        .collect();
                    CachedDiagnostics::new(messages)
                }
            };
            for message in diagnostics.messages() {
                sys.write_output(message);
                sys.write_output("\n");
            }
            errors += diagnostics.messages().len();

            program = program
                .with_source_file(SourceFile::new(path, path))
                .with_diagnostics(path, diagnostics.clone());
            if let Some((_, before)) = prior {
                program = program.with_prior_diagnostics(path, before.clone());
            }
            if changed {
                program = program.with_signature(path, SignatureUpdateKind::ComputedDts);
            }

            let out_path = format!("{}.js", path.trim_end_matches(".ts"));
            let out_content = format!("\"use strict\";\n{content}");
            let current = sys.fs().read_if_exists(&out_path).expect("output lookup");
            if has("--force") || current.as_deref() != Some(out_content.as_str()) {
                sys.fs()
                    .write_file(&out_path, &out_content, false)
                    .expect("emit should succeed");
                emitted.push(out_path.clone());
            }
            listed.push(out_path);
            next_cache.insert(path.clone(), (content, diagnostics));
        }
        self.cache = next_cache;

        if has("--listEmittedFiles") {
            for path in &listed {
                sys.write_output(&format!("TSFILE:  {path}\n"));
            }
            sys.write_output("\n");
        }

        if watch {
            sys.write_output(&format!(
                "{} - Found {errors} errors. Watching for file changes.\n",
                clock_face(sys.now())
            ));
        } else {
            sys.write_output(&format!(
                "build finished in {}ms\n",
                sys.since_start().as_millis()
            ));
        }

        let program: Arc<dyn BuildProgram> = Arc::new(program);
        let session: Arc<dyn WatchSession> = Arc::new(CurrentProgram(Some(Arc::clone(&program))));
        let programs = if watch { Vec::new() } else { vec![program] };
        CompileOutcome {
            exit_status: if errors == 0 {
                ExitStatus::Success
            } else {
                ExitStatus::DiagnosticsPresentOutputsGenerated
            },
            emitted_files: emitted,
            programs,
            watch: watch.then_some(session),
        }
    }
}
