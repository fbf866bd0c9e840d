//! Multi-generation scenarios.
//!
//! A [`Scenario`] seeds a store, runs the compiler once, then applies each
//! [`Edit`] followed by another run. Every step appends to one baseline
//! document:
//!
//! ```text
//! currentDirectory::<cwd>
//! useCaseSensitiveFileNames::<bool>
//! Input::
//! <initial diff>
//! <command> <args...>
//! ExitStatus:: <status>
//! Output::
//! <normalized output>
//! <diff>
//! <build-state report>
//!
//! Edit [0]:: <caption>
//! <diff after edit>
//! <command> <args...>
//! ...
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use buildsnap_error::Result;
use tracing::info;

use crate::baseline::BaselineStore;
use crate::config::HarnessConfig;
use crate::sys::{Compiler, TestSys};

/// Storage change applied before a follow-up run.
pub type EditFn = Box<dyn Fn(&mut TestSys)>;

/// One follow-up generation.
pub struct Edit {
    pub caption: String,
    /// Replaces the scenario's arguments for this run only.
    pub command_line_args: Option<Vec<String>>,
    pub edit: Option<EditFn>,
}

impl Edit {
    pub fn new(caption: impl Into<String>, edit: impl Fn(&mut TestSys) + 'static) -> Self {
        Self {
            caption: caption.into(),
            command_line_args: None,
            edit: Some(Box::new(edit)),
        }
    }

    /// Rebuild without touching storage.
    pub fn no_change() -> Self {
        Self {
            caption: "no change".to_owned(),
            command_line_args: None,
            edit: None,
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_line_args = Some(args.into_iter().map(Into::into).collect());
        self
    }
}

impl fmt::Debug for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edit")
            .field("caption", &self.caption)
            .field("command_line_args", &self.command_line_args)
            .field("edit", &self.edit.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct Scenario {
    /// Directory below the baseline roots.
    pub subfolder: String,
    pub name: String,
    pub command_line_args: Vec<String>,
    pub files: BTreeMap<String, String>,
    /// Overrides the configured current directory.
    pub cwd: Option<String>,
    pub edits: Vec<Edit>,
}

impl Scenario {
    pub fn new<I, S>(subfolder: impl Into<String>, name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subfolder: subfolder.into(),
            name: name.into(),
            command_line_args: args.into_iter().map(Into::into).collect(),
            files: BTreeMap::new(),
            cwd: None,
            edits: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn with_edit(mut self, edit: Edit) -> Self {
        self.edits.push(edit);
        self
    }

    /// File name of this scenario's baseline document.
    pub fn baseline_name(&self) -> String {
        format!("{}.js", self.name.replace(' ', "-"))
    }
}

/// A finished scenario: its document and the context it ran in.
#[derive(Debug)]
pub struct ScenarioRun {
    pub baseline: String,
    pub sys: TestSys,
}

fn command_line(config: &HarnessConfig, args: &[String]) -> String {
    let mut line = config.command_name.clone();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// One compiler run plus its document section.
fn run_generation(
    sys: &mut TestSys,
    doc: &mut String,
    compiler: &mut dyn Compiler,
    args: &[String],
) {
    sys.clear_output();
    doc.push_str(&command_line(sys.config(), args));
    doc.push('\n');
    let outcome = sys.run_compiler(compiler, args);
    let _ = write!(doc, "ExitStatus:: {}", outcome.exit_status);
    sys.serialize_state(doc);
    sys.baseline_programs(doc, &outcome);
}

/// Run every generation of `scenario` and build its baseline document.
pub fn run_scenario(
    config: &HarnessConfig,
    scenario: &Scenario,
    compiler: &mut dyn Compiler,
) -> Result<ScenarioRun> {
    let mut config = config.clone();
    if let Some(cwd) = &scenario.cwd {
        config.current_directory.clone_from(cwd);
    }
    info!(
        scenario = %scenario.name,
        edits = scenario.edits.len(),
        "scenario starting"
    );

    let mut sys = TestSys::new(config, &scenario.files)?;
    let mut doc = String::new();
    let _ = writeln!(doc, "currentDirectory::{}", sys.config().current_directory);
    let _ = writeln!(
        doc,
        "useCaseSensitiveFileNames::{}",
        sys.config().use_case_sensitive_file_names
    );
    doc.push_str("Input::\n");
    sys.baseline_fs_diff(&mut doc);
    run_generation(&mut sys, &mut doc, compiler, &scenario.command_line_args);

    for (index, edit) in scenario.edits.iter().enumerate() {
        info!(scenario = %scenario.name, edit = index, caption = %edit.caption, "applying edit");
        let _ = write!(doc, "\n\nEdit [{index}]:: {}\n", edit.caption);
        if let Some(apply) = &edit.edit {
            apply(&mut sys);
        }
        sys.baseline_fs_diff(&mut doc);
        let args = edit
            .command_line_args
            .as_deref()
            .unwrap_or(&scenario.command_line_args);
        run_generation(&mut sys, &mut doc, compiler, args);
    }

    info!(
        scenario = %scenario.name,
        bytes = doc.len(),
        "scenario finished"
    );
    Ok(ScenarioRun { baseline: doc, sys })
}

/// Run `scenario` and check its document against `store`.
pub fn verify_scenario(
    config: &HarnessConfig,
    store: &BaselineStore,
    scenario: &Scenario,
    compiler: &mut dyn Compiler,
) -> Result<ScenarioRun> {
    let run = run_scenario(config, scenario, compiler)?;
    let name = scenario.baseline_name();
    store.check(&scenario.subfolder, &name, &run.baseline)?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use buildsnap_types::ExitStatus;

    use super::*;
    use crate::sys::{CompileOutcome, System};

    struct Help;

    impl Compiler for Help {
        fn run(&mut self, sys: &dyn System, _args: &[String]) -> CompileOutcome {
            sys.write_output("Version FakeTSVersion\n");
            CompileOutcome::new(ExitStatus::Success)
        }
    }

    #[test]
    fn header_and_first_generation_layout() {
        let scenario = Scenario::new("tsbuild/commandLine", "help", ["--build", "--help"]);
        let run = run_scenario(&HarnessConfig::default(), &scenario, &mut Help)
            .expect("scenario should run");
        assert_eq!(
            run.baseline,
            "currentDirectory::/home/src/workspaces/project\n\
             useCaseSensitiveFileNames::true\n\
             Input::\n\
             \n\
             tsgo --build --help\n\
             ExitStatus:: Success\n\
             Output::\n\
             Version FakeTSVersion\n\
             \n"
        );
    }

    #[test]
    fn edits_get_numbered_sections() {
        let scenario = Scenario::new("s", "edits", ["-b"])
            .with_file("/src/a.ts", "let x = 1;")
            .with_edit(Edit::no_change())
            .with_edit(
                Edit::new("bump", |sys| sys.replace_file_text("/src/a.ts", "1", "2"))
                    .with_args(["-b", "-v"]),
            );
        let run = run_scenario(&HarnessConfig::default(), &scenario, &mut Help)
            .expect("scenario should run");
        let no_change = "\n\nEdit [0]:: no change\n\ntsgo -b\n";
        let bump = "\n\nEdit [1]:: bump\n//// [/src/a.ts] *modified* \nlet x = 2;\n\ntsgo -b -v\n";
        assert!(run.baseline.contains(no_change));
        assert!(run.baseline.contains(bump));
        assert_eq!(scenario.baseline_name(), "edits.js");
    }

    #[test]
    fn cwd_override_applies() {
        let scenario = Scenario::new("s", "cwd", Vec::<String>::new()).with_cwd("/work");
        let run = run_scenario(&HarnessConfig::default(), &scenario, &mut Help)
            .expect("scenario should run");
        assert!(run.baseline.starts_with("currentDirectory::/work\n"));
        assert!(run.baseline.contains("\ntsgo\nExitStatus"));
    }
}
