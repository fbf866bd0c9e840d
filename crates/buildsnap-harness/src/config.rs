//! Harness configuration.
//!
//! [`HarnessConfig::default`] describes the standard test environment. A
//! JSON file can replace it wholesale and a couple of environment variables
//! adjust the baseline store without touching test code.

use std::path::{Path, PathBuf};

use buildsnap_error::{Result, SnapError};
use buildsnap_types::Timestamp;
use buildsnap_types::clock::DEFAULT_EPOCH;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::FAKE_VERSION;

/// `1`/`true` switches the baseline store to record mode.
pub const ENV_ACCEPT: &str = "BUILDSNAP_ACCEPT";
/// Moves both baseline roots below this directory.
pub const ENV_BASELINE_ROOT: &str = "BUILDSNAP_BASELINE_ROOT";

pub const DEFAULT_CURRENT_DIRECTORY: &str = "/home/src/workspaces/project";
pub const DEFAULT_LIBRARY_PATH: &str = "/home/src/tslibs/TS/Lib";

/// Library files provisioned when a test does not supply them.
pub const DEFAULT_LIBRARY_FILES: &[&str] = &[
    "lib.d.ts",
    "lib.es5.d.ts",
    "lib.es2015.d.ts",
    "lib.es2016.full.d.ts",
    "lib.es2017.full.d.ts",
    "lib.es2018.full.d.ts",
    "lib.es2019.full.d.ts",
    "lib.es2020.full.d.ts",
    "lib.esnext.full.d.ts",
    "lib.dom.d.ts",
];

/// Minimal declarations written into every provisioned library file.
pub const DEFAULT_LIBRARY_CONTENT: &str = r#"/// <reference no-default-lib="true"/>
interface Boolean {}
interface Function {}
interface CallableFunction {}
interface NewableFunction {}
interface IArguments {}
interface Number { toExponential: any; }
interface Object {}
interface RegExp {}
interface String { charAt: any; }
interface Array<T> { length: number; [n: number]: T; }
interface ReadonlyArray<T> {}
interface SymbolConstructor {
    (desc?: string | number): symbol;
    for(name: string): symbol;
    readonly toStringTag: symbol;
}
declare var Symbol: SymbolConstructor;
interface Symbol {
    readonly [Symbol.toStringTag]: string;
}
declare const console: { log(msg: any): void; };
"#;

/// How the baseline store treats freshly produced documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMode {
    /// Compare against the reference copy.
    #[default]
    Compare,
    /// Overwrite the reference copy.
    Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub reference_root: PathBuf,
    pub local_root: PathBuf,
    pub mode: BaselineMode,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            reference_root: PathBuf::from("testdata/baselines/reference"),
            local_root: PathBuf::from("testdata/baselines/local"),
            mode: BaselineMode::Compare,
        }
    }
}

/// Everything that shapes a [`TestSys`](crate::sys::TestSys) environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub current_directory: String,
    pub use_case_sensitive_file_names: bool,
    pub library_path: String,
    pub default_library_files: Vec<String>,
    pub default_library_content: String,
    /// Printed before the arguments of every invocation in a document.
    pub command_name: String,
    /// Version string the compiler prints; scrubbed from output.
    pub live_version: String,
    pub fake_version: String,
    /// Clock epoch in milliseconds.
    pub epoch_millis: u64,
    pub baseline: BaselineConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            current_directory: DEFAULT_CURRENT_DIRECTORY.to_owned(),
            use_case_sensitive_file_names: true,
            library_path: DEFAULT_LIBRARY_PATH.to_owned(),
            default_library_files: DEFAULT_LIBRARY_FILES
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
            default_library_content: DEFAULT_LIBRARY_CONTENT.to_owned(),
            command_name: "tsgo".to_owned(),
            live_version: env!("CARGO_PKG_VERSION").to_owned(),
            fake_version: FAKE_VERSION.to_owned(),
            epoch_millis: DEFAULT_EPOCH.as_millis(),
            baseline: BaselineConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load a JSON config file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(err) => return Err(SnapError::config(format!("{}: {err}", path.display()))),
        };
        config.validate()?;
        debug!(path = %path.display(), "harness config loaded");
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let accept = lookup(ENV_ACCEPT).unwrap_or_default();
        if matches!(accept.trim(), "1" | "true" | "yes") {
            self.baseline.mode = BaselineMode::Record;
        }
        if let Some(root) = lookup(ENV_BASELINE_ROOT).filter(|root| !root.is_empty()) {
            let root = PathBuf::from(root);
            self.baseline.reference_root = root.join("reference");
            self.baseline.local_root = root.join("local");
        }
    }

    /// Reject configurations the harness cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.current_directory.starts_with('/') {
            return Err(SnapError::config(format!(
                "current_directory must be absolute, got '{}'",
                self.current_directory
            )));
        }
        if !self.library_path.starts_with('/') {
            return Err(SnapError::config(format!(
                "library_path must be absolute, got '{}'",
                self.library_path
            )));
        }
        if let Some(bad) = self
            .default_library_files
            .iter()
            .find(|name| name.is_empty() || name.contains('/'))
        {
            return Err(SnapError::config(format!(
                "default library file names must be bare file names, got '{bad}'"
            )));
        }
        if self.fake_version.is_empty() {
            return Err(SnapError::config("fake_version must not be empty"));
        }
        Ok(())
    }

    pub fn epoch(&self) -> Timestamp {
        Timestamp::from_millis(self.epoch_millis)
    }

    /// Absolute paths of every default library asset.
    pub fn library_asset_paths(&self) -> Vec<String> {
        let dir = self.library_path.trim_end_matches('/');
        self.default_library_files
            .iter()
            .map(|name| format!("{dir}/{name}"))
            .collect()
    }
}
