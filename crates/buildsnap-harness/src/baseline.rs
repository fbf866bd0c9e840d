//! On-disk baseline documents.
//!
//! Reference baselines live under `reference_root/<subfolder>/<name>`. In
//! compare mode every check also writes the fresh document under
//! `local_root` so a failing run leaves something to inspect or accept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use buildsnap_error::{Result, SnapError};
use tracing::{debug, info, warn};

use crate::config::{BaselineConfig, BaselineMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineStore {
    reference_root: PathBuf,
    local_root: PathBuf,
    mode: BaselineMode,
}

impl BaselineStore {
    pub fn new(
        reference_root: impl Into<PathBuf>,
        local_root: impl Into<PathBuf>,
        mode: BaselineMode,
    ) -> Self {
        Self {
            reference_root: reference_root.into(),
            local_root: local_root.into(),
            mode,
        }
    }

    pub fn from_config(config: &BaselineConfig) -> Self {
        Self::new(&config.reference_root, &config.local_root, config.mode)
    }

    pub fn mode(&self) -> BaselineMode {
        self.mode
    }

    pub fn reference_path(&self, subfolder: &str, name: &str) -> PathBuf {
        self.reference_root.join(subfolder).join(name)
    }

    pub fn local_path(&self, subfolder: &str, name: &str) -> PathBuf {
        self.local_root.join(subfolder).join(name)
    }

    /// Record or verify `actual` as the baseline `subfolder/name`.
    pub fn check(&self, subfolder: &str, name: &str, actual: &str) -> Result<()> {
        let label = format!("{subfolder}/{name}");
        match self.mode {
            BaselineMode::Record => {
                let path = self.reference_path(subfolder, name);
                write_creating_dirs(&path, actual)?;
                info!(baseline = %label, path = %path.display(), "reference baseline recorded");
                Ok(())
            }
            BaselineMode::Compare => {
                let local = self.local_path(subfolder, name);
                write_creating_dirs(&local, actual)?;
                let expected = match fs::read_to_string(self.reference_path(subfolder, name)) {
                    Ok(text) => text,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {
                        warn!(baseline = %label, "reference baseline missing");
                        return Err(SnapError::MissingBaseline {
                            name: label,
                            local: local.display().to_string(),
                        });
                    }
                    Err(err) => return Err(err.into()),
                };
                match first_difference(&expected, actual) {
                    None => {
                        debug!(baseline = %label, "baseline matches");
                        Ok(())
                    }
                    Some((line, expected, actual)) => {
                        warn!(baseline = %label, line, "baseline mismatch");
                        Err(SnapError::BaselineMismatch {
                            name: label,
                            line,
                            expected,
                            actual,
                        })
                    }
                }
            }
        }
    }
}

fn write_creating_dirs(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

/// 1-based line number and both lines at the first point of divergence.
/// A side that ran out of lines contributes an empty string.
fn first_difference(expected: &str, actual: &str) -> Option<(usize, String, String)> {
    if expected == actual {
        return None;
    }
    let mut left = expected.split('\n');
    let mut right = actual.split('\n');
    let mut line = 1;
    loop {
        match (left.next(), right.next()) {
            (Some(a), Some(b)) if a == b => line += 1,
            (None, None) => return None,
            (a, b) => {
                return Some((
                    line,
                    a.unwrap_or_default().to_owned(),
                    b.unwrap_or_default().to_owned(),
                ));
            }
        }
    }
}
