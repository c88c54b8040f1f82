// src/isolate/staging.rs

//! Staging directory layout shared by the host and the isolated side.
//!
//! ```text
//! <staging>/
//!   input/feature_script.py    (mounted read-only)
//!   input/known_values.json
//!   output/result.json         (written by the isolated side)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::dag::KnownValues;
use crate::errors::Result;

pub const INPUT_DIR: &str = "input";
pub const OUTPUT_DIR: &str = "output";
pub const SCRIPT_FILE: &str = "feature_script.py";
pub const KNOWN_VALUES_FILE: &str = "known_values.json";
pub const RESULT_FILE: &str = "result.json";

/// Paths inside a staging directory rooted at `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join(INPUT_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn script_path(&self) -> PathBuf {
        self.input_dir().join(SCRIPT_FILE)
    }

    pub fn known_values_path(&self) -> PathBuf {
        self.input_dir().join(KNOWN_VALUES_FILE)
    }

    pub fn result_path(&self) -> PathBuf {
        self.output_dir().join(RESULT_FILE)
    }
}

/// A freshly created, uniquely named staging directory owned by one run.
///
/// The directory is deleted by [`StagingDir::close`], or on drop if the run
/// is abandoned before that.
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
    layout: StagingLayout,
}

impl StagingDir {
    /// Create the directory under `root` (the system temp dir if `None`) and
    /// write the script and known-values snapshot into `input/`.
    pub fn create(root: Option<&Path>, script_source: &str, known: &KnownValues) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("featuredag-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        let layout = StagingLayout::new(dir.path());
        fs::create_dir(layout.input_dir())?;
        fs::create_dir(layout.output_dir())?;
        open_for_container(&layout.output_dir())?;

        fs::write(layout.script_path(), script_source)?;
        fs::write(layout.known_values_path(), serde_json::to_vec_pretty(known)?)?;

        debug!(staging = ?layout.root(), "staged script and known values");
        Ok(Self { dir, layout })
    }

    pub fn layout(&self) -> &StagingLayout {
        &self.layout
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the directory, reporting failures instead of swallowing them.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// The isolated side may run as a different user than the host.
#[cfg(unix)]
fn open_for_container(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o777))
}

#[cfg(not(unix))]
fn open_for_container(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
