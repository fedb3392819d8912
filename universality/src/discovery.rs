// SPDX-License-Identifier: AGPL-3.0-only

//! The data root: where reference coefficient files are read from and where
//! results, figure data and new reference files are written.
//!
//! # Resolution
//!
//! 1. Explicit root (`--output`, tests): used as given and created if missing
//! 2. `METALLIC_DATA_ROOT`, if it names an existing directory
//! 3. Nearest ancestor of the working directory that holds `reference/`
//! 4. The workspace directory (parent of `CARGO_MANIFEST_DIR`)
//!
//! Only the explicit root can fail to resolve; the other steps fall through.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::data::reference_file_name;
use crate::error::{Result, UniversalityError};

/// Environment variable naming the data root.
pub const DATA_ROOT_ENV: &str = "METALLIC_DATA_ROOT";

/// Well-known subdirectories within the data root.
pub mod paths {
    /// Reference coefficient files (`*.coef`)
    pub const REFERENCE: &str = "reference";
    /// Figure data (JSON)
    pub const FIGURES: &str = "figures";
    /// Per-index records and conjecture tables (JSON)
    pub const RESULTS: &str = "results";
}

/// How a [`DataRoot`] was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    /// Passed in by the caller.
    Explicit,
    /// From [`DATA_ROOT_ENV`].
    Environment,
    /// Ancestor of the working directory with a `reference/` subdirectory.
    Ancestor,
    /// Workspace directory of this crate.
    Workspace,
}

/// A resolved data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRoot {
    path: PathBuf,
    source: RootSource,
}

impl DataRoot {
    /// Use `path` as the data root, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DataLoad`] if the directory cannot be created.
    pub fn at(path: &Path) -> Result<Self> {
        create_dir(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            source: RootSource::Explicit,
        })
    }

    /// Resolve the data root, preferring `explicit` when given.
    ///
    /// # Errors
    ///
    /// Only when `explicit` cannot be created; see [`Self::at`].
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::at(path);
        }
        let root = std::env::var_os(DATA_ROOT_ENV)
            .map(PathBuf::from)
            .filter(|p| p.is_dir())
            .map(|path| Self {
                path,
                source: RootSource::Environment,
            })
            .or_else(|| {
                let cwd = std::env::current_dir().ok()?;
                ancestor_with_reference(&cwd).map(|path| Self {
                    path,
                    source: RootSource::Ancestor,
                })
            })
            .unwrap_or_else(|| Self {
                path: workspace_dir(),
                source: RootSource::Workspace,
            });
        debug!(root = %root.path.display(), source = ?root.source, "data root resolved");
        Ok(root)
    }

    /// Root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How the root was found.
    #[must_use]
    pub const fn source(&self) -> RootSource {
        self.source
    }

    /// `subdir` under the root, created if needed.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DataLoad`] if the directory cannot be created.
    pub fn subdir(&self, subdir: &str) -> Result<PathBuf> {
        let dir = self.path.join(subdir);
        create_dir(&dir)?;
        Ok(dir)
    }

    /// Conventional location of the reference file for `n` at `order`.
    #[must_use]
    pub fn reference_path(&self, n: u32, order: usize) -> PathBuf {
        self.path
            .join(paths::REFERENCE)
            .join(reference_file_name(n, order))
    }

    /// [`Self::reference_path`] if that file exists.
    #[must_use]
    pub fn find_reference(&self, n: u32, order: usize) -> Option<PathBuf> {
        let path = self.reference_path(n, order);
        path.is_file().then_some(path)
    }
}

/// Nearest directory at or above `start` that holds `reference/`.
#[must_use]
pub fn ancestor_with_reference(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(paths::REFERENCE).is_dir())
        .map(Path::to_path_buf)
}

fn workspace_dir() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.parent().unwrap_or(manifest).to_path_buf()
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| UniversalityError::DataLoad(format!("create {}: {e}", dir.display())))
}
