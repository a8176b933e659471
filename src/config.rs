// In: src/config.rs

//! Location of the native EAGGR engine and the libraries it depends on.
//!
//! A `LibraryConfig` is consumed exactly once, by the first `Eaggr` session
//! opened in the process. It can be built in code, read from a JSON document,
//! or assembled from the environment:
//!
//! - `EAGGR_CONFIG` names a JSON file holding a serialized `LibraryConfig`;
//! - `EAGGR_LIBRARY_DIR` overrides `library_dir` (applied after the file).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EaggrError;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "EAGGR_CONFIG";
/// Environment variable overriding the directory the libraries are loaded from.
pub const LIBRARY_DIR_ENV_VAR: &str = "EAGGR_LIBRARY_DIR";

//==================================================================================
// I. Platform Defaults
//==================================================================================

#[cfg(target_os = "windows")]
const DEFAULT_LIBRARY_NAME: &str = "eaggr.dll";
#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY_NAME: &str = "libeaggr.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_LIBRARY_NAME: &str = "libeaggr.so";

// Dependencies of the bundled engine build, in load order.
#[cfg(target_os = "windows")]
const BUNDLED_DEPENDENCIES: &[&str] = &[
    "libwinpthread-1.dll",
    "libgcc_s_seh-1.dll",
    "libstdc++-6.dll",
    "libproj-9.dll",
    "libgdal-20.dll",
];
#[cfg(target_os = "macos")]
const BUNDLED_DEPENDENCIES: &[&str] = &["libproj.dylib", "libgdal.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const BUNDLED_DEPENDENCIES: &[&str] = &["libproj.so", "libgdal.so"];

fn default_library_name() -> String {
    DEFAULT_LIBRARY_NAME.to_string()
}

//==================================================================================
// II. LibraryConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LibraryConfig {
    /// Directory holding the engine and its dependencies. `None` defers to the
    /// platform loader's search path.
    #[serde(default)]
    pub library_dir: Option<PathBuf>,

    /// File name of the engine library itself.
    #[serde(default = "default_library_name")]
    pub library_name: String,

    /// Libraries opened, in order, before the engine.
    #[serde(default)]
    pub preload: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            library_dir: None,
            library_name: default_library_name(),
            preload: Vec::new(),
        }
    }
}

impl LibraryConfig {
    /// A config for the layout shipped with the engine: the engine and its
    /// PROJ/GDAL dependencies side by side in `dir`.
    pub fn bundled(dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(dir.into()),
            library_name: default_library_name(),
            preload: BUNDLED_DEPENDENCIES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, EaggrError> {
        let config: LibraryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EaggrError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Reads `EAGGR_CONFIG` (if set), then applies `EAGGR_LIBRARY_DIR`.
    pub fn from_env() -> Result<Self, EaggrError> {
        let mut config = match env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        if let Some(dir) = env::var_os(LIBRARY_DIR_ENV_VAR) {
            if !dir.is_empty() {
                config.library_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EaggrError> {
        if self.library_name.trim().is_empty() {
            return Err(EaggrError::Config("library_name must not be empty".into()));
        }
        if let Some(name) = self.preload.iter().find(|name| name.trim().is_empty()) {
            return Err(EaggrError::Config(format!(
                "preload entries must not be empty (got {:?})",
                name
            )));
        }
        Ok(())
    }

    /// Full path (or bare name) handed to the loader for the engine.
    pub fn library_path(&self) -> PathBuf {
        self.resolve(&self.library_name)
    }

    /// Paths of the dependency libraries, in load order.
    pub fn preload_paths(&self) -> Vec<PathBuf> {
        self.preload.iter().map(|name| self.resolve(name)).collect()
    }

    fn resolve(&self, name: &str) -> PathBuf {
        match &self.library_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}
