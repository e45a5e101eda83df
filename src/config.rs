//! Run configuration.
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags:
//!
//! ```toml
//! input_dir = "/manga/downloads"
//! output_dir = "/manga/cbz"
//! exclude = ["unsorted", "@eaDir"]
//! keep_cache = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "mangapack.toml";

const DEFAULT_OUTPUT_FOLDER: &str = "output";
const DEFAULT_CACHE_FOLDER: &str = "cache";

/// Raw configuration as written in the TOML file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root searched for `.epub` files. Defaults to the working directory.
    pub input_dir: Option<PathBuf>,
    /// Root of the mirrored output tree. Defaults to `<input>/output`.
    pub output_dir: Option<PathBuf>,
    /// Working directory for extractions. Defaults to `<input>/cache`.
    pub cache_dir: Option<PathBuf>,
    /// Directory names skipped during discovery and mirroring.
    pub exclude: Vec<String>,
    /// Leave the cache on disk after a successful run.
    pub keep_cache: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub exclude: Vec<String>,
    pub keep_cache: bool,
}

impl Config {
    /// Parse a TOML config file.
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Config::from_toml(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> std::result::Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load `mangapack.toml` from `dir` if present, defaults otherwise.
    pub fn load_default(dir: &Path) -> Result<Config> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.is_file() {
            Config::load(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Fill in defaults and make every path absolute against `cwd`.
    pub fn resolve(self, cwd: &Path) -> Result<Settings> {
        let input_dir = absolute(cwd, self.input_dir.as_deref().unwrap_or(cwd));
        if !input_dir.is_dir() {
            return Err(Error::Config(format!(
                "input directory {} does not exist",
                input_dir.display()
            )));
        }

        let output_dir = self
            .output_dir
            .map(|p| absolute(cwd, &p))
            .unwrap_or_else(|| input_dir.join(DEFAULT_OUTPUT_FOLDER));
        let cache_dir = self
            .cache_dir
            .map(|p| absolute(cwd, &p))
            .unwrap_or_else(|| input_dir.join(DEFAULT_CACHE_FOLDER));

        if cache_dir == input_dir || input_dir.starts_with(&cache_dir) {
            return Err(Error::Config(format!(
                "cache directory {} would contain the input",
                cache_dir.display()
            )));
        }

        // the cache is wiped at start and end of a run
        if output_dir.starts_with(&cache_dir) || cache_dir.starts_with(&output_dir) {
            return Err(Error::Config(format!(
                "cache directory {} overlaps the output directory {}",
                cache_dir.display(),
                output_dir.display()
            )));
        }

        let exclude = self
            .exclude
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        Ok(Settings {
            input_dir,
            output_dir,
            cache_dir,
            exclude,
            keep_cache: self.keep_cache,
        })
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
