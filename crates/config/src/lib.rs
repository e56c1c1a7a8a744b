//! Layered configuration for the `stash` binary.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults,
//! 2. `stash.toml` in the platform configuration directory,
//! 3. an explicitly given file (must exist),
//! 4. `STASH_`-prefixed environment variables, with `__` separating nested
//!    keys (`STASH_SERVER__PORT=8080`).

pub mod error;

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, Result};

pub const FILE_NAME: &str = "stash.toml";
pub const ENV_PREFIX: &str = "STASH_";
const DEFAULT_DATABASE: &str = "stash.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Store opened by commands that work on the `files` table.
    pub database: PathBuf,
    pub server: ServerSettings,
    pub inspect: InspectSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// `0` lets the operating system pick a free port.
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectSettings {
    /// Rows per page when none is requested explicitly.
    pub page_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let database = project_dirs()
            .map(|dirs| dirs.data_dir().join(DEFAULT_DATABASE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
        Self { database, server: ServerSettings::default(), inspect: InspectSettings::default() }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl Default for InspectSettings {
    fn default() -> Self {
        Self { page_size: 50 }
    }
}

impl Settings {
    /// Load from every source, `explicit` being a file named on the command
    /// line.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user_file = project_dirs().map(|dirs| dirs.config_dir().join(FILE_NAME));
        Self::load_from(user_file.as_deref(), explicit)
    }

    fn load_from(user_file: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = user_file {
            tracing::debug!(path = %path.display(), "Reading user configuration if present");
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::Missing(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }
        let settings: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|err| ErrorKind::Load(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inspect.page_size == 0 {
            exn::bail!(ErrorKind::Invalid("inspect.page_size must be at least 1".to_string()));
        }
        if self.database.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database must not be empty".to_string()));
        }
        Ok(())
    }

    /// Create the parent directory of [`database`](Self::database) if needed.
    pub fn ensure_database_dir(&self) -> Result<()> {
        match self.database.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
                .or_raise(|| ErrorKind::Invalid(format!("cannot create {}", parent.display()))),
            _ => Ok(()),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "stash")
}
