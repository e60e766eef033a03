//! Layered settings resolution.
//!
//! Values come from the injected environment (highest precedence), then the
//! profile's override file, then the shared `.env` file. The merged mapping
//! is coerced into an immutable [`SettingsRecord`].

mod coerce;
mod error;
mod log_level;
mod profile;
mod record;
mod render;
mod source;

pub use coerce::{MAX_PORT, MIN_PORT};
pub use error::ConfigError;
pub use log_level::{LogLevel, UnknownLogLevel};
pub use profile::{DEFAULT_FILE, DEFAULT_PROFILE, Profile, ProfileCatalog};
pub use record::{DEFAULT_PORT, Field, SettingsRecord};
pub use render::{MASK, parse_rendered, render, render_block, render_json};
pub use source::{
    EnvSource, Origin, Overlay, ProcessEnv, SourceEntry, SourceMap, read_env_file, strip_prefix,
};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "MYAPP_";

/// Resolves profiles into settings records.
///
/// Holds only read-only inputs, so any number of profiles can be resolved
/// from one resolver in any order.
#[derive(Debug, Clone)]
pub struct ConfigResolver<E = ProcessEnv> {
    base_dir: PathBuf,
    prefix: String,
    env: E,
}

impl ConfigResolver<ProcessEnv> {
    /// Resolver over the live process environment.
    pub fn from_process_env(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(base_dir, ProcessEnv)
    }
}

impl<E: EnvSource> ConfigResolver<E> {
    /// Override files are looked up relative to `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, env: E) -> Self {
        Self {
            base_dir: base_dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            env,
        }
    }

    /// Use a different environment/file key prefix (matched ignoring case).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Environment entries under the prefix, sorted by name.
    pub fn env_entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .env
            .vars()
            .into_iter()
            .filter(|(name, _)| strip_prefix(name, &self.prefix).is_some())
            .collect();
        entries.sort();
        entries
    }

    /// Merge the environment and the profile's files into one mapping.
    ///
    /// The first layer to define a key wins. Unreadable files count as
    /// empty layers; files with invalid syntax are an error.
    pub fn merge_sources(&self, profile: &Profile) -> Result<SourceMap, ConfigError> {
        let mut sources = SourceMap::new();

        for (var, value) in self.env_entries() {
            if let Some(key) = strip_prefix(&var, &self.prefix) {
                if sources.insert_if_absent(&key, &value, Origin::Env { var: var.clone() }) {
                    debug!(profile = profile.name(), %key, %var, "value from environment");
                }
            }
        }

        for file in profile.files() {
            let path = self.base_dir.join(file);
            for (name, value) in self.read_layer(&path)? {
                let Some(key) = strip_prefix(&name, &self.prefix) else {
                    debug!(path = %path.display(), %name, "ignoring key outside prefix");
                    continue;
                };
                if sources.insert_if_absent(&key, &value, Origin::File { path: path.clone() }) {
                    debug!(profile = profile.name(), %key, path = %path.display(), "value from file");
                }
            }
        }

        Ok(sources)
    }

    /// Coerce merged sources into a record.
    pub fn build_record(&self, sources: &SourceMap) -> Result<SettingsRecord, ConfigError> {
        SettingsRecord::from_sources(sources)
    }

    /// Merge and build in one step.
    pub fn resolve(&self, profile: &Profile) -> Result<SettingsRecord, ConfigError> {
        let sources = self.merge_sources(profile)?;
        let record = self.build_record(&sources)?;
        info!(
            profile = profile.name(),
            prefix = %self.prefix,
            keys = sources.len(),
            "settings resolved"
        );
        Ok(record)
    }

    /// Read one file layer, treating an unreadable file as empty.
    fn read_layer(&self, path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
        match read_env_file(path) {
            Ok(entries) => Ok(entries),
            Err(ConfigError::FileAccess { path, source }) => {
                if source.kind() == ErrorKind::NotFound {
                    debug!(path = %path.display(), "override file not found, skipping");
                } else {
                    warn!(path = %path.display(), error = %source, "override file unreadable, skipping");
                }
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
