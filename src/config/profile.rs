//! Named configuration profiles and their file layers.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::ConfigError;

/// Shared default file read by every profile.
pub const DEFAULT_FILE: &str = ".env";

/// Name of the profile that reads only [`DEFAULT_FILE`].
pub const DEFAULT_PROFILE: &str = "default";

/// A named configuration variant.
///
/// `files` lists override files highest precedence first, relative to the
/// resolver's base directory. The environment always ranks above all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    files: Vec<PathBuf>,
}

impl Profile {
    /// Builds a profile using the standard naming scheme.
    ///
    /// `default` reads `.env`; any other name reads `.env.<name>` then `.env`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let files = if name == DEFAULT_PROFILE {
            vec![PathBuf::from(DEFAULT_FILE)]
        } else {
            vec![
                PathBuf::from(format!("{}.{}", DEFAULT_FILE, name)),
                PathBuf::from(DEFAULT_FILE),
            ]
        };
        Self { name, files }
    }

    /// Builds a profile with an explicit file list (highest precedence first).
    pub fn with_files(name: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            files,
        }
    }

    /// The three built-in profiles: default, dev, prod.
    pub fn builtin() -> Vec<Profile> {
        ["default", "dev", "prod"].into_iter().map(Profile::new).collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Human-readable label used in console output.
    pub fn label(&self) -> String {
        match self.name.as_str() {
            "default" => "Default".to_string(),
            "dev" => "Development".to_string(),
            "prod" => "Production".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    profiles: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    #[serde(default)]
    files: Option<Vec<PathBuf>>,
}

/// A set of profiles loaded from YAML.
///
/// ```yaml
/// profiles:
///   - name: default
///   - name: staging
///     files: [.env.staging, .env.prod, .env]
/// ```
///
/// Entries without `files` use the standard naming scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCatalog {
    profiles: Vec<Profile>,
}

impl ProfileCatalog {
    /// Load a catalog from a YAML file at the given path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        let catalog = Self {
            profiles: file
                .profiles
                .into_iter()
                .map(|entry| match entry.files {
                    Some(files) => Profile::with_files(entry.name, files),
                    None => Profile::new(entry.name),
                })
                .collect(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::Catalog("at least one profile is required".into()));
        }

        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if profile.name.trim().is_empty() {
                return Err(ConfigError::Catalog("profile name must not be empty".into()));
            }
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::Catalog(format!(
                    "duplicate profile: {}",
                    profile.name
                )));
            }
            if profile.files.is_empty() {
                return Err(ConfigError::Catalog(format!(
                    "profile {}: files must not be empty",
                    profile.name
                )));
            }
        }

        Ok(())
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self {
            profiles: Profile::builtin(),
        }
    }
}
