//! The resolved, typed settings record.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::coerce;
use super::error::ConfigError;
use super::log_level::LogLevel;
use super::source::SourceMap;

/// Port used when no layer sets one.
pub const DEFAULT_PORT: u16 = 8000;

/// Fields of a [`SettingsRecord`], in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    DatabaseUrl,
    DatabaseToken,
    ApiKey,
    DebugMode,
    LogLevel,
    Port,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::DatabaseUrl,
        Field::DatabaseToken,
        Field::ApiKey,
        Field::DebugMode,
        Field::LogLevel,
        Field::Port,
    ];

    /// Key used in merged sources and rendered output.
    pub fn name(self) -> &'static str {
        match self {
            Field::DatabaseUrl => "database_url",
            Field::DatabaseToken => "database_token",
            Field::ApiKey => "api_key",
            Field::DebugMode => "debug_mode",
            Field::LogLevel => "log_level",
            Field::Port => "port",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Sensitive fields are masked on display.
    pub fn is_sensitive(self) -> bool {
        matches!(self, Field::DatabaseToken | Field::ApiKey)
    }

    /// Required fields have no built-in default.
    pub fn is_required(self) -> bool {
        !matches!(self, Field::LogLevel | Field::Port)
    }
}

/// Resolved settings for one profile.
///
/// Built once from merged sources and never mutated; fields are read through
/// accessors. Sensitive values are kept as [`SecretString`] so `Debug`
/// output redacts them.
#[derive(Debug, Clone)]
pub struct SettingsRecord {
    database_url: String,
    database_token: SecretString,
    api_key: SecretString,
    debug_mode: bool,
    log_level: LogLevel,
    port: u16,
}

impl SettingsRecord {
    /// Coerce and validate merged sources into a record.
    ///
    /// Fields are checked in declaration order and the first failure is
    /// returned. Keys that do not name a field are ignored.
    pub fn from_sources(sources: &SourceMap) -> Result<Self, ConfigError> {
        for key in sources.keys() {
            if Field::from_name(key).is_none() {
                debug!(key, "ignoring unknown settings key");
            }
        }

        let database_url = required(sources, Field::DatabaseUrl, verbatim)?;
        let database_token = required(sources, Field::DatabaseToken, verbatim)?;
        let api_key = required(sources, Field::ApiKey, verbatim)?;
        let debug_mode = required(sources, Field::DebugMode, coerce::boolean)?;
        let log_level = optional(sources, Field::LogLevel, coerce::log_level)?.unwrap_or_default();
        let port = optional(sources, Field::Port, coerce::port)?.unwrap_or(DEFAULT_PORT);

        Ok(Self {
            database_url,
            database_token: SecretString::new(database_token.into()),
            api_key: SecretString::new(api_key.into()),
            debug_mode,
            log_level,
            port,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn database_token(&self) -> &SecretString {
        &self.database_token
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Display value of a field, with secrets exposed.
    pub fn value_of(&self, field: Field) -> String {
        match field {
            Field::DatabaseUrl => self.database_url.clone(),
            Field::DatabaseToken => self.database_token.expose_secret().to_string(),
            Field::ApiKey => self.api_key.expose_secret().to_string(),
            Field::DebugMode => self.debug_mode.to_string(),
            Field::LogLevel => self.log_level.to_string(),
            Field::Port => self.port.to_string(),
        }
    }
}

impl PartialEq for SettingsRecord {
    fn eq(&self, other: &Self) -> bool {
        self.database_url == other.database_url
            && self.database_token.expose_secret() == other.database_token.expose_secret()
            && self.api_key.expose_secret() == other.api_key.expose_secret()
            && self.debug_mode == other.debug_mode
            && self.log_level == other.log_level
            && self.port == other.port
    }
}

impl Eq for SettingsRecord {}

type Coerce<T> = fn(&'static str, &str) -> Result<T, ConfigError>;

/// String fields keep the raw value as given, whitespace included.
fn verbatim(_: &'static str, raw: &str) -> Result<String, ConfigError> {
    Ok(raw.to_string())
}

fn optional<T>(sources: &SourceMap, field: Field, parse: Coerce<T>) -> Result<Option<T>, ConfigError> {
    sources
        .get(field.name())
        .map(|raw| parse(field.name(), raw))
        .transpose()
}

fn required<T>(sources: &SourceMap, field: Field, parse: Coerce<T>) -> Result<T, ConfigError> {
    optional(sources, field, parse)?.ok_or(ConfigError::MissingField {
        field: field.name(),
    })
}
