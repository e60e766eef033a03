//! Layered application settings.
//!
//! Resolves a typed, immutable [`SettingsRecord`] per named profile from the
//! process environment, profile-specific override files and a shared
//! default file.

pub mod config;

pub use config::{
    ConfigError, ConfigResolver, EnvSource, Field, LogLevel, Overlay, ProcessEnv, Profile,
    ProfileCatalog, SettingsRecord, SourceMap,
};
