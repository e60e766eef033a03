//! End-to-end resolution against on-disk override files.

use layered_settings::config::{
    ConfigError, ConfigResolver, LogLevel, MASK, Overlay, ProcessEnv, Profile, ProfileCatalog,
    render, render_block,
};
use secrecy::ExposeSecret;
use serial_test::serial;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_standard_files(dir: &Path) {
    fs::write(
        dir.join(".env"),
        "MYAPP_DATABASE_URL=sqlite:///default.db\n\
         MYAPP_DATABASE_TOKEN=secret123\n\
         MYAPP_API_KEY=apikey123\n\
         MYAPP_DEBUG_MODE=True\n\
         MYAPP_LOG_LEVEL=INFO\n\
         MYAPP_PORT=8000\n",
    )
    .unwrap();
    fs::write(
        dir.join(".env.dev"),
        "MYAPP_DATABASE_URL=sqlite:///dev.db\nMYAPP_DEBUG_MODE=True\nMYAPP_LOG_LEVEL=DEBUG\n",
    )
    .unwrap();
    fs::write(
        dir.join(".env.prod"),
        "MYAPP_DATABASE_URL=sqlite:///prod.db\nMYAPP_DEBUG_MODE=False\nMYAPP_LOG_LEVEL=INFO\n",
    )
    .unwrap();
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_walkthrough_overrides_only_touch_overlaid_profiles() {
    let tmp = TempDir::new().unwrap();
    write_standard_files(tmp.path());

    let base = env(&[]);
    let initial_prod = ConfigResolver::new(tmp.path(), &base)
        .resolve(&Profile::new("prod"))
        .unwrap();

    let url_env = Overlay::new(&base).with(
        "MYAPP_DATABASE_URL",
        "env.will.always.win.over.env-files/database_url",
    );
    let prod = ConfigResolver::new(tmp.path(), &url_env)
        .resolve(&Profile::new("prod"))
        .unwrap();

    let debug_env = url_env.clone().with("MYAPP_DEBUG_MODE", "FALSE");
    let dev = ConfigResolver::new(tmp.path(), &debug_env)
        .resolve(&Profile::new("dev"))
        .unwrap();

    assert_eq!(initial_prod.database_url(), "sqlite:///prod.db");
    assert_eq!(
        prod.database_url(),
        "env.will.always.win.over.env-files/database_url"
    );
    assert_eq!(dev.database_url(), prod.database_url());
    assert!(!dev.debug_mode());
    assert_eq!(dev.log_level(), LogLevel::Debug);
    // Overlays never leak back into the base source.
    assert!(base.is_empty());
}

#[test]
fn test_every_builtin_profile_resolves_from_shipped_layout() {
    let tmp = TempDir::new().unwrap();
    write_standard_files(tmp.path());
    let resolver = ConfigResolver::new(tmp.path(), env(&[]));

    let records: Vec<_> = Profile::builtin()
        .iter()
        .map(|p| resolver.resolve(p).unwrap())
        .collect();

    let urls: Vec<&str> = records.iter().map(|r| r.database_url()).collect();
    assert_eq!(
        urls,
        vec!["sqlite:///default.db", "sqlite:///dev.db", "sqlite:///prod.db"]
    );
    for record in &records {
        assert_eq!(record.database_token().expose_secret(), "secret123");
        assert_eq!(record.port(), 8000);
    }
}

#[test]
fn test_profiles_resolve_independently_across_threads() {
    let tmp = TempDir::new().unwrap();
    write_standard_files(tmp.path());
    let resolver = ConfigResolver::new(tmp.path(), env(&[("MYAPP_PORT", "9443")]));

    let sequential: Vec<_> = Profile::builtin()
        .iter()
        .map(|p| resolver.resolve(p).unwrap())
        .collect();

    let parallel: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = Profile::builtin()
            .into_iter()
            .map(|p| {
                let resolver = &resolver;
                scope.spawn(move || resolver.resolve(&p).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
}

#[test]
fn test_masked_output_never_contains_secrets() {
    let tmp = TempDir::new().unwrap();
    write_standard_files(tmp.path());
    let resolver = ConfigResolver::new(tmp.path(), env(&[]));

    for profile in Profile::builtin() {
        let record = resolver.resolve(&profile).unwrap();
        let text = render_block(&profile.label(), &record, false);
        assert!(!text.contains("apikey123"));
        assert!(!text.contains("secret123"));
        assert_eq!(text.matches(MASK).count(), 2);
    }
}

#[test]
fn test_validation_error_names_field_and_value() {
    let tmp = TempDir::new().unwrap();
    write_standard_files(tmp.path());
    let resolver = ConfigResolver::new(tmp.path(), env(&[("MYAPP_DEBUG_MODE", "kinda")]));

    let err = resolver.resolve(&Profile::new("dev")).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("debug_mode"), "{msg}");
    assert!(msg.contains("kinda"), "{msg}");
}

#[test]
fn test_catalog_file_on_disk() {
    let tmp = TempDir::new().unwrap();
    write_standard_files(tmp.path());
    let catalog_path = tmp.path().join("profiles.yaml");
    fs::write(
        &catalog_path,
        "profiles:\n  - name: default\n  - name: dev\n  - name: prod\n",
    )
    .unwrap();

    let catalog = ProfileCatalog::load(&catalog_path).unwrap();
    assert_eq!(catalog.profiles(), Profile::builtin().as_slice());
}

#[test]
fn test_missing_catalog_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = ProfileCatalog::load(&tmp.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileAccess { .. }));
}

#[test]
#[serial]
fn test_process_env_wins_over_files() {
    let tmp = TempDir::new().unwrap();
    write_standard_files(tmp.path());

    temp_env::with_vars(
        [
            ("MYAPP_DATABASE_URL", Some("prod-override")),
            ("MYAPP_LOG_LEVEL", Some("error")),
        ],
        || {
            let resolver = ConfigResolver::from_process_env(tmp.path());
            let record = resolver.resolve(&Profile::new("dev")).unwrap();

            assert_eq!(record.database_url(), "prod-override");
            assert_eq!(record.log_level(), LogLevel::Error);
            assert!(render(&record, false).contains("database_url: prod-override"));
        },
    );
}

#[test]
#[serial]
fn test_overlay_over_process_env() {
    let tmp = TempDir::new().unwrap();
    write_standard_files(tmp.path());

    temp_env::with_vars([("MYAPP_PORT", Some("1111"))], || {
        let overlay = Overlay::new(ProcessEnv).with("MYAPP_PORT", "2222");
        let record = ConfigResolver::new(tmp.path(), overlay)
            .resolve(&Profile::new("default"))
            .unwrap();
        assert_eq!(record.port(), 2222);
    });
}
