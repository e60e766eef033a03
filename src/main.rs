use clap::Parser;
use layered_settings::config::{
    ConfigError, ConfigResolver, EnvSource, Field, MASK, Origin, Overlay, ProcessEnv, Profile,
    ProfileCatalog, SettingsRecord, render_block, render_json, strip_prefix,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_DIR: &str = "configs";
const CUSTOM_PREFIX: &str = "MYCUSTOMAPP_";

/// Resolve layered settings for one or more profiles and print them.
#[derive(Debug, Parser)]
#[command(name = "layered-settings", version)]
struct Args {
    /// Directory holding the .env override files.
    #[arg(long, env = "LAYERED_SETTINGS_DIR", default_value = DEFAULT_CONFIG_DIR)]
    dir: PathBuf,

    /// Prefix for environment variables and file keys.
    #[arg(long, default_value = layered_settings::config::DEFAULT_PREFIX)]
    prefix: String,

    /// Profile to resolve (repeatable). Defaults to default, dev and prod.
    #[arg(long = "profile", value_name = "NAME")]
    profiles: Vec<String>,

    /// YAML file listing the available profiles.
    #[arg(long)]
    profiles_file: Option<PathBuf>,

    /// Extra environment assignment layered over the process environment.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    assignments: Vec<(String, String)>,

    /// Show sensitive values instead of the mask.
    #[arg(long)]
    unmask: bool,

    /// Print resolved settings as JSON.
    #[arg(long)]
    json: bool,

    /// Run the precedence walkthrough.
    #[arg(long, conflicts_with = "json")]
    demo: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got {:?}", s)),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = if args.demo {
        run_demo(&args.dir)
    } else {
        run(&args)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "settings resolution failed");
            eprintln!("\nError loading settings: {}", e);
            eprintln!("Ensure .env files exist and are correctly formatted.");
            ExitCode::FAILURE
        }
    }
}

fn select_profiles(args: &Args) -> Result<Vec<Profile>, ConfigError> {
    let catalog = match &args.profiles_file {
        Some(path) => ProfileCatalog::load(path)?,
        None => ProfileCatalog::default(),
    };

    if args.profiles.is_empty() {
        return Ok(catalog.profiles().to_vec());
    }

    Ok(args
        .profiles
        .iter()
        .map(|name| {
            catalog
                .get(name)
                .cloned()
                .unwrap_or_else(|| Profile::new(name.clone()))
        })
        .collect())
}

fn run(args: &Args) -> Result<(), ConfigError> {
    let profiles = select_profiles(args)?;
    let env = args
        .assignments
        .iter()
        .fold(Overlay::new(ProcessEnv), |env, (k, v)| env.with(k.clone(), v.clone()));
    let resolver = ConfigResolver::new(&args.dir, env).with_prefix(args.prefix.clone());

    if args.json {
        let mut out = Map::new();
        for profile in &profiles {
            let record = resolver.resolve(profile)?;
            out.insert(profile.name().to_string(), render_json(&record, args.unmask));
        }
        println!("{:#}", Value::Object(out));
        return Ok(());
    }

    println!("Starting application...");
    print_env_vars(&resolver, args.unmask);

    for profile in &profiles {
        let sources = resolver.merge_sources(profile)?;
        let record = resolver.build_record(&sources)?;
        print!("\n{}", render_block(&profile.label(), &record, args.unmask));

        for field in Field::ALL {
            if let Some(Origin::Env { var }) = sources.origin(field.name()) {
                println!(
                    "Note: {} was set in the environment and overrides .env file values.",
                    var
                );
            }
        }
    }

    Ok(())
}

/// Prints prefixed environment variables, masking sensitive ones.
fn print_env_vars<E: EnvSource>(resolver: &ConfigResolver<E>, unmask: bool) {
    let entries = resolver.env_entries();
    if entries.is_empty() {
        println!("\nNo {} environment variables found.", resolver.prefix());
        return;
    }

    println!("\nExisting {} environment variables:", resolver.prefix());
    for (name, value) in entries {
        let sensitive = strip_prefix(&name, resolver.prefix())
            .and_then(|key| Field::from_name(&key))
            .is_some_and(Field::is_sensitive);
        let shown = if sensitive && !unmask { MASK } else { value.as_str() };
        println!("{}: {}", name, shown);
    }
}

fn print_comparison(label: &str, settings: &SettingsRecord, initial: Option<&SettingsRecord>) {
    print!("\n{}", render_block(label, settings, false));
    if let Some(initial) = initial {
        let title = format!("{} (before overrides)", label);
        print!("\n{}", render_block(&title, initial, false));
    }
}

/// Walks through environment-over-file precedence for the built-in profiles.
///
/// Overrides are layered over the process environment instead of being
/// written into it.
fn run_demo(dir: &Path) -> Result<(), ConfigError> {
    println!("Starting application...");

    let base = ConfigResolver::from_process_env(dir);
    print_env_vars(&base, false);

    let default_profile = Profile::new("default");
    let dev_profile = Profile::new("dev");
    let prod_profile = Profile::new("prod");

    let default_settings = base.resolve(&default_profile)?;
    let initial_prod_settings = base.resolve(&prod_profile)?;
    let initial_dev_settings = base.resolve(&dev_profile)?;

    println!("\nSetting MYAPP_DATABASE_URL to demonstrate env var precedence...");
    let url_env = Overlay::new(ProcessEnv).with(
        "MYAPP_DATABASE_URL",
        "env.will.always.win.over.env-files/database_url",
    );
    let prod_settings = ConfigResolver::new(dir, &url_env).resolve(&prod_profile)?;

    println!("\nSetting MYAPP_DEBUG_MODE to demonstrate type parsing...");
    let debug_env = url_env.clone().with("MYAPP_DEBUG_MODE", "FALSE");
    let dev_settings = ConfigResolver::new(dir, &debug_env).resolve(&dev_profile)?;

    print_comparison("Default", &default_settings, None);
    print_comparison("Production", &prod_settings, Some(&initial_prod_settings));
    println!(
        "\nNote: MYAPP_DATABASE_URL was set in the environment and overrides .env file values for both dev and prod."
    );

    print_comparison("Development", &dev_settings, Some(&initial_dev_settings));
    println!(
        "\nNote: MYAPP_DEBUG_MODE was set in the environment, parsed as boolean, and only affects dev settings."
    );

    println!("\nExposing unmasked secrets for all settings:");
    for (settings, label) in [
        (&default_settings, "Default"),
        (&prod_settings, "Production"),
        (&dev_settings, "Development"),
    ] {
        print!("\n{}", render_block(label, settings, true));
    }

    println!("\nDemonstrating custom `{}` env prefix...", CUSTOM_PREFIX);
    let custom_env =
        Overlay::new(ProcessEnv).with("MYCUSTOMAPP_DATABASE_URL", "sqlite:///custom.db");
    let custom_settings = ConfigResolver::new(dir, custom_env)
        .with_prefix(CUSTOM_PREFIX)
        .resolve(&Profile::new("custom"))?;
    print!("\n{}", render_block("Custom", &custom_settings, false));

    Ok(())
}
