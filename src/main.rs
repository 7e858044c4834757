use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use plugjar::archive::ArchiveEntries;
use plugjar::config::Config;
use plugjar::{PluginManager, ResolvedType, TypeOrigin};

/// plugjar - inspect the plugin archives of a directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Plugin directory (overrides the configured one)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the loaded plugin archives
    List,
    /// List the qualified type names in one archive
    Entries {
        /// Archive to enumerate
        archive: PathBuf,
    },
    /// Show a type by qualified name
    Resolve {
        /// Fully qualified type name
        name: String,
    },
    /// List the types that directly extend a base type
    Subtypes {
        /// Fully qualified name of the base type
        base: String,
    },
}

/// Printable summary of a resolved type
#[derive(Serialize)]
struct TypeSummary {
    name: String,
    extends: Option<String>,
    interfaces: Vec<String>,
    interface: bool,
    archive: Option<String>,
}

impl From<&ResolvedType> for TypeSummary {
    fn from(ty: &ResolvedType) -> Self {
        Self {
            name: ty.name().to_string(),
            extends: ty.super_name().map(str::to_string),
            interfaces: ty.descriptor().interfaces.clone(),
            interface: ty.is_interface(),
            archive: match ty.origin() {
                TypeOrigin::Host => None,
                TypeOrigin::Archive { location, .. } => Some(location.display().to_string()),
            },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = &args.config {
        Config::load_from_file(config_path)?
    } else {
        Config::load_default()?
    };

    // Logs go to stderr so stdout stays machine-readable
    let log_level = if args.debug {
        Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    match &args.command {
        Command::Entries { archive } => {
            let names = ArchiveEntries::open(archive)?.collect::<plugjar::Result<Vec<_>>>()?;
            print_names(&names, args.json)
        }
        Command::List => {
            let manager = load_plugins(&args, &config)?;
            print_names(&manager.list_loaded_plugin_sources(), args.json)
        }
        Command::Resolve { name } => {
            let manager = load_plugins(&args, &config)?;
            let ty = manager.resolve(name)?;
            print_types(&[ty], args.json)
        }
        Command::Subtypes { base } => {
            let manager = load_plugins(&args, &config)?;
            let base = manager.resolve(base)?;
            let subtypes = manager.find_direct_subtypes_of(&base)?;
            print_types(&subtypes, args.json)
        }
    }
}

/// Load the plugin directory from the command line, else from config
fn load_plugins(args: &Args, config: &Config) -> Result<PluginManager> {
    let directory = args.dir.as_ref().unwrap_or(&config.plugins.directory);
    PluginManager::with_options(
        directory,
        config.loader_options(),
        Arc::new(config.host_types()),
    )
    .with_context(|| format!("Failed to load plugins from {}", directory.display()))
}

fn print_names(names: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(names)?);
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(())
}

fn print_types(types: &[ResolvedType], json: bool) -> Result<()> {
    let summaries: Vec<TypeSummary> = types.iter().map(TypeSummary::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for summary in summaries {
        let extends = summary.extends.as_deref().unwrap_or("-");
        let origin = summary.archive.as_deref().unwrap_or("host");
        println!("{}\textends {}\t[{}]", summary.name, extends, origin);
    }
    Ok(())
}
