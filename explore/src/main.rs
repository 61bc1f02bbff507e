//! Explore state resolution CLI.
//!
//! Resolves the form data for an explore view against a file-backed store and
//! prints the response as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;

use explore::assemble::SliceDataSerializer;
use explore::command::{ExploreContext, GetExploreCommand};
use explore::core::types::{CommandParameters, RequestParams};
use explore::exit_codes;
use explore::io::config::{ExploreConfig, load_config, write_config};
use explore::io::form_data_cache::FsFormDataCache;
use explore::io::permalink::FsPermalinkStore;
use explore::io::slices::FsSliceRepository;
use explore::io::store::{InitOptions, StorePaths, init_store};
use explore::loader::SliceFormDataLoader;
use explore::logging;

#[derive(Parser)]
#[command(
    name = "explore",
    version,
    about = "Resolve the form data that drives a chart explore view"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "explore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config and create the data directory layout.
    Init {
        /// Overwrite the config and reset the slice/datasource indexes.
        #[arg(short, long)]
        force: bool,
    },
    /// Resolve explore state and print it as JSON.
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
struct ResolveArgs {
    /// Permalink key; takes precedence over every other source.
    #[arg(long)]
    permalink_key: Option<String>,

    /// Key of cached form data.
    #[arg(long)]
    form_data_key: Option<String>,

    /// Chart id used as fallback and for slice defaults.
    #[arg(long)]
    slice_id: Option<i64>,

    /// Request parameter as `key=value`; repeat a key to pass a list.
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Override the configured data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::for_error(&err));
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Resolve(args) => cmd_resolve(&cli.config, args),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    let cfg = if force || !config_path.exists() {
        let cfg = ExploreConfig::default();
        write_config(config_path, &cfg).context("write config")?;
        cfg
    } else {
        load_config(config_path)?
    };
    let data_dir = cfg.resolve_data_dir(config_path);
    init_store(&data_dir, &InitOptions { force })
        .with_context(|| format!("initialize store {}", data_dir.display()))?;
    Ok(())
}

fn cmd_resolve(config_path: &Path, args: ResolveArgs) -> Result<()> {
    let cfg = load_config(config_path)?;
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| cfg.resolve_data_dir(config_path));
    let paths = StorePaths::new(&data_dir);

    let permalinks = FsPermalinkStore::new(paths.clone())?;
    let cache = FsFormDataCache::new(paths.clone());
    let loader = SliceFormDataLoader::new(FsSliceRepository::new(paths));
    let request_params = RequestParams::from_pairs(args.params);

    let command = GetExploreCommand::new(CommandParameters {
        permalink_key: args.permalink_key,
        form_data_key: args.form_data_key,
        slice_id: args.slice_id,
    });
    let ctx = ExploreContext {
        permalinks: &permalinks,
        form_data_cache: &cache,
        loader: &loader,
        serializer: &SliceDataSerializer,
        request_params: &request_params,
        ignored_params: &cfg.request_params.ignored,
        span: tracing::info_span!("resolve", data_dir = %data_dir.display()),
    };
    let response = command.run(&ctx).context("resolve explore state")?;
    print_json(&response)
}

/// Print `value` as pretty JSON with trailing newline.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}

fn parse_param(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(anyhow!("parameter key must not be empty"));
    }
    Ok((key.to_string(), value.to_string()))
}
