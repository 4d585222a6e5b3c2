use anyhow::{bail, Context, Result};
use clap::Parser;
use rssfilter::config::Config;
use rssfilter::Pipeline;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Take a feed, keep only the entries matching the given filters, and print a
/// valid (pretty-printed) RSS feed for any ordinary feed reader.
#[derive(Parser, Debug)]
#[command(name = "rssfilter", version, about)]
struct Args {
    /// Target feed to fetch and apply filters to (URL or local path)
    source: String,

    /// Regex filter(s) to apply to post URLs
    #[arg(short = 'u', long = "url-filter", value_name = "REGEX", num_args = 1..)]
    url_filter: Vec<String>,

    /// Regex filter(s) to apply to post titles
    #[arg(short = 't', long = "title-filter", value_name = "REGEX", num_args = 1..)]
    title_filter: Vec<String>,

    /// Combine two filters with OR (default) or AND. Regex alternation covers
    /// multiple values of one filter type; this is for mixing URL and title filters.
    #[arg(long, value_name = "AND|OR")]
    operation: Option<String>,

    /// Config file (defaults to ~/.config/rssfilter/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    // stdout carries the feed document, so logs go to stderr
    let default_directive = if verbose { "rssfilter=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config named on the command line, else the default location.
///
/// Only the default location may be absent; a missing `--config` file is an error.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) if !path.exists() => bail!("Config file {} does not exist", path.display()),
        Some(path) => path.to_path_buf(),
        None => match Config::default_path() {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };
    Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let operation = args.operation.as_deref().unwrap_or(&config.operation);

    let pipeline = Pipeline::new(&config).context("Failed to create HTTP client")?;
    let document = pipeline
        .build_and_run(&args.source, &args.url_filter, &args.title_filter, operation)
        .await
        .with_context(|| format!("Failed to filter feed '{}'", args.source))?;

    println!("{document}");
    Ok(())
}
