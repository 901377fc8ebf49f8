use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser as _;
use delete_old_releases::session::DEFAULT_INDEX_URL;
use delete_old_releases::types::{DEFAULT_ENV_FILE, DEFAULT_PACKAGE};
use delete_old_releases::{ConsolePrompt, PruneControl, Session, delete_n_oldest_releases};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(clap::Parser)]
#[command(version, about)]
struct Options {
    /// Don't actually delete anything
    #[arg(short, long)]
    dry_run: bool,
    /// Delete N oldest releases
    #[arg(value_name = "N")]
    number: usize,

    /// Package whose releases are deleted
    #[arg(long, default_value = DEFAULT_PACKAGE)]
    package: String,
    /// Package index to log in to
    #[arg(long, default_value = DEFAULT_INDEX_URL)]
    index_url: Url,
    /// File with KEY=VALUE lines loaded into the environment, if present
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Use verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let options = Options::parse();
    init_logging(options.verbose, options.quiet);

    if let Err(e) = real_main(options) {
        eprintln!("error: {:?}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn real_main(options: Options) -> anyhow::Result<()> {
    let session = Session::new(options.index_url)?;
    let control = PruneControl {
        package: options.package,
        number: options.number,
        dry_run: options.dry_run,
        env_file: options.env_file,
    };

    delete_n_oldest_releases(&session, &control, &mut ConsolePrompt)
        .with_context(|| format!("failed to delete old releases of `{}`", control.package))?;
    Ok(())
}
