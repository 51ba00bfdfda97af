// phab-stats entry point.
// Parses arguments, sets up logging and the Conduit client, then writes the defect report.

mod cache;
mod conduit;
mod config;
mod error;
mod report;
mod stats;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::{DiskCache, MemoryCache};
use crate::conduit::{Conduit, ConduitClient, HttpTransport, Phid};
use crate::config::Config;
use crate::error::Result;
use crate::report::{ParsePolicy, ReportOptions, ReportSummary};

/// Collect static-analysis defect counts from a Phabricator user's review comments.
#[derive(Debug, Parser)]
#[command(name = "phab-stats", version, about)]
struct Cli {
    /// User PHID whose activity feed is walked.
    #[arg(long)]
    user: String,
    /// Comment author PHID; defaults to --user.
    #[arg(long)]
    author: Option<String>,
    /// CSV output path; stdout when omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Conduit API base URL (overrides PHABRICATOR_URL).
    #[arg(long)]
    base_url: Option<String>,
    /// Response cache directory (overrides PHAB_STATS_CACHE_DIR).
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Keep responses in memory only.
    #[arg(long, conflicts_with_all = ["cache_dir", "cache_max_age"])]
    no_cache: bool,
    /// Ignore cached responses older than this many seconds.
    #[arg(long, value_name = "SECS")]
    cache_max_age: Option<u64>,
    /// Warn about comments without a defect summary instead of failing.
    #[arg(long)]
    skip_unparsable: bool,
    /// Enable debug logging.
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            tracing::info!(
                revisions = summary.revisions,
                rows = summary.rows,
                skipped = summary.skipped,
                "all done"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            if err.is_configuration() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "phab_stats=debug" } else { "phab_stats=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<ReportSummary> {
    let mut config = Config::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(cache_dir) = &cli.cache_dir {
        config = config.with_cache_dir(cache_dir.clone());
    }
    tracing::debug!(?config, "loaded configuration");

    let user = Phid::user(&cli.user)?;
    let author = match &cli.author {
        Some(author) => Phid::user(author)?,
        None => user.clone(),
    };
    let options = ReportOptions {
        user,
        author,
        parse_policy: if cli.skip_unparsable {
            ParsePolicy::Skip
        } else {
            ParsePolicy::Fail
        },
    };

    let transport = HttpTransport::new()?;
    if cli.no_cache {
        let client = ConduitClient::new(config, transport, MemoryCache::new());
        emit(&client, &options, cli.output.as_deref())
    } else {
        let mut cache = DiskCache::new(config.cache_dir().clone());
        if let Some(secs) = cli.cache_max_age {
            cache = cache.with_max_age(Duration::from_secs(secs));
        }
        tracing::debug!(root = %cache.root().display(), "using disk cache");
        let client = ConduitClient::new(config, transport, cache);
        emit(&client, &options, cli.output.as_deref())
    }
}

/// Write the finished report to `output`, or to stdout once the run has succeeded.
fn emit<C: Conduit>(
    client: &C,
    options: &ReportOptions,
    output: Option<&Path>,
) -> Result<ReportSummary> {
    match output {
        Some(path) => report::run_to_file(client, options, path),
        None => {
            let (summary, csv) = report::run_to_buffer(client, options)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(&csv)?;
            stdout.flush()?;
            Ok(summary)
        }
    }
}
