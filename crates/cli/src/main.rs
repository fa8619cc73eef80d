//! sitesync - incremental directory publisher

use anyhow::{bail, Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use sitesync_cache::CacheSession;
use sitesync_core::Submit;
use sitesync_engine::{Publisher, SnapshotSource, SyncOptions, SyncReport};
use sitesync_transport::LocalTransport;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

/// Publish local directories into a target tree, uploading only what the
/// submission policy selects.
#[derive(Parser)]
#[command(name = "sitesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Local directories to publish
    #[arg(required = true)]
    dirs: Vec<PathBuf>,

    /// Root directory of the publish target
    #[arg(long)]
    target: Option<PathBuf>,

    /// Remote directory to start the session in (default: /)
    #[arg(long)]
    init_dir: Option<String>,

    /// Snapshot cache file; when given, remote state is remembered between
    /// runs instead of being listed every time
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Submission policy; repeat to combine
    /// (missing-or-changed, changed-today, missing-or-changed-today, all)
    #[arg(long)]
    submit: Vec<Submit>,

    /// Only publish files ending with this extension (e.g. .html); repeatable
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Publish under this remote name instead of the local directory path
    /// (single directory only)
    #[arg(long)]
    remote_name: Option<String>,

    /// Descend into subdirectories
    #[arg(long)]
    recurse: bool,

    /// Log each directory as it is processed
    #[arg(short, long)]
    verbose: bool,

    /// TOML config file supplying defaults for the other flags
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "info" } else { "warn" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let target = cli
        .target
        .or(config.target)
        .context("no publish target: pass --target or set it in the config file")?;
    let init_dir = cli
        .init_dir
        .or(config.init_dir)
        .unwrap_or_else(|| "/".to_string());
    let cache_path = cli.cache.or(config.cache);
    let submit = resolve_submit(&cli.submit, config.submit.as_deref())?;
    let extensions = if cli.extensions.is_empty() {
        config.extensions
    } else {
        Some(cli.extensions)
    };
    let recurse = cli.recurse || config.recurse.unwrap_or(false);

    if cli.remote_name.is_some() && cli.dirs.len() != 1 {
        bail!("--remote-name only makes sense with a single directory");
    }

    let transport = LocalTransport::new(&target)
        .with_context(|| format!("failed to open publish target {}", target.display()))?;

    let opts = SyncOptions {
        extensions,
        remote_name: cli.remote_name,
        submit: None,
        recurse,
    };

    let report = match cache_path {
        Some(path) => {
            let mut session = CacheSession::open(&path)
                .with_context(|| format!("failed to open snapshot cache {}", path.display()))?;
            let report = run(
                transport,
                &init_dir,
                submit,
                cli.verbose,
                SnapshotSource::Cached(session.cache_mut()),
                &cli.dirs,
                &opts,
            )?;
            session
                .close()
                .with_context(|| format!("failed to save snapshot cache {}", path.display()))?;
            report
        }
        None => run(
            transport,
            &init_dir,
            submit,
            cli.verbose,
            SnapshotSource::Live,
            &cli.dirs,
            &opts,
        )?,
    };

    println!(
        "{} {} uploaded, {} skipped",
        "✓".green(),
        report.uploaded.len(),
        report.skipped
    );
    if cli.verbose {
        for path in &report.uploaded {
            println!("  {}", path.display().cyan());
        }
    }

    Ok(())
}

fn run(
    transport: LocalTransport,
    init_dir: &str,
    submit: Submit,
    verbose: bool,
    source: SnapshotSource<'_>,
    dirs: &[PathBuf],
    opts: &SyncOptions,
) -> Result<SyncReport> {
    let mut publisher = Publisher::new(transport, init_dir, submit, verbose, source)?;
    let mut report = SyncReport::default();
    for dir in dirs {
        let sub = publisher
            .sync_dir(dir, opts)
            .with_context(|| format!("failed to publish {}", dir.display()))?;
        report.merge(sub);
    }
    Ok(report)
}

/// Fold the policy flags into one bitset; flags beat the config file, and
/// neither given means missing-or-changed.
fn resolve_submit(flags: &[Submit], from_config: Option<&[String]>) -> Result<Submit> {
    if let Some(combined) = flags.iter().copied().reduce(|a, b| a | b) {
        return Ok(combined);
    }
    if let Some(names) = from_config {
        let mut combined = None;
        for name in names {
            let policy: Submit = name
                .parse()
                .with_context(|| format!("bad submit policy in config file: {name:?}"))?;
            combined = Some(combined.map_or(policy, |acc: Submit| acc | policy));
        }
        if let Some(combined) = combined {
            return Ok(combined);
        }
    }
    Ok(Submit::MISSING_OR_CHANGED)
}
