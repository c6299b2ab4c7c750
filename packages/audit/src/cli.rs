//! CLI command definitions and dispatch

use crate::batch::BatchConsumer;
use crate::config::AuditConfig;
use crate::processor::FileProcessor;
use crate::report::CollisionReporter;
use crate::source::LocalArchiveSource;
use crate::store::FsCollisionStore;
use crate::summary::Summary;
use crate::{AuditError, Result};
use certaudit_detect::AnalyzerMode;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Command line of the `certaudit` binary
#[derive(Parser)]
#[command(name = "certaudit")]
#[command(about = "Audit certificate archives for SHA-1 collision attacks")]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Process one archive, or every archive in a folder
    ///
    /// Prints progress while records are analyzed, then totals, every
    /// collision hash and every error with the archive it came from.
    /// Ctrl-C stops at the next record boundary.
    Work {
        /// Archive file or folder of archives
        #[arg(long, short = 'p')]
        path: PathBuf,

        /// Include archives in subfolders
        #[arg(long, short = 'r')]
        recurse: bool,

        /// Collision analysis strategy (in-process or isolated)
        #[arg(long = "sha1mode", short = 'm')]
        sha1mode: Option<AnalyzerMode>,
    },

    /// Run the batch consumer over a file of archive references
    ///
    /// References are read one per line and resolved under the configured
    /// archive root. Exits non-zero if any reference failed.
    Consume {
        /// File with one archive reference per line
        #[arg(long, short = 'b')]
        batch: PathBuf,
    },

    /// List archive references available under the archive root
    List {
        /// Only list references under this folder
        #[arg(long, short = 'f')]
        folder: Option<String>,

        /// Stop after this many references
        #[arg(long, short = 'c')]
        count: Option<usize>,
    },
}

/// Dispatch a parsed command line
///
/// # Errors
///
/// Returns configuration and setup errors, and the batch terminal signal for
/// `consume`.
pub async fn run(cli: Cli) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = AuditConfig::load(cli.config.as_deref())?;
    let cancel = listen_for_cancel();

    match cli.command {
        Commands::Work {
            path,
            recurse,
            sha1mode,
        } => run_work(&config, &path, recurse, sha1mode, &cancel).await?,
        Commands::Consume { batch } => run_consume(&config, &batch, &cancel).await?,
        Commands::List { folder, count } => run_list(&config, folder.as_deref(), count, &cancel)?,
    }
    Ok(())
}

/// Cancel the returned token on Ctrl-C
fn listen_for_cancel() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\n[*] User requested stop.");
                trigger.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });
    cancel
}

/// Archive files at `path`: the file itself, or the folder's files in path order
fn archive_files(path: &Path, recurse: bool) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let walker = WalkDir::new(path).sort_by_file_name();
    let walker = if recurse { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| AuditError::Io(e.into()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

async fn run_work(
    config: &AuditConfig,
    path: &Path,
    recurse: bool,
    mode: Option<AnalyzerMode>,
    cancel: &CancellationToken,
) -> Result<()> {
    println!("[+] Processing certificates from: {}", path.display());
    let started = Instant::now();

    let analyzer = config.build_analyzer(mode);
    let processor = FileProcessor::new().with_progress(|count, context| {
        print!("\r[+] Processed: {count} ({context})");
        let _ = std::io::stdout().flush();
    });

    let mut summaries: Vec<Summary> = Vec::new();
    for file in archive_files(path, recurse)? {
        if cancel.is_cancelled() {
            break;
        }
        println!("\r[+] {}", file.display());
        summaries.push(processor.process(&analyzer, &file, cancel).await);
    }

    let records: u64 = summaries.iter().map(Summary::records_analyzed).sum();
    let unresolved: u64 = summaries.iter().map(Summary::records_unresolved).sum();
    let collisions: usize = summaries.iter().map(|s| s.collisions().len()).sum();
    let faults: usize = summaries.iter().map(|s| s.faults().len()).sum();

    println!(
        "\r[+] Processed {} files, {records} certificates ({unresolved} unresolved) and found {collisions} collisions.",
        summaries.len()
    );
    println!("[+] {faults} errors were encountered.");

    for record in summaries.iter().flat_map(|s| s.collisions()) {
        println!("[!] Collision found with hash: {}", record.content_hash());
    }
    for summary in &summaries {
        for fault in summary.faults() {
            println!(
                "[!] Error in {} ({}) with message: {}",
                summary.source(),
                fault.scope,
                fault.error
            );
        }
    }

    println!("[*] Done in {}", format_elapsed(started.elapsed()));
    Ok(())
}

async fn run_consume(
    config: &AuditConfig,
    batch: &Path,
    cancel: &CancellationToken,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(batch).await.map_err(AuditError::Io)?;
    let references: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    info!(batch = %batch.display(), references = references.len(), "consuming batch");

    let reporter = CollisionReporter::new(
        Arc::new(FsCollisionStore::new(&config.collision_dir)),
        config.build_lookup()?,
    );
    let consumer = BatchConsumer::new(
        Arc::new(LocalArchiveSource::new(&config.archive_root)),
        reporter,
        Arc::new(config.build_analyzer(None)),
    );

    let outcome = consumer.consume(references, cancel).await;
    println!(
        "[+] Processed {} files, {} certificates, reported {} collisions; {} errors.",
        outcome.processed_count(),
        outcome.records_analyzed(),
        outcome.collisions_reported(),
        outcome.errored().len()
    );
    outcome.into_signal()?;
    Ok(())
}

fn run_list(
    config: &AuditConfig,
    folder: Option<&str>,
    count: Option<usize>,
    cancel: &CancellationToken,
) -> Result<()> {
    let source = LocalArchiveSource::new(&config.archive_root);
    let limit = count.unwrap_or(usize::MAX);

    let mut listed = 0usize;
    for reference in source.enumerate(folder)?.into_iter().take(limit) {
        if cancel.is_cancelled() {
            break;
        }
        println!("{reference}");
        listed += 1;
    }
    info!(listed, "listed archive references");
    Ok(())
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        elapsed.subsec_millis() / 10
    )
}
