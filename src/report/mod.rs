// Report generation.
// Drives the feed and comment paginators and writes one CSV row per parsed comment.

pub mod writer;

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::conduit::{CommentPaginator, Conduit, FeedPaginator, Phid};
use crate::error::{PhabStatsError, Result};
use crate::stats;

pub use writer::{ReportRow, ReportWriter};

/// What to do with a comment that carries no defect summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Abort the run.
    #[default]
    Fail,
    /// Log a warning and move on.
    Skip,
}

/// Inputs for one report run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whose activity feed to walk.
    pub user: Phid,
    /// Whose comments to extract.
    pub author: Phid,
    pub parse_policy: ParsePolicy,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub revisions: usize,
    pub rows: usize,
    pub skipped: usize,
}

/// Distinct revisions in the user's feed, in first-seen order.
pub fn collect_revisions<C: Conduit + ?Sized>(conduit: &C, user: &Phid) -> Result<Vec<Phid>> {
    let mut seen = HashSet::new();
    let mut revisions = Vec::new();

    for story in FeedPaginator::new(conduit, user.clone()) {
        let object = story?.object_phid;
        if !object.is_revision() {
            tracing::debug!(object = %object, "skipping non-revision object");
            continue;
        }
        if seen.insert(object.clone()) {
            revisions.push(object);
        }
    }

    Ok(revisions)
}

/// Build the full report.
pub fn run<C, W>(
    conduit: &C,
    options: &ReportOptions,
    writer: &mut ReportWriter<W>,
) -> Result<ReportSummary>
where
    C: Conduit + ?Sized,
    W: Write,
{
    let revisions = collect_revisions(conduit, &options.user)?;
    tracing::info!(user = %options.user, revisions = revisions.len(), "collected revisions");

    let mut summary = ReportSummary {
        revisions: revisions.len(),
        ..ReportSummary::default()
    };

    for revision in revisions {
        for comment in CommentPaginator::new(conduit, revision.clone(), options.author.clone()) {
            let comment = comment?;
            let stats = match stats::parse(comment.id, comment.raw()) {
                Ok(stats) => stats,
                Err(err) if options.parse_policy == ParsePolicy::Skip => {
                    tracing::warn!(revision = %revision, "{err}");
                    summary.skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            writer.write_row(&ReportRow {
                revision: revision.clone(),
                comment_id: comment.id,
                created_at: comment.created_at(),
                stats,
            })?;
            summary.rows += 1;
        }
    }

    tracing::info!(
        rows = summary.rows,
        skipped = summary.skipped,
        "report complete"
    );
    Ok(summary)
}

/// Build the report in memory; nothing is returned unless the whole run succeeds.
pub fn run_to_buffer<C: Conduit + ?Sized>(
    conduit: &C,
    options: &ReportOptions,
) -> Result<(ReportSummary, Vec<u8>)> {
    let mut writer = ReportWriter::new(Vec::new())?;
    let summary = run(conduit, options, &mut writer)?;
    Ok((summary, writer.finish()?))
}

/// Build the report into `path`.
///
/// Rows go to a sibling temp file that only replaces `path` once the run
/// has finished, so a failed run leaves no report behind.
pub fn run_to_file<C: Conduit + ?Sized>(
    conduit: &C,
    options: &ReportOptions,
    path: &Path,
) -> Result<ReportSummary> {
    let temp_path = temp_path_for(path);

    match write_file(conduit, options, &temp_path) {
        Ok(summary) => {
            fs::rename(&temp_path, path)?;
            Ok(summary)
        }
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                tracing::debug!(path = %temp_path.display(), "could not remove partial report: {cleanup}");
            }
            Err(err)
        }
    }
}

fn write_file<C: Conduit + ?Sized>(
    conduit: &C,
    options: &ReportOptions,
    temp_path: &Path,
) -> Result<ReportSummary> {
    let mut writer = ReportWriter::new(BufWriter::new(File::create(temp_path)?))?;
    let summary = run(conduit, options, &mut writer)?;

    let file = writer
        .finish()?
        .into_inner()
        .map_err(|e| PhabStatsError::Io(e.into_error()))?;
    file.sync_all()?;

    Ok(summary)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
