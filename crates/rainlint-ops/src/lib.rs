//! High-level operations shared by rainlint commands.
//!
//! The per-document tools ([`validate`], [`formatter`], [`folding`],
//! [`colors`], [`completion`]) work on text alone. [`Operations`] adds the
//! project layer on top: it expands paths into skin sources, runs the
//! validator or formatter across them in parallel and summarises the result.

pub mod colors;
pub mod completion;
pub mod diff;
pub mod folding;
pub mod formatter;
pub mod logview;
mod paths;
pub mod refresh;
mod scan;
pub mod source;
pub mod validate;

use std::io;
use std::path::PathBuf;

use rainlint_config::Config;
use rainlint_format::{render_report, CheckReport, Finding, ReportFormat, SkippedFile};
use rainlint_utils::{atomic_write, parallel_map};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use refresh::{RefreshError, RefreshOutcome, SkinEngine};
pub use scan::{ScanOptions, ScanTarget};
pub use source::{SourceEncoding, SourceError, SourceText};
pub use validate::{validate_document, PathLookup, Validator};

/// Errors raised while operating on files, as opposed to problems found in them.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("failed to walk {}: {message}", path.display())]
    Walk { path: PathBuf, message: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

/// Input for [`Operations::check`].
#[derive(Clone, Debug)]
pub struct CheckOptions {
    pub scan: ScanOptions,
    pub format: ReportFormat,
}

/// Result of a check run.
#[derive(Clone, Debug)]
pub struct CheckOutcome {
    pub report: CheckReport,
    pub rendered: String,
    /// 1 when any error-level diagnostic was produced or a file could not
    /// be read, otherwise 0.
    pub exit_code: i32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormatMode {
    /// Report files that would change.
    Check,
    /// Produce unified diffs without writing.
    Diff,
    /// Rewrite files in place.
    Write,
}

#[derive(Clone, Debug)]
pub struct FormatOptions {
    pub scan: ScanOptions,
    pub mode: FormatMode,
}

/// A file whose formatted text differs from what is on disk.
#[derive(Clone, Debug)]
pub struct FormatChange {
    pub path: PathBuf,
    pub diff: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FormatOutcome {
    pub files_scanned: usize,
    pub changes: Vec<FormatChange>,
    pub skipped: Vec<SkippedFile>,
    /// 1 when a file could not be read, else 2 in check mode when any file
    /// needs formatting, otherwise 0.
    pub exit_code: i32,
}

/// Operation bundle bound to one resolved configuration.
pub struct Operations {
    config: Config,
}

impl Operations {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate every selected skin source.
    pub fn check(&self, options: CheckOptions) -> Result<CheckOutcome, OperationError> {
        let targets = scan::collect_targets(&self.config.project, &options.scan)?;
        debug!(files = targets.len(), "checking skin sources");

        let validator = Validator::new(&self.config);
        let per_file = parallel_map(&targets, |target| -> Result<Vec<Finding>, SourceError> {
            let decoded = source::read_source(&target.absolute)?;
            Ok(validator
                .validate(&decoded.text, &target.absolute)
                .into_iter()
                .map(|diagnostic| Finding {
                    path: target.display.clone(),
                    diagnostic,
                })
                .collect())
        });

        let mut findings = Vec::new();
        let mut skipped = Vec::new();
        for (target, result) in targets.iter().zip(per_file) {
            match result {
                Ok(found) => findings.extend(found),
                Err(err) => skipped.push(skip(target, err)),
            }
        }

        let report = CheckReport::new(targets.len(), findings).with_skipped(skipped);
        let rendered = render_report(&report, options.format);
        let exit_code = i32::from(report.has_errors());
        info!(
            files = report.files_scanned,
            errors = report.error_count,
            warnings = report.warning_count,
            skipped = report.skipped.len(),
            "check complete"
        );
        Ok(CheckOutcome {
            report,
            rendered,
            exit_code,
        })
    }

    /// Format every selected skin source.
    pub fn format(&self, options: FormatOptions) -> Result<FormatOutcome, OperationError> {
        let targets = scan::collect_targets(&self.config.project, &options.scan)?;
        let mode = options.mode;

        let per_file = parallel_map(&targets, |target| -> Result<_, OperationError> {
            let decoded =
                source::read_source(&target.absolute).map_err(|err| OperationError::Source {
                    path: target.absolute.clone(),
                    source: err,
                })?;
            let original = decoded.text;
            let formatted = formatter::format_document(&original);
            if formatted == original {
                return Ok(None);
            }

            let diff = match mode {
                FormatMode::Diff => diff::build_unified_diff(
                    &original,
                    &formatted,
                    &paths::forward_slashes(&target.display),
                ),
                FormatMode::Check => None,
                FormatMode::Write => {
                    let bytes = decoded.encoding.encode(&formatted);
                    atomic_write(&target.absolute, bytes).map_err(|source| OperationError::Io {
                        path: target.absolute.clone(),
                        source,
                    })?;
                    debug!(path = %target.display.display(), "formatted");
                    None
                }
            };
            Ok(Some(FormatChange {
                path: target.display.clone(),
                diff,
            }))
        });

        let mut changes = Vec::new();
        let mut skipped = Vec::new();
        for (target, result) in targets.iter().zip(per_file) {
            match result {
                Ok(Some(change)) => changes.push(change),
                Ok(None) => {}
                Err(OperationError::Source { source, .. }) => skipped.push(skip(target, source)),
                Err(err) => return Err(err),
            }
        }

        let exit_code = if !skipped.is_empty() {
            1
        } else if mode == FormatMode::Check && !changes.is_empty() {
            2
        } else {
            0
        };
        Ok(FormatOutcome {
            files_scanned: targets.len(),
            changes,
            skipped,
            exit_code,
        })
    }
}

fn skip(target: &ScanTarget, err: SourceError) -> SkippedFile {
    warn!(path = %target.display.display(), error = %err, "skipping unreadable file");
    SkippedFile {
        path: target.display.clone(),
        reason: err.to_string(),
    }
}
