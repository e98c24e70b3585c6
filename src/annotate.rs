//! The doc-driven annotation pass.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::classify::{classify, is_ignored, Classification, DEFAULT_IGNORED};
use crate::docs::{extract_reply_labels, Confirm, DocsSource};
use crate::error::TyperError;
use crate::label::{LabelMatch, ReplyLabel};
use crate::python::{FunctionSite, PythonSource};
use crate::report::{Outcome, RunReport};
use crate::rewrite::{Annotation, Rewriter};

/// Default target, relative to a redis-py checkout.
pub const DEFAULT_TARGET: &str = "redis/commands/core.py";
pub const DEFAULT_LOG: &str = "not_changed.txt";

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    /// Function-name prefixes to skip.
    pub ignore: Vec<String>,
    pub allow_branch_returns: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            ignore: DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect(),
            allow_branch_returns: false,
        }
    }
}

pub struct Annotated {
    pub source: String,
    pub report: RunReport,
}

enum Resolution {
    Labels(Vec<ReplyLabel>),
    NoReturn,
    NoExec,
}

/// Rewrite the return annotations of every command wrapper in `source`.
///
/// Per-function failures end up in the report with a placeholder
/// annotation. A page with no reply section at all aborts the pass.
pub async fn annotate_source<D: DocsSource>(
    source: &str,
    docs: &D,
    confirm: &mut dyn Confirm,
    options: &AnnotateOptions,
) -> Result<Annotated> {
    let parsed = PythonSource::parse(source)?;
    let mut report = RunReport::default();
    let mut rewriter = Rewriter::new();

    for site in parsed.functions() {
        if site.is_async || is_ignored(&site.name, &options.ignore) {
            continue;
        }

        let resolution = resolve(&site, docs, confirm, options, &mut report.unrecognized).await;
        let outcome = match resolution {
            Ok(Resolution::Labels(labels)) => {
                rewriter.annotate(&site, &Annotation::response(labels));
                Outcome::Changed
            }
            Ok(Resolution::NoReturn) => {
                rewriter.annotate(&site, &Annotation::NoneType);
                Outcome::NoReturn
            }
            Ok(Resolution::NoExec) => {
                tracing::info!(function = %site.name, "Does not return execute_command, skipping");
                Outcome::NoExec
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(TyperError::NotDocumented(_)) => {
                rewriter.annotate(&site, &Annotation::Placeholder);
                Outcome::NotDocumented
            }
            Err(e) => {
                tracing::error!(function = %site.name, error = %e, "Function not changed");
                rewriter.annotate(&site, &Annotation::Placeholder);
                Outcome::NotChanged(e.to_string())
            }
        };
        report.record(&site.name, outcome);
    }

    tracing::info!(
        changed = report.changed.len(),
        not_changed = report.not_changed.len() + report.not_documented.len(),
        "Annotation pass finished"
    );

    Ok(Annotated {
        source: rewriter.apply(parsed.source()),
        report,
    })
}

async fn resolve<D: DocsSource>(
    site: &FunctionSite,
    docs: &D,
    confirm: &mut dyn Confirm,
    options: &AnnotateOptions,
    unrecognized: &mut Vec<String>,
) -> Result<Resolution, TyperError> {
    let command = match classify(site, options.allow_branch_returns)? {
        Classification::NoReturn => return Ok(Resolution::NoReturn),
        Classification::NoExec => return Ok(Resolution::NoExec),
        Classification::Command(command) => command,
    };
    tracing::info!(function = %site.name, command = %command, "Only returns execute_command");

    let html = docs.fetch(&site.name, &command).await?;
    let matches = extract_reply_labels(&site.name, &html, confirm)?;
    if matches.is_empty() {
        return Err(TyperError::Unresolved(site.name.clone()));
    }

    let mut labels = Vec::new();
    for m in matches {
        match m {
            LabelMatch::Label(label) => labels.push(label),
            LabelMatch::Unrecognized(text) => {
                tracing::warn!(function = %site.name, reply = %text, "Unknown reply type");
                unrecognized.push(text);
            }
        }
    }
    if labels.is_empty() {
        return Err(TyperError::OnlyUnrecognized(site.name.clone()));
    }
    Ok(Resolution::Labels(labels))
}

/// Where a file run writes.
#[derive(Debug, Clone)]
pub struct FileTargets {
    pub file: PathBuf,
    pub log: PathBuf,
    /// Leave the source file untouched; the log is still appended.
    pub dry_run: bool,
}

/// Annotate `targets.file` in place and append failures to `targets.log`.
pub async fn annotate_file<D: DocsSource>(
    targets: &FileTargets,
    docs: &D,
    confirm: &mut dyn Confirm,
    options: &AnnotateOptions,
) -> Result<RunReport> {
    let source = read_source(&targets.file)?;
    let annotated = annotate_source(&source, docs, confirm, options)
        .await
        .with_context(|| format!("Annotation of '{}' aborted", targets.file.display()))?;

    if targets.dry_run {
        tracing::info!(file = %targets.file.display(), "Dry run, not writing");
    } else {
        std::fs::write(&targets.file, &annotated.source)
            .with_context(|| format!("Cannot write '{}'", targets.file.display()))?;
    }

    annotated
        .report
        .append_log(&targets.log)
        .with_context(|| format!("Cannot append to '{}'", targets.log.display()))?;

    Ok(annotated.report)
}

pub(crate) fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Cannot read '{}'", path.display()))
}
