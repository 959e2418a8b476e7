//! Orchestrates parallel per-file builds
//!
//! Each file is read, parsed and extracted on its own, with no state shared
//! between workers. Anything that goes wrong with a single file becomes a
//! diagnostic on that file's result; only pool construction can fail the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use pycpg_core::{CpgError, Diagnostic, DiagnosticKind, Result};
use rayon::prelude::*;

use crate::extractor::{BuildOptions, ExtractionResult, LanguageExtractor, ModuleContext};
use crate::syntax::{ParseError, SyntaxBackend};

/// Worker thread stack size. Builders recurse once per syntax tree level.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Cooperative cancellation flag, checked before each file is dispatched.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-file results of one project run, in the order files were given.
#[derive(Debug, Default)]
pub struct IndexRun {
    pub results: Vec<ExtractionResult>,
    /// Files never dispatched because the run was cancelled.
    pub skipped: usize,
}

impl IndexRun {
    /// Summary diagnostic for a cancelled run.
    pub fn cancellation_diagnostic(&self) -> Option<Diagnostic> {
        (self.skipped > 0).then(|| {
            Diagnostic::new(
                DiagnosticKind::Cancelled,
                format!(
                    "build cancelled: {} of {} files were not processed",
                    self.skipped,
                    self.skipped + self.results.len()
                ),
            )
        })
    }
}

pub struct Coordinator<'a> {
    backend: &'a dyn SyntaxBackend,
    extractor: &'a dyn LanguageExtractor,
    options: BuildOptions,
    timeout: Option<Duration>,
    workers: usize,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        backend: &'a dyn SyntaxBackend,
        extractor: &'a dyn LanguageExtractor,
        options: BuildOptions,
    ) -> Self {
        Coordinator {
            backend,
            extractor,
            options,
            timeout: None,
            workers: 2,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    fn pool(&self, threads: usize) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("pycpg-worker-{i}"))
            .stack_size(WORKER_STACK_SIZE)
            .build()
            .map_err(|e| CpgError::WorkerPool(e.to_string()))
    }

    /// Build a single file on a worker thread rather than the caller's, so
    /// the builder always gets a full worker stack.
    pub fn build_isolated(&self, ctx: &ModuleContext) -> Result<ExtractionResult> {
        let pool = self.pool(1)?;
        Ok(pool.install(|| self.build_path(ctx)))
    }

    /// Build every file under `root` on a bounded worker pool.
    ///
    /// In-flight files finish when `cancel` fires; files not yet dispatched
    /// are counted in [`IndexRun::skipped`].
    pub fn run_full_index(
        &self,
        root: &Path,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<IndexRun> {
        let pool = self.pool(self.workers)?;

        tracing::debug!("Dispatching {} files to {} workers", files.len(), self.workers);
        let skipped = AtomicUsize::new(0);

        let results: Vec<Option<ExtractionResult>> = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    if cancel.is_cancelled() {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        return None;
                    }
                    let ctx = ModuleContext::for_project_file(root, path);
                    Some(self.build_path(&ctx))
                })
                .collect()
        });

        let skipped = skipped.into_inner();
        if skipped > 0 {
            tracing::warn!("Build cancelled; {} files skipped", skipped);
        }

        Ok(IndexRun {
            results: results.into_iter().flatten().collect(),
            skipped,
        })
    }

    /// Read and build one file.
    pub fn build_path(&self, ctx: &ModuleContext) -> ExtractionResult {
        let path = &ctx.file_path;
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                return ExtractionResult::failed(
                    ctx,
                    Diagnostic::for_file(DiagnosticKind::FileUnreadable, path, format!("cannot read file: {e}")),
                );
            }
        };
        let source = match String::from_utf8(bytes) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("{} is not valid UTF-8", path.display());
                return ExtractionResult::failed(
                    ctx,
                    Diagnostic::for_file(
                        DiagnosticKind::FileUnreadable,
                        path,
                        format!("file is not valid UTF-8 (invalid byte at offset {})", e.utf8_error().valid_up_to()),
                    ),
                );
            }
        };

        self.build_source(ctx, &source)
    }

    /// Parse and build already-loaded source.
    pub fn build_source(&self, ctx: &ModuleContext, source: &str) -> ExtractionResult {
        let path = &ctx.file_path;
        match self.backend.parse(source, self.timeout) {
            Ok(tree) => self.extractor.extract(ctx, &tree, &self.options),
            Err(ParseError::Structural { line, column }) => {
                tracing::warn!("Syntax error in {} at {}:{}", path.display(), line, column);
                ExtractionResult::failed(
                    ctx,
                    Diagnostic::for_file(
                        DiagnosticKind::StructuralParseFailure,
                        path,
                        format!("syntax error at line {line}, column {column}; file skipped"),
                    )
                    .at_line(line),
                )
            }
            Err(err @ ParseError::Timeout { .. }) => {
                tracing::warn!("Timed out parsing {}", path.display());
                ExtractionResult::failed(
                    ctx,
                    Diagnostic::for_file(DiagnosticKind::Timeout, path, err.to_string()),
                )
            }
            Err(ParseError::TooDeep { line, limit }) => {
                tracing::warn!("{} nests deeper than {} levels", path.display(), limit);
                ExtractionResult::failed(
                    ctx,
                    Diagnostic::for_file(
                        DiagnosticKind::UnsupportedConstruct,
                        path,
                        format!("syntax tree nests deeper than {limit} levels at line {line}; file skipped"),
                    )
                    .at_line(line),
                )
            }
            Err(err @ ParseError::Aborted(_)) => {
                tracing::warn!("{} failed on {}: {}", self.backend.name(), path.display(), err);
                ExtractionResult::failed(
                    ctx,
                    Diagnostic::for_file(DiagnosticKind::StructuralParseFailure, path, err.to_string()),
                )
            }
        }
    }
}
