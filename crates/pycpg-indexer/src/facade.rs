//! Parser facade: the surface loaders, pipelines and the CLI program against

use std::path::Path;

use globset::GlobSet;
use pycpg_core::{CpgError, CpgGraph, Diagnostic, Result};

use crate::backend::{Grammar, TreeSitterBackend};
use crate::config::ParserConfig;
use crate::coordinator::{CancellationToken, Coordinator};
use crate::discovery::{compile_excludes, find_source_files};
use crate::extractor::{LanguageExtractor, ModuleContext};
use crate::languages::get_extractor;
use crate::resolver::{Resolver, merge_results};
use crate::syntax::SyntaxBackend;

/// Turns Python sources into a code property graph.
///
/// Both calls return nodes, edges and diagnostics together. Only problems
/// detected before any file is processed are returned as `Err`.
pub trait CpgParser {
    fn parse_file(&self, path: &Path) -> Result<CpgGraph>;

    fn parse_project(&self, root: &Path) -> Result<CpgGraph>;
}

pub struct TreeSitterCpgParser {
    config: ParserConfig,
    backend: Box<dyn SyntaxBackend>,
    extractor: Box<dyn LanguageExtractor>,
    excludes: GlobSet,
    grammar: Grammar,
}

impl std::fmt::Debug for TreeSitterCpgParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSitterCpgParser")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

impl TreeSitterCpgParser {
    /// Load the configured grammar. Fails before any parsing when the backend
    /// is unavailable or the configuration is invalid.
    pub fn new(config: ParserConfig) -> Result<Self> {
        let grammar = Grammar::from_name(&config.grammar)?;
        let backend = TreeSitterBackend::new(grammar)?;
        Self::with_backend(config, Box::new(backend))
    }

    /// Use a caller-supplied syntax backend for the configured grammar.
    pub fn with_backend(config: ParserConfig, backend: Box<dyn SyntaxBackend>) -> Result<Self> {
        config.validate()?;
        let grammar = Grammar::from_name(&config.grammar)?;
        let excludes = compile_excludes(&config.exclude)?;

        tracing::debug!("Parser ready with backend {}", backend.name());
        Ok(TreeSitterCpgParser {
            extractor: get_extractor(grammar),
            config,
            backend,
            excludes,
            grammar,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    fn coordinator(&self) -> Coordinator<'_> {
        Coordinator::new(self.backend.as_ref(), self.extractor.as_ref(), self.config.build_options())
            .with_timeout(self.config.file_timeout())
            .with_workers(self.config.worker_count())
    }

    /// Build a whole project, stopping file dispatch once `cancel` fires.
    /// Partial results are returned with a cancellation diagnostic.
    pub fn parse_project_with_cancel(&self, root: &Path, cancel: &CancellationToken) -> Result<CpgGraph> {
        if !root.is_dir() {
            return Err(CpgError::InvalidRoot(root.to_path_buf()));
        }

        let files = find_source_files(root, self.grammar, &self.excludes)?;
        tracing::info!("Parsing {} files under {}", files.len(), root.display());

        let run = self.coordinator().run_full_index(root, &files, cancel)?;
        let cancelled = run.cancellation_diagnostic();
        let resolver = Resolver::new(&run.results, self.config.unresolved_imports);
        let graph = merge_results(run.results, &resolver, cancelled);

        tracing::info!(
            "Built graph: {} nodes, {} edges, {} diagnostics",
            graph.node_count(),
            graph.edge_count(),
            graph.diagnostics.len()
        );
        Ok(graph)
    }
}

impl CpgParser for TreeSitterCpgParser {
    fn parse_file(&self, path: &Path) -> Result<CpgGraph> {
        if !path.is_file() {
            return Err(CpgError::InvalidFile(path.to_path_buf()));
        }

        let ctx = ModuleContext::for_single_file(path);
        let result = self.coordinator().build_isolated(&ctx)?;
        let results = vec![result];
        let resolver = Resolver::new(&results, self.config.unresolved_imports);
        Ok(merge_results(results, &resolver, None::<Diagnostic>))
    }

    fn parse_project(&self, root: &Path) -> Result<CpgGraph> {
        self.parse_project_with_cancel(root, &CancellationToken::new())
    }
}
