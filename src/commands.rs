//! CLI command implementations

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use pycpg_core::{CpgGraph, EdgeKind, NodeKind};
use pycpg_indexer::{CpgParser, ParserConfig, TreeSitterCpgParser, UnresolvedImportPolicy};

/// Command-line settings layered over the configuration file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub include_magic: bool,
    pub exclude: Vec<String>,
    pub workers: Option<usize>,
    pub drop_unresolved: bool,
}

impl Overrides {
    pub fn into_config(self) -> anyhow::Result<ParserConfig> {
        let mut config = match &self.config {
            Some(path) => ParserConfig::load(path)?,
            None => ParserConfig::default(),
        };
        if self.include_magic {
            config.ignore_magic = false;
        }
        config.exclude.extend(self.exclude);
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if self.drop_unresolved {
            config.unresolved_imports = UnresolvedImportPolicy::Drop;
        }
        config.validate()?;
        Ok(config)
    }
}

fn build(path: &Path, overrides: Overrides) -> anyhow::Result<CpgGraph> {
    let parser = TreeSitterCpgParser::new(overrides.into_config()?)?;
    let graph = if path.is_dir() {
        parser.parse_project(path)?
    } else {
        parser.parse_file(path)?
    };

    for diagnostic in &graph.diagnostics {
        tracing::warn!("{}", diagnostic);
    }
    Ok(graph)
}

pub fn parse(path: &Path, output: Option<&Path>, overrides: Overrides) -> anyhow::Result<()> {
    let graph = build(path, overrides)?;
    let json = serde_json::to_string_pretty(&graph).context("failed to serialize graph")?;

    match output {
        Some(out) => {
            fs::write(out, json).with_context(|| format!("cannot write {}", out.display()))?;
            tracing::info!("Wrote graph to {}", out.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

pub fn summary(path: &Path, overrides: Overrides) -> anyhow::Result<()> {
    let graph = build(path, overrides)?;
    print!("{}", render_summary(&graph));
    Ok(())
}

/// Most complex functions listed in the summary.
const TOP_FUNCTIONS: usize = 5;

pub fn render_summary(graph: &CpgGraph) -> String {
    let mut out = String::new();

    out.push_str(&format!("nodes: {}\n", graph.node_count()));
    for kind in [NodeKind::Module, NodeKind::Function, NodeKind::CodeBlock, NodeKind::Variable] {
        out.push_str(&format!("  {}: {}\n", kind, graph.nodes_of_kind(kind).count()));
    }

    let mut edges: BTreeMap<EdgeKind, usize> = BTreeMap::new();
    for edge in &graph.edges {
        *edges.entry(edge.kind).or_default() += 1;
    }
    out.push_str(&format!("edges: {}\n", graph.edge_count()));
    for (kind, count) in &edges {
        out.push_str(&format!("  {kind}: {count}\n"));
    }

    let entrypoints: Vec<&str> = graph
        .modules()
        .filter(|(_, m)| m.is_entrypoint)
        .map(|(_, m)| m.qualified_name.as_str())
        .collect();
    if !entrypoints.is_empty() {
        out.push_str(&format!("entrypoints: {}\n", entrypoints.join(", ")));
    }

    let mut functions: Vec<_> = graph.functions().map(|(_, f)| f).collect();
    functions.sort_by(|a, b| {
        b.cyclomatic_complexity
            .cmp(&a.cyclomatic_complexity)
            .then_with(|| a.qualified_name.cmp(&b.qualified_name))
    });
    if !functions.is_empty() {
        out.push_str("most complex:\n");
        for f in functions.iter().take(TOP_FUNCTIONS) {
            out.push_str(&format!("  {} ({})\n", f.qualified_name, f.cyclomatic_complexity));
        }
    }

    let mut sensitive: Vec<String> = graph
        .variables()
        .filter(|(_, v)| v.is_sensitive)
        .map(|(n, _)| format!("{}:{} {}", n.file_path.display(), n.span.start_line, n.name))
        .collect();
    sensitive.sort();
    if !sensitive.is_empty() {
        out.push_str("sensitive variables:\n");
        for entry in &sensitive {
            out.push_str(&format!("  {entry}\n"));
        }
    }

    out.push_str(&format!("diagnostics: {}\n", graph.diagnostics.len()));
    for diagnostic in &graph.diagnostics {
        out.push_str(&format!("  {diagnostic}\n"));
    }
    out
}
