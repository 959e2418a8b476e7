//! Language extractor trait and the per-file build result

use std::path::{Path, PathBuf};

use pycpg_core::{CpgGraph, Diagnostic, Edge, Node, NodeId};

use crate::heuristics::{SensitivityHeuristic, UserInputHeuristic};
use crate::syntax::SyntaxTree;

/// Options shared by every file of one build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Skip functions and variables with double-underscore names.
    pub ignore_magic: bool,
    pub sensitivity: SensitivityHeuristic,
    pub user_input: UserInputHeuristic,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            ignore_magic: true,
            sensitivity: SensitivityHeuristic::default(),
            user_input: UserInputHeuristic::default(),
        }
    }
}

/// Where a file sits in its project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleContext {
    pub file_path: PathBuf,
    /// Dotted module name (`pkg.sub.mod`).
    pub module_name: String,
    /// True for package initialisers, which anchor relative imports one level
    /// lower than a plain module does.
    pub is_package: bool,
}

impl ModuleContext {
    /// Context for a file inside a project rooted at `root`.
    ///
    /// `pkg/mod.py` is `pkg.mod`, `pkg/__init__.py` is `pkg`, and a root-level
    /// `__init__.py` takes the root directory's name.
    pub fn for_project_file(root: &Path, file_path: &Path) -> Self {
        let relative = file_path.strip_prefix(root).unwrap_or(file_path);
        let mut parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        let is_package = parts.last().is_some_and(|p| p == "__init__.py");
        if is_package {
            parts.pop();
        } else if let Some(last) = parts.last_mut() {
            if let Some(stem) = last.strip_suffix(".py") {
                *last = stem.to_string();
            }
        }
        parts.retain(|p| !p.is_empty());

        let module_name = if parts.is_empty() {
            dir_name(root)
        } else {
            parts.join(".")
        };

        ModuleContext {
            file_path: file_path.to_path_buf(),
            module_name,
            is_package,
        }
    }

    /// Context for a file parsed on its own: the module is named after the
    /// file stem, or after its directory for `__init__.py`.
    pub fn for_single_file(file_path: &Path) -> Self {
        let is_package = file_path.file_name().is_some_and(|n| n == "__init__.py");
        let module_name = if is_package {
            file_path.parent().map(dir_name).unwrap_or_default()
        } else {
            file_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        ModuleContext {
            file_path: file_path.to_path_buf(),
            module_name: if module_name.is_empty() {
                "__main__".to_string()
            } else {
                module_name
            },
            is_package,
        }
    }

    /// Resolve a possibly relative `from` target (`..pkg.mod`) to an absolute
    /// dotted module name.
    pub fn resolve_relative(&self, raw: &str) -> String {
        let text = raw.trim();
        let module = text.trim_start_matches('.');
        let leading = text.len() - module.len();
        if leading == 0 {
            return module.to_string();
        }

        let mut base: Vec<&str> = self.module_name.split('.').filter(|p| !p.is_empty()).collect();
        if !self.is_package {
            base.pop();
        }
        let steps_up = leading - 1;
        base.truncate(base.len().saturating_sub(steps_up));

        if !module.is_empty() {
            base.push(module);
        }
        base.join(".")
    }
}

fn dir_name(path: &Path) -> String {
    path.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A call whose callee may live in another file, kept for the resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    pub caller: NodeId,
    /// Fully qualified name the callee would have if it exists.
    pub callee: String,
    pub line: u32,
}

/// Everything one file contributes to the project graph.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub file_path: PathBuf,
    pub module_name: String,
    /// Absent when the file failed before a module node could be emitted.
    pub module_id: Option<NodeId>,
    /// Nodes in emission order.
    pub nodes: Vec<Node>,
    /// Edges in emission order.
    pub edges: Vec<Edge>,
    pub diagnostics: Vec<Diagnostic>,
    /// Qualified name to id for every function node in the file.
    pub functions: Vec<(String, NodeId)>,
    pub pending_calls: Vec<PendingCall>,
}

impl ExtractionResult {
    /// Empty sub-graph carrying a single diagnostic.
    pub fn failed(ctx: &ModuleContext, diagnostic: Diagnostic) -> Self {
        ExtractionResult {
            file_path: ctx.file_path.clone(),
            module_name: ctx.module_name.clone(),
            diagnostics: vec![diagnostic],
            ..Default::default()
        }
    }

    pub fn into_graph(self) -> CpgGraph {
        CpgGraph {
            nodes: self.nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            edges: self.edges,
            diagnostics: self.diagnostics,
        }
    }
}

/// Builds a file graph from a parsed tree for one grammar.
pub trait LanguageExtractor: Send + Sync {
    fn extract(&self, ctx: &ModuleContext, tree: &SyntaxTree, options: &BuildOptions) -> ExtractionResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(module_name: &str, is_package: bool) -> ModuleContext {
        ModuleContext {
            file_path: PathBuf::from("x.py"),
            module_name: module_name.to_string(),
            is_package,
        }
    }

    #[test]
    fn test_project_module_names() {
        let root = Path::new("/proj");
        assert_eq!(
            ModuleContext::for_project_file(root, Path::new("/proj/pkg/mod.py")).module_name,
            "pkg.mod"
        );
        let init = ModuleContext::for_project_file(root, Path::new("/proj/pkg/__init__.py"));
        assert_eq!(init.module_name, "pkg");
        assert!(init.is_package);
        assert_eq!(
            ModuleContext::for_project_file(root, Path::new("/proj/__init__.py")).module_name,
            "proj"
        );
    }

    #[test]
    fn test_single_file_module_names() {
        assert_eq!(ModuleContext::for_single_file(Path::new("a/b/tool.py")).module_name, "tool");
        assert_eq!(ModuleContext::for_single_file(Path::new("a/b/__init__.py")).module_name, "b");
    }

    #[test]
    fn test_relative_imports() {
        let module = ctx("pkg.sub.mod", false);
        assert_eq!(module.resolve_relative("os.path"), "os.path");
        assert_eq!(module.resolve_relative(".sibling"), "pkg.sub.sibling");
        assert_eq!(module.resolve_relative(".."), "pkg");
        assert_eq!(module.resolve_relative("..util.io"), "pkg.util.io");
        assert_eq!(module.resolve_relative("....far"), "far");

        let package = ctx("pkg.sub", true);
        assert_eq!(package.resolve_relative(".mod"), "pkg.sub.mod");
        assert_eq!(package.resolve_relative("..other"), "pkg.other");
    }
}
