//! tree-sitter implementation of the syntax adapter
//!
//! tree-sitter parsers are neither `Send` nor `Sync`, so the backend holds only
//! the grammar and creates a parser for every call. That keeps a single backend
//! shareable across the worker pool without any locking.

use std::path::Path;
use std::time::Duration;

use pycpg_core::{CpgError, Result, Span};
use tree_sitter::{Language, Parser, TreeCursor};

use crate::syntax::{CstNode, MAX_TREE_DEPTH, ParseError, SyntaxBackend, SyntaxTree};

/// Grammars this build knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Python,
}

impl Grammar {
    /// Select a grammar by its configured name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Grammar::Python),
            other => Err(CpgError::BackendUnavailable {
                backend: format!("tree-sitter-{other}"),
                reason: format!("no grammar named `{other}` is compiled into this build"),
                remediation: "Set `grammar = \"python\"`; it is the only grammar bundled with pycpg."
                    .to_string(),
            }),
        }
    }

    /// Whether a file belongs to this grammar, judged by extension.
    pub fn matches_path(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions().contains(&ext)
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Grammar::Python => &["py"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Grammar::Python => "python",
        }
    }

    fn language(&self) -> Language {
        match self {
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

pub struct TreeSitterBackend {
    grammar: Grammar,
    language: Language,
    name: String,
}

impl std::fmt::Debug for TreeSitterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSitterBackend")
            .field("grammar", &self.grammar)
            .finish()
    }
}

impl TreeSitterBackend {
    /// Load `grammar` and confirm the runtime accepts it.
    ///
    /// Fails with [`CpgError::BackendUnavailable`] when the grammar's ABI does
    /// not match the linked tree-sitter runtime.
    pub fn new(grammar: Grammar) -> Result<Self> {
        let language = grammar.language();
        let name = format!("tree-sitter-{}", grammar.name());

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| CpgError::BackendUnavailable {
                backend: name.clone(),
                reason: e.to_string(),
                remediation: format!(
                    "Rebuild pycpg with a {name} release whose ABI matches the linked \
                     tree-sitter runtime (tree-sitter 0.24 pairs with {name} 0.23)."
                ),
            })?;

        tracing::debug!("Loaded {} grammar", name);
        Ok(TreeSitterBackend {
            grammar,
            language,
            name,
        })
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }
}

impl SyntaxBackend for TreeSitterBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, source: &str, timeout: Option<Duration>) -> std::result::Result<SyntaxTree, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseError::Aborted(e.to_string()))?;
        // TODO: tree-sitter 0.25 replaces `set_timeout_micros` with a progress
        // callback on `parse_with_options`; switch when the pin is bumped.
        if let Some(budget) = timeout {
            let micros = u64::try_from(budget.as_micros()).unwrap_or(u64::MAX);
            parser.set_timeout_micros(micros.max(1));
        }

        let tree = match parser.parse(source, None) {
            Some(tree) => tree,
            None => {
                return Err(match timeout {
                    Some(budget) => ParseError::Timeout { budget },
                    None => ParseError::Aborted("backend returned no tree".to_string()),
                });
            }
        };

        let mut cursor = tree.walk();
        let root = convert(&mut cursor, MAX_TREE_DEPTH)?;

        if let Some(bad) = root.first_error() {
            return Err(ParseError::Structural {
                line: bad.span.start_line,
                column: bad.span.start_col,
            });
        }

        Ok(SyntaxTree {
            source: source.to_string(),
            root,
        })
    }
}

/// Copy the tree under the cursor into an owned [`CstNode`].
///
/// Walks with an explicit stack of open nodes so source nesting never turns
/// into native recursion. Trees deeper than `limit` are rejected.
fn convert(cursor: &mut TreeCursor<'_>, limit: usize) -> std::result::Result<CstNode, ParseError> {
    let mut open = vec![leaf(cursor)];

    loop {
        if cursor.goto_first_child() {
            if open.len() >= limit {
                return Err(ParseError::TooDeep {
                    line: cursor.node().start_position().row as u32 + 1,
                    limit,
                });
            }
            open.push(leaf(cursor));
            continue;
        }

        // Close finished nodes until one has a next sibling.
        loop {
            let Some(done) = open.pop() else {
                return Err(ParseError::Aborted("cursor walk lost its root".to_string()));
            };
            let Some(parent) = open.last_mut() else {
                return Ok(done);
            };
            parent.children.push(done);

            if cursor.goto_next_sibling() {
                open.push(leaf(cursor));
                break;
            }
            cursor.goto_parent();
        }
    }
}

fn leaf(cursor: &TreeCursor<'_>) -> CstNode {
    let node = cursor.node();
    let start = node.start_position();
    let end = node.end_position();
    CstNode {
        kind: node.kind().to_string(),
        field: cursor.field_name().map(str::to_string),
        is_named: node.is_named(),
        is_error: node.is_error() || node.is_missing(),
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        span: Span {
            start_line: start.row as u32 + 1,
            start_col: start.column as u32,
            end_line: end.row as u32 + 1,
            end_col: end.column as u32,
        },
        children: Vec::with_capacity(node.child_count()),
    }
}

/// Backend for the named grammar.
pub fn create_backend(grammar: &str) -> Result<TreeSitterBackend> {
    TreeSitterBackend::new(Grammar::from_name(grammar)?)
}
