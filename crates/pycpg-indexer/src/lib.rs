//! Python source discovery, parsing and graph construction

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod extractor;
pub mod facade;
pub mod heuristics;
pub mod languages;
pub mod metrics;
pub mod resolver;
pub mod scope;
pub mod syntax;

#[cfg(test)]
pub mod test_utils;

pub use backend::{Grammar, TreeSitterBackend, create_backend};
pub use config::{ParserConfig, UnresolvedImportPolicy};
pub use coordinator::{CancellationToken, Coordinator, IndexRun};
pub use extractor::{BuildOptions, ExtractionResult, LanguageExtractor, ModuleContext};
pub use facade::{CpgParser, TreeSitterCpgParser};
pub use heuristics::{SensitivityHeuristic, UserInputHeuristic};
pub use syntax::{CstNode, ParseError, SyntaxBackend, SyntaxTree};
