//! Test helpers for on-disk Python projects

use std::fs;

use tempfile::TempDir;

use crate::backend::create_backend;
use crate::extractor::{BuildOptions, ExtractionResult, ModuleContext};
use crate::languages::python::build_file;
use crate::syntax::SyntaxBackend;

/// Create a temporary repository with a specific file structure.
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

/// Parse `source` as module `name` (file `name.py`) and build its graph.
pub fn build_source(name: &str, source: &str, options: &BuildOptions) -> ExtractionResult {
    let backend = create_backend("python").unwrap();
    let tree = backend.parse(source, None).unwrap();
    let ctx = ModuleContext {
        file_path: format!("{name}.py").into(),
        module_name: name.to_string(),
        is_package: false,
    };
    build_file(&ctx, &tree, options)
}

/// Build with default options.
pub fn build(source: &str) -> ExtractionResult {
    build_source("app", source, &BuildOptions::default())
}
