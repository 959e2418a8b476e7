//! Source file discovery under a project root
//!
//! Walks with the `ignore` crate, so `.gitignore` rules and hidden entries are
//! honoured even outside a git checkout. Exclude globs are matched against
//! root-relative paths. Results are sorted for reproducible builds.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use pycpg_core::{CpgError, Result};

use crate::backend::Grammar;

/// Directories never worth descending into.
const SKIPPED_DIRS: &[&str] = &["__pycache__"];

/// Compile caller-supplied exclude patterns.
pub fn compile_excludes(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| CpgError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| CpgError::InvalidPattern {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })
}

/// Every source file for `grammar` under `root`, minus excluded paths.
pub fn find_source_files(root: &Path, grammar: Grammar, excludes: &GlobSet) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CpgError::InvalidRoot(root.to_path_buf()));
    }

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .require_git(false)
        .follow_links(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().is_some_and(|t| t.is_dir()) && SKIPPED_DIRS.iter().any(|d| *d == name))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if !grammar.matches_path(path) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if excludes.is_match(relative) {
            tracing::debug!("Excluded {}", relative.display());
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_repo_with_structure;

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_finds_python_files_sorted() {
        let repo = create_repo_with_structure(&[
            ("b.py", "x = 1\n"),
            ("a.py", "y = 2\n"),
            ("pkg/__init__.py", ""),
            ("pkg/mod.py", "z = 3\n"),
            ("README.md", "# readme\n"),
            ("pkg/__pycache__/mod.cpython-312.py", "stale = 1\n"),
            (".hidden/secret.py", "token = 'x'\n"),
        ]);

        let files = find_source_files(repo.path(), Grammar::Python, &GlobSet::empty()).unwrap();
        assert_eq!(
            relative(repo.path(), &files),
            vec!["a.py", "b.py", "pkg/__init__.py", "pkg/mod.py"]
        );
    }

    #[test]
    fn test_respects_gitignore() {
        let repo = create_repo_with_structure(&[
            (".gitignore", "build/\n"),
            ("build/gen.py", "x = 1\n"),
            ("main.py", "x = 1\n"),
        ]);

        let files = find_source_files(repo.path(), Grammar::Python, &GlobSet::empty()).unwrap();
        assert_eq!(relative(repo.path(), &files), vec!["main.py"]);
    }

    #[test]
    fn test_exclude_patterns_are_root_relative() {
        let repo = create_repo_with_structure(&[
            ("pkg/__init__.py", ""),
            ("pkg/mod.py", "x = 1\n"),
            ("tests/test_mod.py", "x = 1\n"),
        ]);

        let excludes = compile_excludes(&["**/__init__.py".to_string(), "tests/**".to_string()]).unwrap();
        let files = find_source_files(repo.path(), Grammar::Python, &excludes).unwrap();
        assert_eq!(relative(repo.path(), &files), vec!["pkg/mod.py"]);
    }

    #[test]
    fn test_invalid_pattern_and_root() {
        let err = compile_excludes(&["[unclosed".to_string()]).unwrap_err();
        assert!(matches!(err, CpgError::InvalidPattern { .. }));

        let err = find_source_files(Path::new("/definitely/not/here"), Grammar::Python, &GlobSet::empty())
            .unwrap_err();
        assert!(matches!(err, CpgError::InvalidRoot(_)));
    }
}
