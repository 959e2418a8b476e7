//! Content-addressed node identity
//!
//! Identifiers are a pure function of (file path, kind, qualified name, start
//! position, occurrence). No counters and no process state are involved, so
//! re-parsing unchanged source yields byte-identical identifiers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::model::{NodeId, NodeKind};

/// Number of digest bytes kept in the rendered identifier (128 bits).
const ID_BYTES: usize = 16;

/// Kind tag used for unresolved import placeholders.
const EXTERNAL_TAG: &str = "external";

/// Compute the identifier of the first construct at a location.
pub fn compute_id(
    file_path: &Path,
    kind: NodeKind,
    qualified_name: &str,
    start_line: u32,
    start_col: u32,
) -> NodeId {
    compute_id_with_occurrence(file_path, kind, qualified_name, start_line, start_col, 0)
}

/// Compute the identifier of the `occurrence`-th construct sharing the same
/// (kind, qualified name, location) tuple.
pub fn compute_id_with_occurrence(
    file_path: &Path,
    kind: NodeKind,
    qualified_name: &str,
    start_line: u32,
    start_col: u32,
    occurrence: u32,
) -> NodeId {
    let path = file_path.to_string_lossy();
    digest(&[
        path.as_bytes(),
        kind.as_str().as_bytes(),
        qualified_name.as_bytes(),
        &start_line.to_le_bytes(),
        &start_col.to_le_bytes(),
        &occurrence.to_le_bytes(),
    ])
}

impl NodeId {
    /// Synthetic target for an import that does not resolve to a project module.
    ///
    /// Placeholders never appear in a node map.
    pub fn external(module_path: &str) -> Self {
        digest(&[EXTERNAL_TAG.as_bytes(), module_path.as_bytes()])
    }
}

fn digest(fields: &[&[u8]]) -> NodeId {
    let mut hasher = Sha256::new();
    for field in fields {
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart.
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    let out = hasher.finalize();

    let hex = out
        .iter()
        .take(ID_BYTES)
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>();
    NodeId(hex)
}

/// Per-file issuer of identifiers.
///
/// Owned by a single traversal and dropped with it. Tracks the tuples already
/// issued so that two constructs reported at the same location get distinct
/// occurrence indices.
#[derive(Debug)]
pub struct IdAllocator {
    file_path: PathBuf,
    issued: HashMap<(NodeKind, String, u32, u32), u32>,
}

impl IdAllocator {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        IdAllocator {
            file_path: file_path.into(),
            issued: HashMap::new(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn allocate(
        &mut self,
        kind: NodeKind,
        qualified_name: &str,
        start_line: u32,
        start_col: u32,
    ) -> NodeId {
        let slot = self
            .issued
            .entry((kind, qualified_name.to_string(), start_line, start_col))
            .or_insert(0);
        let occurrence = *slot;
        *slot += 1;
        compute_id_with_occurrence(
            &self.file_path,
            kind,
            qualified_name,
            start_line,
            start_col,
            occurrence,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_deterministic() {
        let path = PathBuf::from("pkg/mod.py");
        let a = compute_id(&path, NodeKind::Function, "pkg.mod.run", 3, 0);
        let b = compute_id(&path, NodeKind::Function, "pkg.mod.run", 3, 0);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_id_depends_on_every_component() {
        let path = PathBuf::from("a.py");
        let base = compute_id(&path, NodeKind::Variable, "a.x", 1, 0);
        assert_ne!(base, compute_id(&PathBuf::from("b.py"), NodeKind::Variable, "a.x", 1, 0));
        assert_ne!(base, compute_id(&path, NodeKind::Function, "a.x", 1, 0));
        assert_ne!(base, compute_id(&path, NodeKind::Variable, "a.y", 1, 0));
        assert_ne!(base, compute_id(&path, NodeKind::Variable, "a.x", 2, 0));
        assert_ne!(base, compute_id(&path, NodeKind::Variable, "a.x", 1, 4));
    }

    #[test]
    fn test_length_prefix_prevents_field_bleed() {
        let path = PathBuf::from("m.py");
        let a = compute_id(&path, NodeKind::Variable, "ab", 1, 0);
        let b = compute_id(&PathBuf::from("m.pya"), NodeKind::Variable, "b", 1, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_allocator_disambiguates_same_location() {
        let mut ids = IdAllocator::new("m.py");
        let first = ids.allocate(NodeKind::Variable, "m.x", 1, 0);
        let second = ids.allocate(NodeKind::Variable, "m.x", 1, 0);
        assert_ne!(first, second);
        assert_eq!(first, compute_id(&PathBuf::from("m.py"), NodeKind::Variable, "m.x", 1, 0));
        assert_eq!(
            second,
            compute_id_with_occurrence(&PathBuf::from("m.py"), NodeKind::Variable, "m.x", 1, 0, 1)
        );
    }

    #[test]
    fn test_external_placeholder_is_stable() {
        assert_eq!(NodeId::external("os.path"), NodeId::external("os.path"));
        assert_ne!(NodeId::external("os.path"), NodeId::external("os"));
    }
}
