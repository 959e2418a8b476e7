//! Recoverable problems recorded during a build pass

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The file could not be read or decoded; it was skipped.
    FileUnreadable,
    /// The syntax adapter rejected the file; it yields an empty sub-graph.
    StructuralParseFailure,
    /// A construct was skipped in a way that affects metric accuracy.
    UnsupportedConstruct,
    /// The per-file parse budget was exceeded; the file was skipped.
    Timeout,
    /// The project build was cancelled before every file was dispatched.
    Cancelled,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::FileUnreadable => "file_unreadable",
            DiagnosticKind::StructuralParseFailure => "structural_parse_failure",
            DiagnosticKind::UnsupportedConstruct => "unsupported_construct",
            DiagnosticKind::Timeout => "timeout",
            DiagnosticKind::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub file_path: Option<PathBuf>,
    pub line: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            file_path: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn for_file(kind: DiagnosticKind, file_path: &Path, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            file_path: Some(file_path.to_path_buf()),
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind.as_str())?;
        if let Some(path) = &self.file_path {
            write!(f, " {}", path.display())?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
        }
        write!(f, " {}", self.message)
    }
}
