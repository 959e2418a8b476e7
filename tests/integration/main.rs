//! Integration tests for pycpg
//!
//! These tests drive the public parser surface and the CLI binary together.

use std::fs;
use std::path::Path;
use std::process::Command;

use pycpg_core::{CpgGraph, DiagnosticKind, EdgeKind, NodeKind};
use pycpg_indexer::{CpgParser, ParserConfig, TreeSitterCpgParser};
use tempfile::TempDir;

fn write_project(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full_path = temp_dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full_path, content).unwrap();
    }
    temp_dir
}

fn sample_project() -> TempDir {
    write_project(&[
        ("shop/__init__.py", "from .cart import Cart\n\n__all__ = ['Cart']\n"),
        (
            "shop/cart.py",
            "from .pricing import total\n\nclass Cart:\n    def __init__(self):\n        self.items = []\n\n    def checkout(self, payment_token):\n        if not self.items:\n            return 0\n        return total(self.items)\n",
        ),
        (
            "shop/pricing.py",
            "TAX = 0.2\n\ndef total(items):\n    amount = 0\n    for item in items:\n        amount += item.price\n    return amount * (1 + TAX)\n",
        ),
        ("run.py", "import shop\n\nif __name__ == '__main__':\n    shop.Cart().checkout('tok')\n"),
    ])
}

fn pycpg() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pycpg"))
}

#[test]
fn test_project_graph_end_to_end() {
    let project = sample_project();
    let parser = TreeSitterCpgParser::new(ParserConfig::default()).unwrap();
    let graph = parser.parse_project(project.path()).unwrap();

    assert!(graph.diagnostics.is_empty(), "{:?}", graph.diagnostics);
    assert_eq!(graph.nodes_of_kind(NodeKind::Module).count(), 4);
    assert!(graph.view().containment_violations().is_empty());

    let (_, package) = graph.find_module("shop").unwrap();
    assert_eq!(package.exports, vec!["Cart"]);
    let (_, run) = graph.find_module("run").unwrap();
    assert!(run.is_entrypoint);

    assert!(graph.find_function("shop.cart.Cart.__init__").is_none());
    let (checkout, f) = graph.find_function("shop.cart.Cart.checkout").unwrap();
    assert!(f.is_method);
    assert_eq!(f.cyclomatic_complexity, 2);

    let (total, _) = graph.find_function("shop.pricing.total").unwrap();
    assert!(graph.has_edge_between(&checkout.id, &total.id, EdgeKind::Calls));

    let (cart, _) = graph.find_module("shop.cart").unwrap();
    let (pricing, _) = graph.find_module("shop.pricing").unwrap();
    assert!(graph.has_edge_between(&cart.id, &pricing.id, EdgeKind::Imports));

    let (_, token) = graph
        .variables()
        .find(|(n, _)| n.name == "payment_token")
        .unwrap();
    assert!(token.is_sensitive);
}

#[test]
fn test_exclude_patterns_skip_files() {
    let project = sample_project();
    let config = ParserConfig {
        exclude: vec!["**/__init__.py".to_string()],
        ..Default::default()
    };
    let graph = TreeSitterCpgParser::new(config)
        .unwrap()
        .parse_project(project.path())
        .unwrap();

    assert!(graph.find_module("shop").is_none());
    assert!(graph.find_module("shop.cart").is_some());
}

#[test]
fn test_config_file_is_honoured() {
    let project = sample_project();
    let config_path = project.path().join("pycpg.toml");
    fs::write(&config_path, "ignore_magic = false\nworkers = 1\n").unwrap();

    let config = ParserConfig::load(&config_path).unwrap();
    let graph = TreeSitterCpgParser::new(config)
        .unwrap()
        .parse_project(project.path())
        .unwrap();

    assert!(graph.find_function("shop.cart.Cart.__init__").is_some());
}

#[test]
fn test_cli_parse_writes_json() {
    let project = sample_project();
    let out = project.path().join("graph.json");

    let status = pycpg()
        .arg("parse")
        .arg(project.path().join("shop"))
        .arg("--output")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let graph: CpgGraph = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert!(graph.find_module("cart").is_some());
    assert!(graph.find_function("pricing.total").is_some());
}

#[test]
fn test_cli_json_uses_kind_tags() {
    let project = write_project(&[("tool.py", "import os\n\ndef main():\n    pass\n")]);

    let output = pycpg()
        .arg("parse")
        .arg(project.path().join("tool.py"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let kinds: Vec<&str> = json["nodes"]
        .as_object()
        .unwrap()
        .values()
        .filter_map(|n| n["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"module"));
    assert!(kinds.contains(&"function"));
    assert_eq!(json["edges"][0]["kind"], "IMPORTS");
}

#[test]
fn test_cli_summary_reports_diagnostics() {
    let project = write_project(&[
        ("ok.py", "def fine():\n    return 1\n"),
        ("bad.py", "class (:\n"),
    ]);

    let output = pycpg().arg("summary").arg(project.path()).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("diagnostics: 1"));
    assert!(stdout.contains("[structural_parse_failure]"));
    assert!(stdout.contains("ok.fine (1)"));
}

#[test]
fn test_cli_rejects_missing_path() {
    let output = pycpg()
        .arg("summary")
        .arg(Path::new("/no/such/project"))
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_broken_file_reported_not_fatal() {
    let project = write_project(&[("a.py", "x = 1\n"), ("b.py", "def (\n")]);
    let parser = TreeSitterCpgParser::new(ParserConfig::default()).unwrap();
    let graph = parser.parse_project(project.path()).unwrap();

    assert_eq!(graph.diagnostics.len(), 1);
    assert_eq!(graph.diagnostics[0].kind, DiagnosticKind::StructuralParseFailure);
    assert!(graph.find_module("a").is_some());
}
