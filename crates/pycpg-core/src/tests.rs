//! Unit tests for pycpg-core

use crate::*;
use std::path::{Path, PathBuf};

fn module_node(path: &str, name: &str) -> Node {
    let file = PathBuf::from(path);
    Node {
        id: compute_id(&file, NodeKind::Module, name, 1, 0),
        name: name.rsplit('.').next().unwrap_or(name).to_string(),
        file_path: file,
        span: Span { start_line: 1, start_col: 0, end_line: 10, end_col: 0 },
        payload: NodePayload::Module(ModuleNode {
            qualified_name: name.to_string(),
            imports: vec![],
            exports: vec![],
            is_entrypoint: false,
        }),
    }
}

fn function_node(path: &str, qualified_name: &str, line: u32) -> Node {
    let file = PathBuf::from(path);
    Node {
        id: compute_id(&file, NodeKind::Function, qualified_name, line, 0),
        name: qualified_name.rsplit('.').next().unwrap_or(qualified_name).to_string(),
        file_path: file,
        span: Span { start_line: line, start_col: 0, end_line: line + 1, end_col: 0 },
        payload: NodePayload::Function(FunctionNode {
            qualified_name: qualified_name.to_string(),
            parameters: vec![Parameter { name: "x".to_string(), type_hint: Some("int".to_string()) }],
            return_type_hint: None,
            signature_text: "def f(x: int)".to_string(),
            token_count: 12,
            cyclomatic_complexity: 1,
            is_method: false,
            decorators: vec![],
        }),
    }
}

fn variable_node(path: &str, qualified_name: &str, owner: &NodeId) -> Node {
    let file = PathBuf::from(path);
    Node {
        id: compute_id(&file, NodeKind::Variable, qualified_name, 2, 4),
        name: qualified_name.rsplit('.').next().unwrap_or(qualified_name).to_string(),
        file_path: file,
        span: Span { start_line: 2, start_col: 4, end_line: 2, end_col: 5 },
        payload: NodePayload::Variable(VariableNode {
            scope: VariableScope::Function,
            type_hint: None,
            is_sensitive: false,
            is_user_input: false,
            owning_scope_id: owner.clone(),
        }),
    }
}

fn small_graph() -> CpgGraph {
    let module = module_node("app.py", "app");
    let function = function_node("app.py", "app.run", 1);
    let variable = variable_node("app.py", "app.run.x", &function.id);

    let mut graph = CpgGraph::new();
    graph.edges.push(Edge::new(module.id.clone(), function.id.clone(), EdgeKind::Contains, Some(1)));
    graph.edges.push(Edge::new(function.id.clone(), variable.id.clone(), EdgeKind::Contains, Some(2)));
    graph.edges.push(Edge::new(function.id.clone(), variable.id.clone(), EdgeKind::Assigns, Some(2)));
    for node in [module, function, variable] {
        graph.nodes.insert(node.id.clone(), node);
    }
    graph
}

#[test]
fn test_node_kind_accessors() {
    let node = function_node("a.py", "a.f", 3);
    assert_eq!(node.kind(), NodeKind::Function);
    assert!(node.as_function().is_some());
    assert!(node.as_module().is_none());
    assert!(node.as_variable().is_none());
}

#[test]
fn test_node_serializes_with_kind_tag() {
    let node = function_node("a.py", "a.f", 3);
    let json = serde_json::to_value(&node).unwrap();

    assert_eq!(json["kind"], "function");
    assert_eq!(json["qualified_name"], "a.f");
    assert_eq!(json["id"], node.id.as_str());

    let back: Node = serde_json::from_value(json).unwrap();
    assert_eq!(back, node);
}

#[test]
fn test_edge_kind_wire_names() {
    let json = serde_json::to_string(&EdgeKind::References).unwrap();
    assert_eq!(json, "\"REFERENCES\"");
    assert_eq!(EdgeKind::Assigns.to_string(), "ASSIGNS");
}

#[test]
fn test_merge_is_idempotent() {
    let once = small_graph();
    let mut twice = small_graph();
    twice.merge(small_graph());

    assert_eq!(twice, once);
}

#[test]
fn test_merge_unions_distinct_graphs() {
    let mut graph = small_graph();
    let other_module = module_node("lib.py", "lib");
    let mut other = CpgGraph::new();
    other.nodes.insert(other_module.id.clone(), other_module);
    other.diagnostics.push(Diagnostic::new(DiagnosticKind::Cancelled, "stopped"));

    graph.merge(other.clone());
    graph.merge(other);

    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 3);
    assert_eq!(graph.diagnostics.len(), 1);
}

#[test]
fn test_view_containment_chain() {
    let graph = small_graph();
    let view = graph.view();
    let (module, _) = graph.find_module("app").unwrap();
    let (function, _) = graph.find_function("app.run").unwrap();
    let variable = graph.nodes_of_kind(NodeKind::Variable).next().unwrap();

    assert_eq!(view.ancestors(&variable.id), vec![&function.id, &module.id]);
    assert_eq!(view.module_of(&variable.id).map(|n| &n.id), Some(&module.id));
    assert_eq!(view.targets(&function.id, EdgeKind::Assigns), vec![&variable.id]);
    assert!(view.containment_violations().is_empty());
}

#[test]
fn test_view_reports_orphans() {
    let mut graph = small_graph();
    let orphan = function_node("app.py", "app.lost", 9);
    graph.nodes.insert(orphan.id.clone(), orphan.clone());

    let view = graph.view();
    assert_eq!(view.containment_violations(), vec![&orphan.id]);
}

#[test]
fn test_symbol_table_prefix_resolution() {
    let mut table = SymbolTable::new();
    let pkg = NodeId("pkg".to_string());
    let util = NodeId("util".to_string());
    table.insert_module("pkg", pkg.clone());
    table.insert_module("pkg.util", util.clone());

    assert_eq!(table.resolve_module("pkg.util.helper"), Some(("pkg.util", &util)));
    assert_eq!(table.resolve_module("pkg.other"), Some(("pkg", &pkg)));
    assert_eq!(table.resolve_module("os.path"), None);
}

#[test]
fn test_diagnostic_display() {
    let diagnostic = Diagnostic::for_file(
        DiagnosticKind::StructuralParseFailure,
        Path::new("pkg/broken.py"),
        "syntax error",
    )
    .at_line(3);

    insta::assert_snapshot!(diagnostic.to_string(), @"[structural_parse_failure] pkg/broken.py:3 syntax error");
}

#[test]
fn test_backend_error_carries_remediation() {
    let err = CpgError::BackendUnavailable {
        backend: "tree-sitter-python".to_string(),
        reason: "incompatible language version".to_string(),
        remediation: "Rebuild with a matching grammar.".to_string(),
    };
    assert!(err.is_fatal_backend());
    assert!(err.to_string().contains("Rebuild with a matching grammar."));
}
