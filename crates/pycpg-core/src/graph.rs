//! Build results and a petgraph-backed query view over them

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::model::*;

/// Output contract of every build: nodes keyed by id, ordered edges, ordered
/// diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpgGraph {
    pub nodes: BTreeMap<NodeId, Node>,
    pub edges: Vec<Edge>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CpgGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values().filter(move |n| n.kind() == kind)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    pub fn functions(&self) -> impl Iterator<Item = (&Node, &FunctionNode)> + '_ {
        self.nodes
            .values()
            .filter_map(|n| n.as_function().map(|f| (n, f)))
    }

    pub fn variables(&self) -> impl Iterator<Item = (&Node, &VariableNode)> + '_ {
        self.nodes
            .values()
            .filter_map(|n| n.as_variable().map(|v| (n, v)))
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = (&Node, &CodeBlockNode)> + '_ {
        self.nodes
            .values()
            .filter_map(|n| n.as_code_block().map(|b| (n, b)))
    }

    pub fn modules(&self) -> impl Iterator<Item = (&Node, &ModuleNode)> + '_ {
        self.nodes
            .values()
            .filter_map(|n| n.as_module().map(|m| (n, m)))
    }

    /// Find a function by its fully qualified name.
    pub fn find_function(&self, qualified_name: &str) -> Option<(&Node, &FunctionNode)> {
        self.functions()
            .find(|(_, f)| f.qualified_name == qualified_name)
    }

    /// Find a module by its dotted name.
    pub fn find_module(&self, qualified_name: &str) -> Option<(&Node, &ModuleNode)> {
        self.modules()
            .find(|(_, m)| m.qualified_name == qualified_name)
    }

    /// Check if an edge of `kind` exists between two nodes.
    pub fn has_edge_between(&self, source: &NodeId, target: &NodeId, kind: EdgeKind) -> bool {
        self.edges
            .iter()
            .any(|e| e.kind == kind && &e.source == source && &e.target == target)
    }

    /// Set-union `other` into `self`.
    ///
    /// Nodes are keyed by their content-addressed id; edges and diagnostics
    /// already present are not repeated, so merging a graph with itself is a
    /// no-op and merge order only affects edge order.
    pub fn merge(&mut self, other: CpgGraph) {
        for (id, node) in other.nodes {
            self.nodes.entry(id).or_insert(node);
        }

        let mut seen: HashSet<Edge> = self.edges.iter().cloned().collect();
        for edge in other.edges {
            if seen.insert(edge.clone()) {
                self.edges.push(edge);
            }
        }

        let mut seen: HashSet<Diagnostic> = self.diagnostics.iter().cloned().collect();
        for diagnostic in other.diagnostics {
            if seen.insert(diagnostic.clone()) {
                self.diagnostics.push(diagnostic);
            }
        }
        tracing::trace!("Merged graph now has {} nodes, {} edges", self.nodes.len(), self.edges.len());
    }

    /// Build an indexed view for traversal queries.
    pub fn view(&self) -> GraphView<'_> {
        GraphView::new(self)
    }
}

/// Directed multigraph index over a [`CpgGraph`].
///
/// Placeholder targets (unresolved imports) get a vertex but no node payload.
pub struct GraphView<'g> {
    graph: &'g CpgGraph,
    inner: StableDiGraph<NodeId, EdgeKind>,
    index: HashMap<NodeId, NodeIndex>,
}

impl std::fmt::Debug for GraphView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphView")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl<'g> GraphView<'g> {
    fn new(graph: &'g CpgGraph) -> Self {
        let mut inner = StableDiGraph::new();
        let mut index = HashMap::new();

        for id in graph.nodes.keys() {
            let idx = inner.add_node(id.clone());
            index.insert(id.clone(), idx);
        }
        for edge in &graph.edges {
            let source = *index
                .entry(edge.source.clone())
                .or_insert_with(|| inner.add_node(edge.source.clone()));
            let target = *index
                .entry(edge.target.clone())
                .or_insert_with(|| inner.add_node(edge.target.clone()));
            inner.add_edge(source, target, edge.kind);
        }

        GraphView {
            graph,
            inner,
            index,
        }
    }

    /// Targets of outgoing edges of `kind`.
    pub fn targets(&self, source: &NodeId, kind: EdgeKind) -> Vec<&NodeId> {
        self.neighbors(source, kind, Direction::Outgoing)
    }

    /// Sources of incoming edges of `kind`.
    pub fn sources(&self, target: &NodeId, kind: EdgeKind) -> Vec<&NodeId> {
        self.neighbors(target, kind, Direction::Incoming)
    }

    fn neighbors(&self, id: &NodeId, kind: EdgeKind, direction: Direction) -> Vec<&NodeId> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        self.inner
            .edges_directed(idx, direction)
            .filter(|e| *e.weight() == kind)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.inner.node_weight(other)
            })
            .collect()
    }

    /// Every CONTAINS parent of a node. A well-formed graph has exactly one
    /// for each non-module node.
    pub fn containment_parents(&self, id: &NodeId) -> Vec<&NodeId> {
        self.sources(id, EdgeKind::Contains)
    }

    /// Walk CONTAINS edges upward, nearest ancestor first.
    pub fn ancestors(&self, id: &NodeId) -> Vec<&NodeId> {
        let mut ancestors = Vec::new();
        let mut visited = HashSet::new();
        let mut current = id;

        while let Some(parent) = self.containment_parents(current).into_iter().next() {
            if !visited.insert(parent) {
                break;
            }
            ancestors.push(parent);
            current = parent;
        }

        ancestors
    }

    /// The module at the root of a node's CONTAINS chain.
    pub fn module_of(&self, id: &NodeId) -> Option<&'g Node> {
        if let Some(node) = self.graph.node(id) {
            if node.kind() == NodeKind::Module {
                return Some(node);
            }
        }
        self.ancestors(id)
            .last()
            .and_then(|root| self.graph.node(root))
            .filter(|n| n.kind() == NodeKind::Module)
    }

    /// Non-module nodes that do not hang off exactly one module via a single
    /// CONTAINS chain.
    pub fn containment_violations(&self) -> Vec<&'g NodeId> {
        self.graph
            .nodes
            .values()
            .filter(|n| n.kind() != NodeKind::Module)
            .filter(|n| {
                self.containment_parents(&n.id).len() != 1 || self.module_of(&n.id).is_none()
            })
            .map(|n| &n.id)
            .collect()
    }
}
