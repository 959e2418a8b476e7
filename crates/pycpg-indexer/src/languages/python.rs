//! Python graph builder over the tree-sitter-python syntax tree

use std::collections::{HashMap, HashSet};

use pycpg_core::{
    BlockKind, CodeBlockNode, Diagnostic, DiagnosticKind, Edge, EdgeKind, FunctionNode,
    IdAllocator, ModuleNode, Node, NodeId, NodeKind, NodePayload, Parameter, Span, VariableNode,
};

use crate::extractor::{BuildOptions, ExtractionResult, LanguageExtractor, ModuleContext, PendingCall};
use crate::heuristics::{is_magic, is_main_guard};
use crate::metrics;
use crate::scope::{BindingTarget, Frame, FrameKind, ScopeStack};
use crate::syntax::{CstNode, SyntaxTree};

/// Node kinds that hold several binding targets.
const TARGET_GROUPS: &[&str] = &[
    "pattern_list",
    "tuple_pattern",
    "list_pattern",
    "tuple",
    "list",
    "parenthesized_expression",
    "list_splat_pattern",
    "list_splat",
];

pub struct PythonExtractor;

impl LanguageExtractor for PythonExtractor {
    fn extract(&self, ctx: &ModuleContext, tree: &SyntaxTree, options: &BuildOptions) -> ExtractionResult {
        build_file(ctx, tree, options)
    }
}

/// Build the graph of one parsed Python file.
pub fn build_file(ctx: &ModuleContext, tree: &SyntaxTree, options: &BuildOptions) -> ExtractionResult {
    let mut builder = GraphBuilder::new(ctx, &tree.source, options);
    builder.run(&tree.root);
    let result = builder.finish();

    tracing::debug!(
        "Built {} as `{}`: {} nodes, {} edges, {} pending calls",
        ctx.file_path.display(),
        ctx.module_name,
        result.nodes.len(),
        result.edges.len(),
        result.pending_calls.len()
    );
    result
}

struct GraphBuilder<'a> {
    ctx: &'a ModuleContext,
    source: &'a str,
    options: &'a BuildOptions,
    ids: IdAllocator,
    scopes: ScopeStack,
    module_id: NodeId,

    nodes: Vec<Node>,
    edges: Vec<Edge>,
    seen_edges: HashSet<Edge>,
    diagnostics: Vec<Diagnostic>,
    functions: Vec<(String, NodeId)>,
    pending_calls: Vec<PendingCall>,

    imports: Vec<String>,
    /// Name bound by an import statement -> canonical dotted path.
    import_aliases: HashMap<String, String>,
    export_candidates: Vec<String>,
    explicit_exports: Option<Vec<String>>,
    is_entrypoint: bool,
}

impl<'a> GraphBuilder<'a> {
    fn new(ctx: &'a ModuleContext, source: &'a str, options: &'a BuildOptions) -> Self {
        let mut ids = IdAllocator::new(ctx.file_path.clone());
        let module_id = ids.allocate(NodeKind::Module, &ctx.module_name, 1, 0);

        GraphBuilder {
            ctx,
            source,
            options,
            ids,
            scopes: ScopeStack::new(),
            module_id,
            nodes: Vec::new(),
            edges: Vec::new(),
            seen_edges: HashSet::new(),
            diagnostics: Vec::new(),
            functions: Vec::new(),
            pending_calls: Vec::new(),
            imports: Vec::new(),
            import_aliases: HashMap::new(),
            export_candidates: Vec::new(),
            explicit_exports: None,
            is_entrypoint: false,
        }
    }

    fn run(&mut self, root: &CstNode) {
        let name = self
            .ctx
            .module_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();
        let module = ModuleNode {
            qualified_name: self.ctx.module_name.clone(),
            imports: Vec::new(),
            exports: Vec::new(),
            is_entrypoint: false,
        };
        self.emit(None, self.module_id.clone(), &name, root.span, NodePayload::Module(module));

        self.scopes.push(Frame::new(
            FrameKind::Module,
            self.ctx.module_name.clone(),
            Some(self.module_id.clone()),
        ));
        self.visit_children(root);
        self.scopes.pop();
    }

    fn finish(mut self) -> ExtractionResult {
        let exports = match self.explicit_exports.take() {
            Some(listed) => listed,
            None => {
                let mut exports = Vec::new();
                for name in self.export_candidates.drain(..) {
                    if !name.starts_with('_') {
                        push_unique(&mut exports, name);
                    }
                }
                exports
            }
        };
        let is_entrypoint = self.is_entrypoint
            || self
                .ctx
                .file_path
                .file_name()
                .is_some_and(|n| n == "__main__.py");

        if let Some(Node {
            payload: NodePayload::Module(module),
            ..
        }) = self.nodes.first_mut()
        {
            module.imports = std::mem::take(&mut self.imports);
            module.exports = exports;
            module.is_entrypoint = is_entrypoint;
        }

        ExtractionResult {
            file_path: self.ctx.file_path.clone(),
            module_name: self.ctx.module_name.clone(),
            module_id: Some(self.module_id),
            nodes: self.nodes,
            edges: self.edges,
            diagnostics: self.diagnostics,
            functions: self.functions,
            pending_calls: self.pending_calls,
        }
    }

    fn text(&self, node: &CstNode) -> &'a str {
        node.text(self.source)
    }

    fn at_module_level(&self) -> bool {
        self.scopes.depth() == 1
    }

    fn emit(&mut self, parent: Option<NodeId>, id: NodeId, name: &str, span: Span, payload: NodePayload) {
        if let Some(parent) = parent {
            self.link(parent, id.clone(), EdgeKind::Contains, span.start_line);
        }
        self.nodes.push(Node {
            id,
            name: name.to_string(),
            file_path: self.ctx.file_path.clone(),
            span,
            payload,
        });
    }

    fn link(&mut self, source: NodeId, target: NodeId, kind: EdgeKind, line: u32) {
        self.add_edge(Edge::new(source, target, kind, Some(line)));
    }

    fn add_edge(&mut self, edge: Edge) {
        if self.seen_edges.insert(edge.clone()) {
            self.edges.push(edge);
        }
    }

    fn visit_children(&mut self, node: &CstNode) {
        for child in &node.children {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: &CstNode) {
        match node.kind.as_str() {
            "function_definition" => self.visit_function(node, Vec::new()),
            "class_definition" => self.visit_class(node),
            "decorated_definition" => self.visit_decorated(node),
            "import_statement" => self.visit_import(node),
            "import_from_statement" => self.visit_import_from(node),
            "future_import_statement" | "comment" | "type" => {}
            "global_statement" => self.declare(node, true),
            "nonlocal_statement" => self.declare(node, false),
            "assignment" => self.visit_assignment(node),
            "augmented_assignment" => self.visit_augmented_assignment(node),
            "named_expression" => {
                if let Some(value) = node.child_by_field("value") {
                    self.visit(value);
                }
                if let Some(name) = node.child_by_field("name") {
                    let target = self.scopes.assignment_expression_target(self.text(name));
                    self.bind_name_into(name, None, target);
                }
            }
            "for_statement" => self.visit_for(node),
            "while_statement" => self.visit_block(node, BlockKind::Loop),
            "if_statement" => self.visit_if(node),
            "match_statement" => self.visit_block(node, BlockKind::Conditional),
            "try_statement" => self.visit_block(node, BlockKind::ExceptionHandler),
            "with_statement" => self.visit_block(node, BlockKind::ContextManager),
            "except_clause" | "except_group_clause" | "as_pattern" => self.visit_aliased(node),
            "lambda" => self.visit_lambda(node),
            "call" => self.visit_call(node),
            "attribute" => {
                if let Some(object) = node.child_by_field("object") {
                    self.visit(object);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field("value") {
                    self.visit(value);
                }
            }
            "list_comprehension" | "set_comprehension" | "dictionary_comprehension" | "generator_expression" => {
                self.visit_comprehension(node)
            }
            "identifier" => self.read(node),
            _ => self.visit_children(node),
        }
    }

    // ----- definitions -----

    fn visit_decorated(&mut self, node: &CstNode) {
        let mut decorators = Vec::new();
        for decorator in node.children.iter().filter(|c| c.is("decorator")) {
            if let Some(expr) = decorator.named_children().find(|c| !c.is("comment")) {
                decorators.push(self.decorator_name(expr));
                self.visit(expr);
            }
        }

        match node.child_by_field("definition") {
            Some(def) if def.is("function_definition") => self.visit_function(def, decorators),
            Some(def) => self.visit(def),
            None => {}
        }
    }

    fn decorator_name(&self, expr: &CstNode) -> String {
        let target = if expr.is("call") {
            expr.child_by_field("function").unwrap_or(expr)
        } else {
            expr
        };
        squash(self.text(target))
    }

    fn visit_function(&mut self, node: &CstNode, decorators: Vec<String>) {
        let Some(name_node) = node.child_by_field("name") else {
            return self.visit_children(node);
        };
        let name = self.text(name_node);
        if self.options.ignore_magic && is_magic(name) {
            tracing::trace!("Skipping magic function {} in {}", name, self.ctx.module_name);
            return;
        }

        let params_node = node.child_by_field("parameters");
        if let Some(params) = params_node {
            for param in params.named_children() {
                if let Some(default) = param.child_by_field("value") {
                    self.visit(default);
                }
            }
        }

        let qualified_name = self.scopes.qualify(name);
        let line = node.start_line();
        let id = self
            .ids
            .allocate(NodeKind::Function, &qualified_name, line, node.span.start_col);
        let parameters = params_node
            .map(|p| self.parameters(p))
            .unwrap_or_default();
        let body = node.child_by_field("body");

        let function = FunctionNode {
            qualified_name: qualified_name.clone(),
            parameters: parameters.iter().map(|(p, _)| p.clone()).collect(),
            return_type_hint: node
                .child_by_field("return_type")
                .map(|t| self.text(t).trim().to_string()),
            signature_text: self.signature(node),
            token_count: metrics::token_count(node),
            cyclomatic_complexity: body.map(metrics::cyclomatic_complexity).unwrap_or(1),
            is_method: self.scopes.in_class(),
            decorators,
        };

        let parent = self.scopes.containment_parent().cloned();
        self.emit(parent, id.clone(), name, node.span, NodePayload::Function(function));
        if let Some(owner) = self.scopes.owner().cloned() {
            self.link(owner, id.clone(), EdgeKind::Defines, line);
        }
        self.functions.push((qualified_name.clone(), id.clone()));
        self.scopes.bind_function(name, id.clone());
        if self.at_module_level() {
            self.export_candidates.push(name.to_string());
        }

        self.scopes
            .push(Frame::new(FrameKind::Function, qualified_name, Some(id)));
        for (param, ident) in &parameters {
            self.bind_name(ident, param.type_hint.clone());
        }
        if let Some(body) = body {
            self.visit(body);
        }
        self.scopes.pop();
    }

    /// Ordered parameters paired with the identifier each one binds.
    fn parameters<'n>(&self, params: &'n CstNode) -> Vec<(Parameter, &'n CstNode)> {
        let mut out = Vec::new();
        for param in params.named_children() {
            let (ident, hint) = match param.kind.as_str() {
                "identifier" => (Some(param), None),
                "typed_parameter" => (
                    param
                        .named_children()
                        .find(|c| c.field.as_deref() != Some("type") && !c.is("comment"))
                        .and_then(parameter_identifier),
                    param.child_by_field("type"),
                ),
                "default_parameter" | "typed_default_parameter" => (
                    param.child_by_field("name").and_then(parameter_identifier),
                    param.child_by_field("type"),
                ),
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    (parameter_identifier(param), None)
                }
                _ => (None, None),
            };

            if let Some(ident) = ident {
                let parameter = Parameter {
                    name: self.text(ident).to_string(),
                    type_hint: hint.map(|t| self.text(t).trim().to_string()),
                };
                out.push((parameter, ident));
            }
        }
        out
    }

    /// Header text from `def` (or `async`) up to, but not including, the colon.
    fn signature(&self, node: &CstNode) -> String {
        let end = node
            .children
            .iter()
            .find(|c| c.kind == ":")
            .or_else(|| node.child_by_field("body"))
            .map(|c| c.start_byte)
            .unwrap_or(node.end_byte);
        self.source
            .get(node.start_byte..end)
            .unwrap_or_default()
            .trim()
            .trim_end_matches(':')
            .trim_end()
            .to_string()
    }

    fn visit_class(&mut self, node: &CstNode) {
        let Some(name_node) = node.child_by_field("name") else {
            return self.visit_children(node);
        };
        let name = self.text(name_node);
        if let Some(bases) = node.child_by_field("superclasses") {
            self.visit(bases);
        }
        if self.at_module_level() {
            self.export_candidates.push(name.to_string());
        }

        let qualified_name = self.scopes.qualify(name);
        self.scopes
            .push(Frame::new(FrameKind::Class, qualified_name, None));
        if let Some(body) = node.child_by_field("body") {
            self.visit(body);
        }
        self.scopes.pop();
    }

    // ----- imports -----

    fn visit_import(&mut self, node: &CstNode) {
        if !self.at_module_level() {
            return;
        }
        let line = node.start_line();
        for child in node.children_by_field("name") {
            match child.kind.as_str() {
                "dotted_name" => {
                    let path = squash(self.text(child));
                    let head = path.split('.').next().unwrap_or_default().to_string();
                    self.import_aliases.insert(head.clone(), head);
                    self.record_import(path, line);
                }
                "aliased_import" => {
                    let (Some(name), Some(alias)) =
                        (child.child_by_field("name"), child.child_by_field("alias"))
                    else {
                        continue;
                    };
                    let path = squash(self.text(name));
                    self.import_aliases
                        .insert(self.text(alias).to_string(), path.clone());
                    self.record_import(path, line);
                }
                _ => {}
            }
        }
    }

    fn visit_import_from(&mut self, node: &CstNode) {
        if !self.at_module_level() {
            return;
        }
        let line = node.start_line();
        let raw = node
            .child_by_field("module_name")
            .map(|m| squash(self.text(m)))
            .unwrap_or_default();
        let module = self.ctx.resolve_relative(&raw);
        if module == "__future__" {
            return;
        }

        if node.children.iter().any(|c| c.is("wildcard_import")) {
            if !module.is_empty() {
                self.record_import(module, line);
            }
            return;
        }

        for child in node.children_by_field("name") {
            let (name_node, alias_node) = match child.kind.as_str() {
                "dotted_name" => (Some(child), None),
                "aliased_import" => (child.child_by_field("name"), child.child_by_field("alias")),
                _ => (None, None),
            };
            let Some(name_node) = name_node else {
                continue;
            };
            let name = squash(self.text(name_node));
            let canonical = if module.is_empty() {
                name.clone()
            } else {
                format!("{module}.{name}")
            };
            let bound = match alias_node {
                Some(alias) => self.text(alias).to_string(),
                None => name.rsplit('.').next().unwrap_or_default().to_string(),
            };
            self.import_aliases.insert(bound, canonical.clone());
            self.record_import(canonical, line);
        }
    }

    fn record_import(&mut self, path: String, line: u32) {
        let target = NodeId::external(&path);
        let edge = Edge::new(self.module_id.clone(), target, EdgeKind::Imports, Some(line))
            .with_label(path.clone());
        self.add_edge(edge);
        push_unique(&mut self.imports, path);
    }

    // ----- bindings and reads -----

    fn declare(&mut self, node: &CstNode, global: bool) {
        for ident in node.named_children().filter(|c| c.is("identifier")) {
            let name = self.text(ident);
            if global {
                self.scopes.declare_global(name);
            } else {
                self.scopes.declare_nonlocal(name);
            }
        }
    }

    fn visit_assignment(&mut self, node: &CstNode) {
        let left = node.child_by_field("left");
        let right = node.child_by_field("right");
        let hint = node
            .child_by_field("type")
            .map(|t| self.text(t).trim().to_string());

        if self.at_module_level() {
            if let (Some(left), Some(right)) = (left, right) {
                if left.is("identifier") && self.text(left) == "__all__" {
                    self.explicit_exports = Some(self.string_items(right));
                }
            }
        }

        if let Some(right) = right {
            self.visit(right);
        }
        if let Some(left) = left {
            if self.at_module_level() {
                let mut names = Vec::new();
                self.target_names(left, &mut names);
                self.export_candidates.extend(names);
            }
            self.bind_target(left, hint);
        }
    }

    fn visit_augmented_assignment(&mut self, node: &CstNode) {
        let left = node.child_by_field("left");
        let right = node.child_by_field("right");

        if self.at_module_level() {
            if let (Some(left), Some(right)) = (left, right) {
                if left.is("identifier") && self.text(left) == "__all__" {
                    let items = self.string_items(right);
                    self.explicit_exports
                        .get_or_insert_with(Vec::new)
                        .extend(items);
                }
            }
        }

        if let Some(right) = right {
            self.visit(right);
        }
        if let Some(left) = left {
            if left.is("identifier") {
                self.read(left);
                self.bind_name(left, None);
            } else {
                self.visit(left);
            }
        }
    }

    fn string_items(&self, node: &CstNode) -> Vec<String> {
        if !matches!(node.kind.as_str(), "list" | "tuple") {
            return Vec::new();
        }
        node.named_children()
            .filter(|c| c.is("string"))
            .map(|c| string_literal(self.text(c)))
            .collect()
    }

    fn target_names(&self, node: &CstNode, out: &mut Vec<String>) {
        if node.is("identifier") {
            out.push(self.text(node).to_string());
        } else if TARGET_GROUPS.contains(&node.kind.as_str()) {
            for child in node.named_children() {
                self.target_names(child, out);
            }
        }
    }

    fn bind_target(&mut self, node: &CstNode, hint: Option<String>) {
        match node.kind.as_str() {
            "identifier" => self.bind_name(node, hint),
            "as_pattern_target" if node.is_leaf() => self.bind_name(node, hint),
            "as_pattern_target" => {
                for child in node.named_children() {
                    self.bind_target(child, None);
                }
            }
            kind if TARGET_GROUPS.contains(&kind) => {
                for child in node.named_children() {
                    self.bind_target(child, None);
                }
            }
            // Attribute and subscript targets mutate an existing object.
            _ => self.visit(node),
        }
    }

    fn bind_name(&mut self, ident: &CstNode, hint: Option<String>) {
        let target = self.scopes.binding_target(self.text(ident));
        self.bind_name_into(ident, hint, target);
    }

    fn bind_name_into(&mut self, ident: &CstNode, hint: Option<String>, target: Option<BindingTarget>) {
        let name = self.text(ident);
        if name.is_empty() || (self.options.ignore_magic && is_magic(name)) {
            return;
        }
        let Some(target) = target else {
            return;
        };
        let line = ident.start_line();

        let variable = match self.scopes.bound_in(target, name) {
            Some(id) => id.clone(),
            None => {
                let Some(frame) = self.scopes.frame(target.frame) else {
                    return;
                };
                let qualified_name = frame.qualify(name);
                let scope = frame.variable_scope();
                let Some(owner) = self.scopes.owner_of(target.frame).cloned() else {
                    return;
                };

                let id = self.ids.allocate(
                    NodeKind::Variable,
                    &qualified_name,
                    line,
                    ident.span.start_col,
                );
                let variable = VariableNode {
                    scope,
                    type_hint: hint,
                    is_sensitive: self.options.sensitivity.is_sensitive(name),
                    is_user_input: self.options.user_input.is_user_input(name),
                    owning_scope_id: owner.clone(),
                };
                self.emit(Some(owner), id.clone(), name, ident.span, NodePayload::Variable(variable));
                self.scopes.bind_variable(target, name, id.clone());
                id
            }
        };

        if let Some(source) = self.scopes.owner().cloned() {
            self.link(source, variable, EdgeKind::Assigns, line);
        }
    }

    fn read(&mut self, ident: &CstNode) {
        let name = self.text(ident);
        if self.options.ignore_magic && is_magic(name) {
            return;
        }
        let Some(variable) = self.scopes.resolve_variable(name).cloned() else {
            return;
        };
        if let Some(source) = self.scopes.owner().cloned() {
            self.link(source, variable, EdgeKind::References, ident.start_line());
        }
    }

    /// `except E as e`, `with x as y` and `case p as q`: everything before
    /// `as` is read, the name after it is bound.
    fn visit_aliased(&mut self, node: &CstNode) {
        let mut after_as = false;
        for child in &node.children {
            if child.kind == "as" {
                after_as = true;
            } else if after_as && child.is_named && !child.is("block") && !child.is("comment") {
                self.bind_target(child, None);
                after_as = false;
            } else {
                self.visit(child);
            }
        }
    }

    // ----- blocks -----

    fn visit_block(&mut self, node: &CstNode, kind: BlockKind) {
        self.with_block(node, kind, |this| this.visit_children(node));
    }

    fn visit_if(&mut self, node: &CstNode) {
        if self.at_module_level() {
            if let Some(condition) = node.child_by_field("condition") {
                if is_main_guard(self.text(condition)) {
                    self.is_entrypoint = true;
                }
            }
        }
        self.visit_block(node, BlockKind::Conditional);
    }

    fn visit_for(&mut self, node: &CstNode) {
        if let Some(iterable) = node.child_by_field("right") {
            self.visit(iterable);
        }
        self.with_block(node, BlockKind::Loop, |this| {
            if let Some(target) = node.child_by_field("left") {
                this.bind_target(target, None);
            }
            for child in &node.children {
                if !matches!(child.field.as_deref(), Some("left" | "right")) {
                    this.visit(child);
                }
            }
        });
    }

    fn with_block(&mut self, node: &CstNode, kind: BlockKind, walk: impl FnOnce(&mut Self)) {
        let nesting_level = self.scopes.next_nesting_level();
        let parent = self.scopes.containment_parent().cloned();
        let name = node.kind.trim_end_matches("_statement");
        let qualified_name = self.scopes.qualify(&format!("<{name}>"));
        let id = self.ids.allocate(
            NodeKind::CodeBlock,
            &qualified_name,
            node.span.start_line,
            node.span.start_col,
        );

        let block = CodeBlockNode {
            block_kind: kind,
            nesting_level,
            snippet: self.text(node).to_string(),
            owning_function_id: self.scopes.enclosing_function().cloned(),
        };
        self.emit(parent, id.clone(), name, node.span, NodePayload::CodeBlock(block));

        self.scopes.open_block(id);
        walk(self);
        self.scopes.close_block();
    }

    /// Lambdas get no FunctionNode. Their parameters bind in a frame of their
    /// own and the body's reads and calls are attributed to the enclosing
    /// function or module.
    fn visit_lambda(&mut self, node: &CstNode) {
        let line = node.start_line();
        if metrics::has_branches(node) {
            tracing::debug!(
                "Lambda with branching at {}:{} left unattributed",
                self.ctx.file_path.display(),
                line
            );
            self.diagnostics.push(
                Diagnostic::for_file(
                    DiagnosticKind::UnsupportedConstruct,
                    &self.ctx.file_path,
                    "lambda with branching is not modelled as a function; its branches are excluded from complexity",
                )
                .at_line(line),
            );
        }

        let params_node = node.child_by_field("parameters");
        if let Some(params) = params_node {
            for param in params.named_children() {
                if let Some(default) = param.child_by_field("value") {
                    self.visit(default);
                }
            }
        }

        let qualified_name = self.scopes.qualify("<lambda>");
        self.scopes.push(Frame::new(FrameKind::Lambda, qualified_name, None));
        if let Some(params) = params_node {
            for (_, ident) in self.parameters(params) {
                self.bind_name(ident, None);
            }
        }
        if let Some(body) = node.child_by_field("body") {
            self.visit(body);
        }
        self.scopes.pop();
    }

    /// The first iterable is evaluated in the enclosing scope; every target,
    /// later iterable, condition and the element expression live in the
    /// comprehension's own frame.
    fn visit_comprehension(&mut self, node: &CstNode) {
        let clauses: Vec<&CstNode> = node
            .named_children()
            .filter(|c| c.is("for_in_clause") || c.is("if_clause"))
            .collect();

        let first_for = clauses.iter().position(|c| c.is("for_in_clause"));
        if let Some(first) = first_for {
            for iterable in clauses[first].children_by_field("right") {
                self.visit(iterable);
            }
        }

        let qualified_name = self.scopes.qualify("<comprehension>");
        self.scopes
            .push(Frame::new(FrameKind::Comprehension, qualified_name, None));
        for (i, clause) in clauses.iter().enumerate() {
            if clause.is("for_in_clause") {
                if Some(i) != first_for {
                    for iterable in clause.children_by_field("right") {
                        self.visit(iterable);
                    }
                }
                if let Some(target) = clause.child_by_field("left") {
                    self.bind_target(target, None);
                }
            } else {
                self.visit_children(clause);
            }
        }
        if let Some(body) = node.child_by_field("body") {
            self.visit(body);
        }
        self.scopes.pop();
    }

    // ----- calls -----

    fn visit_call(&mut self, node: &CstNode) {
        if let (Some(callee), Some(caller)) = (node.child_by_field("function"), self.scopes.owner().cloned()) {
            self.resolve_call(caller, callee, node.start_line());
        }
        self.visit_children(node);
    }

    fn resolve_call(&mut self, caller: NodeId, callee: &CstNode, line: u32) {
        match callee.kind.as_str() {
            "identifier" => {
                let name = self.text(callee);
                if let Some(target) = self.scopes.resolve_function(name).cloned() {
                    self.link(caller, target, EdgeKind::Calls, line);
                } else if let Some(canonical) = self.import_aliases.get(name).cloned() {
                    self.defer_call(caller, canonical, line);
                } else {
                    // May be defined later in this module.
                    let candidate = format!("{}.{}", self.ctx.module_name, name);
                    self.defer_call(caller, candidate, line);
                }
            }
            "attribute" => {
                let (Some(object), Some(attr)) =
                    (callee.child_by_field("object"), callee.child_by_field("attribute"))
                else {
                    return;
                };
                let object = self.text(object);
                let attr = self.text(attr);

                if object == "self" || object == "cls" {
                    let method = self
                        .scopes
                        .enclosing_class()
                        .map(|class| (class.function(attr).cloned(), class.qualify(attr)));
                    match method {
                        Some((Some(target), _)) => self.link(caller, target, EdgeKind::Calls, line),
                        Some((None, qualified_name)) => self.defer_call(caller, qualified_name, line),
                        None => {}
                    }
                } else if let Some(canonical) = self.qualify_through_imports(object) {
                    self.defer_call(caller, format!("{canonical}.{attr}"), line);
                }
            }
            _ => {}
        }
    }

    /// Rewrite `alias.rest` to `canonical.rest` when `alias` was bound by an
    /// import. Only plain dotted identifier chains qualify.
    fn qualify_through_imports(&self, object: &str) -> Option<String> {
        let object = squash(object);
        let plain = object
            .split('.')
            .all(|s| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_'));
        if !plain {
            return None;
        }
        let (head, rest) = match object.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (object.as_str(), None),
        };
        let canonical = self.import_aliases.get(head)?;
        Some(match rest {
            Some(rest) => format!("{canonical}.{rest}"),
            None => canonical.clone(),
        })
    }

    fn defer_call(&mut self, caller: NodeId, callee: String, line: u32) {
        let pending = PendingCall { caller, callee, line };
        if !self.pending_calls.contains(&pending) {
            self.pending_calls.push(pending);
        }
    }
}

fn parameter_identifier(node: &CstNode) -> Option<&CstNode> {
    if node.is("identifier") {
        Some(node)
    } else {
        node.named_children().find(|c| c.is("identifier"))
    }
}

fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Contents of a plain string literal, prefix and quotes removed.
fn string_literal(text: &str) -> String {
    let body = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body.strip_prefix(quote).and_then(|b| b.strip_suffix(quote)) {
            return inner.to_string();
        }
    }
    body.to_string()
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("\"run\""), "run");
        assert_eq!(string_literal("'run'"), "run");
        assert_eq!(string_literal("r'''raw'''"), "raw");
        assert_eq!(string_literal("b\"x\""), "x");
    }

    #[test]
    fn test_squash() {
        assert_eq!(squash("a . b\n.c"), "a.b.c");
    }
}
