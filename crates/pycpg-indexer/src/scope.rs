//! Traversal-local scope stack
//!
//! One frame per module, class, function, lambda and comprehension currently
//! being walked. Each frame owns the names it binds and the code blocks opened
//! directly inside it. The stack lives for one file's traversal and is dropped
//! with it.

use std::collections::{HashMap, HashSet};

use pycpg_core::{NodeId, VariableScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Module,
    Class,
    Function,
    /// Lambda parameters. No node of its own; bindings belong to the
    /// enclosing function or module.
    Lambda,
    /// Comprehension and generator targets, owned like lambda bindings.
    Comprehension,
}

impl FrameKind {
    /// Frames that block code blocks and nesting levels from leaking outward.
    fn is_boundary(self) -> bool {
        matches!(self, FrameKind::Module | FrameKind::Function)
    }
}

#[derive(Debug)]
pub struct Frame {
    pub kind: FrameKind,
    /// Dotted name of the scope itself (`pkg.mod.Class`).
    pub qualified_name: String,
    /// Node standing for this scope. Classes, lambdas and comprehensions have none.
    pub owner: Option<NodeId>,
    variables: HashMap<String, NodeId>,
    functions: HashMap<String, NodeId>,
    globals: HashSet<String>,
    nonlocals: HashSet<String>,
    blocks: Vec<NodeId>,
}

impl Frame {
    pub fn new(kind: FrameKind, qualified_name: impl Into<String>, owner: Option<NodeId>) -> Self {
        Frame {
            kind,
            qualified_name: qualified_name.into(),
            owner,
            variables: HashMap::new(),
            functions: HashMap::new(),
            globals: HashSet::new(),
            nonlocals: HashSet::new(),
            blocks: Vec::new(),
        }
    }

    pub fn variable_scope(&self) -> VariableScope {
        match self.kind {
            FrameKind::Module => VariableScope::Module,
            FrameKind::Class => VariableScope::Class,
            FrameKind::Function | FrameKind::Lambda | FrameKind::Comprehension => VariableScope::Function,
        }
    }

    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{}", self.qualified_name, name)
    }

    pub fn variable(&self, name: &str) -> Option<&NodeId> {
        self.variables.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&NodeId> {
        self.functions.get(name)
    }
}

/// Result of routing a binding to the frame that owns the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingTarget {
    pub frame: usize,
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    fn current_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Qualified name for `name` declared in the innermost frame.
    pub fn qualify(&self, name: &str) -> String {
        match self.current() {
            Some(frame) => frame.qualify(name),
            None => name.to_string(),
        }
    }

    pub fn in_class(&self) -> bool {
        self.current().is_some_and(|f| f.kind == FrameKind::Class)
    }

    /// Nearest frame at or below `from` with a node of its own.
    fn owner_index_from(&self, from: usize) -> Option<usize> {
        (0..=from)
            .rev()
            .find(|&i| self.frames.get(i).is_some_and(|f| f.owner.is_some()))
    }

    /// Module or function node that owns bindings made in frame `index`.
    pub fn owner_of(&self, index: usize) -> Option<&NodeId> {
        self.owner_index_from(index)
            .and_then(|i| self.frames[i].owner.as_ref())
    }

    /// Innermost module or function node.
    pub fn owner(&self) -> Option<&NodeId> {
        self.frames.len().checked_sub(1).and_then(|i| self.owner_of(i))
    }

    /// Innermost enclosing function node, if any.
    pub fn enclosing_function(&self) -> Option<&NodeId> {
        self.frames
            .iter()
            .rev()
            .find(|f| f.kind == FrameKind::Function)
            .and_then(|f| f.owner.as_ref())
    }

    /// Parent for a CONTAINS edge: the innermost open block, else the
    /// innermost module or function node. Class frames are transparent.
    pub fn containment_parent(&self) -> Option<&NodeId> {
        for frame in self.frames.iter().rev() {
            if let Some(block) = frame.blocks.last() {
                return Some(block);
            }
            if let Some(owner) = &frame.owner {
                return Some(owner);
            }
        }
        None
    }

    /// Depth a block opened now would have: one more than the blocks already
    /// open between here and the nearest function or module boundary.
    pub fn next_nesting_level(&self) -> u32 {
        let mut open = 0;
        for frame in self.frames.iter().rev() {
            open += frame.blocks.len();
            if frame.kind.is_boundary() {
                break;
            }
        }
        u32::try_from(open + 1).unwrap_or(u32::MAX)
    }

    pub fn open_block(&mut self, id: NodeId) {
        if let Some(frame) = self.current_mut() {
            frame.blocks.push(id);
        }
    }

    pub fn close_block(&mut self) {
        if let Some(frame) = self.current_mut() {
            frame.blocks.pop();
        }
    }

    pub fn declare_global(&mut self, name: &str) {
        if let Some(frame) = self.current_mut() {
            frame.nonlocals.remove(name);
            frame.globals.insert(name.to_string());
        }
    }

    pub fn declare_nonlocal(&mut self, name: &str) {
        if let Some(frame) = self.current_mut() {
            frame.globals.remove(name);
            frame.nonlocals.insert(name.to_string());
        }
    }

    /// Frame that a binding of `name` made in the innermost frame lands in,
    /// following `global` and `nonlocal` declarations.
    pub fn binding_target(&self, name: &str) -> Option<BindingTarget> {
        let top = self.frames.len().checked_sub(1)?;
        self.binding_target_from(top, name)
    }

    /// Like [`ScopeStack::binding_target`] for `:=`, which skips enclosing
    /// comprehension frames.
    pub fn assignment_expression_target(&self, name: &str) -> Option<BindingTarget> {
        let top = self
            .frames
            .iter()
            .rposition(|f| f.kind != FrameKind::Comprehension)?;
        self.binding_target_from(top, name)
    }

    fn binding_target_from(&self, top: usize, name: &str) -> Option<BindingTarget> {
        let frame = self.frames.get(top)?;

        if frame.globals.contains(name) {
            return Some(BindingTarget { frame: 0 });
        }
        if frame.nonlocals.contains(name) {
            let enclosing = (0..top)
                .rev()
                .filter(|&i| self.frames[i].kind == FrameKind::Function);
            let mut fallback = None;
            for i in enclosing {
                if self.frames[i].variables.contains_key(name) {
                    return Some(BindingTarget { frame: i });
                }
                fallback.get_or_insert(i);
            }
            if let Some(i) = fallback {
                return Some(BindingTarget { frame: i });
            }
        }
        Some(BindingTarget { frame: top })
    }

    pub fn bound_in(&self, target: BindingTarget, name: &str) -> Option<&NodeId> {
        self.frames.get(target.frame).and_then(|f| f.variable(name))
    }

    pub fn bind_variable(&mut self, target: BindingTarget, name: &str, id: NodeId) {
        if let Some(frame) = self.frames.get_mut(target.frame) {
            frame.variables.insert(name.to_string(), id);
        }
    }

    pub fn bind_function(&mut self, name: &str, id: NodeId) {
        if let Some(frame) = self.current_mut() {
            frame.functions.insert(name.to_string(), id);
        }
    }

    /// Frames visible from the innermost one under LEGB rules: the innermost
    /// frame itself, then enclosing functions and the module. Class bodies
    /// enclosing the innermost frame are not visible.
    fn visible(&self) -> impl Iterator<Item = &Frame> + '_ {
        let top = self.frames.len().saturating_sub(1);
        self.frames
            .iter()
            .enumerate()
            .rev()
            .filter(move |(i, f)| *i == top || f.kind != FrameKind::Class)
            .map(|(_, f)| f)
    }

    pub fn resolve_variable(&self, name: &str) -> Option<&NodeId> {
        if let Some(frame) = self.current() {
            if frame.globals.contains(name) {
                return self.frames.first().and_then(|m| m.variable(name));
            }
        }
        self.visible().find_map(|f| f.variable(name))
    }

    pub fn resolve_function(&self, name: &str) -> Option<&NodeId> {
        self.visible().find_map(|f| f.function(name))
    }

    /// Innermost class frame enclosing the current function, for `self.m()`.
    pub fn enclosing_class(&self) -> Option<&Frame> {
        let mut frames = self.frames.iter().rev();
        frames.find(|f| f.kind == FrameKind::Function)?;
        frames.find(|f| f.kind == FrameKind::Class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId(s.to_string())
    }

    fn stack() -> ScopeStack {
        let mut stack = ScopeStack::new();
        stack.push(Frame::new(FrameKind::Module, "m", Some(id("module"))));
        stack
    }

    #[test]
    fn test_qualified_names_follow_frames() {
        let mut stack = stack();
        stack.push(Frame::new(FrameKind::Class, "m.Shape", None));
        assert_eq!(stack.qualify("area"), "m.Shape.area");
        assert!(stack.in_class());
    }

    #[test]
    fn test_class_frames_are_transparent_for_ownership() {
        let mut stack = stack();
        stack.push(Frame::new(FrameKind::Class, "m.C", None));
        assert_eq!(stack.owner(), Some(&id("module")));
        assert_eq!(stack.containment_parent(), Some(&id("module")));

        stack.push(Frame::new(FrameKind::Function, "m.C.f", Some(id("f"))));
        assert_eq!(stack.owner(), Some(&id("f")));
        assert_eq!(stack.enclosing_function(), Some(&id("f")));
        assert_eq!(stack.enclosing_class().map(|c| c.qualified_name.as_str()), Some("m.C"));
    }

    #[test]
    fn test_nesting_levels_reset_at_functions() {
        let mut stack = stack();
        assert_eq!(stack.next_nesting_level(), 1);
        stack.open_block(id("if"));
        assert_eq!(stack.next_nesting_level(), 2);
        assert_eq!(stack.containment_parent(), Some(&id("if")));

        stack.push(Frame::new(FrameKind::Function, "m.f", Some(id("f"))));
        assert_eq!(stack.next_nesting_level(), 1);
        assert_eq!(stack.containment_parent(), Some(&id("f")));
        stack.pop();

        stack.close_block();
        assert_eq!(stack.containment_parent(), Some(&id("module")));
    }

    #[test]
    fn test_legb_skips_class_bodies() {
        let mut stack = stack();
        let here = stack.binding_target("x").unwrap();
        stack.bind_variable(here, "x", id("module.x"));

        stack.push(Frame::new(FrameKind::Class, "m.C", None));
        let class_target = stack.binding_target("x").unwrap();
        stack.bind_variable(class_target, "x", id("C.x"));
        assert_eq!(stack.resolve_variable("x"), Some(&id("C.x")));

        stack.push(Frame::new(FrameKind::Function, "m.C.f", Some(id("f"))));
        assert_eq!(stack.resolve_variable("x"), Some(&id("module.x")));
        assert_eq!(stack.resolve_variable("missing"), None);
    }

    #[test]
    fn test_lambda_frames_own_nothing() {
        let mut stack = stack();
        stack.push(Frame::new(FrameKind::Function, "m.run", Some(id("run"))));
        stack.bind_variable(BindingTarget { frame: 1 }, "v", id("outer-v"));
        stack.push(Frame::new(FrameKind::Lambda, "m.run.<lambda>", None));

        let target = stack.binding_target("v").unwrap();
        assert_eq!(target.frame, 2);
        assert_eq!(stack.frame(2).unwrap().variable_scope(), VariableScope::Function);
        assert_eq!(stack.owner_of(2), Some(&id("run")));
        assert_eq!(stack.enclosing_function(), Some(&id("run")));

        stack.bind_variable(target, "v", id("lambda-v"));
        assert_eq!(stack.resolve_variable("v"), Some(&id("lambda-v")));
        stack.pop();
        assert_eq!(stack.resolve_variable("v"), Some(&id("outer-v")));
    }

    #[test]
    fn test_global_and_nonlocal_routing() {
        let mut stack = stack();
        stack.push(Frame::new(FrameKind::Function, "m.outer", Some(id("outer"))));
        let outer = stack.binding_target("n").unwrap();
        stack.bind_variable(outer, "n", id("outer.n"));

        stack.push(Frame::new(FrameKind::Function, "m.outer.inner", Some(id("inner"))));
        stack.declare_nonlocal("n");
        stack.declare_global("g");

        assert_eq!(stack.binding_target("n"), Some(BindingTarget { frame: 1 }));
        assert_eq!(stack.binding_target("g"), Some(BindingTarget { frame: 0 }));
        assert_eq!(stack.binding_target("local"), Some(BindingTarget { frame: 2 }));
        assert_eq!(stack.owner_of(0), Some(&id("module")));
    }
}
