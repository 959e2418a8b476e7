//! Static metrics over function bodies

use crate::syntax::CstNode;

/// Node kinds that open an extra path through a function.
pub const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "for_statement",
    "while_statement",
    "except_clause",
    "except_group_clause",
    "boolean_operator",
    "conditional_expression",
    "for_in_clause",
    "if_clause",
    "case_clause",
];

/// Kinds whose bodies are measured independently (or not at all).
const SEPARATE_SCOPES: &[&str] = &["function_definition", "class_definition", "lambda"];

pub fn is_branch(kind: &str) -> bool {
    BRANCH_KINDS.contains(&kind)
}

/// Base 1 plus one per branching construct under `body`, without descending
/// into nested functions, classes or lambdas.
pub fn cyclomatic_complexity(body: &CstNode) -> u32 {
    1 + count_branches(body)
}

fn count_branches(body: &CstNode) -> u32 {
    let mut count = 0;
    let mut stack: Vec<&CstNode> = body.children.iter().collect();
    while let Some(node) = stack.pop() {
        if SEPARATE_SCOPES.contains(&node.kind.as_str()) {
            continue;
        }
        count += u32::from(is_branch(&node.kind));
        stack.extend(node.children.iter());
    }
    count
}

/// Branching constructs anywhere under a lambda's body, nested lambdas included.
pub fn has_branches(node: &CstNode) -> bool {
    node.descendants().skip(1).any(|n| is_branch(&n.kind))
}

/// Lexical tokens spanned by `node`: every leaf except comments.
pub fn token_count(node: &CstNode) -> u32 {
    let count = node
        .descendants()
        .filter(|n| n.is_leaf() && n.kind != "comment" && n.end_byte > n.start_byte)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::create_backend;
    use crate::syntax::{SyntaxBackend, SyntaxTree};

    fn parse(source: &str) -> SyntaxTree {
        create_backend("python").unwrap().parse(source, None).unwrap()
    }

    fn body_of_first_def(tree: &SyntaxTree) -> &CstNode {
        tree.root
            .descendants()
            .find(|n| n.is("function_definition"))
            .and_then(|d| d.child_by_field("body"))
            .unwrap()
    }

    #[test]
    fn test_straight_line_function() {
        let tree = parse("def f(a):\n    b = a + 1\n    return b\n");
        assert_eq!(cyclomatic_complexity(body_of_first_def(&tree)), 1);
    }

    #[test]
    fn test_if_elif_else_and_loop() {
        let tree = parse(
            "def f(x):\n    if x > 1:\n        pass\n    elif x < 0:\n        pass\n    else:\n        pass\n    for i in x:\n        pass\n",
        );
        assert_eq!(cyclomatic_complexity(body_of_first_def(&tree)), 4);
    }

    #[test]
    fn test_boolean_operators_and_comprehensions() {
        let tree = parse(
            "def f(xs, a, b):\n    ok = a and b or not a\n    return [x for x in xs if x]\n",
        );
        // and, or, for_in_clause, if_clause
        assert_eq!(cyclomatic_complexity(body_of_first_def(&tree)), 5);
    }

    #[test]
    fn test_nested_definitions_not_counted() {
        let tree = parse(
            "def outer(x):\n    def inner(y):\n        if y:\n            return 1\n    g = lambda z: 1 if z else 2\n    while x:\n        x -= 1\n",
        );
        assert_eq!(cyclomatic_complexity(body_of_first_def(&tree)), 2);
    }

    #[test]
    fn test_try_except() {
        let tree = parse(
            "def f():\n    try:\n        pass\n    except ValueError:\n        pass\n    except (KeyError, TypeError):\n        pass\n",
        );
        assert_eq!(cyclomatic_complexity(body_of_first_def(&tree)), 3);
    }

    #[test]
    fn test_lambda_branches() {
        let tree = parse("f = lambda z: 1 if z else 2\ng = lambda z: z + 1\n");
        let lambdas: Vec<_> = tree.root.descendants().filter(|n| n.is("lambda")).collect();
        assert!(has_branches(lambdas[0]));
        assert!(!has_branches(lambdas[1]));
    }

    #[test]
    fn test_long_boolean_chain() {
        let conditions = vec!["a"; 400].join(" and ");
        let tree = parse(&format!("def f(a):\n    return {conditions}\n"));
        assert_eq!(cyclomatic_complexity(body_of_first_def(&tree)), 400);
    }

    #[test]
    fn test_token_count_skips_comments() {
        let tree = parse("x = 1  # note\n");
        // x, =, 1
        assert_eq!(token_count(&tree.root), 3);
    }
}
