//! Expression tree definitions.
//!
//! Nodes live in an arena owned by [`Expression`] and refer to each other
//! through [`NodeId`]s. A node's parent link is informational only; the
//! arena owns every node.

use crate::expression::operator::{ArithmeticOperator, Arity, ComparisonOperator};
use crate::expression::pattern::LikePattern;
use crate::expression::{ExpressionError, ExpressionResult};
use crate::value::Numeric;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// A property name referenced by a predicate, ordered by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Arc<str>);

impl Identifier {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a node inside its expression's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What a node computes
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Identifier(Identifier),
    BooleanLiteral(bool),
    NumericLiteral(Numeric),
    StringLiteral(String),
    PatternLiteral(LikePattern),
    And,
    Or,
    Not,
    /// IS NULL
    Null,
    Between,
    In,
    Like,
    Comparison(ComparisonOperator),
    Any,
    Arithmetic(ArithmeticOperator),
    Negate,
}

impl NodeKind {
    pub fn arity(&self) -> Arity {
        match self {
            NodeKind::Identifier(_)
            | NodeKind::BooleanLiteral(_)
            | NodeKind::NumericLiteral(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::PatternLiteral(_) => Arity::Leaf,
            NodeKind::Not | NodeKind::Null | NodeKind::Negate => Arity::Unary,
            NodeKind::And
            | NodeKind::Or
            | NodeKind::Like
            | NodeKind::Comparison(_)
            | NodeKind::Arithmetic(_) => Arity::Binary,
            NodeKind::Between => Arity::Ternary,
            NodeKind::In | NodeKind::Any => Arity::Variadic,
        }
    }

    /// Tag used when dumping the tree; identifiers use their own name
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Identifier(identifier) => identifier.name(),
            NodeKind::BooleanLiteral(_) => "BooleanLiteral",
            NodeKind::NumericLiteral(_) => "NumericLiteral",
            NodeKind::StringLiteral(_) => "StringLiteral",
            NodeKind::PatternLiteral(_) => "PatternLiteral",
            NodeKind::And => "AND",
            NodeKind::Or => "OR",
            NodeKind::Not => "NOT",
            NodeKind::Null => "NULL",
            NodeKind::Between => "BETWEEN",
            NodeKind::In => "IN",
            NodeKind::Like => "LIKE",
            NodeKind::Comparison(_) => "Comparison",
            NodeKind::Any => "ANY",
            NodeKind::Arithmetic(op) => op.as_str(),
            NodeKind::Negate => "-",
        }
    }
}

/// Deepest tree the builder accepts. A left-leaning run of the same AND or
/// OR counts as one level, since it is evaluated as a flat list.
pub const MAX_NESTING_DEPTH: usize = 128;

/// One node of an expression tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    depth: usize,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied()
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Incrementally builds an [`Expression`], children before parents
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    nodes: Vec<Node>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn leaf(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
            parent: None,
            depth: 1,
        });
        id
    }

    /// Nesting depth of a new `kind` node over `children`
    fn nesting_depth(&self, kind: &NodeKind, children: &[NodeId]) -> usize {
        let depth = |id: &NodeId| self.nodes[id.0].depth;
        match (kind, children) {
            (NodeKind::And | NodeKind::Or, [left, right]) if self.nodes[left.0].kind == *kind => {
                depth(left).max(depth(right) + 1)
            }
            _ => 1 + children.iter().map(depth).max().unwrap_or(0),
        }
    }

    pub fn identifier(&mut self, name: &str) -> NodeId {
        self.leaf(NodeKind::Identifier(Identifier::new(name)))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.leaf(NodeKind::BooleanLiteral(value))
    }

    pub fn integer(&mut self, value: i64) -> NodeId {
        self.leaf(NodeKind::NumericLiteral(Numeric::Integer(value)))
    }

    pub fn float(&mut self, value: f64) -> NodeId {
        self.leaf(NodeKind::NumericLiteral(Numeric::Float(value)))
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeId {
        self.leaf(NodeKind::StringLiteral(value.into()))
    }

    pub fn pattern(&mut self, pattern: LikePattern) -> NodeId {
        self.leaf(NodeKind::PatternLiteral(pattern))
    }

    /// Add a node of any kind, attaching `children` to it in order.
    ///
    /// Fails if the child count does not fit the kind's arity, if a child
    /// is unknown or already attached elsewhere, or if the node would nest
    /// deeper than [`MAX_NESTING_DEPTH`].
    pub fn node(&mut self, kind: NodeKind, children: &[NodeId]) -> ExpressionResult<NodeId> {
        let arity = kind.arity();
        if !arity.accepts(children.len()) {
            return Err(ExpressionError::ArityMismatch {
                node: kind.name().to_string(),
                expected: arity.describe().to_string(),
                actual: children.len(),
            });
        }

        for (i, child) in children.iter().enumerate() {
            let attached = match self.nodes.get(child.0) {
                Some(node) => node.parent.is_some() || children[..i].contains(child),
                None => {
                    return Err(ExpressionError::EvaluationError {
                        message: format!("unknown node id {}", child.0),
                    })
                }
            };
            if attached {
                return Err(ExpressionError::NodeAlreadyAttached {
                    node: self.nodes[child.0].kind.name().to_string(),
                });
            }
        }

        let depth = self.nesting_depth(&kind, children);
        if depth > MAX_NESTING_DEPTH {
            return Err(ExpressionError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }

        let id = NodeId(self.nodes.len());
        for child in children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            children: children.to_vec(),
            parent: None,
            depth,
        });
        Ok(id)
    }

    pub fn and(&mut self, left: NodeId, right: NodeId) -> ExpressionResult<NodeId> {
        self.node(NodeKind::And, &[left, right])
    }

    pub fn or(&mut self, left: NodeId, right: NodeId) -> ExpressionResult<NodeId> {
        self.node(NodeKind::Or, &[left, right])
    }

    pub fn not(&mut self, operand: NodeId) -> ExpressionResult<NodeId> {
        self.node(NodeKind::Not, &[operand])
    }

    pub fn is_null(&mut self, operand: NodeId) -> ExpressionResult<NodeId> {
        self.node(NodeKind::Null, &[operand])
    }

    pub fn between(&mut self, value: NodeId, low: NodeId, high: NodeId) -> ExpressionResult<NodeId> {
        self.node(NodeKind::Between, &[value, low, high])
    }

    /// `value IN (items...)`
    pub fn in_list(&mut self, value: NodeId, items: &[NodeId]) -> ExpressionResult<NodeId> {
        let mut children = Vec::with_capacity(items.len() + 1);
        children.push(value);
        children.extend_from_slice(items);
        self.node(NodeKind::In, &children)
    }

    pub fn like(&mut self, value: NodeId, pattern: NodeId) -> ExpressionResult<NodeId> {
        self.node(NodeKind::Like, &[value, pattern])
    }

    pub fn compare(
        &mut self,
        op: ComparisonOperator,
        left: NodeId,
        right: NodeId,
    ) -> ExpressionResult<NodeId> {
        self.node(NodeKind::Comparison(op), &[left, right])
    }

    pub fn any(&mut self, operands: &[NodeId]) -> ExpressionResult<NodeId> {
        self.node(NodeKind::Any, operands)
    }

    pub fn arithmetic(
        &mut self,
        op: ArithmeticOperator,
        left: NodeId,
        right: NodeId,
    ) -> ExpressionResult<NodeId> {
        self.node(NodeKind::Arithmetic(op), &[left, right])
    }

    pub fn negate(&mut self, operand: NodeId) -> ExpressionResult<NodeId> {
        self.node(NodeKind::Negate, &[operand])
    }

    /// Finish the tree rooted at `root`. Every other node must already be
    /// attached under some parent.
    pub fn build(self, root: NodeId) -> ExpressionResult<Expression> {
        match self.nodes.get(root.0) {
            None => {
                return Err(ExpressionError::EvaluationError {
                    message: format!("unknown root node id {}", root.0),
                })
            }
            Some(node) if node.parent.is_some() => {
                return Err(ExpressionError::NodeAlreadyAttached {
                    node: node.kind.name().to_string(),
                })
            }
            Some(_) => {}
        }

        // parents are always created after their children, so a detached
        // node can only ever be the root
        if let Some(node) = self
            .nodes
            .iter()
            .enumerate()
            .find(|(i, node)| *i != root.0 && node.parent.is_none())
            .map(|(_, node)| node)
        {
            return Err(ExpressionError::DetachedNode {
                node: node.kind.name().to_string(),
            });
        }

        let identifiers = self
            .nodes
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::Identifier(identifier) => Some(identifier.clone()),
                _ => None,
            })
            .collect();

        Ok(Expression {
            nodes: self.nodes,
            root,
            identifiers,
        })
    }
}

/// An immutable expression tree together with the identifiers it references
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    nodes: Vec<Node>,
    root: NodeId,
    identifiers: BTreeSet<Identifier>,
}

impl Expression {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node of this tree.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced while building this expression.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every identifier reachable from the root
    pub fn identifiers(&self) -> &BTreeSet<Identifier> {
        &self.identifiers
    }

    /// True when the tree references no identifiers
    pub fn is_constant(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Operands of the AND or OR run rooted at `id`, left to right.
    ///
    /// The run follows left children of the same kind, so `a OR b OR c`
    /// parsed as `(a OR b) OR c` yields `[a, b, c]`. Any other node is its
    /// own single operand.
    pub fn chain_operands(&self, id: NodeId) -> Vec<NodeId> {
        let kind = &self.node(id).kind;
        if !matches!(kind, NodeKind::And | NodeKind::Or) {
            return vec![id];
        }

        let mut operands = Vec::new();
        let mut current = id;
        while self.node(current).kind == *kind {
            let children = &self.node(current).children;
            operands.push(children[1]);
            current = children[0];
        }
        operands.push(current);
        operands.reverse();
        operands
    }

    /// Dump the tree as nested tags named after each node
    pub fn write_to<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        // (node, closing tag?)
        let mut stack = vec![(self.root, false)];
        while let Some((id, closing)) = stack.pop() {
            let node = self.node(id);
            let name = node.kind.name();
            if closing {
                write!(writer, "</{}>", name)?;
                continue;
            }
            write!(writer, "<{}>", name)?;
            stack.push((id, true));
            stack.extend(node.children.iter().rev().map(|child| (*child, false)));
        }
        Ok(())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn age_between() -> Expression {
        let mut builder = ExpressionBuilder::new();
        let age = builder.identifier("age");
        let low = builder.integer(50);
        let high = builder.integer(60);
        let root = builder.between(age, low, high).unwrap();
        builder.build(root).unwrap()
    }

    #[test]
    fn test_identifier_ordering() {
        let mut names = vec![Identifier::new("name"), Identifier::new("age")];
        names.sort();
        assert_eq!(names[0].name(), "age");
        assert_ne!(Identifier::new("Age"), Identifier::new("age"));
    }

    #[test]
    fn test_build_tree() {
        let expr = age_between();
        assert_eq!(expr.len(), 4);

        let root = expr.node(expr.root());
        assert_eq!(root.kind(), &NodeKind::Between);
        assert_eq!(root.num_children(), 3);
        assert_eq!(root.parent(), None);

        let first = root.child(0).unwrap();
        assert_eq!(expr.node(first).parent(), Some(expr.root()));
        assert_eq!(
            expr.node(first).kind(),
            &NodeKind::Identifier(Identifier::new("age"))
        );

        let names: Vec<_> = expr.identifiers().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["age"]);
        assert!(!expr.is_constant());
    }

    #[test]
    fn test_arity_enforced() {
        let mut builder = ExpressionBuilder::new();
        let a = builder.boolean(true);
        let b = builder.boolean(false);
        let err = builder.node(NodeKind::Not, &[a, b]).unwrap_err();
        assert_eq!(
            err,
            ExpressionError::ArityMismatch {
                node: "NOT".to_string(),
                expected: "1".to_string(),
                actual: 2,
            }
        );
        assert!(builder.node(NodeKind::Any, &[]).is_err());
        assert!(builder.node(NodeKind::BooleanLiteral(true), &[a]).is_err());
    }

    #[test]
    fn test_child_attached_once() {
        let mut builder = ExpressionBuilder::new();
        let a = builder.boolean(true);
        let b = builder.boolean(false);
        builder.and(a, b).unwrap();
        assert!(matches!(
            builder.or(a, b),
            Err(ExpressionError::NodeAlreadyAttached { .. })
        ));

        let c = builder.boolean(true);
        assert!(matches!(
            builder.and(c, c),
            Err(ExpressionError::NodeAlreadyAttached { .. })
        ));
    }

    #[test]
    fn test_detached_node_rejected() {
        let mut builder = ExpressionBuilder::new();
        let _stray = builder.identifier("stray");
        let root = builder.boolean(true);
        assert_eq!(
            builder.build(root).unwrap_err(),
            ExpressionError::DetachedNode {
                node: "stray".to_string()
            }
        );
    }

    #[test]
    fn test_constant_expression() {
        let mut builder = ExpressionBuilder::new();
        let one = builder.integer(1);
        let two = builder.float(2.0);
        let root = builder
            .compare(ComparisonOperator::Lt, one, two)
            .unwrap();
        let expr = builder.build(root).unwrap();
        assert!(expr.is_constant());
    }

    #[test]
    fn test_write_to() {
        let expr = age_between();
        assert_eq!(
            expr.to_string(),
            "<BETWEEN><age></age><NumericLiteral></NumericLiteral><NumericLiteral></NumericLiteral></BETWEEN>"
        );

        let mut builder = ExpressionBuilder::new();
        let x = builder.identifier("x");
        let neg = builder.negate(x).unwrap();
        let mut out = String::new();
        builder.build(neg).unwrap().write_to(&mut out).unwrap();
        assert_eq!(out, "<-><x></x></->");
    }

    #[test]
    fn test_long_or_chain_is_shallow() {
        let mut builder = ExpressionBuilder::new();
        let mut root = builder.identifier("c0");
        for i in 1..1000 {
            let next = builder.identifier(&format!("c{}", i));
            root = builder.or(root, next).unwrap();
        }
        let expr = builder.build(root).unwrap();

        let operands = expr.chain_operands(expr.root());
        assert_eq!(operands.len(), 1000);
        assert_eq!(
            expr.node(operands[0]).kind(),
            &NodeKind::Identifier(Identifier::new("c0"))
        );
        assert_eq!(
            expr.node(operands[999]).kind(),
            &NodeKind::Identifier(Identifier::new("c999"))
        );
        assert!(expr.to_string().starts_with("<OR><OR>"));
    }

    #[test]
    fn test_chain_stops_at_other_kind() {
        let mut builder = ExpressionBuilder::new();
        let a = builder.identifier("a");
        let b = builder.identifier("b");
        let c = builder.identifier("c");
        let and = builder.and(a, b).unwrap();
        let root = builder.or(and, c).unwrap();
        let expr = builder.build(root).unwrap();

        assert_eq!(expr.chain_operands(expr.root()), vec![and, c]);
        assert_eq!(expr.chain_operands(and), vec![a, b]);
        assert_eq!(expr.chain_operands(c), vec![c]);
    }

    #[test]
    fn test_nesting_limit() {
        let mut builder = ExpressionBuilder::new();
        let mut node = builder.boolean(true);
        let mut result = Ok(node);
        for _ in 0..200 {
            result = builder.not(node);
            match result {
                Ok(id) => node = id,
                Err(_) => break,
            }
        }
        assert_eq!(
            result,
            Err(ExpressionError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH
            })
        );
    }
}
