//! Arena-backed syntax tree for Meson build scripts.
//!
//! Nodes live in a flat arena indexed by [`NodeId`]; each node stores its
//! byte span and the id of its owning parent. Upward navigation is an index
//! lookup, so the tree needs no back-pointers and stays trivially `Send`.

/// Source span as a half-open byte-offset interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Handle to a node in a [`SyntaxTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Textual base of an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerBase {
    Decimal,
    Hexadecimal,
    Octal,
    Binary,
}

impl std::fmt::Display for IntegerBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegerBase::Decimal => write!(f, "decimal"),
            IntegerBase::Hexadecimal => write!(f, "hexadecimal"),
            IntegerBase::Octal => write!(f, "octal"),
            IntegerBase::Binary => write!(f, "binary"),
        }
    }
}

/// Assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOp {
    Assign,
    AddAssign,
}

impl std::fmt::Display for AssignmentOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentOp::Assign => write!(f, "="),
            AssignmentOp::AddAssign => write!(f, "+="),
        }
    }
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        };
        write!(f, "{s}")
    }
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "not"),
            UnaryOp::Neg => write!(f, "-"),
        }
    }
}

/// The closed set of syntax node kinds.
///
/// Children are held as arena ids; a child id appears in exactly one parent,
/// so the arena forms a single-rooted tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Parenthesized argument list of a function or method call.
    /// The span covers the parentheses.
    ArgumentList { arguments: Vec<NodeId> },
    ArrayLiteral { elements: Vec<NodeId> },
    AssignmentStatement {
        lhs: NodeId,
        op: AssignmentOp,
        rhs: NodeId,
    },
    BinaryExpression {
        lhs: NodeId,
        op: BinaryOp,
        rhs: NodeId,
    },
    BooleanLiteral { value: bool },
    BreakNode,
    /// Root of a parsed build script.
    BuildDefinition { statements: Vec<NodeId> },
    ConditionalExpression {
        condition: NodeId,
        if_true: NodeId,
        if_false: NodeId,
    },
    ContinueNode,
    DictionaryLiteral { items: Vec<NodeId> },
    /// Marker for a construct the builder could not represent. Participates
    /// in traversal but triggers nothing.
    ErrorNode { message: String },
    FunctionExpression { name: NodeId, args: NodeId },
    IdExpression { name: String },
    IntegerLiteral { value: u64, base: IntegerBase },
    IterationStatement {
        variables: Vec<NodeId>,
        iterable: NodeId,
        body: Vec<NodeId>,
    },
    KeyValueItem { key: NodeId, value: NodeId },
    KeywordItem { name: NodeId, value: NodeId },
    MethodExpression {
        object: NodeId,
        name: NodeId,
        args: NodeId,
    },
    /// `if`/`elif`/`else` chain. `blocks` holds one statement block per
    /// condition, plus a trailing block when an `else` clause is present.
    SelectionStatement {
        conditions: Vec<NodeId>,
        blocks: Vec<Vec<NodeId>>,
    },
    StringLiteral { value: String },
    SubscriptExpression { outer: NodeId, inner: NodeId },
    UnaryExpression { op: UnaryOp, operand: NodeId },
}

/// A node in the arena: kind, span, owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
}

/// A parsed build script: source text plus the node arena.
///
/// The tree is immutable after construction; code-action collection only
/// borrows it.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Source text covered by a span.
    pub fn text(&self, span: Span) -> &str {
        &self.source[span.start.min(self.source.len())..span.end.min(self.source.len())]
    }

    /// Source text covered by a node.
    pub fn node_text(&self, id: NodeId) -> &str {
        self.text(self.span(id))
    }

    /// Child ids in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            NodeKind::ArgumentList { arguments } => arguments.clone(),
            NodeKind::ArrayLiteral { elements } => elements.clone(),
            NodeKind::AssignmentStatement { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::BinaryExpression { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::BuildDefinition { statements } => statements.clone(),
            NodeKind::ConditionalExpression {
                condition,
                if_true,
                if_false,
            } => vec![*condition, *if_true, *if_false],
            NodeKind::DictionaryLiteral { items } => items.clone(),
            NodeKind::FunctionExpression { name, args } => vec![*name, *args],
            NodeKind::IterationStatement {
                variables,
                iterable,
                body,
            } => variables
                .iter()
                .copied()
                .chain(std::iter::once(*iterable))
                .chain(body.iter().copied())
                .collect(),
            NodeKind::KeyValueItem { key, value } => vec![*key, *value],
            NodeKind::KeywordItem { name, value } => vec![*name, *value],
            NodeKind::MethodExpression { object, name, args } => vec![*object, *name, *args],
            NodeKind::SelectionStatement { conditions, blocks } => {
                let mut out = Vec::new();
                for (i, block) in blocks.iter().enumerate() {
                    if let Some(cond) = conditions.get(i) {
                        out.push(*cond);
                    }
                    out.extend(block.iter().copied());
                }
                out
            }
            NodeKind::SubscriptExpression { outer, inner } => vec![*outer, *inner],
            NodeKind::UnaryExpression { operand, .. } => vec![*operand],
            NodeKind::BooleanLiteral { .. }
            | NodeKind::BreakNode
            | NodeKind::ContinueNode
            | NodeKind::ErrorNode { .. }
            | NodeKind::IdExpression { .. }
            | NodeKind::IntegerLiteral { .. }
            | NodeKind::StringLiteral { .. } => Vec::new(),
        }
    }

    /// Error-marker nodes in pre-order.
    pub fn error_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if matches!(self.kind(id), NodeKind::ErrorNode { .. }) {
                out.push(id);
            }
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        out
    }
}

/// Arena builder used by the parser. Parents are wired up in `finish`.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }

    pub(crate) fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub(crate) fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub(crate) fn finish(self, root: NodeId, source: String) -> SyntaxTree {
        let mut tree = SyntaxTree {
            source,
            nodes: self.nodes,
            root,
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for child in tree.children(id) {
                tree.nodes[child.index()].parent = Some(id);
                stack.push(child);
            }
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Span & operator Display
    // ---------------------------------------------------------------

    #[test]
    fn span_construction_and_fields() {
        let s = Span::new(3, 9);
        assert_eq!(s.start, 3);
        assert_eq!(s.end, 9);
    }

    #[test]
    fn span_equality() {
        assert_eq!(Span::new(0, 5), Span::new(0, 5));
        assert_ne!(Span::new(0, 5), Span::new(0, 6));
    }

    #[test]
    fn display_integer_base_all_variants() {
        assert_eq!(IntegerBase::Decimal.to_string(), "decimal");
        assert_eq!(IntegerBase::Hexadecimal.to_string(), "hexadecimal");
        assert_eq!(IntegerBase::Octal.to_string(), "octal");
        assert_eq!(IntegerBase::Binary.to_string(), "binary");
    }

    #[test]
    fn display_assignment_op() {
        assert_eq!(AssignmentOp::Assign.to_string(), "=");
        assert_eq!(AssignmentOp::AddAssign.to_string(), "+=");
    }

    #[test]
    fn display_binary_op_all_variants() {
        assert_eq!(BinaryOp::Or.to_string(), "or");
        assert_eq!(BinaryOp::And.to_string(), "and");
        assert_eq!(BinaryOp::Eq.to_string(), "==");
        assert_eq!(BinaryOp::Ne.to_string(), "!=");
        assert_eq!(BinaryOp::Lt.to_string(), "<");
        assert_eq!(BinaryOp::Le.to_string(), "<=");
        assert_eq!(BinaryOp::Gt.to_string(), ">");
        assert_eq!(BinaryOp::Ge.to_string(), ">=");
        assert_eq!(BinaryOp::In.to_string(), "in");
        assert_eq!(BinaryOp::NotIn.to_string(), "not in");
        assert_eq!(BinaryOp::Add.to_string(), "+");
        assert_eq!(BinaryOp::Sub.to_string(), "-");
        assert_eq!(BinaryOp::Mul.to_string(), "*");
        assert_eq!(BinaryOp::Div.to_string(), "/");
        assert_eq!(BinaryOp::Mod.to_string(), "%");
    }

    #[test]
    fn display_unary_op() {
        assert_eq!(UnaryOp::Not.to_string(), "not");
        assert_eq!(UnaryOp::Neg.to_string(), "-");
    }

    // ---------------------------------------------------------------
    // Arena construction & navigation
    // ---------------------------------------------------------------

    /// Builds `x = 42` by hand: BuildDefinition -> Assignment -> (Id, Int).
    fn small_tree() -> SyntaxTree {
        let mut b = TreeBuilder::new();
        let lhs = b.push(NodeKind::IdExpression { name: "x".into() }, Span::new(0, 1));
        let rhs = b.push(
            NodeKind::IntegerLiteral {
                value: 42,
                base: IntegerBase::Decimal,
            },
            Span::new(4, 6),
        );
        let assign = b.push(
            NodeKind::AssignmentStatement {
                lhs,
                op: AssignmentOp::Assign,
                rhs,
            },
            Span::new(0, 6),
        );
        let root = b.push(
            NodeKind::BuildDefinition {
                statements: vec![assign],
            },
            Span::new(0, 6),
        );
        b.finish(root, "x = 42".to_owned())
    }

    #[test]
    fn finish_assigns_parents() {
        let tree = small_tree();
        let root = tree.root();
        assert!(tree.parent(root).is_none());
        let assign = tree.children(root)[0];
        assert_eq!(tree.parent(assign), Some(root));
        for child in tree.children(assign) {
            assert_eq!(tree.parent(child), Some(assign));
        }
    }

    #[test]
    fn children_in_source_order() {
        let tree = small_tree();
        let assign = tree.children(tree.root())[0];
        let kids = tree.children(assign);
        assert_eq!(kids.len(), 2);
        assert!(matches!(
            tree.kind(kids[0]),
            NodeKind::IdExpression { name } if name == "x"
        ));
        assert!(matches!(
            tree.kind(kids[1]),
            NodeKind::IntegerLiteral { value: 42, .. }
        ));
    }

    #[test]
    fn node_text_matches_span() {
        let tree = small_tree();
        let assign = tree.children(tree.root())[0];
        let kids = tree.children(assign);
        assert_eq!(tree.node_text(kids[0]), "x");
        assert_eq!(tree.node_text(kids[1]), "42");
        assert_eq!(tree.node_text(assign), "x = 42");
    }

    #[test]
    fn text_clamps_out_of_bounds_span() {
        let tree = small_tree();
        assert_eq!(tree.text(Span::new(4, 100)), "42");
    }

    #[test]
    fn selection_children_interleave_conditions_and_blocks() {
        let mut b = TreeBuilder::new();
        let c1 = b.push(NodeKind::BooleanLiteral { value: true }, Span::new(3, 7));
        let s1 = b.push(NodeKind::BreakNode, Span::new(8, 13));
        let s2 = b.push(NodeKind::ContinueNode, Span::new(19, 27));
        let sel = b.push(
            NodeKind::SelectionStatement {
                conditions: vec![c1],
                blocks: vec![vec![s1], vec![s2]],
            },
            Span::new(0, 33),
        );
        let root = b.push(
            NodeKind::BuildDefinition {
                statements: vec![sel],
            },
            Span::new(0, 33),
        );
        let tree = b.finish(root, String::new());
        assert_eq!(tree.children(sel), vec![c1, s1, s2]);
    }

    #[test]
    fn error_nodes_are_collected_in_pre_order() {
        let mut b = TreeBuilder::new();
        let e1 = b.push(
            NodeKind::ErrorNode {
                message: "first".into(),
            },
            Span::new(0, 1),
        );
        let e2 = b.push(
            NodeKind::ErrorNode {
                message: "second".into(),
            },
            Span::new(2, 3),
        );
        let root = b.push(
            NodeKind::BuildDefinition {
                statements: vec![e1, e2],
            },
            Span::new(0, 3),
        );
        let tree = b.finish(root, String::new());
        assert_eq!(tree.error_nodes(), vec![e1, e2]);
    }

    #[test]
    fn literal_nodes_have_no_children() {
        let tree = small_tree();
        let assign = tree.children(tree.root())[0];
        for kid in tree.children(assign) {
            assert!(tree.children(kid).is_empty());
        }
    }
}
