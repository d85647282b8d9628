//! Concrete syntax tree
//!
//! Nodes live in an arena and refer to their children by `NodeId`. The tree
//! builder owns the only mutable access; parents are never stored on nodes.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// How an operator node binds its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Prefix,
    Postfix,
    /// `depth` is the precedence level (0 binds tightest)
    Binary { depth: usize },
    /// Same-token chains flatten into one node: `a + b + c`
    Multary { depth: usize },
}

impl Fixity {
    /// Precedence level of infix operators; unary operators bind tighter than any level
    pub fn depth(self) -> Option<usize> {
        match self {
            Fixity::Binary { depth } | Fixity::Multary { depth } => Some(depth),
            Fixity::Prefix | Fixity::Postfix => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaf {
    Number(String),
    Identifier(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    /// Parenthesized group; the synthetic root has no delimiters
    Group {
        open: Option<String>,
        close: Option<String>,
        children: Vec<NodeId>,
    },
    Operator {
        token: String,
        fixity: Fixity,
        children: Vec<NodeId>,
    },
    /// `name` followed by its argument group (the single child)
    FunctionCall { name: String, children: Vec<NodeId> },
    Leaf(Leaf),
}

impl SyntaxNode {
    pub fn children(&self) -> &[NodeId] {
        match self {
            SyntaxNode::Group { children, .. }
            | SyntaxNode::Operator { children, .. }
            | SyntaxNode::FunctionCall { children, .. } => children,
            SyntaxNode::Leaf(_) => &[],
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, SyntaxNode::Group { .. })
    }

    fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            SyntaxNode::Group { children, .. }
            | SyntaxNode::Operator { children, .. }
            | SyntaxNode::FunctionCall { children, .. } => Some(children),
            SyntaxNode::Leaf(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![SyntaxNode::Group {
                open: None,
                close: None,
                children: Vec::new(),
            }],
        }
    }

    /// The synthetic root group
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    /// Number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing was parsed below the root
    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    pub(crate) fn push(&mut self, node: SyntaxNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(children) = self.nodes[parent.0].children_mut() {
            children.push(child);
        }
    }

    pub(crate) fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Swap the last child of `parent` for `replacement`
    pub(crate) fn replace_last_child(&mut self, parent: NodeId, replacement: NodeId) {
        if let Some(slot) = self.nodes[parent.0]
            .children_mut()
            .and_then(|children| children.last_mut())
        {
            *slot = replacement;
        }
    }
}
