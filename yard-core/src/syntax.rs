//! Untyped syntax tree produced by the grammar engine.

use std::fmt;

use crate::diagnostic::ErrorKind;
use crate::registry::{Kind, Registry};

/// Identity of a node within one parse. Used as the key of side tables that
/// later passes attach to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Token kind for leaves, rule tag for trees.
    pub tag: Kind,
    /// Index of the `Alternative` branch that produced this node, if any.
    pub branch: Option<usize>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf { text: String, start: usize },
    Tree(Vec<Node>),
}

impl Node {
    pub fn leaf(id: NodeId, tag: Kind, text: String, start: usize) -> Self {
        Node {
            id,
            tag,
            branch: None,
            kind: NodeKind::Leaf { text, start },
        }
    }

    pub fn tree(id: NodeId, tag: Kind, children: Vec<Node>) -> Self {
        Node {
            id,
            tag,
            branch: None,
            kind: NodeKind::Tree(children),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { text, .. } => Some(text),
            NodeKind::Tree(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Leaf { .. } => &[],
            NodeKind::Tree(children) => children,
        }
    }

    /// First direct child carrying `tag`.
    pub fn child(&self, tag: Kind) -> Option<&Node> {
        self.children().iter().find(|c| c.tag == tag)
    }

    /// Source offset of the first leaf in this subtree.
    pub fn start(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Leaf { start, .. } => Some(*start),
            NodeKind::Tree(children) => children.iter().find_map(Node::start),
        }
    }

    /// Renders leaves as their text and trees as `Tag[child, ...]`.
    pub fn display<'a>(&'a self, registry: &'a Registry) -> DisplayNode<'a> {
        DisplayNode {
            node: self,
            registry,
        }
    }
}

pub struct DisplayNode<'a> {
    node: &'a Node,
    registry: &'a Registry,
}

impl fmt::Display for DisplayNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node.kind {
            NodeKind::Leaf { text, .. } => f.write_str(text),
            NodeKind::Tree(children) => {
                write!(f, "{}[", self.registry.name(self.node.tag))?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", child.display(self.registry))?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A combinator failure: what went wrong and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub offset: usize,
}
