//! Operator-precedence rewrite of flat expression nodes.
//!
//! The grammar parses an expression as a flat run of operands and operator
//! tokens. [`ShuntingYard::transform`] turns every such run into a nested
//! binary tree: each operator becomes a tree tagged with the operator's kind
//! whose two children are its left and right operands.

use std::collections::{HashMap, HashSet};

use crate::error::CoreError;
use crate::registry::{Kind, Registry};
use crate::syntax::{Node, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOp {
    pub precedence: u32,
    pub associativity: Associativity,
}

impl BinaryOp {
    pub fn left(precedence: u32) -> Self {
        BinaryOp {
            precedence,
            associativity: Associativity::Left,
        }
    }

    pub fn right(precedence: u32) -> Self {
        BinaryOp {
            precedence,
            associativity: Associativity::Right,
        }
    }

    /// Whether `self`, arriving while `top` is on the operator stack, forces
    /// `top` out first.
    fn yields_to(&self, top: &BinaryOp) -> bool {
        match self.associativity {
            Associativity::Left => self.precedence <= top.precedence,
            Associativity::Right => self.precedence < top.precedence,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShuntingYard {
    operators: HashMap<Kind, BinaryOp>,
    expressions: HashSet<Kind>,
}

impl ShuntingYard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operator(&mut self, registry: &mut Registry, tag: &str, op: BinaryOp) {
        self.operators.insert(registry.intern(tag), op);
    }

    /// Marks `tag` as a flat expression node to be rewritten.
    pub fn expression(&mut self, registry: &mut Registry, tag: &str) {
        self.expressions.insert(registry.intern(tag));
    }

    pub fn transform(&self, node: Node) -> Result<Node, CoreError> {
        if self.expressions.contains(&node.tag) {
            return self.rebuild(node);
        }
        match node.kind {
            NodeKind::Leaf { .. } => Ok(node),
            NodeKind::Tree(children) => {
                let children = children
                    .into_iter()
                    .map(|child| self.transform(child))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node {
                    kind: NodeKind::Tree(children),
                    ..node
                })
            }
        }
    }

    /// Orders the children of an expression node in reverse Polish notation.
    fn to_rpn(&self, children: Vec<Node>) -> Vec<Node> {
        let mut pending: Vec<(Node, BinaryOp)> = Vec::new();
        let mut output = Vec::with_capacity(children.len());

        for child in children {
            let Some(op) = self.operators.get(&child.tag).copied() else {
                output.push(child);
                continue;
            };
            while let Some((_, top)) = pending.last() {
                if !op.yields_to(top) {
                    break;
                }
                if let Some((popped, _)) = pending.pop() {
                    output.push(popped);
                }
            }
            pending.push((child, op));
        }

        output.extend(pending.into_iter().rev().map(|(node, _)| node));
        output
    }

    fn rebuild(&self, expression: Node) -> Result<Node, CoreError> {
        let NodeKind::Tree(children) = expression.kind else {
            return Err(CoreError::Internal(
                "expression node without children".to_string(),
            ));
        };

        let mut values: Vec<Node> = Vec::new();
        for item in self.to_rpn(children) {
            if !self.operators.contains_key(&item.tag) {
                values.push(self.transform(item)?);
                continue;
            }
            let (Some(b), Some(a)) = (values.pop(), values.pop()) else {
                return Err(CoreError::Internal(format!(
                    "operator at byte {} is missing an operand",
                    item.start().unwrap_or_default()
                )));
            };
            values.push(Node {
                kind: NodeKind::Tree(vec![a, b]),
                ..item
            });
        }

        match values.len() {
            1 => Ok(values.remove(0)),
            n => Err(CoreError::Internal(format!(
                "expression reduced to {n} values instead of one"
            ))),
        }
    }
}
