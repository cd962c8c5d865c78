//! Combinator grammar engine.
//!
//! A [`Grammar`] is an arena of rules. Each builder method appends one rule and
//! returns its [`RuleId`]; composite rules refer to their parts by id, so a
//! rule that mentions itself only needs a [`Grammar::forward`] slot that is
//! patched with [`Grammar::define`] once the real rule exists.
//!
//! Parsing is non-backtracking except where a rule explicitly saves and
//! restores the cursor: [`Grammar::alternative`] rewinds between branches and
//! the repetitions rewind their final failed attempt. A [`Grammar::sequence`]
//! that fails part-way leaves the cursor where the failing field stopped.

use log::debug;

use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::error::CoreError;
use crate::lexer::Token;
use crate::registry::{Kind, Registry};
use crate::syntax::{Node, NodeId, SyntaxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(usize);

#[derive(Debug, Clone)]
enum Rule {
    Token {
        kind: Kind,
        tag: Kind,
    },
    Sequence {
        tag: Kind,
        fields: Vec<RuleId>,
    },
    Repeat {
        tag: Kind,
        element: RuleId,
        min: usize,
    },
    RepeatWithSeparator {
        tag: Kind,
        element: RuleId,
        separator: RuleId,
        strict: bool,
    },
    Alternative {
        branches: Vec<RuleId>,
    },
    Decorate {
        index: usize,
        fields: Vec<RuleId>,
    },
    Recursive {
        target: Option<RuleId>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Grammar {
    rules: Vec<Rule>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, rule: Rule) -> RuleId {
        self.rules.push(rule);
        RuleId(self.rules.len() - 1)
    }

    /// Matches one token of kind `kind`; the leaf is tagged with the same kind.
    pub fn token(&mut self, registry: &mut Registry, kind: &str) -> RuleId {
        let kind = registry.intern(kind);
        self.push(Rule::Token { kind, tag: kind })
    }

    /// Matches one token of kind `kind` but tags the leaf as `tag`, so tokens
    /// that share a lexical kind can be told apart in the tree.
    pub fn token_as(&mut self, registry: &mut Registry, tag: &str, kind: &str) -> RuleId {
        let kind = registry.intern(kind);
        let tag = registry.intern(tag);
        self.push(Rule::Token { kind, tag })
    }

    pub fn sequence(&mut self, registry: &mut Registry, tag: &str, fields: &[RuleId]) -> RuleId {
        let tag = registry.intern(tag);
        self.push(Rule::Sequence {
            tag,
            fields: fields.to_vec(),
        })
    }

    pub fn repeat(
        &mut self,
        registry: &mut Registry,
        tag: &str,
        element: RuleId,
        min: usize,
    ) -> RuleId {
        let tag = registry.intern(tag);
        self.push(Rule::Repeat { tag, element, min })
    }

    /// `element (separator element)*`. With `strict`, a separator must be
    /// followed by another element; otherwise a trailing separator is
    /// accepted. Separators are not kept in the tree.
    pub fn separated(
        &mut self,
        registry: &mut Registry,
        tag: &str,
        element: RuleId,
        separator: RuleId,
        strict: bool,
    ) -> RuleId {
        let tag = registry.intern(tag);
        self.push(Rule::RepeatWithSeparator {
            tag,
            element,
            separator,
            strict,
        })
    }

    /// First branch that matches wins. The produced node records the index
    /// of the branch in [`Node::branch`].
    pub fn alternative(&mut self, branches: &[RuleId]) -> RuleId {
        self.push(Rule::Alternative {
            branches: branches.to_vec(),
        })
    }

    /// Parses every field but keeps only the one at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds for `fields`.
    pub fn decorate(&mut self, index: usize, fields: &[RuleId]) -> RuleId {
        assert!(
            index < fields.len(),
            "decorate index {index} out of bounds for {} fields",
            fields.len()
        );
        self.push(Rule::Decorate {
            index,
            fields: fields.to_vec(),
        })
    }

    /// Reserves a rule slot to be filled later with [`Grammar::define`].
    pub fn forward(&mut self) -> RuleId {
        self.push(Rule::Recursive { target: None })
    }

    /// # Panics
    ///
    /// Panics if `forward` was not created by [`Grammar::forward`] or was
    /// already defined.
    pub fn define(&mut self, forward: RuleId, target: RuleId) {
        match &mut self.rules[forward.0] {
            Rule::Recursive { target: slot @ None } => *slot = Some(target),
            Rule::Recursive { target: Some(_) } => {
                panic!("forward rule {} is already defined", forward.0)
            }
            _ => panic!("rule {} is not a forward rule", forward.0),
        }
    }

    fn undefined_forward(&self) -> Option<RuleId> {
        self.rules
            .iter()
            .position(|rule| matches!(rule, Rule::Recursive { target: None }))
            .map(RuleId)
    }

    /// Parses `tokens` with `root`, which must consume all of them.
    ///
    /// On failure the reported error is the one found furthest into the
    /// source, since outer repetitions absorb the failures of their elements.
    pub fn parse(&self, root: RuleId, source: &str, tokens: &[Token]) -> Result<Node, CoreError> {
        if let Some(rule) = self.undefined_forward() {
            return Err(CoreError::Internal(format!(
                "forward rule {} was never defined",
                rule.0
            )));
        }

        let mut cursor = Cursor::new(tokens, source.len());
        let failure = match self.parse_rule(root, &mut cursor) {
            Ok(node) if cursor.at_end() => {
                debug!(
                    "parsed {} tokens into {} nodes",
                    tokens.len(),
                    cursor.next_id
                );
                return Ok(node);
            }
            Ok(_) => cursor.fail(ErrorKind::UnexpectedToken),
            Err(err) => err,
        };

        let reported = match cursor.furthest {
            Some(furthest) if furthest.offset > failure.offset => furthest,
            _ => failure,
        };
        Err(CoreError::Syntax(Diagnostic::new(
            source,
            reported.kind,
            reported.offset,
        )))
    }

    fn parse_rule(&self, rule: RuleId, cursor: &mut Cursor<'_>) -> Result<Node, SyntaxError> {
        match &self.rules[rule.0] {
            Rule::Token { kind, tag } => {
                let Some(token) = cursor.peek() else {
                    return Err(cursor.fail(ErrorKind::OutOfRange));
                };
                if token.kind != *kind {
                    return Err(cursor.fail(ErrorKind::UnexpectedToken));
                }
                cursor.index += 1;
                Ok(Node::leaf(
                    cursor.node_id(),
                    *tag,
                    token.text.clone(),
                    token.start,
                ))
            }
            Rule::Sequence { tag, fields } => {
                let mut children = Vec::with_capacity(fields.len());
                for field in fields {
                    children.push(self.parse_rule(*field, cursor)?);
                }
                Ok(Node::tree(cursor.node_id(), *tag, children))
            }
            Rule::Repeat { tag, element, min } => {
                let mut children = Vec::new();
                loop {
                    let saved = cursor.index;
                    match self.parse_rule(*element, cursor) {
                        // a zero-width element would match forever
                        Ok(_) if cursor.index == saved => break,
                        Ok(node) => children.push(node),
                        Err(_) => {
                            cursor.index = saved;
                            break;
                        }
                    }
                }
                if children.len() < *min {
                    return Err(cursor.fail(ErrorKind::RepetitionTooShort));
                }
                Ok(Node::tree(cursor.node_id(), *tag, children))
            }
            Rule::RepeatWithSeparator {
                tag,
                element,
                separator,
                strict,
            } => {
                let mut children = Vec::new();
                loop {
                    let round = cursor.index;
                    match self.parse_rule(*element, cursor) {
                        Ok(node) => children.push(node),
                        Err(_) if children.is_empty() || !strict => {
                            cursor.index = round;
                            break;
                        }
                        Err(err) => return Err(err),
                    }

                    let saved = cursor.index;
                    if self.parse_rule(*separator, cursor).is_err() {
                        cursor.index = saved;
                        break;
                    }
                    // a zero-width element and separator would match forever
                    if cursor.index == round {
                        children.pop();
                        break;
                    }
                }
                Ok(Node::tree(cursor.node_id(), *tag, children))
            }
            Rule::Alternative { branches } => {
                let start = cursor.index;
                for (branch, candidate) in branches.iter().enumerate() {
                    match self.parse_rule(*candidate, cursor) {
                        Ok(mut node) => {
                            node.branch = Some(branch);
                            return Ok(node);
                        }
                        Err(_) => cursor.index = start,
                    }
                }
                Err(cursor.fail(ErrorKind::NoAlternativeMatched))
            }
            Rule::Decorate { index, fields } => {
                let mut value = None;
                for (i, field) in fields.iter().enumerate() {
                    let node = self.parse_rule(*field, cursor)?;
                    if i == *index {
                        value = Some(node);
                    }
                }
                Ok(value.expect("decorate index checked at construction"))
            }
            Rule::Recursive { target } => match target {
                Some(target) => self.parse_rule(*target, cursor),
                None => unreachable!("forward rules are checked before parsing"),
            },
        }
    }
}

struct Cursor<'t> {
    tokens: &'t [Token],
    index: usize,
    /// Offset reported once the tokens are exhausted.
    end_offset: usize,
    next_id: u32,
    furthest: Option<SyntaxError>,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token], end_offset: usize) -> Self {
        Cursor {
            tokens,
            index: 0,
            end_offset,
            next_id: 0,
            furthest: None,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.index)
    }

    fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end_offset, |token| token.start)
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn fail(&mut self, kind: ErrorKind) -> SyntaxError {
        let err = SyntaxError {
            kind,
            offset: self.offset(),
        };
        if self.furthest.is_none_or(|furthest| err.offset > furthest.offset) {
            self.furthest = Some(err);
        }
        err
    }
}
