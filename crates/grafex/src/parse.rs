//! Incremental tree builder
//!
//! Tokens are consumed one at a time against a single cursor: the innermost
//! node still waiting for input. Operator precedence is resolved on arrival by
//! rotating an already-built operand under the new operator, so there is no
//! backtracking and no grammar table beyond the precedence levels.

use std::sync::Arc;

use log::{debug, trace};
use thiserror::Error;

use crate::grammar::Grammar;
use crate::syntax::{Fixity, Leaf, NodeId, SyntaxNode, SyntaxTree};
use crate::token::{Token, TokenCategory, Tokenizer};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unrecognized symbol at offset {offset}: '{remaining}'")]
    UnrecognizedSymbol { offset: usize, remaining: String },

    #[error("'{token}' ({category:?}) cannot appear at offset {offset}")]
    InvalidOperatorPosition {
        token: String,
        category: TokenCategory,
        offset: usize,
    },

    #[error("Unexpected '{found}' at offset {offset}{}", expected_suffix(.expected))]
    ParentheticalError {
        expected: Option<String>,
        found: String,
        offset: usize,
    },

    #[error("Expression ended early: {pending}")]
    EndedEarly { pending: String, offset: usize },
}

fn expected_suffix(expected: &Option<String>) -> String {
    match expected {
        Some(close) => format!(", expected '{close}'"),
        None => String::new(),
    }
}

/// Tokenizer and tree builder bound to one grammar
#[derive(Debug, Clone)]
pub struct Parser {
    grammar: Arc<Grammar>,
}

impl Parser {
    pub fn new(grammar: Arc<Grammar>) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, ParseError> {
        Tokenizer::new(&self.grammar).tokenize(input)
    }

    pub fn build(&self, tokens: &[Token]) -> Result<SyntaxTree, ParseError> {
        build(&self.grammar, tokens)
    }

    /// Parse an expression into a syntax tree
    pub fn parse(&self, input: &str) -> Result<SyntaxTree, ParseError> {
        let tokens = self.tokenize(input)?;
        let tree = self.build(&tokens)?;
        debug!("parsed '{}' into {} nodes", input, tree.len());
        Ok(tree)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(Arc::new(Grammar::standard()))
    }
}

/// Build a syntax tree from an already tokenized expression
pub fn build(grammar: &Grammar, tokens: &[Token]) -> Result<SyntaxTree, ParseError> {
    let mut builder = TreeBuilder::new(grammar);
    for token in tokens {
        builder.push(token)?;
    }
    let end = tokens
        .last()
        .map(|t| t.offset + t.text.len())
        .unwrap_or(0);
    builder.finish(end)
}

struct TreeBuilder<'g> {
    grammar: &'g Grammar,
    tree: SyntaxTree,
    /// Open nodes from the root down; the top is the cursor
    stack: Vec<NodeId>,
}

impl<'g> TreeBuilder<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        let tree = SyntaxTree::new();
        let root = tree.root();
        Self {
            grammar,
            tree,
            stack: vec![root],
        }
    }

    fn cursor(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.tree.root())
    }

    fn push(&mut self, token: &Token) -> Result<(), ParseError> {
        trace!(
            "cursor {:?} <- {:?} '{}'",
            self.cursor(),
            token.category,
            token.text
        );
        if !self.accepts(token.category) {
            return Err(invalid_position(token));
        }

        if token.category.starts_operand()
            && self.tree.node(self.cursor()).is_group()
            && !self.tree.children(self.cursor()).is_empty()
            && let Some(implicit) = self.grammar.implicit_operator()
        {
            let implicit = Token::new(implicit, TokenCategory::MultaryOp, token.offset);
            trace!("implicit '{}' before '{}'", implicit.text, token.text);
            self.insert_infix(&implicit)?;
        }

        match token.category {
            TokenCategory::Function => {
                let call = self.tree.push(SyntaxNode::FunctionCall {
                    name: token.text.clone(),
                    children: Vec::new(),
                });
                self.descend(call);
            }
            TokenCategory::PreUnaryOp => {
                let op = self.tree.push(SyntaxNode::Operator {
                    token: token.text.clone(),
                    fixity: Fixity::Prefix,
                    children: Vec::new(),
                });
                self.descend(op);
            }
            TokenCategory::ParenOpen => {
                let close = self.grammar.closing_for(&token.text).ok_or_else(|| {
                    ParseError::ParentheticalError {
                        expected: None,
                        found: token.text.clone(),
                        offset: token.offset,
                    }
                })?;
                let group = self.tree.push(SyntaxNode::Group {
                    open: Some(token.text.clone()),
                    close: Some(close.to_string()),
                    children: Vec::new(),
                });
                self.descend(group);
            }
            TokenCategory::Number | TokenCategory::Identifier => {
                let leaf = if token.category == TokenCategory::Number {
                    Leaf::Number(token.text.clone())
                } else {
                    Leaf::Identifier(token.text.clone())
                };
                let leaf = self.tree.push(SyntaxNode::Leaf(leaf));
                let cursor = self.cursor();
                self.tree.attach(cursor, leaf);
                self.complete_operand();
            }
            TokenCategory::ParenClose => self.close_group(token)?,
            TokenCategory::PostUnaryOp => self.insert_postfix(token),
            TokenCategory::BinaryOp | TokenCategory::MultaryOp => self.insert_infix(token)?,
        }
        Ok(())
    }

    /// Whether the cursor node can take a token of this category
    fn accepts(&self, category: TokenCategory) -> bool {
        let cursor = self.cursor();
        match self.tree.node(cursor) {
            SyntaxNode::Group { children, .. } if children.is_empty() => {
                category.starts_operand()
                    || (category == TokenCategory::ParenClose && self.is_argument_list(cursor))
            }
            SyntaxNode::Group { .. } => {
                !category.starts_operand() || self.grammar.implicit_operator().is_some()
            }
            SyntaxNode::Operator { .. } => category.starts_operand(),
            SyntaxNode::FunctionCall { .. } => category == TokenCategory::ParenOpen,
            SyntaxNode::Leaf(_) => false,
        }
    }

    fn is_argument_list(&self, group: NodeId) -> bool {
        self.cursor() == group
            && self.stack.len() >= 2
            && matches!(
                self.tree.node(self.stack[self.stack.len() - 2]),
                SyntaxNode::FunctionCall { .. }
            )
    }

    fn descend(&mut self, child: NodeId) {
        let cursor = self.cursor();
        self.tree.attach(cursor, child);
        self.stack.push(child);
    }

    /// An operand just finished: walk up to the nearest enclosing group
    fn complete_operand(&mut self) {
        while self.stack.len() > 1 && !self.tree.node(self.cursor()).is_group() {
            self.stack.pop();
        }
    }

    fn close_group(&mut self, token: &Token) -> Result<(), ParseError> {
        let cursor = self.cursor();
        let expected = match self.tree.node(cursor) {
            SyntaxNode::Group { close, .. } => close.clone(),
            _ => None,
        };
        if expected.as_deref() != Some(token.text.as_str()) || self.stack.len() < 2 {
            return Err(ParseError::ParentheticalError {
                expected,
                found: token.text.clone(),
                offset: token.offset,
            });
        }
        self.stack.pop();
        self.complete_operand();
        Ok(())
    }

    /// Insert a binary or multary operator into the cursor group
    fn insert_infix(&mut self, token: &Token) -> Result<(), ParseError> {
        let depth = self
            .grammar
            .depth(&token.text)
            .ok_or_else(|| invalid_position(token))?;
        let right_associative = self.grammar.is_right_associative(&token.text);

        let group = self.cursor();
        let mut parent = group;
        let Some(mut target) = self.tree.last_child(group) else {
            return Err(invalid_position(token));
        };

        // Walk the right-most spine past operators that bind more loosely
        while let SyntaxNode::Operator {
            fixity, children, ..
        } = self.tree.node(target)
        {
            let Some(existing) = fixity.depth() else {
                break;
            };
            let looser = existing > depth || (existing == depth && right_associative);
            match children.last() {
                Some(&last) if looser => {
                    parent = target;
                    target = last;
                }
                _ => break,
            }
        }

        let multary = token.category == TokenCategory::MultaryOp;
        if multary
            && let SyntaxNode::Operator {
                token: existing,
                fixity: Fixity::Multary { .. },
                ..
            } = self.tree.node(target)
            && *existing == token.text
        {
            trace!("extending '{}' chain", token.text);
            self.stack.push(target);
            return Ok(());
        }

        let fixity = if multary {
            Fixity::Multary { depth }
        } else {
            Fixity::Binary { depth }
        };
        let op = self.tree.push(SyntaxNode::Operator {
            token: token.text.clone(),
            fixity,
            children: vec![target],
        });
        self.tree.replace_last_child(parent, op);
        self.stack.push(op);
        Ok(())
    }

    /// Wrap the most recently completed operand in a postfix operator
    fn insert_postfix(&mut self, token: &Token) {
        let group = self.cursor();
        let mut parent = group;
        let Some(mut target) = self.tree.last_child(group) else {
            return;
        };

        while let SyntaxNode::Operator {
            fixity, children, ..
        } = self.tree.node(target)
        {
            match (fixity, children.last()) {
                (Fixity::Postfix, _) | (_, None) => break,
                (_, Some(&last)) => {
                    parent = target;
                    target = last;
                }
            }
        }

        let op = self.tree.push(SyntaxNode::Operator {
            token: token.text.clone(),
            fixity: Fixity::Postfix,
            children: vec![target],
        });
        self.tree.replace_last_child(parent, op);
    }

    fn finish(self, end: usize) -> Result<SyntaxTree, ParseError> {
        if self.stack.len() == 1 {
            return Ok(self.tree);
        }
        let pending = match self.tree.node(self.cursor()) {
            SyntaxNode::Group { open, close, .. } => format!(
                "'{}' is never closed by '{}'",
                open.as_deref().unwrap_or_default(),
                close.as_deref().unwrap_or_default()
            ),
            SyntaxNode::Operator { token, .. } => format!("'{token}' is missing an operand"),
            SyntaxNode::FunctionCall { name, .. } => format!("'{name}' is missing its arguments"),
            SyntaxNode::Leaf(_) => "unfinished operand".to_string(),
        };
        Err(ParseError::EndedEarly {
            pending,
            offset: end,
        })
    }
}

fn invalid_position(token: &Token) -> ParseError {
    ParseError::InvalidOperatorPosition {
        token: token.text.clone(),
        category: token.category,
        offset: token.offset,
    }
}

// ============ Sanity Tests ============
// Evaluation-level behavior is covered in tests/integration.rs
