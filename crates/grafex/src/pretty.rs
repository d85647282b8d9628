//! Display implementations
//!
//! Syntax trees print as fully parenthesized prefix forms (`(+ 2 (* 3 4))`),
//! which makes their structure easy to assert on. Semantic trees print back
//! as infix expressions that reparse to the same value.

use std::fmt::{self, Display};

use crate::semantic::{Notation, Operation, SemanticNode, SemanticTree};
use crate::syntax::{Leaf, NodeId, SyntaxNode, SyntaxTree};
use crate::token::Token;
use crate::value::{Value, ValueType};

// ============ Tokens ============

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})@{}", self.category, self.text, self.offset)
    }
}

// ============ Syntax tree ============

impl Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_children(f, self, self.children(self.root()))
    }
}

fn write_children(f: &mut fmt::Formatter<'_>, tree: &SyntaxTree, children: &[NodeId]) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write_node(f, tree, *child)?;
    }
    Ok(())
}

fn write_node(f: &mut fmt::Formatter<'_>, tree: &SyntaxTree, id: NodeId) -> fmt::Result {
    match tree.node(id) {
        SyntaxNode::Group {
            open,
            close,
            children,
        } => {
            write!(f, "{}", open.as_deref().unwrap_or_default())?;
            write_children(f, tree, children)?;
            write!(f, "{}", close.as_deref().unwrap_or_default())
        }
        SyntaxNode::Operator {
            token, children, ..
        } => {
            write!(f, "({} ", token)?;
            write_children(f, tree, children)?;
            write!(f, ")")
        }
        SyntaxNode::FunctionCall { name, children } => {
            write!(f, "{}", name)?;
            write_children(f, tree, children)
        }
        SyntaxNode::Leaf(Leaf::Number(text) | Leaf::Identifier(text)) => write!(f, "{}", text),
    }
}

// ============ Values ============

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Number => write!(f, "number"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Array(element) => write!(f, "[{}]", element),
            ValueType::Any => write!(f, "any"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

// ============ Semantic tree ============

impl Display for SemanticTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root())
    }
}

impl Display for SemanticNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticNode::Constant(c) => match c.name() {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "{}", c.value()),
            },
            SemanticNode::Variable(v) => write!(f, "{}", v.name()),
            SemanticNode::Operation(op) => write!(f, "{}", op),
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children = self.children();
        match self.notation() {
            Notation::Prefix => {
                write!(f, "{}", self.name())?;
                children.iter().try_for_each(|c| write_operand(f, c))
            }
            Notation::Postfix => {
                children.iter().try_for_each(|c| write_operand(f, c))?;
                write!(f, "{}", self.name())
            }
            Notation::Infix => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", self.name())?;
                    }
                    write_operand(f, child)?;
                }
                Ok(())
            }
            Notation::Call => {
                write!(f, "{}(", self.name())?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Operands that are themselves operators get parentheses
fn write_operand(f: &mut fmt::Formatter<'_>, node: &SemanticNode) -> fmt::Result {
    let needs_parens = matches!(
        node,
        SemanticNode::Operation(op) if op.notation() != Notation::Call
    );
    if needs_parens {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::grammar::Grammar;
    use crate::parse::Parser;
    use crate::registry::OperationRegistry;
    use crate::transform::SemanticBuilder;

    fn semantic(input: &str) -> SemanticTree {
        let tree = Parser::default().parse(input).unwrap();
        SemanticBuilder::new(
            Arc::new(Grammar::standard()),
            Arc::new(OperationRegistry::standard()),
        )
        .to_semantic_tree(&tree)
        .unwrap()
    }

    #[test]
    fn semantic_display() {
        assert_eq!(semantic("2+3*4").to_string(), "2 + (3 * 4)");
        assert_eq!(semantic("-x!").to_string(), "-(x!)");
        assert_eq!(semantic("2 pi x").to_string(), "(2 * pi) * x");
        assert_eq!(semantic("max(1, sin(x), y^2)").to_string(), "max(1, sin(x), y ^ 2)");
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(
            Value::Array(vec![Value::Number(1.0), Value::Boolean(false)]).to_string(),
            "[1, false]"
        );
        assert_eq!(ValueType::array(ValueType::Number).to_string(), "[number]");
    }
}
