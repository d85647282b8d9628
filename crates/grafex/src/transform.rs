//! Transform a syntax tree into a semantic tree
//!
//! This pass:
//! - Drops groups (they only carried structure)
//! - Resolves identifiers to named constants or typed variables
//! - Resolves every operator and function call to one registry overload
//! - Splits function arguments on the grammar's separator

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::grammar::Grammar;
use crate::registry::OperationRegistry;
use crate::semantic::{
    ConstructionError, Constant, Notation, Operation, SemanticNode, SemanticTree, Variable,
};
use crate::syntax::{Fixity, Leaf, NodeId, SyntaxNode, SyntaxTree};
use crate::value::{Value, ValueType};

type Result<T> = std::result::Result<T, ConstructionError>;

/// Builds semantic trees against one registry
#[derive(Clone)]
pub struct SemanticBuilder {
    grammar: Arc<Grammar>,
    registry: Arc<OperationRegistry>,
    /// Declared variable types, keyed by lower-cased name
    variable_types: HashMap<String, ValueType>,
    default_variable_type: ValueType,
}

impl SemanticBuilder {
    pub fn new(grammar: Arc<Grammar>, registry: Arc<OperationRegistry>) -> Self {
        Self {
            grammar,
            registry,
            variable_types: HashMap::new(),
            default_variable_type: ValueType::Number,
        }
    }

    /// Declare the type of a variable (matched case-insensitively)
    pub fn with_variable(mut self, name: &str, ty: ValueType) -> Self {
        self.variable_types.insert(name.to_lowercase(), ty);
        self
    }

    /// Type given to variables that were not declared (defaults to `Number`)
    pub fn with_default_variable_type(mut self, ty: ValueType) -> Self {
        self.default_variable_type = ty;
        self
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn to_semantic_tree(&self, tree: &SyntaxTree) -> Result<SemanticTree> {
        let root = self.convert(tree, tree.root())?;
        Ok(SemanticTree::new(root))
    }

    fn convert(&self, tree: &SyntaxTree, id: NodeId) -> Result<SemanticNode> {
        match tree.node(id) {
            SyntaxNode::Group { children, .. } => match children.as_slice() {
                [] => Err(ConstructionError::EmptyGroup),
                [only] => self.convert(tree, *only),
                // Adjacent operands only survive when implicit operators are off,
                // which the builder already rejects
                [_, second, ..] => Err(self.misplaced(tree, *second)),
            },
            SyntaxNode::Leaf(Leaf::Number(text)) => match text.parse::<f64>() {
                // `1e999` overflows to infinity, which has no literal spelling
                Ok(n) if n.is_finite() => {
                    Ok(SemanticNode::Constant(Constant::new(Value::Number(n))))
                }
                _ => Err(ConstructionError::InvalidNumber(text.clone())),
            },
            SyntaxNode::Leaf(Leaf::Identifier(name)) => Ok(self.identifier(name)),
            SyntaxNode::Operator {
                token,
                fixity,
                children,
            } => {
                if self.is_separator(token) {
                    return Err(ConstructionError::MisplacedSeparator(token.clone()));
                }
                let args = children
                    .iter()
                    .map(|child| self.convert(tree, *child))
                    .collect::<Result<Vec<_>>>()?;
                let notation = match fixity {
                    Fixity::Prefix => Notation::Prefix,
                    Fixity::Postfix => Notation::Postfix,
                    Fixity::Binary { .. } | Fixity::Multary { .. } => Notation::Infix,
                };
                self.apply(token, args, notation)
            }
            SyntaxNode::FunctionCall { name, children } => {
                let args = self.arguments(tree, children)?;
                self.apply(name, args, Notation::Call)
            }
        }
    }

    fn identifier(&self, name: &str) -> SemanticNode {
        if let Some(value) = self.registry.constant(name) {
            return SemanticNode::Constant(Constant::named(name, value.clone()));
        }
        let declared = self
            .variable_types
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| self.default_variable_type.clone());
        SemanticNode::Variable(Variable::new(name, declared))
    }

    /// Arguments of a call: its group's content split on the separator
    fn arguments(&self, tree: &SyntaxTree, call_children: &[NodeId]) -> Result<Vec<SemanticNode>> {
        let Some(&group) = call_children.first() else {
            return Ok(Vec::new());
        };
        let content = match tree.node(group) {
            SyntaxNode::Group { children, .. } => children.as_slice(),
            _ => return Ok(vec![self.convert(tree, group)?]),
        };
        match content {
            [] => Ok(Vec::new()),
            [only] => match tree.node(*only) {
                SyntaxNode::Operator {
                    token, children, ..
                } if self.is_separator(token) => children
                    .iter()
                    .map(|child| self.convert(tree, *child))
                    .collect(),
                _ => Ok(vec![self.convert(tree, *only)?]),
            },
            [_, second, ..] => Err(self.misplaced(tree, *second)),
        }
    }

    /// Pick the first overload whose signature fits, folding flattened chains if needed
    fn apply(&self, name: &str, args: Vec<SemanticNode>, notation: Notation) -> Result<SemanticNode> {
        let overloads = self.registry.overloads(name);
        if overloads.is_empty() {
            return Err(ConstructionError::UnknownOperation {
                name: name.to_string(),
            });
        }

        let found: Vec<ValueType> = args.iter().map(SemanticNode::result_type).collect();
        if let Some(def) = overloads.iter().find(|d| d.signature().accepts(&found)) {
            trace!("resolved '{}' with {} argument(s)", name, args.len());
            let op = Operation::new(def.clone(), args)?.with_notation(notation);
            return Ok(SemanticNode::Operation(op));
        }

        // `a + b + c` arrives as one node; apply a binary overload pairwise
        if args.len() > 2 && overloads.iter().any(|d| d.signature().arity() == Some(2)) {
            let mut args = args.into_iter();
            if let Some(first) = args.next() {
                return args.try_fold(first, |acc, next| self.apply(name, vec![acc, next], notation));
            }
        }

        if overloads
            .iter()
            .any(|d| d.signature().accepts_arity(found.len()))
        {
            Err(ConstructionError::IncompatibleArguments {
                name: name.to_string(),
                found,
            })
        } else {
            Err(ConstructionError::WrongArity {
                name: name.to_string(),
                arity: found.len(),
            })
        }
    }

    fn is_separator(&self, token: &str) -> bool {
        self.grammar.argument_separator() == Some(token)
    }

    fn misplaced(&self, tree: &SyntaxTree, id: NodeId) -> ConstructionError {
        match tree.node(id) {
            SyntaxNode::Operator { token, .. } => ConstructionError::MisplacedSeparator(token.clone()),
            _ => ConstructionError::EmptyGroup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parser;

    fn builder() -> SemanticBuilder {
        SemanticBuilder::new(
            Arc::new(Grammar::standard()),
            Arc::new(OperationRegistry::standard()),
        )
    }

    fn transform(input: &str) -> Result<SemanticTree> {
        let tree = Parser::default().parse(input).unwrap();
        builder().to_semantic_tree(&tree)
    }

    #[test]
    fn groups_are_transparent() {
        let tree = transform("((x))").unwrap();
        assert!(matches!(tree.root(), SemanticNode::Variable(v) if v.name() == "x"));
    }

    #[test]
    fn constants_and_variables() {
        let tree = transform("pi").unwrap();
        assert!(matches!(tree.root(), SemanticNode::Constant(c) if c.name() == Some("pi")));
        let tree = transform("radius").unwrap();
        assert_eq!(
            tree.free_variables().get("radius"),
            Some(&ValueType::Number)
        );
    }

    #[test]
    fn flattened_chain_folds_into_binary_applications() {
        let tree = transform("1+2+3+4").unwrap();
        let SemanticNode::Operation(op) = tree.root() else {
            panic!("expected operation");
        };
        assert_eq!(op.children().len(), 2);
        assert_eq!(tree.evaluate(), Ok(Value::Number(10.0)));
    }

    #[test]
    fn function_arguments_split_on_separator() {
        let tree = transform("max(1, 5, 3)").unwrap();
        let SemanticNode::Operation(op) = tree.root() else {
            panic!("expected operation");
        };
        assert!(op.is_variadic());
        assert_eq!(op.children().len(), 3);
    }

    #[test]
    fn unary_and_binary_minus_resolve_separately() {
        assert_eq!(transform("-3").unwrap().evaluate(), Ok(Value::Number(-3.0)));
        assert_eq!(transform("5-3").unwrap().evaluate(), Ok(Value::Number(2.0)));
    }

    #[test]
    fn construction_errors() {
        assert_eq!(transform("").unwrap_err(), ConstructionError::EmptyGroup);
        assert_eq!(
            transform("1, 2").unwrap_err(),
            ConstructionError::MisplacedSeparator(",".to_string())
        );
        assert_eq!(
            transform("max(1, (2, 3))").unwrap_err(),
            ConstructionError::MisplacedSeparator(",".to_string())
        );
        assert_eq!(
            transform("sin(1, 2)").unwrap_err(),
            ConstructionError::WrongArity {
                name: "sin".to_string(),
                arity: 2
            }
        );
        assert_eq!(
            transform("max(1)").unwrap_err(),
            ConstructionError::WrongArity {
                name: "max".to_string(),
                arity: 1
            }
        );
    }

    #[test]
    fn overflowing_literal_is_invalid() {
        assert_eq!(
            transform("1e999").unwrap_err(),
            ConstructionError::InvalidNumber("1e999".to_string())
        );
        assert_eq!(
            transform("2 * 1e999").unwrap_err(),
            ConstructionError::InvalidNumber("1e999".to_string())
        );
        assert!(transform("1e300").is_ok());
    }

    #[test]
    fn unknown_operation() {
        let grammar = Grammar::from_json(
            r#"{"binary": ["%"], "precedence": [["%"]]}"#,
        )
        .unwrap();
        let tree = Parser::new(Arc::new(grammar.clone())).parse("5 % 2").unwrap();
        let builder = SemanticBuilder::new(Arc::new(grammar), Arc::new(OperationRegistry::standard()));
        assert_eq!(
            builder.to_semantic_tree(&tree).unwrap_err(),
            ConstructionError::UnknownOperation {
                name: "%".to_string()
            }
        );
    }

    #[test]
    fn declared_variable_types_are_checked() {
        let tree = Parser::default().parse("max(a, flag, c)").unwrap();
        let builder = builder().with_variable("FLAG", ValueType::Boolean);
        assert_eq!(
            builder.to_semantic_tree(&tree).unwrap_err(),
            ConstructionError::IncompatibleArguments {
                name: "max".to_string(),
                found: vec![ValueType::Number, ValueType::Boolean, ValueType::Number],
            }
        );
    }
}
