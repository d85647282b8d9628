//! Evaluation of semantic trees
//!
//! Children are evaluated before their parent. Failures from an operation's
//! implementation are wrapped with the operation name and its argument values;
//! every other error propagates unchanged.

use thiserror::Error;

use crate::registry::Signature;
use crate::semantic::{Operation, SemanticNode, SemanticTree};
use crate::value::{Value, ValueType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Variable '{name}' is unbound")]
    Unbound { name: String },

    #[error("Incompatible argument for '{operation}': expected {expected}, got {found}")]
    IncompatibleArguments {
        operation: String,
        expected: ValueType,
        found: Value,
    },

    #[error("'{operation}' failed on ({}): {message}", join_values(.arguments))]
    OperationFailed {
        operation: String,
        arguments: Vec<Value>,
        message: String,
    },
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

type Result<T> = std::result::Result<T, EvalError>;

impl SemanticTree {
    pub fn evaluate(&self) -> Result<Value> {
        self.root().evaluate()
    }
}

impl SemanticNode {
    pub fn evaluate(&self) -> Result<Value> {
        match self {
            SemanticNode::Constant(c) => Ok(c.value().clone()),
            SemanticNode::Variable(v) => v.bound().cloned().ok_or_else(|| EvalError::Unbound {
                name: v.name().to_string(),
            }),
            SemanticNode::Operation(op) => op.evaluate(),
        }
    }
}

impl Operation {
    pub fn evaluate(&self) -> Result<Value> {
        let mut values = Vec::with_capacity(self.children().len());
        for child in self.children() {
            values.push(child.evaluate()?);
            if let Some(early) = self.def().short_circuit(&values) {
                return Ok(early);
            }
        }

        // `Any` children pass construction, so their values are checked here
        let arguments = match self.def().signature() {
            Signature::Variadic { element, .. } => {
                coerce_all(self.name(), std::iter::repeat(element), values)?
            }
            Signature::Fixed(params) => coerce_all(self.name(), params.iter(), values)?,
        };

        self.def()
            .call(&arguments)
            .map_err(|message| EvalError::OperationFailed {
                operation: self.name().to_string(),
                arguments,
                message,
            })
    }
}

/// Coerce each argument to its declared type; varargs repeat one element type
fn coerce_all<'a>(
    operation: &str,
    declared: impl Iterator<Item = &'a ValueType>,
    values: Vec<Value>,
) -> Result<Vec<Value>> {
    values
        .into_iter()
        .zip(declared)
        .map(|(value, ty)| {
            value.coerce(ty).ok_or_else(|| EvalError::IncompatibleArguments {
                operation: operation.to_string(),
                expected: ty.clone(),
                found: value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{OperationDef, OperationRegistry};
    use crate::semantic::{Constant, Variable};

    fn num(n: f64) -> SemanticNode {
        SemanticNode::Constant(Constant::new(Value::Number(n)))
    }

    fn op(name: &str, children: Vec<SemanticNode>) -> SemanticNode {
        let registry = OperationRegistry::standard();
        let types: Vec<ValueType> = children.iter().map(SemanticNode::result_type).collect();
        let def = registry
            .overloads(name)
            .iter()
            .find(|d| d.signature().accepts(&types))
            .unwrap()
            .clone();
        SemanticNode::Operation(Operation::new(def, children).unwrap())
    }

    #[test]
    fn evaluates_children_first() {
        let tree = op("+", vec![num(2.0), op("*", vec![num(3.0), num(4.0)])]);
        assert_eq!(tree.evaluate(), Ok(Value::Number(14.0)));
    }

    #[test]
    fn unbound_variable() {
        let mut tree = SemanticTree::new(SemanticNode::Variable(Variable::new(
            "x",
            ValueType::Number,
        )));
        assert_eq!(
            tree.evaluate(),
            Err(EvalError::Unbound {
                name: "x".to_string()
            })
        );
        tree.bind("x", 5.0);
        assert_eq!(tree.evaluate(), Ok(Value::Number(5.0)));
        tree.clear_all();
        assert!(tree.evaluate().is_err());
    }

    #[test]
    fn implementation_failure_is_wrapped() {
        let tree = op("!", vec![num(-2.0)]);
        match tree.evaluate() {
            Err(EvalError::OperationFailed {
                operation,
                arguments,
                ..
            }) => {
                assert_eq!(operation, "!");
                assert_eq!(arguments, vec![Value::Number(-2.0)]);
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn vararg_coercion_failure() {
        let any = SemanticNode::Variable(Variable::new("flag", ValueType::Any));
        let mut tree = SemanticTree::new(op("max", vec![num(1.0), any]));
        tree.bind("flag", true);
        assert_eq!(
            tree.evaluate(),
            Err(EvalError::IncompatibleArguments {
                operation: "max".to_string(),
                expected: ValueType::Number,
                found: Value::Boolean(true),
            })
        );
        tree.bind("flag", 4.0);
        assert_eq!(tree.evaluate(), Ok(Value::Number(4.0)));
    }

    #[test]
    fn fixed_arity_coercion_failure() {
        let any = SemanticNode::Variable(Variable::new("x", ValueType::Any));
        let mut tree = SemanticTree::new(op("+", vec![any, num(1.0)]));
        tree.bind("x", true);
        assert_eq!(
            tree.evaluate(),
            Err(EvalError::IncompatibleArguments {
                operation: "+".to_string(),
                expected: ValueType::Number,
                found: Value::Boolean(true),
            })
        );
        tree.bind("x", 2.0);
        assert_eq!(tree.evaluate(), Ok(Value::Number(3.0)));
    }

    #[test]
    fn short_circuit_skips_remaining_children() {
        let and = OperationDef::variadic("and", ValueType::Boolean, 2, ValueType::Boolean, |args| {
            Ok(Value::Boolean(args.iter().all(|v| v.as_bool() == Some(true))))
        })
        .with_short_circuit(|seen| {
            seen.last()
                .filter(|v| v.as_bool() == Some(false))
                .cloned()
        });
        let unbound = SemanticNode::Variable(Variable::new("later", ValueType::Boolean));
        let falsy = SemanticNode::Constant(Constant::new(Value::Boolean(false)));
        let node = Operation::new(and, vec![falsy, unbound]).unwrap();
        assert_eq!(node.evaluate(), Ok(Value::Boolean(false)));
    }
}
