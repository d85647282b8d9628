//! Expression engine
//!
//! Bundles a grammar and an operation registry so callers can go from text
//! to a value (or a series of points) in one call.
//!
//! # Example
//!
//! ```ignore
//! let engine = Engine::standard();
//!
//! // One-shot evaluation
//! let v = engine.evaluate("2 x + 1", [("x", Value::Number(3.0))])?;
//!
//! // Compile once, sample many times
//! let mut curve = engine.compile("sin(x)")?;
//! let points = engine.sample(&mut curve, "x", 0.0, 3.14, 100)?;
//! ```

use std::sync::Arc;

use log::debug;

use crate::GrafexError;
use crate::eval::EvalError;
use crate::grammar::Grammar;
use crate::parse::Parser;
use crate::registry::OperationRegistry;
use crate::semantic::SemanticTree;
use crate::syntax::SyntaxTree;
use crate::transform::SemanticBuilder;
use crate::value::{Value, ValueType};

#[derive(Clone)]
pub struct Engine {
    parser: Parser,
    builder: SemanticBuilder,
}

impl Engine {
    pub fn new(grammar: Arc<Grammar>, registry: Arc<OperationRegistry>) -> Self {
        Self {
            parser: Parser::new(grammar.clone()),
            builder: SemanticBuilder::new(grammar, registry),
        }
    }

    /// Standard arithmetic grammar and catalogue
    pub fn standard() -> Self {
        Self::new(
            Arc::new(Grammar::standard()),
            Arc::new(OperationRegistry::standard()),
        )
    }

    /// Declare a variable type for every expression compiled from now on
    pub fn with_variable(mut self, name: &str, ty: ValueType) -> Self {
        self.builder = self.builder.with_variable(name, ty);
        self
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn registry(&self) -> &OperationRegistry {
        self.builder.registry()
    }

    pub fn parse(&self, expression: &str) -> Result<SyntaxTree, GrafexError> {
        Ok(self.parser.parse(expression)?)
    }

    pub fn compile(&self, expression: &str) -> Result<SemanticTree, GrafexError> {
        let syntax = self.parser.parse(expression)?;
        let tree = self.builder.to_semantic_tree(&syntax)?;
        debug!(
            "compiled '{}' with {} free variable(s)",
            expression,
            tree.free_variables().len()
        );
        Ok(tree)
    }

    /// Compile, bind, and evaluate in one step
    pub fn evaluate<I, S>(&self, expression: &str, bindings: I) -> Result<Value, GrafexError>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        let mut tree = self.compile(expression)?;
        for (name, value) in bindings {
            tree.bind(name.as_ref(), value);
        }
        Ok(tree.evaluate()?)
    }

    /// Evaluate `tree` at `steps + 1` evenly spaced points of `variable` over `[start, end]`
    ///
    /// The variable is cleared again afterwards, whether sampling succeeded or not.
    pub fn sample(
        &self,
        tree: &mut SemanticTree,
        variable: &str,
        start: f64,
        end: f64,
        steps: usize,
    ) -> Result<Vec<(f64, f64)>, EvalError> {
        let points = sample_points(tree, variable, start, end, steps);
        tree.clear(variable);
        if let Ok(points) = &points {
            debug!("sampled '{}' at {} point(s)", variable, points.len());
        }
        points
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::standard()
    }
}

fn sample_points(
    tree: &mut SemanticTree,
    variable: &str,
    start: f64,
    end: f64,
    steps: usize,
) -> Result<Vec<(f64, f64)>, EvalError> {
    let mut points = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let x = if steps == 0 {
            start
        } else {
            start + (end - start) * i as f64 / steps as f64
        };
        tree.bind(variable, x);
        let y = match tree.evaluate()? {
            Value::Number(y) => y,
            found => {
                return Err(EvalError::IncompatibleArguments {
                    operation: "sample".to_string(),
                    expected: ValueType::Number,
                    found,
                });
            }
        };
        points.push((x, y));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_with_bindings() {
        let engine = Engine::standard();
        assert_eq!(
            engine.evaluate("2 x + 1", [("x", Value::Number(3.0))]).unwrap(),
            Value::Number(7.0)
        );
        let none: [(&str, Value); 0] = [];
        assert!(matches!(
            engine.evaluate("y + 1", none),
            Err(GrafexError::Eval(EvalError::Unbound { .. }))
        ));
    }

    #[test]
    fn sample_is_evenly_spaced() {
        let engine = Engine::standard();
        let mut tree = engine.compile("x^2").unwrap();
        let points = engine.sample(&mut tree, "x", 0.0, 2.0, 4).unwrap();
        assert_eq!(
            points,
            vec![(0.0, 0.0), (0.5, 0.25), (1.0, 1.0), (1.5, 2.25), (2.0, 4.0)]
        );
        // Bindings do not leak out of sampling
        assert!(tree.evaluate().is_err());
    }

    #[test]
    fn sample_with_zero_steps() {
        let engine = Engine::standard();
        let mut tree = engine.compile("x + 1").unwrap();
        assert_eq!(
            engine.sample(&mut tree, "x", 3.0, 9.0, 0).unwrap(),
            vec![(3.0, 4.0)]
        );
    }

    #[test]
    fn sample_propagates_errors() {
        let engine = Engine::standard();
        let mut tree = engine.compile("x + y").unwrap();
        assert_eq!(
            engine.sample(&mut tree, "x", 0.0, 1.0, 2),
            Err(EvalError::Unbound {
                name: "y".to_string()
            })
        );
    }

    #[test]
    fn declared_variables_apply_to_compiles() {
        let engine = Engine::standard().with_variable("flag", ValueType::Boolean);
        assert!(matches!(
            engine.compile("flag + 1"),
            Err(GrafexError::Construction(_))
        ));
    }
}
