//! Grafex - configurable expression parsing and evaluation
//!
//! Parses infix expressions under a user-supplied grammar (operators,
//! precedence, parentheticals, functions, implicit operators), resolves them
//! against a typed operation registry, and evaluates them with mutable
//! variable bindings.
//!
//! ## Quick Start
//!
//! ```ignore
//! use grafex::{Engine, Value};
//!
//! let engine = Engine::standard();
//! assert_eq!(grafex::run("2 + 3 * 4")?, Value::Number(14.0));
//!
//! let mut tree = engine.compile("2 sin(x)^2")?;
//! tree.bind("x", 0.5);
//! let y = tree.evaluate()?;
//!
//! // Points for plotting
//! let points = engine.sample(&mut tree, "x", -3.0, 3.0, 200)?;
//! ```
//!
//! ## Custom Grammars
//!
//! ```ignore
//! let grammar = Grammar::from_json(r#"{
//!     "binary": ["+", "*"],
//!     "precedence": [["*"], ["+"]],
//!     "parentheticals": [{"open": "(", "close": ")"}]
//! }"#)?;
//! let engine = Engine::new(Arc::new(grammar), Arc::new(OperationRegistry::standard()));
//! ```
//!
//! ## Pipeline
//!
//! - text → `Token`s (`Parser::tokenize`)
//! - tokens → `SyntaxTree` (`Parser::build`)
//! - syntax → typed `SemanticTree` (`SemanticBuilder`)
//! - semantic tree + bindings → `Value` (`SemanticTree::evaluate`)

mod engine;
mod eval;
mod grammar;
mod parse;
mod pretty;
mod registry;
mod semantic;
mod syntax;
mod token;
mod transform;
mod value;

use thiserror::Error;

// ============ Primary Public API ============

pub use engine::Engine;
pub use grammar::{Grammar, GrammarConfig, Parenthetical};
pub use registry::{OperationDef, OperationRegistry, Signature};
pub use semantic::SemanticTree;
pub use value::{Value, ValueType};

/// Evaluate an expression with the standard grammar and catalogue
pub fn run(expression: &str) -> Result<Value, GrafexError> {
    let tree = Engine::standard().compile(expression)?;
    Ok(tree.evaluate()?)
}

// ============ Errors ============

#[derive(Error, Debug)]
pub enum GrafexError {
    #[error("Grammar error: {0}")]
    Grammar(#[from] grammar::GrammarError),
    #[error("Parse error: {0}")]
    Parse(#[from] parse::ParseError),
    #[error("Construction error: {0}")]
    Construction(#[from] semantic::ConstructionError),
    #[error("Eval error: {0}")]
    Eval(#[from] eval::EvalError),
}

pub use eval::EvalError;
pub use grammar::GrammarError;
pub use parse::ParseError;
pub use semantic::ConstructionError;

// ============ Advanced: Tree Access ============

/// Pipeline stages and tree types (for custom front ends or introspection)
pub mod advanced {
    pub use crate::parse::{Parser, build};
    pub use crate::registry::{Implementation, ShortCircuit, number};
    pub use crate::semantic::{Constant, Notation, Operation, SemanticNode, Variable};
    pub use crate::syntax::{Fixity, Leaf, NodeId, SyntaxNode, SyntaxTree};
    pub use crate::token::{Token, TokenCategory, Tokenizer};
    pub use crate::transform::SemanticBuilder;
}
