//! Typed semantic tree
//!
//! Built once per expression from the syntax tree. Argument types are checked
//! when an `Operation` is constructed; evaluation trusts that check. Variable
//! bindings are the only mutable state.

use indexmap::IndexMap;
use thiserror::Error;

use crate::registry::OperationDef;
use crate::value::{Value, ValueType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("Unknown operation '{name}'")]
    UnknownOperation { name: String },

    #[error("'{name}' does not take {arity} argument(s)")]
    WrongArity { name: String, arity: usize },

    #[error("Incompatible arguments for '{name}': ({})", join_types(.found))]
    IncompatibleArguments { name: String, found: Vec<ValueType> },

    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("Empty group")]
    EmptyGroup,

    #[error("Argument separator '{0}' outside a function call")]
    MisplacedSeparator(String),
}

fn join_types(types: &[ValueType]) -> String {
    types
        .iter()
        .map(ValueType::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    value: Value,
    name: Option<String>,
}

impl Constant {
    pub fn new(value: Value) -> Self {
        Self { value, name: None }
    }

    /// A constant shown by name, like `pi`
    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            value,
            name: Some(name.into()),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    declared: ValueType,
    bound: Option<Value>,
}

impl Variable {
    pub fn new(name: impl Into<String>, declared: ValueType) -> Self {
        Self {
            name: name.into(),
            declared,
            bound: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared(&self) -> &ValueType {
        &self.declared
    }

    pub fn bound(&self) -> Option<&Value> {
        self.bound.as_ref()
    }

    /// Binding names are matched lower-cased, whatever the grammar's case rule
    pub fn matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    pub fn bind(&mut self, value: Value) {
        self.bound = Some(value);
    }

    pub fn clear(&mut self) {
        self.bound = None;
    }
}

/// How an operation was written, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    Prefix,
    Postfix,
    Infix,
    Call,
}

#[derive(Debug, Clone)]
pub struct Operation {
    def: OperationDef,
    children: Vec<SemanticNode>,
    notation: Notation,
}

impl Operation {
    /// Fails unless every child's type fits the declared signature
    pub fn new(def: OperationDef, children: Vec<SemanticNode>) -> Result<Self, ConstructionError> {
        let found: Vec<ValueType> = children.iter().map(SemanticNode::result_type).collect();
        if !def.signature().accepts(&found) {
            return Err(ConstructionError::IncompatibleArguments {
                name: def.name().to_string(),
                found,
            });
        }
        Ok(Self {
            def,
            children,
            notation: Notation::Call,
        })
    }

    pub fn with_notation(mut self, notation: Notation) -> Self {
        self.notation = notation;
        self
    }

    pub fn def(&self) -> &OperationDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn children(&self) -> &[SemanticNode] {
        &self.children
    }

    pub fn notation(&self) -> Notation {
        self.notation
    }

    pub fn is_variadic(&self) -> bool {
        self.def.is_variadic()
    }
}

#[derive(Debug, Clone)]
pub enum SemanticNode {
    Constant(Constant),
    Variable(Variable),
    Operation(Operation),
}

impl SemanticNode {
    pub fn result_type(&self) -> ValueType {
        match self {
            SemanticNode::Constant(c) => c.value.value_type(),
            SemanticNode::Variable(v) => v.declared.clone(),
            SemanticNode::Operation(op) => op.def.result().clone(),
        }
    }

    /// Variable names and declared types, in order of first appearance
    pub fn free_variables(&self) -> IndexMap<String, ValueType> {
        let mut found = IndexMap::new();
        self.collect_variables(&mut found);
        found
    }

    fn collect_variables(&self, found: &mut IndexMap<String, ValueType>) {
        match self {
            SemanticNode::Constant(_) => {}
            SemanticNode::Variable(v) => {
                found
                    .entry(v.name.clone())
                    .or_insert_with(|| v.declared.clone());
            }
            SemanticNode::Operation(op) => {
                for child in &op.children {
                    child.collect_variables(found);
                }
            }
        }
    }

    /// Bind every matching variable; returns how many were bound
    pub fn bind(&mut self, name: &str, value: &Value) -> usize {
        match self {
            SemanticNode::Constant(_) => 0,
            SemanticNode::Variable(v) if v.matches(name) => {
                v.bind(value.clone());
                1
            }
            SemanticNode::Variable(_) => 0,
            SemanticNode::Operation(op) => op
                .children
                .iter_mut()
                .map(|child| child.bind(name, value))
                .sum(),
        }
    }

    /// Clear matching variables, or every variable when `name` is `None`
    pub fn clear(&mut self, name: Option<&str>) {
        match self {
            SemanticNode::Constant(_) => {}
            SemanticNode::Variable(v) => {
                if name.is_none_or(|n| v.matches(n)) {
                    v.clear();
                }
            }
            SemanticNode::Operation(op) => {
                for child in &mut op.children {
                    child.clear(name);
                }
            }
        }
    }
}

/// An evaluable expression with mutable variable bindings
#[derive(Debug, Clone)]
pub struct SemanticTree {
    root: SemanticNode,
}

impl SemanticTree {
    pub fn new(root: SemanticNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &SemanticNode {
        &self.root
    }

    pub fn result_type(&self) -> ValueType {
        self.root.result_type()
    }

    pub fn free_variables(&self) -> IndexMap<String, ValueType> {
        self.root.free_variables()
    }

    /// Bind `name` (case-insensitively) everywhere it occurs
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> usize {
        let value = value.into();
        self.root.bind(name, &value)
    }

    pub fn clear(&mut self, name: &str) {
        self.root.clear(Some(name));
    }

    pub fn clear_all(&mut self) {
        self.root.clear(None);
    }
}
