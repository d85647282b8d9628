//! Grammar configuration
//!
//! A grammar names the operator tokens of each category, their precedence
//! levels, the parenthetical pairs, and the function table. It is loaded once
//! (from JSON or built in code) and shared read-only by every parser.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("Operator tokens must not be empty")]
    EmptyToken,

    #[error("Operator '{0}' has no precedence level")]
    MissingPrecedence(String),

    #[error("Implicit operator '{0}' must be registered as a multary operator")]
    ImplicitNotMultary(String),

    #[error("Argument separator '{0}' must be registered as a multary operator")]
    SeparatorNotMultary(String),

    #[error("Parenthetical '{0}' is declared more than once")]
    DuplicateParenthetical(String),

    #[error("Right-associative token '{0}' is not a binary operator")]
    RightAssociativeNotBinary(String),

    #[error("Invalid grammar config: {0}")]
    Config(#[from] serde_json::Error),
}

/// An opening token and the closing token that must match it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parenthetical {
    pub open: String,
    pub close: String,
}

impl Parenthetical {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Raw, unvalidated grammar description (the JSON shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    pub pre_unary: Vec<String>,
    pub post_unary: Vec<String>,
    pub binary: Vec<String>,
    pub multary: Vec<String>,
    /// Precedence levels, tightest binding first
    pub precedence: Vec<Vec<String>>,
    pub right_associative: Vec<String>,
    pub parentheticals: Vec<Parenthetical>,
    pub functions: Vec<String>,
    pub case_sensitive: bool,
    /// Inserted between adjacent operands (`2x` -> `2*x`); `None` disables it
    pub implicit_operator: Option<String>,
    /// Multary token that splits function arguments
    pub argument_separator: Option<String>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            pre_unary: Vec::new(),
            post_unary: Vec::new(),
            binary: Vec::new(),
            multary: Vec::new(),
            precedence: Vec::new(),
            right_associative: Vec::new(),
            parentheticals: Vec::new(),
            functions: Vec::new(),
            case_sensitive: true,
            implicit_operator: None,
            argument_separator: None,
        }
    }
}

/// Validated grammar with precomputed lookup tables
#[derive(Debug, Clone)]
pub struct Grammar {
    pre_unary: Vec<String>,
    post_unary: Vec<String>,
    binary: Vec<String>,
    multary: Vec<String>,
    opens: Vec<String>,
    closes: Vec<String>,
    closing: HashMap<String, String>,
    depths: HashMap<String, usize>,
    right_associative: HashSet<String>,
    /// Folded spelling -> registered spelling
    functions: HashMap<String, String>,
    case_sensitive: bool,
    implicit_operator: Option<String>,
    argument_separator: Option<String>,
}

impl Grammar {
    pub fn from_config(config: GrammarConfig) -> Result<Self, GrammarError> {
        let all_operators = config
            .pre_unary
            .iter()
            .chain(&config.post_unary)
            .chain(&config.binary)
            .chain(&config.multary);
        for token in all_operators {
            if token.is_empty() {
                return Err(GrammarError::EmptyToken);
            }
        }

        let mut depths = HashMap::new();
        for (depth, level) in config.precedence.iter().enumerate() {
            for token in level {
                depths.entry(token.clone()).or_insert(depth);
            }
        }
        for token in config.binary.iter().chain(&config.multary) {
            if !depths.contains_key(token) {
                return Err(GrammarError::MissingPrecedence(token.clone()));
            }
        }

        if let Some(implicit) = &config.implicit_operator
            && !config.multary.contains(implicit)
        {
            return Err(GrammarError::ImplicitNotMultary(implicit.clone()));
        }
        if let Some(separator) = &config.argument_separator
            && !config.multary.contains(separator)
        {
            return Err(GrammarError::SeparatorNotMultary(separator.clone()));
        }

        let mut closing = HashMap::new();
        for pair in &config.parentheticals {
            if pair.open.is_empty() || pair.close.is_empty() {
                return Err(GrammarError::EmptyToken);
            }
            if closing
                .insert(pair.open.clone(), pair.close.clone())
                .is_some()
            {
                return Err(GrammarError::DuplicateParenthetical(pair.open.clone()));
            }
        }

        let mut right_associative = HashSet::new();
        for token in &config.right_associative {
            if !config.binary.contains(token) {
                return Err(GrammarError::RightAssociativeNotBinary(token.clone()));
            }
            right_associative.insert(token.clone());
        }

        let case_sensitive = config.case_sensitive;
        let functions = config
            .functions
            .iter()
            .map(|name| (fold(name, case_sensitive), name.clone()))
            .collect();

        Ok(Self {
            pre_unary: longest_first(config.pre_unary),
            post_unary: longest_first(config.post_unary),
            binary: longest_first(config.binary),
            multary: longest_first(config.multary),
            opens: longest_first(config.parentheticals.iter().map(|p| p.open.clone()).collect()),
            closes: longest_first(
                config
                    .parentheticals
                    .iter()
                    .map(|p| p.close.clone())
                    .collect(),
            ),
            closing,
            depths,
            right_associative,
            functions,
            case_sensitive,
            implicit_operator: config.implicit_operator,
            argument_separator: config.argument_separator,
        })
    }

    /// Parse and validate a JSON grammar description
    pub fn from_json(text: &str) -> Result<Self, GrammarError> {
        let config: GrammarConfig = serde_json::from_str(text)?;
        Self::from_config(config)
    }

    /// Arithmetic grammar used by the CLI and the one-shot `run`
    pub fn standard() -> Self {
        let config = GrammarConfig {
            pre_unary: tokens(&["-", "+"]),
            post_unary: tokens(&["!"]),
            binary: tokens(&["-", "/", "^"]),
            multary: tokens(&["+", "*", ","]),
            precedence: vec![
                tokens(&["^"]),
                tokens(&["*", "/"]),
                tokens(&["+", "-"]),
                tokens(&[","]),
            ],
            right_associative: tokens(&["^"]),
            parentheticals: vec![Parenthetical::new("(", ")"), Parenthetical::new("[", "]")],
            functions: tokens(&[
                "sin", "cos", "tan", "asin", "acos", "atan", "sqrt", "abs", "ln", "log", "exp",
                "floor", "ceil", "min", "max", "sum",
            ]),
            case_sensitive: false,
            implicit_operator: Some("*".to_string()),
            argument_separator: Some(",".to_string()),
        };
        // The built-in table always validates
        match Self::from_config(config) {
            Ok(grammar) => grammar,
            Err(e) => unreachable!("standard grammar is invalid: {e}"),
        }
    }

    pub fn pre_unary_ops(&self) -> &[String] {
        &self.pre_unary
    }

    pub fn post_unary_ops(&self) -> &[String] {
        &self.post_unary
    }

    pub fn binary_ops(&self) -> &[String] {
        &self.binary
    }

    pub fn multary_ops(&self) -> &[String] {
        &self.multary
    }

    pub fn open_tokens(&self) -> &[String] {
        &self.opens
    }

    pub fn close_tokens(&self) -> &[String] {
        &self.closes
    }

    /// Closing token required by an opening token
    pub fn closing_for(&self, open: &str) -> Option<&str> {
        self.closing.get(open).map(String::as_str)
    }

    /// Precedence level of a binary or multary token (0 binds tightest)
    pub fn depth(&self, token: &str) -> Option<usize> {
        self.depths.get(token).copied()
    }

    pub fn is_right_associative(&self, token: &str) -> bool {
        self.right_associative.contains(token)
    }

    /// Registered spelling of a function name, honoring case sensitivity
    pub fn function_name(&self, name: &str) -> Option<&str> {
        self.functions
            .get(fold(name, self.case_sensitive).as_str())
            .map(String::as_str)
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn implicit_operator(&self) -> Option<&str> {
        self.implicit_operator.as_deref()
    }

    pub fn argument_separator(&self) -> Option<&str> {
        self.argument_separator.as_deref()
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::standard()
    }
}

fn tokens(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn fold(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Sort literals so that `**` is tried before `*`
fn longest_first(mut tokens: Vec<String>) -> Vec<String> {
    tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    tokens.dedup();
    tokens
}
