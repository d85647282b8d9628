//! Operation registry
//!
//! Maps operator tokens and function names to typed implementations. Each
//! name may carry several overloads; the semantic builder picks one once,
//! by argument types, so evaluation never looks names up again.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{Value, ValueType};

/// Implementation of an operation over already evaluated arguments
pub type Implementation = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static>;

/// Probe consulted after each argument; `Some` ends evaluation early
pub type ShortCircuit = Arc<dyn Fn(&[Value]) -> Option<Value> + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq)]
pub enum Signature {
    Fixed(Vec<ValueType>),
    /// Any number (at least `min`) of arguments sharing one element type
    Variadic { element: ValueType, min: usize },
}

impl Signature {
    pub fn accepts(&self, found: &[ValueType]) -> bool {
        match self {
            Signature::Fixed(params) => {
                params.len() == found.len() && params.iter().zip(found).all(|(p, f)| p.accepts(f))
            }
            Signature::Variadic { element, min } => {
                found.len() >= *min && found.iter().all(|f| element.accepts(f))
            }
        }
    }

    pub fn accepts_arity(&self, arity: usize) -> bool {
        match self {
            Signature::Fixed(params) => params.len() == arity,
            Signature::Variadic { min, .. } => arity >= *min,
        }
    }

    /// Parameter count of a fixed signature
    pub fn arity(&self) -> Option<usize> {
        match self {
            Signature::Fixed(params) => Some(params.len()),
            Signature::Variadic { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct OperationDef {
    name: String,
    signature: Signature,
    result: ValueType,
    implementation: Implementation,
    short_circuit: Option<ShortCircuit>,
}

impl OperationDef {
    pub fn fixed<F>(name: impl Into<String>, params: Vec<ValueType>, result: ValueType, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature: Signature::Fixed(params),
            result,
            implementation: Arc::new(f),
            short_circuit: None,
        }
    }

    pub fn variadic<F>(
        name: impl Into<String>,
        element: ValueType,
        min: usize,
        result: ValueType,
        f: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature: Signature::Variadic { element, min },
            result,
            implementation: Arc::new(f),
            short_circuit: None,
        }
    }

    /// Stop evaluating arguments as soon as `probe` returns a value
    pub fn with_short_circuit<P>(mut self, probe: P) -> Self
    where
        P: Fn(&[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        self.short_circuit = Some(Arc::new(probe));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn result(&self) -> &ValueType {
        &self.result
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.signature, Signature::Variadic { .. })
    }

    pub(crate) fn call(&self, args: &[Value]) -> Result<Value, String> {
        (self.implementation)(args)
    }

    pub(crate) fn short_circuit(&self, evaluated: &[Value]) -> Option<Value> {
        self.short_circuit
            .as_ref()
            .and_then(|probe| probe(evaluated))
    }
}

impl fmt::Debug for OperationDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDef")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("result", &self.result)
            .field("short_circuit", &self.short_circuit.is_some())
            .finish()
    }
}

/// Registry of operations and named constants
#[derive(Default, Clone)]
pub struct OperationRegistry {
    /// Overloads by operator token or function name, in registration order
    operations: HashMap<String, Vec<OperationDef>>,
    constants: HashMap<String, Value>,
}

impl OperationRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the arithmetic catalogue matching `Grammar::standard`
    pub fn standard() -> Self {
        let mut registry = Self::default();
        registry.register_standard();
        registry
    }

    /// Add an overload; earlier registrations win when several match
    pub fn register(&mut self, def: OperationDef) {
        self.operations
            .entry(def.name.clone())
            .or_default()
            .push(def);
    }

    /// Register a fixed-arity operation
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<ValueType>,
        result: ValueType,
        f: F,
    ) where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(OperationDef::fixed(name, params, result, f));
    }

    /// Register a vararg operation over one element type
    pub fn register_variadic<F>(
        &mut self,
        name: impl Into<String>,
        element: ValueType,
        min: usize,
        result: ValueType,
        f: F,
    ) where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(OperationDef::variadic(name, element, min, result, f));
    }

    pub fn register_constant(&mut self, name: impl Into<String>, value: Value) {
        self.constants.insert(name.into(), value);
    }

    pub fn overloads(&self, name: &str) -> &[OperationDef] {
        self.operations
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    fn register_numeric_unary(&mut self, name: &str, f: fn(f64) -> f64) {
        self.register_fn(
            name,
            vec![ValueType::Number],
            ValueType::Number,
            move |args| Ok(Value::Number(f(number(args, 0)?))),
        );
    }

    fn register_numeric_binary(&mut self, name: &str, f: fn(f64, f64) -> f64) {
        self.register_fn(
            name,
            vec![ValueType::Number, ValueType::Number],
            ValueType::Number,
            move |args| Ok(Value::Number(f(number(args, 0)?, number(args, 1)?))),
        );
    }

    fn register_standard(&mut self) {
        self.register_numeric_binary("+", |a, b| a + b);
        self.register_numeric_binary("-", |a, b| a - b);
        self.register_numeric_binary("*", |a, b| a * b);
        self.register_numeric_binary("/", |a, b| a / b);
        self.register_numeric_binary("^", f64::powf);
        self.register_numeric_unary("-", |a| -a);
        self.register_numeric_unary("+", |a| a);

        self.register_fn(
            "!",
            vec![ValueType::Number],
            ValueType::Number,
            |args| factorial(number(args, 0)?).map(Value::Number),
        );

        let unary: [(&str, fn(f64) -> f64); 13] = [
            ("sin", f64::sin),
            ("cos", f64::cos),
            ("tan", f64::tan),
            ("asin", f64::asin),
            ("acos", f64::acos),
            ("atan", f64::atan),
            ("sqrt", f64::sqrt),
            ("abs", f64::abs),
            ("ln", f64::ln),
            ("log", f64::log10),
            ("exp", f64::exp),
            ("floor", f64::floor),
            ("ceil", f64::ceil),
        ];
        for (name, f) in unary {
            self.register_numeric_unary(name, f);
        }
        // log(x, base)
        self.register_numeric_binary("log", f64::log);

        self.register_variadic("min", ValueType::Number, 2, ValueType::Number, |args| {
            fold_numbers(args, f64::min)
        });
        self.register_variadic("max", ValueType::Number, 2, ValueType::Number, |args| {
            fold_numbers(args, f64::max)
        });
        self.register_variadic("sum", ValueType::Number, 1, ValueType::Number, |args| {
            fold_numbers(args, |a, b| a + b)
        });

        self.register_constant("pi", Value::Number(std::f64::consts::PI));
        self.register_constant("e", Value::Number(std::f64::consts::E));
    }
}

/// Numeric argument at `idx`
pub fn number(args: &[Value], idx: usize) -> Result<f64, String> {
    match args.get(idx) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(format!("argument {idx} is not a number: {other}")),
        None => Err(format!("missing argument {idx}")),
    }
}

fn fold_numbers(args: &[Value], f: impl Fn(f64, f64) -> f64) -> Result<Value, String> {
    let mut acc = number(args, 0)?;
    for idx in 1..args.len() {
        acc = f(acc, number(args, idx)?);
    }
    Ok(Value::Number(acc))
}

fn factorial(n: f64) -> Result<f64, String> {
    if n < 0.0 || n.fract() != 0.0 {
        return Err(format!("factorial is undefined for {n}"));
    }
    if n > 170.0 {
        return Ok(f64::INFINITY);
    }
    Ok((1..=n as u64).fold(1.0, |acc, k| acc * k as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overloads_keep_registration_order() {
        let registry = OperationRegistry::standard();
        let minus = registry.overloads("-");
        assert_eq!(minus.len(), 2);
        assert_eq!(minus[0].signature().arity(), Some(2));
        assert_eq!(minus[1].signature().arity(), Some(1));
        assert!(registry.overloads("nope").is_empty());
    }

    #[test]
    fn variadic_signature_checks_every_argument() {
        let sig = Signature::Variadic {
            element: ValueType::Number,
            min: 2,
        };
        assert!(sig.accepts(&[ValueType::Number, ValueType::Number, ValueType::Number]));
        assert!(!sig.accepts(&[ValueType::Number]));
        assert!(!sig.accepts(&[ValueType::Number, ValueType::Boolean]));
        assert!(sig.accepts_arity(5));
        assert_eq!(sig.arity(), None);
    }

    #[test]
    fn standard_implementations() {
        let registry = OperationRegistry::standard();
        let call = |name: &str, args: &[f64]| {
            let values: Vec<Value> = args.iter().map(|n| Value::Number(*n)).collect();
            let types: Vec<ValueType> = values.iter().map(Value::value_type).collect();
            registry
                .overloads(name)
                .iter()
                .find(|d| d.signature().accepts(&types))
                .unwrap()
                .call(&values)
        };
        assert_eq!(call("^", &[2.0, 10.0]), Ok(Value::Number(1024.0)));
        assert_eq!(call("!", &[5.0]), Ok(Value::Number(120.0)));
        assert_eq!(call("max", &[1.0, 7.0, 3.0]), Ok(Value::Number(7.0)));
        let log2 = call("log", &[8.0, 2.0]).unwrap().as_number().unwrap();
        assert!((log2 - 3.0).abs() < 1e-12);
        assert!(call("!", &[-1.0]).is_err());
        assert!(call("!", &[2.5]).is_err());
    }

    #[test]
    fn constants() {
        let registry = OperationRegistry::standard();
        assert_eq!(
            registry.constant("pi"),
            Some(&Value::Number(std::f64::consts::PI))
        );
        assert_eq!(registry.constant("tau"), None);
    }

    #[test]
    fn short_circuit_probe() {
        let def = OperationDef::variadic("and", ValueType::Boolean, 2, ValueType::Boolean, |args| {
            Ok(Value::Boolean(args.iter().all(|v| v.as_bool() == Some(true))))
        })
        .with_short_circuit(|seen| {
            seen.last()
                .filter(|v| v.as_bool() == Some(false))
                .cloned()
        });
        assert_eq!(def.short_circuit(&[Value::Boolean(true)]), None);
        assert_eq!(
            def.short_circuit(&[Value::Boolean(true), Value::Boolean(false)]),
            Some(Value::Boolean(false))
        );
    }
}
