//! Runtime values and their static types

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Number,
    Boolean,
    Array(Box<ValueType>),
    /// Unknown until evaluation; checked by coercion instead
    Any,
}

impl ValueType {
    pub fn array(element: ValueType) -> Self {
        ValueType::Array(Box::new(element))
    }

    /// Whether a value of type `actual` may be passed where `self` is declared
    ///
    /// An `Any` actual is accepted here and checked by `Value::coerce` once its value is known.
    pub fn accepts(&self, actual: &ValueType) -> bool {
        match (self, actual) {
            (ValueType::Any, _) | (_, ValueType::Any) => true,
            (ValueType::Array(expected), ValueType::Array(found)) => expected.accepts(found),
            (expected, found) => expected == found,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Array(Vec<Value>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Number(_) => ValueType::Number,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Array(items) => {
                let element = items
                    .first()
                    .map(Value::value_type)
                    .unwrap_or(ValueType::Any);
                ValueType::array(element)
            }
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert into `ty` if the value fits it; no numeric/boolean conversion happens
    pub fn coerce(&self, ty: &ValueType) -> Option<Value> {
        match (ty, self) {
            (ValueType::Any, v) => Some(v.clone()),
            (ValueType::Number, Value::Number(_)) | (ValueType::Boolean, Value::Boolean(_)) => {
                Some(self.clone())
            }
            (ValueType::Array(element), Value::Array(items)) => items
                .iter()
                .map(|item| item.coerce(element))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_compatibility() {
        assert!(ValueType::Number.accepts(&ValueType::Number));
        assert!(!ValueType::Number.accepts(&ValueType::Boolean));
        assert!(ValueType::Any.accepts(&ValueType::Boolean));
        assert!(ValueType::Number.accepts(&ValueType::Any));
        assert!(ValueType::array(ValueType::Number).accepts(&ValueType::array(ValueType::Number)));
        assert!(!ValueType::array(ValueType::Number).accepts(&ValueType::Number));
    }

    #[test]
    fn coercion_is_exact() {
        assert_eq!(
            Value::Number(1.0).coerce(&ValueType::Number),
            Some(Value::Number(1.0))
        );
        assert_eq!(Value::Boolean(true).coerce(&ValueType::Number), None);
        assert_eq!(
            Value::Array(vec![Value::Number(1.0), Value::Boolean(false)])
                .coerce(&ValueType::array(ValueType::Number)),
            None
        );
    }

    #[test]
    fn serializes_untagged() {
        let value = Value::Array(vec![Value::Number(1.5), Value::Boolean(true)]);
        assert_eq!(serde_json::to_string(&value).unwrap(), "[1.5,true]");
    }
}
