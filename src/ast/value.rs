use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::EvalError;

use super::template::TemplateNode;

/// Opaque handle to a host model object, resolved through a
/// [`ModelAccess`](crate::eval::ModelAccess) capability.
pub type ModelHandle = Arc<dyn ModelObject>;

/// Marker trait for host objects whose properties are accessed through a
/// [`ModelAccess`](crate::eval::ModelAccess) implementation.
///
/// The engine never inspects model objects itself; `as_any` lets the host's
/// accessor downcast back to its concrete type.
pub trait ModelObject: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// The set of runtime value types flowing through evaluation.
///
/// Expressions produce `Value`s. When a value reaches the output sink, it
/// is either forwarded raw ([`BufferedOutput`](crate::eval::BufferedOutput))
/// or converted to text ([`StringOutput`](crate::eval::StringOutput)).
/// [`Value::Node`] carries embedded markup produced by a conditional branch;
/// the expansion engine splices such values instead of stringifying them.
#[derive(Debug, Clone)]
pub enum Value {
    /// The absence of a value. Empty, falsy, renders as an empty string.
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<Value>),
    /// String-keyed map with deterministic iteration order.
    Map(BTreeMap<String, Value>),
    /// A host model object; properties are resolved via the evaluator's
    /// model-access capability.
    Model(ModelHandle),
    /// Embedded markup: the result of a conditional branch that is a
    /// structure node rather than a scalar expression.
    Node(Arc<TemplateNode>),
}

impl Value {
    /// Type name for diagnostic messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Model(_) => "model",
            Value::Node(_) => "template",
        }
    }

    /// Non-emptiness, as used by the alternative operator `a | b` and by
    /// the expansion engine when deciding whether to emit a value.
    ///
    /// Null, the empty string, and empty collections are empty. Any
    /// boolean (including `false`), any integer (including `0`), and any
    /// model object is non-empty. Embedded markup cannot be tested:
    /// only simple expression results may be used in a boolean context.
    pub fn non_empty(&self) -> Result<bool, EvalError> {
        match self {
            Value::Null => Ok(false),
            Value::String(s) => Ok(!s.is_empty()),
            Value::List(l) => Ok(!l.is_empty()),
            Value::Map(m) => Ok(!m.is_empty()),
            Value::Bool(_) | Value::Int(_) | Value::Model(_) => Ok(true),
            Value::Node(_) => Err(EvalError::not_boolean_context()),
        }
    }

    /// Truth value, as used by the choice operator `test ? a : b`.
    ///
    /// An explicit boolean is used as-is; every other value falls back to
    /// the [`non_empty`](Value::non_empty) rule.
    pub fn truth(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => other.non_empty(),
        }
    }

    /// Convert this value to its text representation for template output.
    ///
    /// - `Null` — empty string
    /// - `Bool` — `"true"` or `"false"`
    /// - `Int` — decimal
    /// - `String` — returned as-is
    /// - `List` — elements joined with `", "`
    /// - `Map` — values joined with `", "`
    /// - `Model` — the host object's `Debug` rendering
    /// - `Node` — the template source text of the embedded markup
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Int(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Map(entries) => entries
                .values()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Model(handle) => format!("{handle:?}"),
            Value::Node(node) => crate::printer::to_source(node),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // Model objects are opaque; two handles are equal only when
            // they point to the same object.
            (Value::Model(a), Value::Model(b)) => Arc::ptr_eq(a, b),
            (Value::Node(a), Value::Node(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness() {
        assert!(!Value::Null.non_empty().unwrap());
        assert!(!Value::String(String::new()).non_empty().unwrap());
        assert!(!Value::List(Vec::new()).non_empty().unwrap());
        assert!(!Value::Map(BTreeMap::new()).non_empty().unwrap());
        assert!(Value::Bool(false).non_empty().unwrap());
        assert!(Value::Int(0).non_empty().unwrap());
        assert!(Value::from("x").non_empty().unwrap());
    }

    #[test]
    fn truth_uses_booleans_as_is() {
        assert!(!Value::Bool(false).truth().unwrap());
        assert!(Value::Bool(true).truth().unwrap());
        // 0 is non-empty and therefore true; only an explicit boolean
        // can be false without being empty.
        assert!(Value::Int(0).truth().unwrap());
        assert!(!Value::Null.truth().unwrap());
    }

    #[test]
    fn markup_is_not_a_boolean() {
        let node = Value::Node(Arc::new(TemplateNode::empty_text()));
        assert!(node.non_empty().is_err());
        assert!(node.truth().is_err());
    }

    #[test]
    fn text_conversion() {
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Int(42).to_text(), "42");
        assert_eq!(Value::from(vec!["a", "b"]).to_text(), "a, b");
    }
}
