//! Function registration for template expressions.
//!
//! The [`FunctionRegistry`] stores the named functions that expressions can
//! invoke via `#name(args)`. The host populates the registry before
//! evaluation; [`FunctionRegistry::with_builtins`] provides the standard
//! set.
//!
//! There are two ways to register functions:
//!
//! - **Closure-based**: Use [`ClosureFunction`] for simple cases where a
//!   full trait implementation would be boilerplate.
//! - **Trait-based**: Implement [`TemplateFunction`] directly for more
//!   control over the declared signature.
//!
//! A function's [`FunctionSignature`] declares its arity. The evaluator
//! checks the argument count against the signature *before* evaluating any
//! argument expression, so a call with the wrong shape fails without side
//! effects from argument evaluation.

use crate::ast::value::Value;
use crate::error::EvalError;
use std::collections::HashMap;

// ── Trait definition ────────────────────────────────────────────────────

/// A function callable from template expressions via `#name(args)`.
///
/// Functions receive pre-evaluated positional arguments and are pure
/// computations over values.
pub trait TemplateFunction: Send + Sync {
    /// Execute the function. The argument count has already been checked
    /// against [`signature`](TemplateFunction::signature).
    fn call(&self, args: Vec<Value>) -> Result<Value, EvalError>;

    /// Declare this function's identity and arity.
    fn signature(&self) -> FunctionSignature;
}

// ── Signatures ──────────────────────────────────────────────────────────

/// Describes a function's name and expected argument count.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    /// Exact argument count, or the minimum when `var_args` is set.
    pub arity: usize,
    pub var_args: bool,
}

impl FunctionSignature {
    pub fn exact(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            var_args: false,
        }
    }

    pub fn at_least(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            var_args: true,
        }
    }

    /// Check an actual argument count against this signature.
    pub fn check_arity(&self, actual: usize) -> Result<(), EvalError> {
        if self.var_args {
            if actual < self.arity {
                return Err(EvalError::arity_at_least(&self.name, self.arity, actual));
            }
        } else if actual != self.arity {
            return Err(EvalError::arity_exact(&self.name, self.arity, actual));
        }
        Ok(())
    }
}

// ── Registry ────────────────────────────────────────────────────────────

/// Stores registered functions for use during evaluation.
///
/// ```rust
/// use stencil_lang::{ClosureFunction, EvalError, FunctionRegistry, Value};
///
/// let mut registry = FunctionRegistry::with_builtins();
///
/// registry.register(ClosureFunction::new("upper", 1, |args| {
///     match &args[0] {
///         Value::String(s) => Ok(Value::String(s.to_uppercase())),
///         other => Err(EvalError::type_mismatch("string", other.type_name())),
///     }
/// }));
/// ```
pub struct FunctionRegistry {
    functions: HashMap<String, Box<dyn TemplateFunction>>,
}

impl FunctionRegistry {
    /// An empty registry with no functions at all.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// A registry preloaded with the standard functions: `size`, `concat`,
    /// `equals`, `if`, `not`, `and`, `or`, `add`, `sub`, `mul`, `div`,
    /// `int`, `sublist` and `substring`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::install(&mut registry);
        registry
    }

    /// Register a function. An existing function with the same name is
    /// replaced.
    pub fn register(&mut self, function: impl TemplateFunction + 'static) {
        let sig = function.signature();
        self.functions.insert(sig.name, Box::new(function));
    }

    /// Look up a function by name.
    pub fn get(&self, name: &str) -> Option<&dyn TemplateFunction> {
        self.functions.get(name).map(Box::as_ref)
    }

    /// Dispatch a call with pre-evaluated arguments, checking arity first.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let function = self
            .get(name)
            .ok_or_else(|| EvalError::unknown_function(name))?;
        function.signature().check_arity(args.len())?;
        function.call(args)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// ── Closure-based convenience wrapper ───────────────────────────────────

/// A [`TemplateFunction`] implementation backed by a closure.
///
/// ```rust
/// use stencil_lang::{ClosureFunction, Value};
///
/// let all_equal = ClosureFunction::var_args("same", 1, |args| {
///     Ok(Value::Bool(args.windows(2).all(|w| w[0] == w[1])))
/// });
/// ```
pub struct ClosureFunction<F>
where
    F: Fn(Vec<Value>) -> Result<Value, EvalError> + Send + Sync,
{
    sig: FunctionSignature,
    func: F,
}

impl<F> ClosureFunction<F>
where
    F: Fn(Vec<Value>) -> Result<Value, EvalError> + Send + Sync,
{
    /// A function taking exactly `arity` arguments.
    pub fn new(name: impl Into<String>, arity: usize, func: F) -> Self {
        Self {
            sig: FunctionSignature::exact(name, arity),
            func,
        }
    }

    /// A function taking `min_arity` or more arguments.
    pub fn var_args(name: impl Into<String>, min_arity: usize, func: F) -> Self {
        Self {
            sig: FunctionSignature::at_least(name, min_arity),
            func,
        }
    }
}

impl<F> TemplateFunction for ClosureFunction<F>
where
    F: Fn(Vec<Value>) -> Result<Value, EvalError> + Send + Sync,
{
    fn call(&self, args: Vec<Value>) -> Result<Value, EvalError> {
        (self.func)(args)
    }

    fn signature(&self) -> FunctionSignature {
        self.sig.clone()
    }
}

// ── Builtins ────────────────────────────────────────────────────────────

mod builtins {
    use super::*;

    pub(super) fn install(registry: &mut FunctionRegistry) {
        registry.register(ClosureFunction::new("size", 1, |args| {
            let n = match &args[0] {
                Value::Null => 0,
                Value::String(s) => s.chars().count(),
                Value::List(l) => l.len(),
                Value::Map(m) => m.len(),
                other => return Err(EvalError::type_mismatch("collection", other.type_name())),
            };
            Ok(Value::Int(n as i64))
        }));

        registry.register(ClosureFunction::var_args("concat", 1, |args| {
            let mut result = String::new();
            for arg in &args {
                result.push_str(&arg.to_text());
            }
            Ok(Value::String(result))
        }));

        registry.register(ClosureFunction::new("equals", 2, |args| {
            Ok(Value::Bool(args[0] == args[1]))
        }));

        registry.register(ClosureFunction::new("if", 3, |mut args| {
            let branch = if args[0].truth()? { 1 } else { 2 };
            Ok(args.swap_remove(branch))
        }));

        registry.register(ClosureFunction::new("not", 1, |args| {
            Ok(Value::Bool(!args[0].truth()?))
        }));

        registry.register(ClosureFunction::var_args("and", 2, |args| {
            for arg in &args {
                if !arg.truth()? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }));

        registry.register(ClosureFunction::var_args("or", 2, |args| {
            for arg in &args {
                if arg.truth()? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }));

        registry.register(ClosureFunction::new("add", 2, |args| {
            int_op(&args, |a, b| a + b)
        }));
        registry.register(ClosureFunction::new("sub", 2, |args| {
            int_op(&args, |a, b| a - b)
        }));
        registry.register(ClosureFunction::new("mul", 2, |args| {
            int_op(&args, |a, b| a * b)
        }));
        registry.register(ClosureFunction::new("div", 2, |args| {
            let denominator = int_arg(&args[1])?;
            if denominator == 0 {
                return Err(EvalError::host_error("Division by zero"));
            }
            Ok(Value::Int(int_arg(&args[0])? / denominator))
        }));

        registry.register(ClosureFunction::new("int", 1, |args| match &args[0] {
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::String(s) => s.trim().parse().map(Value::Int).map_err(|_| {
                EvalError::host_error(format!("Cannot convert '{s}' to an integer"))
            }),
            other => Err(EvalError::type_mismatch("int or string", other.type_name())),
        }));

        registry.register(ClosureFunction::var_args("sublist", 2, |args| {
            if args.len() > 3 {
                return Err(EvalError::arity_exact("sublist", 3, args.len()));
            }
            let list = match &args[0] {
                Value::List(l) => l,
                other => return Err(EvalError::type_mismatch("list", other.type_name())),
            };
            let start = int_arg(&args[1])?;
            let stop = match args.get(2) {
                Some(value) => int_arg(value)?,
                None => list.len() as i64,
            };
            let start = clamp_index(start, list.len());
            let stop = clamp_index(stop, list.len()).max(start);
            Ok(Value::List(list[start..stop].to_vec()))
        }));

        registry.register(ClosureFunction::var_args("substring", 2, |args| {
            if args.len() > 3 {
                return Err(EvalError::arity_exact("substring", 3, args.len()));
            }
            let text = match &args[0] {
                Value::String(s) => s,
                other => return Err(EvalError::type_mismatch("string", other.type_name())),
            };
            let chars: Vec<char> = text.chars().collect();
            let start = int_arg(&args[1])?;
            let stop = match args.get(2) {
                Some(value) => int_arg(value)?,
                None => chars.len() as i64,
            };
            let start = clamp_index(start, chars.len());
            let stop = clamp_index(stop, chars.len()).max(start);
            Ok(Value::String(chars[start..stop].iter().collect()))
        }));
    }

    fn int_arg(value: &Value) -> Result<i64, EvalError> {
        value
            .as_int()
            .ok_or_else(|| EvalError::type_mismatch("int", value.type_name()))
    }

    fn int_op(args: &[Value], op: impl Fn(i64, i64) -> i64) -> Result<Value, EvalError> {
        Ok(Value::Int(op(int_arg(&args[0])?, int_arg(&args[1])?)))
    }

    /// Negative indices count from the end; the result is clamped into
    /// the list bounds.
    fn clamp_index(index: i64, len: usize) -> usize {
        let resolved = if index < 0 { index + len as i64 } else { index };
        resolved.clamp(0, len as i64) as usize
    }
}
