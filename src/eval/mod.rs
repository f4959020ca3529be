//! Expression evaluation.
//!
//! [`Eval`] computes the [`Value`] of a single expression against an
//! [`EvalContext`] frame chain. Host data enters evaluation through two
//! seams: the [`ModelAccess`] trait resolves property reads on opaque
//! model objects, and the [`FunctionRegistry`](crate::FunctionRegistry)
//! provides the callable functions.
//!
//! Whole-template expansion lives in [`expand`]; it drives this evaluator
//! for every expression node it encounters.

pub mod context;
pub mod expand;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::expr::{Expr, ExprKind};
use crate::ast::template::TemplateNode;
use crate::ast::value::{ModelHandle, ModelObject, Value};
use crate::ast::visit::ExprVisitor;
use crate::error::EvalError;
use crate::registry::FunctionRegistry;

pub use context::{EvalContext, LoopFrame};
pub use expand::{BufferedOutput, Expander, Output, StringOutput};

// ── Model access ────────────────────────────────────────────────────────

/// Resolves property reads on host model objects.
///
/// The evaluator handles maps itself; every property access whose target
/// is a [`Value::Model`] is delegated here.
pub trait ModelAccess {
    fn get_property(&self, model: &ModelHandle, name: &str) -> Result<Value, EvalError>;
}

/// A [`ModelAccess`] that rejects every property read. The default for
/// hosts whose data is plain values and maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModelAccess;

impl ModelAccess for NoModelAccess {
    fn get_property(&self, _model: &ModelHandle, _name: &str) -> Result<Value, EvalError> {
        Err(EvalError::properties_unsupported("model"))
    }
}

/// A simple field-record model object, paired with [`RecordAccess`].
///
/// Useful for hosts that want named-field objects without defining their
/// own [`ModelObject`] type, and as the model used throughout the test
/// suite.
#[derive(Clone, Default, PartialEq)]
pub struct RecordModel {
    fields: BTreeMap<String, Value>,
}

impl RecordModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Wraps this record into a [`Value::Model`].
    pub fn into_value(self) -> Value {
        Value::Model(Arc::new(self))
    }
}

impl fmt::Debug for RecordModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl ModelObject for RecordModel {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Resolves properties of [`RecordModel`] objects by field lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordAccess;

impl ModelAccess for RecordAccess {
    fn get_property(&self, model: &ModelHandle, name: &str) -> Result<Value, EvalError> {
        match model.as_any().downcast_ref::<RecordModel>() {
            Some(record) => record
                .field(name)
                .cloned()
                .ok_or_else(|| EvalError::no_such_property(name)),
            None => Err(EvalError::properties_unsupported("model")),
        }
    }
}

// ── Evaluator ───────────────────────────────────────────────────────────

/// Evaluates expressions to values.
pub struct Eval<'a> {
    model: &'a dyn ModelAccess,
    functions: &'a FunctionRegistry,
}

impl<'a> Eval<'a> {
    pub fn new(model: &'a dyn ModelAccess, functions: &'a FunctionRegistry) -> Self {
        Self { model, functions }
    }

    /// Evaluate one expression against a context.
    ///
    /// Errors carry the span of the innermost expression that failed.
    pub fn evaluate(&self, expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        expr.visit(&mut &*self, ctx)
    }

    /// Evaluate a node appearing in expression position. A structure node
    /// becomes embedded markup ([`Value::Node`]); an expression node is
    /// evaluated.
    pub fn evaluate_node(
        &self,
        node: &Arc<TemplateNode>,
        ctx: &EvalContext<'_>,
    ) -> Result<Value, EvalError> {
        match &**node {
            TemplateNode::Expr(expr) => self.evaluate(expr, ctx),
            TemplateNode::Structure(_) => Ok(Value::Node(Arc::clone(node))),
        }
    }

    fn eval_kind(&self, expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        match &expr.node {
            ExprKind::LiteralText(text) => Ok(Value::String(text.clone())),
            ExprKind::LiteralInt(value) => Ok(Value::Int(*value)),
            ExprKind::SelfAccess => Ok(ctx.self_value()),
            ExprKind::Variable(name) => ctx
                .lookup(name)
                .ok_or_else(|| EvalError::unbound_variable(name)),
            ExprKind::Property { target, name } => {
                let target = self.evaluate(target, ctx)?;
                self.property(&target, name)
            }
            ExprKind::Call { name, args } => self.call(name, args, ctx),
            ExprKind::Index { collection, index } => {
                let collection = self.evaluate(collection, ctx)?;
                // A null collection short-circuits without evaluating
                // the index.
                if matches!(collection, Value::Null) {
                    return Ok(Value::Null);
                }
                let index = self.evaluate(index, ctx)?;
                Self::index(&collection, &index)
            }
            ExprKind::Alternative { primary, fallback } => {
                let value = self.evaluate(primary, ctx)?;
                if value.non_empty()? {
                    Ok(value)
                } else {
                    self.evaluate_node(fallback, ctx)
                }
            }
            ExprKind::Choice {
                test,
                positive,
                negative,
            } => {
                let test = self.evaluate(test, ctx)?;
                if test.truth()? {
                    self.evaluate_node(positive, ctx)
                } else {
                    match negative {
                        Some(negative) => self.evaluate_node(negative, ctx),
                        None => Ok(Value::String(String::new())),
                    }
                }
            }
        }
    }

    fn property(&self, target: &Value, name: &str) -> Result<Value, EvalError> {
        match target {
            // A null target short-circuits to null.
            Value::Null => Ok(Value::Null),
            // Map properties are strict: a missing key is an error, while
            // index access on the same map yields null.
            Value::Map(entries) => entries
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::no_such_property(name)),
            Value::Model(handle) => self.model.get_property(handle, name),
            other => Err(EvalError::properties_unsupported(other.type_name())),
        }
    }

    fn call(&self, name: &str, args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::unknown_function(name))?;

        // The argument count is checked against the signature before any
        // argument expression is evaluated.
        function.signature().check_arity(args.len())?;

        let args = args
            .iter()
            .map(|arg| self.evaluate(arg, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        function
            .call(args)
            .map_err(|cause| EvalError::function_failed(name, cause))
    }

    fn index(collection: &Value, index: &Value) -> Result<Value, EvalError> {
        match collection {
            Value::List(items) => {
                let position = index
                    .as_int()
                    .ok_or_else(|| EvalError::index_not_numeric(index.type_name()))?;
                // Negative indices count from the end; out of range is
                // null, not an error.
                let resolved = if position < 0 {
                    position + items.len() as i64
                } else {
                    position
                };
                if resolved < 0 || resolved >= items.len() as i64 {
                    return Ok(Value::Null);
                }
                Ok(items[resolved as usize].clone())
            }
            // Map keys are strings, so any index stringifies to the
            // lookup key; an absent key is null.
            Value::Map(entries) => {
                let key = index.to_text();
                Ok(entries.get(&key).cloned().unwrap_or(Value::Null))
            }
            other => Err(EvalError::not_indexable(other.type_name())),
        }
    }
}

impl<'a, 'c> ExprVisitor<Value, EvalContext<'c>, EvalError> for &Eval<'a> {
    fn visit_expr(&mut self, expr: &Expr, ctx: &EvalContext<'c>) -> Result<Value, EvalError> {
        self.eval_kind(expr, ctx).map_err(|e| e.with_span(expr.span))
    }
}
