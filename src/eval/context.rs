//! Variable bindings and the context object.
//!
//! Evaluation happens against a chain of frames: a [`EvalContext::Root`]
//! frame holding the context object and the initial variable bindings, and
//! zero or more loop overlays pushed by `foreach` expansion. An overlay is
//! allocated once per loop and reassigned for every element, so iteration
//! does not grow the chain.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::ast::value::Value;

/// A frame chain for expression evaluation.
#[derive(Debug)]
pub enum EvalContext<'a> {
    /// The outermost frame: the context object (`this`) and named
    /// variable bindings supplied by the caller.
    Root {
        self_value: Value,
        vars: HashMap<String, Value>,
    },

    /// A loop frame layered over an enclosing context.
    Overlay(&'a LoopFrame<'a>),
}

impl EvalContext<'static> {
    /// A context with the given object bound to `this` and no variables.
    pub fn root(self_value: Value) -> Self {
        EvalContext::Root {
            self_value,
            vars: HashMap::new(),
        }
    }

    /// Adds a variable binding. Only valid on a root context.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    /// Binds or rebinds a variable. Only valid on a root context.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        match self {
            EvalContext::Root { vars, .. } => {
                vars.insert(name.into(), value.into());
            }
            EvalContext::Overlay(_) => unreachable!("overlay contexts have a fixed binding"),
        }
    }
}

impl Default for EvalContext<'static> {
    fn default() -> Self {
        EvalContext::root(Value::Null)
    }
}

impl<'a> EvalContext<'a> {
    /// Resolves a variable, walking the chain outward. Inner bindings
    /// shadow outer ones with the same name.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self {
            EvalContext::Root { vars, .. } => vars.get(name).cloned(),
            EvalContext::Overlay(frame) => {
                if frame.name.as_deref() == Some(name) {
                    Some(frame.value.borrow().clone())
                } else {
                    frame.outer.lookup(name)
                }
            }
        }
    }

    /// The current context object. An unnamed loop frame rebinds `this`
    /// to the element it currently holds; named frames are transparent.
    pub fn self_value(&self) -> Value {
        match self {
            EvalContext::Root { self_value, .. } => self_value.clone(),
            EvalContext::Overlay(frame) => {
                if frame.name.is_none() {
                    frame.value.borrow().clone()
                } else {
                    frame.outer.self_value()
                }
            }
        }
    }
}

/// The single reused frame of a running `foreach`.
///
/// Holds either a named loop variable or, when `name` is `None`, the
/// rebound context object. [`assign`](LoopFrame::assign) replaces the held
/// element between iterations.
#[derive(Debug)]
pub struct LoopFrame<'a> {
    outer: &'a EvalContext<'a>,
    name: Option<String>,
    value: RefCell<Value>,
}

impl<'a> LoopFrame<'a> {
    pub fn new(outer: &'a EvalContext<'a>, name: Option<String>) -> Self {
        Self {
            outer,
            name,
            value: RefCell::new(Value::Null),
        }
    }

    /// Replaces the element held by this frame.
    pub fn assign(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_lookup() {
        let ctx = EvalContext::root(Value::from("obj")).with_var("a", 1i64);
        assert_eq!(ctx.lookup("a"), Some(Value::Int(1)));
        assert_eq!(ctx.lookup("b"), None);
        assert_eq!(ctx.self_value(), Value::from("obj"));
    }

    #[test]
    fn named_overlay_shadows_and_keeps_self() {
        let root = EvalContext::root(Value::from("obj")).with_var("x", "outer");
        let frame = LoopFrame::new(&root, Some("x".to_string()));
        frame.assign(Value::from("inner"));
        let ctx = EvalContext::Overlay(&frame);

        assert_eq!(ctx.lookup("x"), Some(Value::from("inner")));
        assert_eq!(ctx.self_value(), Value::from("obj"));

        frame.assign(Value::from("next"));
        assert_eq!(ctx.lookup("x"), Some(Value::from("next")));
    }

    #[test]
    fn unnamed_overlay_rebinds_self() {
        let root = EvalContext::root(Value::from("obj")).with_var("x", "outer");
        let frame = LoopFrame::new(&root, None);
        frame.assign(Value::Int(7));
        let ctx = EvalContext::Overlay(&frame);

        assert_eq!(ctx.self_value(), Value::Int(7));
        // variables pass through untouched
        assert_eq!(ctx.lookup("x"), Some(Value::from("outer")));
    }

    #[test]
    fn nested_overlays() {
        let root = EvalContext::root(Value::Null);
        let outer_frame = LoopFrame::new(&root, Some("a".to_string()));
        outer_frame.assign(Value::Int(1));
        let outer = EvalContext::Overlay(&outer_frame);
        let inner_frame = LoopFrame::new(&outer, Some("b".to_string()));
        inner_frame.assign(Value::Int(2));
        let inner = EvalContext::Overlay(&inner_frame);

        assert_eq!(inner.lookup("a"), Some(Value::Int(1)));
        assert_eq!(inner.lookup("b"), Some(Value::Int(2)));
        assert_eq!(outer.lookup("b"), None);
    }
}
