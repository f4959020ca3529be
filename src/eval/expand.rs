//! Template expansion.
//!
//! [`Expander`] walks a template tree and emits the values it produces to
//! an [`Output`] sink. Expansion covers the structure family: sequences
//! expand in order, tags expand their content, `foreach` drives the loop
//! protocol, and references splice in templates resolved through a
//! [`TemplateScope`]. Expression nodes are evaluated by [`Eval`] and their
//! values handed to the sink; a [`Value::Node`] result (embedded markup
//! from a conditional branch) is expanded in place instead of being
//! emitted as a value.

use crate::ast::template::{Foreach, Sequence, Structure, Tag, TemplateNode, TemplateRef};
use crate::ast::value::Value;
use crate::ast::visit::StructureVisitor;
use crate::error::EvalError;
use crate::registry::FunctionRegistry;
use crate::scope::TemplateScope;

use super::context::{EvalContext, LoopFrame};
use super::{Eval, ModelAccess};

// ── Output sinks ────────────────────────────────────────────────────────

/// Receives the values produced by template expansion, in document order.
pub trait Output {
    fn add(&mut self, value: Value) -> Result<(), EvalError>;
}

/// An [`Output`] that converts every value to text.
#[derive(Debug, Default)]
pub struct StringOutput {
    buffer: String,
}

impl StringOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl Output for StringOutput {
    fn add(&mut self, value: Value) -> Result<(), EvalError> {
        self.buffer.push_str(&value.to_text());
        Ok(())
    }
}

/// An [`Output`] that keeps the raw values, for hosts that post-process
/// typed results instead of flat text.
#[derive(Debug, Default)]
pub struct BufferedOutput {
    values: Vec<Value>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Output for BufferedOutput {
    fn add(&mut self, value: Value) -> Result<(), EvalError> {
        self.values.push(value);
        Ok(())
    }
}

// ── Expansion engine ────────────────────────────────────────────────────

/// Expands templates against a model, a function registry and a template
/// scope.
pub struct Expander<'a> {
    eval: Eval<'a>,
    scope: &'a dyn TemplateScope,
}

impl<'a> Expander<'a> {
    pub fn new(
        model: &'a dyn ModelAccess,
        functions: &'a FunctionRegistry,
        scope: &'a dyn TemplateScope,
    ) -> Self {
        Self {
            eval: Eval::new(model, functions),
            scope,
        }
    }

    /// The expression evaluator this expander drives.
    pub fn eval(&self) -> &Eval<'a> {
        &self.eval
    }

    /// Expand a template, sending produced values to `out`.
    pub fn expand(
        &self,
        node: &TemplateNode,
        ctx: &EvalContext<'_>,
        out: &mut dyn Output,
    ) -> Result<(), EvalError> {
        let mut run = ExpandRun { env: self, out };
        run.node(node, ctx)
    }

    /// Expand a template into a string.
    pub fn expand_to_string(
        &self,
        node: &TemplateNode,
        ctx: &EvalContext<'_>,
    ) -> Result<String, EvalError> {
        let mut out = StringOutput::new();
        self.expand(node, ctx, &mut out)?;
        Ok(out.into_string())
    }
}

struct ExpandRun<'e, 'a> {
    env: &'e Expander<'a>,
    out: &'e mut dyn Output,
}

impl<'e, 'a> ExpandRun<'e, 'a> {
    fn node(&mut self, node: &TemplateNode, ctx: &EvalContext<'_>) -> Result<(), EvalError> {
        match node {
            TemplateNode::Structure(structure) => structure.visit(self, ctx),
            TemplateNode::Expr(expr) => {
                let value = self.env.eval.evaluate(expr, ctx)?;
                match value {
                    // Embedded markup is spliced, not emitted as a value.
                    Value::Node(embedded) => self.node(&embedded, ctx),
                    // Empty values contribute nothing to the output.
                    value if value.non_empty()? => self.out.add(value),
                    _ => Ok(()),
                }
            }
        }
    }
}

impl<'e, 'a, 'c> StructureVisitor<(), EvalContext<'c>, EvalError> for ExpandRun<'e, 'a> {
    fn visit_structure(&mut self, node: &Structure, ctx: &EvalContext<'c>) -> Result<(), EvalError> {
        // Funnel back to the specific handlers.
        node.visit(self, ctx)
    }

    fn visit_sequence(
        &mut self,
        sequence: &Sequence,
        _node: &Structure,
        ctx: &EvalContext<'c>,
    ) -> Result<(), EvalError> {
        for item in &sequence.items {
            self.node(item, ctx)?;
        }
        Ok(())
    }

    /// Tags contribute their content only; attributes and the markup
    /// shell are consumed by whatever layer renders the output.
    fn visit_tag(
        &mut self,
        tag: &Tag,
        _node: &Structure,
        ctx: &EvalContext<'c>,
    ) -> Result<(), EvalError> {
        for child in &tag.content {
            self.node(child, ctx)?;
        }
        Ok(())
    }

    fn visit_foreach(
        &mut self,
        each: &Foreach,
        node: &Structure,
        ctx: &EvalContext<'c>,
    ) -> Result<(), EvalError> {
        // start expands under the outer context before the collection is
        // even evaluated; stop expands after the last element. Both run
        // when the collection is empty; the separator expands between
        // elements, also under the outer context.
        self.node(&each.start, ctx)?;

        let collection = self.env.eval.evaluate(&each.collection, ctx)?;
        let items: Vec<Value> = match collection {
            // A null collection iterates zero times; start and stop
            // still expand.
            Value::Null => Vec::new(),
            Value::List(items) => items,
            Value::Map(entries) => entries.into_values().collect(),
            other => {
                return Err(EvalError::not_iterable(other.type_name()).with_span(node.span));
            }
        };

        let frame = LoopFrame::new(ctx, each.var_name.clone());
        for (n, item) in items.into_iter().enumerate() {
            if n > 0 {
                self.node(&each.separator, ctx)?;
            }
            frame.assign(item);
            let inner = EvalContext::Overlay(&frame);
            self.node(&each.iterator, &inner)?;
        }
        self.node(&each.stop, ctx)
    }

    fn visit_reference(
        &mut self,
        reference: &TemplateRef,
        node: &Structure,
        ctx: &EvalContext<'c>,
    ) -> Result<(), EvalError> {
        let name = self.env.eval.evaluate(&reference.name, ctx)?.to_text();
        let template = self
            .env
            .scope
            .get_template(&name)
            .ok_or_else(|| EvalError::no_such_template(&name).with_span(node.span))?;
        self.node(&template, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::RecordAccess;
    use crate::parser;
    use crate::scope::EmptyScope;

    fn expand_str(source: &str, ctx: &EvalContext<'_>) -> Result<String, EvalError> {
        let node = parser::parse(source).unwrap();
        let functions = FunctionRegistry::with_builtins();
        let expander = Expander::new(&RecordAccess, &functions, &EmptyScope);
        expander.expand_to_string(&node, ctx)
    }

    fn list(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn literal_passthrough() {
        let ctx = EvalContext::default();
        assert_eq!(expand_str("plain text", &ctx).unwrap(), "plain text");
        assert_eq!(expand_str("", &ctx).unwrap(), "");
    }

    #[test]
    fn expressions_are_stringified() {
        let ctx = EvalContext::root(Value::Null).with_var("n", 42i64);
        assert_eq!(expand_str("n = {$n}!!", &ctx).unwrap(), "n = 42!");
    }

    #[test]
    fn null_renders_as_nothing() {
        let ctx = EvalContext::root(Value::Null).with_var("x", Value::Null);
        assert_eq!(expand_str("[{$x}]", &ctx).unwrap(), "[]");
    }

    #[test]
    fn tags_contribute_content_only() {
        let ctx = EvalContext::root(Value::Null).with_var("x", "inner");
        assert_eq!(expand_str("<b>{$x}</b>", &ctx).unwrap(), "inner");
        assert_eq!(expand_str("<br/>", &ctx).unwrap(), "");
    }

    #[test]
    fn choice_branches_expand_in_place() {
        let ctx = EvalContext::root(Value::Null)
            .with_var("yes", true)
            .with_var("no", false)
            .with_var("x", "val");
        assert_eq!(
            expand_str("{$yes ? {<b>{$x}</b>} : 'n'}", &ctx).unwrap(),
            "val"
        );
        assert_eq!(expand_str("{$no ? 'y'}", &ctx).unwrap(), "");
    }

    #[test]
    fn foreach_with_separator() {
        let ctx = EvalContext::root(Value::Null).with_var("l", list(&["a", "b", "c"]));
        assert_eq!(expand_str("{foreach($l, ', ')}", &ctx).unwrap(), "a, b, c");
    }

    #[test]
    fn foreach_rebinds_self_when_unnamed() {
        let ctx = EvalContext::root(Value::from("outer")).with_var("l", list(&["a", "b"]));
        assert_eq!(
            expand_str("{foreach($l, '|', {[{this}]})}", &ctx).unwrap(),
            "[a]|[b]"
        );
        // the context object is untouched afterwards
        assert_eq!(expand_str("{this}", &ctx).unwrap(), "outer");
    }

    #[test]
    fn foreach_with_named_variable_keeps_self() {
        let ctx = EvalContext::root(Value::from("obj")).with_var("l", list(&["a", "b"]));
        assert_eq!(
            expand_str("{foreach(x : $l, ',', {{$x}-{this}})}", &ctx).unwrap(),
            "a-obj,b-obj"
        );
    }

    #[test]
    fn foreach_start_and_stop_always_expand() {
        let ctx = EvalContext::root(Value::Null)
            .with_var("l", list(&["a"]))
            .with_var("e", Value::List(Vec::new()));
        assert_eq!(
            expand_str("{foreach($l, ',', this, '[', ']')}", &ctx).unwrap(),
            "[a]"
        );
        assert_eq!(
            expand_str("{foreach($e, ',', this, '[', ']')}", &ctx).unwrap(),
            "[]"
        );
    }

    #[test]
    fn foreach_start_expands_before_the_collection_is_evaluated() {
        let node = parser::parse("{foreach($nope, ',', this, 'S')}").unwrap();
        let functions = FunctionRegistry::with_builtins();
        let expander = Expander::new(&RecordAccess, &functions, &EmptyScope);
        let ctx = EvalContext::default();

        let mut out = BufferedOutput::new();
        let err = expander.expand(&node, &ctx, &mut out).unwrap_err();
        assert_eq!(err.kind, crate::error::EvalErrorKind::UnboundVariable);
        // the start marker reached the sink before the failure
        assert_eq!(out.values(), &[Value::from("S")]);
    }

    #[test]
    fn foreach_over_null_iterates_zero_times() {
        let ctx = EvalContext::root(Value::Null).with_var("missing", Value::Null);
        assert_eq!(
            expand_str("{foreach($missing, ',', this, '[', ']')}", &ctx).unwrap(),
            "[]"
        );
    }

    #[test]
    fn foreach_over_map_yields_values() {
        let mut entries = std::collections::BTreeMap::new();
        entries.insert("b".to_string(), Value::from("two"));
        entries.insert("a".to_string(), Value::from("one"));
        let ctx = EvalContext::root(Value::Null).with_var("m", Value::Map(entries));
        assert_eq!(expand_str("{foreach($m, ',')}", &ctx).unwrap(), "one,two");
    }

    #[test]
    fn empty_values_are_skipped() {
        let ctx = EvalContext::root(Value::Null)
            .with_var("s", "")
            .with_var("l", Value::List(Vec::new()))
            .with_var("z", 0i64)
            .with_var("f", false);
        assert_eq!(expand_str("[{$s}{$l}]", &ctx).unwrap(), "[]");
        // zero and false are not empty, only valueless things are
        assert_eq!(expand_str("[{$z}{$f}]", &ctx).unwrap(), "[0false]");
    }

    #[test]
    fn foreach_separator_sees_outer_context() {
        // the separator uses this from the enclosing context, not the
        // loop element
        let ctx = EvalContext::root(Value::from("-")).with_var("l", list(&["a", "b"]));
        assert_eq!(
            expand_str("{foreach($l, this)}", &ctx).unwrap(),
            "a-b"
        );
    }

    #[test]
    fn nested_foreach_shadowing() {
        let outer = Value::List(vec![list(&["a", "b"]), list(&["c"])]);
        let ctx = EvalContext::root(Value::Null).with_var("ll", outer);
        assert_eq!(
            expand_str("{foreach(x : $ll, ';', {{foreach(y : $x, ',', $y)}})}", &ctx).unwrap(),
            "a,b;c"
        );
    }

    #[test]
    fn foreach_over_non_collection_fails() {
        let ctx = EvalContext::root(Value::Null).with_var("n", 5i64);
        let err = expand_str("{foreach($n)}", &ctx).unwrap_err();
        assert!(err.to_string().contains("Not a collection in foreach"));
    }

    #[test]
    fn buffered_output_keeps_raw_values() {
        let node = parser::parse("{$n} and {$b}").unwrap();
        let functions = FunctionRegistry::with_builtins();
        let expander = Expander::new(&RecordAccess, &functions, &EmptyScope);
        let ctx = EvalContext::root(Value::Null)
            .with_var("n", 7i64)
            .with_var("b", true);

        let mut out = BufferedOutput::new();
        expander.expand(&node, &ctx, &mut out).unwrap();
        assert_eq!(
            out.values(),
            &[
                Value::Int(7),
                Value::from(" and "),
                Value::Bool(true),
            ]
        );
    }

    #[test]
    fn reference_splices_template() {
        let mut scope = crate::scope::MapScope::new();
        scope.define_source("greet", "Hello {$name}").unwrap();
        let node = parser::parse("{-> greet}!!").unwrap();
        let functions = FunctionRegistry::with_builtins();
        let expander = Expander::new(&RecordAccess, &functions, &scope);
        let ctx = EvalContext::root(Value::Null).with_var("name", "Ada");
        assert_eq!(expander.expand_to_string(&node, &ctx).unwrap(), "Hello Ada!");
    }

    #[test]
    fn unresolved_reference_fails() {
        let ctx = EvalContext::default();
        let err = expand_str("{-> missing}", &ctx).unwrap_err();
        assert_eq!(err.to_string(), "No such template 'missing' at line 1, column 1");
    }
}
