//! Serialization of template trees back to source text.
//!
//! [`to_source`] produces text that parses back to an equal tree. The
//! printer tracks whether it is inside literal output or inside an
//! expression region: literal text is escaped in literal position and
//! quoted in expression position, expression nodes are wrapped in `{..}`
//! when they appear in literal position, and structure nodes appearing
//! inside an expression re-enter literal position through an embedded
//! `{..}` template.

use std::convert::Infallible;

use crate::ast::expr::{Expr, ExprKind};
use crate::ast::template::{
    Foreach, Sequence, Structure, Tag, TemplateNode, TemplateRef,
};
use crate::ast::visit::{ExprVisitor, StructureVisitor};

/// Renders a template tree as source text.
pub fn to_source(node: &TemplateNode) -> String {
    let mut printer = Printer { out: String::new() };
    printer.node_literal(node);
    printer.out
}

struct Printer {
    out: String,
}

impl Printer {
    /// Renders a node in literal position.
    fn node_literal(&mut self, node: &TemplateNode) {
        match node {
            TemplateNode::Expr(expr) => {
                if let ExprKind::LiteralText(text) = &expr.node {
                    self.push_escaped(text);
                } else {
                    self.out.push('{');
                    infallible(expr.visit(self, &()));
                    self.out.push('}');
                }
            }
            TemplateNode::Structure(structure) => infallible(structure.visit(self, &())),
        }
    }

    /// Renders a node in expression position, e.g. a `foreach` parameter
    /// or a conditional branch.
    fn node_embedded(&mut self, node: &TemplateNode) {
        match node {
            TemplateNode::Expr(expr) => infallible(expr.visit(self, &())),
            TemplateNode::Structure(structure) => {
                self.out.push('{');
                infallible(structure.visit(self, &()));
                self.out.push('}');
            }
        }
    }

    /// Literal text with the active characters escaped. Quotes are
    /// escaped as well so that attribute values stay parseable.
    fn push_escaped(&mut self, text: &str) {
        for ch in text.chars() {
            if matches!(ch, '<' | '>' | '{' | '}' | '!' | '"') {
                self.out.push('!');
            }
            self.out.push(ch);
        }
    }

    /// A quoted string literal for expression position.
    fn push_quoted(&mut self, text: &str) {
        self.out.push('\'');
        for ch in text.chars() {
            if matches!(ch, '\'' | '\\') {
                self.out.push('\\');
            }
            self.out.push(ch);
        }
        self.out.push('\'');
    }
}

fn infallible(result: Result<(), Infallible>) {
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

impl ExprVisitor<(), (), Infallible> for Printer {
    fn visit_expr(&mut self, expr: &Expr, arg: &()) -> Result<(), Infallible> {
        // Funnel back to the specific handlers.
        expr.visit(self, arg)
    }

    fn visit_literal_text(&mut self, text: &str, _expr: &Expr, _arg: &()) -> Result<(), Infallible> {
        self.push_quoted(text);
        Ok(())
    }

    fn visit_literal_int(&mut self, value: i64, _expr: &Expr, _arg: &()) -> Result<(), Infallible> {
        self.out.push_str(&value.to_string());
        Ok(())
    }

    fn visit_self_access(&mut self, _expr: &Expr, _arg: &()) -> Result<(), Infallible> {
        self.out.push_str("this");
        Ok(())
    }

    fn visit_variable(&mut self, name: &str, _expr: &Expr, _arg: &()) -> Result<(), Infallible> {
        self.out.push('$');
        self.out.push_str(name);
        Ok(())
    }

    fn visit_property(
        &mut self,
        target: &Expr,
        name: &str,
        _expr: &Expr,
        arg: &(),
    ) -> Result<(), Infallible> {
        target.visit(self, arg)?;
        self.out.push('.');
        self.out.push_str(name);
        Ok(())
    }

    fn visit_call(
        &mut self,
        name: &str,
        args: &[Expr],
        _expr: &Expr,
        arg: &(),
    ) -> Result<(), Infallible> {
        self.out.push('#');
        self.out.push_str(name);
        self.out.push('(');
        for (n, call_arg) in args.iter().enumerate() {
            if n > 0 {
                self.out.push_str(", ");
            }
            call_arg.visit(self, arg)?;
        }
        self.out.push(')');
        Ok(())
    }

    fn visit_index(
        &mut self,
        collection: &Expr,
        index: &Expr,
        _expr: &Expr,
        arg: &(),
    ) -> Result<(), Infallible> {
        collection.visit(self, arg)?;
        self.out.push('[');
        index.visit(self, arg)?;
        self.out.push(']');
        Ok(())
    }

    fn visit_alternative(
        &mut self,
        primary: &Expr,
        fallback: &TemplateNode,
        _expr: &Expr,
        arg: &(),
    ) -> Result<(), Infallible> {
        primary.visit(self, arg)?;
        self.out.push_str(" | ");
        self.node_embedded(fallback);
        Ok(())
    }

    fn visit_choice(
        &mut self,
        test: &Expr,
        positive: &TemplateNode,
        negative: Option<&TemplateNode>,
        _expr: &Expr,
        arg: &(),
    ) -> Result<(), Infallible> {
        test.visit(self, arg)?;
        self.out.push_str(" ? ");
        self.node_embedded(positive);
        if let Some(negative) = negative {
            self.out.push_str(" : ");
            self.node_embedded(negative);
        }
        Ok(())
    }
}

impl StructureVisitor<(), (), Infallible> for Printer {
    fn visit_structure(&mut self, node: &Structure, arg: &()) -> Result<(), Infallible> {
        node.visit(self, arg)
    }

    fn visit_sequence(
        &mut self,
        sequence: &Sequence,
        _node: &Structure,
        _arg: &(),
    ) -> Result<(), Infallible> {
        for item in &sequence.items {
            self.node_literal(item);
        }
        Ok(())
    }

    fn visit_tag(&mut self, tag: &Tag, _node: &Structure, _arg: &()) -> Result<(), Infallible> {
        self.out.push('<');
        self.out.push_str(&tag.name);
        for (name, value) in &tag.attributes {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.node_literal(value);
            self.out.push('"');
        }
        if tag.empty {
            self.out.push_str("/>");
            return Ok(());
        }
        self.out.push('>');
        for child in &tag.content {
            self.node_literal(child);
        }
        self.out.push_str("</");
        self.out.push_str(&tag.name);
        self.out.push('>');
        Ok(())
    }

    fn visit_foreach(
        &mut self,
        each: &Foreach,
        _node: &Structure,
        arg: &(),
    ) -> Result<(), Infallible> {
        self.out.push_str("{foreach(");
        if let Some(var) = &each.var_name {
            self.out.push_str(var);
            self.out.push_str(" : ");
        }
        infallible(each.collection.visit(self, arg));

        // Defaulted trailing parameters are omitted.
        let mut params: Vec<&TemplateNode> =
            vec![&each.separator, &each.iterator, &each.start, &each.stop];
        while params.last().is_some_and(|p| p.is_empty_text()) {
            params.pop();
        }
        for param in params {
            self.out.push_str(", ");
            self.node_embedded(param);
        }
        self.out.push_str(")}");
        Ok(())
    }

    fn visit_reference(
        &mut self,
        reference: &TemplateRef,
        _node: &Structure,
        arg: &(),
    ) -> Result<(), Infallible> {
        self.out.push_str("{-> ");
        // A fixed name is stored as a text literal but written bare.
        if let ExprKind::LiteralText(name) = &reference.name.node {
            self.out.push_str(name);
        } else {
            infallible(reference.name.visit(self, arg));
        }
        self.out.push('}');
        Ok(())
    }
}
