//! Visitor dispatch over the two node families.
//!
//! A visitor is generic over its result type `R`, a per-visit argument `A`
//! (threaded through unchanged, e.g. an evaluation context), and its error
//! type `E`. Every per-variant method has a default implementation that
//! funnels into a single generic fallback, so a visitor may either handle
//! each variant individually or implement only the fallback and match
//! inside it.

use super::expr::{Expr, ExprKind};
use super::span::Spanned;
use super::template::{
    Foreach, Sequence, Structure, StructureKind, Tag, TemplateNode, TemplateRef,
};

/// Visitor over expression-family nodes.
pub trait ExprVisitor<R, A: ?Sized, E> {
    /// Generic fallback, invoked for every expression variant without a
    /// specific override.
    fn visit_expr(&mut self, expr: &Expr, arg: &A) -> Result<R, E>;

    fn visit_literal_text(&mut self, text: &str, expr: &Expr, arg: &A) -> Result<R, E> {
        let _ = text;
        self.visit_expr(expr, arg)
    }

    fn visit_literal_int(&mut self, value: i64, expr: &Expr, arg: &A) -> Result<R, E> {
        let _ = value;
        self.visit_expr(expr, arg)
    }

    fn visit_self_access(&mut self, expr: &Expr, arg: &A) -> Result<R, E> {
        self.visit_expr(expr, arg)
    }

    fn visit_variable(&mut self, name: &str, expr: &Expr, arg: &A) -> Result<R, E> {
        let _ = name;
        self.visit_expr(expr, arg)
    }

    fn visit_property(&mut self, target: &Expr, name: &str, expr: &Expr, arg: &A) -> Result<R, E> {
        let _ = (target, name);
        self.visit_expr(expr, arg)
    }

    fn visit_call(&mut self, name: &str, args: &[Expr], expr: &Expr, arg: &A) -> Result<R, E> {
        let _ = (name, args);
        self.visit_expr(expr, arg)
    }

    fn visit_index(
        &mut self,
        collection: &Expr,
        index: &Expr,
        expr: &Expr,
        arg: &A,
    ) -> Result<R, E> {
        let _ = (collection, index);
        self.visit_expr(expr, arg)
    }

    fn visit_alternative(
        &mut self,
        primary: &Expr,
        fallback: &TemplateNode,
        expr: &Expr,
        arg: &A,
    ) -> Result<R, E> {
        let _ = (primary, fallback);
        self.visit_expr(expr, arg)
    }

    fn visit_choice(
        &mut self,
        test: &Expr,
        positive: &TemplateNode,
        negative: Option<&TemplateNode>,
        expr: &Expr,
        arg: &A,
    ) -> Result<R, E> {
        let _ = (test, positive, negative);
        self.visit_expr(expr, arg)
    }
}

/// Visitor over structure-family nodes.
pub trait StructureVisitor<R, A: ?Sized, E> {
    /// Generic fallback, invoked for every structure variant without a
    /// specific override.
    fn visit_structure(&mut self, node: &Structure, arg: &A) -> Result<R, E>;

    fn visit_sequence(&mut self, sequence: &Sequence, node: &Structure, arg: &A) -> Result<R, E> {
        let _ = sequence;
        self.visit_structure(node, arg)
    }

    fn visit_tag(&mut self, tag: &Tag, node: &Structure, arg: &A) -> Result<R, E> {
        let _ = tag;
        self.visit_structure(node, arg)
    }

    fn visit_foreach(&mut self, each: &Foreach, node: &Structure, arg: &A) -> Result<R, E> {
        let _ = each;
        self.visit_structure(node, arg)
    }

    fn visit_reference(
        &mut self,
        reference: &TemplateRef,
        node: &Structure,
        arg: &A,
    ) -> Result<R, E> {
        let _ = reference;
        self.visit_structure(node, arg)
    }
}

/// Union of both visitor families, for tree walkers that must handle any
/// [`TemplateNode`]. Implemented automatically.
pub trait TemplateVisitor<R, A: ?Sized, E>:
    ExprVisitor<R, A, E> + StructureVisitor<R, A, E>
{
}

impl<R, A: ?Sized, E, T> TemplateVisitor<R, A, E> for T where
    T: ExprVisitor<R, A, E> + StructureVisitor<R, A, E>
{
}

impl Spanned<ExprKind> {
    /// Dispatches to the visitor method for this expression's variant.
    pub fn visit<R, A: ?Sized, E, V>(&self, visitor: &mut V, arg: &A) -> Result<R, E>
    where
        V: ExprVisitor<R, A, E> + ?Sized,
    {
        match &self.node {
            ExprKind::LiteralText(text) => visitor.visit_literal_text(text, self, arg),
            ExprKind::LiteralInt(value) => visitor.visit_literal_int(*value, self, arg),
            ExprKind::SelfAccess => visitor.visit_self_access(self, arg),
            ExprKind::Variable(name) => visitor.visit_variable(name, self, arg),
            ExprKind::Property { target, name } => visitor.visit_property(target, name, self, arg),
            ExprKind::Call { name, args } => visitor.visit_call(name, args, self, arg),
            ExprKind::Index { collection, index } => {
                visitor.visit_index(collection, index, self, arg)
            }
            ExprKind::Alternative { primary, fallback } => {
                visitor.visit_alternative(primary, fallback, self, arg)
            }
            ExprKind::Choice {
                test,
                positive,
                negative,
            } => visitor.visit_choice(test, positive, negative.as_deref(), self, arg),
        }
    }
}

impl Spanned<StructureKind> {
    /// Dispatches to the visitor method for this structure's variant.
    pub fn visit<R, A: ?Sized, E, V>(&self, visitor: &mut V, arg: &A) -> Result<R, E>
    where
        V: StructureVisitor<R, A, E> + ?Sized,
    {
        match &self.node {
            StructureKind::Sequence(sequence) => visitor.visit_sequence(sequence, self, arg),
            StructureKind::Tag(tag) => visitor.visit_tag(tag, self, arg),
            StructureKind::Foreach(each) => visitor.visit_foreach(each, self, arg),
            StructureKind::Reference(reference) => visitor.visit_reference(reference, self, arg),
        }
    }
}

impl TemplateNode {
    /// Dispatches to the matching family of a combined visitor.
    pub fn visit<R, A: ?Sized, E, V>(&self, visitor: &mut V, arg: &A) -> Result<R, E>
    where
        V: TemplateVisitor<R, A, E> + ?Sized,
    {
        match self {
            TemplateNode::Structure(node) => node.visit(visitor, arg),
            TemplateNode::Expr(expr) => expr.visit(visitor, arg),
        }
    }
}
