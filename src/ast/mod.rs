//! The template syntax tree.
//!
//! Templates are trees over two node families: *structure* nodes
//! ([`StructureKind`]) that emit output, and *expression* nodes
//! ([`ExprKind`]) that evaluate to a single [`Value`]. Every node carries a
//! [`Span`] pointing back into the source text for diagnostics.

pub mod builder;
pub mod expr;
pub mod span;
pub mod template;
pub mod value;
pub mod visit;

pub use builder::NodeBuilder;
pub use expr::{Expr, ExprKind};
pub use span::{Span, Spanned};
pub use template::{
    Foreach, Sequence, Structure, StructureKind, Tag, TemplateNode, TemplateRef,
};
pub use value::{ModelHandle, ModelObject, Value};
pub use visit::{ExprVisitor, StructureVisitor, TemplateVisitor};
