use std::sync::Arc;

use super::span::Spanned;
use super::template::TemplateNode;

pub type Expr = Spanned<ExprKind>;

/// Expression-family nodes: constructs that evaluate to a single runtime
/// value.
///
/// The branches of [`Alternative`](ExprKind::Alternative) and
/// [`Choice`](ExprKind::Choice) are full [`TemplateNode`]s rather than
/// expressions, because a branch may produce literal markup (an embedded
/// template) instead of a scalar. Evaluating such a branch yields a
/// [`Value::Node`](crate::Value::Node) that the expansion engine splices
/// into the output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// Literal string: `'some text'` or `"some text"`.
    LiteralText(String),

    /// Literal integer in decimal representation: `42`.
    LiteralInt(i64),

    /// The evaluation context object: `this`.
    ///
    /// Inside an unnamed `foreach`, `this` is rebound to the current
    /// collection element.
    SelfAccess,

    /// Access to a named variable: `$my-var`.
    Variable(String),

    /// Access to a model property: `expr.name`, or the short form `name`
    /// which is parsed as `this.name`.
    Property { target: Box<Expr>, name: String },

    /// Call of a registered function: `#name(arg1, arg2)`.
    Call { name: String, args: Vec<Expr> },

    /// Access to the element of an indexed collection: `expr[index]`.
    ///
    /// Lists accept integer indices (negative values count from the end,
    /// out-of-range yields null); maps accept any index whose text form
    /// matches a key.
    Index {
        collection: Box<Expr>,
        index: Box<Expr>,
    },

    /// An expression with a fallback: `primary | fallback`.
    ///
    /// Evaluates `primary`; if the result is non-empty it is the result of
    /// the whole expression, otherwise `fallback` is evaluated.
    Alternative {
        primary: Box<Expr>,
        fallback: Arc<TemplateNode>,
    },

    /// An if-then-else expression: `test ? positive : negative`.
    ///
    /// The negative branch is optional and defaults to empty text.
    Choice {
        test: Box<Expr>,
        positive: Arc<TemplateNode>,
        negative: Option<Arc<TemplateNode>>,
    },
}

impl ExprKind {
    /// Whether this expression is the empty text literal. Used when
    /// trimming defaulted trailing `foreach` parameters during
    /// serialization.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, ExprKind::LiteralText(text) if text.is_empty())
    }
}
