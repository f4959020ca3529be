use super::expr::{Expr, ExprKind};
use super::span::{Span, Spanned};

pub type Structure = Spanned<StructureKind>;

/// The top-level node union: every template is a tree of structure and
/// expression nodes.
///
/// Structure nodes may contain literal output and other nodes; expression
/// nodes evaluate to a single runtime value. Both families may appear as
/// children of a [`Sequence`], and conditional branches may cross families
/// (see [`ExprKind::Alternative`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateNode {
    Structure(Structure),
    Expr(Expr),
}

impl TemplateNode {
    pub fn span(&self) -> Span {
        match self {
            TemplateNode::Structure(s) => s.span,
            TemplateNode::Expr(e) => e.span,
        }
    }

    /// Empty literal text with no source location; the default for
    /// omitted `foreach` parameters and missing `Choice` branches.
    pub fn empty_text() -> TemplateNode {
        TemplateNode::Expr(Expr::undefined(ExprKind::LiteralText(String::new())))
    }

    /// A `this` access with no source location; the default `foreach`
    /// iterator body.
    pub fn self_access() -> TemplateNode {
        TemplateNode::Expr(Expr::undefined(ExprKind::SelfAccess))
    }

    /// Whether this node is the empty text literal.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, TemplateNode::Expr(e) if e.node.is_empty_text())
    }
}

/// Structure-family nodes: constructs that emit output rather than
/// producing a single value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructureKind {
    /// A concatenation of nodes, expanded in document order.
    Sequence(Sequence),

    /// A literal XML/HTML tag to create in the output.
    Tag(Tag),

    /// A loop: `foreach(var : collection, separator, iterator, start, stop)`.
    Foreach(Foreach),

    /// A reference to another template by name: `-> name`.
    Reference(TemplateRef),
}

/// A list of child nodes whose expansions are concatenated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sequence {
    pub items: Vec<TemplateNode>,
}

impl Sequence {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a node, flattening nested sequences so that a sequence
    /// never directly contains another sequence.
    pub fn append(&mut self, node: TemplateNode) {
        match node {
            TemplateNode::Structure(Spanned {
                node: StructureKind::Sequence(inner),
                ..
            }) => {
                self.items.extend(inner.items);
            }
            other => self.items.push(other),
        }
    }
}

/// A named markup element with an ordered attribute list and content
/// children.
///
/// Attribute values are full template nodes: a value like
/// `class="myclass {$other}"` parses to a sequence of literal text and an
/// embedded expression. The expansion traversal does not expand attributes;
/// they are consumed on demand by whatever layer renders markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub name: String,
    pub attributes: Vec<(String, TemplateNode)>,
    /// Whether the tag is self-closing and cannot have content.
    pub empty: bool,
    pub content: Vec<TemplateNode>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            empty: false,
            content: Vec::new(),
        }
    }

    /// The value of the attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&TemplateNode> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value)
    }

    /// Updates or creates an attribute, preserving the position of an
    /// existing attribute with the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: TemplateNode) {
        let name = name.into();
        match self.attributes.iter_mut().find(|(attr, _)| *attr == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Appends a content child, flattening nested sequences.
    pub fn append(&mut self, node: TemplateNode) {
        match node {
            TemplateNode::Structure(Spanned {
                node: StructureKind::Sequence(inner),
                ..
            }) => {
                self.content.extend(inner.items);
            }
            other => self.content.push(other),
        }
    }
}

/// A loop over a collection value.
///
/// The `iterator` body is expanded once per element with the element bound
/// either to the named loop variable or, when `var_name` is `None`, to the
/// context object (`this`). `separator` is expanded between elements,
/// `start` before the first and `stop` after the last; the surrounding
/// bodies always expand, even for an empty collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Foreach {
    /// Loop variable name, or `None` to rebind `this` while iterating.
    pub var_name: Option<String>,
    pub collection: Expr,
    pub iterator: Box<TemplateNode>,
    pub separator: Box<TemplateNode>,
    pub start: Box<TemplateNode>,
    pub stop: Box<TemplateNode>,
}

impl Foreach {
    /// A loop with all optional parameters defaulted: iterator `this`,
    /// separator/start/stop empty text.
    pub fn over(var_name: Option<String>, collection: Expr) -> Self {
        Self {
            var_name,
            collection,
            iterator: Box::new(TemplateNode::self_access()),
            separator: Box::new(TemplateNode::empty_text()),
            start: Box::new(TemplateNode::empty_text()),
            stop: Box::new(TemplateNode::empty_text()),
        }
    }
}

/// A cross-template reference; the expression yields the name of the
/// template to splice in, resolved through a
/// [`TemplateScope`](crate::scope::TemplateScope) at expansion time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateRef {
    pub name: Expr,
}
