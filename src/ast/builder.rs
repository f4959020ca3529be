//! Assembly of a flat node stream into a template tree.
//!
//! The grammar matches start tags, end tags, expression regions and literal
//! text as a flat sequence. [`NodeBuilder`] rebuilds the nesting from that
//! stream, tracking open tags on a stack and rejecting mismatched or
//! unclosed markup.

use crate::error::ParseError;

use super::span::Span;
use super::template::{Sequence, Structure, StructureKind, Tag, TemplateNode};

/// Incremental builder for a template tree.
#[derive(Debug, Default)]
pub struct NodeBuilder {
    open: Vec<OpenTag>,
    top: Sequence,
}

#[derive(Debug)]
struct OpenTag {
    tag: Tag,
    span: Span,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished node to the innermost open tag, or to the
    /// top-level sequence when no tag is open.
    pub fn append(&mut self, node: TemplateNode) {
        match self.open.last_mut() {
            Some(open) => open.tag.append(node),
            None => self.top.append(node),
        }
    }

    /// Records a start tag. Empty tags (`<br/>`) are complete nodes and
    /// are appended directly; all others stay open until their end tag
    /// arrives.
    pub fn start_tag(&mut self, tag: Tag, span: Span) {
        if tag.empty {
            self.append(TemplateNode::Structure(Structure::new(
                StructureKind::Tag(tag),
                span,
            )));
        } else {
            self.open.push(OpenTag { tag, span });
        }
    }

    /// Closes the innermost open tag, which must carry the given name.
    pub fn end_tag(&mut self, name: &str, span: Span) -> Result<(), ParseError> {
        let open = match self.open.pop() {
            Some(open) => open,
            None => {
                return Err(ParseError::new(
                    format!("Unexpected closing tag '</{name}>' without matching start tag"),
                    span,
                ));
            }
        };
        if open.tag.name != name {
            return Err(ParseError::new(
                format!(
                    "Closing tag '</{}>' does not match start tag '<{}>'",
                    name, open.tag.name
                ),
                span,
            ));
        }
        let tag_span = open.span.merge(span);
        self.append(TemplateNode::Structure(Structure::new(
            StructureKind::Tag(open.tag),
            tag_span,
        )));
        Ok(())
    }

    /// Finishes the build. A single top-level node is returned as-is;
    /// anything else becomes a sequence.
    pub fn build(mut self) -> Result<TemplateNode, ParseError> {
        if let Some(open) = self.open.pop() {
            return Err(ParseError::new(
                format!("Unclosed tag '<{}>'", open.tag.name),
                open.span,
            ));
        }
        if self.top.items.len() == 1 {
            return Ok(self.top.items.pop().expect("checked length"));
        }
        let span = self
            .top
            .items
            .iter()
            .fold(Span::UNDEFINED, |acc, item| acc.merge(item.span()));
        Ok(TemplateNode::Structure(Structure::new(
            StructureKind::Sequence(self.top),
            span,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::{Expr, ExprKind};

    fn text(s: &str) -> TemplateNode {
        TemplateNode::Expr(Expr::undefined(ExprKind::LiteralText(s.to_string())))
    }

    #[test]
    fn single_node_stays_unwrapped() {
        let mut builder = NodeBuilder::new();
        builder.append(text("hello"));
        assert_eq!(builder.build().unwrap(), text("hello"));
    }

    #[test]
    fn multiple_nodes_form_a_sequence() {
        let mut builder = NodeBuilder::new();
        builder.append(text("a"));
        builder.append(text("b"));
        match builder.build().unwrap() {
            TemplateNode::Structure(Structure {
                node: StructureKind::Sequence(seq),
                ..
            }) => assert_eq!(seq.items.len(), 2),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn nested_tags() {
        let mut builder = NodeBuilder::new();
        builder.start_tag(Tag::new("div"), Span::new(1, 1, 1, 6));
        builder.start_tag(Tag::new("b"), Span::new(1, 6, 1, 9));
        builder.append(text("x"));
        builder.end_tag("b", Span::new(1, 10, 1, 14)).unwrap();
        builder.end_tag("div", Span::new(1, 14, 1, 20)).unwrap();
        match builder.build().unwrap() {
            TemplateNode::Structure(Structure {
                node: StructureKind::Tag(tag),
                ..
            }) => {
                assert_eq!(tag.name, "div");
                assert_eq!(tag.content.len(), 1);
            }
            other => panic!("expected tag, got {other:?}"),
        }
    }

    #[test]
    fn empty_tag_needs_no_close() {
        let mut builder = NodeBuilder::new();
        let mut tag = Tag::new("br");
        tag.empty = true;
        builder.start_tag(tag, Span::new(1, 1, 1, 6));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn mismatched_close_is_rejected() {
        let mut builder = NodeBuilder::new();
        builder.start_tag(Tag::new("div"), Span::new(1, 1, 1, 6));
        let err = builder.end_tag("span", Span::new(1, 6, 1, 13)).unwrap_err();
        assert!(err.to_string().contains("'</span>'"));
        assert!(err.to_string().contains("'<div>'"));
    }

    #[test]
    fn stray_close_is_rejected() {
        let mut builder = NodeBuilder::new();
        let err = builder.end_tag("div", Span::new(1, 1, 1, 7)).unwrap_err();
        assert!(err.to_string().contains("without matching start tag"));
    }

    #[test]
    fn unclosed_tag_is_rejected() {
        let mut builder = NodeBuilder::new();
        builder.start_tag(Tag::new("div"), Span::new(1, 1, 1, 6));
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("Unclosed tag '<div>'"));
    }
}
