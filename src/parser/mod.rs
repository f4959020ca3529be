//! Template parser, built on [pest](https://pest.rs/).
//!
//! The grammar is defined in `stencil.pest`. It matches markup as a flat
//! stream of start tags, end tags, expression regions and literal text;
//! this module converts pest's parse tree into the typed AST from
//! [`crate::ast`], rebuilding tag nesting through [`NodeBuilder`].
//!
//! Use [`parse`] to convert source text into a [`TemplateNode`], which can
//! then be expanded via [`crate::eval::expand`].

use std::sync::Arc;

use pest::Parser;
use pest_derive::Parser;

use crate::ast::builder::NodeBuilder;
use crate::ast::expr::{Expr, ExprKind};
use crate::ast::span::{Span, Spanned};
use crate::ast::template::*;
use crate::error::ParseError;

#[derive(Parser)]
#[grammar = "parser/stencil.pest"]
struct StencilParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

/// Parse source text into a template tree.
///
/// A single top-level node is returned as-is; mixed content becomes a
/// sequence. The returned [`ParseError`] carries a [`Span`](crate::Span)
/// for diagnostic formatting.
pub fn parse(source: &str) -> Result<TemplateNode, ParseError> {
    let mut pairs =
        StencilParser::parse(Rule::template, source).map_err(convert_pest_error)?;

    let template = pairs.next().unwrap();
    let mut builder = NodeBuilder::new();
    for pair in template.into_inner() {
        if pair.as_rule() == Rule::EOI {
            break;
        }
        add_node(&mut builder, pair)?;
    }
    builder.build()
}

fn convert_pest_error(e: pest::error::Error<Rule>) -> ParseError {
    let (line, col) = match e.line_col {
        pest::error::LineColLocation::Pos((line, col)) => (line, col),
        pest::error::LineColLocation::Span((line, col), _) => (line, col),
    };
    let span = Span::new(line as i32, col as i32, line as i32, col as i32 + 1);
    ParseError::new(format!("parse error: {}", e.variant.message()), span)
}

fn pair_span(pair: &Pair) -> Span {
    let span = pair.as_span();
    let (begin_line, begin_column) = span.start_pos().line_col();
    let (end_line, end_column) = span.end_pos().line_col();
    Span::new(
        begin_line as i32,
        begin_column as i32,
        end_line as i32,
        end_column as i32,
    )
}

// -- Node building -------------------------------------------------------

fn add_node(builder: &mut NodeBuilder, pair: Pair) -> Result<(), ParseError> {
    let span = pair_span(&pair);

    match pair.as_rule() {
        Rule::literal_text | Rule::attr_text => {
            let text = unescape_literal(pair.as_str());
            builder.append(TemplateNode::Expr(Spanned::new(
                ExprKind::LiteralText(text),
                span,
            )));
        }
        Rule::expr_region => {
            builder.append(build_region(pair)?);
        }
        Rule::start_tag => {
            let tag = build_start_tag(pair)?;
            builder.start_tag(tag, span);
        }
        Rule::end_tag => {
            let name = pair.into_inner().next().unwrap().as_str();
            builder.end_tag(name, span)?;
        }
        other => unreachable!("unexpected rule in node position: {other:?}"),
    }
    Ok(())
}

fn build_region(pair: Pair) -> Result<TemplateNode, ParseError> {
    let span = pair_span(&pair);
    let inner = pair.into_inner().next().unwrap();

    match inner.as_rule() {
        Rule::foreach => {
            let each = build_foreach(inner)?;
            Ok(TemplateNode::Structure(Spanned::new(
                StructureKind::Foreach(each),
                span,
            )))
        }
        Rule::reference => build_reference(inner, span),
        Rule::expr => Ok(TemplateNode::Expr(build_expr(inner)?)),
        other => unreachable!("unexpected rule in region position: {other:?}"),
    }
}

fn build_reference(pair: Pair, span: Span) -> Result<TemplateNode, ParseError> {
    let target = pair.into_inner().next().unwrap();
    // A bare name is the template name itself; anything else is an
    // expression yielding the name.
    let name = match target.as_rule() {
        Rule::ref_name => Spanned::new(
            ExprKind::LiteralText(target.as_str().to_string()),
            pair_span(&target),
        ),
        Rule::postfix => build_postfix(target)?,
        other => unreachable!("unexpected rule in reference position: {other:?}"),
    };
    Ok(TemplateNode::Structure(Spanned::new(
        StructureKind::Reference(TemplateRef { name }),
        span,
    )))
}

fn build_foreach(pair: Pair) -> Result<Foreach, ParseError> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner().peekable();

    let var_name = match inner.peek() {
        Some(p) if p.as_rule() == Rule::binding => {
            let binding = inner.next().unwrap();
            Some(binding.into_inner().next().unwrap().as_str().to_string())
        }
        _ => None,
    };
    let collection = build_expr(inner.next().unwrap())?;

    let mut each = Foreach::over(var_name, collection);
    for (position, param) in inner.enumerate() {
        let param = build_template_param(param)?;
        match position {
            0 => *each.separator = param,
            1 => *each.iterator = param,
            2 => *each.start = param,
            3 => *each.stop = param,
            _ => return Err(ParseError::new("Too many arguments to foreach", span)),
        }
    }
    Ok(each)
}

fn build_start_tag(pair: Pair) -> Result<Tag, ParseError> {
    let mut inner = pair.into_inner();
    let mut tag = Tag::new(inner.next().unwrap().as_str());

    for part in inner {
        match part.as_rule() {
            Rule::attribute => {
                let mut attr = part.into_inner();
                let name = attr.next().unwrap().as_str().to_string();
                let value = build_attr_content(attr.next().unwrap())?;
                tag.attributes.push((name, value));
            }
            Rule::empty_close => tag.empty = true,
            other => unreachable!("unexpected rule in tag position: {other:?}"),
        }
    }
    Ok(tag)
}

fn build_attr_content(pair: Pair) -> Result<TemplateNode, ParseError> {
    let mut builder = NodeBuilder::new();
    for part in pair.into_inner() {
        add_node(&mut builder, part)?;
    }
    builder.build()
}

// -- Expression building -------------------------------------------------

fn build_expr(pair: Pair) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let mut expr = build_choice(inner.next().unwrap())?;

    // Alternative chains associate to the left, so falling through to an
    // embedded-markup branch and then testing the combined result fails
    // with the boolean-context error.
    for param in inner {
        let fallback = build_template_param(param)?;
        let span = expr.span.merge(fallback.span());
        expr = Spanned::new(
            ExprKind::Alternative {
                primary: Box::new(expr),
                fallback: Arc::new(fallback),
            },
            span,
        );
    }
    Ok(expr)
}

fn build_choice(pair: Pair) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let test = build_postfix(inner.next().unwrap())?;

    let positive = match inner.next() {
        Some(p) => build_template_param(p)?,
        None => return Ok(test),
    };
    let negative = match inner.next() {
        Some(p) => Some(build_template_param(p)?),
        None => None,
    };

    let mut span = test.span.merge(positive.span());
    if let Some(negative) = &negative {
        span = span.merge(negative.span());
    }
    Ok(Spanned::new(
        ExprKind::Choice {
            test: Box::new(test),
            positive: Arc::new(positive),
            negative: negative.map(Arc::new),
        },
        span,
    ))
}

fn build_postfix(pair: Pair) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let mut expr = build_atom(inner.next().unwrap())?;

    for op in inner {
        let span = expr.span.merge(pair_span(&op));
        match op.as_rule() {
            Rule::property => {
                let name = op.into_inner().next().unwrap().as_str().to_string();
                expr = Spanned::new(
                    ExprKind::Property {
                        target: Box::new(expr),
                        name,
                    },
                    span,
                );
            }
            Rule::index => {
                let index = build_expr(op.into_inner().next().unwrap())?;
                expr = Spanned::new(
                    ExprKind::Index {
                        collection: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            }
            other => unreachable!("unexpected rule in postfix position: {other:?}"),
        }
    }
    Ok(expr)
}

fn build_atom(pair: Pair) -> Result<Expr, ParseError> {
    let span = pair_span(&pair);

    match pair.as_rule() {
        Rule::string_lit => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Spanned::new(
                ExprKind::LiteralText(unescape_string(raw)),
                span,
            ))
        }
        Rule::int_lit => {
            let value: i64 = pair.as_str().parse().map_err(|_| {
                ParseError::new(format!("invalid integer literal: {}", pair.as_str()), span)
            })?;
            Ok(Spanned::new(ExprKind::LiteralInt(value), span))
        }
        Rule::self_kw => Ok(Spanned::new(ExprKind::SelfAccess, span)),
        Rule::variable => {
            let name = pair.into_inner().next().unwrap().as_str().to_string();
            Ok(Spanned::new(ExprKind::Variable(name), span))
        }
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner.next().unwrap().as_str().to_string();
            let args = inner.map(build_expr).collect::<Result<Vec<_>, _>>()?;
            Ok(Spanned::new(ExprKind::Call { name, args }, span))
        }
        // A bare name reads a property of the context object.
        Rule::bareword => {
            let name = pair.as_str().to_string();
            Ok(Spanned::new(
                ExprKind::Property {
                    target: Box::new(Spanned::new(ExprKind::SelfAccess, span)),
                    name,
                },
                span,
            ))
        }
        other => unreachable!("unexpected rule in atom position: {other:?}"),
    }
}

fn build_template_param(pair: Pair) -> Result<TemplateNode, ParseError> {
    let inner = pair.into_inner().next().unwrap();
    let span = pair_span(&inner);
    match inner.as_rule() {
        Rule::embedded => {
            let mut builder = NodeBuilder::new();
            for part in inner.into_inner() {
                add_node(&mut builder, part)?;
            }
            // Braces always create a structural template, even around a
            // single expression, so a braced fallback or branch stays
            // markup instead of collapsing to its value.
            Ok(match builder.build()? {
                node @ TemplateNode::Structure(_) => node,
                single => {
                    let mut sequence = Sequence::new();
                    sequence.append(single);
                    TemplateNode::Structure(Spanned::new(
                        StructureKind::Sequence(sequence),
                        span,
                    ))
                }
            })
        }
        Rule::foreach => {
            let each = build_foreach(inner)?;
            Ok(TemplateNode::Structure(Spanned::new(
                StructureKind::Foreach(each),
                span,
            )))
        }
        Rule::reference => build_reference(inner, span),
        Rule::expr => Ok(TemplateNode::Expr(build_expr(inner)?)),
        other => unreachable!("unexpected rule in parameter position: {other:?}"),
    }
}

// -- Helpers -------------------------------------------------------------

/// Literal text: `!` escapes the following active character.
fn unescape_literal(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '!' {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
            }
        } else {
            result.push(ch);
        }
    }
    result
}

/// String literals: backslash escapes the following character.
fn unescape_string(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
            }
        } else {
            result.push(ch);
        }
    }
    result
}
