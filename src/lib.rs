//! # stencil-lang
//!
//! A template expression language for structured text generation. Template
//! source freely mixes literal text, markup tags and `{..}` expression
//! regions; parsing produces a tree that can be expanded against a data
//! model, inspected, or serialized back to source.
//!
//! The crate is split into two layers:
//!
//! - **The language** (parsing, AST, expansion, printing) lives here and
//!   has no knowledge of any specific application domain.
//! - **The host** implements [`ModelAccess`] to expose its objects to
//!   property access, populates a [`FunctionRegistry`] with callable
//!   functions, and resolves `{-> name}` references through a
//!   [`TemplateScope`].
//!
//! ## Quick start
//!
//! ```rust
//! use stencil_lang::{
//!     render, EmptyScope, EvalContext, Expander, FunctionRegistry, RecordAccess, Value,
//! };
//!
//! let functions = FunctionRegistry::with_builtins();
//! let expander = Expander::new(&RecordAccess, &functions, &EmptyScope);
//!
//! let ctx = EvalContext::root(Value::Null).with_var("name", "Alice");
//! let output = render("Hello, {$name}!!", &ctx, &expander).unwrap();
//! assert_eq!(output, "Hello, Alice!");
//! ```
//!
//! ## Compiled templates
//!
//! For repeated expansion, parse once with [`CompiledTemplate::compile`]
//! and call [`expand`](CompiledTemplate::expand) against different
//! contexts:
//!
//! ```rust
//! use stencil_lang::{
//!     CompiledTemplate, EmptyScope, EvalContext, Expander, FunctionRegistry, RecordAccess,
//!     Value,
//! };
//!
//! let template = CompiledTemplate::compile("HP: {$hp}").unwrap();
//! let functions = FunctionRegistry::with_builtins();
//! let expander = Expander::new(&RecordAccess, &functions, &EmptyScope);
//!
//! let ctx = EvalContext::root(Value::Null).with_var("hp", 100i64);
//! assert_eq!(template.expand(&ctx, &expander).unwrap(), "HP: 100");
//!
//! let ctx = EvalContext::root(Value::Null).with_var("hp", 75i64);
//! assert_eq!(template.expand(&ctx, &expander).unwrap(), "HP: 75");
//! ```
//!
//! ## Round-tripping
//!
//! A parsed tree serializes back to equivalent source with [`to_source`]:
//!
//! ```rust
//! use stencil_lang::{parse, to_source};
//!
//! let node = parse("{foreach($items, ', ', this)}").unwrap();
//! assert_eq!(to_source(&node), "{foreach($items, ', ', this)}");
//! ```

pub mod ast;
pub mod error;
pub mod eval;
mod parser;
pub mod printer;
pub mod registry;
pub mod scope;

pub use ast::span::{Span, Spanned};
pub use ast::template::TemplateNode;
pub use ast::value::{ModelHandle, ModelObject, Value};
pub use error::{EvalError, EvalErrorKind, ParseError};
pub use eval::{
    BufferedOutput, Eval, EvalContext, Expander, LoopFrame, ModelAccess, NoModelAccess, Output,
    RecordAccess, RecordModel, StringOutput,
};
pub use parser::parse;
pub use printer::to_source;
pub use registry::{ClosureFunction, FunctionRegistry, FunctionSignature, TemplateFunction};
pub use scope::{CachedScope, EmptyScope, MapScope, TemplateScope};

/// Parse source text and expand it in a single step.
///
/// For repeated expansion of the same source, prefer [`CompiledTemplate`]
/// to avoid re-parsing.
pub fn render(
    source: &str,
    ctx: &EvalContext<'_>,
    expander: &Expander<'_>,
) -> Result<String, RenderError> {
    let template = parser::parse(source).map_err(RenderError::Parse)?;
    expander
        .expand_to_string(&template, ctx)
        .map_err(RenderError::Eval)
}

/// Combined error type returned by [`render`].
#[derive(Debug)]
pub enum RenderError {
    /// The source failed to parse.
    Parse(ParseError),
    /// An error occurred during expansion.
    Eval(EvalError),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Parse(e) => write!(f, "{e}"),
            RenderError::Eval(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Parse(e) => Some(e),
            RenderError::Eval(e) => Some(e),
        }
    }
}

/// A parsed template that can be expanded multiple times without
/// re-parsing.
///
/// Use this when the same template source will be expanded against
/// different contexts or at different points in time.
pub struct CompiledTemplate {
    template: TemplateNode,
}

impl CompiledTemplate {
    /// Parse source text into a compiled template.
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        let template = parser::parse(source)?;
        Ok(Self { template })
    }

    /// Expand this template into a string.
    pub fn expand(
        &self,
        ctx: &EvalContext<'_>,
        expander: &Expander<'_>,
    ) -> Result<String, EvalError> {
        expander.expand_to_string(&self.template, ctx)
    }

    /// Expand this template into an arbitrary output sink.
    pub fn expand_to(
        &self,
        ctx: &EvalContext<'_>,
        expander: &Expander<'_>,
        out: &mut dyn Output,
    ) -> Result<(), EvalError> {
        expander.expand(&self.template, ctx, out)
    }

    /// Serialize the template back to source text.
    pub fn to_source(&self) -> String {
        printer::to_source(&self.template)
    }

    /// Access the underlying tree for inspection or analysis.
    pub fn ast(&self) -> &TemplateNode {
        &self.template
    }
}
