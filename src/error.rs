//! Error types for parsing, evaluation and expansion.
//!
//! [`ParseError`] is produced while turning source text into a template
//! tree and carries the source span of the offending text. [`EvalError`]
//! is produced during evaluation or expansion and can originate from the
//! engine, a registered function, or the host's
//! [`ModelAccess`](crate::eval::ModelAccess) implementation.

use crate::ast::span::Span;
use std::sync::Arc;
use thiserror::Error;

// ── Parse errors ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
#[error("{message}{}", .span.location())]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Format the error with source context for display.
    pub fn format_with_source(&self, source: &str) -> String {
        let line = self.span.begin_line.max(1) as usize;
        let col = self.span.begin_column.max(1) as usize;
        let source_line = source.lines().nth(line - 1).unwrap_or("");

        let width = if self.span.end_line == self.span.begin_line {
            (self.span.end_column - self.span.begin_column).max(1) as usize
        } else {
            1
        };
        let pointer = " ".repeat(col.saturating_sub(1)) + &"^".repeat(width);

        let mut output = format!(
            "Error: {}\n --> {line}:{col}\n  |\n{line:>3} | {source_line}\n    | {pointer}",
            self.message
        );
        if let Some(hint) = &self.hint {
            output.push_str(&format!("\n  = hint: {hint}"));
        }
        output
    }
}

// ── Eval errors ─────────────────────────────────────────────────────────

/// An error that occurs while evaluating an expression or expanding a
/// template.
///
/// Carries a structured [`EvalErrorKind`], a human-readable message, an
/// optional source [`Span`], and an optional underlying cause.
///
/// # Error chaining
///
/// When a registered function or a host's
/// [`ModelAccess`](crate::eval::ModelAccess) implementation catches an
/// underlying error, it can preserve the original chain using
/// [`with_source`](EvalError::with_source):
///
/// ```rust
/// use stencil_lang::EvalError;
///
/// fn example() -> Result<(), EvalError> {
///     let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
///     Err(EvalError::host_error("failed to load model").with_source(io_err))
/// }
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}{}", .span.map(|s| s.location()).unwrap_or_default())]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Option<Span>,
    pub message: String,
    /// The underlying error that caused this evaluation error, if any.
    ///
    /// Wrapped in `Arc` so that `EvalError` remains `Clone`.
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            span: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a source location. The first defined span wins, so the
    /// innermost expression that failed keeps its position while outer
    /// frames pass the error through unchanged.
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() && span.is_defined() {
            self.span = Some(span);
        }
        self
    }

    /// Attach an underlying error cause to this evaluation error.
    ///
    /// The source is wrapped in an `Arc` so that `EvalError` remains
    /// `Clone`.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    // Convenience constructors for the engine's diagnostics

    pub fn unbound_variable(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnboundVariable,
            format!("There is no binding for the variable '{name}'"),
        )
    }

    pub fn no_such_property(name: &str) -> Self {
        Self::new(
            EvalErrorKind::NoSuchProperty,
            format!("No property '{name}'"),
        )
    }

    pub fn properties_unsupported(type_name: &str) -> Self {
        Self::new(
            EvalErrorKind::NoSuchProperty,
            format!("Cannot access properties of a value of type {type_name}"),
        )
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownFunction,
            format!("There is no function '{name}'"),
        )
    }

    pub fn arity_exact(name: &str, expected: usize, actual: usize) -> Self {
        Self::new(
            EvalErrorKind::ArityMismatch,
            format!("The function '{name}' requires exactly {expected} arguments, got {actual}"),
        )
    }

    pub fn arity_at_least(name: &str, expected: usize, actual: usize) -> Self {
        Self::new(
            EvalErrorKind::ArityMismatch,
            format!("The function '{name}' requires at least {expected} arguments, got {actual}"),
        )
    }

    pub fn function_failed(name: &str, cause: EvalError) -> Self {
        Self::new(
            EvalErrorKind::FunctionFailed,
            format!("The function '{name}' failed: {cause}"),
        )
        .with_source(cause)
    }

    pub fn index_not_numeric(got: &str) -> Self {
        Self::new(
            EvalErrorKind::IndexNotNumeric,
            format!("Collection index must be a number, got {got}"),
        )
    }

    pub fn not_indexable(got: &str) -> Self {
        Self::new(
            EvalErrorKind::NotIndexable,
            format!("Not an indexed value: {got}"),
        )
    }

    pub fn not_iterable(got: &str) -> Self {
        Self::new(
            EvalErrorKind::NotIterable,
            format!("Not a collection in foreach: {got}"),
        )
    }

    pub fn not_boolean_context() -> Self {
        Self::new(
            EvalErrorKind::NotBooleanContext,
            "Only simple expressions may be used in a boolean context",
        )
    }

    pub fn no_such_template(name: &str) -> Self {
        Self::new(
            EvalErrorKind::NoSuchTemplate,
            format!("No such template '{name}'"),
        )
    }

    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        Self::new(
            EvalErrorKind::TypeMismatch,
            format!("expected {expected}, got {got}"),
        )
    }

    pub fn host_error(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::HostError, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// A `$var` access with no binding in any enclosing scope.
    UnboundVariable,
    /// A property access the target does not support.
    NoSuchProperty,
    /// A `#name(..)` call naming an unregistered function.
    UnknownFunction,
    /// A function called with the wrong number of arguments.
    ArityMismatch,
    /// A registered function raised an error while executing.
    FunctionFailed,
    IndexNotNumeric,
    NotIndexable,
    NotIterable,
    /// Embedded markup used where a truth value is required.
    NotBooleanContext,
    /// A `-> name` reference the template scope cannot resolve.
    NoSuchTemplate,
    TypeMismatch,
    HostError,
}
