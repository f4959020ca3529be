use std::fmt;

/// Half-open (line, column) range into source text, 1-based.
///
/// Carried by every AST node so that error messages can point back to
/// the exact piece of source that caused a problem. Spans never affect
/// evaluation semantics and only matter for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub begin_line: i32,
    pub begin_column: i32,
    pub end_line: i32,
    pub end_column: i32,
}

impl Span {
    /// The sentinel span for nodes constructed without source text,
    /// e.g. defaulted `foreach` parameters.
    pub const UNDEFINED: Span = Span {
        begin_line: -1,
        begin_column: -1,
        end_line: -1,
        end_column: -1,
    };

    pub fn new(begin_line: i32, begin_column: i32, end_line: i32, end_column: i32) -> Self {
        Self {
            begin_line,
            begin_column,
            end_line,
            end_column,
        }
    }

    /// Whether this span points into actual source text.
    pub fn is_defined(&self) -> bool {
        self.begin_line >= 0
    }

    /// Merge two spans into one covering both ranges. Undefined spans are
    /// absorbed by defined ones.
    pub fn merge(self, other: Span) -> Span {
        if !self.is_defined() {
            return other;
        }
        if !other.is_defined() {
            return self;
        }
        let begin = (self.begin_line, self.begin_column).min((other.begin_line, other.begin_column));
        let end = (self.end_line, self.end_column).max((other.end_line, other.end_column));
        Span::new(begin.0, begin.1, end.0, end.1)
    }

    /// Suffix to an (error) text describing the source location, or the
    /// empty string when undefined.
    pub fn location(&self) -> String {
        if self.is_defined() {
            format!(" at line {}, column {}", self.begin_line, self.begin_column)
        } else {
            String::new()
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_defined() {
            write!(f, "line {}, column {}", self.begin_line, self.begin_column)
        } else {
            write!(f, "<undefined>")
        }
    }
}

/// Wraps any AST node with its source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    /// A node without a source location.
    pub fn undefined(node: T) -> Self {
        Self {
            node,
            span: Span::UNDEFINED,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}
