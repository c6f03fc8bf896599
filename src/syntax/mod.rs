//! The parse tree consumed by the builder.
//!
//! Lexing and parsing live outside this crate. A front end (a grammar-driven parser, a
//! test, a fuzzer) hands over a [`SourceFile`] built from the closed node types defined
//! here. The builder only looks at node kinds, child accessors and [`Span`]s.
//!
//! # Error recovery
//!
//! Parsers with error recovery produce incomplete trees. This shows up in two ways:
//! - children that may be absent are `Option`s (`Assign { value: None, .. }`)
//! - whole subtrees that could not be recognized are `ExprKind::Error` / `StmtKind::Error`
//!
//! Neither is exceptional. The builder records a `MissingNode` diagnostic and keeps going.
//!
//! # Constructing trees by hand
//!
//! Every node type has small constructor helpers, so tests and embedders can write trees
//! without spelling out every span:
//!
//! ```rust
//! use phpscope::syntax::{BinaryOperator, Expr, SourceFile, Stmt};
//!
//! // $a = 1 + 1;
//! let file = SourceFile::new(
//!     "main.php",
//!     vec![Stmt::expr(Expr::assign(
//!         Expr::var("a"),
//!         Expr::binary(BinaryOperator::Add, Expr::int(1), Expr::int(1)),
//!     ))],
//! );
//! assert_eq!(file.items.len(), 1);
//! ```

mod expr;
mod stmt;

pub use expr::{
    ArrayItem, ArrowFnDecl, AssignOp, BinaryOperator, CastKind, ClassRef, ClosureDecl,
    ClosureUse, Expr, ExprKind, IncludeKind, LogicalOperator, MagicConst, UnaryOperator,
};
pub use stmt::{
    Catch, ClassDecl, ClassKind, ClassMember, ConstDecl, ElseIf, FunctionDecl, MemberKind,
    Modifier, Param, Stmt, StmtKind, StaticVar, SwitchCase, TypeHint, UseDecl, UseKind,
};

use std::fmt;

/// A source range attached to every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// 1-based line of `start`
    pub line: u32,
    /// 1-based column of `start`
    pub column: u32,
}

impl Span {
    /// Creates a span.
    #[must_use]
    pub const fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Creates a span covering a single line, for hand-built trees.
    #[must_use]
    pub const fn line(line: u32) -> Self {
        Self {
            start: 0,
            end: 0,
            line,
            column: 1,
        }
    }

    /// Returns `true` if no position information is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Span::default()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A possibly qualified name, such as `foo`, `A\B\C` or `\strlen`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    /// Name segments, outermost namespace first
    pub parts: Vec<String>,
    /// Written with a leading `\`
    pub fully_qualified: bool,
}

impl Name {
    /// Parses a name written with `\` separators.
    ///
    /// ```rust
    /// use phpscope::syntax::Name;
    ///
    /// let name = Name::parse("\\App\\Models\\User");
    /// assert!(name.fully_qualified);
    /// assert_eq!(name.last(), "User");
    /// assert_eq!(name.namespace_path(), "App.Models");
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let fully_qualified = text.starts_with('\\');
        let parts = text
            .split('\\')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            parts,
            fully_qualified,
        }
    }

    /// Creates an unqualified single-segment name.
    #[must_use]
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            parts: vec![name.into()],
            fully_qualified: false,
        }
    }

    /// The last segment.
    #[must_use]
    pub fn last(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    /// Returns `true` for a single unqualified segment.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1 && !self.fully_qualified
    }

    /// The namespace segments joined with `.`, without the last segment.
    #[must_use]
    pub fn namespace_path(&self) -> String {
        match self.parts.split_last() {
            Some((_, ns)) => ns.join("."),
            None => String::new(),
        }
    }

    /// All segments joined with `.`.
    #[must_use]
    pub fn dotted(&self) -> String {
        self.parts.join(".")
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fully_qualified {
            write!(f, "\\")?;
        }
        write!(f, "{}", self.parts.join("\\"))
    }
}

/// The root of a parse tree: one compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Unit identity used in diagnostics
    pub name: String,
    /// Top-level statements
    pub items: Vec<Stmt>,
    /// Number of syntax errors the parser recovered from
    pub errors: usize,
}

impl SourceFile {
    /// Creates an error-free source file.
    #[must_use]
    pub fn new(name: impl Into<String>, items: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            items,
            errors: 0,
        }
    }

    /// Sets the number of parser errors.
    #[must_use]
    pub fn with_errors(mut self, errors: usize) -> Self {
        self.errors = errors;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_parse() {
        let n = Name::parse("A\\B\\C");
        assert_eq!(n.parts, vec!["A", "B", "C"]);
        assert!(!n.fully_qualified);
        assert_eq!(n.dotted(), "A.B.C");
        assert_eq!(n.namespace_path(), "A.B");
        assert_eq!(n.to_string(), "A\\B\\C");

        let s = Name::simple("foo");
        assert!(s.is_simple());
        assert_eq!(s.namespace_path(), "");
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(3, 9, 2, 4).to_string(), "2:4");
        assert!(Span::default().is_empty());
        assert!(!Span::line(1).is_empty());
    }
}
