//! Recoverable problems found while building a program.
//!
//! Nothing in here aborts a build. Undefined names, duplicate declarations, partial
//! functions and the like are recorded as [`Diagnostic`]s on the [`crate::ssa::Program`]
//! in the order they were found, and construction continues with a placeholder. Each
//! diagnostic carries a machine-checkable [`DiagnosticKind`] so tools can filter without
//! parsing messages.
//!
//! Every diagnostic is mirrored to the `log` facade at `warn` level when it is recorded.

use std::fmt;

use strum::{Display, EnumCount, EnumIter};

use crate::syntax::Span;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// The affected function or class is excluded from strict analyses
    Error,
    /// The program is complete, but a name could not be resolved or was ambiguous
    Warning,
}

/// Machine-checkable diagnostic tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Read of a variable with no reaching definition
    UndefinedVariable,
    /// Call of a name that is neither declared nor builtin
    UndefinedFunction,
    /// Reference to a class that is never declared
    UndefinedClass,
    /// Fetch of an unknown constant
    UndefinedConstant,
    /// Access to a member the class does not have
    UndefinedMember,
    /// Second declaration of a class name
    DuplicateClass,
    /// Second declaration of a constant
    DuplicateConstant,
    /// Second declaration of a function name
    DuplicateFunction,
    /// A block was left without terminator when its function was finished
    UnterminatedBlock,
    /// A class extends or uses itself, directly or indirectly
    InheritanceCycle,
    /// Two merge sources provide the same member
    MemberConflict,
    /// A type hint that could not be interpreted
    MalformedTypeHint,
    /// A required child node is absent, or an error-recovery node was found
    MissingNode,
    /// A construct the builder does not model
    UnsupportedSyntax,
    /// `break`/`continue` outside of a loop, or with too many levels
    InvalidBreak,
    /// A nested function builder panicked
    BuilderPanic,
}

impl DiagnosticKind {
    /// Returns the severity diagnostics of this kind are recorded with.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::DuplicateClass
            | DiagnosticKind::DuplicateFunction
            | DiagnosticKind::UnterminatedBlock
            | DiagnosticKind::InheritanceCycle
            | DiagnosticKind::MissingNode
            | DiagnosticKind::InvalidBreak
            | DiagnosticKind::BuilderPanic => Severity::Error,
            DiagnosticKind::UndefinedVariable
            | DiagnosticKind::UndefinedFunction
            | DiagnosticKind::UndefinedClass
            | DiagnosticKind::UndefinedConstant
            | DiagnosticKind::UndefinedMember
            | DiagnosticKind::DuplicateConstant
            | DiagnosticKind::MemberConflict
            | DiagnosticKind::MalformedTypeHint
            | DiagnosticKind::UnsupportedSyntax => Severity::Warning,
        }
    }
}

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// Compilation unit the problem was found in
    pub unit: String,
    /// Source range that was active when it was found
    pub span: Span,
    /// Error or warning
    pub severity: Severity,
    /// Machine-checkable tag
    pub kind: DiagnosticKind,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic with the default severity of `kind`.
    #[must_use]
    pub fn new(
        unit: impl Into<String>,
        span: Span,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            unit: unit.into(),
            span,
            severity: kind.severity(),
            kind,
            message: message.into(),
        }
    }

    /// Returns `true` for errors.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.unit, self.span, self.severity, self.kind, self.message
        )
    }
}
