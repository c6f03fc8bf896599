//! # phpscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! phpscope library. Import it to get quick access to everything needed for building
//! and inspecting programs.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all phpscope operations
pub use crate::Error;

/// The result type used throughout phpscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Driver and its configuration
pub use crate::build::{BuildConfig, Builder};

/// Concurrent multi-unit container
pub use crate::workspace::Workspace;

// ================================================================================================
// Parse Tree
// ================================================================================================

/// Nodes handed to the builder
pub use crate::syntax::{
    ArrayItem, AssignOp, BinaryOperator, ClassDecl, ClassKind, ClassRef, ClosureUse, Expr,
    ExprKind, FunctionDecl, LogicalOperator, MemberKind, Modifier, Name, Param, SourceFile,
    Span, Stmt, StmtKind, TypeHint, UnaryOperator, UseDecl, UseKind,
};

// ================================================================================================
// SSA Program
// ================================================================================================

/// Program container, libraries and class blueprints
pub use crate::ssa::{BlueprintId, BlueprintKind, ClassBluePrint, Library, Modifiers, Program};

/// Functions, blocks and values
pub use crate::ssa::{
    BlockId, ConstValue, FunctionId, FunctionKind, SsaBlock, SsaFunction, SsaOp, SsaValue,
    Terminator, ValueId, ValueKind, ValueRef,
};

/// Types
pub use crate::ssa::{SsaType, TypeKind};

/// Diagnostics
pub use crate::ssa::{Diagnostic, DiagnosticKind, Severity};
