//! Static Single Assignment (SSA) form for PHP compilation units.
//!
//! This module holds the intermediate representation a [`Program`] is made of, and the
//! [`FunctionBuilder`] the driver in [`crate::build`] uses to produce it. Every variable
//! is defined exactly once; control-flow joins merge definitions through phi values.
//!
//! # Architecture
//!
//! - [`types`] - interned primitive types, maps and nominal class types
//! - [`value`] - literal constants and constant folding
//! - [`ops`] - instruction operations and block terminators
//! - [`instruction`] - values: parameters, constants, instructions, phis, free values
//! - [`phi`] - phi nodes and their operands
//! - [`block`] - basic blocks
//! - [`function`] - one function, closure, method or namespace initializer
//! - [`scope`] - per-function variable versioning
//! - [`blueprint`] - classes, interfaces and traits, with member merging
//! - [`library`] - one namespace
//! - [`program`] - everything built from one compilation unit
//! - [`diagnostics`] - recoverable problems found while building
//! - [`builder`] - function nesting, source ranges and emission
//!
//! # Construction
//!
//! Variables are versioned on the fly while statements are lowered (Braun et al.): a
//! write records the defining value for the current block, a read walks predecessors,
//! inserting phis at joins. Blocks whose predecessors are not all known yet are kept
//! *unsealed*; reads there produce incomplete phis that are completed when the block is
//! sealed. Phis that turn out to merge a single value are replaced by it.
//!
//! ```text
//! if ($c) { $x = 1; } else { $x = 2; }      b1: jump b3
//! echo $x;                                  b2: jump b3
//!                                           b3: v7 = phi [v3, b1], [v4, b2]
//! ```
//!
//! # References
//!
//! - Braun et al., "Simple and Efficient Construction of Static Single Assignment Form",
//!   CC 2013
//! - Cytron et al., "Efficiently Computing Static Single Assignment Form and the
//!   Control Dependence Graph", ACM TOPLAS 1991

mod block;
mod blueprint;
mod builder;
mod diagnostics;
mod function;
mod instruction;
mod library;
mod ops;
mod phi;
mod program;
mod scope;
mod types;
mod value;

// Re-export primary types at module level
pub use block::{BlockId, SsaBlock};
pub use blueprint::{
    BlueprintId, BlueprintKind, ClassBluePrint, ClassConst, Field, MemberSource, MergeKind,
    MergeOutcome, Method, Modifiers,
};
pub use builder::{FunctionBuilder, LoopTarget, RangeToken};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use function::{FunctionId, FunctionKind, FunctionState, SsaFunction};
pub use instruction::{SsaValue, ValueId, ValueKind, ValueRef};
pub use library::Library;
pub use ops::{BinaryOp, SsaOp, Terminator, UnaryOp};
pub use phi::{PhiNode, PhiOperand};
pub use program::{Package, Program};
pub(crate) use program::{dotted, qualify};
pub use scope::Scope;
pub use types::{SsaType, TypeKind};
pub use value::ConstValue;
