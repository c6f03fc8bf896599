//! SSA operations and block terminators.
//!
//! Every non-phi value produced inside a basic block carries one [`SsaOp`]. Operands are
//! [`ValueId`]s into the owning function's value table, so values are shared by reference
//! and never copied.
//!
//! Control flow is kept out of the instruction stream: each block ends in exactly one
//! [`Terminator`], stored separately on the block. This way `instructions()` on a block
//! yields only data-flow instructions, which is what most downstream consumers iterate.
//!
//! # Operator naming
//!
//! [`BinaryOp`] and [`UnaryOp`] display with short lowercase names (`add`, `concat`, `lt`)
//! through `strum`, which is also the form used in diagnostics and instruction dumps.

#![allow(missing_docs)]

use std::fmt;

use strum::{Display, EnumCount, EnumIter};

use crate::ssa::{BlockId, SsaType, ValueId};

// ============================================================================
// Operators
// ============================================================================

/// Binary operators.
///
/// String concatenation has its own operator instead of being folded into `Add`, so
/// string flows stay distinguishable from arithmetic in taint analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    /// Loose equality `==`
    Eq,
    /// Loose inequality `!=`
    NotEq,
    /// Strict equality `===`
    Identical,
    /// Strict inequality `!==`
    NotIdentical,
    Lt,
    Le,
    Gt,
    Ge,
    /// Three-way comparison `<=>`
    Spaceship,
    /// Logical exclusive or; `&&` and `||` are lowered to control flow instead
    Xor,
    /// Type test `instanceof`
    InstanceOf,
}

impl BinaryOp {
    /// Returns `true` for operators that always produce a boolean.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Identical
                | BinaryOp::NotIdentical
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Xor
                | BinaryOp::InstanceOf
        )
    }

    /// Infers the result type from the operand types.
    #[must_use]
    pub fn result_type(self, left: &SsaType, right: &SsaType) -> SsaType {
        match self {
            _ if self.is_comparison() => SsaType::bool(),
            BinaryOp::Concat => SsaType::string(),
            BinaryOp::Spaceship
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::Mod => SsaType::int(),
            BinaryOp::Div => {
                if left.is_number() && right.is_number() {
                    SsaType::float64()
                } else {
                    SsaType::any()
                }
            }
            _ => {
                if left.ptr_eq(&SsaType::int()) && right.ptr_eq(&SsaType::int()) {
                    SsaType::int()
                } else if left.is_number() && right.is_number() {
                    SsaType::float64()
                } else {
                    SsaType::any()
                }
            }
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "lowercase")]
pub enum UnaryOp {
    /// Logical not `!`
    Not,
    /// Arithmetic negation `-`
    Neg,
    /// Numeric conversion `+`
    Plus,
    /// Bitwise not `~`
    BitNot,
}

// ============================================================================
// Operations
// ============================================================================

/// The operation performed by an SSA instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum SsaOp {
    /// A constant materialized inside a block, produced by constant folding.
    Const { value: super::ConstValue },

    BinOp {
        op: BinaryOp,
        left: ValueId,
        right: ValueId,
    },

    UnOp { op: UnaryOp, operand: ValueId },

    /// Call of a function, closure, method or extern.
    Call { callee: ValueId, args: Vec<ValueId> },

    /// Allocates a container (array) or object; the instruction type says which.
    Make,

    /// Reads `object[key]` or `object->key`.
    GetMember { object: ValueId, key: ValueId },

    /// Writes `object[key] = value`; the instruction value is the stored value.
    SetMember {
        object: ValueId,
        key: ValueId,
        value: ValueId,
    },

    /// Explicit conversion; the target is the instruction type.
    TypeCast { operand: ValueId },

    /// Advances an iterator. The result is a tuple with members `key`, `value` and `ok`.
    Next { iter: ValueId },
}

impl SsaOp {
    /// Returns the values this operation reads.
    #[must_use]
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            SsaOp::Const { .. } | SsaOp::Make => Vec::new(),
            SsaOp::BinOp { left, right, .. } => vec![*left, *right],
            SsaOp::UnOp { operand, .. } | SsaOp::TypeCast { operand } => vec![*operand],
            SsaOp::Call { callee, args } => {
                let mut all = Vec::with_capacity(args.len() + 1);
                all.push(*callee);
                all.extend(args.iter().copied());
                all
            }
            SsaOp::GetMember { object, key } => vec![*object, *key],
            SsaOp::SetMember { object, key, value } => vec![*object, *key, *value],
            SsaOp::Next { iter } => vec![*iter],
        }
    }

    /// Rewrites every operand through `f`.
    pub fn map_operands(&mut self, mut f: impl FnMut(ValueId) -> ValueId) {
        match self {
            SsaOp::Const { .. } | SsaOp::Make => {}
            SsaOp::BinOp { left, right, .. } => {
                *left = f(*left);
                *right = f(*right);
            }
            SsaOp::UnOp { operand, .. } | SsaOp::TypeCast { operand } => *operand = f(*operand),
            SsaOp::Call { callee, args } => {
                *callee = f(*callee);
                for arg in args {
                    *arg = f(*arg);
                }
            }
            SsaOp::GetMember { object, key } => {
                *object = f(*object);
                *key = f(*key);
            }
            SsaOp::SetMember { object, key, value } => {
                *object = f(*object);
                *key = f(*key);
                *value = f(*value);
            }
            SsaOp::Next { iter } => *iter = f(*iter),
        }
    }

    /// Short mnemonic used in dumps.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            SsaOp::Const { .. } => "const",
            SsaOp::BinOp { .. } => "binop",
            SsaOp::UnOp { .. } => "unop",
            SsaOp::Call { .. } => "call",
            SsaOp::Make => "make",
            SsaOp::GetMember { .. } => "get",
            SsaOp::SetMember { .. } => "set",
            SsaOp::TypeCast { .. } => "cast",
            SsaOp::Next { .. } => "next",
        }
    }
}

impl fmt::Display for SsaOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SsaOp::Const { value } => write!(f, "const {value}"),
            SsaOp::BinOp { op, left, right } => write!(f, "{op} {left}, {right}"),
            SsaOp::UnOp { op, operand } => write!(f, "{op} {operand}"),
            SsaOp::Call { callee, args } => {
                write!(f, "call {callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            SsaOp::Make => write!(f, "make"),
            SsaOp::GetMember { object, key } => write!(f, "get {object}[{key}]"),
            SsaOp::SetMember { object, key, value } => {
                write!(f, "set {object}[{key}] = {value}")
            }
            SsaOp::TypeCast { operand } => write!(f, "cast {operand}"),
            SsaOp::Next { iter } => write!(f, "next {iter}"),
        }
    }
}

// ============================================================================
// Terminators
// ============================================================================

/// The control-flow instruction that closes a basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Jump {
        target: BlockId,
    },
    Branch {
        condition: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return {
        values: Vec<ValueId>,
    },
    /// Leaves the function through an exception (`throw`, `exit`).
    Throw {
        value: Option<ValueId>,
    },
}

impl Terminator {
    /// Returns the successor blocks of this terminator.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Jump { target } => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Terminator::Return { .. } | Terminator::Throw { .. } => Vec::new(),
        }
    }

    /// Returns the values this terminator reads.
    #[must_use]
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Terminator::Jump { .. } => Vec::new(),
            Terminator::Branch { condition, .. } => vec![*condition],
            Terminator::Return { values } => values.clone(),
            Terminator::Throw { value } => value.iter().copied().collect(),
        }
    }

    /// Rewrites every operand through `f`.
    pub fn map_operands(&mut self, mut f: impl FnMut(ValueId) -> ValueId) {
        match self {
            Terminator::Jump { .. } => {}
            Terminator::Branch { condition, .. } => *condition = f(*condition),
            Terminator::Return { values } => {
                for value in values {
                    *value = f(*value);
                }
            }
            Terminator::Throw { value } => {
                if let Some(value) = value {
                    *value = f(*value);
                }
            }
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump { target } => write!(f, "jump {target}"),
            Terminator::Branch {
                condition,
                then_block,
                else_block,
            } => write!(f, "if {condition} then {then_block} else {else_block}"),
            Terminator::Return { values } => {
                write!(f, "return")?;
                for (i, value) in values.iter().enumerate() {
                    write!(f, "{}{value}", if i == 0 { " " } else { ", " })?;
                }
                Ok(())
            }
            Terminator::Throw { value: Some(v) } => write!(f, "throw {v}"),
            Terminator::Throw { value: None } => write!(f, "throw"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_operator_names() {
        assert_eq!(BinaryOp::Add.to_string(), "add");
        assert_eq!(BinaryOp::Concat.to_string(), "concat");
        assert_eq!(BinaryOp::NotIdentical.to_string(), "notidentical");
        assert_eq!(UnaryOp::BitNot.to_string(), "bitnot");
        assert_eq!(BinaryOp::iter().count(), BinaryOp::COUNT);
    }

    #[test]
    fn test_result_type() {
        let int = SsaType::int();
        let float = SsaType::float64();
        assert!(BinaryOp::Add.result_type(&int, &int).ptr_eq(&int));
        assert!(BinaryOp::Add.result_type(&int, &float).ptr_eq(&float));
        assert!(BinaryOp::Add.result_type(&int, &SsaType::any()).is_any());
        assert!(BinaryOp::Lt.result_type(&int, &int).ptr_eq(&SsaType::bool()));
        assert!(BinaryOp::Concat
            .result_type(&int, &int)
            .ptr_eq(&SsaType::string()));
    }

    #[test]
    fn test_operands_and_map() {
        let mut op = SsaOp::Call {
            callee: ValueId::new(0),
            args: vec![ValueId::new(1), ValueId::new(2)],
        };
        assert_eq!(op.operands().len(), 3);
        op.map_operands(|v| ValueId::new(v.index() + 10));
        assert_eq!(
            op.operands(),
            vec![ValueId::new(10), ValueId::new(11), ValueId::new(12)]
        );
    }

    #[test]
    fn test_terminator_successors() {
        let t = Terminator::Branch {
            condition: ValueId::new(0),
            then_block: BlockId::new(1),
            else_block: BlockId::new(2),
        };
        assert_eq!(t.successors(), vec![BlockId::new(1), BlockId::new(2)]);
        assert!(Terminator::Return { values: vec![] }
            .successors()
            .is_empty());
        assert_eq!(t.to_string(), "if v0 then b1 else b2");
    }
}
