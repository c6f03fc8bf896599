//! SSA values and instructions.
//!
//! Every value a function can reference lives in the function's value table and is
//! addressed by a [`ValueId`]. A value is either produced by an instruction inside a
//! block, by a phi node, or is a block-less value such as a parameter, a pooled literal
//! constant, a captured free variable, an extern symbol or an undefined placeholder.
//!
//! Values are never copied: instructions refer to their operands by id, and values from
//! an enclosing function are reached through [`ValueRef`] (function + value).

use std::fmt;

use crate::{
    ssa::{BlockId, ConstValue, FunctionId, PhiNode, SsaOp, SsaType},
    syntax::Span,
};

define_id!(
    /// Identifies a value within its function.
    ValueId, "v"
);

/// A value addressed across function boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueRef {
    /// Owning function
    pub function: FunctionId,
    /// Value within that function
    pub value: ValueId,
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.function, self.value)
    }
}

/// What produced a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// The n-th formal parameter.
    Parameter {
        /// Position in the parameter list
        index: usize,
    },
    /// A literal constant from the source, pooled per function.
    Const(ConstValue),
    /// An instruction inside a block.
    Instruction(SsaOp),
    /// A phi node at a block entry.
    Phi(PhiNode),
    /// A variable of an enclosing function visible inside a closure.
    ///
    /// `captured` is `None` only while the builder has not resolved it yet.
    FreeValue {
        /// Variable name
        name: String,
        /// The enclosing function's value
        captured: Option<ValueRef>,
    },
    /// Placeholder for a name that resolves to nothing.
    Undefined {
        /// The unresolved name
        name: String,
    },
    /// A reference to a function of the program, used as a callee or closure value.
    Function(FunctionId),
    /// A builtin symbol (function or superglobal) provided by the runtime.
    Extern {
        /// Symbol name
        name: String,
    },
    /// A removed trivial phi, forwarding to the value that replaced it.
    Replaced(ValueId),
}

/// One entry of a function's value table.
#[derive(Debug, Clone)]
pub struct SsaValue {
    id: ValueId,
    kind: ValueKind,
    ty: SsaType,
    span: Span,
    /// Block that defines the value, for instructions and phis.
    block: Option<BlockId>,
    /// Source variable this value was last written to, for dumps.
    name: Option<String>,
}

impl SsaValue {
    pub(crate) fn new(
        id: ValueId,
        kind: ValueKind,
        ty: SsaType,
        span: Span,
        block: Option<BlockId>,
    ) -> Self {
        Self {
            id,
            kind,
            ty,
            span,
            block,
            name: None,
        }
    }

    /// Returns the value id.
    #[must_use]
    pub const fn id(&self) -> ValueId {
        self.id
    }

    /// Returns what produced this value.
    #[must_use]
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Returns the inferred type.
    #[must_use]
    pub fn ty(&self) -> &SsaType {
        &self.ty
    }

    /// Returns the source span that was active when the value was created.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    /// Returns the defining block, if the value lives in one.
    #[must_use]
    pub const fn block(&self) -> Option<BlockId> {
        self.block
    }

    /// Returns the source variable name attached to this value, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the operation for instruction values.
    #[must_use]
    pub fn op(&self) -> Option<&SsaOp> {
        match &self.kind {
            ValueKind::Instruction(op) => Some(op),
            _ => None,
        }
    }

    /// Returns the phi node for phi values.
    #[must_use]
    pub fn phi(&self) -> Option<&PhiNode> {
        match &self.kind {
            ValueKind::Phi(phi) => Some(phi),
            _ => None,
        }
    }

    /// Returns the constant for literal constants and folded `Const` instructions.
    #[must_use]
    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.kind {
            ValueKind::Const(value) | ValueKind::Instruction(SsaOp::Const { value }) => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Returns `true` for undefined placeholders.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, ValueKind::Undefined { .. })
    }

    /// Returns `true` for values produced by an instruction in a block.
    #[must_use]
    pub fn is_instruction(&self) -> bool {
        matches!(self.kind, ValueKind::Instruction(_))
    }

    /// Returns the values this value reads.
    #[must_use]
    pub fn operands(&self) -> Vec<ValueId> {
        match &self.kind {
            ValueKind::Instruction(op) => op.operands(),
            ValueKind::Phi(phi) => phi.operands().iter().map(|o| o.value()).collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn kind_mut(&mut self) -> &mut ValueKind {
        &mut self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: ValueKind) {
        self.kind = kind;
    }

    pub(crate) fn set_ty(&mut self, ty: SsaType) {
        self.ty = ty;
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        if self.name.is_none() {
            self.name = Some(name.to_string());
        }
    }
}

impl fmt::Display for SsaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ", self.id)?;
        match &self.kind {
            ValueKind::Parameter { index } => write!(f, "param #{index}")?,
            ValueKind::Const(value) => write!(f, "const {value}")?,
            ValueKind::Instruction(op) => write!(f, "{op}")?,
            ValueKind::Phi(phi) => write!(f, "{phi}")?,
            ValueKind::FreeValue { name, captured } => match captured {
                Some(r) => write!(f, "free ${name} <- {r}")?,
                None => write!(f, "free ${name}")?,
            },
            ValueKind::Undefined { name } => write!(f, "undefined {name}")?,
            ValueKind::Function(id) => write!(f, "function {id}")?,
            ValueKind::Extern { name } => write!(f, "extern {name}")?,
            ValueKind::Replaced(v) => write!(f, "replaced by {v}")?,
        }
        write!(f, " : {}", self.ty)
    }
}
