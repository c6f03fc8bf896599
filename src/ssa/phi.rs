//! Phi node representation for SSA form.
//!
//! Phi nodes merge values at control flow join points. A phi `v3 = phi(v1 from b1, v2 from b2)`
//! selects `v1` if control arrived from `b1` and `v2` if it arrived from `b2`. Phis are
//! evaluated at block entry, before any instruction of the block.
//!
//! # Placement
//!
//! Phis are created on demand by the scope resolver (see [`crate::ssa::scope`]) when a
//! variable read misses in a block with several predecessors, or in a block whose
//! predecessors are not all known yet. Trivial phis (all operands equal, ignoring
//! self-references) are removed as soon as their operands are known.
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`.

use std::fmt;

use crate::ssa::{BlockId, ValueId};

/// An operand of a phi node: a value coming from a specific predecessor block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhiOperand {
    /// The value providing the operand.
    value: ValueId,
    /// The predecessor block from which this value comes.
    predecessor: BlockId,
}

impl PhiOperand {
    /// Creates a new phi operand.
    ///
    /// # Arguments
    ///
    /// * `value` - The value flowing in
    /// * `predecessor` - The block from which this value comes
    #[must_use]
    pub const fn new(value: ValueId, predecessor: BlockId) -> Self {
        Self { value, predecessor }
    }

    /// Returns the incoming value.
    #[must_use]
    pub const fn value(&self) -> ValueId {
        self.value
    }

    /// Returns the predecessor block.
    #[must_use]
    pub const fn predecessor(&self) -> BlockId {
        self.predecessor
    }
}

impl fmt::Display for PhiOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.value, self.predecessor)
    }
}

/// A phi node merging the reaching definitions of one source variable.
///
/// # Invariants
///
/// - Once complete, the phi has exactly one operand for each predecessor of its block
/// - At most one phi exists per (block, variable) pair
#[derive(Debug, Clone, PartialEq)]
pub struct PhiNode {
    /// The source variable this phi merges, without `$`.
    variable: String,
    /// Operands from each predecessor block.
    operands: Vec<PhiOperand>,
}

impl PhiNode {
    /// Creates a phi node without operands.
    #[must_use]
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            operands: Vec::new(),
        }
    }

    /// Returns the merged variable name.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Returns the operands.
    #[must_use]
    pub fn operands(&self) -> &[PhiOperand] {
        &self.operands
    }

    /// Returns `true` until operands have been attached.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.operands.is_empty()
    }

    /// Replaces all operands at once.
    pub fn set_operands(&mut self, operands: Vec<PhiOperand>) {
        self.operands = operands;
    }

    /// Returns the operand coming from `predecessor`.
    #[must_use]
    pub fn operand_from(&self, predecessor: BlockId) -> Option<&PhiOperand> {
        self.operands.iter().find(|op| op.predecessor == predecessor)
    }

    /// Returns `true` if any operand is `value`.
    #[must_use]
    pub fn uses(&self, value: ValueId) -> bool {
        self.operands.iter().any(|op| op.value == value)
    }

    /// Rewrites every operand value through `f`.
    pub fn map_operands(&mut self, mut f: impl FnMut(ValueId) -> ValueId) {
        for op in &mut self.operands {
            op.value = f(op.value);
        }
    }

    /// Returns the single distinct operand, ignoring references to `this`.
    ///
    /// `Some(None)` means the phi only references itself (or has no operands), which
    /// happens in unreachable loops. `None` means the phi is not trivial.
    #[must_use]
    pub fn trivial_value(&self, this: ValueId) -> Option<Option<ValueId>> {
        let mut same = None;
        for op in &self.operands {
            if Some(op.value) == same || op.value == this {
                continue;
            }
            if same.is_some() {
                return None;
            }
            same = Some(op.value);
        }
        Some(same)
    }
}

impl fmt::Display for PhiNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phi ${}(", self.variable)?;
        for (i, op) in self.operands.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{op}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: usize) -> ValueId {
        ValueId::new(i)
    }

    fn b(i: usize) -> BlockId {
        BlockId::new(i)
    }

    #[test]
    fn test_phi_operands() {
        let mut phi = PhiNode::new("x");
        assert!(phi.is_incomplete());
        phi.set_operands(vec![PhiOperand::new(v(1), b(1)), PhiOperand::new(v(2), b(2))]);
        assert_eq!(phi.operands().len(), 2);
        assert_eq!(phi.operand_from(b(2)).map(PhiOperand::value), Some(v(2)));
        assert!(phi.operand_from(b(3)).is_none());
        assert!(phi.uses(v(1)));
        assert_eq!(phi.to_string(), "phi $x(v1 from b1, v2 from b2)");
    }

    #[test]
    fn test_trivial_value() {
        let this = v(9);
        let mut phi = PhiNode::new("x");
        phi.set_operands(vec![PhiOperand::new(v(1), b(1)), PhiOperand::new(this, b(2))]);
        assert_eq!(phi.trivial_value(this), Some(Some(v(1))));

        phi.set_operands(vec![PhiOperand::new(v(1), b(1)), PhiOperand::new(v(2), b(2))]);
        assert_eq!(phi.trivial_value(this), None);

        phi.set_operands(vec![PhiOperand::new(this, b(1))]);
        assert_eq!(phi.trivial_value(this), Some(None));
    }

    #[test]
    fn test_map_operands() {
        let mut phi = PhiNode::new("x");
        phi.set_operands(vec![PhiOperand::new(v(1), b(1))]);
        phi.map_operands(|_| v(5));
        assert_eq!(phi.operands()[0].value(), v(5));
    }
}
