//! Basic blocks.
//!
//! A block holds its phi nodes, its data-flow instructions and a single optional
//! [`Terminator`]. All three lists store [`ValueId`]s into the owning function's value
//! table. Edges are kept in both directions so the scope resolver can walk predecessors
//! and consumers can walk successors without recomputing the CFG.
//!
//! A block is *sealed* once all of its predecessors are known. Reads in unsealed blocks
//! create incomplete phis that are filled when the block is sealed.

use std::fmt;

use crate::ssa::{Terminator, ValueId};

define_id!(
    /// Identifies a basic block within its function.
    BlockId, "b"
);

/// A basic block in SSA form.
#[derive(Debug, Clone)]
pub struct SsaBlock {
    id: BlockId,
    /// Label for dumps, e.g. `if.then`, `loop.header`.
    label: String,
    phis: Vec<ValueId>,
    instructions: Vec<ValueId>,
    terminator: Option<Terminator>,
    predecessors: Vec<BlockId>,
    successors: Vec<BlockId>,
    sealed: bool,
}

impl SsaBlock {
    /// Creates an empty, unsealed block.
    #[must_use]
    pub fn new(id: BlockId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            phis: Vec::new(),
            instructions: Vec::new(),
            terminator: None,
            predecessors: Vec::new(),
            successors: Vec::new(),
            sealed: false,
        }
    }

    /// Returns the block id.
    #[must_use]
    pub const fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the phi nodes at the block entry.
    #[must_use]
    pub fn phis(&self) -> &[ValueId] {
        &self.phis
    }

    /// Returns the data-flow instructions in order.
    #[must_use]
    pub fn instructions(&self) -> &[ValueId] {
        &self.instructions
    }

    /// Returns the terminator, if the block has been closed.
    #[must_use]
    pub fn terminator(&self) -> Option<&Terminator> {
        self.terminator.as_ref()
    }

    /// Returns `true` if a terminator has been set.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    /// Returns the predecessor blocks.
    #[must_use]
    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }

    /// Returns the successor blocks.
    #[must_use]
    pub fn successors(&self) -> &[BlockId] {
        &self.successors
    }

    /// Returns `true` once all predecessors are known.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Returns `true` if the block holds no phis and no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phis.is_empty() && self.instructions.is_empty()
    }

    pub(crate) fn push_phi(&mut self, phi: ValueId) {
        self.phis.push(phi);
    }

    pub(crate) fn remove_phi(&mut self, phi: ValueId) {
        self.phis.retain(|p| *p != phi);
    }

    pub(crate) fn push_instruction(&mut self, value: ValueId) {
        self.instructions.push(value);
    }

    pub(crate) fn set_terminator(&mut self, terminator: Terminator) {
        self.terminator = Some(terminator);
    }

    pub(crate) fn terminator_mut(&mut self) -> Option<&mut Terminator> {
        self.terminator.as_mut()
    }

    pub(crate) fn add_predecessor(&mut self, block: BlockId) {
        if !self.predecessors.contains(&block) {
            self.predecessors.push(block);
        }
    }

    pub(crate) fn add_successor(&mut self, block: BlockId) {
        if !self.successors.contains(&block) {
            self.successors.push(block);
        }
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }
}

impl fmt::Display for SsaBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.label)?;
        if !self.predecessors.is_empty() {
            write!(f, " <- ")?;
            for (i, p) in self.predecessors.iter().enumerate() {
                write!(f, "{}{p}", if i == 0 { "" } else { ", " })?;
            }
        }
        Ok(())
    }
}
