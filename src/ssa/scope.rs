//! Scope and variable resolution.
//!
//! Variables are renamed into SSA values while the function is being built, in a single
//! pass, following the on-the-fly construction of Braun et al. ("Simple and Efficient
//! Construction of Static Single Assignment Form"):
//!
//! - [`SsaFunction::write_variable`] records the current value of a name in a block.
//! - [`SsaFunction::read_variable`] returns the local definition, or walks predecessors.
//!   A block with one predecessor forwards the read, a block with several creates a phi,
//!   and an unsealed block creates an *incomplete* phi that is filled when the block is
//!   sealed.
//! - [`SsaFunction::seal_block`] declares that all predecessors of a block are known and
//!   completes its pending phis.
//! - Trivial phis are removed immediately and replaced by a forwarding entry, so a read
//!   that only has one reaching definition returns that definition's identity.
//!
//! Every result is memoized per (block, name), so repeated reads never create a second phi.
//!
//! # Misses
//!
//! A read that reaches the entry block without a definition produces a
//! [`ValueKind::FreeValue`] placeholder, queued in [`Scope`] as pending. The function
//! builder resolves pending free values against the enclosing function (closures), the
//! builtin symbol table, or as undefined. The placeholder is memoized per name, so the
//! resolution, and any diagnostic it reports, happens once. Reads in unreachable
//! predecessor-less blocks yield a silent undefined placeholder.

use std::collections::HashMap;

use crate::ssa::{
    BlockId, FunctionId, PhiNode, PhiOperand, SsaFunction, SsaType, ValueId, ValueKind,
};

/// Per-function symbol table.
///
/// Holds the current definition of every variable per block, the incomplete phis of
/// unsealed blocks and the free values awaiting resolution.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Enclosing function whose scope reads fall through to.
    pub(crate) parent: Option<FunctionId>,
    defs: HashMap<BlockId, HashMap<String, ValueId>>,
    incomplete: HashMap<BlockId, Vec<(String, ValueId)>>,
    free: HashMap<String, ValueId>,
    pending: Vec<ValueId>,
}

impl Scope {
    /// Returns the function this scope falls back to on a miss.
    #[must_use]
    pub const fn parent(&self) -> Option<FunctionId> {
        self.parent
    }

    /// Returns the value `name` holds at the end of `block`, without resolving through
    /// predecessors.
    #[must_use]
    pub fn lookup(&self, block: BlockId, name: &str) -> Option<ValueId> {
        self.defs.get(&block).and_then(|d| d.get(name)).copied()
    }

    /// Returns the names defined (or memoized) in `block`, sorted.
    #[must_use]
    pub fn names_in(&self, block: BlockId) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .defs
            .get(&block)
            .map(|d| d.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Returns the number of phis still waiting for their block to be sealed.
    #[must_use]
    pub fn incomplete_count(&self) -> usize {
        self.incomplete.values().map(Vec::len).sum()
    }

    pub(crate) fn rewrite(&mut self, map: impl Fn(ValueId) -> ValueId) {
        for defs in self.defs.values_mut() {
            for value in defs.values_mut() {
                *value = map(*value);
            }
        }
    }
}

impl SsaFunction {
    /// Records that `name` holds `value` at the current end of `block`.
    pub fn write_variable(&mut self, name: &str, block: BlockId, value: ValueId) {
        log::trace!("[{}] write ${} = {} in {}", self.name(), name, value, block);
        // pooled values are shared by every name bound to them
        if let Some(v) = self.value_mut(value).filter(|v| {
            !matches!(
                v.kind(),
                ValueKind::Const(_) | ValueKind::Extern { .. } | ValueKind::Function(_)
            )
        }) {
            v.set_name(name);
        }
        self.scope
            .defs
            .entry(block)
            .or_default()
            .insert(name.to_string(), value);
    }

    /// Returns the value `name` holds at the current end of `block`.
    ///
    /// Never fails: misses yield placeholders (see the module documentation).
    pub fn read_variable(&mut self, name: &str, block: BlockId) -> ValueId {
        if let Some(value) = self.scope.lookup(block, name) {
            return self.resolve(value);
        }
        self.read_variable_recursive(name, block)
    }

    fn read_variable_recursive(&mut self, name: &str, block: BlockId) -> ValueId {
        let (sealed, preds) = match self.block(block) {
            Some(b) => (b.is_sealed(), b.predecessors().to_vec()),
            None => return self.dead_value(name),
        };

        let value = if !sealed {
            let phi = self.add_phi(block, PhiNode::new(name), self.span());
            log::debug!("[{}] incomplete phi {} for ${} in {}", self.name(), phi, name, block);
            self.scope
                .incomplete
                .entry(block)
                .or_default()
                .push((name.to_string(), phi));
            phi
        } else if preds.len() == 1 {
            self.read_variable(name, preds[0])
        } else if preds.is_empty() {
            if block == self.entry() {
                self.free_value(name)
            } else {
                self.dead_value(name)
            }
        } else {
            let phi = self.add_phi(block, PhiNode::new(name), self.span());
            self.write_variable(name, block, phi);
            self.add_phi_operands(name, phi, block)
        };

        self.write_variable(name, block, value);
        value
    }

    fn add_phi_operands(&mut self, name: &str, phi: ValueId, block: BlockId) -> ValueId {
        let preds: Vec<BlockId> = self
            .block(block)
            .map(|b| b.predecessors().to_vec())
            .unwrap_or_default()
            .into_iter()
            .filter(|pred| !self.is_unreachable(*pred))
            .collect();

        let operands: Vec<PhiOperand> = preds
            .into_iter()
            .map(|pred| PhiOperand::new(self.read_variable(name, pred), pred))
            .collect();

        let ty = self.join_types(operands.iter().map(PhiOperand::value), phi);
        if let Some(value) = self.value_mut(phi) {
            if let ValueKind::Phi(node) = value.kind_mut() {
                node.set_operands(operands);
            }
            value.set_ty(ty);
        }
        self.try_remove_trivial_phi(phi)
    }

    fn join_types(&self, values: impl Iterator<Item = ValueId>, this: ValueId) -> SsaType {
        let types: Vec<SsaType> = values
            .filter(|v| *v != this)
            .filter_map(|v| self.value(self.resolve(v)).map(|v| v.ty().clone()))
            .collect();
        SsaType::union(&types)
    }

    fn try_remove_trivial_phi(&mut self, phi: ValueId) -> ValueId {
        let (trivial, block) = match self.value(phi) {
            Some(value) => match value.phi() {
                Some(node) => {
                    let resolved: Vec<ValueId> = node
                        .operands()
                        .iter()
                        .map(|o| self.resolve(o.value()))
                        .collect();
                    let mut settled = PhiNode::new(node.variable());
                    settled.set_operands(
                        resolved
                            .iter()
                            .zip(node.operands())
                            .map(|(v, o)| PhiOperand::new(*v, o.predecessor()))
                            .collect(),
                    );
                    (settled.trivial_value(phi), value.block())
                }
                None => return phi,
            },
            None => return phi,
        };

        let Some(same) = trivial else {
            return phi;
        };
        let same = match same {
            Some(v) => v,
            None => {
                let name = self
                    .value(phi)
                    .and_then(|v| v.phi())
                    .map(|p| p.variable().to_string())
                    .unwrap_or_default();
                self.dead_value(&name)
            }
        };

        log::debug!("[{}] trivial phi {} replaced by {}", self.name(), phi, same);

        let users: Vec<ValueId> = self
            .values()
            .iter()
            .filter(|v| v.id() != phi)
            .filter(|v| v.phi().is_some_and(|p| !p.is_incomplete() && p.uses(phi)))
            .map(|v| v.id())
            .collect();

        if let Some(value) = self.value_mut(phi) {
            value.set_kind(ValueKind::Replaced(same));
        }
        if let Some(b) = block.and_then(|b| self.block_mut(b)) {
            b.remove_phi(phi);
        }

        for user in users {
            if self.value(user).is_some_and(|v| v.phi().is_some()) {
                self.try_remove_trivial_phi(user);
            }
        }
        same
    }

    /// Declares that all predecessors of `block` are known and completes its phis.
    pub fn seal_block(&mut self, block: BlockId) {
        if self.block(block).map_or(true, |b| b.is_sealed()) {
            return;
        }
        log::debug!("[{}] seal {}", self.name(), block);
        let pending = self.scope.incomplete.remove(&block).unwrap_or_default();
        for (name, phi) in pending {
            self.add_phi_operands(&name, phi, block);
        }
        if let Some(b) = self.block_mut(block) {
            b.seal();
        }
    }

    /// Takes the free values created since the last call.
    pub fn take_pending_free_values(&mut self) -> Vec<ValueId> {
        std::mem::take(&mut self.scope.pending)
    }

    /// Creates a free value bound to `captured` and defines `name` with it in `block`.
    pub(crate) fn bind_free_value(
        &mut self,
        name: &str,
        block: BlockId,
        captured: Option<crate::ssa::ValueRef>,
        ty: SsaType,
    ) -> ValueId {
        let id = self.add_value(
            ValueKind::FreeValue {
                name: name.to_string(),
                captured,
            },
            ty,
            self.span(),
        );
        self.write_variable(name, block, id);
        id
    }

    fn free_value(&mut self, name: &str) -> ValueId {
        if let Some(id) = self.scope.free.get(name) {
            return *id;
        }
        let id = self.add_value(
            ValueKind::FreeValue {
                name: name.to_string(),
                captured: None,
            },
            SsaType::any(),
            self.span(),
        );
        self.scope.free.insert(name.to_string(), id);
        self.scope.pending.push(id);
        id
    }

    fn dead_value(&mut self, name: &str) -> ValueId {
        self.add_value(
            ValueKind::Undefined {
                name: name.to_string(),
            },
            SsaType::any(),
            self.span(),
        )
    }
}
