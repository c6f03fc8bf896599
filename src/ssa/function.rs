//! SSA function representation.
//!
//! An [`SsaFunction`] owns its basic blocks, its value table and its [`Scope`]. Functions
//! are created by the [`crate::ssa::FunctionBuilder`], grow append-only while they are
//! open, and are frozen by [`SsaFunction::finish`]. After that every mutating operation
//! fails with [`crate::Error::FunctionFinished`].
//!
//! # Lifecycle
//!
//! ```text
//! Open ──finish()──> Finished
//!   └────finish() with unterminated blocks──> Partial
//! ```
//!
//! A partial function keeps everything that was built, but strict consumers should skip it.
//!
//! # Nesting
//!
//! Closures and nested declarations are separate functions in the program arena. They keep
//! the id of the enclosing function in [`SsaFunction::parent`] (a relation, not ownership),
//! and the parent lists them in [`SsaFunction::children`].

use std::{collections::HashMap, fmt};

use strum::Display;

use crate::{
    ssa::{
        BlockId, BlueprintId, ConstValue, Scope, SsaBlock, SsaOp, SsaType, SsaValue, Terminator,
        ValueId, ValueKind,
    },
    syntax::Span,
    Error, Result,
};

define_id!(
    /// Identifies a function within its program.
    FunctionId, "f"
);

/// What a function was declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FunctionKind {
    /// Top-level code of the unit
    Main,
    /// Top-level code of a namespace
    Init,
    /// Named function
    Function,
    /// Class method
    Method,
    /// Anonymous function
    Closure,
    /// Arrow function
    Arrow,
}

/// Construction state of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FunctionState {
    /// Accepting blocks and instructions
    Open,
    /// Frozen and consistent
    Finished,
    /// Frozen with consistency problems
    Partial,
}

/// A function in SSA form.
#[derive(Debug, Clone)]
pub struct SsaFunction {
    id: FunctionId,
    name: String,
    kind: FunctionKind,
    /// Package the function was registered in.
    package: String,
    /// Dotted path of the namespace library, if declared inside a namespace.
    library: Option<String>,
    parent: Option<FunctionId>,
    children: Vec<FunctionId>,
    /// Class the function is a method of.
    blueprint: Option<BlueprintId>,
    params: Vec<ValueId>,
    param_names: Vec<String>,
    return_type: SsaType,
    blocks: Vec<SsaBlock>,
    values: Vec<SsaValue>,
    pub(crate) scope: Scope,
    consts: HashMap<String, ValueId>,
    externs: HashMap<String, ValueId>,
    functions: HashMap<FunctionId, ValueId>,
    state: FunctionState,
    span: Span,
}

impl SsaFunction {
    /// Creates an open function with a sealed entry block.
    #[must_use]
    pub fn new(id: FunctionId, name: impl Into<String>, kind: FunctionKind) -> Self {
        let mut entry = SsaBlock::new(BlockId::new(0), "entry");
        entry.seal();
        Self {
            id,
            name: name.into(),
            kind,
            package: String::new(),
            library: None,
            parent: None,
            children: Vec::new(),
            blueprint: None,
            params: Vec::new(),
            param_names: Vec::new(),
            return_type: SsaType::any(),
            blocks: vec![entry],
            values: Vec::new(),
            scope: Scope::default(),
            consts: HashMap::new(),
            externs: HashMap::new(),
            functions: HashMap::new(),
            state: FunctionState::Open,
            span: Span::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Returns the function id.
    #[must_use]
    pub const fn id(&self) -> FunctionId {
        self.id
    }

    /// Returns the function name. Methods are named `Class_method`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns what the function was declared as.
    #[must_use]
    pub const fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// Returns the package the function belongs to.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns the dotted namespace path, if any.
    #[must_use]
    pub fn library(&self) -> Option<&str> {
        self.library.as_deref()
    }

    /// Returns the enclosing function.
    #[must_use]
    pub const fn parent(&self) -> Option<FunctionId> {
        self.parent
    }

    /// Returns the functions declared directly inside this one.
    #[must_use]
    pub fn children(&self) -> &[FunctionId] {
        &self.children
    }

    /// Returns the class this function is a method of.
    #[must_use]
    pub const fn blueprint(&self) -> Option<BlueprintId> {
        self.blueprint
    }

    /// Returns the parameter values in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ValueId] {
        &self.params
    }

    /// Returns the parameter names in declaration order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Returns the declared or inferred return type.
    #[must_use]
    pub fn return_type(&self) -> &SsaType {
        &self.return_type
    }

    /// Returns the scope of this function.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the construction state.
    #[must_use]
    pub const fn state(&self) -> FunctionState {
        self.state
    }

    /// Returns `true` once [`SsaFunction::finish`] has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state != FunctionState::Open
    }

    /// Returns `true` if the function was frozen with consistency problems.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.state == FunctionState::Partial
    }

    /// Returns the declaration span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    /// Returns the entry block id.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        BlockId::new(0)
    }

    /// Returns all blocks in creation order.
    #[must_use]
    pub fn blocks(&self) -> &[SsaBlock] {
        &self.blocks
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns a block by id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&SsaBlock> {
        self.blocks.get(id.index())
    }

    /// Returns the whole value table.
    #[must_use]
    pub fn values(&self) -> &[SsaValue] {
        &self.values
    }

    /// Returns a value by id.
    #[must_use]
    pub fn value(&self, id: ValueId) -> Option<&SsaValue> {
        self.values.get(id.index())
    }

    /// Returns the instruction values of the entry block.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use phpscope::build::Builder;
    /// use phpscope::syntax::{BinaryOperator, Expr, SourceFile, Stmt};
    ///
    /// let file = SourceFile::new("a.php", vec![Stmt::expr(Expr::assign(
    ///     Expr::var("a"),
    ///     Expr::binary(BinaryOperator::Add, Expr::int(1), Expr::int(1)),
    /// ))]);
    /// let program = Builder::new().build(Some(&file))?;
    /// let ins = program.main_function().first_block_instructions();
    /// assert_eq!(ins.len(), 2);
    /// assert_eq!(ins[1].const_value().unwrap().to_string(), "2");
    /// # Ok::<(), phpscope::Error>(())
    /// ```
    #[must_use]
    pub fn first_block_instructions(&self) -> Vec<&SsaValue> {
        self.block_instructions(self.entry())
    }

    /// Returns the instruction values of a block in order.
    #[must_use]
    pub fn block_instructions(&self, block: BlockId) -> Vec<&SsaValue> {
        self.block(block)
            .map(|b| {
                b.instructions()
                    .iter()
                    .filter_map(|v| self.value(*v))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the phi values of a block in order.
    #[must_use]
    pub fn block_phis(&self, block: BlockId) -> Vec<&SsaValue> {
        self.block(block)
            .map(|b| b.phis().iter().filter_map(|v| self.value(*v)).collect())
            .unwrap_or_default()
    }

    /// Returns the total number of instructions across all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instructions().len()).sum()
    }

    /// Returns the total number of phi nodes across all blocks.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.blocks.iter().map(|b| b.phis().len()).sum()
    }

    /// Iterates over all instruction values of all blocks.
    pub fn all_instructions(&self) -> impl Iterator<Item = &SsaValue> {
        self.blocks
            .iter()
            .flat_map(|b| b.instructions().iter())
            .filter_map(|v| self.value(*v))
    }

    /// Returns the blocks that have no terminator.
    #[must_use]
    pub fn unterminated_blocks(&self) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| !b.is_terminated())
            .map(SsaBlock::id)
            .collect()
    }

    /// Returns all free values (captures from the enclosing function).
    #[must_use]
    pub fn free_values(&self) -> Vec<&SsaValue> {
        self.values
            .iter()
            .filter(|v| matches!(v.kind(), ValueKind::FreeValue { .. }))
            .collect()
    }

    /// Follows replaced-phi forwarding to the live value.
    #[must_use]
    pub fn resolve(&self, mut id: ValueId) -> ValueId {
        while let Some(ValueKind::Replaced(next)) = self.value(id).map(SsaValue::kind) {
            if *next == id {
                break;
            }
            id = *next;
        }
        id
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    fn ensure_open(&self) -> Result<()> {
        if self.is_finished() {
            return Err(Error::FunctionFinished(self.id));
        }
        Ok(())
    }

    fn check_block(&self, block: BlockId) -> Result<()> {
        if block.index() >= self.blocks.len() {
            return Err(Error::InvalidBlock {
                function: self.id,
                block,
            });
        }
        Ok(())
    }

    pub(crate) fn set_package(&mut self, package: &str, library: Option<&str>) {
        self.package = package.to_string();
        self.library = library.map(str::to_string);
    }

    pub(crate) fn set_parent(&mut self, parent: Option<FunctionId>) {
        self.parent = parent;
        self.scope.parent = parent;
    }

    pub(crate) fn add_child(&mut self, child: FunctionId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn set_blueprint(&mut self, blueprint: Option<BlueprintId>) {
        self.blueprint = blueprint;
    }

    pub(crate) fn set_return_type(&mut self, ty: SsaType) {
        self.return_type = ty;
    }

    pub(crate) fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub(crate) fn value_mut(&mut self, id: ValueId) -> Option<&mut SsaValue> {
        self.values.get_mut(id.index())
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Option<&mut SsaBlock> {
        self.blocks.get_mut(id.index())
    }

    /// Adds a value that does not live in a block.
    pub(crate) fn add_value(&mut self, kind: ValueKind, ty: SsaType, span: Span) -> ValueId {
        let id = ValueId::new(self.values.len());
        self.values.push(SsaValue::new(id, kind, ty, span, None));
        id
    }

    pub(crate) fn add_block(&mut self, label: &str) -> Result<BlockId> {
        self.ensure_open()?;
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(SsaBlock::new(id, label));
        Ok(id)
    }

    pub(crate) fn add_parameter(&mut self, name: &str, ty: SsaType, span: Span) -> Result<ValueId> {
        self.ensure_open()?;
        let index = self.params.len();
        let id = self.add_value(ValueKind::Parameter { index }, ty, span);
        if let Some(value) = self.value_mut(id) {
            value.set_name(name);
        }
        self.params.push(id);
        self.param_names.push(name.to_string());
        Ok(id)
    }

    /// Returns the pooled constant for `value`, creating it on first use.
    pub(crate) fn const_value(&mut self, value: ConstValue, span: Span) -> ValueId {
        let key = value.pool_key();
        if let Some(id) = self.consts.get(&key) {
            return *id;
        }
        let ty = value.ty();
        let id = self.add_value(ValueKind::Const(value), ty, span);
        self.consts.insert(key, id);
        id
    }

    /// Returns the pooled extern symbol `name`, creating it on first use.
    pub(crate) fn extern_value(&mut self, name: &str, span: Span) -> ValueId {
        if let Some(id) = self.externs.get(name) {
            return *id;
        }
        let id = self.add_value(
            ValueKind::Extern {
                name: name.to_string(),
            },
            SsaType::any(),
            span,
        );
        self.externs.insert(name.to_string(), id);
        id
    }

    /// Returns the pooled reference to function `target`, creating it on first use.
    pub(crate) fn function_value(&mut self, target: FunctionId, span: Span) -> ValueId {
        if let Some(id) = self.functions.get(&target) {
            return *id;
        }
        let id = self.add_value(ValueKind::Function(target), SsaType::any(), span);
        self.functions.insert(target, id);
        id
    }

    /// Appends an instruction to `block`.
    pub(crate) fn append_instruction(
        &mut self,
        block: BlockId,
        op: SsaOp,
        ty: SsaType,
        span: Span,
    ) -> Result<ValueId> {
        self.ensure_open()?;
        self.check_block(block)?;
        let id = ValueId::new(self.values.len());
        self.values.push(SsaValue::new(
            id,
            ValueKind::Instruction(op),
            ty,
            span,
            Some(block),
        ));
        self.blocks[block.index()].push_instruction(id);
        Ok(id)
    }

    /// Adds a phi value to `block` without operands.
    pub(crate) fn add_phi(&mut self, block: BlockId, phi: crate::ssa::PhiNode, span: Span) -> ValueId {
        let id = ValueId::new(self.values.len());
        self.values.push(SsaValue::new(
            id,
            ValueKind::Phi(phi),
            SsaType::any(),
            span,
            Some(block),
        ));
        if let Some(b) = self.block_mut(block) {
            b.push_phi(id);
        }
        id
    }

    /// Closes `block` with `terminator` and wires the successor edges.
    pub(crate) fn set_terminator(&mut self, block: BlockId, terminator: Terminator) -> Result<()> {
        self.ensure_open()?;
        self.check_block(block)?;
        let successors = terminator.successors();
        for succ in &successors {
            self.check_block(*succ)?;
        }
        if self.blocks[block.index()].is_terminated() {
            return Err(malformed_error!(
                "Block {} of {} is already terminated",
                block,
                self.name
            ));
        }
        let unreachable = self.is_unreachable(block);
        self.blocks[block.index()].set_terminator(terminator);
        if unreachable {
            return Ok(());
        }
        for succ in successors {
            self.blocks[block.index()].add_successor(succ);
            self.blocks[succ.index()].add_predecessor(block);
        }
        Ok(())
    }

    /// Returns `true` for a sealed block other than the entry that has no predecessors.
    ///
    /// Such a block can never be entered, so its terminator does not wire any edges.
    #[must_use]
    pub fn is_unreachable(&self, block: BlockId) -> bool {
        block != self.entry()
            && self
                .block(block)
                .is_some_and(|b| b.is_sealed() && b.predecessors().is_empty())
    }

    /// Freezes the function.
    ///
    /// Rewrites all operands through phi forwarding and checks that every block is
    /// terminated. Returns the blocks left without a terminator; if there are any the
    /// function is marked [`FunctionState::Partial`].
    pub(crate) fn finish(&mut self) -> Vec<BlockId> {
        if self.is_finished() {
            return Vec::new();
        }
        self.rewrite_forwarded();
        let open = self.unterminated_blocks();
        self.state = if open.is_empty() {
            FunctionState::Finished
        } else {
            FunctionState::Partial
        };
        open
    }

    /// Marks the function partial regardless of its blocks.
    pub(crate) fn mark_partial(&mut self) {
        self.state = FunctionState::Partial;
    }

    fn rewrite_forwarded(&mut self) {
        let forward: Vec<ValueId> = (0..self.values.len())
            .map(|i| self.resolve(ValueId::new(i)))
            .collect();
        let map = |v: ValueId| forward.get(v.index()).copied().unwrap_or(v);
        for value in &mut self.values {
            match value.kind_mut() {
                ValueKind::Instruction(op) => op.map_operands(map),
                ValueKind::Phi(phi) => phi.map_operands(map),
                _ => {}
            }
        }
        for block in &mut self.blocks {
            if let Some(term) = block.terminator_mut() {
                term.map_operands(map);
            }
        }
        self.scope.rewrite(map);
    }
}

impl fmt::Display for SsaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.kind, self.name)?;
        for (i, (id, name)) in self.params.iter().zip(&self.param_names).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "${name}: {id}")?;
        }
        writeln!(f, ") {}", self.state)?;
        for block in &self.blocks {
            writeln!(f, "  {block}:")?;
            for id in block.phis().iter().chain(block.instructions()) {
                if let Some(value) = self.value(*id) {
                    writeln!(f, "    {value}")?;
                }
            }
            match block.terminator() {
                Some(term) => writeln!(f, "    {term}")?,
                None => writeln!(f, "    <unterminated>")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssa::BinaryOp;

    #[test]
    fn test_constants_are_pooled() {
        let mut func = SsaFunction::new(FunctionId::new(0), "main", FunctionKind::Main);
        let a = func.const_value(ConstValue::Int(1), Span::default());
        let b = func.const_value(ConstValue::Int(1), Span::default());
        let c = func.const_value(ConstValue::Float(1.0), Span::default());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(func.instruction_count(), 0);
    }

    #[test]
    fn test_append_after_finish_fails() -> Result<()> {
        let mut func = SsaFunction::new(FunctionId::new(0), "f", FunctionKind::Function);
        let one = func.const_value(ConstValue::Int(1), Span::default());
        func.append_instruction(
            func.entry(),
            SsaOp::BinOp {
                op: BinaryOp::Add,
                left: one,
                right: one,
            },
            SsaType::int(),
            Span::default(),
        )?;
        func.set_terminator(func.entry(), Terminator::Return { values: vec![] })?;
        assert!(func.finish().is_empty());
        assert_eq!(func.state(), FunctionState::Finished);

        let err = func.append_instruction(func.entry(), SsaOp::Make, SsaType::any(), Span::default());
        assert!(matches!(err, Err(Error::FunctionFinished(_))));
        assert!(func.add_block("late").is_err());
        Ok(())
    }

    #[test]
    fn test_unterminated_block_makes_partial() -> Result<()> {
        let mut func = SsaFunction::new(FunctionId::new(0), "f", FunctionKind::Function);
        let next = func.add_block("next")?;
        func.set_terminator(func.entry(), Terminator::Jump { target: next })?;
        assert_eq!(func.finish(), vec![next]);
        assert!(func.is_partial());
        Ok(())
    }

    #[test]
    fn test_terminator_wires_edges() -> Result<()> {
        let mut func = SsaFunction::new(FunctionId::new(0), "f", FunctionKind::Function);
        let cond = func.const_value(ConstValue::Bool(true), Span::default());
        let then = func.add_block("then")?;
        let other = func.add_block("else")?;
        func.set_terminator(
            func.entry(),
            Terminator::Branch {
                condition: cond,
                then_block: then,
                else_block: other,
            },
        )?;
        assert_eq!(func.blocks()[0].successors(), &[then, other]);
        assert_eq!(func.block(then).map(|b| b.predecessors().to_vec()), Some(vec![func.entry()]));
        assert!(func
            .set_terminator(func.entry(), Terminator::Return { values: vec![] })
            .is_err());
        assert!(func
            .set_terminator(then, Terminator::Jump { target: BlockId::new(99) })
            .is_err());
        Ok(())
    }
}
