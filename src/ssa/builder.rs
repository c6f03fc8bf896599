//! Function and closure construction.
//!
//! The [`FunctionBuilder`] owns the [`Program`] under construction and a stack of frames,
//! one per function being built. The top frame is the function that receives emitted
//! instructions, and its *current block* is the single append target.
//!
//! # Nesting
//!
//! Closures and nested declarations are built depth-first while their enclosing function
//! is still open:
//!
//! ```text
//! push_function(closure)     frames: [main @b3, closure @b0]
//!   ... emit into closure ...
//! pop_function()             frames: [main @b3]   (closure finished)
//! ```
//!
//! The caller's current block lives in its own frame, so it is restored on pop no matter
//! how deeply closures nest. [`FunctionBuilder::add_sub_function`] wraps the pair and
//! guarantees the pop even if the nested build fails or panics.
//!
//! # Source ranges
//!
//! [`FunctionBuilder::set_range`] pushes a span on a range stack and returns a token;
//! everything created until the token is handed to [`FunctionBuilder::restore_range`]
//! carries that span. Nested calls restore the enclosing span.
//!
//! # Variable misses
//!
//! Reads that miss in a function are resolved here, in order: through the enclosing
//! function for closures and arrow functions (the captured value is the enclosing
//! variable's value at creation time), as an extern for registered superglobals, or as
//! an undefined placeholder with one [`DiagnosticKind::UndefinedVariable`] diagnostic.

use std::{
    collections::HashSet,
    panic::{catch_unwind, AssertUnwindSafe},
};

use crate::{
    ssa::{
        BinaryOp, BlockId, BlueprintId, ConstValue, DiagnosticKind, FunctionId, FunctionKind,
        Program, SsaFunction, SsaOp, SsaType, Terminator, UnaryOp, ValueId, ValueKind, ValueRef,
    },
    syntax::Span,
    Error, Result,
};

/// Jump targets of an enclosing loop or `switch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTarget {
    /// Where `break` goes
    pub break_block: BlockId,
    /// Where `continue` goes
    pub continue_block: BlockId,
}

#[derive(Debug)]
struct Frame {
    function: FunctionId,
    block: BlockId,
    loops: Vec<LoopTarget>,
}

/// Proof of a [`FunctionBuilder::set_range`] call, consumed by
/// [`FunctionBuilder::restore_range`].
#[derive(Debug)]
#[must_use = "the range stays active until the token is restored"]
pub struct RangeToken {
    depth: usize,
}

/// Builds the functions of one [`Program`].
#[derive(Debug)]
pub struct FunctionBuilder {
    program: Program,
    package: String,
    frames: Vec<Frame>,
    ranges: Vec<Span>,
    extern_variables: HashSet<String>,
    constant_folding: bool,
    quiet: usize,
}

impl AsMut<FunctionBuilder> for FunctionBuilder {
    fn as_mut(&mut self) -> &mut FunctionBuilder {
        self
    }
}

impl FunctionBuilder {
    /// Creates a builder positioned at the entry block of the program's `main`.
    #[must_use]
    pub fn new(program: Program) -> Self {
        let main = program.main_function();
        let frame = Frame {
            function: main.id(),
            block: main.entry(),
            loops: Vec::new(),
        };
        let package = main.package().to_string();
        Self {
            program,
            package,
            frames: vec![frame],
            ranges: Vec::new(),
            extern_variables: HashSet::new(),
            constant_folding: true,
            quiet: 0,
        }
    }

    /// Registers variable names that resolve to externs instead of undefined, such as
    /// superglobals.
    #[must_use]
    pub fn with_extern_variables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extern_variables = names.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables folding of constant operands.
    #[must_use]
    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.constant_folding = enabled;
        self
    }

    /// Returns the program under construction.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub(crate) fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    /// Consumes the builder and returns the program.
    #[must_use]
    pub fn into_program(self) -> Program {
        self.program
    }

    /// Returns the number of functions currently being built.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self) -> Result<&Frame> {
        self.frames.last().ok_or(Error::UnbalancedFunctionStack)
    }

    fn frame_mut(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or(Error::UnbalancedFunctionStack)
    }

    /// Returns the function receiving instructions.
    pub fn current_function_id(&self) -> Result<FunctionId> {
        Ok(self.frame()?.function)
    }

    /// Returns the function receiving instructions.
    pub fn current_function(&self) -> Result<&SsaFunction> {
        let id = self.current_function_id()?;
        self.program.function(id).ok_or(Error::InvalidFunction(id))
    }

    fn current_function_mut(&mut self) -> Result<&mut SsaFunction> {
        let id = self.current_function_id()?;
        self.program.function_mut(id)
    }

    /// Returns the current append block.
    pub fn current_block(&self) -> Result<BlockId> {
        Ok(self.frame()?.block)
    }

    // ------------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------------

    /// Registers a new open function in the current package.
    ///
    /// `parent` is the enclosing function for closures and nested declarations; its
    /// scope is where misses of a capturing function fall through to.
    pub fn new_func(
        &mut self,
        name: &str,
        kind: FunctionKind,
        library: Option<&str>,
        parent: Option<FunctionId>,
    ) -> Result<FunctionId> {
        let package = self.package.clone();
        let span = self.current_range();
        let id = self.program.new_func(name, kind, &package, library);
        let function = self.program.function_mut(id)?;
        function.set_parent(parent);
        function.set_span(span);
        if let Some(parent) = parent {
            self.program.function_mut(parent)?.add_child(id);
        }
        log::debug!("[builder] new {kind} {name} as {id}");
        Ok(id)
    }

    /// Makes `function` the append target, starting at its entry block.
    ///
    /// The caller's current block stays in its frame and is restored by
    /// [`FunctionBuilder::pop_function`].
    pub fn push_function(&mut self, function: FunctionId) -> Result<()> {
        let entry = self
            .program
            .function(function)
            .ok_or(Error::InvalidFunction(function))?
            .entry();
        self.enter_function(function, entry)
    }

    /// Makes `function` the append target at `block`, without finishing anything.
    pub(crate) fn enter_function(&mut self, function: FunctionId, block: BlockId) -> Result<()> {
        let target = self
            .program
            .function(function)
            .ok_or(Error::InvalidFunction(function))?;
        if target.is_finished() {
            return Err(Error::FunctionFinished(function));
        }
        log::trace!("[builder] enter {} at {}", target.name(), block);
        self.frames.push(Frame {
            function,
            block,
            loops: Vec::new(),
        });
        Ok(())
    }

    /// Leaves the current function without finishing it and returns where it stopped.
    pub(crate) fn leave_function(&mut self) -> Result<(FunctionId, BlockId)> {
        if self.frames.len() <= 1 {
            return Err(Error::UnbalancedFunctionStack);
        }
        let frame = self.frames.pop().ok_or(Error::UnbalancedFunctionStack)?;
        Ok((frame.function, frame.block))
    }

    /// Finishes the current function and returns to its caller.
    pub fn pop_function(&mut self) -> Result<FunctionId> {
        if self.frames.len() <= 1 {
            return Err(Error::UnbalancedFunctionStack);
        }
        self.finish()?;
        Ok(self.leave_function()?.0)
    }

    /// Builds `function` with `build`, with the function pushed for the duration.
    ///
    /// The function is popped (and finished) however `build` ends. An error from `build`
    /// is returned after the pop. A panic is caught: the function is marked partial, a
    /// [`DiagnosticKind::BuilderPanic`] is recorded, and building continues in the caller.
    pub fn add_sub_function<C, F>(ctx: &mut C, function: FunctionId, build: F) -> Result<()>
    where
        C: AsMut<FunctionBuilder>,
        F: FnOnce(&mut C) -> Result<()>,
    {
        let (depth, ranges) = {
            let fb = ctx.as_mut();
            (fb.frames.len(), fb.ranges.len())
        };
        ctx.as_mut().push_function(function)?;

        let outcome = catch_unwind(AssertUnwindSafe(|| build(&mut *ctx)));

        let fb = ctx.as_mut();
        fb.frames.truncate(depth + 1);
        fb.ranges.truncate(ranges);
        match outcome {
            Ok(result) => {
                fb.pop_function()?;
                result
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                let name = fb
                    .program
                    .function(function)
                    .map(|f| f.name().to_string())
                    .unwrap_or_default();
                fb.report(
                    DiagnosticKind::BuilderPanic,
                    format!("building {name} panicked: {message}"),
                );
                fb.program.function_mut(function)?.mark_partial();
                fb.leave_function()?;
                Ok(())
            }
        }
    }

    /// Freezes the current function.
    ///
    /// An unterminated current block receives an implicit `return`. Any other block left
    /// without terminator makes the function partial and is reported as
    /// [`DiagnosticKind::UnterminatedBlock`].
    pub fn finish(&mut self) -> Result<()> {
        if self.current_function()?.is_finished() {
            return Ok(());
        }
        if !self.is_terminated()? {
            self.emit_return(Vec::new())?;
        }
        self.drain_free_values()?;
        let function = self.current_function_mut()?;
        let open = function.finish();
        let name = function.name().to_string();
        log::debug!(
            "[builder] finished {} ({} blocks, {} instructions, {} phis)",
            name,
            function.block_count(),
            function.instruction_count(),
            function.phi_count()
        );
        for block in open {
            self.report(
                DiagnosticKind::UnterminatedBlock,
                format!("block {block} of {name} has no terminator"),
            );
        }
        Ok(())
    }

    /// Declares a parameter of the current function and defines its variable.
    pub fn add_parameter(&mut self, name: &str, ty: SsaType) -> Result<ValueId> {
        let span = self.current_range();
        let block = self.current_block()?;
        let function = self.current_function_mut()?;
        let value = function.add_parameter(name, ty, span)?;
        function.write_variable(name, block, value);
        Ok(value)
    }

    /// Sets the return type of the current function.
    pub fn set_return_type(&mut self, ty: SsaType) -> Result<()> {
        self.current_function_mut()?.set_return_type(ty);
        Ok(())
    }

    /// Attaches the current function to a class.
    pub fn set_blueprint(&mut self, blueprint: BlueprintId) -> Result<()> {
        self.current_function_mut()?.set_blueprint(Some(blueprint));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Source ranges
    // ------------------------------------------------------------------------

    /// Makes `span` the range of everything created until the token is restored.
    ///
    /// An empty span keeps the enclosing range.
    pub fn set_range(&mut self, span: Span) -> RangeToken {
        let depth = self.ranges.len();
        let span = if span.is_empty() {
            self.current_range()
        } else {
            span
        };
        self.ranges.push(span);
        RangeToken { depth }
    }

    /// Restores the range that was active before the matching [`FunctionBuilder::set_range`].
    pub fn restore_range(&mut self, token: RangeToken) {
        self.ranges.truncate(token.depth);
    }

    /// Returns the active range.
    #[must_use]
    pub fn current_range(&self) -> Span {
        self.ranges.last().copied().unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------------

    /// Creates a block in the current function.
    pub fn new_block(&mut self, label: &str) -> Result<BlockId> {
        self.current_function_mut()?.add_block(label)
    }

    /// Makes `block` the append target.
    pub fn switch_to_block(&mut self, block: BlockId) -> Result<()> {
        let function = self.current_function()?;
        if function.block(block).is_none() {
            return Err(Error::InvalidBlock {
                function: function.id(),
                block,
            });
        }
        self.frame_mut()?.block = block;
        Ok(())
    }

    /// Declares that all predecessors of `block` are wired.
    pub fn seal_block(&mut self, block: BlockId) -> Result<()> {
        self.current_function_mut()?.seal_block(block);
        self.drain_free_values()
    }

    /// Resolves the free values that sealing or reading left queued in the current function.
    fn drain_free_values(&mut self) -> Result<()> {
        let depth = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or(Error::UnbalancedFunctionStack)?;
        let function = self.current_function_id()?;
        let pending = self.program.function_mut(function)?.take_pending_free_values();
        for free in pending {
            self.resolve_free_value(depth, function, free)?;
        }
        Ok(())
    }

    /// Returns `true` if the current block already has a terminator.
    pub fn is_terminated(&self) -> Result<bool> {
        let block = self.current_block()?;
        Ok(self
            .current_function()?
            .block(block)
            .is_some_and(|b| b.is_terminated()))
    }

    /// Returns the current block, moving to a fresh unreachable block if it is closed.
    fn open_block(&mut self) -> Result<BlockId> {
        if !self.is_terminated()? {
            return self.current_block();
        }
        let function = self.current_function_mut()?;
        let dead = function.add_block("dead")?;
        function.seal_block(dead);
        self.frame_mut()?.block = dead;
        Ok(dead)
    }

    /// Registers the targets of a loop or `switch`.
    pub fn push_loop(&mut self, target: LoopTarget) -> Result<()> {
        self.frame_mut()?.loops.push(target);
        Ok(())
    }

    /// Unregisters the innermost loop.
    pub fn pop_loop(&mut self) -> Result<()> {
        self.frame_mut()?.loops.pop();
        Ok(())
    }

    /// Returns the targets `levels` loops out (1 is the innermost).
    pub fn loop_target(&self, levels: u32) -> Result<Option<LoopTarget>> {
        let loops = &self.frame()?.loops;
        let levels = levels.max(1) as usize;
        Ok(loops
            .len()
            .checked_sub(levels)
            .and_then(|i| loops.get(i))
            .copied())
    }

    // ------------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------------

    /// Defines `name` as `value` from here on in the current block.
    pub fn write_variable(&mut self, name: &str, value: ValueId) -> Result<()> {
        let block = self.open_block()?;
        self.current_function_mut()?
            .write_variable(name, block, value);
        Ok(())
    }

    /// Returns the value of `name` at the current position.
    ///
    /// Never fails for unknown names: see the module documentation.
    pub fn read_variable(&mut self, name: &str) -> Result<ValueId> {
        self.open_block()?;
        let depth = self.frames.len().saturating_sub(1);
        self.read_in_frame(depth, name)
    }

    /// Binds `name` in the current function to a value of the enclosing function, for
    /// `use` captures.
    pub fn capture(&mut self, name: &str, captured: ValueRef) -> Result<ValueId> {
        let ty = self
            .program
            .resolve_ref(captured)
            .map(|v| v.ty().clone())
            .unwrap_or_default();
        let block = self.open_block()?;
        Ok(self
            .current_function_mut()?
            .bind_free_value(name, block, Some(captured), ty))
    }

    /// Reads `name` in the function enclosing the current one, at its current block.
    pub fn read_outer_variable(&mut self, name: &str) -> Result<ValueRef> {
        let depth = self
            .frames
            .len()
            .checked_sub(2)
            .ok_or(Error::UnbalancedFunctionStack)?;
        let function = self.frames[depth].function;
        let value = self.read_in_frame(depth, name)?;
        Ok(ValueRef { function, value })
    }

    /// Suppresses undefined-variable diagnostics until [`FunctionBuilder::end_quiet`].
    /// Used for `isset`, `empty` and `??` operands.
    pub fn begin_quiet(&mut self) {
        self.quiet += 1;
    }

    /// Ends a [`FunctionBuilder::begin_quiet`] section.
    pub fn end_quiet(&mut self) {
        self.quiet = self.quiet.saturating_sub(1);
    }

    fn read_in_frame(&mut self, depth: usize, name: &str) -> Result<ValueId> {
        let (function, block) = match self.frames.get(depth) {
            Some(frame) => (frame.function, frame.block),
            None => return Err(Error::UnbalancedFunctionStack),
        };
        let target = self.program.function_mut(function)?;
        let value = target.read_variable(name, block);
        let pending = target.take_pending_free_values();
        for free in pending {
            self.resolve_free_value(depth, function, free)?;
        }
        Ok(self.program.function_mut(function)?.resolve(value))
    }

    fn resolve_free_value(&mut self, depth: usize, function: FunctionId, free: ValueId) -> Result<()> {
        let target = self
            .program
            .function(function)
            .ok_or(Error::InvalidFunction(function))?;
        let name = match target.value(free).map(|v| v.kind()) {
            Some(ValueKind::FreeValue {
                name,
                captured: None,
            }) => name.clone(),
            _ => return Ok(()),
        };
        let captures = matches!(target.kind(), FunctionKind::Closure | FunctionKind::Arrow);
        let parent = target.parent();

        let outer_frame = depth
            .checked_sub(1)
            .and_then(|d| self.frames.get(d))
            .map(|f| f.function);
        if let Some(parent) = parent.filter(|p| captures && outer_frame == Some(*p)) {
            let outer = self.read_in_frame(depth - 1, &name)?;
            let outer_value = self
                .program
                .function(parent)
                .and_then(|f| f.value(outer))
                .map(|v| (v.is_undefined(), v.ty().clone()));
            let value = self
                .program
                .function_mut(function)?
                .value_mut(free)
                .ok_or_else(|| malformed_error!("Free value {} vanished", free))?;
            match outer_value {
                Some((false, ty)) => {
                    value.set_kind(ValueKind::FreeValue {
                        name: name.clone(),
                        captured: Some(ValueRef {
                            function: parent,
                            value: outer,
                        }),
                    });
                    value.set_ty(ty);
                    log::debug!("[builder] ${name} captured from {parent}.{outer}");
                }
                _ => value.set_kind(ValueKind::Undefined { name }),
            }
            return Ok(());
        }

        let is_extern = self.extern_variables.contains(&name);
        let value = self
            .program
            .function_mut(function)?
            .value_mut(free)
            .ok_or_else(|| malformed_error!("Free value {} vanished", free))?;
        if is_extern {
            value.set_kind(ValueKind::Extern {
                name: format!("${name}"),
            });
            return Ok(());
        }
        value.set_kind(ValueKind::Undefined { name: name.clone() });
        if self.quiet == 0 {
            self.report(
                DiagnosticKind::UndefinedVariable,
                format!("undefined variable ${name}"),
            );
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Values and instructions
    // ------------------------------------------------------------------------

    /// Returns the type of a value of the current function.
    pub fn value_type(&self, value: ValueId) -> Result<SsaType> {
        let function = self.current_function()?;
        Ok(function
            .value(function.resolve(value))
            .map(|v| v.ty().clone())
            .unwrap_or_default())
    }

    /// Returns the constant a value of the current function holds, if any.
    pub fn value_const(&self, value: ValueId) -> Result<Option<ConstValue>> {
        let function = self.current_function()?;
        Ok(function
            .value(function.resolve(value))
            .and_then(|v| v.const_value())
            .cloned())
    }

    /// Overrides the type of a value of the current function.
    pub fn set_value_type(&mut self, value: ValueId, ty: SsaType) -> Result<()> {
        if let Some(v) = self.current_function_mut()?.value_mut(value) {
            v.set_ty(ty);
        }
        Ok(())
    }

    /// Appends an instruction to the current block.
    pub fn emit_instruction(&mut self, op: SsaOp, ty: SsaType) -> Result<ValueId> {
        let span = self.current_range();
        let block = self.open_block()?;
        self.current_function_mut()?
            .append_instruction(block, op, ty, span)
    }

    /// Returns the pooled literal `value`.
    pub fn emit_const(&mut self, value: ConstValue) -> Result<ValueId> {
        let span = self.current_range();
        Ok(self.current_function_mut()?.const_value(value, span))
    }

    /// Returns the pooled extern symbol `name`.
    pub fn emit_extern(&mut self, name: &str) -> Result<ValueId> {
        let span = self.current_range();
        Ok(self.current_function_mut()?.extern_value(name, span))
    }

    /// Returns the pooled reference to `function`.
    pub fn emit_function_ref(&mut self, function: FunctionId) -> Result<ValueId> {
        let span = self.current_range();
        Ok(self.current_function_mut()?.function_value(function, span))
    }

    /// Creates an undefined placeholder without reporting anything.
    pub fn emit_undefined(&mut self, name: &str) -> Result<ValueId> {
        let span = self.current_range();
        Ok(self.current_function_mut()?.add_value(
            ValueKind::Undefined {
                name: name.to_string(),
            },
            SsaType::any(),
            span,
        ))
    }

    /// Emits a binary operation.
    ///
    /// With constant folding enabled and two constant operands, the operation is
    /// followed by a `Const` instruction holding the result, which is returned.
    pub fn emit_binop(&mut self, op: BinaryOp, left: ValueId, right: ValueId) -> Result<ValueId> {
        let ty = op.result_type(&self.value_type(left)?, &self.value_type(right)?);
        let value = self.emit_instruction(SsaOp::BinOp { op, left, right }, ty)?;
        if !self.constant_folding {
            return Ok(value);
        }
        if let (Some(l), Some(r)) = (self.value_const(left)?, self.value_const(right)?) {
            if let Some(folded) = ConstValue::fold_binary(op, &l, &r) {
                let ty = folded.ty();
                return self.emit_instruction(SsaOp::Const { value: folded }, ty);
            }
        }
        Ok(value)
    }

    /// Emits a unary operation, folded like [`FunctionBuilder::emit_binop`].
    pub fn emit_unop(&mut self, op: UnaryOp, operand: ValueId) -> Result<ValueId> {
        let ty = match op {
            UnaryOp::Not => SsaType::bool(),
            UnaryOp::BitNot => SsaType::int(),
            UnaryOp::Neg | UnaryOp::Plus => {
                let ty = self.value_type(operand)?;
                if ty.is_number() {
                    ty
                } else {
                    SsaType::any()
                }
            }
        };
        let value = self.emit_instruction(SsaOp::UnOp { op, operand }, ty)?;
        if !self.constant_folding {
            return Ok(value);
        }
        if let Some(c) = self.value_const(operand)? {
            if let Some(folded) = ConstValue::fold_unary(op, &c) {
                let ty = folded.ty();
                return self.emit_instruction(SsaOp::Const { value: folded }, ty);
            }
        }
        Ok(value)
    }

    /// Emits a call.
    pub fn emit_call(&mut self, callee: ValueId, args: Vec<ValueId>, ty: SsaType) -> Result<ValueId> {
        self.emit_instruction(SsaOp::Call { callee, args }, ty)
    }

    /// Emits `object[key]` / `object->key`.
    pub fn emit_get_member(&mut self, object: ValueId, key: ValueId, ty: SsaType) -> Result<ValueId> {
        self.emit_instruction(SsaOp::GetMember { object, key }, ty)
    }

    /// Emits `object[key] = value`.
    pub fn emit_set_member(&mut self, object: ValueId, key: ValueId, value: ValueId) -> Result<ValueId> {
        let ty = self.value_type(value)?;
        self.emit_instruction(SsaOp::SetMember { object, key, value }, ty)
    }

    /// Closes the current block with a jump. A no-op when the block is already closed.
    pub fn emit_jump(&mut self, target: BlockId) -> Result<()> {
        if self.is_terminated()? {
            return Ok(());
        }
        let block = self.current_block()?;
        self.current_function_mut()?
            .set_terminator(block, Terminator::Jump { target })
    }

    /// Closes the current block with a conditional branch.
    pub fn emit_branch(&mut self, condition: ValueId, then_block: BlockId, else_block: BlockId) -> Result<()> {
        let block = self.open_block()?;
        self.current_function_mut()?.set_terminator(
            block,
            Terminator::Branch {
                condition,
                then_block,
                else_block,
            },
        )
    }

    /// Closes the current block with a return.
    pub fn emit_return(&mut self, values: Vec<ValueId>) -> Result<()> {
        let block = self.open_block()?;
        self.current_function_mut()?
            .set_terminator(block, Terminator::Return { values })
    }

    /// Closes the current block with a throw.
    pub fn emit_throw(&mut self, value: Option<ValueId>) -> Result<()> {
        let block = self.open_block()?;
        self.current_function_mut()?
            .set_terminator(block, Terminator::Throw { value })
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    /// Records a diagnostic at the active range.
    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let span = self.current_range();
        self.program.report(span, kind, message);
    }
}
