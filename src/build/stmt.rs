//! Statement lowering and structured control flow.
//!
//! Every construct creates its blocks up front, wires them, and seals each block as soon
//! as its last predecessor is known. Loop headers stay unsealed until the back edge has
//! been emitted, so variables modified in the body get a phi at the header.

use crate::{
    build::UnitBuilder,
    ssa::{BinaryOp, BlockId, ConstValue, DiagnosticKind, LoopTarget, SsaOp, SsaType, TypeKind, ValueId},
    syntax::{Catch, ConstDecl, ElseIf, Expr, ExprKind, Name, StaticVar, Stmt, StmtKind, SwitchCase},
    Result,
};

/// The value type of elements of a container type.
pub(super) fn element_type(ty: &SsaType) -> SsaType {
    match ty.kind() {
        TypeKind::Map { value, .. } => value.clone(),
        TypeKind::String | TypeKind::Bytes => SsaType::string(),
        _ => SsaType::any(),
    }
}

impl UnitBuilder<'_> {
    pub(super) fn visit_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        stmts.iter().try_for_each(|stmt| self.visit_stmt(Some(stmt)))
    }

    /// Lowers one statement at its own source range.
    pub(super) fn visit_stmt(&mut self, stmt: Option<&Stmt>) -> Result<()> {
        let Some(stmt) = stmt else {
            self.missing("statement")?;
            return Ok(());
        };
        let range = self.fb.set_range(stmt.span);
        log::trace!("[build] {} at {}", stmt.kind_name(), self.fb.current_range());
        let result = self.lower_stmt(stmt);
        self.fb.restore_range(range);
        result
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.visit_expr(expr.as_ref())?;
            }
            StmtKind::Echo(values) => {
                let mut args = Vec::with_capacity(values.len());
                for value in values {
                    args.push(self.visit_expr(Some(value))?);
                }
                self.call_extern("echo", args, SsaType::null())?;
            }
            StmtKind::InlineHtml(text) => {
                let text = self.fb.emit_const(ConstValue::String(text.clone()))?;
                self.call_extern("echo", vec![text], SsaType::null())?;
            }
            StmtKind::If {
                condition,
                then,
                elseifs,
                otherwise,
            } => self.visit_if(condition.as_ref(), then, elseifs, otherwise.as_deref())?,
            StmtKind::While { condition, body } => self.visit_while(condition.as_ref(), body)?,
            StmtKind::DoWhile { body, condition } => self.visit_do_while(body, condition.as_ref())?,
            StmtKind::For {
                init,
                condition,
                step,
                body,
            } => self.visit_for(init, condition, step, body)?,
            StmtKind::Foreach {
                subject,
                key,
                value,
                by_ref: _,
                body,
            } => self.visit_foreach(subject.as_ref(), key.as_ref(), value.as_ref(), body)?,
            StmtKind::Switch { subject, cases } => self.visit_switch(subject.as_ref(), cases)?,
            StmtKind::Break(levels) => self.visit_break(*levels, false)?,
            StmtKind::Continue(levels) => self.visit_break(*levels, true)?,
            StmtKind::Return(value) => {
                let values = match value {
                    Some(value) => vec![self.visit_expr(Some(value))?],
                    None => Vec::new(),
                };
                self.fb.emit_return(values)?;
            }
            StmtKind::Block(body) => self.visit_block(body)?,
            StmtKind::Global(names) => self.visit_global(names)?,
            StmtKind::Static(vars) => self.visit_static(vars)?,
            StmtKind::Unset(targets) => self.visit_unset(targets)?,
            StmtKind::Const(decls) => self.visit_const(decls)?,
            StmtKind::Function(decl) => self.visit_function_decl(decl)?,
            StmtKind::Class(decl) => {
                self.visit_class(decl)?;
            }
            StmtKind::Namespace { name, body } => self.visit_namespace(name.as_ref(), body.as_deref())?,
            StmtKind::Use(imports) => self.visit_use(imports)?,
            StmtKind::Try {
                body,
                catches,
                finally,
            } => self.visit_try(body, catches, finally.as_deref())?,
            StmtKind::Throw(value) => {
                let value = self.visit_expr(value.as_ref())?;
                self.fb.emit_throw(Some(value))?;
            }
            StmtKind::Nop => {}
            StmtKind::Error => {
                self.missing("statement")?;
            }
        }
        Ok(())
    }

    /// Runs `body` with a loop registered for `break` and `continue`.
    fn in_loop<F>(&mut self, target: LoopTarget, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.fb.push_loop(target)?;
        let result = body(self);
        self.fb.pop_loop()?;
        result
    }

    fn visit_if(
        &mut self,
        condition: Option<&Expr>,
        then: &[Stmt],
        elseifs: &[ElseIf],
        otherwise: Option<&[Stmt]>,
    ) -> Result<()> {
        let done = self.fb.new_block("if.done")?;
        self.lower_branch(condition, then, done)?;
        for clause in elseifs {
            let range = self.fb.set_range(clause.span);
            let result = self.lower_branch(clause.condition.as_ref(), &clause.body, done);
            self.fb.restore_range(range);
            result?;
        }
        if let Some(body) = otherwise {
            self.visit_block(body)?;
        }
        self.fb.emit_jump(done)?;
        self.fb.seal_block(done)?;
        self.fb.switch_to_block(done)
    }

    /// Branches on `condition` into `body`, which continues at `done`; lowering
    /// continues on the false edge.
    fn lower_branch(&mut self, condition: Option<&Expr>, body: &[Stmt], done: BlockId) -> Result<()> {
        let condition = self.visit_expr(condition)?;
        let then_block = self.fb.new_block("if.then")?;
        let else_block = self.fb.new_block("if.else")?;
        self.fb.emit_branch(condition, then_block, else_block)?;
        self.fb.seal_block(then_block)?;
        self.fb.seal_block(else_block)?;

        self.fb.switch_to_block(then_block)?;
        self.visit_block(body)?;
        self.fb.emit_jump(done)?;
        self.fb.switch_to_block(else_block)
    }

    fn visit_while(&mut self, condition: Option<&Expr>, body: &[Stmt]) -> Result<()> {
        let header = self.fb.new_block("while.header")?;
        let inner = self.fb.new_block("while.body")?;
        let exit = self.fb.new_block("while.exit")?;

        self.fb.emit_jump(header)?;
        self.fb.switch_to_block(header)?;
        let condition = self.visit_expr(condition)?;
        self.fb.emit_branch(condition, inner, exit)?;
        self.fb.seal_block(inner)?;

        self.fb.switch_to_block(inner)?;
        let target = LoopTarget {
            break_block: exit,
            continue_block: header,
        };
        self.in_loop(target, |unit| unit.visit_block(body))?;
        self.fb.emit_jump(header)?;

        self.fb.seal_block(header)?;
        self.fb.seal_block(exit)?;
        self.fb.switch_to_block(exit)
    }

    fn visit_do_while(&mut self, body: &[Stmt], condition: Option<&Expr>) -> Result<()> {
        let inner = self.fb.new_block("do.body")?;
        let test = self.fb.new_block("do.cond")?;
        let exit = self.fb.new_block("do.exit")?;

        self.fb.emit_jump(inner)?;
        self.fb.switch_to_block(inner)?;
        let target = LoopTarget {
            break_block: exit,
            continue_block: test,
        };
        self.in_loop(target, |unit| unit.visit_block(body))?;
        self.fb.emit_jump(test)?;
        self.fb.seal_block(test)?;

        self.fb.switch_to_block(test)?;
        let condition = self.visit_expr(condition)?;
        self.fb.emit_branch(condition, inner, exit)?;
        self.fb.seal_block(inner)?;
        self.fb.seal_block(exit)?;
        self.fb.switch_to_block(exit)
    }

    fn visit_for(&mut self, init: &[Expr], condition: &[Expr], step: &[Expr], body: &[Stmt]) -> Result<()> {
        for expr in init {
            self.visit_expr(Some(expr))?;
        }
        let header = self.fb.new_block("for.header")?;
        let inner = self.fb.new_block("for.body")?;
        let next = self.fb.new_block("for.step")?;
        let exit = self.fb.new_block("for.exit")?;

        self.fb.emit_jump(header)?;
        self.fb.switch_to_block(header)?;
        let mut test = None;
        for expr in condition {
            test = Some(self.visit_expr(Some(expr))?);
        }
        let test = match test {
            Some(test) => test,
            None => self.fb.emit_const(ConstValue::Bool(true))?,
        };
        self.fb.emit_branch(test, inner, exit)?;
        self.fb.seal_block(inner)?;

        self.fb.switch_to_block(inner)?;
        let target = LoopTarget {
            break_block: exit,
            continue_block: next,
        };
        self.in_loop(target, |unit| unit.visit_block(body))?;
        self.fb.emit_jump(next)?;
        self.fb.seal_block(next)?;

        self.fb.switch_to_block(next)?;
        for expr in step {
            self.visit_expr(Some(expr))?;
        }
        self.fb.emit_jump(header)?;
        self.fb.seal_block(header)?;
        self.fb.seal_block(exit)?;
        self.fb.switch_to_block(exit)
    }

    /// `foreach` pulls one entry per iteration with `Next`, which yields a record with
    /// `ok`, `key` and `value` members.
    fn visit_foreach(
        &mut self,
        subject: Option<&Expr>,
        key: Option<&Expr>,
        value: Option<&Expr>,
        body: &[Stmt],
    ) -> Result<()> {
        let subject = self.visit_expr(subject)?;
        let subject_ty = self.fb.value_type(subject)?;
        let header = self.fb.new_block("foreach.header")?;
        let inner = self.fb.new_block("foreach.body")?;
        let exit = self.fb.new_block("foreach.exit")?;

        self.fb.emit_jump(header)?;
        self.fb.switch_to_block(header)?;
        let entry = self
            .fb
            .emit_instruction(SsaOp::Next { iter: subject }, SsaType::any())?;
        let ok = self.member(entry, "ok", SsaType::bool())?;
        self.fb.emit_branch(ok, inner, exit)?;
        self.fb.seal_block(inner)?;

        self.fb.switch_to_block(inner)?;
        if let Some(key) = key {
            let key_ty = match subject_ty.kind() {
                TypeKind::Map { key, .. } => key.clone(),
                _ => SsaType::any(),
            };
            let current = self.member(entry, "key", key_ty)?;
            self.assign_to(key, current)?;
        }
        let current = self.member(entry, "value", element_type(&subject_ty))?;
        match value {
            Some(value) => self.assign_to(value, current)?,
            None => {
                self.missing("foreach value")?;
            }
        }
        let target = LoopTarget {
            break_block: exit,
            continue_block: header,
        };
        self.in_loop(target, |unit| unit.visit_block(body))?;
        self.fb.emit_jump(header)?;

        self.fb.seal_block(header)?;
        self.fb.seal_block(exit)?;
        self.fb.switch_to_block(exit)
    }

    /// Reads a named member of an internal record.
    pub(super) fn member(&mut self, object: ValueId, name: &str, ty: SsaType) -> Result<ValueId> {
        let key = self.fb.emit_const(ConstValue::String(name.to_string()))?;
        self.fb.emit_get_member(object, key, ty)
    }

    /// Cases are tested in order with `==`; a matching case runs its body and falls
    /// through into the next one unless it breaks.
    fn visit_switch(&mut self, subject: Option<&Expr>, cases: &[SwitchCase]) -> Result<()> {
        let subject = self.visit_expr(subject)?;
        let exit = self.fb.new_block("switch.exit")?;
        let mut bodies = Vec::with_capacity(cases.len());
        for _ in cases {
            bodies.push(self.fb.new_block("switch.case")?);
        }

        let mut default = None;
        for (case, body) in cases.iter().zip(&bodies) {
            let Some(test) = &case.test else {
                default.get_or_insert(*body);
                continue;
            };
            let range = self.fb.set_range(case.span);
            let test = self.visit_expr(Some(test));
            let matched = test.and_then(|test| self.fb.emit_binop(BinaryOp::Eq, subject, test));
            self.fb.restore_range(range);
            let next = self.fb.new_block("switch.test")?;
            self.fb.emit_branch(matched?, *body, next)?;
            self.fb.seal_block(next)?;
            self.fb.switch_to_block(next)?;
        }
        self.fb.emit_jump(default.unwrap_or(exit))?;

        let target = LoopTarget {
            break_block: exit,
            continue_block: exit,
        };
        self.in_loop(target, |unit| {
            for (i, case) in cases.iter().enumerate() {
                let block = bodies[i];
                unit.fb.seal_block(block)?;
                unit.fb.switch_to_block(block)?;
                let range = unit.fb.set_range(case.span);
                let result = unit.visit_block(&case.body);
                unit.fb.restore_range(range);
                result?;
                unit.fb.emit_jump(bodies.get(i + 1).copied().unwrap_or(exit))?;
            }
            Ok(())
        })?;

        self.fb.seal_block(exit)?;
        self.fb.switch_to_block(exit)
    }

    fn visit_break(&mut self, levels: Option<u32>, is_continue: bool) -> Result<()> {
        let keyword = if is_continue { "continue" } else { "break" };
        let levels = levels.unwrap_or(1);
        let target = if levels == 0 {
            None
        } else {
            self.fb.loop_target(levels)?
        };
        match target {
            Some(target) if is_continue => self.fb.emit_jump(target.continue_block),
            Some(target) => self.fb.emit_jump(target.break_block),
            None => {
                self.fb.report(
                    DiagnosticKind::InvalidBreak,
                    format!("cannot '{keyword} {levels}' from here"),
                );
                Ok(())
            }
        }
    }

    /// `global $x` binds `$x` to the extern `$x` for the rest of the function.
    fn visit_global(&mut self, names: &[String]) -> Result<()> {
        if !self.in_function_body()? {
            return Ok(());
        }
        for name in names {
            let global = self.fb.emit_extern(&format!("${name}"))?;
            self.fb.write_variable(name, global)?;
        }
        Ok(())
    }

    fn visit_static(&mut self, vars: &[StaticVar]) -> Result<()> {
        for var in vars {
            let value = match &var.default {
                Some(default) => self.visit_expr(Some(default))?,
                None => self.fb.emit_const(ConstValue::Null)?,
            };
            self.fb.write_variable(&var.name, value)?;
        }
        Ok(())
    }

    /// Unsetting a variable makes it undefined from here on; unsetting an element or a
    /// property is a call to the `unset` extern.
    fn visit_unset(&mut self, targets: &[Expr]) -> Result<()> {
        for target in targets {
            match &target.kind {
                ExprKind::Variable(name) => {
                    let undefined = self.fb.emit_undefined(name)?;
                    self.fb.write_variable(name, undefined)?;
                }
                _ => {
                    let value = self.visit_expr(Some(target))?;
                    self.call_extern("unset", vec![value], SsaType::null())?;
                }
            }
        }
        Ok(())
    }

    fn visit_const(&mut self, decls: &[ConstDecl]) -> Result<()> {
        for decl in decls {
            let value = self.value_ref(decl.value.as_ref())?;
            let library = self.namespace.clone();
            if !self
                .program_mut()
                .define_const(library.as_deref(), &decl.name, value)
            {
                self.fb.report(
                    DiagnosticKind::DuplicateConstant,
                    format!("constant {} already defined", decl.name),
                );
            }
        }
        Ok(())
    }

    fn visit_namespace(&mut self, name: Option<&Name>, body: Option<&[Stmt]>) -> Result<()> {
        if self.in_function_body()? {
            self.unsupported("namespace declaration inside a function")?;
            return Ok(());
        }
        let path = name.map(Name::dotted).filter(|p| !p.is_empty());
        match body {
            None => self.enter_namespace(path),
            Some(body) => {
                let outer = self.namespace.clone();
                self.enter_namespace(path)?;
                self.visit_block(body)?;
                self.enter_namespace(outer)
            }
        }
    }

    /// The protected body, each handler and `finally` are lowered one after the other.
    fn visit_try(&mut self, body: &[Stmt], catches: &[Catch], finally: Option<&[Stmt]>) -> Result<()> {
        self.visit_block(body)?;
        for catch in catches {
            for ty in &catch.types {
                self.class_ref(ty);
            }
            if let Some(var) = &catch.var {
                let caught = self.fb.emit_instruction(SsaOp::Make, SsaType::any())?;
                self.fb.write_variable(var, caught)?;
            }
            self.visit_block(&catch.body)?;
        }
        if let Some(finally) = finally {
            self.visit_block(finally)?;
        }
        Ok(())
    }
}
