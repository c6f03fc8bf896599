//! Expression lowering.
//!
//! Every visit returns the value the expression evaluates to. Short-circuit operators,
//! ternaries and `??` become diamonds whose result is merged through an SSA-only
//! temporary, so the join gets a phi like any other variable.

use std::path::Path;

use crate::{
    build::{stmt::element_type, UnitBuilder},
    ssa::{
        dotted, BinaryOp, BlueprintId, ClassBluePrint, ConstValue, DiagnosticKind, FunctionId, FunctionKind, SsaOp,
        SsaType, UnaryOp, ValueId, ValueKind, ValueRef,
    },
    syntax::{
        ArrayItem, ArrowFnDecl, AssignOp, BinaryOperator, CastKind, ClassRef, ClosureDecl, Expr,
        ExprKind, LogicalOperator, MagicConst, UnaryOperator,
    },
    Result,
};

fn binary_op(op: BinaryOperator) -> BinaryOp {
    match op {
        BinaryOperator::Add => BinaryOp::Add,
        BinaryOperator::Sub => BinaryOp::Sub,
        BinaryOperator::Mul => BinaryOp::Mul,
        BinaryOperator::Div => BinaryOp::Div,
        BinaryOperator::Mod => BinaryOp::Mod,
        BinaryOperator::Pow => BinaryOp::Pow,
        BinaryOperator::Concat => BinaryOp::Concat,
        BinaryOperator::BitAnd => BinaryOp::BitAnd,
        BinaryOperator::BitOr => BinaryOp::BitOr,
        BinaryOperator::BitXor => BinaryOp::BitXor,
        BinaryOperator::Shl => BinaryOp::Shl,
        BinaryOperator::Shr => BinaryOp::Shr,
        BinaryOperator::Eq => BinaryOp::Eq,
        BinaryOperator::NotEq => BinaryOp::NotEq,
        BinaryOperator::Identical => BinaryOp::Identical,
        BinaryOperator::NotIdentical => BinaryOp::NotIdentical,
        BinaryOperator::Lt => BinaryOp::Lt,
        BinaryOperator::Le => BinaryOp::Le,
        BinaryOperator::Gt => BinaryOp::Gt,
        BinaryOperator::Ge => BinaryOp::Ge,
        BinaryOperator::Spaceship => BinaryOp::Spaceship,
    }
}

/// Joins two element types: equal types stay, anything else widens to `any`.
fn join(current: Option<SsaType>, next: SsaType) -> Option<SsaType> {
    match current {
        None => Some(next),
        Some(current) if current == next => Some(current),
        Some(_) => Some(SsaType::any()),
    }
}

impl UnitBuilder<'_> {
    /// Lowers an expression at its own source range. A missing expression yields an
    /// undefined placeholder and a [`DiagnosticKind::MissingNode`].
    pub(super) fn visit_expr(&mut self, expr: Option<&Expr>) -> Result<ValueId> {
        let Some(expr) = expr else {
            return self.missing("expression");
        };
        let range = self.fb.set_range(expr.span);
        let result = self.lower_expr(expr);
        self.fb.restore_range(range);
        result
    }

    fn visit_args(&mut self, args: &[Expr]) -> Result<Vec<ValueId>> {
        args.iter().map(|arg| self.visit_expr(Some(arg))).collect()
    }

    /// Calls the builtin `name`.
    pub(super) fn call_extern(&mut self, name: &str, args: Vec<ValueId>, ty: SsaType) -> Result<ValueId> {
        let callee = self.fb.emit_extern(name)?;
        self.fb.emit_call(callee, args, ty)
    }

    fn string(&mut self, text: &str) -> Result<ValueId> {
        self.fb.emit_const(ConstValue::String(text.to_string()))
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<ValueId> {
        match &expr.kind {
            ExprKind::Int(value) => self.fb.emit_const(ConstValue::Int(*value)),
            ExprKind::Float(value) => self.fb.emit_const(ConstValue::Float(*value)),
            ExprKind::String(value) => self.string(value),
            ExprKind::Bool(value) => self.fb.emit_const(ConstValue::Bool(*value)),
            ExprKind::Null => self.fb.emit_const(ConstValue::Null),
            ExprKind::Interpolated(parts) => self.visit_interpolated(parts),
            ExprKind::Variable(name) => self.fb.read_variable(name),
            ExprKind::VariableVariable(inner) => {
                self.visit_expr(inner.as_deref())?;
                self.unsupported("variable variable")
            }
            ExprKind::Assign { target, value, .. } => {
                let value = self.visit_expr(value.as_deref())?;
                match target.as_deref() {
                    Some(target) => self.assign_to(target, value)?,
                    None => {
                        self.missing("assignment target")?;
                    }
                }
                Ok(value)
            }
            ExprKind::CompoundAssign { op, target, value } => {
                self.visit_compound(*op, target.as_deref(), value.as_deref())
            }
            ExprKind::ListAssign { items, value } => {
                let value = self.visit_expr(value.as_deref())?;
                self.destructure(items, value)?;
                Ok(value)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.visit_expr(left.as_deref())?;
                let right = self.visit_expr(right.as_deref())?;
                self.fb.emit_binop(binary_op(*op), left, right)
            }
            ExprKind::Logical { op, left, right } => {
                self.visit_logical(*op, left.as_deref(), right.as_deref())
            }
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.visit_expr(condition.as_deref())?;
                let then = then.as_deref();
                let otherwise = otherwise.as_deref();
                self.select(
                    condition,
                    "ternary",
                    |unit| match then {
                        Some(then) => unit.visit_expr(Some(then)),
                        None => Ok(condition),
                    },
                    |unit| unit.visit_expr(otherwise),
                )
            }
            ExprKind::Coalesce { left, right } => self.coalesce(left.as_deref(), right.as_deref()),
            ExprKind::Unary { op, operand } => {
                let operand = self.visit_expr(operand.as_deref())?;
                let op = match op {
                    UnaryOperator::Silence => return Ok(operand),
                    UnaryOperator::Not => UnaryOp::Not,
                    UnaryOperator::Neg => UnaryOp::Neg,
                    UnaryOperator::Plus => UnaryOp::Plus,
                    UnaryOperator::BitNot => UnaryOp::BitNot,
                };
                self.fb.emit_unop(op, operand)
            }
            ExprKind::IncDec {
                increment,
                prefix,
                target,
            } => self.visit_inc_dec(*increment, *prefix, target.as_deref()),
            ExprKind::Cast { kind, operand } => self.visit_cast(*kind, operand.as_deref()),
            ExprKind::Call { callee, args } => self.visit_call(callee.as_deref(), args),
            ExprKind::Name(name) => self.resolve_constant(name),
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => self.visit_method_call(object.as_deref(), method, args),
            ExprKind::StaticCall {
                class,
                method,
                args,
            } => self.visit_static_call(class, method, args),
            ExprKind::PropertyFetch { object, property } => {
                let object = self.visit_expr(object.as_deref())?;
                let ty = self.field_type(self.fb.value_type(object)?.blueprint(), property);
                self.member(object, property, ty)
            }
            ExprKind::StaticProperty { class, property } => {
                let (target, class) = self.class_target(class)?;
                let ty = self.field_type(class, property);
                self.member(target, property, ty)
            }
            ExprKind::ClassConst { class, name } => self.visit_class_const(class, name),
            ExprKind::New { class, args } => self.visit_new(class, args),
            ExprKind::InstanceOf { expr, class } => {
                let value = self.visit_expr(expr.as_deref())?;
                let (class, _) = self.class_target(class)?;
                self.fb.emit_binop(BinaryOp::InstanceOf, value, class)
            }
            ExprKind::Clone(inner) => {
                let value = self.visit_expr(inner.as_deref())?;
                let ty = self.fb.value_type(value)?;
                self.call_extern("clone", vec![value], ty)
            }
            ExprKind::Array(items) => self.visit_array(items),
            ExprKind::Index { base, index } => {
                let base = self.visit_expr(base.as_deref())?;
                let Some(index) = index.as_deref() else {
                    return self.unsupported("reading from `[]`");
                };
                let index = self.visit_expr(Some(index))?;
                let ty = element_type(&self.fb.value_type(base)?);
                self.fb.emit_get_member(base, index, ty)
            }
            ExprKind::Closure(decl) => self.visit_closure(decl),
            ExprKind::ArrowFn(decl) => self.visit_arrow_fn(decl),
            ExprKind::Isset(items) => {
                self.fb.begin_quiet();
                let values = self.visit_args(items);
                self.fb.end_quiet();
                self.call_extern("isset", values?, SsaType::bool())
            }
            ExprKind::Empty(inner) => {
                self.fb.begin_quiet();
                let value = self.visit_expr(inner.as_deref());
                self.fb.end_quiet();
                self.call_extern("empty", vec![value?], SsaType::bool())
            }
            ExprKind::Exit(status) => {
                let args = match status.as_deref() {
                    Some(status) => vec![self.visit_expr(Some(status))?],
                    None => Vec::new(),
                };
                let exit = self.call_extern("exit", args, SsaType::null())?;
                self.fb.emit_throw(None)?;
                Ok(exit)
            }
            ExprKind::Print(inner) => {
                let value = self.visit_expr(inner.as_deref())?;
                self.call_extern("print", vec![value], SsaType::int())
            }
            ExprKind::Include { path, .. } => {
                let path = self.visit_expr(path.as_deref())?;
                self.call_extern("include", vec![path], SsaType::any())
            }
            ExprKind::MagicConst(magic) => self.visit_magic(*magic),
            ExprKind::Error => self.missing("expression"),
        }
    }

    /// `"a $b c"` is the concatenation of its parts, and always a string.
    fn visit_interpolated(&mut self, parts: &[Expr]) -> Result<ValueId> {
        let mut result = self.string("")?;
        for (i, part) in parts.iter().enumerate() {
            let value = self.visit_expr(Some(part))?;
            let is_string = matches!(part.kind, ExprKind::String(_));
            result = if i == 0 && is_string {
                value
            } else {
                self.fb.emit_binop(BinaryOp::Concat, result, value)?
            };
        }
        Ok(result)
    }

    // ------------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------------

    /// Stores `value` into an assignable expression.
    pub(super) fn assign_to(&mut self, target: &Expr, value: ValueId) -> Result<()> {
        let range = self.fb.set_range(target.span);
        let result = self.lower_assign(target, value);
        self.fb.restore_range(range);
        result
    }

    fn lower_assign(&mut self, target: &Expr, value: ValueId) -> Result<()> {
        match &target.kind {
            ExprKind::Variable(name) => self.fb.write_variable(name, value),
            ExprKind::Index { base, index } => {
                let Some(base) = base.as_deref() else {
                    self.missing("indexed value")?;
                    return Ok(());
                };
                let container = self.container(base)?;
                let key = match index.as_deref() {
                    Some(index) => self.visit_expr(Some(index))?,
                    None => self.call_extern("count", vec![container], SsaType::int())?,
                };
                self.fb.emit_set_member(container, key, value)?;
                Ok(())
            }
            ExprKind::PropertyFetch { object, property } => {
                let object = self.visit_expr(object.as_deref())?;
                let key = self.string(property)?;
                self.fb.emit_set_member(object, key, value)?;
                Ok(())
            }
            ExprKind::StaticProperty { class, property } => {
                let (class, _) = self.class_target(class)?;
                let key = self.string(property)?;
                self.fb.emit_set_member(class, key, value)?;
                Ok(())
            }
            ExprKind::ListAssign { items, .. } | ExprKind::Array(items) => self.destructure(items, value),
            _ => {
                self.unsupported(&format!("assignment to {}", target.kind_name()))?;
                Ok(())
            }
        }
    }

    /// The container an element assignment writes into. An undefined variable becomes
    /// a fresh array first.
    fn container(&mut self, base: &Expr) -> Result<ValueId> {
        let ExprKind::Variable(name) = &base.kind else {
            return self.visit_expr(Some(base));
        };
        self.fb.begin_quiet();
        let current = self.fb.read_variable(name);
        self.fb.end_quiet();
        let current = current?;

        let function = self.fb.current_function()?;
        let undefined = function
            .value(function.resolve(current))
            .is_some_and(|v| v.is_undefined());
        if !undefined {
            return Ok(current);
        }
        let array = self
            .fb
            .emit_instruction(SsaOp::Make, SsaType::map(SsaType::any(), SsaType::any()))?;
        self.fb.write_variable(name, array)?;
        Ok(array)
    }

    /// `[$a, 'k' => $b] = $value`
    fn destructure(&mut self, items: &[ArrayItem], value: ValueId) -> Result<()> {
        let ty = element_type(&self.fb.value_type(value)?);
        let mut position = 0;
        for item in items {
            let Some(target) = &item.value else {
                position += 1;
                continue;
            };
            let key = match &item.key {
                Some(key) => self.visit_expr(Some(key))?,
                None => {
                    position += 1;
                    self.fb.emit_const(ConstValue::Int(position - 1))?
                }
            };
            let element = self.fb.emit_get_member(value, key, ty.clone())?;
            self.assign_to(target, element)?;
        }
        Ok(())
    }

    fn visit_compound(&mut self, op: AssignOp, target: Option<&Expr>, value: Option<&Expr>) -> Result<ValueId> {
        let Some(target) = target else {
            return self.missing("assignment target");
        };
        let result = match op {
            AssignOp::Binary(op) => {
                let current = self.visit_expr(Some(target))?;
                let value = self.visit_expr(value)?;
                self.fb.emit_binop(binary_op(op), current, value)?
            }
            AssignOp::Coalesce => self.coalesce(Some(target), value)?,
        };
        self.assign_to(target, result)?;
        Ok(result)
    }

    fn visit_inc_dec(&mut self, increment: bool, prefix: bool, target: Option<&Expr>) -> Result<ValueId> {
        let Some(target) = target else {
            return self.missing("increment target");
        };
        let current = self.visit_expr(Some(target))?;
        let one = self.fb.emit_const(ConstValue::Int(1))?;
        let op = if increment { BinaryOp::Add } else { BinaryOp::Sub };
        let updated = self.fb.emit_binop(op, current, one)?;
        self.assign_to(target, updated)?;
        Ok(if prefix { updated } else { current })
    }

    // ------------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------------

    /// Branches on `condition` and merges the values of both arms.
    fn select<T, E>(&mut self, condition: ValueId, label: &str, then: T, otherwise: E) -> Result<ValueId>
    where
        T: FnOnce(&mut Self) -> Result<ValueId>,
        E: FnOnce(&mut Self) -> Result<ValueId>,
    {
        let temp = self.temp(label);
        let then_block = self.fb.new_block(&format!("{label}.then"))?;
        let else_block = self.fb.new_block(&format!("{label}.else"))?;
        let done = self.fb.new_block(&format!("{label}.done"))?;
        self.fb.emit_branch(condition, then_block, else_block)?;
        self.fb.seal_block(then_block)?;
        self.fb.seal_block(else_block)?;

        self.fb.switch_to_block(then_block)?;
        let value = then(self)?;
        self.fb.write_variable(&temp, value)?;
        self.fb.emit_jump(done)?;

        self.fb.switch_to_block(else_block)?;
        let value = otherwise(self)?;
        self.fb.write_variable(&temp, value)?;
        self.fb.emit_jump(done)?;

        self.fb.seal_block(done)?;
        self.fb.switch_to_block(done)?;
        self.fb.read_variable(&temp)
    }

    fn to_bool(&mut self, value: ValueId) -> Result<ValueId> {
        if self.fb.value_type(value)?.ptr_eq(&SsaType::bool()) {
            return Ok(value);
        }
        if let Some(constant) = self.fb.value_const(value)? {
            return self.fb.emit_const(ConstValue::Bool(constant.is_truthy()));
        }
        self.fb
            .emit_instruction(SsaOp::TypeCast { operand: value }, SsaType::bool())
    }

    fn visit_logical(&mut self, op: LogicalOperator, left: Option<&Expr>, right: Option<&Expr>) -> Result<ValueId> {
        let left = self.visit_expr(left)?;
        match op {
            LogicalOperator::Xor => {
                let right = self.visit_expr(right)?;
                self.fb.emit_binop(BinaryOp::Xor, left, right)
            }
            LogicalOperator::And => self.select(
                left,
                "and",
                |unit| {
                    let right = unit.visit_expr(right)?;
                    unit.to_bool(right)
                },
                |unit| unit.fb.emit_const(ConstValue::Bool(false)),
            ),
            LogicalOperator::Or => self.select(
                left,
                "or",
                |unit| unit.fb.emit_const(ConstValue::Bool(true)),
                |unit| {
                    let right = unit.visit_expr(right)?;
                    unit.to_bool(right)
                },
            ),
        }
    }

    /// `left ?? right`: `left` is read quietly and tested with `isset`.
    fn coalesce(&mut self, left: Option<&Expr>, right: Option<&Expr>) -> Result<ValueId> {
        self.fb.begin_quiet();
        let checked = self.visit_expr(left);
        self.fb.end_quiet();
        let checked = checked?;
        let set = self.call_extern("isset", vec![checked], SsaType::bool())?;
        self.select(set, "coalesce", |_| Ok(checked), |unit| unit.visit_expr(right))
    }

    fn visit_cast(&mut self, kind: CastKind, operand: Option<&Expr>) -> Result<ValueId> {
        let operand = self.visit_expr(operand)?;
        let ty = match kind {
            CastKind::Int => SsaType::int(),
            CastKind::Float => SsaType::float64(),
            CastKind::String => SsaType::string(),
            CastKind::Bool => SsaType::bool(),
            CastKind::Array => SsaType::map(SsaType::any(), SsaType::any()),
            CastKind::Object => SsaType::any(),
            CastKind::Unset => return self.fb.emit_const(ConstValue::Null),
        };
        self.fb.emit_instruction(SsaOp::TypeCast { operand }, ty)
    }

    // ------------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------------

    /// The declared return type of the function a callee value refers to.
    fn return_type_of(&self, callee: ValueId) -> Result<SsaType> {
        let function = self.fb.current_function()?;
        let target = match function.value(function.resolve(callee)).map(|v| v.kind()) {
            Some(ValueKind::Function(target)) => *target,
            _ => return Ok(SsaType::any()),
        };
        Ok(self
            .program()
            .function(target)
            .map(|f| f.return_type().clone())
            .unwrap_or_default())
    }

    fn visit_call(&mut self, callee: Option<&Expr>, args: &[Expr]) -> Result<ValueId> {
        let Some(callee) = callee else {
            return self.missing("callee");
        };
        let callee = match &callee.kind {
            ExprKind::Name(name) if name.parts.len() == 1 && name.last().eq_ignore_ascii_case("define") => {
                return self.visit_define(args);
            }
            ExprKind::Name(name) => {
                let range = self.fb.set_range(callee.span);
                let resolved = self.resolve_function(name);
                self.fb.restore_range(range);
                resolved?
            }
            _ => self.visit_expr(Some(callee))?,
        };
        let ty = self.return_type_of(callee)?;
        let args = self.visit_args(args)?;
        self.fb.emit_call(callee, args, ty)
    }

    /// `define('NAME', value)` with a literal name defines a constant of the unit.
    fn visit_define(&mut self, args: &[Expr]) -> Result<ValueId> {
        let values = self.visit_args(args)?;
        let name = match args.first().map(|a| &a.kind) {
            Some(ExprKind::String(name)) => Some(name.trim_start_matches('\\').to_string()),
            _ => None,
        };
        if let (Some(name), Some(value)) = (name, values.get(1).copied()) {
            let constant = ValueRef {
                function: self.fb.current_function_id()?,
                value,
            };
            let path = dotted(&name);
            let (library, simple) = match path.rsplit_once('.') {
                Some((library, simple)) => (Some(library), simple),
                None => (None, path.as_str()),
            };
            if !self.program_mut().define_const(library, simple, constant) {
                self.fb.report(
                    DiagnosticKind::DuplicateConstant,
                    format!("constant {name} already defined"),
                );
            }
        }
        self.call_extern("define", values, SsaType::bool())
    }

    fn visit_method_call(&mut self, object: Option<&Expr>, method: &str, args: &[Expr]) -> Result<ValueId> {
        let object = self.visit_expr(object)?;
        let class = self.fb.value_type(object)?.blueprint();
        let ty = class
            .and_then(|class| self.program().find_method(class, method))
            .and_then(|m| m.function)
            .and_then(|f| self.program().function(f))
            .map(|f| f.return_type().clone())
            .unwrap_or_default();
        let callee = self.member(object, method, SsaType::any())?;
        let mut values = vec![object];
        values.extend(self.visit_args(args)?);
        self.fb.emit_call(callee, values, ty)
    }

    fn has_this(&self) -> Result<bool> {
        let function = self.fb.current_function()?;
        Ok(function
            .params()
            .iter()
            .any(|p| function.value(*p).and_then(|v| v.name()) == Some("this")))
    }

    /// `A::m()` binds to the method's function when the class declares it; `self::`,
    /// `parent::` and `static::` calls of instance methods pass `$this` along.
    fn visit_static_call(&mut self, class: &ClassRef, method: &str, args: &[Expr]) -> Result<ValueId> {
        let (target, id) = self.class_target(class)?;
        let found = id
            .and_then(|id| self.program().find_method(id, method))
            .and_then(|m| m.function.map(|f| (f, m.modifiers.is_static())));

        let mut values = Vec::with_capacity(args.len() + 1);
        let (callee, ty) = match found {
            Some((function, is_static)) => {
                let forwards = matches!(class, ClassRef::SelfRef | ClassRef::Parent | ClassRef::Static);
                if !is_static && forwards && self.has_this()? {
                    values.push(self.fb.read_variable("this")?);
                }
                let callee = self.fb.emit_function_ref(function)?;
                (callee, self.return_type_of(callee)?)
            }
            None => (self.member(target, method, SsaType::any())?, SsaType::any()),
        };
        values.extend(self.visit_args(args)?);
        self.fb.emit_call(callee, values, ty)
    }

    // ------------------------------------------------------------------------
    // Classes and objects
    // ------------------------------------------------------------------------

    /// Visits `class` and the blueprints it inherits from until `f` finds something.
    fn walk_class<T>(&self, class: BlueprintId, f: impl Fn(&ClassBluePrint) -> Option<T>) -> Option<T> {
        let mut seen = Vec::new();
        let mut queue = vec![class];
        while let Some(id) = queue.pop() {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            let Some(bp) = self.program().blueprint(id) else {
                continue;
            };
            if let Some(found) = f(bp) {
                return Some(found);
            }
            queue.extend(bp.interfaces().iter().rev());
            queue.extend(bp.traits().iter().rev());
            queue.extend(bp.parents().iter().rev());
        }
        None
    }

    fn field_type(&self, class: Option<BlueprintId>, name: &str) -> SsaType {
        class
            .and_then(|class| self.walk_class(class, |bp| bp.field(name).map(|f| f.ty.clone())))
            .unwrap_or_default()
    }

    /// The class value for static member access, and the blueprint when it is known.
    fn class_target(&mut self, class: &ClassRef) -> Result<(ValueId, Option<BlueprintId>)> {
        let id = match class {
            ClassRef::Named(name) => Some(self.class_ref(name)),
            ClassRef::SelfRef | ClassRef::Static => self.classes.last().map(|c| c.id),
            ClassRef::Parent => self.classes.last().and_then(|c| c.parent),
            ClassRef::Dynamic(expr) => {
                let value = self.visit_expr(Some(expr.as_ref()))?;
                let id = self.fb.value_type(value)?.blueprint();
                return Ok((value, id));
            }
        };
        let Some(id) = id else {
            let keyword = match class {
                ClassRef::Parent => "parent",
                ClassRef::Static => "static",
                _ => "self",
            };
            self.fb.report(
                DiagnosticKind::UndefinedClass,
                format!("cannot use \"{keyword}\" here"),
            );
            return Ok((self.fb.emit_undefined(keyword)?, None));
        };
        let name = self.class_name(id);
        let value = self.fb.emit_extern(&name)?;
        let ty = self.blueprint_type(id);
        self.fb.set_value_type(value, ty)?;
        Ok((value, Some(id)))
    }

    /// `\`-separated qualified name of a blueprint.
    fn class_name(&self, id: BlueprintId) -> String {
        self.program()
            .blueprint(id)
            .map(|bp| bp.qualified_name().replace('.', "\\"))
            .unwrap_or_default()
    }

    fn visit_class_const(&mut self, class: &ClassRef, name: &str) -> Result<ValueId> {
        if name.eq_ignore_ascii_case("class") {
            if let ClassRef::Dynamic(expr) = class {
                let value = self.visit_expr(Some(expr.as_ref()))?;
                return self.call_extern("get_class", vec![value], SsaType::string());
            }
            let (_, id) = self.class_target(class)?;
            let display = id.map(|id| self.class_name(id)).unwrap_or_default();
            return self.string(&display);
        }

        let (target, id) = self.class_target(class)?;
        let constant = id.and_then(|id| self.walk_class(id, |bp| bp.class_const(name).map(|c| c.value)));
        match constant {
            Some(Some(constant)) => {
                let display = id.map(|id| self.class_name(id)).unwrap_or_default();
                self.constant_value(constant, &format!("{display}::{name}"))
            }
            _ => self.member(target, name, SsaType::any()),
        }
    }

    /// `new A(...)` makes an object of the class type and calls its constructor. The
    /// constructor of a class that is not declared yet is looked up on the object.
    fn visit_new(&mut self, class: &ClassRef, args: &[Expr]) -> Result<ValueId> {
        let id = match class {
            ClassRef::Dynamic(expr) => {
                self.visit_expr(Some(expr.as_ref()))?;
                None
            }
            _ => self.class_target(class)?.1,
        };
        let ty = id.map(|id| self.blueprint_type(id)).unwrap_or_default();
        let object = self.fb.emit_instruction(SsaOp::Make, ty)?;
        let mut values = vec![object];
        values.extend(self.visit_args(args)?);

        let Some(id) = id else {
            return Ok(object);
        };
        let declared = self.program().blueprint(id).is_some_and(|bp| bp.is_declared());
        let constructor = self
            .program()
            .find_method(id, "__construct")
            .and_then(|m| m.function);
        let callee = match constructor {
            Some(constructor) => self.fb.emit_function_ref(constructor)?,
            None if !declared => self.member(object, "__construct", SsaType::any())?,
            None => return Ok(object),
        };
        self.fb.emit_call(callee, values, SsaType::null())?;
        Ok(object)
    }

    /// Array literals are a `Make` followed by one `SetMember` per element; spreads are
    /// merged with `array_merge`.
    fn visit_array(&mut self, items: &[ArrayItem]) -> Result<ValueId> {
        let mut array = self
            .fb
            .emit_instruction(SsaOp::Make, SsaType::map(SsaType::any(), SsaType::any()))?;
        let made = array;
        let mut position = 0;
        let mut key_ty = None;
        let mut value_ty = None;
        let mut spread = false;

        for item in items {
            let Some(value) = &item.value else {
                self.missing("array element")?;
                continue;
            };
            let value = self.visit_expr(Some(value))?;
            if item.spread {
                spread = true;
                let ty = SsaType::map(SsaType::any(), SsaType::any());
                array = self.call_extern("array_merge", vec![array, value], ty)?;
                continue;
            }
            let key = match &item.key {
                Some(key) => {
                    let key = self.visit_expr(Some(key))?;
                    if let Some(ConstValue::Int(i)) = self.fb.value_const(key)? {
                        position = position.max(i.saturating_add(1));
                    }
                    key
                }
                None => {
                    position += 1;
                    self.fb.emit_const(ConstValue::Int(position - 1))?
                }
            };
            key_ty = join(key_ty, self.fb.value_type(key)?);
            value_ty = join(value_ty, self.fb.value_type(value)?);
            self.fb.emit_set_member(array, key, value)?;
        }

        if let (false, Some(key), Some(value)) = (spread, key_ty, value_ty) {
            self.fb.set_value_type(made, SsaType::map(key, value))?;
        }
        Ok(array)
    }

    // ------------------------------------------------------------------------
    // Closures
    // ------------------------------------------------------------------------

    /// Registers a closure or arrow function of the current function, or `None` when
    /// nesting is too deep.
    fn new_closure(&mut self, kind: FunctionKind) -> Result<Option<(FunctionId, String)>> {
        if self.closure_depth >= self.config.max_closure_depth {
            self.unsupported("closure nesting this deep")?;
            return Ok(None);
        }
        self.closures += 1;
        let name = format!("$closure{}", self.closures);
        let parent = self.fb.current_function_id()?;
        let library = self.namespace.clone();
        let id = self
            .fb
            .new_func(&name, kind, library.as_deref(), Some(parent))?;
        Ok(Some((id, name)))
    }

    /// `function () use ($a, &$b) { ... }`. Captured variables are bound in the closure
    /// to their value in the enclosing function at the point of creation; any other
    /// variable the body reads falls through to the enclosing scope.
    fn visit_closure(&mut self, decl: &ClosureDecl) -> Result<ValueId> {
        let Some((id, name)) = self.new_closure(FunctionKind::Closure)? else {
            return self.fb.emit_undefined("closure");
        };
        self.build_body(id, &name, &decl.params, decl.return_type.as_ref(), None, |unit| {
            unit.closure_depth += 1;
            for captured in &decl.uses {
                let outer = unit.fb.read_outer_variable(&captured.name)?;
                unit.fb.capture(&captured.name, outer)?;
            }
            unit.visit_block(&decl.body)
        })?;
        self.fb.emit_function_ref(id)
    }

    /// `fn ($x) => expr` returns its body and captures implicitly.
    fn visit_arrow_fn(&mut self, decl: &ArrowFnDecl) -> Result<ValueId> {
        let Some((id, name)) = self.new_closure(FunctionKind::Arrow)? else {
            return self.fb.emit_undefined("closure");
        };
        self.build_body(id, &name, &decl.params, decl.return_type.as_ref(), None, |unit| {
            unit.closure_depth += 1;
            let value = unit.visit_expr(decl.body.as_ref())?;
            unit.fb.emit_return(vec![value])
        })?;
        self.fb.emit_function_ref(id)
    }

    fn visit_magic(&mut self, magic: MagicConst) -> Result<ValueId> {
        let class = self.classes.last().map(|c| c.display.clone()).unwrap_or_default();
        let function = self.names.last().cloned().unwrap_or_default();
        let text = match magic {
            MagicConst::Line => {
                let line = self.fb.current_range().line;
                return self.fb.emit_const(ConstValue::Int(i64::from(line)));
            }
            MagicConst::File => self.program().unit().to_string(),
            MagicConst::Dir => Path::new(self.program().unit())
                .parent()
                .map(|p| p.display().to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ".".to_string()),
            MagicConst::Class => class,
            MagicConst::Function => function,
            MagicConst::Method if class.is_empty() => function,
            MagicConst::Method => format!("{class}::{function}"),
            MagicConst::Namespace => self
                .namespace
                .as_deref()
                .map(|ns| ns.replace('.', "\\"))
                .unwrap_or_default(),
        };
        self.string(&text)
    }
}
