//! Class-like declarations, type hints and function bodies.

use crate::{
    build::{ClassContext, UnitBuilder},
    ssa::{
        qualify, BlueprintId, BlueprintKind, ClassBluePrint, ClassConst, ConstValue, DiagnosticKind,
        Field, FunctionId, FunctionKind, MemberSource, Method, Modifiers, SsaType, ValueRef,
    },
    syntax::{ClassDecl, ClassKind, Expr, FunctionDecl, MemberKind, Modifier, Name, Param, Stmt, TypeHint},
    Result,
};

/// Folds written modifiers into flags. `var` means `public`.
pub(super) fn modifiers(written: &[Modifier]) -> Modifiers {
    written.iter().fold(Modifiers::empty(), |acc, m| {
        acc | match m {
            Modifier::Public | Modifier::Var => Modifiers::PUBLIC,
            Modifier::Protected => Modifiers::PROTECTED,
            Modifier::Private => Modifiers::PRIVATE,
            Modifier::Static => Modifiers::STATIC,
            Modifier::Final => Modifiers::FINAL,
            Modifier::Abstract => Modifiers::ABSTRACT,
            Modifier::Readonly => Modifiers::READONLY,
        }
    })
}

fn blueprint_kind(kind: ClassKind) -> BlueprintKind {
    match kind {
        ClassKind::Class => BlueprintKind::Class,
        ClassKind::Interface => BlueprintKind::Interface,
        ClassKind::Trait => BlueprintKind::Trait,
    }
}

/// The class a function body belongs to.
#[derive(Debug, Clone, Copy)]
pub(super) struct Owner {
    pub class: BlueprintId,
    pub is_static: bool,
}

impl UnitBuilder<'_> {
    fn with_blueprint<R>(&mut self, id: BlueprintId, f: impl FnOnce(&mut ClassBluePrint) -> R) -> Option<R> {
        self.program_mut().blueprint_mut(id).map(f)
    }

    /// Converts a declared type into an SSA type. Classes that cannot be resolved yet
    /// become `any`.
    pub(super) fn type_hint(&mut self, hint: Option<&TypeHint>) -> SsaType {
        let Some(hint) = hint else {
            return SsaType::any();
        };
        match hint {
            TypeHint::Named(name) => self.named_type(name),
            TypeHint::Nullable(inner) => {
                let inner = self.type_hint(Some(inner));
                SsaType::union(&[inner, SsaType::null()])
            }
            TypeHint::Union(members) => {
                let members: Vec<SsaType> = members.iter().map(|m| self.type_hint(Some(m))).collect();
                SsaType::union(&members)
            }
            TypeHint::Intersection(_) => SsaType::any(),
            TypeHint::Malformed(text) => {
                self.fb.report(
                    DiagnosticKind::MalformedTypeHint,
                    format!("cannot understand type `{text}`"),
                );
                SsaType::any()
            }
        }
    }

    fn named_type(&mut self, name: &Name) -> SsaType {
        if name.parts.len() == 1 && !name.fully_qualified {
            let lower = name.last().to_ascii_lowercase();
            match lower.as_str() {
                "array" => return SsaType::map(SsaType::any(), SsaType::any()),
                "callable" | "iterable" | "object" | "mixed" => return SsaType::any(),
                "self" | "static" => {
                    return self
                        .classes
                        .last()
                        .map(|c| c.id)
                        .map(|id| self.blueprint_type(id))
                        .unwrap_or_default();
                }
                "parent" => {
                    return self
                        .classes
                        .last()
                        .and_then(|c| c.parent)
                        .map(|id| self.blueprint_type(id))
                        .unwrap_or_default();
                }
                "bool" | "boolean" | "false" | "true" | "int" | "integer" | "float" | "double"
                | "string" | "null" | "void" => return SsaType::by_name(&lower),
                _ => {}
            }
        }
        self.lookup_class(name)
            .map(|id| self.blueprint_type(id))
            .unwrap_or_default()
    }

    /// Evaluates `expr` in the current function and returns a program-wide handle to it.
    pub(super) fn value_ref(&mut self, expr: Option<&Expr>) -> Result<ValueRef> {
        let value = self.visit_expr(expr)?;
        Ok(ValueRef {
            function: self.fb.current_function_id()?,
            value,
        })
    }

    /// Declares a class, interface or trait and lowers its members. Property defaults and
    /// constants are evaluated in the current function; methods with a body get a
    /// function of their own.
    pub(super) fn visit_class(&mut self, decl: &ClassDecl) -> Result<BlueprintId> {
        let name = match decl.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                self.temps += 1;
                format!("class@anonymous{}", self.temps)
            }
        };
        let kind = blueprint_kind(decl.kind);
        let library = self.namespace.clone();
        let range = self.fb.set_range(decl.span);
        let span = self.fb.current_range();
        let id = self.program_mut().build_object_template(
            &name,
            library.as_deref(),
            kind,
            modifiers(&decl.modifiers),
            span,
        );
        log::debug!("[build] {kind} {name} as {id}");

        let mut parent = None;
        for extended in &decl.extends {
            let source = self.class_ref(extended);
            if kind == BlueprintKind::Interface {
                self.with_blueprint(id, |bp| bp.add_interface(source));
            } else {
                parent.get_or_insert(source);
                self.with_blueprint(id, |bp| bp.add_parent(source));
            }
        }
        for implemented in &decl.implements {
            let source = self.class_ref(implemented);
            self.with_blueprint(id, |bp| bp.add_interface(source));
        }

        self.classes.push(ClassContext {
            id,
            display: qualify(library.as_deref(), &name).replace('.', "\\"),
            name,
            parent,
        });
        let result = decl.members.iter().try_for_each(|member| {
            let range = self.fb.set_range(member.span);
            let result = self.visit_member(id, &member.kind);
            self.fb.restore_range(range);
            result
        });
        self.classes.pop();
        self.fb.restore_range(range);
        result.map(|()| id)
    }

    fn class_display(&self) -> String {
        self.classes
            .last()
            .map(|c| c.display.clone())
            .unwrap_or_default()
    }

    fn visit_member(&mut self, id: BlueprintId, member: &MemberKind) -> Result<()> {
        match member {
            MemberKind::Property {
                name,
                modifiers: written,
                ty,
                default,
            } => {
                let ty = self.type_hint(ty.as_ref());
                let default = match default {
                    Some(expr) => Some(self.value_ref(Some(expr))?),
                    None => None,
                };
                let field = Field {
                    name: name.clone(),
                    ty,
                    modifiers: modifiers(written),
                    default,
                    source: MemberSource::Own,
                };
                if self.with_blueprint(id, |bp| bp.add_field(field)) == Some(false) {
                    let class = self.class_display();
                    self.fb.report(
                        DiagnosticKind::MemberConflict,
                        format!("property {class}::${name} is declared twice"),
                    );
                }
            }
            MemberKind::Const {
                name,
                modifiers: written,
                value,
            } => {
                let value = match value {
                    Some(expr) => Some(self.value_ref(Some(expr))?),
                    None => {
                        self.missing("class constant value")?;
                        None
                    }
                };
                let constant = ClassConst {
                    name: name.clone(),
                    value,
                    modifiers: modifiers(written),
                    source: MemberSource::Own,
                };
                if self.with_blueprint(id, |bp| bp.add_const(constant)) == Some(false) {
                    let class = self.class_display();
                    self.fb.report(
                        DiagnosticKind::DuplicateConstant,
                        format!("constant {class}::{name} is declared twice"),
                    );
                }
            }
            MemberKind::Method {
                decl,
                modifiers: written,
            } => self.visit_method(id, decl, modifiers(written))?,
            MemberKind::TraitUse(names) => {
                for name in names {
                    let used = self.class_ref(name);
                    self.with_blueprint(id, |bp| bp.add_trait(used));
                }
            }
            MemberKind::Error => {
                self.missing("class member")?;
            }
        }
        Ok(())
    }

    fn visit_method(&mut self, id: BlueprintId, decl: &FunctionDecl, flags: Modifiers) -> Result<()> {
        let class = self
            .classes
            .last()
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let library = self.namespace.clone();

        let function = match &decl.body {
            Some(_) => {
                let range = self.fb.set_range(decl.span);
                let function = self.fb.new_func(
                    &format!("{class}_{}", decl.name),
                    FunctionKind::Method,
                    library.as_deref(),
                    None,
                );
                self.fb.restore_range(range);
                Some(function?)
            }
            None => None,
        };

        let method = Method {
            name: decl.name.clone(),
            function,
            modifiers: flags,
            source: MemberSource::Own,
        };
        if self.with_blueprint(id, |bp| bp.add_method(method)) == Some(false) {
            let display = self.class_display();
            self.fb.report(
                DiagnosticKind::DuplicateFunction,
                format!("cannot redeclare method {display}::{}", decl.name),
            );
        }

        if let (Some(function), Some(body)) = (function, &decl.body) {
            let owner = Owner {
                class: id,
                is_static: flags.is_static(),
            };
            self.build_function(function, decl, Some(owner), body)?;
        }
        Ok(())
    }

    /// Lowers a named function or method body into `function`.
    fn build_function(
        &mut self,
        function: FunctionId,
        decl: &FunctionDecl,
        owner: Option<Owner>,
        body: &[Stmt],
    ) -> Result<()> {
        self.build_body(
            function,
            &decl.name,
            &decl.params,
            decl.return_type.as_ref(),
            owner,
            |unit| unit.visit_block(body),
        )
    }

    /// Pushes `function`, declares `$this` and the parameters, then runs `body`.
    pub(super) fn build_body<F>(
        &mut self,
        function: FunctionId,
        name: &str,
        params: &[Param],
        return_type: Option<&TypeHint>,
        owner: Option<Owner>,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.build_sub_function(function, name, |unit| {
            if let Some(owner) = owner {
                unit.fb.set_blueprint(owner.class)?;
                if !owner.is_static {
                    let ty = unit.blueprint_type(owner.class);
                    unit.fb.add_parameter("this", ty)?;
                }
            }
            unit.add_params(params)?;
            if let Some(hint) = return_type {
                let ty = unit.type_hint(Some(hint));
                unit.fb.set_return_type(ty)?;
            }
            body(unit)
        })
    }

    /// Declares parameters. Variadics are maps from position to the declared type;
    /// promoted constructor parameters also become fields and are stored on `$this`.
    fn add_params(&mut self, params: &[Param]) -> Result<()> {
        for param in params {
            let mut ty = self.type_hint(param.ty.as_ref());
            if param.variadic {
                ty = SsaType::map(SsaType::int(), ty);
            }
            let value = self.fb.add_parameter(&param.name, ty.clone())?;
            if param.promoted.is_empty() {
                continue;
            }
            let Some(class) = self.classes.last().map(|c| c.id) else {
                self.fb.report(
                    DiagnosticKind::UnsupportedSyntax,
                    format!("promoted parameter ${} outside a class", param.name),
                );
                continue;
            };
            let field = Field {
                name: param.name.clone(),
                ty,
                modifiers: modifiers(&param.promoted),
                default: None,
                source: MemberSource::Own,
            };
            self.with_blueprint(class, |bp| bp.add_field(field));
            let this = self.fb.read_variable("this")?;
            let key = self.fb.emit_const(ConstValue::String(param.name.clone()))?;
            self.fb.emit_set_member(this, key, value)?;
        }
        Ok(())
    }

    /// Lowers `function name() {}`. Hoisted declarations claim their function; a second
    /// declaration of the same name is reported and built detached.
    pub(super) fn visit_function_decl(&mut self, decl: &FunctionDecl) -> Result<()> {
        let library = self.namespace.clone();
        let key = qualify(library.as_deref(), &decl.name).to_ascii_lowercase();
        let nested = self.in_function_body()?;
        let range = self.fb.set_range(decl.span);

        let function = match self.declared.get(&key).copied() {
            Some((id, false)) => {
                self.declared.insert(key, (id, true));
                Ok(id)
            }
            Some((_, true)) => {
                self.fb.report(
                    DiagnosticKind::DuplicateFunction,
                    format!("cannot redeclare function {}", key.replace('.', "\\")),
                );
                self.fb
                    .new_func(&decl.name, FunctionKind::Function, library.as_deref(), None)
            }
            None => self.declare_late_function(decl, &key, nested),
        };
        self.fb.restore_range(range);
        let function = function?;

        match &decl.body {
            Some(body) => self.build_function(function, decl, None, body),
            None => {
                self.missing("function body")?;
                Ok(())
            }
        }
    }

    /// Registers a function that was not hoisted: declared inside a function body or a
    /// conditional block.
    fn declare_late_function(&mut self, decl: &FunctionDecl, key: &str, nested: bool) -> Result<FunctionId> {
        let library = self.namespace.clone();
        let parent = if nested {
            Some(self.fb.current_function_id()?)
        } else {
            None
        };
        let id = self
            .fb
            .new_func(&decl.name, FunctionKind::Function, library.as_deref(), parent)?;
        if !self
            .program_mut()
            .register_function(library.as_deref(), &decl.name, id)
        {
            self.fb.report(
                DiagnosticKind::DuplicateFunction,
                format!("cannot redeclare function {}", key.replace('.', "\\")),
            );
        }
        self.declared.insert(key.to_string(), (id, true));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers() {
        let flags = modifiers(&[Modifier::Var, Modifier::Static]);
        assert_eq!(flags, Modifiers::PUBLIC | Modifiers::STATIC);
        assert!(flags.is_static());
        assert_eq!(modifiers(&[]).visibility(), Modifiers::PUBLIC);
        assert_eq!(
            modifiers(&[Modifier::Private, Modifier::Readonly]).visibility(),
            Modifiers::PRIVATE
        );
    }
}
