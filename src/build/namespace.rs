//! Namespaces, `use` imports and name resolution.
//!
//! Names are resolved in this order:
//!
//! | What      | Order                                                                    |
//! |-----------|--------------------------------------------------------------------------|
//! | functions | `use function` alias, current namespace, root, builtins, imported units  |
//! | classes   | current namespace and its imports, root, imported units, builtins        |
//! | constants | `use const` alias, current namespace, root, builtins, imported units     |
//!
//! A class that cannot be found gets a placeholder blueprint, which a later declaration
//! in the unit claims. Placeholders still unclaimed at the end of the unit are reported
//! as undefined classes.

use crate::{
    build::{builtins, UnitBuilder},
    ssa::{BlueprintId, ConstValue, DiagnosticKind, FunctionKind, Library, ValueId, ValueKind, ValueRef},
    syntax::{Name, UseDecl, UseKind},
    Result,
};

/// Splits a dotted name into its library and simple name.
fn split(dotted: &str) -> (Option<&str>, &str) {
    match dotted.rsplit_once('.') {
        Some((library, name)) => (Some(library), name),
        None => (None, dotted),
    }
}

impl UnitBuilder<'_> {
    /// Makes `path` the active namespace, continuing its `init` function where the
    /// previous block for the same namespace stopped. `None` returns to `main`.
    pub(super) fn enter_namespace(&mut self, path: Option<String>) -> Result<()> {
        self.leave_namespace()?;
        let Some(path) = path else {
            return Ok(());
        };

        let init = self.library_init(&path)?;
        let block = match self.inits.iter().find(|(p, ..)| *p == path) {
            Some((_, _, block)) => *block,
            None => {
                let entry = self.fb.program().function(init).map(|f| f.entry());
                let entry = entry.ok_or_else(|| malformed_error!("Init {} vanished", init))?;
                self.inits.push((path.clone(), init, entry));
                entry
            }
        };
        self.fb.enter_function(init, block)?;
        log::trace!("[build] entered namespace {path}");
        self.namespace = Some(path);
        Ok(())
    }

    /// Returns to `main`, remembering where the namespace's `init` stopped.
    pub(super) fn leave_namespace(&mut self) -> Result<()> {
        self.function_aliases.clear();
        self.const_aliases.clear();
        if self.namespace.take().is_none() {
            return Ok(());
        }
        let (init, block) = self.fb.leave_function()?;
        if let Some(entry) = self.inits.iter_mut().find(|(_, id, _)| *id == init) {
            entry.2 = block;
        }
        Ok(())
    }

    /// Returns the `init` function of a library, creating library and function on first
    /// use.
    fn library_init(&mut self, path: &str) -> Result<crate::ssa::FunctionId> {
        if let Some(init) = self.program().get_library(path).and_then(Library::init) {
            return Ok(init);
        }
        let init = self
            .fb
            .new_func("init", FunctionKind::Init, Some(path), None)?;
        self.program_mut().new_library(path).set_init(init);
        Ok(init)
    }

    pub(super) fn visit_use(&mut self, imports: &[UseDecl]) -> Result<()> {
        for import in imports {
            let target = import.name.dotted();
            if target.is_empty() {
                self.missing("use target")?;
                continue;
            }
            let alias = import.local_name().to_string();
            match import.kind {
                UseKind::Function => {
                    self.function_aliases
                        .insert(alias.to_ascii_lowercase(), target);
                }
                UseKind::Const => {
                    self.const_aliases.insert(alias, target);
                }
                UseKind::Normal => {
                    if !self.import_library(&target)? {
                        self.import_class(&target, &alias)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// `use A\B` where `A\B` is a namespace: every class of that library becomes visible
    /// under its simple name. Returns `false` if no such library is known.
    fn import_library(&mut self, path: &str) -> Result<bool> {
        let mut found = false;
        let mut classes: Vec<(String, BlueprintId)> = Vec::new();
        if let Some(library) = self.program().get_library(path) {
            found = true;
            classes.extend(library.classes().iter().map(|(n, id)| (n.clone(), *id)));
        }
        let imports = self.imports;
        for program in imports {
            let Some(library) = program.get_library(path) else {
                continue;
            };
            found = true;
            for id in library.classes().values() {
                if let Some(source) = program.blueprint(*id).filter(|bp| bp.is_declared()) {
                    let local = self.program_mut().import_blueprint(source);
                    classes.push((source.name().to_ascii_lowercase(), local));
                }
            }
        }
        if !found {
            return Ok(false);
        }

        let current = self.namespace.clone();
        match current.as_deref() {
            Some(current) => {
                let library = self.program_mut().new_library(current);
                library.add_import(path);
                for (name, id) in &classes {
                    library.set_class_blueprint(name, *id);
                }
            }
            None => {
                for (name, id) in &classes {
                    self.program_mut().set_class_blueprint(None, name, *id);
                }
            }
        }
        log::debug!("[build] imported {} classes of {path}", classes.len());
        Ok(true)
    }

    /// `use A\B\C [as D]` where `C` is a class.
    fn import_class(&mut self, target: &str, alias: &str) -> Result<()> {
        let name = Name {
            parts: target.split('.').map(str::to_string).collect(),
            fully_qualified: true,
        };
        let id = self.class_ref(&name);
        let current = self.namespace.clone();
        if !self
            .program_mut()
            .set_class_blueprint(current.as_deref(), alias, id)
        {
            self.fb.report(
                DiagnosticKind::DuplicateClass,
                format!("cannot use {name} as {alias}, the name is already in use"),
            );
        }
        Ok(())
    }

    /// The dotted name a class reference denotes in the active namespace.
    fn qualified_class(&self, name: &Name) -> String {
        if name.fully_qualified {
            name.dotted()
        } else {
            crate::ssa::qualify(self.library(), &name.dotted())
        }
    }

    /// Resolves a class name without creating a placeholder.
    pub(super) fn lookup_class(&mut self, name: &Name) -> Option<BlueprintId> {
        let library = self.namespace.clone();
        if let Some(id) = self
            .program()
            .resolve_class(library.as_deref(), &name.to_string())
        {
            return Some(id);
        }

        let qualified = self.qualified_class(name);
        let imports = self.imports;
        for program in imports {
            let source = program
                .get_class_blueprint(&qualified)
                .or_else(|| program.get_class_blueprint(&name.dotted()))
                .filter(|bp| bp.is_declared());
            if let Some(source) = source {
                return Some(self.program_mut().import_blueprint(source));
            }
        }

        if self.config.builtins && name.parts.len() == 1 {
            if let Some(builtin) = builtins::class(name.last()) {
                return Some(self.program_mut().builtin_class(builtin));
            }
        }
        None
    }

    /// Resolves a class name, creating a placeholder for a class not declared yet.
    pub(super) fn class_ref(&mut self, name: &Name) -> BlueprintId {
        if let Some(id) = self.lookup_class(name) {
            return id;
        }
        let qualified = self.qualified_class(name);
        let span = self.fb.current_range();
        log::trace!("[build] forward reference to class {qualified}");
        self.program_mut().class_placeholder(&qualified, span)
    }

    /// The dotted names an unqualified function or constant may denote, most specific
    /// first.
    fn candidates(&self, name: &Name, alias: Option<&String>) -> Vec<String> {
        if let Some(target) = alias {
            return vec![target.clone()];
        }
        if name.fully_qualified {
            return vec![name.dotted()];
        }
        match self.library() {
            Some(ns) if name.parts.len() == 1 => vec![format!("{ns}.{}", name.dotted()), name.dotted()],
            Some(ns) => vec![format!("{ns}.{}", name.dotted())],
            None => vec![name.dotted()],
        }
    }

    /// Returns the callee value for a call of `name`.
    pub(super) fn resolve_function(&mut self, name: &Name) -> Result<ValueId> {
        let alias = if name.is_simple() {
            self.function_aliases.get(&name.last().to_ascii_lowercase())
        } else {
            None
        };
        let candidates = self.candidates(name, alias);

        for candidate in &candidates {
            if let Some(function) = self.program().find_function(candidate) {
                return self.fb.emit_function_ref(function);
            }
        }
        if self.config.builtins && name.parts.len() == 1 && builtins::is_function(name.last()) {
            return self.fb.emit_extern(&name.last().to_ascii_lowercase());
        }
        for candidate in &candidates {
            if self
                .imports
                .iter()
                .any(|p| p.find_function(candidate).is_some())
            {
                return self.fb.emit_extern(&candidate.replace('.', "\\"));
            }
        }

        self.fb.report(
            DiagnosticKind::UndefinedFunction,
            format!("call to undefined function {name}"),
        );
        self.fb.emit_undefined(&name.to_string())
    }

    /// Returns the value of the constant `name`.
    pub(super) fn resolve_constant(&mut self, name: &Name) -> Result<ValueId> {
        if name.parts.len() == 1 {
            let literal = match name.last().to_ascii_lowercase().as_str() {
                "true" => Some(ConstValue::Bool(true)),
                "false" => Some(ConstValue::Bool(false)),
                "null" => Some(ConstValue::Null),
                _ => None,
            };
            if let Some(literal) = literal {
                return self.fb.emit_const(literal);
            }
        }

        let alias = if name.is_simple() {
            self.const_aliases.get(name.last())
        } else {
            None
        };
        let candidates = self.candidates(name, alias);

        for candidate in &candidates {
            let (library, simple) = split(candidate);
            if let Some(found) = self.program().constant(library, simple) {
                return self.constant_value(found, candidate);
            }
        }
        if self.config.builtins && name.parts.len() == 1 {
            if let Some(value) = builtins::constant(name.last()) {
                return self.fb.emit_const(value);
            }
        }
        for candidate in &candidates {
            let (library, simple) = split(candidate);
            for program in self.imports {
                if let Some(found) = program.constant(library, simple) {
                    let value = program
                        .resolve_ref(found)
                        .and_then(|v| v.const_value())
                        .cloned();
                    return match value {
                        Some(value) => self.fb.emit_const(value),
                        None => self.fb.emit_extern(&candidate.replace('.', "\\")),
                    };
                }
            }
        }

        self.fb.report(
            DiagnosticKind::UndefinedConstant,
            format!("undefined constant {name}"),
        );
        self.fb.emit_undefined(&name.to_string())
    }

    /// Makes a constant defined anywhere in the unit usable in the current function.
    pub(super) fn constant_value(&mut self, constant: ValueRef, name: &str) -> Result<ValueId> {
        let current = self.fb.current_function_id()?;
        if constant.function == current {
            return Ok(self.fb.current_function()?.resolve(constant.value));
        }
        let value = self.program().resolve_ref(constant).map(|v| {
            let literal = v.const_value().cloned();
            (literal, matches!(v.kind(), ValueKind::Undefined { .. }))
        });
        match value {
            Some((Some(literal), _)) => self.fb.emit_const(literal),
            Some((None, true)) => self.fb.emit_undefined(name),
            _ => self.fb.emit_extern(&name.replace('.', "\\")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        assert_eq!(split("A.B.c"), (Some("A.B"), "c"));
        assert_eq!(split("c"), (None, "c"));
    }
}
