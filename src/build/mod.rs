//! The driver: lowers a parse tree into a [`Program`].
//!
//! [`Builder`] walks a [`SourceFile`] depth-first, in a single pass, and drives the
//! [`FunctionBuilder`] for every node. Dispatch is an exhaustive `match` over the closed
//! [`crate::syntax`] enums, so adding a node kind is a compile error until every visit
//! handles it.
//!
//! # Tolerance
//!
//! Every visit accepts an optional node. An absent child or an error-recovery node records
//! a [`DiagnosticKind::MissingNode`] and yields an undefined placeholder; undefined names
//! are reported and replaced by placeholders too. Only a missing tree, or parser errors
//! with [`BuildConfig::allow_partial_tree`] disabled, fail the build.
//!
//! # Unit structure
//!
//! - top-level code outside any namespace goes to `main`
//! - top-level code inside `namespace A\B` goes to the `init` function of library `A.B`;
//!   several blocks for the same namespace continue the same `init`
//! - function declarations are hoisted: they are registered before any statement is
//!   lowered, so calls may precede the declaration
//! - class hierarchies are merged once the whole unit has been lowered
//!
//! # Examples
//!
//! ```rust
//! use phpscope::build::Builder;
//! use phpscope::syntax::{BinaryOperator, Expr, SourceFile, Stmt};
//!
//! let file = SourceFile::new(
//!     "main.php",
//!     vec![Stmt::expr(Expr::assign(
//!         Expr::var("a"),
//!         Expr::binary(BinaryOperator::Add, Expr::int(1), Expr::int(1)),
//!     ))],
//! );
//! let program = Builder::new().build(Some(&file))?;
//! let ins = program.main_function().first_block_instructions();
//! assert_eq!(ins.len(), 2);
//! assert_eq!(ins[1].const_value().map(|c| c.to_string()), Some("2".to_string()));
//! # Ok::<(), phpscope::Error>(())
//! ```

mod builtins;
mod class;
mod config;
mod expr;
mod namespace;
mod stmt;

pub use config::BuildConfig;

use std::{collections::HashMap, sync::Arc};

use crate::{
    ssa::{
        qualify, BlockId, BlueprintId, DiagnosticKind, FunctionBuilder, FunctionId, FunctionKind,
        Program, SsaType, ValueId,
    },
    syntax::{FunctionDecl, SourceFile, Stmt, StmtKind},
    Error, Result,
};

/// Builds [`Program`]s from parse trees.
///
/// A builder is cheap to clone and holds no per-unit state; every call to
/// [`Builder::build`] produces an independent program.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    config: BuildConfig,
    imports: Vec<Arc<Program>>,
}

impl Builder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    /// Makes frozen programs available for resolving functions, classes and namespaces
    /// the unit does not declare itself.
    #[must_use]
    pub fn with_imports(mut self, imports: impl IntoIterator<Item = Arc<Program>>) -> Self {
        self.imports = imports.into_iter().collect();
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Lowers one compilation unit.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyTree`] if `file` is `None`
    /// - [`Error::Unparseable`] if the tree carries parser errors and
    ///   [`BuildConfig::allow_partial_tree`] is disabled
    /// - [`Error::Malformed`] and friends if an internal invariant breaks
    pub fn build(&self, file: Option<&SourceFile>) -> Result<Program> {
        let file = file.ok_or(Error::EmptyTree)?;
        let unit = if file.name.is_empty() {
            self.config.unit.clone()
        } else {
            file.name.clone()
        };
        if file.errors > 0 && !self.config.allow_partial_tree {
            return Err(Error::Unparseable {
                unit,
                errors: file.errors,
            });
        }

        log::debug!(
            "[build] {} ({} top-level statements, {} imports)",
            unit,
            file.items.len(),
            self.imports.len()
        );
        let program = Program::new(unit, &self.config.package);
        let mut fb = FunctionBuilder::new(program).with_constant_folding(self.config.constant_folding);
        if self.config.builtins {
            fb = fb.with_extern_variables(builtins::SUPERGLOBALS.iter().copied());
        }

        let mut unit = UnitBuilder::new(fb, &self.config, &self.imports);
        unit.hoist(&file.items)?;
        unit.visit_block(&file.items)?;
        unit.finish()
    }
}

/// The class whose body is being lowered.
#[derive(Debug, Clone)]
struct ClassContext {
    id: BlueprintId,
    name: String,
    /// `\`-separated, for `__CLASS__` and `A::class`
    display: String,
    parent: Option<BlueprintId>,
}

/// Per-unit lowering state.
struct UnitBuilder<'a> {
    fb: FunctionBuilder,
    config: &'a BuildConfig,
    imports: &'a [Arc<Program>],
    /// Dotted path of the active namespace
    namespace: Option<String>,
    /// Library `init` functions and the block each one stopped at
    inits: Vec<(String, FunctionId, BlockId)>,
    /// `use function` aliases, lowercased alias to dotted target
    function_aliases: HashMap<String, String>,
    /// `use const` aliases, alias to dotted target
    const_aliases: HashMap<String, String>,
    /// Named functions by lowercased qualified name, and whether their body was built
    declared: HashMap<String, (FunctionId, bool)>,
    classes: Vec<ClassContext>,
    /// Names of the functions being built, as written
    names: Vec<String>,
    closures: usize,
    temps: usize,
    closure_depth: usize,
}

impl AsMut<FunctionBuilder> for UnitBuilder<'_> {
    fn as_mut(&mut self) -> &mut FunctionBuilder {
        &mut self.fb
    }
}

impl<'a> UnitBuilder<'a> {
    fn new(fb: FunctionBuilder, config: &'a BuildConfig, imports: &'a [Arc<Program>]) -> Self {
        Self {
            fb,
            config,
            imports,
            namespace: None,
            inits: Vec::new(),
            function_aliases: HashMap::new(),
            const_aliases: HashMap::new(),
            declared: HashMap::new(),
            classes: Vec::new(),
            names: Vec::new(),
            closures: 0,
            temps: 0,
            closure_depth: 0,
        }
    }

    /// Closes every open function and resolves the class hierarchy.
    fn finish(mut self) -> Result<Program> {
        self.leave_namespace()?;
        for (path, init, block) in std::mem::take(&mut self.inits) {
            log::trace!("[build] finishing init of {path}");
            self.fb.enter_function(init, block)?;
            self.fb.finish()?;
            self.fb.leave_function()?;
        }
        self.fb.finish()?;

        let mut program = self.fb.into_program();
        program.resolve_hierarchy();
        program.report_undeclared_classes();
        program.finalize();
        log::debug!(
            "[build] {}: {} functions, {} classes, {} diagnostics",
            program.unit(),
            program.function_count(),
            program.blueprints().len(),
            program.diagnostics().len()
        );
        Ok(program)
    }

    fn library(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn program(&self) -> &Program {
        self.fb.program()
    }

    fn program_mut(&mut self) -> &mut Program {
        self.fb.program_mut()
    }

    fn current_kind(&self) -> Result<FunctionKind> {
        Ok(self.fb.current_function()?.kind())
    }

    /// Returns `true` while lowering the body of a function, method or closure, as
    /// opposed to top-level code.
    fn in_function_body(&self) -> Result<bool> {
        Ok(!matches!(
            self.current_kind()?,
            FunctionKind::Main | FunctionKind::Init
        ))
    }

    /// A fresh SSA-only variable name, for values merged across blocks.
    fn temp(&mut self, prefix: &str) -> String {
        self.temps += 1;
        format!("%{prefix}{}", self.temps)
    }

    /// Records a missing child and returns a placeholder for it.
    fn missing(&mut self, what: &str) -> Result<ValueId> {
        self.fb
            .report(DiagnosticKind::MissingNode, format!("missing {what}"));
        self.fb.emit_undefined("")
    }

    /// Records an unsupported construct and returns a placeholder for it.
    fn unsupported(&mut self, what: &str) -> Result<ValueId> {
        self.fb.report(
            DiagnosticKind::UnsupportedSyntax,
            format!("{what} is not supported"),
        );
        self.fb.emit_undefined("")
    }

    fn blueprint_type(&self, id: BlueprintId) -> SsaType {
        self.program()
            .blueprint(id)
            .map(|bp| bp.ty())
            .unwrap_or_default()
    }

    /// Builds `function` with the frame pushed, restoring the unit's own stacks however
    /// the build ends.
    fn build_sub_function<F>(&mut self, function: FunctionId, name: &str, build: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let classes = self.classes.len();
        let names = self.names.len();
        let depth = self.closure_depth;
        self.names.push(name.to_string());

        let result = FunctionBuilder::add_sub_function(self, function, build);

        self.classes.truncate(classes);
        self.names.truncate(names);
        self.closure_depth = depth;
        result
    }

    /// Registers the named functions declared at top level, inside namespaces included.
    fn hoist(&mut self, items: &[Stmt]) -> Result<()> {
        let outer = self.namespace.clone();
        self.hoist_in(items)?;
        self.namespace = outer;
        Ok(())
    }

    fn hoist_in(&mut self, items: &[Stmt]) -> Result<()> {
        for stmt in items {
            match &stmt.kind {
                StmtKind::Function(decl) => self.hoist_function(decl)?,
                StmtKind::Namespace { name, body: None } => {
                    self.namespace = name.as_ref().map(|n| n.dotted()).filter(|n| !n.is_empty());
                }
                StmtKind::Namespace {
                    name,
                    body: Some(body),
                } => {
                    let inner = name.as_ref().map(|n| n.dotted()).filter(|n| !n.is_empty());
                    let outer = std::mem::replace(&mut self.namespace, inner);
                    self.hoist_in(body)?;
                    self.namespace = outer;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn hoist_function(&mut self, decl: &FunctionDecl) -> Result<()> {
        let library = self.namespace.clone();
        let key = qualify(library.as_deref(), &decl.name).to_ascii_lowercase();
        if self.declared.contains_key(&key) {
            return Ok(());
        }
        let range = self.fb.set_range(decl.span);
        let id = self
            .fb
            .new_func(&decl.name, FunctionKind::Function, library.as_deref(), None)?;
        self.fb.restore_range(range);
        self.program_mut()
            .register_function(library.as_deref(), &decl.name, id);
        if let Some(hint) = &decl.return_type {
            let ty = self.type_hint(Some(hint));
            self.program_mut().function_mut(id)?.set_return_type(ty);
        }
        log::trace!("[build] hoisted {key} as {id}");
        self.declared.insert(key, (id, false));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Expr, Name};

    #[test]
    fn test_empty_tree() {
        assert!(matches!(Builder::new().build(None), Err(Error::EmptyTree)));
    }

    #[test]
    fn test_unparseable() {
        let file = SourceFile::new("bad.php", Vec::new()).with_errors(2);
        let strict = Builder::new().with_config(BuildConfig::strict());
        assert!(matches!(
            strict.build(Some(&file)),
            Err(Error::Unparseable { errors: 2, .. })
        ));
        assert!(Builder::new().build(Some(&file)).is_ok());
    }

    #[test]
    fn test_unit_name_fallback() -> Result<()> {
        let file = SourceFile::new("", Vec::new());
        let config = BuildConfig::default().with_unit("fallback.php");
        let program = Builder::new().with_config(config).build(Some(&file))?;
        assert_eq!(program.unit(), "fallback.php");
        Ok(())
    }

    #[test]
    fn test_error_node_is_reported() -> Result<()> {
        let file = SourceFile::new(
            "partial.php",
            vec![
                Stmt::new(StmtKind::Error),
                Stmt::new(StmtKind::Expr(None)),
                Stmt::expr(Expr::new(crate::syntax::ExprKind::Error)),
            ],
        )
        .with_errors(1);
        let program = Builder::new().build(Some(&file))?;
        assert_eq!(
            program.diagnostics_of(DiagnosticKind::MissingNode).count(),
            3
        );
        assert!(program.main_function().is_finished());
        Ok(())
    }

    #[test]
    fn test_hoisting_is_namespace_aware() -> Result<()> {
        let file = SourceFile::new(
            "ns.php",
            vec![
                Stmt::expr(Expr::call("\\App\\helper", Vec::new())),
                Stmt::new(StmtKind::Namespace {
                    name: Some(Name::parse("App")),
                    body: None,
                }),
                Stmt::function(FunctionDecl::new("helper", Vec::new(), Vec::new())),
            ],
        );
        let program = Builder::new().build(Some(&file))?;
        assert!(program.find_function("App\\helper").is_some());
        assert_eq!(
            program
                .diagnostics_of(DiagnosticKind::UndefinedFunction)
                .count(),
            0
        );
        Ok(())
    }
}
