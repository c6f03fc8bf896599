//! The program: everything built from one compilation unit.
//!
//! A [`Program`] exclusively owns its registries. There is no process-global state: two
//! builds produce two independent programs, and a program is only shared (read-only,
//! behind an `Arc`) once it is frozen.
//!
//! # Registries
//!
//! - functions, in an arena addressed by [`FunctionId`]; `f0` is always the unit's `main`
//! - packages, named groups of functions (`main` by default)
//! - libraries, one per namespace, keyed by dotted path
//! - class blueprints, in an arena addressed by [`BlueprintId`], plus a name map keyed
//!   by lowercased qualified name (`app.models.user`, or `user` in the root namespace)
//! - diagnostics, in the order they were found
//!
//! # Querying
//!
//! ```rust
//! use phpscope::build::Builder;
//! use phpscope::syntax::{ClassDecl, ClassKind, MemberKind, Modifier, SourceFile, Stmt};
//!
//! let a = ClassDecl::new("A", ClassKind::Class)
//!     .member(MemberKind::property("x", vec![Modifier::Public], None));
//! let b = ClassDecl::new("B", ClassKind::Class).extends("A");
//! let file = SourceFile::new("classes.php", vec![Stmt::class(a), Stmt::class(b)]);
//!
//! let program = Builder::new().build(Some(&file))?;
//! let b = program.get_class_blueprint("B").expect("declared");
//! assert!(b.field("x").is_some());
//! # Ok::<(), phpscope::Error>(())
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use crate::{
    ssa::{
        BlueprintId, BlueprintKind, ClassBluePrint, Diagnostic, DiagnosticKind, FunctionId,
        FunctionKind, Library, MergeKind, MergeOutcome, Method, Modifiers, Severity, SsaFunction,
        SsaValue, ValueKind, ValueRef,
    },
    syntax::Span,
    Error, Result,
};

/// A named group of functions.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    functions: Vec<FunctionId>,
}

impl Package {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            functions: Vec::new(),
        }
    }

    /// Returns the package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the functions registered in this package, in creation order.
    #[must_use]
    pub fn functions(&self) -> &[FunctionId] {
        &self.functions
    }

    /// Returns `true` if `function` belongs to this package.
    #[must_use]
    pub fn contains(&self, function: FunctionId) -> bool {
        self.functions.contains(&function)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Turns `\A\B`, `A\B` or `A.B` into `A.B`.
pub(crate) fn dotted(name: &str) -> String {
    name.split(['\\', '.'])
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

pub(crate) fn qualify(library: Option<&str>, name: &str) -> String {
    match library {
        Some(lib) if !lib.is_empty() => format!("{lib}.{name}"),
        _ => name.to_string(),
    }
}

/// The SSA form of one compilation unit.
#[derive(Debug, Clone)]
pub struct Program {
    unit: String,
    main: FunctionId,
    functions: Vec<SsaFunction>,
    packages: BTreeMap<String, Package>,
    libraries: BTreeMap<String, Library>,
    blueprints: Vec<ClassBluePrint>,
    classes: HashMap<String, BlueprintId>,
    global_functions: BTreeMap<String, FunctionId>,
    consts: BTreeMap<String, ValueRef>,
    diagnostics: Vec<Diagnostic>,
}

impl Program {
    /// Creates a program with an open `main` function in `package`.
    #[must_use]
    pub fn new(unit: impl Into<String>, package: &str) -> Self {
        let mut program = Self {
            unit: unit.into(),
            main: FunctionId::new(0),
            functions: Vec::new(),
            packages: BTreeMap::new(),
            libraries: BTreeMap::new(),
            blueprints: Vec::new(),
            classes: HashMap::new(),
            global_functions: BTreeMap::new(),
            consts: BTreeMap::new(),
            diagnostics: Vec::new(),
        };
        program.main = program.new_func("main", FunctionKind::Main, package, None);
        program
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Returns the unit name.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Returns the unit's top-level function.
    #[must_use]
    pub fn main_function(&self) -> &SsaFunction {
        &self.functions[self.main.index()]
    }

    /// Returns a function by id.
    #[must_use]
    pub fn function(&self, id: FunctionId) -> Option<&SsaFunction> {
        self.functions.get(id.index())
    }

    /// Returns all functions in creation order.
    #[must_use]
    pub fn functions(&self) -> &[SsaFunction] {
        &self.functions
    }

    /// Returns the number of functions, `main` and namespace `init`s included.
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Returns the first function with the given name, in creation order.
    #[must_use]
    pub fn function_by_name(&self, name: &str) -> Option<&SsaFunction> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// Looks up a declared function by (optionally qualified) name.
    ///
    /// `foo` is looked up in the root namespace, `A\B\foo` or `A.B.foo` in library `A.B`.
    #[must_use]
    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        let path = dotted(name);
        match path.rsplit_once('.') {
            Some((lib, simple)) => self.get_library(lib).and_then(|l| l.function(simple)),
            None => self
                .global_functions
                .get(&path.to_ascii_lowercase())
                .copied(),
        }
    }

    /// Returns the packages, ordered by name.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    /// Returns a package by name.
    #[must_use]
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Returns a library by path, dotted or `\`-separated.
    #[must_use]
    pub fn get_library(&self, path: &str) -> Option<&Library> {
        self.libraries.get(&dotted(path))
    }

    /// Returns all libraries, ordered by path.
    pub fn libraries(&self) -> impl Iterator<Item = &Library> {
        self.libraries.values()
    }

    /// Looks up a class blueprint by qualified name (`App\Models\User`, `App.Models.User`)
    /// or, for root classes and root aliases, by simple name.
    #[must_use]
    pub fn get_class_blueprint(&self, name: &str) -> Option<&ClassBluePrint> {
        self.classes
            .get(&dotted(name).to_ascii_lowercase())
            .and_then(|id| self.blueprint(*id))
    }

    /// Returns a blueprint by id.
    #[must_use]
    pub fn blueprint(&self, id: BlueprintId) -> Option<&ClassBluePrint> {
        self.blueprints.get(id.index())
    }

    /// Returns all blueprints, including detached duplicates and undeclared references.
    #[must_use]
    pub fn blueprints(&self) -> &[ClassBluePrint] {
        &self.blueprints
    }

    /// Resolves a class name as written inside `library` (or the root namespace).
    ///
    /// Fully qualified names (`\A\B`) are looked up as is. Other names are tried in the
    /// current namespace, then in the namespaces it imported wholesale, then as written.
    #[must_use]
    pub fn resolve_class(&self, library: Option<&str>, name: &str) -> Option<BlueprintId> {
        let path = dotted(name);
        if name.starts_with('\\') || library.is_none() {
            return self.classes.get(&path.to_ascii_lowercase()).copied();
        }
        let lib = library.and_then(|l| self.get_library(l));
        if !path.contains('.') {
            if let Some(found) = lib.and_then(|l| l.get_class_blueprint(&path)) {
                return Some(found);
            }
            let imported = lib
                .map(Library::imports)
                .unwrap_or_default()
                .iter()
                .filter_map(|p| self.get_library(p))
                .find_map(|l| l.get_class_blueprint(&path));
            if imported.is_some() {
                return imported;
            }
        }
        self.classes
            .get(&qualify(library, &path).to_ascii_lowercase())
            .or_else(|| self.classes.get(&path.to_ascii_lowercase()))
            .copied()
    }

    /// Finds a method on a class, walking up declared parents when the hierarchy has
    /// not been merged yet.
    #[must_use]
    pub fn find_method(&self, class: BlueprintId, name: &str) -> Option<&Method> {
        let mut seen = Vec::new();
        let mut queue = vec![class];
        while let Some(id) = queue.pop() {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            let Some(bp) = self.blueprint(id) else {
                continue;
            };
            if let Some(method) = bp.method(name) {
                return Some(method);
            }
            queue.extend(bp.traits().iter().rev());
            queue.extend(bp.parents().iter().rev());
        }
        None
    }

    /// Looks up a constant as seen from `library`, falling back to the root namespace.
    #[must_use]
    pub fn constant(&self, library: Option<&str>, name: &str) -> Option<ValueRef> {
        library
            .and_then(|l| self.get_library(l))
            .and_then(|l| l.constant(name))
            .or_else(|| self.consts.get(name).copied())
    }

    /// Returns the value a reference points at, following phi forwarding.
    #[must_use]
    pub fn resolve_ref(&self, r: ValueRef) -> Option<&SsaValue> {
        let function = self.function(r.function)?;
        function.value(function.resolve(r.value))
    }

    /// Returns all diagnostics in the order they were recorded.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns the diagnostics of one kind.
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Returns the number of error diagnostics.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Registers a new open function in `package` and returns its id.
    pub(crate) fn new_func(
        &mut self,
        name: &str,
        kind: FunctionKind,
        package: &str,
        library: Option<&str>,
    ) -> FunctionId {
        let id = FunctionId::new(self.functions.len());
        let mut function = SsaFunction::new(id, name, kind);
        function.set_package(package, library);
        self.functions.push(function);
        self.packages
            .entry(package.to_string())
            .or_insert_with(|| Package::new(package))
            .functions
            .push(id);
        id
    }

    pub(crate) fn function_mut(&mut self, id: FunctionId) -> Result<&mut SsaFunction> {
        self.functions
            .get_mut(id.index())
            .ok_or(Error::InvalidFunction(id))
    }

    /// Binds a function name in a namespace or the root; `false` if taken.
    pub(crate) fn register_function(
        &mut self,
        library: Option<&str>,
        name: &str,
        id: FunctionId,
    ) -> bool {
        match library {
            Some(lib) => self.new_library(lib).add_function(name, id),
            None => {
                let key = name.to_ascii_lowercase();
                if self.global_functions.contains_key(&key) {
                    return false;
                }
                self.global_functions.insert(key, id);
                true
            }
        }
    }

    /// Returns the library for `path`, creating it on first use.
    pub(crate) fn new_library(&mut self, path: &str) -> &mut Library {
        let path = dotted(path);
        self.libraries
            .entry(path.clone())
            .or_insert_with(|| {
                log::debug!("[program] new library {path}");
                Library::new(&path)
            })
    }

    pub(crate) fn blueprint_mut(&mut self, id: BlueprintId) -> Option<&mut ClassBluePrint> {
        self.blueprints.get_mut(id.index())
    }

    fn push_blueprint(&mut self, name: &str, library: Option<&str>) -> BlueprintId {
        let id = BlueprintId::new(self.blueprints.len());
        self.blueprints.push(ClassBluePrint::new(id, name, library));
        id
    }

    /// Registers a declared class.
    ///
    /// Claims a forward-reference placeholder of the same qualified name if there is one.
    /// A second declaration is reported as [`DiagnosticKind::DuplicateClass`] and gets a
    /// detached, invalid blueprint so its members can still be built.
    pub(crate) fn build_object_template(
        &mut self,
        name: &str,
        library: Option<&str>,
        kind: BlueprintKind,
        modifiers: Modifiers,
        span: Span,
    ) -> BlueprintId {
        let qualified = qualify(library, name);
        let key = qualified.to_ascii_lowercase();

        if let Some(existing) = self.classes.get(&key).copied() {
            let claimable = self.blueprint(existing).is_some_and(|bp| {
                !bp.is_declared() && bp.qualified_name().eq_ignore_ascii_case(&qualified)
            });
            if claimable {
                if let Some(bp) = self.blueprint_mut(existing) {
                    bp.declare(kind, modifiers, span);
                }
                return existing;
            }

            self.report(
                span,
                DiagnosticKind::DuplicateClass,
                format!("cannot redeclare {kind} {}", qualified.replace('.', "\\")),
            );
            let duplicate = self.push_blueprint(name, library);
            if let Some(bp) = self.blueprint_mut(duplicate) {
                bp.declare(kind, modifiers, span);
                bp.invalidate();
            }
            return duplicate;
        }

        let id = self.push_blueprint(name, library);
        if let Some(bp) = self.blueprint_mut(id) {
            bp.declare(kind, modifiers, span);
        }
        self.classes.insert(key, id);
        if let Some(lib) = library {
            self.new_library(lib).set_class_blueprint(name, id);
        }
        log::debug!("[program] declared {kind} {qualified} as {id}");
        id
    }

    /// Returns an undeclared placeholder for a class referenced before (or without) its
    /// declaration. `qualified` is the dotted full name.
    pub(crate) fn class_placeholder(&mut self, qualified: &str, span: Span) -> BlueprintId {
        let key = qualified.to_ascii_lowercase();
        if let Some(id) = self.classes.get(&key) {
            return *id;
        }
        let (library, name) = match qualified.rsplit_once('.') {
            Some((lib, name)) => (Some(lib), name),
            None => (None, qualified),
        };
        let id = self.push_blueprint(name, library);
        if let Some(bp) = self.blueprint_mut(id) {
            bp.set_span(span);
        }
        self.classes.insert(key, id);
        if let Some(lib) = library {
            self.new_library(lib).set_class_blueprint(name, id);
        }
        id
    }

    /// Declares a root class with no members, used for builtin classes such as `Exception`.
    pub(crate) fn builtin_class(&mut self, name: &str) -> BlueprintId {
        let key = name.to_ascii_lowercase();
        if let Some(id) = self.classes.get(&key) {
            return *id;
        }
        let id = self.push_blueprint(name, None);
        if let Some(bp) = self.blueprint_mut(id) {
            bp.declare(BlueprintKind::Class, Modifiers::empty(), Span::default());
        }
        self.classes.insert(key, id);
        id
    }

    /// Copies the shape of a class from another, frozen program.
    pub(crate) fn import_blueprint(&mut self, source: &ClassBluePrint) -> BlueprintId {
        let id = self.class_placeholder(&dotted(source.qualified_name()), source.span());
        if let Some(bp) = self.blueprint_mut(id) {
            if !bp.is_declared() {
                bp.import_shape(source);
                log::debug!("[program] imported {} as {}", source.qualified_name(), id);
            }
        }
        id
    }

    /// Binds a simple name to a blueprint inside `library`, or in the root namespace.
    /// Returns `false` if the name is already bound to another class.
    pub(crate) fn set_class_blueprint(
        &mut self,
        library: Option<&str>,
        name: &str,
        blueprint: BlueprintId,
    ) -> bool {
        match library {
            Some(lib) => self.new_library(lib).set_class_blueprint(name, blueprint),
            None => {
                let slot = self
                    .classes
                    .entry(name.to_ascii_lowercase())
                    .or_insert(blueprint);
                *slot == blueprint
            }
        }
    }

    /// Defines a constant in a namespace or the root; `false` if it already exists.
    pub(crate) fn define_const(&mut self, library: Option<&str>, name: &str, value: ValueRef) -> bool {
        match library {
            Some(lib) => self.new_library(lib).add_const(name, value),
            None => {
                if self.consts.contains_key(name) {
                    return false;
                }
                self.consts.insert(name.to_string(), value);
                true
            }
        }
    }

    /// Records a diagnostic and mirrors it to the log.
    pub(crate) fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            log::error!("{diagnostic}");
        } else {
            log::warn!("{diagnostic}");
        }
        self.diagnostics.push(diagnostic);
    }

    /// Records a diagnostic for this unit.
    pub(crate) fn report(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(self.unit.clone(), span, kind, message);
        self.add_diagnostic(diagnostic);
    }

    /// Applies every declared merge, parents first, in declaration order.
    ///
    /// Cycles are reported once per entry point; every blueprint on the cycle is marked
    /// invalid and the edge closing the cycle is skipped.
    pub(crate) fn resolve_hierarchy(&mut self) {
        let mut marks = vec![Mark::New; self.blueprints.len()];
        let mut stack = Vec::new();
        for index in 0..self.blueprints.len() {
            self.merge_hierarchy(BlueprintId::new(index), &mut marks, &mut stack);
        }
    }

    fn merge_hierarchy(&mut self, id: BlueprintId, marks: &mut [Mark], stack: &mut Vec<BlueprintId>) {
        if marks.get(id.index()) != Some(&Mark::New) {
            return;
        }
        marks[id.index()] = Mark::Active;
        stack.push(id);

        let sources = self
            .blueprint(id)
            .map(ClassBluePrint::merge_sources)
            .unwrap_or_default();
        for (source, kind) in sources {
            match marks.get(source.index()) {
                None => continue,
                Some(Mark::Active) => {
                    let start = stack.iter().position(|b| *b == source).unwrap_or(0);
                    let cycle: Vec<BlueprintId> = stack[start..].to_vec();
                    let names: Vec<String> = cycle
                        .iter()
                        .filter_map(|b| self.blueprint(*b))
                        .map(|bp| bp.qualified_name().replace('.', "\\"))
                        .collect();
                    for member in &cycle {
                        if let Some(bp) = self.blueprint_mut(*member) {
                            bp.invalidate();
                        }
                    }
                    let span = self.blueprint(id).map(ClassBluePrint::span).unwrap_or_default();
                    self.report(
                        span,
                        DiagnosticKind::InheritanceCycle,
                        format!("inheritance cycle: {}", names.join(" -> ")),
                    );
                    continue;
                }
                Some(_) => {}
            }

            self.merge_hierarchy(source, marks, stack);
            self.merge_to(source, id, kind);
        }

        stack.pop();
        marks[id.index()] = Mark::Done;
    }

    /// Merges `parent` into `child` and records trait conflicts.
    ///
    /// A pair that was already merged is left untouched.
    pub(crate) fn merge_to(
        &mut self,
        parent: BlueprintId,
        child: BlueprintId,
        kind: MergeKind,
    ) -> MergeOutcome {
        let Some(source) = self.blueprint(parent).cloned() else {
            return MergeOutcome::default();
        };
        let Some(target) = self.blueprint_mut(child) else {
            return MergeOutcome::default();
        };
        let outcome = target.merge_from(&source, kind);
        if !outcome.applied {
            return outcome;
        }
        let child_name = target.qualified_name().to_string();
        let span = target.span();
        log::debug!(
            "[program] merged {} {} into {} ({} members)",
            kind,
            source.qualified_name(),
            child_name,
            outcome.changed
        );
        for member in &outcome.conflicts {
            self.report(
                span,
                DiagnosticKind::MemberConflict,
                format!("{member} of {child_name} is provided by more than one trait; the first one is kept"),
            );
        }
        outcome
    }

    /// Reports every referenced class that was never declared.
    pub(crate) fn report_undeclared_classes(&mut self) {
        let missing: Vec<(String, Span)> = self
            .blueprints
            .iter()
            .filter(|bp| !bp.is_declared())
            .map(|bp| (bp.qualified_name().replace('.', "\\"), bp.span()))
            .collect();
        for (name, span) in missing {
            self.report(
                span,
                DiagnosticKind::UndefinedClass,
                format!("class {name} is never declared"),
            );
        }
    }

    /// Rewrites cross-function value references through phi forwarding, once all
    /// functions are finished.
    pub(crate) fn finalize(&mut self) {
        let resolved = |functions: &[SsaFunction], r: ValueRef| -> ValueRef {
            match functions.get(r.function.index()) {
                Some(f) => ValueRef {
                    function: r.function,
                    value: f.resolve(r.value),
                },
                None => r,
            }
        };

        let mut fixes = Vec::new();
        for function in &self.functions {
            for value in function.values() {
                if let ValueKind::FreeValue {
                    name,
                    captured: Some(r),
                } = value.kind()
                {
                    let target = resolved(&self.functions, *r);
                    if target != *r {
                        fixes.push((function.id(), value.id(), name.clone(), target));
                    }
                }
            }
        }
        for (function, value, name, target) in fixes {
            if let Some(v) = self
                .functions
                .get_mut(function.index())
                .and_then(|f| f.value_mut(value))
            {
                v.set_kind(ValueKind::FreeValue {
                    name,
                    captured: Some(target),
                });
            }
        }

        let functions = &self.functions;
        for bp in &mut self.blueprints {
            bp.map_value_refs(|r| resolved(functions, r));
        }
        for r in self.consts.values_mut() {
            *r = resolved(functions, *r);
        }
        for lib in self.libraries.values_mut() {
            lib.map_consts(|r| resolved(functions, r));
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "program {}", self.unit)?;
        for bp in &self.blueprints {
            writeln!(f, "{bp}")?;
        }
        for function in &self.functions {
            write!(f, "{function}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssa::{Field, MemberSource, SsaType};

    fn declare(program: &mut Program, name: &str, library: Option<&str>) -> BlueprintId {
        program.build_object_template(
            name,
            library,
            BlueprintKind::Class,
            Modifiers::empty(),
            Span::default(),
        )
    }

    struct Recorder(std::sync::Mutex<Vec<(log::Level, String)>>);

    impl log::Log for Recorder {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut records) = self.0.lock() {
                records.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static RECORDER: Recorder = Recorder(std::sync::Mutex::new(Vec::new()));

    #[test]
    fn test_diagnostics_log_at_their_severity() {
        let _ = log::set_logger(&RECORDER);
        log::set_max_level(log::LevelFilter::Warn);

        let mut program = Program::new("levels.php", "main");
        program.report(Span::default(), DiagnosticKind::BuilderPanic, "levels-panic");
        program.report(Span::default(), DiagnosticKind::UndefinedVariable, "levels-undefined");

        let records = RECORDER.0.lock().map(|r| r.clone()).unwrap_or_default();
        let level_of = |needle: &str| {
            records
                .iter()
                .find(|(_, message)| message.contains(needle))
                .map(|(level, _)| *level)
        };
        assert_eq!(level_of("levels-panic"), Some(log::Level::Error));
        assert_eq!(level_of("levels-undefined"), Some(log::Level::Warn));
    }

    #[test]
    fn test_new_program_has_main() {
        let program = Program::new("a.php", "main");
        assert_eq!(program.function_count(), 1);
        assert_eq!(program.main_function().kind(), FunctionKind::Main);
        let packages: Vec<&str> = program.packages().map(Package::name).collect();
        assert_eq!(packages, vec!["main"]);
    }

    #[test]
    fn test_duplicate_class_is_detached() {
        let mut program = Program::new("a.php", "main");
        let first = declare(&mut program, "A", None);
        let second = declare(&mut program, "a", None);
        assert_ne!(first, second);
        assert_eq!(program.get_class_blueprint("A").map(ClassBluePrint::id), Some(first));
        assert!(program.blueprint(second).is_some_and(|bp| !bp.is_valid()));
        assert_eq!(program.diagnostics_of(DiagnosticKind::DuplicateClass).count(), 1);
    }

    #[test]
    fn test_placeholder_is_claimed() {
        let mut program = Program::new("a.php", "main");
        let forward = program.class_placeholder("App.User", Span::line(2));
        let declared = declare(&mut program, "User", Some("App"));
        assert_eq!(forward, declared);
        assert_eq!(program.resolve_class(Some("App"), "User"), Some(declared));
        assert_eq!(program.resolve_class(None, "\\App\\User"), Some(declared));
        program.report_undeclared_classes();
        assert!(program.diagnostics().is_empty());
    }

    #[test]
    fn test_hierarchy_merges_parents_first() {
        let mut program = Program::new("a.php", "main");
        let a = declare(&mut program, "A", None);
        let b = declare(&mut program, "B", None);
        let c = declare(&mut program, "C", None);
        if let Some(bp) = program.blueprint_mut(a) {
            bp.add_field(Field {
                name: "x".into(),
                ty: SsaType::int(),
                modifiers: Modifiers::PUBLIC,
                default: None,
                source: MemberSource::Own,
            });
        }
        // C extends B extends A, declared in child-first edge order
        if let Some(bp) = program.blueprint_mut(c) {
            bp.add_parent(b);
        }
        if let Some(bp) = program.blueprint_mut(b) {
            bp.add_parent(a);
        }
        program.resolve_hierarchy();
        let x = program
            .get_class_blueprint("C")
            .and_then(|bp| bp.field("x"))
            .map(|f| f.source);
        assert_eq!(x, Some(MemberSource::Parent(b)));
        assert_eq!(
            program.blueprint(c).map(|bp| bp.merged().to_vec()),
            Some(vec![(b, MergeKind::Parent)])
        );
    }

    #[test]
    fn test_inheritance_cycle_is_reported() {
        let mut program = Program::new("a.php", "main");
        let a = declare(&mut program, "A", None);
        let b = declare(&mut program, "B", None);
        if let Some(bp) = program.blueprint_mut(a) {
            bp.add_parent(b);
        }
        if let Some(bp) = program.blueprint_mut(b) {
            bp.add_parent(a);
        }
        program.resolve_hierarchy();
        assert_eq!(program.diagnostics_of(DiagnosticKind::InheritanceCycle).count(), 1);
        assert!(program.blueprints().iter().all(|bp| !bp.is_valid()));
    }

    #[test]
    fn test_library_lookup_normalizes_paths() {
        let mut program = Program::new("a.php", "main");
        program.new_library("App\\Http");
        assert!(program.get_library("App.Http").is_some());
        assert!(program.get_library("\\App\\Http").is_some());
        assert!(program.get_library("App").is_none());
    }
}
