//! Multi-unit container with concurrent builds.
//!
//! A [`Workspace`] owns the frozen [`Program`]s built so far, keyed by unit name. Every
//! new unit is built by its own [`Builder`] with read-only access to the programs already
//! present, so namespaces and classes declared in earlier units resolve in later ones.
//!
//! # Concurrency
//!
//! - frozen programs live behind [`Arc`] in a [`DashMap`] and are never mutated again
//! - each build writes only to its own program; [`Workspace::build_all`] runs them on the
//!   rayon pool
//! - diagnostics of every unit are appended to a lock-free [`boxcar::Vec`]
//!
//! # Examples
//!
//! ```rust
//! use phpscope::syntax::{ClassDecl, ClassKind, Expr, SourceFile, Stmt};
//! use phpscope::workspace::Workspace;
//!
//! let workspace = Workspace::new();
//! workspace.build(&SourceFile::new(
//!     "lib.php",
//!     vec![Stmt::namespace(
//!         "App\\Models",
//!         vec![Stmt::class(ClassDecl::new("User", ClassKind::Class))],
//!     )],
//! ))?;
//! let program = workspace.build(&SourceFile::new(
//!     "main.php",
//!     vec![Stmt::expr(Expr::assign(
//!         Expr::var("u"),
//!         Expr::new_object("\\App\\Models\\User", vec![]),
//!     ))],
//! ))?;
//! assert_eq!(program.error_count(), 0);
//! assert_eq!(workspace.len(), 2);
//! # Ok::<(), phpscope::Error>(())
//! ```

use std::sync::{Arc, RwLock};

use dashmap::{mapref::entry::Entry, DashMap};
use rayon::prelude::*;

use crate::{
    build::{BuildConfig, Builder},
    ssa::{BlueprintId, Diagnostic, Program},
    syntax::SourceFile,
    Error, Result,
};

/// Frozen programs of several compilation units.
pub struct Workspace {
    /// Programs keyed by unit name
    programs: DashMap<String, Arc<Program>>,

    /// Unit names in the order they were added; lookups across units follow it
    order: RwLock<Vec<String>>,

    /// Diagnostics of every unit added so far
    diagnostics: boxcar::Vec<Diagnostic>,

    config: BuildConfig,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// Creates an empty workspace building with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BuildConfig::default())
    }

    /// Creates an empty workspace building with `config`.
    #[must_use]
    pub fn with_config(config: BuildConfig) -> Self {
        Workspace {
            programs: DashMap::new(),
            order: RwLock::new(Vec::new()),
            diagnostics: boxcar::Vec::new(),
            config,
        }
    }

    /// Returns the configuration new units are built with.
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Adds an already built program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateUnit`] if a program with the same unit name exists, and
    /// [`Error::LockError`] if the unit order lock is poisoned.
    pub fn add(&self, program: Program) -> Result<Arc<Program>> {
        let unit = program.unit().to_string();
        let program = Arc::new(program);
        match self.programs.entry(unit.clone()) {
            Entry::Occupied(_) => return Err(Error::DuplicateUnit(unit)),
            Entry::Vacant(slot) => {
                slot.insert(program.clone());
            }
        }

        for diagnostic in program.diagnostics() {
            self.diagnostics.push(diagnostic.clone());
        }
        write_lock!(self.order)?.push(unit.clone());
        log::debug!(
            "[workspace] added {} ({} functions, {} diagnostics)",
            unit,
            program.function_count(),
            program.diagnostics().len()
        );
        Ok(program)
    }

    /// Builds one unit against every program already in the workspace and adds it.
    ///
    /// # Errors
    ///
    /// Fails if the build fails (see [`Builder::build`]) or the unit already exists.
    pub fn build(&self, file: &SourceFile) -> Result<Arc<Program>> {
        let imports = self.programs()?;
        let program = self.builder(imports).build(Some(file))?;
        self.add(program)
    }

    /// Builds independent units concurrently and adds them in input order.
    ///
    /// Units of one batch see the programs present before the batch started, not each
    /// other. A failing unit does not stop the others; its error is returned in its slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the unit order lock is poisoned before any build
    /// starts.
    pub fn build_all(&self, files: &[SourceFile]) -> Result<Vec<Result<Arc<Program>>>> {
        let imports = self.programs()?;
        let builder = self.builder(imports);
        log::debug!("[workspace] building {} units", files.len());

        let built: Vec<Result<Program>> = files
            .par_iter()
            .map(|file| builder.build(Some(file)))
            .collect();

        Ok(built
            .into_iter()
            .map(|program| program.and_then(|p| self.add(p)))
            .collect())
    }

    fn builder(&self, imports: Vec<Arc<Program>>) -> Builder {
        Builder::new()
            .with_config(self.config.clone())
            .with_imports(imports)
    }

    /// Returns all programs in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the unit order lock is poisoned.
    pub fn programs(&self) -> Result<Vec<Arc<Program>>> {
        let order = read_lock!(self.order)?;
        Ok(order
            .iter()
            .filter_map(|unit| self.get(unit))
            .collect())
    }

    /// Returns the program of `unit`.
    #[must_use]
    pub fn get(&self, unit: &str) -> Option<Arc<Program>> {
        self.programs.get(unit).map(|entry| entry.value().clone())
    }

    /// Returns `true` if `unit` has been added.
    #[must_use]
    pub fn contains(&self, unit: &str) -> bool {
        self.programs.contains_key(unit)
    }

    /// Returns the unit names in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the unit order lock is poisoned.
    pub fn units(&self) -> Result<Vec<String>> {
        Ok(read_lock!(self.order)?.clone())
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns `true` if no unit has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Diagnostics of all units, in the order the units were added.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().map(|(_, d)| d)
    }

    /// Number of error diagnostics across all units.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics().filter(|d| d.is_error()).count()
    }

    /// Returns every program that declares the library `path` (dotted).
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the unit order lock is poisoned.
    pub fn find_library(&self, path: &str) -> Result<Vec<Arc<Program>>> {
        Ok(self
            .programs()?
            .into_iter()
            .filter(|program| program.get_library(path).is_some())
            .collect())
    }

    /// Returns the first unit that declares the class `name` (dotted qualified name),
    /// with the blueprint's id in that unit's program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the unit order lock is poisoned.
    pub fn find_class(&self, name: &str) -> Result<Option<(Arc<Program>, BlueprintId)>> {
        for program in self.programs()? {
            let found = program
                .get_class_blueprint(name)
                .filter(|bp| bp.is_declared())
                .map(|bp| bp.id());
            if let Some(id) = found {
                return Ok(Some((program, id)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Expr, Stmt};

    fn unit(name: &str) -> SourceFile {
        SourceFile::new(name, vec![Stmt::echo(vec![Expr::string("hi")])])
    }

    #[test]
    fn test_duplicate_unit() -> Result<()> {
        let workspace = Workspace::new();
        workspace.build(&unit("a.php"))?;
        assert!(matches!(
            workspace.build(&unit("a.php")),
            Err(Error::DuplicateUnit(name)) if name == "a.php"
        ));
        assert_eq!(workspace.len(), 1);
        Ok(())
    }

    #[test]
    fn test_build_all_keeps_order() -> Result<()> {
        let workspace = Workspace::new();
        let files: Vec<SourceFile> = (0..8).map(|i| unit(&format!("u{i}.php"))).collect();
        let results = workspace.build_all(&files)?;
        assert!(results.iter().all(Result::is_ok));
        let expected: Vec<String> = (0..8).map(|i| format!("u{i}.php")).collect();
        assert_eq!(workspace.units()?, expected);
        Ok(())
    }

    #[test]
    fn test_build_all_reports_per_unit() -> Result<()> {
        let workspace = Workspace::new();
        let files = vec![unit("x.php"), unit("x.php"), unit("y.php")];
        let results = workspace.build_all(&files)?;
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::DuplicateUnit(_))));
        assert!(results[2].is_ok());
        assert_eq!(workspace.len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty() {
        let workspace = Workspace::default();
        assert!(workspace.is_empty());
        assert_eq!(workspace.diagnostics().count(), 0);
        assert!(workspace.get("main.php").is_none());
    }
}
