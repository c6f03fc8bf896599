//! Namespace libraries.
//!
//! A [`Library`] is the registry of one namespace, keyed by its dotted path (`App.Models`
//! for `namespace App\Models;`). It holds the functions and classes declared in that
//! namespace, the constants it defines, the namespaces it imports wholesale, and the
//! implicit `init` function that runs the namespace's top-level statements.
//!
//! Libraries are created lazily on first reference and filled incrementally: several
//! `namespace` blocks for the same path in one file all add to the same library, and
//! their top-level statements accumulate into the same `init` function.
//!
//! Function and class names are case-insensitive and stored lowercased; constants are
//! case-sensitive.

use std::collections::BTreeMap;

use crate::ssa::{BlueprintId, FunctionId, ValueRef};

/// One namespace.
#[derive(Debug, Clone)]
pub struct Library {
    path: String,
    segments: Vec<String>,
    functions: BTreeMap<String, FunctionId>,
    init: Option<FunctionId>,
    classes: BTreeMap<String, BlueprintId>,
    consts: BTreeMap<String, ValueRef>,
    imports: Vec<String>,
}

impl Library {
    /// Creates an empty library for a dotted path.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            functions: BTreeMap::new(),
            init: None,
            classes: BTreeMap::new(),
            consts: BTreeMap::new(),
            imports: Vec::new(),
        }
    }

    /// Returns the dotted path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the path segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the namespace as written in source, `\`-separated.
    #[must_use]
    pub fn namespace(&self) -> String {
        self.segments.join("\\")
    }

    /// Returns the functions declared in this namespace, keyed by lowercased name.
    #[must_use]
    pub fn functions(&self) -> &BTreeMap<String, FunctionId> {
        &self.functions
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<FunctionId> {
        self.functions.get(&name.to_ascii_lowercase()).copied()
    }

    /// Returns the `init` function holding the namespace's top-level code.
    #[must_use]
    pub const fn init(&self) -> Option<FunctionId> {
        self.init
    }

    /// Returns the classes visible under a simple name, including `use` aliases.
    #[must_use]
    pub fn classes(&self) -> &BTreeMap<String, BlueprintId> {
        &self.classes
    }

    /// Looks up a class by its simple name in this namespace only.
    #[must_use]
    pub fn get_class_blueprint(&self, name: &str) -> Option<BlueprintId> {
        self.classes.get(&name.to_ascii_lowercase()).copied()
    }

    /// Returns the constants defined in this namespace.
    #[must_use]
    pub fn consts(&self) -> &BTreeMap<String, ValueRef> {
        &self.consts
    }

    /// Looks up a constant.
    #[must_use]
    pub fn constant(&self, name: &str) -> Option<ValueRef> {
        self.consts.get(name).copied()
    }

    /// Returns the dotted paths of the libraries imported wholesale with `use`.
    #[must_use]
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Registers a function; returns `false` if the name is taken.
    pub(crate) fn add_function(&mut self, name: &str, function: FunctionId) -> bool {
        let key = name.to_ascii_lowercase();
        if self.functions.contains_key(&key) {
            return false;
        }
        self.functions.insert(key, function);
        true
    }

    pub(crate) fn set_init(&mut self, function: FunctionId) {
        self.init = Some(function);
    }

    /// Binds `name` to a blueprint unless the name is already bound.
    ///
    /// Returns `true` when the binding was added, or already pointed at `blueprint`.
    pub(crate) fn set_class_blueprint(&mut self, name: &str, blueprint: BlueprintId) -> bool {
        let slot = self
            .classes
            .entry(name.to_ascii_lowercase())
            .or_insert(blueprint);
        *slot == blueprint
    }

    /// Defines a constant; returns `false` if it already exists.
    pub(crate) fn add_const(&mut self, name: &str, value: ValueRef) -> bool {
        if self.consts.contains_key(name) {
            return false;
        }
        self.consts.insert(name.to_string(), value);
        true
    }

    pub(crate) fn map_consts(&mut self, f: impl Fn(ValueRef) -> ValueRef) {
        for value in self.consts.values_mut() {
            *value = f(*value);
        }
    }

    pub(crate) fn add_import(&mut self, path: &str) {
        if path != self.path && !self.imports.iter().any(|p| p == path) {
            self.imports.push(path.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssa::ValueId;

    #[test]
    fn test_library_path() {
        let lib = Library::new("App.Models");
        assert_eq!(lib.segments(), &["App".to_string(), "Models".to_string()]);
        assert_eq!(lib.namespace(), "App\\Models");
        assert!(lib.init().is_none());
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut lib = Library::new("A");
        assert!(lib.add_function("Helper", FunctionId::new(1)));
        assert!(!lib.add_function("helper", FunctionId::new(2)));
        assert_eq!(lib.function("HELPER"), Some(FunctionId::new(1)));

        assert!(lib.set_class_blueprint("User", BlueprintId::new(0)));
        assert!(lib.set_class_blueprint("user", BlueprintId::new(0)));
        assert!(!lib.set_class_blueprint("USER", BlueprintId::new(3)));
        assert_eq!(lib.get_class_blueprint("uSeR"), Some(BlueprintId::new(0)));
    }

    #[test]
    fn test_constants_and_imports() {
        let mut lib = Library::new("A");
        let r = ValueRef {
            function: FunctionId::new(0),
            value: ValueId::new(4),
        };
        assert!(lib.add_const("LIMIT", r));
        assert!(!lib.add_const("LIMIT", r));
        assert_eq!(lib.constant("LIMIT"), Some(r));
        assert_eq!(lib.constant("limit"), None);

        lib.add_import("B");
        lib.add_import("B");
        lib.add_import("A");
        assert_eq!(lib.imports(), &["B".to_string()]);
    }
}
