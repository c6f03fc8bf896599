//! Configuration for the SSA builder.

/// Configuration for building one compilation unit.
///
/// Controls naming, constant folding, builtin symbol resolution and how tolerant the
/// builder is of incomplete parse trees.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Unit name used when the source file carries none (default: `main.php`).
    pub unit: String,

    /// Package receiving the unit's functions (default: `main`).
    pub package: String,

    /// Fold binary and unary operations over constants (default: true).
    ///
    /// The operation is still emitted; the folded `Const` instruction follows it and is
    /// what later reads observe.
    pub constant_folding: bool,

    /// Resolve superglobals, builtin functions, builtin classes and builtin constants to
    /// externs instead of reporting them as undefined (default: true).
    pub builtins: bool,

    /// Build trees that carry parser errors (default: true).
    ///
    /// When disabled, a tree with a non-zero error count fails the whole unit with
    /// [`crate::Error::Unparseable`].
    pub allow_partial_tree: bool,

    /// Maximum nesting of closures and arrow functions (default: 256).
    ///
    /// Deeper closures are reported as unsupported and replaced by an undefined value.
    pub max_closure_depth: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            unit: "main.php".to_string(),
            package: "main".to_string(),
            constant_folding: true,
            builtins: true,
            allow_partial_tree: true,
            max_closure_depth: 256,
        }
    }
}

impl BuildConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that resolves nothing implicitly and folds nothing.
    ///
    /// Every name must be declared in the unit or an import; useful for testing the
    /// structure of the produced SSA.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            constant_folding: false,
            builtins: false,
            allow_partial_tree: false,
            ..Self::default()
        }
    }

    /// Sets the fallback unit name.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Sets the package name.
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.unit, "main.php");
        assert_eq!(config.package, "main");
        assert!(config.constant_folding);
        assert!(config.builtins);
        assert!(config.allow_partial_tree);
        assert_eq!(config.max_closure_depth, 256);
    }

    #[test]
    fn test_strict() {
        let config = BuildConfig::strict().with_package("lib");
        assert!(!config.builtins);
        assert!(!config.constant_folding);
        assert!(!config.allow_partial_tree);
        assert_eq!(config.package, "lib");
    }
}
