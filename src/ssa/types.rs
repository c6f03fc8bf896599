//! Type system for SSA values.
//!
//! PHP is dynamically typed, so the builder works with a deliberately small type lattice:
//! a closed set of primitives, a composite map type used for PHP arrays, a nominal class
//! type referencing a [`crate::ssa::ClassBluePrint`], and `any` as the top type for every
//! value whose type cannot be determined.
//!
//! # Interning
//!
//! Primitive types are interned singletons. Two calls to [`SsaType::int`] (or
//! [`SsaType::by_name`] with `"int"`) return handles that share the same allocation, so
//! identity comparison through [`SsaType::ptr_eq`] is valid for primitives. Map and class
//! types are constructed fresh on every request and compare structurally.
//!
//! # Graceful degradation
//!
//! Type resolution never fails. Unknown names resolve to `any`, and union hints collapse to
//! their single member or to `any` when the members differ.
//!
//! # Thread Safety
//!
//! [`SsaType`] is a cheap `Arc` handle and is `Send` and `Sync`.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::ssa::BlueprintId;

/// The shape of a type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `int64`
    Int64,
    /// `float64`
    Float64,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// `null`
    Null,
    /// The top type, used for anything that could not be resolved.
    Any,
    /// A keyed container, used for PHP arrays.
    Map {
        /// Type of the keys
        key: SsaType,
        /// Type of the values
        value: SsaType,
    },
    /// A nominal reference to a class blueprint.
    Class {
        /// The blueprint this type refers to
        blueprint: BlueprintId,
        /// Name of the class, for display
        name: String,
    },
}

/// An immutable handle to a type.
#[derive(Clone)]
pub struct SsaType(Arc<TypeKind>);

struct Primitives {
    bool: SsaType,
    int: SsaType,
    int64: SsaType,
    float64: SsaType,
    string: SsaType,
    bytes: SsaType,
    null: SsaType,
    any: SsaType,
}

fn primitives() -> &'static Primitives {
    static PRIMITIVES: OnceLock<Primitives> = OnceLock::new();
    PRIMITIVES.get_or_init(|| Primitives {
        bool: SsaType(Arc::new(TypeKind::Bool)),
        int: SsaType(Arc::new(TypeKind::Int)),
        int64: SsaType(Arc::new(TypeKind::Int64)),
        float64: SsaType(Arc::new(TypeKind::Float64)),
        string: SsaType(Arc::new(TypeKind::String)),
        bytes: SsaType(Arc::new(TypeKind::Bytes)),
        null: SsaType(Arc::new(TypeKind::Null)),
        any: SsaType(Arc::new(TypeKind::Any)),
    })
}

impl SsaType {
    /// The interned `bool` type.
    #[must_use]
    pub fn bool() -> Self {
        primitives().bool.clone()
    }

    /// The interned `int` type.
    #[must_use]
    pub fn int() -> Self {
        primitives().int.clone()
    }

    /// The interned `int64` type.
    #[must_use]
    pub fn int64() -> Self {
        primitives().int64.clone()
    }

    /// The interned `float64` type.
    #[must_use]
    pub fn float64() -> Self {
        primitives().float64.clone()
    }

    /// The interned `string` type.
    #[must_use]
    pub fn string() -> Self {
        primitives().string.clone()
    }

    /// The interned `bytes` type.
    #[must_use]
    pub fn bytes() -> Self {
        primitives().bytes.clone()
    }

    /// The interned `null` type.
    #[must_use]
    pub fn null() -> Self {
        primitives().null.clone()
    }

    /// The interned `any` type.
    #[must_use]
    pub fn any() -> Self {
        primitives().any.clone()
    }

    /// Resolves a primitive type name to its interned type.
    ///
    /// Accepts both the IR names (`int64`, `float64`, `bytes`) and the PHP spellings
    /// (`integer`, `float`, `double`, `boolean`, `void`). Matching ignores ASCII case.
    /// Unknown names resolve to `any`; this never fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use phpscope::ssa::SsaType;
    ///
    /// assert!(SsaType::by_name("int").ptr_eq(&SsaType::int()));
    /// assert!(SsaType::by_name("Whatever").is_any());
    /// ```
    #[must_use]
    pub fn by_name(name: &str) -> Self {
        let p = primitives();
        let found = match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" | "false" | "true" => &p.bool,
            "int" | "integer" => &p.int,
            "int64" => &p.int64,
            "float" | "float64" | "double" => &p.float64,
            "string" => &p.string,
            "bytes" => &p.bytes,
            "null" | "void" => &p.null,
            _ => &p.any,
        };
        found.clone()
    }

    /// Constructs a fresh map type. Map types are not interned.
    #[must_use]
    pub fn map(key: SsaType, value: SsaType) -> Self {
        SsaType(Arc::new(TypeKind::Map { key, value }))
    }

    /// Constructs a nominal class type referring to a blueprint.
    #[must_use]
    pub fn class(blueprint: BlueprintId, name: impl Into<String>) -> Self {
        SsaType(Arc::new(TypeKind::Class {
            blueprint,
            name: name.into(),
        }))
    }

    /// Joins the members of a union type hint.
    ///
    /// Returns the common type if all members agree, otherwise `any`.
    #[must_use]
    pub fn union(members: &[SsaType]) -> Self {
        match members.split_first() {
            Some((first, rest)) if rest.iter().all(|m| m == first) => first.clone(),
            _ => Self::any(),
        }
    }

    /// Returns the shape of this type.
    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    /// Identity comparison. Always true for two handles of the same primitive.
    #[must_use]
    pub fn ptr_eq(&self, other: &SsaType) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns `true` if this is the `any` top type.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(*self.0, TypeKind::Any)
    }

    /// Returns `true` for `int`, `int64` and `float64`.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(*self.0, TypeKind::Int | TypeKind::Int64 | TypeKind::Float64)
    }

    /// Returns the blueprint of a class type.
    #[must_use]
    pub fn blueprint(&self) -> Option<BlueprintId> {
        match *self.0 {
            TypeKind::Class { blueprint, .. } => Some(blueprint),
            _ => None,
        }
    }
}

impl Default for SsaType {
    fn default() -> Self {
        Self::any()
    }
}

impl PartialEq for SsaType {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl fmt::Debug for SsaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for SsaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            TypeKind::Bool => write!(f, "bool"),
            TypeKind::Int => write!(f, "int"),
            TypeKind::Int64 => write!(f, "int64"),
            TypeKind::Float64 => write!(f, "float64"),
            TypeKind::String => write!(f, "string"),
            TypeKind::Bytes => write!(f, "bytes"),
            TypeKind::Null => write!(f, "null"),
            TypeKind::Any => write!(f, "any"),
            TypeKind::Map { key, value } => write!(f, "map[{key}]{value}"),
            TypeKind::Class { name, .. } => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_are_interned() {
        assert!(SsaType::int().ptr_eq(&SsaType::int()));
        assert!(SsaType::by_name("int").ptr_eq(&SsaType::int()));
        assert!(SsaType::by_name("Integer").ptr_eq(&SsaType::int()));
        assert!(SsaType::by_name("double").ptr_eq(&SsaType::float64()));
        assert!(!SsaType::int().ptr_eq(&SsaType::int64()));
    }

    #[test]
    fn test_unknown_degrades_to_any() {
        assert!(SsaType::by_name("").is_any());
        assert!(SsaType::by_name("callable").is_any());
        assert!(SsaType::by_name("Foo\\Bar").ptr_eq(&SsaType::any()));
    }

    #[test]
    fn test_map_is_fresh() {
        let a = SsaType::map(SsaType::string(), SsaType::int());
        let b = SsaType::map(SsaType::string(), SsaType::int());
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "map[string]int");
    }

    #[test]
    fn test_union() {
        assert!(SsaType::union(&[SsaType::int(), SsaType::int()]).ptr_eq(&SsaType::int()));
        assert!(SsaType::union(&[SsaType::int(), SsaType::string()]).is_any());
        assert!(SsaType::union(&[]).is_any());
    }

    #[test]
    fn test_class_type() {
        let t = SsaType::class(BlueprintId::new(3), "Foo");
        assert_eq!(t.blueprint(), Some(BlueprintId::new(3)));
        assert_eq!(t.to_string(), "Foo");
        assert!(!t.is_any());
    }
}
