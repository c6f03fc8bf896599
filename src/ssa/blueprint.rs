//! Class blueprints: the nominal type model.
//!
//! A [`ClassBluePrint`] describes a class, interface or trait: its ordered field list,
//! its method table (name to [`FunctionId`]), its constants, and the blueprints it was
//! merged with. Blueprints live in the program arena and are addressed by
//! [`BlueprintId`].
//!
//! # Merging
//!
//! Inheritance, interface implementation and trait use are all expressed as merges of a
//! source blueprint into a target ([`ClassBluePrint::merge_from`]). The conflict policy
//! is deterministic:
//!
//! - members declared by the class itself always win
//! - otherwise trait members beat inherited members, which beat interface members
//! - between two sources of the same rank the first merge wins; two traits providing
//!   the same member is reported as a conflict
//!
//! Merging the same (source, kind) pair twice is a no-op, and the order of members
//! in the target follows the order in which they were first added.
//!
//! # Forward references
//!
//! A class can be referenced (`extends B`, `new B`) before it is declared. The registry
//! hands out a placeholder that is not yet *declared*; the later declaration claims it.

use std::fmt;

use bitflags::bitflags;
use strum::Display;

use crate::{
    ssa::{FunctionId, SsaType, ValueRef},
    syntax::Span,
};

define_id!(
    /// Identifies a class blueprint within its program.
    BlueprintId, "c"
);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Member and class modifiers
    pub struct Modifiers: u16 {
        /// `public`
        const PUBLIC = 0x0001;
        /// `protected`
        const PROTECTED = 0x0002;
        /// `private`
        const PRIVATE = 0x0004;
        /// `static`
        const STATIC = 0x0008;
        /// `final`
        const FINAL = 0x0010;
        /// `abstract`
        const ABSTRACT = 0x0020;
        /// `readonly`
        const READONLY = 0x0040;
    }
}

impl Modifiers {
    /// Returns `true` for static members.
    #[must_use]
    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    /// Returns the effective visibility; members without one are public.
    #[must_use]
    pub fn visibility(self) -> Modifiers {
        if self.contains(Modifiers::PRIVATE) {
            Modifiers::PRIVATE
        } else if self.contains(Modifiers::PROTECTED) {
            Modifiers::PROTECTED
        } else {
            Modifiers::PUBLIC
        }
    }
}

/// Declaration keyword of a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BlueprintKind {
    /// `class`
    Class,
    /// `interface`
    Interface,
    /// `trait`
    Trait,
}

/// How a source blueprint is merged into a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MergeKind {
    /// `extends`
    Parent,
    /// `implements`
    Interface,
    /// `use Trait;`
    Trait,
}

/// Where a member of a blueprint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberSource {
    /// Declared in the class body
    Own,
    /// Copied from a used trait
    Trait(BlueprintId),
    /// Inherited from a parent class
    Parent(BlueprintId),
    /// Declared by an implemented interface
    Interface(BlueprintId),
}

impl MemberSource {
    fn rank(self) -> u8 {
        match self {
            MemberSource::Own => 3,
            MemberSource::Trait(_) => 2,
            MemberSource::Parent(_) => 1,
            MemberSource::Interface(_) => 0,
        }
    }

    fn from_merge(kind: MergeKind, source: BlueprintId) -> Self {
        match kind {
            MergeKind::Parent => MemberSource::Parent(source),
            MergeKind::Interface => MemberSource::Interface(source),
            MergeKind::Trait => MemberSource::Trait(source),
        }
    }
}

/// A property of a blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Name without `$`
    pub name: String,
    /// Declared type, `any` if untyped
    pub ty: SsaType,
    /// Modifiers
    pub modifiers: Modifiers,
    /// Initializer value, evaluated in the declaring function
    pub default: Option<ValueRef>,
    /// Origin of the member
    pub source: MemberSource,
}

/// A method of a blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// Method name as written
    pub name: String,
    /// The function implementing it; `None` for abstract and interface methods
    pub function: Option<FunctionId>,
    /// Modifiers
    pub modifiers: Modifiers,
    /// Origin of the member
    pub source: MemberSource,
}

/// A class constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassConst {
    /// Constant name
    pub name: String,
    /// Value, evaluated in the declaring function
    pub value: Option<ValueRef>,
    /// Modifiers
    pub modifiers: Modifiers,
    /// Origin of the member
    pub source: MemberSource,
}

trait Member: Clone {
    fn name(&self) -> &str;
    fn source(&self) -> MemberSource;
    fn with_source(&self, source: MemberSource) -> Self;
}

macro_rules! impl_member {
    ($ty:ty) => {
        impl Member for $ty {
            fn name(&self) -> &str {
                &self.name
            }

            fn source(&self) -> MemberSource {
                self.source
            }

            fn with_source(&self, source: MemberSource) -> Self {
                let mut member = self.clone();
                member.source = source;
                member
            }
        }
    };
}

impl_member!(Field);
impl_member!(Method);
impl_member!(ClassConst);

/// Outcome of a single merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// `false` if the pair had already been merged
    pub applied: bool,
    /// Members added or replaced in the target
    pub changed: usize,
    /// Names of members two traits both provide
    pub conflicts: Vec<String>,
}

/// A nominal class, interface or trait type.
#[derive(Debug, Clone)]
pub struct ClassBluePrint {
    id: BlueprintId,
    name: String,
    qualified_name: String,
    kind: BlueprintKind,
    modifiers: Modifiers,
    library: Option<String>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    consts: Vec<ClassConst>,
    parents: Vec<BlueprintId>,
    interfaces: Vec<BlueprintId>,
    traits: Vec<BlueprintId>,
    merged: Vec<(BlueprintId, MergeKind)>,
    constructor: Option<FunctionId>,
    destructor: Option<FunctionId>,
    declared: bool,
    valid: bool,
    span: Span,
}

impl ClassBluePrint {
    /// Creates an empty, undeclared blueprint.
    #[must_use]
    pub fn new(id: BlueprintId, name: impl Into<String>, library: Option<&str>) -> Self {
        let name = name.into();
        let qualified_name = match library {
            Some(lib) if !lib.is_empty() => format!("{lib}.{name}"),
            _ => name.clone(),
        };
        Self {
            id,
            name,
            qualified_name,
            kind: BlueprintKind::Class,
            modifiers: Modifiers::empty(),
            library: library.filter(|l| !l.is_empty()).map(str::to_string),
            fields: Vec::new(),
            methods: Vec::new(),
            consts: Vec::new(),
            parents: Vec::new(),
            interfaces: Vec::new(),
            traits: Vec::new(),
            merged: Vec::new(),
            constructor: None,
            destructor: None,
            declared: false,
            valid: true,
            span: Span::default(),
        }
    }

    /// Returns the blueprint id.
    #[must_use]
    pub const fn id(&self) -> BlueprintId {
        self.id
    }

    /// Returns the simple class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the namespace-qualified name, dotted (`App.Models.User`).
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Returns the declaration keyword.
    #[must_use]
    pub const fn kind(&self) -> BlueprintKind {
        self.kind
    }

    /// Returns the class modifiers (`abstract`, `final`, `readonly`).
    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Returns the namespace library path, if any.
    #[must_use]
    pub fn library(&self) -> Option<&str> {
        self.library.as_deref()
    }

    /// Returns the nominal type of instances.
    #[must_use]
    pub fn ty(&self) -> SsaType {
        SsaType::class(self.id, self.name.clone())
    }

    /// Returns fields in declaration and merge order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the static fields.
    pub fn static_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.modifiers.is_static())
    }

    /// Returns methods in declaration and merge order.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Returns a method by name. Method names are case-insensitive.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Returns the class constants.
    #[must_use]
    pub fn consts(&self) -> &[ClassConst] {
        &self.consts
    }

    /// Returns a class constant by name.
    #[must_use]
    pub fn class_const(&self, name: &str) -> Option<&ClassConst> {
        self.consts.iter().find(|c| c.name == name)
    }

    /// Returns the declared parent classes.
    #[must_use]
    pub fn parents(&self) -> &[BlueprintId] {
        &self.parents
    }

    /// Returns the declared interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[BlueprintId] {
        &self.interfaces
    }

    /// Returns the used traits.
    #[must_use]
    pub fn traits(&self) -> &[BlueprintId] {
        &self.traits
    }

    /// Returns the merges applied so far, in order.
    #[must_use]
    pub fn merged(&self) -> &[(BlueprintId, MergeKind)] {
        &self.merged
    }

    /// Returns all declared merge sources in application order: parents, interfaces,
    /// then traits.
    #[must_use]
    pub fn merge_sources(&self) -> Vec<(BlueprintId, MergeKind)> {
        self.parents
            .iter()
            .map(|p| (*p, MergeKind::Parent))
            .chain(self.interfaces.iter().map(|i| (*i, MergeKind::Interface)))
            .chain(self.traits.iter().map(|t| (*t, MergeKind::Trait)))
            .collect()
    }

    /// Returns the constructor (`__construct`), own or inherited.
    #[must_use]
    pub const fn constructor(&self) -> Option<FunctionId> {
        self.constructor
    }

    /// Returns the destructor (`__destruct`), own or inherited.
    #[must_use]
    pub const fn destructor(&self) -> Option<FunctionId> {
        self.destructor
    }

    /// Returns `true` once a declaration has claimed this blueprint.
    #[must_use]
    pub const fn is_declared(&self) -> bool {
        self.declared
    }

    /// Returns `false` for blueprints excluded from strict analyses (duplicates, cycles).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns the declaration span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    pub(crate) fn declare(&mut self, kind: BlueprintKind, modifiers: Modifiers, span: Span) {
        self.kind = kind;
        self.modifiers = modifiers;
        self.span = span;
        self.declared = true;
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    pub(crate) fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    /// Takes over the member shape of a blueprint from another program.
    ///
    /// Values and functions of the source live in a foreign arena, so initializers,
    /// method bodies and class-typed field types are dropped.
    pub(crate) fn import_shape(&mut self, source: &ClassBluePrint) {
        self.declare(source.kind, source.modifiers, source.span);
        self.fields = source
            .fields
            .iter()
            .map(|f| Field {
                ty: if f.ty.blueprint().is_some() {
                    SsaType::any()
                } else {
                    f.ty.clone()
                },
                default: None,
                source: MemberSource::Own,
                ..f.clone()
            })
            .collect();
        self.methods = source
            .methods
            .iter()
            .map(|m| Method {
                function: None,
                source: MemberSource::Own,
                ..m.clone()
            })
            .collect();
        self.consts = source
            .consts
            .iter()
            .map(|c| ClassConst {
                value: None,
                source: MemberSource::Own,
                ..c.clone()
            })
            .collect();
    }

    /// Rewrites every value reference held by members.
    pub(crate) fn map_value_refs(&mut self, f: impl Fn(ValueRef) -> ValueRef) {
        for field in &mut self.fields {
            field.default = field.default.map(&f);
        }
        for constant in &mut self.consts {
            constant.value = constant.value.map(&f);
        }
    }

    pub(crate) fn add_parent(&mut self, parent: BlueprintId) {
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
    }

    pub(crate) fn add_interface(&mut self, interface: BlueprintId) {
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
    }

    pub(crate) fn add_trait(&mut self, used: BlueprintId) {
        if !self.traits.contains(&used) {
            self.traits.push(used);
        }
    }

    /// Adds an own field; returns `false` if the class already declares one by that name.
    pub(crate) fn add_field(&mut self, field: Field) -> bool {
        place_own(&mut self.fields, field)
    }

    /// Adds an own method; returns `false` if the class already declares one by that name.
    pub(crate) fn add_method(&mut self, method: Method) -> bool {
        let name = method.name.to_ascii_lowercase();
        let function = method.function;
        if !place_own(&mut self.methods, method) {
            return false;
        }
        match name.as_str() {
            "__construct" => self.constructor = function,
            "__destruct" => self.destructor = function,
            _ => {}
        }
        true
    }

    /// Adds an own constant; returns `false` if the class already declares one by that name.
    pub(crate) fn add_const(&mut self, constant: ClassConst) -> bool {
        place_own(&mut self.consts, constant)
    }

    /// Copies the members of `source` into this blueprint following the conflict policy
    /// described in the module documentation.
    pub fn merge_from(&mut self, source: &ClassBluePrint, kind: MergeKind) -> MergeOutcome {
        if source.id == self.id || self.merged.contains(&(source.id, kind)) {
            return MergeOutcome::default();
        }
        let origin = MemberSource::from_merge(kind, source.id);
        let mut outcome = MergeOutcome {
            applied: true,
            ..MergeOutcome::default()
        };

        for field in &source.fields {
            merge_member(&mut self.fields, field.with_source(origin), &mut outcome);
        }
        for method in &source.methods {
            merge_member(&mut self.methods, method.with_source(origin), &mut outcome);
        }
        for constant in &source.consts {
            merge_member(&mut self.consts, constant.with_source(origin), &mut outcome);
        }

        if self.constructor.is_none() || kind == MergeKind::Trait {
            if let Some(ctor) = self.method("__construct").and_then(|m| m.function) {
                self.constructor = Some(ctor);
            }
        }
        if self.destructor.is_none() || kind == MergeKind::Trait {
            if let Some(dtor) = self.method("__destruct").and_then(|m| m.function) {
                self.destructor = Some(dtor);
            }
        }

        self.merged.push((source.id, kind));
        outcome
    }
}

fn place_own<T: Member>(members: &mut Vec<T>, member: T) -> bool {
    match members
        .iter()
        .position(|m| m.name().eq_ignore_ascii_case(member.name()))
    {
        Some(i) if members[i].source() == MemberSource::Own => false,
        Some(i) => {
            members[i] = member;
            true
        }
        None => {
            members.push(member);
            true
        }
    }
}

fn merge_member<T: Member>(members: &mut Vec<T>, incoming: T, outcome: &mut MergeOutcome) {
    let Some(i) = members
        .iter()
        .position(|m| m.name().eq_ignore_ascii_case(incoming.name()))
    else {
        members.push(incoming);
        outcome.changed += 1;
        return;
    };

    let existing = members[i].source();
    let new = incoming.source();
    if new.rank() > existing.rank() {
        members[i] = incoming;
        outcome.changed += 1;
    } else if new.rank() == existing.rank()
        && existing != new
        && matches!(
            (existing, new),
            (MemberSource::Trait(_), MemberSource::Trait(_))
        )
    {
        outcome.conflicts.push(incoming.name().to_string());
    }
}

impl fmt::Display for ClassBluePrint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} fields, {} methods, {} consts)",
            self.kind,
            self.qualified_name,
            self.fields.len(),
            self.methods.len(),
            self.consts.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Field {
        Field {
            name: name.to_string(),
            ty: SsaType::any(),
            modifiers: Modifiers::PUBLIC,
            default: None,
            source: MemberSource::Own,
        }
    }

    fn method(name: &str, function: usize) -> Method {
        Method {
            name: name.to_string(),
            function: Some(FunctionId::new(function)),
            modifiers: Modifiers::PUBLIC,
            source: MemberSource::Own,
        }
    }

    fn blueprint(id: usize, name: &str) -> ClassBluePrint {
        let mut bp = ClassBluePrint::new(BlueprintId::new(id), name, None);
        bp.declare(BlueprintKind::Class, Modifiers::empty(), Span::default());
        bp
    }

    #[test]
    fn test_modifiers() {
        let m = Modifiers::PRIVATE | Modifiers::STATIC;
        assert!(m.is_static());
        assert_eq!(m.visibility(), Modifiers::PRIVATE);
        assert_eq!(Modifiers::empty().visibility(), Modifiers::PUBLIC);
    }

    #[test]
    fn test_parent_merge_exposes_fields() {
        let mut a = blueprint(0, "A");
        a.add_field(field("x"));
        let mut b = blueprint(1, "B");
        let outcome = b.merge_from(&a, MergeKind::Parent);
        assert!(outcome.applied);
        assert_eq!(outcome.changed, 1);
        let x = b.field("x").cloned();
        assert_eq!(x.map(|f| f.source), Some(MemberSource::Parent(a.id())));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut a = blueprint(0, "A");
        a.add_field(field("x"));
        a.add_method(method("run", 3));
        let mut b = blueprint(1, "B");
        b.merge_from(&a, MergeKind::Parent);
        let again = b.merge_from(&a, MergeKind::Parent);
        assert!(!again.applied);
        assert_eq!(b.fields().len(), 1);
        assert_eq!(b.methods().len(), 1);
        assert_eq!(b.merged().len(), 1);
    }

    #[test]
    fn test_own_members_win() {
        let mut a = blueprint(0, "A");
        a.add_method(method("run", 3));
        let mut b = blueprint(1, "B");
        b.add_method(method("run", 4));
        b.merge_from(&a, MergeKind::Parent);
        assert_eq!(b.method("run").and_then(|m| m.function), Some(FunctionId::new(4)));
        assert_eq!(b.method("RUN").map(|m| m.source), Some(MemberSource::Own));
    }

    #[test]
    fn test_trait_beats_parent_regardless_of_order() {
        let mut parent = blueprint(0, "P");
        parent.add_method(method("hello", 1));
        let mut tr = blueprint(1, "T");
        tr.add_method(method("hello", 2));

        let mut c = blueprint(2, "C");
        c.merge_from(&parent, MergeKind::Parent);
        c.merge_from(&tr, MergeKind::Trait);
        assert_eq!(c.method("hello").and_then(|m| m.function), Some(FunctionId::new(2)));

        let mut d = blueprint(3, "D");
        d.merge_from(&tr, MergeKind::Trait);
        d.merge_from(&parent, MergeKind::Parent);
        assert_eq!(d.method("hello").and_then(|m| m.function), Some(FunctionId::new(2)));
    }

    #[test]
    fn test_trait_conflict_first_wins() {
        let mut t1 = blueprint(0, "T1");
        t1.add_method(method("go", 1));
        let mut t2 = blueprint(1, "T2");
        t2.add_method(method("go", 2));
        let mut c = blueprint(2, "C");
        c.merge_from(&t1, MergeKind::Trait);
        let outcome = c.merge_from(&t2, MergeKind::Trait);
        assert_eq!(outcome.conflicts, vec!["go".to_string()]);
        assert_eq!(c.method("go").and_then(|m| m.function), Some(FunctionId::new(1)));
    }

    #[test]
    fn test_constructor_is_inherited() {
        let mut a = blueprint(0, "A");
        a.add_method(method("__construct", 7));
        assert_eq!(a.constructor(), Some(FunctionId::new(7)));
        let mut b = blueprint(1, "B");
        b.merge_from(&a, MergeKind::Parent);
        assert_eq!(b.constructor(), Some(FunctionId::new(7)));
    }

    #[test]
    fn test_duplicate_own_member_rejected() {
        let mut a = blueprint(0, "A");
        assert!(a.add_field(field("x")));
        assert!(!a.add_field(field("x")));
        assert_eq!(a.fields().len(), 1);
    }

    #[test]
    fn test_qualified_name() {
        let bp = ClassBluePrint::new(BlueprintId::new(0), "User", Some("App.Models"));
        assert_eq!(bp.qualified_name(), "App.Models.User");
        assert_eq!(bp.library(), Some("App.Models"));
        assert!(!bp.is_declared());
    }
}
