//! Statement and declaration nodes.

use crate::syntax::{Expr, Name, Span};

/// A statement with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// What kind of statement this is
    pub kind: StmtKind,
    /// Where it was written
    pub span: Span,
}

/// A declared parameter or return type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeHint {
    /// `int`, `string`, `Foo`, `\A\B`
    Named(Name),
    /// `?T`
    Nullable(Box<TypeHint>),
    /// `A|B`
    Union(Vec<TypeHint>),
    /// `A&B`
    Intersection(Vec<TypeHint>),
    /// A hint the parser could not make sense of; carries the raw text
    Malformed(String),
}

impl TypeHint {
    /// A named hint, parsed from `\`-separated text.
    #[must_use]
    pub fn named(text: &str) -> Self {
        TypeHint::Named(Name::parse(text))
    }
}

/// A function or method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Name without `$`
    pub name: String,
    /// Declared type
    pub ty: Option<TypeHint>,
    /// Default value
    pub default: Option<Expr>,
    /// `&$x`
    pub by_ref: bool,
    /// `...$x`
    pub variadic: bool,
    /// Constructor property promotion modifiers (`public $x` in `__construct`)
    pub promoted: Vec<Modifier>,
}

impl Param {
    /// An untyped parameter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default: None,
            by_ref: false,
            variadic: false,
            promoted: Vec::new(),
        }
    }

    /// A parameter with a type hint.
    #[must_use]
    pub fn typed(name: impl Into<String>, ty: TypeHint) -> Self {
        Self {
            ty: Some(ty),
            ..Self::new(name)
        }
    }
}

/// A named function or method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// Function name
    pub name: String,
    /// Parameters
    pub params: Vec<Param>,
    /// Declared return type
    pub return_type: Option<TypeHint>,
    /// Body; `None` for abstract and interface methods
    pub body: Option<Vec<Stmt>>,
    /// `function &name()`
    pub by_ref: bool,
    /// Where the declaration was written
    pub span: Span,
}

impl FunctionDecl {
    /// A function with a body.
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<Param>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            params,
            return_type: None,
            body: Some(body),
            by_ref: false,
            span: Span::default(),
        }
    }

    /// A body-less declaration, as in interfaces and abstract classes.
    #[must_use]
    pub fn signature(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            body: None,
            ..Self::new(name, params, Vec::new())
        }
    }
}

/// Member and class modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
    Readonly,
    /// Legacy `var`, equivalent to `public`
    Var,
}

/// `class`, `interface` or `trait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

/// A class-like declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// Class name; `None` for anonymous classes
    pub name: Option<String>,
    /// Declaration keyword
    pub kind: ClassKind,
    /// `abstract`, `final`, `readonly`
    pub modifiers: Vec<Modifier>,
    /// Parent classes (`extends`); interfaces may extend several
    pub extends: Vec<Name>,
    /// Implemented interfaces
    pub implements: Vec<Name>,
    /// Body members
    pub members: Vec<ClassMember>,
    /// Where the declaration was written
    pub span: Span,
}

impl ClassDecl {
    /// An empty class declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: Some(name.into()),
            kind,
            modifiers: Vec::new(),
            extends: Vec::new(),
            implements: Vec::new(),
            members: Vec::new(),
            span: Span::default(),
        }
    }

    /// Adds an `extends` clause.
    #[must_use]
    pub fn extends(mut self, parent: &str) -> Self {
        self.extends.push(Name::parse(parent));
        self
    }

    /// Adds an `implements` clause.
    #[must_use]
    pub fn implements(mut self, interface: &str) -> Self {
        self.implements.push(Name::parse(interface));
        self
    }

    /// Appends a member.
    #[must_use]
    pub fn member(mut self, kind: MemberKind) -> Self {
        self.members.push(ClassMember {
            kind,
            span: Span::default(),
        });
        self
    }
}

/// One member of a class body.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    /// The member
    pub kind: MemberKind,
    /// Where it was written
    pub span: Span,
}

/// Class body member kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberKind {
    /// `public int $x = 1;`
    Property {
        /// Name without `$`
        name: String,
        /// Modifiers
        modifiers: Vec<Modifier>,
        /// Declared type
        ty: Option<TypeHint>,
        /// Initializer
        default: Option<Expr>,
    },
    /// `const X = 1;`
    Const {
        /// Constant name
        name: String,
        /// Modifiers
        modifiers: Vec<Modifier>,
        /// Value
        value: Option<Expr>,
    },
    /// A method declaration
    Method {
        /// The method
        decl: FunctionDecl,
        /// Modifiers
        modifiers: Vec<Modifier>,
    },
    /// `use TraitA, TraitB;`
    TraitUse(Vec<Name>),
    /// Error-recovery node
    Error,
}

impl MemberKind {
    /// A property with modifiers and optional default.
    #[must_use]
    pub fn property(name: impl Into<String>, modifiers: Vec<Modifier>, default: Option<Expr>) -> Self {
        MemberKind::Property {
            name: name.into(),
            modifiers,
            ty: None,
            default,
        }
    }

    /// A method with modifiers.
    #[must_use]
    pub fn method(decl: FunctionDecl, modifiers: Vec<Modifier>) -> Self {
        MemberKind::Method { decl, modifiers }
    }
}

/// `elseif (cond) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    /// Condition
    pub condition: Option<Expr>,
    /// Body
    pub body: Vec<Stmt>,
    /// Where it was written
    pub span: Span,
}

/// `case test:` or `default:`
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Compared value; `None` for `default`
    pub test: Option<Expr>,
    /// Statements, falling through to the next case unless they break
    pub body: Vec<Stmt>,
    /// Where it was written
    pub span: Span,
}

/// `catch (A | B $e) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    /// Caught classes
    pub types: Vec<Name>,
    /// Bound variable, optional since PHP 8
    pub var: Option<String>,
    /// Handler body
    pub body: Vec<Stmt>,
}

/// `const NAME = value;`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    /// Constant name
    pub name: String,
    /// Value
    pub value: Option<Expr>,
}

/// `static $x = value;`
#[derive(Debug, Clone, PartialEq)]
pub struct StaticVar {
    /// Name without `$`
    pub name: String,
    /// Initializer
    pub default: Option<Expr>,
}

/// What a `use` declaration imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseKind {
    /// A class or a whole namespace
    Normal,
    /// `use function`
    Function,
    /// `use const`
    Const,
}

/// One import of a `use` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UseDecl {
    /// Imported name
    pub name: Name,
    /// `as Alias`
    pub alias: Option<String>,
    /// Import flavor
    pub kind: UseKind,
}

impl UseDecl {
    /// A plain `use A\B;`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Name::parse(name),
            alias: None,
            kind: UseKind::Normal,
        }
    }

    /// The local name this import binds.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.name.last())
    }
}

/// All statement kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `expr;`
    Expr(Option<Expr>),
    /// `echo a, b;`
    Echo(Vec<Expr>),
    /// Text outside `<?php ?>` tags
    InlineHtml(String),
    /// `if / elseif / else`
    If {
        /// Condition
        condition: Option<Expr>,
        /// Then body
        then: Vec<Stmt>,
        /// `elseif` clauses in order
        elseifs: Vec<ElseIf>,
        /// `else` body
        otherwise: Option<Vec<Stmt>>,
    },
    /// `while (cond) body`
    While {
        /// Condition
        condition: Option<Expr>,
        /// Body
        body: Vec<Stmt>,
    },
    /// `do body while (cond);`
    DoWhile {
        /// Body
        body: Vec<Stmt>,
        /// Condition
        condition: Option<Expr>,
    },
    /// `for (init; cond; step) body`
    For {
        /// Initializers
        init: Vec<Expr>,
        /// Conditions; the last one decides
        condition: Vec<Expr>,
        /// Step expressions
        step: Vec<Expr>,
        /// Body
        body: Vec<Stmt>,
    },
    /// `foreach (subject as key => value) body`
    Foreach {
        /// Iterated value
        subject: Option<Expr>,
        /// Key target
        key: Option<Expr>,
        /// Value target
        value: Option<Expr>,
        /// `as &$v`
        by_ref: bool,
        /// Body
        body: Vec<Stmt>,
    },
    /// `switch (subject) { cases }`
    Switch {
        /// Compared value
        subject: Option<Expr>,
        /// Cases in order
        cases: Vec<SwitchCase>,
    },
    /// `break n;`
    Break(Option<u32>),
    /// `continue n;`
    Continue(Option<u32>),
    /// `return expr;`
    Return(Option<Expr>),
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// `global $a, $b;`
    Global(Vec<String>),
    /// `static $a = 1;`
    Static(Vec<StaticVar>),
    /// `unset($a, $b[1]);`
    Unset(Vec<Expr>),
    /// `const A = 1;`
    Const(Vec<ConstDecl>),
    /// Named function declaration
    Function(FunctionDecl),
    /// Class, interface or trait declaration
    Class(ClassDecl),
    /// `namespace A\B;` when `body` is `None`, `namespace A\B { ... }` otherwise
    Namespace {
        /// Namespace name; `None` for the global namespace block `namespace { }`
        name: Option<Name>,
        /// Braced body
        body: Option<Vec<Stmt>>,
    },
    /// `use A\B, C as D;`
    Use(Vec<UseDecl>),
    /// `try { } catch { } finally { }`
    Try {
        /// Protected body
        body: Vec<Stmt>,
        /// Handlers
        catches: Vec<Catch>,
        /// `finally` body
        finally: Option<Vec<Stmt>>,
    },
    /// `throw expr;`
    Throw(Option<Expr>),
    /// `;`, `declare(...)` and other statements without effect on the IR
    Nop,
    /// Error-recovery node
    Error,
}

impl Stmt {
    /// Creates a statement with an empty span.
    #[must_use]
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }

    /// Replaces the span.
    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// `expr;`
    #[must_use]
    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(Some(expr)))
    }

    /// `echo a, b;`
    #[must_use]
    pub fn echo(values: Vec<Expr>) -> Self {
        Self::new(StmtKind::Echo(values))
    }

    /// `if (cond) { then } else { otherwise }`
    #[must_use]
    pub fn if_else(condition: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>>) -> Self {
        Self::new(StmtKind::If {
            condition: Some(condition),
            then,
            elseifs: Vec::new(),
            otherwise,
        })
    }

    /// `while (cond) { body }`
    #[must_use]
    pub fn while_loop(condition: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::While {
            condition: Some(condition),
            body,
        })
    }

    /// `foreach ($subject as $key => $value) { body }`
    #[must_use]
    pub fn foreach(subject: Expr, key: Option<Expr>, value: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Foreach {
            subject: Some(subject),
            key,
            value: Some(value),
            by_ref: false,
            body,
        })
    }

    /// `return expr;`
    #[must_use]
    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(value))
    }

    /// Function declaration.
    #[must_use]
    pub fn function(decl: FunctionDecl) -> Self {
        Self::new(StmtKind::Function(decl))
    }

    /// Class declaration.
    #[must_use]
    pub fn class(decl: ClassDecl) -> Self {
        Self::new(StmtKind::Class(decl))
    }

    /// Braced namespace block.
    #[must_use]
    pub fn namespace(name: &str, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Namespace {
            name: Some(Name::parse(name)),
            body: Some(body),
        })
    }

    /// `use` statement.
    #[must_use]
    pub fn use_decl(imports: Vec<UseDecl>) -> Self {
        Self::new(StmtKind::Use(imports))
    }

    /// Short name of the node kind, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            StmtKind::Expr(_) => "expression statement",
            StmtKind::Echo(_) => "echo",
            StmtKind::InlineHtml(_) => "inline html",
            StmtKind::If { .. } => "if",
            StmtKind::While { .. } => "while",
            StmtKind::DoWhile { .. } => "do-while",
            StmtKind::For { .. } => "for",
            StmtKind::Foreach { .. } => "foreach",
            StmtKind::Switch { .. } => "switch",
            StmtKind::Break(_) => "break",
            StmtKind::Continue(_) => "continue",
            StmtKind::Return(_) => "return",
            StmtKind::Block(_) => "block",
            StmtKind::Global(_) => "global",
            StmtKind::Static(_) => "static",
            StmtKind::Unset(_) => "unset",
            StmtKind::Const(_) => "const",
            StmtKind::Function(_) => "function declaration",
            StmtKind::Class(_) => "class declaration",
            StmtKind::Namespace { .. } => "namespace",
            StmtKind::Use(_) => "use",
            StmtKind::Try { .. } => "try",
            StmtKind::Throw(_) => "throw",
            StmtKind::Nop => "nop",
            StmtKind::Error => "error",
        }
    }
}
