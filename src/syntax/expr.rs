//! Expression nodes.

use crate::syntax::{Name, Param, Span, Stmt, TypeHint};

/// An expression with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// What kind of expression this is
    pub kind: ExprKind,
    /// Where it was written
    pub span: Span,
}

/// Binary operators as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    /// `.`
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    NotEq,
    Identical,
    NotIdentical,
    Lt,
    Le,
    Gt,
    Ge,
    Spaceship,
}

/// Short-circuit and keyword logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    /// `&&` and `and`
    And,
    /// `||` and `or`
    Or,
    /// `xor`
    Xor,
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `+`
    Plus,
    /// `~`
    BitNot,
    /// `@`, the error suppression operator
    Silence,
}

/// Compound assignment operators: the binary operator applied before storing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `op=` for an arithmetic, bitwise or concat operator
    Binary(BinaryOperator),
    /// `??=`
    Coalesce,
}

/// Target of a cast expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CastKind {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
    Unset,
}

/// `include`, `include_once`, `require`, `require_once`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum IncludeKind {
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
}

/// Compile-time magic constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MagicConst {
    Line,
    File,
    Dir,
    Class,
    Function,
    Method,
    Namespace,
}

/// The class side of `A::x`, `new A`, `instanceof A`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    /// A written class name
    Named(Name),
    /// `self`
    SelfRef,
    /// `parent`
    Parent,
    /// `static`
    Static,
    /// `$obj::x`, `new $cls`
    Dynamic(Box<Expr>),
}

/// One element of an array literal or a `list()` pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    /// Explicit key, if any
    pub key: Option<Expr>,
    /// Element value; `None` for skipped slots in `list(, $b)`
    pub value: Option<Expr>,
    /// `&$x`
    pub by_ref: bool,
    /// `...$rest`
    pub spread: bool,
}

/// One variable captured by a closure's `use` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureUse {
    /// Variable name without `$`
    pub name: String,
    /// Captured with `&`
    pub by_ref: bool,
}

/// `function (...) use (...) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureDecl {
    /// Parameters
    pub params: Vec<Param>,
    /// Explicitly captured variables
    pub uses: Vec<ClosureUse>,
    /// Declared return type
    pub return_type: Option<TypeHint>,
    /// Body statements
    pub body: Vec<Stmt>,
    /// `static function`
    pub is_static: bool,
}

/// `fn (...) => expr`
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFnDecl {
    /// Parameters
    pub params: Vec<Param>,
    /// Declared return type
    pub return_type: Option<TypeHint>,
    /// Body expression
    pub body: Option<Expr>,
}

/// All expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal without interpolation
    String(String),
    /// `true` / `false`
    Bool(bool),
    /// `null`
    Null,
    /// Double-quoted or heredoc string with embedded expressions
    Interpolated(Vec<Expr>),
    /// `$name`
    Variable(String),
    /// `$$expr`
    VariableVariable(Option<Box<Expr>>),
    /// `target = value` and `target = &value`
    Assign {
        /// Assigned place
        target: Option<Box<Expr>>,
        /// Assigned value
        value: Option<Box<Expr>>,
        /// `=&`
        by_ref: bool,
    },
    /// `target op= value`
    CompoundAssign {
        /// The operator
        op: AssignOp,
        /// Assigned place
        target: Option<Box<Expr>>,
        /// Right-hand side
        value: Option<Box<Expr>>,
    },
    /// `list($a, $b) = value` and `[$a, $b] = value`
    ListAssign {
        /// Destructuring pattern
        items: Vec<ArrayItem>,
        /// Source array
        value: Option<Box<Expr>>,
    },
    /// Arithmetic, bitwise, concat and comparison operators
    Binary {
        /// The operator
        op: BinaryOperator,
        /// Left operand
        left: Option<Box<Expr>>,
        /// Right operand
        right: Option<Box<Expr>>,
    },
    /// `&&`, `||`, `and`, `or`, `xor`
    Logical {
        /// The operator
        op: LogicalOperator,
        /// Left operand
        left: Option<Box<Expr>>,
        /// Right operand
        right: Option<Box<Expr>>,
    },
    /// `cond ? then : otherwise`, and `cond ?: otherwise` when `then` is `None`
    Ternary {
        /// Condition
        condition: Option<Box<Expr>>,
        /// Value when true; `None` for the short form
        then: Option<Box<Expr>>,
        /// Value when false
        otherwise: Option<Box<Expr>>,
    },
    /// `left ?? right`
    Coalesce {
        /// Checked value
        left: Option<Box<Expr>>,
        /// Fallback
        right: Option<Box<Expr>>,
    },
    /// Prefix operators
    Unary {
        /// The operator
        op: UnaryOperator,
        /// Operand
        operand: Option<Box<Expr>>,
    },
    /// `++$x`, `$x++`, `--$x`, `$x--`
    IncDec {
        /// `++` when true, `--` otherwise
        increment: bool,
        /// Prefix form
        prefix: bool,
        /// Modified place
        target: Option<Box<Expr>>,
    },
    /// `(int) $x`
    Cast {
        /// Target type
        kind: CastKind,
        /// Converted value
        operand: Option<Box<Expr>>,
    },
    /// `name(args)` and `$callable(args)`
    Call {
        /// The called expression; a `Name` for direct calls
        callee: Option<Box<Expr>>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// A bare name: a constant fetch, or a function name in call position
    Name(Name),
    /// `$obj->method(args)`, `$obj?->method(args)`
    MethodCall {
        /// Receiver
        object: Option<Box<Expr>>,
        /// Method name
        method: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `A::method(args)`
    StaticCall {
        /// Class side
        class: ClassRef,
        /// Method name
        method: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `$obj->prop`
    PropertyFetch {
        /// Receiver
        object: Option<Box<Expr>>,
        /// Property name
        property: String,
    },
    /// `A::$prop`
    StaticProperty {
        /// Class side
        class: ClassRef,
        /// Property name without `$`
        property: String,
    },
    /// `A::CONST` and `A::class`
    ClassConst {
        /// Class side
        class: ClassRef,
        /// Constant name
        name: String,
    },
    /// `new A(args)`
    New {
        /// Instantiated class
        class: ClassRef,
        /// Constructor arguments
        args: Vec<Expr>,
    },
    /// `$x instanceof A`
    InstanceOf {
        /// Tested value
        expr: Option<Box<Expr>>,
        /// Class side
        class: ClassRef,
    },
    /// `clone $x`
    Clone(Option<Box<Expr>>),
    /// `[...]` and `array(...)`
    Array(Vec<ArrayItem>),
    /// `$base[index]`, and `$base[]` when `index` is `None`
    Index {
        /// Indexed value
        base: Option<Box<Expr>>,
        /// Index
        index: Option<Box<Expr>>,
    },
    /// Anonymous function
    Closure(Box<ClosureDecl>),
    /// Arrow function
    ArrowFn(Box<ArrowFnDecl>),
    /// `isset(...)`
    Isset(Vec<Expr>),
    /// `empty(...)`
    Empty(Option<Box<Expr>>),
    /// `exit(...)` / `die(...)`
    Exit(Option<Box<Expr>>),
    /// `print expr`
    Print(Option<Box<Expr>>),
    /// `include`/`require` family
    Include {
        /// Which form
        kind: IncludeKind,
        /// Path expression
        path: Option<Box<Expr>>,
    },
    /// `__LINE__`, `__CLASS__`, ...
    MagicConst(MagicConst),
    /// Error-recovery node
    Error,
}

fn boxed(expr: Expr) -> Option<Box<Expr>> {
    Some(Box::new(expr))
}

impl Expr {
    /// Creates an expression with an empty span.
    #[must_use]
    pub fn new(kind: ExprKind) -> Self {
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

    /// Integer literal.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Int(value))
    }

    /// Float literal.
    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::Float(value))
    }

    /// String literal.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ExprKind::String(value.into()))
    }

    /// Boolean literal.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::Bool(value))
    }

    /// `null`.
    #[must_use]
    pub fn null() -> Self {
        Self::new(ExprKind::Null)
    }

    /// `$name`.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Variable(name.into()))
    }

    /// A bare, possibly qualified name such as `PHP_EOL` or `A\foo`.
    #[must_use]
    pub fn name(text: &str) -> Self {
        Self::new(ExprKind::Name(Name::parse(text)))
    }

    /// `target = value`.
    #[must_use]
    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::new(ExprKind::Assign {
            target: boxed(target),
            value: boxed(value),
            by_ref: false,
        })
    }

    /// `target op= value`.
    #[must_use]
    pub fn compound(op: AssignOp, target: Expr, value: Expr) -> Self {
        Self::new(ExprKind::CompoundAssign {
            op,
            target: boxed(target),
            value: boxed(value),
        })
    }

    /// `left op right`.
    #[must_use]
    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: boxed(left),
            right: boxed(right),
        })
    }

    /// `left && right`, `left || right`, `left xor right`.
    #[must_use]
    pub fn logical(op: LogicalOperator, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Logical {
            op,
            left: boxed(left),
            right: boxed(right),
        })
    }

    /// `cond ? then : otherwise`.
    #[must_use]
    pub fn ternary(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Self::new(ExprKind::Ternary {
            condition: boxed(condition),
            then: boxed(then),
            otherwise: boxed(otherwise),
        })
    }

    /// `left ?? right`.
    #[must_use]
    pub fn coalesce(left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Coalesce {
            left: boxed(left),
            right: boxed(right),
        })
    }

    /// Prefix unary operator.
    #[must_use]
    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op,
            operand: boxed(operand),
        })
    }

    /// `$x++` (postfix increment).
    #[must_use]
    pub fn post_inc(target: Expr) -> Self {
        Self::new(ExprKind::IncDec {
            increment: true,
            prefix: false,
            target: boxed(target),
        })
    }

    /// `name(args)`.
    #[must_use]
    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: boxed(Expr::name(name)),
            args,
        })
    }

    /// `$object->method(args)`.
    #[must_use]
    pub fn method_call(object: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::MethodCall {
            object: boxed(object),
            method: method.into(),
            args,
        })
    }

    /// `Class::method(args)`.
    #[must_use]
    pub fn static_call(class: ClassRef, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::StaticCall {
            class,
            method: method.into(),
            args,
        })
    }

    /// `$object->property`.
    #[must_use]
    pub fn prop(object: Expr, property: impl Into<String>) -> Self {
        Self::new(ExprKind::PropertyFetch {
            object: boxed(object),
            property: property.into(),
        })
    }

    /// `new Class(args)`.
    #[must_use]
    pub fn new_object(class: &str, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::New {
            class: ClassRef::Named(Name::parse(class)),
            args,
        })
    }

    /// `$base[index]`.
    #[must_use]
    pub fn index(base: Expr, index: Expr) -> Self {
        Self::new(ExprKind::Index {
            base: boxed(base),
            index: boxed(index),
        })
    }

    /// Array literal with positional elements.
    #[must_use]
    pub fn array(values: Vec<Expr>) -> Self {
        Self::new(ExprKind::Array(
            values.into_iter().map(ArrayItem::value).collect(),
        ))
    }

    /// Anonymous function.
    #[must_use]
    pub fn closure(params: Vec<Param>, uses: Vec<ClosureUse>, body: Vec<Stmt>) -> Self {
        Self::new(ExprKind::Closure(Box::new(ClosureDecl {
            params,
            uses,
            return_type: None,
            body,
            is_static: false,
        })))
    }

    /// Arrow function.
    #[must_use]
    pub fn arrow_fn(params: Vec<Param>, body: Expr) -> Self {
        Self::new(ExprKind::ArrowFn(Box::new(ArrowFnDecl {
            params,
            return_type: None,
            body: Some(body),
        })))
    }

    /// Returns `true` for error-recovery nodes.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error)
    }

    /// Short name of the node kind, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Int(_) => "int literal",
            ExprKind::Float(_) => "float literal",
            ExprKind::String(_) | ExprKind::Interpolated(_) => "string literal",
            ExprKind::Bool(_) => "bool literal",
            ExprKind::Null => "null",
            ExprKind::Variable(_) => "variable",
            ExprKind::VariableVariable(_) => "variable variable",
            ExprKind::Assign { .. } => "assignment",
            ExprKind::CompoundAssign { .. } => "compound assignment",
            ExprKind::ListAssign { .. } => "list assignment",
            ExprKind::Binary { .. } => "binary expression",
            ExprKind::Logical { .. } => "logical expression",
            ExprKind::Ternary { .. } => "ternary",
            ExprKind::Coalesce { .. } => "null coalescing",
            ExprKind::Unary { .. } => "unary expression",
            ExprKind::IncDec { .. } => "increment",
            ExprKind::Cast { .. } => "cast",
            ExprKind::Call { .. } => "call",
            ExprKind::Name(_) => "name",
            ExprKind::MethodCall { .. } => "method call",
            ExprKind::StaticCall { .. } => "static call",
            ExprKind::PropertyFetch { .. } => "property fetch",
            ExprKind::StaticProperty { .. } => "static property",
            ExprKind::ClassConst { .. } => "class constant",
            ExprKind::New { .. } => "new",
            ExprKind::InstanceOf { .. } => "instanceof",
            ExprKind::Clone(_) => "clone",
            ExprKind::Array(_) => "array",
            ExprKind::Index { .. } => "index",
            ExprKind::Closure(_) => "closure",
            ExprKind::ArrowFn(_) => "arrow function",
            ExprKind::Isset(_) => "isset",
            ExprKind::Empty(_) => "empty",
            ExprKind::Exit(_) => "exit",
            ExprKind::Print(_) => "print",
            ExprKind::Include { .. } => "include",
            ExprKind::MagicConst(_) => "magic constant",
            ExprKind::Error => "error",
        }
    }
}

impl ArrayItem {
    /// A positional element.
    #[must_use]
    pub fn value(value: Expr) -> Self {
        Self {
            key: None,
            value: Some(value),
            by_ref: false,
            spread: false,
        }
    }

    /// A keyed element.
    #[must_use]
    pub fn keyed(key: Expr, value: Expr) -> Self {
        Self {
            key: Some(key),
            value: Some(value),
            by_ref: false,
            spread: false,
        }
    }
}

impl ClosureUse {
    /// Captures `$name` by value.
    #[must_use]
    pub fn by_value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            by_ref: false,
        }
    }

    /// Captures `&$name` by reference.
    #[must_use]
    pub fn by_ref(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            by_ref: true,
        }
    }
}
