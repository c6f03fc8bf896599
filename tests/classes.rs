use phpscope::prelude::*;
use phpscope::ssa::{MemberSource, Method};

fn build(items: Vec<Stmt>) -> Result<Program> {
    Builder::new().build(Some(&SourceFile::new("classes.php", items)))
}

fn count(program: &Program, kind: DiagnosticKind) -> usize {
    program.diagnostics_of(kind).count()
}

fn method(name: &str, body: Vec<Stmt>) -> MemberKind {
    MemberKind::method(FunctionDecl::new(name, Vec::new(), body), vec![Modifier::Public])
}

fn class(name: &str, members: Vec<MemberKind>) -> ClassDecl {
    members
        .into_iter()
        .fold(ClassDecl::new(name, ClassKind::Class), ClassDecl::member)
}

fn blueprint<'a>(program: &'a Program, name: &str) -> &'a ClassBluePrint {
    program.get_class_blueprint(name).expect(name)
}

fn calls_function(function: &SsaFunction, target: FunctionId) -> bool {
    function.all_instructions().any(|v| match v.op() {
        Some(SsaOp::Call { callee, .. }) => function
            .value(function.resolve(*callee))
            .is_some_and(|c| c.kind() == &ValueKind::Function(target)),
        _ => false,
    })
}

#[test]
fn test_class_members() -> Result<()> {
    let user = class(
        "User",
        vec![
            MemberKind::property("name", vec![Modifier::Private], Some(Expr::string("anon"))),
            MemberKind::Const {
                name: "LIMIT".to_string(),
                modifiers: Vec::new(),
                value: Some(Expr::int(5)),
            },
            method("getName", vec![Stmt::ret(Some(Expr::prop(Expr::var("this"), "name")))]),
            MemberKind::method(
                FunctionDecl::new("create", Vec::new(), Vec::new()),
                vec![Modifier::Public, Modifier::Static],
            ),
        ],
    );
    let program = build(vec![Stmt::class(user)])?;
    assert_eq!(program.error_count(), 0);

    let bp = blueprint(&program, "User");
    assert!(bp.is_declared());
    assert_eq!(bp.kind(), BlueprintKind::Class);

    let field = bp.field("name").expect("field");
    assert!(field.modifiers.contains(Modifiers::PRIVATE));
    let default = field.default.and_then(|r| program.resolve_ref(r));
    assert_eq!(
        default.and_then(SsaValue::const_value),
        Some(&ConstValue::String("anon".into()))
    );
    let limit = bp.class_const("LIMIT").and_then(|c| c.value);
    assert_eq!(
        limit
            .and_then(|r| program.resolve_ref(r))
            .and_then(SsaValue::const_value),
        Some(&ConstValue::Int(5))
    );

    let get_name = bp
        .method("getname")
        .and_then(|m| m.function)
        .and_then(|f| program.function(f))
        .expect("method function");
    assert_eq!(get_name.name(), "User_getName");
    assert_eq!(get_name.kind(), FunctionKind::Method);
    assert_eq!(get_name.blueprint(), Some(bp.id()));
    assert_eq!(get_name.param_names(), ["this".to_string()]);
    let this = get_name.value(get_name.params()[0]).expect("this");
    assert_eq!(this.ty().blueprint(), Some(bp.id()));

    let create = bp
        .method("create")
        .and_then(|m| m.function)
        .and_then(|f| program.function(f))
        .expect("static method");
    assert!(create.params().is_empty());
    Ok(())
}

#[test]
fn test_forward_parent_is_merged() -> Result<()> {
    let child = class("Child", vec![method("own", Vec::new())]).extends("Base");
    let base = class("Base", vec![method("inherited", Vec::new())]);
    let program = build(vec![Stmt::class(child), Stmt::class(base)])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedClass), 0);

    let base = blueprint(&program, "Base");
    let child = blueprint(&program, "Child");
    assert_eq!(child.parents(), [base.id()]);
    let inherited = child.method("inherited").expect("inherited");
    assert_eq!(inherited.source, MemberSource::Parent(base.id()));
    assert_eq!(inherited.function, base.method("inherited").and_then(|m| m.function));
    assert_eq!(child.method("own").map(|m| m.source), Some(MemberSource::Own));
    Ok(())
}

#[test]
fn test_own_member_wins_over_parent() -> Result<()> {
    let base = class("Base", vec![method("run", Vec::new())]);
    let child = class("Child", vec![method("run", Vec::new())]).extends("Base");
    let program = build(vec![Stmt::class(base), Stmt::class(child)])?;
    let run = blueprint(&program, "Child").method("run").expect("run");
    assert_eq!(run.source, MemberSource::Own);
    let function = run.function.and_then(|f| program.function(f)).expect("function");
    assert_eq!(function.name(), "Child_run");
    Ok(())
}

#[test]
fn test_traits_and_interfaces() -> Result<()> {
    let greets = ClassDecl::new("Greets", ClassKind::Interface).member(MemberKind::method(
        FunctionDecl::signature("hello", Vec::new()),
        vec![Modifier::Public],
    ));
    let loud = ClassDecl::new("Loud", ClassKind::Trait).member(method("hello", Vec::new()));
    let quiet = ClassDecl::new("Quiet", ClassKind::Trait).member(method("hello", Vec::new()));
    let both = class(
        "Both",
        vec![MemberKind::TraitUse(vec![Name::parse("Loud"), Name::parse("Quiet")])],
    )
    .implements("Greets");

    let program = build(vec![
        Stmt::class(greets),
        Stmt::class(loud),
        Stmt::class(quiet),
        Stmt::class(both),
    ])?;
    assert_eq!(count(&program, DiagnosticKind::MemberConflict), 1);

    let interface = blueprint(&program, "Greets");
    assert_eq!(interface.kind(), BlueprintKind::Interface);
    assert!(interface.method("hello").is_some_and(|m| m.function.is_none()));

    let loud = blueprint(&program, "Loud");
    let both = blueprint(&program, "Both");
    let hello: &Method = both.method("hello").expect("hello");
    assert_eq!(hello.source, MemberSource::Trait(loud.id()));
    assert_eq!(hello.function, loud.method("hello").and_then(|m| m.function));
    assert_eq!(both.interfaces(), [interface.id()]);
    assert_eq!(both.traits().len(), 2);
    Ok(())
}

#[test]
fn test_inheritance_cycle() -> Result<()> {
    let a = ClassDecl::new("A", ClassKind::Class).extends("B");
    let b = ClassDecl::new("B", ClassKind::Class).extends("A");
    let program = build(vec![Stmt::class(a), Stmt::class(b)])?;
    assert_eq!(count(&program, DiagnosticKind::InheritanceCycle), 1);
    assert!(!blueprint(&program, "A").is_valid());
    assert!(!blueprint(&program, "B").is_valid());
    Ok(())
}

#[test]
fn test_duplicate_class() -> Result<()> {
    let program = build(vec![
        Stmt::class(class("Twice", vec![method("first", Vec::new())])),
        Stmt::class(class("twice", vec![method("second", Vec::new())])),
    ])?;
    assert_eq!(count(&program, DiagnosticKind::DuplicateClass), 1);
    let registered = blueprint(&program, "Twice");
    assert!(registered.is_valid());
    assert!(registered.method("first").is_some());
    assert!(program.function_by_name("twice_second").is_some());
    Ok(())
}

#[test]
fn test_duplicate_members() -> Result<()> {
    let program = build(vec![Stmt::class(class(
        "Dup",
        vec![
            MemberKind::property("p", Vec::new(), None),
            MemberKind::property("p", Vec::new(), None),
            method("m", Vec::new()),
            method("M", Vec::new()),
        ],
    ))])?;
    assert_eq!(count(&program, DiagnosticKind::MemberConflict), 1);
    assert_eq!(count(&program, DiagnosticKind::DuplicateFunction), 1);
    Ok(())
}

#[test]
fn test_new_calls_constructor() -> Result<()> {
    let ctor = MemberKind::method(
        FunctionDecl::new(
            "__construct",
            vec![Param {
                promoted: vec![Modifier::Private],
                ..Param::new("id")
            }],
            Vec::new(),
        ),
        vec![Modifier::Public],
    );
    let program = build(vec![
        Stmt::class(class("Item", vec![ctor])),
        Stmt::expr(Expr::assign(
            Expr::var("item"),
            Expr::new_object("Item", vec![Expr::int(7)]),
        )),
    ])?;
    let item = blueprint(&program, "Item");
    let constructor = item.constructor().expect("constructor");
    assert!(item
        .field("id")
        .is_some_and(|f| f.modifiers.contains(Modifiers::PRIVATE)));

    let main = program.main_function();
    assert!(calls_function(main, constructor));
    let made = main
        .all_instructions()
        .find(|v| matches!(v.op(), Some(SsaOp::Make)))
        .expect("make");
    assert_eq!(made.ty().blueprint(), Some(item.id()));
    Ok(())
}

#[test]
fn test_undeclared_class_is_reported() -> Result<()> {
    let program = build(vec![Stmt::expr(Expr::new_object("Missing", Vec::new()))])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedClass), 1);
    assert!(!blueprint(&program, "Missing").is_declared());
    Ok(())
}

#[test]
fn test_builtin_class_resolves() -> Result<()> {
    let program = build(vec![Stmt::expr(Expr::new_object("Exception", Vec::new()))])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedClass), 0);
    Ok(())
}

#[test]
fn test_parent_and_self_calls() -> Result<()> {
    let base = class("Base", vec![method("greet", Vec::new())]);
    let child = class(
        "Child",
        vec![
            method("helper", Vec::new()),
            method(
                "run",
                vec![
                    Stmt::expr(Expr::static_call(ClassRef::Parent, "greet", Vec::new())),
                    Stmt::expr(Expr::static_call(ClassRef::SelfRef, "helper", Vec::new())),
                ],
            ),
        ],
    )
    .extends("Base");
    let program = build(vec![Stmt::class(base), Stmt::class(child)])?;

    let greet = program.function_by_name("Base_greet").expect("greet");
    let helper = program.function_by_name("Child_helper").expect("helper");
    let run = program.function_by_name("Child_run").expect("run");
    assert!(calls_function(run, greet.id()));
    assert!(calls_function(run, helper.id()));
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 0);
    Ok(())
}

#[test]
fn test_class_constant_access() -> Result<()> {
    let config = class(
        "Config",
        vec![MemberKind::Const {
            name: "PORT".to_string(),
            modifiers: Vec::new(),
            value: Some(Expr::int(8080)),
        }],
    );
    let program = build(vec![
        Stmt::class(config),
        Stmt::echo(vec![Expr::new(ExprKind::ClassConst {
            class: ClassRef::Named(Name::parse("Config")),
            name: "PORT".to_string(),
        })]),
        Stmt::echo(vec![Expr::new(ExprKind::ClassConst {
            class: ClassRef::Named(Name::parse("Config")),
            name: "class".to_string(),
        })]),
    ])?;
    let main = program.main_function();
    let pooled: Vec<&ConstValue> = main.values().iter().filter_map(SsaValue::const_value).collect();
    assert!(pooled.contains(&&ConstValue::Int(8080)));
    assert!(pooled.contains(&&ConstValue::String("Config".into())));
    Ok(())
}

#[test]
fn test_namespaced_class_import() -> Result<()> {
    let program = build(vec![
        Stmt::namespace(
            "App\\Models",
            vec![Stmt::class(ClassDecl::new("User", ClassKind::Class))],
        ),
        Stmt::namespace(
            "App",
            vec![
                Stmt::use_decl(vec![UseDecl::new("App\\Models\\User")]),
                Stmt::expr(Expr::new_object("User", Vec::new())),
            ],
        ),
    ])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedClass), 0);
    let user = blueprint(&program, "App\\Models\\User");
    assert_eq!(user.qualified_name(), "App.Models.User");
    assert_eq!(
        program
            .get_library("App.Models")
            .and_then(|l| l.get_class_blueprint("User")),
        Some(user.id())
    );
    assert_eq!(
        program.resolve_class(Some("App"), "User"),
        Some(user.id())
    );
    Ok(())
}

#[test]
fn test_whole_namespace_import() -> Result<()> {
    let program = build(vec![
        Stmt::namespace(
            "Lib",
            vec![
                Stmt::class(ClassDecl::new("One", ClassKind::Class)),
                Stmt::class(ClassDecl::new("Two", ClassKind::Class)),
            ],
        ),
        Stmt::namespace(
            "App",
            vec![
                Stmt::use_decl(vec![UseDecl::new("Lib")]),
                Stmt::expr(Expr::new_object("One", Vec::new())),
                Stmt::expr(Expr::new_object("Two", Vec::new())),
            ],
        ),
    ])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedClass), 0);
    assert_eq!(
        program.get_library("App").map(|l| l.imports().to_vec()),
        Some(vec!["Lib".to_string()])
    );
    Ok(())
}
