use phpscope::prelude::*;
use phpscope::syntax::ConstDecl;

fn build(items: Vec<Stmt>) -> Result<Program> {
    Builder::new().build(Some(&SourceFile::new("test.php", items)))
}

fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::expr(Expr::assign(Expr::var(name), value))
}

fn count(program: &Program, kind: DiagnosticKind) -> usize {
    program.diagnostics_of(kind).count()
}

fn callee_of<'a>(function: &'a SsaFunction, value: &SsaValue) -> Option<&'a SsaValue> {
    match value.op() {
        Some(SsaOp::Call { callee, .. }) => function.value(function.resolve(*callee)),
        _ => None,
    }
}

#[test]
fn test_constant_folding_follows_binop() -> Result<()> {
    let program = build(vec![assign(
        "a",
        Expr::binary(BinaryOperator::Mul, Expr::int(6), Expr::int(7)),
    )])?;
    let ins = program.main_function().first_block_instructions();
    assert_eq!(ins.len(), 2);
    assert!(matches!(ins[0].op(), Some(SsaOp::BinOp { .. })));
    assert_eq!(ins[1].const_value(), Some(&ConstValue::Int(42)));
    Ok(())
}

#[test]
fn test_folding_disabled() -> Result<()> {
    let config = BuildConfig {
        constant_folding: false,
        ..BuildConfig::default()
    };
    let file = SourceFile::new(
        "test.php",
        vec![assign(
            "a",
            Expr::binary(BinaryOperator::Add, Expr::int(1), Expr::int(2)),
        )],
    );
    let program = Builder::new().with_config(config).build(Some(&file))?;
    assert_eq!(program.main_function().first_block_instructions().len(), 1);
    Ok(())
}

#[test]
fn test_if_else_merges_with_phi() -> Result<()> {
    let program = build(vec![
        assign("c", Expr::bool(true)),
        Stmt::if_else(
            Expr::var("c"),
            vec![assign("x", Expr::int(1))],
            Some(vec![assign("x", Expr::int(2))]),
        ),
        Stmt::echo(vec![Expr::var("x")]),
    ])?;
    let main = program.main_function();
    assert_eq!(main.phi_count(), 1);

    let phi = main
        .values()
        .iter()
        .find_map(SsaValue::phi)
        .expect("phi");
    assert_eq!(phi.variable(), "x");
    assert_eq!(phi.operands().len(), 2);
    assert!(main.unterminated_blocks().is_empty());
    assert_eq!(program.error_count(), 0);
    Ok(())
}

#[test]
fn test_if_without_else_keeps_single_definition() -> Result<()> {
    let program = build(vec![
        assign("x", Expr::int(1)),
        Stmt::if_else(Expr::bool(true), vec![Stmt::echo(vec![Expr::var("x")])], None),
        Stmt::echo(vec![Expr::var("x")]),
    ])?;
    assert_eq!(program.main_function().phi_count(), 0);
    Ok(())
}

#[test]
fn test_while_loop_header_phi() -> Result<()> {
    let program = build(vec![
        assign("i", Expr::int(0)),
        Stmt::while_loop(
            Expr::binary(BinaryOperator::Lt, Expr::var("i"), Expr::int(10)),
            vec![assign(
                "i",
                Expr::binary(BinaryOperator::Add, Expr::var("i"), Expr::int(1)),
            )],
        ),
        Stmt::echo(vec![Expr::var("i")]),
    ])?;
    let main = program.main_function();
    assert_eq!(main.phi_count(), 1);
    let phi = main.values().iter().find_map(SsaValue::phi).expect("phi");
    assert_eq!(phi.operands().len(), 2);
    assert!(!phi.is_incomplete());
    assert!(main.blocks().iter().all(SsaBlock::is_sealed));
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 0);
    Ok(())
}

#[test]
fn test_loop_without_redefinition_has_no_phi() -> Result<()> {
    let program = build(vec![
        assign("n", Expr::int(3)),
        Stmt::while_loop(Expr::var("n"), vec![Stmt::echo(vec![Expr::var("n")])]),
    ])?;
    assert_eq!(program.main_function().phi_count(), 0);
    Ok(())
}

#[test]
fn test_foreach_uses_next() -> Result<()> {
    let program = build(vec![
        assign("list", Expr::array(vec![Expr::int(1), Expr::int(2)])),
        Stmt::foreach(
            Expr::var("list"),
            Some(Expr::var("k")),
            Expr::var("v"),
            vec![Stmt::echo(vec![Expr::var("k"), Expr::var("v")])],
        ),
    ])?;
    let main = program.main_function();
    assert!(main
        .all_instructions()
        .any(|v| matches!(v.op(), Some(SsaOp::Next { .. }))));
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 0);
    Ok(())
}

#[test]
fn test_break_outside_loop() -> Result<()> {
    let program = build(vec![Stmt::new(StmtKind::Break(None))])?;
    assert_eq!(count(&program, DiagnosticKind::InvalidBreak), 1);

    let program = build(vec![Stmt::while_loop(
        Expr::bool(true),
        vec![Stmt::new(StmtKind::Break(Some(2)))],
    )])?;
    assert_eq!(count(&program, DiagnosticKind::InvalidBreak), 1);
    Ok(())
}

#[test]
fn test_statements_after_return() -> Result<()> {
    let program = build(vec![
        Stmt::ret(None),
        Stmt::echo(vec![Expr::string("dead")]),
    ])?;
    let main = program.main_function();
    assert!(main.block_count() >= 2);
    assert!(main.unterminated_blocks().is_empty());
    Ok(())
}

#[test]
fn test_hoisted_call() -> Result<()> {
    let program = build(vec![
        Stmt::expr(Expr::call("greet", vec![Expr::string("bob")])),
        Stmt::function(FunctionDecl::new(
            "greet",
            vec![Param::new("who")],
            vec![Stmt::echo(vec![Expr::var("who")])],
        )),
    ])?;
    let greet = program.function_by_name("greet").expect("greet");
    assert_eq!(greet.kind(), FunctionKind::Function);
    assert_eq!(greet.params().len(), 1);
    assert_eq!(count(&program, DiagnosticKind::UndefinedFunction), 0);

    let main = program.main_function();
    let call = main
        .all_instructions()
        .find(|v| matches!(v.op(), Some(SsaOp::Call { .. })))
        .expect("call");
    assert_eq!(
        callee_of(main, call).map(SsaValue::kind),
        Some(&ValueKind::Function(greet.id()))
    );
    Ok(())
}

#[test]
fn test_duplicate_function() -> Result<()> {
    let program = build(vec![
        Stmt::function(FunctionDecl::new("f", Vec::new(), Vec::new())),
        Stmt::function(FunctionDecl::new("F", Vec::new(), Vec::new())),
    ])?;
    assert_eq!(count(&program, DiagnosticKind::DuplicateFunction), 1);
    Ok(())
}

#[test]
fn test_builtin_and_undefined_calls() -> Result<()> {
    let program = build(vec![
        Stmt::expr(Expr::call("strlen", vec![Expr::string("abc")])),
        Stmt::expr(Expr::call("no_such_function", Vec::new())),
    ])?;
    let main = program.main_function();
    let callees: Vec<&ValueKind> = main
        .all_instructions()
        .filter_map(|v| callee_of(main, v))
        .map(SsaValue::kind)
        .collect();
    assert!(callees.contains(&&ValueKind::Extern {
        name: "strlen".to_string()
    }));
    assert!(callees
        .iter()
        .any(|k| matches!(k, ValueKind::Undefined { .. })));
    assert_eq!(count(&program, DiagnosticKind::UndefinedFunction), 1);
    Ok(())
}

#[test]
fn test_superglobal_is_extern() -> Result<()> {
    let program = build(vec![Stmt::echo(vec![Expr::index(
        Expr::var("_GET"),
        Expr::string("id"),
    )])])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 0);
    assert!(program.main_function().values().iter().any(|v| matches!(
        v.kind(),
        ValueKind::Extern { name } if name == "$_GET"
    )));

    let strict = Builder::new().with_config(BuildConfig::strict());
    let program = strict.build(Some(&SourceFile::new(
        "test.php",
        vec![Stmt::echo(vec![Expr::var("_GET")])],
    )))?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 1);
    Ok(())
}

#[test]
fn test_undefined_variable_reported_once() -> Result<()> {
    let program = build(vec![
        Stmt::echo(vec![Expr::var("nope")]),
        Stmt::echo(vec![Expr::var("nope")]),
    ])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 1);
    Ok(())
}

#[test]
fn test_isset_and_coalesce_are_quiet() -> Result<()> {
    let program = build(vec![
        Stmt::expr(Expr::new(ExprKind::Isset(vec![Expr::var("a")]))),
        Stmt::echo(vec![Expr::coalesce(Expr::var("b"), Expr::string("d"))]),
    ])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 0);
    Ok(())
}

#[test]
fn test_closure_captures_use_variable() -> Result<()> {
    let program = build(vec![
        assign("x", Expr::int(1)),
        assign(
            "f",
            Expr::closure(
                Vec::new(),
                vec![ClosureUse::by_value("x")],
                vec![Stmt::ret(Some(Expr::var("x")))],
            ),
        ),
    ])?;
    let main = program.main_function();
    let closure = program
        .functions()
        .iter()
        .find(|f| f.kind() == FunctionKind::Closure)
        .expect("closure");
    assert_eq!(closure.parent(), Some(main.id()));
    assert!(main.children().contains(&closure.id()));

    let free = closure.free_values();
    assert_eq!(free.len(), 1);
    match free[0].kind() {
        ValueKind::FreeValue {
            name,
            captured: Some(captured),
        } => {
            assert_eq!(name, "x");
            assert_eq!(captured.function, main.id());
            assert_eq!(
                program.resolve_ref(*captured).and_then(SsaValue::const_value),
                Some(&ConstValue::Int(1))
            );
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn test_arrow_fn_captures_implicitly() -> Result<()> {
    let program = build(vec![
        assign("y", Expr::int(2)),
        assign(
            "g",
            Expr::arrow_fn(
                vec![Param::new("z")],
                Expr::binary(BinaryOperator::Add, Expr::var("y"), Expr::var("z")),
            ),
        ),
    ])?;
    let arrow = program
        .functions()
        .iter()
        .find(|f| f.kind() == FunctionKind::Arrow)
        .expect("arrow");
    assert_eq!(arrow.free_values().len(), 1);
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 0);
    Ok(())
}

#[test]
fn test_named_function_does_not_capture() -> Result<()> {
    let program = build(vec![
        assign("x", Expr::int(1)),
        Stmt::function(FunctionDecl::new(
            "f",
            Vec::new(),
            vec![Stmt::ret(Some(Expr::var("x")))],
        )),
    ])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 1);
    Ok(())
}

#[test]
fn test_closure_nesting_limit() -> Result<()> {
    let config = BuildConfig {
        max_closure_depth: 1,
        ..BuildConfig::default()
    };
    let inner = Expr::closure(Vec::new(), Vec::new(), Vec::new());
    let outer = Expr::closure(Vec::new(), Vec::new(), vec![Stmt::expr(inner)]);
    let file = SourceFile::new("test.php", vec![Stmt::expr(outer)]);
    let program = Builder::new().with_config(config).build(Some(&file))?;
    assert_eq!(count(&program, DiagnosticKind::UnsupportedSyntax), 1);
    assert_eq!(
        program
            .functions()
            .iter()
            .filter(|f| f.kind() == FunctionKind::Closure)
            .count(),
        1
    );
    Ok(())
}

#[test]
fn test_variable_variable_is_unsupported() -> Result<()> {
    let program = build(vec![Stmt::echo(vec![Expr::new(
        ExprKind::VariableVariable(Some(Box::new(Expr::var("name")))),
    )])])?;
    assert_eq!(count(&program, DiagnosticKind::UnsupportedSyntax), 1);
    Ok(())
}

#[test]
fn test_namespace_code_goes_to_init() -> Result<()> {
    let program = build(vec![
        Stmt::namespace("App\\Http", vec![assign("a", Expr::int(1))]),
        Stmt::namespace("App\\Http", vec![assign("b", Expr::int(2))]),
    ])?;
    let library = program.get_library("App.Http").expect("library");
    assert_eq!(library.namespace(), "App\\Http");
    let init = library.init().and_then(|id| program.function(id)).expect("init");
    assert_eq!(init.kind(), FunctionKind::Init);
    assert!(init.is_finished());
    assert_eq!(
        program
            .functions()
            .iter()
            .filter(|f| f.kind() == FunctionKind::Init)
            .count(),
        1
    );
    assert_eq!(program.main_function().instruction_count(), 0);
    Ok(())
}

#[test]
fn test_namespaced_constants() -> Result<()> {
    let program = build(vec![Stmt::namespace(
        "Cfg",
        vec![
            Stmt::new(StmtKind::Const(vec![ConstDecl {
                name: "LIMIT".to_string(),
                value: Some(Expr::int(5)),
            }])),
            Stmt::echo(vec![Expr::name("LIMIT")]),
            Stmt::echo(vec![Expr::name("PHP_EOL")]),
            Stmt::echo(vec![Expr::name("MISSING")]),
        ],
    )])?;
    assert!(program.constant(Some("Cfg"), "LIMIT").is_some());
    assert_eq!(count(&program, DiagnosticKind::UndefinedConstant), 1);
    Ok(())
}

#[test]
fn test_define_registers_constant() -> Result<()> {
    let program = build(vec![
        Stmt::expr(Expr::call(
            "define",
            vec![Expr::string("VERSION"), Expr::string("1.0")],
        )),
        Stmt::echo(vec![Expr::name("VERSION")]),
    ])?;
    assert!(program.constant(None, "VERSION").is_some());
    assert_eq!(count(&program, DiagnosticKind::UndefinedConstant), 0);
    Ok(())
}

#[test]
fn test_interpolated_string_is_concat() -> Result<()> {
    let program = build(vec![
        assign("name", Expr::string("bob")),
        Stmt::echo(vec![Expr::new(ExprKind::Interpolated(vec![
            Expr::string("hi "),
            Expr::var("name"),
        ]))]),
    ])?;
    assert!(program.main_function().all_instructions().any(|v| matches!(
        v.op(),
        Some(SsaOp::BinOp {
            op: phpscope::ssa::BinaryOp::Concat,
            ..
        })
    )));
    Ok(())
}

#[test]
fn test_missing_nodes_are_tolerated() -> Result<()> {
    let program = build(vec![
        Stmt::new(StmtKind::If {
            condition: None,
            then: vec![Stmt::new(StmtKind::Error)],
            elseifs: Vec::new(),
            otherwise: None,
        }),
        Stmt::expr(Expr::new(ExprKind::Assign {
            target: Some(Box::new(Expr::var("a"))),
            value: None,
            by_ref: false,
        })),
    ])?;
    assert_eq!(count(&program, DiagnosticKind::MissingNode), 3);
    assert!(program.main_function().is_finished());
    Ok(())
}

fn mixed_unit() -> SourceFile {
    let counter = FunctionDecl::new(
        "counter",
        vec![Param::new("n")],
        vec![
            assign("i", Expr::int(0)),
            Stmt::while_loop(
                Expr::binary(BinaryOperator::Lt, Expr::var("i"), Expr::var("n")),
                vec![Stmt::expr(Expr::post_inc(Expr::var("i")))],
            ),
            Stmt::ret(Some(Expr::var("i"))),
        ],
    );
    SourceFile::new(
        "mixed.php",
        vec![
            Stmt::function(counter),
            assign("k", Expr::int(3)),
            assign(
                "f",
                Expr::closure(
                    Vec::new(),
                    Vec::new(),
                    vec![Stmt::echo(vec![Expr::var("k"), Expr::var("missing")])],
                ),
            ),
            Stmt::echo(vec![Expr::call("counter", vec![Expr::var("k")])]),
            Stmt::expr(Expr::call("nope", Vec::new())),
        ],
    )
}

#[test]
fn test_build_is_deterministic() -> Result<()> {
    let file = mixed_unit();
    let first = Builder::new().build(Some(&file))?;
    let second = Builder::new().build(Some(&file))?;

    assert_eq!(first.functions().len(), second.functions().len());
    for (a, b) in first.functions().iter().zip(second.functions()) {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.block_count(), b.block_count());
        assert_eq!(a.instruction_count(), b.instruction_count());
        assert_eq!(a.phi_count(), b.phi_count());
        assert_eq!(a.values().len(), b.values().len());
    }
    assert_eq!(first.diagnostics(), second.diagnostics());
    assert!(!first.diagnostics().is_empty());
    Ok(())
}

#[test]
fn test_nested_named_function() -> Result<()> {
    let inner = FunctionDecl::new("g", Vec::new(), Vec::new());
    let program = build(vec![Stmt::function(FunctionDecl::new(
        "f",
        Vec::new(),
        vec![Stmt::function(inner)],
    ))])?;

    let named: Vec<&SsaFunction> = program
        .functions()
        .iter()
        .filter(|f| f.kind() == FunctionKind::Function)
        .collect();
    assert_eq!(named.len(), 2);
    let f = program.function_by_name("f").expect("f");
    let g = program.function_by_name("g").expect("g");
    assert_eq!(f.parent(), None);
    assert_eq!(g.parent(), Some(f.id()));
    assert!(f.children().contains(&g.id()));
    assert_eq!(count(&program, DiagnosticKind::DuplicateFunction), 0);
    Ok(())
}

#[test]
fn test_undefined_in_loop_condition() -> Result<()> {
    let program = build(vec![Stmt::while_loop(Expr::var("c"), Vec::new())])?;
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 1);
    assert!(program.main_function().free_values().is_empty());
    Ok(())
}

#[test]
fn test_closure_loop_reads_parent() -> Result<()> {
    let program = build(vec![
        assign("c", Expr::int(1)),
        assign(
            "f",
            Expr::closure(
                Vec::new(),
                Vec::new(),
                vec![Stmt::while_loop(Expr::var("c"), Vec::new())],
            ),
        ),
    ])?;
    let main = program.main_function();
    let closure = program
        .functions()
        .iter()
        .find(|f| f.kind() == FunctionKind::Closure)
        .expect("closure");
    let free = closure.free_values();
    assert_eq!(free.len(), 1);
    assert!(matches!(
        free[0].kind(),
        ValueKind::FreeValue { name, captured: Some(captured) }
            if name == "c" && captured.function == main.id()
    ));
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 0);
    Ok(())
}

#[test]
fn test_code_after_return_adds_no_phi() -> Result<()> {
    let program = build(vec![
        assign("x", Expr::int(1)),
        assign("c", Expr::bool(true)),
        Stmt::if_else(
            Expr::var("c"),
            vec![Stmt::ret(None), assign("x", Expr::int(2))],
            None,
        ),
        Stmt::echo(vec![Expr::var("x")]),
    ])?;
    let main = program.main_function();
    assert_eq!(main.phi_count(), 0);
    assert!(main.unterminated_blocks().is_empty());
    assert_eq!(count(&program, DiagnosticKind::UndefinedVariable), 0);
    Ok(())
}
