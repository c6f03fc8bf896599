use phpscope::prelude::*;

fn models() -> SourceFile {
    let user = ClassDecl::new("User", ClassKind::Class).member(MemberKind::method(
        FunctionDecl::new("name", Vec::new(), vec![Stmt::ret(Some(Expr::string("u")))]),
        vec![Modifier::Public],
    ));
    SourceFile::new(
        "models.php",
        vec![Stmt::namespace("App\\Models", vec![Stmt::class(user)])],
    )
}

fn controller() -> SourceFile {
    let admin = ClassDecl::new("Admin", ClassKind::Class).extends("User");
    SourceFile::new(
        "controller.php",
        vec![Stmt::namespace(
            "App\\Http",
            vec![
                Stmt::use_decl(vec![UseDecl::new("App\\Models\\User")]),
                Stmt::class(admin),
                Stmt::expr(Expr::assign(Expr::var("u"), Expr::new_object("User", Vec::new()))),
            ],
        )],
    )
}

#[test]
fn test_classes_resolve_across_units() -> Result<()> {
    let workspace = Workspace::new();
    workspace.build(&models())?;
    let program = workspace.build(&controller())?;
    assert!(program.diagnostics().is_empty());

    let admin = program.get_class_blueprint("App.Http.Admin").expect("admin");
    assert_eq!(admin.parents().len(), 1);
    assert!(admin.method("name").is_some());

    let user = program.get_class_blueprint("App.Models.User").expect("imported shape");
    assert!(user.is_declared());
    assert!(user.method("name").is_some_and(|m| m.function.is_none()));
    Ok(())
}

#[test]
fn test_unknown_class_without_dependency() -> Result<()> {
    let workspace = Workspace::new();
    let program = workspace.build(&controller())?;
    assert_eq!(
        program.diagnostics_of(DiagnosticKind::UndefinedClass).count(),
        1
    );
    assert_eq!(workspace.error_count(), program.error_count());
    Ok(())
}

#[test]
fn test_find_class_and_library() -> Result<()> {
    let workspace = Workspace::new();
    workspace.build(&models())?;
    workspace.build(&controller())?;

    let (owner, id) = workspace.find_class("App.Models.User")?.expect("user");
    assert_eq!(owner.unit(), "models.php");
    assert!(owner.blueprint(id).is_some_and(|bp| bp.name() == "User"));

    let (owner, _) = workspace.find_class("App.Http.Admin")?.expect("admin");
    assert_eq!(owner.unit(), "controller.php");
    assert!(workspace.find_class("App.Missing")?.is_none());

    let units: Vec<String> = workspace
        .find_library("App.Http")?
        .iter()
        .map(|p| p.unit().to_string())
        .collect();
    assert_eq!(units, ["controller.php"]);
    Ok(())
}

#[test]
fn test_batch_units_do_not_see_each_other() -> Result<()> {
    let workspace = Workspace::new();
    let results = workspace.build_all(&[models(), controller()])?;
    assert_eq!(results.len(), 2);
    let controller = results[1].as_ref().expect("controller");
    assert_eq!(
        controller
            .diagnostics_of(DiagnosticKind::UndefinedClass)
            .count(),
        1
    );

    let later = workspace.build(&SourceFile::new(
        "later.php",
        vec![Stmt::expr(Expr::new_object("\\App\\Models\\User", Vec::new()))],
    ))?;
    assert_eq!(later.error_count(), 0);
    Ok(())
}

#[test]
fn test_concurrent_batch() -> Result<()> {
    let workspace = Workspace::new();
    let files: Vec<SourceFile> = (0..32)
        .map(|i| {
            let body = vec![Stmt::ret(Some(Expr::binary(
                BinaryOperator::Add,
                Expr::var("n"),
                Expr::int(i),
            )))];
            SourceFile::new(
                format!("unit{i}.php"),
                vec![Stmt::function(FunctionDecl::new(
                    format!("f{i}"),
                    vec![Param::new("n")],
                    body,
                ))],
            )
        })
        .collect();

    let results = workspace.build_all(&files)?;
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(workspace.len(), 32);
    assert_eq!(workspace.error_count(), 0);
    let units = workspace.units()?;
    assert_eq!(units.first().map(String::as_str), Some("unit0.php"));
    assert_eq!(units.last().map(String::as_str), Some("unit31.php"));
    assert!(workspace
        .get("unit7.php")
        .is_some_and(|p| p.function_by_name("f7").is_some()));
    Ok(())
}

#[test]
fn test_add_prebuilt_program() -> Result<()> {
    let workspace = Workspace::with_config(BuildConfig::strict());
    let program = Builder::new().build(Some(&models()))?;
    workspace.add(program)?;
    assert!(workspace.contains("models.php"));
    assert!(!workspace.config().constant_folding);

    let again = Builder::new().build(Some(&models()))?;
    assert!(matches!(
        workspace.add(again),
        Err(Error::DuplicateUnit(unit)) if unit == "models.php"
    ));
    Ok(())
}

#[test]
fn test_diagnostics_are_collected() -> Result<()> {
    let workspace = Workspace::new();
    workspace.build(&SourceFile::new(
        "a.php",
        vec![Stmt::echo(vec![Expr::var("missing")])],
    ))?;
    workspace.build(&SourceFile::new(
        "b.php",
        vec![Stmt::expr(Expr::call("nope", Vec::new()))],
    ))?;
    let kinds: Vec<DiagnosticKind> = workspace.diagnostics().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        [DiagnosticKind::UndefinedVariable, DiagnosticKind::UndefinedFunction]
    );
    assert_eq!(workspace.error_count(), 0);
    assert!(workspace.diagnostics().all(|d| d.severity == Severity::Warning));
    Ok(())
}
