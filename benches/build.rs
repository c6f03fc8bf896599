//! Benchmarks for SSA construction.
//!
//! Builds synthetic compilation units of growing size:
//! - straight-line functions with branches and loops (phi placement)
//! - class hierarchies with inherited methods (blueprint merging)
//! - many independent units through the workspace (parallel builds)

extern crate phpscope;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use phpscope::prelude::*;
use std::hint::black_box;

/// `function fN($n) { $acc = 0; $i = 0; while ($i < $n) { if ($i % 2) { $acc += $i; } else { $acc -= 1; } $i++; } return $acc; }`
fn looping_function(n: usize) -> Stmt {
    let body = vec![
        Stmt::expr(Expr::assign(Expr::var("acc"), Expr::int(0))),
        Stmt::expr(Expr::assign(Expr::var("i"), Expr::int(0))),
        Stmt::while_loop(
            Expr::binary(BinaryOperator::Lt, Expr::var("i"), Expr::var("n")),
            vec![
                Stmt::if_else(
                    Expr::binary(BinaryOperator::Mod, Expr::var("i"), Expr::int(2)),
                    vec![Stmt::expr(Expr::compound(
                        AssignOp::Binary(BinaryOperator::Add),
                        Expr::var("acc"),
                        Expr::var("i"),
                    ))],
                    Some(vec![Stmt::expr(Expr::compound(
                        AssignOp::Binary(BinaryOperator::Sub),
                        Expr::var("acc"),
                        Expr::int(1),
                    ))]),
                ),
                Stmt::expr(Expr::post_inc(Expr::var("i"))),
            ],
        ),
        Stmt::ret(Some(Expr::var("acc"))),
    ];
    Stmt::function(FunctionDecl::new(format!("f{n}"), vec![Param::new("n")], body))
}

fn functions_unit(count: usize) -> SourceFile {
    let mut items: Vec<Stmt> = (0..count).map(looping_function).collect();
    items.extend((0..count).map(|n| {
        Stmt::echo(vec![Expr::call(&format!("f{n}"), vec![Expr::int(10)])])
    }));
    SourceFile::new("functions.php", items)
}

/// A chain `C0 <- C1 <- ... <- Cn`, each class adding one method and one property.
fn hierarchy_unit(depth: usize) -> SourceFile {
    let items = (0..depth)
        .map(|n| {
            let method = FunctionDecl::new(
                format!("m{n}"),
                Vec::new(),
                vec![Stmt::ret(Some(Expr::prop(Expr::var("this"), format!("p{n}"))))],
            );
            let mut class = ClassDecl::new(format!("C{n}"), ClassKind::Class)
                .member(MemberKind::property(
                    format!("p{n}"),
                    vec![Modifier::Protected],
                    Some(Expr::int(n as i64)),
                ))
                .member(MemberKind::method(method, vec![Modifier::Public]));
            if n > 0 {
                class = class.extends(&format!("C{}", n - 1));
            }
            Stmt::class(class)
        })
        .collect();
    SourceFile::new("classes.php", items)
}

fn bench_build_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_functions");
    for count in [10, 100, 500] {
        let unit = functions_unit(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &unit, |b, unit| {
            b.iter(|| {
                let program = Builder::new().build(Some(black_box(unit))).unwrap();
                black_box(program)
            });
        });
    }
    group.finish();
}

fn bench_build_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_hierarchy");
    for depth in [10, 50, 200] {
        let unit = hierarchy_unit(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &unit, |b, unit| {
            b.iter(|| {
                let program = Builder::new().build(Some(black_box(unit))).unwrap();
                black_box(program)
            });
        });
    }
    group.finish();
}

fn bench_workspace_build_all(c: &mut Criterion) {
    let units: Vec<SourceFile> = (0..64)
        .map(|n| {
            let mut unit = functions_unit(20);
            unit.name = format!("unit{n}.php");
            unit
        })
        .collect();

    c.bench_function("workspace_build_all_64", |b| {
        b.iter(|| {
            let workspace = Workspace::new();
            let results = workspace.build_all(black_box(&units)).unwrap();
            black_box(results)
        });
    });
}

criterion_group!(
    benches,
    bench_build_functions,
    bench_build_hierarchy,
    bench_workspace_build_all
);
criterion_main!(benches);
