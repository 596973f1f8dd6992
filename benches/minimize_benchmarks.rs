//! Minimization benchmarks: parse/render and end-to-end reduction of wide seeds.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sqlmin::{
    parse_statement, FailureSignature, Minimizer, ReproductionOracle, SchemaContext, SchemaPlanner,
};

/// `select c0, .. from t1 where c0 = 0 and .. and nope = 1`
fn wide_seed(width: usize) -> String {
    let items: Vec<String> = (0..width).map(|i| format!("c{i}")).collect();
    let predicates: Vec<String> = (0..width).map(|i| format!("c{i} = {i}")).collect();
    format!(
        "select {} from t1 join t2 on t1.c0 = t2.id where {} and nope = 1 order by c0 limit 10",
        items.join(", "),
        predicates.join(" and ")
    )
}

fn wide_schema(width: usize) -> SchemaContext {
    let mut schema = SchemaContext::new();
    schema
        .register_table("t1", (0..width).map(|i| format!("c{i}")))
        .expect("t1");
    schema.register_table("t2", ["id", "d"]).expect("t2");
    schema
}

fn bench_parse_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_render");
    for width in [4usize, 16, 64] {
        let sql = wide_seed(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &sql, |b, sql| {
            b.iter(|| {
                let statement = parse_statement(black_box(sql)).expect("parse");
                black_box(statement.to_string())
            });
        });
    }
    group.finish();
}

fn bench_minimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("minimize");
    group.sample_size(10);
    for width in [4usize, 8, 16] {
        let schema = wide_schema(width);
        let seed = parse_statement(&wide_seed(width)).expect("parse");
        let planner = SchemaPlanner::new();
        let signature = FailureSignature::capture(&planner, &seed, &schema)
            .expect("planner")
            .expect("seed fails");

        for parallel in [false, true] {
            let id = format!("{width}/{}", if parallel { "parallel" } else { "sequential" });
            group.bench_function(BenchmarkId::from_parameter(id), |b| {
                let oracle = ReproductionOracle::new(&planner, &schema, signature.clone());
                let minimizer = Minimizer::new().with_parallel(parallel);
                b.iter(|| {
                    let reduction = minimizer
                        .minimize(seed.clone(), &oracle)
                        .expect("minimize");
                    black_box(reduction.statement)
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_parse_render, bench_minimize);
criterion_main!(benches);
