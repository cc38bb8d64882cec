//! Benchmarks for upstream resolution and condition extraction
//!
//! Run with: cargo bench -p querylens-sql

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use querylens_sql::{ConditionExtractor, UpstreamResolver};

const MERGE_QUERY: &str = r#"
MERGE `data-engineering.reporting.totals` target
USING (
    SELECT t.column_1, t.column_2, count(distinct(id)) as total
    FROM `data-engineering.raw.events`, UNNEST(trial) as t
    WHERE t.column_type = 'tester' AND event_timestamp >= TIMESTAMP("2021-10-29", "UTC")
    GROUP BY t.column_1, t.column_2
) source
ON target.column_1 = source.column_1 and DATE(target.ts) = DATE(source.ts)
WHEN matched then update set target.total = source.total
"#;

fn generate_query(tables: usize) -> String {
    let mut sql = String::from("-- generated\nSELECT *\nFROM `proj.dataset.table_0` t0\n");
    for i in 1..tables {
        sql.push_str(&format!(
            "/* join {i} */ JOIN `proj.dataset.table_{i}` t{i} ON t0.id = t{i}.id\n"
        ));
    }
    sql.push_str("WHERE t0.created_at >= CURRENT_TIMESTAMP() AND t0.status IN ('a', 'b');");
    sql
}

fn bench_resolve_upstreams(c: &mut Criterion) {
    let resolver = UpstreamResolver::new();
    let mut group = c.benchmark_group("resolve_upstreams");

    group.bench_function("merge_query", |b| {
        b.iter(|| resolver.resolve(black_box(MERGE_QUERY)))
    });

    for tables in [5, 50] {
        let sql = generate_query(tables);
        group.bench_function(format!("{tables}_joins"), |b| {
            b.iter(|| resolver.resolve(black_box(&sql)))
        });
    }

    group.finish();
}

fn bench_extract_conditions(c: &mut Criterion) {
    let extractor = ConditionExtractor::new();
    let mut group = c.benchmark_group("extract_conditions");

    group.bench_function("merge_query", |b| {
        b.iter(|| extractor.extract(black_box(MERGE_QUERY)))
    });

    let sql = generate_query(50);
    group.bench_function("50_joins", |b| {
        b.iter(|| extractor.extract(black_box(&sql)))
    });

    group.finish();
}

criterion_group!(benches, bench_resolve_upstreams, bench_extract_conditions);
criterion_main!(benches);
