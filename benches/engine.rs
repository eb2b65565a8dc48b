use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sqlcore::{Database, ObjectName, Row, Value};
use std::hint::black_box;

fn setup_populated_db(n: usize) -> Database {
    let mut db = Database::new();
    assert!(
        db.execute("CREATE TABLE users (id INT, name TEXT, age INT, active BOOL)")
            .is_success()
    );

    let table = db
        .catalog_mut()
        .table_mut(&ObjectName::new("users"))
        .unwrap();

    for i in 0..n {
        let row = Row::from_pairs([
            ("id", Value::Int(i as i64)),
            ("name", Value::from(format!("user{i}"))),
            ("age", Value::Int((i % 100) as i64)),
            ("active", Value::Bool(i % 2 == 0)),
        ]);
        table.insert(row).unwrap();
    }
    db
}

fn setup_join_db(n: usize) -> Database {
    let mut db = setup_populated_db(n);
    assert!(db.execute("CREATE TABLE teams (age INT, label TEXT)").is_success());
    let table = db
        .catalog_mut()
        .table_mut(&ObjectName::new("teams"))
        .unwrap();
    for age in (0..100).step_by(3) {
        table
            .insert(Row::from_pairs([
                ("age", Value::Int(age)),
                ("label", Value::from(format!("team{age}"))),
            ]))
            .unwrap();
    }
    db
}

fn bench_insert_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("Insert_SQL_Pipeline");
    group.bench_function("insert_single_row_sql", |b| {
        let mut db = Database::new();
        db.execute("CREATE TABLE tests (id INT)");
        b.iter(|| {
            black_box(db.execute(black_box("INSERT INTO tests VALUES (42)")));
        });
    });
    group.finish();
}

fn bench_select_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Select_Where_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let mut db = setup_populated_db(n);
            b.iter(|| {
                let res = db.query("SELECT * FROM users WHERE age = 42").unwrap();
                black_box(res);
            });
        });
    }
    group.finish();
}

fn bench_update_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Update_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            b.iter_with_setup(
                || setup_populated_db(n),
                |mut db| {
                    black_box(db.execute("UPDATE users SET age = 99 WHERE active = TRUE"));
                    black_box(db);
                },
            );
        });
    }
    group.finish();
}

fn bench_delete_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Delete_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            b.iter_with_setup(
                || setup_populated_db(n),
                |mut db| {
                    black_box(db.execute("DELETE FROM users WHERE age > 90"));
                    black_box(db);
                },
            );
        });
    }
    group.finish();
}

fn bench_join_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Join_Performance");

    for n in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let mut db = setup_join_db(n);
            b.iter(|| {
                let res = db
                    .query("SELECT u.name, t.label FROM users u LEFT JOIN teams t ON u.age = t.age")
                    .unwrap();
                black_box(res);
            });
        });
    }
    group.finish();
}

fn bench_group_by_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Group_By_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let mut db = setup_populated_db(n);
            b.iter(|| {
                let res = db
                    .query("SELECT active, COUNT(*), AVG(age) FROM users GROUP BY active")
                    .unwrap();
                black_box(res);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_sql,
    bench_select_scaling,
    bench_update_performance,
    bench_delete_performance,
    bench_join_performance,
    bench_group_by_performance
);
criterion_main!(benches);
