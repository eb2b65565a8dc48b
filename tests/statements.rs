use sqlcore::{Database, EngineConfig, IdentifierCase, Params, ResultSet, Value};

fn run(db: &mut Database, sql: &str) {
    let batch = db.execute(sql);
    assert!(batch.is_success(), "{sql}: {:?}", batch.first_error());
}

fn query(db: &mut Database, sql: &str) -> ResultSet {
    db.query(sql).unwrap_or_else(|e| panic!("{sql}: {e}"))
}

fn single(db: &mut Database, sql: &str) -> Value {
    let result = query(db, sql);
    assert_eq!(result.row_count, 1, "{sql}");
    result.rows[0][0].clone()
}

fn error_code(db: &mut Database, sql: &str) -> Option<String> {
    db.execute(sql).first_error().map(|e| e.code.clone())
}

fn staff() -> Database {
    let mut db = Database::new();
    run(
        &mut db,
        "CREATE TABLE staff (id INT PRIMARY KEY, name VARCHAR(20) NOT NULL, dept TEXT, salary INT);
         INSERT INTO staff VALUES
             (1, 'Alice', 'eng', 120),
             (2, 'Bob', 'eng', 100),
             (3, 'Carol', 'ops', 90),
             (4, 'Dan', NULL, 80)",
    );
    db
}

#[test]
fn test_select_without_from() {
    let mut db = Database::new();
    let result = query(&mut db, "SELECT 1 + 1 AS two, 'x', 7 / 2, 6 / 3, 1 / 0");
    assert_eq!(result.columns[0], "two");
    assert_eq!(result.columns[1], "x");
    assert_eq!(
        result.rows[0],
        vec![
            Value::Int(2),
            Value::from("x"),
            Value::Float(3.5),
            Value::Int(2),
            Value::Null
        ]
    );
    assert_eq!(result.types[0], "INTEGER");
}

#[test]
fn test_scalar_functions_and_case() {
    let mut db = staff();
    let result = query(
        &mut db,
        "SELECT UPPER(name), LENGTH(name), COALESCE(dept, 'none'),
                CASE WHEN salary >= 100 THEN 'high' ELSE 'low' END
         FROM staff ORDER BY id",
    );
    assert_eq!(
        result.rows[3],
        vec![
            Value::from("DAN"),
            Value::Int(3),
            Value::from("none"),
            Value::from("low")
        ]
    );
    assert_eq!(
        error_code(&mut db, "SELECT FROBNICATE(1)").as_deref(),
        Some("UNKNOWN_FUNCTION")
    );
}

#[test]
fn test_like_in_between() {
    let mut db = staff();
    let names = |result: ResultSet| -> Vec<Value> {
        result.rows.into_iter().map(|mut r| r.remove(0)).collect()
    };
    assert_eq!(
        names(query(&mut db, "SELECT name FROM staff WHERE name LIKE '%o%' ORDER BY name")),
        vec![Value::from("Bob"), Value::from("Carol")]
    );
    // LIKE is case sensitive
    assert_eq!(query(&mut db, "SELECT name FROM staff WHERE name LIKE 'a%'").row_count, 0);
    assert_eq!(
        names(query(&mut db, "SELECT name FROM staff WHERE id IN (2, 4) ORDER BY id")),
        vec![Value::from("Bob"), Value::from("Dan")]
    );
    assert_eq!(
        names(query(&mut db, "SELECT name FROM staff WHERE salary BETWEEN 90 AND 100 ORDER BY id")),
        vec![Value::from("Bob"), Value::from("Carol")]
    );
    // NULL dept is neither in nor out of the list
    assert_eq!(
        query(&mut db, "SELECT name FROM staff WHERE dept NOT IN ('eng')").row_count,
        1
    );
}

#[test]
fn test_subqueries() {
    let mut db = staff();
    assert_eq!(
        single(&mut db, "SELECT name FROM staff WHERE salary = (SELECT MAX(salary) FROM staff)"),
        Value::from("Alice")
    );
    assert_eq!(
        query(
            &mut db,
            "SELECT name FROM staff WHERE id IN (SELECT id FROM staff WHERE dept = 'eng')"
        )
        .row_count,
        2
    );
    // correlated: people paid above their department's average
    let result = query(
        &mut db,
        "SELECT s.name FROM staff s
         WHERE s.salary > (SELECT AVG(i.salary) FROM staff i WHERE i.dept = s.dept)",
    );
    assert_eq!(result.rows, vec![vec![Value::from("Alice")]]);
    assert_eq!(
        query(
            &mut db,
            "SELECT name FROM staff s WHERE EXISTS (SELECT 1 FROM staff o WHERE o.salary > s.salary)"
        )
        .row_count,
        3
    );
}

#[test]
fn test_derived_tables_and_ctes() {
    let mut db = staff();
    let result = query(
        &mut db,
        "SELECT d.dept, d.total FROM (SELECT dept, SUM(salary) AS total FROM staff GROUP BY dept) AS d
         WHERE d.total > 100",
    );
    assert_eq!(result.rows, vec![vec![Value::from("eng"), Value::Int(220)]]);

    let result = query(
        &mut db,
        "WITH eng (who, pay) AS (SELECT name, salary FROM staff WHERE dept = 'eng'),
              rich AS (SELECT who FROM eng WHERE pay > 110)
         SELECT * FROM rich",
    );
    assert_eq!(result.columns, vec!["who"]);
    assert_eq!(result.rows, vec![vec![Value::from("Alice")]]);

    assert_eq!(
        error_code(&mut db, "WITH RECURSIVE r AS (SELECT 1) SELECT * FROM r").as_deref(),
        Some("RECURSIVE_CTE")
    );
    assert_eq!(
        error_code(&mut db, "WITH r AS (SELECT * FROM r) SELECT * FROM r").as_deref(),
        Some("RECURSIVE_CTE")
    );
}

#[test]
fn test_aggregate_outside_select_is_rejected() {
    let mut db = staff();
    assert_eq!(
        error_code(&mut db, "SELECT name FROM staff WHERE COUNT(*) > 1").as_deref(),
        Some("AGGREGATE_MISUSE")
    );
    assert_eq!(
        error_code(&mut db, "SELECT ROW_NUMBER() OVER (ORDER BY id) FROM staff").as_deref(),
        Some("UNSUPPORTED")
    );
}

#[test]
fn test_views() {
    let mut db = staff();
    run(
        &mut db,
        "CREATE VIEW eng (who, pay) AS SELECT name, salary FROM staff WHERE dept = 'eng'",
    );
    let result = query(&mut db, "SELECT who FROM eng WHERE pay < 110");
    assert_eq!(result.rows, vec![vec![Value::from("Bob")]]);

    // views see later changes to their tables
    run(&mut db, "INSERT INTO staff VALUES (5, 'Eve', 'eng', 50)");
    assert_eq!(query(&mut db, "SELECT * FROM eng").row_count, 3);

    assert_eq!(
        error_code(&mut db, "CREATE VIEW eng AS SELECT 1").as_deref(),
        Some("TABLE_EXISTS")
    );
    run(&mut db, "CREATE OR REPLACE VIEW eng AS SELECT 1 AS one");
    assert_eq!(single(&mut db, "SELECT one FROM eng"), Value::Int(1));

    run(&mut db, "DROP VIEW eng");
    assert_eq!(error_code(&mut db, "DROP VIEW eng").as_deref(), Some("VIEW_NOT_FOUND"));
}

#[test]
fn test_views_cannot_read_themselves() {
    let mut db = staff();
    run(&mut db, "CREATE VIEW v AS SELECT 1 AS x");
    assert_eq!(
        error_code(&mut db, "CREATE OR REPLACE VIEW v AS SELECT * FROM v").as_deref(),
        Some("RECURSIVE_VIEW")
    );
    assert_eq!(single(&mut db, "SELECT x FROM v"), Value::Int(1));

    run(
        &mut db,
        "CREATE VIEW v1 AS SELECT * FROM staff;
         CREATE VIEW v2 AS SELECT * FROM v1;
         CREATE OR REPLACE VIEW v1 AS SELECT * FROM v2",
    );
    assert_eq!(
        error_code(&mut db, "SELECT * FROM v1").as_deref(),
        Some("RECURSIVE_VIEW")
    );
    assert_eq!(
        error_code(&mut db, "SELECT name FROM staff WHERE id IN (SELECT id FROM v2)").as_deref(),
        Some("RECURSIVE_VIEW")
    );
}

#[test]
fn test_update_null_violation_names_the_folded_table() {
    let mut db = Database::new();
    run(
        &mut db,
        "CREATE TABLE Items (id INT, name TEXT NOT NULL);
         INSERT INTO items VALUES (1, 'a')",
    );
    let batch = db.execute("UPDATE ITEMS SET name = NULL");
    let error = batch.first_error().unwrap();
    assert_eq!(error.code, "NULL_VIOLATION");
    assert!(error.message.contains("table items "), "{}", error.message);
    assert_eq!(single(&mut db, "SELECT name FROM items"), Value::from("a"));
}

#[test]
fn test_insert_select_and_create_table_as() {
    let mut db = staff();
    run(
        &mut db,
        "CREATE TABLE archive (id INT, name TEXT);
         INSERT INTO archive SELECT id, name FROM staff WHERE salary < 100",
    );
    assert_eq!(query(&mut db, "SELECT * FROM archive").row_count, 2);

    let batch = db.execute("CREATE TABLE eng AS SELECT id, name, salary FROM staff WHERE dept = 'eng'");
    assert_eq!(batch.results[0].affected_rows, Some(2));
    let result = query(&mut db, "SELECT * FROM eng ORDER BY id");
    assert_eq!(result.columns, vec!["id", "name", "salary"]);
    assert_eq!(result.types, vec!["INTEGER", "VARCHAR", "INTEGER"]);
    assert_eq!(result.rows[1], vec![Value::Int(2), Value::from("Bob"), Value::Int(100)]);
}

#[test]
fn test_describe_and_show_columns() {
    let mut db = staff();
    let result = query(&mut db, "DESCRIBE staff");
    assert_eq!(
        result.columns,
        vec!["column", "type", "nullable", "key", "default", "extra"]
    );
    assert_eq!(
        result.rows[0],
        vec![
            Value::from("id"),
            Value::from("INTEGER"),
            Value::from("NO"),
            Value::from("PRI"),
            Value::Null,
            Value::from("auto_increment"),
        ]
    );
    assert_eq!(result.rows[1][1], Value::from("VARCHAR(20)"));
    assert_eq!(query(&mut db, "SHOW COLUMNS FROM staff"), result);

    let definition = db
        .catalog()
        .describe_table(&sqlcore::ObjectName::new("staff"))
        .unwrap();
    assert_eq!(definition.primary_key, vec!["id"]);
}

#[test]
fn test_alter_table() {
    let mut db = staff();
    run(&mut db, "ALTER TABLE staff ADD COLUMN level INT DEFAULT 1");
    assert_eq!(single(&mut db, "SELECT level FROM staff WHERE id = 1"), Value::Int(1));

    run(&mut db, "ALTER TABLE staff RENAME COLUMN level TO grade");
    assert_eq!(single(&mut db, "SELECT grade FROM staff WHERE id = 2"), Value::Int(1));

    run(&mut db, "ALTER TABLE staff DROP COLUMN grade");
    assert_eq!(
        error_code(&mut db, "SELECT grade FROM staff").as_deref(),
        Some("COLUMN_NOT_FOUND")
    );

    run(&mut db, "ALTER TABLE staff RENAME TO people");
    assert_eq!(query(&mut db, "SELECT * FROM people").row_count, 4);
    assert_eq!(
        error_code(&mut db, "SELECT * FROM staff").as_deref(),
        Some("TABLE_NOT_FOUND")
    );
}

#[test]
fn test_truncate_resets_rows_and_counters() {
    let mut db = Database::new();
    run(
        &mut db,
        "CREATE TABLE t (id SERIAL PRIMARY KEY, v INT);
         INSERT INTO t (v) VALUES (1), (2);
         TRUNCATE TABLE t;
         INSERT INTO t (v) VALUES (3)",
    );
    let result = query(&mut db, "SELECT id, v FROM t");
    assert_eq!(result.rows, vec![vec![Value::Int(1), Value::Int(3)]]);
}

#[test]
fn test_indexes_are_recorded() {
    let mut db = staff();
    run(&mut db, "CREATE UNIQUE INDEX staff_name ON staff (name)");
    assert_eq!(
        error_code(&mut db, "CREATE INDEX staff_name ON staff (dept)").as_deref(),
        Some("INDEX_EXISTS")
    );
    run(&mut db, "CREATE INDEX IF NOT EXISTS staff_name ON staff (dept)");
    assert_eq!(
        error_code(&mut db, "CREATE INDEX bad ON staff (nope)").as_deref(),
        Some("COLUMN_NOT_FOUND")
    );
    run(&mut db, "DROP INDEX staff_name");
    assert_eq!(
        error_code(&mut db, "DROP INDEX staff_name").as_deref(),
        Some("INDEX_NOT_FOUND")
    );
}

#[test]
fn test_sequences() {
    let mut db = Database::new();
    run(
        &mut db,
        "CREATE SEQUENCE ids START WITH 10 INCREMENT BY 5 MAXVALUE 20;
         CREATE SEQUENCE ring START WITH 2 MINVALUE 1 MAXVALUE 3 CYCLE",
    );
    assert_eq!(
        error_code(&mut db, "SELECT CURRVAL('ids')").as_deref(),
        Some("SEQUENCE_NOT_INITIALIZED")
    );
    assert_eq!(single(&mut db, "SELECT NEXTVAL('ids')"), Value::Int(10));
    assert_eq!(single(&mut db, "SELECT ids.NEXTVAL"), Value::Int(15));
    assert_eq!(single(&mut db, "SELECT CURRVAL('ids')"), Value::Int(15));
    assert_eq!(single(&mut db, "SELECT NEXTVAL('ids')"), Value::Int(20));
    assert_eq!(
        error_code(&mut db, "SELECT NEXTVAL('ids')").as_deref(),
        Some("SEQUENCE_EXHAUSTED")
    );

    let ring: Vec<Value> = (0..4).map(|_| single(&mut db, "SELECT NEXTVAL('ring')")).collect();
    assert_eq!(ring, vec![Value::Int(2), Value::Int(3), Value::Int(1), Value::Int(2)]);

    run(&mut db, "CREATE TABLE t (id INT, v TEXT); INSERT INTO t VALUES (NEXTVAL('ring'), 'x')");
    assert_eq!(single(&mut db, "SELECT id FROM t"), Value::Int(3));

    assert_eq!(
        error_code(&mut db, "SELECT NEXTVAL('missing')").as_deref(),
        Some("SEQUENCE_NOT_FOUND")
    );
    run(&mut db, "DROP SEQUENCE ids");
    assert_eq!(
        error_code(&mut db, "DROP SEQUENCE ids").as_deref(),
        Some("SEQUENCE_NOT_FOUND")
    );
}

#[test]
fn test_schemas_and_current_schema() {
    let mut db = Database::new();
    run(
        &mut db,
        "CREATE SCHEMA sales;
         USE sales;
         CREATE TABLE orders (id INT);
         INSERT INTO orders VALUES (1)",
    );
    assert_eq!(single(&mut db, "SHOW search_path"), Value::from("sales"));
    assert_eq!(db.catalog().list_tables(Some("sales")).unwrap(), vec!["orders"]);

    run(&mut db, "SET search_path = public");
    assert_eq!(
        error_code(&mut db, "SELECT * FROM orders").as_deref(),
        Some("TABLE_NOT_FOUND")
    );
    assert_eq!(single(&mut db, "SELECT id FROM sales.orders"), Value::Int(1));

    let schemas = query(&mut db, "SHOW SCHEMAS");
    assert_eq!(
        schemas.rows,
        vec![vec![Value::from("public")], vec![Value::from("sales")]]
    );
    let tables = query(&mut db, "SHOW TABLES FROM sales");
    assert_eq!(tables.rows, vec![vec![Value::from("orders")]]);

    assert_eq!(
        error_code(&mut db, "CREATE SCHEMA sales").as_deref(),
        Some("SCHEMA_EXISTS")
    );
    assert_eq!(
        error_code(&mut db, "USE nowhere").as_deref(),
        Some("SCHEMA_NOT_FOUND")
    );
}

#[test]
fn test_session_settings() {
    let mut db = Database::new();
    assert_eq!(single(&mut db, "SHOW timezone"), Value::Null);
    run(&mut db, "SET timezone = 'UTC'");
    assert_eq!(single(&mut db, "SHOW timezone"), Value::from("UTC"));
    assert_eq!(single(&mut db, "SHOW SCHEMA"), Value::from("public"));
}

#[test]
fn test_users_roles_and_grants() {
    let mut db = staff();
    run(
        &mut db,
        "CREATE USER bob IDENTIFIED BY 'secret';
         CREATE ROLE analyst;
         GRANT analyst TO bob;
         GRANT SELECT, INSERT ON staff TO bob WITH GRANT OPTION;
         GRANT SELECT ON staff TO analyst",
    );
    assert_eq!(
        error_code(&mut db, "CREATE USER bob").as_deref(),
        Some("USER_EXISTS")
    );
    assert_eq!(
        error_code(&mut db, "GRANT SELECT ON staff TO nobody").as_deref(),
        Some("USER_NOT_FOUND")
    );
    assert_eq!(
        error_code(&mut db, "GRANT SELECT ON nothing TO bob").as_deref(),
        Some("TABLE_NOT_FOUND")
    );

    let users = query(&mut db, "SHOW USERS");
    assert_eq!(users.rows, vec![vec![Value::from("bob"), Value::from("analyst")]]);
    assert_eq!(query(&mut db, "SHOW ROLES").rows, vec![vec![Value::from("analyst")]]);

    let grants = query(&mut db, "SHOW GRANTS FOR bob");
    assert_eq!(grants.columns, vec!["grantee", "privilege", "object", "grantable"]);
    assert_eq!(grants.row_count, 2);
    assert_eq!(
        grants.rows[0],
        vec![
            Value::from("bob"),
            Value::from("SELECT"),
            Value::from("public.staff"),
            Value::Bool(true),
        ]
    );

    run(&mut db, "REVOKE INSERT ON staff FROM bob");
    assert_eq!(query(&mut db, "SHOW GRANTS FOR bob").row_count, 1);
    assert_eq!(db.catalog().privileges().len(), 2);

    run(&mut db, "DROP USER bob; DROP ROLE analyst");
    assert_eq!(query(&mut db, "SHOW USERS").row_count, 0);
    assert_eq!(error_code(&mut db, "DROP ROLE analyst").as_deref(), Some("ROLE_NOT_FOUND"));
}

#[test]
fn test_procedures_are_recorded_by_name() {
    let mut db = Database::new();
    run(
        &mut db,
        "CREATE PROCEDURE cleanup() AS BEGIN DELETE FROM t; END;
         DROP PROCEDURE cleanup",
    );
    assert_eq!(
        error_code(&mut db, "DROP PROCEDURE cleanup").as_deref(),
        Some("PROCEDURE_NOT_FOUND")
    );
}

#[test]
fn test_identifier_folding_follows_config() {
    let mut db = Database::new();
    run(&mut db, "CREATE TABLE Users (Id INT); INSERT INTO USERS (ID) VALUES (1)");
    assert_eq!(single(&mut db, "SELECT id FROM users"), Value::Int(1));
    assert_eq!(query(&mut db, "SELECT * FROM users").columns, vec!["id"]);

    let mut exact = Database::with_config(
        EngineConfig::default().with_identifier_case(IdentifierCase::Sensitive),
    );
    run(&mut exact, "CREATE TABLE Users (Id INT)");
    assert_eq!(
        error_code(&mut exact, "SELECT * FROM users").as_deref(),
        Some("TABLE_NOT_FOUND")
    );
    assert_eq!(query(&mut exact, "SELECT * FROM Users").columns, vec!["Id"]);
}

#[test]
fn test_named_and_positional_parameters() {
    let mut db = staff();
    let params = Params::new().push(100i64).bind("dept", "eng");
    let batch = db.execute_with_params(
        "SELECT name FROM staff WHERE salary >= ? AND dept = :dept ORDER BY name",
        &params,
    );
    let result = batch.last_result_set().unwrap();
    assert_eq!(result.rows, vec![vec![Value::from("Alice")], vec![Value::from("Bob")]]);
}

#[test]
fn test_memory_usage_tracks_rows() {
    let mut db = Database::new();
    run(&mut db, "CREATE TABLE t (v TEXT)");
    let empty = db.catalog().memory_usage();
    run(&mut db, "INSERT INTO t VALUES ('some reasonably long text value')");
    assert!(db.catalog().memory_usage() > empty);
}
