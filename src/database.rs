use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
    Value,
    ast::{Parameter, Statement},
    catalog::Catalog,
    config::EngineConfig,
    error::{Error, Result},
    executor::{Executor, Outcome},
    parser::Parser,
    tokenizer::tokenize,
};

/// Values bound to the parameter markers of a batch.
///
/// `?` and `$n` markers read `positional` (zero-based), `:name` and `@name`
/// read `named`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    positional: Vec<Value>,
    named: HashMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the value for the next positional marker.
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, parameter: &Parameter) -> Option<&Value> {
        match parameter {
            Parameter::Positional(idx) => self.positional.get(*idx),
            Parameter::Named(name) => self.named.get(name),
        }
    }
}

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// The names of the columns included in the result set.
    pub columns: Vec<String>,
    /// Type name of each column: the declared type when the column reads a
    /// table column directly, otherwise the type of the first non-null value,
    /// or `NULL` when there is none.
    pub types: Vec<String>,
    /// The actual data, one vector of [Value] per row.
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

/// A failed statement, as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Short symbolic identifier such as `TABLE_NOT_FOUND`.
    pub code: String,
    pub message: String,
}

impl From<&Error> for ErrorInfo {
    fn from(error: &Error) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one statement of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementResult {
    pub success: bool,
    pub result_set: Option<ResultSet>,
    pub affected_rows: Option<usize>,
    pub last_insert_id: Option<i64>,
    pub error: Option<ErrorInfo>,
}

impl StatementResult {
    fn failed(error: &Error) -> Self {
        Self {
            success: false,
            error: Some(ErrorInfo::from(error)),
            ..Self::default()
        }
    }
}

impl From<Outcome> for StatementResult {
    fn from(outcome: Outcome) -> Self {
        let mut result = Self {
            success: true,
            ..Self::default()
        };
        match outcome {
            Outcome::Rows(rows) => result.result_set = Some(rows),
            Outcome::Modified {
                affected,
                last_insert_id,
            } => {
                result.affected_rows = Some(affected);
                result.last_insert_id = last_insert_id;
            }
            Outcome::Done => {}
        }
        result
    }
}

/// One [StatementResult] per statement of the batch, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub results: Vec<StatementResult>,
}

impl BatchResult {
    /// Whether every statement succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    /// The first error of the batch, if any.
    pub fn first_error(&self) -> Option<&ErrorInfo> {
        self.results.iter().find_map(|r| r.error.as_ref())
    }

    /// The result set of the last statement that produced one.
    pub fn last_result_set(&self) -> Option<&ResultSet> {
        self.results.iter().rev().find_map(|r| r.result_set.as_ref())
    }
}

/// The main entry point for the in-memory database engine.
/// It owns the catalog and runs SQL batches against it.
#[derive(Debug, Default)]
pub struct Database {
    catalog: Catalog,
}

impl Database {
    /// Creates a new, empty database with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            catalog: Catalog::new(config),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Runs every statement of `sql` in order.
    ///
    /// A statement that fails to parse or execute is reported in its own
    /// [StatementResult] and the following statements still run.
    ///
    /// # Example
    /// ```
    /// use sqlcore::{Database, Value};
    /// let mut db = Database::new();
    /// let batch = db.execute(
    ///     "CREATE TABLE users (id INT); INSERT INTO users VALUES (1); SELECT * FROM users",
    /// );
    /// assert!(batch.is_success());
    ///
    /// let result = batch.last_result_set().unwrap();
    /// assert_eq!(result.rows[0][0], Value::Int(1));
    /// ```
    pub fn execute(&mut self, sql: &str) -> BatchResult {
        self.execute_with_params(sql, &Params::default())
    }

    pub fn execute_with_params(&mut self, sql: &str, params: &Params) -> BatchResult {
        let statements = Parser::new(tokenize(sql)).parse_batch();
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            let outcome = match statement {
                Ok(statement) => self.run(&statement, params),
                Err(error) => Err(Error::Syntax(error)),
            };
            results.push(match outcome {
                Ok(outcome) => StatementResult::from(outcome),
                Err(error) => StatementResult::failed(&error),
            });
        }
        BatchResult { results }
    }

    /// Runs a batch and returns the rows of its last statement, or the first
    /// error of the batch.
    pub fn query(&mut self, sql: &str) -> Result<ResultSet> {
        let statements = Parser::new(tokenize(sql)).parse_batch();
        let mut last = ResultSet::default();
        let params = Params::default();
        for statement in statements {
            if let Outcome::Rows(rows) = self.run(&statement?, &params)? {
                last = rows;
            }
        }
        Ok(last)
    }

    fn run(&mut self, statement: &Statement, params: &Params) -> Result<Outcome> {
        debug!(statement = %statement, "executing");
        let outcome = Executor::new(&mut self.catalog, params).execute(statement);
        if let Err(error) = &outcome {
            warn!(code = error.code(), %error, "statement rejected");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with(sql: &str) -> Database {
        let mut db = Database::new();
        let batch = db.execute(sql);
        assert!(batch.is_success(), "{:?}", batch.first_error());
        db
    }

    fn error_code(db: &mut Database, sql: &str) -> String {
        let batch = db.execute(sql);
        batch.first_error().map(|e| e.code.clone()).unwrap_or_default()
    }

    #[test]
    fn test_create_and_drop_table() {
        let mut db = db_with("CREATE TABLE users (id INT, name TEXT)");
        assert_eq!(db.catalog().list_tables(None).unwrap(), vec!["users"]);

        assert!(db.execute("DROP TABLE users").is_success());
        assert!(db.catalog().list_tables(None).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut db = db_with("CREATE TABLE users (id INT)");
        assert_eq!(error_code(&mut db, "CREATE TABLE users (id INT)"), "TABLE_EXISTS");
        assert!(db.execute("CREATE TABLE IF NOT EXISTS users (id INT)").is_success());
    }

    #[test]
    fn test_drop_nonexistent_table() {
        let mut db = Database::new();
        assert_eq!(error_code(&mut db, "DROP TABLE unknown"), "TABLE_NOT_FOUND");
        assert!(db.execute("DROP TABLE IF EXISTS unknown").is_success());
    }

    #[test]
    fn test_list_tables() {
        let db = db_with("CREATE TABLE users (id INT); CREATE TABLE posts (id INT)");
        assert_eq!(db.catalog().list_tables(None).unwrap(), vec!["posts", "users"]);
    }

    #[test]
    fn test_execute_insert_and_query_star() {
        let mut db = db_with(
            "CREATE TABLE users (id INT, name TEXT);
             INSERT INTO users VALUES (1, 'Alice');
             INSERT INTO users VALUES (2, 'Bob')",
        );

        let result = db.query("SELECT * FROM users").unwrap();

        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.types, vec!["INTEGER", "TEXT"]);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[0], vec![Value::Int(1), Value::from("Alice")]);
        assert_eq!(result.rows[1], vec![Value::Int(2), Value::from("Bob")]);
    }

    #[test]
    fn test_insert_with_column_reordering() {
        let mut db = db_with(
            "CREATE TABLE users (id INT, name TEXT);
             INSERT INTO users (name, id) VALUES ('Charlie', 3)",
        );

        let result = db.query("SELECT id, name FROM users").unwrap();

        // stored in definition order whatever the INSERT column order
        assert_eq!(result.rows[0], vec![Value::Int(3), Value::from("Charlie")]);
    }

    #[test]
    fn test_insert_partial_columns() {
        let mut db = db_with(
            "CREATE TABLE users (id INT, name TEXT);
             INSERT INTO users (id) VALUES (4)",
        );

        let result = db.query("SELECT name, id FROM users").unwrap();

        assert_eq!(result.rows[0], vec![Value::Null, Value::Int(4)]);
    }

    #[test]
    fn test_insert_reports_affected_rows_and_last_id() {
        let mut db = db_with("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)");
        let batch = db.execute("INSERT INTO t (name) VALUES ('a'), ('b'), ('c')");
        let result = &batch.results[0];
        assert!(result.success);
        assert_eq!(result.affected_rows, Some(3));
        assert_eq!(result.last_insert_id, Some(3));
    }

    #[test]
    fn test_insert_column_count_mismatch() {
        let mut db = db_with("CREATE TABLE t (a INT, b INT)");
        assert_eq!(
            error_code(&mut db, "INSERT INTO t VALUES (1)"),
            "COLUMN_COUNT_MISMATCH"
        );
        assert_eq!(
            error_code(&mut db, "INSERT INTO t (a, c) VALUES (1, 2)"),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_query_with_where_and() {
        let mut db = db_with(
            "CREATE TABLE users (id INT, age INT);
             INSERT INTO users VALUES (1, 10), (2, 20), (3, 30)",
        );
        let result = db
            .query("SELECT id FROM users WHERE age > 10 AND age < 30")
            .unwrap();
        assert_eq!(result.rows, vec![vec![Value::Int(2)]]);
    }

    #[test]
    fn test_query_with_null_comparison() {
        let mut db = db_with(
            "CREATE TABLE users (id INT, age INT);
             INSERT INTO users VALUES (1, NULL), (2, 20)",
        );
        // a comparison with NULL is unknown, never true
        assert_eq!(db.query("SELECT id FROM users WHERE age = NULL").unwrap().row_count, 0);
        let result = db.query("SELECT id FROM users WHERE age IS NULL").unwrap();
        assert_eq!(result.rows, vec![vec![Value::Int(1)]]);
    }

    #[test]
    fn test_query_order_by_asc_desc() {
        let mut db = db_with(
            "CREATE TABLE users (id INT, age INT);
             INSERT INTO users VALUES (1, 30), (2, 20), (3, 25)",
        );

        let res_asc = db.query("SELECT age FROM users ORDER BY age ASC").unwrap();
        assert_eq!(res_asc.rows[0][0], Value::Int(20));
        assert_eq!(res_asc.rows[2][0], Value::Int(30));

        let res_desc = db.query("SELECT age FROM users ORDER BY age DESC").unwrap();
        assert_eq!(res_desc.rows[0][0], Value::Int(30));
        assert_eq!(res_desc.rows[2][0], Value::Int(20));
    }

    #[test]
    fn test_query_order_by_multiple_columns() {
        let mut db = db_with(
            "CREATE TABLE users (name TEXT, score INT);
             INSERT INTO users VALUES ('Alice', 100), ('Bob', 100), ('Charlie', 50)",
        );

        let res = db
            .query("SELECT name, score FROM users ORDER BY score DESC, name ASC")
            .unwrap();

        assert_eq!(res.rows[0][0], Value::from("Alice"));
        assert_eq!(res.rows[1][0], Value::from("Bob"));
        assert_eq!(res.rows[2][0], Value::from("Charlie"));
    }

    #[test]
    fn test_query_order_by_hidden_column() {
        let mut db = db_with(
            "CREATE TABLE users (id INT, age INT);
             INSERT INTO users VALUES (1, 30), (2, 20)",
        );

        let res = db.query("SELECT id FROM users ORDER BY age ASC").unwrap();

        assert_eq!(res.columns, vec!["id"]);
        assert_eq!(res.rows[0][0], Value::Int(2));
        assert_eq!(res.rows[1][0], Value::Int(1));
    }

    #[test]
    fn test_query_order_by_alias_and_ordinal() {
        let mut db = db_with(
            "CREATE TABLE users (id INT, age INT);
             INSERT INTO users VALUES (1, 30), (2, 20), (3, 25)",
        );
        let res = db.query("SELECT id, age * 2 AS double_age FROM users ORDER BY double_age").unwrap();
        assert_eq!(res.rows[0][0], Value::Int(2));
        let res = db.query("SELECT id, age FROM users ORDER BY 2 DESC").unwrap();
        assert_eq!(res.rows[0][0], Value::Int(1));
    }

    #[test]
    fn test_query_order_by_with_limit_and_offset() {
        let mut db = db_with("CREATE TABLE users (id INT)");
        for i in 1..=10 {
            assert!(db.execute(&format!("INSERT INTO users VALUES ({i})")).is_success());
        }

        let res = db.query("SELECT id FROM users ORDER BY id DESC LIMIT 3").unwrap();
        assert_eq!(res.rows.len(), 3);
        assert_eq!(res.rows[0][0], Value::Int(10));
        assert_eq!(res.rows[2][0], Value::Int(8));

        let res = db.query("SELECT id FROM users ORDER BY id LIMIT 2 OFFSET 8").unwrap();
        assert_eq!(res.rows, vec![vec![Value::Int(9)], vec![Value::Int(10)]]);

        // offsets past the end are clamped
        assert_eq!(db.query("SELECT id FROM users LIMIT 5 OFFSET 50").unwrap().row_count, 0);
    }

    #[test]
    fn test_delete_with_complex_condition() {
        let mut db = db_with(
            "CREATE TABLE users (id INT, age INT);
             INSERT INTO users VALUES (1, 10), (2, 20), (3, 30), (4, 40)",
        );
        let batch = db.execute("DELETE FROM users WHERE age < 15 OR id = 4");
        assert_eq!(batch.results[0].affected_rows, Some(2));

        let res = db.query("SELECT id FROM users ORDER BY id").unwrap();
        assert_eq!(res.rows, vec![vec![Value::Int(2)], vec![Value::Int(3)]]);
    }

    #[test]
    fn test_delete_no_match() {
        let mut db = db_with(
            "CREATE TABLE users (id INT);
             INSERT INTO users VALUES (1)",
        );
        let batch = db.execute("DELETE FROM users WHERE id = 404");
        assert_eq!(batch.results[0].affected_rows, Some(0));
        assert_eq!(db.query("SELECT * FROM users").unwrap().row_count, 1);
    }

    #[test]
    fn test_update_multiple_columns() {
        let mut db = db_with(
            "CREATE TABLE employees (id INT, salary INT, grade TEXT);
             INSERT INTO employees VALUES (1, 3000, 'a'), (2, 2500, 'b')",
        );
        let batch = db.execute("UPDATE employees SET salary = salary + 300, grade = 'x' WHERE id = 1");
        assert_eq!(batch.results[0].affected_rows, Some(1));

        let result = db.query("SELECT salary, grade FROM employees ORDER BY id").unwrap();
        assert_eq!(result.rows[0], vec![Value::Int(3300), Value::from("x")]);
        assert_eq!(result.rows[1], vec![Value::Int(2500), Value::from("b")]);
    }

    #[test]
    fn test_update_reads_the_rows_own_values() {
        let mut db = db_with(
            "CREATE TABLE t (a INT, b INT);
             INSERT INTO t VALUES (1, 2), (3, 4)",
        );
        assert!(db.execute("UPDATE t SET a = b, b = a").is_success());
        let result = db.query("SELECT a, b FROM t").unwrap();
        assert_eq!(result.rows[0], vec![Value::Int(2), Value::Int(1)]);
        assert_eq!(result.rows[1], vec![Value::Int(4), Value::Int(3)]);
    }

    #[test]
    fn test_update_no_rows_matched() {
        let mut db = db_with(
            "CREATE TABLE test (id INT, val INT);
             INSERT INTO test VALUES (1, 10)",
        );
        let batch = db.execute("UPDATE test SET val = 99 WHERE id = 404");
        assert_eq!(batch.results[0].affected_rows, Some(0));

        let result = db.query("SELECT val FROM test").unwrap();
        assert_eq!(result.rows[0][0], Value::Int(10));
    }

    #[test]
    fn test_update_non_existent_column() {
        let mut db = db_with("CREATE TABLE test (id INT); INSERT INTO test VALUES (1)");
        assert_eq!(
            error_code(&mut db, "UPDATE test SET unknown_col = 10 WHERE id = 1"),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_update_to_null_on_not_null_column() {
        let mut db = db_with("CREATE TABLE test (id INT NOT NULL); INSERT INTO test VALUES (1)");
        assert_eq!(error_code(&mut db, "UPDATE test SET id = NULL"), "NULL_VIOLATION");
        assert_eq!(db.query("SELECT id FROM test").unwrap().rows[0][0], Value::Int(1));
    }

    #[test]
    fn test_batch_keeps_going_after_errors() {
        let mut db = Database::new();
        let batch = db.execute("CREATE TABLE t (id INT); SELEC 1; INSERT INTO t VALUES (1); SELECT * FROM nope");
        let codes: Vec<Option<&str>> = batch
            .results
            .iter()
            .map(|r| r.error.as_ref().map(|e| e.code.as_str()))
            .collect();
        assert_eq!(
            codes,
            vec![None, Some("SYNTAX_ERROR"), None, Some("TABLE_NOT_FOUND")]
        );
    }

    #[test]
    fn test_bind_parameters() {
        let mut db = db_with("CREATE TABLE t (id INT, name TEXT)");
        let params = Params::new().push(1i64).push("one");
        assert!(db.execute_with_params("INSERT INTO t VALUES (?, ?)", &params).is_success());
        let params = Params::new().bind("name", "one");
        let batch = db.execute_with_params("SELECT id FROM t WHERE name = :name", &params);
        assert_eq!(batch.last_result_set().unwrap().rows, vec![vec![Value::Int(1)]]);

        assert_eq!(error_code(&mut db, "SELECT ? FROM t"), "PARAMETER_NOT_BOUND");
    }
}
