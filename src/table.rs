use std::collections::HashMap;
use std::fmt;

use allocative::Allocative;
use bitvec::slice::BitSlice;

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;

/// Value substituted for a column omitted from an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Value(Value),
    /// `DEFAULT CURRENT_TIMESTAMP`, evaluated at insertion time.
    CurrentTimestamp,
}

impl DefaultValue {
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::CurrentTimestamp => Value::DateTime(chrono::Local::now().naive_local()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        })
    }
}

/// Foreign key reference, recorded but not enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckConstraint {
    pub name: Option<String>,
    /// Source text of the condition, recorded but not evaluated.
    pub expr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    /// Character length for string types.
    pub length: Option<u32>,
    /// Total digits for numeric types.
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub auto_increment: bool,
    pub default: Option<DefaultValue>,
    pub references: Option<ForeignKey>,
    pub check: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            primary_key: false,
            unique: false,
            auto_increment: false,
            default: None,
            references: None,
            check: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    /// Declared type as written back in DESCRIBE output (`VARCHAR(10)`).
    pub fn type_string(&self) -> String {
        match (self.length.or(self.precision), self.scale) {
            (Some(len), Some(scale)) => format!("{}({len},{scale})", self.data_type),
            (Some(len), None) => format!("{}({len})", self.data_type),
            _ => self.data_type.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub schema: String,
    pub columns: Vec<ColumnDefinition>,
    /// Primary key columns, single or composite.
    pub primary_key: Vec<String>,
    pub unique_constraints: Vec<Vec<String>>,
    pub foreign_keys: Vec<ForeignKey>,
    pub checks: Vec<CheckConstraint>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        let mut definition = Self {
            name: name.into(),
            schema: schema.into(),
            columns,
            primary_key: Vec::new(),
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
            indexes: Vec::new(),
        };
        definition.primary_key = definition
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        definition.foreign_keys = definition
            .columns
            .iter()
            .filter_map(|c| c.references.clone())
            .collect();
        definition.checks = definition
            .columns
            .iter()
            .filter_map(|c| c.check.clone())
            .map(|expr| CheckConstraint { name: None, expr })
            .collect();
        definition
    }

    /// Marks `columns` as the primary key; key columns become NOT NULL.
    pub fn set_primary_key(&mut self, columns: Vec<String>) {
        for column in &mut self.columns {
            if columns.contains(&column.name) {
                column.nullable = false;
                if columns.len() == 1 {
                    column.primary_key = true;
                }
            }
        }
        self.primary_key = columns;
    }

    /// A single-column integer primary key without a default is an alias for
    /// an auto-incrementing row id.
    pub fn apply_integer_key_rule(&mut self) {
        if self.primary_key.len() != 1 {
            return;
        }
        let key = self.primary_key[0].clone();
        if let Some(column) = self.columns.iter_mut().find(|c| c.name == key) {
            if column.data_type.is_integer() && column.default.is_none() {
                column.auto_increment = true;
            }
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Rows of one table plus its auto-increment counters.
///
/// Stored rows are keyed by plain column name, in definition order.
#[derive(Debug, Clone, Allocative)]
pub struct TableStorage {
    #[allocative(skip)]
    definition: TableDefinition,
    rows: Vec<Row>,
    /// Last value handed out per auto-increment column.
    #[allocative(skip)]
    counters: HashMap<String, i64>,
}

impl TableStorage {
    pub fn new(definition: TableDefinition) -> Self {
        let counters = definition
            .columns
            .iter()
            .filter(|c| c.auto_increment)
            .map(|c| (c.name.clone(), 0))
            .collect();
        Self {
            definition,
            rows: Vec::new(),
            counters,
        }
    }

    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    pub fn definition_mut(&mut self) -> &mut TableDefinition {
        &mut self.definition
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a row holding the provided columns.
    ///
    /// Auto-increment columns that are absent or `NULL` receive the next
    /// counter value first, then absent columns take their default, then the
    /// remaining ones are `NULL`. Returns the last generated auto-increment
    /// value. A NOT NULL violation leaves both rows and counters untouched.
    pub fn insert(&mut self, mut values: Row) -> Result<Option<i64>> {
        let mut counters = self.counters.clone();
        let mut generated = None;

        for column in self.definition.columns.iter().filter(|c| c.auto_increment) {
            let counter = counters.entry(column.name.clone()).or_insert(0);
            match values.get(&column.name) {
                None | Some(Value::Null) => {
                    *counter += 1;
                    values.set(column.name.clone(), Value::Int(*counter));
                    generated = Some(*counter);
                }
                Some(Value::Int(explicit)) => *counter = (*counter).max(*explicit),
                Some(_) => {}
            }
        }

        let mut row = Row::with_capacity(self.definition.columns.len());
        for column in &self.definition.columns {
            let value = match values.remove(&column.name) {
                Some(value) => value,
                None => column
                    .default
                    .as_ref()
                    .map_or(Value::Null, DefaultValue::resolve),
            };
            if value.is_null() && !column.nullable {
                return Err(Error::NullViolation {
                    table: self.definition.name.clone(),
                    column: column.name.clone(),
                });
            }
            row.set(column.name.clone(), value);
        }

        self.counters = counters;
        self.rows.push(row);
        Ok(generated)
    }

    /// Returns copies of the rows satisfying `predicate` (all rows when `None`).
    pub fn select(&self, predicate: Option<&dyn Fn(&Row) -> bool>) -> Vec<Row> {
        match predicate {
            Some(predicate) => self.rows.iter().filter(|row| predicate(row)).cloned().collect(),
            None => self.rows.clone(),
        }
    }

    /// Applies `partial` to every row whose bit is set in `matches` and
    /// returns how many rows were changed.
    pub fn update<F>(&mut self, matches: &BitSlice, mut partial: F) -> usize
    where
        F: FnMut(usize, &Row) -> Vec<(String, Value)>,
    {
        let mut count = 0;
        for (idx, row) in self.rows.iter_mut().enumerate() {
            if !matches.get(idx).is_some_and(|bit| *bit) {
                continue;
            }
            for (column, value) in partial(idx, row) {
                row.set(column, value);
            }
            count += 1;
        }
        count
    }

    /// Removes every row whose bit is set in `matches`.
    pub fn delete(&mut self, matches: &BitSlice) -> usize {
        let before = self.rows.len();
        let mut idx = 0;
        self.rows.retain(|_| {
            let keep = !matches.get(idx).is_some_and(|bit| *bit);
            idx += 1;
            keep
        });
        before - self.rows.len()
    }

    /// Removes every row and resets the auto-increment counters.
    pub fn truncate(&mut self) {
        self.rows.clear();
        for counter in self.counters.values_mut() {
            *counter = 0;
        }
    }

    /// Deep copy of the current rows.
    pub fn snapshot(&self) -> Vec<Row> {
        self.rows.clone()
    }

    /// Puts back a snapshot. Counters only move forward: each is raised to
    /// the largest id found in the restored rows.
    pub fn restore(&mut self, rows: Vec<Row>) {
        for (column, counter) in &mut self.counters {
            let highest = rows
                .iter()
                .filter_map(|row| match row.get(column) {
                    Some(Value::Int(id)) => Some(*id),
                    _ => None,
                })
                .max();
            if let Some(highest) = highest {
                *counter = (*counter).max(highest);
            }
        }
        self.rows = rows;
    }

    /// Adds a column; existing rows receive the default (or `NULL`).
    pub fn add_column(&mut self, column: ColumnDefinition) -> Result<()> {
        if self.definition.column(&column.name).is_some() {
            return Err(Error::ColumnExists(column.name));
        }
        let fill = column.default.as_ref().map_or(Value::Null, DefaultValue::resolve);
        if fill.is_null() && !column.nullable && !self.rows.is_empty() && !column.auto_increment {
            return Err(Error::NullViolation {
                table: self.definition.name.clone(),
                column: column.name,
            });
        }
        let mut counter = 0;
        for row in &mut self.rows {
            if column.auto_increment {
                counter += 1;
                row.set(column.name.clone(), Value::Int(counter));
            } else {
                row.set(column.name.clone(), fill.clone());
            }
        }
        if column.auto_increment {
            self.counters.insert(column.name.clone(), counter);
        }
        self.definition.columns.push(column);
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let pos = self
            .definition
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
        self.definition.columns.remove(pos);
        self.definition.primary_key.retain(|c| c != name);
        self.counters.remove(name);
        for row in &mut self.rows {
            row.remove(name);
        }
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if self.definition.column(to).is_some() {
            return Err(Error::ColumnExists(to.to_string()));
        }
        let column = self
            .definition
            .columns
            .iter_mut()
            .find(|c| c.name == from)
            .ok_or_else(|| Error::ColumnNotFound(from.to_string()))?;
        column.name = to.to_string();
        for key in &mut self.definition.primary_key {
            if key == from {
                *key = to.to_string();
            }
        }
        if let Some(counter) = self.counters.remove(from) {
            self.counters.insert(to.to_string(), counter);
        }
        for row in &mut self.rows {
            row.rename(from, to);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvec::prelude::*;

    fn users() -> TableStorage {
        let mut definition = TableDefinition::new(
            "public",
            "users",
            vec![
                ColumnDefinition::new("id", DataType::Integer).primary_key(),
                ColumnDefinition::new("name", DataType::Varchar).not_null(),
                ColumnDefinition::new("active", DataType::Boolean).with_default(Value::Bool(true)),
            ],
        );
        definition.apply_integer_key_rule();
        TableStorage::new(definition)
    }

    fn named(name: &str) -> Row {
        Row::from_pairs([("name", Value::from(name))])
    }

    #[test]
    fn test_table_creation() {
        let table = users();
        assert_eq!(table.definition().primary_key, vec!["id"]);
        assert!(table.definition().column("id").unwrap().auto_increment);
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_applies_counter_then_defaults() {
        let mut table = users();
        assert_eq!(table.insert(named("Alice")).unwrap(), Some(1));
        assert_eq!(table.insert(named("Bob")).unwrap(), Some(2));

        let row = &table.rows()[1];
        assert_eq!(row.get("id"), Some(&Value::Int(2)));
        assert_eq!(row.get("active"), Some(&Value::Bool(true)));
        let keys: Vec<_> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["id", "name", "active"]);
    }

    #[test]
    fn test_explicit_null_skips_default() {
        let mut table = users();
        let mut row = named("Carol");
        row.set("active", Value::Null);
        table.insert(row).unwrap();
        assert_eq!(table.rows()[0].get("active"), Some(&Value::Null));
    }

    #[test]
    fn test_counter_is_never_reused() {
        let mut table = users();
        table.insert(named("a")).unwrap();
        table.insert(named("b")).unwrap();
        table.delete(bits![1, 1]);
        assert_eq!(table.insert(named("c")).unwrap(), Some(3));

        let mut explicit = named("d");
        explicit.set("id", Value::Int(10));
        assert_eq!(table.insert(explicit).unwrap(), None);
        assert_eq!(table.insert(named("e")).unwrap(), Some(11));
    }

    #[test]
    fn test_not_null_violation_leaves_table_unchanged() {
        let mut table = users();
        table.insert(named("a")).unwrap();

        let err = table.insert(Row::from_pairs([("name", Value::Null)])).unwrap_err();
        assert_eq!(err.code(), "NULL_VIOLATION");
        assert_eq!(table.len(), 1);
        // the failed insert did not consume an id
        assert_eq!(table.insert(named("b")).unwrap(), Some(2));
    }

    #[test]
    fn test_update_and_delete_with_mask() {
        let mut table = users();
        for name in ["a", "b", "c"] {
            table.insert(named(name)).unwrap();
        }

        let changed = table.update(bits![0, 1, 1], |_, row| {
            let name = row.get("name").unwrap().to_string();
            vec![("name".to_string(), Value::from(format!("{name}!")))]
        });
        assert_eq!(changed, 2);
        assert_eq!(table.rows()[2].get("name"), Some(&Value::from("c!")));

        assert_eq!(table.delete(bits![1, 0, 1]), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].get("name"), Some(&Value::from("b!")));
    }

    #[test]
    fn test_select_with_predicate() {
        let mut table = users();
        for name in ["a", "b"] {
            table.insert(named(name)).unwrap();
        }
        let only_b = table.select(Some(&|row: &Row| row.get("name") == Some(&Value::from("b"))));
        assert_eq!(only_b.len(), 1);
        assert_eq!(table.select(None).len(), 2);
    }

    #[test]
    fn test_snapshot_is_deep() {
        let mut table = users();
        table.insert(named("a")).unwrap();
        let backup = table.snapshot();

        table.update(bits![1], |_, _| vec![("name".to_string(), Value::from("z"))]);
        table.insert(named("b")).unwrap();
        assert_eq!(backup.len(), 1);
        assert_eq!(backup[0].get("name"), Some(&Value::from("a")));

        table.restore(backup);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].get("name"), Some(&Value::from("a")));
    }

    #[test]
    fn test_truncate_resets_counter() {
        let mut table = users();
        table.insert(named("a")).unwrap();
        table.truncate();
        assert!(table.is_empty());
        assert_eq!(table.insert(named("b")).unwrap(), Some(1));
    }

    #[test]
    fn test_restore_after_truncate_keeps_ids_unique() {
        let mut table = users();
        table.insert(named("a")).unwrap();
        table.insert(named("b")).unwrap();
        let backup = table.snapshot();

        table.truncate();
        table.restore(backup);
        assert_eq!(table.insert(named("c")).unwrap(), Some(3));
    }

    #[test]
    fn test_alter_columns() {
        let mut table = users();
        table.insert(named("a")).unwrap();

        table
            .add_column(ColumnDefinition::new("score", DataType::Integer).with_default(Value::Int(0)))
            .unwrap();
        assert_eq!(table.rows()[0].get("score"), Some(&Value::Int(0)));

        let err = table.add_column(ColumnDefinition::new("must", DataType::Integer).not_null());
        assert!(err.is_err());

        table.rename_column("score", "points").unwrap();
        assert_eq!(table.rows()[0].get("points"), Some(&Value::Int(0)));

        table.drop_column("points").unwrap();
        assert!(table.definition().column("points").is_none());
        assert!(!table.rows()[0].contains("points"));
        assert!(table.drop_column("missing").is_err());
    }

    #[test]
    fn test_type_string() {
        let mut column = ColumnDefinition::new("price", DataType::Decimal);
        column.precision = Some(10);
        column.scale = Some(2);
        assert_eq!(column.type_string(), "DECIMAL(10,2)");
        assert_eq!(ColumnDefinition::new("n", DataType::Text).type_string(), "TEXT");
    }
}
