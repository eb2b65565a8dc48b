//! INSERT, UPDATE and DELETE.

use std::collections::HashMap;

use bitvec::prelude::*;
use tracing::debug;

use super::{Executor, Outcome};
use crate::ast::{Delete, Expr, Insert, InsertSource, ObjectName, Update};
use crate::error::{Error, Result};
use crate::eval::{self, Scope};
use crate::row::Row;
use crate::value::Value;

impl Executor<'_> {
    /// Inserts rows one at a time. A failing row stops the statement; rows
    /// before it stay inserted.
    pub(super) fn execute_insert(&mut self, insert: &Insert) -> Result<Outcome> {
        let definition = self.catalog.describe_table(&insert.table)?;
        let columns: Vec<String> = match &insert.columns {
            Some(columns) => {
                let columns: Vec<String> = columns.iter().map(|c| self.catalog.fold(c)).collect();
                if let Some(missing) = columns.iter().find(|c| definition.column(c).is_none()) {
                    return Err(Error::ColumnNotFound(missing.clone()));
                }
                columns
            }
            None => definition.column_names().map(str::to_string).collect(),
        };

        let rows: Vec<Vec<Value>> = match &insert.source {
            InsertSource::Values(rows) => {
                let empty = Row::new();
                let mut values = Vec::with_capacity(rows.len());
                for exprs in rows {
                    values.push(
                        exprs
                            .iter()
                            .map(|expr| eval::evaluate(expr, &Scope::new(&empty), self))
                            .collect::<Result<Vec<_>>>()?,
                    );
                }
                values
            }
            InsertSource::Select(query) => self.execute_select(query)?.rows,
        };
        if let Some(bad) = rows.iter().find(|values| values.len() != columns.len()) {
            return Err(Error::ColumnCountMismatch {
                expected: columns.len(),
                found: bad.len(),
            });
        }

        self.catalog.prepare_write(&insert.table)?;
        let table = self.catalog.table_mut(&insert.table)?;
        let mut affected = 0;
        let mut last_insert_id = None;
        for values in rows {
            let row = Row::from_pairs(columns.iter().cloned().zip(values));
            if let Some(id) = table.insert(row)? {
                last_insert_id = Some(id);
            }
            affected += 1;
        }
        debug!(table = %insert.table, affected, "rows inserted");
        Ok(Outcome::Modified {
            affected,
            last_insert_id,
        })
    }

    /// Every SET expression sees the row's own values from before the update.
    pub(super) fn execute_update(&mut self, update: &Update) -> Result<Outcome> {
        let assignments: Vec<(String, &Expr)> = {
            let definition = self.catalog.describe_table(&update.table)?;
            let mut assignments = Vec::with_capacity(update.assignments.len());
            for (column, expr) in &update.assignments {
                let column = self.catalog.fold(column);
                if definition.column(&column).is_none() {
                    return Err(Error::ColumnNotFound(column));
                }
                assignments.push((column, expr));
            }
            assignments
        };

        let (rows, not_null) = self.target_rows(&update.table)?;
        let qualifier = self.qualifier(&update.table, update.alias.as_deref());
        let mut matches = bitvec![0; rows.len()];
        let mut changes: HashMap<usize, Vec<(String, Value)>> = HashMap::new();

        for (idx, row) in rows.iter().enumerate() {
            let row = row.qualified(&qualifier);
            if !self.row_matches(update.where_clause.as_ref(), &row)? {
                continue;
            }
            let mut change = Vec::with_capacity(assignments.len());
            for (column, expr) in &assignments {
                let value = eval::evaluate(expr, &Scope::new(&row), self)?;
                if value.is_null() && not_null.contains(column) {
                    return Err(Error::NullViolation {
                        table: self.catalog.fold(&update.table.name),
                        column: column.clone(),
                    });
                }
                change.push((column.clone(), value));
            }
            matches.set(idx, true);
            changes.insert(idx, change);
        }

        self.catalog.prepare_write(&update.table)?;
        let affected = self
            .catalog
            .table_mut(&update.table)?
            .update(&matches, |idx, _| changes.remove(&idx).unwrap_or_default());
        debug!(table = %update.table, affected, "rows updated");
        Ok(Outcome::Modified {
            affected,
            last_insert_id: None,
        })
    }

    pub(super) fn execute_delete(&mut self, delete: &Delete) -> Result<Outcome> {
        let (rows, _) = self.target_rows(&delete.table)?;
        let qualifier = self.qualifier(&delete.table, delete.alias.as_deref());
        let mut matches = bitvec![0; rows.len()];
        for (idx, row) in rows.iter().enumerate() {
            if self.row_matches(delete.where_clause.as_ref(), &row.qualified(&qualifier))? {
                matches.set(idx, true);
            }
        }

        self.catalog.prepare_write(&delete.table)?;
        let affected = self.catalog.table_mut(&delete.table)?.delete(&matches);
        debug!(table = %delete.table, affected, "rows deleted");
        Ok(Outcome::Modified {
            affected,
            last_insert_id: None,
        })
    }

    /// Copies of the table's rows and the names of its NOT NULL columns.
    fn target_rows(&self, table: &ObjectName) -> Result<(Vec<Row>, Vec<String>)> {
        let storage = self.catalog.table(table)?;
        let not_null = storage
            .definition()
            .columns
            .iter()
            .filter(|c| !c.nullable)
            .map(|c| c.name.clone())
            .collect();
        Ok((storage.select(None), not_null))
    }

    fn qualifier(&self, table: &ObjectName, alias: Option<&str>) -> String {
        self.catalog.fold(alias.unwrap_or(&table.name))
    }

    fn row_matches(&mut self, condition: Option<&Expr>, row: &Row) -> Result<bool> {
        match condition {
            Some(condition) => eval::is_true(condition, &Scope::new(row), self),
            None => Ok(true),
        }
    }
}
