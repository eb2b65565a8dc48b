//! Statement execution against the [`Catalog`].
//!
//! An [`Executor`] lives for one statement. It carries the bound parameters,
//! the rows of enclosing queries (for correlated subqueries) and the common
//! table expressions currently in scope.

mod aggregate;
mod ddl;
mod dml;
mod join;
mod select;

use std::collections::HashMap;

use crate::ast::{ColumnRef, Parameter, Select, Statement};
use crate::catalog::Catalog;
use crate::database::{Params, ResultSet};
use crate::error::{Error, Result};
use crate::eval::EvalContext;
use crate::row::Row;
use crate::value::Value;

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rows(ResultSet),
    Modified {
        affected: usize,
        last_insert_id: Option<i64>,
    },
    Done,
}

pub struct Executor<'a> {
    catalog: &'a mut Catalog,
    params: &'a Params,
    /// Rows of the enclosing queries, outermost first.
    outer: Vec<Row>,
    /// One map per active WITH clause, innermost last.
    ctes: Vec<HashMap<String, ResultSet>>,
    /// `schema.view` of every view being expanded, outermost first.
    views: Vec<String>,
}

impl<'a> Executor<'a> {
    pub fn new(catalog: &'a mut Catalog, params: &'a Params) -> Self {
        Self {
            catalog,
            params,
            outer: Vec::new(),
            ctes: Vec::new(),
            views: Vec::new(),
        }
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<Outcome> {
        match statement {
            Statement::Select(select) => self.execute_select(select).map(Outcome::Rows),
            Statement::Insert(insert) => self.execute_insert(insert),
            Statement::Update(update) => self.execute_update(update),
            Statement::Delete(delete) => self.execute_delete(delete),
            _ => self.execute_utility(statement),
        }
    }

    fn cte(&self, name: &str) -> Option<&ResultSet> {
        self.ctes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl EvalContext for Executor<'_> {
    fn fold(&self, ident: &str) -> String {
        self.catalog.fold(ident)
    }

    fn parameter(&self, parameter: &Parameter) -> Result<Value> {
        self.params
            .get(parameter)
            .cloned()
            .ok_or_else(|| Error::ParameterNotBound(parameter.to_string()))
    }

    fn outer_value(&self, column: &ColumnRef) -> Option<Value> {
        let name = self.catalog.fold(&column.name);
        let table = column.table.as_deref().map(|t| self.catalog.fold(t));
        self.outer
            .iter()
            .rev()
            .find_map(|row| row.resolve(table.as_deref(), &name))
            .cloned()
    }

    fn subquery(&mut self, query: &Select, row: &Row) -> Result<Vec<Vec<Value>>> {
        self.outer.push(row.clone());
        let result = self.execute_select(query);
        self.outer.pop();
        Ok(result?.rows)
    }

    fn next_value(&mut self, sequence: &str) -> Result<i64> {
        self.catalog.next_value(sequence)
    }

    fn current_value(&self, sequence: &str) -> Result<i64> {
        self.catalog.current_value(sequence)
    }
}
