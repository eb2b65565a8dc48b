//! The SELECT pipeline: FROM resolution, WHERE, grouping, HAVING,
//! projection, ORDER BY, DISTINCT, then OFFSET and LIMIT.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::Executor;
use crate::ast::{
    Expr, FromItem, FunctionCall, JoinKind, JoinConstraint, Literal, NullsOrder, ObjectName,
    OrderByClause, Select, SelectItem, SortDirection, With,
};
use crate::database::ResultSet;
use crate::error::{Error, Result};
use crate::eval::{self, Scope};
use crate::row::Row;
use crate::value::Value;

/// Column metadata of a FROM source.
#[derive(Debug, Clone)]
pub(super) struct SourceColumn {
    pub qualifier: Option<String>,
    pub name: String,
    /// Declared type, when the column comes straight from a table.
    pub data_type: Option<String>,
}

/// Rows produced by the FROM clause. Each row holds every column under its
/// plain name and, for named sources, again as `qualifier.name`.
#[derive(Debug, Clone, Default)]
pub(super) struct Source {
    pub columns: Vec<SourceColumn>,
    pub rows: Vec<Row>,
}

impl Source {
    /// A row holding `NULL` under every key this source produces.
    pub fn null_row(&self) -> Row {
        let mut row = Row::with_capacity(self.columns.len() * 2);
        for column in &self.columns {
            row.set(column.name.clone(), Value::Null);
        }
        for column in &self.columns {
            if let Some(qualifier) = &column.qualifier {
                row.set(format!("{qualifier}.{}", column.name), Value::Null);
            }
        }
        row
    }

    fn from_result(result: ResultSet, qualifier: Option<String>) -> Self {
        let columns = result
            .columns
            .iter()
            .zip(&result.types)
            .map(|(name, data_type)| SourceColumn {
                qualifier: qualifier.clone(),
                name: name.clone(),
                data_type: (data_type != "NULL").then(|| data_type.clone()),
            })
            .collect();
        let rows = result
            .rows
            .into_iter()
            .map(|values| {
                let row = Row::from_pairs(result.columns.iter().cloned().zip(values));
                match &qualifier {
                    Some(qualifier) => row.qualified(qualifier),
                    None => row,
                }
            })
            .collect();
        Self { columns, rows }
    }
}

/// A row that survived WHERE (and HAVING), with the aggregates of its group.
struct Candidate {
    row: Row,
    aggregates: Option<HashMap<String, Value>>,
}

impl Candidate {
    fn scope(&self) -> Scope<'_> {
        match &self.aggregates {
            Some(aggregates) => Scope::with_aggregates(&self.row, aggregates),
            None => Scope::new(&self.row),
        }
    }
}

/// An output column and where its values come from.
enum Projection {
    /// A source column picked by `*` or `t.*`, read by row key.
    Key(String),
    Expr(Expr),
}

impl Executor<'_> {
    pub(crate) fn execute_select(&mut self, select: &Select) -> Result<ResultSet> {
        let Some(with) = &select.with else {
            return self.run_select(select);
        };
        self.ctes.push(HashMap::new());
        let result = self
            .bind_ctes(with)
            .and_then(|()| self.run_select(select));
        self.ctes.pop();
        result
    }

    /// Materialises each CTE in order; later ones may read earlier ones.
    fn bind_ctes(&mut self, with: &With) -> Result<()> {
        for cte in &with.ctes {
            let name = self.catalog.fold(&cte.name);
            if with.recursive || self.references(&cte.query, &name) {
                return Err(Error::RecursiveCte(name));
            }
            let mut result = self.execute_select(&cte.query)?;
            rename_columns(&mut result, &cte.columns, &*self.catalog);
            if let Some(scope) = self.ctes.last_mut() {
                scope.insert(name, result);
            }
        }
        Ok(())
    }

    /// Whether `select` reads from an unqualified relation called `name`.
    pub(super) fn references(&self, select: &Select, name: &str) -> bool {
        fn in_item(exec: &Executor<'_>, item: &FromItem, name: &str) -> bool {
            match item {
                FromItem::Table { name: table, .. } => {
                    table.schema.is_none() && exec.catalog.fold(&table.name) == name
                }
                FromItem::Subquery { query, .. } => exec.references(query, name),
                FromItem::Join { left, right, .. } => {
                    in_item(exec, left, name) || in_item(exec, right, name)
                }
            }
        }
        select.from.iter().any(|item| in_item(self, item, name))
            || select
                .with
                .as_ref()
                .is_some_and(|w| w.ctes.iter().any(|c| self.references(&c.query, name)))
    }

    fn run_select(&mut self, select: &Select) -> Result<ResultSet> {
        let source = self.resolve_from(&select.from)?;
        let null_row = source.null_row();
        let projections = self.projections(select, &source)?;

        let mut rows = Vec::with_capacity(source.rows.len());
        for row in source.rows {
            let keep = match &select.where_clause {
                Some(condition) => eval::is_true(condition, &Scope::new(&row), self)?,
                None => true,
            };
            if keep {
                rows.push(row);
            }
        }

        let aggregated = !select.group_by.is_empty()
            || projections.iter().any(|(_, p)| matches!(p, Projection::Expr(e) if e.contains_aggregate()))
            || select.having.as_ref().is_some_and(Expr::contains_aggregate);

        let mut candidates = if aggregated {
            self.aggregate(select, rows, null_row)?
        } else {
            rows.into_iter()
                .map(|row| Candidate {
                    row,
                    aggregates: None,
                })
                .collect()
        };

        if let Some(having) = &select.having {
            let mut kept = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                if eval::is_true(having, &candidate.scope(), self)? {
                    kept.push(candidate);
                }
            }
            candidates = kept;
        }

        // projected values plus their sort keys
        let mut output: Vec<(Vec<Value>, Vec<Value>)> = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let scope = candidate.scope();
            let mut values = Vec::with_capacity(projections.len());
            for (_, projection) in &projections {
                values.push(match projection {
                    Projection::Key(key) => candidate.row.get(key).cloned().unwrap_or(Value::Null),
                    Projection::Expr(expr) => eval::evaluate(expr, &scope, self)?,
                });
            }
            let mut keys = Vec::with_capacity(select.order_by.len());
            for clause in &select.order_by {
                let key = match self.output_position(&clause.expr, &projections) {
                    Some(pos) => values[pos].clone(),
                    None => eval::evaluate(&clause.expr, &scope, self)?,
                };
                keys.push(key);
            }
            output.push((values, keys));
        }

        if !select.order_by.is_empty() {
            output.sort_by(|(_, a), (_, b)| compare_sort_keys(a, b, &select.order_by));
        }

        let mut rows: Vec<Vec<Value>> = output.into_iter().map(|(values, _)| values).collect();
        if select.distinct {
            rows = distinct(rows);
        }

        let offset = self.bound(select.offset.as_ref(), "OFFSET")?.unwrap_or(0);
        let limit = self.bound(select.limit.as_ref(), "LIMIT")?;
        let rows: Vec<Vec<Value>> = rows
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        let columns: Vec<String> = projections.iter().map(|(name, _)| name.clone()).collect();
        let types = projections
            .iter()
            .enumerate()
            .map(|(idx, (_, projection))| {
                declared_type(projection, &source.columns, &*self.catalog)
                    .or_else(|| {
                        rows.iter()
                            .map(|row| &row[idx])
                            .find(|v| !v.is_null())
                            .and_then(Value::data_type)
                            .map(|t| t.to_string())
                    })
                    .unwrap_or_else(|| "NULL".to_string())
            })
            .collect();

        Ok(ResultSet {
            row_count: rows.len(),
            columns,
            types,
            rows,
        })
    }

    /// Combines the FROM items left to right; a comma is a cross join. An
    /// empty FROM yields one empty row.
    fn resolve_from(&mut self, from: &[FromItem]) -> Result<Source> {
        let mut items = from.iter();
        let Some(first) = items.next() else {
            return Ok(Source {
                columns: Vec::new(),
                rows: vec![Row::new()],
            });
        };
        let mut source = self.resolve_item(first)?;
        for item in items {
            let right = self.resolve_item(item)?;
            source = self.join(source, right, JoinKind::Cross, &JoinConstraint::None)?;
        }
        Ok(source)
    }

    fn resolve_item(&mut self, item: &FromItem) -> Result<Source> {
        match item {
            FromItem::Table { name, alias } => self.resolve_table(name, alias.as_deref()),
            FromItem::Subquery { query, alias } => {
                let result = self.execute_select(query)?;
                let qualifier = alias.as_deref().map(|a| self.catalog.fold(a));
                Ok(Source::from_result(result, qualifier))
            }
            FromItem::Join {
                left,
                right,
                kind,
                constraint,
            } => {
                let left = self.resolve_item(left)?;
                let right = self.resolve_item(right)?;
                self.join(left, right, *kind, constraint)
            }
        }
    }

    /// A named relation is looked up as a CTE, then a view, then a table.
    fn resolve_table(&mut self, name: &ObjectName, alias: Option<&str>) -> Result<Source> {
        let folded = self.catalog.fold(&name.name);
        let qualifier = alias.map_or_else(|| folded.clone(), |a| self.catalog.fold(a));

        if name.schema.is_none() {
            if let Some(result) = self.cte(&folded) {
                return Ok(Source::from_result(result.clone(), Some(qualifier)));
            }
        }

        if let Some(view) = self.catalog.view(name).cloned() {
            let key = format!("{}.{}", view.schema, view.name);
            if self.views.contains(&key) {
                return Err(Error::RecursiveView(key));
            }
            self.views.push(key);
            let result = self.execute_select(&view.query);
            self.views.pop();
            let mut result = result?;
            rename_columns(&mut result, &view.columns, &*self.catalog);
            return Ok(Source::from_result(result, Some(qualifier)));
        }

        let table = self.catalog.table(name)?;
        let columns = table
            .definition()
            .columns
            .iter()
            .map(|c| SourceColumn {
                qualifier: Some(qualifier.clone()),
                name: c.name.clone(),
                data_type: Some(c.type_string()),
            })
            .collect();
        let rows = table.rows().iter().map(|row| row.qualified(&qualifier)).collect();
        Ok(Source { columns, rows })
    }

    /// Output columns with their names. `*` expands to every distinct plain
    /// column name of the source, `t.*` to the columns of `t`.
    fn projections(&self, select: &Select, source: &Source) -> Result<Vec<(String, Projection)>> {
        let mut projections = Vec::new();
        for item in &select.columns {
            match item {
                SelectItem::Wildcard => {
                    let mut seen: Vec<&str> = Vec::new();
                    for column in &source.columns {
                        if !seen.contains(&column.name.as_str()) {
                            seen.push(&column.name);
                            projections.push((column.name.clone(), Projection::Key(column.name.clone())));
                        }
                    }
                }
                SelectItem::QualifiedWildcard(table) => {
                    let qualifier = self.catalog.fold(table);
                    let mut found = false;
                    for column in &source.columns {
                        if column.qualifier.as_deref() == Some(qualifier.as_str()) {
                            found = true;
                            projections.push((
                                column.name.clone(),
                                Projection::Key(format!("{qualifier}.{}", column.name)),
                            ));
                        }
                    }
                    if !found {
                        return Err(Error::TableNotFound(table.clone()));
                    }
                }
                SelectItem::Expr { expr, alias } => {
                    let name = alias.clone().unwrap_or_else(|| column_name(expr));
                    projections.push((name, Projection::Expr(expr.clone())));
                }
            }
        }
        Ok(projections)
    }

    /// Resolves an ORDER BY key naming an output column: a 1-based ordinal or
    /// an output name.
    fn output_position(&self, expr: &Expr, projections: &[(String, Projection)]) -> Option<usize> {
        match expr {
            Expr::Literal(Literal::Integer(n)) if *n >= 1 && (*n as usize) <= projections.len() => {
                Some(*n as usize - 1)
            }
            Expr::Column(column) if column.table.is_none() => {
                let name = self.catalog.fold(&column.name);
                projections
                    .iter()
                    .position(|(output, _)| self.catalog.fold(output) == name)
            }
            _ => None,
        }
    }

    /// Groups rows and computes every aggregate the query mentions. Without
    /// GROUP BY all rows form one group, even when there are none.
    fn aggregate(&mut self, select: &Select, rows: Vec<Row>, null_row: Row) -> Result<Vec<Candidate>> {
        let mut calls: Vec<&FunctionCall> = Vec::new();
        let exprs = select
            .columns
            .iter()
            .filter_map(|item| match item {
                SelectItem::Expr { expr, .. } => Some(expr),
                _ => None,
            })
            .chain(select.having.as_ref())
            .chain(select.order_by.iter().map(|o| &o.expr));
        for expr in exprs {
            for call in expr.aggregates() {
                if !calls.contains(&call) {
                    calls.push(call);
                }
            }
        }

        let groups: Vec<Vec<Row>> = if select.group_by.is_empty() {
            vec![rows]
        } else {
            self.group_rows(rows, &select.group_by)?
        };

        let mut candidates = Vec::with_capacity(groups.len());
        for group in groups {
            let mut aggregates = HashMap::with_capacity(calls.len());
            for call in &calls {
                let value = self.compute_aggregate(call, &group)?;
                aggregates.insert(call.to_string(), value);
            }
            let row = group.into_iter().next().unwrap_or_else(|| null_row.clone());
            candidates.push(Candidate {
                row,
                aggregates: Some(aggregates),
            });
        }
        Ok(candidates)
    }

    /// Splits rows into groups of equal GROUP BY keys, in first-seen order.
    fn group_rows(&mut self, rows: Vec<Row>, group_by: &[Expr]) -> Result<Vec<Vec<Row>>> {
        let mut keys: Vec<Vec<Value>> = Vec::new();
        let mut groups: Vec<Vec<Row>> = Vec::new();
        for row in rows {
            let key = group_by
                .iter()
                .map(|expr| eval::evaluate(expr, &Scope::new(&row), self))
                .collect::<Result<Vec<_>>>()?;
            match keys.iter().position(|k| same_tuple(k, &key)) {
                Some(pos) => groups[pos].push(row),
                None => {
                    keys.push(key);
                    groups.push(vec![row]);
                }
            }
        }
        Ok(groups)
    }

    /// Evaluates LIMIT or OFFSET. Negative values count as zero.
    fn bound(&mut self, expr: Option<&Expr>, clause: &str) -> Result<Option<usize>> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        match eval::evaluate(expr, &Scope::new(&Row::new()), self)? {
            Value::Int(n) => Ok(Some(usize::try_from(n).unwrap_or(0))),
            Value::Null => Ok(None),
            other => Err(Error::InvalidArgument(format!("{clause} must be an integer, found {other}"))),
        }
    }
}

/// Output name of an unaliased expression.
fn column_name(expr: &Expr) -> String {
    match expr {
        Expr::Column(column) => match &column.table {
            Some(table) => format!("{table}.{}", column.name),
            None => column.name.clone(),
        },
        Expr::Function(call) => call.to_string(),
        Expr::Literal(Literal::String(s)) => s.clone(),
        Expr::Literal(literal) => literal.to_value().to_string(),
        other => other.to_string(),
    }
}

fn rename_columns(result: &mut ResultSet, names: &[String], catalog: &crate::catalog::Catalog) {
    for (column, name) in result.columns.iter_mut().zip(names) {
        *column = catalog.fold(name);
    }
}

/// Declared type of an output column that reads a table column directly.
fn declared_type(
    projection: &Projection,
    columns: &[SourceColumn],
    catalog: &crate::catalog::Catalog,
) -> Option<String> {
    let matches = |column: &SourceColumn, qualifier: Option<&str>, name: &str| {
        column.name == name && qualifier.is_none_or(|q| column.qualifier.as_deref() == Some(q))
    };
    let found = match projection {
        Projection::Key(key) => {
            let (qualifier, name) = match key.rsplit_once('.') {
                Some((qualifier, name)) => (Some(qualifier), name),
                None => (None, key.as_str()),
            };
            columns.iter().rev().find(|c| matches(c, qualifier, name))
        }
        Projection::Expr(Expr::Column(column)) => {
            let name = catalog.fold(&column.name);
            let qualifier = column.table.as_deref().map(|t| catalog.fold(t));
            columns
                .iter()
                .rev()
                .find(|c| matches(c, qualifier.as_deref(), &name))
        }
        Projection::Expr(_) => None,
    };
    found.and_then(|c| c.data_type.clone())
}

fn same_tuple(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
}

/// Keeps the first of every set of equal rows.
fn distinct(rows: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    let mut kept: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
    for row in rows {
        if !kept.iter().any(|k| same_tuple(k, &row)) {
            kept.push(row);
        }
    }
    kept
}

/// Multi-key comparison. Without an explicit NULLS clause nulls sort before
/// other values and DESC reverses that too; NULLS FIRST/LAST is absolute.
fn compare_sort_keys(a: &[Value], b: &[Value], order_by: &[OrderByClause]) -> Ordering {
    for ((x, y), clause) in a.iter().zip(b).zip(order_by) {
        let desc = clause.direction == SortDirection::Desc;
        let ord = match (x.is_null(), y.is_null(), clause.nulls) {
            (true, true, _) => Ordering::Equal,
            (true, false, Some(NullsOrder::First)) | (false, true, Some(NullsOrder::Last)) => Ordering::Less,
            (true, false, Some(NullsOrder::Last)) | (false, true, Some(NullsOrder::First)) => {
                Ordering::Greater
            }
            _ => {
                let ord = x.total_cmp(y);
                if desc { ord.reverse() } else { ord }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(direction: SortDirection, nulls: Option<NullsOrder>) -> OrderByClause {
        OrderByClause {
            expr: Expr::column("x"),
            direction,
            nulls,
        }
    }

    fn sorted(values: &[Value], clause: &OrderByClause) -> Vec<Value> {
        let mut keys: Vec<Vec<Value>> = values.iter().map(|v| vec![v.clone()]).collect();
        keys.sort_by(|a, b| compare_sort_keys(a, b, std::slice::from_ref(clause)));
        keys.into_iter().map(|mut k| k.remove(0)).collect()
    }

    #[test]
    fn test_nulls_default_first_and_reverse_with_desc() {
        let values = [Value::Int(2), Value::Null, Value::Int(1)];
        assert_eq!(
            sorted(&values, &clause(SortDirection::Asc, None)),
            vec![Value::Null, Value::Int(1), Value::Int(2)]
        );
        assert_eq!(
            sorted(&values, &clause(SortDirection::Desc, None)),
            vec![Value::Int(2), Value::Int(1), Value::Null]
        );
    }

    #[test]
    fn test_explicit_nulls_order_ignores_direction() {
        let values = [Value::Int(2), Value::Null, Value::Int(1)];
        assert_eq!(
            sorted(&values, &clause(SortDirection::Desc, Some(NullsOrder::First))),
            vec![Value::Null, Value::Int(2), Value::Int(1)]
        );
        assert_eq!(
            sorted(&values, &clause(SortDirection::Asc, Some(NullsOrder::Last))),
            vec![Value::Int(1), Value::Int(2), Value::Null]
        );
    }

    #[test]
    fn test_distinct_keeps_first_seen() {
        let rows = vec![
            vec![Value::Int(1), Value::from("a")],
            vec![Value::Float(1.0), Value::from("a")],
            vec![Value::Int(2), Value::from("a")],
        ];
        assert_eq!(distinct(rows).len(), 2);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(&Expr::column("age")), "age");
        assert_eq!(column_name(&Expr::Literal(Literal::Integer(3))), "3");
        assert_eq!(column_name(&Expr::Literal(Literal::String("hi".into()))), "hi");
    }
}
