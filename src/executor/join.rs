//! Nested-loop joins over materialised sources.

use std::cmp::Ordering;

use bitvec::prelude::*;

use super::Executor;
use super::select::Source;
use crate::ast::{JoinConstraint, JoinKind};
use crate::error::Result;
use crate::eval::{self, Scope};
use crate::row::Row;

impl Executor<'_> {
    /// Joins two sources. Unmatched rows of an outer join are padded with
    /// `NULL` for every key the other side would have contributed.
    pub(super) fn join(
        &mut self,
        left: Source,
        right: Source,
        kind: JoinKind,
        constraint: &JoinConstraint,
    ) -> Result<Source> {
        let using: Vec<String> = match constraint {
            JoinConstraint::Using(columns) => columns.iter().map(|c| self.catalog.fold(c)).collect(),
            _ => Vec::new(),
        };
        let left_nulls = left.null_row();
        let right_nulls = right.null_row();

        let mut rows = Vec::new();
        let mut right_matched = bitvec![0; right.rows.len()];

        for left_row in &left.rows {
            let mut matched = false;
            for (idx, right_row) in right.rows.iter().enumerate() {
                let mut combined = left_row.clone();
                combined.merge(right_row);
                let keep = match (kind, constraint) {
                    (JoinKind::Cross, _) | (_, JoinConstraint::None) => true,
                    (_, JoinConstraint::On(condition)) => {
                        eval::is_true(condition, &Scope::new(&combined), self)?
                    }
                    (_, JoinConstraint::Using(_)) => using_matches(&using, left_row, right_row),
                };
                if keep {
                    matched = true;
                    right_matched.set(idx, true);
                    rows.push(combined);
                }
            }
            if !matched && matches!(kind, JoinKind::Left | JoinKind::Full) {
                rows.push(pad(left_row, &right_nulls, &using));
            }
        }

        if matches!(kind, JoinKind::Right | JoinKind::Full) {
            for idx in right_matched.iter_zeros() {
                let mut row = left_nulls.clone();
                row.merge(&right.rows[idx]);
                rows.push(row);
            }
        }

        let mut columns = left.columns;
        columns.extend(right.columns);
        Ok(Source { columns, rows })
    }
}

fn using_matches(columns: &[String], left: &Row, right: &Row) -> bool {
    columns.iter().all(|column| {
        match (left.resolve(None, column), right.resolve(None, column)) {
            (Some(l), Some(r)) => eval::compare(l, r) == Some(Ordering::Equal),
            _ => false,
        }
    })
}

/// An unmatched left row with every right-hand key set to `NULL`. Shared
/// plain names take the `NULL` too, except the USING columns, which keep
/// the left value.
fn pad(left: &Row, nulls: &Row, using: &[String]) -> Row {
    let mut row = left.clone();
    row.merge(nulls);
    for column in using {
        if let Some(value) = left.get(column) {
            row.set(column.clone(), value.clone());
        }
    }
    row
}
