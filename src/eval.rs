//! Row-scoped evaluation of [`Expr`] trees into [`Value`]s.
//!
//! Evaluation follows SQL three-valued logic. Runtime failures such as a
//! division by zero, an overflowing cast or a malformed LIKE pattern produce
//! `NULL` rather than an error; only name resolution, unbound parameters and
//! misplaced aggregates fail.

use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;

use crate::ast::{BinaryOp, ColumnRef, Expr, FunctionCall, Parameter, Select, UnaryOp};
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::functions;
use crate::row::Row;
use crate::value::{Value, parse_datetime};

/// Services the evaluator needs from the surrounding executor.
pub trait EvalContext {
    /// Normalises an identifier the way the catalog does.
    fn fold(&self, ident: &str) -> String;

    fn parameter(&self, parameter: &Parameter) -> Result<Value>;

    /// Looks a column up in the rows of enclosing queries, innermost first.
    fn outer_value(&self, column: &ColumnRef) -> Option<Value>;

    /// Runs a subquery correlated with `row`, returning its rows as value lists.
    fn subquery(&mut self, query: &Select, row: &Row) -> Result<Vec<Vec<Value>>>;

    fn next_value(&mut self, sequence: &str) -> Result<i64>;

    fn current_value(&self, sequence: &str) -> Result<i64>;
}

/// The row an expression is evaluated against, plus the already computed
/// aggregate results of its group (keyed by the call's SQL text).
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub row: &'a Row,
    pub aggregates: Option<&'a HashMap<String, Value>>,
}

impl<'a> Scope<'a> {
    pub fn new(row: &'a Row) -> Self {
        Self {
            row,
            aggregates: None,
        }
    }

    pub fn with_aggregates(row: &'a Row, aggregates: &'a HashMap<String, Value>) -> Self {
        Self {
            row,
            aggregates: Some(aggregates),
        }
    }
}

pub fn evaluate(expr: &Expr, scope: &Scope, ctx: &mut dyn EvalContext) -> Result<Value> {
    match expr {
        Expr::Literal(literal) => Ok(literal.to_value()),
        Expr::Column(column) => lookup_column(column, scope, ctx),
        Expr::Parameter(parameter) => ctx.parameter(parameter),
        Expr::Unary { op, expr } => {
            let value = evaluate(expr, scope, ctx)?;
            Ok(match op {
                UnaryOp::Not => logic(value.to_logic().map(|b| !b)),
                UnaryOp::Minus => negate(&value),
            })
        }
        Expr::Binary { left, op, right } => evaluate_binary(left, *op, right, scope, ctx),
        Expr::IsNull { expr, negated } => {
            let value = evaluate(expr, scope, ctx)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let value = evaluate(expr, scope, ctx)?;
            let candidates = list
                .iter()
                .map(|item| evaluate(item, scope, ctx))
                .collect::<Result<Vec<_>>>()?;
            Ok(logic(in_values(&value, &candidates).map(|found| found != *negated)))
        }
        Expr::InSubquery {
            expr,
            query,
            negated,
        } => {
            let value = evaluate(expr, scope, ctx)?;
            let candidates: Vec<Value> = ctx
                .subquery(query, scope.row)?
                .into_iter()
                .filter_map(|row| row.into_iter().next())
                .collect();
            Ok(logic(in_values(&value, &candidates).map(|found| found != *negated)))
        }
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let value = evaluate(expr, scope, ctx)?;
            let low = evaluate(low, scope, ctx)?;
            let high = evaluate(high, scope, ctx)?;
            let above = compare(&value, &low).map(|o| o != Ordering::Less);
            let below = compare(&value, &high).map(|o| o != Ordering::Greater);
            Ok(logic(and(above, below).map(|inside| inside != *negated)))
        }
        Expr::Like {
            expr,
            pattern,
            escape,
            negated,
        } => {
            let value = evaluate(expr, scope, ctx)?;
            let pattern = evaluate(pattern, scope, ctx)?;
            let escape = match escape {
                Some(escape) => evaluate(escape, scope, ctx)?,
                None => Value::Null,
            };
            Ok(logic(like(&value, &pattern, &escape).map(|m| m != *negated)))
        }
        Expr::Case {
            operand,
            branches,
            else_result,
        } => {
            let operand = match operand {
                Some(operand) => Some(evaluate(operand, scope, ctx)?),
                None => None,
            };
            for (condition, result) in branches {
                let condition = evaluate(condition, scope, ctx)?;
                let hit = match &operand {
                    Some(operand) => compare(operand, &condition) == Some(Ordering::Equal),
                    None => condition.to_logic() == Some(true),
                };
                if hit {
                    return evaluate(result, scope, ctx);
                }
            }
            match else_result {
                Some(else_result) => evaluate(else_result, scope, ctx),
                None => Ok(Value::Null),
            }
        }
        Expr::Cast { expr, target } => {
            let value = evaluate(expr, scope, ctx)?.cast(target.data_type, target.length);
            Ok(match (target.data_type, target.scale, &value) {
                (DataType::Decimal, Some(scale), Value::Float(x)) => {
                    Value::Float(functions::round_to(*x, i64::from(scale)))
                }
                _ => value,
            })
        }
        Expr::Exists { query, negated } => {
            let rows = ctx.subquery(query, scope.row)?;
            Ok(Value::Bool(rows.is_empty() == *negated))
        }
        Expr::Subquery(query) => Ok(ctx
            .subquery(query, scope.row)?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(Value::Null)),
        Expr::Function(call) => evaluate_function(call, scope, ctx),
    }
}

/// Evaluates a predicate; only a true result keeps a row.
pub fn is_true(expr: &Expr, scope: &Scope, ctx: &mut dyn EvalContext) -> Result<bool> {
    Ok(evaluate(expr, scope, ctx)?.to_logic() == Some(true))
}

fn lookup_column(column: &ColumnRef, scope: &Scope, ctx: &mut dyn EvalContext) -> Result<Value> {
    let name = ctx.fold(&column.name);
    let table = column.table.as_deref().map(|t| ctx.fold(t));
    if let Some(value) = scope.row.resolve(table.as_deref(), &name) {
        return Ok(value.clone());
    }
    ctx.outer_value(column)
        .ok_or_else(|| Error::ColumnNotFound(column.to_string()))
}

fn evaluate_function(call: &FunctionCall, scope: &Scope, ctx: &mut dyn EvalContext) -> Result<Value> {
    if call.over.is_some() {
        return Err(Error::Unsupported(format!("window function {}", call.name)));
    }
    if call.is_aggregate() {
        return scope
            .aggregates
            .and_then(|computed| computed.get(&call.to_string()))
            .cloned()
            .ok_or_else(|| Error::AggregateMisuse(call.to_string()));
    }
    let args = call
        .args
        .iter()
        .map(|arg| evaluate(arg, scope, ctx))
        .collect::<Result<Vec<_>>>()?;
    functions::call(&call.name.to_uppercase(), &args, ctx)
}

fn logic(value: Option<bool>) -> Value {
    value.map_or(Value::Null, Value::Bool)
}

fn and(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn negate(value: &Value) -> Value {
    match value {
        Value::Int(i) => i.checked_neg().map_or(Value::Float(-(*i as f64)), Value::Int),
        Value::Float(x) => Value::Float(-x),
        _ => Value::Null,
    }
}

/// Compares two values; `None` when either side is `NULL`. A string compared
/// with a datetime is read as a datetime.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::DateTime(l), Value::Text(r)) => parse_datetime(r).map(|r| l.cmp(&r)),
        (Value::Text(l), Value::DateTime(r)) => parse_datetime(l).map(|l| l.cmp(r)),
        _ => Some(left.total_cmp(right)),
    }
}

/// `Some(true)` on a match, `None` when no match was found but a `NULL` was
/// involved.
fn in_values(value: &Value, candidates: &[Value]) -> Option<bool> {
    if value.is_null() {
        return None;
    }
    let mut saw_null = false;
    for candidate in candidates {
        match compare(value, candidate) {
            Some(Ordering::Equal) => return Some(true),
            None => saw_null = true,
            Some(_) => {}
        }
    }
    if saw_null { None } else { Some(false) }
}

fn evaluate_binary(
    left: &Expr,
    op: BinaryOp,
    right: &Expr,
    scope: &Scope,
    ctx: &mut dyn EvalContext,
) -> Result<Value> {
    let left = evaluate(left, scope, ctx)?;

    // short-circuit on a decided left operand
    match (op, left.to_logic()) {
        (BinaryOp::And, Some(false)) => return Ok(Value::Bool(false)),
        (BinaryOp::Or, Some(true)) => return Ok(Value::Bool(true)),
        _ => {}
    }

    let right = evaluate(right, scope, ctx)?;
    Ok(match op {
        BinaryOp::And => logic(and(left.to_logic(), right.to_logic())),
        BinaryOp::Or => logic(or(left.to_logic(), right.to_logic())),
        BinaryOp::Eq => logic(compare(&left, &right).map(|o| o == Ordering::Equal)),
        BinaryOp::NotEq => logic(compare(&left, &right).map(|o| o != Ordering::Equal)),
        BinaryOp::Lt => logic(compare(&left, &right).map(|o| o == Ordering::Less)),
        BinaryOp::LtEq => logic(compare(&left, &right).map(|o| o != Ordering::Greater)),
        BinaryOp::Gt => logic(compare(&left, &right).map(|o| o == Ordering::Greater)),
        BinaryOp::GtEq => logic(compare(&left, &right).map(|o| o != Ordering::Less)),
        BinaryOp::Concat => match (&left, &right) {
            (Value::Null, _) | (_, Value::Null) => Value::Null,
            _ => Value::from(format!("{left}{right}")),
        },
        BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
            arithmetic(&left, op, &right)
        }
    })
}

/// Numeric arithmetic. Integer results that overflow are computed in floating
/// point; division or modulo by zero is `NULL`.
pub fn arithmetic(left: &Value, op: BinaryOp, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => {
            let (l, r) = (*l, *r);
            let exact = match op {
                BinaryOp::Plus => l.checked_add(r),
                BinaryOp::Minus => l.checked_sub(r),
                BinaryOp::Multiply => l.checked_mul(r),
                BinaryOp::Divide => {
                    if r == 0 {
                        return Value::Null;
                    }
                    // integer division only when nothing is lost
                    match l.checked_rem(r) {
                        Some(0) => l.checked_div(r),
                        _ => return Value::Float(l as f64 / r as f64),
                    }
                }
                BinaryOp::Modulo => {
                    if r == 0 {
                        return Value::Null;
                    }
                    l.checked_rem(r)
                }
                _ => return Value::Null,
            };
            exact.map_or_else(|| float_arithmetic(l as f64, op, r as f64), Value::Int)
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => float_arithmetic(l, op, r),
            _ => Value::Null,
        },
    }
}

fn float_arithmetic(l: f64, op: BinaryOp, r: f64) -> Value {
    let result = match op {
        BinaryOp::Plus => l + r,
        BinaryOp::Minus => l - r,
        BinaryOp::Multiply => l * r,
        BinaryOp::Divide if r == 0.0 => return Value::Null,
        BinaryOp::Divide => l / r,
        BinaryOp::Modulo if r == 0.0 => return Value::Null,
        BinaryOp::Modulo => l % r,
        _ => return Value::Null,
    };
    if result.is_finite() {
        Value::Float(result)
    } else {
        Value::Null
    }
}

/// LIKE match: `%` is any run of characters, `_` exactly one. The match is
/// case sensitive and anchored at both ends.
fn like(value: &Value, pattern: &Value, escape: &Value) -> Option<bool> {
    let (Some(text), Some(pattern)) = (like_operand(value), like_operand(pattern)) else {
        return None;
    };
    let escape = escape.as_str().and_then(|e| e.chars().next());
    let regex = Regex::new(&like_to_regex(&pattern, escape)).ok()?;
    Some(regex.is_match(&text))
}

fn like_operand(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn like_to_regex(pattern: &str, escape: Option<char>) -> String {
    let mut regex = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        if Some(ch) == escape {
            if let Some(next) = chars.next() {
                regex.push_str(&regex::escape(&next.to_string()));
            }
            continue;
        }
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}
