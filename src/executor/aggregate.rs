//! Aggregate functions over the rows of one group.

use super::Executor;
use crate::ast::FunctionCall;
use crate::error::{Error, Result};
use crate::eval::{self, Scope};
use crate::row::Row;
use crate::value::Value;

/// Running state of a numeric sum. Integers stay exact until one overflows or
/// a float joins in.
#[derive(Debug, Clone, Copy)]
enum Sum {
    Empty,
    Int(i64),
    Float(f64),
}

impl Sum {
    fn add(self, value: &Value) -> Self {
        match (self, value) {
            (Self::Empty, Value::Int(i)) => Self::Int(*i),
            (Self::Empty, Value::Float(x)) => Self::Float(*x),
            (Self::Int(acc), Value::Int(i)) => acc
                .checked_add(*i)
                .map_or(Self::Float(acc as f64 + *i as f64), Self::Int),
            (Self::Int(acc), Value::Float(x)) => Self::Float(acc as f64 + x),
            (Self::Float(acc), Value::Int(i)) => Self::Float(acc + *i as f64),
            (Self::Float(acc), Value::Float(x)) => Self::Float(acc + x),
            (sum, _) => sum,
        }
    }

    fn value(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Int(i) => Value::Int(i),
            Self::Float(x) => Value::Float(x),
        }
    }

    fn as_f64(self) -> Option<f64> {
        match self {
            Self::Empty => None,
            Self::Int(i) => Some(i as f64),
            Self::Float(x) => Some(x),
        }
    }
}

impl Executor<'_> {
    /// Computes `call` over `group`. `COUNT(*)` counts rows; every other
    /// aggregate ignores `NULL` inputs and returns `NULL` when none are left,
    /// except `COUNT` which returns 0.
    pub(super) fn compute_aggregate(&mut self, call: &FunctionCall, group: &[Row]) -> Result<Value> {
        let name = call.name.to_ascii_uppercase();
        if call.star {
            return match name.as_str() {
                "COUNT" => Ok(Value::Int(group.len() as i64)),
                _ => Err(Error::InvalidArgument(format!("{name}(*) is not supported"))),
            };
        }
        let [argument] = call.args.as_slice() else {
            return Err(Error::InvalidArgument(format!(
                "{name} expects one argument, found {}",
                call.args.len()
            )));
        };

        let mut values: Vec<Value> = Vec::with_capacity(group.len());
        for row in group {
            let value = eval::evaluate(argument, &Scope::new(row), self)?;
            if value.is_null() {
                continue;
            }
            if call.distinct && values.iter().any(|v| v.same_as(&value)) {
                continue;
            }
            values.push(value);
        }

        let result = match name.as_str() {
            "COUNT" => Value::Int(values.len() as i64),
            "SUM" => values
                .iter()
                .filter(|v| v.is_numeric())
                .fold(Sum::Empty, Sum::add)
                .value(),
            "AVG" => {
                let numeric: Vec<&Value> = values.iter().filter(|v| v.is_numeric()).collect();
                let count = numeric.len();
                match numeric.into_iter().fold(Sum::Empty, Sum::add).as_f64() {
                    Some(total) => Value::Float(total / count as f64),
                    None => Value::Null,
                }
            }
            "MIN" => values.into_iter().min_by(Value::total_cmp).unwrap_or(Value::Null),
            "MAX" => values.into_iter().max_by(Value::total_cmp).unwrap_or(Value::Null),
            _ => return Err(Error::UnknownFunction(call.name.clone())),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_stays_integer_until_overflow() {
        let sum = [Value::Int(1), Value::Int(2)].iter().fold(Sum::Empty, Sum::add);
        assert_eq!(sum.value(), Value::Int(3));

        let sum = [Value::Int(i64::MAX), Value::Int(1)].iter().fold(Sum::Empty, Sum::add);
        assert!(matches!(sum.value(), Value::Float(_)));
    }

    #[test]
    fn test_sum_with_float_is_float() {
        let sum = [Value::Int(1), Value::Float(0.5)].iter().fold(Sum::Empty, Sum::add);
        assert_eq!(sum.value(), Value::Float(1.5));
        assert_eq!(Sum::Empty.value(), Value::Null);
    }
}
