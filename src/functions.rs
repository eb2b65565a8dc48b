//! Built-in scalar functions.
//!
//! Dispatch is a fixed `match` on the upper-cased name. Arguments of the wrong
//! kind or number make a function return `NULL`; only an unknown name is an
//! error.

use chrono::{Local, NaiveTime};

use crate::ast::BinaryOp;
use crate::error::{Error, Result};
use crate::eval::{EvalContext, arithmetic};
use crate::value::Value;

pub fn call(name: &str, args: &[Value], ctx: &mut dyn EvalContext) -> Result<Value> {
    let value = match name {
        "UPPER" | "UCASE" => text_map(args, |s| s.to_uppercase()),
        "LOWER" | "LCASE" => text_map(args, |s| s.to_lowercase()),
        "LENGTH" | "LEN" | "CHAR_LENGTH" | "CHARACTER_LENGTH" => match args {
            [Value::Null] => Value::Null,
            [value] => Value::Int(text_of(value).chars().count() as i64),
            _ => Value::Null,
        },
        "SUBSTR" | "SUBSTRING" => substring(args),
        "LEFT" => match args {
            [value, Value::Int(n)] if !value.is_null() => {
                Value::from(text_of(value).chars().take((*n).max(0) as usize).collect::<String>())
            }
            _ => Value::Null,
        },
        "RIGHT" => match args {
            [value, Value::Int(n)] if !value.is_null() => {
                let chars: Vec<char> = text_of(value).chars().collect();
                let keep = ((*n).max(0) as usize).min(chars.len());
                Value::from(chars[chars.len() - keep..].iter().collect::<String>())
            }
            _ => Value::Null,
        },
        "TRIM" => text_map(args, |s| s.trim().to_string()),
        "LTRIM" => text_map(args, |s| s.trim_start().to_string()),
        "RTRIM" => text_map(args, |s| s.trim_end().to_string()),
        "REPLACE" => match args {
            [value, from, to] if args.iter().all(|a| !a.is_null()) => {
                Value::from(text_of(value).replace(&text_of(from), &text_of(to)))
            }
            _ => Value::Null,
        },
        "CONCAT" => Value::from(
            args.iter()
                .filter(|a| !a.is_null())
                .map(text_of)
                .collect::<String>(),
        ),
        "COALESCE" => args.iter().find(|a| !a.is_null()).cloned().unwrap_or(Value::Null),
        "NVL" | "IFNULL" => match args {
            [value, fallback] => {
                if value.is_null() {
                    fallback.clone()
                } else {
                    value.clone()
                }
            }
            _ => Value::Null,
        },
        "NULLIF" => match args {
            [left, right] if left.same_as(right) => Value::Null,
            [left, _] => left.clone(),
            _ => Value::Null,
        },
        "ABS" => match args {
            [Value::Int(i)] => i.checked_abs().map_or(Value::Float((*i as f64).abs()), Value::Int),
            [Value::Float(x)] => Value::Float(x.abs()),
            _ => Value::Null,
        },
        "ROUND" => match args {
            [Value::Int(i)] | [Value::Int(i), _] => Value::Int(*i),
            [Value::Float(x)] => Value::Float(x.round()),
            [Value::Float(x), Value::Int(digits)] => Value::Float(round_to(*x, *digits)),
            _ => Value::Null,
        },
        "FLOOR" => unary_float(args, f64::floor),
        "CEIL" | "CEILING" => unary_float(args, f64::ceil),
        "MOD" => match args {
            [left, right] => arithmetic(left, BinaryOp::Modulo, right),
            _ => Value::Null,
        },
        "POWER" | "POW" => match args {
            [base, exponent] => match (base.as_f64(), exponent.as_f64()) {
                (Some(b), Some(e)) => finite(b.powf(e)),
                _ => Value::Null,
            },
            _ => Value::Null,
        },
        "SQRT" => match args {
            [value] => match value.as_f64() {
                Some(x) if x >= 0.0 => Value::Float(x.sqrt()),
                _ => Value::Null,
            },
            _ => Value::Null,
        },
        "NOW" | "CURRENT_TIMESTAMP" | "LOCALTIMESTAMP" | "SYSDATE" => {
            Value::DateTime(Local::now().naive_local())
        }
        "CURRENT_DATE" => Value::DateTime(Local::now().date_naive().and_time(NaiveTime::MIN)),
        "CURRENT_TIME" => Value::from(Local::now().time().format("%H:%M:%S").to_string()),
        "NEXTVAL" => match args {
            [Value::Text(sequence)] => Value::Int(ctx.next_value(sequence)?),
            _ => Value::Null,
        },
        "CURRVAL" => match args {
            [Value::Text(sequence)] => Value::Int(ctx.current_value(sequence)?),
            _ => Value::Null,
        },
        _ => return Err(Error::UnknownFunction(name.to_string())),
    };
    Ok(value)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Text(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn text_map(args: &[Value], f: impl Fn(&str) -> String) -> Value {
    match args {
        [Value::Null] => Value::Null,
        [value] => Value::from(f(&text_of(value))),
        _ => Value::Null,
    }
}

/// `SUBSTR(s, start [, length])` with a 1-based start.
fn substring(args: &[Value]) -> Value {
    let (value, start, length) = match args {
        [value, Value::Int(start)] => (value, *start, None),
        [value, Value::Int(start), Value::Int(length)] => (value, *start, Some(*length)),
        _ => return Value::Null,
    };
    if value.is_null() || length.is_some_and(|l| l < 0) {
        return Value::Null;
    }
    let chars: Vec<char> = text_of(value).chars().collect();
    // positions before the first character still consume the length
    let first = start.max(1);
    let end = match length {
        Some(length) => start.saturating_add(length).max(first),
        None => i64::MAX,
    };
    chars
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            let pos = *idx as i64 + 1;
            pos >= first && pos < end
        })
        .map(|(_, c)| *c)
        .collect::<String>()
        .into()
}

fn unary_float(args: &[Value], f: fn(f64) -> f64) -> Value {
    match args {
        [Value::Int(i)] => Value::Int(*i),
        [Value::Float(x)] => Value::Float(f(*x)),
        _ => Value::Null,
    }
}

fn finite(x: f64) -> Value {
    if x.is_finite() {
        Value::Float(x)
    } else {
        Value::Null
    }
}

/// Rounds half away from zero to `digits` decimal places.
pub fn round_to(x: f64, digits: i64) -> f64 {
    let factor = 10f64.powi(digits.clamp(-15, 15) as i32);
    (x * factor).round() / factor
}
