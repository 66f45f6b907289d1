//! Built-in JMESPath functions

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use super::EvalError;
use super::ast::Ast;
use super::interpreter::{evaluate, values_equal};

pub(crate) fn call(name: &str, args: &[Ast], data: &Value) -> Result<Value, EvalError> {
    match name {
        "abs" => unary_number(name, args, data, f64::abs),
        "ceil" => unary_number(name, args, data, f64::ceil),
        "floor" => unary_number(name, args, data, f64::floor),
        "avg" => {
            let numbers = number_array(name, &single(name, args, data)?)?;
            if numbers.is_empty() {
                return Ok(Value::Null);
            }
            Ok(number(numbers.iter().sum::<f64>() / numbers.len() as f64))
        }
        "sum" => {
            let numbers = number_array(name, &single(name, args, data)?)?;
            Ok(number(numbers.iter().sum()))
        }
        "contains" => {
            let [subject, search] = values::<2>(name, args, data)?;
            match subject {
                Value::Array(items) => Ok(Value::Bool(
                    items.iter().any(|item| values_equal(item, &search)),
                )),
                Value::String(s) => Ok(Value::Bool(
                    search.as_str().is_some_and(|needle| s.contains(needle)),
                )),
                other => Err(invalid_type(name, "array or string", &other)),
            }
        }
        "starts_with" | "ends_with" => {
            let [subject, affix] = values::<2>(name, args, data)?;
            let subject = string(name, &subject)?;
            let affix = string(name, &affix)?;
            Ok(Value::Bool(if name == "starts_with" {
                subject.starts_with(affix)
            } else {
                subject.ends_with(affix)
            }))
        }
        "join" => {
            let [glue, items] = values::<2>(name, args, data)?;
            let glue = string(name, &glue)?;
            let Value::Array(items) = items else {
                return Err(invalid_type(name, "array of strings", &items));
            };
            let parts = items
                .iter()
                .map(|item| string(name, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::String(parts.join(glue)))
        }
        "keys" => match single(name, args, data)? {
            Value::Object(map) => Ok(Value::Array(map.keys().cloned().map(Value::String).collect())),
            other => Err(invalid_type(name, "object", &other)),
        },
        "values" => match single(name, args, data)? {
            Value::Object(map) => Ok(Value::Array(map.into_iter().map(|(_, v)| v).collect())),
            other => Err(invalid_type(name, "object", &other)),
        },
        "length" => match single(name, args, data)? {
            Value::String(s) => Ok(Value::from(s.chars().count())),
            Value::Array(items) => Ok(Value::from(items.len())),
            Value::Object(map) => Ok(Value::from(map.len())),
            other => Err(invalid_type(name, "string, array or object", &other)),
        },
        "reverse" => match single(name, args, data)? {
            Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
            Value::Array(mut items) => {
                items.reverse();
                Ok(Value::Array(items))
            }
            other => Err(invalid_type(name, "string or array", &other)),
        },
        "sort" => {
            let mut items = homogeneous_array(name, single(name, args, data)?)?;
            items.sort_by(compare_sortable);
            Ok(Value::Array(items))
        }
        "max" | "min" => {
            let items = homogeneous_array(name, single(name, args, data)?)?;
            let picked = if name == "max" {
                items.into_iter().max_by(compare_sortable)
            } else {
                items.into_iter().min_by(compare_sortable)
            };
            Ok(picked.unwrap_or(Value::Null))
        }
        "sort_by" | "max_by" | "min_by" => {
            arity(name, args, 2)?;
            let Value::Array(items) = evaluate(&args[0], data)? else {
                return Err(EvalError::new(format!("{name}() expects an array")));
            };
            let key_expr = expref(name, &args[1])?;
            let mut keyed = Vec::with_capacity(items.len());
            for item in items {
                let key = evaluate(key_expr, &item)?;
                if !(key.is_number() || key.is_string()) {
                    return Err(invalid_type(name, "number or string key", &key));
                }
                keyed.push((key, item));
            }
            let ordering = |a: &(Value, Value), b: &(Value, Value)| compare_sortable(&a.0, &b.0);
            Ok(match name {
                "sort_by" => {
                    keyed.sort_by(ordering);
                    Value::Array(keyed.into_iter().map(|(_, item)| item).collect())
                }
                "max_by" => keyed.into_iter().max_by(ordering).map_or(Value::Null, |(_, v)| v),
                _ => keyed.into_iter().min_by(ordering).map_or(Value::Null, |(_, v)| v),
            })
        }
        "map" => {
            arity(name, args, 2)?;
            let key_expr = expref(name, &args[0])?;
            match evaluate(&args[1], data)? {
                Value::Array(items) => items
                    .iter()
                    .map(|item| evaluate(key_expr, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                other => Err(invalid_type(name, "array", &other)),
            }
        }
        "merge" => {
            let mut merged = Map::new();
            for arg in args {
                match evaluate(arg, data)? {
                    Value::Object(map) => merged.extend(map),
                    other => return Err(invalid_type(name, "object", &other)),
                }
            }
            Ok(Value::Object(merged))
        }
        "not_null" => {
            if args.is_empty() {
                return Err(EvalError::new("not_null() expects at least one argument"));
            }
            for arg in args {
                let value = evaluate(arg, data)?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            Ok(Value::Null)
        }
        "to_array" => Ok(match single(name, args, data)? {
            Value::Array(items) => Value::Array(items),
            other => Value::Array(vec![other]),
        }),
        "to_string" => Ok(match single(name, args, data)? {
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }),
        "to_number" => Ok(match single(name, args, data)? {
            Value::Number(n) => Value::Number(n),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<f64>().map(number))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }),
        "type" => Ok(Value::String(type_name(&single(name, args, data)?).to_string())),
        other => Err(EvalError::new(format!("unknown function: {other}()"))),
    }
}

fn arity(name: &str, args: &[Ast], expected: usize) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::new(format!(
            "{name}() expects {expected} argument(s), got {}",
            args.len()
        )))
    }
}

fn values<const N: usize>(name: &str, args: &[Ast], data: &Value) -> Result<[Value; N], EvalError> {
    arity(name, args, N)?;
    let mut out: [Value; N] = std::array::from_fn(|_| Value::Null);
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = evaluate(arg, data)?;
    }
    Ok(out)
}

fn single(name: &str, args: &[Ast], data: &Value) -> Result<Value, EvalError> {
    let [value] = values::<1>(name, args, data)?;
    Ok(value)
}

fn expref<'a>(name: &str, arg: &'a Ast) -> Result<&'a Ast, EvalError> {
    match arg {
        Ast::Expref(inner) => Ok(inner),
        _ => Err(EvalError::new(format!(
            "{name}() expects an expression reference (&expr)"
        ))),
    }
}

fn string<'a>(name: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    value
        .as_str()
        .ok_or_else(|| invalid_type(name, "string", value))
}

fn unary_number(
    name: &str,
    args: &[Ast],
    data: &Value,
    op: impl Fn(f64) -> f64,
) -> Result<Value, EvalError> {
    let value = single(name, args, data)?;
    let n = value
        .as_f64()
        .ok_or_else(|| invalid_type(name, "number", &value))?;
    Ok(number(op(n)))
}

fn number_array(name: &str, value: &Value) -> Result<Vec<f64>, EvalError> {
    let Value::Array(items) = value else {
        return Err(invalid_type(name, "array of numbers", value));
    };
    items
        .iter()
        .map(|item| {
            item.as_f64()
                .ok_or_else(|| invalid_type(name, "array of numbers", value))
        })
        .collect()
}

/// Arrays accepted by sort/min/max: all numbers or all strings
fn homogeneous_array(name: &str, value: Value) -> Result<Vec<Value>, EvalError> {
    let Value::Array(items) = value else {
        return Err(invalid_type(name, "array of numbers or strings", &value));
    };
    let all_numbers = items.iter().all(Value::is_number);
    let all_strings = items.iter().all(Value::is_string);
    if all_numbers || all_strings {
        Ok(items)
    } else {
        Err(EvalError::new(format!(
            "{name}() expects an array of numbers or an array of strings"
        )))
    }
}

fn compare_sortable(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Integral results stay integers so `length(x) == `3`` style checks read naturally
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid_type(name: &str, expected: &str, actual: &Value) -> EvalError {
    EvalError::new(format!(
        "invalid type for {name}(): expected {expected}, got {}",
        type_name(actual)
    ))
}
