//! Tree-walking evaluator for attribute path expressions

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::EvalError;
use super::ast::{Ast, Comparator};
use super::functions;

pub(crate) fn evaluate(ast: &Ast, data: &Value) -> Result<Value, EvalError> {
    match ast {
        Ast::Identity => Ok(data.clone()),
        Ast::Field(name) => Ok(match data {
            Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        }),
        Ast::Index(index) => Ok(match data {
            Value::Array(items) => resolve_index(items.len(), *index)
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }),
        Ast::Slice { start, stop, step } => Ok(match data {
            Value::Array(items) => Value::Array(slice(items, *start, *stop, *step)),
            _ => Value::Null,
        }),
        Ast::Subexpr(lhs, rhs) => {
            let left = evaluate(lhs, data)?;
            evaluate(rhs, &left)
        }
        Ast::Projection { lhs, rhs } => {
            let Value::Array(items) = evaluate(lhs, data)? else {
                return Ok(Value::Null);
            };
            let mut projected = Vec::with_capacity(items.len());
            for item in &items {
                let value = evaluate(rhs, item)?;
                if !value.is_null() {
                    projected.push(value);
                }
            }
            Ok(Value::Array(projected))
        }
        Ast::ObjectValues(inner) => Ok(match evaluate(inner, data)? {
            Value::Object(map) => Value::Array(map.into_iter().map(|(_, v)| v).collect()),
            _ => Value::Null,
        }),
        Ast::Flatten(inner) => Ok(match evaluate(inner, data)? {
            Value::Array(items) => {
                let mut flat = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(nested) => flat.extend(nested),
                        other => flat.push(other),
                    }
                }
                Value::Array(flat)
            }
            _ => Value::Null,
        }),
        Ast::Condition { predicate, then } => {
            if is_truthy(&evaluate(predicate, data)?) {
                evaluate(then, data)
            } else {
                Ok(Value::Null)
            }
        }
        Ast::Comparison { op, lhs, rhs } => {
            let left = evaluate(lhs, data)?;
            let right = evaluate(rhs, data)?;
            Ok(compare(*op, &left, &right))
        }
        Ast::And(lhs, rhs) => {
            let left = evaluate(lhs, data)?;
            if is_truthy(&left) {
                evaluate(rhs, data)
            } else {
                Ok(left)
            }
        }
        Ast::Or(lhs, rhs) => {
            let left = evaluate(lhs, data)?;
            if is_truthy(&left) {
                Ok(left)
            } else {
                evaluate(rhs, data)
            }
        }
        Ast::Not(inner) => Ok(Value::Bool(!is_truthy(&evaluate(inner, data)?))),
        Ast::Literal(value) => Ok(value.clone()),
        Ast::MultiList(items) => {
            if data.is_null() {
                return Ok(Value::Null);
            }
            items
                .iter()
                .map(|item| evaluate(item, data))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        Ast::MultiHash(entries) => {
            if data.is_null() {
                return Ok(Value::Null);
            }
            let mut map = Map::with_capacity(entries.len());
            for (key, expr) in entries {
                map.insert(key.clone(), evaluate(expr, data)?);
            }
            Ok(Value::Object(map))
        }
        Ast::Function { name, args } => functions::call(name, args, data),
        Ast::Expref(_) => Err(EvalError::new(
            "expression references are only valid as function arguments",
        )),
    }
}

/// JMESPath truthiness: null, false and empty strings, arrays and objects are false
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Structural equality where numbers compare by value (`1 == 1.0`)
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => left == right,
    }
}

fn compare(op: Comparator, left: &Value, right: &Value) -> Value {
    match op {
        Comparator::Eq => Value::Bool(values_equal(left, right)),
        Comparator::Ne => Value::Bool(!values_equal(left, right)),
        _ => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Value::Null;
            };
            let Some(ordering) = a.partial_cmp(&b) else {
                return Value::Null;
            };
            Value::Bool(match op {
                Comparator::Lt => ordering == Ordering::Less,
                Comparator::Lte => ordering != Ordering::Greater,
                Comparator::Gt => ordering == Ordering::Greater,
                Comparator::Gte => ordering != Ordering::Less,
                Comparator::Eq | Comparator::Ne => unreachable!("handled above"),
            })
        }
    }
}

fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

fn slice(items: &[Value], start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<Value> {
    let len = items.len() as i64;
    let clamp = |bound: i64| -> i64 {
        if bound < 0 {
            let adjusted = bound + len;
            if adjusted < 0 {
                if step < 0 { -1 } else { 0 }
            } else {
                adjusted
            }
        } else if bound >= len {
            if step < 0 { len - 1 } else { len }
        } else {
            bound
        }
    };

    let (default_start, default_stop) = if step < 0 { (len - 1, -1) } else { (0, len) };
    let start = start.map_or(default_start, clamp);
    let stop = stop.map_or(default_stop, clamp);

    let mut result = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            result.push(items[i as usize].clone());
            i += step;
        }
    } else {
        while i > stop {
            result.push(items[i as usize].clone());
            i += step;
        }
    }
    result
}
