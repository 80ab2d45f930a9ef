/// jq filter evaluator: produces zero or more output Values per input.
///
/// Uses generator semantics: each filter operation calls `output` for
/// each result, avoiding intermediate Vec allocations. The first error
/// raised by `output` or by a sub-filter aborts the whole branch.
use crate::filter::builtins::eval_builtin;
use crate::filter::error::EvalError;
use crate::filter::value_ops::{array_position, slice_bounds};
use crate::filter::{Filter, ObjKey};
use crate::value::Value;

/// Evaluate a filter against an input value, calling `output` for each result.
pub fn eval_filter(
    filter: &Filter,
    input: &Value,
    output: &mut dyn FnMut(Value) -> Result<(), EvalError>,
) -> Result<(), EvalError> {
    match filter {
        Filter::Identity => output(input.clone()),

        Filter::Field(name, optional) => match input {
            // Null behaves like an object with no keys
            Value::Object(_) | Value::Null => match input.get(name) {
                Some(v) => output(v.clone()),
                None if *optional => Ok(()),
                None => Err(EvalError::PropertyNotFound(name.clone())),
            },
            _ if *optional => Ok(()),
            other => Err(EvalError::mismatch("object", other)),
        },

        Filter::Index(base, idx) => eval_filter(base, input, &mut |container| {
            // The index expression sees the same input as the base
            eval_filter(idx, input, &mut |key| output(index_value(&container, &key)?))
        }),

        Filter::Slice(base, start, end) => {
            let starts = bound_values(start.as_deref(), input)?;
            let ends = bound_values(end.as_deref(), input)?;
            eval_filter(base, input, &mut |container| {
                for s in &starts {
                    for e in &ends {
                        output(slice_value(&container, s.as_ref(), e.as_ref())?)?;
                    }
                }
                Ok(())
            })
        }

        Filter::IterateAll(base) => eval_filter(base, input, &mut |container| match container {
            Value::Array(items) => items.into_iter().try_for_each(|v| output(v)),
            Value::Object(pairs) => pairs.into_iter().try_for_each(|(_, v)| output(v)),
            other => Err(EvalError::CannotIterate(other.type_name())),
        }),

        Filter::Pipe(left, right) => eval_filter(left, input, &mut |intermediate| {
            eval_filter(right, &intermediate, output)
        }),

        Filter::Comma(left, right) => {
            eval_filter(left, input, output)?;
            eval_filter(right, input, output)
        }

        Filter::ObjectConstruct(entries) => {
            let mut current = Vec::with_capacity(entries.len());
            build_object(entries, 0, &mut current, input, output)
        }

        Filter::ArrayConstruct(body) => {
            let mut items = Vec::new();
            eval_filter(body, input, &mut |v| {
                items.push(v);
                Ok(())
            })?;
            output(Value::Array(items))
        }

        Filter::Literal(v) => output(v.clone()),

        Filter::Optional(inner) => {
            // Buffer so an error midway discards everything the inner
            // filter produced; errors from `output` itself still propagate.
            let mut buffered = Vec::new();
            let result = eval_filter(inner, input, &mut |v| {
                buffered.push(v);
                Ok(())
            });
            match result {
                Ok(()) => buffered.into_iter().try_for_each(|v| output(v)),
                Err(e) => {
                    log::trace!("suppressed by ?: {e}");
                    Ok(())
                }
            }
        }

        Filter::Alternative(left, right) => {
            let mut truthy = Vec::new();
            let result = eval_filter(left, input, &mut |v| {
                if v.is_truthy() {
                    truthy.push(v);
                }
                Ok(())
            });
            if let Err(e) = result {
                log::trace!("left side of // failed: {e}");
            }
            if truthy.is_empty() {
                eval_filter(right, input, output)
            } else {
                truthy.into_iter().try_for_each(|v| output(v))
            }
        }

        Filter::Builtin(b) => eval_builtin(*b, input, output),
    }
}

/// Evaluate a filter against each input in order, concatenating outputs.
pub fn evaluate_stream<'v>(
    filter: &Filter,
    inputs: impl IntoIterator<Item = &'v Value>,
) -> Result<Vec<Value>, EvalError> {
    let mut out = Vec::new();
    for input in inputs {
        eval_filter(filter, input, &mut |v| {
            out.push(v);
            Ok(())
        })?;
    }
    Ok(out)
}

fn index_value(container: &Value, key: &Value) -> Result<Value, EvalError> {
    match (container, key) {
        (Value::Array(items), Value::Number(f)) => Ok(items[array_position(*f, items.len())?].clone()),
        (Value::Object(_), Value::String(k)) => container
            .get(k)
            .cloned()
            .ok_or_else(|| EvalError::PropertyNotFound(k.clone())),
        (Value::Array(_), other) => Err(EvalError::mismatch("number", other)),
        (Value::Object(_), other) => Err(EvalError::mismatch("string", other)),
        (other, _) => Err(EvalError::mismatch("array or object", other)),
    }
}

/// Every output of a slice bound, or a single open bound when omitted.
fn bound_values(bound: Option<&Filter>, input: &Value) -> Result<Vec<Option<Value>>, EvalError> {
    let Some(f) = bound else {
        return Ok(vec![None]);
    };
    let mut values = Vec::new();
    eval_filter(f, input, &mut |v| {
        values.push(Some(v));
        Ok(())
    })?;
    Ok(values)
}

fn slice_value(container: &Value, start: Option<&Value>, end: Option<&Value>) -> Result<Value, EvalError> {
    match container {
        Value::Array(items) => {
            let (s, e) = slice_bounds(start, end, items.len())?;
            Ok(Value::Array(items[s..e].to_vec()))
        }
        Value::String(text) => {
            let (s, e) = slice_bounds(start, end, text.chars().count())?;
            Ok(Value::String(text.chars().skip(s).take(e - s).collect()))
        }
        other => Err(EvalError::mismatch("array or string", other)),
    }
}

/// Cross product over the entries: one object per combination of key and
/// value outputs, left to right.
fn build_object(
    entries: &[(ObjKey, Box<Filter>)],
    idx: usize,
    current: &mut Vec<(String, Value)>,
    input: &Value,
    output: &mut dyn FnMut(Value) -> Result<(), EvalError>,
) -> Result<(), EvalError> {
    let Some((key, val_filter)) = entries.get(idx) else {
        return output(Value::Object(dedup_keys(current)));
    };
    match key {
        ObjKey::Name(name) => eval_filter(val_filter, input, &mut |v| {
            current.push((name.clone(), v));
            let result = build_object(entries, idx + 1, current, input, output);
            current.pop();
            result
        }),
        ObjKey::Expr(expr) => eval_filter(expr, input, &mut |k| {
            let name = match k {
                Value::String(s) => s,
                other => return Err(EvalError::mismatch("string", &other)),
            };
            eval_filter(val_filter, input, &mut |v| {
                current.push((name.clone(), v));
                let result = build_object(entries, idx + 1, current, input, output);
                current.pop();
                result
            })
        }),
    }
}

/// A repeated key keeps its first position and takes the last value.
fn dedup_keys(pairs: &[(String, Value)]) -> Vec<(String, Value)> {
    let mut out: Vec<(String, Value)> = Vec::with_capacity(pairs.len());
    for (k, v) in pairs {
        match out.iter_mut().find(|(ok, _)| ok == k) {
            Some(slot) => slot.1 = v.clone(),
            None => out.push((k.clone(), v.clone())),
        }
    }
    out
}
