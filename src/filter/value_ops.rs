/// Pure value helpers shared by eval.rs and builtins.rs: jq's total
/// ordering, structural equality, numeric index conversion and slicing.
use crate::value::Value;
use std::cmp::Ordering;

use super::error::EvalError;

/// jq total ordering: null < false < true < numbers < strings < arrays < objects
fn type_order(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order over values. NaN sorts below every other number.
pub(super) fn values_order(left: &Value, right: &Value) -> Ordering {
    let lt = type_order(left);
    let rt = type_order(right);
    if lt != rt {
        return lt.cmp(&rt);
    }
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match a.partial_cmp(b) {
            Some(ord) => ord,
            None => a.is_nan().cmp(&b.is_nan()).reverse(),
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (av, bv) in a.iter().zip(b.iter()) {
                match values_order(av, bv) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            // Sorted key sets compare first, then values in key order
            let mut ak: Vec<_> = a.iter().collect();
            let mut bk: Vec<_> = b.iter().collect();
            ak.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
            bk.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
            let keys = ak.iter().map(|(k, _)| k).cmp(bk.iter().map(|(k, _)| k));
            if keys != Ordering::Equal {
                return keys;
            }
            for ((_, va), (_, vb)) in ak.iter().zip(bk.iter()) {
                match values_order(va, vb) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        }
        // Same type tag: null/null, false/false, true/true
        _ => Ordering::Equal,
    }
}

/// Structural equality where object key order does not matter.
pub(super) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| right.get(k).is_some_and(|bv| values_equal(v, bv)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        _ => left == right,
    }
}

/// Convert a numeric array index to a position, flooring fractional values.
/// Negative indices are rejected rather than counted from the end.
pub(super) fn array_position(idx: f64, len: usize) -> Result<usize, EvalError> {
    let floored = idx.floor();
    if floored < 0.0 {
        return Err(EvalError::NegativeIndexUnsupported(floored as i64));
    }
    // NaN and values beyond usize saturate; both land out of range
    let pos = if floored.is_nan() { usize::MAX } else { floored as usize };
    if pos >= len {
        return Err(EvalError::IndexOutOfBounds { index: pos, length: len });
    }
    Ok(pos)
}

/// Resolve slice bounds against a length: `null` means open-ended, the
/// start is floored, the end is ceiled, and both clamp into `[0, len]`.
pub(super) fn slice_bounds(
    start: Option<&Value>,
    end: Option<&Value>,
    len: usize,
) -> Result<(usize, usize), EvalError> {
    let bound = |v: Option<&Value>, default: usize, round: fn(f64) -> f64| match v {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(f)) => {
            let r = round(*f);
            Ok(if r.is_nan() || r <= 0.0 {
                0
            } else if r >= len as f64 {
                len
            } else {
                r as usize
            })
        }
        Some(other) => Err(EvalError::mismatch("number", other)),
    };
    let s = bound(start, 0, f64::floor)?;
    let e = bound(end, len, f64::ceil)?;
    Ok((s, e.max(s)))
}
