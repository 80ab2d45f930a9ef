/// Zero-argument builtin functions.
///
/// Each builtin is a pure function of its input. Names are resolved at
/// parse time, so evaluation never sees an unknown builtin.
use crate::value::Value;

use super::error::EvalError;
use super::value_ops::{values_equal, values_order};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Length,
    Keys,
    KeysUnsorted,
    Type,
    Not,
    Empty,
    Add,
    ToString,
    ToNumber,
    Reverse,
    Sort,
    Unique,
    Min,
    Max,
    Flatten,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Fabs,
    AsciiDowncase,
    AsciiUpcase,
}

const NAMES: &[(&str, Builtin)] = &[
    ("length", Builtin::Length),
    ("keys", Builtin::Keys),
    ("keys_unsorted", Builtin::KeysUnsorted),
    ("type", Builtin::Type),
    ("not", Builtin::Not),
    ("empty", Builtin::Empty),
    ("add", Builtin::Add),
    ("tostring", Builtin::ToString),
    ("tonumber", Builtin::ToNumber),
    ("reverse", Builtin::Reverse),
    ("sort", Builtin::Sort),
    ("unique", Builtin::Unique),
    ("min", Builtin::Min),
    ("max", Builtin::Max),
    ("flatten", Builtin::Flatten),
    ("floor", Builtin::Floor),
    ("ceil", Builtin::Ceil),
    ("round", Builtin::Round),
    ("sqrt", Builtin::Sqrt),
    ("fabs", Builtin::Fabs),
    ("ascii_downcase", Builtin::AsciiDowncase),
    ("ascii_upcase", Builtin::AsciiUpcase),
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        NAMES.iter().find(|(n, _)| *n == name).map(|(_, b)| *b)
    }

    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, b)| *b == self)
            .map_or("", |(n, _)| n)
    }
}

pub(super) fn eval_builtin(
    builtin: Builtin,
    input: &Value,
    output: &mut dyn FnMut(Value) -> Result<(), EvalError>,
) -> Result<(), EvalError> {
    let result = match builtin {
        Builtin::Empty => return Ok(()),
        Builtin::Length => match input {
            Value::String(s) => Value::Number(s.chars().count() as f64),
            Value::Array(a) => Value::Number(a.len() as f64),
            Value::Object(o) => Value::Number(o.len() as f64),
            Value::Null => Value::Number(0.0),
            Value::Number(f) => Value::Number(f.abs()),
            Value::Bool(_) => return Err(EvalError::mismatch("string, array or object", input)),
        },
        Builtin::Keys | Builtin::KeysUnsorted => match input {
            Value::Object(pairs) => {
                let mut keys: Vec<&String> = pairs.iter().map(|(k, _)| k).collect();
                if builtin == Builtin::Keys {
                    keys.sort();
                }
                Value::Array(keys.into_iter().map(|k| Value::String(k.clone())).collect())
            }
            Value::Array(a) => Value::Array((0..a.len()).map(|i| Value::Number(i as f64)).collect()),
            _ => return Err(EvalError::mismatch("object", input)),
        },
        Builtin::Type => Value::String(input.type_name().to_string()),
        Builtin::Not => Value::Bool(!input.is_truthy()),
        Builtin::Add => match input {
            Value::Array(items) => add_all(items.iter())?,
            Value::Object(pairs) => add_all(pairs.iter().map(|(_, v)| v))?,
            Value::Null => Value::Null,
            _ => return Err(EvalError::mismatch("array", input)),
        },
        Builtin::ToString => match input {
            Value::String(_) => input.clone(),
            other => Value::String(crate::output::format_compact(other)),
        },
        Builtin::ToNumber => match input {
            Value::Number(_) => input.clone(),
            Value::String(s) => Value::Number(
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| EvalError::InvalidNumber(s.clone()))?,
            ),
            _ => return Err(EvalError::mismatch("string or number", input)),
        },
        Builtin::Reverse => match input {
            Value::Array(a) => Value::Array(a.iter().rev().cloned().collect()),
            Value::String(s) => Value::String(s.chars().rev().collect()),
            Value::Null => Value::Array(vec![]),
            _ => return Err(EvalError::mismatch("array", input)),
        },
        Builtin::Sort | Builtin::Unique => {
            let Value::Array(a) = input else {
                return Err(EvalError::mismatch("array", input));
            };
            let mut sorted = a.clone();
            sorted.sort_by(values_order);
            if builtin == Builtin::Unique {
                sorted.dedup_by(|a, b| values_equal(a, b));
            }
            Value::Array(sorted)
        }
        Builtin::Min | Builtin::Max => {
            let Value::Array(a) = input else {
                return Err(EvalError::mismatch("array", input));
            };
            let picked = if builtin == Builtin::Min {
                a.iter().min_by(|x, y| values_order(x, y))
            } else {
                a.iter().max_by(|x, y| values_order(x, y))
            };
            picked.cloned().unwrap_or(Value::Null)
        }
        Builtin::Flatten => {
            let Value::Array(a) = input else {
                return Err(EvalError::mismatch("array", input));
            };
            let mut flat = Vec::with_capacity(a.len());
            flatten_into(a, &mut flat);
            Value::Array(flat)
        }
        Builtin::Floor | Builtin::Ceil | Builtin::Round | Builtin::Sqrt | Builtin::Fabs => {
            let Value::Number(f) = input else {
                return Err(EvalError::mismatch("number", input));
            };
            Value::Number(match builtin {
                Builtin::Floor => f.floor(),
                Builtin::Ceil => f.ceil(),
                Builtin::Round => f.round(),
                Builtin::Sqrt => f.sqrt(),
                _ => f.abs(),
            })
        }
        Builtin::AsciiDowncase | Builtin::AsciiUpcase => {
            let Value::String(s) = input else {
                return Err(EvalError::mismatch("string", input));
            };
            Value::String(if builtin == Builtin::AsciiDowncase {
                s.to_ascii_lowercase()
            } else {
                s.to_ascii_uppercase()
            })
        }
    };
    output(result)
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) => flatten_into(inner, out),
            other => out.push(other.clone()),
        }
    }
}

/// `null + x` is `x`; numbers add, strings and arrays concatenate, objects
/// merge with the right side winning.
fn add_values(left: Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Null, r) => Ok(r.clone()),
        (l, Value::Null) => Ok(l),
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(mut a), Value::String(b)) => {
            a.push_str(b);
            Ok(Value::String(a))
        }
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b.iter().cloned());
            Ok(Value::Array(a))
        }
        (Value::Object(mut a), Value::Object(b)) => {
            for (k, v) in b {
                match a.iter_mut().find(|(ak, _)| ak == k) {
                    Some(slot) => slot.1 = v.clone(),
                    None => a.push((k.clone(), v.clone())),
                }
            }
            Ok(Value::Object(a))
        }
        (l, r) => Err(EvalError::TypeMismatch {
            expected: l.type_name(),
            actual: r.type_name(),
        }),
    }
}

fn add_all<'v>(items: impl Iterator<Item = &'v Value>) -> Result<Value, EvalError> {
    items.fold(Ok(Value::Null), |acc, v| add_values(acc?, v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(b: Builtin, input: &str) -> Result<Vec<Value>, EvalError> {
        let input = Value::from_json(input).unwrap();
        let mut out = Vec::new();
        eval_builtin(b, &input, &mut |v| {
            out.push(v);
            Ok(())
        })?;
        Ok(out)
    }

    fn one(b: Builtin, input: &str) -> String {
        let out = run(b, input).unwrap();
        assert_eq!(out.len(), 1);
        out[0].to_string()
    }

    #[test]
    fn names_round_trip() {
        for (name, b) in NAMES {
            assert_eq!(Builtin::from_name(name), Some(*b));
            assert_eq!(b.name(), *name);
        }
        assert_eq!(Builtin::from_name("map"), None);
    }

    #[test]
    fn length_of_each_type() {
        assert_eq!(one(Builtin::Length, r#""héllo""#), "5");
        assert_eq!(one(Builtin::Length, "[1,2,3]"), "3");
        assert_eq!(one(Builtin::Length, r#"{"a":1}"#), "1");
        assert_eq!(one(Builtin::Length, "null"), "0");
        assert_eq!(one(Builtin::Length, "-4.5"), "4.5");
        assert!(matches!(
            run(Builtin::Length, "true"),
            Err(EvalError::TypeMismatch { actual: "boolean", .. })
        ));
    }

    #[test]
    fn keys_sorted_and_unsorted() {
        assert_eq!(one(Builtin::Keys, r#"{"b":1,"a":2}"#), r#"["a","b"]"#);
        assert_eq!(one(Builtin::KeysUnsorted, r#"{"b":1,"a":2}"#), r#"["b","a"]"#);
        assert_eq!(one(Builtin::Keys, "[5,6]"), "[0,1]");
    }

    #[test]
    fn add_folds_by_type() {
        assert_eq!(one(Builtin::Add, "[1,2,3]"), "6");
        assert_eq!(one(Builtin::Add, r#"["a","b"]"#), r#""ab""#);
        assert_eq!(one(Builtin::Add, "[[1],[2,3]]"), "[1,2,3]");
        assert_eq!(one(Builtin::Add, r#"[{"a":1},{"a":2,"b":3}]"#), r#"{"a":2,"b":3}"#);
        assert_eq!(one(Builtin::Add, "[]"), "null");
        assert_eq!(one(Builtin::Add, "[null,1]"), "1");
        assert!(run(Builtin::Add, r#"[1,"a"]"#).is_err());
    }

    #[test]
    fn conversions() {
        assert_eq!(one(Builtin::ToString, "[1,2]"), r#""[1,2]""#);
        assert_eq!(one(Builtin::ToString, r#""x""#), r#""x""#);
        assert_eq!(one(Builtin::ToNumber, r#""42""#), "42");
        assert_eq!(one(Builtin::ToNumber, r#""2.5""#), "2.5");
        assert_eq!(
            run(Builtin::ToNumber, r#""abc""#),
            Err(EvalError::InvalidNumber("abc".into()))
        );
    }

    #[test]
    fn ordering_builtins() {
        assert_eq!(one(Builtin::Sort, r#"[3,"a",null,1,true]"#), r#"[null,true,1,3,"a"]"#);
        assert_eq!(one(Builtin::Unique, "[2,1,2,1]"), "[1,2]");
        assert_eq!(one(Builtin::Min, "[3,1,2]"), "1");
        assert_eq!(one(Builtin::Max, "[3,1,2]"), "3");
        assert_eq!(one(Builtin::Min, "[]"), "null");
        assert_eq!(one(Builtin::Reverse, "[1,2,3]"), "[3,2,1]");
        assert_eq!(one(Builtin::Flatten, "[1,[2,[3]]]"), "[1,2,3]");
    }

    #[test]
    fn math_and_strings() {
        assert_eq!(one(Builtin::Floor, "3.7"), "3");
        assert_eq!(one(Builtin::Ceil, "3.2"), "4");
        assert_eq!(one(Builtin::Round, "2.5"), "3");
        assert_eq!(one(Builtin::Sqrt, "16"), "4");
        assert_eq!(one(Builtin::Fabs, "-2"), "2");
        assert_eq!(one(Builtin::AsciiUpcase, r#""John""#), r#""JOHN""#);
        assert_eq!(one(Builtin::AsciiDowncase, r#""John""#), r#""john""#);
        assert!(run(Builtin::Floor, r#""x""#).is_err());
    }

    #[test]
    fn empty_and_not() {
        assert_eq!(run(Builtin::Empty, "1").unwrap(), vec![]);
        assert_eq!(one(Builtin::Not, "null"), "true");
        assert_eq!(one(Builtin::Not, "0"), "false");
        assert_eq!(one(Builtin::Type, "{}"), r#""object""#);
    }
}
