mod builtins;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
mod value_ops;

pub use builtins::Builtin;
pub use error::{EvalError, ParseError};

use crate::value::Value;
use std::fmt;

/// A jq filter AST node.
///
/// The tree is immutable once parsed and owns all of its data, so a parsed
/// filter is `Send + Sync` and can be evaluated from several threads at once.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Identity: `.`
    Identity,
    /// Field access: `.foo`, or `.foo?` when the flag is set
    Field(String, bool),
    /// Index: `base[index]`; the index is evaluated against the same input as the base
    Index(Box<Filter>, Box<Filter>),
    /// Slice: `base[start:end]`, either bound optional
    Slice(Box<Filter>, Option<Box<Filter>>, Option<Box<Filter>>),
    /// Iteration: `base[]`
    IterateAll(Box<Filter>),
    /// Pipe: `a | b`
    Pipe(Box<Filter>, Box<Filter>),
    /// Comma (multiple outputs): `a, b`
    Comma(Box<Filter>, Box<Filter>),
    /// Object construction: `{a: .x, b}`
    ObjectConstruct(Vec<(ObjKey, Box<Filter>)>),
    /// Array construction: `[expr]`
    ArrayConstruct(Box<Filter>),
    /// Literal value
    Literal(Value),
    /// Error suppression: `expr?`
    Optional(Box<Filter>),
    /// Alternative: `a // b`
    Alternative(Box<Filter>, Box<Filter>),
    /// Zero-argument builtin: `length`, `keys`, ...
    Builtin(Builtin),
}

/// Object construction key: either a literal string or computed.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjKey {
    Name(String),
    Expr(Box<Filter>),
}

/// Parse a jq filter expression string into a `Filter` AST.
pub fn parse(input: &str) -> Result<Filter, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::EmptyFilter);
    }
    let tokens = lexer::lex(input)?;
    lexer::check_balance(&tokens)?;
    let filter = parser::parse(&tokens, input)?;
    log::debug!("parsed filter {input:?} ({} tokens): {filter}", tokens.len());
    Ok(filter)
}

/// Evaluate a filter against one input, collecting every output.
///
/// Evaluation is all-or-nothing: if any branch raises an error that no
/// `?` or `//` absorbs, no outputs are returned.
pub fn evaluate(filter: &Filter, input: &Value) -> Result<Vec<Value>, EvalError> {
    let mut out = Vec::new();
    eval::eval_filter(filter, input, &mut |v| {
        out.push(v);
        Ok(())
    })?;
    log::trace!("{filter} produced {} output(s)", out.len());
    Ok(out)
}

impl fmt::Display for ObjKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjKey::Name(name) if is_ident(name) => f.write_str(name),
            ObjKey::Name(name) => f.write_str(&crate::output::format_compact(&Value::String(
                name.clone(),
            ))),
            ObjKey::Expr(e) => write!(f, "({e})"),
        }
    }
}

/// Renders the filter back to canonical jq text. Parsing the rendered
/// text yields an identical tree.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Identity => f.write_str("."),
            Filter::Field(name, optional) => {
                if is_ident(name) || matches!(name.as_str(), "true" | "false" | "null") {
                    write!(f, ".{name}")?;
                } else {
                    write!(f, ".{}", Value::String(name.clone()))?;
                }
                if *optional {
                    f.write_str("?")?;
                }
                Ok(())
            }
            Filter::Index(base, idx) => {
                write_base(f, base)?;
                f.write_str("[")?;
                write_bracketed(f, idx, false)?;
                f.write_str("]")
            }
            Filter::Slice(base, start, end) => {
                write_base(f, base)?;
                f.write_str("[")?;
                if let Some(s) = start {
                    write_bracketed(f, s, true)?;
                }
                f.write_str(":")?;
                if let Some(e) = end {
                    write!(f, "{e}")?;
                }
                f.write_str("]")
            }
            Filter::IterateAll(base) => {
                write_base(f, base)?;
                f.write_str("[]")
            }
            Filter::Pipe(a, b) => write!(f, "({a} | {b})"),
            Filter::Comma(a, b) => write!(f, "({a}, {b})"),
            Filter::ObjectConstruct(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Filter::ArrayConstruct(body) => write!(f, "[{body}]"),
            Filter::Literal(v) => write!(f, "{v}"),
            Filter::Optional(inner) => write!(f, "({inner})?"),
            Filter::Alternative(a, b) => write!(f, "({a} // {b})"),
            Filter::Builtin(b) => f.write_str(b.name()),
        }
    }
}

/// Postfix bases print without a leading `.` for identity (`.[0]`, not `.[0]` twice).
fn write_base(f: &mut fmt::Formatter<'_>, base: &Filter) -> fmt::Result {
    match base {
        Filter::Identity => f.write_str("."),
        Filter::Field(..) | Filter::Index(..) | Filter::Slice(..) | Filter::IterateAll(..) => {
            write!(f, "{base}")
        }
        _ => write!(f, "({base})"),
    }
}

/// Expressions inside `[...]` that would read as a rejected literal index
/// (`.[-1]`, `.[1.5]`, `.[null]`, `.[[0]]`) are wrapped in parens.
fn write_bracketed(f: &mut fmt::Formatter<'_>, expr: &Filter, slice_start: bool) -> fmt::Result {
    let needs_parens = match expr {
        Filter::Literal(Value::Number(n)) => {
            !slice_start && !(*n >= 0.0 && n.fract() == 0.0 && *n < 1e16)
        }
        Filter::Literal(_) | Filter::ArrayConstruct(_) => true,
        _ => false,
    };
    if needs_parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !matches!(s, "true" | "false" | "null")
}
