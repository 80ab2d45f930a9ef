//! A jq-style JSON filter engine.
//!
//! Filters are parsed once into an immutable [`filter::Filter`] tree and
//! evaluated against [`value::Value`] inputs, producing zero or more outputs.
//!
//! ```
//! let input = hason::value::Value::from_json(r#"{"name":"John","age":30}"#).unwrap();
//! let out = hason::run(".name", &input).unwrap();
//! assert_eq!(out[0].to_string(), r#""John""#);
//! ```
pub mod filter;
pub mod input;
pub mod output;
pub mod parallel;
pub mod value;

use filter::{EvalError, ParseError};
use value::Value;

/// Either half of a parse-then-evaluate run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}

/// Parse `filter_text` and evaluate it against `input`.
pub fn run(filter_text: &str, input: &Value) -> Result<Vec<Value>, Error> {
    let filter = filter::parse(filter_text)?;
    Ok(filter::evaluate(&filter, input)?)
}
