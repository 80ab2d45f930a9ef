//! Parallel evaluation over independent inputs.
//!
//! A parsed `Filter` owns all of its data, so one tree is shared by
//! reference across the rayon pool without any wrapper.
pub mod ndjson;

use rayon::prelude::*;

use crate::filter::{self, EvalError, Filter};
use crate::value::Value;

/// Evaluate one filter against many inputs in parallel.
///
/// Returns one result per input, in input order; an error on one input does
/// not affect the others.
pub fn evaluate_many(filter: &Filter, inputs: &[Value]) -> Vec<Result<Vec<Value>, EvalError>> {
    inputs
        .par_iter()
        .map(|input| filter::evaluate(filter, input))
        .collect()
}
