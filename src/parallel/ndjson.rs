/// Parallel NDJSON (newline-delimited JSON) processing.
///
/// Splits NDJSON input into ~1MB chunks, processes chunks in parallel via
/// rayon, and concatenates output in order.
use anyhow::{Context, Result};
use memchr::memchr_iter;
use rayon::prelude::*;

use crate::filter::{self, EvalError, Filter};
use crate::output::{self, OutputConfig};
use crate::value::Value;

/// Target size for parallel chunks.
const CHUNK_TARGET_SIZE: usize = 1024 * 1024;

/// Output of one NDJSON run: serialized results plus any per-line
/// evaluation errors, both in input order.
#[derive(Debug, Default)]
pub struct NdjsonOutput {
    pub bytes: Vec<u8>,
    pub had_output: bool,
    /// Whether the last value written was truthy (for `-e`).
    pub last_truthy: bool,
    /// `(line number, error)`, 1-based within the whole input.
    pub errors: Vec<(usize, EvalError)>,
}

impl NdjsonOutput {
    fn append(&mut self, other: NdjsonOutput) {
        self.bytes.extend_from_slice(&other.bytes);
        if other.had_output {
            self.had_output = true;
            self.last_truthy = other.last_truthy;
        }
        self.errors.extend(other.errors);
    }
}

/// Heuristic: the first line is a complete `{...}` or `[...]` document and
/// another line starting with `{` or `[` follows.
pub fn is_ndjson(buf: &[u8]) -> bool {
    let first_nl = match memchr::memchr(b'\n', buf) {
        Some(pos) => pos,
        None => return false,
    };
    let first_line = &buf[..first_nl];

    let first_byte = first_line
        .iter()
        .find(|&&b| !matches!(b, b' ' | b'\t' | b'\r'));
    let last_byte = first_line
        .iter()
        .rfind(|&&b| !matches!(b, b' ' | b'\t' | b'\r'));
    match (first_byte, last_byte) {
        (Some(b'{'), Some(b'}')) | (Some(b'['), Some(b']')) => {}
        _ => return false,
    }

    buf[first_nl + 1..]
        .iter()
        .find(|&&b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .is_some_and(|&b| b == b'{' || b == b'[')
}

/// Split buffer into chunks of approximately `target_size` bytes,
/// always breaking at newline boundaries.
pub fn split_chunks(buf: &[u8], target_size: usize) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < buf.len() {
        let boundary = start.saturating_add(target_size);
        if boundary >= buf.len() {
            chunks.push(&buf[start..]);
            break;
        }
        match memchr::memchr(b'\n', &buf[boundary..]) {
            Some(offset) => {
                let end = boundary + offset + 1;
                chunks.push(&buf[start..end]);
                start = end;
            }
            None => {
                chunks.push(&buf[start..]);
                break;
            }
        }
    }
    chunks
}

/// Evaluate `filter` against every line of an NDJSON buffer.
///
/// Parallelizes across cores for data larger than one chunk. A line that
/// fails to evaluate is recorded in `errors` and processing continues; a
/// line that is not valid JSON aborts the run.
pub fn process_ndjson(
    data: &[u8],
    filter: &Filter,
    config: &OutputConfig,
    first_only: bool,
) -> Result<NdjsonOutput> {
    let chunks = split_chunks(data, CHUNK_TARGET_SIZE);
    if chunks.len() <= 1 {
        return process_chunk(data, 0, filter, config, first_only);
    }
    log::debug!("processing NDJSON in {} chunks", chunks.len());

    // Line offsets so errors report positions in the whole input
    let mut first_lines = Vec::with_capacity(chunks.len());
    let mut lines_before = 0;
    for chunk in &chunks {
        first_lines.push(lines_before);
        lines_before += memchr_iter(b'\n', chunk).count();
    }

    let results: Result<Vec<NdjsonOutput>> = chunks
        .par_iter()
        .zip(first_lines.par_iter())
        .map(|(&chunk, &line_offset)| process_chunk(chunk, line_offset, filter, config, first_only))
        .collect();

    let mut merged = NdjsonOutput::default();
    for part in results? {
        merged.append(part);
    }
    Ok(merged)
}

fn process_chunk(
    chunk: &[u8],
    line_offset: usize,
    filter: &Filter,
    config: &OutputConfig,
    first_only: bool,
) -> Result<NdjsonOutput> {
    let mut out = NdjsonOutput::default();
    let mut start = 0;
    let mut lineno = line_offset;
    for nl_pos in memchr_iter(b'\n', chunk) {
        lineno += 1;
        process_line(&chunk[start..nl_pos], lineno, filter, config, first_only, &mut out)?;
        start = nl_pos + 1;
    }
    // Last line without trailing newline
    if start < chunk.len() {
        process_line(&chunk[start..], lineno + 1, filter, config, first_only, &mut out)?;
    }
    Ok(out)
}

fn process_line(
    line: &[u8],
    lineno: usize,
    filter: &Filter,
    config: &OutputConfig,
    first_only: bool,
    out: &mut NdjsonOutput,
) -> Result<()> {
    let trimmed_end = line
        .iter()
        .rposition(|&b| !matches!(b, b' ' | b'\t' | b'\r'))
        .map_or(0, |p| p + 1);
    let trimmed = &line[..trimmed_end];
    if trimmed.is_empty() {
        return Ok(());
    }
    let parsed: serde_json::Value = serde_json::from_slice(trimmed)
        .with_context(|| format!("failed to parse NDJSON line {lineno}"))?;
    let input = Value::from(parsed);
    match filter::evaluate(filter, &input) {
        Ok(values) => {
            let take = if first_only { 1 } else { values.len() };
            for v in values.iter().take(take) {
                output::write_value(&mut out.bytes, v, config)?;
                out.had_output = true;
                out.last_truthy = v.is_truthy();
            }
        }
        Err(e) => out.errors.push((lineno, e)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputMode;

    fn compact() -> OutputConfig {
        OutputConfig {
            mode: OutputMode::Compact,
            ..Default::default()
        }
    }

    #[test]
    fn detect_ndjson_objects() {
        assert!(is_ndjson(b"{\"a\":1}\n{\"b\":2}\n"));
        assert!(is_ndjson(b"{\"a\":1}\n{\"b\":2}"));
        assert!(is_ndjson(b"[1,2]\n[3,4]\n"));
    }

    #[test]
    fn not_ndjson() {
        assert!(!is_ndjson(b"{\"a\":1}\n"));
        assert!(!is_ndjson(b"{\n  \"a\": 1\n}\n"));
        assert!(!is_ndjson(b"{\"a\":1}"));
        assert!(!is_ndjson(b"1\n2\n"));
        assert!(!is_ndjson(b""));
    }

    #[test]
    fn split_chunks_at_newlines() {
        let data = b"line1\nline2\nline3\n";
        let chunks = split_chunks(data, 6);
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, data.len());
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.last(), Some(&b'\n'));
        }
        assert!(split_chunks(b"", 6).is_empty());
    }

    #[test]
    fn process_keeps_line_order() {
        let filter = filter::parse(".a").unwrap();
        let out = process_ndjson(b"{\"a\":1}\n{\"a\":2}\n\n{\"a\":3}", &filter, &compact(), false).unwrap();
        assert_eq!(out.bytes, b"1\n2\n3\n");
        assert!(out.had_output);
        assert!(out.errors.is_empty());
    }

    #[test]
    fn errors_are_collected_per_line() {
        let filter = filter::parse(".a").unwrap();
        let out = process_ndjson(b"{\"a\":1}\n{\"b\":2}\n{\"a\":3}\n", &filter, &compact(), false).unwrap();
        assert_eq!(out.bytes, b"1\n3\n");
        assert_eq!(out.errors, vec![(2, EvalError::PropertyNotFound("a".into()))]);
    }

    #[test]
    fn invalid_json_line_aborts() {
        let filter = filter::parse(".").unwrap();
        let err = process_ndjson(b"{\"a\":1}\n{oops}\n", &filter, &compact(), false).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn first_only_takes_one_output_per_line() {
        let filter = filter::parse(".[]").unwrap();
        let out = process_ndjson(b"[1,2]\n[3,4]\n", &filter, &compact(), true).unwrap();
        assert_eq!(out.bytes, b"1\n3\n");
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut data = Vec::new();
        for i in 0..60_000 {
            data.extend_from_slice(format!("{{\"id\":{i},\"pad\":\"xxxxxxxxxxxxxxxx\"}}\n").as_bytes());
        }
        assert!(split_chunks(&data, CHUNK_TARGET_SIZE).len() > 1);
        let filter = filter::parse(".id").unwrap();
        let out = process_ndjson(&data, &filter, &compact(), false).unwrap();
        let expected: String = (0..60_000).map(|i| format!("{i}\n")).collect();
        assert_eq!(String::from_utf8(out.bytes).unwrap(), expected);
    }
}
