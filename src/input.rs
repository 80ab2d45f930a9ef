//! Input preprocessing: BOM stripping, JSON/NDJSON parsing into Values.

use anyhow::{Context, Result};

use crate::value::Value;

/// Strip UTF-8 BOM (U+FEFF, bytes EF BB BF) from the beginning of a buffer.
pub fn strip_bom(buf: &mut Vec<u8>) {
    if buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
        buf.drain(..3);
    }
}

/// Parse a whitespace-separated stream of JSON documents.
///
/// Accepts a single document, NDJSON, or concatenated values such as
/// `{"a":1}{"b":2}`. A leading BOM is ignored.
pub fn parse_stream(text: &str) -> Result<Vec<Value>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut values = Vec::new();
    let stream = serde_json::Deserializer::from_str(text).into_iter::<serde_json::Value>();
    for (i, result) in stream.enumerate() {
        let parsed = result.with_context(|| format!("failed to parse JSON value #{}", i + 1))?;
        values.push(Value::from(parsed));
    }
    Ok(values)
}

/// Collect parsed JSON values from a raw buffer (single doc, NDJSON, or
/// concatenated documents).
pub fn collect_values_from_buf(buf: &[u8], force_jsonl: bool, values: &mut Vec<Value>) -> Result<()> {
    // Empty/whitespace-only input produces no values.
    if buf
        .iter()
        .all(|&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
    {
        return Ok(());
    }
    if force_jsonl || crate::parallel::ndjson::is_ndjson(buf) {
        return parse_lines(buf, values);
    }
    let text = std::str::from_utf8(buf).context("input is not valid UTF-8")?;
    values.extend(parse_stream(text)?);
    Ok(())
}

/// Parse newline-delimited JSON lines into values. Blank lines are skipped.
pub fn parse_lines(buf: &[u8], values: &mut Vec<Value>) -> Result<()> {
    for (lineno, line) in buf.split(|&b| b == b'\n').enumerate() {
        let trimmed_end = line
            .iter()
            .rposition(|&b| !matches!(b, b' ' | b'\t' | b'\r'))
            .map_or(0, |p| p + 1);
        let trimmed = &line[..trimmed_end];
        if trimmed.is_empty() {
            continue;
        }
        let parsed: serde_json::Value = serde_json::from_slice(trimmed)
            .with_context(|| format!("failed to parse NDJSON line {}", lineno + 1))?;
        values.push(Value::from(parsed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(f: f64) -> Value {
        Value::Number(f)
    }

    #[test]
    fn strip_bom_present() {
        let mut buf = vec![0xEF, 0xBB, 0xBF, b'"', b'h', b'i', b'"'];
        strip_bom(&mut buf);
        assert_eq!(buf, b"\"hi\"");
    }

    #[test]
    fn strip_bom_absent() {
        let mut buf = b"\"hi\"".to_vec();
        strip_bom(&mut buf);
        assert_eq!(buf, b"\"hi\"");
    }

    #[test]
    fn strip_bom_only_bom() {
        let mut buf = vec![0xEF, 0xBB, 0xBF];
        strip_bom(&mut buf);
        assert!(buf.is_empty());
    }

    #[test]
    fn stream_of_documents() {
        assert_eq!(parse_stream("1 2\n3").unwrap(), vec![n(1.0), n(2.0), n(3.0)]);
        assert_eq!(
            parse_stream(r#"{"a":1}{"b":2}"#).unwrap().len(),
            2
        );
        assert!(parse_stream("").unwrap().is_empty());
        assert_eq!(parse_stream("\u{feff}[1]").unwrap(), vec![Value::Array(vec![n(1.0)])]);
    }

    #[test]
    fn stream_reports_bad_document() {
        let err = parse_stream("1 {").unwrap_err();
        assert!(err.to_string().contains("#2"), "{err}");
    }

    #[test]
    fn parse_lines_skips_blanks() {
        let mut vals = Vec::new();
        parse_lines(b"1\n\n2\n  \n3\r\n", &mut vals).unwrap();
        assert_eq!(vals, vec![n(1.0), n(2.0), n(3.0)]);
    }

    #[test]
    fn parse_lines_reports_line_number() {
        let mut vals = Vec::new();
        let err = parse_lines(b"{\"a\":1}\n{bad}\n", &mut vals).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn collect_detects_ndjson() {
        let mut vals = Vec::new();
        collect_values_from_buf(b"{\"a\":1}\n{\"a\":2}\n", false, &mut vals).unwrap();
        assert_eq!(vals.len(), 2);

        let mut vals = Vec::new();
        collect_values_from_buf(b"{\n  \"a\": 1\n}\n", false, &mut vals).unwrap();
        assert_eq!(vals, vec![Value::Object(vec![("a".into(), n(1.0))])]);

        let mut vals = Vec::new();
        collect_values_from_buf(b"  \n", false, &mut vals).unwrap();
        assert!(vals.is_empty());
    }
}
