/// JSON output formatting.
///
/// Writes `Value` directly to a `Write` sink, no intermediate `String`
/// allocation. Uses `itoa` for integral numbers and `ryu` for the rest.
use std::io::{self, Write};

use crate::value::Value;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Pretty-printed with indentation (default).
    Pretty,
    /// Compact single-line output (`-c`).
    Compact,
    /// Raw string output (`-r`): strings without quotes.
    Raw,
}

/// Configuration for output formatting.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub mode: OutputMode,
    /// Indentation string (default "  ", or "\t" with --tab).
    pub indent: String,
    /// Sort object keys alphabetically (`-S`).
    pub sort_keys: bool,
    /// Suppress trailing newline after each value (`-j`).
    pub join_output: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Pretty,
            indent: "  ".to_string(),
            sort_keys: false,
            join_output: false,
        }
    }
}

/// Format a value as compact JSON (for error messages, `tostring`, `Display`).
pub fn format_compact(value: &Value) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_value_inner(&mut buf, value, &CompactFmt, 0, false);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Write a value to the output sink, followed by a newline (unless join_output).
pub fn write_value<W: Write>(w: &mut W, value: &Value, config: &OutputConfig) -> io::Result<()> {
    match config.mode {
        OutputMode::Pretty => {
            let fmt = PrettyFmt {
                indent: &config.indent,
            };
            write_value_inner(w, value, &fmt, 0, config.sort_keys)?;
        }
        OutputMode::Compact => write_value_inner(w, value, &CompactFmt, 0, config.sort_keys)?,
        // Raw mode: strings are output without quotes, everything else is compact
        OutputMode::Raw => match value {
            Value::String(s) => w.write_all(s.as_bytes())?,
            _ => write_value_inner(w, value, &CompactFmt, 0, config.sort_keys)?,
        },
    }
    if !config.join_output {
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Trait abstracting the whitespace differences between compact and
/// pretty-printed JSON output. Structural characters are written by
/// `write_value_inner`; the formatter only adds newlines and indentation.
trait JsonFormatter {
    /// Whitespace after `[` / `{`. Pretty: `\n`, Compact: nothing.
    fn after_open<W: Write>(&self, w: &mut W) -> io::Result<()>;
    /// Indent before the first element.
    fn before_first<W: Write>(&self, w: &mut W, depth: usize) -> io::Result<()>;
    /// Whitespace after `,` between elements.
    fn after_sep<W: Write>(&self, w: &mut W, depth: usize) -> io::Result<()>;
    /// Whitespace before `]` / `}`.
    fn before_close<W: Write>(&self, w: &mut W, depth: usize) -> io::Result<()>;
    /// Whitespace after `:`. Pretty: ` `, Compact: nothing.
    fn after_colon<W: Write>(&self, w: &mut W) -> io::Result<()>;
}

struct CompactFmt;

impl JsonFormatter for CompactFmt {
    #[inline]
    fn after_open<W: Write>(&self, _w: &mut W) -> io::Result<()> {
        Ok(())
    }
    #[inline]
    fn before_first<W: Write>(&self, _w: &mut W, _depth: usize) -> io::Result<()> {
        Ok(())
    }
    #[inline]
    fn after_sep<W: Write>(&self, _w: &mut W, _depth: usize) -> io::Result<()> {
        Ok(())
    }
    #[inline]
    fn before_close<W: Write>(&self, _w: &mut W, _depth: usize) -> io::Result<()> {
        Ok(())
    }
    #[inline]
    fn after_colon<W: Write>(&self, _w: &mut W) -> io::Result<()> {
        Ok(())
    }
}

struct PrettyFmt<'a> {
    indent: &'a str,
}

impl JsonFormatter for PrettyFmt<'_> {
    fn after_open<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"\n")
    }
    fn before_first<W: Write>(&self, w: &mut W, depth: usize) -> io::Result<()> {
        write_indent(w, depth + 1, self.indent)
    }
    fn after_sep<W: Write>(&self, w: &mut W, depth: usize) -> io::Result<()> {
        w.write_all(b"\n")?;
        write_indent(w, depth + 1, self.indent)
    }
    fn before_close<W: Write>(&self, w: &mut W, depth: usize) -> io::Result<()> {
        w.write_all(b"\n")?;
        write_indent(w, depth, self.indent)
    }
    fn after_colon<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b" ")
    }
}

fn write_value_inner<W: Write, F: JsonFormatter>(
    w: &mut W,
    value: &Value,
    fmt: &F,
    depth: usize,
    sort_keys: bool,
) -> io::Result<()> {
    match value {
        Value::Null => w.write_all(b"null"),
        Value::Bool(b) => w.write_all(if *b { b"true" } else { b"false" }),
        Value::Number(f) => write_number(w, *f),
        Value::String(s) => write_json_string(w, s),
        Value::Array(arr) if arr.is_empty() => w.write_all(b"[]"),
        Value::Array(arr) => {
            w.write_all(b"[")?;
            fmt.after_open(w)?;
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    w.write_all(b",")?;
                    fmt.after_sep(w, depth)?;
                } else {
                    fmt.before_first(w, depth)?;
                }
                write_value_inner(w, v, fmt, depth + 1, sort_keys)?;
            }
            fmt.before_close(w, depth)?;
            w.write_all(b"]")
        }
        Value::Object(obj) if obj.is_empty() => w.write_all(b"{}"),
        Value::Object(obj) => {
            w.write_all(b"{")?;
            fmt.after_open(w)?;
            let mut pairs: Vec<&(String, Value)> = obj.iter().collect();
            if sort_keys {
                pairs.sort_by(|a, b| a.0.cmp(&b.0));
            }
            for (i, (k, v)) in pairs.into_iter().enumerate() {
                if i > 0 {
                    w.write_all(b",")?;
                    fmt.after_sep(w, depth)?;
                } else {
                    fmt.before_first(w, depth)?;
                }
                write_json_string(w, k)?;
                w.write_all(b":")?;
                fmt.after_colon(w)?;
                write_value_inner(w, v, fmt, depth + 1, sort_keys)?;
            }
            fmt.before_close(w, depth)?;
            w.write_all(b"}")
        }
    }
}

fn write_indent<W: Write>(w: &mut W, depth: usize, indent: &str) -> io::Result<()> {
    for _ in 0..depth {
        w.write_all(indent.as_bytes())?;
    }
    Ok(())
}

/// Write a JSON-escaped string (with surrounding quotes).
pub fn write_json_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_all(b"\"")?;
    let bytes = s.as_bytes();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let escape: &[u8] = match b {
            b'"' => b"\\\"",
            b'\\' => b"\\\\",
            b'\n' => b"\\n",
            b'\r' => b"\\r",
            b'\t' => b"\\t",
            b'\x08' => b"\\b",
            b'\x0c' => b"\\f",
            0..=0x1f => b"",
            _ => continue,
        };
        if start < i {
            w.write_all(&bytes[start..i])?;
        }
        if escape.is_empty() {
            write!(w, "\\u{:04x}", b)?;
        } else {
            w.write_all(escape)?;
        }
        start = i + 1;
    }
    if start < bytes.len() {
        w.write_all(&bytes[start..])?;
    }
    w.write_all(b"\"")
}

/// Write a number in jq-compatible format.
///
/// Integral values below 1e16 print as plain integers. Everything else goes
/// through ryu's shortest representation, reshaped to jq's conventions:
/// no `.0` suffix, large integers expanded while the trailing zeros stay at
/// or under 15, and an explicit `+` on positive exponents. NaN prints as
/// `null`; infinities clamp to the largest finite double.
fn write_number<W: Write>(w: &mut W, f: f64) -> io::Result<()> {
    if f.is_nan() {
        return w.write_all(b"null");
    }
    let f = if f.is_infinite() { f64::MAX.copysign(f) } else { f };
    // Normalize negative zero to positive zero
    let f = if f == 0.0 { 0.0 } else { f };
    if f.fract() == 0.0 && f.abs() < 1e16 {
        let mut buf = itoa::Buffer::new();
        return w.write_all(buf.format(f as i64).as_bytes());
    }
    let mut buf = ryu::Buffer::new();
    let s = buf.format_finite(f);
    if f.fract() == 0.0 {
        if let Some(e_pos) = s.find('e') {
            let exp: i32 = s[e_pos + 1..].parse().unwrap_or(0);
            if exp > 0 {
                let mantissa = &s[..e_pos];
                let frac_len = mantissa.find('.').map_or(0, |d| mantissa.len() - d - 1);
                let zeros_needed = (exp as usize).saturating_sub(frac_len);
                if zeros_needed <= 15 {
                    let (int_part, frac_part) = match mantissa.find('.') {
                        Some(d) => (&mantissa[..d], &mantissa[d + 1..]),
                        None => (mantissa, ""),
                    };
                    w.write_all(int_part.as_bytes())?;
                    w.write_all(frac_part.as_bytes())?;
                    for _ in 0..zeros_needed {
                        w.write_all(b"0")?;
                    }
                    return Ok(());
                }
            }
        }
        if let Some(stripped) = s.strip_suffix(".0") {
            return w.write_all(stripped.as_bytes());
        }
    }
    // ryu: "1.5e10" → jq: "1.5e+10"
    if let Some(e_pos) = s.find('e') {
        w.write_all(&s.as_bytes()[..e_pos])?;
        w.write_all(b"e")?;
        let exp_str = &s[e_pos + 1..];
        if !exp_str.starts_with('-') {
            w.write_all(b"+")?;
        }
        return w.write_all(exp_str.as_bytes());
    }
    w.write_all(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(v: &Value, mode: OutputMode) -> String {
        let config = OutputConfig {
            mode,
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_value(&mut buf, v, &config).unwrap();
        // Trim trailing newline
        String::from_utf8(buf).unwrap().trim_end().to_string()
    }

    fn compact(v: &Value) -> String {
        render(v, OutputMode::Compact)
    }

    fn pretty(v: &Value) -> String {
        render(v, OutputMode::Pretty)
    }

    fn n(f: f64) -> Value {
        Value::Number(f)
    }

    #[test]
    fn compact_scalars() {
        assert_eq!(compact(&Value::Null), "null");
        assert_eq!(compact(&Value::Bool(true)), "true");
        assert_eq!(compact(&Value::Bool(false)), "false");
        assert_eq!(compact(&Value::String("hello".into())), r#""hello""#);
    }

    #[test]
    fn integral_numbers() {
        assert_eq!(compact(&n(42.0)), "42");
        assert_eq!(compact(&n(-1.0)), "-1");
        assert_eq!(compact(&n(-0.0)), "0");
        assert_eq!(compact(&n(9007199254740992.0)), "9007199254740992");
    }

    #[test]
    fn fractional_numbers() {
        assert_eq!(compact(&n(3.14)), "3.14");
        assert_eq!(compact(&n(0.1)), "0.1");
        assert_eq!(compact(&n(1.5e-7)), "1.5e-7");
        assert_eq!(compact(&n(1.5e300)), "1.5e+300");
    }

    #[test]
    fn large_integers_follow_jq() {
        assert_eq!(compact(&n(5.564623688220226e21)), "5564623688220226000000");
        assert_eq!(compact(&n(1e20)), "1e+20");
        assert_eq!(compact(&n(-1e19)), "-1e+19");
        assert_eq!(compact(&n(1e15)), "1000000000000000");
        assert_eq!(compact(&n(1e16)), "1e+16");
        assert_eq!(compact(&n(9223372036854775808.0)), "9223372036854776000");
    }

    #[test]
    fn non_finite_numbers() {
        assert_eq!(compact(&n(f64::NAN)), "null");
        assert_eq!(compact(&n(f64::INFINITY)), "1.7976931348623157e+308");
        assert_eq!(compact(&n(f64::NEG_INFINITY)), "-1.7976931348623157e+308");
    }

    #[test]
    fn string_escaping() {
        assert_eq!(
            compact(&Value::String("a\"b\\c\nd".into())),
            r#""a\"b\\c\nd""#
        );
        assert_eq!(
            compact(&Value::String("\x00\x1f".into())),
            r#""\u0000\u001f""#
        );
        assert_eq!(compact(&Value::String("héllo".into())), "\"héllo\"");
    }

    #[test]
    fn compact_containers() {
        assert_eq!(compact(&Value::Array(vec![n(1.0), n(2.0), n(3.0)])), "[1,2,3]");
        assert_eq!(compact(&Value::Array(vec![])), "[]");
        assert_eq!(compact(&Value::Object(vec![])), "{}");
        let v = Value::Object(vec![("a".into(), n(1.0)), ("b".into(), Value::Bool(true))]);
        assert_eq!(compact(&v), r#"{"a":1,"b":true}"#);
    }

    #[test]
    fn pretty_nested() {
        let v = Value::Object(vec![
            ("a".into(), n(1.0)),
            ("arr".into(), Value::Array(vec![n(1.0), n(2.0)])),
            ("e".into(), Value::Array(vec![])),
        ]);
        assert_eq!(
            pretty(&v),
            "{\n  \"a\": 1,\n  \"arr\": [\n    1,\n    2\n  ],\n  \"e\": []\n}"
        );
    }

    #[test]
    fn pretty_with_tab_indent() {
        let config = OutputConfig {
            indent: "\t".to_string(),
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_value(&mut buf, &Value::Array(vec![n(1.0)]), &config).unwrap();
        assert_eq!(buf, b"[\n\t1\n]\n");
    }

    #[test]
    fn raw_strings_unquoted() {
        assert_eq!(render(&Value::String("hello world".into()), OutputMode::Raw), "hello world");
        assert_eq!(render(&n(42.0), OutputMode::Raw), "42");
        assert_eq!(
            render(&Value::Array(vec![Value::String("x".into())]), OutputMode::Raw),
            r#"["x"]"#
        );
    }

    #[test]
    fn sort_keys_nested() {
        let v = Value::Object(vec![
            (
                "z".into(),
                Value::Object(vec![("b".into(), n(2.0)), ("a".into(), n(1.0))]),
            ),
            ("a".into(), n(0.0)),
        ]);
        let config = OutputConfig {
            mode: OutputMode::Compact,
            sort_keys: true,
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_value(&mut buf, &v, &config).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap().trim(),
            r#"{"a":0,"z":{"a":1,"b":2}}"#
        );
        // Insertion order is kept without -S
        assert_eq!(format_compact(&v), r#"{"z":{"b":2,"a":1},"a":0}"#);
    }

    #[test]
    fn join_output_no_newline() {
        let config = OutputConfig {
            mode: OutputMode::Raw,
            join_output: true,
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_value(&mut buf, &Value::String("hello".into()), &config).unwrap();
        assert_eq!(buf, b"hello");
    }
}
