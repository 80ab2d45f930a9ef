/// jq filter language tokenizer.
use super::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Dot,      // .
    Pipe,     // |
    LBrack,   // [
    RBrack,   // ]
    LBrace,   // {
    RBrace,   // }
    LParen,   // (
    RParen,   // )
    Comma,    // ,
    Colon,    // :
    Question, // ?
    // Literals and identifiers
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    // Keywords
    True,
    False,
    Null,
    DoubleSlash, // // (alternative operator)
}

impl Token {
    /// Short human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Dot => "'.'".into(),
            Token::Pipe => "'|'".into(),
            Token::LBrack => "'['".into(),
            Token::RBrack => "']'".into(),
            Token::LBrace => "'{'".into(),
            Token::RBrace => "'}'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Comma => "','".into(),
            Token::Colon => "':'".into(),
            Token::Question => "'?'".into(),
            Token::DoubleSlash => "'//'".into(),
            Token::Ident(s) => format!("identifier '{s}'"),
            Token::Str(s) => format!("string {s:?}"),
            Token::Int(n) => format!("number {n}"),
            Token::Float(f) => format!("number {f}"),
            Token::True => "'true'".into(),
            Token::False => "'false'".into(),
            Token::Null => "'null'".into(),
        }
    }
}

/// A token plus the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub tok: Token,
    pub pos: usize,
}

pub fn lex(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens: Vec<Spanned> = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let single = match bytes[i] {
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBrack),
            b']' => Some(Token::RBrack),
            b'{' => Some(Token::LBrace),
            b'}' => Some(Token::RBrace),
            b'|' => Some(Token::Pipe),
            b',' => Some(Token::Comma),
            b':' => Some(Token::Colon),
            b'?' => Some(Token::Question),
            _ => None,
        };
        if let Some(tok) = single {
            tokens.push(Spanned { tok, pos: start });
            i += 1;
            continue;
        }

        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                tokens.push(Spanned {
                    tok: Token::DoubleSlash,
                    pos: start,
                });
                i += 2;
                continue;
            }
            // No arithmetic in this language: '-' only starts a negative number.
            b'-' if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                let (tok, consumed) = lex_number(input, i)?;
                tokens.push(Spanned { tok, pos: start });
                i += consumed;
                continue;
            }
            b'.' => {
                if bytes.get(i + 1) == Some(&b'.') {
                    return Err(ParseError::MalformedPath { pos: start });
                }
                // `.5` is a number, not a field
                if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
                    let (tok, consumed) = lex_number(input, i)?;
                    tokens.push(Spanned { tok, pos: start });
                    i += consumed;
                    continue;
                }
                tokens.push(Spanned {
                    tok: Token::Dot,
                    pos: start,
                });
                i += 1;
                continue;
            }
            b'"' => {
                let (s, consumed) = lex_string(input, i)?;
                tokens.push(Spanned {
                    tok: Token::Str(s),
                    pos: start,
                });
                i += consumed;
                continue;
            }
            b'0'..=b'9' => {
                let (tok, consumed) = lex_number(input, i)?;
                tokens.push(Spanned { tok, pos: start });
                i += consumed;
                continue;
            }
            _ => {}
        }

        // Identifier or keyword
        if bytes[i].is_ascii_alphabetic() || bytes[i] == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &input[start..i];
            let tok = match word {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                _ => Token::Ident(word.to_string()),
            };
            tokens.push(Spanned { tok, pos: start });
            continue;
        }

        let ch = input[i..].chars().next().unwrap_or('\u{fffd}');
        return Err(ParseError::UnexpectedChar { ch, pos: i });
    }

    Ok(tokens)
}

/// Verify that `[]`, `{}` and `()` nest properly across the token stream.
pub fn check_balance(tokens: &[Spanned]) -> Result<(), ParseError> {
    let mut open: Vec<(&Token, usize)> = Vec::new();
    for t in tokens {
        match t.tok {
            Token::LBrack | Token::LBrace | Token::LParen => open.push((&t.tok, t.pos)),
            Token::RBrack | Token::RBrace | Token::RParen => {
                let matches = match open.pop() {
                    Some((Token::LBrack, _)) => t.tok == Token::RBrack,
                    Some((Token::LBrace, _)) => t.tok == Token::RBrace,
                    Some((Token::LParen, _)) => t.tok == Token::RParen,
                    _ => false,
                };
                if !matches {
                    return Err(ParseError::UnbalancedBrackets { pos: t.pos });
                }
            }
            _ => {}
        }
    }
    match open.first() {
        Some(&(_, pos)) => Err(ParseError::UnbalancedBrackets { pos }),
        None => Ok(()),
    }
}

fn lex_string(input: &str, start: usize) -> Result<(String, usize), ParseError> {
    let bytes = input.as_bytes();
    debug_assert_eq!(bytes[start], b'"');
    let mut i = start + 1;
    let mut s = String::new();
    let bad = |reason: &str, pos: usize| ParseError::InvalidString {
        reason: reason.to_string(),
        pos,
    };

    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Ok((s, i + 1 - start)),
            b'\\' => {
                i += 1;
                let Some(&esc) = bytes.get(i) else {
                    return Err(bad("unterminated escape", i - 1));
                };
                match esc {
                    b'"' => s.push('"'),
                    b'\\' => s.push('\\'),
                    b'/' => s.push('/'),
                    b'n' => s.push('\n'),
                    b'r' => s.push('\r'),
                    b't' => s.push('\t'),
                    b'b' => s.push('\x08'),
                    b'f' => s.push('\x0c'),
                    b'u' => {
                        let hi = hex4(input, i + 1).ok_or_else(|| bad("bad \\u escape", i - 1))?;
                        i += 4;
                        let cp = if (0xD800..0xDC00).contains(&hi) {
                            // High surrogate: must be followed by \uDC00-\uDFFF
                            let lo = (bytes.get(i + 1) == Some(&b'\\')
                                && bytes.get(i + 2) == Some(&b'u'))
                            .then(|| hex4(input, i + 3))
                            .flatten()
                            .filter(|lo| (0xDC00..0xE000).contains(lo))
                            .ok_or_else(|| bad("unpaired surrogate", i - 5))?;
                            i += 6;
                            0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00)
                        } else {
                            hi
                        };
                        let c = char::from_u32(cp).ok_or_else(|| bad("invalid code point", i))?;
                        s.push(c);
                    }
                    c => return Err(bad(&format!("unknown escape '\\{}'", c as char), i - 1)),
                }
                i += 1;
            }
            _ => {
                // Fast path: copy everything up to the next quote or backslash
                let end = memchr::memchr2(b'"', b'\\', &bytes[i..]).map_or(bytes.len(), |n| i + n);
                s.push_str(&input[i..end]);
                i = end;
            }
        }
    }
    Err(bad("unterminated string", start))
}

fn hex4(input: &str, at: usize) -> Option<u32> {
    let hex = input.get(at..at + 4)?;
    // from_str_radix alone would accept a leading '+'
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn lex_number(input: &str, start: usize) -> Result<(Token, usize), ParseError> {
    let bytes = input.as_bytes();
    let mut i = start;
    let mut is_float = false;

    if bytes[i] == b'-' {
        i += 1;
    }

    // Leading dot (e.g., .5) means it's a float
    if i < bytes.len() && bytes[i] == b'.' {
        is_float = true;
        i += 1;
    }

    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }

    if !is_float
        && bytes.get(i) == Some(&b'.')
        && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
    {
        is_float = true;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    // Exponent, only when digits follow (so `1else` style idents don't eat the 'e')
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        if bytes.get(j).is_some_and(u8::is_ascii_digit) {
            is_float = true;
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let text = &input[start..i];
    let consumed = i - start;
    let invalid = || ParseError::UnexpectedToken {
        found: format!("number '{text}'"),
        pos: start,
    };

    if is_float {
        let f: f64 = text.parse().map_err(|_| invalid())?;
        // Out-of-range literals saturate to the largest finite double
        let f = if f.is_infinite() { f64::MAX.copysign(f) } else { f };
        Ok((Token::Float(f), consumed))
    } else {
        match text.parse::<i64>() {
            Ok(n) => Ok((Token::Int(n), consumed)),
            // Too large for i64: still a valid (imprecise) double
            Err(_) => Ok((Token::Float(text.parse().map_err(|_| invalid())?), consumed)),
        }
    }
}
