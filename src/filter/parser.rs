/// Recursive descent parser for jq filter expressions.
///
/// Grammar (simplified):
///   expr     = pipe
///   pipe     = comma ("|" comma)*
///   comma    = alt ("," alt)*
///   alt      = postfix ("//" postfix)*
///   postfix  = primary ("." ident | "." str | "[" bracket "]" | "[]" | "?")*
///   bracket  = index | start? ":" end?
///   primary  = "." | "." ident | "." str | literal | "(" expr ")" | "[" expr? "]"
///            | "{" obj_pairs "}" | builtin
use super::error::ParseError;
use super::lexer::{Spanned, Token};
use super::{Builtin, Filter, ObjKey};
use crate::value::Value;

/// Deepest allowed nesting of parenthesised, bracketed or braced
/// sub-expressions. Same bound serde_json puts on input documents.
pub const MAX_DEPTH: usize = 128;

struct Parser<'a> {
    tokens: &'a [Spanned],
    source: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], source: &'a str) -> Self {
        Self {
            tokens,
            source,
            pos: 0,
            depth: 0,
        }
    }

    /// Source text of the token at `self.pos + offset`, up to the next token.
    fn token_text(&self, offset: usize) -> &'a str {
        let Some(start) = self.tokens.get(self.pos + offset).map(|s| s.pos) else {
            return "";
        };
        let end = self
            .tokens
            .get(self.pos + offset + 1)
            .map_or(self.source.len(), |s| s.pos);
        self.source.get(start..end).map_or("", str::trim_end)
    }

    /// Run `f` one nesting level deeper, failing past `MAX_DEPTH`.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_DEPTH,
                pos: self.offset(),
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|s| &s.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.tok)
    }

    /// Byte offset of the current token (or of the end of input).
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |s| s.pos)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn unexpected(&self) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(s) => ParseError::UnexpectedToken {
                found: s.tok.describe(),
                pos: s.pos,
            },
            None => ParseError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // expr = pipe
    fn parse_expr(&mut self) -> Result<Filter, ParseError> {
        self.nested(Self::parse_pipe)
    }

    // pipe = comma ("|" comma)*
    fn parse_pipe(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_comma()?;
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            let right = self.parse_comma()?;
            left = Filter::Pipe(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // comma = alternative ("," alternative)*
    fn parse_comma(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_alternative()?;
        while self.peek() == Some(&Token::Comma) {
            self.advance();
            let right = self.parse_alternative()?;
            left = Filter::Comma(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // alternative = postfix ("//" postfix)*
    fn parse_alternative(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_postfix()?;
        while self.peek() == Some(&Token::DoubleSlash) {
            self.advance();
            let right = self.parse_postfix()?;
            left = Filter::Alternative(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // postfix = primary ("." ident | "[" ... "]" | "?")*
    fn parse_postfix(&mut self) -> Result<Filter, ParseError> {
        let start = self.pos;
        let mut node = self.parse_primary()?;
        // `.name` written directly: a trailing `?` marks the field optional
        let mut bare_field = matches!(node, Filter::Field(..)) && self.pos == start + 2;
        let bare_dot = node == Filter::Identity && self.pos == start + 1;
        let mut steps = 0usize;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    let dot_pos = self.offset();
                    if bare_dot && steps == 0 {
                        return Err(ParseError::MalformedPath { pos: dot_pos });
                    }
                    self.advance();
                    if self.peek() == Some(&Token::LBrack) {
                        // `.a.[0]` is the same as `.a[0]`
                        continue;
                    }
                    let name = self.parse_field_name()?;
                    node = Filter::Pipe(Box::new(node), Box::new(Filter::Field(name, false)));
                }
                Some(Token::LBrack) => {
                    self.advance();
                    if self.peek() == Some(&Token::RBrack) {
                        self.advance();
                        node = Filter::IterateAll(Box::new(node));
                    } else {
                        node = self.parse_bracket_suffix(node)?;
                    }
                }
                Some(Token::Question) => {
                    self.advance();
                    node = match node {
                        Filter::Field(name, false) if bare_field => Filter::Field(name, true),
                        other => Filter::Optional(Box::new(other)),
                    };
                }
                _ => break,
            }
            bare_field = false;
            steps += 1;
        }
        Ok(node)
    }

    /// Field name after a `.`: identifier, keyword, or quoted string.
    fn parse_field_name(&mut self) -> Result<String, ParseError> {
        let name = match self.peek() {
            Some(Token::Ident(s)) | Some(Token::Str(s)) => s.clone(),
            Some(Token::True) => "true".to_string(),
            Some(Token::False) => "false".to_string(),
            Some(Token::Null) => "null".to_string(),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(name)
    }

    fn parse_primary(&mut self) -> Result<Filter, ParseError> {
        let tokens = self.tokens;
        let Some(spanned) = tokens.get(self.pos) else {
            return Err(ParseError::UnexpectedEnd);
        };
        match &spanned.tok {
            Token::Dot => {
                self.advance();
                match self.peek() {
                    Some(
                        Token::Ident(_) | Token::Str(_) | Token::True | Token::False | Token::Null,
                    ) => Ok(Filter::Field(self.parse_field_name()?, false)),
                    // `.[...]` and `.?` are handled as postfix on identity
                    _ => Ok(Filter::Identity),
                }
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBrack => {
                // Array construction: [expr]
                self.advance();
                if self.peek() == Some(&Token::RBrack) {
                    self.advance();
                    return Ok(Filter::Literal(Value::Array(vec![])));
                }
                let expr = self.parse_expr()?;
                self.expect(&Token::RBrack)?;
                Ok(Filter::ArrayConstruct(Box::new(expr)))
            }
            Token::LBrace => self.parse_object_construct(),
            Token::Null => {
                self.advance();
                Ok(Filter::Literal(Value::Null))
            }
            Token::True => {
                self.advance();
                Ok(Filter::Literal(Value::Bool(true)))
            }
            Token::False => {
                self.advance();
                Ok(Filter::Literal(Value::Bool(false)))
            }
            Token::Int(n) => {
                self.advance();
                Ok(Filter::Literal(Value::Number(*n as f64)))
            }
            Token::Float(f) => {
                self.advance();
                Ok(Filter::Literal(Value::Number(*f)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Filter::Literal(Value::String(s.clone())))
            }
            Token::Ident(name) => {
                if self.peek_at(1) == Some(&Token::LParen) {
                    return Err(ParseError::UnsupportedSyntax {
                        what: format!("call with arguments '{name}(...)'"),
                        pos: spanned.pos,
                    });
                }
                let builtin =
                    Builtin::from_name(name).ok_or_else(|| ParseError::UnknownFunction {
                        name: name.clone(),
                    })?;
                self.advance();
                Ok(Filter::Builtin(builtin))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse the contents of `[...]` after the `[` has been consumed and
    /// wrap `base` in an Index or Slice node.
    fn parse_bracket_suffix(&mut self, base: Filter) -> Result<Filter, ParseError> {
        let pos = self.offset();

        // [:end], no start
        if self.peek() == Some(&Token::Colon) {
            self.advance();
            let end = self.parse_slice_end()?;
            return Ok(Filter::Slice(Box::new(base), None, end));
        }

        let first = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Int(n)), Some(Token::RBrack)) if *n < 0 => {
                return Err(ParseError::InvalidIndex {
                    found: self.token_text(0).to_string(),
                    pos,
                });
            }
            (Some(Token::Float(_)), Some(Token::RBrack)) => {
                return Err(ParseError::InvalidIndex {
                    found: self.token_text(0).to_string(),
                    pos,
                });
            }
            (Some(Token::Str(_)), _) => {
                return Err(ParseError::UnsupportedSyntax {
                    what: "bracket-quoted key; use .\"key\" instead".to_string(),
                    pos,
                });
            }
            (Some(Token::Ident(name)), _) if Builtin::from_name(name).is_none() => {
                return Err(ParseError::InvalidIndex {
                    found: name.clone(),
                    pos,
                });
            }
            (Some(tok @ (Token::True | Token::False | Token::Null | Token::LBrack)), _) => {
                return Err(ParseError::InvalidIndex {
                    found: tok.describe(),
                    pos,
                });
            }
            _ => self.parse_expr()?,
        };

        // [start:end] or [start:]
        if self.peek() == Some(&Token::Colon) {
            self.advance();
            let end = self.parse_slice_end()?;
            return Ok(Filter::Slice(Box::new(base), Some(Box::new(first)), end));
        }

        self.expect(&Token::RBrack)?;
        Ok(Filter::Index(Box::new(base), Box::new(first)))
    }

    /// Parse the optional end bound of a slice and the closing `]`.
    fn parse_slice_end(&mut self) -> Result<Option<Box<Filter>>, ParseError> {
        let end = if self.peek() == Some(&Token::RBrack) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(&Token::RBrack)?;
        Ok(end)
    }

    fn parse_object_construct(&mut self) -> Result<Filter, ParseError> {
        self.expect(&Token::LBrace)?;
        let mut pairs = Vec::new();

        if self.peek() == Some(&Token::RBrace) {
            self.advance();
            return Ok(Filter::ObjectConstruct(pairs));
        }

        loop {
            let (key, val) = self.parse_obj_pair()?;
            pairs.push((key, Box::new(val)));
            if self.peek() != Some(&Token::Comma) {
                break;
            }
            self.advance(); // consume comma
        }

        self.expect(&Token::RBrace)?;
        Ok(Filter::ObjectConstruct(pairs))
    }

    fn parse_obj_pair(&mut self) -> Result<(ObjKey, Filter), ParseError> {
        // Key can be: ident, keyword, string, or (expr)
        let key = match self.peek() {
            Some(Token::Ident(_) | Token::Str(_) | Token::True | Token::False | Token::Null) => {
                ObjKey::Name(self.parse_field_name()?)
            }
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                ObjKey::Expr(Box::new(expr))
            }
            _ => return Err(self.unexpected()),
        };

        // If no colon follows, it's a shorthand: {name} means {name: .name}
        if self.peek() != Some(&Token::Colon) {
            return match key {
                ObjKey::Name(name) => {
                    let field = Filter::Field(name.clone(), false);
                    Ok((ObjKey::Name(name), field))
                }
                ObjKey::Expr(_) => Err(self.unexpected()),
            };
        }

        self.expect(&Token::Colon)?;
        let val = self.parse_pipe_no_comma()?;
        Ok((key, val))
    }

    // Object values allow pipes but not commas, since comma separates pairs.
    fn parse_pipe_no_comma(&mut self) -> Result<Filter, ParseError> {
        self.nested(Self::parse_pipe_no_comma_inner)
    }

    fn parse_pipe_no_comma_inner(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_alternative()?;
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            let right = self.parse_alternative()?;
            left = Filter::Pipe(Box::new(left), Box::new(right));
        }
        Ok(left)
    }
}

pub fn parse(tokens: &[Spanned], source: &str) -> Result<Filter, ParseError> {
    let mut parser = Parser::new(tokens, source);
    let filter = parser.parse_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.unexpected());
    }
    Ok(filter)
}
