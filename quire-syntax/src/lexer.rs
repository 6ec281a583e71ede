//! Turning bytes into PDF tokens.

use crate::error::{DocError, ErrorKind, Result};
use crate::object::Name;
use crate::reader::Reader;
use crate::trivia::{is_regular_character, is_white_space_character};
use log::warn;
use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;

/// A bare keyword such as `obj`, `R`, `true` or a content stream operator.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Keyword(SmallVec<[u8; 8]>);

impl Keyword {
    /// Create a new keyword.
    pub fn new(data: &[u8]) -> Self {
        Self(SmallVec::from_slice(data))
    }

    /// Return a string representation of the keyword.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("{non-utf8 keyword}")
    }
}

impl Deref for Keyword {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A PDF token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// An integer.
    Int(i64),
    /// A real number.
    Real(f64),
    /// A name, without the leading solidus.
    Name(Name),
    /// A literal string, with escapes resolved.
    String(Vec<u8>),
    /// A hex string, decoded.
    HexString(Vec<u8>),
    /// `[`
    ArrayOpen,
    /// `]`
    ArrayClose,
    /// `<<`
    DictOpen,
    /// `>>`
    DictClose,
    /// `{`
    BraceOpen,
    /// `}`
    BraceClose,
    /// Any other run of regular characters.
    Keyword(Keyword),
    /// The end of the data.
    Eof,
}

impl Token {
    /// Whether the token is the given keyword.
    pub fn is_keyword(&self, kw: &[u8]) -> bool {
        matches!(self, Self::Keyword(k) if k.deref() == kw)
    }
}

/// A tokenizer with one token of look-ahead.
#[derive(Clone)]
pub struct Lexer<'a> {
    reader: Reader<'a>,
    peeked: Option<(Token, usize)>,
    token_start: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer at the start of the data.
    pub fn new(data: &'a [u8]) -> Self {
        Self::new_at(data, 0)
    }

    /// Create a new lexer starting at the given offset.
    pub fn new_at(data: &'a [u8], offset: usize) -> Self {
        Self {
            reader: Reader::new_with(data, offset),
            peeked: None,
            token_start: offset,
        }
    }

    /// The underlying data.
    pub fn data(&self) -> &'a [u8] {
        self.reader.data()
    }

    /// The offset of the next unread token (or byte).
    pub fn offset(&self) -> usize {
        match &self.peeked {
            Some((_, start)) => *start,
            None => self.reader.offset(),
        }
    }

    /// The start offset of the token returned last by [`Lexer::next_token`].
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Move to the given offset, discarding any peeked token.
    pub fn jump(&mut self, offset: usize) {
        self.peeked = None;
        self.reader.jump(offset);
    }

    /// Access the byte reader directly, e.g. to read stream or inline image data.
    ///
    /// A peeked token is discarded and the reader is rewound to its start.
    pub fn reader_mut(&mut self) -> &mut Reader<'a> {
        if let Some((_, start)) = self.peeked.take() {
            self.reader.jump(start);
        }

        &mut self.reader
    }

    /// Return the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        if let Some((token, start)) = self.peeked.take() {
            self.token_start = start;
            return Ok(token);
        }

        self.reader.skip_white_spaces_and_comments();
        self.token_start = self.reader.offset();
        self.lex()
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Result<&Token> {
        if self.peeked.is_none() {
            self.reader.skip_white_spaces_and_comments();
            let start = self.reader.offset();
            let token = self.lex()?;
            self.peeked = Some((token, start));
        }

        match &self.peeked {
            Some((token, _)) => Ok(token),
            None => Ok(&Token::Eof),
        }
    }

    fn error(&self, start: usize, msg: &str) -> DocError {
        DocError::new(ErrorKind::LexicalError, format!("{msg} at offset {start}"))
    }

    fn lex(&mut self) -> Result<Token> {
        let start = self.reader.offset();

        let Some(b) = self.reader.peek_byte() else {
            return Ok(Token::Eof);
        };

        match b {
            b'[' => {
                self.reader.forward();
                Ok(Token::ArrayOpen)
            }
            b']' => {
                self.reader.forward();
                Ok(Token::ArrayClose)
            }
            b'{' => {
                self.reader.forward();
                Ok(Token::BraceOpen)
            }
            b'}' => {
                self.reader.forward();
                Ok(Token::BraceClose)
            }
            b'<' => {
                self.reader.forward();

                if self.reader.eat(|b| b == b'<').is_some() {
                    Ok(Token::DictOpen)
                } else {
                    Ok(Token::HexString(self.lex_hex_string()))
                }
            }
            b'>' => {
                self.reader.forward();

                if self.reader.eat(|b| b == b'>').is_some() {
                    Ok(Token::DictClose)
                } else {
                    Err(self.error(start, "unexpected '>'"))
                }
            }
            b'(' => {
                self.reader.forward();
                Ok(Token::String(self.lex_literal_string()))
            }
            b')' => {
                self.reader.forward();
                Err(self.error(start, "unbalanced ')'"))
            }
            b'/' => {
                self.reader.forward();
                Ok(Token::Name(self.lex_name()))
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => Ok(self.lex_number()),
            _ => {
                self.reader.forward_while(is_regular_character);

                if self.reader.offset() == start {
                    self.reader.forward();
                    return Err(self.error(start, "unexpected character"));
                }

                let bytes = self.reader.range(start..self.reader.offset()).unwrap_or_default();

                Ok(Token::Keyword(Keyword::new(bytes)))
            }
        }
    }

    fn lex_number(&mut self) -> Token {
        let r = &mut self.reader;
        let mut negative = false;

        if let Some(sign) = r.eat(|b| b == b'+' || b == b'-') {
            negative = sign == b'-';

            // Some writers emit doubled signs such as `--1`.
            if r.eat(|b| b == b'+' || b == b'-').is_some() {
                warn!("ignoring doubled sign in number");
            }
        }

        let mut int_part: i64 = 0;
        let mut overflow = false;
        let digits_start = r.offset();

        while let Some(d) = r.eat(|b| b.is_ascii_digit()) {
            match int_part
                .checked_mul(10)
                .and_then(|v| v.checked_add((d - b'0') as i64))
            {
                Some(v) => int_part = v,
                None => overflow = true,
            }
        }

        let int_digits = r.range(digits_start..r.offset()).unwrap_or_default();

        if r.eat(|b| b == b'.').is_none() && !overflow {
            return Token::Int(if negative { -int_part } else { int_part });
        }

        let frac_start = r.offset();
        r.forward_while(|b| b.is_ascii_digit());
        let frac_digits = r.range(frac_start..r.offset()).unwrap_or_default();

        // A second '.' simply ends the number.
        let mut text = String::with_capacity(int_digits.len() + frac_digits.len() + 3);
        text.push('0');
        text.extend(int_digits.iter().map(|d| *d as char));
        text.push('.');
        text.extend(frac_digits.iter().map(|d| *d as char));
        text.push('0');

        let value: f64 = text.parse().unwrap_or(0.0);

        Token::Real(if negative { -value } else { value })
    }

    fn lex_name(&mut self) -> Name {
        let r = &mut self.reader;
        let mut out = SmallVec::<[u8; 16]>::new();

        while let Some(b) = r.eat(is_regular_character) {
            if b == b'#' {
                let hex = r
                    .peek_bytes(2)
                    .filter(|h| h.iter().all(u8::is_ascii_hexdigit));

                if let Some(hex) = hex {
                    out.push(hex_value(hex[0]) << 4 | hex_value(hex[1]));
                    r.forward();
                    r.forward();
                } else {
                    warn!("invalid escape sequence in name");
                    out.push(b);
                }
            } else {
                out.push(b);
            }
        }

        Name::new(&out)
    }

    fn lex_hex_string(&mut self) -> Vec<u8> {
        let r = &mut self.reader;
        let mut out = Vec::new();
        let mut hi: Option<u8> = None;
        let mut warned = false;

        loop {
            let Some(b) = r.read_byte() else {
                warn!("unterminated hex string");
                break;
            };

            match b {
                b'>' => break,
                _ if b.is_ascii_hexdigit() => {
                    if let Some(h) = hi.take() {
                        out.push(h << 4 | hex_value(b));
                    } else {
                        hi = Some(hex_value(b));
                    }
                }
                _ if is_white_space_character(b) => {}
                _ => {
                    if !warned {
                        warn!("ignoring invalid character in hex string");
                        warned = true;
                    }
                }
            }
        }

        if let Some(h) = hi {
            out.push(h << 4);
        }

        out
    }

    fn lex_literal_string(&mut self) -> Vec<u8> {
        let r = &mut self.reader;
        let mut out = Vec::new();
        let mut depth = 1_u32;

        loop {
            let Some(b) = r.read_byte() else {
                warn!("unterminated literal string");
                break;
            };

            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;

                    if depth == 0 {
                        break;
                    }

                    out.push(b);
                }
                b'\\' => {
                    let Some(next) = r.read_byte() else {
                        break;
                    };

                    match next {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'0'..=b'7' => {
                            let mut value = (next - b'0') as u32;

                            for _ in 0..2 {
                                match r.eat(|b| (b'0'..=b'7').contains(&b)) {
                                    Some(d) => value = value * 8 + (d - b'0') as u32,
                                    None => break,
                                }
                            }

                            out.push(value as u8);
                        }
                        // Line continuation.
                        b'\r' => {
                            r.eat(|b| b == b'\n');
                        }
                        b'\n' => {}
                        other => out.push(other),
                    }
                }
                b'\r' => {
                    out.push(b'\n');
                    r.eat(|b| b == b'\n');
                }
                other => out.push(other),
            }
        }

        out
    }
}

#[inline]
pub(crate) fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}
