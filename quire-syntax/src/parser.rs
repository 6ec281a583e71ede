//! Parsing objects from tokens.

use crate::error::{DocError, Result, bail, err};
use crate::lexer::{Lexer, Token};
use crate::object::{Dict, ObjRef, Object, Stream, StreamData};
use log::warn;
use smallvec::SmallVec;
use std::rc::Rc;

const MAX_DEPTH: u32 = 128;

/// A token stream with up to two tokens of look-ahead.
///
/// This is what makes `N G R` work: after reading an integer, the parser peeks
/// at the next two tokens, and only if they are an integer and the keyword `R`
/// are all three merged into a reference. Otherwise the peeked tokens are
/// handed out again, unchanged, by the following calls to `next`.
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    // Tokens that have been peeked but not consumed, in order, with their start offsets.
    buf: SmallVec<[(Token, usize); 2]>,
    last_start: usize,
}

impl<'a> TokenStream<'a> {
    /// Create a new token stream at the given offset.
    pub fn new(data: &'a [u8], offset: usize) -> Self {
        Self {
            lexer: Lexer::new_at(data, offset),
            buf: SmallVec::new(),
            last_start: offset,
        }
    }

    /// Consume the next token.
    pub fn next(&mut self) -> Result<Token> {
        if !self.buf.is_empty() {
            let (token, start) = self.buf.remove(0);
            self.last_start = start;
            return Ok(token);
        }

        let token = self.lexer.next_token()?;
        self.last_start = self.lexer.token_start();

        Ok(token)
    }

    /// Peek at the token `n` positions ahead (`n` must be 0 or 1).
    pub fn peek_nth(&mut self, n: usize) -> Result<&Token> {
        debug_assert!(n < 2, "at most two tokens of look-ahead are supported");

        while self.buf.len() <= n {
            let token = self.lexer.next_token()?;
            self.buf.push((token, self.lexer.token_start()));
        }

        Ok(&self.buf[n].0)
    }

    /// Push a consumed token back to the front of the stream.
    pub fn unread(&mut self, token: Token) {
        self.buf.insert(0, (token, self.last_start));
    }

    /// The start offset of the most recently consumed token.
    pub fn last_start(&self) -> usize {
        self.last_start
    }

    /// The offset of the next unconsumed token.
    pub fn offset(&self) -> usize {
        self.buf
            .first()
            .map(|(_, start)| *start)
            .unwrap_or_else(|| self.lexer.offset())
    }

    /// Move to the given offset, discarding any look-ahead.
    pub fn jump(&mut self, offset: usize) {
        self.buf.clear();
        self.lexer.jump(offset);
    }

    /// Access the underlying lexer, rewinding over any look-ahead first.
    pub fn lexer_mut(&mut self) -> &mut Lexer<'a> {
        if let Some((_, start)) = self.buf.first() {
            let start = *start;
            self.buf.clear();
            self.lexer.jump(start);
        }

        &mut self.lexer
    }
}

/// A recursive-descent parser for PDF objects.
pub struct Parser<'a> {
    tokens: TokenStream<'a>,
    allow_refs: bool,
    depth: u32,
}

impl<'a> Parser<'a> {
    /// Create a parser for file-level syntax, where indirect references may occur.
    pub fn new(data: &'a [u8], offset: usize) -> Self {
        Self {
            tokens: TokenStream::new(data, offset),
            allow_refs: true,
            depth: 0,
        }
    }

    /// Create a parser for content streams, where `N G R` is never a reference.
    pub fn new_content(data: &'a [u8], offset: usize) -> Self {
        Self {
            allow_refs: false,
            ..Self::new(data, offset)
        }
    }

    /// The underlying data.
    pub fn data(&mut self) -> &'a [u8] {
        self.tokens.lexer_mut().data()
    }

    /// The offset of the next unconsumed token.
    pub fn offset(&self) -> usize {
        self.tokens.offset()
    }

    /// Move to the given offset.
    pub fn jump(&mut self, offset: usize) {
        self.tokens.jump(offset);
    }

    /// Access the token stream.
    pub fn tokens(&mut self) -> &mut TokenStream<'a> {
        &mut self.tokens
    }

    /// Parse the next object.
    pub fn parse_object(&mut self) -> Result<Object> {
        let token = self.tokens.next()?;
        self.parse_object_from(token)
    }

    /// Parse an object whose first token has already been consumed.
    pub fn parse_object_from(&mut self, token: Token) -> Result<Object> {
        match token {
            Token::Int(n) => {
                if self.allow_refs
                    && let Some(r) = self.try_reference(n)?
                {
                    return Ok(Object::Ref(r));
                }

                Ok(Object::Int(n))
            }
            Token::Real(r) => Ok(Object::Real(r)),
            Token::Name(n) => Ok(Object::Name(n)),
            Token::String(s) | Token::HexString(s) => Ok(Object::String(Rc::from(s))),
            Token::ArrayOpen => self.nested(|p| p.parse_array()),
            Token::DictOpen => self.nested(|p| p.parse_dict().map(Object::dict)),
            Token::Keyword(k) => match &*k {
                b"true" => Ok(Object::Bool(true)),
                b"false" => Ok(Object::Bool(false)),
                b"null" => Ok(Object::Null),
                _ => bail!(
                    SyntaxError,
                    "unexpected keyword '{}' at offset {}",
                    k.as_str(),
                    self.tokens.last_start()
                ),
            },
            Token::Eof => bail!(SyntaxError, "unexpected end of data"),
            other => bail!(
                SyntaxError,
                "unexpected token {:?} at offset {}",
                other,
                self.tokens.last_start()
            ),
        }
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<Object>) -> Result<Object> {
        if self.depth >= MAX_DEPTH {
            bail!(SyntaxError, "objects nested too deeply");
        }

        self.depth += 1;
        let res = f(self);
        self.depth -= 1;

        res
    }

    fn try_reference(&mut self, num: i64) -> Result<Option<ObjRef>> {
        let Ok(num) = u32::try_from(num) else {
            return Ok(None);
        };

        let generation = match self.tokens.peek_nth(0) {
            Ok(Token::Int(g)) => match u16::try_from(*g) {
                Ok(g) => g,
                Err(_) => return Ok(None),
            },
            _ => return Ok(None),
        };

        if matches!(self.tokens.peek_nth(1), Ok(t) if t.is_keyword(b"R")) {
            self.tokens.next()?;
            self.tokens.next()?;

            return Ok(Some(ObjRef::new(num, generation)));
        }

        Ok(None)
    }

    /// Parse the items of an array. The `[` must already be consumed.
    pub fn parse_array(&mut self) -> Result<Object> {
        let mut items = Vec::new();

        loop {
            let token = self.tokens.next()?;

            match token {
                Token::ArrayClose => break,
                Token::Eof => {
                    warn!("unterminated array");
                    break;
                }
                Token::Keyword(ref k) if is_object_boundary(k) => {
                    warn!("array not terminated before '{}'", k.as_str());
                    self.tokens.unread(token);
                    break;
                }
                token => items.push(self.parse_object_from(token)?),
            }
        }

        Ok(Object::array(items))
    }

    /// Parse the entries of a dictionary. The `<<` must already be consumed.
    pub fn parse_dict(&mut self) -> Result<Dict> {
        let mut dict = Dict::new();

        loop {
            let token = self.tokens.next()?;

            let key = match token {
                Token::DictClose => break,
                Token::Name(n) => n,
                Token::Eof => {
                    warn!("unterminated dictionary");
                    break;
                }
                Token::Keyword(ref k) if is_object_boundary(k) => {
                    warn!("dictionary not terminated before '{}'", k.as_str());
                    self.tokens.unread(token);
                    break;
                }
                other => bail!(
                    SyntaxError,
                    "expected name as dictionary key, found {:?} at offset {}",
                    other,
                    self.tokens.last_start()
                ),
            };

            let value = match self.tokens.next()? {
                Token::DictClose => {
                    warn!("missing value for key {key:?}");
                    dict.insert(key, Object::Null);
                    break;
                }
                token => self.parse_object_from(token)?,
            };

            dict.insert(key, value);
        }

        Ok(dict)
    }

    /// Parse `N G obj <object> [stream] endobj`.
    ///
    /// Stream data is not read: the returned stream only records the offset at
    /// which its raw data starts.
    pub fn parse_indirect_object(&mut self) -> Result<(ObjRef, Object)> {
        let id = self.parse_object_header()?;

        let object = match self.tokens.next()? {
            Token::Keyword(k) if &*k == b"endobj" => {
                warn!("empty object {id}");
                return Ok((id, Object::Null));
            }
            token => self.parse_object_from(token)?,
        };

        if self.tokens.peek_nth(0)?.is_keyword(b"stream") {
            self.tokens.next()?;
            let keyword_end = self.tokens.last_start() + b"stream".len();

            let Object::Dict(dict) = object else {
                bail!(SyntaxError, "stream of object {id} has no dictionary");
            };

            let data = self.data();
            let start = stream_data_start(data, keyword_end);
            self.tokens.jump(start);

            let dict = Rc::try_unwrap(dict).unwrap_or_else(|d| (*d).clone());

            return Ok((
                id,
                Object::stream(Stream {
                    dict,
                    data: StreamData::File(start),
                    id: Some(id),
                }),
            ));
        }

        if self.tokens.peek_nth(0)?.is_keyword(b"endobj") {
            self.tokens.next()?;
        } else {
            warn!("missing endobj for object {id}");
        }

        Ok((id, object))
    }

    /// Parse the `N G obj` header of an indirect object.
    pub fn parse_object_header(&mut self) -> Result<ObjRef> {
        let start = self.tokens.offset();
        let num = self.tokens.next()?;
        let generation = self.tokens.next()?;
        let kw = self.tokens.next()?;

        match (num, generation, kw) {
            (Token::Int(num), Token::Int(generation), kw) if kw.is_keyword(b"obj") => {
                let num = u32::try_from(num).map_err(|_| bad_header(start))?;
                let generation = u16::try_from(generation).map_err(|_| bad_header(start))?;

                Ok(ObjRef::new(num, generation))
            }
            _ => Err(bad_header(start)),
        }
    }

    /// Parse an object stored inside an object stream. Such objects never
    /// carry streams and have no `obj`/`endobj` framing.
    pub fn parse_stream_object_entry(&mut self) -> Result<Object> {
        self.parse_object()
    }
}

fn bad_header(offset: usize) -> DocError {
    err!(SyntaxError, "expected object header at offset {offset}")
}

fn is_object_boundary(k: &[u8]) -> bool {
    matches!(k, b"endobj" | b"obj" | b"stream" | b"endstream" | b"xref" | b"trailer")
}

/// Determine where the data of a stream starts, given the offset directly
/// after the `stream` keyword.
pub fn stream_data_start(data: &[u8], keyword_end: usize) -> usize {
    let at = |i: usize| data.get(keyword_end + i).copied();

    match (at(0), at(1)) {
        (Some(b'\r'), Some(b'\n')) => keyword_end + 2,
        (Some(b'\n'), _) => keyword_end + 1,
        (Some(b'\r'), _) => {
            warn!("stream keyword followed by a bare CR");
            keyword_end + 1
        }
        _ => {
            warn!("missing end-of-line after stream keyword");

            // Tolerate trailing spaces before the end-of-line marker.
            let mut pos = keyword_end;

            while matches!(data.get(pos), Some(b' ' | b'\t')) {
                pos += 1;
            }

            match (data.get(pos), data.get(pos + 1)) {
                (Some(b'\r'), Some(b'\n')) => pos + 2,
                (Some(b'\n' | b'\r'), _) => pos + 1,
                _ => keyword_end,
            }
        }
    }
}

/// Parse a single object from a byte slice, e.g. for tests and trailers.
pub fn parse_object(data: &[u8]) -> Result<Object> {
    Parser::new(data, 0).parse_object()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::object::keys::{CONTENTS, TYPE};

    #[test]
    fn page_object() {
        let data = b"12 0 obj << /Type /Page /Contents 13 0 R >> endobj";
        let (id, obj) = Parser::new(data, 0).parse_indirect_object().unwrap();

        assert_eq!(id, ObjRef::new(12, 0));
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get(TYPE), Some(&Object::name(b"Page")));
        assert_eq!(dict.get(CONTENTS), Some(&Object::Ref(ObjRef::new(13, 0))));
    }

    #[test]
    fn integers_next_to_references() {
        let obj = parse_object(b"[1 2 3 0 R 4 5]").unwrap();

        assert_eq!(
            obj,
            Object::array(vec![
                Object::Int(1),
                Object::Int(2),
                Object::Ref(ObjRef::new(3, 0)),
                Object::Int(4),
                Object::Int(5),
            ])
        );
    }

    #[test]
    fn no_references_in_content() {
        let mut p = Parser::new_content(b"[1 0 R]", 0);
        // `R` is an unexpected keyword inside an array in content streams.
        assert!(p.parse_object().is_err());
    }

    #[test]
    fn lookahead_reemits_tokens() {
        let mut ts = TokenStream::new(b"1 2 obj", 0);
        assert_eq!(ts.next().unwrap(), Token::Int(1));
        assert_eq!(ts.peek_nth(0).unwrap(), &Token::Int(2));
        assert!(ts.peek_nth(1).unwrap().is_keyword(b"obj"));
        assert_eq!(ts.offset(), 2);
        assert_eq!(ts.next().unwrap(), Token::Int(2));
        assert!(ts.next().unwrap().is_keyword(b"obj"));
        assert_eq!(ts.next().unwrap(), Token::Eof);
    }

    #[test]
    fn non_name_key_is_syntax_error() {
        let err = parse_object(b"<< 1 2 >>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn stream_offsets() {
        for (data, expected) in [
            (&b"1 0 obj <<>> stream\r\nABC"[..], 21),
            (&b"1 0 obj <<>> stream\nABC"[..], 20),
            (&b"1 0 obj <<>> stream\rABC"[..], 20),
            (&b"1 0 obj <<>> stream  \nABC"[..], 22),
        ] {
            let (_, obj) = Parser::new(data, 0).parse_indirect_object().unwrap();
            assert_eq!(obj.as_stream().unwrap().data, StreamData::File(expected));
        }
    }

    #[test]
    fn missing_endobj_and_empty_object() {
        let data = b"1 0 obj 5 2 0 obj endobj";
        let mut p = Parser::new(data, 0);
        assert_eq!(p.parse_indirect_object().unwrap().1, Object::Int(5));
        assert_eq!(p.parse_indirect_object().unwrap(), (ObjRef::new(2, 0), Object::Null));
    }

    #[test]
    fn unterminated_dict_before_endobj() {
        let data = b"1 0 obj << /A 1 endobj";
        let (_, obj) = Parser::new(data, 0).parse_indirect_object().unwrap();
        assert_eq!(obj.as_dict().unwrap().get_int(b"A"), Some(1));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let data = vec![b'['; 1000];
        assert_eq!(parse_object(&data).unwrap_err().kind(), ErrorKind::SyntaxError);
    }
}
