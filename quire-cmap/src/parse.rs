//! Parsing CMaps in their PostScript-like text format.

use crate::{CMap, CidSystemInfo, Code, WritingMode, to_code};
use log::warn;
use quire_syntax::Name;
use quire_syntax::lexer::{Lexer, Token};
use smallvec::SmallVec;
use std::rc::Rc;

/// The most codes a `bfrange` with a multi-unit destination is expanded to.
const MAX_EXPANDED_RANGE: u32 = 0x10000;

type Units = SmallVec<[u32; 4]>;

/// Parse a CMap.
///
/// `use_cmap` is called with the name given to a `usecmap` operator and
/// returns the parent CMap. Parsing is lenient: malformed entries are skipped
/// and a lexical error ends parsing, keeping the mappings read so far. The
/// returned CMap is optimized.
pub fn parse(data: &[u8], mut use_cmap: impl FnMut(&[u8]) -> Option<Rc<CMap>>) -> CMap {
    let mut parser = Parser {
        lexer: Lexer::new(data),
        cmap: CMap::new(),
    };

    let mut last_name: Option<Name> = None;
    let mut registry = None;
    let mut ordering = None;
    let mut supplement = None;

    while let Some(token) = parser.next() {
        match token {
            Token::Name(name) => match &*name {
                b"CMapName" => {
                    if let Some(Token::Name(n)) = parser.next() {
                        parser.cmap.set_name(&n);
                    }
                }
                b"WMode" => {
                    if let Some(Token::Int(1)) = parser.next() {
                        parser.cmap.set_writing_mode(WritingMode::Vertical);
                    }
                }
                // These should be strings, but names are found in the wild.
                b"Registry" => registry = parser.next().and_then(string_or_name),
                b"Ordering" => ordering = parser.next().and_then(string_or_name),
                b"Supplement" => {
                    if let Some(Token::Int(n)) = parser.next() {
                        supplement = i32::try_from(n).ok();
                    }
                }
                _ => last_name = Some(name),
            },
            Token::Keyword(kw) => match &*kw {
                b"usecmap" => match last_name.take() {
                    Some(name) => match use_cmap(&name[..]) {
                        Some(parent) => parser.cmap.set_parent(parent),
                        None => warn!("failed to load parent CMap {}", name.as_str()),
                    },
                    None => warn!("usecmap without a CMap name"),
                },
                b"begincodespacerange" => parser.codespace_ranges(),
                b"begincidchar" => parser.cid_chars(),
                b"begincidrange" => parser.cid_ranges(),
                b"beginbfchar" => parser.bf_chars(),
                b"beginbfrange" => parser.bf_ranges(),
                b"beginnotdefchar" => parser.skip_until(b"endnotdefchar"),
                b"beginnotdefrange" => parser.skip_until(b"endnotdefrange"),
                _ => {}
            },
            _ => {}
        }
    }

    if let (Some(registry), Some(ordering), Some(supplement)) = (registry, ordering, supplement) {
        parser.cmap.set_system_info(CidSystemInfo {
            registry,
            ordering,
            supplement,
        });
    }

    let mut cmap = parser.cmap;
    cmap.optimize();

    cmap
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    cmap: CMap,
}

impl Parser<'_> {
    /// The next token, or `None` at the end of the data or after a lexical
    /// error.
    fn next(&mut self) -> Option<Token> {
        match self.lexer.next_token() {
            Ok(Token::Eof) => None,
            Ok(token) => Some(token),
            Err(e) => {
                warn!("stopping CMap parsing: {e}");
                None
            }
        }
    }

    /// The next token of a section, or `None` at its end.
    fn next_in(&mut self, end: &[u8]) -> Option<Token> {
        match self.next() {
            Some(token) if token.is_keyword(end) => None,
            Some(token) => Some(token),
            None => {
                warn!("unterminated CMap section, expected {}", String::from_utf8_lossy(end));
                None
            }
        }
    }

    fn next_code(&mut self, end: &[u8]) -> Option<Option<Vec<u8>>> {
        self.next_in(end).map(|token| match token {
            Token::String(s) | Token::HexString(s) if (1..=4).contains(&s.len()) => Some(s),
            other => {
                warn!("invalid code {other:?} in CMap");
                None
            }
        })
    }

    fn next_cid(&mut self, end: &[u8]) -> Option<Option<u32>> {
        self.next_in(end).map(|token| match token {
            Token::Int(n) => u32::try_from(n).ok(),
            _ => None,
        })
    }

    fn skip_until(&mut self, end: &[u8]) {
        while self.next_in(end).is_some() {}
    }

    fn codespace_ranges(&mut self) {
        const END: &[u8] = b"endcodespacerange";

        while let Some(low) = self.next_code(END) {
            let Some(high) = self.next_code(END) else {
                return;
            };

            if let (Some(low), Some(high)) = (low, high) {
                if low.len() != high.len() {
                    warn!("codespace range bounds have different widths");
                }

                self.cmap
                    .add_codespace(low.len() as u8, to_code(&low), to_code(&high));
            }
        }
    }

    fn cid_chars(&mut self) {
        const END: &[u8] = b"endcidchar";

        while let Some(code) = self.next_code(END) {
            let Some(cid) = self.next_cid(END) else {
                return;
            };

            if let (Some(code), Some(cid)) = (code, cid) {
                self.cmap.add_single(to_code(&code), cid);
            }
        }
    }

    fn cid_ranges(&mut self) {
        const END: &[u8] = b"endcidrange";

        while let Some(low) = self.next_code(END) {
            let Some(high) = self.next_code(END) else {
                return;
            };
            let Some(cid) = self.next_cid(END) else {
                return;
            };

            if let (Some(low), Some(high), Some(cid)) = (low, high, cid) {
                self.cmap.add_range(to_code(&low), to_code(&high), cid);
            }
        }
    }

    fn bf_chars(&mut self) {
        const END: &[u8] = b"endbfchar";

        while let Some(code) = self.next_code(END) {
            let Some(dst) = self.next_in(END) else {
                return;
            };

            let Some(code) = code else { continue };

            match dst {
                Token::String(s) | Token::HexString(s) => {
                    self.cmap.add_one_to_many(to_code(&code), &utf16_units(&s));
                }
                other => warn!("unsupported bfchar destination {other:?}"),
            }
        }
    }

    fn bf_ranges(&mut self) {
        const END: &[u8] = b"endbfrange";

        while let Some(low) = self.next_code(END) {
            let Some(high) = self.next_code(END) else {
                return;
            };
            let Some(dst) = self.next_in(END) else {
                return;
            };

            let (Some(low), Some(high)) = (low, high) else {
                continue;
            };
            let (low, high) = (to_code(&low), to_code(&high));

            match dst {
                Token::String(s) | Token::HexString(s) => self.bf_range(low, high, &utf16_units(&s)),
                Token::ArrayOpen => {
                    let mut code = low;

                    while let Some(token) = self.next() {
                        match token {
                            Token::ArrayClose => break,
                            Token::String(s) | Token::HexString(s) => {
                                if code <= high {
                                    self.cmap.add_one_to_many(code, &utf16_units(&s));
                                }

                                code = code.saturating_add(1);
                            }
                            other => warn!("invalid bfrange destination {other:?}"),
                        }
                    }
                }
                other => warn!("invalid bfrange destination {other:?}"),
            }
        }
    }

    fn bf_range(&mut self, low: Code, high: Code, dst: &[u32]) {
        match dst {
            [] => warn!("empty bfrange destination"),
            [single] => self.cmap.add_range(low, high, *single),
            [.., last] => {
                if high < low {
                    warn!("ignoring inverted bfrange {low:#x}..{high:#x}");
                    return;
                }

                let count = (high - low).min(MAX_EXPANDED_RANGE - 1);
                let mut units = Units::from_slice(dst);

                for i in 0..=count {
                    if let Some(unit) = units.last_mut() {
                        *unit = last + i;
                    }

                    self.cmap.add_one_to_many(low + i, &units);
                }
            }
        }
    }
}

fn string_or_name(token: Token) -> Option<Vec<u8>> {
    match token {
        Token::String(s) | Token::HexString(s) => Some(s),
        Token::Name(n) => Some(n.to_vec()),
        _ => None,
    }
}

/// Split a big-endian UTF-16 string into code units. A leading odd byte is
/// taken as a unit of its own.
fn utf16_units(bytes: &[u8]) -> Units {
    let (head, rest) = bytes.split_at(bytes.len() % 2);

    head.iter()
        .map(|b| u32::from(*b))
        .chain(
            rest.chunks_exact(2)
                .map(|c| u32::from(u16::from_be_bytes([c[0], c[1]]))),
        )
        .collect()
}
