//! Rebuilding the cross-reference table by scanning the whole file.

use crate::error::{Result, bail};
use crate::lexer::{Lexer, Token};
use crate::object::keys::{CATALOG, ENCRYPT, ID, INFO, LENGTH, OBJ_STM, ROOT, SIZE, TYPE, XREF};
use crate::object::{Dict, ObjRef, Object, Stream, StreamData};
use crate::parser::{Parser, stream_data_start};
use crate::util::find;
use crate::xref::{EntryKind, XRefTable, scan_stream_end};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// The outcome of a repair scan.
#[derive(Debug)]
pub(crate) struct Repaired {
    pub(crate) table: XRefTable,
    pub(crate) trailer: Dict,
    /// Object streams found while scanning. Their members are registered by
    /// the document, which can decrypt and decode them.
    pub(crate) object_streams: Vec<ObjRef>,
    // The header offset of the winning candidate of every object number.
    positions: FxHashMap<u32, usize>,
}

impl Repaired {
    /// Whether a member `num` of the object stream `container` is superseded by
    /// an object that was scanned after the container.
    pub(crate) fn is_superseded(&self, num: u32, container: u32) -> bool {
        match (self.positions.get(&num), self.positions.get(&container)) {
            (Some(member), Some(container)) => member > container,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

const TRAILER_KEYS: [&[u8]; 4] = [ROOT, INFO, ENCRYPT, ID];

/// Scan the file for `N G obj` headers and `trailer` dictionaries.
pub(crate) fn repair(data: &[u8]) -> Result<Repaired> {
    let start = find(data, b"%PDF", 0).unwrap_or(0);
    let mut lexer = Lexer::new_at(data, start);

    let mut table = XRefTable::new();
    let mut trailer = Dict::new();
    let mut positions = FxHashMap::default();
    let mut object_streams = Vec::new();
    let mut catalog = None;

    // The last two tokens, if they were integers, with their start offsets.
    let mut ints: [Option<(i64, usize)>; 2] = [None, None];

    loop {
        let token = match lexer.next_token() {
            Ok(Token::Eof) => break,
            Ok(token) => token,
            Err(_) => {
                ints = [None, None];
                continue;
            }
        };

        let token_start = lexer.token_start();

        match token {
            Token::Int(n) => {
                ints = [ints[1], Some((n, token_start))];
                continue;
            }
            Token::Keyword(k) if &*k == b"obj" => {
                if let [Some((num, header)), Some((generation, _))] = ints
                    && let (Ok(num), Ok(generation)) = (u32::try_from(num), u16::try_from(generation))
                {
                    let id = ObjRef::new(num, generation);

                    match scan_object(data, lexer.offset(), id) {
                        Ok((object, resume)) => {
                            if let Some(dict) = object.as_dict() {
                                if dict.get_name(TYPE).is_some_and(|t| &**t == CATALOG) {
                                    catalog = Some(id);
                                }

                                if dict.get_name(TYPE).is_some_and(|t| &**t == OBJ_STM) {
                                    object_streams.push(id);
                                }

                                if dict.get_name(TYPE).is_some_and(|t| &**t == XREF) {
                                    merge_trailer(&mut trailer, dict);
                                }
                            }

                            table.set(num, EntryKind::InUse { offset: header }, generation);
                            table.cache(num, object, false);
                            positions.insert(num, header);
                            lexer.jump(resume);
                        }
                        Err(e) => warn!("skipping broken object {id} at offset {header}: {e}"),
                    }
                }
            }
            Token::Keyword(k) if &*k == b"trailer" => {
                let mut parser = Parser::new(data, lexer.offset());

                match parser.parse_object() {
                    Ok(Object::Dict(dict)) => {
                        merge_trailer(&mut trailer, &dict);
                        lexer.jump(parser.offset());
                    }
                    _ => warn!("skipping broken trailer at offset {token_start}"),
                }
            }
            _ => {}
        }

        ints = [None, None];
    }

    if positions.is_empty() {
        bail!(DocumentUnopenable, "no objects found while repairing");
    }

    if !trailer.contains_key(ROOT) {
        match catalog {
            Some(root) => {
                warn!("no trailer with /Root found, using catalog {root}");
                trailer.insert(ROOT, root);
            }
            None => warn!("no document catalog found"),
        }
    }

    table.ensure_len(1);
    trailer.insert(SIZE, table.len() as i64);
    table.finish();

    debug!("repaired cross-reference table with {} objects", positions.len());

    Ok(Repaired {
        table,
        trailer,
        object_streams,
        positions,
    })
}

fn merge_trailer(trailer: &mut Dict, dict: &Dict) {
    for key in TRAILER_KEYS {
        if let Some(value) = dict.get(key) {
            trailer.insert(key, value.clone());
        }
    }
}

/// Parse the body of an object whose `obj` keyword ends at `offset`, returning
/// the object and the offset to continue scanning at.
fn scan_object(data: &[u8], offset: usize, id: ObjRef) -> Result<(Object, usize)> {
    let mut parser = Parser::new(data, offset);

    let object = if parser.tokens().peek_nth(0)?.is_keyword(b"endobj") {
        Object::Null
    } else {
        parser.parse_object()?
    };

    if !parser.tokens().peek_nth(0)?.is_keyword(b"stream") {
        return Ok((object, parser.offset()));
    }

    parser.tokens().next()?;
    let keyword_end = parser.tokens().last_start() + b"stream".len();

    let Object::Dict(dict) = object else {
        bail!(SyntaxError, "stream of object {id} has no dictionary");
    };

    let start = stream_data_start(data, keyword_end);
    let mut dict = Rc::try_unwrap(dict).unwrap_or_else(|d| (*d).clone());

    let declared = match dict.get(LENGTH) {
        Some(Object::Ref(_)) => None,
        Some(length) => Some(length.as_int().and_then(|l| usize::try_from(l).ok())),
        None => Some(None),
    };

    let end = match declared {
        // Indirect lengths are resolved later on.
        None => scan_stream_end(data, start),
        Some(Some(len)) if followed_by_endstream(data, start.saturating_add(len)) => start + len,
        Some(declared) => {
            let end = scan_stream_end(data, start);

            if let Some(declared) = declared {
                warn!(
                    "stream of object {id} declares length {declared}, but has {}",
                    end - start
                );
            }

            dict.insert(LENGTH, (end - start) as i64);
            end
        }
    };

    let stream = Stream {
        dict,
        data: StreamData::File(start),
        id: Some(id),
    };

    Ok((Object::stream(stream), end))
}

pub(crate) fn followed_by_endstream(data: &[u8], pos: usize) -> bool {
    let Some(tail) = data.get(pos..) else {
        return false;
    };

    let skip = tail
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();

    tail[skip..].starts_with(b"endstream")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn scan_without_xref() {
        let data = b"%PDF-1.4\n\
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
2 0 obj << /Type /Pages /Kids [] /Count 0 >> endobj\n\
trailer << /Root 1 0 R >>\n";

        let repaired = repair(data).unwrap();
        assert_eq!(repaired.trailer.get_ref(ROOT), Some(ObjRef::new(1, 0)));
        assert_eq!(repaired.trailer.get_int(SIZE), Some(3));
        assert_eq!(
            repaired.table.get(2).unwrap().kind,
            EntryKind::InUse { offset: 58 }
        );
    }

    #[test]
    fn later_objects_win() {
        let data = b"%PDF-1.4\n1 0 obj (old) endobj\n1 0 obj (new) endobj\n";
        let repaired = repair(data).unwrap();

        let entry = repaired.table.get(1).unwrap();
        assert_eq!(entry.cached, Some(Object::string(b"new")));
    }

    #[test]
    fn catalog_fallback() {
        let data = b"%PDF-1.4\n4 0 obj << /Type /Catalog >> endobj\n";
        let repaired = repair(data).unwrap();

        assert_eq!(repaired.trailer.get_ref(ROOT), Some(ObjRef::new(4, 0)));
    }

    #[test]
    fn wrong_stream_length_is_corrected() {
        let data = b"%PDF-1.4\n1 0 obj << /Length 100 >>\nstream\nabcdef\nendstream\nendobj\n\
2 0 obj << /Type /Catalog >> endobj\n";

        let repaired = repair(data).unwrap();
        let stream = repaired.table.get(1).unwrap().cached.clone().unwrap();
        let stream = stream.as_stream().unwrap();

        assert_eq!(stream.dict.get_int(LENGTH), Some(6));
        assert!(repaired.table.get(2).unwrap().cached.is_some());
    }

    #[test]
    fn stream_data_that_looks_like_objects_is_skipped() {
        let data = b"%PDF-1.4\n1 0 obj << /Length 12 >>\nstream\n9 0 obj 1 e\nendstream\nendobj\n";
        let repaired = repair(data).unwrap();

        assert!(!repaired.table.get(9).is_some_and(|e| e.is_populated()));
    }

    #[test]
    fn highest_object_number() {
        let data = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\n4294967295 0 obj null endobj\n";
        let repaired = repair(data).unwrap();

        assert_eq!(repaired.table.len(), 4294967296);
        assert_eq!(repaired.trailer.get_int(SIZE), Some(4294967296));
        assert!(repaired.table.get(4294967295).is_some());
        assert!(repaired.table.get(2).is_none());
        assert_eq!(repaired.trailer.get_ref(ROOT), Some(ObjRef::new(1, 0)));
    }

    #[test]
    fn trailer_entries_are_merged() {
        let data = b"%PDF-1.4\n1 0 obj << >> endobj\n\
trailer << /Root 1 0 R /Info 5 0 R >>\n\
trailer << /Root 1 0 R /ID [(a) (b)] >>\n";

        let repaired = repair(data).unwrap();
        assert_eq!(repaired.trailer.get_ref(INFO), Some(ObjRef::new(5, 0)));
        assert!(repaired.trailer.get(ID).is_some());
    }

    #[test]
    fn nothing_to_repair() {
        let err = repair(b"%PDF-1.4\njust some text").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DocumentUnopenable);
    }
}
