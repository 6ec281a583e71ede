//! Reading the cross-reference table.
//!
//! Loading walks through the phases of [`LoadPhase`]: the version header is
//! located, then the `startxref` offset at the end of the file, and finally the
//! chain of cross-reference sections, newest first. Each section is either a
//! classic `xref` table or a cross-reference stream. Entries of newer sections
//! are never overwritten by older ones.
//!
//! If any of this fails, the caller falls back to [`crate::repair`].

use crate::error::{ErrorKind, Result, ResultExt, bail, err};
use crate::filter::{CodecRegistry, FilterChain, Stage, stream_filters};
use crate::object::keys::{INDEX, LENGTH, PREV, SIZE, W, XREF_STM};
use crate::object::{Dict, Object, StreamData};
use crate::parser::Parser;
use crate::reader::Reader;
use crate::util::{find, rfind};
use log::{debug, trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// The state of an entry of the cross-reference table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// No section described the object (yet).
    Missing,
    /// A free object, linked to the next free object number.
    Free {
        /// The next free object number.
        next: u32,
    },
    /// An object stored at a byte offset of the file.
    InUse {
        /// The offset of the `N G obj` header.
        offset: usize,
    },
    /// An object stored in an object stream.
    InObjectStream {
        /// The object number of the object stream.
        container: u32,
        /// The index of the object within the object stream.
        index: u32,
    },
}

/// An entry of the cross-reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct XRefEntry {
    /// Where the object is stored.
    pub kind: EntryKind,
    /// The generation number.
    pub generation: u16,
    pub(crate) cached: Option<Object>,
    // Whether the strings of the cached object have been decrypted.
    pub(crate) decrypted: bool,
}

impl XRefEntry {
    fn new(kind: EntryKind, generation: u16) -> Self {
        Self {
            kind,
            generation,
            cached: None,
            decrypted: false,
        }
    }

    /// Whether the entry has been populated by some section.
    pub fn is_populated(&self) -> bool {
        self.kind != EntryKind::Missing
    }
}

/// The cross-reference table, indexed by object number.
///
/// Only populated entries are stored, so a huge `/Size` or object number
/// costs nothing beyond the entries that actually exist.
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: FxHashMap<u32, XRefEntry>,
    len: usize,
}

impl XRefTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries, i.e. one more than the highest object number.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `num` lies within the table, populated or not.
    pub fn contains(&self, num: u32) -> bool {
        (num as usize) < self.len
    }

    /// The entry of an object number, if some section populated it.
    pub fn get(&self, num: u32) -> Option<&XRefEntry> {
        self.entries.get(&num)
    }

    pub(crate) fn get_mut(&mut self, num: u32) -> Option<&mut XRefEntry> {
        self.entries.get_mut(&num)
    }

    /// Iterate over all populated entries in object number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> + '_ {
        let mut entries: Vec<_> = self.entries.iter().map(|(num, e)| (*num, e)).collect();
        entries.sort_unstable_by_key(|(num, _)| *num);

        entries.into_iter()
    }

    /// Grow the table so that it has at least `len` entries.
    pub fn ensure_len(&mut self, len: usize) {
        self.len = self.len.max(len);
    }

    /// Populate an entry unless an earlier (newer) section already did.
    /// Returns whether the entry was written.
    pub fn set_if_missing(&mut self, num: u32, kind: EntryKind, generation: u16) -> bool {
        if self.entries.get(&num).is_some_and(XRefEntry::is_populated) {
            return false;
        }

        self.set(num, kind, generation);

        true
    }

    /// Overwrite an entry, dropping any cached object.
    pub fn set(&mut self, num: u32, kind: EntryKind, generation: u16) {
        self.ensure_len(num as usize + 1);
        self.entries.insert(num, XRefEntry::new(kind, generation));
    }

    /// Cache a parsed object in the entry of `num`.
    pub(crate) fn cache(&mut self, num: u32, object: Object, decrypted: bool) {
        if let Some(entry) = self.entries.get_mut(&num) {
            entry.cached = Some(object);
            entry.decrypted = decrypted;
        }
    }

    /// Apply the fixups that hold for every loaded table: object 0 heads the
    /// free list, and in-use entries pointing at offset 0 with generation 0 are
    /// writer artifacts that are treated as free.
    pub(crate) fn finish(&mut self) {
        self.set(0, EntryKind::Free { next: 0 }, 65535);

        for (num, entry) in self.entries.iter_mut().filter(|(num, _)| **num != 0) {
            if entry.kind == (EntryKind::InUse { offset: 0 })
                && entry.generation == 0
                && entry.cached.is_none()
            {
                trace!("treating object {num} at offset 0 as free");
                entry.kind = EntryKind::Free { next: 0 };
            }
        }
    }
}

/// A `%PDF-M.m` version.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdfVersion {
    /// The major version.
    pub major: u8,
    /// The minor version.
    pub minor: u8,
}

impl PdfVersion {
    /// Parse a version such as `1.7`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        let major = u8::try_from(r.read_unsigned()?).ok()?;
        r.forward_tag(b".")?;
        let minor = u8::try_from(r.read_unsigned()?).ok()?;

        Some(Self { major, minor })
    }
}

impl fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The phases of loading a cross-reference table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    /// Nothing has been read.
    Start,
    /// Looking for the `%PDF-` header.
    ReadVersionHeader,
    /// Looking for `startxref` at the end of the file.
    ReadStartXrefOffset,
    /// Walking the chain of cross-reference sections.
    ReadTrailerChain,
    /// The table is complete.
    Ready,
}

/// The result of loading the cross-reference data.
#[derive(Debug, Clone)]
pub struct LoadedXRef {
    /// The table.
    pub table: XRefTable,
    /// The newest trailer dictionary.
    pub trailer: Dict,
    /// The version from the file header.
    pub version: Option<PdfVersion>,
}

/// Load the cross-reference table of a file.
pub fn load(data: &[u8]) -> Result<LoadedXRef> {
    let mut phase = LoadPhase::Start;
    let mut version = None;
    let mut startxref = 0;
    let mut table = XRefTable::new();
    let mut trailer = Dict::new();

    loop {
        trace!("xref loading: {phase:?}");

        phase = match phase {
            LoadPhase::Start => LoadPhase::ReadVersionHeader,
            LoadPhase::ReadVersionHeader => {
                version = find_version(data);

                if version.is_none() {
                    warn!("missing PDF version header");
                }

                LoadPhase::ReadStartXrefOffset
            }
            LoadPhase::ReadStartXrefOffset => {
                startxref = find_startxref(data)?;
                LoadPhase::ReadTrailerChain
            }
            LoadPhase::ReadTrailerChain => {
                trailer = read_chain(data, startxref, &mut table)
                    .context(ErrorKind::SyntaxError, "failed to read cross-reference sections")?;
                LoadPhase::Ready
            }
            LoadPhase::Ready => break,
        };
    }

    table.finish();
    debug!("loaded cross-reference table with {} entries", table.len());

    Ok(LoadedXRef {
        table,
        trailer,
        version,
    })
}

/// Find the `%PDF-M.m` header within the first 1024 bytes.
pub fn find_version(data: &[u8]) -> Option<PdfVersion> {
    let head = &data[..data.len().min(1024)];
    let pos = find(head, b"%PDF-", 0)?;

    PdfVersion::parse(&data[pos + 5..])
}

/// Find the offset named by the last `startxref` of the file.
pub fn find_startxref(data: &[u8]) -> Result<usize> {
    let end = match rfind(data, b"%%EOF", data.len()) {
        Some(pos) => pos,
        None => {
            warn!("missing %%EOF marker");
            data.len()
        }
    };

    let pos = rfind(data, b"startxref", end)
        .ok_or_else(|| err!(SyntaxError, "missing startxref"))?;

    let mut r = Reader::new_with(data, pos + b"startxref".len());
    r.skip_white_spaces_and_comments();

    let offset = r
        .read_unsigned()
        .ok_or_else(|| err!(SyntaxError, "invalid startxref offset"))?;

    match usize::try_from(offset) {
        Ok(offset) if offset < data.len() => Ok(offset),
        _ => bail!(SyntaxError, "startxref offset {offset} is out of bounds"),
    }
}

/// Read all sections starting at `start`, returning the newest trailer.
fn read_chain(data: &[u8], start: usize, table: &mut XRefTable) -> Result<Dict> {
    let mut visited = FxHashSet::default();
    let mut newest = None;
    let mut next = Some(start);

    while let Some(offset) = next {
        if !visited.insert(offset) {
            warn!("cycle in the /Prev chain at offset {offset}");
            break;
        }

        let section = read_section(data, offset, table, &[])?;

        if let Some(stm) = offset_entry(&section.trailer, XREF_STM)
            && visited.insert(stm)
        {
            // The stream of a hybrid file may describe objects the table
            // listed as free.
            if let Err(e) = read_section(data, stm, table, &section.freed) {
                warn!("failed to read /XRefStm section: {e}");
            }
        }

        next = offset_entry(&section.trailer, PREV);

        if newest.is_none() {
            newest = Some(section.trailer);
        }
    }

    newest.ok_or_else(|| err!(SyntaxError, "no cross-reference section"))
}

fn offset_entry(dict: &Dict, key: &[u8]) -> Option<usize> {
    dict.get_int(key).and_then(|v| usize::try_from(v).ok())
}

struct Section {
    trailer: Dict,
    // Object numbers a classic table marked as free.
    freed: Vec<u32>,
}

fn read_section(
    data: &[u8],
    offset: usize,
    table: &mut XRefTable,
    replaceable: &[u32],
) -> Result<Section> {
    let mut r = Reader::new_with(data, offset);
    r.skip_white_spaces_and_comments();

    match r.peek_byte() {
        Some(b'x') => read_table_section(data, r.offset(), table),
        Some(b) if b.is_ascii_digit() => {
            read_stream_section(data, r.offset(), table, replaceable).map(|trailer| Section {
                trailer,
                freed: Vec::new(),
            })
        }
        _ => bail!(SyntaxError, "no cross-reference section at offset {offset}"),
    }
}

fn read_table_section(data: &[u8], offset: usize, table: &mut XRefTable) -> Result<Section> {
    let mut r = Reader::new_with(data, offset);

    r.forward_tag(b"xref")
        .ok_or_else(|| err!(SyntaxError, "expected xref at offset {offset}"))?;

    let mut records = Vec::new();

    loop {
        r.skip_white_spaces_and_comments();

        if r.peek_tag(b"trailer") {
            break;
        }

        let (Some(start), Some(count)) = (read_number(&mut r), read_number(&mut r)) else {
            bail!(SyntaxError, "invalid xref subsection header at offset {}", r.offset());
        };

        let mut start = start;

        for i in 0..count {
            let Some((field1, generation, kind)) = read_record(&mut r) else {
                bail!(SyntaxError, "invalid xref record at offset {}", r.offset());
            };

            if i == 0 && start == 1 && kind == b'f' && field1 == 0 && generation == 65535 {
                warn!("xref subsection starts at 1 instead of 0");
                start = 0;
            }

            let generation = u16::try_from(generation).unwrap_or(u16::MAX);
            let entry = match kind {
                b'n' => EntryKind::InUse {
                    offset: field1 as usize,
                },
                _ => EntryKind::Free {
                    next: u32::try_from(field1).unwrap_or(0),
                },
            };

            let num = u32::try_from(start + i)
                .map_err(|_| err!(SyntaxError, "object number out of range"))?;
            records.push((num, entry, generation));
        }
    }

    r.forward_tag(b"trailer")
        .ok_or_else(|| err!(SyntaxError, "expected trailer"))?;

    let mut parser = Parser::new(data, r.offset());
    let trailer = match parser.parse_object()? {
        Object::Dict(d) => (*d).clone(),
        other => bail!(SyntaxError, "trailer is a {}, not a dictionary", other.type_name()),
    };

    let size = trailer_size(&trailer)?;
    let described = records.iter().map(|r| r.0 as usize + 1).max().unwrap_or(0);

    if described > size {
        warn!("xref subsections describe {described} objects, but /Size is {size}");
    }

    table.ensure_len(size.max(described));

    let mut freed = Vec::new();

    for (num, kind, generation) in records {
        if table.set_if_missing(num, kind, generation) && matches!(kind, EntryKind::Free { .. }) {
            freed.push(num);
        }
    }

    Ok(Section { trailer, freed })
}

fn trailer_size(trailer: &Dict) -> Result<usize> {
    trailer
        .get_int(SIZE)
        .and_then(|s| usize::try_from(s).ok())
        .ok_or_else(|| err!(MissingRequiredEntry, "trailer has no valid /Size"))
}

fn read_number(r: &mut Reader<'_>) -> Option<u64> {
    r.skip_white_spaces();
    r.read_unsigned()
}

// `%010u %05u %c`, tolerating irregular white space between the fields.
fn read_record(r: &mut Reader<'_>) -> Option<(u64, u64, u8)> {
    let field1 = read_number(r)?;
    let generation = read_number(r)?;
    r.skip_white_spaces();

    let kind = match r.read_byte()? {
        b @ (b'n' | b'f') => b,
        _ => return None,
    };

    Some((field1, generation, kind))
}

fn read_stream_section(
    data: &[u8],
    offset: usize,
    table: &mut XRefTable,
    replaceable: &[u32],
) -> Result<Dict> {
    let (id, object) = Parser::new(data, offset).parse_indirect_object()?;

    let Object::Stream(stream) = object else {
        bail!(SyntaxError, "object {id} is not a cross-reference stream");
    };

    let dict = &stream.dict;
    let size = trailer_size(dict)?;

    let widths = dict
        .get_array(W)
        .filter(|w| w.len() == 3)
        .and_then(|w| {
            w.iter()
                .map(|v| v.as_int().and_then(|n| usize::try_from(n).ok()))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| err!(MissingRequiredEntry, "cross-reference stream has no valid /W"))?;

    if widths.iter().any(|w| *w > 8) {
        bail!(SyntaxError, "cross-reference stream field is wider than 8 bytes");
    }

    let subsections = match dict.get_array(INDEX) {
        Some(index) => index
            .chunks_exact(2)
            .filter_map(|pair| {
                let start = u32::try_from(pair[0].as_int()?).ok()?;
                let count = u32::try_from(pair[1].as_int()?).ok()?;

                Some((start, count))
            })
            .collect(),
        None => vec![(0, u32::try_from(size).unwrap_or(u32::MAX))],
    };

    let StreamData::File(start) = stream.data else {
        bail!(SyntaxError, "cross-reference stream has no data");
    };

    let raw = raw_stream_data(data, start, dict.get(LENGTH));

    let mut chain = FilterChain::new();

    for (filter, params) in stream_filters(dict, Object::clone)? {
        chain.push(Stage::Decode { filter, params });
    }

    // Cross-reference streams are never encrypted.
    let decoded = chain.apply(raw.to_vec(), &CodecRegistry::new())?.data;

    table.ensure_len(size);

    let entry_len: usize = widths.iter().sum();
    let mut rows = decoded.chunks_exact(entry_len.max(1));

    'outer: for (first, count) in subsections {
        for num in first..first.saturating_add(count) {
            let Some(row) = rows.next() else {
                warn!("cross-reference stream data ends early");
                break 'outer;
            };

            let (f0, rest) = row.split_at(widths[0]);
            let (f1, f2) = rest.split_at(widths[1]);

            let kind_field = if widths[0] == 0 { 1 } else { be_number(f0) };
            let field1 = be_number(f1);
            let field2 = be_number(f2);

            let (kind, generation) = match kind_field {
                0 => (
                    EntryKind::Free {
                        next: u32::try_from(field1).unwrap_or(0),
                    },
                    u16::try_from(field2).unwrap_or(u16::MAX),
                ),
                1 => (
                    EntryKind::InUse {
                        offset: usize::try_from(field1).unwrap_or(usize::MAX),
                    },
                    u16::try_from(field2).unwrap_or(u16::MAX),
                ),
                2 => (
                    EntryKind::InObjectStream {
                        container: u32::try_from(field1).unwrap_or(u32::MAX),
                        index: u32::try_from(field2).unwrap_or(u32::MAX),
                    },
                    0,
                ),
                other => {
                    trace!("ignoring xref stream entry of type {other}");
                    continue;
                }
            };

            if replaceable.contains(&num) {
                table.set(num, kind, generation);
            } else {
                table.set_if_missing(num, kind, generation);
            }
        }
    }

    Ok(dict.clone())
}

fn be_number(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, b| (acc << 8) | *b as u64)
}

/// The raw data of a stream whose length entry might be indirect. Without a
/// usable direct length, the data extends up to the next `endstream`.
pub(crate) fn raw_stream_data<'a>(data: &'a [u8], start: usize, length: Option<&Object>) -> &'a [u8] {
    let declared = length
        .and_then(Object::as_int)
        .and_then(|l| usize::try_from(l).ok())
        .filter(|l| start.checked_add(*l).is_some_and(|end| end <= data.len()));

    let end = match declared {
        Some(len) => start + len,
        None => scan_stream_end(data, start),
    };

    &data[start.min(data.len())..end]
}

/// The end of stream data that starts at `start`, found by looking for
/// `endstream`. The end-of-line marker before the keyword is not part of the
/// data.
pub(crate) fn scan_stream_end(data: &[u8], start: usize) -> usize {
    let Some(mut end) = find(data, b"endstream", start) else {
        return data.len().max(start);
    };

    if end > start && data[end - 1] == b'\n' {
        end -= 1;
    }

    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }

    end
}
