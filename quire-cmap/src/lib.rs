/*!
CMaps and name trees for PDF documents.

A [`CMap`] maps character codes to CIDs (for the encoding of composite fonts)
or to UTF-16 code units (for `ToUnicode` maps). Mappings are added one by one
and then compacted with [`CMap::optimize`], after which lookups are binary
searches over a sorted list of ranges.

CMaps can be read from their text format with [`parse`], or loaded from the
`/Encoding` or `/ToUnicode` entry of a font with [`load`].

The [`name_tree`] module implements lookups in name and number trees, which
share the same sorted, range-keyed shape.

## Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod load;
pub mod name_tree;
mod parse;

pub use load::{CMapResolver, load};
pub use parse::parse;

use log::warn;
use smallvec::{SmallVec, smallvec};
use std::rc::Rc;

/// A character code.
pub type Code = u32;

/// The output sequence of a code, which is longer than one value only for
/// one-to-many mappings.
pub type Output = SmallVec<[u32; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// A single code mapped to `offset`.
    Single,
    /// Codes mapped to consecutive values starting at `offset`.
    Range,
    /// Codes mapped to the values of the table starting at `offset`.
    Table,
    /// A single code mapped to a sequence. The table holds the length of the
    /// sequence at `offset`, followed by the values.
    Multi,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    low: Code,
    high: Code,
    kind: Kind,
    offset: u32,
}

impl Entry {
    fn contains(&self, code: Code) -> bool {
        self.low <= code && code <= self.high
    }

    fn value(&self, code: Code, table: &[u32]) -> Option<u32> {
        let delta = code - self.low;

        match self.kind {
            Kind::Single => Some(self.offset),
            Kind::Range => self.offset.checked_add(delta),
            Kind::Table => table.get(self.offset as usize + delta as usize).copied(),
            Kind::Multi => table.get(self.offset as usize + 1).copied(),
        }
    }

    fn sequence<'a>(&self, table: &'a [u32]) -> &'a [u32] {
        let start = self.offset as usize;
        let len = table.get(start).copied().unwrap_or(0) as usize;

        table.get(start + 1..start + 1 + len).unwrap_or_default()
    }

    /// The part of the entry covering `low..=high`.
    fn slice(&self, low: Code, high: Code) -> Self {
        let offset = match self.kind {
            Kind::Single | Kind::Multi => self.offset,
            Kind::Range | Kind::Table => self.offset.saturating_add(low - self.low),
        };

        Self {
            low,
            high,
            kind: self.kind,
            offset,
        }
    }

    /// The number of table values owned by the entry.
    fn table_len(&self, table: &[u32]) -> usize {
        match self.kind {
            Kind::Single | Kind::Range => 0,
            Kind::Table => (self.high - self.low) as usize + 1,
            Kind::Multi => table.get(self.offset as usize).copied().unwrap_or(0) as usize + 1,
        }
    }
}

/// A range of valid codes of one byte width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Codespace {
    width: u8,
    low: [u8; 4],
    high: [u8; 4],
}

impl Codespace {
    /// Codes are compared byte-wise, so `<8140> <9FFC>` does not contain
    /// `<8200>`.
    fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() == self.width as usize
            && bytes
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(b, (lo, hi))| lo <= b && b <= hi)
    }
}

/// The writing mode of a CMap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritingMode {
    /// Horizontal writing mode.
    #[default]
    Horizontal,
    /// Vertical writing mode.
    Vertical,
}

/// The character collection a CMap refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidSystemInfo {
    /// The registry, e.g. `Adobe`.
    pub registry: Vec<u8>,
    /// The ordering, e.g. `Japan1`.
    pub ordering: Vec<u8>,
    /// The supplement number.
    pub supplement: i32,
}

/// A mapping from character codes to CIDs or Unicode values.
#[derive(Debug, Clone, Default)]
pub struct CMap {
    name: Option<Vec<u8>>,
    writing_mode: WritingMode,
    system_info: Option<CidSystemInfo>,
    entries: Vec<Entry>,
    table: Vec<u32>,
    codespaces: Vec<Codespace>,
    optimized: bool,
    parent: Option<Rc<Self>>,
}

impl CMap {
    /// Create an empty CMap.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `Identity-H` CMap.
    pub fn identity_h() -> Self {
        Self::identity(WritingMode::Horizontal)
    }

    /// The `Identity-V` CMap.
    pub fn identity_v() -> Self {
        Self::identity(WritingMode::Vertical)
    }

    fn identity(writing_mode: WritingMode) -> Self {
        let name = match writing_mode {
            WritingMode::Horizontal => b"Identity-H",
            WritingMode::Vertical => b"Identity-V",
        };

        let mut cmap = Self::new();
        cmap.name = Some(name.to_vec());
        cmap.writing_mode = writing_mode;
        cmap.system_info = Some(CidSystemInfo {
            registry: b"Adobe".to_vec(),
            ordering: b"Identity".to_vec(),
            supplement: 0,
        });
        cmap.add_codespace(2, 0, 0xFFFF);
        cmap.add_range(0, 0xFFFF, 0);
        cmap.optimize();

        cmap
    }

    /// The name of the CMap.
    pub fn name(&self) -> Option<&[u8]> {
        self.name.as_deref()
    }

    /// Set the name of the CMap.
    pub fn set_name(&mut self, name: &[u8]) {
        self.name = Some(name.to_vec());
    }

    /// The writing mode.
    pub fn writing_mode(&self) -> WritingMode {
        self.writing_mode
    }

    /// Set the writing mode.
    pub fn set_writing_mode(&mut self, writing_mode: WritingMode) {
        self.writing_mode = writing_mode;
    }

    /// The character collection, if declared.
    pub fn system_info(&self) -> Option<&CidSystemInfo> {
        self.system_info.as_ref()
    }

    /// Set the character collection.
    pub fn set_system_info(&mut self, info: CidSystemInfo) {
        self.system_info = Some(info);
    }

    /// The CMap that is consulted for codes without a mapping here.
    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    /// Set the parent CMap (`usecmap`).
    pub fn set_parent(&mut self, parent: Rc<Self>) {
        self.parent = Some(parent);
    }

    /// Whether the CMap has no mappings of its own.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map a single code to `dst`.
    pub fn add_single(&mut self, code: Code, dst: u32) {
        self.push(Entry {
            low: code,
            high: code,
            kind: Kind::Single,
            offset: dst,
        });
    }

    /// Map the codes `low..=high` to consecutive values starting at
    /// `dst_base`.
    pub fn add_range(&mut self, low: Code, high: Code, dst_base: u32) {
        if high < low {
            warn!("ignoring inverted CMap range {low:#x}..{high:#x}");
            return;
        }

        if low == high {
            return self.add_single(low, dst_base);
        }

        self.push(Entry {
            low,
            high,
            kind: Kind::Range,
            offset: dst_base,
        });
    }

    /// Map consecutive codes starting at `low` to the given values.
    pub fn add_table(&mut self, low: Code, values: &[u32]) {
        match values {
            [] => {}
            [single] => self.add_single(low, *single),
            _ => {
                let Some(high) = u32::try_from(values.len() - 1)
                    .ok()
                    .and_then(|len| low.checked_add(len))
                else {
                    warn!("CMap table at {low:#x} exceeds the code range");
                    return;
                };

                let offset = self.table_offset();
                self.table.extend_from_slice(values);
                self.push(Entry {
                    low,
                    high,
                    kind: Kind::Table,
                    offset,
                });
            }
        }
    }

    /// Map a single code to a sequence of values.
    pub fn add_one_to_many(&mut self, code: Code, dst: &[u32]) {
        match dst {
            [] => {}
            [single] => self.add_single(code, *single),
            _ => {
                let offset = self.table_offset();
                self.table.push(dst.len() as u32);
                self.table.extend_from_slice(dst);
                self.push(Entry {
                    low: code,
                    high: code,
                    kind: Kind::Multi,
                    offset,
                });
            }
        }
    }

    /// Declare the codes `low..=high` of `width` bytes as valid.
    pub fn add_codespace(&mut self, width: u8, low: Code, high: Code) {
        if !(1..=4).contains(&width) {
            warn!("ignoring codespace range of width {width}");
            return;
        }

        let skip = 4 - width as usize;
        let mut codespace = Codespace {
            width,
            low: [0; 4],
            high: [0; 4],
        };
        codespace.low[..width as usize].copy_from_slice(&low.to_be_bytes()[skip..]);
        codespace.high[..width as usize].copy_from_slice(&high.to_be_bytes()[skip..]);

        self.codespaces.push(codespace);
    }

    fn table_offset(&self) -> u32 {
        self.table.len() as u32
    }

    fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
        self.optimized = false;
    }

    /// Sort and compact the mappings.
    ///
    /// Where mappings overlap, the one added last wins, just like for lookups
    /// before optimizing. Adjacent mappings are then merged: two singles into
    /// a range (if their values are consecutive) or a table, and a single into
    /// a preceding range with the next value or into a preceding table.
    pub fn optimize(&mut self) {
        if self.optimized {
            return;
        }

        let resolved = resolve_overlaps(&self.entries);
        let mut table = Vec::with_capacity(self.table.len());
        let mut merged: Vec<Entry> = Vec::with_capacity(resolved.len());

        for mut entry in resolved {
            let len = entry.table_len(&self.table);

            if len > 0 {
                let start = entry.offset as usize;
                entry.offset = table.len() as u32;
                table.extend_from_slice(self.table.get(start..start + len).unwrap_or_default());
            }

            if let Some(last) = merged.last_mut()
                && merge(last, &entry, &mut table)
            {
                continue;
            }

            merged.push(entry);
        }

        self.entries = merged;
        self.table = table;
        self.optimized = true;
    }

    fn find(&self, code: Code) -> Option<&Entry> {
        if self.optimized {
            let idx = self.entries.partition_point(|e| e.high < code);
            self.entries.get(idx).filter(|e| e.low <= code)
        } else {
            self.entries.iter().rev().find(|e| e.contains(code))
        }
    }

    /// Look up the value of a code. For one-to-many mappings, this is the
    /// first value of the sequence.
    ///
    /// Codes without a mapping are looked up in the parent CMap.
    pub fn lookup(&self, code: Code) -> Option<u32> {
        match self.find(code) {
            Some(entry) => entry.value(code, &self.table),
            None => self.parent.as_ref()?.lookup(code),
        }
    }

    /// Look up the whole output sequence of a code.
    pub fn lookup_full(&self, code: Code) -> Option<Output> {
        match self.find(code) {
            Some(entry) if entry.kind == Kind::Multi => {
                Some(SmallVec::from_slice(entry.sequence(&self.table)))
            }
            Some(entry) => entry.value(code, &self.table).map(|v| smallvec![v]),
            None => self.parent.as_ref()?.lookup_full(code),
        }
    }

    /// Look up a code in a `ToUnicode` CMap, decoding the UTF-16 output.
    pub fn lookup_unicode(&self, code: Code) -> Option<String> {
        let units = self
            .lookup_full(code)?
            .iter()
            .map(|u| u16::try_from(*u).ok())
            .collect::<Option<Vec<_>>>()?;

        String::from_utf16(&units).ok()
    }

    fn codespaces(&self) -> &[Codespace] {
        match &self.parent {
            Some(parent) if self.codespaces.is_empty() => parent.codespaces(),
            _ => &self.codespaces,
        }
    }

    /// Decode the next code from a string, returning the code and the number
    /// of bytes it occupies.
    ///
    /// Bytes that match no codespace range are consumed with the width of the
    /// narrowest range. Returns `None` for empty input.
    pub fn decode_next(&self, bytes: &[u8]) -> Option<(Code, usize)> {
        if bytes.is_empty() {
            return None;
        }

        let codespaces = self.codespaces();

        for width in 1..=bytes.len().min(4) {
            let candidate = &bytes[..width];

            if codespaces.iter().any(|c| c.matches(candidate)) {
                return Some((to_code(candidate), width));
            }
        }

        let width = codespaces
            .iter()
            .map(|c| c.width as usize)
            .min()
            .unwrap_or(1)
            .min(bytes.len());

        Some((to_code(&bytes[..width]), width))
    }

    /// Iterate over the codes of a string.
    pub fn codes<'a>(&'a self, bytes: &'a [u8]) -> impl Iterator<Item = (Code, &'a [u8])> + 'a {
        let mut rest = bytes;

        std::iter::from_fn(move || {
            let (code, len) = self.decode_next(rest)?;
            let (head, tail) = rest.split_at(len);
            rest = tail;

            Some((code, head))
        })
    }
}

fn to_code(bytes: &[u8]) -> Code {
    bytes.iter().fold(0, |acc, b| (acc << 8) | u32::from(*b))
}

/// Turn the entries (in the order they were added) into a sorted list without
/// overlaps, where later entries cut out the codes they share with earlier
/// ones.
fn resolve_overlaps(entries: &[Entry]) -> Vec<Entry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.low);

    if sorted.windows(2).all(|w| w[0].high < w[1].low) {
        return sorted;
    }

    let mut out: Vec<Entry> = Vec::with_capacity(entries.len());

    for entry in entries {
        let start = out.partition_point(|e| e.high < entry.low);
        let end = out.partition_point(|e| e.low <= entry.high);

        let mut replacement = SmallVec::<[Entry; 3]>::new();

        if let Some(first) = out[start..end].first()
            && first.low < entry.low
        {
            replacement.push(first.slice(first.low, entry.low - 1));
        }

        replacement.push(*entry);

        if let Some(last) = out[start..end].last()
            && last.high > entry.high
        {
            replacement.push(last.slice(entry.high + 1, last.high));
        }

        out.splice(start..end, replacement);
    }

    out
}

/// Try to merge `next` into `last`.
///
/// A table in `last` always owns the tail of `table`.
fn merge(last: &mut Entry, next: &Entry, table: &mut Vec<u32>) -> bool {
    if last.high.checked_add(1) != Some(next.low) {
        return false;
    }

    let follows = |e: &Entry| {
        e.offset
            .checked_add(e.high - e.low)
            .and_then(|v| v.checked_add(1))
            == Some(next.offset)
    };

    match (last.kind, next.kind) {
        (Kind::Single, Kind::Single) => {
            if follows(last) {
                last.kind = Kind::Range;
            } else {
                let offset = table.len() as u32;
                table.push(last.offset);
                table.push(next.offset);
                last.kind = Kind::Table;
                last.offset = offset;
            }
        }
        (Kind::Range, Kind::Single | Kind::Range) if follows(last) => {}
        (Kind::Table, Kind::Single) => table.push(next.offset),
        _ => return false,
    }

    last.high = next.high;

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(cmap: &CMap) -> Vec<Kind> {
        cmap.entries.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn range_lookup() {
        let mut cmap = CMap::new();
        cmap.add_range(0x41, 0x5A, 0x61);
        cmap.optimize();

        assert_eq!(cmap.lookup(0x41), Some(0x61));
        assert_eq!(cmap.lookup(0x5A), Some(0x7A));
        assert_eq!(cmap.lookup(0x5B), None);
        assert_eq!(cmap.lookup(0x40), None);
    }

    #[test]
    fn singles_merge_into_ranges_and_tables() {
        let mut cmap = CMap::new();
        cmap.add_single(1, 10);
        cmap.add_single(2, 11);
        cmap.add_single(3, 12);
        cmap.add_single(10, 5);
        cmap.add_single(11, 9);
        cmap.add_single(12, 2);
        cmap.add_single(20, 0);
        cmap.optimize();

        assert_eq!(kinds(&cmap), [Kind::Range, Kind::Table, Kind::Single]);
        assert_eq!(cmap.lookup(2), Some(11));
        assert_eq!(cmap.lookup(3), Some(12));
        assert_eq!(cmap.lookup(10), Some(5));
        assert_eq!(cmap.lookup(11), Some(9));
        assert_eq!(cmap.lookup(12), Some(2));
        assert_eq!(cmap.lookup(13), None);
        assert_eq!(cmap.lookup(20), Some(0));
    }

    #[test]
    fn adjacent_ranges_merge() {
        let mut cmap = CMap::new();
        cmap.add_range(0x10, 0x1F, 100);
        cmap.add_range(0x20, 0x2F, 116);
        cmap.add_range(0x30, 0x3F, 0);
        cmap.optimize();

        assert_eq!(kinds(&cmap), [Kind::Range, Kind::Range]);
        assert_eq!(cmap.lookup(0x2F), Some(131));
        assert_eq!(cmap.lookup(0x30), Some(0));
    }

    #[test]
    fn later_mappings_win() {
        let mut cmap = CMap::new();
        cmap.add_range(0, 99, 1000);
        cmap.add_single(50, 7);
        cmap.add_table(60, &[1, 2, 3]);
        cmap.add_range(98, 120, 0);

        let before: Vec<_> = (0..130).map(|c| cmap.lookup(c)).collect();
        assert_eq!(before[50], Some(7));
        assert_eq!(before[61], Some(2));
        assert_eq!(before[97], Some(1097));
        assert_eq!(before[98], Some(0));

        cmap.optimize();
        let after: Vec<_> = (0..130).map(|c| cmap.lookup(c)).collect();

        assert_eq!(before, after);
    }

    #[test]
    fn one_to_many() {
        let mut cmap = CMap::new();
        cmap.add_one_to_many(5, &[0x66, 0x66, 0x69]);
        cmap.add_single(6, 0x41);
        cmap.optimize();

        assert_eq!(cmap.lookup(5), Some(0x66));
        assert_eq!(cmap.lookup_full(5).unwrap().as_slice(), &[0x66, 0x66, 0x69]);
        assert_eq!(cmap.lookup_full(6).unwrap().as_slice(), &[0x41]);
        assert_eq!(cmap.lookup_unicode(5).as_deref(), Some("ffi"));
    }

    #[test]
    fn surrogate_pairs() {
        let mut cmap = CMap::new();
        cmap.add_one_to_many(1, &[0xD835, 0xDC00]);

        assert_eq!(cmap.lookup_unicode(1).as_deref(), Some("\u{1D400}"));
    }

    #[test]
    fn parent_fallback() {
        let mut parent = CMap::new();
        parent.add_codespace(1, 0x00, 0xFF);
        parent.add_range(0, 0xFF, 1000);
        parent.optimize();

        let mut child = CMap::new();
        child.add_single(0x20, 1);
        child.set_parent(Rc::new(parent));
        child.optimize();

        assert_eq!(child.lookup(0x20), Some(1));
        assert_eq!(child.lookup(0x21), Some(1033));
        assert_eq!(child.decode_next(&[0x21, 0x22]), Some((0x21, 1)));
    }

    #[test]
    fn mixed_width_codespaces() {
        let mut cmap = CMap::new();
        cmap.add_codespace(1, 0x00, 0x80);
        cmap.add_codespace(2, 0x8140, 0x9FFC);

        let data = [0x41, 0x81, 0x40, 0x82, 0x00, 0xA0];
        let codes: Vec<_> = cmap.codes(&data).map(|(c, _)| c).collect();

        // 0x82 0x00 is outside of the byte-wise ranges of the second codespace.
        assert_eq!(codes, [0x41, 0x8140, 0x82, 0x00, 0xA0]);
    }

    #[test]
    fn decode_without_codespaces() {
        let cmap = CMap::new();

        assert_eq!(cmap.decode_next(&[]), None);
        assert_eq!(cmap.decode_next(&[1, 2]), Some((1, 1)));
    }

    #[test]
    fn identity() {
        let cmap = CMap::identity_v();

        assert_eq!(cmap.writing_mode(), WritingMode::Vertical);
        assert_eq!(cmap.name(), Some(&b"Identity-V"[..]));
        assert_eq!(cmap.decode_next(&[0x12, 0x34, 0x56]), Some((0x1234, 2)));
        assert_eq!(cmap.lookup(0x1234), Some(0x1234));
        // A trailing odd byte is consumed as a narrower code.
        assert_eq!(cmap.decode_next(&[0x56]), Some((0x56, 1)));
    }
}
