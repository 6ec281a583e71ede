//! A small builder for synthesized PDF files.

#![allow(dead_code)]

use std::io::Write;

/// Builds a PDF file object by object, keeping track of offsets so that a
/// correct cross-reference section can be appended.
pub struct PdfBuilder {
    data: Vec<u8>,
    offsets: Vec<(u32, usize)>,
    compressed: Vec<(u32, u32, u32)>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::with_header("%PDF-1.7\n")
    }

    pub fn with_header(header: &str) -> Self {
        Self {
            data: header.as_bytes().to_vec(),
            offsets: Vec::new(),
            compressed: Vec::new(),
        }
    }

    /// Continue an existing file, e.g. for an incremental update.
    pub fn append_to(data: Vec<u8>) -> Self {
        Self {
            data,
            offsets: Vec::new(),
            compressed: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn object(&mut self, num: u32, body: &str) -> &mut Self {
        self.offsets.push((num, self.data.len()));
        write!(self.data, "{num} 0 obj\n{body}\nendobj\n").unwrap();

        self
    }

    /// Write a stream object. `/Length` is added to `dict_entries`.
    pub fn stream(&mut self, num: u32, dict_entries: &str, data: &[u8]) -> &mut Self {
        self.offsets.push((num, self.data.len()));
        write!(
            self.data,
            "{num} 0 obj\n<< {dict_entries} /Length {} >>\nstream\n",
            data.len()
        )
        .unwrap();
        self.data.extend_from_slice(data);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");

        self
    }

    /// Write an object stream holding the given objects. The members are
    /// recorded for a later cross-reference stream.
    pub fn object_stream(&mut self, num: u32, members: &[(u32, &str)]) -> &mut Self {
        let mut header = String::new();
        let mut body = String::new();

        for (index, (member, object)) in members.iter().enumerate() {
            header.push_str(&format!("{member} {} ", body.len()));
            body.push_str(object);
            body.push(' ');
            self.compressed.push((*member, num, index as u32));
        }

        let content = format!("{header}{body}");

        self.stream(
            num,
            &format!("/Type /ObjStm /N {} /First {}", members.len(), header.len()),
            content.as_bytes(),
        )
    }

    fn size(&self) -> u32 {
        self.offsets
            .iter()
            .map(|(n, _)| *n)
            .chain(self.compressed.iter().map(|(n, _, _)| *n))
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Append a classic cross-reference table with a single subsection
    /// covering all objects, followed by the trailer.
    pub fn finish(mut self, trailer: &str) -> Vec<u8> {
        let size = self.size();
        let xref = self.data.len();

        write!(self.data, "xref\n0 {size}\n").unwrap();

        for num in 0..size {
            match self.offsets.iter().rev().find(|(n, _)| *n == num) {
                Some((_, offset)) => write!(self.data, "{offset:010} 00000 n \n").unwrap(),
                None if num == 0 => self.data.extend_from_slice(b"0000000000 65535 f \n"),
                None => self.data.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }

        write!(
            self.data,
            "trailer\n<< /Size {size} {trailer} >>\nstartxref\n{xref}\n%%EOF\n"
        )
        .unwrap();

        self.data
    }

    /// Append an incremental-update table that only lists the objects
    /// written since `append_to`.
    pub fn finish_update(mut self, trailer: &str, prev: usize) -> Vec<u8> {
        let size = self.size();
        let xref = self.data.len();

        self.data.extend_from_slice(b"xref\n");

        for (num, offset) in self.offsets.clone() {
            write!(self.data, "{num} 1\n{offset:010} 00000 n \n").unwrap();
        }

        write!(
            self.data,
            "trailer\n<< /Size {size} /Prev {prev} {trailer} >>\nstartxref\n{xref}\n%%EOF\n"
        )
        .unwrap();

        self.data
    }

    /// Append a cross-reference stream (object `num`) with 1-4-2 byte wide
    /// fields.
    pub fn finish_with_xref_stream(mut self, num: u32, trailer: &str) -> Vec<u8> {
        let xref = self.data.len();
        self.offsets.push((num, xref));
        let size = self.size();

        let mut entries = Vec::new();

        for n in 0..size {
            if let Some((_, offset)) = self.offsets.iter().rev().find(|(o, _)| *o == n) {
                entries.push(1);
                entries.extend_from_slice(&(*offset as u32).to_be_bytes());
                entries.extend_from_slice(&[0, 0]);
            } else if let Some((_, container, index)) =
                self.compressed.iter().find(|(o, _, _)| *o == n)
            {
                entries.push(2);
                entries.extend_from_slice(&container.to_be_bytes());
                entries.extend_from_slice(&(*index as u16).to_be_bytes());
            } else {
                entries.push(0);
                entries.extend_from_slice(&[0, 0, 0, 0]);
                entries.extend_from_slice(if n == 0 { &[0xff, 0xff] } else { &[0, 0] });
            }
        }

        write!(
            self.data,
            "{num} 0 obj\n<< /Type /XRef /Size {size} /W [1 4 2] {trailer} /Length {} >>\nstream\n",
            entries.len()
        )
        .unwrap();
        self.data.extend_from_slice(&entries);
        write!(self.data, "\nendstream\nendobj\nstartxref\n{xref}\n%%EOF\n").unwrap();

        self.data
    }
}

/// Remove everything from the last `startxref` on, forcing a repair.
pub fn strip_startxref(mut data: Vec<u8>) -> Vec<u8> {
    let pos = data
        .windows(9)
        .rposition(|w| w == b"startxref")
        .expect("no startxref");
    data.truncate(pos);

    data
}

/// A minimal catalog, page tree and one page with the given content stream,
/// as objects 1 to 4.
pub fn single_page(builder: &mut PdfBuilder, content: &[u8]) {
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 200] /Contents 4 0 R >>",
        )
        .stream(4, "", content);
}

/// The offset named by the last `startxref` of a file.
pub fn startxref(data: &[u8]) -> usize {
    let pos = data
        .windows(9)
        .rposition(|w| w == b"startxref")
        .expect("no startxref");

    std::str::from_utf8(&data[pos + 9..])
        .unwrap()
        .split_whitespace()
        .next()
        .unwrap()
        .parse()
        .unwrap()
}
