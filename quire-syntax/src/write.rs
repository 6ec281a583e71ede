//! Serializing objects back to PDF syntax.

use crate::object::{Dict, Name, ObjRef, Object, StreamData};
use crate::trivia::is_regular_character;
use std::io::Write;

impl Object {
    /// Serialize the object in PDF syntax.
    ///
    /// Streams are written as their dictionary only, since the raw data of a
    /// file-backed stream is not available here. Use [`write_indirect`] to write
    /// a stream together with its data.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Null => out.extend_from_slice(b"null"),
            Self::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            Self::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Self::Real(r) => write_real(*r, out),
            Self::Name(n) => write_name(n, out),
            Self::String(s) => write_string(s, out),
            Self::Array(items) => {
                out.push(b'[');

                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }

                    item.write_to(out);
                }

                out.push(b']');
            }
            Self::Dict(dict) => write_dict(dict, out),
            Self::Ref(r) => write_ref(*r, out),
            Self::Stream(s) => write_dict(&s.dict, out),
        }
    }

    /// Serialize the object into a new buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);

        out
    }
}

/// Write `N G obj ... endobj`.
///
/// For streams, `data` provides the raw bytes; for in-memory streams it may be
/// omitted. The `/Length` entry is rewritten to match the data.
pub fn write_indirect(id: ObjRef, object: &Object, data: Option<&[u8]>, out: &mut Vec<u8>) {
    let _ = writeln!(out, "{} {} obj", id.num, id.generation);

    match object {
        Object::Stream(stream) => {
            let data: &[u8] = match (&stream.data, data) {
                (_, Some(data)) => data,
                (StreamData::Memory(m), None) => &m[..],
                (StreamData::File(_), None) => &[],
            };

            let mut dict = stream.dict.clone();
            dict.insert(Name::new(b"Length"), Object::Int(data.len() as i64));
            write_dict(&dict, out);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(data);
            out.extend_from_slice(b"\nendstream");
        }
        other => other.write_to(out),
    }

    out.extend_from_slice(b"\nendobj\n");
}

fn write_ref(r: ObjRef, out: &mut Vec<u8>) {
    let _ = write!(out, "{} {} R", r.num, r.generation);
}

fn write_dict(dict: &Dict, out: &mut Vec<u8>) {
    out.extend_from_slice(b"<<");

    for (key, value) in dict.iter() {
        write_name(key, out);
        out.push(b' ');
        value.write_to(out);
    }

    out.extend_from_slice(b">>");
}

fn write_real(r: f64, out: &mut Vec<u8>) {
    if !r.is_finite() {
        out.push(b'0');
        return;
    }

    if r == r.trunc() && r.abs() < 1e15 {
        let _ = write!(out, "{}.0", r as i64);
        return;
    }

    // Plain decimal notation, since PDF has no exponent syntax.
    let mut text = format!("{r:.10}");

    while text.ends_with('0') {
        text.pop();
    }

    if text.ends_with('.') {
        text.push('0');
    }

    out.extend_from_slice(text.as_bytes());
}

fn write_name(name: &Name, out: &mut Vec<u8>) {
    out.push(b'/');

    for &b in name.iter() {
        if is_regular_character(b) && b != b'#' && (0x21..=0x7E).contains(&b) {
            out.push(b);
        } else {
            let _ = write!(out, "#{b:02X}");
        }
    }
}

fn write_string(s: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');

    for &b in s {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x20..=0x7E => out.push(b),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }

    out.push(b')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, parse_object};

    fn round_trip(input: &[u8]) {
        let obj = parse_object(input).unwrap();
        let written = obj.to_bytes();
        let reparsed = parse_object(&written).unwrap();

        assert_eq!(obj, reparsed, "{}", String::from_utf8_lossy(&written));
    }

    #[test]
    fn round_trips() {
        round_trip(b"<< /Type /Page /MediaBox [0 0 612.5 792] /Parent 3 0 R >>");
        round_trip(b"(nested (parens) and \\\\ backslash \\n\\003)");
        round_trip(b"/A#20B#23C");
        round_trip(b"[true false null -17 0.000123 <00FF>]");
        round_trip(b"<< /Empty << >> /Arr [[] [1 [2]]] >>");
    }

    #[test]
    fn stream_with_data() {
        let mut dict = Dict::new();
        dict.insert(Name::new(b"Length"), Object::Int(99));
        let stream = crate::object::Stream::from_memory(dict, b"BT ET".as_slice());

        let mut out = Vec::new();
        write_indirect(ObjRef::new(4, 1), &Object::stream(stream), None, &mut out);

        let (id, obj) = Parser::new(&out, 0).parse_indirect_object().unwrap();
        assert_eq!(id, ObjRef::new(4, 1));
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.dict.get_int(b"Length"), Some(5));

        let StreamData::File(start) = stream.data else {
            panic!("expected file stream");
        };
        assert_eq!(&out[start..start + 5], b"BT ET");
    }
}
