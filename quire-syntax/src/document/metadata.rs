//! Reading document metadata.

use crate::document::Document;
use crate::object::Dict;
use crate::object::keys::{
    AUTHOR, CREATION_DATE, CREATOR, KEYWORDS, MOD_DATE, PRODUCER, SUBJECT, TITLE,
};
use crate::reader::Reader;

/// The metadata of a PDF document, as found in its information dictionary.
///
/// Text entries are kept as raw bytes; use [`text_string`] to decode them.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Metadata {
    /// The creation date of the document.
    pub creation_date: Option<DateTime>,
    /// The modification date of the document.
    pub modification_date: Option<DateTime>,
    /// The title of the document.
    pub title: Option<Vec<u8>>,
    /// The author of the document.
    pub author: Option<Vec<u8>>,
    /// The subject of the document.
    pub subject: Option<Vec<u8>>,
    /// The keywords of the document.
    pub keywords: Option<Vec<u8>>,
    /// The creator of the document.
    pub creator: Option<Vec<u8>>,
    /// The producer of the document.
    pub producer: Option<Vec<u8>>,
}

impl Metadata {
    pub(crate) fn from_info(doc: &Document, info: &Dict) -> Self {
        let string = |key: &[u8]| doc.get(info, key).as_string().map(<[u8]>::to_vec);
        let date = |key: &[u8]| {
            doc.get(info, key)
                .as_string()
                .and_then(DateTime::from_bytes)
        };

        Self {
            creation_date: date(CREATION_DATE),
            modification_date: date(MOD_DATE),
            title: string(TITLE),
            author: string(AUTHOR),
            subject: string(SUBJECT),
            keywords: string(KEYWORDS),
            creator: string(CREATOR),
            producer: string(PRODUCER),
        }
    }
}

/// A date, as stored in `D:YYYYMMDDHHmmSSOHH'mm` form.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DateTime {
    /// The year.
    pub year: u16,
    /// The month.
    pub month: u8,
    /// The day.
    pub day: u8,
    /// The hour.
    pub hour: u8,
    /// The minute.
    pub minute: u8,
    /// The second.
    pub second: u8,
    /// The offset in hours from UTC.
    pub utc_offset_hour: i8,
    /// The offset in minutes from UTC.
    pub utc_offset_minute: u8,
}

impl DateTime {
    /// Parse a date. Everything after the year is optional.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let mut reader = Reader::new(bytes);

        // The prefix is required, but often missing.
        let _ = reader.forward_tag(b"D:");

        let read_num = |reader: &mut Reader<'_>, len: usize, min: u16, max: u16| -> Option<u16> {
            if matches!(reader.peek_byte()?, b'-' | b'+' | b'Z') {
                return None;
            }

            let digits = reader.read_bytes(len)?;

            if !digits.iter().all(u8::is_ascii_digit) {
                return None;
            }

            let num = digits
                .iter()
                .fold(0_u16, |acc, d| acc * 10 + u16::from(d - b'0'));

            (min..=max).contains(&num).then_some(num)
        };

        let year = read_num(&mut reader, 4, 0, 9999)?;
        let mut field = |min, max, default| {
            read_num(&mut reader, 2, min, max).map_or(default, |n| n as u8)
        };

        let month = field(1, 12, 1);
        let day = field(1, 31, 1);
        let hour = field(0, 23, 0);
        let minute = field(0, 59, 0);
        let second = field(0, 59, 0);

        let (utc_offset_hour, utc_offset_minute) = match reader.read_byte() {
            Some(sign @ (b'-' | b'+' | b'Z')) => {
                let hour = read_num(&mut reader, 2, 0, 23).map_or(0, |n| n as i8);
                let _ = reader.forward_tag(b"'");
                let minute = read_num(&mut reader, 2, 0, 59).map_or(0, |n| n as u8);

                if sign == b'-' { (-hour, minute) } else { (hour, minute) }
            }
            _ => (0, 0),
        };

        Some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            utc_offset_hour,
            utc_offset_minute,
        })
    }
}

/// Decode a text string: UTF-16BE if it starts with a byte order mark, UTF-8
/// with a byte order mark, and otherwise the single-byte document encoding,
/// approximated by Latin-1.
pub fn text_string(data: &[u8]) -> String {
    if let Some(utf16) = data.strip_prefix(&[0xfe, 0xff]) {
        let units = utf16
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]));

        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }

    if let Some(utf8) = data.strip_prefix(&[0xef, 0xbb, 0xbf]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }

    data.iter().map(|b| char::from(*b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    fn dt(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        utc_hour: i8,
        utc_minute: u8,
    ) -> DateTime {
        DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            utc_offset_hour: utc_hour,
            utc_offset_minute: utc_minute,
        }
    }

    fn parse(s: &str) -> DateTime {
        DateTime::from_bytes(s.as_bytes()).unwrap()
    }

    #[test]
    fn partial_dates() {
        assert_eq!(parse("D:2023"), dt(2023, 1, 1, 0, 0, 0, 0, 0));
        assert_eq!(parse("D:20231225"), dt(2023, 12, 25, 0, 0, 0, 0, 0));
        assert_eq!(parse("D:202312251430"), dt(2023, 12, 25, 14, 30, 0, 0, 0));
    }

    #[test]
    fn offsets() {
        assert_eq!(
            parse("D:199812231952-08'00"),
            dt(1998, 12, 23, 19, 52, 0, -8, 0)
        );
        assert_eq!(
            parse("D:20230701120000+05'30"),
            dt(2023, 7, 1, 12, 0, 0, 5, 30)
        );
        assert_eq!(parse("D:20230701120000Z"), dt(2023, 7, 1, 12, 0, 0, 0, 0));
    }

    #[test]
    fn missing_prefix() {
        assert_eq!(parse("20200101"), dt(2020, 1, 1, 0, 0, 0, 0, 0));
    }

    #[test]
    fn invalid_dates() {
        assert!(DateTime::from_bytes(b"D:").is_none());
        assert!(DateTime::from_bytes(b"D:20x3").is_none());
    }

    #[test]
    fn text_strings() {
        assert_eq!(text_string(b"caf\xe9"), "café");
        assert_eq!(text_string(b"\xfe\xff\x00H\x00i"), "Hi");
        assert_eq!(text_string(b"\xef\xbb\xbfok"), "ok");
    }
}
