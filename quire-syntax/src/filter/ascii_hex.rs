use crate::lexer::hex_value;
use crate::reader::Reader;
use crate::trivia::is_white_space_character;

pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut reader = Reader::new(data);
    let mut decoded = Vec::with_capacity(data.len() / 2);
    let mut high = None;

    // A missing `>` is tolerated.
    while let Some(byte) = reader.read_byte() {
        match byte {
            b'>' => break,
            b if b.is_ascii_hexdigit() => match high.take() {
                Some(h) => decoded.push((h << 4) | hex_value(b)),
                None => high = Some(hex_value(b)),
            },
            b if is_white_space_character(b) => {}
            _ => return None,
        }
    }

    // An odd number of digits behaves as if a final 0 followed.
    if let Some(h) = high {
        decoded.push(h << 4);
    }

    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn decode_simple() {
        assert_eq!(decode(b"AF3E2901>").unwrap(), vec![0xaf, 0x3e, 0x29, 0x01]);
    }

    #[test]
    fn decode_whitespaces() {
        assert_eq!(decode(b"AF3   E2 \n  901>").unwrap(), vec![0xaf, 0x3e, 0x29, 0x01]);
    }

    #[test]
    fn decode_without_gt() {
        assert_eq!(decode(b"af3e2901").unwrap(), vec![0xaf, 0x3e, 0x29, 0x01]);
    }

    #[test]
    fn decode_with_padding() {
        assert_eq!(decode(b"AF3E291>").unwrap(), vec![0xaf, 0x3e, 0x29, 0x10]);
    }

    #[test]
    fn invalid_character() {
        assert!(decode(b"AF3G>").is_none());
    }
}
