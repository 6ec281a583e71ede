//! Unicode values for simple font encodings and glyph names.

/// The built-in encodings a simple font can name as its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BaseEncoding {
    Standard,
    WinAnsi,
    MacRoman,
    /// The encoding of the font program itself, which is unknown to us.
    Builtin,
}

impl BaseEncoding {
    pub(crate) fn unicode(self, code: u8) -> Option<char> {
        match self {
            Self::Standard => match code {
                0x27 => Some('\u{2019}'),
                0x60 => Some('\u{2018}'),
                0x20..=0x7e => Some(code as char),
                _ => None,
            },
            Self::WinAnsi => win_ansi(code),
            Self::MacRoman => mac_roman(code),
            Self::Builtin => (0x20..=0x7e).contains(&code).then_some(code as char),
        }
    }
}

fn win_ansi(code: u8) -> Option<char> {
    let c = match code {
        0x20..=0x7e | 0xa0..=0xff => return Some(code as char),
        0x80 => '\u{20ac}',
        0x82 => '\u{201a}',
        0x83 => '\u{0192}',
        0x84 => '\u{201e}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02c6}',
        0x89 => '\u{2030}',
        0x8a => '\u{0160}',
        0x8b => '\u{2039}',
        0x8c => '\u{0152}',
        0x8e => '\u{017d}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201c}',
        0x94 => '\u{201d}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02dc}',
        0x99 => '\u{2122}',
        0x9a => '\u{0161}',
        0x9b => '\u{203a}',
        0x9c => '\u{0153}',
        0x9e => '\u{017e}',
        0x9f => '\u{0178}',
        _ => return None,
    };

    Some(c)
}

fn mac_roman(code: u8) -> Option<char> {
    // Only the characters shared with ASCII plus the most common punctuation.
    let c = match code {
        0x20..=0x7e => return Some(code as char),
        0xa5 => '\u{2022}',
        0xc9 => '\u{2026}',
        0xca => '\u{00a0}',
        0xd0 => '\u{2013}',
        0xd1 => '\u{2014}',
        0xd2 => '\u{201c}',
        0xd3 => '\u{201d}',
        0xd4 => '\u{2018}',
        0xd5 => '\u{2019}',
        _ => return None,
    };

    Some(c)
}

/// Map a glyph name to the text it stands for.
pub(crate) fn glyph_name_to_unicode(name: &[u8]) -> Option<String> {
    let name = std::str::from_utf8(name).ok()?;
    // Suffixes like in `a.sc` or `f_i.liga` name variants of the same glyph.
    let base = name.split('.').next()?;

    if base.is_empty() {
        return None;
    }

    if base.contains('_') {
        return base
            .split('_')
            .map(|part| glyph_name_to_unicode(part.as_bytes()))
            .collect();
    }

    if let Some(hex) = base.strip_prefix("uni")
        && hex.len() % 4 == 0
        && !hex.is_empty()
    {
        return (0..hex.len())
            .step_by(4)
            .map(|i| {
                u32::from_str_radix(&hex[i..i + 4], 16)
                    .ok()
                    .and_then(char::from_u32)
            })
            .collect();
    }

    if let Some(hex) = base.strip_prefix('u')
        && (4..=6).contains(&hex.len())
        && let Ok(value) = u32::from_str_radix(hex, 16)
    {
        return char::from_u32(value).map(String::from);
    }

    let mut chars = base.chars();

    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c.to_string());
    }

    named_glyph(base).map(String::from)
}

fn named_glyph(name: &str) -> Option<char> {
    Some(match name {
        "space" | "nbspace" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" | "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "asciicircum" => '^',
        "underscore" => '_',
        "grave" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        "quoteleft" => '\u{2018}',
        "quoteright" => '\u{2019}',
        "quotedblleft" => '\u{201c}',
        "quotedblright" => '\u{201d}',
        "quotesinglbase" => '\u{201a}',
        "quotedblbase" => '\u{201e}',
        "endash" => '\u{2013}',
        "emdash" => '\u{2014}',
        "bullet" => '\u{2022}',
        "ellipsis" => '\u{2026}',
        "dagger" => '\u{2020}',
        "daggerdbl" => '\u{2021}',
        "fi" => '\u{fb01}',
        "fl" => '\u{fb02}',
        "ff" => '\u{fb00}',
        "ffi" => '\u{fb03}',
        "ffl" => '\u{fb04}',
        "copyright" => '\u{00a9}',
        "registered" => '\u{00ae}',
        "trademark" => '\u{2122}',
        "degree" => '\u{00b0}',
        "section" => '\u{00a7}',
        "paragraph" => '\u{00b6}',
        "Euro" => '\u{20ac}',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_encodings() {
        assert_eq!(BaseEncoding::WinAnsi.unicode(0x41), Some('A'));
        assert_eq!(BaseEncoding::WinAnsi.unicode(0x93), Some('\u{201c}'));
        assert_eq!(BaseEncoding::WinAnsi.unicode(0xe9), Some('é'));
        assert_eq!(BaseEncoding::WinAnsi.unicode(0x81), None);
        assert_eq!(BaseEncoding::Standard.unicode(0x27), Some('\u{2019}'));
        assert_eq!(BaseEncoding::MacRoman.unicode(0xd0), Some('\u{2013}'));
        assert_eq!(BaseEncoding::Builtin.unicode(0x05), None);
    }

    #[test]
    fn glyph_names() {
        assert_eq!(glyph_name_to_unicode(b"A").as_deref(), Some("A"));
        assert_eq!(glyph_name_to_unicode(b"a.sc").as_deref(), Some("a"));
        assert_eq!(glyph_name_to_unicode(b"uni00410042").as_deref(), Some("AB"));
        assert_eq!(glyph_name_to_unicode(b"u1F600").as_deref(), Some("\u{1f600}"));
        assert_eq!(glyph_name_to_unicode(b"f_i").as_deref(), Some("fi"));
        assert_eq!(glyph_name_to_unicode(b"endash").as_deref(), Some("\u{2013}"));
        assert_eq!(glyph_name_to_unicode(b"g123"), None);
        assert_eq!(glyph_name_to_unicode(b".notdef"), None);
    }
}
