use crate::bit::{BitReader, bit_mask};
use crate::object::Dict;
use crate::object::keys::{BITS_PER_COMPONENT, COLORS, COLUMNS, EARLY_CHANGE, PREDICTOR};
use log::warn;

/// The parameters of the PNG and TIFF predictors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PredictorParams {
    /// The predictor: 1 (none), 2 (TIFF) or 10 to 15 (PNG).
    pub predictor: u8,
    /// The number of interleaved color components per sample.
    pub colors: u8,
    /// The number of bits per color component.
    pub bits_per_component: u8,
    /// The number of samples per row.
    pub columns: usize,
    /// The LZW code length switch, one code early or not.
    pub early_change: bool,
}

impl PredictorParams {
    fn bits_per_pixel(&self) -> usize {
        self.bits_per_component as usize * self.colors as usize
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel().div_ceil(8).max(1)
    }

    fn row_length_in_bytes(&self) -> Option<usize> {
        Some(self.columns.checked_mul(self.bits_per_pixel())?.div_ceil(8))
    }

    /// Read the parameters from a `/DecodeParms` dictionary.
    pub fn from_params(dict: &Dict) -> Self {
        let default = Self::default();

        let colors = match dict.get_int(COLORS) {
            Some(c @ 1..=32) => c as u8,
            Some(c) => {
                warn!("invalid number of colors {c}");
                default.colors
            }
            None => default.colors,
        };

        let bits_per_component = match dict.get_int(BITS_PER_COMPONENT) {
            Some(b @ (1 | 2 | 4 | 8 | 16)) => b as u8,
            Some(b) => {
                warn!("invalid bits per component {b}");
                default.bits_per_component
            }
            None => default.bits_per_component,
        };

        let columns = match dict.get_int(COLUMNS) {
            Some(c) if c > 0 => c as usize,
            Some(c) => {
                warn!("invalid number of columns {c}");
                default.columns
            }
            None => default.columns,
        };

        Self {
            predictor: dict
                .get_int(PREDICTOR)
                .and_then(|p| u8::try_from(p).ok())
                .unwrap_or(default.predictor),
            colors,
            bits_per_component,
            columns,
            early_change: dict.get_int(EARLY_CHANGE).is_none_or(|e| e != 0),
        }
    }
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: true,
        }
    }
}

fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    match params.predictor {
        1 => return Some(data),
        2 | 10..=15 => {}
        p => {
            warn!("unknown predictor {p}");
            return Some(data);
        }
    }

    let row_len = match params.row_length_in_bytes() {
        Some(len) if len <= data.len() => len,
        _ => {
            warn!(
                "predictor rows of {} columns do not fit into {} decoded bytes, ignoring predictor",
                params.columns,
                data.len()
            );
            return Some(data);
        }
    };

    match params.predictor {
        2 => Some(apply_tiff(data, params, row_len)),
        _ => Some(apply_png(&data, params, row_len)),
    }
}

fn apply_png(data: &[u8], params: &PredictorParams, row_len: usize) -> Vec<u8> {
    let bpp = params.bytes_per_pixel();

    let mut out = Vec::with_capacity(data.len());
    let mut prev_row = vec![0_u8; row_len];
    let mut cur_row = vec![0_u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (&kind, input) = match chunk.split_first() {
            Some(split) => split,
            None => break,
        };

        if input.len() < row_len {
            warn!("PNG predictor data ends in the middle of a row");
        }

        for (i, &byte) in input.iter().enumerate() {
            let left = if i >= bpp { cur_row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };

            cur_row[i] = match kind {
                0 => byte,
                1 => byte.wrapping_add(left),
                2 => byte.wrapping_add(up),
                3 => byte.wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => byte.wrapping_add(paeth(left, up, up_left)),
                _ => byte,
            };
        }

        if kind > 4 {
            warn!("unknown PNG predictor type {kind}");
        }

        out.extend_from_slice(&cur_row[..input.len()]);
        std::mem::swap(&mut prev_row, &mut cur_row);
    }

    out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn apply_tiff(mut data: Vec<u8>, params: &PredictorParams, row_len: usize) -> Vec<u8> {
    let colors = params.colors as usize;

    match params.bits_per_component {
        8 => {
            for row in data.chunks_mut(row_len) {
                for i in colors..row.len() {
                    row[i] = row[i].wrapping_add(row[i - colors]);
                }
            }
        }
        16 => {
            for row in data.chunks_mut(row_len) {
                let mut i = colors * 2;

                while i + 1 < row.len() {
                    let prev = u16::from_be_bytes([row[i - colors * 2], row[i - colors * 2 + 1]]);
                    let cur = u16::from_be_bytes([row[i], row[i + 1]]);
                    let [hi, lo] = cur.wrapping_add(prev).to_be_bytes();
                    row[i] = hi;
                    row[i + 1] = lo;
                    i += 2;
                }
            }
        }
        bpc => {
            let mask = bit_mask(bpc);

            for row in data.chunks_mut(row_len) {
                let mut reader = BitReader::new(row);
                let mut samples = Vec::with_capacity(row.len() * 8 / bpc as usize);

                while let Some(sample) = reader.read(bpc) {
                    samples.push(sample);
                }

                for i in colors..samples.len() {
                    samples[i] = (samples[i] + samples[i - colors]) & mask;
                }

                row.fill(0);

                for (i, sample) in samples.iter().enumerate() {
                    let bit = i * bpc as usize;
                    let shift = 8 - bpc as usize - bit % 8;
                    row[bit / 8] |= (*sample as u8) << shift;
                }
            }
        }
    }

    data
}

pub(crate) mod flate {
    use super::{PredictorParams, apply_predictor};
    use crate::object::Dict;
    use flate2::read::{DeflateDecoder, ZlibDecoder};
    use log::warn;
    use std::io::Read;

    pub(crate) fn decode(data: &[u8], params: &Dict) -> Option<Vec<u8>> {
        let decoded = inflate(data)?;
        apply_predictor(decoded, &PredictorParams::from_params(params))
    }

    fn inflate(data: &[u8]) -> Option<Vec<u8>> {
        if data.is_empty() {
            return Some(Vec::new());
        }

        let mut out = Vec::new();

        match ZlibDecoder::new(data).read_to_end(&mut out) {
            Ok(_) => Some(out),
            Err(_) if !out.is_empty() => {
                warn!("flate stream is corrupt, keeping {} decoded bytes", out.len());
                Some(out)
            }
            Err(_) => {
                // Some producers omit the zlib header.
                let mut out = Vec::new();

                match DeflateDecoder::new(data).read_to_end(&mut out) {
                    Ok(_) => Some(out),
                    Err(_) if !out.is_empty() => {
                        warn!("deflate stream is corrupt, keeping {} decoded bytes", out.len());
                        Some(out)
                    }
                    Err(_) => None,
                }
            }
        }
    }
}

pub(crate) mod lzw {
    use super::{PredictorParams, apply_predictor};
    use crate::bit::BitReader;
    use crate::object::Dict;
    use log::warn;

    pub(crate) fn decode(data: &[u8], params: &Dict) -> Option<Vec<u8>> {
        let params = PredictorParams::from_params(params);
        let decoded = decode_impl(data, params.early_change);

        apply_predictor(decoded, &params)
    }

    const CLEAR_TABLE: usize = 256;
    const EOD: usize = 257;
    const MAX_ENTRIES: usize = 4096;
    const INITIAL_SIZE: usize = 258;

    fn decode_impl(data: &[u8], early_change: bool) -> Vec<u8> {
        let mut table = Table::new(early_change);

        let mut reader = BitReader::new(data);
        let mut decoded = vec![];
        let mut prev: Option<usize> = None;

        loop {
            let Some(next) = reader.read(table.code_length()) else {
                warn!("LZW stream has no end-of-data marker");
                return decoded;
            };

            match next as usize {
                CLEAR_TABLE => {
                    table.clear();
                    prev = None;
                }
                EOD => return decoded,
                new => {
                    if let Some(entry) = table.get(new) {
                        decoded.extend_from_slice(entry);
                        let first = entry[0];

                        if let Some(prev) = prev {
                            table.register(prev, first);
                        }
                    } else if new == table.len()
                        && let Some(prev) = prev
                        && let Some(&first) = table.get(prev).and_then(|e| e.first())
                    {
                        table.register(prev, first);

                        if let Some(entry) = table.get(new) {
                            decoded.extend_from_slice(entry);
                        }
                    } else {
                        warn!("invalid LZW code {new}");
                        return decoded;
                    }

                    prev = Some(new);
                }
            }
        }
    }

    struct Table {
        early_change: bool,
        entries: Vec<Vec<u8>>,
    }

    impl Table {
        fn new(early_change: bool) -> Self {
            let mut entries: Vec<_> = (0..=255).map(|b| vec![b]).collect();

            // Clear table and EOD don't have any data.
            entries.push(vec![0]);
            entries.push(vec![0]);

            Self {
                early_change,
                entries,
            }
        }

        fn len(&self) -> usize {
            self.entries.len()
        }

        fn register(&mut self, prev: usize, new_byte: u8) {
            if self.entries.len() >= MAX_ENTRIES {
                return;
            }

            let Some(prev_entry) = self.entries.get(prev) else {
                return;
            };

            let mut new_entry = Vec::with_capacity(prev_entry.len() + 1);
            new_entry.extend_from_slice(prev_entry);
            new_entry.push(new_byte);
            self.entries.push(new_entry);
        }

        fn get(&self, index: usize) -> Option<&[u8]> {
            // The two control codes are never valid table entries.
            if index == CLEAR_TABLE || index == EOD {
                return None;
            }

            self.entries.get(index).map(|v| &**v)
        }

        fn clear(&mut self) {
            self.entries.truncate(INITIAL_SIZE);
        }

        fn code_length(&self) -> u8 {
            let adjusted = self.entries.len() + usize::from(self.early_change);

            if adjusted >= 2048 {
                12
            } else if adjusted >= 1024 {
                11
            } else if adjusted >= 512 {
                10
            } else {
                9
            }
        }
    }
}
