//! Stream filters.
//!
//! A [`FilterChain`] is an ordered list of stages that turn the raw bytes of a
//! stream into its decoded content: decryption first, then every entry of the
//! `/Filter` array in order. Image codecs (DCT, JBIG2, JPX and CCITT) are not
//! implemented here. They can be plugged in through a [`CodecRegistry`];
//! without one, decoding stops before the codec and the data is handed back
//! still encoded, together with the codec it needs.

mod ascii_85;
mod ascii_hex;
mod lzw_flate;
mod run_length;

use crate::crypto::{self, CryptMethod};
use crate::error::{Result, bail, err};
use crate::object::keys::*;
use crate::object::{Dict, Object};
use crate::util::OptionLog;
use log::warn;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

pub use lzw_flate::PredictorParams;

/// A stream filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `ASCIIHexDecode`
    AsciiHexDecode,
    /// `ASCII85Decode`
    Ascii85Decode,
    /// `LZWDecode`
    LzwDecode,
    /// `FlateDecode`
    FlateDecode,
    /// `RunLengthDecode`
    RunLengthDecode,
    /// `CCITTFaxDecode`
    CcittFaxDecode,
    /// `JBIG2Decode`
    Jbig2Decode,
    /// `DCTDecode`
    DctDecode,
    /// `JPXDecode`
    JpxDecode,
    /// `Crypt`
    Crypt,
}

impl Filter {
    /// Look up a filter by its name or abbreviation.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            ASCII_HEX_DECODE | ASCII_HEX_DECODE_ABBREVIATION => Some(Self::AsciiHexDecode),
            ASCII85_DECODE | ASCII85_DECODE_ABBREVIATION => Some(Self::Ascii85Decode),
            LZW_DECODE | LZW_DECODE_ABBREVIATION => Some(Self::LzwDecode),
            FLATE_DECODE | FLATE_DECODE_ABBREVIATION => Some(Self::FlateDecode),
            RUN_LENGTH_DECODE | RUN_LENGTH_DECODE_ABBREVIATION => Some(Self::RunLengthDecode),
            CCITTFAX_DECODE | CCITTFAX_DECODE_ABBREVIATION => Some(Self::CcittFaxDecode),
            JBIG2_DECODE => Some(Self::Jbig2Decode),
            DCT_DECODE | DCT_DECODE_ABBREVIATION => Some(Self::DctDecode),
            JPX_DECODE => Some(Self::JpxDecode),
            CRYPT => Some(Self::Crypt),
            _ => None,
        }
    }

    /// The external codec this filter needs, if any.
    pub fn codec(&self) -> Option<ExternalCodec> {
        match self {
            Self::CcittFaxDecode => Some(ExternalCodec::CcittFax),
            Self::Jbig2Decode => Some(ExternalCodec::Jbig2),
            Self::DctDecode => Some(ExternalCodec::Dct),
            Self::JpxDecode => Some(ExternalCodec::Jpx),
            _ => None,
        }
    }

    fn debug_name(&self) -> &'static str {
        match self {
            Self::AsciiHexDecode => "ascii_hex",
            Self::Ascii85Decode => "ascii_85",
            Self::LzwDecode => "lzw",
            Self::FlateDecode => "flate",
            Self::RunLengthDecode => "run-length",
            Self::CcittFaxDecode => "ccitt_fax",
            Self::Jbig2Decode => "jbig2",
            Self::DctDecode => "dct",
            Self::JpxDecode => "jpx",
            Self::Crypt => "crypt",
        }
    }

    /// Apply a built-in filter.
    ///
    /// Returns `None` for external codecs and `Crypt`, which are handled by the
    /// filter chain.
    pub fn apply(&self, data: &[u8], params: &Dict) -> Option<Vec<u8>> {
        match self {
            Self::AsciiHexDecode => ascii_hex::decode(data),
            Self::Ascii85Decode => ascii_85::decode(data),
            Self::RunLengthDecode => run_length::decode(data),
            Self::LzwDecode => lzw_flate::lzw::decode(data, params),
            Self::FlateDecode => lzw_flate::flate::decode(data, params),
            _ => None,
        }
        .warn_none(&format!("failed to apply filter {}", self.debug_name()))
    }
}

/// An image codec that is not part of this crate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ExternalCodec {
    /// JPEG baseline and progressive (`DCTDecode`).
    Dct,
    /// JBIG2 (`JBIG2Decode`).
    Jbig2,
    /// JPEG 2000 (`JPXDecode`).
    Jpx,
    /// CCITT group 3 and 4 fax (`CCITTFaxDecode`).
    CcittFax,
}

/// A decoder for an external codec.
pub trait Codec {
    /// Decode the data, given the filter's decode parameters.
    fn decode(&self, data: &[u8], params: &Dict) -> Result<Vec<u8>>;
}

/// The external codecs available while decoding streams.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: FxHashMap<ExternalCodec, Rc<dyn Codec>>,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder for a codec, replacing any previous one.
    pub fn register(&mut self, codec: ExternalCodec, decoder: Rc<dyn Codec>) {
        self.codecs.insert(codec, decoder);
    }

    /// The decoder for a codec.
    pub fn get(&self, codec: ExternalCodec) -> Option<&Rc<dyn Codec>> {
        self.codecs.get(&codec)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.codecs.keys()).finish()
    }
}

/// Read the `/Filter` entry of a stream dictionary, pairing every filter
/// positionally with its entry in `/DecodeParms`.
///
/// `resolve` is applied to indirect filter names and parameter dictionaries.
pub fn stream_filters(
    dict: &Dict,
    resolve: impl Fn(&Object) -> Object,
) -> Result<Vec<(Filter, Dict)>> {
    let entry = |key: &[u8]| dict.get(key).map(&resolve).unwrap_or_default();

    let names = match entry(FILTER) {
        Object::Null => return Ok(Vec::new()),
        name @ Object::Name(_) => vec![name],
        Object::Array(items) => items.iter().map(&resolve).collect(),
        other => bail!(SyntaxError, "invalid /Filter entry of type {}", other.type_name()),
    };

    let params = match dict.get(DECODE_PARMS).or_else(|| dict.get(DP)) {
        Some(p) => match resolve(p) {
            Object::Array(items) => items.iter().map(&resolve).collect(),
            other => vec![other],
        },
        None => Vec::new(),
    };

    let mut filters = Vec::with_capacity(names.len());

    for (i, name) in names.iter().enumerate() {
        let Some(name) = name.as_name() else {
            bail!(SyntaxError, "filter names must be names, found {}", name.type_name());
        };

        let filter = Filter::from_name(name)
            .ok_or_else(|| err!(UnsupportedFeature, "unknown filter {}", name.as_str()))?;
        let params = params
            .get(i)
            .and_then(|p| p.as_dict())
            .cloned()
            .unwrap_or_default();

        filters.push((filter, params));
    }

    Ok(filters)
}

/// One stage of a filter chain.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Decrypt with an object key.
    Decrypt {
        /// The cipher.
        method: CryptMethod,
        /// The object key.
        key: Vec<u8>,
    },
    /// Apply a filter with its (resolved) decode parameters.
    Decode {
        /// The filter.
        filter: Filter,
        /// The decode parameters.
        params: Dict,
    },
}

/// The result of running a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// The decoded data.
    pub data: Vec<u8>,
    /// If decoding stopped at an external codec without a registered
    /// decoder, the codec and its decode parameters. `data` is then still
    /// encoded with that codec.
    pub encoded_with: Option<(ExternalCodec, Dict)>,
}

/// An ordered list of decoding stages.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    stages: Vec<Stage>,
}

impl FilterChain {
    /// Create an empty chain, which passes data through unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// The stages of the chain.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Whether the chain leaves data untouched.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run the chain over the data.
    pub fn apply(&self, data: Vec<u8>, codecs: &CodecRegistry) -> Result<Decoded> {
        let mut data = data;

        for (i, stage) in self.stages.iter().enumerate() {
            match stage {
                Stage::Decrypt { method, key } => {
                    data = crypto::decrypt(*method, key, &data)?;
                }
                Stage::Decode { filter, params } => {
                    if let Some(codec) = filter.codec() {
                        let Some(decoder) = codecs.get(codec) else {
                            if i + 1 < self.stages.len() {
                                warn!("filters after an image codec are ignored");
                            }

                            return Ok(Decoded {
                                data,
                                encoded_with: Some((codec, params.clone())),
                            });
                        };

                        data = decoder.decode(&data, params)?;
                        continue;
                    }

                    data = filter.apply(&data, params).ok_or_else(|| {
                        err!(SyntaxError, "corrupt data for filter {}", filter.debug_name())
                    })?;
                }
            }
        }

        Ok(Decoded {
            data,
            encoded_with: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Name, Object};

    struct Invert;

    impl Codec for Invert {
        fn decode(&self, data: &[u8], _: &Dict) -> Result<Vec<u8>> {
            Ok(data.iter().map(|b| !b).collect())
        }
    }

    fn decode_stage(filter: Filter) -> Stage {
        Stage::Decode {
            filter,
            params: Dict::new(),
        }
    }

    #[test]
    fn chained_filters() {
        let mut chain = FilterChain::new();
        chain.push(decode_stage(Filter::AsciiHexDecode));
        chain.push(decode_stage(Filter::RunLengthDecode));

        // Run-length data `[2, 'a', 'b', 'c', 254, 'z', 128]`, hex encoded.
        let decoded = chain
            .apply(b"02 61 62 63 FE 7A 80>".to_vec(), &CodecRegistry::new())
            .unwrap();

        assert_eq!(decoded.data, b"abczzz");
        assert!(decoded.encoded_with.is_none());
    }

    #[test]
    fn stops_at_external_codec() {
        let mut chain = FilterChain::new();
        chain.push(decode_stage(Filter::AsciiHexDecode));
        let mut params = Dict::new();
        params.insert(Name::new(b"ColorTransform"), Object::Int(0));
        chain.push(Stage::Decode {
            filter: Filter::DctDecode,
            params: params.clone(),
        });

        let decoded = chain
            .apply(b"FFD8>".to_vec(), &CodecRegistry::new())
            .unwrap();

        assert_eq!(decoded.data, [0xFF, 0xD8]);
        assert_eq!(decoded.encoded_with, Some((ExternalCodec::Dct, params)));

        let mut codecs = CodecRegistry::new();
        codecs.register(ExternalCodec::Dct, Rc::new(Invert));
        let decoded = chain.apply(b"FFD8>".to_vec(), &codecs).unwrap();

        assert_eq!(decoded.data, [0x00, 0x27]);
        assert!(decoded.encoded_with.is_none());
    }

    #[test]
    fn filter_names() {
        assert_eq!(Filter::from_name(b"Fl"), Some(Filter::FlateDecode));
        assert_eq!(Filter::from_name(b"A85"), Some(Filter::Ascii85Decode));
        assert_eq!(Filter::from_name(b"JPXDecode"), Some(Filter::JpxDecode));
        assert_eq!(Filter::from_name(b"Unknown"), None);
    }

    #[test]
    fn filters_paired_with_params() {
        let mut predictor = Dict::new();
        predictor.insert(PREDICTOR, Object::Int(12));

        let mut dict = Dict::new();
        dict.insert(
            FILTER,
            Object::array(vec![Object::name(b"AHx"), Object::name(b"FlateDecode")]),
        );
        dict.insert(
            DECODE_PARMS,
            Object::array(vec![Object::Null, Object::dict(predictor.clone())]),
        );

        let filters = stream_filters(&dict, Object::clone).unwrap();
        assert_eq!(
            filters,
            vec![
                (Filter::AsciiHexDecode, Dict::new()),
                (Filter::FlateDecode, predictor)
            ]
        );

        dict.insert(FILTER, Object::name(b"Bogus"));
        let err = stream_filters(&dict, Object::clone).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn corrupt_data_is_an_error() {
        let mut chain = FilterChain::new();
        chain.push(decode_stage(Filter::AsciiHexDecode));

        assert!(chain.apply(b"zz>".to_vec(), &CodecRegistry::new()).is_err());
    }
}
