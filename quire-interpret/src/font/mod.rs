//! Fonts.
//!
//! A [`Font`] knows how to split shown strings into character codes and how
//! far each code advances the text position, and maps codes to CIDs and
//! Unicode text. Glyph outlines are out of scope: devices that draw text can
//! read the embedded font program through [`Font::program`].

use crate::font::cid::CidMetrics;
use crate::font::encoding::{BaseEncoding, glyph_name_to_unicode};
use kurbo::{Affine, Vec2};
use log::{debug, warn};
use quire_cmap::{CMap, CMapResolver, WritingMode};
use quire_syntax::object::keys::*;
use quire_syntax::store::ResourceKind;
use quire_syntax::{Dict, DocError, Document, ErrorKind, Name, Object, Result, Stream};
use rustc_hash::FxHashMap;
use std::rc::Rc;

mod cid;
mod encoding;

/// The kind of a font dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    /// A Type1 font, including the standard 14 fonts.
    Type1,
    /// A multiple master Type1 font.
    MmType1,
    /// A TrueType font.
    TrueType,
    /// A font whose glyphs are content stream procedures.
    Type3,
    /// A composite font with a CID-keyed descendant.
    Type0,
}

/// The format of an embedded font program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontProgramKind {
    /// A Type1 program (`/FontFile`).
    Type1,
    /// A TrueType program (`/FontFile2`).
    TrueType,
    /// A program whose format is named by the stream's `/Subtype`, such as
    /// CFF or OpenType (`/FontFile3`).
    Other,
}

#[derive(Debug)]
enum Metrics {
    Simple {
        first_char: u32,
        widths: Vec<f32>,
        missing_width: f32,
    },
    Cid(CidMetrics),
}

#[derive(Debug)]
struct Type3 {
    char_procs: Dict,
    resources: Option<Dict>,
}

/// A font, loaded from a font dictionary.
#[derive(Debug)]
pub struct Font {
    kind: FontKind,
    dict: Dict,
    base_font: Option<Name>,
    descriptor: Option<Dict>,
    metrics: Metrics,
    // The encoding CMap of composite fonts.
    cmap: Option<Rc<CMap>>,
    base_encoding: BaseEncoding,
    differences: FxHashMap<u32, Name>,
    to_unicode: Option<Rc<CMap>>,
    matrix: Affine,
    type3: Option<Type3>,
}

impl Font {
    /// Load the font for a `/Font` resource entry, through the object store
    /// if it is a reference.
    pub(crate) fn load(
        doc: &Document,
        object: &Object,
        resolver: &CMapResolver,
    ) -> Result<Rc<Self>> {
        let load = || {
            let resolved = doc.try_resolve(object)?;
            let dict = resolved.as_dict().ok_or_else(|| {
                DocError::new(
                    ErrorKind::TypeCheck,
                    format!("expected a font dictionary, found {}", resolved.type_name()),
                )
            })?;

            Self::new(doc, dict, resolver)
        };

        match object {
            Object::Ref(_) => doc.load_resource(object, ResourceKind::Font, load),
            _ => load().map(Rc::new),
        }
    }

    /// Create a new font from its dictionary.
    pub fn new(doc: &Document, dict: &Dict, resolver: &CMapResolver) -> Result<Self> {
        let kind = match dict.get_name(SUBTYPE).map(|n| &n[..]) {
            Some(TYPE0) => FontKind::Type0,
            Some(TYPE3) => FontKind::Type3,
            Some(TRUE_TYPE) => FontKind::TrueType,
            Some(MM_TYPE1) => FontKind::MmType1,
            Some(TYPE1) => FontKind::Type1,
            other => {
                warn!(
                    "unknown font subtype {:?}, treating it as Type1",
                    other.map(String::from_utf8_lossy)
                );

                FontKind::Type1
            }
        };

        let to_unicode = match dict.get(TO_UNICODE) {
            Some(object) => quire_cmap::load(doc, object, resolver)
                .inspect_err(|e| warn!("failed to load ToUnicode CMap: {e}"))
                .ok(),
            None => None,
        };

        let mut font = Self {
            kind,
            dict: dict.clone(),
            base_font: dict.get_name(BASE_FONT).cloned(),
            descriptor: doc.get_dict(dict, FONT_DESCRIPTOR),
            metrics: Metrics::Simple {
                first_char: 0,
                widths: vec![],
                missing_width: 0.0,
            },
            cmap: None,
            base_encoding: BaseEncoding::Standard,
            differences: FxHashMap::default(),
            to_unicode,
            matrix: Affine::scale(0.001),
            type3: None,
        };

        if kind == FontKind::Type0 {
            font.load_composite(doc, resolver)?;
        } else {
            font.load_simple(doc);
        }

        Ok(font)
    }

    fn load_composite(&mut self, doc: &Document, resolver: &CMapResolver) -> Result<()> {
        let descendant = doc
            .get(&self.dict, DESCENDANT_FONTS)
            .as_array()
            .and_then(|a| a.first().cloned())
            .map(|d| doc.resolve(&d))
            .and_then(|d| d.as_dict().cloned())
            .ok_or_else(|| {
                DocError::new(
                    ErrorKind::MissingRequiredEntry,
                    "composite font without a descendant font",
                )
            })?;

        let cmap = match self.dict.get(ENCODING) {
            Some(encoding) => quire_cmap::load(doc, encoding, resolver).unwrap_or_else(|e| {
                warn!("failed to load font encoding, falling back to Identity-H: {e}");

                Rc::new(CMap::identity_h())
            }),
            None => {
                warn!("composite font without an encoding, using Identity-H");

                Rc::new(CMap::identity_h())
            }
        };

        self.descriptor = doc.get_dict(&descendant, FONT_DESCRIPTOR);
        self.metrics = Metrics::Cid(CidMetrics::new(doc, &descendant));
        self.cmap = Some(cmap);

        Ok(())
    }

    fn load_simple(&mut self, doc: &Document) {
        let widths = doc
            .get(&self.dict, WIDTHS)
            .as_array()
            .map(|w| {
                w.iter()
                    .map(|w| doc.resolve(w).as_f32().unwrap_or(0.0))
                    .collect::<Vec<_>>()
            });

        let missing_width = self
            .descriptor
            .as_ref()
            .and_then(|d| doc.get(d, MISSING_WIDTH).as_f32());

        let missing_width = match (&widths, missing_width) {
            (_, Some(w)) => w,
            (Some(_), None) => 0.0,
            (None, None) => {
                // Without any metrics (standard 14 fonts without /Widths),
                // assume an average advance.
                debug!("font without widths, assuming an advance of 500");

                500.0
            }
        };

        self.metrics = Metrics::Simple {
            first_char: doc
                .get(&self.dict, FIRST_CHAR)
                .as_int()
                .unwrap_or(0)
                .max(0) as u32,
            widths: widths.unwrap_or_default(),
            missing_width,
        };

        match doc.get(&self.dict, ENCODING) {
            Object::Name(name) => self.base_encoding = base_encoding(&name),
            Object::Dict(encoding) => {
                if let Some(name) = encoding.get_name(BASE_ENCODING) {
                    self.base_encoding = base_encoding(name);
                }

                if let Some(differences) = doc.get(&encoding, DIFFERENCES).as_array() {
                    self.differences = read_differences(differences);
                }
            }
            _ => {
                if self.is_symbolic() {
                    self.base_encoding = BaseEncoding::Builtin;
                }
            }
        }

        if self.kind == FontKind::Type3 {
            if let Some(matrix) = doc.get(&self.dict, FONT_MATRIX).as_f32_n::<6>() {
                self.matrix = Affine::new(matrix.map(|v| v as f64));
            }

            self.type3 = Some(Type3 {
                char_procs: doc.get_dict(&self.dict, CHAR_PROCS).unwrap_or_default(),
                resources: doc.get_dict(&self.dict, RESOURCES),
            });
        }
    }

    fn is_symbolic(&self) -> bool {
        const SYMBOLIC: i64 = 1 << 2;

        self.descriptor
            .as_ref()
            .and_then(|d| d.get_int(FLAGS))
            .is_some_and(|f| f & SYMBOLIC != 0)
    }

    /// The kind of the font.
    pub fn kind(&self) -> FontKind {
        self.kind
    }

    /// The `/BaseFont` name.
    pub fn base_font(&self) -> Option<&Name> {
        self.base_font.as_ref()
    }

    /// The font dictionary.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    /// Whether the font is a Type3 font, whose glyphs are drawn by running
    /// their procedures.
    pub fn is_type3(&self) -> bool {
        self.kind == FontKind::Type3
    }

    /// Whether text in this font is laid out top to bottom.
    pub fn is_vertical(&self) -> bool {
        self.cmap
            .as_ref()
            .is_some_and(|c| c.writing_mode() == WritingMode::Vertical)
    }

    /// The matrix from glyph space to text space.
    pub fn matrix(&self) -> Affine {
        self.matrix
    }

    /// Read the next character code from `bytes`, returning the code and the
    /// number of bytes it spans. Bytes that match no code space are read as a
    /// one-byte code.
    pub fn decode_next(&self, bytes: &[u8]) -> (u32, usize) {
        let fallback = (bytes.first().copied().unwrap_or(0) as u32, 1);

        match &self.cmap {
            Some(cmap) => cmap.decode_next(bytes).unwrap_or(fallback),
            None => fallback,
        }
    }

    /// The CID of a character code. For simple fonts, this is the code itself.
    pub fn cid(&self, code: u32) -> u32 {
        match &self.cmap {
            Some(cmap) => cmap.lookup(code).unwrap_or(0),
            None => code,
        }
    }

    /// The horizontal advance of a code, in unscaled text space units.
    pub fn width(&self, code: u32) -> f32 {
        match &self.metrics {
            Metrics::Simple {
                first_char,
                widths,
                missing_width,
            } => {
                let width = code
                    .checked_sub(*first_char)
                    .and_then(|i| widths.get(i as usize))
                    .copied()
                    .unwrap_or(*missing_width);

                if self.is_type3() {
                    (width as f64 * self.matrix.as_coeffs()[0]) as f32
                } else {
                    width / 1000.0
                }
            }
            Metrics::Cid(metrics) => metrics.width(self.cid(code)) / 1000.0,
        }
    }

    /// The vertical advance of a code and the position vector from its
    /// horizontal to its vertical origin, in unscaled text space units.
    pub fn vertical_metrics(&self, code: u32) -> (f32, Vec2) {
        match &self.metrics {
            Metrics::Cid(metrics) => {
                let (w1, v) = metrics.vertical(self.cid(code));

                (w1 / 1000.0, v / 1000.0)
            }
            Metrics::Simple { .. } => (-1.0, Vec2::new(self.width(code) as f64 / 2.0, 0.88)),
        }
    }

    /// The glyph name assigned to a code by the encoding differences.
    pub fn glyph_name(&self, code: u32) -> Option<&Name> {
        self.differences.get(&code)
    }

    /// The text a code represents.
    pub fn unicode(&self, code: u32) -> Option<String> {
        if let Some(text) = self
            .to_unicode
            .as_ref()
            .and_then(|c| c.lookup_unicode(code))
        {
            return Some(text);
        }

        if self.kind == FontKind::Type0 {
            return None;
        }

        if let Some(name) = self.glyph_name(code) {
            return glyph_name_to_unicode(name);
        }

        u8::try_from(code)
            .ok()
            .and_then(|c| self.base_encoding.unicode(c))
            .map(String::from)
    }

    /// The glyph procedure of a Type3 font.
    pub fn char_proc(&self, doc: &Document, code: u32) -> Option<Rc<Stream>> {
        let type3 = self.type3.as_ref()?;
        let name = self.glyph_name(code)?;

        doc.get(&type3.char_procs, name).as_stream().cloned()
    }

    /// The resources of the glyph procedures of a Type3 font.
    pub(crate) fn resources(&self, _doc: &Document) -> Option<Dict> {
        self.type3.as_ref().and_then(|t| t.resources.clone())
    }

    /// The embedded font program, if any.
    pub fn program(&self, doc: &Document) -> Option<(FontProgramKind, Rc<Stream>)> {
        let descriptor = self.descriptor.as_ref()?;

        [
            (FONT_FILE, FontProgramKind::Type1),
            (FONT_FILE2, FontProgramKind::TrueType),
            (FONT_FILE3, FontProgramKind::Other),
        ]
        .into_iter()
        .find_map(|(key, kind)| doc.get(descriptor, key).as_stream().map(|s| (kind, s.clone())))
    }
}

fn base_encoding(name: &[u8]) -> BaseEncoding {
    match name {
        WIN_ANSI_ENCODING => BaseEncoding::WinAnsi,
        MAC_ROMAN_ENCODING => BaseEncoding::MacRoman,
        _ => BaseEncoding::Standard,
    }
}

/// Read a `/Differences` array: a code followed by the names of consecutive
/// codes, repeated.
fn read_differences(items: &[Object]) -> FxHashMap<u32, Name> {
    let mut map = FxHashMap::default();
    let mut code = 0_u32;

    for item in items {
        match item {
            Object::Int(i) => code = (*i).max(0) as u32,
            Object::Name(name) => {
                map.insert(code, name.clone());
                code += 1;
            }
            other => debug!("ignoring {} in encoding differences", other.type_name()),
        }
    }

    map
}
