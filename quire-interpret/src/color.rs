//! PDF colors and color spaces.

use log::warn;
use quire_syntax::function::Function;
use quire_syntax::object::keys::*;
use quire_syntax::store::ResourceKind;
use quire_syntax::{Dict, DocError, Document, ErrorKind, Object, Result};
use smallvec::{SmallVec, smallvec};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// A storage for the components of colors.
pub type ColorComponents = SmallVec<[f32; 4]>;

// Bases of indexed, separation and pattern spaces may nest.
const MAX_DEPTH: u32 = 8;

#[derive(Debug)]
enum Repr {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    CalGray(CalGray),
    CalRgb(CalRgb),
    Lab(Lab),
    IccBased { components: u8, alternate: ColorSpace },
    Indexed(Indexed),
    Separation(Separation),
    DeviceN(DeviceN),
    Pattern(Option<ColorSpace>),
}

/// A PDF color space. Cloning is cheap.
#[derive(Clone)]
pub struct ColorSpace(Rc<Repr>);

impl Debug for ColorSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ColorSpace({})", self.family())
    }
}

impl PartialEq for ColorSpace {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
            || matches!(
                (&*self.0, &*other.0),
                (Repr::DeviceGray, Repr::DeviceGray)
                    | (Repr::DeviceRgb, Repr::DeviceRgb)
                    | (Repr::DeviceCmyk, Repr::DeviceCmyk)
                    | (Repr::Pattern(None), Repr::Pattern(None))
            )
    }
}

impl ColorSpace {
    /// The `DeviceGray` color space.
    pub fn device_gray() -> Self {
        Self(Rc::new(Repr::DeviceGray))
    }

    /// The `DeviceRGB` color space.
    pub fn device_rgb() -> Self {
        Self(Rc::new(Repr::DeviceRgb))
    }

    /// The `DeviceCMYK` color space.
    pub fn device_cmyk() -> Self {
        Self(Rc::new(Repr::DeviceCmyk))
    }

    /// The uncolored pattern color space.
    pub fn pattern() -> Self {
        Self(Rc::new(Repr::Pattern(None)))
    }

    /// Create a color space from one of the names that need no resource
    /// lookup, including the abbreviations used by inline images.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            DEVICE_GRAY | G => Some(Self::device_gray()),
            DEVICE_RGB | RGB => Some(Self::device_rgb()),
            DEVICE_CMYK | CMYK | CAL_CMYK => Some(Self::device_cmyk()),
            PATTERN => Some(Self::pattern()),
            _ => None,
        }
    }

    /// Load a color space from a name or an array.
    ///
    /// Color spaces given by reference are cached in the object store of the
    /// document.
    pub fn new(doc: &Document, object: &Object) -> Result<Self> {
        Self::new_inner(doc, object, 0)
    }

    fn new_inner(doc: &Document, object: &Object, depth: u32) -> Result<Self> {
        if depth >= MAX_DEPTH {
            return Err(DocError::new(
                ErrorKind::UnsupportedFeature,
                "color spaces nested too deeply",
            ));
        }

        match object {
            Object::Ref(_) => {
                let cs = doc.load_resource(object, ResourceKind::ColorSpace, || {
                    Self::load(doc, &doc.try_resolve(object)?, depth)
                })?;

                Ok(Self::clone(&cs))
            }
            _ => Self::load(doc, object, depth),
        }
    }

    fn load(doc: &Document, object: &Object, depth: u32) -> Result<Self> {
        if let Some(name) = object.as_name() {
            return Self::from_name(name).ok_or_else(|| {
                DocError::new(
                    ErrorKind::SyntaxError,
                    format!("unknown color space {}", name.as_str()),
                )
            });
        }

        let Some(items) = object.as_array() else {
            return Err(DocError::new(
                ErrorKind::TypeCheck,
                format!("expected a color space, found {}", object.type_name()),
            ));
        };

        let Some(family) = items.first().map(|f| doc.resolve(f)) else {
            return Err(DocError::new(ErrorKind::SyntaxError, "empty color space array"));
        };

        let Some(family) = family.as_name() else {
            return Err(DocError::new(
                ErrorKind::TypeCheck,
                "color space family is not a name",
            ));
        };

        let arg = |i: usize| items.get(i).cloned().unwrap_or(Object::Null);
        let base = |i: usize| Self::new_inner(doc, &arg(i), depth + 1);

        let repr = match &family[..] {
            CAL_GRAY => Repr::CalGray(CalGray::new(doc, &arg(1))),
            CAL_RGB => Repr::CalRgb(CalRgb::new(doc, &arg(1))),
            LAB => Repr::Lab(Lab::new(doc, &arg(1))),
            ICC_BASED => {
                let stream = doc.resolve(&arg(1));
                let dict = stream.as_dict().cloned().unwrap_or_default();
                let components = match doc.get(&dict, N).as_int() {
                    Some(n @ (1 | 3 | 4)) => n as u8,
                    other => {
                        return Err(DocError::new(
                            ErrorKind::SyntaxError,
                            format!("invalid number of ICC components {other:?}"),
                        ));
                    }
                };

                let alternate = dict
                    .get(ALTERNATE)
                    .and_then(|a| {
                        Self::new_inner(doc, a, depth + 1)
                            .inspect_err(|e| warn!("invalid ICC alternate: {e}"))
                            .ok()
                    })
                    .filter(|a| a.num_components() == components as usize)
                    .unwrap_or_else(|| match components {
                        1 => Self::device_gray(),
                        3 => Self::device_rgb(),
                        _ => Self::device_cmyk(),
                    });

                Repr::IccBased {
                    components,
                    alternate,
                }
            }
            INDEXED | I => Repr::Indexed(Indexed::new(doc, base(1)?, &arg(2), &arg(3))?),
            SEPARATION => {
                let none = doc.resolve(&arg(1)).is_name(NONE);

                Repr::Separation(Separation {
                    alternate: base(2)?,
                    tint: Function::new(doc, &arg(3))?,
                    none,
                })
            }
            DEVICE_N => {
                let names = doc.resolve(&arg(1));
                let names = names.as_array().unwrap_or_default();

                if names.is_empty() {
                    return Err(DocError::new(
                        ErrorKind::SyntaxError,
                        "DeviceN color space without colorants",
                    ));
                }

                Repr::DeviceN(DeviceN {
                    components: names.len(),
                    alternate: base(2)?,
                    tint: Function::new(doc, &arg(3))?,
                    none: names.iter().all(|n| doc.resolve(n).is_name(NONE)),
                })
            }
            PATTERN => Repr::Pattern(match items.get(1) {
                Some(b) => Some(Self::new_inner(doc, b, depth + 1)?),
                None => None,
            }),
            _ => match Self::from_name(family) {
                Some(cs) => return Ok(cs),
                None => {
                    return Err(DocError::new(
                        ErrorKind::UnsupportedFeature,
                        format!("unsupported color space {}", family.as_str()),
                    ));
                }
            },
        };

        Ok(Self(Rc::new(repr)))
    }

    /// The name of the color space family.
    pub fn family(&self) -> &'static str {
        match &*self.0 {
            Repr::DeviceGray => "DeviceGray",
            Repr::DeviceRgb => "DeviceRGB",
            Repr::DeviceCmyk => "DeviceCMYK",
            Repr::CalGray(_) => "CalGray",
            Repr::CalRgb(_) => "CalRGB",
            Repr::Lab(_) => "Lab",
            Repr::IccBased { .. } => "ICCBased",
            Repr::Indexed(_) => "Indexed",
            Repr::Separation(_) => "Separation",
            Repr::DeviceN(_) => "DeviceN",
            Repr::Pattern(_) => "Pattern",
        }
    }

    /// Whether this is a pattern color space.
    pub fn is_pattern(&self) -> bool {
        matches!(&*self.0, Repr::Pattern(_))
    }

    /// The underlying color space of an uncolored pattern space.
    pub fn pattern_base(&self) -> Option<&Self> {
        match &*self.0 {
            Repr::Pattern(base) => base.as_ref(),
            _ => None,
        }
    }

    /// Whether this is an indexed color space.
    pub fn is_indexed(&self) -> bool {
        matches!(&*self.0, Repr::Indexed(_))
    }

    /// Whether this is a separation or DeviceN space that only names the
    /// `None` colorant, so that nothing painted in it is visible.
    pub fn is_none(&self) -> bool {
        match &*self.0 {
            Repr::Separation(s) => s.none,
            Repr::DeviceN(d) => d.none,
            _ => false,
        }
    }

    /// The number of components of a color in this space.
    pub fn num_components(&self) -> usize {
        match &*self.0 {
            Repr::DeviceGray | Repr::CalGray(_) | Repr::Indexed(_) | Repr::Separation(_) => 1,
            Repr::DeviceRgb | Repr::CalRgb(_) | Repr::Lab(_) => 3,
            Repr::DeviceCmyk => 4,
            Repr::IccBased { components, .. } => *components as usize,
            Repr::DeviceN(d) => d.components,
            Repr::Pattern(base) => base.as_ref().map(|b| b.num_components()).unwrap_or(0),
        }
    }

    /// The color that is selected when the color space is set.
    pub fn initial_color(&self) -> ColorComponents {
        match &*self.0 {
            Repr::DeviceCmyk => smallvec![0.0, 0.0, 0.0, 1.0],
            Repr::IccBased { components: 4, .. } => smallvec![0.0, 0.0, 0.0, 1.0],
            Repr::Lab(lab) => smallvec![
                0.0,
                0.0_f32.max(lab.range[0]).min(lab.range[1]),
                0.0_f32.max(lab.range[2]).min(lab.range[3]),
            ],
            Repr::Separation(_) => smallvec![1.0],
            Repr::DeviceN(d) => smallvec![1.0; d.components],
            Repr::Pattern(_) => smallvec![],
            _ => smallvec![0.0; self.num_components()],
        }
    }

    /// The default decode array of image samples in this color space.
    pub fn default_decode(&self, bits_per_component: u8) -> SmallVec<[(f32, f32); 4]> {
        match &*self.0 {
            Repr::Lab(l) => smallvec![
                (0.0, 100.0),
                (l.range[0], l.range[1]),
                (l.range[2], l.range[3]),
            ],
            Repr::Indexed(_) => {
                smallvec![(0.0, ((1_u32 << bits_per_component.min(16)) - 1) as f32)]
            }
            _ => smallvec![(0.0, 1.0); self.num_components().max(1)],
        }
    }

    /// Convert color components to sRGB, each channel in `[0, 1]`.
    pub fn to_rgb(&self, c: &[f32]) -> [f32; 3] {
        let get = |i: usize| c.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0);

        match &*self.0 {
            Repr::DeviceGray => [get(0); 3],
            Repr::DeviceRgb => [get(0), get(1), get(2)],
            Repr::DeviceCmyk => {
                let k = get(3);

                [
                    (1.0 - get(0)) * (1.0 - k),
                    (1.0 - get(1)) * (1.0 - k),
                    (1.0 - get(2)) * (1.0 - k),
                ]
            }
            Repr::CalGray(cal) => cal.to_rgb(get(0)),
            Repr::CalRgb(cal) => cal.to_rgb([get(0), get(1), get(2)]),
            Repr::Lab(lab) => lab.to_rgb(c),
            Repr::IccBased { alternate, .. } => alternate.to_rgb(c),
            Repr::Indexed(indexed) => indexed.to_rgb(c),
            Repr::Separation(Separation { alternate, tint, .. })
            | Repr::DeviceN(DeviceN {
                alternate, tint, ..
            }) => match tint.evaluate(c) {
                Ok(values) => alternate.to_rgb(&values),
                Err(e) => {
                    warn!("failed to evaluate tint transform: {e}");
                    [0.0; 3]
                }
            },
            Repr::Pattern(base) => base.as_ref().map(|b| b.to_rgb(c)).unwrap_or([0.0; 3]),
        }
    }
}

#[derive(Debug)]
struct Indexed {
    base: ColorSpace,
    hival: u8,
    lookup: Vec<u8>,
}

impl Indexed {
    fn new(doc: &Document, base: ColorSpace, hival: &Object, lookup: &Object) -> Result<Self> {
        if base.is_pattern() || base.is_indexed() {
            return Err(DocError::new(
                ErrorKind::SyntaxError,
                format!("invalid base {} for an indexed color space", base.family()),
            ));
        }

        let hival = doc
            .resolve(hival)
            .as_int()
            .ok_or_else(|| DocError::new(ErrorKind::TypeCheck, "indexed hival is not a number"))?
            .clamp(0, 255) as u8;

        let lookup = match doc.try_resolve(lookup)? {
            Object::String(s) => s.to_vec(),
            Object::Stream(s) => doc.stream_data(&s)?,
            other => {
                return Err(DocError::new(
                    ErrorKind::TypeCheck,
                    format!("indexed lookup is a {}", other.type_name()),
                ));
            }
        };

        Ok(Self {
            base,
            hival,
            lookup,
        })
    }

    fn to_rgb(&self, c: &[f32]) -> [f32; 3] {
        let index = c.first().copied().unwrap_or(0.0).round().clamp(0.0, self.hival as f32) as usize;
        let n = self.base.num_components();
        let decode = self.base.default_decode(8);

        let components = (0..n)
            .map(|i| {
                // A lookup table that is too short reads as zeroes.
                let byte = self.lookup.get(index * n + i).copied().unwrap_or(0);
                let (min, max) = decode.get(i).copied().unwrap_or((0.0, 1.0));

                min + byte as f32 / 255.0 * (max - min)
            })
            .collect::<ColorComponents>();

        self.base.to_rgb(&components)
    }
}

#[derive(Debug)]
struct Separation {
    alternate: ColorSpace,
    tint: Function,
    none: bool,
}

#[derive(Debug)]
struct DeviceN {
    components: usize,
    alternate: ColorSpace,
    tint: Function,
    none: bool,
}

fn read_triple(doc: &Document, dict: Option<&Dict>, key: &[u8], default: [f32; 3]) -> [f32; 3] {
    dict.and_then(|d| doc.get(d, key).as_f32_n::<3>())
        .unwrap_or(default)
}

#[derive(Debug)]
struct CalGray {
    white_point: [f32; 3],
    gamma: f32,
}

impl CalGray {
    fn new(doc: &Document, dict: &Object) -> Self {
        let dict = doc.resolve(dict);
        let dict = dict.as_dict();

        Self {
            white_point: read_triple(doc, dict, WHITE_POINT, [1.0, 1.0, 1.0]),
            gamma: dict
                .and_then(|d| doc.get(d, GAMMA).as_f32())
                .unwrap_or(1.0),
        }
    }

    fn to_rgb(&self, a: f32) -> [f32; 3] {
        let l = self.white_point[1] * a.powf(self.gamma);
        let v = (295.8 * l.powf(1.0 / 3.0) - 40.8).max(0.0) / 255.0;

        [v.min(1.0); 3]
    }
}

#[derive(Debug)]
struct CalRgb {
    white_point: [f32; 3],
    gamma: [f32; 3],
    matrix: [f32; 9],
}

impl CalRgb {
    fn new(doc: &Document, dict: &Object) -> Self {
        let dict = doc.resolve(dict);
        let dict = dict.as_dict();

        Self {
            white_point: read_triple(doc, dict, WHITE_POINT, [1.0, 1.0, 1.0]),
            gamma: read_triple(doc, dict, GAMMA, [1.0, 1.0, 1.0]),
            matrix: dict
                .and_then(|d| doc.get(d, MATRIX).as_f32_n::<9>())
                .unwrap_or([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
        }
    }

    fn to_rgb(&self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        let [gr, gg, gb] = self.gamma;
        let (r, g, b) = (r.powf(gr), g.powf(gg), b.powf(gb));

        let m = &self.matrix;
        let xyz = [
            m[0] * r + m[3] * g + m[6] * b,
            m[1] * r + m[4] * g + m[7] * b,
            m[2] * r + m[5] * g + m[8] * b,
        ];

        xyz_to_srgb(xyz, self.white_point)
    }
}

#[derive(Debug)]
struct Lab {
    white_point: [f32; 3],
    range: [f32; 4],
}

impl Lab {
    fn new(doc: &Document, dict: &Object) -> Self {
        let dict = doc.resolve(dict);
        let dict = dict.as_dict();

        Self {
            white_point: read_triple(doc, dict, WHITE_POINT, [0.9505, 1.0, 1.089]),
            range: dict
                .and_then(|d| doc.get(d, RANGE).as_f32_n::<4>())
                .unwrap_or([-100.0, 100.0, -100.0, 100.0]),
        }
    }

    fn to_rgb(&self, c: &[f32]) -> [f32; 3] {
        let get = |i: usize| c.get(i).copied().unwrap_or(0.0);
        let l = get(0).clamp(0.0, 100.0);
        let a = get(1).clamp(self.range[0], self.range[1]);
        let b = get(2).clamp(self.range[2], self.range[3]);

        let g = |x: f32| {
            if x >= 6.0 / 29.0 {
                x * x * x
            } else {
                108.0 / 841.0 * (x - 4.0 / 29.0)
            }
        };

        let m = (l + 16.0) / 116.0;
        let [xw, yw, zw] = self.white_point;
        let xyz = [
            xw * g(m + a / 500.0),
            yw * g(m),
            zw * g(m - b / 200.0),
        ];

        xyz_to_srgb(xyz, self.white_point)
    }
}

const BRADFORD: [f32; 9] = [
    0.8951, 0.2664, -0.1614, -0.7502, 1.7135, 0.0367, 0.0389, -0.0685, 1.0296,
];

const BRADFORD_INVERSE: [f32; 9] = [
    0.9869929, -0.1470543, 0.1599627, 0.4323053, 0.5183603, 0.0492912, -0.0085287, 0.0400428,
    0.9684867,
];

const XYZ_D65_TO_SRGB: [f32; 9] = [
    3.2404542, -1.5371385, -0.4985314, -0.969_266, 1.8760108, 0.0415560, 0.0556434, -0.2040259,
    1.0572252,
];

const D65: [f32; 3] = [0.95047, 1.0, 1.08883];

fn mul(m: &[f32; 9], v: [f32; 3]) -> [f32; 3] {
    [
        m[0] * v[0] + m[1] * v[1] + m[2] * v[2],
        m[3] * v[0] + m[4] * v[1] + m[5] * v[2],
        m[6] * v[0] + m[7] * v[1] + m[8] * v[2],
    ]
}

/// Adapt an XYZ color from `white_point` to D65 and convert it to sRGB.
fn xyz_to_srgb(xyz: [f32; 3], white_point: [f32; 3]) -> [f32; 3] {
    let lms = mul(&BRADFORD, xyz);
    let source = mul(&BRADFORD, white_point);
    let target = mul(&BRADFORD, D65);

    let adapted = [0, 1, 2].map(|i| {
        if source[i] == 0.0 {
            lms[i]
        } else {
            lms[i] * target[i] / source[i]
        }
    });

    let linear = mul(&XYZ_D65_TO_SRGB, mul(&BRADFORD_INVERSE, adapted));

    linear.map(|c| {
        let c = c.clamp(0.0, 1.0);

        if c <= 0.0031308 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    })
}

/// A color in a specific color space.
#[derive(Clone, Debug)]
pub struct Color {
    space: ColorSpace,
    components: ColorComponents,
    alpha: f32,
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.space == other.space
            && self.components == other.components
            && self.alpha == other.alpha
    }
}

impl Color {
    /// Create a new color.
    pub fn new(space: ColorSpace, components: ColorComponents, alpha: f32) -> Self {
        Self {
            space,
            components,
            alpha,
        }
    }

    /// Opaque black in `DeviceGray`.
    pub fn black() -> Self {
        Self::new(ColorSpace::device_gray(), smallvec![0.0], 1.0)
    }

    /// The color space of the color.
    pub fn space(&self) -> &ColorSpace {
        &self.space
    }

    /// The components of the color.
    pub fn components(&self) -> &[f32] {
        &self.components
    }

    /// The constant alpha the color is painted with.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// The color as sRGB with alpha, each channel in `[0, 1]`.
    ///
    /// Colors in a `None` separation are fully transparent.
    pub fn to_rgba(&self) -> [f32; 4] {
        let [r, g, b] = self.space.to_rgb(&self.components);
        let alpha = if self.space.is_none() { 0.0 } else { self.alpha };

        [r, g, b, alpha.clamp(0.0, 1.0)]
    }

    /// The color as 8-bit sRGB with alpha.
    pub fn to_rgba8(&self) -> [u8; 4] {
        self.to_rgba().map(|c| (c * 255.0 + 0.5) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::document;
    use quire_syntax::ObjRef;
    use quire_syntax::parser::parse_object;

    fn space(source: &str) -> ColorSpace {
        let doc = document(&["<< /Type /Catalog >>"]);
        ColorSpace::new(&doc, &parse_object(source.as_bytes()).unwrap()).unwrap()
    }

    fn rgb8(cs: &ColorSpace, c: &[f32]) -> [u8; 4] {
        Color::new(cs.clone(), c.into(), 1.0).to_rgba8()
    }

    #[test]
    fn device_spaces() {
        assert_eq!(rgb8(&ColorSpace::device_gray(), &[0.5]), [128, 128, 128, 255]);
        assert_eq!(rgb8(&ColorSpace::device_rgb(), &[1.0, 0.0, 0.0]), [255, 0, 0, 255]);
        assert_eq!(rgb8(&ColorSpace::device_cmyk(), &[0.0, 1.0, 1.0, 0.0]), [255, 0, 0, 255]);
        assert_eq!(rgb8(&ColorSpace::device_cmyk(), &[0.0, 0.0, 0.0, 1.0]), [0, 0, 0, 255]);
    }

    #[test]
    fn names() {
        assert_eq!(ColorSpace::from_name(b"G").unwrap().family(), "DeviceGray");
        assert_eq!(ColorSpace::from_name(b"CMYK").unwrap().num_components(), 4);
        assert!(ColorSpace::from_name(b"Pattern").unwrap().is_pattern());
        assert!(ColorSpace::from_name(b"CS0").is_none());
        assert_eq!(ColorSpace::device_rgb().initial_color().as_slice(), &[0.0, 0.0, 0.0]);
        assert_eq!(ColorSpace::device_cmyk().initial_color().as_slice(), &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn indexed() {
        let cs = space("[/Indexed /DeviceRGB 1 <FF0000 0000FF>]");

        assert_eq!(cs.num_components(), 1);
        assert_eq!(cs.default_decode(4).as_slice(), &[(0.0, 15.0)]);
        assert_eq!(rgb8(&cs, &[0.0]), [255, 0, 0, 255]);
        assert_eq!(rgb8(&cs, &[1.0]), [0, 0, 255, 255]);
        // Out-of-range indices are clamped to hival.
        assert_eq!(rgb8(&cs, &[7.0]), [0, 0, 255, 255]);
    }

    #[test]
    fn separation() {
        let cs = space(
            "[/Separation /Spot /DeviceRGB << /FunctionType 2 /Domain [0 1] /C0 [1 1 1] /C1 [0 0 1] /N 1 >>]",
        );

        assert_eq!(cs.initial_color().as_slice(), &[1.0]);
        assert_eq!(rgb8(&cs, &[1.0]), [0, 0, 255, 255]);
        assert_eq!(rgb8(&cs, &[0.0]), [255, 255, 255, 255]);
        assert!(!cs.is_none());
    }

    #[test]
    fn none_separation_is_transparent() {
        let cs = space(
            "[/Separation /None /DeviceGray << /FunctionType 2 /Domain [0 1] /C0 [1] /C1 [0] /N 1 >>]",
        );

        assert!(cs.is_none());
        assert_eq!(rgb8(&cs, &[1.0])[3], 0);
    }

    #[test]
    fn device_n() {
        let cs = space(
            "[/DeviceN [/Cyan /Magenta] /DeviceCMYK << /FunctionType 2 /Domain [0 1] /C0 [0 0 0 0] /C1 [1 1 0 0] /N 1 >>]",
        );

        assert_eq!(cs.num_components(), 2);
        assert_eq!(cs.initial_color().as_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn lab_white_and_black() {
        let cs = space("[/Lab << /WhitePoint [0.9505 1 1.089] >>]");

        let white = rgb8(&cs, &[100.0, 0.0, 0.0]);
        let black = rgb8(&cs, &[0.0, 0.0, 0.0]);

        assert!(white[..3].iter().all(|c| *c >= 250));
        assert!(black[..3].iter().all(|c| *c <= 5));
    }

    #[test]
    fn cal_gray_extremes() {
        let cs = space("[/CalGray << /WhitePoint [0.9505 1 1.089] /Gamma 2.2 >>]");

        assert_eq!(rgb8(&cs, &[0.0]), [0, 0, 0, 255]);
        assert_eq!(rgb8(&cs, &[1.0]), [255, 255, 255, 255]);
    }

    #[test]
    fn icc_uses_alternate_or_components() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            "<< /N 3 /Length 0 >>\nstream\n\nendstream",
        ]);

        let cs = ColorSpace::new(&doc, &parse_object(b"[/ICCBased 2 0 R]").unwrap()).unwrap();
        assert_eq!(cs.family(), "ICCBased");
        assert_eq!(cs.num_components(), 3);
        assert_eq!(rgb8(&cs, &[0.0, 1.0, 0.0]), [0, 255, 0, 255]);

        let reference = Object::Ref(ObjRef::new(2, 0));
        assert!(ColorSpace::new(&doc, &reference).is_err());
    }

    #[test]
    fn pattern_with_base() {
        let cs = space("[/Pattern /DeviceRGB]");

        assert!(cs.is_pattern());
        assert_eq!(cs.num_components(), 3);
        assert_eq!(cs.pattern_base().map(|b| b.family()), Some("DeviceRGB"));
        assert!(ColorSpace::pattern().pattern_base().is_none());
    }

    #[test]
    fn unsupported_family() {
        let doc = document(&["<< /Type /Catalog >>"]);
        let err = ColorSpace::new(&doc, &parse_object(b"[/Fancy 1]").unwrap()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }
}
