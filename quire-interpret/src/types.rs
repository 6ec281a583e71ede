use crate::color::{Color, ColorSpace};
use crate::font::Font;
use kurbo::{Affine, BezPath, Cap, Join};
use smallvec::{SmallVec, smallvec};
use std::rc::Rc;

/// A fill rule.
#[derive(Clone, Debug, Copy, Hash, PartialEq, Eq, Default)]
pub enum FillRule {
    /// Non-zero filling.
    #[default]
    NonZero,
    /// Even-odd filling.
    EvenOdd,
}

/// Stroke properties.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeProps {
    /// The line width.
    pub line_width: f32,
    /// The line cap.
    pub line_cap: Cap,
    /// The line join.
    pub line_join: Join,
    /// The miter limit.
    pub miter_limit: f32,
    /// The dash array.
    pub dash_array: SmallVec<[f32; 4]>,
    /// The dash offset.
    pub dash_offset: f32,
}

impl Default for StrokeProps {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            line_cap: Cap::Butt,
            line_join: Join::Miter,
            miter_limit: 10.0,
            dash_array: smallvec![],
            dash_offset: 0.0,
        }
    }
}

impl StrokeProps {
    /// Convert the properties into a kurbo stroke style.
    pub fn to_stroke(&self) -> kurbo::Stroke {
        let mut stroke = kurbo::Stroke::new(self.line_width as f64)
            .with_caps(self.line_cap)
            .with_join(self.line_join)
            .with_miter_limit(self.miter_limit as f64);

        if !self.dash_array.is_empty() {
            stroke = stroke.with_dashes(
                self.dash_offset as f64,
                self.dash_array.iter().map(|d| *d as f64),
            );
        }

        stroke
    }
}

/// A blend mode.
#[derive(Clone, Debug, Copy, Hash, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub(crate) fn from_name(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"Normal" | b"Compatible" => Self::Normal,
            b"Multiply" => Self::Multiply,
            b"Screen" => Self::Screen,
            b"Overlay" => Self::Overlay,
            b"Darken" => Self::Darken,
            b"Lighten" => Self::Lighten,
            b"ColorDodge" => Self::ColorDodge,
            b"ColorBurn" => Self::ColorBurn,
            b"HardLight" => Self::HardLight,
            b"SoftLight" => Self::SoftLight,
            b"Difference" => Self::Difference,
            b"Exclusion" => Self::Exclusion,
            b"Hue" => Self::Hue,
            b"Saturation" => Self::Saturation,
            b"Color" => Self::Color,
            b"Luminosity" => Self::Luminosity,
            _ => return None,
        })
    }
}

/// How a path should be painted.
///
/// If both are present, the fill is painted first.
#[derive(Clone, Debug)]
pub struct PathStyle<'a> {
    /// The fill color and rule, if the path is filled.
    pub fill: Option<(&'a Color, FillRule)>,
    /// The stroke color and properties, if the path is stroked.
    pub stroke: Option<(&'a Color, &'a StrokeProps)>,
    /// The blend mode.
    pub blend_mode: BlendMode,
}

/// A clip.
#[derive(Clone, Debug)]
pub enum Clip {
    /// A path in device space.
    Path {
        /// The clipping path.
        path: BezPath,
        /// The fill rule.
        fill_rule: FillRule,
    },
    /// The union of the glyph outlines of some text runs.
    Text(Vec<TextRun>),
}

/// A transparency group.
#[derive(Clone, Debug)]
pub struct Group {
    /// The opacity the group is composited with.
    pub opacity: f32,
    /// The blend mode the group is composited with.
    pub blend_mode: BlendMode,
    /// Whether the group is isolated.
    pub isolated: bool,
    /// Whether the group is a knockout group.
    pub knockout: bool,
    /// The blending color space of the group, if given.
    pub color_space: Option<ColorSpace>,
    /// Whether a soft mask (as produced by the last
    /// [`Device::begin_soft_mask`](crate::Device::begin_soft_mask) pass) applies
    /// to the group.
    pub soft_mask: bool,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            isolated: false,
            knockout: false,
            color_space: None,
            soft_mask: false,
        }
    }
}

/// The text rendering mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextRenderingMode {
    /// Fill the glyphs.
    #[default]
    Fill,
    /// Stroke the glyphs.
    Stroke,
    /// Fill, then stroke the glyphs.
    FillStroke,
    /// Neither fill nor stroke the glyphs.
    Invisible,
    /// Fill the glyphs and add them to the clip.
    FillAndClip,
    /// Stroke the glyphs and add them to the clip.
    StrokeAndClip,
    /// Fill and stroke the glyphs and add them to the clip.
    FillAndStrokeAndClip,
    /// Add the glyphs to the clip.
    Clip,
}

impl TextRenderingMode {
    pub(crate) fn from_number(n: i64) -> Option<Self> {
        Some(match n {
            0 => Self::Fill,
            1 => Self::Stroke,
            2 => Self::FillStroke,
            3 => Self::Invisible,
            4 => Self::FillAndClip,
            5 => Self::StrokeAndClip,
            6 => Self::FillAndStrokeAndClip,
            7 => Self::Clip,
            _ => return None,
        })
    }

    /// Whether glyphs are filled.
    pub fn fills(&self) -> bool {
        matches!(
            self,
            Self::Fill | Self::FillStroke | Self::FillAndClip | Self::FillAndStrokeAndClip
        )
    }

    /// Whether glyphs are stroked.
    pub fn strokes(&self) -> bool {
        matches!(
            self,
            Self::Stroke | Self::FillStroke | Self::StrokeAndClip | Self::FillAndStrokeAndClip
        )
    }

    /// Whether glyphs are added to the clip.
    pub fn clips(&self) -> bool {
        matches!(
            self,
            Self::FillAndClip | Self::StrokeAndClip | Self::FillAndStrokeAndClip | Self::Clip
        )
    }
}

/// A single glyph of a text run.
#[derive(Clone, Debug)]
pub struct Glyph {
    /// The character code, as read from the string.
    pub code: u32,
    /// The number of bytes of the character code.
    pub code_len: usize,
    /// The CID (for composite fonts) or the character code (for simple fonts).
    pub cid: u32,
    /// The Unicode text of the glyph, if known.
    pub unicode: Option<String>,
    /// Maps the glyph space of the font, scaled by the font matrix, to the
    /// user space of the run. Multiply with [`Font::matrix`] to get from
    /// glyph units to text space units first.
    pub transform: Affine,
}

/// A sequence of glyphs that share their font, transform and paint.
#[derive(Clone, Debug)]
pub struct TextRun {
    /// The font of the glyphs.
    pub font: Rc<Font>,
    /// The font size.
    pub font_size: f32,
    /// The current transformation matrix, mapping the user space of the
    /// glyphs to device space.
    pub transform: Affine,
    /// The text rendering mode.
    pub render_mode: TextRenderingMode,
    /// The fill color, if the glyphs are filled with a plain color.
    pub fill: Option<Color>,
    /// The stroke color and properties, if the glyphs are stroked with a
    /// plain color.
    pub stroke: Option<(Color, StrokeProps)>,
    /// The blend mode.
    pub blend_mode: BlendMode,
    /// The glyphs.
    pub glyphs: Vec<Glyph>,
}

impl TextRun {
    /// The Unicode text of the run, with unknown glyphs left out.
    pub fn text(&self) -> String {
        self.glyphs
            .iter()
            .filter_map(|g| g.unicode.as_deref())
            .collect()
    }
}
