use crate::color::{Color, ColorComponents, ColorSpace};
use crate::context::{Context, Resources};
use crate::font::Font;
use crate::pattern::Pattern;
use crate::soft_mask::SoftMaskDef;
use crate::{BlendMode, StrokeProps, TextRenderingMode};
use kurbo::{Affine, Cap, Join, Vec2};
use log::{debug, warn};
use quire_syntax::object::keys::*;
use quire_syntax::{Dict, DocError, ErrorKind, Object, Result};
use smallvec::smallvec;
use std::rc::Rc;

/// The paint used for either stroking or filling.
#[derive(Clone, Debug)]
pub(crate) struct PaintState {
    pub(crate) color_space: ColorSpace,
    pub(crate) components: ColorComponents,
    pub(crate) pattern: Option<Pattern>,
    pub(crate) alpha: f32,
}

impl PaintState {
    fn new() -> Self {
        Self {
            color_space: ColorSpace::device_gray(),
            components: smallvec![0.0],
            pattern: None,
            alpha: 1.0,
        }
    }

    pub(crate) fn set_color_space(&mut self, color_space: ColorSpace) {
        self.components = color_space.initial_color();
        self.color_space = color_space;
        self.pattern = None;
    }

    pub(crate) fn material(&self) -> Material {
        if self.color_space.is_pattern() {
            match &self.pattern {
                Some(pattern) => {
                    // Uncolored patterns are painted in the color given next to the pattern name.
                    let tint = self.color_space.pattern_base().map(|base| {
                        Color::new(base.clone(), self.components.clone(), self.alpha)
                    });

                    return Material::Pattern(pattern.clone(), tint);
                }
                None => {
                    warn!("pattern color space without a pattern, using black");

                    return Material::Color(Color::new(
                        ColorSpace::device_gray(),
                        smallvec![0.0],
                        self.alpha,
                    ));
                }
            }
        }

        Material::Color(Color::new(
            self.color_space.clone(),
            self.components.clone(),
            self.alpha,
        ))
    }

    fn same_as(&self, other: &Self) -> bool {
        self.color_space == other.color_space
            && self.components == other.components
            && self.alpha == other.alpha
            && match (&self.pattern, &other.pattern) {
                (None, None) => true,
                (Some(a), Some(b)) => a.ptr_eq(b),
                _ => false,
            }
    }
}

/// What an area is painted with.
#[derive(Clone, Debug)]
pub(crate) enum Material {
    Color(Color),
    /// A pattern, with the color for uncolored tiling patterns.
    Pattern(Pattern, Option<Color>),
}

#[derive(Clone, Debug)]
pub(crate) struct TextState {
    pub(crate) char_space: f32,
    pub(crate) word_space: f32,
    // Note that this stores 1/100 of the actual scaling.
    pub(crate) horizontal_scaling: f32,
    pub(crate) leading: f32,
    pub(crate) font: Option<Rc<Font>>,
    pub(crate) font_size: f32,
    pub(crate) rise: f32,
    pub(crate) render_mode: TextRenderingMode,
    pub(crate) text_matrix: Affine,
    pub(crate) text_line_matrix: Affine,
}

impl TextState {
    fn temp_transform(&self) -> Affine {
        Affine::new([
            self.font_size as f64 * self.horizontal_scaling() as f64,
            0.0,
            0.0,
            self.font_size as f64,
            0.0,
            self.rise as f64,
        ])
    }

    fn horizontal_scaling(&self) -> f32 {
        self.horizontal_scaling / 100.0
    }

    fn font_vertical(&self) -> bool {
        self.font.as_ref().is_some_and(|f| f.is_vertical())
    }

    /// The transform of the glyph for `code` at the current position, from
    /// (font matrix scaled) glyph space to user space.
    pub(crate) fn glyph_transform(&self, font: &Font, code: u32) -> Affine {
        let origin = if font.is_vertical() {
            font.vertical_metrics(code).1
        } else {
            Vec2::ZERO
        };

        self.text_matrix * self.temp_transform() * Affine::translate(-origin)
    }

    pub(crate) fn apply_adjustment(&mut self, adjustment: f32) {
        let scaled = -adjustment / 1000.0 * self.font_size;

        let (tx, ty) = if self.font_vertical() {
            (0.0, scaled)
        } else {
            (scaled * self.horizontal_scaling(), 0.0)
        };

        self.text_matrix *= Affine::translate((tx as f64, ty as f64));
    }

    pub(crate) fn apply_code_advance(&mut self, font: &Font, code: u32, code_len: usize) {
        let word_space = if code == 32 && code_len == 1 {
            self.word_space
        } else {
            0.0
        };

        let (tx, ty) = if font.is_vertical() {
            let advance = font.vertical_metrics(code).0;
            (0.0, advance * self.font_size + self.char_space + word_space)
        } else {
            let advance = font.width(code);
            (
                (advance * self.font_size + self.char_space + word_space)
                    * self.horizontal_scaling(),
                0.0,
            )
        };

        self.text_matrix *= Affine::translate((tx as f64, ty as f64));
    }

    pub(crate) fn next_line(&mut self, tx: f64, ty: f64) {
        let new_matrix = self.text_line_matrix * Affine::translate((tx, ty));
        self.text_line_matrix = new_matrix;
        self.text_matrix = new_matrix;
    }
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_space: 0.0,
            word_space: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            font: None,
            font_size: 1.0,
            rise: 0.0,
            render_mode: TextRenderingMode::Fill,
            text_matrix: Affine::IDENTITY,
            text_line_matrix: Affine::IDENTITY,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct State {
    pub(crate) ctm: Affine,
    pub(crate) stroke_props: StrokeProps,
    pub(crate) stroke: PaintState,
    pub(crate) fill: PaintState,
    pub(crate) text: TextState,
    pub(crate) blend_mode: BlendMode,
    pub(crate) soft_mask: Option<Rc<SoftMaskDef>>,
    // The number of device clips pushed while this state was current.
    pub(crate) clip_depth: u32,
    // Set in uncolored patterns and `d1` glyphs, where color operators are ignored.
    pub(crate) color_locked: bool,
}

impl State {
    pub(crate) fn new(ctm: Affine) -> Self {
        Self {
            ctm,
            stroke_props: StrokeProps::default(),
            stroke: PaintState::new(),
            fill: PaintState::new(),
            text: TextState::default(),
            blend_mode: BlendMode::Normal,
            soft_mask: None,
            clip_depth: 0,
            color_locked: false,
        }
    }

    /// A state with default parameters that keeps the clip bookkeeping of
    /// `self`.
    pub(crate) fn fresh(&self, ctm: Affine) -> Self {
        Self {
            clip_depth: self.clip_depth,
            ..Self::new(ctm)
        }
    }

    /// Whether glyphs shown in `self` can be drawn in the same run as glyphs
    /// shown in `other`.
    pub(crate) fn batches_with(&self, other: &Self) -> bool {
        let (a, b) = (&self.text, &other.text);

        let same_font = match (&a.font, &b.font) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };

        same_font
            && a.font_size == b.font_size
            && a.render_mode == b.render_mode
            && self.ctm == other.ctm
            && self.blend_mode == other.blend_mode
            && self.fill.same_as(&other.fill)
            && self.stroke.same_as(&other.stroke)
            && self.stroke_props == other.stroke_props
            && match (&self.soft_mask, &other.soft_mask) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

pub(crate) fn line_cap(n: i64) -> Cap {
    match n {
        1 => Cap::Round,
        2 => Cap::Square,
        _ => Cap::Butt,
    }
}

pub(crate) fn line_join(n: i64) -> Join {
    match n {
        1 => Join::Round,
        2 => Join::Bevel,
        _ => Join::Miter,
    }
}

pub(crate) fn dash_array(items: &[Object]) -> smallvec::SmallVec<[f32; 4]> {
    let dashes = items
        .iter()
        .filter_map(|d| d.as_f32())
        .collect::<smallvec::SmallVec<[f32; 4]>>();

    // A pattern of zero lengths would never advance.
    if dashes.iter().all(|d| *d <= 0.0) {
        smallvec![]
    } else {
        dashes
    }
}

/// Apply the parameters of an extended graphics state dictionary.
pub(crate) fn handle_gs(dict: &Dict, ctx: &mut Context<'_>, resources: &Resources) -> Result<()> {
    let doc = ctx.doc;

    for (key, value) in dict.iter() {
        let value = doc.resolve(value);

        match &key[..] {
            LW => {
                if let Some(w) = value.as_f32() {
                    ctx.get_mut().stroke_props.line_width = w;
                }
            }
            LC => {
                if let Some(c) = value.as_int() {
                    ctx.get_mut().stroke_props.line_cap = line_cap(c);
                }
            }
            LJ => {
                if let Some(j) = value.as_int() {
                    ctx.get_mut().stroke_props.line_join = line_join(j);
                }
            }
            ML => {
                if let Some(m) = value.as_f32() {
                    ctx.get_mut().stroke_props.miter_limit = m;
                }
            }
            D => {
                let parts = value.as_array().unwrap_or_default();
                let dashes = parts
                    .first()
                    .map(|d| doc.resolve(d))
                    .and_then(|d| d.as_array().map(dash_array))
                    .unwrap_or_default();
                let offset = parts.get(1).and_then(|o| o.as_f32()).unwrap_or(0.0);

                let props = &mut ctx.get_mut().stroke_props;
                props.dash_array = dashes;
                props.dash_offset = offset;
            }
            CA => {
                if let Some(a) = value.as_f32() {
                    ctx.get_mut().stroke.alpha = a.clamp(0.0, 1.0);
                }
            }
            CA_NS => {
                if let Some(a) = value.as_f32() {
                    ctx.get_mut().fill.alpha = a.clamp(0.0, 1.0);
                }
            }
            BM => {
                // An array lists blend modes in order of preference.
                let mode = match &value {
                    Object::Array(items) => items
                        .iter()
                        .find_map(|i| i.as_name().and_then(|n| BlendMode::from_name(n))),
                    other => other.as_name().and_then(|n| BlendMode::from_name(n)),
                };

                match mode {
                    Some(mode) => ctx.get_mut().blend_mode = mode,
                    None => warn!("unknown blend mode {value:?}"),
                }
            }
            SMASK => {
                ctx.get_mut().soft_mask = match &value {
                    Object::Name(n) if &n[..] == NONE => None,
                    Object::Dict(mask) => {
                        let ctm = ctx.get().ctm;
                        Some(Rc::new(SoftMaskDef::new(doc, mask, ctm, resources)?))
                    }
                    other => {
                        return Err(DocError::new(
                            ErrorKind::TypeCheck,
                            format!("invalid soft mask of type {}", other.type_name()),
                        ));
                    }
                };
            }
            FONT => {
                let parts = value.as_array().unwrap_or_default();
                let (Some(font), Some(size)) = (parts.first(), parts.get(1).and_then(|s| s.as_f32()))
                else {
                    warn!("invalid font entry in graphics state");
                    continue;
                };

                let font = ctx.load_font(font)?;
                let text = &mut ctx.get_mut().text;
                text.font = Some(font);
                text.font_size = size;
            }
            RI | TYPE | FL | SA | TR => {
                debug!("ignoring graphics state entry {}", key.as_str());
            }
            _ => {}
        }
    }

    Ok(())
}
