//! Tiling and shading patterns.

use crate::color::Color;
use crate::context::{Context, Resources};
use crate::device::Device;
use crate::interpret::interpret;
use crate::interpret::path::rect_clip;
use crate::interpret::state::handle_gs;
use crate::shading::Shading;
use crate::util::{read_matrix, read_rect, rect_path};
use crate::{FillRule, Group, InterpreterWarning, PathStyle};
use kurbo::{Affine, Rect, Shape};
use log::{debug, warn};
use quire_syntax::object::keys::*;
use quire_syntax::store::ResourceKind;
use quire_syntax::{Dict, DocError, Document, ErrorKind, Object, Result, Stream};
use std::rc::Rc;

/// Whether a tiling pattern brings its own colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintType {
    /// The cell specifies its colors.
    Colored,
    /// The cell is a stencil, painted in the color given with the pattern.
    Uncolored,
}

/// A tiling pattern, which repeats a content stream cell.
#[derive(Debug)]
pub struct TilingPattern {
    /// Whether the cell specifies its colors.
    pub paint_type: PaintType,
    /// The cell bounds in pattern space.
    pub bbox: Rect,
    /// The horizontal spacing of cells.
    pub x_step: f64,
    /// The vertical spacing of cells.
    pub y_step: f64,
    /// Maps pattern space to the default space of the content the pattern
    /// is used in.
    pub matrix: Affine,
    content: Rc<Stream>,
    resources: Option<Dict>,
}

/// A shading pattern.
#[derive(Debug)]
pub struct ShadingPattern {
    /// The shading.
    pub shading: Rc<Shading>,
    /// Maps shading space to the default space of the content the pattern
    /// is used in.
    pub matrix: Affine,
    ext_g_state: Option<Dict>,
}

/// A pattern. Cloning is cheap.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// A tiling pattern.
    Tiling(Rc<TilingPattern>),
    /// A shading pattern.
    Shading(Rc<ShadingPattern>),
}

impl Pattern {
    /// Load a pattern, through the object store if it is a reference.
    pub fn new(doc: &Document, object: &Object) -> Result<Self> {
        match object {
            Object::Ref(_) => {
                let pattern = doc.load_resource(object, ResourceKind::Pattern, || {
                    Self::parse(doc, &doc.try_resolve(object)?)
                })?;

                Ok(Self::clone(&pattern))
            }
            _ => Self::parse(doc, object),
        }
    }

    fn parse(doc: &Document, object: &Object) -> Result<Self> {
        let Some(dict) = object.as_dict() else {
            return Err(DocError::new(
                ErrorKind::TypeCheck,
                format!("expected a pattern, found {}", object.type_name()),
            ));
        };

        let matrix = dict
            .get(MATRIX)
            .and_then(|m| read_matrix(doc, m))
            .unwrap_or_default();

        match doc.get(dict, PATTERN_TYPE).as_int() {
            Some(1) => {
                let Object::Stream(content) = object else {
                    return Err(DocError::new(
                        ErrorKind::SyntaxError,
                        "tiling pattern must be a stream",
                    ));
                };

                let paint_type = match doc.get(dict, PAINT_TYPE).as_int() {
                    Some(2) => PaintType::Uncolored,
                    _ => PaintType::Colored,
                };

                let bbox = dict
                    .get(BBOX)
                    .and_then(|b| read_rect(doc, b))
                    .ok_or_else(|| {
                        DocError::new(ErrorKind::MissingRequiredEntry, "tiling pattern without /BBox")
                    })?;

                let step = |key: &[u8]| {
                    doc.get(dict, key)
                        .as_f32()
                        .map(|s| s.abs() as f64)
                        .filter(|s| *s > 0.0 && s.is_finite())
                        .ok_or_else(|| {
                            DocError::new(
                                ErrorKind::SyntaxError,
                                format!(
                                    "tiling pattern /{} must be a non-zero number",
                                    String::from_utf8_lossy(key)
                                ),
                            )
                        })
                };

                Ok(Self::Tiling(Rc::new(TilingPattern {
                    paint_type,
                    bbox,
                    x_step: step(X_STEP)?,
                    y_step: step(Y_STEP)?,
                    matrix,
                    content: content.clone(),
                    resources: doc.get_dict(dict, RESOURCES),
                })))
            }
            Some(2) => {
                let shading = dict.get(SHADING).ok_or_else(|| {
                    DocError::new(ErrorKind::MissingRequiredEntry, "shading pattern without /Shading")
                })?;

                Ok(Self::Shading(Rc::new(ShadingPattern {
                    shading: Shading::new(doc, shading)?,
                    matrix,
                    ext_g_state: doc.get_dict(dict, EXT_G_STATE),
                })))
            }
            other => Err(DocError::new(
                ErrorKind::UnsupportedFeature,
                format!("unknown pattern type {other:?}"),
            )),
        }
    }

    /// Whether both handles refer to the same loaded pattern.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tiling(a), Self::Tiling(b)) => Rc::ptr_eq(a, b),
            (Self::Shading(a), Self::Shading(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Paint a pattern over `area` (in device space), into the current device
/// clip.
pub(crate) fn paint_pattern(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    pattern: &Pattern,
    tint: Option<&Color>,
    area: Rect,
    alpha: f32,
) -> Result<()> {
    if area.is_zero_area() || !ctx.can_nest() {
        return Ok(());
    }

    match pattern {
        Pattern::Shading(pattern) => paint_shading_pattern(ctx, device, resources, pattern, area, alpha),
        Pattern::Tiling(pattern) => {
            let grouped = alpha < 1.0;

            if grouped {
                device.push_group(&Group {
                    opacity: alpha,
                    ..Group::default()
                });
            }

            let result = paint_tiling_pattern(ctx, device, resources, pattern, tint, area);

            if grouped {
                device.pop_group();
            }

            result
        }
    }
}

fn paint_shading_pattern(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    pattern: &ShadingPattern,
    area: Rect,
    mut alpha: f32,
) -> Result<()> {
    let transform = ctx.root_transform() * pattern.matrix;
    let shading = &pattern.shading;

    if let Some(ext_g_state) = &pattern.ext_g_state {
        // Only the fill alpha of a pattern graphics state affects the shading.
        ctx.save_state();
        let applied = handle_gs(ext_g_state, ctx, resources);
        let fill_alpha = ctx.get().fill.alpha;
        ctx.restore_state(device);

        match applied {
            Ok(()) => alpha *= fill_alpha,
            Err(e) => warn!("invalid shading pattern graphics state: {e}"),
        }
    }

    if let Some(background) = &shading.background {
        let color = Color::new(shading.color_space.clone(), background.clone(), alpha);
        device.paint_path(
            &area.to_path(0.1),
            Affine::IDENTITY,
            &PathStyle {
                fill: Some((&color, FillRule::NonZero)),
                stroke: None,
                blend_mode: ctx.get().blend_mode,
            },
        );
    }

    let clip = shading.bbox.map(|bbox| crate::Clip::Path {
        path: transform * rect_path(bbox),
        fill_rule: FillRule::NonZero,
    });

    if let Some(clip) = &clip {
        device.push_clip(clip);
    }

    device.fill_shading(shading, transform, alpha);

    if clip.is_some() {
        device.pop_clip();
    }

    Ok(())
}

fn paint_tiling_pattern(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    pattern: &TilingPattern,
    tint: Option<&Color>,
    area: Rect,
) -> Result<()> {
    let transform = ctx.root_transform() * pattern.matrix;

    if transform.determinant().abs() < 1e-12 {
        debug!("skipping tiling pattern with a singular matrix");

        return Ok(());
    }

    let tint = match (pattern.paint_type, tint) {
        (PaintType::Uncolored, None) => {
            warn!("uncolored tiling pattern used without a color");

            return Ok(());
        }
        (PaintType::Uncolored, Some(tint)) => Some(tint),
        (PaintType::Colored, _) => None,
    };

    let data = ctx.doc.stream_data(&pattern.content)?;
    let resources = Resources::child(pattern.resources.clone(), resources);
    let cells = cell_range(pattern, transform.inverse().transform_rect_bbox(area));

    let Some(((x0, x1), (y0, y1))) = cells else {
        return Ok(());
    };

    let count = (x1 - x0 + 1) as u64 * (y1 - y0 + 1) as u64;
    let limit = ctx.settings.max_pattern_tiles as u64;

    if count > limit {
        warn!("tiling pattern needs {count} cells, painting only {limit}");
        ctx.warn(InterpreterWarning::PatternTileLimit);
    }

    let mut painted = 0;

    'outer: for y in y0..=y1 {
        for x in x0..=x1 {
            if painted >= limit {
                break 'outer;
            }

            let offset = Affine::translate((x as f64 * pattern.x_step, y as f64 * pattern.y_step));
            run_pattern_tile(ctx, device, &resources, pattern, &data, transform * offset, tint)?;
            painted += 1;
        }
    }

    Ok(())
}

/// The inclusive ranges of cell indices whose bounding box overlaps `area`,
/// given in pattern space.
fn cell_range(pattern: &TilingPattern, area: Rect) -> Option<((i64, i64), (i64, i64))> {
    let range = |min: f64, max: f64, b0: f64, b1: f64, step: f64| {
        let first = ((min - b1) / step).floor();
        let last = ((max - b0) / step).ceil();

        (first.is_finite() && last.is_finite() && first <= last).then_some((
            first.max(i64::MIN as f64 / 2.0) as i64,
            last.min(i64::MAX as f64 / 2.0) as i64,
        ))
    };

    let b = pattern.bbox;

    Some((
        range(area.x0, area.x1, b.x0, b.x1, pattern.x_step)?,
        range(area.y0, area.y1, b.y0, b.y1, pattern.y_step)?,
    ))
}

/// Run the content stream of one pattern cell, with `transform` mapping its
/// pattern space to device space.
fn run_pattern_tile(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    pattern: &TilingPattern,
    data: &[u8],
    transform: Affine,
    tint: Option<&Color>,
) -> Result<()> {
    ctx.save_state();

    let mut state = ctx.get().fresh(transform);

    if let Some(tint) = tint {
        for paint in [&mut state.fill, &mut state.stroke] {
            paint.color_space = tint.space().clone();
            paint.components = tint.components().into();
        }

        state.color_locked = true;
    }

    *ctx.get_mut() = state;

    let clip = rect_clip(ctx, pattern.bbox);
    ctx.push_clip(device, clip);
    ctx.push_root_transform();
    ctx.push_bbox((transform * rect_path(pattern.bbox)).bounding_box());

    let result = ctx.nested(|ctx| interpret(data, resources, ctx, device));

    ctx.pop_bbox();
    ctx.pop_root_transform();
    ctx.restore_state(device);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{document, stream};
    use quire_syntax::ObjRef;

    fn load(doc: &Document, num: u32) -> Result<Pattern> {
        Pattern::new(doc, &Object::Ref(ObjRef::new(num, 0)))
    }

    #[test]
    fn tiling() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream(
                "/PatternType 1 /PaintType 2 /TilingType 1 /BBox [0 0 10 10] \
                 /XStep 20 /YStep -20 /Matrix [2 0 0 2 0 0] /Resources << >>",
                "0 0 10 10 re f",
            ),
        ]);

        let Pattern::Tiling(tiling) = load(&doc, 2).unwrap() else {
            panic!("expected a tiling pattern");
        };

        assert_eq!(tiling.paint_type, PaintType::Uncolored);
        assert_eq!((tiling.x_step, tiling.y_step), (20.0, 20.0));
        assert_eq!(tiling.matrix, Affine::scale(2.0));
        assert!(load(&doc, 2).unwrap().ptr_eq(&Pattern::Tiling(tiling)));
    }

    #[test]
    fn zero_step() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream("/PatternType 1 /PaintType 1 /BBox [0 0 10 10] /XStep 0 /YStep 10", ""),
        ]);

        assert_eq!(load(&doc, 2).unwrap_err().kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn shading_pattern() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            "<< /PatternType 2 /Shading << /ShadingType 2 /ColorSpace /DeviceGray \
             /Coords [0 0 1 0] /Function << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >> >> >>",
            "<< /PatternType 3 >>",
        ]);

        assert!(matches!(load(&doc, 2), Ok(Pattern::Shading(_))));
        assert_eq!(load(&doc, 3).unwrap_err().kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn cells() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream("/PatternType 1 /PaintType 1 /BBox [0 0 10 10] /XStep 10 /YStep 10", ""),
        ]);

        let Pattern::Tiling(tiling) = load(&doc, 2).unwrap() else {
            panic!("expected a tiling pattern");
        };

        let range = cell_range(&tiling, Rect::new(5.0, 0.0, 25.0, 10.0));
        assert_eq!(range, Some(((-1, 3), (-1, 1))));
    }
}
