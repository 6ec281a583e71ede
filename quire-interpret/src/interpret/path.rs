use crate::color::Color;
use crate::context::{Context, Resources};
use crate::device::Device;
use crate::interpret::state::Material;
use crate::pattern::{Pattern, paint_pattern};
use crate::soft_mask;
use crate::util::rect_path;
use crate::{Clip, FillRule, Group, PathStyle};
use kurbo::{BezPath, PathEl, Point, Rect, Shape};
use quire_syntax::Result;

pub(crate) fn line_to(ctx: &mut Context<'_>, p: Point) {
    if ctx.path.elements().is_empty() {
        return;
    }

    ctx.last_point = p;
    ctx.path.line_to(p);
}

pub(crate) fn curve_to(ctx: &mut Context<'_>, p1: Point, p2: Point, p3: Point) {
    if ctx.path.elements().is_empty() {
        return;
    }

    ctx.last_point = p3;
    ctx.path.curve_to(p1, p2, p3);
}

pub(crate) fn close_path(ctx: &mut Context<'_>) {
    if matches!(
        ctx.path.elements().last(),
        None | Some(PathEl::ClosePath)
    ) {
        return;
    }

    ctx.path.close_path();
    ctx.last_point = ctx.sub_path_start;
}

pub(crate) fn rect(ctx: &mut Context<'_>, x: f64, y: f64, w: f64, h: f64) {
    let start = Point::new(x, y);
    ctx.path.move_to(start);
    ctx.path.line_to((x + w, y));
    ctx.path.line_to((x + w, y + h));
    ctx.path.line_to((x, y + h));
    ctx.path.close_path();

    ctx.sub_path_start = start;
    ctx.last_point = start;
}

/// End the current path without painting it (`n`).
pub(crate) fn end_path(ctx: &mut Context<'_>, device: &mut impl Device) {
    let path = std::mem::take(&mut ctx.path);
    apply_pending_clip(ctx, device, &path);
}

/// Intersect the clip with `path` if `W` or `W*` preceded the painting
/// operator.
fn apply_pending_clip(ctx: &mut Context<'_>, device: &mut impl Device, path: &BezPath) {
    let Some(fill_rule) = ctx.pending_clip.take() else {
        return;
    };

    let path = if path.elements().is_empty() {
        // Clipping to an empty path hides everything.
        BezPath::new()
    } else {
        ctx.get().ctm * path.clone()
    };

    ctx.push_clip(device, Clip::Path { path, fill_rule });
}

/// Paint the current path with the fill and/or stroke of the current state,
/// then reset it.
pub(crate) fn paint(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    fill: Option<FillRule>,
    stroke: bool,
) -> Result<()> {
    let path = std::mem::take(&mut ctx.path);

    let result = if path.elements().is_empty() || !ctx.ocg.is_visible() {
        Ok(())
    } else {
        draw_path(ctx, device, resources, &path, fill, stroke)
    };

    apply_pending_clip(ctx, device, &path);

    result
}

fn draw_path(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    path: &BezPath,
    fill: Option<FillRule>,
    stroke: bool,
) -> Result<()> {
    let state = ctx.get().clone();
    let fill = fill.map(|rule| (state.fill.material(), rule));
    let stroke = stroke.then(|| state.stroke.material());

    let masked = begin_masked(ctx, device)?;

    let color_fill = match &fill {
        Some((Material::Color(c), rule)) => Some((c, *rule)),
        _ => None,
    };
    let color_stroke = match &stroke {
        Some(Material::Color(c)) => Some((c, &state.stroke_props)),
        _ => None,
    };

    let mut result = Ok(());

    // Pattern fills go first so that they don't cover the stroke.
    if let Some((Material::Pattern(pattern, tint), rule)) = &fill {
        let clip = Clip::Path {
            path: state.ctm * path.clone(),
            fill_rule: *rule,
        };
        let alpha = state.fill.alpha;
        result = paint_in_clip(ctx, device, resources, clip, pattern, tint.as_ref(), alpha);
    }

    if color_fill.is_some() || color_stroke.is_some() {
        device.paint_path(
            path,
            state.ctm,
            &PathStyle {
                fill: color_fill,
                stroke: color_stroke,
                blend_mode: state.blend_mode,
            },
        );
    }

    if let Some(Material::Pattern(pattern, tint)) = &stroke
        && result.is_ok()
    {
        let outline = kurbo::stroke(
            path.iter(),
            &state.stroke_props.to_stroke(),
            &kurbo::StrokeOpts::default(),
            0.1,
        );
        let clip = Clip::Path {
            path: state.ctm * outline,
            fill_rule: FillRule::NonZero,
        };
        let alpha = state.stroke.alpha;
        result = paint_in_clip(ctx, device, resources, clip, pattern, tint.as_ref(), alpha);
    }

    end_masked(device, masked);

    result
}

/// Paint a pattern into `clip`.
pub(crate) fn paint_in_clip(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    clip: Clip,
    pattern: &Pattern,
    tint: Option<&Color>,
    alpha: f32,
) -> Result<()> {
    let area = match &clip {
        Clip::Path { path, .. } => path.bounding_box().intersect(ctx.bbox()),
        Clip::Text(_) => ctx.bbox(),
    };

    device.push_clip(&clip);
    let result = paint_pattern(ctx, device, resources, pattern, tint, area, alpha);
    device.pop_clip();

    result
}

/// Render the soft mask of the current state, if any, and open the group it
/// applies to.
pub(crate) fn begin_masked(ctx: &mut Context<'_>, device: &mut impl Device) -> Result<bool> {
    let Some(mask) = ctx.get().soft_mask.clone() else {
        return Ok(false);
    };

    soft_mask::render(ctx, device, &mask)?;
    device.push_group(&Group {
        soft_mask: true,
        ..Group::default()
    });

    Ok(true)
}

pub(crate) fn end_masked(device: &mut impl Device, masked: bool) {
    if masked {
        device.pop_group();
    }
}

/// The device-space clip path for a rectangle in user space.
pub(crate) fn rect_clip(ctx: &Context<'_>, rect: Rect) -> Clip {
    Clip::Path {
        path: ctx.get().ctm * rect_path(rect),
        fill_rule: FillRule::NonZero,
    }
}
