use crate::context::{Context, Resources};
use crate::device::Device;
use crate::font::Font;
use crate::interpret::interpret;
use crate::interpret::path::{begin_masked, end_masked, paint_in_clip};
use crate::interpret::state::{Material, State};
use crate::{Clip, Glyph, TextRun};
use kurbo::Affine;
use log::warn;
use quire_syntax::{DocError, ErrorKind, Object, Result};
use std::rc::Rc;

/// Glyphs shown so far that share their drawing parameters.
#[derive(Debug)]
pub(crate) struct PendingRun {
    state: State,
    resources: Resources,
    glyphs: Vec<Glyph>,
}

/// Whether `op` leaves a pending text run untouched. Every other operator
/// flushes it first, so that the device sees drawing calls in content order.
pub(crate) fn keeps_batch(op: &[u8]) -> bool {
    matches!(
        op,
        b"BT"
            | b"Tc"
            | b"Tw"
            | b"Tz"
            | b"TL"
            | b"Tf"
            | b"Tr"
            | b"Ts"
            | b"Td"
            | b"TD"
            | b"Tm"
            | b"T*"
            | b"Tj"
            | b"TJ"
            | b"'"
            | b"\""
            | b"cm"
            | b"q"
            | b"w"
            | b"J"
            | b"j"
            | b"M"
            | b"d"
            | b"ri"
            | b"i"
            | b"CS"
            | b"cs"
            | b"SC"
            | b"SCN"
            | b"sc"
            | b"scn"
            | b"G"
            | b"g"
            | b"RG"
            | b"rg"
            | b"K"
            | b"k"
            | b"m"
            | b"l"
            | b"c"
            | b"v"
            | b"y"
            | b"h"
            | b"re"
            | b"MP"
            | b"DP"
            | b"BX"
            | b"EX"
    )
}

pub(crate) fn begin_text(ctx: &mut Context<'_>) {
    let text = &mut ctx.get_mut().text;
    text.text_matrix = Affine::IDENTITY;
    text.text_line_matrix = Affine::IDENTITY;
    ctx.text_clip.clear();
}

/// Finish a text object, intersecting the clip with the glyphs shown in a
/// clipping render mode.
pub(crate) fn end_text(ctx: &mut Context<'_>, device: &mut impl Device) -> Result<()> {
    let result = flush(ctx, device);
    let runs = std::mem::take(&mut ctx.text_clip);

    if !runs.is_empty() {
        ctx.push_clip(device, Clip::Text(runs));
    }

    result
}

pub(crate) fn show_text(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    text: &[u8],
) -> Result<()> {
    let Some(font) = ctx.get().text.font.clone() else {
        return Err(DocError::new(
            ErrorKind::MissingRequiredEntry,
            "text shown without a font",
        ));
    };

    let mut offset = 0;

    while offset < text.len() {
        let (code, len) = font.decode_next(&text[offset..]);
        offset += len;

        if ctx.ocg.is_visible() {
            let glyph = Glyph {
                code,
                code_len: len,
                cid: font.cid(code),
                unicode: font.unicode(code),
                transform: ctx.get().text.glyph_transform(&font, code),
            };

            push_glyph(ctx, device, resources, glyph)?;
        }

        ctx.get_mut().text.apply_code_advance(&font, code, len);
    }

    Ok(())
}

pub(crate) fn show_text_array(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    items: &[Object],
) -> Result<()> {
    for item in items {
        match item {
            Object::String(s) => show_text(ctx, device, resources, s)?,
            other => match other.as_f32() {
                Some(adjustment) => ctx.get_mut().text.apply_adjustment(adjustment),
                None => warn!("unexpected {} in text array", other.type_name()),
            },
        }
    }

    Ok(())
}

fn push_glyph(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    glyph: Glyph,
) -> Result<()> {
    let compatible = ctx
        .pending_text
        .as_ref()
        .is_some_and(|p| p.state.batches_with(ctx.get()));

    if !compatible {
        flush(ctx, device)?;

        ctx.pending_text = Some(PendingRun {
            state: ctx.get().clone(),
            resources: resources.clone(),
            glyphs: vec![],
        });
    }

    if let Some(pending) = &mut ctx.pending_text {
        pending.glyphs.push(glyph);
    }

    Ok(())
}

/// Send the pending text run to the device.
pub(crate) fn flush(ctx: &mut Context<'_>, device: &mut impl Device) -> Result<()> {
    let Some(pending) = ctx.pending_text.take() else {
        return Ok(());
    };

    let PendingRun {
        state,
        resources,
        glyphs,
    } = pending;

    let Some(font) = state.text.font.clone() else {
        return Ok(());
    };

    if glyphs.is_empty() {
        return Ok(());
    }

    let mode = state.text.render_mode;
    let fill = mode.fills().then(|| state.fill.material());
    let stroke = mode.strokes().then(|| state.stroke.material());

    let run = TextRun {
        font: font.clone(),
        font_size: state.text.font_size,
        transform: state.ctm,
        render_mode: mode,
        fill: match &fill {
            Some(Material::Color(c)) => Some(c.clone()),
            _ => None,
        },
        stroke: match &stroke {
            Some(Material::Color(c)) => Some((c.clone(), state.stroke_props.clone())),
            _ => None,
        },
        blend_mode: state.blend_mode,
        glyphs,
    };

    let mut result = Ok(());

    match begin_masked(ctx, device) {
        Ok(masked) => {
            device.draw_text(&run);

            // Patterns are painted through the glyph outlines.
            for (material, alpha) in [(&fill, state.fill.alpha), (&stroke, state.stroke.alpha)] {
                if let Some(Material::Pattern(pattern, tint)) = material
                    && result.is_ok()
                {
                    let clip = Clip::Text(vec![TextRun {
                        fill: None,
                        stroke: None,
                        ..run.clone()
                    }]);
                    result =
                        paint_in_clip(ctx, device, &resources, clip, pattern, tint.as_ref(), alpha);
                }
            }

            end_masked(device, masked);
        }
        Err(e) => result = Err(e),
    }

    if mode.clips() {
        if font.is_type3() {
            warn!("clipping with Type3 glyphs is not supported");
        } else {
            ctx.text_clip.push(run.clone());
        }
    }

    if font.is_type3() && (mode.fills() || mode.strokes()) {
        for glyph in &run.glyphs {
            if let Err(e) = draw_type3_glyph(ctx, device, &resources, &font, &state, glyph) {
                warn!("failed to draw Type3 glyph {}: {e}", glyph.code);
            }
        }
    }

    result
}

/// Run the glyph procedure of a Type3 glyph in the state the glyph was shown
/// in.
fn draw_type3_glyph(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    font: &Rc<Font>,
    state: &State,
    glyph: &Glyph,
) -> Result<()> {
    let doc = ctx.doc;

    let Some(procedure) = font.char_proc(doc, glyph.code) else {
        return Ok(());
    };

    if !ctx.can_nest() {
        return Ok(());
    }

    let data = doc.stream_data(&procedure)?;
    let resources = Resources::child(font.resources(doc), resources);

    ctx.save_state();

    let clip_depth = ctx.get().clip_depth;
    *ctx.get_mut() = State {
        ctm: state.ctm * glyph.transform * font.matrix(),
        clip_depth,
        ..state.clone()
    };
    // Glyph procedures can show text themselves, with a fresh text state.
    ctx.get_mut().text = Default::default();

    let result = ctx.nested(|ctx| interpret(&data, &resources, ctx, device));

    ctx.restore_state(device);

    result
}
