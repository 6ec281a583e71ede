use crate::context::{Context, MAX_STATES, Resources};
use crate::device::Device;
use crate::interpret::operands::Operands;
use crate::interpret::state::{dash_array, handle_gs, line_cap, line_join};
use crate::pattern::Pattern;
use crate::shading::{Shading, paint_shading};
use crate::x_object::{draw_inline_image, draw_x_object};
use crate::{FillRule, InterpreterWarning, TextRenderingMode};
use kurbo::{Affine, Point};
use log::{debug, warn};
use quire_syntax::lexer::Token;
use quire_syntax::object::keys::*;
use quire_syntax::parser::Parser;
use quire_syntax::trivia::{is_delimiter_character, is_white_space_character};
use quire_syntax::{Dict, DocError, ErrorKind, Name, Object, Result};

mod operands;
pub(crate) mod path;
pub(crate) mod state;
pub(crate) mod text;

/// Interpret a content stream, forwarding drawing instructions to `device`.
///
/// Errors in single operators are logged and skipped. Only a missing named
/// resource aborts the stream; the error is returned after all states and
/// clips pushed by the stream have been unwound.
pub(crate) fn interpret(
    data: &[u8],
    resources: &Resources,
    ctx: &mut Context<'_>,
    device: &mut impl Device,
) -> Result<()> {
    let base = ctx.num_states();
    let base_clips = ctx.get().clip_depth;
    let compat = ctx.compat;
    let mut parser = Parser::new_content(data, 0);
    let mut operands = Operands::new();
    // `q` operators beyond the stack limit, whose `Q` must be ignored as well.
    let mut skipped_saves = 0_u32;
    let mut result = Ok(());

    loop {
        let start = parser.offset();

        let token = match parser.tokens().next() {
            Ok(token) => token,
            Err(e) => {
                warn!("skipping malformed token at offset {start}: {e}");

                if parser.offset() <= start {
                    parser.jump(start + 1);
                }

                continue;
            }
        };

        match token {
            Token::Eof => break,
            Token::Int(i) => operands.push_number(i as f64),
            Token::Real(r) => operands.push_number(r),
            Token::Name(n) => operands.push_name(n),
            Token::String(s) | Token::HexString(s) => operands.push_string(s),
            Token::ArrayOpen | Token::DictOpen => match parser.parse_object_from(token) {
                Ok(object) => operands.push_object(object),
                Err(e) => {
                    warn!("failed to parse operand: {e}");
                    operands.clear();
                }
            },
            Token::ArrayClose | Token::DictClose | Token::BraceOpen | Token::BraceClose => {
                warn!("unexpected token {token:?} in content stream");
            }
            Token::Keyword(keyword) => {
                let op = &keyword[..];

                match op {
                    b"true" => operands.push_object(Object::Bool(true)),
                    b"false" => operands.push_object(Object::Bool(false)),
                    b"null" => operands.push_object(Object::Null),
                    _ => {
                        if !text::keeps_batch(op)
                            && let Err(e) = text::flush(ctx, device)
                        {
                            warn!("failed to draw text: {e}");
                        }

                        let outcome = match op {
                            b"q" => {
                                if ctx.num_states() - base >= MAX_STATES {
                                    warn!("graphics state stack exceeds {MAX_STATES}, ignoring q");
                                    skipped_saves += 1;
                                } else {
                                    ctx.save_state();
                                }

                                Ok(())
                            }
                            b"Q" => {
                                if skipped_saves > 0 {
                                    skipped_saves -= 1;
                                } else if ctx.num_states() > base {
                                    ctx.restore_state(device);
                                } else {
                                    warn!("unbalanced Q");
                                }

                                Ok(())
                            }
                            b"BI" => inline_image(&mut parser, resources, ctx, device),
                            _ => operands
                                .check()
                                .and_then(|_| run_operator(op, &operands, resources, ctx, device)),
                        };

                        operands.clear();

                        if let Err(e) = outcome {
                            if e.has_kind(ErrorKind::ResourceNotFound) {
                                ctx.warn(InterpreterWarning::ResourceNotFound);
                                result = Err(e);

                                break;
                            }

                            warn!("failed to run operator {}: {e}", keyword.as_str());
                            ctx.warn(InterpreterWarning::OperatorFailed(e.kind()));
                        }
                    }
                }
            }
        }
    }

    if let Err(e) = text::flush(ctx, device) {
        warn!("failed to draw text: {e}");
    }

    ctx.compat = compat;
    ctx.pending_clip = None;

    while ctx.num_states() > base {
        ctx.restore_state(device);
    }

    // Clips set outside of any `q` end with the stream as well.
    for _ in base_clips..ctx.get().clip_depth {
        device.pop_clip();
    }

    ctx.get_mut().clip_depth = base_clips;

    result
}

fn run_operator(
    op: &[u8],
    operands: &Operands,
    resources: &Resources,
    ctx: &mut Context<'_>,
    device: &mut impl Device,
) -> Result<()> {
    let doc = ctx.doc;

    match op {
        // General graphics state.
        b"w" => ctx.get_mut().stroke_props.line_width = operands.f32(0),
        b"J" => ctx.get_mut().stroke_props.line_cap = line_cap(operands.int(0)),
        b"j" => ctx.get_mut().stroke_props.line_join = line_join(operands.int(0)),
        b"M" => ctx.get_mut().stroke_props.miter_limit = operands.f32(0),
        b"d" => {
            let dashes = dash_array(operands.array()?);
            let props = &mut ctx.get_mut().stroke_props;
            props.dash_array = dashes;
            props.dash_offset = operands.f32(0);
        }
        b"ri" | b"i" => {}
        b"gs" => {
            let name = operands.name()?;
            let object = resources.require(doc, EXT_G_STATE, name)?;
            let dict = doc.resolve(&object).as_dict().cloned().ok_or_else(|| {
                DocError::new(
                    ErrorKind::TypeCheck,
                    format!("graphics state {} is not a dictionary", name.as_str()),
                )
            })?;

            handle_gs(&dict, ctx, resources)?;
        }
        b"cm" => {
            let n = operands.numbers();
            let m = Affine::new([
                operands.num(0),
                operands.num(1),
                operands.num(2),
                operands.num(3),
                operands.num(4),
                operands.num(5),
            ]);

            if n.len() < 6 {
                warn!("cm with {} operands", n.len());
            }

            let state = ctx.get_mut();
            state.ctm *= m;
        }

        // Path construction.
        b"m" => {
            let p = Point::new(operands.num(0), operands.num(1));
            ctx.last_point = p;
            ctx.sub_path_start = p;
            ctx.path.move_to(p);
        }
        b"l" => {
            let p = Point::new(operands.num(0), operands.num(1));
            path::line_to(ctx, p);
        }
        b"c" => {
            let p1 = Point::new(operands.num(0), operands.num(1));
            let p2 = Point::new(operands.num(2), operands.num(3));
            let p3 = Point::new(operands.num(4), operands.num(5));
            path::curve_to(ctx, p1, p2, p3);
        }
        b"v" => {
            let p1 = ctx.last_point;
            let p2 = Point::new(operands.num(0), operands.num(1));
            let p3 = Point::new(operands.num(2), operands.num(3));
            path::curve_to(ctx, p1, p2, p3);
        }
        b"y" => {
            let p1 = Point::new(operands.num(0), operands.num(1));
            let p3 = Point::new(operands.num(2), operands.num(3));
            path::curve_to(ctx, p1, p3, p3);
        }
        b"h" => path::close_path(ctx),
        b"re" => path::rect(
            ctx,
            operands.num(0),
            operands.num(1),
            operands.num(2),
            operands.num(3),
        ),

        // Path painting.
        b"S" => path::paint(ctx, device, resources, None, true)?,
        b"s" => {
            path::close_path(ctx);
            path::paint(ctx, device, resources, None, true)?;
        }
        b"f" | b"F" => path::paint(ctx, device, resources, Some(FillRule::NonZero), false)?,
        b"f*" => path::paint(ctx, device, resources, Some(FillRule::EvenOdd), false)?,
        b"B" => path::paint(ctx, device, resources, Some(FillRule::NonZero), true)?,
        b"B*" => path::paint(ctx, device, resources, Some(FillRule::EvenOdd), true)?,
        b"b" => {
            path::close_path(ctx);
            path::paint(ctx, device, resources, Some(FillRule::NonZero), true)?;
        }
        b"b*" => {
            path::close_path(ctx);
            path::paint(ctx, device, resources, Some(FillRule::EvenOdd), true)?;
        }
        b"n" => path::end_path(ctx, device),
        b"W" => ctx.pending_clip = Some(FillRule::NonZero),
        b"W*" => ctx.pending_clip = Some(FillRule::EvenOdd),

        // Text objects and text state.
        b"BT" => text::begin_text(ctx),
        b"ET" => text::end_text(ctx, device)?,
        b"Tc" => ctx.get_mut().text.char_space = operands.f32(0),
        b"Tw" => ctx.get_mut().text.word_space = operands.f32(0),
        b"Tz" => ctx.get_mut().text.horizontal_scaling = operands.f32(0),
        b"TL" => ctx.get_mut().text.leading = operands.f32(0),
        b"Ts" => ctx.get_mut().text.rise = operands.f32(0),
        b"Tr" => {
            let mode = TextRenderingMode::from_number(operands.int(0)).unwrap_or_else(|| {
                warn!("unknown text rendering mode {}", operands.int(0));

                TextRenderingMode::Fill
            });

            ctx.get_mut().text.render_mode = mode;
        }
        b"Tf" => {
            let object = resources.require(doc, FONT, operands.name()?)?;
            let font = ctx.load_font(&object)?;
            let text = &mut ctx.get_mut().text;
            text.font = Some(font);
            text.font_size = operands.f32(0);
        }
        b"Td" => ctx
            .get_mut()
            .text
            .next_line(operands.num(0), operands.num(1)),
        b"TD" => {
            let text = &mut ctx.get_mut().text;
            text.leading = -operands.f32(1);
            text.next_line(operands.num(0), operands.num(1));
        }
        b"Tm" => {
            let m = Affine::new([
                operands.num(0),
                operands.num(1),
                operands.num(2),
                operands.num(3),
                operands.num(4),
                operands.num(5),
            ]);
            let text = &mut ctx.get_mut().text;
            text.text_matrix = m;
            text.text_line_matrix = m;
        }
        b"T*" => next_line_with_leading(ctx),

        // Text showing.
        b"Tj" => text::show_text(ctx, device, resources, operands.string()?)?,
        b"TJ" => text::show_text_array(ctx, device, resources, operands.array()?)?,
        b"'" => {
            next_line_with_leading(ctx);
            text::show_text(ctx, device, resources, operands.string()?)?;
        }
        b"\"" => {
            let text = &mut ctx.get_mut().text;
            text.word_space = operands.f32(0);
            text.char_space = operands.f32(1);
            next_line_with_leading(ctx);
            text::show_text(ctx, device, resources, operands.string()?)?;
        }

        // Type3 glyph metrics.
        b"d0" => {}
        b"d1" => ctx.get_mut().color_locked = true,

        // Color.
        b"CS" | b"cs" => {
            let color_space = resources.color_space(doc, operands.name()?)?;
            let state = ctx.get_mut();

            if !state.color_locked {
                let paint = if op == b"CS" {
                    &mut state.stroke
                } else {
                    &mut state.fill
                };
                paint.set_color_space(color_space);
            }
        }
        b"SC" | b"SCN" | b"sc" | b"scn" => {
            let stroke = op[0] == b'S';
            let pattern = match operands.name() {
                Ok(name) if op.len() == 3 => {
                    let object = resources.require(doc, PATTERN, name)?;

                    Some(Pattern::new(doc, &object)?)
                }
                _ => None,
            };

            let state = ctx.get_mut();

            if !state.color_locked {
                let paint = if stroke {
                    &mut state.stroke
                } else {
                    &mut state.fill
                };

                let expected = if paint.color_space.is_pattern() {
                    paint
                        .color_space
                        .pattern_base()
                        .map(|b| b.num_components())
                        .unwrap_or(0)
                } else {
                    paint.color_space.num_components()
                };

                let mut components = operands
                    .numbers()
                    .iter()
                    .map(|n| *n as f32)
                    .collect::<crate::color::ColorComponents>();

                if components.len() != expected {
                    debug!(
                        "expected {expected} color components, found {}",
                        components.len()
                    );
                    components.resize(expected, 0.0);
                }

                paint.components = components;

                if pattern.is_some() {
                    paint.pattern = pattern;
                }
            }
        }
        b"G" | b"g" | b"RG" | b"rg" | b"K" | b"k" => {
            let (color_space, n) = match op {
                b"G" | b"g" => (crate::color::ColorSpace::device_gray(), 1),
                b"RG" | b"rg" => (crate::color::ColorSpace::device_rgb(), 3),
                _ => (crate::color::ColorSpace::device_cmyk(), 4),
            };

            let components = (0..n).map(|i| operands.f32(i)).collect();
            let state = ctx.get_mut();

            if !state.color_locked {
                let paint = if op[0].is_ascii_uppercase() {
                    &mut state.stroke
                } else {
                    &mut state.fill
                };
                paint.color_space = color_space;
                paint.components = components;
                paint.pattern = None;
            }
        }

        // Shadings, images and forms.
        b"sh" => {
            let object = resources.require(doc, SHADING, operands.name()?)?;
            let shading = Shading::new(doc, &object)?;
            paint_shading(ctx, device, &shading)?;
        }
        b"Do" => {
            let object = resources.require(doc, X_OBJECT, operands.name()?)?;
            draw_x_object(ctx, device, resources, &object)?;
        }
        b"ID" | b"EI" => warn!("{} outside of an inline image", String::from_utf8_lossy(op)),

        // Marked content.
        b"MP" | b"DP" => {}
        b"BMC" => ctx.ocg.begin_marked_content(),
        b"BDC" => begin_marked_content(ctx, resources, operands)?,
        b"EMC" => ctx.ocg.end_marked_content(),

        // Compatibility sections.
        b"BX" => ctx.compat += 1,
        b"EX" => ctx.compat = ctx.compat.saturating_sub(1),

        _ => {
            let op = String::from_utf8_lossy(op);

            if ctx.compat > 0 {
                debug!("ignoring unknown operator {op} in compatibility section");
            } else {
                warn!("unknown operator {op}");
                ctx.warn(InterpreterWarning::UnknownOperator);
            }
        }
    }

    Ok(())
}

fn next_line_with_leading(ctx: &mut Context<'_>) {
    let text = &mut ctx.get_mut().text;
    let leading = text.leading as f64;
    text.next_line(0.0, -leading);
}

fn begin_marked_content(
    ctx: &mut Context<'_>,
    resources: &Resources,
    operands: &Operands,
) -> Result<()> {
    let doc = ctx.doc;

    if &operands.name()?[..] != OC {
        ctx.ocg.begin_marked_content();

        return Ok(());
    }

    let properties = match operands.object() {
        Some(Object::Name(name)) => resources.get(doc, PROPERTIES, name),
        Some(other) => Some(other.clone()),
        None => None,
    };

    match properties {
        Some(properties) => {
            let hidden = ctx.ocg.is_hidden(doc, &properties);
            ctx.ocg.begin_optional_content(!hidden);
        }
        None => {
            warn!("optional content without properties, treating as visible");
            ctx.ocg.begin_optional_content(true);
        }
    }

    Ok(())
}

/// Parse an inline image following `BI` and draw it.
fn inline_image(
    parser: &mut Parser<'_>,
    resources: &Resources,
    ctx: &mut Context<'_>,
    device: &mut impl Device,
) -> Result<()> {
    let mut dict = Dict::new();

    loop {
        match parser.tokens().next()? {
            Token::Keyword(k) if &k[..] == b"ID" => break,
            Token::Name(key) => {
                let value = parser.parse_object()?;
                dict.insert(expand_key(key), expand_value(value));
            }
            Token::Eof => {
                return Err(DocError::new(
                    ErrorKind::SyntaxError,
                    "unterminated inline image dictionary",
                ));
            }
            other => {
                return Err(DocError::new(
                    ErrorKind::SyntaxError,
                    format!("unexpected {other:?} in inline image dictionary"),
                ));
            }
        }
    }

    let data = parser.data();
    // A single white-space character separates `ID` from the data.
    let start = (parser.tokens().lexer_mut().offset() + 1).min(data.len());
    let length = expected_length(&dict, resources, ctx);

    let end = length
        .and_then(|len| start.checked_add(len))
        .filter(|end| *end <= data.len() && is_ei_at(data, skip_white_space(data, *end)))
        .or_else(|| find_ei(data, start));

    let Some(end) = end else {
        parser.jump(data.len());

        return Err(DocError::new(
            ErrorKind::SyntaxError,
            "inline image without EI",
        ));
    };

    let ei = skip_white_space(data, end);
    parser.jump(ei + 2);

    let image_data = &data[start..end.max(start)];

    if ctx.ocg.is_visible() {
        draw_inline_image(ctx, device, resources, dict, image_data)?;
    }

    Ok(())
}

fn expand_key(key: Name) -> Name {
    let expanded: &[u8] = match &key[..] {
        b"BPC" => BITS_PER_COMPONENT,
        b"CS" => COLOR_SPACE,
        b"D" => DECODE,
        b"DP" => DECODE_PARMS,
        b"F" => FILTER,
        b"H" => HEIGHT,
        b"IM" => IMAGE_MASK,
        b"I" => INTERPOLATE,
        b"W" => WIDTH,
        _ => return key,
    };

    Name::new(expanded)
}

fn expand_name(name: &[u8]) -> Option<&'static [u8]> {
    Some(match name {
        b"G" => DEVICE_GRAY,
        b"RGB" => DEVICE_RGB,
        b"CMYK" => DEVICE_CMYK,
        b"I" => INDEXED,
        b"AHx" => ASCII_HEX_DECODE,
        b"A85" => ASCII85_DECODE,
        b"LZW" => LZW_DECODE,
        b"Fl" => FLATE_DECODE,
        b"RL" => RUN_LENGTH_DECODE,
        b"CCF" => CCITTFAX_DECODE,
        b"DCT" => DCT_DECODE,
        _ => return None,
    })
}

fn expand_value(value: Object) -> Object {
    match value {
        Object::Name(name) => match expand_name(&name) {
            Some(expanded) => Object::name(expanded),
            None => Object::Name(name),
        },
        Object::Array(items) => {
            Object::array(items.iter().cloned().map(expand_value).collect())
        }
        other => other,
    }
}

/// The length of unfiltered image data, if it can be computed from the
/// dictionary.
fn expected_length(dict: &Dict, resources: &Resources, ctx: &Context<'_>) -> Option<usize> {
    if dict.contains_key(FILTER) {
        return None;
    }

    let width = dict.get_int(WIDTH)?.max(0) as usize;
    let height = dict.get_int(HEIGHT)?.max(0) as usize;

    let (components, bpc) = if dict.get_bool(IMAGE_MASK).unwrap_or(false) {
        (1, 1)
    } else {
        let components = match dict.get(COLOR_SPACE)? {
            Object::Name(name) => resources.color_space(ctx.doc, name).ok()?,
            other => crate::color::ColorSpace::new(ctx.doc, other).ok()?,
        }
        .num_components();

        (components, dict.get_int(BITS_PER_COMPONENT)?.max(0) as usize)
    };

    width
        .checked_mul(components)?
        .checked_mul(bpc)?
        .div_ceil(8)
        .checked_mul(height)
}

fn skip_white_space(data: &[u8], mut pos: usize) -> usize {
    while pos < data.len() && is_white_space_character(data[pos]) {
        pos += 1;
    }

    pos
}

fn is_ei_at(data: &[u8], pos: usize) -> bool {
    data.get(pos..pos + 2) == Some(b"EI")
        && data
            .get(pos + 2)
            .is_none_or(|b| is_white_space_character(*b) || is_delimiter_character(*b))
}

/// Find the end of inline image data by scanning for `EI` preceded by white
/// space.
fn find_ei(data: &[u8], start: usize) -> Option<usize> {
    (start..data.len()).find_map(|pos| {
        (pos > start && is_white_space_character(data[pos - 1]) && is_ei_at(data, pos))
            .then_some(pos - 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations() {
        assert_eq!(&expand_key(Name::new(b"BPC"))[..], BITS_PER_COMPONENT);
        assert_eq!(&expand_key(Name::new(b"Foo"))[..], b"Foo");
        assert_eq!(
            expand_value(Object::name(b"RGB")),
            Object::name(DEVICE_RGB)
        );
        assert_eq!(
            expand_value(Object::array(vec![Object::name(b"AHx"), Object::name(b"Fl")])),
            Object::array(vec![
                Object::name(ASCII_HEX_DECODE),
                Object::name(FLATE_DECODE)
            ])
        );
    }

    #[test]
    fn ei_scanning() {
        let data = b"ID abcEI\nxyz EIfoo EI\n";
        // `EIfoo` is part of the data, the image ends before the last `EI`.
        assert_eq!(find_ei(data, 3), Some(18));
        assert!(is_ei_at(data, 19));
        assert!(!is_ei_at(data, 13));
        assert!(is_ei_at(b"EI", 0));
    }
}
