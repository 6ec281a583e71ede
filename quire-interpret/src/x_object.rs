//! Image and form XObjects, and inline images.

use crate::color::{Color, ColorSpace};
use crate::context::{Context, Resources};
use crate::device::Device;
use crate::interpret::interpret;
use crate::interpret::path::{begin_masked, end_masked, paint_in_clip, rect_clip};
use crate::interpret::state::Material;
use crate::soft_mask::{self, MaskType, SoftMask};
use crate::util::{interpolate, read_matrix, read_rect, rect_path};
use crate::{BlendMode, Group, InterpreterWarning};
use kurbo::{Affine, Rect, Shape};
use log::{debug, warn};
use quire_syntax::bit::BitReader;
use quire_syntax::filter::ExternalCodec;
use quire_syntax::object::keys::*;
use quire_syntax::store::ResourceKind;
use quire_syntax::{Dict, DocError, Document, ErrorKind, Object, Result, Stream};
use smallvec::{SmallVec, smallvec};
use std::rc::Rc;

// Images with more samples than this are rejected instead of decoded.
const MAX_SAMPLES: u64 = 1 << 28;

/// The mask of an image, from its `/Mask` entry.
#[derive(Debug, Clone)]
pub enum ImageMask {
    /// A stencil mask. Samples where the mask is 1 are left unpainted.
    Stencil(Rc<Image>),
    /// Ranges of raw sample values, one per component. Pixels whose samples
    /// all lie in their range are left unpainted.
    ColorKey(SmallVec<[(u32, u32); 4]>),
}

/// An image, either from an image XObject or an inline image.
#[derive(Debug)]
pub struct Image {
    width: u32,
    height: u32,
    bits_per_component: u8,
    color_space: Option<ColorSpace>,
    decode: SmallVec<[(f32, f32); 4]>,
    data: Vec<u8>,
    encoded_with: Option<(ExternalCodec, Dict)>,
    interpolate: bool,
    is_mask: bool,
    soft_mask: Option<Rc<Image>>,
    mask: Option<ImageMask>,
}

impl Image {
    /// Load an image from its stream.
    ///
    /// `resources` is used to look up color spaces given by name, which only
    /// inline images can do.
    pub(crate) fn new(doc: &Document, stream: &Stream, resources: Option<&Resources>) -> Result<Self> {
        let dict = &stream.dict;
        let decoded = doc.decode_stream(stream)?;
        let jpx = matches!(decoded.encoded_with, Some((ExternalCodec::Jpx, _)));

        let dimension = |key: &[u8]| {
            doc.get(dict, key)
                .as_int()
                .filter(|v| *v > 0)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    DocError::new(
                        ErrorKind::MissingRequiredEntry,
                        format!("image without a valid /{}", String::from_utf8_lossy(key)),
                    )
                })
        };

        let width = dimension(WIDTH)?;
        let height = dimension(HEIGHT)?;
        let is_mask = doc.get(dict, IMAGE_MASK).as_bool().unwrap_or(false);

        let bits_per_component = if is_mask {
            1
        } else {
            match doc.get(dict, BITS_PER_COMPONENT).as_int() {
                Some(bpc @ (1 | 2 | 4 | 8 | 16)) => bpc as u8,
                None if jpx => 8,
                other => {
                    return Err(DocError::new(
                        ErrorKind::SyntaxError,
                        format!("invalid image bits per component {other:?}"),
                    ));
                }
            }
        };

        let color_space = if is_mask {
            None
        } else {
            match dict.get(COLOR_SPACE) {
                Some(Object::Name(name)) => Some(match resources {
                    Some(resources) => resources.color_space(doc, name)?,
                    None => ColorSpace::new(doc, &Object::Name(name.clone()))?,
                }),
                Some(object) => Some(ColorSpace::new(doc, object)?),
                // JPEG 2000 data brings its own color space.
                None if jpx => None,
                None => {
                    return Err(DocError::new(
                        ErrorKind::MissingRequiredEntry,
                        "image without a color space",
                    ));
                }
            }
        };

        if color_space.as_ref().is_some_and(|cs| cs.is_pattern()) {
            return Err(DocError::new(
                ErrorKind::SyntaxError,
                "images can't use a pattern color space",
            ));
        }

        let components = color_space.as_ref().map_or(1, |cs| cs.num_components());

        if width as u64 * height as u64 * components as u64 > MAX_SAMPLES {
            return Err(DocError::new(
                ErrorKind::UnsupportedFeature,
                format!("image of {width}x{height} is too large"),
            ));
        }

        let decode = match doc.get(dict, DECODE).as_f32_array() {
            Some(values) if values.len() >= 2 * components => {
                values.chunks_exact(2).map(|p| (p[0], p[1])).collect()
            }
            _ => match &color_space {
                Some(cs) => cs.default_decode(bits_per_component),
                None => smallvec![(0.0, 1.0)],
            },
        };

        let soft_mask = match doc.get(dict, SMASK) {
            Object::Stream(s) => Image::new(doc, &s, None)
                .inspect_err(|e| warn!("failed to load soft mask of image: {e}"))
                .ok()
                .map(Rc::new),
            _ => None,
        };

        let mask = match doc.get(dict, MASK) {
            Object::Stream(s) => match Image::new(doc, &s, None) {
                Ok(mask) if mask.is_mask => Some(ImageMask::Stencil(Rc::new(mask))),
                Ok(_) => {
                    warn!("image /Mask is not a stencil mask, ignoring it");

                    None
                }
                Err(e) => {
                    warn!("failed to load mask of image: {e}");

                    None
                }
            },
            Object::Array(items) => {
                let values = items
                    .iter()
                    .filter_map(|v| v.as_int())
                    .map(|v| v.max(0) as u32)
                    .collect::<SmallVec<[u32; 8]>>();

                Some(ImageMask::ColorKey(
                    values.chunks_exact(2).map(|p| (p[0], p[1])).collect(),
                ))
            }
            _ => None,
        };

        Ok(Self {
            width,
            height,
            bits_per_component,
            color_space,
            decode,
            data: decoded.data,
            encoded_with: decoded.encoded_with,
            interpolate: doc.get(dict, INTERPOLATE).as_bool().unwrap_or(false),
            is_mask,
            soft_mask,
            mask,
        })
    }

    /// The width in samples.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in samples.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The number of bits per sample component.
    pub fn bits_per_component(&self) -> u8 {
        self.bits_per_component
    }

    /// The color space, which is `None` for stencil masks and for JPEG 2000
    /// images that don't specify one.
    pub fn color_space(&self) -> Option<&ColorSpace> {
        self.color_space.as_ref()
    }

    /// The decode ranges of the components.
    pub fn decode(&self) -> &[(f32, f32)] {
        &self.decode
    }

    /// The image data. If [`Image::encoded_with`] is set, it is still
    /// encoded with that codec.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The codec (and its decode parameters) the data is still encoded with,
    /// if no decoder for it was registered with the document.
    pub fn encoded_with(&self) -> Option<&(ExternalCodec, Dict)> {
        self.encoded_with.as_ref()
    }

    /// Whether the image should be smoothed when scaled up.
    pub fn interpolate(&self) -> bool {
        self.interpolate
    }

    /// Whether the image is a stencil mask.
    pub fn is_mask(&self) -> bool {
        self.is_mask
    }

    /// The soft mask (`/SMask`) of the image.
    pub fn soft_mask(&self) -> Option<&Rc<Image>> {
        self.soft_mask.as_ref()
    }

    /// The mask (`/Mask`) of the image.
    pub fn mask(&self) -> Option<&ImageMask> {
        self.mask.as_ref()
    }

    fn num_components(&self) -> usize {
        self.color_space.as_ref().map_or(1, |cs| cs.num_components())
    }

    /// The raw sample values, row by row. Rows start at a byte boundary and
    /// missing data reads as zero.
    fn raw_samples(&self) -> Option<Vec<u32>> {
        if self.encoded_with.is_some() {
            return None;
        }

        let per_row = self.width as usize * self.num_components();
        let row_bytes = (per_row * self.bits_per_component as usize).div_ceil(8);
        let mut samples = Vec::with_capacity(per_row * self.height as usize);

        for y in 0..self.height as usize {
            let start = (y * row_bytes).min(self.data.len());
            let end = (start + row_bytes).min(self.data.len());
            let mut reader = BitReader::new(&self.data[start..end]);

            for _ in 0..per_row {
                samples.push(reader.read(self.bits_per_component).unwrap_or(0));
            }
        }

        Some(samples)
    }

    /// The sample values mapped through the decode array, row by row.
    ///
    /// Returns `None` if the data is still encoded with an external codec.
    pub fn samples(&self) -> Option<Vec<f32>> {
        let max = ((1_u32 << self.bits_per_component) - 1) as f32;
        let components = self.num_components();

        Some(
            self.raw_samples()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let (d_min, d_max) = self
                        .decode
                        .get(i % components)
                        .copied()
                        .unwrap_or((0.0, 1.0));

                    interpolate(v as f32, 0.0, max, d_min, d_max)
                })
                .collect(),
        )
    }

    /// The samples of a single-component image scaled to another size with
    /// nearest-neighbor sampling.
    fn resampled(&self, width: u32, height: u32) -> Option<Vec<f32>> {
        let samples = self.samples()?;

        if self.width == width && self.height == height {
            return Some(samples);
        }

        let x_factor = self.width as f32 / width as f32;
        let y_factor = self.height as f32 / height as f32;
        let mut output = Vec::with_capacity(width as usize * height as usize);

        for y in 0..height {
            let sy = ((y as f32 * y_factor) as u32).min(self.height - 1);

            for x in 0..width {
                let sx = ((x as f32 * x_factor) as u32).min(self.width - 1);
                output.push(samples[(sy * self.width + sx) as usize]);
            }
        }

        Some(output)
    }

    /// Convert the image to 8-bit RGBA pixels, with its masks applied.
    ///
    /// Stencil masks produce black pixels whose alpha is the coverage.
    /// Returns `None` if the data is still encoded with an external codec.
    pub fn to_rgba8(&self) -> Option<Vec<u8>> {
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;

        if self.is_mask {
            return Some(
                self.samples()?
                    .into_iter()
                    .flat_map(|v| [0, 0, 0, to_u8(1.0 - v)])
                    .collect(),
            );
        }

        let color_space = self.color_space.as_ref()?;
        let components = color_space.num_components();
        let pixels = self.width as usize * self.height as usize;

        let mut alpha = self
            .soft_mask
            .as_ref()
            .and_then(|m| m.resampled(self.width, self.height))
            .unwrap_or_else(|| vec![1.0; pixels]);

        match &self.mask {
            Some(ImageMask::Stencil(mask)) => {
                if let Some(values) = mask.resampled(self.width, self.height) {
                    for (a, v) in alpha.iter_mut().zip(values) {
                        *a *= 1.0 - v;
                    }
                }
            }
            Some(ImageMask::ColorKey(ranges)) => {
                let raw = self.raw_samples()?;

                for (a, pixel) in alpha.iter_mut().zip(raw.chunks_exact(components)) {
                    let keyed = pixel
                        .iter()
                        .zip(ranges)
                        .all(|(v, (min, max))| (*min..=*max).contains(v));

                    if keyed && ranges.len() >= components {
                        *a = 0.0;
                    }
                }
            }
            None => {}
        }

        let samples = self.samples()?;
        let mut rgba = Vec::with_capacity(pixels * 4);

        for (pixel, a) in samples.chunks_exact(components).zip(alpha) {
            let [r, g, b] = color_space.to_rgb(pixel);
            rgba.extend([to_u8(r), to_u8(g), to_u8(b), to_u8(a)]);
        }

        Some(rgba)
    }
}

/// Attributes of a transparency group form.
#[derive(Debug, Clone)]
pub(crate) struct GroupAttributes {
    pub(crate) isolated: bool,
    pub(crate) knockout: bool,
    pub(crate) color_space: Option<ColorSpace>,
}

/// A form XObject.
#[derive(Debug)]
pub(crate) struct FormXObject {
    content: Rc<Stream>,
    pub(crate) bbox: Rect,
    pub(crate) matrix: Affine,
    resources: Option<Dict>,
    pub(crate) group: Option<GroupAttributes>,
    oc: Option<Object>,
}

impl FormXObject {
    pub(crate) fn new(doc: &Document, stream: &Rc<Stream>) -> Result<Self> {
        let dict = &stream.dict;

        let bbox = dict
            .get(BBOX)
            .and_then(|b| read_rect(doc, b))
            .ok_or_else(|| DocError::new(ErrorKind::MissingRequiredEntry, "form without /BBox"))?;

        let matrix = dict
            .get(MATRIX)
            .and_then(|m| read_matrix(doc, m))
            .unwrap_or_default();

        let group = doc
            .get_dict(dict, GROUP)
            .filter(|g| doc.get(g, S).is_name(TRANSPARENCY))
            .map(|g| GroupAttributes {
                isolated: doc.get(&g, I).as_bool().unwrap_or(false),
                knockout: doc.get(&g, K).as_bool().unwrap_or(false),
                color_space: g.get(CS).and_then(|cs| {
                    ColorSpace::new(doc, cs)
                        .inspect_err(|e| warn!("invalid group color space: {e}"))
                        .ok()
                }),
            });

        Ok(Self {
            content: stream.clone(),
            bbox,
            matrix,
            resources: doc.get_dict(dict, RESOURCES),
            group,
            oc: dict.get(OC).cloned(),
        })
    }
}

/// Draw the XObject `object` (`Do`).
pub(crate) fn draw_x_object(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    object: &Object,
) -> Result<()> {
    let doc = ctx.doc;

    let Object::Stream(stream) = doc.try_resolve(object)? else {
        return Err(DocError::new(ErrorKind::TypeCheck, "XObject is not a stream"));
    };

    match doc.get(&stream.dict, SUBTYPE).as_name().map(|n| &n[..]) {
        Some(IMAGE) => {
            if !ctx.ocg.is_visible()
                || stream.dict.get(OC).is_some_and(|oc| ctx.ocg.is_hidden(doc, oc))
            {
                return Ok(());
            }

            let image = match object {
                Object::Ref(_) => doc.load_resource(object, ResourceKind::Image, || {
                    Image::new(doc, &stream, None)
                }),
                _ => Image::new(doc, &stream, None).map(Rc::new),
            };

            match image {
                Ok(image) => draw_image(ctx, device, resources, &image),
                Err(e) => {
                    warn!("failed to load image: {e}");
                    ctx.warn(InterpreterWarning::ImageDecodeFailure);

                    Ok(())
                }
            }
        }
        Some(FORM) => {
            let form = FormXObject::new(doc, &stream)?;

            draw_form(ctx, device, resources, &form)
        }
        Some(PS) => {
            debug!("ignoring PostScript XObject");

            Ok(())
        }
        other => Err(DocError::new(
            ErrorKind::UnsupportedFeature,
            format!(
                "unknown XObject subtype {:?}",
                other.map(String::from_utf8_lossy)
            ),
        )),
    }
}

/// Draw an inline image whose dictionary has its abbreviations expanded.
pub(crate) fn draw_inline_image(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    dict: Dict,
    data: &[u8],
) -> Result<()> {
    let stream = Stream::from_memory(dict, data);

    match Image::new(ctx.doc, &stream, Some(resources)) {
        Ok(image) => draw_image(ctx, device, resources, &image),
        Err(e) => {
            warn!("failed to load inline image: {e}");
            ctx.warn(InterpreterWarning::ImageDecodeFailure);

            Ok(())
        }
    }
}

fn draw_image(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    image: &Image,
) -> Result<()> {
    let state = ctx.get().clone();
    // Images fill the unit square of user space, with the first row at the top.
    let transform = state.ctm
        * Affine::new([
            1.0 / image.width as f64,
            0.0,
            0.0,
            -1.0 / image.height as f64,
            0.0,
            1.0,
        ]);

    let masked = begin_masked(ctx, device)?;
    let blended = state.blend_mode != BlendMode::Normal;

    if blended {
        device.push_group(&Group {
            blend_mode: state.blend_mode,
            ..Group::default()
        });
    }

    let mut result = Ok(());

    if !image.is_mask {
        device.draw_image(image, transform, state.fill.alpha);
    } else {
        match state.fill.material() {
            Material::Color(color) => device.draw_stencil(image, transform, &color),
            Material::Pattern(pattern, tint) => {
                // The stencil becomes the soft mask of a group the pattern is
                // painted into.
                let unit = Rect::new(0.0, 0.0, 1.0, 1.0);
                let bbox = (state.ctm * rect_path(unit)).bounding_box();

                device.begin_soft_mask(&SoftMask {
                    mask_type: MaskType::Alpha,
                    backdrop: None,
                    transfer: None,
                    bbox: bbox.intersect(ctx.bbox()),
                });
                device.draw_stencil(image, transform, &Color::black());
                device.end_soft_mask();

                device.push_group(&Group {
                    soft_mask: true,
                    ..Group::default()
                });

                let clip = rect_clip(ctx, unit);
                let alpha = state.fill.alpha;
                result = paint_in_clip(ctx, device, resources, clip, &pattern, tint.as_ref(), alpha);

                device.pop_group();
            }
        }
    }

    if blended {
        device.pop_group();
    }

    end_masked(device, masked);

    result
}

/// Run the content of a form in its own coordinate system, clipped to its
/// bounding box and wrapped in a group if it is a transparency group.
pub(crate) fn draw_form(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    form: &FormXObject,
) -> Result<()> {
    let doc = ctx.doc;

    if form.oc.as_ref().is_some_and(|oc| ctx.ocg.is_hidden(doc, oc)) || !ctx.can_nest() {
        return Ok(());
    }

    let data = doc.stream_data(&form.content)?;
    let resources = Resources::child(form.resources.clone(), resources);

    ctx.save_state();
    ctx.get_mut().ctm *= form.matrix;

    if let Some(group) = &form.group {
        let state = ctx.get().clone();

        let masked = match &state.soft_mask {
            Some(mask) => match soft_mask::render(ctx, device, mask) {
                Ok(()) => true,
                Err(e) => {
                    warn!("failed to render soft mask: {e}");

                    false
                }
            },
            None => false,
        };

        device.push_group(&Group {
            opacity: state.fill.alpha,
            blend_mode: state.blend_mode,
            isolated: group.isolated,
            knockout: group.knockout,
            color_space: group.color_space.clone(),
            soft_mask: masked,
        });

        // The group itself is composited with these, not its content.
        let state = ctx.get_mut();
        state.fill.alpha = 1.0;
        state.stroke.alpha = 1.0;
        state.blend_mode = BlendMode::Normal;
        state.soft_mask = None;
    }

    let bounds = (ctx.get().ctm * rect_path(form.bbox)).bounding_box();
    let clip = rect_clip(ctx, form.bbox);
    ctx.push_clip(device, clip);
    ctx.push_root_transform();
    ctx.push_bbox(bounds);

    let result = ctx.nested(|ctx| interpret(&data, &resources, ctx, device));

    ctx.pop_bbox();
    ctx.pop_root_transform();
    ctx.restore_state(device);

    if form.group.is_some() {
        device.pop_group();
    }

    result
}
