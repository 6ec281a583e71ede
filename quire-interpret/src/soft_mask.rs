use crate::context::{Context, Resources};
use crate::device::Device;
use crate::x_object::{FormXObject, draw_form};
use kurbo::{Affine, Rect, Shape};
use log::warn;
use quire_syntax::function::Function;
use quire_syntax::object::keys::*;
use quire_syntax::{Dict, DocError, Document, ErrorKind, Object, Result};

/// How the content of a soft mask is turned into mask values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskType {
    /// The luminosity of the mask content.
    Luminosity,
    /// The alpha of the mask content.
    Alpha,
}

/// A soft mask, passed to [`Device::begin_soft_mask`].
#[derive(Clone, Debug)]
pub struct SoftMask {
    /// How mask values are computed.
    pub mask_type: MaskType,
    /// The backdrop color of a luminosity mask, as sRGB. Black if not given.
    pub backdrop: Option<[f32; 3]>,
    /// The transfer function mapping computed mask values to the final ones.
    pub transfer: Option<Function>,
    /// The area covered by the mask content, in device space. The mask is
    /// zero (for alpha masks) or the backdrop luminosity outside of it.
    pub bbox: Rect,
}

/// A soft mask dictionary from an `ExtGState`, bound to the transform and
/// resources that were current when the graphics state was set.
#[derive(Debug)]
pub(crate) struct SoftMaskDef {
    form: FormXObject,
    mask_type: MaskType,
    backdrop: Option<[f32; 3]>,
    transfer: Option<Function>,
    ctm: Affine,
    resources: Resources,
}

impl SoftMaskDef {
    pub(crate) fn new(
        doc: &Document,
        dict: &Dict,
        ctm: Affine,
        resources: &Resources,
    ) -> Result<Self> {
        let mask_type = match doc.get(dict, S).as_name().map(|n| &n[..]) {
            Some(LUMINOSITY) => MaskType::Luminosity,
            Some(ALPHA) => MaskType::Alpha,
            other => {
                return Err(DocError::new(
                    ErrorKind::SyntaxError,
                    format!(
                        "invalid soft mask type {:?}",
                        other.map(String::from_utf8_lossy)
                    ),
                ));
            }
        };

        let Object::Stream(group) = doc.get(dict, G) else {
            return Err(DocError::new(
                ErrorKind::MissingRequiredEntry,
                "soft mask without a group form",
            ));
        };

        let form = FormXObject::new(doc, &group)?;

        let backdrop = doc.get(dict, BC).as_f32_array().and_then(|bc| {
            let space = form.group.as_ref().and_then(|g| g.color_space.clone());

            match space {
                Some(space) => Some(space.to_rgb(&bc)),
                None => {
                    warn!("soft mask backdrop without a group color space");

                    None
                }
            }
        });

        let transfer = match dict.get(TR) {
            None => None,
            Some(tr) if doc.resolve(tr).is_name(IDENTITY) => None,
            Some(tr) => Some(Function::new(doc, tr)?),
        };

        Ok(Self {
            form,
            mask_type,
            backdrop,
            transfer,
            ctm,
            resources: resources.clone(),
        })
    }
}

/// Render the content of a soft mask, announcing it to the device first.
pub(crate) fn render(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    def: &SoftMaskDef,
) -> Result<()> {
    let bounds = (def.ctm * def.form.matrix * def.form.bbox.to_path(0.1)).bounding_box();

    device.begin_soft_mask(&SoftMask {
        mask_type: def.mask_type,
        backdrop: def.backdrop,
        transfer: def.transfer.clone(),
        bbox: bounds.intersect(ctx.bbox()),
    });

    ctx.save_state();
    let state = ctx.get().fresh(def.ctm);
    *ctx.get_mut() = state;

    let result = draw_form(ctx, device, &def.resources, &def.form);

    ctx.restore_state(device);
    device.end_soft_mask();

    result
}
