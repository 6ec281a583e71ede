//! Drawing the appearance streams of annotations.

use crate::context::{Context, Resources};
use crate::device::Device;
use crate::util::{OptionLog, read_rect, rect_path};
use crate::x_object::{FormXObject, draw_form};
use crate::Intent;
use bitflags::bitflags;
use kurbo::{Affine, Rect, Shape};
use log::{debug, warn};
use quire_syntax::object::keys::*;
use quire_syntax::{Dict, Object, Page, Result};

bitflags! {
    /// The flags of an annotation (`/F`).
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct AnnotationFlags: u32 {
        /// Don't show the annotation if its type is unknown.
        const INVISIBLE = 1 << 0;
        /// Never show the annotation.
        const HIDDEN = 1 << 1;
        /// Print the annotation.
        const PRINT = 1 << 2;
        /// Don't scale the appearance with the page.
        const NO_ZOOM = 1 << 3;
        /// Don't rotate the appearance with the page.
        const NO_ROTATE = 1 << 4;
        /// Don't show the annotation on screen.
        const NO_VIEW = 1 << 5;
        /// Don't let users interact with the annotation.
        const READ_ONLY = 1 << 6;
        /// Don't let users delete or move the annotation.
        const LOCKED = 1 << 7;
        /// Invert `NO_VIEW` for certain events.
        const TOGGLE_NO_VIEW = 1 << 8;
        /// Don't let users modify the contents.
        const LOCKED_CONTENTS = 1 << 9;
    }
}

impl AnnotationFlags {
    /// Whether an annotation with these flags is shown for `intent`.
    pub fn is_shown(&self, intent: Intent) -> bool {
        if self.contains(Self::HIDDEN) {
            return false;
        }

        match intent {
            Intent::View => !self.contains(Self::NO_VIEW),
            Intent::Print => self.contains(Self::PRINT),
        }
    }
}

/// The transform that places an appearance stream with the given bounding
/// box and matrix into the annotation rectangle, from form space (before
/// the form matrix is applied) to user space of the page.
pub fn appearance_transform(rect: Rect, bbox: Rect, matrix: Affine) -> Affine {
    let transformed = (matrix * rect_path(bbox)).bounding_box();

    if transformed.width() == 0.0 || transformed.height() == 0.0 {
        return Affine::translate((rect.x0, rect.y0));
    }

    Affine::translate((rect.x0, rect.y0))
        * Affine::scale_non_uniform(
            rect.width() / transformed.width(),
            rect.height() / transformed.height(),
        )
        * Affine::translate((-transformed.x0, -transformed.y0))
}

/// Draw the normal appearances of the annotations of a page. Annotations
/// that fail to draw are logged and skipped.
pub(crate) fn draw_annotations(page: &Page, ctx: &mut Context<'_>, device: &mut impl Device) {
    let doc = ctx.doc;
    let resources = Resources::new(page.resources().clone());

    for annotation in page.annotations(doc) {
        if let Err(e) = draw_annotation(ctx, device, &resources, &annotation) {
            warn!("failed to draw annotation: {e}");
        }
    }
}

fn draw_annotation(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    resources: &Resources,
    annotation: &Dict,
) -> Result<()> {
    let doc = ctx.doc;

    let flags = doc
        .get(annotation, F)
        .as_int()
        .map(|f| AnnotationFlags::from_bits_truncate(f as u32))
        .unwrap_or(AnnotationFlags::empty());

    if !flags.is_shown(ctx.settings.intent)
        || annotation
            .get(OC)
            .is_some_and(|oc| ctx.ocg.is_hidden(doc, oc))
    {
        return Ok(());
    }

    let Some(rect) = annotation
        .get(RECT)
        .and_then(|r| read_rect(doc, r))
        .warn_none("annotation without a valid /Rect")
    else {
        return Ok(());
    };

    let Some(appearances) = doc.get_dict(annotation, AP) else {
        return Ok(());
    };

    // The normal appearance is either a stream or a dictionary of streams
    // keyed by appearance state.
    let appearance = match doc.get(&appearances, N) {
        Object::Stream(s) => s,
        Object::Dict(states) => {
            let state = doc.get(annotation, AS);
            let Some(state) = state.as_name() else {
                debug!("annotation with appearance states but no /AS");

                return Ok(());
            };

            match doc.get(&states, state) {
                Object::Stream(s) => s,
                _ => return Ok(()),
            }
        }
        _ => return Ok(()),
    };

    let form = FormXObject::new(doc, &appearance)?;
    let transform = appearance_transform(rect, form.bbox, form.matrix);

    ctx.save_state();
    let state = ctx.get().fresh(ctx.root_transform() * transform);
    *ctx.get_mut() = state;

    let result = draw_form(ctx, device, resources, &form);

    ctx.restore_state(device);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_maps(transform: Affine, from: (f64, f64), to: (f64, f64)) {
        let p = transform * kurbo::Point::new(from.0, from.1);
        assert!((p.x - to.0).abs() < 1e-9 && (p.y - to.1).abs() < 1e-9, "{p:?}");
    }

    #[test]
    fn flags() {
        let flags = AnnotationFlags::PRINT;
        assert!(flags.is_shown(Intent::View));
        assert!(flags.is_shown(Intent::Print));

        let flags = AnnotationFlags::NO_VIEW | AnnotationFlags::PRINT;
        assert!(!flags.is_shown(Intent::View));
        assert!(flags.is_shown(Intent::Print));

        assert!(!AnnotationFlags::empty().is_shown(Intent::Print));
        assert!(!(AnnotationFlags::HIDDEN | AnnotationFlags::PRINT).is_shown(Intent::Print));
    }

    #[test]
    fn appearance_in_rect() {
        let rect = Rect::new(100.0, 200.0, 150.0, 300.0);
        let transform = appearance_transform(rect, Rect::new(0.0, 0.0, 10.0, 20.0), Affine::IDENTITY);

        assert_maps(transform, (0.0, 0.0), (100.0, 200.0));
        assert_maps(transform, (10.0, 20.0), (150.0, 300.0));
    }

    #[test]
    fn rotated_appearance() {
        let rect = Rect::new(0.0, 0.0, 20.0, 10.0);
        let matrix = Affine::new([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]);
        let transform = appearance_transform(rect, Rect::new(0.0, 0.0, 10.0, 20.0), matrix) * matrix;

        // The form corner (10, 20) ends up at (-20, 10) after the matrix.
        assert_maps(transform, (10.0, 0.0), (20.0, 10.0));
        assert_maps(transform, (0.0, 20.0), (0.0, 0.0));
    }
}
