/*!
A crate for interpreting the content streams of PDF pages.

The interpreter walks the operators of a page (and of the forms, patterns,
Type3 glyphs and annotation appearances it references), maintains the
graphics state and forwards the resulting drawing instructions to a
[`Device`]. What the device does with them (rasterizing, converting to
another vector format, extracting text, ...) is up to the implementor.

```no_run
use quire_interpret::{Context, InterpreterSettings, interpret_page, page_transform};
# use quire_interpret::device::Device;
# fn run(device: &mut impl Device) {
use quire_syntax::Document;

let data = std::fs::read("document.pdf").unwrap();
let doc = Document::open(data).unwrap();
let settings = InterpreterSettings::default();

for page in doc.pages() {
    let (transform, bbox) = page_transform(page, 1.0);
    let mut context = Context::new(&doc, transform, bbox, settings.clone());

    if let Err(e) = interpret_page(page, &mut context, device) {
        eprintln!("failed to interpret page: {e}");
    }
}
# }
```

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod annotation;
pub mod color;
mod context;
pub mod device;
pub mod font;
mod interpret;
mod ocg;
pub mod pattern;
pub mod shading;
mod soft_mask;
#[cfg(test)]
mod test_utils;
mod types;
mod util;
pub mod x_object;

pub use context::Context;
pub use device::Device;
pub use soft_mask::{MaskType, SoftMask};
pub use types::*;

use crate::annotation::draw_annotations;
use crate::context::Resources;
use kurbo::{Affine, Rect};
use log::{debug, error, warn};
use quire_cmap::CMapResolver;
use quire_syntax::{ErrorKind, Page, Result};
use std::rc::Rc;

/// A callback function for resolving warnings during interpretation.
pub type WarningSinkFn = Rc<dyn Fn(InterpreterWarning)>;

/// The purpose content is interpreted for. It selects which optional content
/// is visible.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Intent {
    /// Viewing on screen.
    #[default]
    View,
    /// Printing.
    Print,
}

/// Settings that should be applied during the interpretation process.
#[derive(Clone)]
pub struct InterpreterSettings {
    /// The intent, which decides which optional content groups and
    /// annotations are shown.
    pub intent: Intent,

    /// In certain cases, the interpreter emits a warning when an issue was
    /// encountered while interpreting the page. Providing a callback allows
    /// you to catch those warnings and handle them, if desired.
    pub warning_sink: WarningSinkFn,

    /// Resolves predefined CMaps (such as `UniGB-UCS2-H`) used by composite
    /// fonts. `Identity-H` and `Identity-V` are always available.
    pub cmap_resolver: Rc<CMapResolver>,

    /// Whether the normal appearance streams of annotations should be drawn
    /// after the page content.
    pub render_annotations: bool,

    /// The maximum number of cells painted for a single tiling pattern fill.
    pub max_pattern_tiles: u32,

    /// The maximum nesting depth of forms, patterns and Type3 glyphs.
    pub max_form_depth: u32,

    /// Resources not used by the last `store_max_age` pages are evicted from
    /// the object store of the document.
    pub store_max_age: u32,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            intent: Intent::View,
            warning_sink: Rc::new(|_| {}),
            cmap_resolver: Rc::new(|_| None),
            render_annotations: true,
            max_pattern_tiles: 10_000,
            max_form_depth: 32,
            store_max_age: 8,
        }
    }
}

impl std::fmt::Debug for InterpreterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterSettings")
            .field("intent", &self.intent)
            .field("render_annotations", &self.render_annotations)
            .field("max_pattern_tiles", &self.max_pattern_tiles)
            .field("max_form_depth", &self.max_form_depth)
            .field("store_max_age", &self.store_max_age)
            .finish_non_exhaustive()
    }
}

/// Warnings that can occur while interpreting a PDF file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterpreterWarning {
    /// An operator that is not known to the interpreter was encountered
    /// outside of a compatibility section.
    UnknownOperator,
    /// An operator could not be executed, for example because of missing
    /// or mistyped operands.
    OperatorFailed(ErrorKind),
    /// A named resource could not be found. Interpretation of the page
    /// stops.
    ResourceNotFound,
    /// An image failed to decode.
    ImageDecodeFailure,
    /// A font could not be loaded, or uses features that are not supported.
    UnsupportedFont,
    /// A tiling pattern needed more cells than allowed and was cut off.
    PatternTileLimit,
}

/// Interpret the contents of the page and render them into the device.
///
/// Errors in single operators are logged, reported to the warning sink and
/// skipped. A named resource that does not exist aborts the page: the open
/// graphics states and clips are unwound and the error is returned. Either
/// way, resources not used recently are evicted from the object store once
/// the page is done.
pub fn interpret_page(
    page: &Page,
    context: &mut Context<'_>,
    device: &mut impl Device,
) -> Result<()> {
    let doc = context.doc;
    let resources = Resources::new(page.resources().clone());
    let content = page.content_data(doc);

    let result = interpret::interpret(&content, &resources, context, device);

    if result.is_ok() && context.settings.render_annotations {
        draw_annotations(page, context, device);
    }

    if let Err(e) = &result {
        error!("aborted page: {e}");
    }

    let evicted = doc.age_sweep(context.settings.store_max_age);

    if evicted > 0 {
        debug!("evicted {evicted} resources from the store");
    }

    result
}

/// Compute the transform from the default user space of a page to a device
/// space with the origin in the top-left corner and the y-axis pointing down,
/// together with the bounds of the page in that device space.
///
/// The crop box and rotation of the page are taken into account, and
/// `scale` is the number of device units per user space unit.
pub fn page_transform(page: &Page, scale: f64) -> (Affine, Rect) {
    let crop_box = page.crop_box();
    let (w, h) = (crop_box.width(), crop_box.height());

    // Rotating clockwise in a y-down space.
    let rotation = match page.rotation() {
        0 => Affine::IDENTITY,
        90 => Affine::new([0.0, 1.0, -1.0, 0.0, h, 0.0]),
        180 => Affine::new([-1.0, 0.0, 0.0, -1.0, w, h]),
        270 => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, w]),
        other => {
            warn!("invalid page rotation {other}");
            Affine::IDENTITY
        }
    };

    let (width, height) = page.dimensions();
    let transform = Affine::scale(scale)
        * rotation
        * Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, h])
        * Affine::translate((-crop_box.x0, -crop_box.y0));
    let bbox = Rect::new(0.0, 0.0, width * scale, height * scale);

    (transform, bbox)
}
