//! The sink drawing instructions are sent to.

use crate::color::Color;
use crate::shading::Shading;
use crate::soft_mask::SoftMask;
use crate::x_object::Image;
use crate::{Clip, Group, PathStyle, TextRun};
use kurbo::{Affine, BezPath};

/// A trait for a device that can be used to process PDF drawing instructions.
///
/// Clips and groups are always balanced: every `push_clip` is matched by a
/// `pop_clip` and every `push_group` by a `pop_group` before interpretation of
/// a page finishes, even if it is aborted.
pub trait Device {
    /// Paint a path given in user space, `transform` mapping it to device space.
    fn paint_path(&mut self, path: &BezPath, transform: Affine, style: &PathStyle<'_>);
    /// Fill the current clip with a shading. `transform` maps the shading
    /// space to device space.
    fn fill_shading(&mut self, shading: &Shading, transform: Affine, alpha: f32);
    /// Draw a run of glyphs.
    ///
    /// This is also called for invisible text (so that it can be used for
    /// text extraction) and for Type3 fonts, whose glyphs are additionally
    /// drawn by interpreting their procedures.
    fn draw_text(&mut self, run: &TextRun);
    /// Draw an image. `transform` maps the sample grid of the image (origin
    /// in the top-left corner, one unit per sample) to device space.
    fn draw_image(&mut self, image: &Image, transform: Affine, alpha: f32);
    /// Paint `color` through a stencil mask.
    fn draw_stencil(&mut self, mask: &Image, transform: Affine, color: &Color);
    /// Push a new clip to the clip stack.
    fn push_clip(&mut self, clip: &Clip);
    /// Pop the last clip from the clip stack.
    fn pop_clip(&mut self);
    /// Push a new transparency group.
    fn push_group(&mut self, group: &Group);
    /// Pop the last transparency group and composite it.
    fn pop_group(&mut self);
    /// Start rendering a soft mask. Everything drawn until the matching
    /// [`Device::end_soft_mask`] makes up the mask, which applies to the next
    /// group pushed with [`Group::soft_mask`] set.
    fn begin_soft_mask(&mut self, mask: &SoftMask);
    /// Finish rendering a soft mask.
    fn end_soft_mask(&mut self);
}
