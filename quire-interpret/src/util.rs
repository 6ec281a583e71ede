use kurbo::{Affine, Rect};
use log::warn;
use quire_syntax::{Document, Object};

pub(crate) trait OptionLog {
    fn warn_none(self, f: &str) -> Self;
}

impl<T> OptionLog for Option<T> {
    #[inline]
    fn warn_none(self, f: &str) -> Self {
        self.or_else(|| {
            warn!("{f}");

            None
        })
    }
}

pub(crate) fn interpolate(x: f32, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32 {
    if x_max == x_min {
        return y_min;
    }

    y_min + (x - x_min) * (y_max - y_min) / (x_max - x_min)
}

/// Read a rectangle, normalizing the order of its corners.
pub(crate) fn read_rect(doc: &Document, object: &Object) -> Option<Rect> {
    let [x0, y0, x1, y1] = doc.resolve(object).as_f32_n::<4>()?;

    Some(Rect::new(x0 as f64, y0 as f64, x1 as f64, y1 as f64).abs())
}

pub(crate) fn read_matrix(doc: &Document, object: &Object) -> Option<Affine> {
    let m = doc.resolve(object).as_f32_n::<6>()?;

    Some(Affine::new(m.map(|v| v as f64)))
}

pub(crate) fn rect_path(rect: Rect) -> kurbo::BezPath {
    let mut path = kurbo::BezPath::new();
    path.move_to((rect.x0, rect.y0));
    path.line_to((rect.x1, rect.y0));
    path.line_to((rect.x1, rect.y1));
    path.line_to((rect.x0, rect.y1));
    path.close_path();

    path
}
