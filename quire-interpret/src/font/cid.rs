use kurbo::Vec2;
use quire_syntax::object::keys::*;
use quire_syntax::{Dict, Document, Object};
use rustc_hash::FxHashMap;

/// The metrics of a CID-keyed font, in thousandths of text space units.
#[derive(Debug)]
pub(crate) struct CidMetrics {
    default_width: f32,
    widths: Metrics<f32>,
    // The default vertical origin y and vertical advance.
    default_vertical: (f32, f32),
    vertical: Metrics<[f32; 3]>,
}

#[derive(Debug)]
struct Metrics<T> {
    single: FxHashMap<u32, T>,
    ranges: Vec<(u32, u32, T)>,
}

impl<T: Copy> Metrics<T> {
    fn get(&self, cid: u32) -> Option<T> {
        self.single.get(&cid).copied().or_else(|| {
            self.ranges
                .iter()
                .find(|(first, last, _)| (*first..=*last).contains(&cid))
                .map(|(_, _, v)| *v)
        })
    }
}

impl CidMetrics {
    pub(crate) fn new(doc: &Document, font: &Dict) -> Self {
        let default_width = doc.get(font, DW).as_f32().unwrap_or(1000.0);
        let default_vertical = doc
            .get(font, DW2)
            .as_f32_n::<2>()
            .map(|[vy, w1]| (vy, w1))
            .unwrap_or((880.0, -1000.0));

        let widths = match doc.get(font, W) {
            Object::Array(items) => read_metrics(doc, &items, 1, |v| v[0]),
            _ => Metrics::empty(),
        };
        let vertical = match doc.get(font, W2) {
            Object::Array(items) => read_metrics(doc, &items, 3, |v| [v[0], v[1], v[2]]),
            _ => Metrics::empty(),
        };

        Self {
            default_width,
            widths,
            default_vertical,
            vertical,
        }
    }

    pub(crate) fn width(&self, cid: u32) -> f32 {
        self.widths.get(cid).unwrap_or(self.default_width)
    }

    /// The vertical advance and the position vector from the horizontal to
    /// the vertical origin.
    pub(crate) fn vertical(&self, cid: u32) -> (f32, Vec2) {
        match self.vertical.get(cid) {
            Some([w1, vx, vy]) => (w1, Vec2::new(vx as f64, vy as f64)),
            None => {
                let (vy, w1) = self.default_vertical;
                let vx = self.width(cid) / 2.0;

                (w1, Vec2::new(vx as f64, vy as f64))
            }
        }
    }
}

impl<T> Metrics<T> {
    fn empty() -> Self {
        Self {
            single: FxHashMap::default(),
            ranges: vec![],
        }
    }
}

/// Read a `W` or `W2` array, where each entry is either `first [v v ...]` or
/// `first last v`, with `n` numbers making up a single value.
fn read_metrics<T>(
    doc: &Document,
    items: &[Object],
    n: usize,
    make: impl Fn(&[f32]) -> T,
) -> Metrics<T> {
    let mut metrics = Metrics::empty();
    let mut i = 0;

    while i + 1 < items.len() {
        let Some(first) = items[i].as_int().map(|f| f.max(0) as u32) else {
            break;
        };

        match doc.resolve(&items[i + 1]) {
            Object::Array(values) => {
                let values = values.iter().filter_map(|v| v.as_f32()).collect::<Vec<_>>();

                for (offset, chunk) in values.chunks_exact(n).enumerate() {
                    metrics.single.insert(first + offset as u32, make(chunk));
                }

                i += 2;
            }
            other => {
                let Some(last) = other.as_int().map(|l| l.max(0) as u32) else {
                    break;
                };

                let values = items
                    .get(i + 2..i + 2 + n)
                    .map(|v| v.iter().filter_map(|v| v.as_f32()).collect::<Vec<_>>())
                    .filter(|v| v.len() == n);

                let Some(values) = values else {
                    break;
                };

                metrics.ranges.push((first, last, make(&values)));
                i += 2 + n;
            }
        }
    }

    metrics
}
