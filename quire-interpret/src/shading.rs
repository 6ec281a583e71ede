//! PDF shadings.

use crate::color::{Color, ColorComponents, ColorSpace};
use crate::context::Context;
use crate::device::Device;
use crate::interpret::path::{begin_masked, end_masked, rect_clip};
use crate::util::{interpolate, read_matrix, read_rect};
use kurbo::{Affine, Point, Rect};
use log::warn;
use quire_syntax::bit::BitReader;
use quire_syntax::function::Function;
use quire_syntax::object::keys::*;
use quire_syntax::store::ResourceKind;
use quire_syntax::{Dict, DocError, Document, ErrorKind, Object, Result};
use smallvec::SmallVec;
use std::rc::Rc;

/// The geometry of a shading.
#[derive(Debug)]
pub enum ShadingKind {
    /// A function-based shading (type 1). The color at a point is the
    /// function value at that point.
    FunctionBased {
        /// The rectangle `[x0 x1 y0 y1]` the function is defined on.
        domain: [f32; 4],
        /// Maps the domain to shading space.
        matrix: Affine,
    },
    /// An axial shading (type 2), blending along the axis between two points.
    Axial {
        /// The start and end point of the axis, as `[x0 y0 x1 y1]`.
        coords: [f32; 4],
        /// The parameter values at the start and end point.
        domain: [f32; 2],
        /// Whether the shading extends beyond the start and end point.
        extend: [bool; 2],
    },
    /// A radial shading (type 3), blending between two circles.
    Radial {
        /// The start and end circle, as `[x0 y0 r0 x1 y1 r1]`.
        coords: [f32; 6],
        /// The parameter values at the start and end circle.
        domain: [f32; 2],
        /// Whether the shading extends beyond the start and end circle.
        extend: [bool; 2],
    },
    /// A free-form (type 4) or lattice-form (type 5) triangle mesh.
    Triangles(Vec<Triangle>),
    /// A Coons patch (type 6) or tensor-product patch (type 7) mesh.
    Patches(Vec<Patch>),
}

/// A vertex of a triangle mesh.
#[derive(Clone, Debug)]
pub struct Vertex {
    /// The position in shading space.
    pub point: Point,
    /// The color components, or the parametric value if the shading has a
    /// function.
    pub color: ColorComponents,
}

/// A triangle of a mesh shading.
#[derive(Clone, Debug)]
pub struct Triangle {
    /// The corners of the triangle.
    pub vertices: [Vertex; 3],
}

/// A patch of a patch mesh shading.
#[derive(Clone, Debug)]
pub struct Patch {
    /// The twelve control points of the boundary, starting at the lower left
    /// corner and running counter-clockwise in patch space.
    pub boundary: [Point; 12],
    /// The four interior control points of tensor-product patches.
    pub interior: Option<[Point; 4]>,
    /// The colors (or parametric values) at the four corners, in the order of
    /// the corners on the boundary.
    pub colors: [ColorComponents; 4],
}

/// A PDF shading. Its geometry is given in shading space, which is mapped to
/// device space by the transform passed to
/// [`Device::fill_shading`](crate::Device::fill_shading).
#[derive(Debug)]
pub struct Shading {
    /// The geometry of the shading.
    pub kind: ShadingKind,
    /// The color space the colors of the shading are in.
    pub color_space: ColorSpace,
    /// The area the shading is clipped to, in shading space.
    pub bbox: Option<Rect>,
    /// The color outside the geometry, used when painting with a shading
    /// pattern.
    pub background: Option<ColorComponents>,
    /// Whether the shading should be anti-aliased.
    pub anti_alias: bool,
    functions: Vec<Function>,
}

impl Shading {
    /// Load a shading from a dictionary or stream, through the object store
    /// if it is a reference.
    pub fn new(doc: &Document, object: &Object) -> Result<Rc<Self>> {
        match object {
            Object::Ref(_) => doc.load_resource(object, ResourceKind::Shading, || {
                Self::parse(doc, &doc.try_resolve(object)?)
            }),
            _ => Self::parse(doc, object).map(Rc::new),
        }
    }

    fn parse(doc: &Document, object: &Object) -> Result<Self> {
        let dict = object.as_dict().ok_or_else(|| {
            DocError::new(
                ErrorKind::TypeCheck,
                format!("expected a shading, found {}", object.type_name()),
            )
        })?;

        let shading_type = doc.get(dict, SHADING_TYPE).as_int().ok_or_else(|| {
            DocError::new(ErrorKind::MissingRequiredEntry, "shading without /ShadingType")
        })?;

        let color_space = ColorSpace::new(doc, &doc.get(dict, COLOR_SPACE))?;

        if color_space.is_pattern() {
            return Err(DocError::new(
                ErrorKind::SyntaxError,
                "shadings cannot use a pattern color space",
            ));
        }

        let functions = match doc.resolve(&doc.get(dict, FUNCTION)) {
            Object::Null => vec![],
            Object::Array(items) => items
                .iter()
                .map(|f| Function::new(doc, f))
                .collect::<Result<Vec<_>>>()?,
            _ => vec![Function::new(doc, dict.get(FUNCTION).unwrap_or(&Object::Null))?],
        };

        let requires_function = matches!(shading_type, 1..=3);

        if requires_function && functions.is_empty() {
            return Err(DocError::new(
                ErrorKind::MissingRequiredEntry,
                format!("type {shading_type} shading without /Function"),
            ));
        }

        let domain2 = || doc.get(dict, DOMAIN).as_f32_n::<2>().unwrap_or([0.0, 1.0]);
        let extend = || {
            let extend = doc.get(dict, EXTEND);
            let get = |i: usize| {
                extend
                    .as_array()
                    .and_then(|a| a.get(i))
                    .is_some_and(|e| matches!(e, Object::Bool(true)))
            };

            [get(0), get(1)]
        };
        let coords = |n: usize| {
            doc.get(dict, COORDS)
                .as_f32_array()
                .filter(|c| c.len() >= n)
                .ok_or_else(|| {
                    DocError::new(
                        ErrorKind::MissingRequiredEntry,
                        format!("shading /Coords needs {n} numbers"),
                    )
                })
        };

        let kind = match shading_type {
            1 => ShadingKind::FunctionBased {
                domain: doc
                    .get(dict, DOMAIN)
                    .as_f32_n::<4>()
                    .unwrap_or([0.0, 1.0, 0.0, 1.0]),
                matrix: dict
                    .get(MATRIX)
                    .and_then(|m| read_matrix(doc, m))
                    .unwrap_or_default(),
            },
            2 => {
                let c = coords(4)?;

                ShadingKind::Axial {
                    coords: [c[0], c[1], c[2], c[3]],
                    domain: domain2(),
                    extend: extend(),
                }
            }
            3 => {
                let c = coords(6)?;

                ShadingKind::Radial {
                    coords: [c[0], c[1], c[2], c[3], c[4], c[5]],
                    domain: domain2(),
                    extend: extend(),
                }
            }
            4..=7 => {
                let Object::Stream(stream) = object else {
                    return Err(DocError::new(
                        ErrorKind::SyntaxError,
                        format!("type {shading_type} shading must be a stream"),
                    ));
                };

                let data = doc.stream_data(stream)?;
                let n = if functions.is_empty() {
                    color_space.num_components()
                } else {
                    1
                };
                let layout = MeshLayout::new(doc, dict, shading_type, n)?;

                match shading_type {
                    4 => ShadingKind::Triangles(read_free_form(&data, &layout)),
                    5 => {
                        let per_row = doc
                            .get(dict, VERTICES_PER_ROW)
                            .as_int()
                            .filter(|n| *n >= 2)
                            .ok_or_else(|| {
                                DocError::new(
                                    ErrorKind::SyntaxError,
                                    "lattice shading needs at least 2 /VerticesPerRow",
                                )
                            })?;

                        ShadingKind::Triangles(read_lattice(&data, &layout, per_row as usize))
                    }
                    _ => ShadingKind::Patches(read_patches(&data, &layout, shading_type == 7)),
                }
            }
            n => {
                return Err(DocError::new(
                    ErrorKind::UnsupportedFeature,
                    format!("unknown shading type {n}"),
                ));
            }
        };

        let background = doc.get(dict, BACKGROUND).as_f32_array().map(|b| {
            let mut b = b.into_iter().collect::<ColorComponents>();
            b.resize(color_space.num_components(), 0.0);

            b
        });

        Ok(Self {
            kind,
            color_space,
            bbox: dict.get(BBOX).and_then(|b| read_rect(doc, b)),
            background,
            anti_alias: doc.get(dict, ANTI_ALIAS) == Object::Bool(true),
            functions,
        })
    }

    /// Whether vertex and patch colors are parametric values that go through
    /// the shading function.
    pub fn has_function(&self) -> bool {
        !self.functions.is_empty()
    }

    /// The color for the given function input (for types 1 to 3, and for
    /// meshes with a function) or color components (for meshes without).
    pub fn color(&self, input: &[f32]) -> Color {
        let components = match self.functions.as_slice() {
            [] => Ok(input.iter().copied().collect()),
            [function] => function.evaluate(input).map(|v| v.into_iter().collect()),
            functions => functions
                .iter()
                .map(|f| f.evaluate(input).map(|v| v.first().copied().unwrap_or(0.0)))
                .collect(),
        };

        let components = match components {
            Ok(components) => components,
            Err(e) => {
                warn!("failed to evaluate shading function: {e}");

                self.color_space.initial_color()
            }
        };

        Color::new(self.color_space.clone(), components, 1.0)
    }

    /// The color at a point in shading space, or `None` if the shading
    /// doesn't cover it.
    ///
    /// Patch meshes are not sampled here, devices subdivide the patches
    /// themselves.
    pub fn sample(&self, point: Point) -> Option<Color> {
        match &self.kind {
            ShadingKind::FunctionBased { domain, matrix } => {
                let p = matrix.inverse() * point;
                let (x, y) = (p.x as f32, p.y as f32);

                ((domain[0]..=domain[1]).contains(&x) && (domain[2]..=domain[3]).contains(&y))
                    .then(|| self.color(&[x, y]))
            }
            ShadingKind::Axial {
                coords,
                domain,
                extend,
            } => {
                let [x0, y0, x1, y1] = coords.map(|c| c as f64);
                let (dx, dy) = (x1 - x0, y1 - y0);
                let len = dx * dx + dy * dy;

                let s = if len == 0.0 {
                    0.0
                } else {
                    ((point.x - x0) * dx + (point.y - y0) * dy) / len
                };

                self.parametric(s as f32, *domain, *extend)
            }
            ShadingKind::Radial {
                coords,
                domain,
                extend,
            } => {
                let s = radial_parameter(*coords, point, *extend)?;

                self.parametric(s, *domain, *extend)
            }
            ShadingKind::Triangles(triangles) => triangles.iter().find_map(|t| {
                let weights = barycentric(t, point)?;
                let n = t.vertices[0].color.len();
                let color = (0..n)
                    .map(|i| {
                        t.vertices
                            .iter()
                            .zip(weights)
                            .map(|(v, w)| v.color.get(i).copied().unwrap_or(0.0) * w)
                            .sum::<f32>()
                    })
                    .collect::<ColorComponents>();

                Some(self.color(&color))
            }),
            ShadingKind::Patches(_) => None,
        }
    }

    fn parametric(&self, s: f32, domain: [f32; 2], extend: [bool; 2]) -> Option<Color> {
        let s = if s < 0.0 {
            extend[0].then_some(0.0)?
        } else if s > 1.0 {
            extend[1].then_some(1.0)?
        } else {
            s
        };

        Some(self.color(&[domain[0] + s * (domain[1] - domain[0])]))
    }
}

/// Solve for the largest `s` whose interpolated circle contains `point`.
fn radial_parameter(coords: [f32; 6], point: Point, extend: [bool; 2]) -> Option<f32> {
    let [x0, y0, r0, x1, y1, r1] = coords.map(|c| c as f64);
    let (cdx, cdy, dr) = (x1 - x0, y1 - y0, r1 - r0);
    let (pdx, pdy) = (point.x - x0, point.y - y0);

    let a = cdx * cdx + cdy * cdy - dr * dr;
    let b = pdx * cdx + pdy * cdy + r0 * dr;
    let c = pdx * pdx + pdy * pdy - r0 * r0;

    let valid = |s: f64| {
        r0 + s * dr >= 0.0 && (s >= 0.0 || extend[0]) && (s <= 1.0 || extend[1])
    };

    if a.abs() < 1e-9 {
        if b == 0.0 {
            return None;
        }

        let s = c / (2.0 * b);
        return valid(s).then_some(s as f32);
    }

    let discriminant = b * b - a * c;

    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let (s1, s2) = ((b + root) / a, (b - root) / a);
    let (hi, lo) = if s1 > s2 { (s1, s2) } else { (s2, s1) };

    if valid(hi) {
        Some(hi as f32)
    } else if valid(lo) {
        Some(lo as f32)
    } else {
        None
    }
}

fn barycentric(t: &Triangle, p: Point) -> Option<[f32; 3]> {
    let [a, b, c] = [&t.vertices[0], &t.vertices[1], &t.vertices[2]].map(|v| v.point);
    let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);

    if det.abs() < 1e-12 {
        return None;
    }

    let w0 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
    let w1 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
    let w2 = 1.0 - w0 - w1;
    let eps = -1e-9;

    (w0 >= eps && w1 >= eps && w2 >= eps).then_some([w0 as f32, w1 as f32, w2 as f32])
}

/// The bit layout of the vertices of a mesh shading.
struct MeshLayout {
    bits_per_coordinate: u8,
    bits_per_component: u8,
    bits_per_flag: u8,
    // `[xmin xmax ymin ymax]`.
    coord_decode: [f32; 4],
    color_decode: SmallVec<[(f32, f32); 4]>,
}

impl MeshLayout {
    fn new(doc: &Document, dict: &Dict, shading_type: i64, components: usize) -> Result<Self> {
        let bits = |key: &[u8], valid: &[i64]| {
            doc.get(dict, key)
                .as_int()
                .filter(|b| valid.contains(b))
                .map(|b| b as u8)
                .ok_or_else(|| {
                    DocError::new(
                        ErrorKind::SyntaxError,
                        format!("invalid or missing /{}", String::from_utf8_lossy(key)),
                    )
                })
        };

        let bits_per_coordinate = bits(BITS_PER_COORDINATE, &[1, 2, 4, 8, 12, 16, 24, 32])?;
        let bits_per_component = bits(BITS_PER_COMPONENT, &[1, 2, 4, 8, 12, 16])?;
        let bits_per_flag = if shading_type == 5 {
            0
        } else {
            bits(BITS_PER_FLAG, &[2, 4, 8])?
        };

        let decode = doc.get(dict, DECODE).as_f32_array().unwrap_or_default();

        if decode.len() < 4 + 2 * components {
            return Err(DocError::new(
                ErrorKind::MissingRequiredEntry,
                format!(
                    "mesh shading needs a /Decode array of {} numbers",
                    4 + 2 * components
                ),
            ));
        }

        Ok(Self {
            bits_per_coordinate,
            bits_per_component,
            bits_per_flag,
            coord_decode: [decode[0], decode[1], decode[2], decode[3]],
            color_decode: decode[4..4 + 2 * components]
                .chunks_exact(2)
                .map(|d| (d[0], d[1]))
                .collect(),
        })
    }

    fn read_point(&self, reader: &mut BitReader<'_>) -> Option<Point> {
        let max = max_value(self.bits_per_coordinate);
        let [x0, x1, y0, y1] = self.coord_decode;
        let x = interpolate(reader.read(self.bits_per_coordinate)? as f32, 0.0, max, x0, x1);
        let y = interpolate(reader.read(self.bits_per_coordinate)? as f32, 0.0, max, y0, y1);

        Some(Point::new(x as f64, y as f64))
    }

    fn read_color(&self, reader: &mut BitReader<'_>) -> Option<ColorComponents> {
        let max = max_value(self.bits_per_component);

        self.color_decode
            .iter()
            .map(|(min, d_max)| {
                reader
                    .read(self.bits_per_component)
                    .map(|v| interpolate(v as f32, 0.0, max, *min, *d_max))
            })
            .collect()
    }

    fn read_vertex(&self, reader: &mut BitReader<'_>) -> Option<Vertex> {
        let point = self.read_point(reader)?;
        let color = self.read_color(reader)?;

        Some(Vertex { point, color })
    }
}

fn max_value(bits: u8) -> f32 {
    ((1_u64 << bits) - 1) as f32
}

/// Read a free-form triangle mesh. Each vertex starts on a byte boundary,
/// and a truncated final vertex ends the mesh.
fn read_free_form(data: &[u8], layout: &MeshLayout) -> Vec<Triangle> {
    let mut reader = BitReader::new(data);
    let mut triangles = vec![];
    // The last two vertices, which flags 1 and 2 continue from.
    let mut prev: Option<[Vertex; 3]> = None;

    while let Some(flag) = reader.read(layout.bits_per_flag) {
        let Some(vertex) = layout.read_vertex(&mut reader) else {
            break;
        };
        reader.align();

        let vertices = match (flag, &prev) {
            (0, _) => {
                let mut rest = vec![];

                for _ in 0..2 {
                    // The flags of the second and third vertex are ignored.
                    let Some(_) = reader.read(layout.bits_per_flag) else {
                        break;
                    };
                    let Some(v) = layout.read_vertex(&mut reader) else {
                        break;
                    };
                    reader.align();
                    rest.push(v);
                }

                let [b, c] = match <[Vertex; 2]>::try_from(rest) {
                    Ok(v) => v,
                    Err(_) => break,
                };

                [vertex, b, c]
            }
            (1, Some([_, b, c])) => [b.clone(), c.clone(), vertex],
            (2, Some([a, _, c])) => [a.clone(), c.clone(), vertex],
            _ => {
                warn!("invalid edge flag {flag} in triangle mesh");

                break;
            }
        };

        triangles.push(Triangle {
            vertices: vertices.clone(),
        });
        prev = Some(vertices);
    }

    triangles
}

fn read_lattice(data: &[u8], layout: &MeshLayout, per_row: usize) -> Vec<Triangle> {
    // Vertices start on byte boundaries, so no row is longer than the data.
    if per_row > data.len() {
        warn!("lattice rows of {per_row} vertices exceed the {} bytes of mesh data", data.len());

        return vec![];
    }

    let mut reader = BitReader::new(data);
    let mut rows: Vec<Vec<Vertex>> = vec![];

    'outer: loop {
        let mut row = Vec::with_capacity(per_row);

        for _ in 0..per_row {
            let Some(vertex) = layout.read_vertex(&mut reader) else {
                break 'outer;
            };
            reader.align();
            row.push(vertex);
        }

        rows.push(row);
    }

    let mut triangles = vec![];

    for pair in rows.windows(2) {
        let (top, bottom) = (&pair[0], &pair[1]);

        for j in 0..per_row - 1 {
            triangles.push(Triangle {
                vertices: [top[j].clone(), bottom[j].clone(), top[j + 1].clone()],
            });
            triangles.push(Triangle {
                vertices: [
                    bottom[j + 1].clone(),
                    bottom[j].clone(),
                    top[j + 1].clone(),
                ],
            });
        }
    }

    triangles
}

/// Read a Coons or tensor-product patch mesh. Flags 1 to 3 continue from the
/// second, third or fourth edge of the previous patch.
fn read_patches(data: &[u8], layout: &MeshLayout, tensor: bool) -> Vec<Patch> {
    let mut reader = BitReader::new(data);
    let mut patches: Vec<Patch> = vec![];
    let num_points = if tensor { 16 } else { 12 };

    while let Some(flag) = reader.read(layout.bits_per_flag) {
        let (mut points, mut colors, shared) = match (flag, patches.last()) {
            (0, _) => (vec![], vec![], 0),
            (1..=3, Some(prev)) => {
                let edge = flag as usize * 3;
                let points = (0..4)
                    .map(|i| prev.boundary[(edge + i) % 12])
                    .collect::<Vec<_>>();
                let corner = flag as usize;
                let colors = vec![
                    prev.colors[corner].clone(),
                    prev.colors[(corner + 1) % 4].clone(),
                ];

                (points, colors, 4)
            }
            _ => {
                warn!("invalid edge flag {flag} in patch mesh");

                break;
            }
        };

        let Some(read) = (shared..num_points)
            .map(|_| layout.read_point(&mut reader))
            .collect::<Option<Vec<_>>>()
        else {
            break;
        };
        points.extend(read);

        let Some(read) = (colors.len()..4)
            .map(|_| layout.read_color(&mut reader))
            .collect::<Option<Vec<_>>>()
        else {
            break;
        };
        colors.extend(read);
        reader.align();

        let mut boundary = [Point::ZERO; 12];
        boundary.copy_from_slice(&points[..12]);
        let interior = tensor.then(|| [points[12], points[13], points[14], points[15]]);
        let colors = [
            colors[0].clone(),
            colors[1].clone(),
            colors[2].clone(),
            colors[3].clone(),
        ];

        patches.push(Patch {
            boundary,
            interior,
            colors,
        });
    }

    patches
}

/// Paint a shading into the current clip (`sh`).
pub(crate) fn paint_shading(
    ctx: &mut Context<'_>,
    device: &mut impl Device,
    shading: &Shading,
) -> Result<()> {
    if !ctx.ocg.is_visible() {
        return Ok(());
    }

    let masked = begin_masked(ctx, device)?;
    let state = ctx.get();
    let (ctm, alpha) = (state.ctm, state.fill.alpha);

    let clip = shading.bbox.map(|bbox| rect_clip(ctx, bbox));

    if let Some(clip) = &clip {
        device.push_clip(clip);
    }

    device.fill_shading(shading, ctm, alpha);

    if clip.is_some() {
        device.pop_clip();
    }

    end_masked(device, masked);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{document, stream};
    use quire_syntax::ObjRef;
    use quire_syntax::parser::parse_object;

    const RED_TO_BLUE: &str =
        "<< /FunctionType 2 /Domain [0 1] /C0 [1 0 0] /C1 [0 0 1] /N 1 >>";

    fn shading(source: &str) -> Result<Rc<Shading>> {
        let doc = document(&["<< /Type /Catalog >>"]);
        Shading::new(&doc, &parse_object(source.as_bytes()).unwrap())
    }

    fn rgb(color: Option<Color>) -> Option<[u8; 4]> {
        color.map(|c| c.to_rgba8())
    }

    #[test]
    fn axial() {
        let s = shading(&format!(
            "<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 100 0] /Function {RED_TO_BLUE} >>"
        ))
        .unwrap();

        assert_eq!(rgb(s.sample(Point::new(0.0, 5.0))), Some([255, 0, 0, 255]));
        assert_eq!(rgb(s.sample(Point::new(100.0, 5.0))), Some([0, 0, 255, 255]));
        assert_eq!(rgb(s.sample(Point::new(50.0, 0.0))), Some([128, 0, 128, 255]));
        // Not extended.
        assert_eq!(rgb(s.sample(Point::new(-10.0, 0.0))), None);
    }

    #[test]
    fn axial_extend() {
        let s = shading(&format!(
            "<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 100 0] \
             /Extend [true false] /Function {RED_TO_BLUE} >>"
        ))
        .unwrap();

        assert_eq!(rgb(s.sample(Point::new(-10.0, 0.0))), Some([255, 0, 0, 255]));
        assert_eq!(rgb(s.sample(Point::new(110.0, 0.0))), None);
    }

    #[test]
    fn radial() {
        let s = shading(&format!(
            "<< /ShadingType 3 /ColorSpace /DeviceRGB /Coords [0 0 0 0 0 10] /Function {RED_TO_BLUE} >>"
        ))
        .unwrap();

        assert_eq!(rgb(s.sample(Point::new(0.0, 0.0))), Some([255, 0, 0, 255]));
        assert_eq!(rgb(s.sample(Point::new(0.0, 10.0))), Some([0, 0, 255, 255]));
        assert_eq!(rgb(s.sample(Point::new(20.0, 0.0))), None);
    }

    #[test]
    fn function_based() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream("/FunctionType 4 /Domain [0 1 0 1] /Range [0 1]", "{ pop }"),
        ]);
        let source = "<< /ShadingType 1 /ColorSpace /DeviceGray /Domain [0 1 0 1] \
                      /Matrix [100 0 0 100 0 0] /Function 2 0 R >>";
        let s = Shading::new(&doc, &parse_object(source.as_bytes()).unwrap()).unwrap();

        assert_eq!(rgb(s.sample(Point::new(50.0, 10.0))), Some([128, 128, 128, 255]));
        assert_eq!(rgb(s.sample(Point::new(150.0, 0.0))), None);
    }

    #[test]
    fn function_array() {
        let s = shading(
            "<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 1 0] /Function [\
             << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >> \
             << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [0] /N 1 >> \
             << /FunctionType 2 /Domain [0 1] /C0 [1] /C1 [0] /N 1 >>] >>",
        )
        .unwrap();

        assert_eq!(s.color(&[1.0]).components(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_function() {
        let err = shading("<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 1 0] >>")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingRequiredEntry);
    }

    #[test]
    fn unknown_type() {
        let err = shading("<< /ShadingType 9 /ColorSpace /DeviceRGB >>").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn free_form_mesh() {
        // 8 bit flag, 8 bit coordinates, 8 bit gray; the fourth vertex continues
        // from the edge bc of the first triangle.
        let data = "<00000000 00FF0000 0000FF00 01FFFFFF>";
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream(
                "/ShadingType 4 /ColorSpace /DeviceGray /BitsPerCoordinate 8 \
                 /BitsPerComponent 8 /BitsPerFlag 8 /Decode [0 255 0 255 0 1] \
                 /Filter /ASCIIHexDecode",
                data,
            ),
        ]);
        let s = Shading::new(&doc, &Object::Ref(ObjRef::new(2, 0))).unwrap();

        let ShadingKind::Triangles(triangles) = &s.kind else {
            panic!("expected a triangle mesh");
        };

        assert_eq!(triangles.len(), 2);
        assert_eq!(triangles[0].vertices[1].point, Point::new(255.0, 0.0));
        assert_eq!(triangles[1].vertices[0].point, Point::new(255.0, 0.0));
        assert_eq!(triangles[1].vertices[2].point, Point::new(255.0, 255.0));
        assert_eq!(triangles[1].vertices[2].color.as_slice(), &[1.0]);
        assert_eq!(rgb(s.sample(Point::new(1.0, 1.0))), Some([0, 0, 0, 255]));
    }

    #[test]
    fn lattice_mesh() {
        let data = "<00 00 00 FF 00 00 00 FF 00 FF FF FF>";
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream(
                "/ShadingType 5 /ColorSpace /DeviceGray /BitsPerCoordinate 8 \
                 /BitsPerComponent 8 /VerticesPerRow 2 /Decode [0 255 0 255 0 1] \
                 /Filter /ASCIIHexDecode",
                data,
            ),
        ]);
        let s = Shading::new(&doc, &Object::Ref(ObjRef::new(2, 0))).unwrap();

        let ShadingKind::Triangles(triangles) = &s.kind else {
            panic!("expected a triangle mesh");
        };

        assert_eq!(triangles.len(), 2);
        assert!(!s.has_function());
        assert_eq!(s.color(&[0.25]).components(), &[0.25]);
    }

    #[test]
    fn lattice_rows_longer_than_data() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream(
                "/ShadingType 5 /ColorSpace /DeviceGray /BitsPerCoordinate 8 \
                 /BitsPerComponent 8 /VerticesPerRow 1152921504606846976 \
                 /Decode [0 255 0 255 0 1] /Filter /ASCIIHexDecode",
                "<00 00 00 FF 00 00 00 FF 00 FF FF FF>",
            ),
        ]);
        let s = Shading::new(&doc, &Object::Ref(ObjRef::new(2, 0))).unwrap();

        let ShadingKind::Triangles(triangles) = &s.kind else {
            panic!("expected a triangle mesh");
        };

        assert!(triangles.is_empty());
    }

    #[test]
    fn coons_patches() {
        // One patch with flag 0 and a second one sharing its second edge.
        let first = format!("00{}{}", "10".repeat(24), "00".repeat(4));
        let second = format!("01{}{}", "20".repeat(16), "FF".repeat(2));
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream(
                "/ShadingType 6 /ColorSpace /DeviceGray /BitsPerCoordinate 8 \
                 /BitsPerComponent 8 /BitsPerFlag 8 /Decode [0 255 0 255 0 1] \
                 /Filter /ASCIIHexDecode",
                &format!("<{first}{second}>"),
            ),
        ]);
        let s = Shading::new(&doc, &Object::Ref(ObjRef::new(2, 0))).unwrap();

        let ShadingKind::Patches(patches) = &s.kind else {
            panic!("expected a patch mesh");
        };

        assert_eq!(patches.len(), 2);
        assert_eq!(patches[1].boundary[0], Point::new(16.0, 16.0));
        assert_eq!(patches[1].boundary[4], Point::new(32.0, 32.0));
        assert_eq!(patches[1].colors[0].as_slice(), &[0.0]);
        assert_eq!(patches[1].colors[3].as_slice(), &[1.0]);
        assert!(patches[1].interior.is_none());
    }
}
