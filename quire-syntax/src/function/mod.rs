//! PDF functions.
//!
//! All four function types are supported: sampled (type 0), exponential
//! (type 2), stitching (type 3) and PostScript calculator (type 4) functions.

mod type0;
mod type2;
mod type3;
mod type4;

use crate::document::Document;
use crate::error::{Result, bail, err};
use crate::object::keys::{DOMAIN, FUNCTION_TYPE, RANGE};
use crate::object::{Dict, Object};
use crate::store::ResourceKind;
use smallvec::SmallVec;
use std::rc::Rc;

use type0::Sampled;
use type2::Exponential;
use type3::Stitching;
use type4::PostScript;

/// The input or output values of a function.
pub type Values = SmallVec<[f32; 8]>;

/// A list of `[min max]` pairs.
pub(crate) type Intervals = SmallVec<[(f32, f32); 4]>;

#[derive(Debug)]
enum FunctionType {
    Sampled(Sampled),
    Exponential(Exponential),
    Stitching(Stitching),
    PostScript(PostScript),
}

#[derive(Debug)]
struct Repr {
    domain: Intervals,
    range: Option<Intervals>,
    ty: FunctionType,
}

/// A PDF function. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Function(Rc<Repr>);

impl Function {
    /// Create a new function from a function dictionary or stream.
    ///
    /// Functions given by reference are cached in the object store of the
    /// document.
    pub fn new(doc: &Document, object: &Object) -> Result<Self> {
        match object {
            Object::Ref(_) => {
                let function = doc.load_resource(object, ResourceKind::Function, || {
                    Self::parse(doc, &doc.try_resolve(object)?)
                })?;

                Ok(Self::clone(&function))
            }
            _ => Self::parse(doc, object),
        }
    }

    fn parse(doc: &Document, object: &Object) -> Result<Self> {
        let Some(dict) = object.as_dict() else {
            bail!(
                SyntaxError,
                "expected a function dictionary, found {}",
                object.type_name()
            );
        };

        let domain = read_intervals(doc, dict, DOMAIN)?
            .ok_or_else(|| err!(MissingRequiredEntry, "function has no /Domain"))?;
        let range = read_intervals(doc, dict, RANGE)?;

        let function_type = doc
            .get(dict, FUNCTION_TYPE)
            .as_int()
            .ok_or_else(|| err!(MissingRequiredEntry, "function has no /FunctionType"))?;

        let ty = match function_type {
            0 | 4 => {
                let Some(range) = &range else {
                    bail!(MissingRequiredEntry, "type {function_type} function has no /Range");
                };

                let Object::Stream(stream) = object else {
                    bail!(SyntaxError, "type {function_type} function must be a stream");
                };

                if function_type == 0 {
                    FunctionType::Sampled(Sampled::new(doc, stream, &domain, range)?)
                } else {
                    FunctionType::PostScript(PostScript::new(&doc.stream_data(stream)?)?)
                }
            }
            2 => FunctionType::Exponential(Exponential::new(doc, dict)?),
            3 => FunctionType::Stitching(Stitching::new(doc, dict, &domain)?),
            n => bail!(UnsupportedFeature, "unknown function type {n}"),
        };

        if !matches!(ty, FunctionType::Sampled(_) | FunctionType::PostScript(_))
            && domain.len() != 1
        {
            bail!(
                FunctionDomainMismatch,
                "type {function_type} functions take one input, /Domain declares {}",
                domain.len()
            );
        }

        Ok(Self(Rc::new(Repr { domain, range, ty })))
    }

    /// The number of input values.
    pub fn input_count(&self) -> usize {
        self.0.domain.len()
    }

    /// The number of output values, if it is declared.
    pub fn output_count(&self) -> Option<usize> {
        self.0.range.as_ref().map(|r| r.len())
    }

    /// Evaluate the function.
    ///
    /// Inputs are clamped to the domain and outputs to the range of the
    /// function. Passing the wrong number of inputs is a
    /// [`FunctionDomainMismatch`](crate::ErrorKind::FunctionDomainMismatch).
    pub fn evaluate(&self, input: &[f32]) -> Result<Values> {
        let repr = &*self.0;

        if input.len() != repr.domain.len() {
            bail!(
                FunctionDomainMismatch,
                "function takes {} inputs, got {}",
                repr.domain.len(),
                input.len()
            );
        }

        let input: Values = input
            .iter()
            .zip(&repr.domain)
            .map(|(x, (min, max))| clamp(*x, *min, *max))
            .collect();

        let mut output = match &repr.ty {
            FunctionType::Sampled(f) => f.evaluate(&input),
            FunctionType::Exponential(f) => f.evaluate(input[0])?,
            FunctionType::Stitching(f) => f.evaluate(input[0], repr.domain[0])?,
            FunctionType::PostScript(f) => {
                f.evaluate(&input, repr.range.as_ref().map_or(0, |r| r.len()))?
            }
        };

        if let Some(range) = &repr.range {
            if output.len() != range.len() {
                bail!(
                    FunctionDomainMismatch,
                    "function produced {} outputs, /Range declares {}",
                    output.len(),
                    range.len()
                );
            }

            for (y, (min, max)) in output.iter_mut().zip(range) {
                *y = clamp(*y, *min, *max);
            }
        }

        Ok(output)
    }
}

// Unlike `f32::clamp`, this doesn't panic for inverted bounds.
fn clamp(val: f32, min: f32, max: f32) -> f32 {
    val.max(min).min(max)
}

/// Map `x` from `[x_min, x_max]` to `[y_min, y_max]`.
pub(crate) fn interpolate(x: f32, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32 {
    if x_max == x_min {
        return y_min;
    }

    y_min + (x - x_min) * (y_max - y_min) / (x_max - x_min)
}

pub(crate) fn read_numbers(doc: &Document, dict: &Dict, key: &[u8]) -> Result<Option<Values>> {
    match doc.get(dict, key) {
        Object::Null => Ok(None),
        Object::Array(items) => items
            .iter()
            .map(|i| doc.resolve(i).as_f32())
            .collect::<Option<Values>>()
            .map(Some)
            .ok_or_else(|| {
                err!(
                    SyntaxError,
                    "/{} must only contain numbers",
                    String::from_utf8_lossy(key)
                )
            }),
        other => bail!(
            SyntaxError,
            "/{} must be an array, found {}",
            String::from_utf8_lossy(key),
            other.type_name()
        ),
    }
}

pub(crate) fn read_intervals(
    doc: &Document,
    dict: &Dict,
    key: &[u8],
) -> Result<Option<Intervals>> {
    let Some(numbers) = read_numbers(doc, dict, key)? else {
        return Ok(None);
    };

    if numbers.len() % 2 != 0 {
        bail!(
            SyntaxError,
            "/{} has an odd number of entries",
            String::from_utf8_lossy(key)
        );
    }

    Ok(Some(
        numbers.chunks_exact(2).map(|c| (c[0], c[1])).collect(),
    ))
}
