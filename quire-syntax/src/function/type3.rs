use crate::document::Document;
use crate::error::{Result, bail};
use crate::function::{Function, Intervals, Values, interpolate, read_intervals, read_numbers};
use crate::object::keys::{BOUNDS, ENCODE, FUNCTIONS};
use crate::object::{Dict, Object};
use log::warn;

/// A type 3 function (stitching function).
#[derive(Debug)]
pub(crate) struct Stitching {
    functions: Vec<Function>,
    bounds: Values,
    encode: Intervals,
}

impl Stitching {
    pub(crate) fn new(doc: &Document, dict: &Dict, domain: &Intervals) -> Result<Self> {
        let functions = match doc.get(dict, FUNCTIONS) {
            Object::Array(items) => items
                .iter()
                .map(|f| Function::new(doc, f))
                .collect::<Result<Vec<_>>>()?,
            other => bail!(
                MissingRequiredEntry,
                "stitching function needs a /Functions array, found {}",
                other.type_name()
            ),
        };

        if functions.is_empty() {
            bail!(SyntaxError, "stitching function has no sub-functions");
        }

        if let Some(f) = functions.iter().find(|f| f.input_count() != 1) {
            bail!(
                FunctionDomainMismatch,
                "sub-function of a stitching function takes {} inputs",
                f.input_count()
            );
        }

        let bounds = read_numbers(doc, dict, BOUNDS)?.unwrap_or_default();
        let encode = read_intervals(doc, dict, ENCODE)?.unwrap_or_default();

        if bounds.len() + 1 != functions.len() || encode.len() != functions.len() {
            bail!(
                SyntaxError,
                "stitching function with {} sub-functions has {} bounds and {} encode pairs",
                functions.len(),
                bounds.len(),
                encode.len()
            );
        }

        if bounds.windows(2).any(|w| w[0] > w[1]) {
            warn!("bounds of stitching function are not increasing");
        }

        if let Some((min, max)) = domain.first()
            && bounds.iter().any(|b| b < min || b > max)
        {
            warn!("bounds of stitching function are outside of its domain");
        }

        Ok(Self {
            functions,
            bounds,
            encode,
        })
    }

    pub(crate) fn evaluate(&self, x: f32, domain: (f32, f32)) -> Result<Values> {
        // The subdomains are half-open on the right, except for the last one.
        let index = self.bounds.partition_point(|b| *b <= x);

        let lower = index
            .checked_sub(1)
            .map_or(domain.0, |i| self.bounds[i]);
        let upper = self.bounds.get(index).copied().unwrap_or(domain.1);
        let (e0, e1) = self.encode[index];

        self.functions[index].evaluate(&[interpolate(x, lower, upper, e0, e1)])
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::function::tests::{function, single_object_doc};
    use crate::function::Function;
    use crate::parser::parse_object;

    const SIMPLE: &str = "<<
  /FunctionType 3
  /Domain [-7 7]
  /Functions [
    << /FunctionType 2 /Domain [0 1] /C0 [0.5 0.5 0.5] /C1 [0.5 0.5 0.5] /N 1 >>
    << /FunctionType 2 /Domain [0 1] /C0 [0.7 0.7 0.7] /C1 [0.7 0.7 0.7] /N 1 >>
  ]
  /Bounds [0]
  /Encode [0 1 0 1]
>>";

    #[test]
    fn picks_subdomain() {
        let f = function(SIMPLE);

        assert_eq!(f.evaluate(&[-7.0]).unwrap().as_slice(), &[0.5, 0.5, 0.5]);
        assert_eq!(f.evaluate(&[-0.5]).unwrap().as_slice(), &[0.5, 0.5, 0.5]);
        assert_eq!(f.evaluate(&[0.0]).unwrap().as_slice(), &[0.7, 0.7, 0.7]);
        assert_eq!(f.evaluate(&[7.0]).unwrap().as_slice(), &[0.7, 0.7, 0.7]);
        assert_eq!(f.evaluate(&[100.0]).unwrap().as_slice(), &[0.7, 0.7, 0.7]);
    }

    #[test]
    fn re_encodes_input() {
        let f = function(
            "<< /FunctionType 3 /Domain [0 2] /Bounds [1] /Encode [0 1 1 0] /Functions [
                << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [10] /N 1 >>
                << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [10] /N 1 >>
            ] >>",
        );

        assert_eq!(f.evaluate(&[0.5]).unwrap().as_slice(), &[5.0]);
        assert_eq!(f.evaluate(&[1.25]).unwrap().as_slice(), &[7.5]);
        assert_eq!(f.evaluate(&[2.0]).unwrap().as_slice(), &[0.0]);
    }

    #[test]
    fn mismatched_bounds() {
        let doc = single_object_doc("null");
        let object = parse_object(
            b"<< /FunctionType 3 /Domain [0 1] /Bounds [0.2 0.4] /Encode [0 1] /Functions [
                << /FunctionType 2 /Domain [0 1] /N 1 >>
            ] >>",
        )
        .unwrap();

        let err = Function::new(&doc, &object).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
    }
}
