use crate::document::Document;
use crate::error::{Result, bail, err};
use crate::function::{Values, read_numbers};
use crate::object::Dict;
use crate::object::keys::{C0, C1, N};
use smallvec::smallvec;

/// A type 2 function (exponential interpolation function).
#[derive(Debug)]
pub(crate) struct Exponential {
    c0: Values,
    c1: Values,
    n: f32,
}

impl Exponential {
    pub(crate) fn new(doc: &Document, dict: &Dict) -> Result<Self> {
        let c0 = read_numbers(doc, dict, C0)?.unwrap_or_else(|| smallvec![0.0]);
        let c1 = read_numbers(doc, dict, C1)?.unwrap_or_else(|| smallvec![1.0]);
        let n = doc
            .get(dict, N)
            .as_f32()
            .ok_or_else(|| err!(MissingRequiredEntry, "exponential function has no /N"))?;

        if c0.len() != c1.len() {
            bail!(
                SyntaxError,
                "/C0 and /C1 have different lengths ({} and {})",
                c0.len(),
                c1.len()
            );
        }

        Ok(Self { c0, c1, n })
    }

    pub(crate) fn evaluate(&self, x: f32) -> Result<Values> {
        if self.n.fract() != 0.0 && x < 0.0 {
            bail!(
                FunctionDomainMismatch,
                "non-integer exponent {} with negative input {x}",
                self.n
            );
        }

        if self.n < 0.0 && x == 0.0 {
            bail!(FunctionDomainMismatch, "negative exponent {} with zero input", self.n);
        }

        let t = x.powf(self.n);

        Ok(self
            .c0
            .iter()
            .zip(&self.c1)
            .map(|(c0, c1)| c0 + t * (c1 - c0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::function::tests::function;

    #[test]
    fn linear() {
        let f = function("<< /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >>");

        assert_eq!(f.evaluate(&[0.5]).unwrap().as_slice(), &[0.5]);
    }

    #[test]
    fn multiple_outputs() {
        let f = function("<< /FunctionType 2 /Domain [0 1] /C0 [0 20] /C1 [30 -50] /N 1 >>");

        assert_eq!(f.evaluate(&[0.0]).unwrap().as_slice(), &[0.0, 20.0]);
        assert_eq!(f.evaluate(&[0.5]).unwrap().as_slice(), &[15.0, -15.0]);
        assert_eq!(f.evaluate(&[1.0]).unwrap().as_slice(), &[30.0, -50.0]);
    }

    #[test]
    fn with_exponent() {
        let f = function("<< /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [30] /N 2 >>");

        assert_eq!(f.evaluate(&[0.5]).unwrap().as_slice(), &[7.5]);
    }

    #[test]
    fn defaults() {
        let f = function("<< /FunctionType 2 /Domain [0 1] /N 3 >>");

        assert_eq!(f.evaluate(&[0.5]).unwrap().as_slice(), &[0.125]);
    }

    #[test]
    fn domain_errors() {
        let f = function("<< /FunctionType 2 /Domain [-1 1] /N 0.5 >>");
        let err = f.evaluate(&[-0.5]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FunctionDomainMismatch);
        assert!(f.evaluate(&[0.25]).is_ok());

        let f = function("<< /FunctionType 2 /Domain [0 1] /N -1 >>");
        let err = f.evaluate(&[0.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FunctionDomainMismatch);
        assert_eq!(f.evaluate(&[0.5]).unwrap().as_slice(), &[2.0]);
    }
}
