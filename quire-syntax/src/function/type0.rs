use crate::bit::BitReader;
use crate::document::Document;
use crate::error::{Result, bail, err};
use crate::function::{Intervals, Values, interpolate, read_intervals};
use crate::object::Stream;
use crate::object::keys::{BITS_PER_SAMPLE, DECODE, ENCODE, SIZE};
use log::warn;
use smallvec::SmallVec;

// More inputs would make the 2^m corner loop explode.
const MAX_INPUTS: usize = 16;

/// A type 0 function (sampled function).
#[derive(Debug)]
pub(crate) struct Sampled {
    sizes: SmallVec<[u32; 4]>,
    domain: Intervals,
    encode: Intervals,
    decode: Intervals,
    bits_per_sample: u8,
    outputs: usize,
    samples: Vec<u32>,
}

impl Sampled {
    pub(crate) fn new(
        doc: &Document,
        stream: &Stream,
        domain: &Intervals,
        range: &Intervals,
    ) -> Result<Self> {
        let dict = &stream.dict;

        let bits_per_sample = match doc.get(dict, BITS_PER_SAMPLE).as_int() {
            Some(b @ (1 | 2 | 4 | 8 | 12 | 16 | 24 | 32)) => b as u8,
            Some(b) => bail!(UnsupportedFeature, "unsupported bits per sample: {b}"),
            None => bail!(MissingRequiredEntry, "sampled function has no /BitsPerSample"),
        };

        let sizes = doc
            .get(dict, SIZE)
            .as_array()
            .map(|a| {
                a.iter()
                    .map(|s| s.as_int().and_then(|s| u32::try_from(s).ok()).filter(|s| *s > 0))
                    .collect::<Option<SmallVec<[u32; 4]>>>()
            })
            .ok_or_else(|| err!(MissingRequiredEntry, "sampled function has no /Size"))?
            .ok_or_else(|| err!(SyntaxError, "invalid /Size in sampled function"))?;

        if sizes.len() != domain.len() {
            bail!(
                FunctionDomainMismatch,
                "/Size has {} entries, but the function takes {} inputs",
                sizes.len(),
                domain.len()
            );
        }

        if sizes.len() > MAX_INPUTS {
            bail!(UnsupportedFeature, "sampled function has too many inputs");
        }

        let encode = read_intervals(doc, dict, ENCODE)?
            .unwrap_or_else(|| sizes.iter().map(|s| (0.0, (*s - 1) as f32)).collect());
        let decode = read_intervals(doc, dict, DECODE)?.unwrap_or_else(|| range.clone());

        if encode.len() != sizes.len() || decode.len() != range.len() {
            bail!(FunctionDomainMismatch, "/Encode or /Decode has the wrong length");
        }

        let outputs = range.len();
        let count = sizes
            .iter()
            .try_fold(outputs, |acc, s| acc.checked_mul(*s as usize))
            .filter(|c| *c <= 1 << 26)
            .ok_or_else(|| err!(UnsupportedFeature, "sampled function is too large"))?;

        let data = doc.stream_data(stream)?;
        let mut reader = BitReader::new(&data);
        let mut samples = Vec::with_capacity(count);

        while samples.len() < count {
            match reader.read(bits_per_sample) {
                Some(sample) => samples.push(sample),
                None => break,
            }
        }

        if samples.len() < count {
            warn!(
                "sampled function has {} of {count} samples, padding with zeros",
                samples.len()
            );
            samples.resize(count, 0);
        }

        Ok(Self {
            sizes,
            domain: domain.clone(),
            encode,
            decode,
            bits_per_sample,
            outputs,
            samples,
        })
    }

    pub(crate) fn evaluate(&self, input: &[f32]) -> Values {
        let domain_to_index = |i: usize, x: f32| {
            let max = (self.sizes[i] - 1) as f32;
            let (d0, d1) = self.domain[i];
            let (e0, e1) = self.encode[i];

            interpolate(x, d0, d1, e0, e1).max(0.0).min(max)
        };

        // The position between the two neighbouring samples on every axis.
        let mut floor = SmallVec::<[usize; 4]>::new();
        let mut frac = SmallVec::<[f32; 4]>::new();

        for (i, x) in input.iter().enumerate() {
            let e = domain_to_index(i, *x);
            let lo = e.floor();

            floor.push(lo as usize);
            frac.push(e - lo);
        }

        let mut out = Values::from_elem(0.0, self.outputs);

        for corner in 0..1_usize << input.len() {
            let mut weight = 1.0;
            let mut index = 0;
            let mut stride = 1;

            for axis in 0..input.len() {
                let upper = corner & (1 << axis) != 0;
                let size = self.sizes[axis] as usize;

                let pos = if upper {
                    weight *= frac[axis];
                    (floor[axis] + 1).min(size - 1)
                } else {
                    weight *= 1.0 - frac[axis];
                    floor[axis]
                };

                index += pos * stride;
                stride *= size;
            }

            if weight == 0.0 {
                continue;
            }

            for (j, o) in out.iter_mut().enumerate() {
                *o += weight * self.samples[index * self.outputs + j] as f32;
            }
        }

        let max_sample = ((1_u64 << self.bits_per_sample) - 1) as f32;

        for (o, (d0, d1)) in out.iter_mut().zip(&self.decode) {
            *o = interpolate(*o, 0.0, max_sample, *d0, *d1);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::function::tests::stream_function;

    #[test]
    fn one_input_linear() {
        let f = stream_function(
            "<< /FunctionType 0 /Domain [0 1] /Range [0 1] /Size [2] /BitsPerSample 8 >>",
            &[0, 255],
        )
        .unwrap();

        assert_eq!(f.evaluate(&[0.0]).unwrap().as_slice(), &[0.0]);
        assert_eq!(f.evaluate(&[1.0]).unwrap().as_slice(), &[1.0]);
        assert_eq!(f.evaluate(&[0.5]).unwrap().as_slice(), &[0.5]);
    }

    #[test]
    fn two_inputs_bilinear() {
        // Samples at (0,0)=0, (1,0)=100, (0,1)=200, (1,1)=255.
        let f = stream_function(
            "<< /FunctionType 0 /Domain [0 1 0 1] /Range [0 255] /Decode [0 255] \
             /Size [2 2] /BitsPerSample 8 >>",
            &[0, 100, 200, 255],
        )
        .unwrap();

        assert_eq!(f.evaluate(&[1.0, 0.0]).unwrap().as_slice(), &[100.0]);
        assert_eq!(f.evaluate(&[0.0, 1.0]).unwrap().as_slice(), &[200.0]);
        assert_eq!(f.evaluate(&[0.5, 0.5]).unwrap().as_slice(), &[138.75]);
    }

    #[test]
    fn multiple_outputs_and_odd_depths() {
        // Two 12-bit outputs per sample: (0, 4095) then (4095, 0).
        let f = stream_function(
            "<< /FunctionType 0 /Domain [0 1] /Range [0 1 0 1] /Size [2] /BitsPerSample 12 >>",
            &[0x00, 0x0f, 0xff, 0xff, 0xf0, 0x00],
        )
        .unwrap();

        assert_eq!(f.evaluate(&[0.0]).unwrap().as_slice(), &[0.0, 1.0]);
        assert_eq!(f.evaluate(&[1.0]).unwrap().as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn truncated_samples_are_padded() {
        let f = stream_function(
            "<< /FunctionType 0 /Domain [0 1] /Range [0 1] /Size [3] /BitsPerSample 8 >>",
            &[255],
        )
        .unwrap();

        assert_eq!(f.evaluate(&[0.0]).unwrap().as_slice(), &[1.0]);
        assert_eq!(f.evaluate(&[1.0]).unwrap().as_slice(), &[0.0]);
    }

    #[test]
    fn invalid_bits_per_sample() {
        let err = stream_function(
            "<< /FunctionType 0 /Domain [0 1] /Range [0 1] /Size [2] /BitsPerSample 7 >>",
            &[0, 0],
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }
}
