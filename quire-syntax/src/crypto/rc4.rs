/// The RC4 stream cipher.
#[derive(Clone)]
pub(crate) struct Rc4 {
    a: u8,
    b: u8,
    s: [u8; 256],
}

impl Rc4 {
    pub(crate) fn new(key: &[u8]) -> Self {
        let key = if key.is_empty() { &[0][..] } else { key };
        let mut s = [0_u8; 256];

        for (i, s) in s.iter_mut().enumerate() {
            *s = i as u8;
        }

        let mut j = 0_u8;

        for i in 0..256 {
            let tmp = s[i];
            j = j.wrapping_add(tmp).wrapping_add(key[i % key.len()]);
            s[i] = s[j as usize];
            s[j as usize] = tmp;
        }

        Self { a: 0, b: 0, s }
    }

    /// Encryption and decryption are the same operation.
    pub(crate) fn process(&mut self, data: &[u8]) -> Vec<u8> {
        let mut output = vec![0_u8; data.len()];

        for (out, byte) in output.iter_mut().zip(data) {
            self.a = self.a.wrapping_add(1);
            let tmp = self.s[self.a as usize];
            self.b = self.b.wrapping_add(tmp);
            let tmp2 = self.s[self.b as usize];
            self.s[self.a as usize] = tmp2;
            self.s[self.b as usize] = tmp;
            *out = byte ^ self.s[tmp.wrapping_add(tmp2) as usize];
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::Rc4;

    fn rc4(key: &[u8], input: &[u8]) -> Vec<u8> {
        Rc4::new(key).process(input)
    }

    #[test]
    fn known_vectors() {
        assert_eq!(
            rc4(b"Key", b"Plaintext"),
            [0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]
        );
        assert_eq!(rc4(b"Wiki", b"pedia"), [0x10, 0x21, 0xBF, 0x04, 0x20]);
        assert_eq!(
            rc4(b"Secret", b"Attack at dawn"),
            [
                0x45, 0xA0, 0x1F, 0x64, 0x5F, 0xC3, 0x5B, 0x38, 0x35, 0x52, 0x54, 0x4B, 0x9B, 0xF5
            ]
        );
    }

    #[test]
    fn symmetric() {
        let encrypted = rc4(b"\x01\x02\x03\x04\x05", b"some stream data");
        assert_eq!(rc4(b"\x01\x02\x03\x04\x05", &encrypted), b"some stream data");
    }
}
