//! AES-CBC helpers on top of the `aes` and `cbc` crates.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use log::warn;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

/// Decrypt data whose first 16 bytes are the initialization vector, removing
/// the trailing padding.
pub(crate) fn decrypt_with_iv(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let Some((iv, body)) = data.split_at_checked(16) else {
        warn!("AES data shorter than its initialization vector");
        return Some(Vec::new());
    };

    let usable = body.len() - body.len() % 16;

    if usable != body.len() {
        warn!("AES data is not a multiple of the block size");
    }

    let mut out = decrypt_no_padding(key, iv, &body[..usable])?;

    if let Some(&pad) = out.last() {
        let pad = pad as usize;

        if (1..=16).contains(&pad) && pad <= out.len() {
            out.truncate(out.len() - pad);
        } else {
            warn!("invalid AES padding");
        }
    }

    Some(out)
}

/// Decrypt block-aligned data with an explicit initialization vector.
pub(crate) fn decrypt_no_padding(key: &[u8], iv: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let mut buf = data.to_vec();

    match key.len() {
        16 => {
            Aes128CbcDec::new_from_slices(key, iv)
                .ok()?
                .decrypt_padded_mut::<NoPadding>(&mut buf)
                .ok()?;
        }
        32 => {
            Aes256CbcDec::new_from_slices(key, iv)
                .ok()?
                .decrypt_padded_mut::<NoPadding>(&mut buf)
                .ok()?;
        }
        n => {
            warn!("unsupported AES key length {n}");
            return None;
        }
    }

    Some(buf)
}

/// Encrypt block-aligned data with AES-128 in CBC mode.
pub(crate) fn encrypt_128_no_padding(key: &[u8], iv: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let mut buf = data.to_vec();
    let len = buf.len();

    Aes128CbcEnc::new_from_slices(key, iv)
        .ok()?
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .ok()?;

    Some(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_iv() {
        let key = [7_u8; 16];
        let iv = [3_u8; 16];
        // "hello" padded to a full block.
        let mut plain = b"hello".to_vec();
        plain.extend([11_u8; 11]);

        let encrypted = encrypt_128_no_padding(&key, &iv, &plain).unwrap();
        let mut data = iv.to_vec();
        data.extend(encrypted);

        assert_eq!(decrypt_with_iv(&key, &data).unwrap(), b"hello");
    }

    #[test]
    fn short_data() {
        assert_eq!(decrypt_with_iv(&[0; 16], &[1, 2, 3]).unwrap(), Vec::<u8>::new());
        assert!(decrypt_no_padding(&[0; 5], &[0; 16], &[0; 16]).is_none());
    }
}
