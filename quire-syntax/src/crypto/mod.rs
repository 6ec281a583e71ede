//! The standard security handler.
//!
//! These routines exist to read already encrypted documents. They have not
//! been audited and must not be used to protect new data.

mod aes;
mod rc4;

use crate::error::{ErrorKind, Result, bail, err};
use crate::object::keys::{
    CF, CFM, ENCRYPT_METADATA, FILTER, LENGTH, O, OE, P, PERMS, R, STM_F, STR_F, U, UE, V,
};
use crate::object::{Dict, Name, ObjRef};
use bitflags::bitflags;
use log::{debug, warn};
use rc4::Rc4;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256, Sha384, Sha512};

const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

bitflags! {
    /// The access permissions granted by the `/P` entry.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Permissions: u32 {
        /// Print the document.
        const PRINT = 1 << 2;
        /// Modify the contents of the document.
        const MODIFY = 1 << 3;
        /// Copy or extract text and graphics.
        const COPY = 1 << 4;
        /// Add or modify annotations.
        const ANNOTATE = 1 << 5;
        /// Fill in form fields.
        const FILL_FORMS = 1 << 8;
        /// Extract text and graphics for accessibility.
        const EXTRACT_ACCESSIBILITY = 1 << 9;
        /// Assemble the document.
        const ASSEMBLE = 1 << 10;
        /// Print at full quality.
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

/// The cipher used for strings or streams.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CryptMethod {
    /// No encryption.
    None,
    /// RC4 with a per-object key.
    Rc4,
    /// AES-128 in CBC mode with a per-object key.
    AesV2,
    /// AES-256 in CBC mode with the file key.
    AesV3,
}

impl CryptMethod {
    fn from_cfm(name: &[u8]) -> Option<Self> {
        match name {
            b"None" | b"Identity" => Some(Self::None),
            b"V2" => Some(Self::Rc4),
            b"AESV2" => Some(Self::AesV2),
            b"AESV3" => Some(Self::AesV3),
            _ => None,
        }
    }
}

/// The state of the standard security handler for one document.
#[derive(Debug, Clone)]
pub struct Crypt {
    v: u8,
    r: u8,
    key: Vec<u8>,
    stream_method: CryptMethod,
    string_method: CryptMethod,
    filters: FxHashMap<Name, CryptMethod>,
    encrypt_metadata: bool,
    permissions: Permissions,
    owner: bool,
}

impl Crypt {
    /// Set up decryption from an encryption dictionary, the first element of
    /// the trailer's `/ID` and a password (empty for documents that open
    /// without one).
    ///
    /// The password is tried as user password first, then as owner password.
    pub fn new(dict: &Dict, id: &[u8], password: &[u8]) -> Result<Self> {
        match dict.get_name(FILTER) {
            Some(f) if &**f == b"Standard" => {}
            Some(f) => bail!(
                UnsupportedFeature,
                "unsupported security handler {}",
                f.as_str()
            ),
            None => bail!(MissingRequiredEntry, "encryption dictionary has no /Filter"),
        }

        let v = int_entry(dict, V)? as u8;
        let r = int_entry(dict, R)? as u8;
        let o = dict
            .get_string(O)
            .ok_or_else(|| err!(MissingRequiredEntry, "encryption dictionary has no /O"))?;
        let u = dict
            .get_string(U)
            .ok_or_else(|| err!(MissingRequiredEntry, "encryption dictionary has no /U"))?;
        let p = int_entry(dict, P)? as i32;
        let encrypt_metadata = dict.get_bool(ENCRYPT_METADATA).unwrap_or(true);

        let mut filters = FxHashMap::default();

        if let Some(cf) = dict.get_dict(CF) {
            for (name, value) in cf.iter() {
                let method = value
                    .as_dict()
                    .and_then(|d| d.get_name(CFM))
                    .and_then(|m| CryptMethod::from_cfm(m));

                match method {
                    Some(method) => {
                        filters.insert(name.clone(), method);
                    }
                    None => warn!("unsupported crypt filter {name:?}"),
                }
            }
        }

        let (stream_method, string_method) = match v {
            1 | 2 => (CryptMethod::Rc4, CryptMethod::Rc4),
            4 | 5 => {
                let lookup = |key: &[u8]| -> Result<CryptMethod> {
                    match dict.get_name(key) {
                        None => Ok(CryptMethod::None),
                        Some(n) if &**n == b"Identity" => Ok(CryptMethod::None),
                        Some(n) => filters.get(n).copied().ok_or_else(|| {
                            err!(UnsupportedFeature, "unknown crypt filter {}", n.as_str())
                        }),
                    }
                };

                (lookup(STM_F)?, lookup(STR_F)?)
            }
            _ => bail!(UnsupportedFeature, "unsupported encryption version {v}"),
        };

        let (key, owner) = match r {
            2..=4 => {
                let len = if r == 2 {
                    5
                } else {
                    let bits = dict.get_int(LENGTH).unwrap_or(if v == 4 { 128 } else { 40 });
                    (bits as usize / 8).clamp(5, 16)
                };

                let params = LegacyParams {
                    r,
                    len,
                    o,
                    u,
                    p,
                    id,
                    encrypt_metadata,
                };

                authenticate_legacy(&params, password)?
            }
            5 | 6 => authenticate_aes256(dict, r, o, u, password)?,
            _ => bail!(UnsupportedFeature, "unsupported security handler revision {r}"),
        };

        let permissions = if owner {
            Permissions::all()
        } else {
            Permissions::from_bits_truncate(p as u32)
        };

        debug!("authenticated encryption V{v} R{r} (owner: {owner})");

        Ok(Self {
            v,
            r,
            key,
            stream_method,
            string_method,
            filters,
            encrypt_metadata,
            permissions,
            owner,
        })
    }

    /// The `/V` entry.
    pub fn version(&self) -> u8 {
        self.v
    }

    /// The `/R` entry.
    pub fn revision(&self) -> u8 {
        self.r
    }

    /// The file encryption key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The permissions granted to the authenticated user.
    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Whether the owner password was supplied.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Whether metadata streams are encrypted.
    pub fn encrypts_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// The default method for streams.
    pub fn stream_method(&self) -> CryptMethod {
        self.stream_method
    }

    /// The method for strings.
    pub fn string_method(&self) -> CryptMethod {
        self.string_method
    }

    /// The method of a named crypt filter, as used by a `/Crypt` stream filter.
    pub fn filter_method(&self, name: &[u8]) -> Option<CryptMethod> {
        if name == b"Identity" {
            return Some(CryptMethod::None);
        }

        self.filters.get(&Name::new(name)).copied()
    }

    /// Derive the key for the given object.
    pub fn object_key(&self, method: CryptMethod, id: ObjRef) -> Vec<u8> {
        match method {
            CryptMethod::None => Vec::new(),
            CryptMethod::AesV3 => self.key.clone(),
            CryptMethod::Rc4 | CryptMethod::AesV2 => {
                let mut ctx = md5::Context::new();
                ctx.consume(&self.key);
                ctx.consume(&id.num.to_le_bytes()[..3]);
                ctx.consume(id.generation.to_le_bytes());

                if method == CryptMethod::AesV2 {
                    ctx.consume(b"sAlT");
                }

                let hash = ctx.finalize().0;
                hash[..(self.key.len() + 5).min(16)].to_vec()
            }
        }
    }

    /// Decrypt a string of the given object.
    pub fn decrypt_string(&self, id: ObjRef, data: &[u8]) -> Result<Vec<u8>> {
        decrypt(self.string_method, &self.object_key(self.string_method, id), data)
    }

    /// Decrypt the data of a stream of the given object.
    pub fn decrypt_stream(&self, id: ObjRef, data: &[u8]) -> Result<Vec<u8>> {
        decrypt(self.stream_method, &self.object_key(self.stream_method, id), data)
    }
}

/// Decrypt data with an object key derived by [`Crypt::object_key`].
pub fn decrypt(method: CryptMethod, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match method {
        CryptMethod::None => Ok(data.to_vec()),
        CryptMethod::Rc4 => Ok(Rc4::new(key).process(data)),
        CryptMethod::AesV2 | CryptMethod::AesV3 => aes::decrypt_with_iv(key, data)
            .ok_or_else(|| err!(UnsupportedFeature, "invalid AES key length {}", key.len())),
    }
}

fn int_entry(dict: &Dict, key: &[u8]) -> Result<i64> {
    dict.get_int(key).ok_or_else(|| {
        err!(
            MissingRequiredEntry,
            "encryption dictionary has no /{}",
            String::from_utf8_lossy(key)
        )
    })
}

struct LegacyParams<'a> {
    r: u8,
    len: usize,
    o: &'a [u8],
    u: &'a [u8],
    p: i32,
    id: &'a [u8],
    encrypt_metadata: bool,
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PASSWORD_PADDING;
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);

    padded
}

fn authenticate_legacy(params: &LegacyParams<'_>, password: &[u8]) -> Result<(Vec<u8>, bool)> {
    let key = file_key_legacy(params, password);

    if check_user_legacy(params, &key) {
        return Ok((key, false));
    }

    let user_password = user_password_from_owner(params, password);
    let key = file_key_legacy(params, &user_password);

    if check_user_legacy(params, &key) {
        return Ok((key, true));
    }

    Err(crate::error::DocError::new(
        ErrorKind::EncryptionAuthenticationFailure,
        "the password was neither a valid user nor owner password",
    ))
}

/// Compute the file key from a user password (revisions 2 to 4).
fn file_key_legacy(params: &LegacyParams<'_>, password: &[u8]) -> Vec<u8> {
    let mut ctx = md5::Context::new();
    ctx.consume(pad_password(password));
    ctx.consume(params.o);
    ctx.consume(params.p.to_le_bytes());
    ctx.consume(params.id);

    if params.r >= 4 && !params.encrypt_metadata {
        ctx.consume([0xFF_u8; 4]);
    }

    let mut hash = ctx.finalize().0;

    if params.r >= 3 {
        for _ in 0..50 {
            hash = md5::compute(&hash[..params.len]).0;
        }
    }

    hash[..params.len].to_vec()
}

/// Compute the `/U` value for a file key (revisions 2 to 4).
fn compute_u_legacy(params: &LegacyParams<'_>, key: &[u8]) -> Vec<u8> {
    if params.r == 2 {
        return Rc4::new(key).process(&PASSWORD_PADDING);
    }

    let mut ctx = md5::Context::new();
    ctx.consume(PASSWORD_PADDING);
    ctx.consume(params.id);
    let hash = ctx.finalize().0;

    let mut out = Rc4::new(key).process(&hash);

    for i in 1..=19_u8 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        out = Rc4::new(&round_key).process(&out);
    }

    out
}

fn check_user_legacy(params: &LegacyParams<'_>, key: &[u8]) -> bool {
    let computed = compute_u_legacy(params, key);

    if params.r == 2 {
        params.u.get(..32) == Some(&computed[..])
    } else {
        params.u.get(..16) == computed.get(..16)
    }
}

/// Recover the user password from the `/O` entry using an owner password.
fn user_password_from_owner(params: &LegacyParams<'_>, owner_password: &[u8]) -> Vec<u8> {
    let mut hash = md5::compute(pad_password(owner_password)).0;

    if params.r >= 3 {
        for _ in 0..50 {
            hash = md5::compute(hash).0;
        }
    }

    let key = &hash[..params.len];
    let o = params.o.get(..32).unwrap_or(params.o);

    if params.r == 2 {
        Rc4::new(key).process(o)
    } else {
        let mut out = o.to_vec();

        for i in (0..=19_u8).rev() {
            let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            out = Rc4::new(&round_key).process(&out);
        }

        out
    }
}

/// Compute the hash of a password (revisions 5 and 6).
fn hash_aes256(password: &[u8], salt: &[u8], user_key: &[u8], r: u8) -> Result<[u8; 32]> {
    let mut k: Vec<u8> = Sha256::new()
        .chain_update(password)
        .chain_update(salt)
        .chain_update(user_key)
        .finalize()
        .to_vec();

    if r == 6 {
        let mut round = 0_u32;

        loop {
            let mut single = Vec::with_capacity(password.len() + k.len() + user_key.len());
            single.extend_from_slice(password);
            single.extend_from_slice(&k);
            single.extend_from_slice(user_key);
            let k1 = single.repeat(64);

            let e = aes::encrypt_128_no_padding(&k[..16], &k[16..32], &k1)
                .ok_or_else(|| err!(UnsupportedFeature, "failed to compute password hash"))?;

            let modulo = e[..16].iter().map(|b| *b as u32).sum::<u32>() % 3;

            k = match modulo {
                0 => Sha256::digest(&e).to_vec(),
                1 => Sha384::digest(&e).to_vec(),
                _ => Sha512::digest(&e).to_vec(),
            };

            round += 1;

            let last = e.last().copied().unwrap_or(0) as u32;

            if round >= 64 && last + 32 <= round {
                break;
            }
        }
    }

    let mut out = [0_u8; 32];
    out.copy_from_slice(&k[..32]);

    Ok(out)
}

fn authenticate_aes256(
    dict: &Dict,
    r: u8,
    o: &[u8],
    u: &[u8],
    password: &[u8],
) -> Result<(Vec<u8>, bool)> {
    let password = &password[..password.len().min(127)];

    let (Some(o), Some(u)) = (o.get(..48), u.get(..48)) else {
        bail!(SyntaxError, "/O and /U must be at least 48 bytes long");
    };

    let unwrap_key = |entry: &[u8], intermediate: [u8; 32]| -> Result<Vec<u8>> {
        let wrapped = dict
            .get_string(entry)
            .and_then(|s| s.get(..32))
            .ok_or_else(|| err!(MissingRequiredEntry, "missing key entry for AES-256"))?;

        aes::decrypt_no_padding(&intermediate, &[0; 16], wrapped)
            .ok_or_else(|| err!(UnsupportedFeature, "failed to unwrap file key"))
    };

    let (key, owner) = if hash_aes256(password, &o[32..40], u, r)? == o[..32] {
        let intermediate = hash_aes256(password, &o[40..48], u, r)?;
        (unwrap_key(OE, intermediate)?, true)
    } else if hash_aes256(password, &u[32..40], &[], r)? == u[..32] {
        let intermediate = hash_aes256(password, &u[40..48], &[], r)?;
        (unwrap_key(UE, intermediate)?, false)
    } else {
        bail!(
            EncryptionAuthenticationFailure,
            "the password was neither a valid user nor owner password"
        );
    };

    if let Some(perms) = dict.get_string(PERMS).and_then(|p| p.get(..16))
        && let Some(decrypted) = aes::decrypt_no_padding(&key, &[0; 16], perms)
        && &decrypted[9..12] != b"adb"
    {
        warn!("/Perms entry does not match the file key");
    }

    Ok((key, owner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    // Vectors generated with an independent implementation of the standard
    // security handler (Python, hashlib and `cryptography`).
    const ID: &[u8] = b"\x6c\x4f\x23\x1a\x99\x02\xbe\x5d\x11\x70\x0c\x8e\x3d\x44\xa2\x17";

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn legacy_dict(v: i64, r: i64, length: i64, o: &str, u: &str, p: i64) -> Dict {
        let mut d = Dict::new();
        d.insert(FILTER, Object::name(b"Standard"));
        d.insert(V, Object::Int(v));
        d.insert(R, Object::Int(r));
        d.insert(LENGTH, Object::Int(length));
        d.insert(O, Object::string(&hex(o)));
        d.insert(U, Object::string(&hex(u)));
        d.insert(P, Object::Int(p));

        d
    }

    #[test]
    fn r3_empty_user_password() {
        let dict = legacy_dict(2, 3, 128, R3_O, R3_U, -12);
        let crypt = Crypt::new(&dict, ID, b"").unwrap();

        assert_eq!(crypt.key(), hex(R3_KEY));
        assert!(!crypt.is_owner());
        assert!(crypt.permissions().contains(Permissions::PRINT));
        assert!(!crypt.permissions().contains(Permissions::MODIFY));
    }

    // The standard security handler dictionaries of the pdf.js test suite
    // (`test/unit/crypto_spec.js`, `map1` and `map2`).
    #[test]
    fn pdf_js_vectors() {
        let dict = legacy_dict(2, 3, 128, PDFJS_R3_O, PDFJS_R3_U, -1028);
        let crypt = Crypt::new(&dict, &hex(PDFJS_ID_1), b"123456").unwrap();
        assert_eq!(crypt.key(), hex("4e3bcf7b7cdd332d047259a3606132de"));
        assert!(!crypt.is_owner());

        let mut dict = legacy_dict(4, 4, 128, PDFJS_R4_O, PDFJS_R4_U, -1084);
        let mut std_cf = Dict::new();
        std_cf.insert(CFM, Object::name(b"AESV2"));
        let mut cf = Dict::new();
        cf.insert(Name::new(b"StdCF"), Object::dict(std_cf));
        dict.insert(CF, Object::dict(cf));
        dict.insert(STM_F, Object::name(b"StdCF"));
        dict.insert(STR_F, Object::name(b"StdCF"));

        let crypt = Crypt::new(&dict, &hex(PDFJS_ID_2), b"").unwrap();
        assert_eq!(crypt.key(), hex("feb1d25de91b86bb0a95eb43d5a7f341"));
    }

    #[test]
    fn r3_owner_password() {
        let dict = legacy_dict(2, 3, 128, R3_O, R3_U, -12);
        let crypt = Crypt::new(&dict, ID, b"owner").unwrap();

        assert_eq!(crypt.key(), hex(R3_KEY));
        assert!(crypt.is_owner());
        assert_eq!(crypt.permissions(), Permissions::all());
    }

    #[test]
    fn r3_wrong_password() {
        let dict = legacy_dict(2, 3, 128, R3_O, R3_U, -12);
        let err = Crypt::new(&dict, ID, b"nope").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EncryptionAuthenticationFailure);
    }

    #[test]
    fn r2_user_password() {
        let dict = legacy_dict(1, 2, 40, R2_O, R2_U, -4);
        let crypt = Crypt::new(&dict, ID, b"user").unwrap();

        assert_eq!(crypt.key(), hex(R2_KEY));
        assert!(Crypt::new(&dict, ID, b"").is_err());
    }

    #[test]
    fn rc4_object_decryption() {
        let dict = legacy_dict(2, 3, 128, R3_O, R3_U, -12);
        let crypt = Crypt::new(&dict, ID, b"").unwrap();

        let decrypted = crypt
            .decrypt_string(ObjRef::new(7, 0), &hex(R3_STRING_7_0))
            .unwrap();
        assert_eq!(decrypted, b"Hello, encrypted world");
    }

    #[test]
    fn aesv2_object_decryption() {
        let mut dict = legacy_dict(4, 4, 128, R4_O, R4_U, -1028);
        let mut std_cf = Dict::new();
        std_cf.insert(CFM, Object::name(b"AESV2"));
        let mut cf = Dict::new();
        cf.insert(Name::new(b"StdCF"), Object::dict(std_cf));
        dict.insert(CF, Object::dict(cf));
        dict.insert(STM_F, Object::name(b"StdCF"));
        dict.insert(STR_F, Object::name(b"StdCF"));

        let crypt = Crypt::new(&dict, ID, b"").unwrap();
        assert_eq!(crypt.key(), hex(R4_KEY));
        assert_eq!(crypt.stream_method(), CryptMethod::AesV2);
        assert_eq!(crypt.filter_method(b"StdCF"), Some(CryptMethod::AesV2));
        assert_eq!(crypt.filter_method(b"Identity"), Some(CryptMethod::None));

        let decrypted = crypt
            .decrypt_stream(ObjRef::new(12, 0), &hex(R4_STREAM_12_0))
            .unwrap();
        assert_eq!(decrypted, b"BT /F1 12 Tf (AES) Tj ET");
    }

    #[test]
    fn aesv3_r6() {
        let mut dict = Dict::new();
        dict.insert(FILTER, Object::name(b"Standard"));
        dict.insert(V, Object::Int(5));
        dict.insert(R, Object::Int(6));
        dict.insert(O, Object::string(&hex(R6_O)));
        dict.insert(U, Object::string(&hex(R6_U)));
        dict.insert(OE, Object::string(&hex(R6_OE)));
        dict.insert(UE, Object::string(&hex(R6_UE)));
        dict.insert(P, Object::Int(-1028));
        let mut std_cf = Dict::new();
        std_cf.insert(CFM, Object::name(b"AESV3"));
        let mut cf = Dict::new();
        cf.insert(Name::new(b"StdCF"), Object::dict(std_cf));
        dict.insert(CF, Object::dict(cf));
        dict.insert(STM_F, Object::name(b"StdCF"));
        dict.insert(STR_F, Object::name(b"StdCF"));

        let user = Crypt::new(&dict, ID, b"user").unwrap();
        assert_eq!(user.key(), hex(R6_KEY));
        assert!(!user.is_owner());

        let owner = Crypt::new(&dict, ID, b"owner").unwrap();
        assert_eq!(owner.key(), hex(R6_KEY));
        assert!(owner.is_owner());

        assert_eq!(
            Crypt::new(&dict, ID, b"").unwrap_err().kind(),
            ErrorKind::EncryptionAuthenticationFailure
        );
    }

    const R3_O: &str = "566fa873ee33c797cd3b904fdadf814afa34df9a38f6ed41b984e2c6da2aa6f5";
    const R3_U: &str = "7f850f648f9d89e614ca3f506c5307e800000000000000000000000000000000";
    const R3_KEY: &str = "c32078359ade86e2e7fe3f7fc7e2cd25";
    const R3_STRING_7_0: &str = "03b34444ebaff74b369e91208c01472e935ea1a3cfe4";
    const R2_O: &str = "ba43e27926439321b39ab33450dc56c01e0ef0f53010bfbbcc0dfc9c72559e6e";
    const R2_U: &str = "a4039834f26006ee99a0c88257a574a37ad98741d5d50ea2610233796aa40654";
    const R2_KEY: &str = "4c2421279d";
    const R4_O: &str = "65fbeeb76e4691b7dc4babe5b911ce87196f39d0cfda0f00920838327413a714";
    const R4_U: &str = "616e398d0f6be82b3d65c5d9fb2ad47700000000000000000000000000000000";
    const R4_KEY: &str = "c62653ea86f2703e2e11e3e4d14f241e";
    const R4_STREAM_12_0: &str = "000102030405060708090a0b0c0d0e0fcc630f205df9ebd11be4ca9c95f0cb6a7579cd4bd7abc241fcf409b4ed3d779f";
    const R6_O: &str = "857002dd54e1efa185da531afbdddae14135cfa2becb1389d37f265d1e3bf5b71112131415161718191a1b1c1d1e1f20";
    const R6_U: &str = "17424b40ead366f7ddef0ff073608aa68ba701714b5cef3409b94c4ffa7637260102030405060708090a0b0c0d0e0f10";
    const R6_OE: &str = "890d0cef5f73ddac6ba8db6017114c165aa0ea0a86af37eb8939d843ba2ada9b";
    const R6_UE: &str = "d382d7afbd45a88d0a6ed604f8b9a4e4df514c0f191b44f10da723b7d27de7db";
    const PDFJS_ID_1: &str = "f6c6af17f372528d524d9a80d1efdf18";
    const PDFJS_R3_O: &str = "80c30496916f20736c3ae61b135491f20d5612e3ff5ebbe9564fd86b9aca7c5d";
    const PDFJS_R3_U: &str = "6a0c8d3e591900bc6a647d91bdaa001800000000000000000000000000000000";
    const PDFJS_ID_2: &str = "3c4c5f3a4496af409a9db33c781c76ac";
    const PDFJS_R4_O: &str = "734614762e793527db970a3522b3e1d4adbd9b3cb4a5897515b259f168d9e9f4";
    const PDFJS_R4_U: &str = "930489a9bf8a45a688a2dbc2a0a8676e00000000000000000000000000000000";
    const R6_KEY: &str = "030a11181f262d343b424950575e656c737a81888f969da4abb2b9c0c7ced5dc";
}
