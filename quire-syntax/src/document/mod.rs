//! The starting point for reading PDF files.

mod metadata;
mod page;

pub use metadata::{DateTime, Metadata, text_string};
pub use page::{LETTER, Page};

use crate::crypto::{Crypt, CryptMethod, Permissions};
use crate::error::{DocError, ErrorKind, Result, bail, err};
use crate::filter::{CodecRegistry, Decoded, Filter, FilterChain, Stage, stream_filters};
use crate::object::keys::{
    CATALOG, ENCRYPT, FIRST, ID, INFO, LENGTH, METADATA, N, NAME, ROOT, SIZE, TYPE,
    VERSION, XREF,
};
use crate::object::{Dict, ObjRef, Object, Stream, StreamData};
use crate::parser::Parser;
use crate::repair::{self, Repaired};
use crate::store::{ResourceKind, Store};
use crate::xref::{self, EntryKind, PdfVersion, XRefTable, scan_stream_end};
use log::{debug, trace, warn};
use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Settings for opening a document.
#[derive(Clone, Default, Debug)]
pub struct LoadSettings {
    /// The password to authenticate with. Tried as user password first, then
    /// as owner password.
    pub password: Vec<u8>,
    /// Decoders for image codecs.
    pub codecs: CodecRegistry,
}

/// A PDF document.
pub struct Document {
    data: Rc<[u8]>,
    xref: RefCell<XRefTable>,
    trailer: RefCell<Dict>,
    crypt: Option<Crypt>,
    encrypt_ref: Option<ObjRef>,
    store: RefCell<Store>,
    repaired: Cell<bool>,
    settings: LoadSettings,
    version: Option<PdfVersion>,
    pages: OnceCell<Vec<Page>>,
}

impl Document {
    /// Open a document with the default settings.
    pub fn open(data: impl Into<Rc<[u8]>>) -> Result<Self> {
        Self::open_with(data, LoadSettings::default())
    }

    /// Open a document.
    ///
    /// If the cross-reference data can't be read, the document is repaired by
    /// scanning the whole file. Documents that can't be opened even then
    /// yield [`ErrorKind::DocumentUnopenable`].
    pub fn open_with(data: impl Into<Rc<[u8]>>, settings: LoadSettings) -> Result<Self> {
        let mut doc = Self {
            data: data.into(),
            xref: RefCell::new(XRefTable::new()),
            trailer: RefCell::new(Dict::new()),
            crypt: None,
            encrypt_ref: None,
            store: RefCell::new(Store::new()),
            repaired: Cell::new(false),
            settings,
            version: None,
            pages: OnceCell::new(),
        };

        let repaired = match xref::load(&doc.data) {
            Ok(loaded) => {
                doc.version = loaded.version;
                *doc.xref.get_mut() = loaded.table;
                *doc.trailer.get_mut() = loaded.trailer;

                None
            }
            Err(e) => {
                warn!("failed to read cross-reference data ({e}), repairing");
                doc.version = xref::find_version(&doc.data);

                Some(doc.scan().map_err(|r| unopenable(r.with_cause(e)))?)
            }
        };

        doc.setup_crypt()?;

        if let Some(repaired) = &repaired {
            doc.register_object_streams(repaired);
        }

        if let Err(e) = doc.catalog() {
            if doc.repaired.get() {
                return Err(unopenable(e));
            }

            warn!("document catalog is unreadable ({e}), repairing");
            doc.repair().map_err(unopenable)?;

            if doc.crypt.is_none() {
                doc.setup_crypt()?;
            }

            doc.catalog().map_err(unopenable)?;
        }

        Ok(doc)
    }

    fn setup_crypt(&mut self) -> Result<()> {
        let trailer = self.trailer.borrow().clone();

        let Some(encrypt) = trailer.get(ENCRYPT) else {
            return Ok(());
        };

        self.encrypt_ref = encrypt.as_ref();

        let dict = match self.resolve(encrypt) {
            Object::Dict(d) => d,
            other => {
                warn!("ignoring /Encrypt entry of type {}", other.type_name());
                return Ok(());
            }
        };

        let id = trailer
            .get_array(ID)
            .and_then(|a| a.first())
            .and_then(|id| id.as_string())
            .map(<[u8]>::to_vec)
            .unwrap_or_else(|| {
                warn!("encrypted document has no /ID");
                Vec::new()
            });

        self.crypt = Some(Crypt::new(&dict, &id, &self.settings.password)?);

        Ok(())
    }

    /// Rebuild the cross-reference table by scanning the file.
    fn repair(&self) -> Result<()> {
        let repaired = self.scan()?;
        self.register_object_streams(&repaired);

        Ok(())
    }

    fn scan(&self) -> Result<Repaired> {
        self.repaired.set(true);

        let mut repaired = repair::repair(&self.data)?;
        *self.xref.borrow_mut() = std::mem::take(&mut repaired.table);
        *self.trailer.borrow_mut() = std::mem::take(&mut repaired.trailer);

        // Anything derived from the old table may be stale.
        self.store.borrow_mut().flush();

        Ok(repaired)
    }

    fn register_object_streams(&self, repaired: &Repaired) {
        let mut catalog = None;

        for container in &repaired.object_streams {
            let members = match self.object_stream(container.num) {
                Ok(members) => members,
                Err(e) => {
                    warn!("skipping broken object stream {container}: {e}");
                    continue;
                }
            };

            let mut xref = self.xref.borrow_mut();

            for (index, (num, object)) in members.objects.iter().enumerate() {
                if *num == container.num || repaired.is_superseded(*num, container.num) {
                    continue;
                }

                if object
                    .as_dict()
                    .and_then(|d| d.get_name(TYPE))
                    .is_some_and(|t| &**t == CATALOG)
                {
                    catalog = Some(ObjRef::new(*num, 0));
                }

                xref.set(
                    *num,
                    EntryKind::InObjectStream {
                        container: container.num,
                        index: index as u32,
                    },
                    0,
                );
            }
        }

        let len = self.xref.borrow().len();
        let mut trailer = self.trailer.borrow_mut();
        trailer.insert(SIZE, len as i64);

        if !trailer.contains_key(ROOT)
            && let Some(catalog) = catalog
        {
            warn!("using catalog {catalog} found in an object stream");
            trailer.insert(ROOT, catalog);
        }
    }

    /// Whether the cross-reference table had to be rebuilt.
    pub fn is_repaired(&self) -> bool {
        self.repaired.get()
    }

    /// The raw data of the file.
    pub fn data(&self) -> &Rc<[u8]> {
        &self.data
    }

    /// The settings the document was opened with.
    pub fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    /// The number of entries of the cross-reference table.
    pub fn len(&self) -> usize {
        self.xref.borrow().len()
    }

    /// Whether the cross-reference table is empty.
    pub fn is_empty(&self) -> bool {
        self.xref.borrow().is_empty()
    }

    /// The identifiers of all objects that are in use.
    pub fn object_ids(&self) -> Vec<ObjRef> {
        self.xref
            .borrow()
            .iter()
            .filter(|(_, e)| {
                matches!(
                    e.kind,
                    EntryKind::InUse { .. } | EntryKind::InObjectStream { .. }
                )
            })
            .map(|(num, e)| ObjRef::new(num, e.generation))
            .collect()
    }

    /// The entry of an object number.
    pub fn xref_entry(&self, num: u32) -> Option<EntryKind> {
        let xref = self.xref.borrow();

        match xref.get(num) {
            Some(entry) => Some(entry.kind),
            None => xref.contains(num).then_some(EntryKind::Missing),
        }
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> Dict {
        self.trailer.borrow().clone()
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<Rc<Dict>> {
        let root = self
            .trailer
            .borrow()
            .get(ROOT)
            .cloned()
            .ok_or_else(|| err!(MissingRequiredEntry, "trailer has no /Root"))?;

        match self.try_resolve(&root)? {
            Object::Dict(d) => Ok(d),
            other => bail!(
                SyntaxError,
                "document catalog is a {}, not a dictionary",
                other.type_name()
            ),
        }
    }

    /// The document information dictionary.
    pub fn info(&self) -> Option<Rc<Dict>> {
        let info = self.trailer.borrow().get(INFO).cloned()?;

        match self.resolve(&info) {
            Object::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// The metadata from the information dictionary.
    pub fn metadata(&self) -> Metadata {
        self.info()
            .map(|info| Metadata::from_info(self, &info))
            .unwrap_or_default()
    }

    /// The version of the document. A `/Version` in the catalog overrides the
    /// file header if it is newer.
    pub fn version(&self) -> Option<PdfVersion> {
        let catalog_version = self
            .catalog()
            .ok()
            .and_then(|c| c.get_name(VERSION).and_then(|v| PdfVersion::parse(v)));

        match (self.version, catalog_version) {
            (Some(header), Some(catalog)) => Some(header.max(catalog)),
            (header, catalog) => header.or(catalog),
        }
    }

    /// The security handler, if the document is encrypted.
    pub fn crypt(&self) -> Option<&Crypt> {
        self.crypt.as_ref()
    }

    /// Whether the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.crypt.is_some()
    }

    /// The permissions of the authenticated user.
    pub fn permissions(&self) -> Permissions {
        self.crypt
            .as_ref()
            .map(Crypt::permissions)
            .unwrap_or_else(Permissions::all)
    }

    /// The pages of the document.
    pub fn pages(&self) -> &[Page] {
        self.pages.get_or_init(|| page::collect_pages(self))
    }

    /// Load an indirect object.
    ///
    /// Free and never defined objects are null. Object numbers beyond the
    /// table are [`ErrorKind::ReferenceOutOfRange`]. If the object can't be
    /// parsed, the document is repaired once and the load is retried.
    pub fn load_object(&self, id: ObjRef) -> Result<Object> {
        match self.load_object_inner(id) {
            Err(e) if !self.repaired.get() && is_repairable(&e) => {
                warn!("failed to load object {id} ({e}), repairing");
                self.repair().map_err(|r| r.with_cause(e))?;

                self.load_object_inner(id)
            }
            res => res,
        }
    }

    fn load_object_inner(&self, id: ObjRef) -> Result<Object> {
        let (kind, generation, cached) = {
            let xref = self.xref.borrow();

            match xref.get(id.num) {
                Some(entry) => (
                    entry.kind,
                    entry.generation,
                    entry.cached.clone().map(|c| (c, entry.decrypted)),
                ),
                None if xref.contains(id.num) => (EntryKind::Missing, 0, None),
                None => bail!(
                    ReferenceOutOfRange,
                    "object {id} is outside of the table of {} entries",
                    xref.len()
                ),
            }
        };

        if generation != id.generation && matches!(kind, EntryKind::InUse { .. }) {
            debug!("generation mismatch for {id}: table has {generation}");
        }

        if let Some((object, decrypted)) = cached {
            if decrypted || self.crypt.is_none() {
                return Ok(object);
            }

            let object = self.decrypt_object(id, object);
            self.xref.borrow_mut().cache(id.num, object.clone(), true);

            return Ok(object);
        }

        let object = match kind {
            EntryKind::Missing | EntryKind::Free { .. } => {
                trace!("object {id} is not in use");
                return Ok(Object::Null);
            }
            EntryKind::InUse { offset } => {
                if offset >= self.data.len() {
                    bail!(SyntaxError, "offset {offset} of object {id} is out of bounds");
                }

                let (found, object) = Parser::new(&self.data, offset).parse_indirect_object()?;

                if found.num != id.num {
                    bail!(
                        SyntaxError,
                        "expected object {id} at offset {offset}, found {found}"
                    );
                }

                self.decrypt_object(id, object)
            }
            EntryKind::InObjectStream { container, index } => {
                if container == id.num {
                    bail!(SyntaxError, "object stream {container} contains itself");
                }

                self.object_stream(container)?
                    .get(index, id.num)
                    .ok_or_else(|| {
                        err!(SyntaxError, "object {id} is missing from object stream {container}")
                    })?
            }
        };

        self.xref.borrow_mut().cache(id.num, object.clone(), true);

        Ok(object)
    }

    /// Resolve an indirect reference, leaving all other objects as they are.
    pub fn try_resolve(&self, object: &Object) -> Result<Object> {
        match object {
            Object::Ref(r) => self.load_object(*r),
            other => Ok(other.clone()),
        }
    }

    /// Resolve an indirect reference. Objects that fail to load are null.
    pub fn resolve(&self, object: &Object) -> Object {
        self.try_resolve(object).unwrap_or_else(|e| {
            warn!("failed to resolve {object:?}: {e}");
            Object::Null
        })
    }

    /// Resolve the value of a dictionary entry.
    pub fn get(&self, dict: &Dict, key: &[u8]) -> Object {
        dict.get(key).map(|o| self.resolve(o)).unwrap_or_default()
    }

    /// Resolve a dictionary entry that should be a dictionary (or a stream).
    pub fn get_dict(&self, dict: &Dict, key: &[u8]) -> Option<Dict> {
        self.get(dict, key).as_dict().cloned()
    }

    fn decrypt_object(&self, id: ObjRef, object: Object) -> Object {
        let Some(crypt) = &self.crypt else {
            return object;
        };

        if self.encrypt_ref.is_some_and(|r| r.num == id.num)
            || crypt.string_method() == CryptMethod::None
        {
            return object;
        }

        decrypt_strings(crypt, id, object)
    }

    fn object_stream(&self, container: u32) -> Result<Rc<ObjectStream>> {
        let generation = self.xref.borrow().get(container).map_or(0, |e| e.generation);
        let id = ObjRef::new(container, generation);

        self.load_resource(&Object::Ref(id), ResourceKind::ObjectStream, || {
            match self.load_object(id)? {
                Object::Stream(stream) => ObjectStream::parse(self, &stream),
                other => bail!(
                    SyntaxError,
                    "object stream {id} is a {}",
                    other.type_name()
                ),
            }
        })
    }

    /// Load a resource through the object store.
    ///
    /// An empty slot is stored under the key before `loader` runs, so a loader
    /// that (indirectly) requests the same resource again gets an error
    /// instead of recursing forever. Failed loads are not cached.
    pub fn load_resource<T: 'static>(
        &self,
        key: &Object,
        kind: ResourceKind,
        loader: impl FnOnce() -> Result<T>,
    ) -> Result<Rc<T>> {
        let existing = self
            .store
            .borrow_mut()
            .get_typed::<OnceCell<Rc<T>>>(key, kind);

        if let Some(slot) = existing {
            return slot.get().cloned().ok_or_else(|| {
                err!(UnsupportedFeature, "cyclic reference while loading {kind:?} {key:?}")
            });
        }

        let slot = Rc::new(OnceCell::<Rc<T>>::new());
        self.store.borrow_mut().put(key, kind, slot.clone(), None);

        match loader() {
            Ok(value) => {
                let value = Rc::new(value);
                let _ = slot.set(value.clone());

                Ok(value)
            }
            Err(e) => {
                self.store.borrow_mut().remove(key, kind);
                Err(e)
            }
        }
    }

    /// Age all cached resources, evicting the ones not used within the last
    /// `max_age` sweeps.
    pub fn age_sweep(&self, max_age: u32) -> usize {
        self.store.borrow_mut().age_sweep(max_age)
    }

    /// Drop all cached resources.
    pub fn flush_store(&self) {
        self.store.borrow_mut().flush();
    }

    /// The number of cached resources.
    pub fn store_len(&self) -> usize {
        self.store.borrow().len()
    }

    /// The raw bytes of a stream, limited to its `/Length`.
    ///
    /// Data cut off by the end of the file is padded with zeros.
    pub fn stream_raw(&self, stream: &Stream) -> Result<Vec<u8>> {
        let start = match &stream.data {
            StreamData::Memory(data) => return Ok(data.to_vec()),
            StreamData::File(start) => *start,
        };

        let data = &self.data;

        if start > data.len() {
            bail!(StreamLengthMismatch, "stream data starts beyond the end of the file");
        }

        let length = self
            .get(&stream.dict, LENGTH)
            .as_int()
            .and_then(|l| usize::try_from(l).ok());

        match length {
            Some(len) if start.checked_add(len).is_some_and(|end| end <= data.len()) => {
                let end = start + len;

                if !repair::followed_by_endstream(data, end) {
                    let scanned = scan_stream_end(data, start);

                    if scanned < data.len() && scanned != end {
                        warn!("stream declares length {len}, but has {}", scanned - start);
                        return Ok(data[start..scanned].to_vec());
                    }
                }

                Ok(data[start..end].to_vec())
            }
            Some(len) => {
                let end = scan_stream_end(data, start);
                let mut raw = data[start..end].to_vec();

                if end < data.len() {
                    warn!("stream declares length {len}, but has {}", raw.len());
                } else if raw.len() < len {
                    warn!(
                        "stream data is truncated to {} of {len} bytes, padding with zeros",
                        raw.len()
                    );
                    raw.resize(len, 0);
                }

                Ok(raw)
            }
            None => {
                warn!("stream has no valid /Length");
                Ok(data[start..scan_stream_end(data, start)].to_vec())
            }
        }
    }

    /// Build the chain that turns the raw data of a stream into its plain
    /// (but still encoded) data, i.e. the decryption stage.
    ///
    /// No decryption happens when the stream names a `Crypt` filter of its own
    /// with the `Identity` method, or is an unencrypted metadata stream.
    pub fn build_raw_filter(&self, dict: &Dict, id: Option<ObjRef>) -> Result<FilterChain> {
        let mut chain = FilterChain::new();

        let (Some(crypt), Some(id)) = (&self.crypt, id) else {
            return Ok(chain);
        };

        if self.encrypt_ref.is_some_and(|r| r.num == id.num)
            || dict.get_name(TYPE).is_some_and(|t| &**t == XREF)
        {
            return Ok(chain);
        }

        if !crypt.encrypts_metadata() && dict.get_name(TYPE).is_some_and(|t| &**t == METADATA) {
            return Ok(chain);
        }

        let filters = stream_filters(dict, |o| self.resolve(o))?;

        let method = match filters.iter().find(|(f, _)| *f == Filter::Crypt) {
            Some((_, params)) => {
                let name = params.get_name(NAME).map_or(&b"Identity"[..], |n| &**n);

                crypt.filter_method(name).ok_or_else(|| {
                    err!(
                        UnsupportedFeature,
                        "unknown crypt filter {}",
                        String::from_utf8_lossy(name)
                    )
                })?
            }
            None => crypt.stream_method(),
        };

        if method != CryptMethod::None {
            chain.push(Stage::Decrypt {
                method,
                key: crypt.object_key(method, id),
            });
        }

        Ok(chain)
    }

    /// Build the chain that fully decodes a stream: decryption followed by all
    /// entries of `/Filter`.
    pub fn build_decode_filter(&self, dict: &Dict, id: Option<ObjRef>) -> Result<FilterChain> {
        let mut chain = self.build_raw_filter(dict, id)?;

        for (filter, params) in stream_filters(dict, |o| self.resolve(o))? {
            if filter != Filter::Crypt {
                chain.push(Stage::Decode { filter, params });
            }
        }

        Ok(chain)
    }

    /// Decode a stream. Decoding stops before an image codec without a
    /// registered decoder.
    pub fn decode_stream(&self, stream: &Stream) -> Result<Decoded> {
        let chain = self.build_decode_filter(&stream.dict, stream.id)?;
        let raw = self.stream_raw(stream)?;

        chain.apply(raw, &self.settings.codecs)
    }

    /// The fully decoded data of a stream.
    pub fn stream_data(&self, stream: &Stream) -> Result<Vec<u8>> {
        let decoded = self.decode_stream(stream)?;

        match decoded.encoded_with {
            None => Ok(decoded.data),
            Some((codec, _)) => bail!(
                UnsupportedFeature,
                "no decoder registered for {codec:?} data"
            ),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("len", &self.data.len())
            .field("objects", &self.len())
            .field("version", &self.version)
            .field("encrypted", &self.is_encrypted())
            .field("repaired", &self.is_repaired())
            .finish_non_exhaustive()
    }
}

fn is_repairable(e: &DocError) -> bool {
    matches!(
        e.kind(),
        ErrorKind::SyntaxError | ErrorKind::LexicalError | ErrorKind::StreamLengthMismatch
    )
}

fn unopenable(e: DocError) -> DocError {
    if e.kind() == ErrorKind::DocumentUnopenable {
        return e;
    }

    DocError::new(ErrorKind::DocumentUnopenable, "failed to open document").with_cause(e)
}

fn decrypt_strings(crypt: &Crypt, id: ObjRef, object: Object) -> Object {
    match object {
        Object::String(s) => match crypt.decrypt_string(id, &s) {
            Ok(plain) => Object::String(Rc::from(plain)),
            Err(e) => {
                warn!("failed to decrypt string of object {id}: {e}");
                Object::String(s)
            }
        },
        Object::Array(items) => Object::array(
            items
                .iter()
                .map(|i| decrypt_strings(crypt, id, i.clone()))
                .collect(),
        ),
        Object::Dict(dict) => Object::dict(decrypt_dict(crypt, id, &dict)),
        Object::Stream(stream) => Object::stream(Stream {
            dict: decrypt_dict(crypt, id, &stream.dict),
            data: stream.data.clone(),
            id: stream.id,
        }),
        other => other,
    }
}

fn decrypt_dict(crypt: &Crypt, id: ObjRef, dict: &Dict) -> Dict {
    dict.iter()
        .map(|(k, v)| (k.clone(), decrypt_strings(crypt, id, v.clone())))
        .collect()
}

/// The parsed members of an object stream.
struct ObjectStream {
    objects: Vec<(u32, Object)>,
}

impl ObjectStream {
    fn parse(doc: &Document, stream: &Stream) -> Result<Self> {
        let data = doc.stream_data(stream)?;

        let count = doc
            .get(&stream.dict, N)
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| err!(MissingRequiredEntry, "object stream has no valid /N"))?;
        let first = doc
            .get(&stream.dict, FIRST)
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| err!(MissingRequiredEntry, "object stream has no valid /First"))?;

        let mut header = Parser::new(&data, 0);
        let mut offsets = Vec::with_capacity(count.min(4096));

        for _ in 0..count {
            let (Ok(Object::Int(num)), Ok(Object::Int(offset))) =
                (header.parse_object(), header.parse_object())
            else {
                warn!("object stream header ends early");
                break;
            };

            let (Ok(num), Ok(offset)) = (u32::try_from(num), usize::try_from(offset)) else {
                warn!("invalid object stream header entry");
                break;
            };

            offsets.push((num, offset));
        }

        let objects = offsets
            .into_iter()
            .map(|(num, offset)| {
                let object = Parser::new(&data, first.saturating_add(offset))
                    .parse_stream_object_entry()
                    .unwrap_or_else(|e| {
                        warn!("failed to parse object {num} of object stream: {e}");
                        Object::Null
                    });

                (num, object)
            })
            .collect();

        Ok(Self { objects })
    }

    fn get(&self, index: u32, num: u32) -> Option<Object> {
        match self.objects.get(index as usize) {
            Some((n, object)) if *n == num => Some(object.clone()),
            _ => {
                debug!("object {num} is not at index {index} of its object stream");

                self.objects
                    .iter()
                    .find(|(n, _)| *n == num)
                    .map(|(_, o)| o.clone())
            }
        }
    }
}
