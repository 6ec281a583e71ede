//! Loading CMaps referenced by fonts.

use crate::{CMap, parse};
use log::warn;
use quire_syntax::object::keys::USE_CMAP;
use quire_syntax::store::ResourceKind;
use quire_syntax::{DocError, Document, ErrorKind, Object, Result};
use std::rc::Rc;

/// Resolves the name of a predefined CMap (such as `UniJIS-UCS2-H`) to its
/// data in the text format.
pub type CMapResolver = dyn Fn(&[u8]) -> Option<Vec<u8>>;

/// Let's limit the number of nested parent CMaps to 16.
const MAX_DEPTH: u32 = 16;

/// Load the CMap named or embedded by `object`, typically the `/Encoding` or
/// `/ToUnicode` entry of a font.
///
/// `Identity-H` and `Identity-V` are built in, other names are looked up with
/// `resolver`. Embedded CMaps are cached in the object store of the document.
pub fn load(doc: &Document, object: &Object, resolver: &CMapResolver) -> Result<Rc<CMap>> {
    load_inner(doc, object, resolver, 0)
}

fn load_inner(
    doc: &Document,
    object: &Object,
    resolver: &CMapResolver,
    depth: u32,
) -> Result<Rc<CMap>> {
    if depth >= MAX_DEPTH {
        return Err(DocError::new(
            ErrorKind::UnsupportedFeature,
            "too many nested parent CMaps",
        ));
    }

    let resolved = doc.try_resolve(object)?;
    let key = match object {
        Object::Ref(_) => object,
        _ => &resolved,
    };

    match &resolved {
        Object::Name(name) => match &**name {
            b"Identity-H" => Ok(Rc::new(CMap::identity_h())),
            b"Identity-V" => Ok(Rc::new(CMap::identity_v())),
            _ => doc.load_resource(key, ResourceKind::CMap, || {
                let data = resolver(&name[..]).ok_or_else(|| {
                    DocError::new(
                        ErrorKind::ResourceNotFound,
                        format!("unknown CMap {}", name.as_str()),
                    )
                })?;

                Ok(parse(&data, |parent| {
                    load_named(doc, parent, resolver, depth + 1)
                }))
            }),
        },
        Object::Stream(stream) => doc.load_resource(key, ResourceKind::CMap, || {
            let data = doc.stream_data(stream)?;
            let mut cmap = parse(&data, |parent| load_named(doc, parent, resolver, depth + 1));

            if cmap.parent().is_none()
                && let Some(parent) = stream.dict.get(USE_CMAP)
            {
                match load_inner(doc, parent, resolver, depth + 1) {
                    Ok(parent) => cmap.set_parent(parent),
                    Err(e) => warn!("failed to load parent CMap: {e}"),
                }
            }

            Ok(cmap)
        }),
        other => Err(DocError::new(
            ErrorKind::SyntaxError,
            format!("expected a CMap name or stream, found {}", other.type_name()),
        )),
    }
}

fn load_named(
    doc: &Document,
    name: &[u8],
    resolver: &CMapResolver,
    depth: u32,
) -> Option<Rc<CMap>> {
    load_inner(doc, &Object::name(name), resolver, depth)
        .inspect_err(|e| warn!("failed to load parent CMap: {e}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_syntax::ObjRef;

    fn document(objects: &[&str]) -> Document {
        let mut data = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();

        for (i, object) in objects.iter().enumerate() {
            offsets.push(data.len());
            data.extend_from_slice(format!("{} 0 obj\n{object}\nendobj\n", i + 1).as_bytes());
        }

        let xref = data.len();
        data.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1).as_bytes());

        for offset in offsets {
            data.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }

        data.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );

        Document::open(data).unwrap()
    }

    fn stream(dict: &str, body: &str) -> String {
        format!("<< {dict} /Length {} >>\nstream\n{body}\nendstream", body.len())
    }

    fn no_resolver(_: &[u8]) -> Option<Vec<u8>> {
        None
    }

    #[test]
    fn identity() {
        let doc = document(&["<< /Type /Catalog >>"]);
        let cmap = load(&doc, &Object::name(b"Identity-H"), &no_resolver).unwrap();

        assert_eq!(cmap.lookup(0x1234), Some(0x1234));
    }

    #[test]
    fn predefined() {
        let doc = document(&["<< /Type /Catalog >>"]);
        let resolver = |name: &[u8]| {
            (name == b"Test-H")
                .then(|| b"1 begincodespacerange <00> <FF> endcodespacerange 1 begincidrange <00> <FF> 10 endcidrange".to_vec())
        };

        let cmap = load(&doc, &Object::name(b"Test-H"), &resolver).unwrap();
        assert_eq!(cmap.lookup(5), Some(15));

        let err = load(&doc, &Object::name(b"Missing-H"), &resolver).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
    }

    #[test]
    fn embedded_with_parent_stream() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream(
                "/UseCMap 3 0 R",
                "1 begincidchar <41> 1 endcidchar",
            ),
            &stream(
                "",
                "1 begincodespacerange <00> <FF> endcodespacerange 1 begincidrange <00> <FF> 100 endcidrange",
            ),
        ]);

        let reference = Object::Ref(ObjRef::new(2, 0));
        let cmap = load(&doc, &reference, &no_resolver).unwrap();

        assert_eq!(cmap.lookup(0x41), Some(1));
        assert_eq!(cmap.lookup(0x42), Some(166));
        assert_eq!(cmap.decode_next(b"B"), Some((0x42, 1)));

        let again = load(&doc, &reference, &no_resolver).unwrap();
        assert!(Rc::ptr_eq(&cmap, &again));
    }

    #[test]
    fn self_referencing_parent() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            &stream("/UseCMap 2 0 R", "1 begincidchar <41> 1 endcidchar"),
        ]);

        let cmap = load(&doc, &Object::Ref(ObjRef::new(2, 0)), &no_resolver).unwrap();

        assert_eq!(cmap.lookup(0x41), Some(1));
        assert!(cmap.parent().is_none());
    }
}
