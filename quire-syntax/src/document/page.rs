//! Reading the pages of a PDF document.

use crate::document::Document;
use crate::object::keys::{
    ANNOTS, CONTENTS, CROP_BOX, GROUP, KIDS, MEDIA_BOX, PAGE, PAGES, RESOURCES, ROTATE, TYPE,
    USER_UNIT,
};
use crate::object::{Dict, ObjRef, Object, Stream};
use kurbo::Rect;
use log::warn;
use rustc_hash::FxHashSet;
use std::rc::Rc;

/// US Letter, the media box of pages that don't declare one.
pub const LETTER: Rect = Rect::new(0.0, 0.0, 612.0, 792.0);

const MAX_DEPTH: usize = 64;

/// Attributes that can be inherited.
#[derive(Debug, Clone, Default)]
struct Inherited {
    media_box: Option<Rect>,
    crop_box: Option<Rect>,
    rotate: Option<i64>,
    resources: Option<Dict>,
}

impl Inherited {
    fn update(&mut self, doc: &Document, dict: &Dict) {
        if let Some(media_box) = read_rect(doc, dict, MEDIA_BOX) {
            self.media_box = Some(media_box);
        }

        if let Some(crop_box) = read_rect(doc, dict, CROP_BOX) {
            self.crop_box = Some(crop_box);
        }

        if let Some(rotate) = doc.get(dict, ROTATE).as_int() {
            self.rotate = Some(rotate);
        }

        if let Some(resources) = doc.get_dict(dict, RESOURCES) {
            self.resources = Some(resources);
        }
    }
}

/// A PDF page.
#[derive(Debug, Clone)]
pub struct Page {
    id: Option<ObjRef>,
    dict: Rc<Dict>,
    media_box: Rect,
    crop_box: Rect,
    rotation: u32,
    resources: Dict,
}

impl Page {
    fn new(doc: &Document, id: Option<ObjRef>, dict: Rc<Dict>, parent: &Inherited) -> Self {
        let mut attrs = parent.clone();
        attrs.update(doc, &dict);

        let media_box = attrs.media_box.unwrap_or_else(|| {
            warn!("page has no media box, assuming US Letter");
            LETTER
        });

        let crop_box = attrs
            .crop_box
            .map(|c| c.intersect(media_box))
            .filter(|c| c.area() > 0.0)
            .unwrap_or(media_box);

        let rotation = match attrs.rotate.unwrap_or(0).rem_euclid(360) {
            r @ (0 | 90 | 180 | 270) => r as u32,
            r => {
                warn!("ignoring page rotation of {r} degrees");
                0
            }
        };

        Self {
            id,
            dict,
            media_box,
            crop_box,
            rotation,
            resources: attrs.resources.unwrap_or_default(),
        }
    }

    /// The identifier of the page object, if it is an indirect object.
    pub fn id(&self) -> Option<ObjRef> {
        self.id
    }

    /// The raw page dictionary.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    /// The media box of the page.
    pub fn media_box(&self) -> Rect {
        self.media_box
    }

    /// The crop box of the page, clipped to the media box.
    pub fn crop_box(&self) -> Rect {
        self.crop_box
    }

    /// The clockwise rotation of the page in degrees: 0, 90, 180 or 270.
    pub fn rotation(&self) -> u32 {
        self.rotation
    }

    /// The (possibly inherited) resource dictionary of the page.
    pub fn resources(&self) -> &Dict {
        &self.resources
    }

    /// The size of default user space units in multiples of 1/72 inch.
    pub fn user_unit(&self) -> f32 {
        self.dict
            .get_f32(USER_UNIT)
            .filter(|u| *u > 0.0)
            .unwrap_or(1.0)
    }

    /// The width and height of the page, with the rotation applied.
    pub fn dimensions(&self) -> (f64, f64) {
        let (w, h) = (self.crop_box.width(), self.crop_box.height());

        if self.rotation % 180 == 90 { (h, w) } else { (w, h) }
    }

    /// The transparency group attributes of the page.
    pub fn group(&self, doc: &Document) -> Option<Dict> {
        doc.get_dict(&self.dict, GROUP)
    }

    /// The annotation dictionaries of the page.
    pub fn annotations(&self, doc: &Document) -> Vec<Dict> {
        match doc.get(&self.dict, ANNOTS) {
            Object::Array(items) => items
                .iter()
                .filter_map(|a| doc.resolve(a).as_dict().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The content streams of the page.
    pub fn content_streams(&self, doc: &Document) -> Vec<Rc<Stream>> {
        match doc.get(&self.dict, CONTENTS) {
            Object::Stream(stream) => vec![stream],
            Object::Array(items) => items
                .iter()
                .filter_map(|item| match doc.resolve(item) {
                    Object::Stream(stream) => Some(stream),
                    other => {
                        warn!("skipping content entry of type {}", other.type_name());
                        None
                    }
                })
                .collect(),
            Object::Null => Vec::new(),
            other => {
                warn!("page contents are a {}", other.type_name());
                Vec::new()
            }
        }
    }

    /// The decoded content of the page, with multiple content streams joined
    /// by a space.
    pub fn content_data(&self, doc: &Document) -> Vec<u8> {
        let mut data = Vec::new();

        for stream in self.content_streams(doc) {
            match doc.stream_data(&stream) {
                Ok(decoded) => {
                    data.extend_from_slice(&decoded);
                    // Streams must have at least one whitespace in-between.
                    data.push(b' ');
                }
                Err(e) => warn!("failed to decode content stream: {e}"),
            }
        }

        data
    }
}

fn read_rect(doc: &Document, dict: &Dict, key: &[u8]) -> Option<Rect> {
    let object = doc.get(dict, key);
    let items = object.as_array()?;

    let [x0, y0, x1, y1] = match items {
        [a, b, c, d] => [a, b, c, d].map(|o| doc.resolve(o).as_f64()),
        _ => {
            warn!("invalid rectangle with {} entries", items.len());
            return None;
        }
    };

    Some(Rect::new(x0?, y0?, x1?, y1?).abs())
}

pub(crate) fn collect_pages(doc: &Document) -> Vec<Page> {
    let mut pages = Vec::new();

    if let Ok(catalog) = doc.catalog() {
        let root = catalog.get(PAGES).cloned().unwrap_or_default();
        let mut visited = FxHashSet::default();

        walk(doc, &root, &Inherited::default(), 0, &mut visited, &mut pages);
    }

    if pages.is_empty() {
        warn!("page tree is empty or broken, searching all objects for pages");
        pages = scan_for_pages(doc);
    }

    pages
}

fn walk(
    doc: &Document,
    node: &Object,
    parent: &Inherited,
    depth: usize,
    visited: &mut FxHashSet<ObjRef>,
    pages: &mut Vec<Page>,
) {
    if depth > MAX_DEPTH {
        warn!("page tree is too deep");
        return;
    }

    let id = node.as_ref();

    if let Some(id) = id
        && !visited.insert(id)
    {
        warn!("page tree contains a cycle at {id}");
        return;
    }

    let Object::Dict(dict) = doc.resolve(node) else {
        warn!("skipping page tree node that is not a dictionary");
        return;
    };

    let is_node = dict.get_name(TYPE).is_some_and(|t| &**t == PAGES)
        || (dict.contains_key(KIDS) && !dict.get_name(TYPE).is_some_and(|t| &**t == PAGE));

    if !is_node {
        // Be lenient and treat anything else as a page.
        pages.push(Page::new(doc, id, dict, parent));
        return;
    }

    let mut attrs = parent.clone();
    attrs.update(doc, &dict);

    if let Object::Array(kids) = doc.get(&dict, KIDS) {
        for kid in kids.iter() {
            walk(doc, kid, &attrs, depth + 1, visited, pages);
        }
    }
}

fn scan_for_pages(doc: &Document) -> Vec<Page> {
    let mut pages = Vec::new();

    for id in doc.object_ids() {
        if let Ok(Object::Dict(dict)) = doc.load_object(id)
            && dict.get_name(TYPE).is_some_and(|t| &**t == PAGE)
            && dict.contains_key(CONTENTS)
        {
            pages.push(Page::new(doc, Some(id), dict, &Inherited::default()));
        }
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(objects: &[&str]) -> Document {
        let mut out = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();

        for (i, obj) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{obj}\nendobj\n", i + 1).as_bytes());
        }

        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());

        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }

        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );

        Document::open(out).unwrap()
    }

    #[test]
    fn inherited_attributes() {
        let doc = doc(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /MediaBox [0 0 300 400] /Rotate 90 /Resources << /Font << >> >> >>",
            "<< /Type /Page /Parent 2 0 R >>",
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 50] /CropBox [-10 -10 80 40] /Rotate -90 >>",
        ]);

        let pages = doc.pages();
        assert_eq!(pages.len(), 2);

        assert_eq!(pages[0].media_box(), Rect::new(0.0, 0.0, 300.0, 400.0));
        assert_eq!(pages[0].rotation(), 90);
        assert_eq!(pages[0].dimensions(), (400.0, 300.0));
        assert!(pages[0].resources().contains_key(b"Font"));
        assert_eq!(pages[0].id(), Some(ObjRef::new(3, 0)));

        assert_eq!(pages[1].crop_box(), Rect::new(0.0, 0.0, 80.0, 40.0));
        assert_eq!(pages[1].rotation(), 270);
    }

    #[test]
    fn missing_media_box_defaults_to_letter() {
        let doc = doc(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] >>",
            "<< /Type /Page >>",
        ]);

        assert_eq!(doc.pages()[0].media_box(), LETTER);
    }

    #[test]
    fn cyclic_page_tree() {
        let doc = doc(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 2 0 R] >>",
            "<< /Type /Page /Contents 4 0 R >>",
            "<< /Length 5 >>\nstream\n0 0 m\nendstream",
        ]);

        let pages = doc.pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].content_data(&doc), b"0 0 m ");
    }

    #[test]
    fn broken_tree_falls_back_to_scanning() {
        let doc = doc(&[
            "<< /Type /Catalog /Pages 5 0 R >>",
            "<< /Type /Page /Contents 3 0 R >>",
            "<< /Length 2 >>\nstream\nBT\nendstream",
        ]);

        assert_eq!(doc.pages().len(), 1);
    }

    #[test]
    fn contents_arrays_are_joined() {
        let doc = doc(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] >>",
            "<< /Type /Page /Contents [4 0 R 5 0 R] >>",
            "<< /Length 1 >>\nstream\nq\nendstream",
            "<< /Length 1 >>\nstream\nQ\nendstream",
        ]);

        assert_eq!(doc.pages()[0].content_data(&doc), b"q Q ");
    }
}
