//! Synthesized documents and a device that records what it is asked to do.

#![allow(dead_code)]

use kurbo::{Affine, BezPath, Rect, Shape};
use quire_interpret::color::Color;
use quire_interpret::shading::Shading;
use quire_interpret::x_object::Image;
use quire_interpret::{
    Clip, Context, Device, Group, InterpreterSettings, InterpreterWarning, MaskType, PathStyle,
    SoftMask, TextRun, interpret_page, page_transform,
};
use quire_syntax::{Document, Result};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Builds a single page document. Objects 1 to 3 are the catalog, the page
/// tree and the page, object 4 is the content stream. Further objects start
/// at 5.
pub struct PageBuilder {
    resources: String,
    page_extra: String,
    catalog_extra: String,
    objects: Vec<(u32, Vec<u8>)>,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self {
            resources: String::new(),
            page_extra: String::new(),
            catalog_extra: String::new(),
            objects: Vec::new(),
        }
    }

    /// Set the body of the page's resource dictionary.
    pub fn resources(mut self, resources: &str) -> Self {
        self.resources = resources.to_string();
        self
    }

    /// Add entries to the page dictionary.
    pub fn page_entries(mut self, entries: &str) -> Self {
        self.page_extra = entries.to_string();
        self
    }

    /// Add entries to the catalog.
    pub fn catalog_entries(mut self, entries: &str) -> Self {
        self.catalog_extra = entries.to_string();
        self
    }

    pub fn object(mut self, num: u32, body: &str) -> Self {
        self.objects.push((num, body.as_bytes().to_vec()));
        self
    }

    pub fn stream(mut self, num: u32, dict_entries: &str, data: &[u8]) -> Self {
        let mut body = format!("<< {dict_entries} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.objects.push((num, body));
        self
    }

    pub fn build(self, content: &str) -> Document {
        let mut data = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();

        let mut objects = vec![
            (1, format!("<< /Type /Catalog /Pages 2 0 R {} >>", self.catalog_extra).into_bytes()),
            (2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec()),
            (
                3,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 200] /Contents 4 0 R \
                     /Resources << {} >> {} >>",
                    self.resources, self.page_extra
                )
                .into_bytes(),
            ),
            (
                4,
                format!(
                    "<< /Length {} >>\nstream\n{content}\nendstream",
                    content.len()
                )
                .into_bytes(),
            ),
        ];
        objects.extend(self.objects);

        for (num, body) in &objects {
            offsets.push((*num, data.len()));
            write!(data, "{num} 0 obj\n").unwrap();
            data.extend_from_slice(body);
            data.extend_from_slice(b"\nendobj\n");
        }

        let size = offsets.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1;
        let xref = data.len();
        write!(data, "xref\n0 {size}\n").unwrap();

        for num in 0..size {
            match offsets.iter().find(|(n, _)| *n == num) {
                Some((_, offset)) => write!(data, "{offset:010} 00000 n \n").unwrap(),
                None if num == 0 => data.extend_from_slice(b"0000000000 65535 f \n"),
                None => data.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }

        write!(
            data,
            "trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n"
        )
        .unwrap();

        Document::open(data).unwrap()
    }
}

/// A simple font resource, as used by most text tests.
pub const HELVETICA: &str = "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>";

/// One call made to a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Path {
        fill: Option<[u8; 4]>,
        stroke: Option<[u8; 4]>,
        bounds: Rect,
    },
    Shading {
        bounds: Option<Rect>,
    },
    Text {
        text: String,
        font_size: f32,
        fill: Option<[u8; 4]>,
    },
    Image {
        width: u32,
        height: u32,
        alpha: f32,
    },
    Stencil {
        color: [u8; 4],
    },
    PushClip,
    PopClip,
    PushGroup {
        opacity: f32,
        soft_mask: bool,
    },
    PopGroup,
    BeginSoftMask(MaskType),
    EndSoftMask,
}

fn round(rect: Rect) -> Rect {
    Rect::new(
        rect.x0.round(),
        rect.y0.round(),
        rect.x1.round(),
        rect.y1.round(),
    )
}

#[derive(Default)]
pub struct RecordingDevice {
    pub events: Vec<Event>,
}

impl RecordingDevice {
    pub fn paths(&self) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Path { .. }))
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether clips, groups and soft masks are properly nested.
    pub fn is_balanced(&self) -> bool {
        let mut stack = Vec::new();

        for event in &self.events {
            match event {
                Event::PushClip => stack.push('c'),
                Event::PushGroup { .. } => stack.push('g'),
                Event::BeginSoftMask(_) => stack.push('m'),
                Event::PopClip if stack.pop() != Some('c') => return false,
                Event::PopGroup if stack.pop() != Some('g') => return false,
                Event::EndSoftMask if stack.pop() != Some('m') => return false,
                _ => {}
            }
        }

        stack.is_empty()
    }
}

impl Device for RecordingDevice {
    fn paint_path(&mut self, path: &BezPath, transform: Affine, style: &PathStyle<'_>) {
        self.events.push(Event::Path {
            fill: style.fill.map(|(c, _)| c.to_rgba8()),
            stroke: style.stroke.map(|(c, _)| c.to_rgba8()),
            bounds: round((transform * path.clone()).bounding_box()),
        });
    }

    fn fill_shading(&mut self, shading: &Shading, transform: Affine, _: f32) {
        self.events.push(Event::Shading {
            bounds: shading
                .bbox
                .map(|b| round(transform.transform_rect_bbox(b))),
        });
    }

    fn draw_text(&mut self, run: &TextRun) {
        self.events.push(Event::Text {
            text: run.text(),
            font_size: run.font_size,
            fill: run.fill.as_ref().map(Color::to_rgba8),
        });
    }

    fn draw_image(&mut self, image: &Image, _: Affine, alpha: f32) {
        self.events.push(Event::Image {
            width: image.width(),
            height: image.height(),
            alpha,
        });
    }

    fn draw_stencil(&mut self, _: &Image, _: Affine, color: &Color) {
        self.events.push(Event::Stencil {
            color: color.to_rgba8(),
        });
    }

    fn push_clip(&mut self, _: &Clip) {
        self.events.push(Event::PushClip);
    }

    fn pop_clip(&mut self) {
        self.events.push(Event::PopClip);
    }

    fn push_group(&mut self, group: &Group) {
        self.events.push(Event::PushGroup {
            opacity: group.opacity,
            soft_mask: group.soft_mask,
        });
    }

    fn pop_group(&mut self) {
        self.events.push(Event::PopGroup);
    }

    fn begin_soft_mask(&mut self, mask: &SoftMask) {
        self.events.push(Event::BeginSoftMask(mask.mask_type));
    }

    fn end_soft_mask(&mut self) {
        self.events.push(Event::EndSoftMask);
    }
}

/// The outcome of interpreting the first page of a document.
pub struct Run {
    pub device: RecordingDevice,
    pub warnings: Vec<InterpreterWarning>,
    pub result: Result<()>,
}

pub fn run_with(doc: &Document, settings: InterpreterSettings) -> Run {
    let warnings = Rc::new(RefCell::new(Vec::new()));
    let sink = warnings.clone();
    let settings = InterpreterSettings {
        warning_sink: Rc::new(move |w| sink.borrow_mut().push(w)),
        ..settings
    };

    let page = &doc.pages()[0];
    let (transform, bbox) = page_transform(page, 1.0);
    let mut context = Context::new(doc, transform, bbox, settings);
    let mut device = RecordingDevice::default();
    let result = interpret_page(page, &mut context, &mut device);

    let warnings = warnings.borrow().clone();

    Run {
        device,
        warnings,
        result,
    }
}

pub fn run(doc: &Document) -> Run {
    run_with(doc, InterpreterSettings::default())
}
