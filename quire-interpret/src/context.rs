use crate::color::ColorSpace;
use crate::device::Device;
use crate::font::Font;
use crate::interpret::state::State;
use crate::interpret::text::PendingRun;
use crate::ocg::OcgState;
use crate::{Clip, FillRule, InterpreterSettings, InterpreterWarning, TextRun};
use kurbo::{Affine, BezPath, Point, Rect};
use log::warn;
use quire_syntax::object::keys::*;
use quire_syntax::{Dict, DocError, Document, ErrorKind, Object, Result};
use std::rc::Rc;

/// A resource dictionary, falling back to the resources of the enclosing
/// content stream for lookups.
#[derive(Clone, Debug)]
pub(crate) struct Resources {
    dict: Rc<Dict>,
    parent: Option<Rc<Resources>>,
}

impl Resources {
    pub(crate) fn new(dict: Dict) -> Self {
        Self {
            dict: Rc::new(dict),
            parent: None,
        }
    }

    /// The resources of a form, pattern or glyph procedure nested in `parent`.
    pub(crate) fn child(dict: Option<Dict>, parent: &Self) -> Self {
        match dict {
            Some(dict) => Self {
                dict: Rc::new(dict),
                parent: Some(Rc::new(parent.clone())),
            },
            None => parent.clone(),
        }
    }

    /// Look up `name` in the `category` subdictionary (`/Font`, `/XObject`,
    /// ...). The entry is returned as stored, so it may be a reference.
    pub(crate) fn get(&self, doc: &Document, category: &[u8], name: &[u8]) -> Option<Object> {
        doc.get_dict(&self.dict, category)
            .and_then(|d| d.get(name).cloned())
            .or_else(|| self.parent.as_ref().and_then(|p| p.get(doc, category, name)))
    }

    pub(crate) fn require(&self, doc: &Document, category: &[u8], name: &[u8]) -> Result<Object> {
        self.get(doc, category, name).ok_or_else(|| {
            DocError::new(
                ErrorKind::ResourceNotFound,
                format!(
                    "no {} resource named {}",
                    String::from_utf8_lossy(category),
                    String::from_utf8_lossy(name)
                ),
            )
        })
    }

    pub(crate) fn color_space(&self, doc: &Document, name: &[u8]) -> Result<ColorSpace> {
        // Device spaces are never looked up, only the other families can be
        // named resources.
        if let Some(cs) = ColorSpace::from_name(name) {
            return Ok(cs);
        }

        ColorSpace::new(doc, &self.require(doc, COLOR_SPACE, name)?)
    }
}

// Nesting of `q` beyond this is ignored.
pub(crate) const MAX_STATES: usize = 32;

/// The state of the interpreter across the content streams of a page.
pub struct Context<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) settings: InterpreterSettings,
    pub(crate) ocg: OcgState,
    // Forms, patterns, soft masks and glyph procedures currently being run.
    pub(crate) depth: u32,
    // Nesting of `BX`/`EX` sections.
    pub(crate) compat: u32,
    pub(crate) pending_text: Option<PendingRun>,
    pub(crate) text_clip: Vec<TextRun>,
    pub(crate) path: BezPath,
    pub(crate) sub_path_start: Point,
    pub(crate) last_point: Point,
    pub(crate) pending_clip: Option<FillRule>,
    states: Vec<State>,
    root_transforms: Vec<Affine>,
    bboxes: Vec<Rect>,
}

impl<'a> Context<'a> {
    /// Create a new context. `initial_transform` maps the user space of the
    /// page to device space, and `bbox` is the visible area in device space.
    pub fn new(
        doc: &'a Document,
        initial_transform: Affine,
        bbox: Rect,
        settings: InterpreterSettings,
    ) -> Self {
        let ocg = OcgState::from_document(doc, settings.intent);

        Self {
            doc,
            settings,
            ocg,
            depth: 0,
            compat: 0,
            pending_text: None,
            text_clip: vec![],
            path: BezPath::new(),
            sub_path_start: Point::ZERO,
            last_point: Point::ZERO,
            pending_clip: None,
            states: vec![State::new(initial_transform)],
            root_transforms: vec![initial_transform],
            bboxes: vec![bbox],
        }
    }

    pub(crate) fn get(&self) -> &State {
        self.states.last().expect("the state stack is never empty")
    }

    pub(crate) fn get_mut(&mut self) -> &mut State {
        self.states
            .last_mut()
            .expect("the state stack is never empty")
    }

    pub(crate) fn num_states(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn save_state(&mut self) {
        let cur = self.get().clone();
        self.states.push(cur);
    }

    /// Pop the current state, popping the device clips that were pushed
    /// while it was current.
    pub(crate) fn restore_state(&mut self, device: &mut impl Device) {
        if self.states.len() <= 1 {
            warn!("attempted to restore the base state");

            return;
        }

        let Some(old) = self.states.pop() else {
            return;
        };

        for _ in self.get().clip_depth..old.clip_depth {
            device.pop_clip();
        }
    }

    pub(crate) fn push_clip(&mut self, device: &mut impl Device, clip: Clip) {
        device.push_clip(&clip);
        self.get_mut().clip_depth += 1;
    }

    /// The transform patterns of the current content stream are relative to.
    pub(crate) fn root_transform(&self) -> Affine {
        self.root_transforms
            .last()
            .copied()
            .unwrap_or(Affine::IDENTITY)
    }

    pub(crate) fn push_root_transform(&mut self) {
        self.root_transforms.push(self.get().ctm);
    }

    pub(crate) fn pop_root_transform(&mut self) {
        self.root_transforms.pop();
    }

    /// The area that can still be painted, in device space.
    pub(crate) fn bbox(&self) -> Rect {
        self.bboxes.last().copied().unwrap_or(Rect::ZERO)
    }

    pub(crate) fn push_bbox(&mut self, bbox: Rect) {
        let new = self.bbox().intersect(bbox);
        self.bboxes.push(new);
    }

    pub(crate) fn pop_bbox(&mut self) {
        self.bboxes.pop();
    }

    pub(crate) fn warn(&self, warning: InterpreterWarning) {
        (self.settings.warning_sink)(warning);
    }

    pub(crate) fn load_font(&self, object: &Object) -> Result<Rc<Font>> {
        Font::load(self.doc, object, &*self.settings.cmap_resolver).inspect_err(|_| {
            self.warn(InterpreterWarning::UnsupportedFont);
        })
    }

    /// Run a nested content stream (form, pattern cell, glyph procedure or
    /// soft mask) with its own current path and text object.
    pub(crate) fn nested<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let path = std::mem::take(&mut self.path);
        let pending_clip = self.pending_clip.take();
        let pending_text = self.pending_text.take();
        let text_clip = std::mem::take(&mut self.text_clip);
        let (sub_path_start, last_point) = (self.sub_path_start, self.last_point);
        let marked_content = self.ocg.depth();

        self.depth += 1;
        let result = f(self);
        self.depth -= 1;

        self.ocg.truncate(marked_content);
        self.path = path;
        self.pending_clip = pending_clip;
        self.pending_text = pending_text;
        self.text_clip = text_clip;
        self.sub_path_start = sub_path_start;
        self.last_point = last_point;

        result
    }

    /// Whether nesting one more form, pattern or glyph procedure stays
    /// within the configured limit.
    pub(crate) fn can_nest(&self) -> bool {
        if self.depth >= self.settings.max_form_depth {
            warn!("maximum nesting depth of {} reached", self.settings.max_form_depth);

            false
        } else {
            true
        }
    }
}
