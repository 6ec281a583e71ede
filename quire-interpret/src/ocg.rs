use crate::Intent;
use log::warn;
use quire_syntax::object::keys::*;
use quire_syntax::{Dict, Document, ObjRef, Object};
use rustc_hash::FxHashSet;

// Visibility expressions can nest.
const MAX_DEPTH: u32 = 16;

/// Tracks which optional content groups are off and which marked-content
/// sections are hidden.
pub(crate) struct OcgState {
    off: FxHashSet<ObjRef>,
    intent: Intent,
    visibility_stack: Vec<bool>,
}

impl OcgState {
    fn dummy(intent: Intent) -> Self {
        Self {
            off: FxHashSet::default(),
            intent,
            visibility_stack: vec![],
        }
    }

    /// Read the default configuration of the optional content of a document.
    pub(crate) fn from_document(doc: &Document, intent: Intent) -> Self {
        let Some(properties) = doc
            .catalog()
            .ok()
            .and_then(|catalog| doc.get_dict(&catalog, OCPROPERTIES))
        else {
            return Self::dummy(intent);
        };

        let Some(config) = doc.get_dict(&properties, D) else {
            return Self::dummy(intent);
        };

        let refs = |dict: &Dict, key: &[u8]| {
            doc.get(dict, key)
                .as_array()
                .map(|a| a.iter().filter_map(Object::as_ref).collect::<Vec<_>>())
                .unwrap_or_default()
        };

        let mut off = FxHashSet::default();

        if doc.get(&config, BASE_STATE).is_name(OFF) {
            off.extend(refs(&properties, OCGS));
        }

        for id in refs(&config, ON) {
            off.remove(&id);
        }

        off.extend(refs(&config, OFF));

        Self {
            off,
            intent,
            visibility_stack: vec![],
        }
    }

    /// Whether content at the current position is visible.
    pub(crate) fn is_visible(&self) -> bool {
        self.visibility_stack.last().copied().unwrap_or(true)
    }

    /// Whether an optional content group or membership dictionary hides the
    /// content it is attached to.
    pub(crate) fn is_hidden(&self, doc: &Document, object: &Object) -> bool {
        !self.evaluate(doc, object, 0)
    }

    fn evaluate(&self, doc: &Document, object: &Object, depth: u32) -> bool {
        let resolved = doc.resolve(object);
        let Some(dict) = resolved.as_dict() else {
            warn!("optional content is a {}, ignoring it", resolved.type_name());

            return true;
        };

        if doc.get(dict, TYPE).is_name(OCMD) {
            self.membership(doc, dict, depth)
        } else {
            self.group_visible(doc, object.as_ref(), dict)
        }
    }

    fn group_visible(&self, doc: &Document, id: Option<ObjRef>, group: &Dict) -> bool {
        if id.is_some_and(|id| self.off.contains(&id)) {
            return false;
        }

        let (category, state) = match self.intent {
            Intent::View => (VIEW, VIEW_STATE),
            Intent::Print => (PRINT, PRINT_STATE),
        };

        let usage = doc
            .get_dict(group, USAGE)
            .and_then(|usage| doc.get_dict(&usage, category));

        !usage.is_some_and(|u| doc.get(&u, state).is_name(OFF))
    }

    fn membership(&self, doc: &Document, dict: &Dict, depth: u32) -> bool {
        if let Some(expression) = dict.get(VE) {
            return self.expression(doc, expression, depth);
        }

        let groups = match doc.get(dict, OCGS) {
            Object::Array(items) => items.to_vec(),
            Object::Null => vec![],
            _ => vec![dict.get(OCGS).cloned().unwrap_or_default()],
        };

        if groups.is_empty() {
            return true;
        }

        let mut states = groups.iter().filter_map(|g| {
            let resolved = doc.resolve(g);

            resolved
                .as_dict()
                .map(|d| self.group_visible(doc, g.as_ref(), d))
        });

        match doc.get(dict, P).as_name().map(|p| &p[..]) {
            Some(ALL_ON) => states.all(|on| on),
            Some(ANY_OFF) => states.any(|on| !on),
            Some(ALL_OFF) => states.all(|on| !on),
            _ => states.any(|on| on),
        }
    }

    /// Evaluate a visibility expression like `[/And 1 0 R [/Not 2 0 R]]`.
    fn expression(&self, doc: &Document, object: &Object, depth: u32) -> bool {
        if depth >= MAX_DEPTH {
            warn!("visibility expression nested too deeply");

            return true;
        }

        let resolved = doc.resolve(object);
        let Some(items) = resolved.as_array() else {
            return self.evaluate(doc, object, depth + 1);
        };

        let Some((operator, operands)) = items.split_first() else {
            return true;
        };

        let mut values = operands
            .iter()
            .map(|o| self.expression(doc, o, depth + 1));

        match operator.as_name().map(|n| &n[..]) {
            Some(AND) => values.all(|v| v),
            Some(OR) => values.any(|v| v),
            Some(NOT) => !values.next().unwrap_or(false),
            _ => {
                warn!("invalid visibility expression operator {operator:?}");

                true
            }
        }
    }

    /// Start a marked-content section that doesn't change visibility.
    pub(crate) fn begin_marked_content(&mut self) {
        let visible = self.is_visible();
        self.visibility_stack.push(visible);
    }

    /// Start a marked-content section for optional content. Content nested in
    /// hidden content stays hidden.
    pub(crate) fn begin_optional_content(&mut self, visible: bool) {
        let visible = self.is_visible() && visible;
        self.visibility_stack.push(visible);
    }

    pub(crate) fn end_marked_content(&mut self) {
        if self.visibility_stack.pop().is_none() {
            warn!("unbalanced EMC");
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.visibility_stack.len()
    }

    /// Close the marked-content sections a content stream left open.
    pub(crate) fn truncate(&mut self, depth: usize) {
        self.visibility_stack.truncate(depth);
    }
}
