//! A cache for resources derived from document objects.
//!
//! Every entry is keyed by the object it was loaded from together with a
//! [`ResourceKind`], so that the same object can back several kinds of
//! resources (for example a stream used both as an image and as a soft mask).
//! Entries keyed by an indirect reference live in a hash map; entries keyed by
//! a direct object live in a short list that is searched linearly.
//!
//! Entries age: [`Store::get`] resets the age of an entry to zero and
//! [`Store::age_sweep`] increments all ages, evicting entries that got too old.
//! Values are handed out as `Rc` handles, so evicting an entry never
//! invalidates a handle that is still in use elsewhere.

use crate::object::{ObjRef, Object};
use log::trace;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// The kind of a cached resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The parsed members of an object stream.
    ObjectStream,
    /// A function.
    Function,
    /// A font.
    Font,
    /// A color space.
    ColorSpace,
    /// A pattern.
    Pattern,
    /// A shading.
    Shading,
    /// A decoded image.
    Image,
    /// A CMap.
    CMap,
    /// An extended graphics state.
    ExtGState,
    /// An optional content group or membership dictionary.
    OptionalContent,
}

/// A callback that runs when an entry is evicted, removed or flushed.
pub type DropFn = Box<dyn FnOnce(Rc<dyn Any>)>;

struct Entry {
    value: Rc<dyn Any>,
    age: u32,
    drop_fn: Option<DropFn>,
}

impl Entry {
    fn release(mut self) {
        if let Some(drop_fn) = self.drop_fn.take() {
            drop_fn(self.value);
        }
    }
}

/// An object store.
#[derive(Default)]
pub struct Store {
    by_ref: FxHashMap<(ObjRef, ResourceKind), Entry>,
    by_object: Vec<(Object, ResourceKind, Entry)>,
}

impl Store {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing (and releasing) any previous value for the
    /// same key and kind.
    pub fn put(
        &mut self,
        key: &Object,
        kind: ResourceKind,
        value: Rc<dyn Any>,
        drop_fn: Option<DropFn>,
    ) {
        let entry = Entry {
            value,
            age: 0,
            drop_fn,
        };

        let old = match key {
            Object::Ref(r) => self.by_ref.insert((*r, kind), entry),
            _ => {
                if let Some(slot) = self
                    .by_object
                    .iter_mut()
                    .find(|(k, kd, _)| *kd == kind && k == key)
                {
                    Some(std::mem::replace(&mut slot.2, entry))
                } else {
                    self.by_object.push((key.clone(), kind, entry));
                    None
                }
            }
        };

        if let Some(old) = old {
            old.release();
        }
    }

    /// Look up a value, resetting its age.
    pub fn get(&mut self, key: &Object, kind: ResourceKind) -> Option<Rc<dyn Any>> {
        let entry = match key {
            Object::Ref(r) => self.by_ref.get_mut(&(*r, kind))?,
            _ => {
                &mut self
                    .by_object
                    .iter_mut()
                    .find(|(k, kd, _)| *kd == kind && k == key)?
                    .2
            }
        };

        entry.age = 0;

        Some(entry.value.clone())
    }

    /// Look up a value of a concrete type.
    pub fn get_typed<T: 'static>(&mut self, key: &Object, kind: ResourceKind) -> Option<Rc<T>> {
        self.get(key, kind)?.downcast::<T>().ok()
    }

    /// Remove a value, running its drop callback. Returns whether an entry existed.
    pub fn remove(&mut self, key: &Object, kind: ResourceKind) -> bool {
        let entry = match key {
            Object::Ref(r) => self.by_ref.remove(&(*r, kind)),
            _ => self
                .by_object
                .iter()
                .position(|(k, kd, _)| *kd == kind && k == key)
                .map(|pos| self.by_object.remove(pos).2),
        };

        match entry {
            Some(entry) => {
                entry.release();
                true
            }
            None => false,
        }
    }

    /// Increment the age of every entry and evict the ones whose age exceeds
    /// `max_age`. Returns the number of evicted entries.
    pub fn age_sweep(&mut self, max_age: u32) -> usize {
        let mut evicted = Vec::new();

        let stale: Vec<_> = self
            .by_ref
            .iter_mut()
            .filter_map(|(k, e)| {
                e.age = e.age.saturating_add(1);
                (e.age > max_age).then_some(*k)
            })
            .collect();

        for key in stale {
            if let Some(entry) = self.by_ref.remove(&key) {
                evicted.push(entry);
            }
        }

        let mut i = 0;

        while i < self.by_object.len() {
            let entry = &mut self.by_object[i].2;
            entry.age = entry.age.saturating_add(1);

            if entry.age > max_age {
                evicted.push(self.by_object.remove(i).2);
            } else {
                i += 1;
            }
        }

        let count = evicted.len();
        trace!("store sweep evicted {count} entries");

        for entry in evicted {
            entry.release();
        }

        count
    }

    /// Remove all entries, running their drop callbacks.
    pub fn flush(&mut self) {
        for (_, entry) in self.by_ref.drain() {
            entry.release();
        }

        for (_, _, entry) in self.by_object.drain(..) {
            entry.release();
        }
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.by_ref.len() + self.by_object.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.flush();
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("by_ref", &self.by_ref.len())
            .field("by_object", &self.by_object.len())
            .finish()
    }
}
