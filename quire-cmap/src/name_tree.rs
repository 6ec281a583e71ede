//! Name and number trees.
//!
//! Both kinds of trees are made of intermediate nodes with `/Kids` whose
//! `/Limits` give the smallest and largest key below them, and leaves with a
//! sorted array of key/value pairs (`/Names` or `/Nums`). A lookup binary
//! searches the kids by their limits, and then the pairs of a leaf.
//!
//! ```no_run
//! use quire_cmap::name_tree::NameTree;
//! # fn dest(doc: &quire_syntax::Document) {
//! if let Some(dests) = NameTree::from_catalog(doc, b"Dests") {
//!     let target = dests.get(&b"chapter1".to_vec());
//! }
//! # }
//! ```

use log::warn;
use quire_syntax::object::keys::{KIDS, LIMITS, NAMES, NUMS};
use quire_syntax::{Dict, Document, ObjRef, Object};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::rc::Rc;

/// Let's limit the depth of trees to 32 levels.
const MAX_DEPTH: u32 = 32;

/// The key of a tree.
pub trait TreeKey: Ord + Sized {
    /// The entry of leaf nodes holding the key/value pairs.
    const ENTRIES: &'static [u8];

    /// Read a key.
    fn from_object(object: &Object) -> Option<Self>;
}

impl TreeKey for Vec<u8> {
    const ENTRIES: &'static [u8] = NAMES;

    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::String(s) => Some(s.to_vec()),
            // Not allowed, but found in the wild.
            Object::Name(n) => Some(n.to_vec()),
            _ => None,
        }
    }
}

impl TreeKey for i64 {
    const ENTRIES: &'static [u8] = NUMS;

    fn from_object(object: &Object) -> Option<Self> {
        object.as_int()
    }
}

/// A tree mapping strings to objects.
pub type NameTree<'a> = Tree<'a, Vec<u8>>;

/// A tree mapping integers to objects.
pub type NumberTree<'a> = Tree<'a, i64>;

/// A name or number tree.
pub struct Tree<'a, K> {
    doc: &'a Document,
    root: Option<Rc<Dict>>,
    root_id: Option<ObjRef>,
    _key: PhantomData<K>,
}

impl<'a> NameTree<'a> {
    /// The name tree of the given category (e.g. `Dests` or
    /// `EmbeddedFiles`) in the `/Names` dictionary of the catalog.
    pub fn from_catalog(doc: &'a Document, category: &[u8]) -> Option<Self> {
        let catalog = doc.catalog().ok()?;
        let names = doc.get_dict(&catalog, NAMES)?;
        let root = names.get(category)?;

        Some(Self::new(doc, root))
    }
}

impl<'a, K: TreeKey> Tree<'a, K> {
    /// Create a tree from its root node. Anything other than a dictionary
    /// gives an empty tree.
    pub fn new(doc: &'a Document, root: &Object) -> Self {
        let node = doc.resolve(root);

        Self {
            doc,
            root: node.as_dict().cloned().map(Rc::new),
            root_id: root.as_ref(),
            _key: PhantomData,
        }
    }

    /// Look up the value of a key.
    pub fn get(&self, key: &K) -> Option<Object> {
        let root = self.root.as_ref()?;
        let mut visited = FxHashSet::default();
        visited.extend(self.root_id);

        self.find(root, key, 0, &mut visited)
    }

    /// Iterate over all entries, in the order they are stored.
    pub fn iter(&self) -> Entries<'a, K> {
        let mut entries = Entries {
            doc: self.doc,
            stack: Vec::new(),
            visited: FxHashSet::default(),
            _key: PhantomData,
        };

        if let Some(root) = &self.root {
            entries.visited.extend(self.root_id);
            entries.push_node(root, 0);
        }

        entries
    }

    fn find(
        &self,
        node: &Dict,
        key: &K,
        depth: u32,
        visited: &mut FxHashSet<ObjRef>,
    ) -> Option<Object> {
        if depth > MAX_DEPTH {
            warn!("name tree is nested too deeply");
            return None;
        }

        if let Object::Array(pairs) = self.doc.get(node, K::ENTRIES) {
            return self.find_in_leaf(&pairs, key);
        }

        let kids = self.doc.get(node, KIDS);
        let kids = kids.as_array()?;

        let (mut lo, mut hi) = (0, kids.len());

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let kid = self.doc.resolve(&kids[mid]);

            let Some(limits) = kid.as_dict().and_then(|k| self.limits(k)) else {
                break;
            };

            match limits {
                (min, _) if *key < min => hi = mid,
                (_, max) if *key > max => lo = mid + 1,
                _ => return self.descend(&kids[mid], key, depth, visited),
            }
        }

        if lo >= hi {
            return None;
        }

        // Kids without limits are searched one by one.
        kids.iter()
            .find_map(|kid| self.descend(kid, key, depth, visited))
    }

    fn descend(
        &self,
        kid: &Object,
        key: &K,
        depth: u32,
        visited: &mut FxHashSet<ObjRef>,
    ) -> Option<Object> {
        if let Some(id) = kid.as_ref()
            && !visited.insert(id)
        {
            warn!("cycle in name tree at {id}");
            return None;
        }

        let kid = self.doc.resolve(kid);
        self.find(kid.as_dict()?, key, depth + 1, visited)
    }

    fn limits(&self, node: &Dict) -> Option<(K, K)> {
        let limits = self.doc.get(node, LIMITS);
        let [min, max] = limits.as_array()? else {
            return None;
        };

        Some((
            K::from_object(&self.doc.resolve(min))?,
            K::from_object(&self.doc.resolve(max))?,
        ))
    }

    fn find_in_leaf(&self, pairs: &[Object], key: &K) -> Option<Object> {
        let key_at = |i: usize| K::from_object(&self.doc.resolve(&pairs[2 * i]));
        let value_at = |i: usize| pairs.get(2 * i + 1).map(|v| self.doc.resolve(v));

        let (mut lo, mut hi) = (0, pairs.len() / 2);

        while lo < hi {
            let mid = lo + (hi - lo) / 2;

            match key_at(mid).map(|k| k.cmp(key)) {
                Some(Ordering::Less) => lo = mid + 1,
                Some(Ordering::Greater) => hi = mid,
                Some(Ordering::Equal) => return value_at(mid),
                None => break,
            }
        }

        // Keys are not always sorted.
        let found = (0..pairs.len() / 2).find(|i| key_at(*i).as_ref() == Some(key))?;
        warn!("found key in unsorted name tree leaf");

        value_at(found)
    }
}

/// An iterator over the entries of a tree.
pub struct Entries<'a, K> {
    doc: &'a Document,
    stack: Vec<Frame>,
    visited: FxHashSet<ObjRef>,
    _key: PhantomData<K>,
}

struct Frame {
    items: Rc<Vec<Object>>,
    pos: usize,
    depth: u32,
    leaf: bool,
}

impl<K: TreeKey> Entries<'_, K> {
    fn push_node(&mut self, node: &Dict, depth: u32) {
        if depth > MAX_DEPTH {
            warn!("name tree is nested too deeply");
            return;
        }

        let (items, leaf) = match self.doc.get(node, K::ENTRIES) {
            Object::Array(items) => (items, true),
            _ => match self.doc.get(node, KIDS) {
                Object::Array(items) => (items, false),
                _ => return,
            },
        };

        self.stack.push(Frame {
            items,
            pos: 0,
            depth,
            leaf,
        });
    }
}

impl<K: TreeKey> Iterator for Entries<'_, K> {
    type Item = (K, Object);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;

            if frame.leaf {
                let Some([key, value]) = frame.items.get(frame.pos..frame.pos + 2) else {
                    self.stack.pop();
                    continue;
                };

                frame.pos += 2;

                match K::from_object(&self.doc.resolve(key)) {
                    Some(key) => return Some((key, self.doc.resolve(value))),
                    None => warn!("invalid key in name tree"),
                }
            } else {
                let Some(kid) = frame.items.get(frame.pos).cloned() else {
                    self.stack.pop();
                    continue;
                };

                frame.pos += 1;
                let depth = frame.depth + 1;

                if let Some(id) = kid.as_ref()
                    && !self.visited.insert(id)
                {
                    warn!("cycle in name tree at {id}");
                    continue;
                }

                if let Some(node) = self.doc.resolve(&kid).as_dict() {
                    self.push_node(node, depth);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(objects: &[&str]) -> Document {
        let mut data = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();

        for (i, object) in objects.iter().enumerate() {
            offsets.push(data.len());
            data.extend_from_slice(format!("{} 0 obj\n{object}\nendobj\n", i + 1).as_bytes());
        }

        let xref = data.len();
        let size = objects.len() + 1;
        data.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());

        for offset in offsets {
            data.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }

        data.extend_from_slice(
            format!("trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n")
                .as_bytes(),
        );

        Document::open(data).unwrap()
    }

    fn tree_doc() -> Document {
        document(&[
            "<< /Type /Catalog /Names << /Dests 2 0 R >> >>",
            "<< /Kids [3 0 R 4 0 R] >>",
            "<< /Limits [(apple) (cherry)] /Names [(apple) 1 (banana) 2 (cherry) 3] >>",
            "<< /Limits [(date) (fig)] /Kids [5 0 R] >>",
            "<< /Limits [(date) (fig)] /Names [(date) 4 (elder) 6 0 R (fig) 5] >>",
            "(elderberry)",
        ])
    }

    #[test]
    fn lookup() {
        let doc = tree_doc();
        let tree = NameTree::from_catalog(&doc, b"Dests").unwrap();

        assert_eq!(tree.get(&b"apple".to_vec()), Some(Object::Int(1)));
        assert_eq!(tree.get(&b"cherry".to_vec()), Some(Object::Int(3)));
        assert_eq!(tree.get(&b"fig".to_vec()), Some(Object::Int(5)));
        assert_eq!(
            tree.get(&b"elder".to_vec()),
            Some(Object::string(b"elderberry"))
        );
        assert_eq!(tree.get(&b"coconut".to_vec()), None);
        assert_eq!(tree.get(&b"zucchini".to_vec()), None);
    }

    #[test]
    fn iteration() {
        let doc = tree_doc();
        let tree = NameTree::from_catalog(&doc, b"Dests").unwrap();

        let keys: Vec<_> = tree
            .iter()
            .map(|(k, _)| String::from_utf8(k).unwrap())
            .collect();

        assert_eq!(keys, ["apple", "banana", "cherry", "date", "elder", "fig"]);
    }

    #[test]
    fn number_tree() {
        let doc = document(&[
            "<< /Type /Catalog /PageLabels 2 0 R >>",
            "<< /Nums [0 (i) 4 (1) 10 (A)] >>",
        ]);
        let tree = NumberTree::new(&doc, &Object::Ref(ObjRef::new(2, 0)));

        assert_eq!(tree.get(&4), Some(Object::string(b"1")));
        assert_eq!(tree.get(&5), None);
        assert_eq!(tree.iter().map(|(k, _)| k).collect::<Vec<_>>(), [0, 4, 10]);
    }

    #[test]
    fn unsorted_and_missing_limits() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            "<< /Kids [3 0 R 4 0 R] >>",
            "<< /Names [(b) 1 (a) 2] >>",
            "<< /Names [(d) 3 (c) 4] >>",
        ]);
        let tree = NameTree::new(&doc, &Object::Ref(ObjRef::new(2, 0)));

        assert_eq!(tree.get(&b"a".to_vec()), Some(Object::Int(2)));
        assert_eq!(tree.get(&b"c".to_vec()), Some(Object::Int(4)));
        assert_eq!(tree.get(&b"e".to_vec()), None);
    }

    #[test]
    fn cycles_terminate() {
        let doc = document(&[
            "<< /Type /Catalog >>",
            "<< /Kids [3 0 R] >>",
            "<< /Kids [2 0 R 4 0 R] >>",
            "<< /Names [(x) 1] >>",
        ]);
        let tree = NameTree::new(&doc, &Object::Ref(ObjRef::new(2, 0)));

        assert_eq!(tree.get(&b"x".to_vec()), Some(Object::Int(1)));
        assert_eq!(tree.get(&b"y".to_vec()), None);
        assert_eq!(tree.iter().count(), 1);
    }

    #[test]
    fn not_a_tree() {
        let doc = document(&["<< /Type /Catalog >>"]);
        let tree = NameTree::new(&doc, &Object::Int(3));

        assert_eq!(tree.get(&b"x".to_vec()), None);
        assert_eq!(tree.iter().count(), 0);
        assert!(NameTree::from_catalog(&doc, b"Dests").is_none());
    }
}
