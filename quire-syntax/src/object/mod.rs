//! The PDF object model.
//!
//! Objects are owned values. Arrays, dictionaries, strings and streams are
//! stored behind `Rc` handles so that objects can be cloned cheaply when they
//! are handed out of the cross-reference cache.

use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

mod dict;
pub mod keys;

pub use dict::Dict;

/// An object identifier, i.e. an object number and a generation number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    /// The object number.
    pub num: u32,
    /// The generation number.
    pub generation: u16,
}

impl ObjRef {
    /// Create a new object identifier.
    pub const fn new(num: u32, generation: u16) -> Self {
        Self { num, generation }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.generation)
    }
}

/// A PDF name, stored without the leading solidus and with `#xx` escapes decoded.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Name(SmallVec<[u8; 16]>);

impl Name {
    /// Create a new name from unescaped bytes.
    pub fn new(data: &[u8]) -> Self {
        Self(SmallVec::from_slice(data))
    }

    /// Return a string representation of the name.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self).unwrap_or("{non-utf8 name}")
    }
}

impl Deref for Name {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Name {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<&[u8; N]> for Name {
    fn from(value: &[u8; N]) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}

/// Where the raw bytes of a stream live.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamData {
    /// The data starts at the given byte offset of the file.
    File(usize),
    /// The data is held in memory.
    Memory(Rc<[u8]>),
}

/// A stream: a dictionary together with the location of its raw data.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// The stream dictionary.
    pub dict: Dict,
    /// The location of the raw, still encoded data.
    pub data: StreamData,
    /// The indirect object the stream was loaded from. Stream data is
    /// encrypted with a key derived from it.
    pub id: Option<ObjRef>,
}

impl Stream {
    /// Create a new stream backed by in-memory data.
    pub fn from_memory(dict: Dict, data: impl Into<Rc<[u8]>>) -> Self {
        Self {
            dict,
            data: StreamData::Memory(data.into()),
            id: None,
        }
    }
}

/// A PDF object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Object {
    /// The null object.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A real number.
    Real(f64),
    /// A name.
    Name(Name),
    /// A string (literal or hex).
    String(Rc<[u8]>),
    /// An array.
    Array(Rc<Vec<Object>>),
    /// A dictionary.
    Dict(Rc<Dict>),
    /// An indirect reference.
    Ref(ObjRef),
    /// A stream.
    Stream(Rc<Stream>),
}

impl Object {
    /// Create a name object.
    pub fn name(name: &[u8]) -> Self {
        Self::Name(Name::new(name))
    }

    /// Create a string object.
    pub fn string(data: &[u8]) -> Self {
        Self::String(Rc::from(data))
    }

    /// Create an array object.
    pub fn array(items: Vec<Self>) -> Self {
        Self::Array(Rc::new(items))
    }

    /// Create a dictionary object.
    pub fn dict(dict: Dict) -> Self {
        Self::Dict(Rc::new(dict))
    }

    /// Create a stream object.
    pub fn stream(stream: Stream) -> Self {
        Self::Stream(Rc::new(stream))
    }

    /// A human-readable name of the object's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dictionary",
            Self::Ref(_) => "reference",
            Self::Stream(_) => "stream",
        }
    }

    /// Whether the object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Return the boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Return the value as an integer. Reals are truncated.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Real(r) if r.is_finite() => Some(*r as i64),
            _ => None,
        }
    }

    /// Return the value as a real number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Return the value as a single-precision real number.
    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|n| n as f32)
    }

    /// Return the name.
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Whether the object is the given name.
    pub fn is_name(&self, name: &[u8]) -> bool {
        self.as_name().is_some_and(|n| n.deref() == name)
    }

    /// Return the bytes of a string.
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Return the items of an array.
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Return the dictionary, or the dictionary of a stream.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            Self::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Return the stream.
    pub fn as_stream(&self) -> Option<&Rc<Stream>> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Return the indirect reference.
    pub fn as_ref(&self) -> Option<ObjRef> {
        match self {
            Self::Ref(r) => Some(*r),
            _ => None,
        }
    }

    /// Return an array of numbers, if every item is a number.
    pub fn as_f32_array(&self) -> Option<SmallVec<[f32; 8]>> {
        self.as_array()?.iter().map(Self::as_f32).collect()
    }

    /// Return an array of exactly `N` numbers.
    pub fn as_f32_n<const N: usize>(&self) -> Option<[f32; N]> {
        let arr = self.as_array()?;

        if arr.len() != N {
            return None;
        }

        let mut out = [0.0; N];

        for (o, item) in out.iter_mut().zip(arr) {
            *o = item.as_f32()?;
        }

        Some(out)
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<Name> for Object {
    fn from(value: Name) -> Self {
        Self::Name(value)
    }
}

impl From<ObjRef> for Object {
    fn from(value: ObjRef) -> Self {
        Self::Ref(value)
    }
}

impl From<Dict> for Object {
    fn from(value: Dict) -> Self {
        Self::dict(value)
    }
}

impl From<Vec<Self>> for Object {
    fn from(value: Vec<Self>) -> Self {
        Self::array(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_equality() {
        assert_eq!(Object::Ref(ObjRef::new(3, 0)), Object::Ref(ObjRef::new(3, 0)));
        assert_ne!(Object::Ref(ObjRef::new(3, 0)), Object::Ref(ObjRef::new(3, 1)));
    }

    #[test]
    fn structural_equality() {
        let mut a = Dict::new();
        a.insert(Name::new(b"A"), Object::array(vec![Object::Int(1), Object::Real(2.5)]));
        let mut b = Dict::new();
        b.insert(Name::new(b"A"), Object::array(vec![Object::Int(1), Object::Real(2.5)]));

        assert_eq!(Object::dict(a), Object::dict(b));
    }

    #[test]
    fn numeric_accessors() {
        assert_eq!(Object::Real(3.9).as_int(), Some(3));
        assert_eq!(Object::Int(4).as_f32(), Some(4.0));
        assert_eq!(Object::name(b"A").as_int(), None);
        assert_eq!(
            Object::array(vec![Object::Int(1), Object::Real(0.5)]).as_f32_n::<2>(),
            Some([1.0, 0.5])
        );
    }
}
