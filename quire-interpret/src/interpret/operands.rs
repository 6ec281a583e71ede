use quire_syntax::{DocError, ErrorKind, Name, Object, Result};
use std::rc::Rc;

const MAX_NUMBERS: usize = 32;

/// The operands collected for the next operator.
///
/// Numbers go onto a small fixed stack. Names, strings and composite objects
/// each have a single slot; a second name (as in `/Tag /Props BDC`) moves to
/// the object slot.
#[derive(Default)]
pub(crate) struct Operands {
    numbers: [f64; MAX_NUMBERS],
    len: usize,
    overflow: bool,
    name: Option<Name>,
    object: Option<Object>,
    string: Option<Rc<[u8]>>,
}

impl Operands {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_number(&mut self, n: f64) {
        if self.len == MAX_NUMBERS {
            self.overflow = true;
        } else {
            self.numbers[self.len] = n;
            self.len += 1;
        }
    }

    pub(crate) fn push_name(&mut self, name: Name) {
        if self.name.is_none() {
            self.name = Some(name);
        } else {
            self.object = Some(Object::Name(name));
        }
    }

    pub(crate) fn push_string(&mut self, data: Vec<u8>) {
        self.string = Some(data.into());
    }

    pub(crate) fn push_object(&mut self, object: Object) {
        self.object = Some(object);
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
        self.overflow = false;
        self.name = None;
        self.object = None;
        self.string = None;
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.overflow {
            Err(DocError::new(
                ErrorKind::StackOverflow,
                format!("more than {MAX_NUMBERS} numeric operands"),
            ))
        } else {
            Ok(())
        }
    }

    /// The number at `index`. Missing operands read as zero.
    pub(crate) fn num(&self, index: usize) -> f64 {
        if index < self.len {
            self.numbers[index]
        } else {
            0.0
        }
    }

    pub(crate) fn f32(&self, index: usize) -> f32 {
        self.num(index) as f32
    }

    pub(crate) fn int(&self, index: usize) -> i64 {
        self.num(index) as i64
    }

    pub(crate) fn numbers(&self) -> &[f64] {
        &self.numbers[..self.len]
    }

    pub(crate) fn name(&self) -> Result<&Name> {
        self.name
            .as_ref()
            .ok_or_else(|| DocError::new(ErrorKind::StackUnderflow, "missing name operand"))
    }

    pub(crate) fn object(&self) -> Option<&Object> {
        self.object.as_ref()
    }

    pub(crate) fn string(&self) -> Result<&[u8]> {
        self.string
            .as_deref()
            .ok_or_else(|| DocError::new(ErrorKind::StackUnderflow, "missing string operand"))
    }

    pub(crate) fn array(&self) -> Result<&[Object]> {
        match &self.object {
            Some(Object::Array(items)) => Ok(items),
            Some(other) => Err(DocError::new(
                ErrorKind::TypeCheck,
                format!("expected an array, found {}", other.type_name()),
            )),
            None => Err(DocError::new(
                ErrorKind::StackUnderflow,
                "missing array operand",
            )),
        }
    }
}
