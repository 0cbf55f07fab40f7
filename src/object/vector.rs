//! Homogeneous vectors and the in-place mutation surface.
//!
//! A vector owns one contiguous buffer whose element width is fixed by its
//! kind. LIST, TABLE and DICT vectors hold object handles. Every call that
//! may move the buffer (push, insert, resize, a growing set) bumps the
//! vector's generation so views taken earlier can detect that they are stale.

use crate::error::{Error, Result};
use crate::kind::Kind;

use super::table;
use super::{Atom, Body, Obj, ObjRef};

#[derive(Debug, Clone)]
pub enum Buffer {
    /// BOOL, BYTE and CHAR.
    U8(Vec<u8>),
    I16(Vec<i16>),
    /// I32, DATE and TIME.
    I32(Vec<i32>),
    /// I64, SYMBOL and TIMESTAMP.
    I64(Vec<i64>),
    F64(Vec<f64>),
    Guid(Vec<[u8; 16]>),
    /// LIST, TABLE and DICT.
    Objects(Vec<ObjRef>),
}

macro_rules! dispatch {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            Buffer::U8($v) => $body,
            Buffer::I16($v) => $body,
            Buffer::I32($v) => $body,
            Buffer::I64($v) => $body,
            Buffer::F64($v) => $body,
            Buffer::Guid($v) => $body,
            Buffer::Objects($v) => $body,
        }
    };
}

macro_rules! place {
    ($v:expr, $index:expr, $x:expr, $replace:expr) => {{
        if $replace {
            $v[$index] = $x;
        } else {
            $v.insert($index, $x);
        }
        true
    }};
}

impl Buffer {
    fn empty(kind: Kind) -> Option<Buffer> {
        Some(match kind {
            Kind::Bool | Kind::Byte | Kind::Char => Buffer::U8(Vec::new()),
            Kind::I16 => Buffer::I16(Vec::new()),
            Kind::I32 | Kind::Date | Kind::Time => Buffer::I32(Vec::new()),
            Kind::I64 | Kind::Symbol | Kind::Timestamp => Buffer::I64(Vec::new()),
            Kind::F64 => Buffer::F64(Vec::new()),
            Kind::Guid => Buffer::Guid(Vec::new()),
            Kind::List | Kind::Table | Kind::Dict => Buffer::Objects(Vec::new()),
            Kind::Lambda | Kind::Null | Kind::Error => return None,
        })
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        dispatch!(self, v => v.as_mut_ptr() as *mut u8)
    }

    fn try_reserve(&mut self, additional: usize) -> Result<()> {
        dispatch!(self, v => v.try_reserve_exact(additional))
            .map_err(|_| Error::user(super::error::OUT_OF_MEMORY))
    }

    /// Resizes to `len`, reserving growth up front so an oversized request
    /// fails instead of aborting. The buffer is untouched on failure.
    fn resize(&mut self, len: usize) -> Result<()> {
        self.try_reserve(len.saturating_sub(self.len()))?;
        match self {
            Buffer::U8(v) => v.resize(len, 0),
            Buffer::I16(v) => v.resize(len, 0),
            Buffer::I32(v) => v.resize(len, 0),
            Buffer::I64(v) => v.resize(len, 0),
            Buffer::F64(v) => v.resize(len, 0.0),
            Buffer::Guid(v) => v.resize(len, [0; 16]),
            Buffer::Objects(v) => v.resize_with(len, ObjRef::null),
        }
        Ok(())
    }

    fn read(&self, kind: Kind, index: usize) -> Option<Atom> {
        Some(match (self, kind) {
            (Buffer::U8(v), Kind::Bool) => Atom::Bool(*v.get(index)? != 0),
            (Buffer::U8(v), Kind::Byte) => Atom::Byte(*v.get(index)?),
            (Buffer::U8(v), _) => Atom::Char(*v.get(index)?),
            (Buffer::I16(v), _) => Atom::I16(*v.get(index)?),
            (Buffer::I32(v), Kind::Date) => Atom::Date(*v.get(index)?),
            (Buffer::I32(v), Kind::Time) => Atom::Time(*v.get(index)?),
            (Buffer::I32(v), _) => Atom::I32(*v.get(index)?),
            (Buffer::I64(v), Kind::Symbol) => Atom::Symbol(*v.get(index)?),
            (Buffer::I64(v), Kind::Timestamp) => Atom::Timestamp(*v.get(index)?),
            (Buffer::I64(v), _) => Atom::I64(*v.get(index)?),
            (Buffer::F64(v), _) => Atom::F64(*v.get(index)?),
            (Buffer::Guid(v), _) => Atom::Guid(*v.get(index)?),
            (Buffer::Objects(_), _) => return None,
        })
    }

    /// Writes (or inserts) an atom whose kind was already checked against
    /// the vector's kind.
    fn place(&mut self, index: usize, atom: Atom, replace: bool) -> bool {
        match (self, atom) {
            (Buffer::U8(v), Atom::Bool(b)) => place!(v, index, b as u8, replace),
            (Buffer::U8(v), Atom::Byte(x) | Atom::Char(x)) => place!(v, index, x, replace),
            (Buffer::I16(v), Atom::I16(x)) => place!(v, index, x, replace),
            (Buffer::I32(v), Atom::I32(x) | Atom::Date(x) | Atom::Time(x)) => {
                place!(v, index, x, replace)
            }
            (Buffer::I64(v), Atom::I64(x) | Atom::Symbol(x) | Atom::Timestamp(x)) => {
                place!(v, index, x, replace)
            }
            (Buffer::F64(v), Atom::F64(x)) => place!(v, index, x, replace),
            (Buffer::Guid(v), Atom::Guid(x)) => place!(v, index, x, replace),
            _ => false,
        }
    }
}

/// A value about to be stored into a vector. The atom is read before the
/// target is borrowed, so storing a vector into itself cannot conflict.
pub struct Item {
    atom: Option<Atom>,
    obj: ObjRef,
}

impl From<ObjRef> for Item {
    fn from(obj: ObjRef) -> Self {
        Item { atom: obj.as_atom(), obj }
    }
}

#[derive(Debug, Clone)]
pub struct Vector {
    kind: Kind,
    buf: Buffer,
    generation: u64,
}

impl Vector {
    /// A zero-filled vector of `len` elements; LIST slots hold null objects.
    /// Returns `None` for kinds without a user-constructible vector form.
    pub fn new(kind: Kind, len: usize) -> Option<Vector> {
        Self::try_new(kind, len).ok()
    }

    /// Like [`Vector::new`] but reports allocation failure instead of
    /// aborting.
    pub fn try_new(kind: Kind, len: usize) -> Result<Vector> {
        let mut vector = Self::with_capacity(kind, len)?;
        vector.buf.resize(len)?;
        Ok(vector)
    }

    /// An empty vector with room for `capacity` elements.
    pub fn with_capacity(kind: Kind, capacity: usize) -> Result<Vector> {
        if !(kind.is_scalar() || kind == Kind::List) {
            return Err(Error::type_mismatch("vector kind", kind));
        }
        let mut buf = Buffer::empty(kind).ok_or_else(|| Error::type_mismatch("vector kind", kind))?;
        buf.try_reserve(capacity)?;
        Ok(Vector { kind, buf, generation: 0 })
    }

    pub fn chars(bytes: Vec<u8>) -> Vector {
        Vector { kind: Kind::Char, buf: Buffer::U8(bytes), generation: 0 }
    }

    /// A BOOL, BYTE or CHAR vector over raw bytes.
    pub fn u8s(kind: Kind, values: Vec<u8>) -> Vector {
        debug_assert!(matches!(kind, Kind::Bool | Kind::Byte | Kind::Char));
        Vector { kind, buf: Buffer::U8(values), generation: 0 }
    }

    pub fn i64s(values: Vec<i64>) -> Vector {
        Vector { kind: Kind::I64, buf: Buffer::I64(values), generation: 0 }
    }

    pub fn f64s(values: Vec<f64>) -> Vector {
        Vector { kind: Kind::F64, buf: Buffer::F64(values), generation: 0 }
    }

    pub fn symbols(ids: Vec<i64>) -> Vector {
        Vector { kind: Kind::Symbol, buf: Buffer::I64(ids), generation: 0 }
    }

    pub fn objects(kind: Kind, items: Vec<ObjRef>) -> Vector {
        debug_assert!(kind.holds_objects());
        Vector { kind, buf: Buffer::Objects(items), generation: 0 }
    }

    /// Packs atoms of a single kind into a flat vector.
    pub fn from_atoms(kind: Kind, atoms: &[Atom]) -> Option<Vector> {
        let mut vector = Self::with_capacity(kind, atoms.len()).ok()?;
        for atom in atoms {
            if atom.kind() != kind || !vector.buf.place(vector.buf.len(), *atom, false) {
                return None;
            }
        }
        Some(vector)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buf
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buf
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.buf {
            Buffer::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn objects_slice(&self) -> Option<&[ObjRef]> {
        match &self.buf {
            Buffer::Objects(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.buf.as_mut_ptr()
    }

    pub fn atom_at(&self, index: usize) -> Option<Atom> {
        self.buf.read(self.kind, index)
    }

    /// Owned handle for element `index`.
    pub fn get(&self, index: usize) -> Option<ObjRef> {
        match &self.buf {
            Buffer::Objects(items) => items.get(index).cloned(),
            _ => self.atom_at(index).map(ObjRef::atom),
        }
    }

    fn is_frozen(&self) -> bool {
        matches!(self.kind, Kind::Table | Kind::Dict)
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn store(&mut self, index: usize, item: Item, replace: bool) -> bool {
        match &mut self.buf {
            Buffer::Objects(items) => place!(items, index, item.obj, replace),
            buf => match item.atom {
                Some(atom) if atom.kind() == self.kind => buf.place(index, atom, replace),
                _ => false,
            },
        }
    }

    fn accepts(&self, item: &Item) -> bool {
        match self.buf {
            Buffer::Objects(_) => true,
            _ => item.atom.is_some_and(|atom| atom.kind() == self.kind),
        }
    }

    /// Overwrites element `index`, growing the vector when `index` is past
    /// the end.
    pub fn set(&mut self, index: usize, item: Item) -> bool {
        if self.is_frozen() || !self.accepts(&item) {
            return false;
        }
        if index >= self.len() {
            let Some(len) = index.checked_add(1) else {
                return false;
            };
            if self.buf.resize(len).is_err() {
                return false;
            }
            self.bump();
        }
        self.store(index, item, true)
    }

    pub fn push(&mut self, item: Item) -> bool {
        let len = self.len();
        self.insert(len, item)
    }

    pub fn insert(&mut self, index: usize, item: Item) -> bool {
        if self.is_frozen() || index > self.len() || !self.accepts(&item) {
            return false;
        }
        self.bump();
        self.store(index, item, false)
    }

    pub fn resize(&mut self, len: usize) -> bool {
        if self.is_frozen() || self.buf.resize(len).is_err() {
            return false;
        }
        self.bump();
        true
    }
}

fn fill_from<T: Copy>(dst: &mut [T], src: &[T]) -> usize {
    let count = src.len().min(dst.len());
    dst[..count].copy_from_slice(&src[..count]);
    count
}

//===----------------------------------------------------------------------===//
// Object-level mutation surface
//===----------------------------------------------------------------------===//

impl Obj {
    /// Element `index` as a new owned handle; the null object when out of
    /// range or when the target is not a vector. Table rows come back as
    /// dicts, dict entries by position.
    pub fn get(&self, index: i64) -> ObjRef {
        let Ok(index) = usize::try_from(index) else {
            return ObjRef::null();
        };
        let parts = match &*self.body() {
            Body::Vector(vector) => match vector.kind() {
                Kind::Table | Kind::Dict => match vector.objects_slice() {
                    Some([first, second]) => (vector.kind(), first.clone(), second.clone()),
                    _ => return ObjRef::null(),
                },
                _ => return vector.get(index).unwrap_or_else(ObjRef::null),
            },
            _ => return ObjRef::null(),
        };
        match parts {
            (Kind::Table, names, columns) => table::row_of(&names, &columns, index),
            (_, _, values) => values.get(index as i64),
        }
    }

    fn with_vector(&self, f: impl FnOnce(&mut Vector) -> bool) -> bool {
        let Ok(mut body) = self.body.try_borrow_mut() else {
            return false;
        };
        match &mut *body {
            Body::Vector(vector) => f(vector),
            _ => false,
        }
    }

    /// In-place write. Returns `false` and leaves the object untouched when
    /// the target is not a vector, the index is negative, the value kind
    /// does not match or the value is the target itself.
    pub fn set(&self, index: i64, value: ObjRef) -> bool {
        let Ok(index) = usize::try_from(index) else {
            return false;
        };
        if std::ptr::eq(self, &*value) {
            return false;
        }
        let item = Item::from(value);
        self.with_vector(|vector| vector.set(index, item))
    }

    pub fn push(&self, value: ObjRef) -> bool {
        if std::ptr::eq(self, &*value) {
            return false;
        }
        let item = Item::from(value);
        self.with_vector(|vector| vector.push(item))
    }

    pub fn insert(&self, index: i64, value: ObjRef) -> bool {
        let Ok(index) = usize::try_from(index) else {
            return false;
        };
        if std::ptr::eq(self, &*value) {
            return false;
        }
        let item = Item::from(value);
        self.with_vector(|vector| vector.insert(index, item))
    }

    pub fn resize(&self, len: i64) -> bool {
        let Ok(len) = usize::try_from(len) else {
            return false;
        };
        self.with_vector(|vector| vector.resize(len))
    }

    /// Copies up to `len()` elements from `src` into an I64 vector. Returns
    /// how many were written; 0 for any other target.
    pub fn fill_i64(&self, src: &[i64]) -> usize {
        let mut count = 0;
        self.with_vector(|vector| match (&mut vector.buf, vector.kind) {
            (Buffer::I64(dst), Kind::I64) => {
                count = fill_from(dst, src);
                true
            }
            _ => false,
        });
        count
    }

    pub fn fill_i32(&self, src: &[i32]) -> usize {
        let mut count = 0;
        self.with_vector(|vector| match (&mut vector.buf, vector.kind) {
            (Buffer::I32(dst), Kind::I32) => {
                count = fill_from(dst, src);
                true
            }
            _ => false,
        });
        count
    }

    pub fn fill_f64(&self, src: &[f64]) -> usize {
        let mut count = 0;
        self.with_vector(|vector| match &mut vector.buf {
            Buffer::F64(dst) => {
                count = fill_from(dst, src);
                true
            }
            _ => false,
        });
        count
    }
}
