//! Generation-checked views over vector buffers.
//!
//! A [`View`] records a vector's data pointer, length, kind and generation at
//! the moment it is taken. Every typed access re-checks the generation and
//! fails once the buffer may have moved, instead of reading stale memory.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::object::{Body, Buffer, Obj, ObjRef};

/// Element types a view can be read as.
pub trait Element: Copy {
    /// Kinds whose buffers store this element type.
    const KINDS: &'static [Kind];

    fn slice(buf: &Buffer) -> Option<&[Self]>;
    fn slice_mut(buf: &mut Buffer) -> Option<&mut [Self]>;
}

macro_rules! element {
    ($ty:ty, $variant:ident, [$($kind:ident),+]) => {
        impl Element for $ty {
            const KINDS: &'static [Kind] = &[$(Kind::$kind),+];

            fn slice(buf: &Buffer) -> Option<&[Self]> {
                match buf {
                    Buffer::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(buf: &mut Buffer) -> Option<&mut [Self]> {
                match buf {
                    Buffer::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

element!(u8, U8, [Bool, Byte, Char]);
element!(i16, I16, [I16]);
element!(i32, I32, [I32, Date, Time]);
element!(i64, I64, [I64, Symbol, Timestamp]);
element!(f64, F64, [F64]);
element!([u8; 16], Guid, [Guid]);

#[derive(Debug)]
pub struct View {
    obj: ObjRef,
    ptr: *mut u8,
    len: usize,
    kind: Kind,
    generation: u64,
}

impl View {
    /// Takes a view of a vector. The view keeps the vector alive.
    pub fn new(obj: &ObjRef) -> Result<View> {
        let ptr = obj.data_ptr().ok_or_else(|| Error::type_mismatch("vector", obj.kind()))?;
        let generation = obj.generation().unwrap_or_default();
        Ok(View { obj: obj.clone(), ptr, len: obj.len(), kind: obj.kind(), generation })
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn byte_size(&self) -> usize {
        self.len * self.kind.element_size()
    }

    pub fn is_current(&self) -> bool {
        self.obj.generation() == Some(self.generation)
    }

    fn check<T: Element>(&self) -> Result<()> {
        if !T::KINDS.contains(&self.kind) {
            return Err(Error::type_mismatch(self.kind, std::any::type_name::<T>()));
        }
        match self.obj.generation() {
            Some(current) if current == self.generation => Ok(()),
            current => Err(Error::Domain(format!(
                "stale view: taken at generation {}, vector is at {}",
                self.generation,
                current.unwrap_or_default()
            ))),
        }
    }

    /// Runs `f` over the elements, borrowing the vector for the duration.
    pub fn with_slice<T: Element, R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        self.check::<T>()?;
        let body = self.obj.body();
        match &*body {
            Body::Vector(vector) => T::slice(vector.buffer())
                .map(f)
                .ok_or_else(|| Error::type_mismatch(self.kind, std::any::type_name::<T>())),
            other => Err(Error::type_mismatch("vector", format!("{other:?}"))),
        }
    }

    /// Like [`View::with_slice`] but allows writing in place. The length is
    /// fixed; nothing here can move the buffer.
    pub fn with_slice_mut<T: Element, R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R> {
        self.check::<T>()?;
        let mut body = self
            .obj
            .try_body_mut()
            .ok_or_else(|| Error::Domain("vector is already borrowed".into()))?;
        match &mut *body {
            Body::Vector(vector) => T::slice_mut(vector.buffer_mut())
                .map(f)
                .ok_or_else(|| Error::type_mismatch(self.kind, std::any::type_name::<T>())),
            _ => Err(Error::type_mismatch("vector", self.kind)),
        }
    }

    pub fn get<T: Element>(&self, index: usize) -> Result<T> {
        let len = self.len;
        self.with_slice(|items: &[T]| items.get(index).copied())?
            .ok_or(Error::Index { index: index as i64, len })
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.with_slice(|items: &[T]| items.to_vec())
    }
}

/// Whether a vector's buffer is still at generation `generation`.
pub fn is_current(obj: &Obj, generation: u64) -> bool {
    obj.generation() == Some(generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Atom, Vector};

    #[test]
    fn test_view_reads_in_place() {
        let vec = ObjRef::vector(Vector::i64s(vec![1, 2, 3]));
        let view = View::new(&vec).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.byte_size(), 24);
        assert_eq!(view.to_vec::<i64>().unwrap(), vec![1, 2, 3]);
        assert_eq!(view.as_ptr(), vec.data_ptr().unwrap());
    }

    #[test]
    fn test_view_stale_after_push() {
        let vec = ObjRef::vector(Vector::i64s(vec![1, 2, 3]));
        let view = View::new(&vec).unwrap();
        assert!(vec.push(ObjRef::atom(Atom::I64(4))));
        assert!(!view.is_current());
        assert!(matches!(view.get::<i64>(0), Err(Error::Domain(_))));
    }

    #[test]
    fn test_view_survives_in_place_set() {
        let vec = ObjRef::vector(Vector::i64s(vec![1, 2, 3]));
        let view = View::new(&vec).unwrap();
        assert!(vec.set(0, ObjRef::atom(Atom::I64(10))));
        assert_eq!(view.get::<i64>(0).unwrap(), 10);
    }

    #[test]
    fn test_view_type_mismatch() {
        let vec = ObjRef::vector(Vector::f64s(vec![1.0]));
        let view = View::new(&vec).unwrap();
        assert!(matches!(view.get::<i64>(0), Err(Error::Type { .. })));
        assert_eq!(view.get::<f64>(0).unwrap(), 1.0);
    }

    #[test]
    fn test_view_of_symbols_as_i64() {
        let vec = ObjRef::vector(Vector::symbols(vec![7, 8]));
        let view = View::new(&vec).unwrap();
        assert_eq!(view.get::<i64>(1).unwrap(), 8);
    }

    #[test]
    fn test_view_write() {
        let vec = ObjRef::vector(Vector::new(Kind::F64, 2).unwrap());
        let view = View::new(&vec).unwrap();
        view.with_slice_mut(|items: &mut [f64]| items[1] = 2.5).unwrap();
        assert_eq!(vec.get(1).as_atom(), Some(Atom::F64(2.5)));
    }

    #[test]
    fn test_view_of_atom_fails() {
        assert!(View::new(&ObjRef::atom(Atom::I64(1))).is_err());
    }

    #[test]
    fn test_index_out_of_range() {
        let vec = ObjRef::vector(Vector::i64s(vec![1]));
        let view = View::new(&vec).unwrap();
        assert!(matches!(view.get::<i64>(5), Err(Error::Index { index: 5, len: 1 })));
    }

    #[test]
    fn test_free_is_current() {
        let vec = ObjRef::vector(Vector::i64s(vec![]));
        let generation = vec.generation().unwrap();
        assert!(is_current(&vec, generation));
        vec.resize(2);
        assert!(!is_current(&vec, generation));
    }
}
