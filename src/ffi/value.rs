//! Atom and vector constructors, and typed atom readers.
//!
//! Constructors consume nothing and return a new owned handle. Readers borrow
//! and return the kind's null sentinel when the handle is not an atom of the
//! requested kind.

use crate::error::{Error, into_object};
use crate::kind::{Kind, NULL_F64, NULL_I16, NULL_I32, NULL_I64, NULL_SYMBOL};
use crate::object::{Atom, Obj, ObjRef, Vector};

use super::{borrow, give, host_bytes, null_handle};

macro_rules! atom_constructor {
    ($name:ident, $ty:ty, $variant:ident) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $name(value: $ty) -> *mut Obj {
            give(ObjRef::atom(Atom::$variant(value)))
        }
    };
}

atom_constructor!(colrt_bool, bool, Bool);
atom_constructor!(colrt_byte, u8, Byte);
atom_constructor!(colrt_char, u8, Char);
atom_constructor!(colrt_i16, i16, I16);
atom_constructor!(colrt_i32, i32, I32);
atom_constructor!(colrt_i64, i64, I64);
atom_constructor!(colrt_f64, f64, F64);
// Days since 2000.01.01.
atom_constructor!(colrt_date, i32, Date);
// Milliseconds since midnight.
atom_constructor!(colrt_time, i32, Time);
// Nanoseconds since 2000.01.01D00:00:00.
atom_constructor!(colrt_timestamp, i64, Timestamp);

/// A GUID atom from 16 bytes. A null pointer yields the null GUID.
///
/// # Safety
/// `bytes` must be null or point to 16 readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_guid(bytes: *const u8) -> *mut Obj {
    let mut guid = [0u8; 16];
    // SAFETY: upheld by the caller.
    if let Some(src) = unsafe { host_bytes(bytes, 16) } {
        guid.copy_from_slice(src);
    }
    give(ObjRef::atom(Atom::Guid(guid)))
}

/// Interns `len` bytes of text and returns a symbol atom.
///
/// # Safety
/// `text` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_symbol(text: *const u8, len: i64) -> *mut Obj {
    // SAFETY: upheld by the caller.
    match unsafe { super::host_text(text, len) } {
        Some(name) => give(ObjRef::symbol(&name)),
        None => null_handle(),
    }
}

/// A CHAR vector holding a copy of `len` bytes.
///
/// # Safety
/// `text` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_string(text: *const u8, len: i64) -> *mut Obj {
    // SAFETY: upheld by the caller.
    match unsafe { host_bytes(text, len) } {
        Some(bytes) => give(ObjRef::vector(Vector::chars(bytes.to_vec()))),
        None => null_handle(),
    }
}

fn new_vector(code: i8, len: i64) -> crate::error::Result<ObjRef> {
    let kind = Kind::from_type_code(code)
        .filter(|_| code >= 0)
        .ok_or_else(|| Error::type_mismatch("vector kind", code))?;
    let len = usize::try_from(len).map_err(|_| Error::Domain(format!("negative length {len}")))?;
    Vector::try_new(kind, len).map(ObjRef::vector)
}

/// A zero-filled vector of `len` elements. LIST slots hold null objects.
/// Invalid kinds and negative lengths produce an error object.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_vector(kind: i8, len: i64) -> *mut Obj {
    give(into_object(new_vector(kind, len)))
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_list(len: i64) -> *mut Obj {
    colrt_vector(Kind::List.code() as i8, len)
}

//===----------------------------------------------------------------------===//
// Readers
//===----------------------------------------------------------------------===//

macro_rules! atom_reader {
    ($name:ident, $ty:ty, $variant:ident, $null:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $name(obj: *const Obj) -> $ty {
            borrow(obj, None, Obj::as_atom)
                .and_then(|atom| match atom {
                    Atom::$variant(value) => Some(value),
                    _ => None,
                })
                .unwrap_or($null)
        }
    };
}

atom_reader!(colrt_read_bool, bool, Bool, false);
atom_reader!(colrt_read_byte, u8, Byte, 0);
atom_reader!(colrt_read_char, u8, Char, 0);
atom_reader!(colrt_read_i16, i16, I16, NULL_I16);
atom_reader!(colrt_read_i32, i32, I32, NULL_I32);
atom_reader!(colrt_read_i64, i64, I64, NULL_I64);
atom_reader!(colrt_read_f64, f64, F64, NULL_F64);
atom_reader!(colrt_read_date, i32, Date, NULL_I32);
atom_reader!(colrt_read_time, i32, Time, NULL_I32);
atom_reader!(colrt_read_timestamp, i64, Timestamp, NULL_I64);
atom_reader!(colrt_read_symbol_id, i64, Symbol, NULL_SYMBOL);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::colrt_release;
    use crate::ffi::introspect::{colrt_length_of, colrt_type_of};

    #[test]
    fn test_constructors_report_atom_codes() {
        let cases = [
            (colrt_bool(true), -1),
            (colrt_i16(7), -3),
            (colrt_i64(7), -5),
            (colrt_date(1), -7),
            (colrt_f64(1.5), -10),
            (colrt_char(b'x'), -12),
        ];
        for (obj, code) in cases {
            assert_eq!(colrt_type_of(obj), code);
            colrt_release(obj);
        }
    }

    #[test]
    fn test_readers() {
        let obj = colrt_i64(42);
        assert_eq!(colrt_read_i64(obj), 42);
        assert_eq!(colrt_read_i32(obj), NULL_I32);
        assert!(colrt_read_f64(obj).is_nan());
        colrt_release(obj);
        assert_eq!(colrt_read_i64(obj), NULL_I64);
        assert_eq!(colrt_read_i64(std::ptr::null()), NULL_I64);
    }

    #[test]
    fn test_text_constructors() {
        let name = b"price";
        let sym = unsafe { colrt_symbol(name.as_ptr(), 5) };
        assert_eq!(colrt_read_symbol_id(sym), crate::interner::intern("price"));
        let text = unsafe { colrt_string(name.as_ptr(), 5) };
        assert_eq!(colrt_type_of(text), 12);
        assert_eq!(colrt_length_of(text), 5);
        let missing = unsafe { colrt_string(std::ptr::null(), 3) };
        assert_eq!(colrt_type_of(missing), 126);
        colrt_release(missing);
        colrt_release(sym);
        colrt_release(text);
    }

    #[test]
    fn test_guid() {
        let bytes: Vec<u8> = (0..16).collect();
        let guid = unsafe { colrt_guid(bytes.as_ptr()) };
        assert_eq!(colrt_type_of(guid), -11);
        colrt_release(guid);
    }

    #[test]
    fn test_vector_constructor() {
        let vector = colrt_vector(4, 3);
        assert_eq!(colrt_type_of(vector), 4);
        assert_eq!(colrt_length_of(vector), 3);
        colrt_release(vector);

        let list = colrt_list(2);
        assert_eq!(colrt_type_of(list), 0);
        colrt_release(list);

        let bad = colrt_vector(-5, 3);
        assert_eq!(colrt_type_of(bad), 127);
        colrt_release(bad);
        let bad = colrt_vector(5, -1);
        assert_eq!(colrt_type_of(bad), 127);
        colrt_release(bad);
    }
}
