//! Read-only queries on handles and the zero-copy memory bridge.

use std::ffi::c_char;

use crate::interner;
use crate::kind::{self, Kind};
use crate::object::{Body, Obj};
use crate::view;

use super::{borrow, give, null_handle};

//===----------------------------------------------------------------------===//
// Shape
//===----------------------------------------------------------------------===//

/// Signed type code: negative for atoms. NULL for unknown handles.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_type_of(obj: *const Obj) -> i8 {
    borrow(obj, Kind::Null.code() as i8, Obj::type_code)
}

/// Atoms 1, vectors their element count, null and errors 0.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_length_of(obj: *const Obj) -> i64 {
    borrow(obj, 0, |o| o.len() as i64)
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_is_atom(obj: *const Obj) -> bool {
    borrow(obj, false, Obj::is_atom)
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_is_vector(obj: *const Obj) -> bool {
    borrow(obj, false, Obj::is_vector)
}

/// True for the null object, null atoms and handles that are not live.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_is_null(obj: *const Obj) -> bool {
    borrow(obj, true, Obj::is_null)
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_is_error(obj: *const Obj) -> bool {
    borrow(obj, false, Obj::is_error)
}

//===----------------------------------------------------------------------===//
// Errors
//===----------------------------------------------------------------------===//

/// Dict describing an error object; the null object for anything else.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_error_info(obj: *const Obj) -> *mut Obj {
    borrow(obj, None, |o| Some(o.error_info())).map_or_else(null_handle, give)
}

/// NUL-terminated error text. The pointer borrows from `obj` (or static
/// storage) and is never null.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_error_message(obj: *const Obj) -> *const c_char {
    let unknown = c"Unknown error".as_ptr();
    borrow(obj, unknown, |o| match &*o.body() {
        Body::Error(err) => err.display_message_ptr(),
        _ => unknown,
    })
}

//===----------------------------------------------------------------------===//
// Memory
//===----------------------------------------------------------------------===//

/// Address of a vector's first element. Null for atoms, null, errors and
/// unknown handles. Empty vectors return a dangling but aligned address.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_data_pointer(obj: *const Obj) -> *mut u8 {
    borrow(obj, None, Obj::data_ptr).unwrap_or(std::ptr::null_mut())
}

/// Bytes per element for a signed type code.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_element_size(code: i8) -> i64 {
    kind::element_size(code) as i64
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_byte_size(obj: *const Obj) -> i64 {
    borrow(obj, 0, |o| o.byte_size() as i64)
}

/// Buffer generation of a vector; 0 for anything else.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_generation(obj: *const Obj) -> u64 {
    borrow(obj, None, Obj::generation).unwrap_or(0)
}

/// Whether a pointer taken at `generation` still addresses `obj`'s buffer.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_view_is_current(obj: *const Obj, generation: u64) -> bool {
    borrow(obj, false, |o| view::is_current(o, generation))
}

//===----------------------------------------------------------------------===//
// Names
//===----------------------------------------------------------------------===//

/// Name of a signed type code as a NUL-terminated string that lives for the
/// rest of the process.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_type_name(code: i8) -> *const c_char {
    interner::resolve_ptr(interner::intern(kind::type_name(code)))
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}
