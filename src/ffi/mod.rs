//! C-ABI surface for host environments.
//!
//! Every function is exported unmangled with the `colrt_` prefix. Objects
//! cross the boundary as `*mut Obj` handles:
//!
//! - A returned handle is owned by the caller, who must pass it to
//!   [`colrt_release`] exactly once (or hand it to a consuming call).
//! - Borrowing calls never change a handle's count.
//! - Unknown, freed or null handles are tolerated and produce sentinels: kind
//!   NULL, length 0, refcount 0, a null pointer or the null object.
//!
//! Functions that read host buffers are `unsafe`: the caller promises that
//! `ptr` points at `len` readable bytes.

pub mod csv;
pub mod introspect;
pub mod logging;
pub mod memory;
pub mod session;
pub mod symbol;
pub mod table;
pub mod value;
pub mod vector;

pub use memory::{colrt_release, colrt_retain};

use crate::object::{Obj, ObjRef};

/// Hands `obj` to the host.
pub(crate) fn give(obj: ObjRef) -> *mut Obj {
    obj.into_raw()
}

/// The null object as an owned handle, returned by producers that received a
/// handle they could not use.
pub(crate) fn null_handle() -> *mut Obj {
    give(ObjRef::null())
}

/// Borrows a handle, or yields `default` for anything that is not live.
pub(crate) fn borrow<R>(obj: *const Obj, default: R, f: impl FnOnce(&Obj) -> R) -> R {
    ObjRef::with_raw(obj, f).unwrap_or(default)
}

/// Takes ownership of a consumed handle.
pub(crate) fn consume(obj: *mut Obj) -> Option<ObjRef> {
    ObjRef::from_raw(obj)
}

/// Views a host buffer. `None` for a null pointer or a negative length.
///
/// # Safety
/// `data` must point to at least `len` readable bytes that stay valid and
/// unmodified for `'a`.
pub(crate) unsafe fn host_bytes<'a>(data: *const u8, len: i64) -> Option<&'a [u8]> {
    let len = usize::try_from(len).ok()?;
    if data.is_null() {
        return None;
    }
    if len == 0 {
        return Some(&[]);
    }
    // SAFETY: upheld by the caller.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Like [`host_bytes`] but decodes UTF-8 lossily.
///
/// # Safety
/// Same contract as [`host_bytes`].
pub(crate) unsafe fn host_text(data: *const u8, len: i64) -> Option<String> {
    // SAFETY: forwarded to the caller.
    unsafe { host_bytes(data, len) }.map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}
