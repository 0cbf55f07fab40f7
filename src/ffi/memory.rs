//! Reference counting across the boundary.

use crate::object::{Obj, ObjRef};

use super::borrow;

/// Adds one reference to `obj` and returns the same handle.
///
/// # Returns
/// `obj` itself, or null when the handle is not live.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_retain(obj: *mut Obj) -> *mut Obj {
    match ObjRef::retain_raw(obj) {
        Some(owned) => owned.into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Drops one reference. Frees the object, and releases its children, when
/// the count reaches zero. Releasing a freed or null handle does nothing.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_release(obj: *mut Obj) {
    drop(ObjRef::from_raw(obj));
}

/// Current reference count; 0 for handles that are not live.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_refcount_of(obj: *const Obj) -> u32 {
    borrow(obj, 0, Obj::refcount)
}
