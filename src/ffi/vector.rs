//! In-place vector mutation.
//!
//! `set`, `push` and `insert` consume `value`. On success they return
//! `target` itself (borrowed, not a new reference). On a no-op they return
//! null and the target is left untouched.

use crate::object::{Obj, ObjRef};

use super::{borrow, consume, give, null_handle};

/// Shared body of the consuming mutators.
fn store(target: *mut Obj, value: *mut Obj, op: impl FnOnce(&Obj, ObjRef) -> bool) -> *mut Obj {
    // Storing a vector into itself is refused before its reference is taken,
    // so `value` stays with the caller.
    if std::ptr::eq(target, value) {
        return std::ptr::null_mut();
    }
    let Some(value) = consume(value) else {
        return std::ptr::null_mut();
    };
    if borrow(target, false, |t| op(t, value)) { target } else { std::ptr::null_mut() }
}

/// Element `index` as a new owned handle: an atom for flat vectors, the child
/// for LIST, a row dict for TABLE. The null object when out of range.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_get(obj: *const Obj, index: i64) -> *mut Obj {
    borrow(obj, None, |o| Some(o.get(index))).map_or_else(null_handle, give)
}

/// Writes `value` at `index`; `index >= len` grows the vector first.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_set(target: *mut Obj, index: i64, value: *mut Obj) -> *mut Obj {
    store(target, value, |t, v| t.set(index, v))
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_push(target: *mut Obj, value: *mut Obj) -> *mut Obj {
    store(target, value, |t, v| t.push(v))
}

/// Inserts before `index`; `index` may equal the length.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_insert(target: *mut Obj, index: i64, value: *mut Obj) -> *mut Obj {
    store(target, value, |t, v| t.insert(index, v))
}

/// Resizes to `len` elements, zero- or null-filling new slots.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_resize(target: *mut Obj, len: i64) -> bool {
    borrow(target, false, |t| t.resize(len))
}

macro_rules! fill {
    ($name:ident, $ty:ty, $method:ident) => {
        /// Copies `min(count, len)` elements from `src` into `target`. Never
        /// grows. Returns the number of elements copied.
        ///
        /// # Safety
        /// `src` must be null or point to `count` readable elements.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(target: *const Obj, src: *const $ty, count: i64) -> i64 {
            let Ok(count) = usize::try_from(count) else {
                return 0;
            };
            if src.is_null() || count == 0 {
                return 0;
            }
            // SAFETY: upheld by the caller.
            let src = unsafe { std::slice::from_raw_parts(src, count) };
            borrow(target, 0, |t| t.$method(src)) as i64
        }
    };
}

fill!(colrt_fill_i64, i64, fill_i64);
fill!(colrt_fill_i32, i32, fill_i32);
fill!(colrt_fill_f64, f64, fill_f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::colrt_release;
    use crate::ffi::introspect::colrt_length_of;
    use crate::ffi::memory::colrt_refcount_of;
    use crate::ffi::value::{colrt_f64, colrt_i64, colrt_read_i64, colrt_vector};
    use crate::object::Atom;

    #[test]
    fn test_push_returns_target() {
        let vector = colrt_vector(5, 0);
        assert_eq!(colrt_push(vector, colrt_i64(9)), vector);
        assert_eq!(colrt_length_of(vector), 1);
        let first = colrt_get(vector, 0);
        assert_eq!(colrt_read_i64(first), 9);
        colrt_release(first);
        colrt_release(vector);
    }

    #[test]
    fn test_kind_mismatch_is_noop() {
        let vector = colrt_vector(5, 2);
        assert!(colrt_set(vector, 0, colrt_f64(1.0)).is_null());
        assert!(colrt_push(std::ptr::null_mut(), colrt_i64(1)).is_null());
        assert_eq!(colrt_length_of(vector), 2);
        colrt_release(vector);
    }

    #[test]
    fn test_set_grows_and_insert() {
        let vector = colrt_vector(5, 1);
        assert_eq!(colrt_set(vector, 3, colrt_i64(4)), vector);
        assert_eq!(colrt_length_of(vector), 4);
        assert_eq!(colrt_insert(vector, 0, colrt_i64(-1)), vector);
        let first = colrt_get(vector, 0);
        assert_eq!(colrt_read_i64(first), -1);
        colrt_release(first);
        assert!(colrt_resize(vector, 2));
        assert_eq!(colrt_length_of(vector), 2);
        colrt_release(vector);
    }

    #[test]
    fn test_list_takes_ownership_of_value() {
        let list = colrt_vector(0, 0);
        let child = colrt_i64(1);
        colrt_push(list, crate::ffi::colrt_retain(child));
        assert_eq!(colrt_refcount_of(child), 2);
        colrt_release(list);
        assert_eq!(colrt_refcount_of(child), 1);
        colrt_release(child);
    }

    #[test]
    fn test_self_insert_refused() {
        let list = colrt_vector(0, 0);
        assert!(colrt_push(list, list).is_null());
        assert_eq!(colrt_refcount_of(list), 1);
        colrt_release(list);
    }

    #[test]
    fn test_oversized_growth_returns_without_aborting() {
        let vector = colrt_vector(5, 1);
        assert!(!colrt_resize(vector, i64::MAX));
        assert!(colrt_set(vector, i64::MAX - 1, colrt_i64(1)).is_null());
        assert_eq!(colrt_length_of(vector), 1);
        colrt_release(vector);
    }

    #[test]
    fn test_fill_copies_min() {
        let target = ObjRef::vector(crate::object::Vector::i64s(vec![0; 3]));
        let src = [7i64, 8, 9, 10];
        let copied = unsafe { colrt_fill_i64(target.as_ptr(), src.as_ptr(), 4) };
        assert_eq!(copied, 3);
        assert_eq!(target.get(2).as_atom(), Some(Atom::I64(9)));
        assert_eq!(unsafe { colrt_fill_f64(target.as_ptr(), [1.0].as_ptr(), 1) }, 0);
        assert_eq!(unsafe { colrt_fill_i32(target.as_ptr(), std::ptr::null(), 3) }, 0);
    }
}
