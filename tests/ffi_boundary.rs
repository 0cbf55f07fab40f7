//! Handle lifecycle, introspection and mutation through the C ABI.

use std::ffi::CStr;

use colrt::ffi::introspect::*;
use colrt::ffi::symbol::{colrt_intern, colrt_resolve};
use colrt::ffi::value::*;
use colrt::ffi::vector::*;
use colrt::ffi::memory::colrt_refcount_of;
use colrt::ffi::{colrt_release, colrt_retain};
use colrt::kind::{Kind, NULL_I64};
use colrt::object::live_count;
use colrt::{Error, ObjRef, View};

fn c_text(ptr: *const std::ffi::c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

// =============================================================================
// Sizes
// =============================================================================

#[test]
fn test_element_size_is_sign_independent() {
    for kind in Kind::ALL {
        let code = kind.code() as i8;
        assert_eq!(colrt_element_size(code), colrt_element_size(-code), "{kind}");
    }
}

#[test]
fn test_byte_size_matches_length_times_width() {
    for code in [1i8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 0] {
        let vector = colrt_vector(code, 5);
        let expected = colrt_length_of(vector) * colrt_element_size(colrt_type_of(vector));
        assert_eq!(colrt_byte_size(vector), expected, "code {code}");
        colrt_release(vector);
    }
}

#[test]
fn test_data_pointer_on_atom_and_empty_vector() {
    let atom = colrt_i64(1);
    assert!(colrt_data_pointer(atom).is_null());
    let empty = colrt_vector(5, 0);
    assert!(!colrt_data_pointer(empty).is_null());
    assert_eq!(colrt_byte_size(empty), 0);
    colrt_release(atom);
    colrt_release(empty);
}

// =============================================================================
// Reference counting
// =============================================================================

#[test]
fn test_retain_release_balance() {
    let obj = colrt_vector(10, 4);
    assert_eq!(colrt_retain(obj), obj);
    colrt_release(obj);
    assert_eq!(colrt_refcount_of(obj), 1);
    assert_eq!(colrt_length_of(obj), 4);
    colrt_release(obj);
    assert_eq!(colrt_refcount_of(obj), 0);
}

#[test]
fn test_second_release_does_not_crash() {
    let before = live_count();
    let obj = colrt_i64(5);
    colrt_release(obj);
    colrt_release(obj);
    assert_eq!(colrt_refcount_of(obj), 0);
    assert_eq!(colrt_read_i64(obj), NULL_I64);
    assert_eq!(live_count(), before);
}

#[test]
fn test_shared_mutation_visible_through_both_handles() {
    let original = colrt_vector(5, 2);
    let shared = colrt_retain(original);
    assert_eq!(colrt_set(shared, 1, colrt_i64(99)), shared);

    let cell = colrt_get(original, 1);
    assert_eq!(colrt_read_i64(cell), 99);
    colrt_release(cell);
    colrt_release(shared);
    colrt_release(original);
}

// =============================================================================
// Fill and views
// =============================================================================

#[test]
fn test_fill_never_writes_past_length() {
    let target = ObjRef::vector(colrt::Vector::i64s(vec![0; 4]));
    let view = View::new(&target).unwrap();
    let src: Vec<i64> = (1..=10).collect();
    let copied = unsafe { colrt_fill_i64(target.as_ptr(), src.as_ptr(), src.len() as i64) };
    assert_eq!(copied, 4);
    assert_eq!(target.len(), 4);
    assert_eq!(view.to_vec::<i64>().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_view_goes_stale_after_push() {
    let handle = colrt_vector(5, 3);
    let owned = ObjRef::retain_raw(handle).unwrap();
    let view = View::new(&owned).unwrap();
    let generation = view.generation();

    colrt_push(handle, colrt_i64(4));

    assert!(!view.is_current());
    assert!(!colrt_view_is_current(handle, generation));
    assert!(matches!(view.get::<i64>(0), Err(Error::Domain(_))));
    assert!(matches!(View::new(&owned).unwrap().get::<f64>(0), Err(Error::Type { .. })));
    drop(view);
    drop(owned);
    colrt_release(handle);
}

// =============================================================================
// Errors and symbols
// =============================================================================

#[test]
fn test_error_info_lists_code_and_message() {
    let err = Error::user("boom").into_object();
    let info = colrt_error_info(err.as_ptr());
    assert_eq!(colrt_type_of(info), Kind::Dict as i8);
    assert_eq!(c_text(colrt_error_message(err.as_ptr())), "boom");
    colrt_release(info);

    let not_error = colrt_i64(1);
    let info = colrt_error_info(not_error);
    assert_eq!(colrt_type_of(info), Kind::Null as i8);
    colrt_release(info);
    colrt_release(not_error);
}

#[test]
fn test_intern_then_resolve() {
    let id = unsafe { colrt_intern(b"x".as_ptr(), 1) };
    assert_eq!(c_text(colrt_resolve(id)), "x");
}
