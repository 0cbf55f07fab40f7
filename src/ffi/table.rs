//! Dict and table construction and access.

use crate::error::{Error, into_object};
use crate::object::{Obj, ObjRef, table};

use super::{borrow, consume, give, host_text, null_handle};

/// Takes ownership of two handles. When both slots carry the same pointer the
/// caller handed over a single reference, so the second slot shares it.
fn consume_pair(first: *mut Obj, second: *mut Obj) -> (Option<ObjRef>, Option<ObjRef>) {
    let first_ref = consume(first);
    let second_ref = if std::ptr::eq(first, second) { first_ref.clone() } else { consume(second) };
    (first_ref, second_ref)
}

/// Builds a dict, consuming `keys` and `values`. An error object when either
/// handle is dead or their lengths differ.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_dict(keys: *mut Obj, values: *mut Obj) -> *mut Obj {
    let result = match consume_pair(keys, values) {
        (Some(keys), Some(values)) => table::dict(keys, values),
        _ => Err(Error::Domain("dict needs live keys and values".into())),
    };
    give(into_object(result))
}

/// Builds a table from a SYMBOL vector of names and a LIST of equal-length
/// columns, consuming both.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_table(names: *mut Obj, columns: *mut Obj) -> *mut Obj {
    let result = match consume_pair(names, columns) {
        (Some(names), Some(columns)) => table::table(names, columns),
        _ => Err(Error::Domain("table needs live names and columns".into())),
    };
    give(into_object(result))
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_keys(obj: *const Obj) -> *mut Obj {
    borrow(obj, None, |o| Some(table::keys(o))).map_or_else(null_handle, give)
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_values(obj: *const Obj) -> *mut Obj {
    borrow(obj, None, |o| Some(table::values(o))).map_or_else(null_handle, give)
}

/// Value stored under atom `key`; the null object when absent.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_dict_get(dict: *const Obj, key: *const Obj) -> *mut Obj {
    let found = borrow(dict, None, |d| borrow(key, None, |k| Some(table::dict_get(d, k))));
    found.map_or_else(null_handle, give)
}

/// Column `name` of a table; the null object when there is no such column.
///
/// # Safety
/// `name` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_column(obj: *const Obj, name: *const u8, len: i64) -> *mut Obj {
    // SAFETY: upheld by the caller.
    let Some(name) = (unsafe { host_text(name, len) }) else {
        return null_handle();
    };
    borrow(obj, None, |o| Some(table::column(o, &name))).map_or_else(null_handle, give)
}

/// Row `index` of a table as a dict of column name to cell.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_row(obj: *const Obj, index: i64) -> *mut Obj {
    borrow(obj, None, |o| Some(table::row(o, index))).map_or_else(null_handle, give)
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_row_count(obj: *const Obj) -> i64 {
    borrow(obj, 0, |o| table::row_count(o) as i64)
}
