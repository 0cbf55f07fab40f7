use crate::csv::{self, EMPTY_INPUT, NULL_INPUT};
use crate::error::Error;
use crate::object::Obj;

use super::{give, host_bytes};

/// Parses `len` bytes of CSV into a table with the default options. Returns
/// an error object on failure; the first line is the header.
///
/// # Safety
/// `text` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_parse_csv(text: *const u8, len: i64) -> *mut Obj {
    if text.is_null() {
        return give(Error::user(NULL_INPUT).into_object());
    }
    if len <= 0 {
        return give(Error::user(EMPTY_INPUT).into_object());
    }
    // SAFETY: upheld by the caller.
    match unsafe { host_bytes(text, len) } {
        Some(bytes) => give(csv::parse(bytes)),
        None => give(Error::user(NULL_INPUT).into_object()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::colrt_release;
    use crate::ffi::introspect::{colrt_error_message, colrt_type_of};
    use crate::ffi::table::colrt_row_count;
    use std::ffi::CStr;

    fn message(obj: *const Obj) -> String {
        unsafe { CStr::from_ptr(colrt_error_message(obj)) }.to_string_lossy().into_owned()
    }

    #[test]
    fn test_parse_from_host_buffer() {
        let text = b"a,b\n1,2\n3,4";
        let table = unsafe { colrt_parse_csv(text.as_ptr(), text.len() as i64) };
        assert_eq!(colrt_type_of(table), 98);
        assert_eq!(colrt_row_count(table), 2);
        colrt_release(table);
    }

    #[test]
    fn test_length_is_authoritative() {
        let text = b"a,b\n1,2\nignored";
        let table = unsafe { colrt_parse_csv(text.as_ptr(), 7) };
        assert_eq!(colrt_row_count(table), 1);
        colrt_release(table);
    }

    #[test]
    fn test_input_errors() {
        let err = unsafe { colrt_parse_csv(b"a".as_ptr(), 0) };
        assert_eq!(message(err), "CSV length is zero or negative");
        colrt_release(err);
        let err = unsafe { colrt_parse_csv(std::ptr::null(), 5) };
        assert_eq!(message(err), "CSV content is NULL");
        colrt_release(err);
    }

    #[test]
    fn test_null_content_reported_before_length() {
        let err = unsafe { colrt_parse_csv(std::ptr::null(), 0) };
        assert_eq!(message(err), "CSV content is NULL");
        colrt_release(err);
    }
}
