use std::ffi::{CStr, c_char};

use crate::logging;

/// Installs the stderr log subscriber. `filter` is an optional
/// NUL-terminated `EnvFilter` directive used when `RUST_LOG` is unset.
/// Returns false when a subscriber was already installed.
///
/// # Safety
/// `filter` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_init_logging(filter: *const c_char) -> bool {
    let filter = if filter.is_null() {
        None
    } else {
        // SAFETY: upheld by the caller.
        unsafe { CStr::from_ptr(filter) }.to_str().ok()
    };
    logging::init(filter)
}
