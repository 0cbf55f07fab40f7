use std::ffi::c_char;

use crate::interner;
use crate::kind::NULL_SYMBOL;

use super::host_text;

/// Interns `len` bytes of text. Null text or a negative length interns
/// nothing and returns the null symbol.
///
/// # Safety
/// `text` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_intern(text: *const u8, len: i64) -> i64 {
    // SAFETY: upheld by the caller.
    match unsafe { host_text(text, len) } {
        Some(name) => interner::intern(&name),
        None => NULL_SYMBOL,
    }
}

/// Text of symbol `id`, NUL-terminated and valid for the rest of the process.
/// Null for unknown ids.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_resolve(id: i64) -> *const c_char {
    interner::resolve_ptr(id)
}
