use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::ffi::c_char;
use std::sync::{Mutex, PoisonError};

use crate::kind::NULL_SYMBOL;

struct Table {
    map: FxHashMap<String, i64>, // text -> id
    rev: Vec<Box<[u8]>>,         // id -> text plus a trailing NUL
}

impl Table {
    fn new() -> Self {
        let mut table = Self { map: FxHashMap::default(), rev: Vec::new() };
        // Id 0 is the empty symbol.
        table.intern("");
        table
    }

    fn intern(&mut self, s: &str) -> i64 {
        if let Some(&id) = self.map.get(s) {
            return id;
        }
        let id = self.rev.len() as i64;
        let mut bytes = Vec::with_capacity(s.len() + 1);
        bytes.extend_from_slice(s.as_bytes());
        bytes.push(0);
        self.rev.push(bytes.into_boxed_slice());
        self.map.insert(s.to_owned(), id);
        id
    }

    fn entry(&self, id: i64) -> Option<&[u8]> {
        usize::try_from(id).ok().and_then(|index| self.rev.get(index)).map(|b| &**b)
    }

    fn resolve(&self, id: i64) -> Option<&str> {
        let bytes = self.entry(id)?;
        std::str::from_utf8(&bytes[..bytes.len() - 1]).ok()
    }
}

static INTERNER: Lazy<Mutex<Table>> = Lazy::new(|| Mutex::new(Table::new()));

fn with_table<R>(f: impl FnOnce(&mut Table) -> R) -> R {
    let mut table = INTERNER.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut table)
}

/// Interns `s` and returns its id. Equal text always yields the same id and
/// the empty string is [`NULL_SYMBOL`].
pub fn intern(s: &str) -> i64 {
    if s.is_empty() {
        return NULL_SYMBOL;
    }
    with_table(|table| table.intern(s))
}

pub fn resolve(id: i64) -> Option<String> {
    with_table(|table| table.resolve(id).map(str::to_owned))
}

/// NUL-terminated text of `id`, or null for an unknown id. Entries are never
/// freed and their storage never moves, so the pointer stays valid for the
/// life of the process.
pub fn resolve_ptr(id: i64) -> *const c_char {
    with_table(|table| table.entry(id).map_or(std::ptr::null(), |b| b.as_ptr().cast()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_intern_same_symbol_returns_same_id() {
        let id1 = intern("price");
        let id2 = intern("price");
        assert_eq!(id1, id2);
        assert_eq!(resolve(id1).as_deref(), Some("price"));
    }

    #[test]
    fn test_intern_different_symbols_returns_different_ids() {
        assert_ne!(intern("bid"), intern("ask"));
    }

    #[test]
    fn test_empty_is_null_symbol() {
        assert_eq!(intern(""), NULL_SYMBOL);
        assert_eq!(resolve(NULL_SYMBOL).as_deref(), Some(""));
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(resolve(-1), None);
        assert_eq!(resolve(i64::MAX), None);
        assert!(resolve_ptr(-1).is_null());
    }

    #[test]
    fn test_pointer_is_stable() {
        let id = intern("stable");
        let ptr = resolve_ptr(id);
        for i in 0..256 {
            intern(&format!("filler{i}"));
        }
        assert_eq!(ptr, resolve_ptr(id));
        assert_eq!(unsafe { CStr::from_ptr(ptr) }.to_str().unwrap(), "stable");
    }
}
