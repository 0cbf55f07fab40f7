//! ERROR objects.
//!
//! User errors carry their own message. Engine errors are identified by a
//! code whose canonical name doubles as their message at the boundary.

use std::ffi::{CStr, CString, c_char};

use crate::error::code_symbol;
use crate::interner;
use crate::kind::Kind;

use super::{Atom, ObjRef, Vector, table};

pub const UNKNOWN_ERROR: &str = "Unknown error";
pub const OUT_OF_MEMORY: &str = "Out of memory";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    User = 0,
    Type = 1,
    Arity = 2,
    Length = 3,
    Index = 4,
    Domain = 5,
    Value = 6,
    Parse = 7,
    Nyi = 8,
}

impl ErrorCode {
    pub fn from_code(code: u8) -> Option<ErrorCode> {
        Some(match code {
            0 => ErrorCode::User,
            1 => ErrorCode::Type,
            2 => ErrorCode::Arity,
            3 => ErrorCode::Length,
            4 => ErrorCode::Index,
            5 => ErrorCode::Domain,
            6 => ErrorCode::Value,
            7 => ErrorCode::Parse,
            8 => ErrorCode::Nyi,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        self.c_name().to_str().unwrap_or("error")
    }

    pub fn c_name(self) -> &'static CStr {
        match self {
            ErrorCode::User => c"user",
            ErrorCode::Type => c"type",
            ErrorCode::Arity => c"arity",
            ErrorCode::Length => c"length",
            ErrorCode::Index => c"index",
            ErrorCode::Domain => c"domain",
            ErrorCode::Value => c"value",
            ErrorCode::Parse => c"parse",
            ErrorCode::Nyi => c"nyi",
        }
    }
}

#[derive(Debug)]
pub struct ErrorObject {
    code: ErrorCode,
    message: Option<CString>,
    context: Vec<(String, ObjRef)>,
}

fn to_c_string(text: String) -> CString {
    let bytes: Vec<u8> =
        text.into_bytes().into_iter().map(|b| if b == 0 { b' ' } else { b }).collect();
    CString::new(bytes).unwrap_or_default()
}

impl ErrorObject {
    pub fn new(code: ErrorCode, message: Option<String>) -> Self {
        Self { code, message: message.map(to_c_string), context: Vec::new() }
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::User, Some(message.into()))
    }

    /// Appends a context entry; a later entry with the same name replaces
    /// the earlier one.
    pub fn with_context(mut self, name: &str, value: ObjRef) -> Self {
        self.context.retain(|(existing, _)| existing != name);
        self.context.push((name.to_owned(), value));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().and_then(|m| m.to_str().ok())
    }

    pub fn context(&self) -> &[(String, ObjRef)] {
        &self.context
    }

    /// The boundary message: the inline text for user errors, the code name
    /// otherwise. Never empty.
    pub fn display_message(&self) -> &str {
        match self.code {
            ErrorCode::User => match self.message() {
                Some(msg) if !msg.is_empty() => msg,
                _ => OUT_OF_MEMORY,
            },
            code => code.name(),
        }
    }

    /// [`ErrorObject::display_message`] as a NUL-terminated pointer that
    /// borrows from this object or from static storage.
    pub fn display_message_ptr(&self) -> *const c_char {
        match self.code {
            ErrorCode::User => match &self.message {
                Some(msg) if !msg.is_empty() => msg.as_ptr(),
                _ => c"Out of memory".as_ptr(),
            },
            code => code.c_name().as_ptr(),
        }
    }

    /// Dict of `code`, `message` (when present) and every context entry.
    pub fn info(&self) -> ObjRef {
        let mut keys = Vec::with_capacity(self.context.len() + 2);
        let mut values = Vec::with_capacity(self.context.len() + 2);

        keys.push(interner::intern("code"));
        values.push(ObjRef::atom(Atom::Symbol(code_symbol(self.code))));

        if let Some(msg) = self.message() {
            keys.push(interner::intern("message"));
            values.push(ObjRef::string(msg));
        }
        for (name, value) in &self.context {
            keys.push(interner::intern(name));
            values.push(value.clone());
        }

        let keys = ObjRef::vector(Vector::symbols(keys));
        let values = ObjRef::vector(Vector::objects(Kind::List, values));
        table::dict(keys, values).unwrap_or_else(|err| err.into_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let err = ErrorObject::user("CSV has no lines");
        assert_eq!(err.display_message(), "CSV has no lines");
        let ptr = err.display_message_ptr();
        assert_eq!(unsafe { CStr::from_ptr(ptr) }.to_str().unwrap(), "CSV has no lines");
    }

    #[test]
    fn test_user_without_message_is_oom() {
        let err = ErrorObject::new(ErrorCode::User, None);
        assert_eq!(err.display_message(), OUT_OF_MEMORY);
        assert!(!err.display_message_ptr().is_null());
    }

    #[test]
    fn test_engine_error_uses_code_name() {
        let err = ErrorObject::new(ErrorCode::Type, Some("expected I64, got F64".into()));
        assert_eq!(err.display_message(), "type");
        assert_eq!(err.message(), Some("expected I64, got F64"));
    }

    #[test]
    fn test_interior_nul_is_replaced() {
        let err = ErrorObject::user("a\0b");
        assert_eq!(err.message(), Some("a b"));
    }

    #[test]
    fn test_context_replaces_same_name() {
        let err = ErrorObject::user("x")
            .with_context("source", ObjRef::string("a"))
            .with_context("source", ObjRef::string("b"));
        assert_eq!(err.context().len(), 1);
        assert_eq!(err.context()[0].1.as_text().as_deref(), Some("b"));
    }

    #[test]
    fn test_code_roundtrip() {
        for code in 0..9 {
            assert_eq!(ErrorCode::from_code(code).map(|c| c as u8), Some(code));
        }
        assert_eq!(ErrorCode::from_code(9), None);
    }
}
