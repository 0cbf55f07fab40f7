use crate::interner;
use crate::object::error::{ErrorCode, ErrorObject};
use crate::object::{Atom, ObjRef};

//===----------------------------------------------------------------------===//
// Error
//===----------------------------------------------------------------------===//

/// Failures raised inside the runtime. They become ERROR objects once they
/// reach the boundary, see [`Error::into_object`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Ingestion and validation failures with a human-readable message.
    #[error("{0}")]
    User(String),

    #[error("expected {expected}, got {got}")]
    Type { expected: String, got: String },

    #[error("{name}: expected {expected} arguments, got {got}")]
    Arity { name: String, expected: usize, got: usize },

    #[error("{0}")]
    Length(String),

    #[error("index {index} out of range for length {len}")]
    Index { index: i64, len: usize },

    #[error("{0}")]
    Domain(String),

    #[error("undefined: {0}")]
    Value(String),

    #[error("{message} at byte {position}")]
    Parse { message: String, position: usize },

    #[error("not yet implemented: {0}")]
    Nyi(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn user(msg: impl Into<String>) -> Self {
        Error::User(msg.into())
    }

    pub fn type_mismatch(expected: impl ToString, got: impl ToString) -> Self {
        Error::Type { expected: expected.to_string(), got: got.to_string() }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Error::User(_) => ErrorCode::User,
            Error::Type { .. } => ErrorCode::Type,
            Error::Arity { .. } => ErrorCode::Arity,
            Error::Length(_) => ErrorCode::Length,
            Error::Index { .. } => ErrorCode::Index,
            Error::Domain(_) => ErrorCode::Domain,
            Error::Value(_) => ErrorCode::Value,
            Error::Parse { .. } => ErrorCode::Parse,
            Error::Nyi(_) => ErrorCode::Nyi,
        }
    }

    /// Converts into an error payload, keeping the structured fields as
    /// context entries.
    pub fn into_payload(self) -> ErrorObject {
        let payload = ErrorObject::new(self.code(), Some(self.to_string()));
        match self {
            Error::Type { expected, got } => payload
                .with_context("expected", ObjRef::symbol(&expected))
                .with_context("got", ObjRef::symbol(&got)),
            Error::Arity { name, expected, got } => payload
                .with_context("function", ObjRef::symbol(&name))
                .with_context("expected", ObjRef::atom(Atom::I64(expected as i64)))
                .with_context("got", ObjRef::atom(Atom::I64(got as i64))),
            Error::Index { index, len } => payload
                .with_context("index", ObjRef::atom(Atom::I64(index)))
                .with_context("length", ObjRef::atom(Atom::I64(len as i64))),
            Error::Value(name) => payload.with_context("name", ObjRef::symbol(&name)),
            Error::Parse { position, .. } => {
                payload.with_context("position", ObjRef::atom(Atom::I64(position as i64)))
            }
            Error::User(_) | Error::Length(_) | Error::Domain(_) | Error::Nyi(_) => payload,
        }
    }

    pub fn into_object(self) -> ObjRef {
        ObjRef::error(self.into_payload())
    }
}

impl From<Error> for ObjRef {
    fn from(err: Error) -> Self {
        err.into_object()
    }
}

/// Collapses a fallible result into the object-or-error convention used at
/// the boundary.
pub fn into_object(result: Result<ObjRef>) -> ObjRef {
    result.unwrap_or_else(Error::into_object)
}

/// Symbol id used as the `code` entry of an error info dict.
pub(crate) fn code_symbol(code: ErrorCode) -> i64 {
    interner::intern(code.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Error::user("x").code(), ErrorCode::User);
        assert_eq!(Error::type_mismatch("I64", "F64").code(), ErrorCode::Type);
        assert_eq!(Error::Nyi("select".into()).code(), ErrorCode::Nyi);
    }

    #[test]
    fn test_display() {
        let err = Error::Index { index: 7, len: 3 };
        assert_eq!(err.to_string(), "index 7 out of range for length 3");
        let err = Error::Parse { message: "unexpected )".into(), position: 4 };
        assert_eq!(err.to_string(), "unexpected ) at byte 4");
    }

    #[test]
    fn test_into_object_is_error() {
        let obj = Error::user("boom").into_object();
        assert!(obj.is_error());
        assert_eq!(obj.error_message(), "boom");
    }

    #[test]
    fn test_context_entries() {
        let payload = Error::Index { index: 9, len: 2 }.into_payload();
        let keys: Vec<_> = payload.context().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["index", "length"]);
    }
}
