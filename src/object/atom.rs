//! Scalar payloads.

use crate::kind::{Kind, NULL_I16, NULL_I32, NULL_I64, NULL_SYMBOL};

/// A single scalar. Dates count days from 2000.01.01, times milliseconds
/// since midnight, timestamps nanoseconds from 2000.01.01T00:00.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Atom {
    Bool(bool),
    Byte(u8),
    I16(i16),
    I32(i32),
    I64(i64),
    Symbol(i64),
    Date(i32),
    Time(i32),
    Timestamp(i64),
    F64(f64),
    Guid([u8; 16]),
    Char(u8),
}

impl Atom {
    pub fn kind(&self) -> Kind {
        match self {
            Atom::Bool(_) => Kind::Bool,
            Atom::Byte(_) => Kind::Byte,
            Atom::I16(_) => Kind::I16,
            Atom::I32(_) => Kind::I32,
            Atom::I64(_) => Kind::I64,
            Atom::Symbol(_) => Kind::Symbol,
            Atom::Date(_) => Kind::Date,
            Atom::Time(_) => Kind::Time,
            Atom::Timestamp(_) => Kind::Timestamp,
            Atom::F64(_) => Kind::F64,
            Atom::Guid(_) => Kind::Guid,
            Atom::Char(_) => Kind::Char,
        }
    }

    pub fn is_null(&self) -> bool {
        match *self {
            Atom::I16(v) => v == NULL_I16,
            Atom::I32(v) | Atom::Date(v) | Atom::Time(v) => v == NULL_I32,
            Atom::I64(v) | Atom::Timestamp(v) => v == NULL_I64,
            Atom::Symbol(id) => id == NULL_SYMBOL,
            Atom::F64(v) => v.is_nan(),
            Atom::Guid(bytes) => bytes == [0; 16],
            Atom::Bool(_) | Atom::Byte(_) | Atom::Char(_) => false,
        }
    }

    /// Integral view of the atom, for arithmetic and indexing.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Atom::Bool(b) => Some(b as i64),
            Atom::Byte(v) => Some(v as i64),
            Atom::I16(v) => Some(v as i64),
            Atom::I32(v) => Some(v as i64),
            Atom::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Atom::F64(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sentinels() {
        assert!(Atom::I64(NULL_I64).is_null());
        assert!(Atom::F64(f64::NAN).is_null());
        assert!(Atom::Symbol(0).is_null());
        assert!(!Atom::Bool(false).is_null());
        assert!(!Atom::I32(0).is_null());
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Atom::I16(-3).as_i64(), Some(-3));
        assert_eq!(Atom::I32(7).as_f64(), Some(7.0));
        assert_eq!(Atom::Symbol(1).as_i64(), None);
    }
}
