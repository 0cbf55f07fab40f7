//! Type codes for objects crossing the boundary.
//!
//! The numeric values are part of the ABI: hosts hard-code them. An atom
//! reports the negated code of its kind through `type_of`, a vector the
//! positive code.
//!
//! ```text
//!   0 List       5 I64        10 F64        98 Table
//!   1 Bool       6 Symbol     11 Guid       99 Dict
//!   2 Byte       7 Date       12 Char      100 Lambda
//!   3 I16        8 Time                    126 Null
//!   4 I32        9 Timestamp               127 Error
//! ```

use std::fmt;

use crate::object::ObjRef;

pub const NULL_I16: i16 = i16::MIN;
pub const NULL_I32: i32 = i32::MIN;
pub const NULL_I64: i64 = i64::MIN;
pub const NULL_F64: f64 = f64::NAN;

/// Interned id of the empty symbol.
pub const NULL_SYMBOL: i64 = 0;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    List = 0,
    Bool = 1,
    Byte = 2,
    I16 = 3,
    I32 = 4,
    I64 = 5,
    Symbol = 6,
    Date = 7,
    Time = 8,
    Timestamp = 9,
    F64 = 10,
    Guid = 11,
    Char = 12,
    Table = 98,
    Dict = 99,
    Lambda = 100,
    Null = 126,
    Error = 127,
}

impl Kind {
    pub const ALL: [Kind; 18] = [
        Kind::List,
        Kind::Bool,
        Kind::Byte,
        Kind::I16,
        Kind::I32,
        Kind::I64,
        Kind::Symbol,
        Kind::Date,
        Kind::Time,
        Kind::Timestamp,
        Kind::F64,
        Kind::Guid,
        Kind::Char,
        Kind::Table,
        Kind::Dict,
        Kind::Lambda,
        Kind::Null,
        Kind::Error,
    ];

    pub fn from_code(code: u8) -> Option<Kind> {
        Self::ALL.iter().copied().find(|kind| *kind as u8 == code)
    }

    /// Decodes a signed type code, ignoring the atom/vector sign.
    pub fn from_type_code(code: i8) -> Option<Kind> {
        Self::from_code(code.unsigned_abs())
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Size of one element in a flat buffer of this kind, 0 when the kind
    /// has no flat representation.
    pub fn element_size(self) -> usize {
        match self {
            Kind::Bool | Kind::Byte | Kind::Char => 1,
            Kind::I16 => 2,
            Kind::I32 | Kind::Date | Kind::Time => 4,
            Kind::I64 | Kind::Symbol | Kind::F64 | Kind::Timestamp => 8,
            Kind::Guid => 16,
            Kind::List => std::mem::size_of::<ObjRef>(),
            Kind::Table | Kind::Dict | Kind::Lambda | Kind::Null | Kind::Error => 0,
        }
    }

    /// Kinds whose vectors hold object handles rather than scalars.
    pub fn holds_objects(self) -> bool {
        matches!(self, Kind::List | Kind::Table | Kind::Dict)
    }

    /// Kinds that have both an atom and a flat vector form.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Kind::Bool
                | Kind::Byte
                | Kind::I16
                | Kind::I32
                | Kind::I64
                | Kind::Symbol
                | Kind::Date
                | Kind::Time
                | Kind::Timestamp
                | Kind::F64
                | Kind::Guid
                | Kind::Char
        )
    }

    fn base_name(self) -> &'static str {
        match self {
            Kind::List => "List",
            Kind::Bool => "b8",
            Kind::Byte => "u8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::Symbol => "symbol",
            Kind::Date => "date",
            Kind::Time => "time",
            Kind::Timestamp => "timestamp",
            Kind::F64 => "f64",
            Kind::Guid => "guid",
            Kind::Char => "c8",
            Kind::Table => "Table",
            Kind::Dict => "Dict",
            Kind::Lambda => "Lambda",
            Kind::Null => "Null",
            Kind::Error => "Error",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

/// Element size for a signed type code. Unknown codes report 0.
pub fn element_size(code: i8) -> usize {
    Kind::from_type_code(code).map_or(0, Kind::element_size)
}

/// Human-readable name of a signed type code: lowercase for atoms,
/// capitalized for vectors (`i64` vs `I64`).
pub fn type_name(code: i8) -> &'static str {
    let Some(kind) = Kind::from_type_code(code) else {
        return "unknown";
    };
    if code >= 0 && kind.is_scalar() {
        return match kind {
            Kind::Bool => "B8",
            Kind::Byte => "U8",
            Kind::I16 => "I16",
            Kind::I32 => "I32",
            Kind::I64 => "I64",
            Kind::Symbol => "Symbol",
            Kind::Date => "Date",
            Kind::Time => "Time",
            Kind::Timestamp => "Timestamp",
            Kind::F64 => "F64",
            Kind::Guid => "Guid",
            Kind::Char => "String",
            _ => kind.base_name(),
        };
    }
    kind.base_name()
}
