//! Binary wire format.
//!
//! ```text
//! +-------+---------+-------------------+
//! | "CR"  | version | value             |
//! | 2 B   | 1 B     |                   |
//! +-------+---------+-------------------+
//!
//! value  := type:i8 payload
//! atom   := fixed-width little-endian scalar | text (symbols)
//! vector := len:u64 element*            (LIST/TABLE/DICT: value*)
//! error  := code:u8 has_msg:u8 [text] count:u32 (text value)*
//! text   := len:u32 utf8-bytes
//! ```
//!
//! Symbols travel as text so ids never leak between processes.

use crate::config::{MAX_NESTING, WIRE_MAGIC, WIRE_VERSION};
use crate::error::{Error, Result};
use crate::interner;
use crate::kind::Kind;
use crate::object::{Atom, Body, Buffer, ErrorCode, ErrorObject, Obj, ObjRef, Vector, table};

//===----------------------------------------------------------------------===//
// Encoding
//===----------------------------------------------------------------------===//

pub fn encode(obj: &Obj) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(16 + obj.byte_size());
    out.extend_from_slice(&WIRE_MAGIC);
    out.push(WIRE_VERSION);
    write_value(&mut out, obj)?;
    Ok(out)
}

fn write_text(out: &mut Vec<u8>, text: &str) -> Result<()> {
    let len = u32::try_from(text.len())
        .map_err(|_| Error::Length(format!("text of {} bytes is too long to encode", text.len())))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(text.as_bytes());
    Ok(())
}

fn write_symbol(out: &mut Vec<u8>, id: i64) -> Result<()> {
    write_text(out, &interner::resolve(id).unwrap_or_default())
}

fn write_atom(out: &mut Vec<u8>, atom: &Atom) -> Result<()> {
    match *atom {
        Atom::Bool(b) => out.push(b as u8),
        Atom::Byte(b) | Atom::Char(b) => out.push(b),
        Atom::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Atom::I32(v) | Atom::Date(v) | Atom::Time(v) => out.extend_from_slice(&v.to_le_bytes()),
        Atom::I64(v) | Atom::Timestamp(v) => out.extend_from_slice(&v.to_le_bytes()),
        Atom::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        Atom::Guid(bytes) => out.extend_from_slice(&bytes),
        Atom::Symbol(id) => write_symbol(out, id)?,
    }
    Ok(())
}

fn write_value(out: &mut Vec<u8>, obj: &Obj) -> Result<()> {
    out.push(obj.type_code() as u8);
    match &*obj.body() {
        Body::Null => {}
        Body::Atom(atom) => write_atom(out, atom)?,
        Body::Vector(vector) => {
            out.extend_from_slice(&(vector.len() as u64).to_le_bytes());
            match vector.buffer() {
                Buffer::U8(v) => out.extend_from_slice(v),
                Buffer::I16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                Buffer::I32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                Buffer::I64(v) if vector.kind() == Kind::Symbol => {
                    for &id in v {
                        write_symbol(out, id)?;
                    }
                }
                Buffer::I64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                Buffer::F64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
                Buffer::Guid(v) => v.iter().for_each(|g| out.extend_from_slice(g)),
                Buffer::Objects(items) => {
                    for item in items {
                        write_value(out, item)?;
                    }
                }
            }
        }
        Body::Error(err) => {
            out.push(err.code() as u8);
            match err.message() {
                Some(message) => {
                    out.push(1);
                    write_text(out, message)?;
                }
                None => out.push(0),
            }
            out.extend_from_slice(&(err.context().len() as u32).to_le_bytes());
            for (name, value) in err.context() {
                write_text(out, name)?;
                write_value(out, value)?;
            }
        }
    }
    Ok(())
}

//===----------------------------------------------------------------------===//
// Decoding
//===----------------------------------------------------------------------===//

pub fn decode(bytes: &[u8]) -> Result<ObjRef> {
    let mut cursor = Cursor { bytes, pos: 0 };
    let magic = cursor.take(2)?;
    if magic != WIRE_MAGIC {
        return Err(cursor.error_at("bad magic", 0));
    }
    let version = cursor.u8()?;
    if version != WIRE_VERSION {
        return Err(cursor.error_at(&format!("unsupported version {version}"), 2));
    }
    let value = cursor.value(0)?;
    if cursor.pos != bytes.len() {
        return Err(cursor.error("trailing bytes"));
    }
    Ok(value)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self) -> Result<$ty> {
            let bytes = self.take(std::mem::size_of::<$ty>())?;
            let mut raw = [0u8; std::mem::size_of::<$ty>()];
            raw.copy_from_slice(bytes);
            Ok(<$ty>::from_le_bytes(raw))
        }
    };
}

impl<'a> Cursor<'a> {
    fn error(&self, message: &str) -> Error {
        self.error_at(message, self.pos)
    }

    fn error_at(&self, message: &str, position: usize) -> Error {
        Error::Parse { message: message.to_owned(), position }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.error("unexpected end of input"));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    read_le!(u8, u8);
    read_le!(i16, i16);
    read_le!(i32, i32);
    read_le!(u32, u32);
    read_le!(i64, i64);
    read_le!(u64, u64);
    read_le!(f64, f64);

    fn text(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let start = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| self.error_at("invalid utf-8", start))
    }

    fn atom(&mut self, kind: Kind) -> Result<Atom> {
        Ok(match kind {
            Kind::Bool => Atom::Bool(self.u8()? != 0),
            Kind::Byte => Atom::Byte(self.u8()?),
            Kind::Char => Atom::Char(self.u8()?),
            Kind::I16 => Atom::I16(self.i16()?),
            Kind::I32 => Atom::I32(self.i32()?),
            Kind::Date => Atom::Date(self.i32()?),
            Kind::Time => Atom::Time(self.i32()?),
            Kind::I64 => Atom::I64(self.i64()?),
            Kind::Timestamp => Atom::Timestamp(self.i64()?),
            Kind::F64 => Atom::F64(self.f64()?),
            Kind::Guid => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(self.take(16)?);
                Atom::Guid(bytes)
            }
            Kind::Symbol => Atom::Symbol(interner::intern(&self.text()?)),
            _ => return Err(self.error(&format!("{kind} has no atom form"))),
        })
    }

    /// Element count of a vector, checked against the bytes left so a corrupt
    /// length cannot trigger a huge allocation.
    fn length(&mut self, kind: Kind) -> Result<usize> {
        let at = self.pos;
        let len = usize::try_from(self.u64()?).map_err(|_| self.error_at("length overflow", at))?;
        let min_width = match kind {
            Kind::Symbol => 4,
            k if k.holds_objects() => 1,
            k => k.element_size(),
        };
        if len.saturating_mul(min_width) > self.remaining() {
            return Err(self.error_at("length exceeds input", at));
        }
        Ok(len)
    }

    fn value(&mut self, depth: usize) -> Result<ObjRef> {
        if depth > MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        let at = self.pos;
        let code = self.u8()? as i8;
        let kind =
            Kind::from_type_code(code).ok_or_else(|| self.error_at("unknown type code", at))?;

        if code < 0 {
            if !kind.is_scalar() {
                return Err(self.error_at("invalid atom type", at));
            }
            return Ok(ObjRef::atom(self.atom(kind)?));
        }

        match kind {
            Kind::Null => Ok(ObjRef::null()),
            Kind::Error => self.error_value(depth),
            Kind::Lambda => Err(self.error_at("lambdas cannot be decoded", at)),
            Kind::List | Kind::Table | Kind::Dict => {
                let len = self.length(kind)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.value(depth + 1)?);
                }
                let shape = |err: Error| self.error_at(&err.to_string(), at);
                match (kind, <[ObjRef; 2]>::try_from(items)) {
                    (Kind::List, Ok(pair)) => Ok(ObjRef::list(pair.into())),
                    (Kind::List, Err(items)) => Ok(ObjRef::list(items)),
                    (Kind::Table, Ok([names, columns])) => {
                        table::table(names, columns).map_err(shape)
                    }
                    (Kind::Dict, Ok([keys, values])) => table::dict(keys, values).map_err(shape),
                    _ => Err(self.error_at("table or dict must have two parts", at)),
                }
            }
            Kind::Bool | Kind::Byte | Kind::Char => {
                let len = self.length(kind)?;
                Ok(ObjRef::vector(Vector::u8s(kind, self.take(len)?.to_vec())))
            }
            Kind::Symbol => {
                let len = self.length(kind)?;
                let ids = (0..len)
                    .map(|_| self.text().map(|t| interner::intern(&t)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ObjRef::vector(Vector::symbols(ids)))
            }
            _ => {
                let len = self.length(kind)?;
                let atoms = (0..len).map(|_| self.atom(kind)).collect::<Result<Vec<_>>>()?;
                Vector::from_atoms(kind, &atoms)
                    .map(ObjRef::vector)
                    .ok_or_else(|| self.error_at("invalid vector", at))
            }
        }
    }

    fn error_value(&mut self, depth: usize) -> Result<ObjRef> {
        let at = self.pos;
        let code = ErrorCode::from_code(self.u8()?)
            .ok_or_else(|| self.error_at("unknown error code", at))?;
        let message = match self.u8()? {
            0 => None,
            _ => Some(self.text()?),
        };
        let mut payload = ErrorObject::new(code, message);
        let count = self.u32()? as usize;
        if count > self.remaining() {
            return Err(self.error("context count exceeds input"));
        }
        for _ in 0..count {
            let name = self.text()?;
            let value = self.value(depth + 1)?;
            payload = payload.with_context(&name, value);
        }
        Ok(ObjRef::error(payload))
    }
}
