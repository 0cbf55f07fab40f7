//! The database engine seen from the binding layer.
//!
//! Everything the boundary needs from an engine goes through [`Engine`].
//! [`BasicEngine`] is the bundled implementation: a small prefix-notation
//! expression language, table operators over the object model, and the
//! binary wire format in [`wire`].

pub mod eval;
pub mod query;
pub mod reader;
pub mod wire;

use tracing::{debug, warn};

use crate::csv::{CsvRowReader, RowLayout, RowReader};
use crate::error::{Error, Result};
use crate::kind::{Kind, type_name};
use crate::object::{Atom, Body, Obj, ObjRef, Vector};

use eval::{Globals, Located};

pub trait Engine: RowReader {
    /// Evaluates `source`. Failures come back as ERROR objects whose context
    /// names `source` and the byte `position` of the failing form.
    fn eval(&mut self, source: &str, name: &str) -> ObjRef;

    fn set_global(&mut self, name: &str, value: ObjRef) -> Result<()>;

    fn select(&self, query: &Obj) -> Result<ObjRef>;

    fn update(&self, query: &Obj) -> Result<ObjRef>;

    fn insert(&self, table: &Obj, data: &Obj) -> Result<ObjRef>;

    fn upsert(&self, table: &Obj, key_count: i64, data: &Obj) -> Result<ObjRef>;

    /// Encodes `obj` into a BYTE vector.
    fn serialize(&self, obj: &Obj) -> Result<ObjRef>;

    /// Decodes a BYTE vector produced by [`Engine::serialize`].
    fn deserialize(&self, bytes: &Obj) -> Result<ObjRef>;
}

#[derive(Debug, Default)]
pub struct BasicEngine {
    globals: Globals,
    rows: CsvRowReader,
}

impl BasicEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

fn located_error(located: Located, name: &str) -> ObjRef {
    let Located { error, position } = located;
    ObjRef::error(
        error
            .into_payload()
            .with_context("source", ObjRef::string(name))
            .with_context("position", ObjRef::atom(Atom::I64(position as i64))),
    )
}

impl Engine for BasicEngine {
    fn eval(&mut self, source: &str, name: &str) -> ObjRef {
        debug!(name, bytes = source.len(), "eval");
        let result = reader::read(source)
            .map_err(|error| {
                let position = match &error {
                    Error::Parse { position, .. } => *position,
                    _ => 0,
                };
                Located { error, position }
            })
            .and_then(|nodes| eval::eval_program(&mut self.globals, &nodes));

        match result {
            Ok(value) => value,
            Err(located) => {
                warn!(
                    name,
                    position = located.position,
                    error = %located.error,
                    "evaluation failed"
                );
                located_error(located, name)
            }
        }
    }

    fn set_global(&mut self, name: &str, value: ObjRef) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Domain("global name must not be empty".into()));
        }
        self.globals.set(name, value);
        Ok(())
    }

    fn select(&self, query: &Obj) -> Result<ObjRef> {
        query::select(query)
    }

    fn update(&self, query: &Obj) -> Result<ObjRef> {
        query::update(query)
    }

    fn insert(&self, table: &Obj, data: &Obj) -> Result<ObjRef> {
        query::insert(table, data)
    }

    fn upsert(&self, table: &Obj, key_count: i64, data: &Obj) -> Result<ObjRef> {
        query::upsert(table, key_count, data)
    }

    fn serialize(&self, obj: &Obj) -> Result<ObjRef> {
        let bytes = wire::encode(obj)?;
        Ok(ObjRef::vector(Vector::u8s(Kind::Byte, bytes)))
    }

    fn deserialize(&self, bytes: &Obj) -> Result<ObjRef> {
        if bytes.kind() != Kind::Byte || !bytes.is_vector() {
            return Err(Error::type_mismatch(Kind::Byte, type_name(bytes.type_code())));
        }
        let body = bytes.body();
        let data = match &*body {
            Body::Vector(vector) => vector.bytes().unwrap_or_default(),
            _ => &[],
        };
        wire::decode(data)
    }
}

impl RowReader for BasicEngine {
    fn read_rows(
        &self,
        body: &[u8],
        layout: &RowLayout,
        columns: &mut [Vec<ObjRef>],
    ) -> Result<()> {
        self.rows.read_rows(body, layout, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ErrorCode;
    use crate::object::table;

    fn context(err: &ObjRef, key: &str) -> ObjRef {
        table::dict_get(&err.error_info(), &ObjRef::symbol(key))
    }

    #[test]
    fn test_eval_arithmetic() {
        let mut engine = BasicEngine::new();
        let value = engine.eval("(+ 1 2)", "t");
        assert_eq!(value.as_atom(), Some(Atom::I64(3)));
    }

    #[test]
    fn test_globals_persist_between_evals() {
        let mut engine = BasicEngine::new();
        engine.eval("(set 'x [1 2 3])", "a");
        let value = engine.eval("(sum x)", "b");
        assert_eq!(value.as_atom(), Some(Atom::I64(6)));
    }

    #[test]
    fn test_error_carries_source_and_position() {
        let mut engine = BasicEngine::new();
        let err = engine.eval("(+ 1 missing)", "cmd:7");
        assert_eq!(err.error_code(), Some(ErrorCode::Value));
        assert_eq!(context(&err, "source").as_text().as_deref(), Some("cmd:7"));
        assert_eq!(context(&err, "position").as_atom(), Some(Atom::I64(5)));
    }

    #[test]
    fn test_parse_error_position() {
        let mut engine = BasicEngine::new();
        let err = engine.eval("1 (+ 2", "p");
        assert_eq!(err.error_code(), Some(ErrorCode::Parse));
        assert_eq!(context(&err, "position").as_atom(), Some(Atom::I64(2)));
    }

    #[test]
    fn test_set_global_visible_to_eval() {
        let mut engine = BasicEngine::new();
        engine.set_global("n", ObjRef::atom(Atom::I64(41))).unwrap();
        assert_eq!(engine.eval("(+ n 1)", "g").as_atom(), Some(Atom::I64(42)));
        assert!(engine.set_global("", ObjRef::null()).is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let engine = BasicEngine::new();
        let bytes = engine.serialize(&ObjRef::string("hi")).unwrap();
        assert_eq!(bytes.kind(), Kind::Byte);
        let back = engine.deserialize(&bytes).unwrap();
        assert_eq!(back.as_text().as_deref(), Some("hi"));
    }

    #[test]
    fn test_deserialize_rejects_non_bytes() {
        let engine = BasicEngine::new();
        let err = engine.deserialize(&ObjRef::string("CR")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Type);
    }
}
