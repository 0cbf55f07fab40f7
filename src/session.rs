use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::csv::{self, CsvOptions};
use crate::engine::{BasicEngine, Engine};
use crate::error::into_object;
use crate::format;
use crate::object::{Obj, ObjRef};

/// Evaluation entry point for one host.
///
/// Owns its engine and its command counter, so two sessions never hand out
/// the same generated source name.
#[derive(Debug)]
pub struct Session<E: Engine = BasicEngine> {
    engine: E,
    config: SessionConfig,
    counter: u64,
}

impl Session<BasicEngine> {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self::with_engine(BasicEngine::new(), config)
    }
}

impl Default for Session<BasicEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> Session<E> {
    pub fn with_engine(engine: E, config: SessionConfig) -> Self {
        info!(prefix = config.command_prefix(), "session created");
        Self { engine, config, counter: 0 }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Evaluates `source` under `name`. An absent or empty name becomes
    /// `"{prefix}:{n}"` with `n` the next command number.
    pub fn evaluate(&mut self, source: &str, name: Option<&str>) -> ObjRef {
        let generated;
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => {
                self.counter += 1;
                generated = format!("{}:{}", self.config.command_prefix(), self.counter);
                generated.as_str()
            }
        };
        debug!(name, "evaluate");
        self.engine.eval(source, name)
    }

    pub fn command_counter(&self) -> u64 {
        self.counter
    }

    pub fn reset_command_counter(&mut self) {
        self.counter = 0;
    }

    pub fn format(&self, obj: &Obj) -> String {
        format::format(obj)
    }

    pub fn set_global(&mut self, name: &str, value: ObjRef) -> ObjRef {
        match self.engine.set_global(name, value) {
            Ok(()) => ObjRef::null(),
            Err(err) => err.into_object(),
        }
    }

    pub fn select(&self, query: &Obj) -> ObjRef {
        into_object(self.engine.select(query))
    }

    pub fn update(&self, query: &Obj) -> ObjRef {
        into_object(self.engine.update(query))
    }

    pub fn insert(&self, table: &Obj, data: &Obj) -> ObjRef {
        into_object(self.engine.insert(table, data))
    }

    pub fn upsert(&self, table: &Obj, key_count: i64, data: &Obj) -> ObjRef {
        into_object(self.engine.upsert(table, key_count, data))
    }

    pub fn serialize(&self, obj: &Obj) -> ObjRef {
        into_object(self.engine.serialize(obj))
    }

    pub fn deserialize(&self, bytes: &Obj) -> ObjRef {
        into_object(self.engine.deserialize(bytes))
    }

    /// Parses CSV text with this session's separator and size limit, using the
    /// engine to read the data rows.
    pub fn parse_csv(&self, text: &[u8]) -> ObjRef {
        let options = CsvOptions::from(&self.config);
        into_object(csv::read_csv(text, &options, &self.engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;
    use crate::object::{Atom, table};

    fn source_of(err: &ObjRef) -> Option<String> {
        table::dict_get(&err.error_info(), &ObjRef::symbol("source")).as_text()
    }

    #[test]
    fn test_generated_names_count_up() {
        let mut session = Session::new();
        let err = session.evaluate("(raise \"a\")", None);
        assert_eq!(source_of(&err).as_deref(), Some("cmd:1"));
        let err = session.evaluate("(raise \"b\")", Some(""));
        assert_eq!(source_of(&err).as_deref(), Some("cmd:2"));
        assert_eq!(session.command_counter(), 2);
    }

    #[test]
    fn test_explicit_name_leaves_counter() {
        let mut session = Session::new();
        let err = session.evaluate("(raise \"a\")", Some("init.q"));
        assert_eq!(source_of(&err).as_deref(), Some("init.q"));
        assert_eq!(session.command_counter(), 0);
    }

    #[test]
    fn test_reset_counter() {
        let mut session = Session::new();
        session.evaluate("1", None);
        session.evaluate("2", None);
        session.reset_command_counter();
        let err = session.evaluate("(raise \"x\")", None);
        assert_eq!(source_of(&err).as_deref(), Some("cmd:1"));
    }

    #[test]
    fn test_custom_prefix() {
        let config = SessionConfig::builder().command_prefix("py").build().unwrap();
        let mut session = Session::with_config(config);
        let err = session.evaluate("(raise \"x\")", None);
        assert_eq!(source_of(&err).as_deref(), Some("py:1"));
    }

    #[test]
    fn test_set_global_then_evaluate() {
        let mut session = Session::new();
        assert!(session.set_global("t", ObjRef::atom(Atom::I64(5))).is_null());
        assert_eq!(session.evaluate("(* t 2)", None).as_atom(), Some(Atom::I64(10)));
        assert!(session.set_global("", ObjRef::null()).is_error());
    }

    #[test]
    fn test_parse_csv_uses_separator() {
        let config = SessionConfig::builder().csv_separator(b';').build().unwrap();
        let session = Session::with_config(config);
        let table = session.parse_csv(b"a;b\n1;2\n");
        assert_eq!(table.kind(), Kind::Table);
        assert_eq!(table::column(&table, "b").get(0).as_text().as_deref(), Some("2"));
    }

    #[test]
    fn test_errors_become_objects() {
        let session = Session::new();
        let err = session.select(&ObjRef::null());
        assert!(err.is_error());
    }
}
