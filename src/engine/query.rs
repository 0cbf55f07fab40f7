//! Table operators of the bundled engine.
//!
//! Queries are dicts keyed by symbols:
//!
//! | key       | select | update | meaning                                   |
//! |-----------|--------|--------|-------------------------------------------|
//! | `from`    | yes    | yes    | source table (required)                   |
//! | `columns` | yes    |        | symbol or symbols to keep                 |
//! | `where`   | yes    | yes    | dict of column -> value, rows must match  |
//! | `take`    | yes    |        | first n rows, or last n when negative     |
//! | `set`     |        | yes    | dict of column -> atom or full column     |
//!
//! Every operator returns a new table; inputs are never modified.

use crate::error::{Error, Result};
use crate::interner;
use crate::kind::Kind;
use crate::object::{Atom, Body, Obj, ObjRef, Vector, table};

//===----------------------------------------------------------------------===//
// Helpers
//===----------------------------------------------------------------------===//

fn field(query: &Obj, name: &str) -> Option<ObjRef> {
    let value = table::dict_get(query, &ObjRef::symbol(name));
    let absent = matches!(&*value.body(), Body::Null);
    (!absent).then_some(value)
}

fn required(query: &Obj, name: &str) -> Result<ObjRef> {
    field(query, name).ok_or_else(|| Error::Value(name.to_owned()))
}

fn expect_kind(obj: &Obj, kind: Kind) -> Result<()> {
    if obj.kind() != kind || !obj.is_vector() {
        return Err(Error::type_mismatch(kind, obj.kind()));
    }
    Ok(())
}

/// Names and column handles of a table.
fn columns_of(source: &Obj) -> Result<(Vec<i64>, Vec<ObjRef>)> {
    expect_kind(source, Kind::Table)?;
    let names = table::keys(source);
    let columns = table::values(source);
    let ids = (0..names.len())
        .filter_map(|i| match names.get(i as i64).as_atom() {
            Some(Atom::Symbol(id)) => Some(id),
            _ => None,
        })
        .collect();
    let handles = (0..columns.len()).map(|i| columns.get(i as i64)).collect();
    Ok((ids, handles))
}

fn build(names: Vec<i64>, columns: Vec<ObjRef>) -> Result<ObjRef> {
    table::table(ObjRef::vector(Vector::symbols(names)), ObjRef::list(columns))
}

/// A private copy of a column that can be mutated freely.
fn copy_column(column: &Obj) -> Result<ObjRef> {
    match &*column.body() {
        Body::Vector(vector) => Ok(ObjRef::vector(vector.clone())),
        _ => Err(Error::type_mismatch("column vector", column.kind())),
    }
}

/// Builds a column of the same kind holding `rows` of `column`.
fn take_rows(column: &Obj, rows: &[usize]) -> Result<ObjRef> {
    match &*column.body() {
        Body::Vector(vector) if vector.kind().holds_objects() => {
            let items = rows.iter().filter_map(|&r| vector.get(r)).collect();
            Ok(ObjRef::list(items))
        }
        Body::Vector(vector) => {
            let atoms: Vec<Atom> = rows.iter().filter_map(|&r| vector.atom_at(r)).collect();
            Vector::from_atoms(vector.kind(), &atoms)
                .map(ObjRef::vector)
                .ok_or_else(|| Error::type_mismatch(vector.kind(), "mixed cells"))
        }
        _ => Err(Error::type_mismatch("column vector", column.kind())),
    }
}

/// Cell equality: atoms by value, text (strings and symbols) by content,
/// anything else by identity.
pub(crate) fn cells_equal(a: &Obj, b: &Obj) -> bool {
    if let (Some(x), Some(y)) = (a.as_atom(), b.as_atom()) {
        return x == y;
    }
    match (a.as_text(), b.as_text()) {
        (Some(x), Some(y)) => x == y,
        _ => std::ptr::eq(a, b),
    }
}

fn position_of(names: &[i64], name: i64) -> Option<usize> {
    names.iter().position(|&n| n == name)
}

fn symbol_ids(obj: &Obj) -> Result<Vec<i64>> {
    match &*obj.body() {
        Body::Atom(Atom::Symbol(id)) => Ok(vec![*id]),
        Body::Vector(vector) if vector.kind() == Kind::Symbol => Ok((0..vector.len())
            .filter_map(|i| match vector.atom_at(i) {
                Some(Atom::Symbol(id)) => Some(id),
                _ => None,
            })
            .collect()),
        _ => Err(Error::type_mismatch(Kind::Symbol, obj.kind())),
    }
}

fn column_named(names: &[i64], columns: &[ObjRef], name: i64) -> Result<ObjRef> {
    position_of(names, name)
        .map(|i| columns[i].clone())
        .ok_or_else(|| Error::Value(interner::resolve(name).unwrap_or_default()))
}

/// Row indices matching every `column -> value` pair of the `where` dict.
fn matching_rows(source: &Obj, filter: Option<ObjRef>) -> Result<Vec<usize>> {
    let (names, columns) = columns_of(source)?;
    let mut rows: Vec<usize> = (0..table::row_count(source)).collect();
    let Some(filter) = filter else {
        return Ok(rows);
    };
    expect_kind(&filter, Kind::Dict)?;

    let keys = symbol_ids(&table::keys(&filter))?;
    let values = table::values(&filter);
    for (i, name) in keys.into_iter().enumerate() {
        let column = column_named(&names, &columns, name)?;
        let wanted = values.get(i as i64);
        rows.retain(|&r| cells_equal(&column.get(r as i64), &wanted));
    }
    Ok(rows)
}

fn as_count(obj: &Obj, name: &str) -> Result<i64> {
    obj.as_atom()
        .and_then(|a| a.as_i64())
        .ok_or_else(|| Error::type_mismatch(format!("integer {name}"), obj.kind()))
}

//===----------------------------------------------------------------------===//
// select / update
//===----------------------------------------------------------------------===//

pub fn select(query: &Obj) -> Result<ObjRef> {
    expect_kind(query, Kind::Dict)?;
    let source = required(query, "from")?;
    let (names, columns) = columns_of(&source)?;

    let wanted = match field(query, "columns") {
        Some(selection) => symbol_ids(&selection)?,
        None => names.clone(),
    };

    let mut rows = matching_rows(&source, field(query, "where"))?;
    if let Some(take) = field(query, "take") {
        let n = as_count(&take, "take")?;
        let count = n.unsigned_abs().min(rows.len() as u64) as usize;
        if n >= 0 {
            rows.truncate(count);
        } else {
            rows.drain(..rows.len() - count);
        }
    }

    let mut selected = Vec::with_capacity(wanted.len());
    for &name in &wanted {
        let column = column_named(&names, &columns, name)?;
        selected.push(take_rows(&column, &rows)?);
    }
    build(wanted, selected)
}

pub fn update(query: &Obj) -> Result<ObjRef> {
    expect_kind(query, Kind::Dict)?;
    let source = required(query, "from")?;
    let assignments = required(query, "set")?;
    expect_kind(&assignments, Kind::Dict)?;

    let (mut names, columns) = columns_of(&source)?;
    let row_count = table::row_count(&source);
    let filter = field(query, "where");
    let filtered = filter.is_some();
    let rows = matching_rows(&source, filter)?;
    let mut columns = columns.iter().map(|c| copy_column(c)).collect::<Result<Vec<_>>>()?;

    let targets = symbol_ids(&table::keys(&assignments))?;
    let values = table::values(&assignments);
    for (i, name) in targets.into_iter().enumerate() {
        let value = values.get(i as i64);
        let atom = value.is_atom();
        if !atom && value.len() != row_count {
            return Err(Error::Length(format!(
                "update column has {} rows, table has {}",
                value.len(),
                row_count
            )));
        }

        match position_of(&names, name) {
            Some(c) => {
                let column = &columns[c];
                for &r in &rows {
                    let cell = if atom { value.clone() } else { value.get(r as i64) };
                    let kind = cell.kind();
                    if !column.set(r as i64, cell) {
                        return Err(Error::type_mismatch(column.kind(), kind));
                    }
                }
            }
            None if filtered => {
                return Err(Error::Domain(format!(
                    "cannot add column {} in a filtered update",
                    interner::resolve(name).unwrap_or_default()
                )));
            }
            None => {
                let column = match value.as_atom() {
                    Some(a) => Vector::from_atoms(a.kind(), &vec![a; row_count])
                        .map(ObjRef::vector)
                        .ok_or_else(|| Error::type_mismatch("scalar", a.kind()))?,
                    None => copy_column(&value)?,
                };
                names.push(name);
                columns.push(column);
            }
        }
    }
    build(names, columns)
}

//===----------------------------------------------------------------------===//
// insert / upsert
//===----------------------------------------------------------------------===//

/// Incoming rows: one entry per column, each an atom (one row) or a vector
/// (one row per element). A string entry for a LIST column is one cell.
struct Incoming {
    entries: Vec<ObjRef>,
    spans: Vec<bool>,
    rows: usize,
}

impl Incoming {
    fn new(data: &Obj, columns: &[ObjRef]) -> Result<Incoming> {
        expect_kind(data, Kind::List)?;
        if data.len() != columns.len() {
            return Err(Error::Length(format!(
                "insert has {} values for {} columns",
                data.len(),
                columns.len()
            )));
        }

        let mut entries = Vec::with_capacity(columns.len());
        let mut spans = Vec::with_capacity(columns.len());
        let mut rows = None;
        for (c, column) in columns.iter().enumerate() {
            let entry = data.get(c as i64);
            let single = entry.is_atom()
                || entry.is_null()
                || (entry.kind() == Kind::Char && column.kind() == Kind::List);
            let count = if single { 1 } else { entry.len() };
            match rows {
                Some(expected) if expected != count => {
                    return Err(Error::Length(format!(
                        "insert value {c} has {count} rows, expected {expected}"
                    )));
                }
                _ => rows = Some(count),
            }
            entries.push(entry);
            spans.push(!single);
        }
        Ok(Incoming { entries, spans, rows: rows.unwrap_or(0) })
    }

    fn cell(&self, column: usize, row: usize) -> ObjRef {
        let entry = &self.entries[column];
        if self.spans[column] { entry.get(row as i64) } else { entry.clone() }
    }
}

fn push_row(columns: &[ObjRef], incoming: &Incoming, row: usize) -> Result<()> {
    for (c, column) in columns.iter().enumerate() {
        let cell = incoming.cell(c, row);
        let kind = cell.kind();
        if !column.push(cell) {
            return Err(Error::type_mismatch(column.kind(), kind));
        }
    }
    Ok(())
}

/// Appends rows from `data` to a copy of `source`.
pub fn insert(source: &Obj, data: &Obj) -> Result<ObjRef> {
    let (names, columns) = columns_of(source)?;
    let columns = columns.iter().map(|c| copy_column(c)).collect::<Result<Vec<_>>>()?;
    let incoming = Incoming::new(data, &columns)?;
    for row in 0..incoming.rows {
        push_row(&columns, &incoming, row)?;
    }
    build(names, columns)
}

/// Like [`insert`], but a row whose first `key_count` cells match an
/// existing row replaces that row.
pub fn upsert(source: &Obj, key_count: i64, data: &Obj) -> Result<ObjRef> {
    let (names, columns) = columns_of(source)?;
    let keys = usize::try_from(key_count)
        .ok()
        .filter(|k| (1..=columns.len()).contains(k))
        .ok_or_else(|| {
            Error::Domain(format!(
                "key count {key_count} out of range for {} columns",
                columns.len()
            ))
        })?;
    let columns = columns.iter().map(|c| copy_column(c)).collect::<Result<Vec<_>>>()?;
    let incoming = Incoming::new(data, &columns)?;

    for row in 0..incoming.rows {
        let existing = columns[0].len();
        let hit = (0..existing).find(|&r| {
            (0..keys).all(|k| cells_equal(&columns[k].get(r as i64), &incoming.cell(k, row)))
        });
        match hit {
            Some(r) => {
                for (c, column) in columns.iter().enumerate() {
                    let cell = incoming.cell(c, row);
                    let kind = cell.kind();
                    if !column.set(r as i64, cell) {
                        return Err(Error::type_mismatch(column.kind(), kind));
                    }
                }
            }
            None => push_row(&columns, &incoming, row)?,
        }
    }
    build(names, columns)
}
