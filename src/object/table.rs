//! Dicts and tables.
//!
//! Both are two-element handle vectors: `[keys, values]` for a dict and
//! `[names, columns]` for a table, where `names` is a SYMBOL vector and
//! `columns` a LIST of equal-length vectors.

use crate::error::{Error, Result};
use crate::interner;
use crate::kind::Kind;

use super::{Atom, Body, Obj, ObjRef, Vector};

/// Builds a dict. Keys and values must be vectors of the same length.
pub fn dict(keys: ObjRef, values: ObjRef) -> Result<ObjRef> {
    if !keys.is_vector() || !values.is_vector() {
        let found = format!("{} and {}", keys.kind(), values.kind());
        return Err(Error::type_mismatch("vectors", found));
    }
    if keys.len() != values.len() {
        return Err(Error::Length(format!(
            "dict keys have {} entries, values {}",
            keys.len(),
            values.len()
        )));
    }
    Ok(ObjRef::vector(Vector::objects(Kind::Dict, vec![keys, values])))
}

/// Builds a table from a SYMBOL vector of names and a LIST of columns.
pub fn table(names: ObjRef, columns: ObjRef) -> Result<ObjRef> {
    if names.kind() != Kind::Symbol || !names.is_vector() {
        return Err(Error::type_mismatch(Kind::Symbol, names.kind()));
    }
    if columns.kind() != Kind::List || !columns.is_vector() {
        return Err(Error::type_mismatch(Kind::List, columns.kind()));
    }
    if names.len() != columns.len() {
        return Err(Error::Length(format!(
            "table has {} names but {} columns",
            names.len(),
            columns.len()
        )));
    }

    let mut rows = None;
    for index in 0..columns.len() {
        let column = columns.get(index as i64);
        if !column.is_vector() || matches!(column.kind(), Kind::Table | Kind::Dict) {
            return Err(Error::type_mismatch("column vector", column.kind()));
        }
        match rows {
            None => rows = Some(column.len()),
            Some(expected) if expected != column.len() => {
                return Err(Error::Length(format!(
                    "column {} has {} rows, expected {}",
                    index,
                    column.len(),
                    expected
                )));
            }
            Some(_) => {}
        }
    }

    Ok(ObjRef::vector(Vector::objects(Kind::Table, vec![names, columns])))
}

fn parts(obj: &Obj) -> Option<(Kind, ObjRef, ObjRef)> {
    match &*obj.body() {
        Body::Vector(vector) if matches!(vector.kind(), Kind::Table | Kind::Dict) => {
            match vector.objects_slice()? {
                [first, second] => Some((vector.kind(), first.clone(), second.clone())),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Keys of a dict or column names of a table; the null object otherwise.
pub fn keys(obj: &Obj) -> ObjRef {
    parts(obj).map_or_else(ObjRef::null, |(_, keys, _)| keys)
}

/// Values of a dict or the column list of a table.
pub fn values(obj: &Obj) -> ObjRef {
    parts(obj).map_or_else(ObjRef::null, |(_, _, values)| values)
}

pub fn row_count(obj: &Obj) -> usize {
    match parts(obj) {
        Some((Kind::Table, _, columns)) if !columns.is_empty() => columns.get(0).len(),
        _ => 0,
    }
}

/// Column `name` of a table, or the null object.
pub fn column(obj: &Obj, name: &str) -> ObjRef {
    let Some((Kind::Table, names, columns)) = parts(obj) else {
        return ObjRef::null();
    };
    let id = interner::intern(name);
    position(&names, &Atom::Symbol(id)).map_or_else(ObjRef::null, |pos| columns.get(pos as i64))
}

/// Row `index` of a table as a dict of column name to cell.
pub fn row(obj: &Obj, index: i64) -> ObjRef {
    match (parts(obj), usize::try_from(index)) {
        (Some((Kind::Table, names, columns)), Ok(index)) => row_of(&names, &columns, index),
        _ => ObjRef::null(),
    }
}

pub(crate) fn row_of(names: &ObjRef, columns: &ObjRef, index: usize) -> ObjRef {
    let count = if columns.is_empty() { 0 } else { columns.get(0).len() };
    if index >= count {
        return ObjRef::null();
    }
    let cells = (0..columns.len()).map(|c| columns.get(c as i64).get(index as i64)).collect();
    dict(names.clone(), ObjRef::list(cells)).unwrap_or_else(Error::into_object)
}

/// Looks up `key` in a dict's keys and returns the matching value.
pub fn dict_get(obj: &Obj, key: &Obj) -> ObjRef {
    let Some((Kind::Dict, keys, values)) = parts(obj) else {
        return ObjRef::null();
    };
    let Some(key) = key.as_atom() else {
        return ObjRef::null();
    };
    position(&keys, &key).map_or_else(ObjRef::null, |pos| values.get(pos as i64))
}

/// Index of the first element of `haystack` equal to `needle`.
pub(crate) fn position(haystack: &Obj, needle: &Atom) -> Option<usize> {
    (0..haystack.len()).find(|&i| haystack.get(i as i64).as_atom().as_ref() == Some(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ObjRef {
        let names = ObjRef::vector(Vector::symbols(vec![
            interner::intern("id"),
            interner::intern("price"),
        ]));
        let columns = ObjRef::list(vec![
            ObjRef::vector(Vector::i64s(vec![1, 2, 3])),
            ObjRef::vector(Vector::f64s(vec![9.5, 10.0, 10.5])),
        ]);
        table(names, columns).unwrap()
    }

    #[test]
    fn test_table_shape() {
        let t = sample();
        assert_eq!(t.kind(), Kind::Table);
        assert_eq!(t.len(), 2);
        assert_eq!(row_count(&t), 3);
        assert_eq!(keys(&t).len(), 2);
        assert_eq!(values(&t).kind(), Kind::List);
    }

    #[test]
    fn test_table_rejects_ragged_columns() {
        let ids = vec![interner::intern("a"), interner::intern("b")];
        let names = ObjRef::vector(Vector::symbols(ids));
        let columns = ObjRef::list(vec![
            ObjRef::vector(Vector::i64s(vec![1, 2])),
            ObjRef::vector(Vector::i64s(vec![1])),
        ]);
        assert!(matches!(table(names, columns), Err(Error::Length(_))));
    }

    #[test]
    fn test_table_rejects_name_count_mismatch() {
        let names = ObjRef::vector(Vector::symbols(vec![interner::intern("a")]));
        let columns = ObjRef::list(vec![]);
        assert!(table(names, columns).is_err());
    }

    #[test]
    fn test_empty_table_has_no_rows() {
        let t = table(ObjRef::vector(Vector::symbols(vec![])), ObjRef::list(vec![])).unwrap();
        assert_eq!(row_count(&t), 0);
        assert!(row(&t, 0).is_null());
    }

    #[test]
    fn test_column_by_name() {
        let t = sample();
        let price = column(&t, "price");
        assert_eq!(price.kind(), Kind::F64);
        assert_eq!(price.get(2).as_atom(), Some(Atom::F64(10.5)));
        assert!(column(&t, "missing").is_null());
    }

    #[test]
    fn test_row_is_dict() {
        let t = sample();
        let r = row(&t, 1);
        assert_eq!(r.kind(), Kind::Dict);
        let cell = dict_get(&r, &ObjRef::symbol("id"));
        assert_eq!(cell.as_atom(), Some(Atom::I64(2)));
        assert!(row(&t, 3).is_null());
        assert!(t.get(3).is_null());
        assert_eq!(t.get(0).kind(), Kind::Dict);
    }

    #[test]
    fn test_dict_length_mismatch() {
        let keys = ObjRef::vector(Vector::i64s(vec![1, 2]));
        let values = ObjRef::vector(Vector::i64s(vec![1]));
        assert!(dict(keys, values).is_err());
    }

    #[test]
    fn test_dict_get_and_positional_get() {
        let keys = ObjRef::vector(Vector::i64s(vec![10, 20]));
        let values = ObjRef::list(vec![ObjRef::string("a"), ObjRef::string("b")]);
        let d = dict(keys, values).unwrap();
        let hit = dict_get(&d, &ObjRef::atom(Atom::I64(20)));
        assert_eq!(hit.as_text().as_deref(), Some("b"));
        assert!(dict_get(&d, &ObjRef::atom(Atom::I64(30))).is_null());
        assert_eq!(d.get(0).as_text().as_deref(), Some("a"));
    }

    #[test]
    fn test_table_refuses_mutation() {
        let t = sample();
        assert!(!t.push(ObjRef::null()));
        assert!(!t.resize(0));
        assert_eq!(t.len(), 2);
    }
}
