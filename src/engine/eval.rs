//! Evaluator for the bundled expression language.
//!
//! Forms evaluate bottom-up. Calls look the operator up in a fixed table of
//! builtins; bare names resolve against the engine's globals.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::interner;
use crate::kind::{self, Kind};
use crate::object::{Atom, Body, Obj, ObjRef, Vector, table};

use super::reader::{Form, Node};

/// An error and the byte offset of the form that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub error: Error,
    pub position: usize,
}

pub type Eval<T> = std::result::Result<T, Located>;

trait At<T> {
    fn at(self, position: usize) -> Eval<T>;
}

impl<T> At<T> for Result<T> {
    fn at(self, position: usize) -> Eval<T> {
        self.map_err(|error| {
            let position = match &error {
                Error::Parse { position, .. } => *position,
                _ => position,
            };
            Located { error, position }
        })
    }
}

/// Named values visible to every evaluation.
#[derive(Debug, Default)]
pub struct Globals {
    map: FxHashMap<i64, ObjRef>,
}

impl Globals {
    pub fn set(&mut self, name: &str, value: ObjRef) {
        self.map.insert(interner::intern(name), value);
    }

    pub fn get(&self, name: &str) -> Option<ObjRef> {
        self.map.get(&interner::intern(name)).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Evaluates every node in order and returns the last value, or the null
/// object for an empty program.
pub fn eval_program(globals: &mut Globals, nodes: &[Node]) -> Eval<ObjRef> {
    let mut last = ObjRef::null();
    for node in nodes {
        last = eval_node(globals, node)?;
    }
    Ok(last)
}

fn eval_node(globals: &mut Globals, node: &Node) -> Eval<ObjRef> {
    let at = node.position;
    Ok(match &node.form {
        Form::Null => ObjRef::null(),
        Form::Bool(b) => ObjRef::atom(Atom::Bool(*b)),
        Form::Int(v) => ObjRef::atom(Atom::I64(*v)),
        Form::Float(v) => ObjRef::atom(Atom::F64(*v)),
        Form::Date(days) => ObjRef::atom(Atom::Date(*days)),
        Form::Str(s) => ObjRef::string(s),
        Form::Symbol(s) => ObjRef::symbol(s),
        Form::Ident(name) => globals.get(name).ok_or_else(|| Error::Value(name.clone())).at(at)?,
        Form::Vector(items) => {
            let values = items
                .iter()
                .map(|item| eval_node(globals, item))
                .collect::<Eval<Vec<_>>>()?;
            pack(values)
        }
        Form::Call(items) => call(globals, items, at)?,
    })
}

/// Packs values into a flat vector when they are atoms of one kind, a LIST
/// otherwise.
pub(crate) fn pack(values: Vec<ObjRef>) -> ObjRef {
    let atoms: Option<Vec<Atom>> = values.iter().map(|v| v.as_atom()).collect();
    if let Some(atoms) = atoms.filter(|a| !a.is_empty()) {
        let kind = atoms[0].kind();
        if let Some(vector) = Vector::from_atoms(kind, &atoms) {
            return ObjRef::vector(vector);
        }
    }
    ObjRef::list(values)
}

fn call(globals: &mut Globals, items: &[Node], at: usize) -> Eval<ObjRef> {
    let Some((head, rest)) = items.split_first() else {
        return Ok(ObjRef::null());
    };
    let Form::Ident(op) = &head.form else {
        return Err(Located {
            error: Error::type_mismatch("function name", describe(&head.form)),
            position: head.position,
        });
    };
    let args = rest
        .iter()
        .map(|node| eval_node(globals, node))
        .collect::<Eval<Vec<_>>>()?;

    match op.as_str() {
        "set" => {
            arity(op, &args, 2).at(at)?;
            let name = symbol_name(&args[0]).at(rest[0].position)?;
            globals.set(&name, args[1].clone());
            Ok(args[1].clone())
        }
        _ => builtin(op, &args).at(at),
    }
}

fn describe(form: &Form) -> &'static str {
    match form {
        Form::Null => "null",
        Form::Bool(_) => "bool",
        Form::Int(_) => "int",
        Form::Float(_) => "float",
        Form::Date(_) => "date",
        Form::Str(_) => "string",
        Form::Symbol(_) => "symbol",
        Form::Ident(_) => "name",
        Form::Vector(_) => "vector",
        Form::Call(_) => "call",
    }
}

fn arity(name: &str, args: &[ObjRef], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::Arity { name: name.to_owned(), expected, got: args.len() });
    }
    Ok(())
}

fn symbol_name(obj: &Obj) -> Result<String> {
    match obj.as_atom() {
        Some(Atom::Symbol(id)) => {
            interner::resolve(id).ok_or_else(|| Error::Value(format!("#{id}")))
        }
        _ => Err(Error::type_mismatch(Kind::Symbol, obj.kind())),
    }
}

fn builtin(op: &str, args: &[ObjRef]) -> Result<ObjRef> {
    match op {
        "+" | "-" | "*" | "/" => {
            arity(op, args, 2)?;
            let op = match op {
                "+" => Op::Add,
                "-" => Op::Sub,
                "*" => Op::Mul,
                _ => Op::Div,
            };
            arith(op, &args[0], &args[1])
        }
        "count" => {
            arity(op, args, 1)?;
            Ok(ObjRef::atom(Atom::I64(element_count(&args[0]) as i64)))
        }
        "til" => {
            arity(op, args, 1)?;
            til(&args[0])
        }
        "sum" => {
            arity(op, args, 1)?;
            sum(&args[0])
        }
        "at" => {
            arity(op, args, 2)?;
            at(&args[0], &args[1])
        }
        "list" => Ok(ObjRef::list(args.to_vec())),
        "dict" => {
            arity(op, args, 2)?;
            table::dict(args[0].clone(), args[1].clone())
        }
        "table" => {
            arity(op, args, 2)?;
            table::table(args[0].clone(), args[1].clone())
        }
        "type" => {
            arity(op, args, 1)?;
            Ok(ObjRef::symbol(kind::type_name(args[0].type_code())))
        }
        "raise" => {
            arity(op, args, 1)?;
            let message = args[0].as_text().unwrap_or_else(|| crate::format::format(&args[0]));
            Err(Error::user(message))
        }
        _ => Err(Error::Value(op.to_owned())),
    }
}

/// Rows of a table, entries of a dict, elements otherwise.
pub(crate) fn element_count(obj: &Obj) -> usize {
    match obj.kind() {
        Kind::Table => table::row_count(obj),
        Kind::Dict => table::keys(obj).len(),
        _ => obj.len(),
    }
}

fn til(n: &Obj) -> Result<ObjRef> {
    let count = n
        .as_atom()
        .and_then(|a| a.as_i64())
        .ok_or_else(|| Error::type_mismatch(Kind::I64, n.kind()))?;
    let count = usize::try_from(count)
        .map_err(|_| Error::Domain(format!("til expects a non-negative count, got {count}")))?;
    let mut values = Vec::new();
    values
        .try_reserve_exact(count)
        .map_err(|_| Error::user(crate::object::error::OUT_OF_MEMORY))?;
    values.extend(0..count as i64);
    Ok(ObjRef::vector(Vector::i64s(values)))
}

fn at(target: &Obj, index: &Obj) -> Result<ObjRef> {
    let i = index
        .as_atom()
        .and_then(|a| a.as_i64())
        .ok_or_else(|| Error::type_mismatch(Kind::I64, index.kind()))?;
    let len = element_count(target);
    if !target.is_vector() || i < 0 || i as usize >= len {
        return Err(Error::Index { index: i, len });
    }
    Ok(target.get(i))
}

//===----------------------------------------------------------------------===//
// Arithmetic
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

enum Numbers {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

impl Numbers {
    fn len(&self) -> usize {
        match self {
            Numbers::Ints(v) => v.len(),
            Numbers::Floats(v) => v.len(),
        }
    }

    fn float(&self, i: usize) -> f64 {
        match self {
            Numbers::Ints(v) => v[i] as f64,
            Numbers::Floats(v) => v[i],
        }
    }
}

/// Numeric contents of an atom or flat vector, and whether it was an atom.
fn numbers(obj: &Obj) -> Result<(Numbers, bool)> {
    match &*obj.body() {
        Body::Atom(Atom::F64(v)) => Ok((Numbers::Floats(vec![*v]), true)),
        Body::Atom(atom) => atom
            .as_i64()
            .map(|v| (Numbers::Ints(vec![v]), true))
            .ok_or_else(|| Error::type_mismatch("number", obj.kind())),
        Body::Vector(vector) => match vector.kind() {
            Kind::F64 => {
                let values =
                    (0..vector.len()).filter_map(|i| vector.atom_at(i)?.as_f64()).collect();
                Ok((Numbers::Floats(values), false))
            }
            Kind::Bool | Kind::Byte | Kind::I16 | Kind::I32 | Kind::I64 => {
                let values =
                    (0..vector.len()).filter_map(|i| vector.atom_at(i)?.as_i64()).collect();
                Ok((Numbers::Ints(values), false))
            }
            kind => Err(Error::type_mismatch("number", kind)),
        },
        _ => Err(Error::type_mismatch("number", obj.kind())),
    }
}

fn arith(op: Op, left: &Obj, right: &Obj) -> Result<ObjRef> {
    let (lhs, left_atom) = numbers(left)?;
    let (rhs, right_atom) = numbers(right)?;

    let len = match (left_atom, right_atom) {
        (true, true) => 1,
        (true, false) => rhs.len(),
        (false, true) => lhs.len(),
        (false, false) if lhs.len() == rhs.len() => lhs.len(),
        (false, false) => {
            return Err(Error::Length(format!(
                "operands have lengths {} and {}",
                lhs.len(),
                rhs.len()
            )));
        }
    };
    let li = |i: usize| if left_atom { 0 } else { i };
    let ri = |i: usize| if right_atom { 0 } else { i };

    let result = match (&lhs, &rhs, op) {
        (Numbers::Ints(a), Numbers::Ints(b), Op::Add | Op::Sub | Op::Mul) => {
            let values: Vec<i64> = (0..len)
                .map(|i| {
                    let (x, y) = (a[li(i)], b[ri(i)]);
                    match op {
                        Op::Add => x.wrapping_add(y),
                        Op::Sub => x.wrapping_sub(y),
                        _ => x.wrapping_mul(y),
                    }
                })
                .collect();
            if left_atom && right_atom {
                ObjRef::atom(Atom::I64(values[0]))
            } else {
                ObjRef::vector(Vector::i64s(values))
            }
        }
        _ => {
            let values: Vec<f64> = (0..len)
                .map(|i| {
                    let (x, y) = (lhs.float(li(i)), rhs.float(ri(i)));
                    match op {
                        Op::Add => x + y,
                        Op::Sub => x - y,
                        Op::Mul => x * y,
                        Op::Div => x / y,
                    }
                })
                .collect();
            if left_atom && right_atom {
                ObjRef::atom(Atom::F64(values[0]))
            } else {
                ObjRef::vector(Vector::f64s(values))
            }
        }
    };
    Ok(result)
}

fn sum(obj: &Obj) -> Result<ObjRef> {
    let (values, _) = numbers(obj)?;
    Ok(match values {
        Numbers::Ints(v) => {
            ObjRef::atom(Atom::I64(v.iter().fold(0i64, |acc, x| acc.wrapping_add(*x))))
        }
        Numbers::Floats(v) => ObjRef::atom(Atom::F64(v.iter().sum())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reader::read;

    fn run(src: &str) -> Eval<ObjRef> {
        let mut globals = Globals::default();
        eval_program(&mut globals, &read(src).unwrap())
    }

    fn atom(src: &str) -> Option<Atom> {
        run(src).unwrap().as_atom()
    }

    #[test]
    fn test_arithmetic_atoms() {
        assert_eq!(atom("(+ 1 2)"), Some(Atom::I64(3)));
        assert_eq!(atom("(* 2 2.5)"), Some(Atom::F64(5.0)));
        assert_eq!(atom("(/ 7 2)"), Some(Atom::F64(3.5)));
        assert_eq!(atom("(- 1 (+ 1 1))"), Some(Atom::I64(-1)));
    }

    #[test]
    fn test_arithmetic_broadcast() {
        let v = run("(+ [1 2 3] 10)").unwrap();
        assert_eq!(v.kind(), Kind::I64);
        assert_eq!(v.get(2).as_atom(), Some(Atom::I64(13)));
        let err = run("(+ [1 2] [1 2 3])").unwrap_err();
        assert!(matches!(err.error, Error::Length(_)));
    }

    #[test]
    fn test_type_error_position() {
        let err = run("(+ 1 \"a\")").unwrap_err();
        assert!(matches!(err.error, Error::Type { .. }));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_undefined_name() {
        let err = run("(count missing)").unwrap_err();
        assert_eq!(err.error, Error::Value("missing".into()));
        assert_eq!(err.position, 7);
    }

    #[test]
    fn test_unknown_function() {
        let err = run("(frobnicate 1)").unwrap_err();
        assert_eq!(err.error, Error::Value("frobnicate".into()));
    }

    #[test]
    fn test_arity() {
        let err = run("(count 1 2)").unwrap_err();
        assert_eq!(err.error, Error::Arity { name: "count".into(), expected: 1, got: 2 });
    }

    #[test]
    fn test_til_sum_count() {
        assert_eq!(atom("(sum (til 5))"), Some(Atom::I64(10)));
        assert_eq!(atom("(count (til 4))"), Some(Atom::I64(4)));
        assert!(matches!(run("(til -1)").unwrap_err().error, Error::Domain(_)));
    }

    #[test]
    fn test_vector_literals() {
        assert_eq!(run("[1 2]").unwrap().kind(), Kind::I64);
        assert_eq!(run("['a 'b]").unwrap().kind(), Kind::Symbol);
        assert_eq!(run("[1 \"x\"]").unwrap().kind(), Kind::List);
        assert_eq!(run("[]").unwrap().kind(), Kind::List);
    }

    #[test]
    fn test_set_and_lookup() {
        let mut globals = Globals::default();
        eval_program(&mut globals, &read("(set 'x 41)").unwrap()).unwrap();
        let v = eval_program(&mut globals, &read("(+ x 1)").unwrap()).unwrap();
        assert_eq!(v.as_atom(), Some(Atom::I64(42)));
        assert_eq!(globals.len(), 1);
    }

    #[test]
    fn test_table_and_count() {
        let t = run("(table ['a 'b] (list [1 2 3] [4 5 6]))").unwrap();
        assert_eq!(t.kind(), Kind::Table);
        assert_eq!(element_count(&t), 3);
        assert_eq!(atom("(count (table ['a] (list [1 2])))"), Some(Atom::I64(2)));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(run("(type 1)").unwrap().as_text().as_deref(), Some("i64"));
        assert_eq!(run("(type [1 2])").unwrap().as_text().as_deref(), Some("I64"));
    }

    #[test]
    fn test_raise() {
        let err = run("(raise \"boom\")").unwrap_err();
        assert_eq!(err.error, Error::user("boom"));
    }

    #[test]
    fn test_at() {
        assert_eq!(atom("(at [5 6 7] 1)"), Some(Atom::I64(6)));
        assert!(matches!(run("(at [5] 3)").unwrap_err().error, Error::Index { index: 3, len: 1 }));
    }

    #[test]
    fn test_empty_program_is_null() {
        assert!(run("").unwrap().is_null());
    }
}
