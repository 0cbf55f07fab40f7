//! Text rendering of objects.
//!
//! Produces the display form handed back by `Session::format`:
//! - atoms print bare (`42`, `1.5`, `true`, `price`, `2024.01.15`)
//! - flat vectors print in brackets, strings in double quotes
//! - lists in parentheses, dicts in braces
//! - tables as an aligned header line plus one line per row

use std::fmt::Write;

use crate::interner;
use crate::kind::Kind;
use crate::object::{Atom, Body, Obj, ObjRef};

/// Days between 1970.01.01 and 2000.01.01.
const EPOCH_OFFSET_DAYS: i64 = 10_957;

const MS_PER_DAY: i64 = 86_400_000;
const NS_PER_MS: i64 = 1_000_000;
const NS_PER_DAY: i64 = MS_PER_DAY * NS_PER_MS;

/// Renders `obj` for display.
pub fn format(obj: &Obj) -> String {
    let mut out = String::new();
    write_obj(&mut out, obj);
    out
}

fn write_obj(out: &mut String, obj: &Obj) {
    match &*obj.body() {
        Body::Null => out.push_str("null"),
        Body::Atom(atom) => write_atom(out, atom),
        Body::Error(err) => {
            let _ = write!(out, "error: {}", err.display_message());
            if let Some(msg) = err.message().filter(|m| *m != err.display_message()) {
                let _ = write!(out, " ({msg})");
            }
        }
        Body::Vector(vector) => match vector.kind() {
            Kind::Char => {
                let text = vector.bytes().map(String::from_utf8_lossy).unwrap_or_default();
                out.push('"');
                out.push_str(&escape_string(&text));
                out.push('"');
            }
            Kind::List => {
                out.push('(');
                for (i, item) in vector.objects_slice().unwrap_or_default().iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    write_obj(out, item);
                }
                out.push(')');
            }
            Kind::Dict => {
                if let Some([keys, values]) = vector.objects_slice() {
                    write_dict(out, keys, values);
                }
            }
            Kind::Table => {
                if let Some([names, columns]) = vector.objects_slice() {
                    write_table(out, names, columns);
                }
            }
            _ => {
                out.push('[');
                for i in 0..vector.len() {
                    if i > 0 {
                        out.push(' ');
                    }
                    match vector.atom_at(i) {
                        Some(atom) => write_atom(out, &atom),
                        None => out.push('?'),
                    }
                }
                out.push(']');
            }
        },
    }
}

fn write_atom(out: &mut String, atom: &Atom) {
    if atom.is_null() {
        out.push_str("null");
        return;
    }
    let _ = match *atom {
        Atom::Bool(b) => write!(out, "{b}"),
        Atom::Byte(b) => write!(out, "0x{b:02x}"),
        Atom::I16(v) => write!(out, "{v}"),
        Atom::I32(v) => write!(out, "{v}"),
        Atom::I64(v) => write!(out, "{v}"),
        Atom::F64(v) => {
            let s = v.to_string();
            // Keep floats recognisable as floats.
            if s.contains(['.', 'e', 'E']) || !v.is_finite() {
                write!(out, "{s}")
            } else {
                write!(out, "{s}.0")
            }
        }
        Atom::Symbol(id) => write!(out, "{}", interner::resolve(id).unwrap_or_default()),
        Atom::Char(c) => write!(out, "'{}'", escape_string(&(c as char).to_string())),
        Atom::Date(days) => write!(out, "{}", format_date(days)),
        Atom::Time(ms) => write!(out, "{}", format_time(ms)),
        Atom::Timestamp(ns) => write!(out, "{}", format_timestamp(ns)),
        Atom::Guid(bytes) => write!(out, "{}", format_guid(&bytes)),
    };
}

fn write_dict(out: &mut String, keys: &ObjRef, values: &ObjRef) {
    out.push('{');
    for i in 0..keys.len() {
        if i > 0 {
            out.push(' ');
        }
        write_obj(out, &keys.get(i as i64));
        out.push_str(": ");
        write_obj(out, &values.get(i as i64));
    }
    out.push('}');
}

fn write_table(out: &mut String, names: &ObjRef, columns: &ObjRef) {
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(names.len());
    for c in 0..names.len() {
        let column = columns.get(c as i64);
        let mut rendered = vec![format(&names.get(c as i64))];
        rendered.extend((0..column.len()).map(|r| format(&column.get(r as i64))));
        cells.push(rendered);
    }

    let widths: Vec<usize> =
        cells.iter().map(|col| col.iter().map(|s| s.chars().count()).max().unwrap_or(0)).collect();
    let rows = cells.first().map_or(0, Vec::len);

    for r in 0..rows {
        if r > 0 {
            out.push('\n');
        }
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(col, &width)| format!("{:<width$}", col[r]))
            .collect();
        out.push_str(line.join(" ").trim_end());
        if r == 0 {
            out.push('\n');
            let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
            out.push_str(&rule.join(" "));
        }
    }
}

fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

//===----------------------------------------------------------------------===//
// Calendar
//===----------------------------------------------------------------------===//

/// Converts days since 2000.01.01 into a civil (year, month, day).
pub fn civil_from_days(days: i32) -> (i64, u32, u32) {
    let z = days as i64 + EPOCH_OFFSET_DAYS + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Inverse of [`civil_from_days`]. Returns `None` for an invalid date.
pub fn days_from_civil(year: i64, month: u32, day: u32) -> Option<i32> {
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return None;
    }
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    i32::try_from(era * 146_097 + doe - 719_468 - EPOCH_OFFSET_DAYS).ok()
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

pub fn format_date(days: i32) -> String {
    let (year, month, day) = civil_from_days(days);
    format!("{year:04}.{month:02}.{day:02}")
}

pub fn format_time(ms: i32) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let ms = (ms as i64).abs();
    format!(
        "{sign}{:02}:{:02}:{:02}.{:03}",
        ms / 3_600_000,
        ms / 60_000 % 60,
        ms / 1000 % 60,
        ms % 1000
    )
}

pub fn format_timestamp(ns: i64) -> String {
    let days = ns.div_euclid(NS_PER_DAY);
    let rest = ns.rem_euclid(NS_PER_DAY);
    let date = i32::try_from(days).map_or_else(|_| "????.??.??".to_owned(), format_date);
    let ms = rest / NS_PER_MS;
    format!(
        "{date}D{:02}:{:02}:{:02}.{:09}",
        ms / 3_600_000,
        ms / 60_000 % 60,
        ms / 1000 % 60,
        rest % 1_000_000_000
    )
}

pub fn format_guid(bytes: &[u8; 16]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{}-{}-{}-{}-{}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32])
}
