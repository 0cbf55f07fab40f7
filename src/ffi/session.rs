//! Session handles.
//!
//! A session is boxed and handed out as an opaque pointer. Live sessions are
//! tracked per thread so that a freed or forged pointer is ignored instead of
//! dereferenced, the same rule objects follow.

use std::cell::RefCell;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::object::{Obj, ObjRef};
use crate::session::Session;

use super::{borrow, consume, give, host_bytes, host_text, null_handle};

thread_local! {
    static SESSIONS: RefCell<FxHashSet<usize>> = RefCell::new(FxHashSet::default());
}

fn is_session(session: *const Session) -> bool {
    !session.is_null()
        && SESSIONS.try_with(|live| live.borrow().contains(&(session as usize))).unwrap_or(false)
}

fn with_session<R>(session: *mut Session, default: R, f: impl FnOnce(&mut Session) -> R) -> R {
    if !is_session(session) {
        return default;
    }
    // SAFETY: registered pointers come from Box::into_raw and are removed
    // before the box is freed.
    f(unsafe { &mut *session })
}

/// Runs a producer against a live session, returning the null object for a
/// dead session.
fn produce(session: *mut Session, f: impl FnOnce(&mut Session) -> ObjRef) -> *mut Obj {
    with_session(session, None, |s| Some(f(s))).map_or_else(null_handle, give)
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_session_new() -> *mut Session {
    let session = Box::into_raw(Box::new(Session::new()));
    SESSIONS.with(|live| live.borrow_mut().insert(session as usize));
    session
}

/// Frees a session. Freeing a dead or null session does nothing.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_session_free(session: *mut Session) {
    let removed = SESSIONS
        .try_with(|live| live.borrow_mut().remove(&(session as usize)))
        .unwrap_or(false);
    if removed {
        debug!("session freed");
        // SAFETY: the pointer was registered, so it came from Box::into_raw
        // and has not been freed.
        drop(unsafe { Box::from_raw(session) });
    }
}

/// Evaluates `len` bytes of source. An empty or null `name` gets a generated
/// `cmd:N` name.
///
/// # Safety
/// `source` must point to `len` readable bytes and `name` to `name_len`
/// readable bytes (or be null).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_eval(
    session: *mut Session,
    source: *const u8,
    len: i64,
    name: *const u8,
    name_len: i64,
) -> *mut Obj {
    // SAFETY: upheld by the caller.
    let Some(source) = (unsafe { host_text(source, len) }) else {
        return null_handle();
    };
    // SAFETY: upheld by the caller.
    let name = unsafe { host_text(name, name_len) };
    produce(session, |s| s.evaluate(&source, name.as_deref()))
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_command_counter(session: *mut Session) -> u64 {
    with_session(session, 0, |s| s.command_counter())
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_reset_command_counter(session: *mut Session) {
    with_session(session, (), Session::reset_command_counter)
}

/// Formats `obj` into a new CHAR vector.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_format(session: *mut Session, obj: *const Obj) -> *mut Obj {
    produce(session, |s| borrow(obj, ObjRef::null(), |o| ObjRef::string(&s.format(o))))
}

/// Binds global `name` to `value`, consuming `value`.
///
/// # Safety
/// `name` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_global_set(
    session: *mut Session,
    name: *const u8,
    len: i64,
    value: *mut Obj,
) -> *mut Obj {
    let value = consume(value);
    // SAFETY: upheld by the caller.
    let (Some(name), Some(value)) = (unsafe { host_text(name, len) }, value) else {
        return null_handle();
    };
    produce(session, |s| s.set_global(&name, value))
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_select(session: *mut Session, query: *const Obj) -> *mut Obj {
    produce(session, |s| borrow(query, ObjRef::null(), |q| s.select(q)))
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_update(session: *mut Session, query: *const Obj) -> *mut Obj {
    produce(session, |s| borrow(query, ObjRef::null(), |q| s.update(q)))
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_session_insert(
    session: *mut Session,
    table: *const Obj,
    data: *const Obj,
) -> *mut Obj {
    produce(session, |s| {
        borrow(table, ObjRef::null(), |t| borrow(data, ObjRef::null(), |d| s.insert(t, d)))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_session_upsert(
    session: *mut Session,
    table: *const Obj,
    key_count: i64,
    data: *const Obj,
) -> *mut Obj {
    produce(session, |s| {
        borrow(table, ObjRef::null(), |t| {
            borrow(data, ObjRef::null(), |d| s.upsert(t, key_count, d))
        })
    })
}

/// Encodes `obj` into a BYTE vector.
#[unsafe(no_mangle)]
pub extern "C" fn colrt_serialize(session: *mut Session, obj: *const Obj) -> *mut Obj {
    produce(session, |s| borrow(obj, ObjRef::null(), |o| s.serialize(o)))
}

#[unsafe(no_mangle)]
pub extern "C" fn colrt_deserialize(session: *mut Session, bytes: *const Obj) -> *mut Obj {
    produce(session, |s| borrow(bytes, ObjRef::null(), |b| s.deserialize(b)))
}

/// Parses CSV with the session's separator and size limit.
///
/// # Safety
/// `text` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colrt_session_parse_csv(
    session: *mut Session,
    text: *const u8,
    len: i64,
) -> *mut Obj {
    if text.is_null() {
        return give(crate::error::Error::user(crate::csv::NULL_INPUT).into_object());
    }
    if len <= 0 {
        return give(crate::error::Error::user(crate::csv::EMPTY_INPUT).into_object());
    }
    // SAFETY: upheld by the caller.
    match unsafe { host_bytes(text, len) } {
        Some(bytes) => produce(session, |s| s.parse_csv(bytes)),
        None => give(crate::error::Error::user(crate::csv::NULL_INPUT).into_object()),
    }
}
