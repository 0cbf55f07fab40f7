//! Reference-counted tagged objects.
//!
//! Every value handed to the host is an [`Obj`] on the heap:
//!
//! ```text
//! +-----------+---------------------------------------------+
//! | ref_count | body                                        |
//! | (u32)     | Null | Atom | Vector{kind,buf,gen} | Error  |
//! +-----------+---------------------------------------------+
//! ```
//!
//! [`ObjRef`] is the owning handle: `Clone` retains, `Drop` releases, and the
//! object (and every child handle it holds) is freed when the count reaches
//! zero. Raw handles that cross the C boundary are validated against a
//! per-thread registry of live objects, so a stale or forged pointer is
//! reported as absent instead of being dereferenced.

pub mod atom;
pub mod error;
pub mod table;
pub mod vector;

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::ptr::NonNull;

use rustc_hash::FxHashSet;

use crate::interner;
use crate::kind::Kind;

pub use atom::Atom;
pub use error::{ErrorCode, ErrorObject};
pub use vector::{Buffer, Vector};

/// Payload of an object.
#[derive(Debug)]
pub enum Body {
    Null,
    Atom(Atom),
    Vector(Vector),
    Error(ErrorObject),
}

pub struct Obj {
    ref_count: Cell<u32>,
    body: RefCell<Body>,
}

//===----------------------------------------------------------------------===//
// Live handle registry
//===----------------------------------------------------------------------===//

thread_local! {
    static LIVE: RefCell<FxHashSet<usize>> = RefCell::new(FxHashSet::default());
}

fn register(ptr: *const Obj) {
    LIVE.with(|live| live.borrow_mut().insert(ptr as usize));
}

fn unregister(ptr: *const Obj) {
    // The registry may already be gone while thread locals are torn down.
    let _ = LIVE.try_with(|live| live.borrow_mut().remove(&(ptr as usize)));
}

/// Whether `ptr` names an object that has not been freed yet.
pub fn is_live(ptr: *const Obj) -> bool {
    if ptr.is_null() {
        return false;
    }
    LIVE.try_with(|live| live.borrow().contains(&(ptr as usize))).unwrap_or(false)
}

/// Number of objects currently alive on this thread.
pub fn live_count() -> usize {
    LIVE.try_with(|live| live.borrow().len()).unwrap_or(0)
}

//===----------------------------------------------------------------------===//
// ObjRef
//===----------------------------------------------------------------------===//

pub struct ObjRef(NonNull<Obj>);

impl ObjRef {
    pub fn new(body: Body) -> Self {
        let obj = Box::new(Obj { ref_count: Cell::new(1), body: RefCell::new(body) });
        let ptr = NonNull::from(Box::leak(obj));
        register(ptr.as_ptr());
        ObjRef(ptr)
    }

    pub fn null() -> Self {
        Self::new(Body::Null)
    }

    pub fn atom(atom: Atom) -> Self {
        Self::new(Body::Atom(atom))
    }

    pub fn vector(vector: Vector) -> Self {
        Self::new(Body::Vector(vector))
    }

    pub fn error(payload: ErrorObject) -> Self {
        Self::new(Body::Error(payload))
    }

    /// Interns `name` and wraps the id in a symbol atom.
    pub fn symbol(name: &str) -> Self {
        Self::atom(Atom::Symbol(interner::intern(name)))
    }

    /// A CHAR vector holding `text`.
    pub fn string(text: &str) -> Self {
        Self::vector(Vector::chars(text.as_bytes().to_vec()))
    }

    pub fn list(items: Vec<ObjRef>) -> Self {
        Self::vector(Vector::objects(Kind::List, items))
    }

    /// Hands ownership of this reference to the caller as a raw pointer.
    pub fn into_raw(self) -> *mut Obj {
        let ptr = self.0.as_ptr();
        std::mem::forget(self);
        ptr
    }

    /// Takes back one reference previously released by [`ObjRef::into_raw`].
    /// Returns `None` for null or dead pointers.
    pub fn from_raw(ptr: *mut Obj) -> Option<Self> {
        if !is_live(ptr) {
            return None;
        }
        NonNull::new(ptr).map(ObjRef)
    }

    /// Retains a borrowed raw handle, producing a new owned reference.
    pub fn retain_raw(ptr: *const Obj) -> Option<Self> {
        let obj = Self::from_raw(ptr.cast_mut())?;
        let owned = obj.clone();
        std::mem::forget(obj);
        Some(owned)
    }

    /// Runs `f` against a borrowed raw handle without touching its count.
    pub fn with_raw<R>(ptr: *const Obj, f: impl FnOnce(&Obj) -> R) -> Option<R> {
        if !is_live(ptr) {
            return None;
        }
        // SAFETY: live objects are only freed by the last ObjRef drop.
        Some(f(unsafe { &*ptr }))
    }

    pub fn as_ptr(&self) -> *mut Obj {
        self.0.as_ptr()
    }

    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        self.0 == other.0
    }
}

impl Clone for ObjRef {
    fn clone(&self) -> Self {
        let rc = &self.ref_count;
        rc.set(rc.get() + 1);
        ObjRef(self.0)
    }
}

impl Drop for ObjRef {
    fn drop(&mut self) {
        let remaining = self.ref_count.get().saturating_sub(1);
        self.ref_count.set(remaining);
        if remaining == 0 {
            unregister(self.0.as_ptr());
            // SAFETY: allocated by Box in `new`, and this was the last owner.
            unsafe { drop(Box::from_raw(self.0.as_ptr())) };
        }
    }
}

impl std::ops::Deref for ObjRef {
    type Target = Obj;

    fn deref(&self) -> &Obj {
        // SAFETY: the object stays allocated while any ObjRef exists.
        unsafe { self.0.as_ref() }
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ObjRef")
            .field("ptr", &self.0)
            .field("ref_count", &self.refcount())
            .field("body", &*self.body())
            .finish()
    }
}

//===----------------------------------------------------------------------===//
// Obj
//===----------------------------------------------------------------------===//

impl Obj {
    pub fn refcount(&self) -> u32 {
        self.ref_count.get()
    }

    pub fn body(&self) -> Ref<'_, Body> {
        self.body.borrow()
    }

    pub(crate) fn body_mut(&self) -> RefMut<'_, Body> {
        self.body.borrow_mut()
    }

    pub(crate) fn try_body_mut(&self) -> Option<RefMut<'_, Body>> {
        self.body.try_borrow_mut().ok()
    }

    pub fn kind(&self) -> Kind {
        match &*self.body() {
            Body::Null => Kind::Null,
            Body::Atom(atom) => atom.kind(),
            Body::Vector(vector) => vector.kind(),
            Body::Error(_) => Kind::Error,
        }
    }

    /// Signed wire code: negative for atoms.
    pub fn type_code(&self) -> i8 {
        let code = self.kind().code() as i8;
        if self.is_atom() { -code } else { code }
    }

    pub fn is_atom(&self) -> bool {
        matches!(&*self.body(), Body::Atom(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(&*self.body(), Body::Vector(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(&*self.body(), Body::Error(_))
    }

    /// True for the null object and for atoms holding their kind's null
    /// sentinel.
    pub fn is_null(&self) -> bool {
        match &*self.body() {
            Body::Null => true,
            Body::Atom(atom) => atom.is_null(),
            Body::Vector(_) | Body::Error(_) => false,
        }
    }

    /// Element count; atoms count as one.
    pub fn len(&self) -> usize {
        match &*self.body() {
            Body::Atom(_) => 1,
            Body::Vector(vector) => vector.len(),
            Body::Null | Body::Error(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_atom(&self) -> Option<Atom> {
        match &*self.body() {
            Body::Atom(atom) => Some(*atom),
            _ => None,
        }
    }

    /// Reads a CHAR vector as text, replacing invalid UTF-8.
    pub fn as_text(&self) -> Option<String> {
        match &*self.body() {
            Body::Vector(vector) if vector.kind() == Kind::Char => {
                vector.bytes().map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            }
            Body::Atom(Atom::Symbol(id)) => interner::resolve(*id),
            _ => None,
        }
    }

    /// Address of the first element of a vector's buffer.
    pub fn data_ptr(&self) -> Option<*mut u8> {
        match &mut *self.try_body_mut()? {
            Body::Vector(vector) => Some(vector.as_mut_ptr()),
            _ => None,
        }
    }

    pub fn byte_size(&self) -> usize {
        match &*self.body() {
            Body::Vector(vector) => vector.len() * vector.kind().element_size(),
            _ => 0,
        }
    }

    /// Buffer generation of a vector, bumped by every reallocating call.
    pub fn generation(&self) -> Option<u64> {
        match &*self.body() {
            Body::Vector(vector) => Some(vector.generation()),
            _ => None,
        }
    }

    /// Message for an error object; see [`ErrorObject::display_message`].
    pub fn error_message(&self) -> String {
        match &*self.body() {
            Body::Error(err) => err.display_message().to_owned(),
            _ => error::UNKNOWN_ERROR.to_owned(),
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match &*self.body() {
            Body::Error(err) => Some(err.code()),
            _ => None,
        }
    }

    /// Structured dict describing an error, or the null object.
    pub fn error_info(&self) -> ObjRef {
        match &*self.body() {
            Body::Error(err) => err.info(),
            _ => ObjRef::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_object_has_refcount_one() {
        let obj = ObjRef::atom(Atom::I64(42));
        assert_eq!(obj.refcount(), 1);
        assert!(is_live(obj.as_ptr()));
    }

    #[test]
    fn test_clone_shares_identity() {
        let obj = ObjRef::atom(Atom::I64(1));
        let other = obj.clone();
        assert!(obj.ptr_eq(&other));
        assert_eq!(obj.refcount(), 2);
        drop(other);
        assert_eq!(obj.refcount(), 1);
    }

    #[test]
    fn test_drop_unregisters() {
        let obj = ObjRef::null();
        let ptr = obj.as_ptr();
        drop(obj);
        assert!(!is_live(ptr));
        assert!(ObjRef::from_raw(ptr).is_none());
    }

    #[test]
    fn test_raw_roundtrip() {
        let ptr = ObjRef::string("abc").into_raw();
        assert!(is_live(ptr));
        let borrowed = ObjRef::retain_raw(ptr).unwrap();
        assert_eq!(borrowed.refcount(), 2);
        drop(borrowed);
        let owned = ObjRef::from_raw(ptr).unwrap();
        assert_eq!(owned.refcount(), 1);
    }

    #[test]
    fn test_children_released_with_parent() {
        let child = ObjRef::atom(Atom::I64(5));
        let child_ptr = child.as_ptr();
        let list = ObjRef::list(vec![child.clone()]);
        drop(child);
        assert!(is_live(child_ptr));
        drop(list);
        assert!(!is_live(child_ptr));
    }

    #[test]
    fn test_type_code_sign() {
        assert_eq!(ObjRef::atom(Atom::I64(0)).type_code(), -5);
        assert_eq!(ObjRef::string("x").type_code(), 12);
        assert_eq!(ObjRef::null().type_code(), 126);
    }

    #[test]
    fn test_null_predicates() {
        assert!(ObjRef::null().is_null());
        assert!(ObjRef::atom(Atom::I64(crate::kind::NULL_I64)).is_null());
        assert!(!ObjRef::atom(Atom::I64(0)).is_null());
        assert!(!ObjRef::list(vec![]).is_null());
    }

    #[test]
    fn test_atoms_have_no_data_pointer() {
        let atom = ObjRef::atom(Atom::F64(1.5));
        assert!(atom.data_ptr().is_none());
        assert_eq!(atom.byte_size(), 0);
        assert_eq!(atom.len(), 1);
    }

    #[test]
    fn test_empty_vector_has_pointer() {
        let vec = ObjRef::vector(Vector::new(Kind::I64, 0).unwrap());
        assert!(vec.data_ptr().is_some());
        assert_eq!(vec.byte_size(), 0);
    }
}
