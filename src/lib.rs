//! Reference-counted columnar objects for host environments.
//!
//! A host (a scripting runtime) drives the crate through the `colrt_*`
//! functions in [`ffi`]: it builds and reads tagged objects, borrows vector
//! memory in place, evaluates expressions through a [`Session`] and ingests
//! CSV text into tables. Rust callers use the same pieces directly.

pub mod config;
pub mod csv;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod format;
pub mod interner;
pub mod kind;
pub mod logging;
pub mod object;
pub mod session;
pub mod view;

pub use config::SessionConfig;
pub use engine::{BasicEngine, Engine};
pub use error::{Error, Result};
pub use kind::Kind;
pub use object::{Atom, Obj, ObjRef, Vector};
pub use session::Session;
pub use view::View;
