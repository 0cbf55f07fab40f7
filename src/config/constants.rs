//! Defaults shared by the session, the CSV reader and the wire format.
//!
//! ```text
//! DEFAULT_COMMAND_PREFIX ("cmd")
//!       └─> generated source names are "{prefix}:{n}", n starting at 1
//!
//! DEFAULT_CSV_SEPARATOR (b',')
//!       └─> must differ from b'\n', b'\r' and the quote byte b'"'
//!
//! WIRE_MAGIC + WIRE_VERSION
//!       └─> first three bytes of every serialized object
//!
//! MAX_NESTING (512)
//!       └─> bounds reader and wire decoder recursion
//! ```

pub const DEFAULT_COMMAND_PREFIX: &str = "cmd";

pub const DEFAULT_CSV_SEPARATOR: u8 = b',';

pub const CSV_QUOTE: u8 = b'"';

/// No limit beyond what the allocator refuses.
pub const DEFAULT_MAX_CSV_BYTES: usize = usize::MAX;

pub const WIRE_MAGIC: [u8; 2] = *b"CR";

pub const WIRE_VERSION: u8 = 1;

/// Deepest bracket nesting the reader accepts and deepest object nesting the
/// wire decoder rebuilds. Both recurse once per level.
pub const MAX_NESTING: usize = 512;

/// Filter used by `logging::init` when neither the caller nor `RUST_LOG`
/// provides one.
pub const DEFAULT_LOG_FILTER: &str = "colrt=info";

const _: () = assert!(DEFAULT_CSV_SEPARATOR != CSV_QUOTE);
const _: () = assert!(DEFAULT_CSV_SEPARATOR != b'\n');
