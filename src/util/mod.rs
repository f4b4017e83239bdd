//! Utilities used by the rest of the crate: addresses and object references, the state word and
//! object state encodings, forwarding, options and logging.

/// Address and object reference types.
pub mod address;
/// Constants for address and word sizes.
pub mod constants;
/// Calculation and alignment helpers.
pub mod conversions;
/// The logger set-up.
pub mod logger;
/// Claiming and forwarding objects through their state words.
pub mod object_forwarding;
/// The GC state of an object.
pub mod object_state;
/// Pointers the collector passes around but never dereferences.
pub mod opaque_pointer;
/// Runtime options.
pub mod options;
/// The object header word.
pub mod state_word;
/// Test utilities.  Public so that integration tests and benchmarks can use them.
pub mod test_util;

pub use self::address::Address;
pub use self::address::ObjectReference;
pub use self::opaque_pointer::*;
