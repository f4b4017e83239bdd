//! The interface between the collector and the runtime that embeds it.
//!
//! The runtime owns its objects' layout and most of its roots.  It registers root slots with the
//! collector ([`crate::roots`], [`Mutator`]), and reports the rest through a [`RootScanner`].
//! Visitors receive roots as [`slot::SimpleSlot`]s, words that hold an object reference or null.

mod hooks;
mod mutator;
pub mod scanning;
pub mod slot;

pub use self::hooks::*;
pub use self::mutator::Mutator;
pub use self::scanning::{
    GCRoot, NoStaticRoots, RootScanner, RootType, RootUpdater, RootVisitor, WeakRootVisitor,
};
pub use self::slot::SimpleSlot;
