//! gcstate is the per-object synchronization and root enumeration layer of a concurrent, moving
//! garbage collector.
//!
//! *  [`util::state_word`] packs an object's type info pointer (later its forwarding pointer) and
//!    its GC state into one atomically updated 64-bit header word.  GC workers race to lock an
//!    object with a compare-exchange; the winner copies it and publishes the forwarding pointer.
//!    [`util::object_forwarding`] builds the forwarding protocol on top of it.
//! *  [`RootManager`] enumerates roots by phase.  Roots come from the root sets registered at run
//!    time ([`roots::DynamicRoots`] and each [`vm::Mutator`]) and from the runtime's static roots,
//!    which it reports through a [`vm::RootScanner`] given to [`RootManager::new`].  A runtime that
//!    exposes its static roots as plain functions registers them with [`vm::StaticRootHooks`].

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod build_info;
mod root_manager;
pub mod roots;
pub mod util;
pub mod vm;

pub use crate::root_manager::RootManager;
