//! Root slots.
//!
//! A slot is a word in memory owned by the runtime (a global variable, a handle, a stack slot)
//! that holds either null or an [`ObjectReference`].  The collector loads the reference from the
//! slot, and stores a new one when the object moves or, for a weak root, when the object dies.

use std::fmt;
use std::hash::Hash;

use atomic::Atomic;

use crate::util::{Address, ObjectReference};

/// A simple slot implementation that represents a word-sized slot which holds the raw address of
/// an `ObjectReference`, or 0 if it is holding a null reference.
///
/// A `SimpleSlot` points to a slot and is not the slot itself; copies point to the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SimpleSlot {
    slot_addr: *mut Atomic<Address>,
}

impl SimpleSlot {
    /// Create a simple slot from an address.
    ///
    /// Arguments:
    /// *   `address`: The address in memory where an `ObjectReference` is stored.
    pub fn from_address(address: Address) -> Self {
        Self {
            slot_addr: address.to_mut_ptr(),
        }
    }

    /// Create a slot for an atomic cell.  The cell must outlive every use of the slot.
    pub fn from_cell(cell: &Atomic<Address>) -> Self {
        Self {
            slot_addr: cell as *const Atomic<Address> as *mut Atomic<Address>,
        }
    }

    /// Get the address of the slot.
    ///
    /// Return the address at which the `ObjectReference` is stored.
    pub fn as_address(&self) -> Address {
        Address::from_mut_ptr(self.slot_addr)
    }

    /// Load the raw content of the slot, without checking that it is a valid reference.
    pub fn load_raw(&self) -> Address {
        unsafe { (*self.slot_addr).load(atomic::Ordering::Relaxed) }
    }

    /// Load object reference from the slot.  Returns `None` if the slot holds null.
    pub fn load(&self) -> Option<ObjectReference> {
        ObjectReference::from_raw_address(self.load_raw())
    }

    /// Store the object reference `object` into the slot.
    pub fn store(&self, object: ObjectReference) {
        unsafe { (*self.slot_addr).store(object.to_raw_address(), atomic::Ordering::Relaxed) }
    }

    /// Store null into the slot.
    pub fn clear(&self) {
        unsafe { (*self.slot_addr).store(Address::ZERO, atomic::Ordering::Relaxed) }
    }
}

unsafe impl Send for SimpleSlot {}
// A slot is only a pointer to an atomic cell; sharing it shares nothing but the address.
unsafe impl Sync for SimpleSlot {}

impl fmt::Debug for SimpleSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SimpleSlot({})", self.as_address())
    }
}
