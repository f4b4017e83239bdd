use bytemuck::NoUninit;

use std::fmt;
use std::num::NonZeroUsize;

use crate::util::constants::MIN_OBJECT_ALIGNMENT;
use crate::util::conversions;

/// A raw machine address.  It may be zero and may point anywhere, so the only operations offered
/// are conversions and alignment queries.  Root cells store `Address`, and the state word keeps
/// the type info pointer as one.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq, NoUninit)]
pub struct Address(usize);

impl Address {
    /// The null address.  Cleared root cells hold it.
    pub const ZERO: Self = Address(0);

    pub fn from_ref<T>(r: &T) -> Address {
        Address(r as *const T as usize)
    }

    pub fn from_mut_ptr<T>(ptr: *mut T) -> Address {
        Address(ptr as usize)
    }

    /// Create an address from an integer.
    ///
    /// # Safety
    /// Nothing checks that `raw` points to anything.  Use it for hard-coded addresses, and for
    /// addresses that were earlier obtained from [`Address::as_usize`].
    pub const unsafe fn from_usize(raw: usize) -> Address {
        Address(raw)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Is the address a multiple of `align`?  `align` must be a power of two.
    pub const fn is_aligned_to(self, align: usize) -> bool {
        conversions::raw_is_aligned(self.0, align)
    }

    pub fn to_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// Borrow the `T` at this address.
    ///
    /// # Safety
    /// The address must point to a live, properly aligned `T` for the whole of `'a`.
    pub unsafe fn as_ref<'a, T>(self) -> &'a T {
        &*self.to_mut_ptr()
    }

    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The address of an object header.  Unlike [`Address`] it is never zero, so an empty root slot
/// reads as `None`.
///
/// Every object header starts with a [`crate::util::state_word::StateWord`], which is what
/// forwarding pointers and root slots refer to.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq, NoUninit)]
pub struct ObjectReference(NonZeroUsize);

impl ObjectReference {
    /// Object headers are aligned to this.  Debug builds assert it whenever a reference is made.
    pub const ALIGNMENT: usize = MIN_OBJECT_ALIGNMENT;

    pub fn to_raw_address(self) -> Address {
        Address(self.0.get())
    }

    /// Turn a raw address into a reference.  Zero gives `None`.
    pub fn from_raw_address(addr: Address) -> Option<ObjectReference> {
        debug_assert!(
            addr.is_aligned_to(Self::ALIGNMENT),
            "ObjectReference is required to be word aligned.  addr: {addr}"
        );
        NonZeroUsize::new(addr.0).map(ObjectReference)
    }

    /// Turn a raw address into a reference without checking it against zero.
    ///
    /// # Safety
    /// `addr` must not be zero.
    pub unsafe fn from_raw_address_unchecked(addr: Address) -> ObjectReference {
        debug_assert!(!addr.is_zero());
        debug_assert!(
            addr.is_aligned_to(Self::ALIGNMENT),
            "ObjectReference is required to be word aligned.  addr: {addr}"
        );
        ObjectReference(NonZeroUsize::new_unchecked(addr.0))
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
