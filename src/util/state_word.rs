//! The per-object state word.
//!
//! A [`StateWord`] packs a 48-bit address and the 16 bits of an [`ObjectState`] into one 64-bit
//! atomic cell:
//!
//! ```text
//!  63            48 47            32 31                             0
//! +----------------+----------------+--------------------------------+
//! |   state bits   | address high16 |          address low32         |
//! +----------------+----------------+--------------------------------+
//! ```
//!
//! While the state is forwardable the address is the object's type info.  Once the state is
//! forwarded the address is the forwarding pointer to the evacuated copy.  Because address and
//! state share one atomic word, a thread that observes `Forwarded` with an acquire load also
//! observes the forwarding pointer published with it.
//!
//! Accessors named `get_*`/`set_*` without `atomic_` are plain accesses (relaxed, never a
//! read-modify-write).  They are only correct when the caller has exclusive access to the object,
//! such as during object construction or while holding the lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use static_assertions::const_assert_eq;

use crate::util::constants::*;
use crate::util::conversions;
use crate::util::object_state::{ObjectState, ObjectStateCode, StateBits};
use crate::util::{Address, ObjectReference};

const ADDRESS_LOW_BITS: u32 = 32;
const ADDRESS_HIGH_BITS: u32 = 16;
const ADDRESS_LOW_MASK: u64 = (1 << ADDRESS_LOW_BITS) - 1;
const ADDRESS_HIGH_MASK: u64 = (1 << ADDRESS_HIGH_BITS) - 1;
const ADDRESS_MASK: u64 = STATE_WORD_ADDRESS_LIMIT - 1;
const STATE_SHIFT: u32 = LOG_ADDRESS_SPACE_IN_STATE_WORD as u32;

const_assert_eq!(ADDRESS_LOW_BITS + ADDRESS_HIGH_BITS, STATE_SHIFT);
const_assert_eq!(
    STATE_SHIFT as usize + std::mem::size_of::<StateBits>() * BITS_IN_BYTE,
    BITS_IN_STATE_WORD
);

#[inline(always)]
const fn pack(address: u64, state: ObjectState) -> u64 {
    (address & ADDRESS_MASK) | ((state.get_state_bits() as u64) << STATE_SHIFT)
}

#[inline(always)]
const fn unpack_address(word: u64) -> u64 {
    let low = word & ADDRESS_LOW_MASK;
    let high = (word >> ADDRESS_LOW_BITS) & ADDRESS_HIGH_MASK;
    (high << ADDRESS_LOW_BITS) | low
}

#[inline(always)]
const fn unpack_state(word: u64) -> ObjectState {
    ObjectState::from_state_bits((word >> STATE_SHIFT) as StateBits)
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        // compare_exchange_weak does not fail spuriously on x86_64.
        #[inline(always)]
        fn exchange_word(cell: &AtomicU64, current: u64, new: u64) -> bool {
            cell.compare_exchange_weak(current, new, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        }
    } else {
        // Due to spurious failure of compare_exchange_weak, compare_exchange (strong) is chosen.
        #[inline(always)]
        fn exchange_word(cell: &AtomicU64, current: u64, new: u64) -> bool {
            cell.compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        }
    }
}

/// The state word of one object header.  See the module documentation for the layout.
#[repr(transparent)]
#[derive(Default)]
pub struct StateWord {
    word: AtomicU64,
}

const_assert_eq!(std::mem::size_of::<StateWord>(), std::mem::size_of::<u64>());

impl StateWord {
    /// A fresh word: no type info, `Initial` state.
    pub const fn new() -> Self {
        StateWord {
            word: AtomicU64::new(0),
        }
    }

    /// A word for a newly allocated object with the given type info.
    pub fn with_type_info(type_info: Address) -> Self {
        Self::debug_check_address(type_info);
        StateWord {
            word: AtomicU64::new(pack(
                type_info.as_usize() as u64,
                ObjectState::new(ObjectStateCode::Initial),
            )),
        }
    }

    #[inline(always)]
    fn debug_check_address(addr: Address) {
        debug_assert!(
            conversions::fits_in_state_word(addr),
            "{} cannot be stored in a state word: it must be {}-byte aligned and below {:#x}",
            addr,
            MIN_OBJECT_ALIGNMENT,
            STATE_WORD_ADDRESS_LIMIT,
        );
    }

    #[inline(always)]
    fn extreme_assertions(&self) {
        #[cfg(feature = "extreme_assertions")]
        {
            let state = self.atomic_get_object_state();
            assert!(
                state.has_valid_state_code(),
                "Corrupted state word {:?}",
                self
            );
        }
    }

    /// The raw 64-bit value (acquire load).
    pub fn load_raw(&self) -> u64 {
        self.word.load(Ordering::Acquire)
    }

    /// Bits 0..32 of the address.
    pub fn address_low32(&self) -> u32 {
        (self.word.load(Ordering::Relaxed) & ADDRESS_LOW_MASK) as u32
    }

    /// Bits 32..48 of the address.
    pub fn address_high16(&self) -> u16 {
        ((self.word.load(Ordering::Relaxed) >> ADDRESS_LOW_BITS) & ADDRESS_HIGH_MASK) as u16
    }

    fn get_address(&self) -> Address {
        let raw = unpack_address(self.word.load(Ordering::Relaxed));
        unsafe { Address::from_usize(raw as usize) }
    }

    fn set_address(&self, addr: Address) {
        let old = self.word.load(Ordering::Relaxed);
        self.word
            .store(pack(addr.as_usize() as u64, unpack_state(old)), Ordering::Relaxed);
    }

    /// Set the type info.  Plain access: the object must not be visible to other threads yet, or
    /// no collection may be running.
    pub fn set_type_info(&self, type_info: Address) {
        Self::debug_check_address(type_info);
        self.set_address(type_info);
    }

    /// Get the type info.  Plain access, see [`StateWord::set_type_info`].  The result is only
    /// meaningful while the state is forwardable.
    pub fn get_type_info(&self) -> Address {
        self.get_address()
    }

    /// Has this word ever been given type info?  A consistency check, not a synchronization
    /// primitive.
    pub fn is_valid_state_word(&self) -> bool {
        !self.get_type_info().is_zero()
    }

    /// Plain read of the state.
    pub fn get_object_state(&self) -> ObjectState {
        unpack_state(self.word.load(Ordering::Relaxed))
    }

    /// Plain write of the whole state.  Requires exclusive access.
    pub fn set_object_state(&self, state: ObjectState) {
        let old = self.word.load(Ordering::Relaxed);
        self.word
            .store(pack(unpack_address(old), state), Ordering::Relaxed);
    }

    /// Plain read of the state code.
    pub fn get_state_code(&self) -> ObjectStateCode {
        self.get_object_state().get_state_code()
    }

    /// Plain write of the state code, keeping the auxiliary bits.  Requires exclusive access.
    pub fn set_state_code(&self, code: ObjectStateCode) {
        self.set_object_state(self.get_object_state().with_state_code(code));
    }

    /// Load the state with acquire ordering.  A reader that observes a state published with
    /// release ordering also observes the address published with it.
    pub fn atomic_get_object_state(&self) -> ObjectState {
        unpack_state(self.word.load(Ordering::Acquire))
    }

    /// Load the state bits with acquire ordering.
    pub fn atomic_get_state_bits(&self) -> StateBits {
        self.atomic_get_object_state().get_state_bits()
    }

    /// Publish new state bits with release ordering, leaving the address untouched.
    ///
    /// The caller must already own the object (for example after a successful
    /// [`StateWord::try_lock_state_word`]); this is not a compare-exchange.
    pub fn atomic_set_state_bits(&self, bits: StateBits) {
        let old = self.word.load(Ordering::Relaxed);
        self.word.store(
            pack(unpack_address(old), ObjectState::from_state_bits(bits)),
            Ordering::Release,
        );
        self.extreme_assertions();
    }

    /// Replace the state bits with `new` if they currently equal `expected`.  The address is
    /// left as it is.
    ///
    /// Returns true iff the exchange happened.  A false return means another thread got there
    /// first; it is not an error.  On x86_64 this is a weak acquire-release exchange, elsewhere a
    /// strong sequentially consistent one.
    pub fn compare_exchange_state_bits(&self, expected: StateBits, new: StateBits) -> bool {
        let current = self.word.load(Ordering::Acquire);
        if unpack_state(current).get_state_bits() != expected {
            return false;
        }
        let desired = pack(unpack_address(current), ObjectState::from_state_bits(new));
        exchange_word(&self.word, current, desired)
    }

    /// Try to claim the object.  `current` must be a snapshot from
    /// [`StateWord::atomic_get_object_state`].
    ///
    /// Returns false without touching the word if `current` is already locked.  Otherwise the
    /// state moves to `Locked` (auxiliary bits kept) only if it still equals `current`.  Of all
    /// threads racing with the same snapshot, at most one gets true, and that thread alone may
    /// forward or unlock the object.
    pub fn try_lock_state_word(&self, current: ObjectState) -> bool {
        if current.is_locked_state() {
            return false;
        }
        let locked = current.with_state_code(ObjectStateCode::Locked);
        self.compare_exchange_state_bits(current.get_state_bits(), locked.get_state_bits())
    }

    /// Release the lock by moving to `new_state`.  Only the thread that locked the word may call
    /// this.  The exchange is retried until it succeeds; since no other thread modifies a locked
    /// word, that is the first or second attempt.
    pub fn unlock_state_word(&self, new_state: ObjectState) {
        debug_assert!(
            self.atomic_get_object_state().is_locked_state(),
            "unlock_state_word called on {:?}, which is not locked",
            self
        );
        loop {
            let current = self.atomic_get_object_state();
            if self.compare_exchange_state_bits(current.get_state_bits(), new_state.get_state_bits())
            {
                break;
            }
            std::hint::spin_loop();
        }
        self.extreme_assertions();
    }

    /// Install the forwarding pointer and move to `Forwarded`.  The caller must hold the lock, so
    /// no exchange is needed: address and state are published together by one release store.
    pub fn set_forwarding_pointer_exclusive(&self, forwarded: ObjectReference) {
        let addr = forwarded.to_raw_address();
        Self::debug_check_address(addr);
        let old = self.word.load(Ordering::Relaxed);
        debug_assert!(
            unpack_state(old).is_locked_state(),
            "set_forwarding_pointer_exclusive called on {:?}, which is not locked",
            self
        );
        trace!("set_forwarding_pointer_exclusive({:?}, {})", self, forwarded);
        let state = unpack_state(old).with_state_code(ObjectStateCode::Forwarded);
        self.word
            .store(pack(addr.as_usize() as u64, state), Ordering::Release);
        self.extreme_assertions();
    }

    /// Read the forwarding pointer.  The caller must have observed `Forwarded` first; this is
    /// only checked in debug builds.  On a word that is not forwarded the result is the type info
    /// reinterpreted as an object, and a word without any address panics.
    pub fn get_forwarding_pointer(&self) -> ObjectReference {
        let word = self.word.load(Ordering::Acquire);
        debug_assert!(
            unpack_state(word).is_forwarded_state(),
            "get_forwarding_pointer called on {:?}, which is not forwarded",
            self
        );
        let addr = unsafe { Address::from_usize(unpack_address(word) as usize) };
        match ObjectReference::from_raw_address(addr) {
            Some(object) => object,
            None => panic!("State word {:?} holds no forwarding pointer", self),
        }
    }

    /// Acquire-load predicate, see [`ObjectState::is_forwardable_state`].
    pub fn is_forwardable_state(&self) -> bool {
        self.atomic_get_object_state().is_forwardable_state()
    }

    /// Acquire-load predicate, see [`ObjectState::is_locked_state`].
    pub fn is_locked_state(&self) -> bool {
        self.atomic_get_object_state().is_locked_state()
    }

    /// Acquire-load predicate, see [`ObjectState::is_forwarded_state`].
    pub fn is_forwarded_state(&self) -> bool {
        self.atomic_get_object_state().is_forwarded_state()
    }
}

impl fmt::Debug for StateWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = self.word.load(Ordering::Relaxed);
        write!(
            f,
            "StateWord({:#x}, {:?})",
            unpack_address(word),
            unpack_state(word)
        )
    }
}

/// The common header of every heap object.  The state word comes first, so the header of an
/// object is found at its [`ObjectReference`].
#[repr(C)]
#[derive(Debug, Default)]
pub struct BaseObject {
    state_word: StateWord,
}

impl BaseObject {
    pub const fn new() -> Self {
        BaseObject {
            state_word: StateWord::new(),
        }
    }

    pub fn with_type_info(type_info: Address) -> Self {
        BaseObject {
            state_word: StateWord::with_type_info(type_info),
        }
    }

    pub fn state_word(&self) -> &StateWord {
        &self.state_word
    }

    /// The object reference of this header.
    pub fn object_reference(&self) -> ObjectReference {
        // A reference is never null.
        unsafe { ObjectReference::from_raw_address_unchecked(Address::from_ref(self)) }
    }

    /// Access the header of a heap object.
    ///
    /// # Safety
    /// `object` must point to a live `BaseObject` that outlives `'a`.
    pub unsafe fn from_object<'a>(object: ObjectReference) -> &'a BaseObject {
        object.to_raw_address().as_ref::<BaseObject>()
    }
}
