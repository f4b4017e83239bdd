//! The locking/forwarding state of one object header.
//!
//! An [`ObjectState`] is a plain 16-bit value.  The low three bits hold an [`ObjectStateCode`];
//! the other bits are auxiliary bits that belong to the embedding runtime and are carried
//! unchanged through every state transition.  The atomic accessors live on
//! [`crate::util::state_word::StateWord`], since the state bits are stored in the same atomic
//! word as the address they describe.

use std::fmt;

use strum_macros::{Display, EnumIter, FromRepr};

/// The raw representation of an [`ObjectState`].
pub type StateBits = u16;

/// Number of bits used by the state code.
pub const STATE_CODE_BITS: usize = 3;
/// Mask of the state code within the state bits.
pub const STATE_CODE_MASK: StateBits = (1 << STATE_CODE_BITS) - 1;
/// Mask of the auxiliary bits within the state bits.
pub const AUX_BITS_MASK: StateBits = !STATE_CODE_MASK;

/// The state codes.  Code 2 and codes 5 to 7 are reserved and never produced by this crate.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
pub enum ObjectStateCode {
    /// The object is unlocked and its state word holds type info.
    Initial = 0,
    /// A thread has claimed the object, usually to evacuate it.
    Locked = 1,
    /// The object has been evacuated and its state word holds the forwarding pointer.
    Forwarded = 3,
    /// The object is the to-space version of an evacuated object.
    ToVersion = 4,
}

/// A snapshot of the state bits of an object header.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ObjectState(StateBits);

impl ObjectState {
    /// A state with the given code and no auxiliary bits.
    pub const fn new(code: ObjectStateCode) -> Self {
        ObjectState(code as StateBits)
    }

    /// Reinterpret raw state bits.
    pub const fn from_state_bits(bits: StateBits) -> Self {
        ObjectState(bits)
    }

    pub const fn get_state_bits(self) -> StateBits {
        self.0
    }

    pub fn set_state_bits(&mut self, bits: StateBits) {
        self.0 = bits;
    }

    /// Decode the state code.  Decoding a reserved code is a broken header; debug builds panic,
    /// release builds read it as `Initial`.
    pub fn get_state_code(self) -> ObjectStateCode {
        let raw = self.0 & STATE_CODE_MASK;
        match ObjectStateCode::from_repr(raw) {
            Some(code) => code,
            None => {
                debug_assert!(false, "Reserved object state code {} in {:?}", raw, self);
                ObjectStateCode::Initial
            }
        }
    }

    /// Replace the state code, keeping the auxiliary bits.
    pub fn set_state_code(&mut self, code: ObjectStateCode) {
        self.0 = (self.0 & AUX_BITS_MASK) | code as StateBits;
    }

    /// A copy of this state with `code` in place of the current code.
    pub const fn with_state_code(self, code: ObjectStateCode) -> Self {
        ObjectState((self.0 & AUX_BITS_MASK) | code as StateBits)
    }

    /// The auxiliary bits, shifted down to start at bit 0.
    pub const fn aux_bits(self) -> StateBits {
        (self.0 & AUX_BITS_MASK) >> STATE_CODE_BITS
    }

    /// A copy of this state with the given auxiliary bits.
    pub const fn with_aux_bits(self, aux: StateBits) -> Self {
        ObjectState((self.0 & STATE_CODE_MASK) | ((aux << STATE_CODE_BITS) & AUX_BITS_MASK))
    }

    /// Does the code decode to a known state?
    pub fn has_valid_state_code(self) -> bool {
        ObjectStateCode::from_repr(self.0 & STATE_CODE_MASK).is_some()
    }

    pub fn is_forwardable_state(self) -> bool {
        self.get_state_code() == ObjectStateCode::Initial
    }

    pub fn is_locked_state(self) -> bool {
        self.get_state_code() == ObjectStateCode::Locked
    }

    pub fn is_forwarded_state(self) -> bool {
        self.get_state_code() == ObjectStateCode::Forwarded
    }

    pub fn is_to_version_state(self) -> bool {
        self.get_state_code() == ObjectStateCode::ToVersion
    }
}

impl From<ObjectStateCode> for ObjectState {
    fn from(code: ObjectStateCode) -> Self {
        ObjectState::new(code)
    }
}

impl fmt::Debug for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match ObjectStateCode::from_repr(self.0 & STATE_CODE_MASK) {
            Some(code) => write!(f, "ObjectState({}, aux={:#x})", code, self.aux_bits()),
            None => write!(f, "ObjectState(<reserved {:#x}>)", self.0),
        }
    }
}
