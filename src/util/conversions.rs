use crate::util::constants::*;
use crate::util::Address;

/* Alignment */

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & align.wrapping_sub(1) == 0
}

/// Can `addr` be stored in the address field of a state word?  It must fit in 48 bits and keep
/// its low bits free.
pub fn fits_in_state_word(addr: Address) -> bool {
    (addr.as_usize() as u64) < STATE_WORD_ADDRESS_LIMIT && addr.is_aligned_to(MIN_OBJECT_ALIGNMENT)
}
