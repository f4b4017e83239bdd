/// log2 of the number of bits in a byte
pub const LOG_BITS_IN_BYTE: u8 = 3;
/// The number of bits in a byte
pub const BITS_IN_BYTE: usize = 1 << LOG_BITS_IN_BYTE;

/// log2 of the number of bytes in a state word. The state word is 64 bits on every target.
pub const LOG_BYTES_IN_STATE_WORD: u8 = 3;
/// The number of bytes in a state word.
pub const BYTES_IN_STATE_WORD: usize = 1 << LOG_BYTES_IN_STATE_WORD;
/// The number of bits in a state word.
pub const BITS_IN_STATE_WORD: usize = BYTES_IN_STATE_WORD * BITS_IN_BYTE;

/// log2 of the alignment of heap objects and type info records.  The low bits of such pointers
/// are always zero, which is what lets the state word keep the pointer in 48 bits.
pub const LOG_MIN_OBJECT_ALIGNMENT: u8 = 3;
/// The alignment of heap objects and type info records.
pub const MIN_OBJECT_ALIGNMENT: usize = 1 << LOG_MIN_OBJECT_ALIGNMENT;

/// The number of address bits a state word can hold.
pub const LOG_ADDRESS_SPACE_IN_STATE_WORD: u8 = 48;
/// Exclusive upper bound of addresses a state word can hold.
pub const STATE_WORD_ADDRESS_LIMIT: u64 = 1 << LOG_ADDRESS_SPACE_IN_STATE_WORD;
