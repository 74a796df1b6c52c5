//! Protocol constants shared by sections and the network.
//!
//! `GROUP_SIZE` plays two roles: it bounds the elder set of a section and it
//! is the adult count at or below which a section merges back into its
//! parent. Both uses are intended to move together, so they are aliases of
//! one value rather than independent knobs.

/// Target number of elders per section.
pub const GROUP_SIZE: usize = 8;

/// Extra adults each half needs beyond `GROUP_SIZE` before a split.
pub const SPLIT_BUFFER: usize = 3;

/// Adults each would-be child must hold for its parent to split.
pub const SPLIT_SIZE: usize = GROUP_SIZE + SPLIT_BUFFER;

/// Number of elders taking part in quorum decisions.
pub const ELDER_COUNT: usize = GROUP_SIZE;

/// A section merges once its adult count falls to this value.
pub const MERGE_ADULTS: usize = GROUP_SIZE;

/// Quorum ratio numerator (strict majority is `> 1/2`).
pub const QUORUM_NUMERATOR: usize = 1;

/// Quorum ratio denominator.
pub const QUORUM_DENOMINATOR: usize = 2;

/// Vaults older than this are adults.
pub const ADULT_AGE: u32 = 4;

/// Age of a freshly joined vault.
pub const INFANT_AGE: u32 = 1;

/// Width of the identifier space in bits.
pub const XOR_NAME_BITS: usize = 256;

/// Width of the identifier space in bytes.
pub const XOR_NAME_BYTES: usize = XOR_NAME_BITS / 8;

const _: () = assert!(SPLIT_SIZE == GROUP_SIZE + SPLIT_BUFFER);
const _: () = assert!(ELDER_COUNT == MERGE_ADULTS);
const _: () = assert!(QUORUM_NUMERATOR < QUORUM_DENOMINATOR);
const _: () = assert!(INFANT_AGE <= ADULT_AGE);
