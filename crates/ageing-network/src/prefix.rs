//! Bit-string prefixes naming regions of the XOR space.
//!
//! A prefix of length `L` covers exactly the names whose first `L` bits equal
//! its own. The empty prefix covers everything and is the trie root.
//!
//! Bits past `len` are always zero, so the derived ordering on
//! `(bits, len)` is the lexicographic ordering of the bit strings. In that
//! order every region's descendants form one contiguous run starting at the
//! region itself, which is what [`crate::Network`] relies on for descendant
//! lookups.

use crate::constants::{XOR_NAME_BITS, XOR_NAME_BYTES};
use crate::{Error, Result, XorName};

/// A region of the name space, identified by its leading bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Prefix {
    bits: [u8; XOR_NAME_BYTES],
    len: u16,
}

#[allow(clippy::len_without_is_empty)]
impl Prefix {
    /// The zero-length prefix covering the whole space.
    pub const fn root() -> Self {
        Self {
            bits: [0u8; XOR_NAME_BYTES],
            len: 0,
        }
    }

    /// The first `len` bits of `name`.
    pub fn from_name(name: &XorName, len: usize) -> Result<Self> {
        if len > XOR_NAME_BITS {
            return Err(Error::PrefixOverflow);
        }
        let mut bits = *name.as_bytes();
        mask_tail(&mut bits, len);
        Ok(Self {
            bits,
            len: len as u16,
        })
    }

    /// Parse a canonical key such as `"0110"`.
    pub fn from_key(key: &str) -> Option<Self> {
        if key.len() > XOR_NAME_BITS {
            return None;
        }
        let mut prefix = Self::root();
        for c in key.chars() {
            let bit = match c {
                '0' => false,
                '1' => true,
                _ => return None,
            };
            prefix = prefix.extend(bit).ok()?;
        }
        Some(prefix)
    }

    /// Number of bits.
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// True for the zero-length prefix.
    pub const fn is_root(&self) -> bool {
        self.len == 0
    }

    /// Raw bits, most significant first, zero past `len`.
    pub const fn as_bytes(&self) -> &[u8; XOR_NAME_BYTES] {
        &self.bits
    }

    /// Bit `index`, most significant first. False past the end.
    pub fn bit(&self, index: usize) -> bool {
        index < self.len() && self.bits[index / 8] & (0x80 >> (index % 8)) != 0
    }

    /// Append one bit.
    pub fn extend(&self, bit: bool) -> Result<Self> {
        let len = self.len();
        if len >= XOR_NAME_BITS {
            return Err(Error::PrefixOverflow);
        }
        let mut bits = self.bits;
        if bit {
            bits[len / 8] |= 0x80 >> (len % 8);
        }
        Ok(Self {
            bits,
            len: self.len + 1,
        })
    }

    /// Append a zero bit.
    pub fn extend_left(&self) -> Result<Self> {
        self.extend(false)
    }

    /// Append a one bit.
    pub fn extend_right(&self) -> Result<Self> {
        self.extend(true)
    }

    /// Drop the last bit.
    pub fn parent(&self) -> Result<Self> {
        if self.is_root() {
            return Err(Error::RootPrefix { op: "parent" });
        }
        Ok(self.truncate(self.len() - 1))
    }

    /// Flip the last bit.
    pub fn sibling(&self) -> Result<Self> {
        if self.is_root() {
            return Err(Error::RootPrefix { op: "sibling" });
        }
        Ok(self.flip(self.len() - 1))
    }

    /// The prefix differing from this one only at bit `index`.
    ///
    /// Returns `None` if `index` is not inside the prefix.
    pub fn neighbour(&self, index: usize) -> Option<Self> {
        (index < self.len()).then(|| self.flip(index))
    }

    /// The first `len` bits of this prefix (itself if `len` is longer).
    pub fn truncate(&self, len: usize) -> Self {
        let len = len.min(self.len());
        let mut bits = self.bits;
        mask_tail(&mut bits, len);
        Self {
            bits,
            len: len as u16,
        }
    }

    /// Check whether `name` lies in this region.
    pub fn matches(&self, name: &XorName) -> bool {
        leading_bits_equal(&self.bits, name.as_bytes(), self.len())
    }

    /// Check whether `other`'s region lies inside this one.
    ///
    /// A prefix covers itself.
    pub fn covers(&self, other: &Prefix) -> bool {
        other.len >= self.len && leading_bits_equal(&self.bits, &other.bits, self.len())
    }

    /// Number of differing bits, compared over the shorter of the two.
    pub fn hops_to(&self, other: &Prefix) -> usize {
        let len = self.len().min(other.len());
        let mut diff = [0u8; XOR_NAME_BYTES];
        for (out, (a, b)) in diff.iter_mut().zip(self.bits.iter().zip(other.bits.iter())) {
            *out = a ^ b;
        }
        mask_tail(&mut diff, len);
        diff.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Canonical key: one `0`/`1` character per bit.
    pub fn key(&self) -> String {
        (0..self.len())
            .map(|i| if self.bit(i) { '1' } else { '0' })
            .collect()
    }

    fn flip(&self, index: usize) -> Self {
        let mut bits = self.bits;
        bits[index / 8] ^= 0x80 >> (index % 8);
        Self {
            bits,
            len: self.len,
        }
    }
}

/// Zero every bit at position `len` and beyond.
fn mask_tail(bits: &mut [u8; XOR_NAME_BYTES], len: usize) {
    let full = len / 8;
    let rem = len % 8;
    if full >= XOR_NAME_BYTES {
        return;
    }
    bits[full] &= if rem == 0 { 0 } else { 0xFFu8 << (8 - rem) };
    for b in bits[full + 1..].iter_mut() {
        *b = 0;
    }
}

fn leading_bits_equal(a: &[u8; XOR_NAME_BYTES], b: &[u8; XOR_NAME_BYTES], len: usize) -> bool {
    let full = len / 8;
    if a[..full] != b[..full] {
        return false;
    }
    let rem = len % 8;
    if rem == 0 {
        return true;
    }
    let mask = 0xFFu8 << (8 - rem);
    (a[full] ^ b[full]) & mask == 0
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            write!(f, "(root)")
        } else {
            write!(f, "{}", self.key())
        }
    }
}

impl std::fmt::Debug for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Prefix({:?})", self.key())
    }
}
