//! 256-bit names in the XOR address space.

use primitive_types::U256;
use rand::RngCore;

use crate::constants::{XOR_NAME_BITS, XOR_NAME_BYTES};
use crate::Prefix;

/// A point in the 256-bit identifier space.
///
/// Bytes are big-endian, so the derived ordering is the unsigned integer
/// ordering and bit 0 is the most significant bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XorName(pub [u8; XOR_NAME_BYTES]);

impl XorName {
    /// The all-zero name.
    pub const ZERO: Self = Self([0u8; XOR_NAME_BYTES]);

    /// Create a name from raw bytes.
    pub const fn from_bytes(bytes: [u8; XOR_NAME_BYTES]) -> Self {
        Self(bytes)
    }

    /// Draw 256 independent bits from `rng`.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; XOR_NAME_BYTES];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Derive a name from the digest of a string's bytes.
    pub fn from_string(s: &str) -> Self {
        Self(*blake3::hash(s.as_bytes()).as_bytes())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; XOR_NAME_BYTES] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; XOR_NAME_BYTES] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// Bitwise XOR with another name.
    pub fn xor_distance(&self, other: &XorName) -> XorName {
        let mut result = [0u8; XOR_NAME_BYTES];
        for (out, (a, b)) in result.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *out = a ^ b;
        }
        XorName(result)
    }

    /// Test bit `index`, most significant first.
    pub fn bit(&self, index: usize) -> bool {
        if index >= XOR_NAME_BITS {
            return false;
        }
        self.0[index / 8] & (0x80 >> (index % 8)) != 0
    }

    /// Overwrite the leading bits with `prefix`, keeping the rest.
    pub fn with_prefix(&self, prefix: &Prefix) -> XorName {
        let mut bytes = self.0;
        let len = prefix.len();
        let full = len / 8;
        bytes[..full].copy_from_slice(&prefix.as_bytes()[..full]);
        let rem = len % 8;
        if rem != 0 {
            let mask = 0xFFu8 << (8 - rem);
            bytes[full] = (bytes[full] & !mask) | (prefix.as_bytes()[full] & mask);
        }
        XorName(bytes)
    }

    /// Interpret as an unsigned 256-bit integer.
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// Check for the all-zero name.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl From<U256> for XorName {
    fn from(value: U256) -> Self {
        let mut bytes = [0u8; XOR_NAME_BYTES];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }
}

impl std::fmt::Display for XorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 hex chars
        write!(f, "{}...", &self.to_hex()[..8])
    }
}

impl std::fmt::Debug for XorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "XorName({})", self.to_hex())
    }
}
