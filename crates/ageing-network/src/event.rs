//! Outcome of one membership change.

use primitive_types::U256;
use rand::RngCore;

use crate::{Section, Vault, XorName};

/// The result of adding or removing a vault.
///
/// Carries a fresh 256-bit event hash, unrelated to any vault's name, which
/// decides relocation eligibility.
#[derive(Debug, Clone)]
pub struct MembershipEvent {
    /// Random draw made for this event.
    pub hash: XorName,
    /// Leaf sections produced by a split (or by bootstrapping a section).
    pub new_sections: Vec<Section>,
    /// Vault chosen to move to a neighbouring section.
    pub relocate: Option<Vault>,
}

impl MembershipEvent {
    /// A new event with a hash drawn from `rng`.
    pub fn new<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self::with_hash(XorName::random(rng))
    }

    /// A new event with a chosen hash.
    pub fn with_hash(hash: XorName) -> Self {
        Self {
            hash,
            new_sections: Vec::new(),
            relocate: None,
        }
    }

    /// True when `hash % divisor == 0`. A zero divisor never divides.
    pub fn hash_mod_is_zero(&self, divisor: U256) -> bool {
        if divisor.is_zero() {
            return false;
        }
        (self.hash.to_u256() % divisor).is_zero()
    }

    /// True when `hash % 2^age == 0`, i.e. the low `age` bits are clear.
    pub fn triggers_age(&self, age: u32) -> bool {
        let hash = self.hash.to_u256();
        // zero is a multiple of every power of two, however large
        hash.is_zero() || hash.trailing_zeros() >= age
    }

    /// Whether a split happened.
    pub fn is_split(&self) -> bool {
        !self.new_sections.is_empty()
    }
}
