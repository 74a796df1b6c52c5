//! Simulated network nodes.

use rand::RngCore;

use crate::constants::{ADULT_AGE, INFANT_AGE};
use crate::{Prefix, XorName};

/// A node in the simulated network.
///
/// The prefix is stamped by whichever section currently holds the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vault {
    name: XorName,
    prefix: Prefix,
    age: u32,
    attacker: bool,
}

impl Vault {
    /// A fresh infant vault with a random name.
    pub fn new<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self::with_name(XorName::random(rng))
    }

    /// A fresh attacker-controlled infant vault with a random name.
    pub fn attacker<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self::new(rng).as_attacker()
    }

    /// A fresh infant vault with the given name.
    pub fn with_name(name: XorName) -> Self {
        Self {
            name,
            prefix: Prefix::root(),
            age: INFANT_AGE,
            attacker: false,
        }
    }

    /// Mark as attacker-controlled.
    pub fn as_attacker(mut self) -> Self {
        self.attacker = true;
        self
    }

    /// Override the age (clamped to at least the infant age).
    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age.max(INFANT_AGE);
        self
    }

    pub fn name(&self) -> &XorName {
        &self.name
    }

    /// Prefix of the section holding this vault.
    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn is_attacker(&self) -> bool {
        self.attacker
    }

    /// Older than the adult threshold.
    pub fn is_adult(&self) -> bool {
        self.age > ADULT_AGE
    }

    pub fn is_infant(&self) -> bool {
        self.age == INFANT_AGE
    }

    /// The same vault renamed into `prefix`'s region, age unchanged.
    ///
    /// Used to aim a joining vault at a chosen part of the network.
    pub fn renamed_into(&self, prefix: &Prefix) -> Self {
        Self {
            name: self.name.with_prefix(prefix),
            ..self.clone()
        }
    }

    /// The vault after relocation into `prefix`: renamed, one year older.
    pub fn relocated_to(&self, prefix: &Prefix) -> Self {
        let mut moved = self.renamed_into(prefix);
        moved.age += 1;
        moved
    }

    pub(crate) fn set_prefix(&mut self, prefix: Prefix) {
        self.prefix = prefix;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn new_vaults_are_infants() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let vault = Vault::new(&mut rng);
        assert_eq!(vault.age(), 1);
        assert!(vault.is_infant());
        assert!(!vault.is_adult());
        assert!(!vault.is_attacker());
        assert!(vault.prefix().is_root());
        assert!(Vault::attacker(&mut rng).is_attacker());
    }

    #[test]
    fn adulthood_starts_after_age_four() {
        let vault = Vault::with_name(XorName::ZERO);
        assert!(!vault.clone().with_age(4).is_adult());
        assert!(vault.clone().with_age(5).is_adult());
        assert_eq!(vault.with_age(0).age(), 1);
    }

    #[test]
    fn relocation_renames_and_ages() {
        let vault = Vault::with_name(XorName([0xFF; 32])).with_age(3).as_attacker();
        let target = Prefix::from_key("001").unwrap();
        let moved = vault.relocated_to(&target);

        assert_eq!(moved.age(), 4);
        assert!(moved.is_attacker());
        assert!(target.matches(moved.name()));
        assert_eq!(moved.name().as_bytes()[0], 0b0011_1111);
        assert_eq!(&moved.name().as_bytes()[1..], &vault.name().as_bytes()[1..]);
        // the original value is untouched
        assert_eq!(vault.age(), 3);
    }

    #[test]
    fn renaming_keeps_age() {
        let vault = Vault::with_name(XorName::ZERO).with_age(6);
        let target = Prefix::from_key("11").unwrap();
        let renamed = vault.renamed_into(&target);
        assert_eq!(renamed.age(), 6);
        assert!(target.matches(renamed.name()));
    }
}
