//! Sections: leaves of the prefix trie and their members.
//!
//! A section owns its vaults by value. It decides locally when it has
//! grown enough to split, when it has shrunk enough to merge, who its
//! elders are, whether attackers hold quorum, and which member an event
//! relocates. The network acts on those decisions.

use std::cmp::Ordering;

use rand::{Rng, RngCore};

use crate::admission::Admission;
use crate::constants::{
    ELDER_COUNT, GROUP_SIZE, INFANT_AGE, MERGE_ADULTS, QUORUM_DENOMINATOR, QUORUM_NUMERATOR,
    SPLIT_SIZE, XOR_NAME_BITS,
};
use crate::{Error, MembershipEvent, Prefix, Result, Vault, XorName};

/// A trie leaf: one region of the name space and the vaults in it.
#[derive(Debug, Clone)]
pub struct Section {
    prefix: Prefix,
    vaults: Vec<Vault>,
}

impl Section {
    /// An empty section at `prefix`.
    pub fn new(prefix: Prefix) -> Self {
        Self {
            prefix,
            vaults: Vec::new(),
        }
    }

    /// Create the section(s) holding `vaults` under `prefix`.
    ///
    /// Every vault is stamped with the new prefix. If the result is large
    /// enough to split, it splits (recursively), and the event lists every
    /// resulting leaf. Otherwise the event lists the single section along
    /// with a relocation candidate.
    pub fn bootstrap<R: RngCore + ?Sized>(
        prefix: Prefix,
        vaults: Vec<Vault>,
        rng: &mut R,
    ) -> Result<MembershipEvent> {
        let mut section = Self::new(prefix);
        for mut vault in vaults {
            vault.set_prefix(prefix);
            section.vaults.push(vault);
        }

        if section.should_split() {
            return section.split(rng);
        }

        let mut event = MembershipEvent::new(rng);
        event.relocate = section.vault_for_relocation(&event);
        event.new_sections.push(section);
        Ok(event)
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    /// Members in insertion order.
    pub fn vaults(&self) -> &[Vault] {
        &self.vaults
    }

    pub fn into_vaults(self) -> Vec<Vault> {
        self.vaults
    }

    pub fn len(&self) -> usize {
        self.vaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaults.is_empty()
    }

    pub fn contains(&self, name: &XorName) -> bool {
        self.vaults.iter().any(|v| v.name() == name)
    }

    /// Add a vault.
    ///
    /// Returns `(None, true)` if `admission` refuses the vault, which is then
    /// not added. Otherwise returns the event: a split event if the section
    /// split, or a plain event possibly naming a vault to relocate.
    pub fn add_vault<R: RngCore + ?Sized>(
        &mut self,
        mut vault: Vault,
        admission: &dyn Admission,
        rng: &mut R,
    ) -> Result<(Option<MembershipEvent>, bool)> {
        if !admission.admits(self, &vault) {
            return Ok((None, true));
        }

        vault.set_prefix(self.prefix);
        self.vaults.push(vault);

        if self.should_split() {
            return Ok((Some(self.split(rng)?), false));
        }

        let mut event = MembershipEvent::new(rng);
        event.relocate = self.vault_for_relocation(&event);
        Ok((Some(event), false))
    }

    /// Remove the vault called `name` and pick a relocation candidate among
    /// the rest. Merging is left to the network.
    pub fn remove_vault<R: RngCore + ?Sized>(
        &mut self,
        name: &XorName,
        rng: &mut R,
    ) -> Result<MembershipEvent> {
        let index = self
            .vaults
            .iter()
            .position(|v| v.name() == name)
            .ok_or(Error::MissingVault {
                name: *name,
                prefix: self.prefix,
            })?;
        self.vaults.remove(index);

        let mut event = MembershipEvent::new(rng);
        event.relocate = self.vault_for_relocation(&event);
        Ok(event)
    }

    /// Move every member into the two child sections.
    ///
    /// Leaves this section empty; the caller discards it.
    fn split<R: RngCore + ?Sized>(&mut self, rng: &mut R) -> Result<MembershipEvent> {
        let left_prefix = self.prefix.extend_left()?;
        let right_prefix = self.prefix.extend_right()?;

        let mut left = Vec::new();
        let mut right = Vec::new();
        for vault in std::mem::take(&mut self.vaults) {
            if left_prefix.matches(vault.name()) {
                left.push(vault);
            } else if right_prefix.matches(vault.name()) {
                right.push(vault);
            } else {
                return Err(Error::Partition {
                    prefix: self.prefix,
                    reason: "member outside section region",
                });
            }
        }

        let left = Self::bootstrap(left_prefix, left, rng)?;
        let right = Self::bootstrap(right_prefix, right, rng)?;

        let mut event = MembershipEvent::new(rng);
        event.new_sections = left.new_sections;
        event.new_sections.extend(right.new_sections);
        Ok(event)
    }

    /// Both children would hold at least `SPLIT_SIZE` adults.
    pub fn should_split(&self) -> bool {
        let (left, right) = self.child_adult_counts();
        left >= SPLIT_SIZE && right >= SPLIT_SIZE
    }

    /// Too few adults to stand alone.
    pub fn should_merge(&self) -> bool {
        self.adult_count() <= MERGE_ADULTS
    }

    /// At least `GROUP_SIZE` adults.
    pub fn is_complete(&self) -> bool {
        self.adult_count() >= GROUP_SIZE
    }

    /// Any member still at the infant age.
    pub fn has_infant(&self) -> bool {
        self.vaults.iter().any(|v| v.age() == INFANT_AGE)
    }

    pub fn adult_count(&self) -> usize {
        self.vaults.iter().filter(|v| v.is_adult()).count()
    }

    /// Adults that would land in the `prefix + 0` child.
    pub fn left_adult_count(&self) -> usize {
        self.child_adult_counts().0
    }

    /// Adults that would land in the `prefix + 1` child.
    pub fn right_adult_count(&self) -> usize {
        self.child_adult_counts().1
    }

    /// Members (of any age) inside `prefix`.
    pub fn vault_count_for(&self, prefix: &Prefix) -> usize {
        self.vaults.iter().filter(|v| prefix.matches(v.name())).count()
    }

    fn child_adult_counts(&self) -> (usize, usize) {
        let depth = self.prefix.len();
        if depth >= XOR_NAME_BITS {
            return (0, 0);
        }
        self.vaults
            .iter()
            .filter(|v| v.is_adult())
            .fold((0, 0), |(left, right), v| {
                if v.name().bit(depth) {
                    (left, right + 1)
                } else {
                    (left + 1, right)
                }
            })
    }

    /// The `ELDER_COUNT` oldest members, oldest first.
    ///
    /// With fewer members than that, every member is an elder.
    pub fn elders(&self) -> Vec<&Vault> {
        let mut elders: Vec<&Vault> = self.vaults.iter().collect();
        elders.sort_by(|a, b| elder_order(a, b));
        elders.truncate(ELDER_COUNT);
        elders
    }

    /// Attackers hold a strict majority of elder votes and of elder age.
    ///
    /// The root section is never reported as attacked.
    pub fn is_attacked(&self) -> bool {
        if self.prefix.is_root() {
            return false;
        }

        let elders = self.elders();
        let total_votes = elders.len();
        let total_age: u64 = elders.iter().map(|v| u64::from(v.age())).sum();
        let attacking_votes = elders.iter().filter(|v| v.is_attacker()).count();
        let attacking_age: u64 = elders
            .iter()
            .filter(|v| v.is_attacker())
            .map(|v| u64::from(v.age()))
            .sum();

        let votes_attacked =
            attacking_votes * QUORUM_DENOMINATOR > total_votes * QUORUM_NUMERATOR;
        let age_attacked = attacking_age * QUORUM_DENOMINATOR as u64
            > total_age * QUORUM_NUMERATOR as u64;
        votes_attacked && age_attacked
    }

    /// Pick the member `event` relocates, if any.
    ///
    /// A member of age `a` is eligible when `hash % 2^a == 0`. The oldest
    /// eligible age wins; among members of that age the one whose name is
    /// XOR-closest to the hash wins.
    pub fn vault_for_relocation(&self, event: &MembershipEvent) -> Option<Vault> {
        // eligibility at age a implies eligibility at every younger age, so
        // one pass keeping the oldest eligible (then closest) member suffices
        let mut chosen: Option<(&Vault, XorName)> = None;
        for vault in &self.vaults {
            if !event.triggers_age(vault.age()) {
                continue;
            }
            let distance = vault.name().xor_distance(&event.hash);
            let better = match chosen {
                None => true,
                Some((best, best_distance)) => {
                    vault.age() > best.age()
                        || (vault.age() == best.age() && distance < best_distance)
                }
            };
            if better {
                chosen = Some((vault, distance));
            }
        }
        chosen.map(|(vault, _)| vault.clone())
    }

    /// A uniformly random member.
    pub fn random_vault<R: Rng>(&self, rng: &mut R) -> Result<&Vault> {
        if self.vaults.is_empty() {
            return Err(Error::EmptySection(self.prefix));
        }
        let index = rng.gen_range(0..self.vaults.len());
        Ok(&self.vaults[index])
    }
}

/// Oldest first; equal ages are ordered by XOR tie-break.
///
/// For equal ages, with `m = a ^ b`, the vault whose `name ^ m` is larger
/// sorts first.
fn elder_order(a: &Vault, b: &Vault) -> Ordering {
    b.age().cmp(&a.age()).then_with(|| {
        let m = a.name().xor_distance(b.name());
        let xa = a.name().xor_distance(&m);
        let xb = b.name().xor_distance(&m);
        xb.cmp(&xa)
    })
}
