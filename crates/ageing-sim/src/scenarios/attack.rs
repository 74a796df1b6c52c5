//! Google attack: one party keeps adding vaults until it owns a section.
//!
//! The untargeted attack joins attackers at random names. The targeted
//! attack renames every attacker into one fixed 64-bit prefix, so they all
//! land in the same section and can only be relocated into its
//! neighbourhood.

use ageing_network::{Network, Prefix, Vault, XorName};
use serde::{Serialize, Serializer};
use tracing::info;

use super::build::{build_network, join_honest};
use super::Scenario;
use crate::report::NetworkReport;
use crate::{Error, Result, Settings};

/// Bits of the prefix every targeted attacker is renamed into.
///
/// Valid for networks with up to about 2^64 sections.
pub const TARGET_PREFIX_BITS: usize = 64;

/// One honest join and one honest departure per this many attackers.
pub const HONEST_CHURN_INTERVAL: usize = 10;

const PROGRESS_INTERVAL: usize = 1_000;

/// How an attack ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackOutcome {
    /// Attacking vaults joined, including the one that completed the attack
    pub attackers_added: usize,
    pub total_vaults: usize,
    pub total_sections: usize,
    /// Section the attacker now controls
    #[serde(serialize_with = "prefix_key")]
    pub attacked_prefix: Prefix,
}

impl AttackOutcome {
    /// Attacking vaults as a share of the whole network, in percent.
    pub fn percent_owned(&self) -> f64 {
        if self.total_vaults == 0 {
            return 0.0;
        }
        self.attackers_added as f64 / self.total_vaults as f64 * 100.0
    }
}

fn prefix_key<S: Serializer>(prefix: &Prefix, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&prefix.key())
}

/// Outcome of an attack together with the network it left behind.
#[derive(Debug, Clone, Serialize)]
pub struct AttackReport {
    pub scenario: &'static str,
    pub outcome: AttackOutcome,
    pub network: NetworkReport,
}

impl std::fmt::Display for AttackReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = &self.outcome;
        writeln!(f, "Results for: {}", self.scenario)?;
        writeln!(f, "{} attacking vaults added to own a section", outcome.attackers_added)?;
        writeln!(f, "{} vaults after attack", outcome.total_vaults)?;
        writeln!(f, "{} sections after attack", outcome.total_sections)?;
        writeln!(f, "{:.3} percent of total network owned by attacker", outcome.percent_owned())?;
        writeln!(f, "section taken: {}", outcome.attacked_prefix)?;
        writeln!(f)?;
        write!(f, "{}", self.network)
    }
}

/// Attackers join at random names.
#[derive(Debug, Clone, Default)]
pub struct GoogleAttack {
    /// Give up after this many attackers
    pub limit: Option<usize>,
}

/// Attackers are renamed into one randomly chosen 64-bit prefix.
#[derive(Debug, Clone, Default)]
pub struct TargetedGoogleAttack {
    /// Give up after this many attackers
    pub limit: Option<usize>,
}

impl GoogleAttack {
    /// Attack an existing network until a section falls.
    pub fn attack(&self, network: &mut Network) -> Result<AttackOutcome> {
        run_attack(network, None, self.limit)
    }
}

impl TargetedGoogleAttack {
    /// Attack an existing network until a section falls.
    pub fn attack(&self, network: &mut Network) -> Result<AttackOutcome> {
        let seed = XorName::random(network.rng_mut());
        let target = Prefix::from_name(&seed, TARGET_PREFIX_BITS)?;
        info!(%target, "targeting prefix");
        run_attack(network, Some(target), self.limit)
    }
}

impl Scenario for GoogleAttack {
    type Output = AttackReport;

    fn name(&self) -> &'static str {
        "GoogleAttack"
    }

    fn run(&self, settings: &Settings) -> Result<AttackReport> {
        let mut network = build_network(settings)?;
        let outcome = self.attack(&mut network)?;
        Ok(AttackReport {
            scenario: self.name(),
            outcome,
            network: NetworkReport::from_network(&network),
        })
    }
}

impl Scenario for TargetedGoogleAttack {
    type Output = AttackReport;

    fn name(&self) -> &'static str {
        "TargetedGoogleAttack"
    }

    fn run(&self, settings: &Settings) -> Result<AttackReport> {
        let mut network = build_network(settings)?;
        let outcome = self.attack(&mut network)?;
        Ok(AttackReport {
            scenario: self.name(),
            outcome,
            network: NetworkReport::from_network(&network),
        })
    }
}

/// Join attackers until the section holding the newest one is attacked.
///
/// The root section never counts as taken.
fn run_attack(
    network: &mut Network,
    target: Option<Prefix>,
    limit: Option<usize>,
) -> Result<AttackOutcome> {
    info!(vaults = network.total_vaults(), "vaults before attack");

    let mut added = 0usize;
    loop {
        if limit.is_some_and(|limit| added >= limit) {
            return Err(Error::AttackLimit(added));
        }
        if added % PROGRESS_INTERVAL == 0 {
            info!(added, vaults = network.total_vaults(), "attacking vaults added");
        }

        let name = join_attacker(network, target.as_ref())?;
        added += 1;

        let section = network.section_for(&name)?;
        if section.is_attacked() {
            let attacked_prefix = *section.prefix();
            info!(%attacked_prefix, added, "section taken");
            return Ok(AttackOutcome {
                attackers_added: added,
                total_vaults: network.total_vaults(),
                total_sections: network.total_sections(),
                attacked_prefix,
            });
        }

        // TODO: a split on this join can leave the sibling attacked; check it too.
        if added % HONEST_CHURN_INTERVAL == 0 {
            join_honest(network)?;
            remove_honest(network)?;
        }
    }
}

/// Join one attacker, minting new ones until a section admits it, and
/// return its name after any relocation the join caused.
fn join_attacker(network: &mut Network, target: Option<&Prefix>) -> Result<XorName> {
    loop {
        let mut attacker = Vault::attacker(network.rng_mut());
        if let Some(target) = target {
            attacker = attacker.renamed_into(target);
        }
        let outcome = network.add_vault(attacker)?;
        if !outcome.disallowed {
            return Ok(outcome.name);
        }
    }
}

/// Remove a random vault that is not an attacker. Attackers in the root
/// section may be picked.
fn remove_honest(network: &mut Network) -> Result<()> {
    loop {
        let vault = network.random_vault()?;
        if !vault.is_attacker() || vault.prefix().is_root() {
            return Ok(network.remove_vault(&vault)?);
        }
    }
}
