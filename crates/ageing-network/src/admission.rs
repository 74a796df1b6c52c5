//! Join admission rules.
//!
//! A section consults its network's rule before accepting a vault. The only
//! rule shipped admits everyone; the trait is the seam for stricter ones,
//! such as refusing a second infant once a section is complete.

use crate::{Section, Vault};

/// Decides whether a section accepts a joining vault.
pub trait Admission {
    /// Return false to refuse `vault`; the caller then mints a new name.
    fn admits(&self, section: &Section, vault: &Vault) -> bool;
}

/// Admits every vault.
#[derive(Debug, Default, Clone, Copy)]
pub struct Permissive;

impl Admission for Permissive {
    fn admits(&self, _section: &Section, _vault: &Vault) -> bool {
        true
    }
}

impl<F> Admission for F
where
    F: Fn(&Section, &Vault) -> bool,
{
    fn admits(&self, section: &Section, vault: &Vault) -> bool {
        self(section, vault)
    }
}
