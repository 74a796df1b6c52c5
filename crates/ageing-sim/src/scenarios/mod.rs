//! Simulation scenarios.

mod attack;
mod build;
mod section_size;

pub use attack::{
    AttackOutcome, AttackReport, GoogleAttack, TargetedGoogleAttack, HONEST_CHURN_INTERVAL,
    TARGET_PREFIX_BITS,
};
pub use build::build_network;
pub use section_size::{SectionSize, SectionSizeReport, SectionSizeStats};

use crate::{Result, Settings};

/// A simulation that can be run from settings alone.
pub trait Scenario {
    /// What the run reports.
    type Output: serde::Serialize + std::fmt::Display;

    /// Name used in reports.
    fn name(&self) -> &'static str;

    /// Run to completion.
    fn run(&self, settings: &Settings) -> Result<Self::Output>;
}
