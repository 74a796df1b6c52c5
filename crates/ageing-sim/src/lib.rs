//! # Ageing Sim
//!
//! Scenario drivers for the ageing network membership engine.
//!
//! Three scenarios are provided:
//! - **GoogleAttack**: one party joins vaults at random until it holds a
//!   quorum of some section's elders
//! - **TargetedGoogleAttack**: the same, with every attacker aimed at one
//!   region of the name space
//! - **SectionSize**: section size distribution under the bare split and
//!   merge rules, without ageing
//!
//! Every scenario builds from [`Settings`] and yields a report that renders
//! as console tables or serialises to JSON.

mod error;
pub mod report;
pub mod scenarios;
mod settings;

pub use error::{Error, Result};
pub use report::NetworkReport;
pub use scenarios::{
    build_network, AttackOutcome, AttackReport, GoogleAttack, Scenario, SectionSize,
    SectionSizeReport, TargetedGoogleAttack,
};
pub use settings::Settings;
