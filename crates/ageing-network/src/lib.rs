//! Section membership engine for an ageing, self-organising network.
//!
//! Vaults live at points of a 256-bit XOR space. The space is partitioned
//! into sections by a binary prefix trie whose leaves split when both halves
//! hold enough adults and merge back when a leaf runs short of them.
//!
//! # Churn
//!
//! Every join and departure draws an event hash `H`. A member of age `a` is
//! eligible to move when `H % 2^a == 0`; the oldest eligible member (ties go
//! to the name XOR-closest to `H`) is relocated to the neighbouring section
//! with the shortest prefix, then the fewest members. Relocation renames the
//! vault into its new section and ages it by one.
//!
//! # Quorum
//!
//! A section's elders are its `GROUP_SIZE` oldest members. Attackers control
//! a section when they hold a strict majority of elder votes *and* of elder
//! age.
//!
//! # Determinism
//!
//! A [`Network`] owns its random generator. The same seed and the same
//! sequence of calls always produce the same network.

pub mod admission;
pub mod constants;
mod error;
mod event;
mod name;
mod network;
mod prefix;
mod section;
mod vault;

pub use admission::{Admission, Permissive};
pub use error::{Error, Result};
pub use event::MembershipEvent;
pub use name::XorName;
pub use network::{JoinOutcome, Network, NetworkStats};
pub use prefix::Prefix;
pub use section::Section;
pub use vault::Vault;
