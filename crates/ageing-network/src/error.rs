//! Error types for the membership engine.
//!
//! Every variant here signals a broken structural invariant or a misuse of
//! the prefix algebra. None of them occur in a healthy run.

use thiserror::Error;

use crate::{Prefix, XorName};

/// Result type for membership operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the membership engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Trie descent found no section covering a name.
    #[error("no section covers name {0}")]
    Uncovered(XorName),

    /// A cached prefix has no section in the network.
    #[error("no section at prefix {0}")]
    MissingSection(Prefix),

    /// The section at a vault's cached prefix does not hold it.
    #[error("vault {name} is not a member of section {prefix}")]
    MissingVault { name: XorName, prefix: Prefix },

    /// Parent or sibling requested for the zero-length prefix.
    #[error("{op} is undefined on the root prefix")]
    RootPrefix { op: &'static str },

    /// A full-length prefix cannot be extended.
    #[error("prefix already spans all {} bits", crate::constants::XOR_NAME_BITS)]
    PrefixOverflow,

    /// A random member was requested from an empty section.
    #[error("section {0} has no members")]
    EmptySection(Prefix),

    /// Section prefixes no longer tile the name space.
    #[error("partition broken at {prefix}: {reason}")]
    Partition { prefix: Prefix, reason: &'static str },
}
