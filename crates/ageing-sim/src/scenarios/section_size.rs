//! Section sizes under plain split/merge rules, without ageing.
//!
//! Vaults carry nothing but a name. A section splits as soon as both halves
//! would hold `SPLIT_SIZE` vaults, and merges with its whole sibling region
//! once it holds fewer than `GROUP_SIZE`. Names form a digest chain so a run
//! is fixed by its seed, and the oldest vault always leaves first.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use ageing_network::constants::{GROUP_SIZE, SPLIT_SIZE};
use ageing_network::{Error as NetworkError, Prefix, XorName};
use serde::Serialize;
use tracing::{debug, info};

use super::Scenario;
use crate::report::size_distribution;
use crate::{Result, Settings};

/// Counters kept while the scenario runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionSizeStats {
    pub splits: u64,
    pub merges: u64,
    pub largest_section_size: usize,
    /// Most sibling-region sections absorbed by one merge
    pub largest_merge_sections: usize,
    /// Most sibling-region vaults absorbed by one merge
    pub largest_merge_nodes: usize,
}

/// Final state of a section-size run.
#[derive(Debug, Clone, Serialize)]
pub struct SectionSizeReport {
    pub stats: SectionSizeStats,
    pub total_vaults: usize,
    pub total_sections: usize,
    /// Member count -> sections
    pub section_sizes: BTreeMap<usize, usize>,
}

impl fmt::Display for SectionSizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Results for: SectionSize")?;
        writeln!(f, "splits: {}", self.stats.splits)?;
        writeln!(f, "merges: {}", self.stats.merges)?;
        writeln!(f, "largestSectionSize: {}", self.stats.largest_section_size)?;
        writeln!(f, "largestMergeSections: {}", self.stats.largest_merge_sections)?;
        writeln!(f, "largestMergeNodes: {}", self.stats.largest_merge_nodes)?;
        writeln!(f)?;
        writeln!(f, "{} vaults in {} sections", self.total_vaults, self.total_sections)?;
        writeln!(f)?;
        f.write_str(&size_distribution(&self.section_sizes))
    }
}

/// The section-size scenario.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionSize;

impl Scenario for SectionSize {
    type Output = SectionSizeReport;

    fn name(&self) -> &'static str {
        "SectionSize"
    }

    fn run(&self, settings: &Settings) -> Result<SectionSizeReport> {
        settings.validate()?;
        info!(
            net_size = settings.net_size,
            events = settings.total_events,
            seed = settings.seed,
            "running section size scenario"
        );

        let mut network = NameOnlyNetwork::default();
        let mut previous = String::new();
        for i in 0..settings.total_events {
            let id = settings.seed.wrapping_add(i as u64);
            let name = XorName::from_string(&format!("{}{}", id, previous));
            network.add(name)?;
            while network.len() > settings.net_size {
                network.remove_oldest()?;
            }
            previous = name.to_hex();

            if settings.reports_progress(i) {
                info!(
                    percent = settings.percent_complete(i),
                    sections = network.sections.len(),
                    "section size"
                );
            }
        }

        Ok(network.report())
    }
}

/// Sections of bare names, keyed by prefix.
#[derive(Debug, Default)]
struct NameOnlyNetwork {
    sections: BTreeMap<Prefix, Vec<XorName>>,
    /// Join order, oldest first
    nodes: VecDeque<XorName>,
    /// Cached prefix of each live name
    node_prefixes: HashMap<XorName, Prefix>,
    stats: SectionSizeStats,
}

impl NameOnlyNetwork {
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn covering(&self, name: &XorName) -> Result<Prefix> {
        if self.sections.is_empty() {
            return Ok(Prefix::root());
        }
        let mut len = 0;
        loop {
            let prefix = Prefix::from_name(name, len)?;
            if self.sections.contains_key(&prefix) {
                return Ok(prefix);
            }
            len += 1;
        }
    }

    fn add(&mut self, name: XorName) -> Result<()> {
        self.nodes.push_back(name);
        let prefix = self.covering(&name)?;
        let section = self.sections.entry(prefix).or_default();
        section.push(name);
        self.node_prefixes.insert(name, prefix);

        let depth = prefix.len();
        let (right, left): (Vec<XorName>, Vec<XorName>) =
            section.iter().partition(|n| n.bit(depth));

        if left.len() >= SPLIT_SIZE && right.len() >= SPLIT_SIZE {
            self.stats.splits += 1;
            let left_prefix = prefix.extend_left()?;
            let right_prefix = prefix.extend_right()?;
            debug!(%prefix, left = left.len(), right = right.len(), "split");

            self.sections.remove(&prefix);
            self.track_size(left.len().max(right.len()));
            for (child, names) in [(left_prefix, left), (right_prefix, right)] {
                for n in &names {
                    self.node_prefixes.insert(*n, child);
                }
                self.sections.insert(child, names);
            }
        } else {
            let size = left.len() + right.len();
            self.track_size(size);
        }
        Ok(())
    }

    /// Remove the longest-serving name. A cached prefix that does not lead
    /// to the name is a broken invariant and is returned as an error.
    fn remove_oldest(&mut self) -> Result<()> {
        let Some(&name) = self.nodes.front() else {
            return Ok(());
        };
        let prefix = *self
            .node_prefixes
            .get(&name)
            .ok_or(NetworkError::Uncovered(name))?;
        let section = self
            .sections
            .get_mut(&prefix)
            .ok_or(NetworkError::MissingSection(prefix))?;
        let position = section
            .iter()
            .position(|n| *n == name)
            .ok_or(NetworkError::MissingVault { name, prefix })?;

        self.nodes.pop_front();
        self.node_prefixes.remove(&name);
        section.remove(position);

        if section.len() >= GROUP_SIZE || prefix.is_root() {
            return Ok(());
        }
        self.merge(prefix)
    }

    /// Fold `prefix` and every section of its sibling region into the parent.
    fn merge(&mut self, prefix: Prefix) -> Result<()> {
        self.stats.merges += 1;
        let parent = prefix.parent()?;
        let sibling = prefix.sibling()?;

        let absorbed: Vec<Prefix> = self
            .sections
            .range(sibling..)
            .map(|(p, _)| *p)
            .take_while(|p| sibling.covers(p))
            .collect();
        if absorbed.is_empty() {
            return Err(NetworkError::Partition {
                prefix: sibling,
                reason: "sibling region has no sections",
            }
            .into());
        }

        let mut merged = self
            .sections
            .remove(&prefix)
            .ok_or(NetworkError::MissingSection(prefix))?;
        let mut absorbed_nodes = 0;
        for p in &absorbed {
            let names = self
                .sections
                .remove(p)
                .ok_or(NetworkError::MissingSection(*p))?;
            absorbed_nodes += names.len();
            merged.extend(names);
        }
        debug!(%prefix, %parent, sections = absorbed.len(), vaults = absorbed_nodes, "merge");

        self.stats.largest_merge_sections = self.stats.largest_merge_sections.max(absorbed.len());
        self.stats.largest_merge_nodes = self.stats.largest_merge_nodes.max(absorbed_nodes);

        for n in &merged {
            self.node_prefixes.insert(*n, parent);
        }
        self.sections.insert(parent, merged);
        Ok(())
    }

    fn track_size(&mut self, size: usize) {
        self.stats.largest_section_size = self.stats.largest_section_size.max(size);
    }

    fn report(&self) -> SectionSizeReport {
        let mut section_sizes = BTreeMap::new();
        for names in self.sections.values() {
            *section_sizes.entry(names.len()).or_insert(0) += 1;
        }
        SectionSizeReport {
            stats: self.stats.clone(),
            total_vaults: self.nodes.len(),
            total_sections: self.sections.len(),
            section_sizes,
        }
    }
}
