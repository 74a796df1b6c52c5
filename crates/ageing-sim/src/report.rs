//! Snapshots of a network for the console or for JSON output.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use ageing_network::{Network, NetworkStats};
use serde::{Deserialize, Serialize};

/// Totals, histograms and counters of a network at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkReport {
    pub total_vaults: usize,
    pub total_sections: usize,
    /// Prefix length -> sections
    pub prefix_lengths: BTreeMap<usize, usize>,
    /// Age -> vaults
    pub ages: BTreeMap<u32, usize>,
    /// Adult count -> sections
    pub adults: BTreeMap<usize, usize>,
    /// Member count -> sections
    pub section_sizes: BTreeMap<usize, usize>,
    pub stats: NetworkStats,
}

impl NetworkReport {
    pub fn from_network(network: &Network) -> Self {
        Self {
            total_vaults: network.total_vaults(),
            total_sections: network.total_sections(),
            prefix_lengths: network.prefix_length_histogram(),
            ages: network.age_histogram(),
            adults: network.adult_histogram(),
            section_sizes: network.section_size_histogram(),
            stats: network.stats().clone(),
        }
    }

    /// Mean number of prefix bits a relocation moved a vault across.
    pub fn mean_hops(&self) -> Option<f64> {
        let hops = &self.stats.neighbourhood_hops;
        if hops.is_empty() {
            return None;
        }
        Some(hops.iter().sum::<usize>() as f64 / hops.len() as f64)
    }
}

impl fmt::Display for NetworkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} vaults in {} sections", self.total_vaults, self.total_sections)?;
        writeln!(
            f,
            "joins {}  departures {}  splits {}  merges {}  relocations {}",
            self.stats.joins,
            self.stats.departures,
            self.stats.splits,
            self.stats.merges,
            self.stats.relocations
        )?;
        if let Some(mean) = self.mean_hops() {
            writeln!(f, "mean relocation distance {:.3} bits", mean)?;
        }
        writeln!(f)?;
        f.write_str(&size_distribution(&self.section_sizes))?;
        writeln!(f)?;
        f.write_str(&two_column("age", "vaults", &self.ages))?;
        writeln!(f)?;
        f.write_str(&two_column("adults", "sections", &self.adults))?;
        writeln!(f)?;
        f.write_str(&two_column("length", "count", &self.prefix_lengths))
    }
}

/// The "size count percent" table of section sizes.
pub fn size_distribution(sizes: &BTreeMap<usize, usize>) -> String {
    let total: usize = sizes.values().sum();
    let mut out = String::new();
    let _ = writeln!(out, "size count percent");
    let _ = writeln!(out, "------------------");
    for (size, count) in sizes {
        let percent = if total == 0 {
            0.0
        } else {
            *count as f64 / total as f64 * 100.0
        };
        let _ = writeln!(out, "{:<4} {:>5} {:>7.3}", size, count, percent);
    }
    out
}

fn two_column<K: fmt::Display>(left: &str, right: &str, rows: &BTreeMap<K, usize>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  {}", left, right);
    for (key, value) in rows {
        let _ = writeln!(out, "{}  {}", key, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ageing_network::Vault;

    fn small_network() -> Network {
        let mut network = Network::new(5);
        for _ in 0..300 {
            let vault = Vault::new(network.rng_mut());
            network.add_vault(vault).unwrap();
        }
        network
    }

    #[test]
    fn report_totals_agree_with_histograms() {
        let network = small_network();
        let report = NetworkReport::from_network(&network);

        assert_eq!(report.total_vaults, 300);
        assert_eq!(report.ages.values().sum::<usize>(), report.total_vaults);
        assert_eq!(report.section_sizes.values().sum::<usize>(), report.total_sections);
        assert_eq!(report.prefix_lengths.values().sum::<usize>(), report.total_sections);
        assert_eq!(report.stats.joins, 300 + report.stats.relocations);
    }

    #[test]
    fn report_survives_json() {
        let report = NetworkReport::from_network(&small_network());
        let json = serde_json::to_string(&report).unwrap();
        let back: NetworkReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn distribution_table_layout() {
        let sizes = BTreeMap::from([(9, 1), (12, 3)]);
        let table = size_distribution(&sizes);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "size count percent");
        assert_eq!(lines[2], "9        1  25.000");
        assert_eq!(lines[3], "12       3  75.000");
    }

    #[test]
    fn empty_distribution_has_only_headers() {
        let table = size_distribution(&BTreeMap::new());
        assert_eq!(table.lines().count(), 2);
    }

    #[test]
    fn console_rendering_lists_every_table() {
        let rendered = NetworkReport::from_network(&small_network()).to_string();
        assert!(rendered.contains("size count percent"));
        assert!(rendered.contains("age  vaults"));
        assert!(rendered.contains("adults  sections"));
        assert!(rendered.contains("length  count"));
    }

    #[test]
    fn mean_hops_absent_without_relocations() {
        let report = NetworkReport::from_network(&Network::new(0));
        assert_eq!(report.mean_hops(), None);
    }
}
