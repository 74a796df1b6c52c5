//! Growing a network to its working size under churn.

use ageing_network::{Network, Vault};
use tracing::info;

use crate::{Result, Settings};

/// Build a seeded network by running `total_events` joins, trimming random
/// vaults whenever the population exceeds `net_size`.
///
/// A refused join is retried with a freshly minted vault.
pub fn build_network(settings: &Settings) -> Result<Network> {
    settings.validate()?;
    info!(
        net_size = settings.net_size,
        events = settings.total_events,
        seed = settings.seed,
        "building initial network"
    );

    let mut network = Network::new(settings.seed);
    for i in 0..settings.total_events {
        if settings.reports_progress(i) {
            info!(
                percent = settings.percent_complete(i),
                vaults = network.total_vaults(),
                sections = network.total_sections(),
                "building"
            );
        }

        join_honest(&mut network)?;

        while network.total_vaults() > settings.net_size {
            let leaving = network.random_vault()?;
            network.remove_vault(&leaving)?;
        }
    }

    info!(
        vaults = network.total_vaults(),
        sections = network.total_sections(),
        "initial network complete"
    );
    Ok(network)
}

/// Join one honest vault, minting new ones until a section admits it.
pub(crate) fn join_honest(network: &mut Network) -> Result<()> {
    loop {
        let vault = Vault::new(network.rng_mut());
        if !network.add_vault(vault)?.disallowed {
            return Ok(());
        }
    }
}
