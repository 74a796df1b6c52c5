//! ageing-sim CLI
//!
//! Runs one simulation scenario against a freshly built network.
//!
//! Usage:
//!   ageing-sim google [options]
//!   ageing-sim targeted [options]
//!   ageing-sim section-size [options]

use std::path::PathBuf;

use ageing_sim::{GoogleAttack, Scenario, SectionSize, Settings, TargetedGoogleAttack};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!("ageing-sim - Vault ageing and section membership simulations");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  ageing-sim google [options]        Untargeted Google attack");
    eprintln!("  ageing-sim targeted [options]      Google attack aimed at one prefix");
    eprintln!("  ageing-sim section-size [options]  Section size distribution without ageing");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --netsize <N>     Vaults the network is held at (default: 100000)");
    eprintln!("  --seed <S>        Seed for the random source (default: 0)");
    eprintln!("  --events <N>      Join events while building (default: 5 x netsize)");
    eprintln!("  --limit <N>       Give up an attack after N attacking vaults");
    eprintln!("  --config <FILE>   Read settings from a JSON file first");
    eprintln!("  --json            Print the report as JSON");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG  Log filter (default: ageing_sim=info,ageing_network=warn)");
}

/// Command line options after the scenario name.
#[derive(Debug, Default, PartialEq)]
struct Options {
    net_size: Option<usize>,
    seed: Option<u64>,
    events: Option<usize>,
    limit: Option<usize>,
    config: Option<PathBuf>,
    json: bool,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut options = Options::default();
        let mut args = args.iter();

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .cloned()
                    .ok_or_else(|| format!("{} requires a value", flag))
            };
            match arg.as_str() {
                "--netsize" => options.net_size = Some(parse_number(&value(arg)?, arg)?),
                "--seed" => options.seed = Some(parse_number(&value(arg)?, arg)?),
                "--events" => options.events = Some(parse_number(&value(arg)?, arg)?),
                "--limit" => options.limit = Some(parse_number(&value(arg)?, arg)?),
                "--config" => options.config = Some(PathBuf::from(value(arg)?)),
                "--json" => options.json = true,
                other => return Err(format!("Unknown option: {}", other)),
            }
        }
        Ok(options)
    }

    /// Settings file first, then flags on top.
    fn settings(&self) -> ageing_sim::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(net_size) = self.net_size {
            settings = Settings::for_network(net_size, settings.seed);
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(events) = self.events {
            settings = settings.with_events(events);
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("{} expects a number, got {:?}", flag, raw))
}

fn run<S: Scenario>(scenario: &S, settings: &Settings, json: bool) -> ageing_sim::Result<()> {
    tracing::info!(scenario = scenario.name(), ?settings, "starting");
    let report = scenario.run(settings)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ageing_sim=info,ageing_network=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = args[1].as_str();
    if matches!(command, "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let options = match Options::parse(&args[2..]) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };
    let settings = match options.settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match command {
        "google" => run(&GoogleAttack { limit: options.limit }, &settings, options.json),
        "targeted" => run(
            &TargetedGoogleAttack { limit: options.limit },
            &settings,
            options.json,
        ),
        "section-size" => run(&SectionSize, &settings, options.json),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
