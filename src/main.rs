//! flyout - replay surface scenarios and print what happened

use anyhow::{Context, Result};
use clap::Parser;

use flyout::cli::CliArgs;
use flyout::scenario::{self, Scenario};

fn main() -> Result<()> {
    let args = CliArgs::parse();
    flyout::tracing::init();

    let defaults = args.defaults();
    let source = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("Failed to read scenario {}", args.scenario.display()))?;
    let scenario = Scenario::from_yaml(&source)
        .with_context(|| format!("Failed to load {}", args.scenario.display()))?;

    let report = scenario::run(&scenario, defaults)?;
    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", json);
    Ok(())
}
