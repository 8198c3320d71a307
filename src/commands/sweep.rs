use crate::clock::SystemClock;
use crate::config::Config;
use crate::sweep::Sweeper;
use anyhow::Result;
use std::sync::Arc;

pub fn run(config: &Config) -> Result<()> {
    let sweeper = Sweeper::new(&config.storage_dir, config.retention()?, Arc::new(SystemClock));
    let report = sweeper.sweep_once();

    println!(
        "Removed {} stale file(s), kept {} in {}",
        report.removed,
        report.kept,
        config.storage_dir.display()
    );

    Ok(())
}
