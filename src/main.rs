use std::env;

use anyhow::Context;
use container_trainer::{environment::DEFAULT_BASE_DIR, ContainerEnvironment, TfConfig};
use log::info;

/// Prints the cluster descriptor of the host this container runs on.
///
/// Usage: `tf-config [BASE_DIR]`, `BASE_DIR` defaulting to the platform's
/// container layout root.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let base_dir = env::args().nth(1).unwrap_or_else(|| DEFAULT_BASE_DIR.to_string());
    let container = ContainerEnvironment::load(&base_dir)
        .with_context(|| format!("failed to load container environment from {base_dir}"))?;
    info!(
        "resolving role of {} among {:?}",
        container.current_host, container.hosts
    );

    let config = TfConfig::build(&container.hosts, &container.current_host)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
