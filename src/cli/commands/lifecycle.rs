use std::sync::Arc;

use console::style;

use crate::driver::{Driver, DriverTimeouts};
use crate::error::Result;
use crate::provider::Connector;
use crate::store::MachineStore;

use super::Verb;

pub async fn execute(
    store: &MachineStore,
    timeouts: DriverTimeouts,
    name: &str,
    verb: Verb,
) -> Result<()> {
    let driver = run(store, timeouts, name, verb, super::connector()).await?;
    super::print_done(format!(
        "Machine {} {} ({})",
        style(name).white().bold(),
        verb.past_tense(),
        driver.instance.status
    ));
    Ok(())
}

/// Run `verb` and record whatever the driver learnt, even on failure.
pub(crate) async fn run(
    store: &MachineStore,
    timeouts: DriverTimeouts,
    name: &str,
    verb: Verb,
    connector: Arc<dyn Connector>,
) -> Result<Driver> {
    let mut driver = super::load_driver(store, name, timeouts, connector)?;

    let result = match verb {
        Verb::Start => driver.start().await,
        Verb::Stop => driver.stop().await,
        Verb::Kill => driver.kill().await,
        Verb::Restart => driver.restart().await,
    };

    super::save_driver(store, &driver)?;
    result.map(|_| driver)
}

pub async fn remove(
    store: &MachineStore,
    timeouts: DriverTimeouts,
    name: &str,
    force: bool,
) -> Result<()> {
    remove_with(store, timeouts, name, force, super::connector()).await?;
    super::print_done(format!("Machine {} removed", style(name).white().bold()));
    Ok(())
}

pub(crate) async fn remove_with(
    store: &MachineStore,
    timeouts: DriverTimeouts,
    name: &str,
    force: bool,
    connector: Arc<dyn Connector>,
) -> Result<()> {
    let mut driver = super::load_driver(store, name, timeouts, connector)?;

    if let Err(e) = driver.remove().await {
        if !force {
            super::save_driver(store, &driver)?;
            return Err(e);
        }
        println!(
            "  {} {}",
            style("!").yellow().bold(),
            style(format!("Provider delete failed, removing local record anyway: {}", e)).dim()
        );
    }

    store.remove(name)
}
