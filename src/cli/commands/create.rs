use std::sync::Arc;

use console::style;

use crate::cli::CreateArgs;
use crate::driver::{flags, Driver, DriverOptions, DriverTimeouts};
use crate::error::{DriverError, Result};
use crate::provider::Connector;
use crate::store::MachineStore;

pub async fn execute(
    store: &MachineStore,
    timeouts: DriverTimeouts,
    name: &str,
    args: CreateArgs,
) -> Result<()> {
    let driver = run(store, timeouts, name, args, super::connector()).await?;

    println!();
    super::print_done(format!(
        "Machine {} is running at {}",
        style(name).white().bold(),
        style(driver.ip().unwrap_or("-")).cyan()
    ));
    println!("  {}         {}", style("URL").dim(), driver.url());
    println!(
        "  {}         ssh -i {} -p {} {}@{}",
        style("SSH").dim(),
        driver.host.ssh_key_path().display(),
        driver.ssh_port(),
        driver.host.ssh_user,
        driver.ssh_hostname().unwrap_or("-")
    );
    Ok(())
}

/// Options given on the command line, completed from the environment.
pub(crate) fn options(args: CreateArgs) -> DriverOptions {
    let given = [
        (flags::FLAG_SERVER_OS, args.server_os),
        (flags::FLAG_SERVER_LOCATION, args.server_location),
        (flags::FLAG_SERVER_TYPE, args.server_type),
        (flags::FLAG_SERVER_DESCRIPTION, args.server_description),
        (flags::FLAG_SERVER_HOSTNAME, args.server_hostname),
        (flags::FLAG_CLIENT_IDENTIFIER, args.client_identifier),
        (flags::FLAG_CLIENT_SECRET, args.client_secret),
    ];

    given
        .into_iter()
        .filter_map(|(flag, value)| value.map(|v| (flag, v)))
        .collect::<DriverOptions>()
        .with_env_fallback()
}

/// Create the machine and record it.
///
/// The record is written even when creation fails part-way, so a server the
/// provider already accepted can still be removed with `rm`. When the
/// provider never accepted it, the generated key is removed too.
pub(crate) async fn run(
    store: &MachineStore,
    timeouts: DriverTimeouts,
    name: &str,
    args: CreateArgs,
    connector: Arc<dyn Connector>,
) -> Result<Driver> {
    if store.exists(name) {
        return Err(DriverError::Store(format!("Machine {} already exists", name)));
    }

    let mut driver = Driver::new(store.host(name), connector).with_timeouts(timeouts);
    driver.set_config_from_flags(&options(args))?;
    driver.pre_create_check()?;

    let created = driver.create().await;
    if driver.instance.is_provisioned() {
        super::save_driver(store, &driver)?;
    } else if created.is_err() {
        store.remove(name)?;
    }
    created?;
    Ok(driver)
}
