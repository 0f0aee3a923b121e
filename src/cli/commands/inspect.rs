use console::style;

use crate::driver::{Driver, DriverTimeouts};
use crate::error::Result;
use crate::store::MachineStore;

pub async fn status(store: &MachineStore, timeouts: DriverTimeouts, name: &str) -> Result<()> {
    let mut driver = super::load_driver(store, name, timeouts, super::connector())?;
    let state = driver.current_state().await;
    super::save_driver(store, &driver)?;

    println!(
        "  {} {} {}",
        style("●").cyan().bold(),
        style(name).white().bold(),
        style(format!("({})", driver.ip().unwrap_or("no address"))).dim()
    );
    println!();
    println!("  {}       {}", style("State").dim(), super::styled_state(state));
    println!("  {}      {}", style("Server").dim(), driver.instance.id);
    println!("  {}    {}", style("Location").dim(), driver.config.server_location);
    println!("  {}        {}", style("Type").dim(), driver.config.server_type);
    println!("  {}          {}", style("OS").dim(), driver.config.server_os);
    if !driver.instance.cpu.is_empty() {
        println!(
            "  {}    {} / {} / {}",
            style("Hardware").dim(),
            driver.instance.cpu,
            driver.instance.ram,
            driver.instance.storage
        );
    }
    Ok(())
}

pub fn url(store: &MachineStore, name: &str) -> Result<()> {
    let driver = store.load(name)?.into_driver(super::connector());
    println!("{}", driver.url());
    Ok(())
}

pub fn ip(store: &MachineStore, name: &str) -> Result<()> {
    let driver = store.load(name)?.into_driver(super::connector());
    println!("{}", driver.ip().unwrap_or_default());
    Ok(())
}

pub fn ssh_username(store: &MachineStore, name: &str) -> Result<()> {
    let mut driver = store.load(name)?.into_driver(super::connector());
    println!("{}", driver.ssh_username());
    Ok(())
}

/// Print the stored record with the client secret masked.
pub fn inspect(store: &MachineStore, name: &str) -> Result<()> {
    let mut record = store.load(name)?;
    if !record.config.client_secret.is_empty() {
        record.config.client_secret = "********".to_string();
    }
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub fn list(store: &MachineStore) -> Result<()> {
    let names = store.list()?;
    if names.is_empty() {
        println!(
            "  {}",
            style(format!("No machines in {}.", store.root().display())).dim()
        );
        return Ok(());
    }

    for name in names {
        match store.load(&name) {
            Ok(record) => println!(
                "  {} {} {}",
                style("●").cyan(),
                style(&name).white().bold(),
                style(format!(
                    "{} {}",
                    record.config.server_location,
                    if record.host.ip_address.is_empty() { "-" } else { record.host.ip_address.as_str() }
                ))
                .dim()
            ),
            Err(e) => println!(
                "  {} {} {}",
                style("✗").red(),
                style(&name).white().bold(),
                style(e).dim()
            ),
        }
    }
    Ok(())
}

pub fn flags() -> Result<()> {
    for flag in Driver::create_flags() {
        println!(
            "  --{:<26} {} {}",
            flag.name,
            flag.usage,
            style(format!("[env: {}]", flag.env_var)).dim()
        );
    }
    Ok(())
}
