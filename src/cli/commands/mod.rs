pub mod create;
pub mod inspect;
pub mod lifecycle;

use std::sync::Arc;

use console::style;

use crate::driver::{Driver, DriverTimeouts, MachineState};
use crate::error::Result;
use crate::provider::{Connector, HttpConnector};
use crate::store::{MachineRecord, MachineStore};

/// Lifecycle verbs that act on an existing server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Start,
    Stop,
    Kill,
    Restart,
}

impl Verb {
    pub fn past_tense(self) -> &'static str {
        match self {
            Verb::Start => "started",
            Verb::Stop => "stopped",
            Verb::Kill => "killed",
            Verb::Restart => "restarted",
        }
    }
}

pub(crate) fn connector() -> Arc<dyn Connector> {
    Arc::new(HttpConnector::default())
}

/// Load a stored machine into a ready driver.
pub(crate) fn load_driver(
    store: &MachineStore,
    name: &str,
    timeouts: DriverTimeouts,
    connector: Arc<dyn Connector>,
) -> Result<Driver> {
    let record = store.load(name)?;
    Ok(record.into_driver(connector).with_timeouts(timeouts))
}

pub(crate) fn save_driver(store: &MachineStore, driver: &Driver) -> Result<()> {
    store.save(&MachineRecord::from_driver(driver))
}

pub(crate) fn styled_state(state: MachineState) -> String {
    let label = match state {
        MachineState::None => "Unknown".to_string(),
        other => other.to_string(),
    };
    match state {
        MachineState::Running => style(label).green().bold().to_string(),
        MachineState::Starting | MachineState::Stopping => style(label).yellow().to_string(),
        MachineState::Stopped => style(label).dim().to_string(),
        MachineState::Error => style(label).red().bold().to_string(),
        MachineState::None => style(label).dim().to_string(),
    }
}

pub(crate) fn print_done(message: impl std::fmt::Display) {
    println!("  {} {}", style("✓").green().bold(), message);
}
