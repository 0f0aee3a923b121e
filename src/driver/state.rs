//! Abstract machine states and the provider status table.

use serde::{Deserialize, Serialize};

/// Lifecycle state as the orchestrator understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineState {
    /// Provider reported a status the driver has no mapping for.
    None,
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MachineState::None => "",
            MachineState::Starting => "Starting",
            MachineState::Running => "Running",
            MachineState::Stopping => "Stopping",
            MachineState::Stopped => "Stopped",
            MachineState::Error => "Error",
        };
        write!(f, "{}", name)
    }
}

/// Map a raw BMC server status to a `MachineState`.
///
/// Unrecognised statuses are not errors; they map to `None` and the caller
/// keeps polling.
pub fn map_status(raw: &str) -> MachineState {
    match raw {
        "powered-on" => MachineState::Running,
        "creating" | "resetting" | "rebooting" => MachineState::Starting,
        "powered-off" => MachineState::Stopped,
        _ => MachineState::None,
    }
}
