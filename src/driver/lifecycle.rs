//! Convergence loop and provider operations.
//!
//! Every mutating verb follows the same shape: issue the provider call,
//! check the status code against the verb's allow-list, then poll
//! `GET /servers/{id}` until the verb's target state shows up.

use std::time::Instant;

use crate::error::{DriverError, Result};
use crate::provider::BmcApi;

use super::config::{DriverTimeouts, InstanceRecord};
use super::mapper::{self, DEFAULT_ACCEPTED, DELETE_ACCEPTED};
use super::state::{map_status, MachineState};

/// Provider operations on an existing server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    PowerOn,
    ShutDown,
    Reboot,
    Delete,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::PowerOn => "power-on",
            Operation::ShutDown => "shutdown",
            Operation::Reboot => "reboot",
            Operation::Delete => "delete",
        }
    }

    /// Status codes the provider may answer with for this operation.
    pub fn accepted(self) -> &'static [u16] {
        match self {
            Operation::Delete => DELETE_ACCEPTED,
            _ => DEFAULT_ACCEPTED,
        }
    }

    /// State to wait for once the operation is accepted; `None` means no wait.
    pub fn target(self) -> Option<MachineState> {
        match self {
            Operation::PowerOn | Operation::Reboot => Some(MachineState::Running),
            Operation::ShutDown => Some(MachineState::Stopped),
            Operation::Delete => None,
        }
    }
}

/// Drives one server through provider calls, keeping its record current.
pub struct Lifecycle<'a> {
    api: &'a dyn BmcApi,
    record: &'a mut InstanceRecord,
    timeouts: DriverTimeouts,
}

impl<'a> Lifecycle<'a> {
    pub fn new(api: &'a dyn BmcApi, record: &'a mut InstanceRecord, timeouts: DriverTimeouts) -> Self {
        Self {
            api,
            record,
            timeouts,
        }
    }

    /// Read the server's status and refresh the record.
    ///
    /// Any status other than 200 is an error, never a partial success.
    pub async fn query(&mut self) -> Result<MachineState> {
        let response = self.api.get_server(&self.record.id).await?;
        let server = mapper::parse_server(response)?;
        self.record.update_from(server);
        Ok(map_status(&self.record.status))
    }

    /// Poll until the server reaches `target`.
    ///
    /// A failed query aborts immediately; transport retries belong to the
    /// HTTP client. Rejected credentials surface as `Auth`, other failures
    /// as `Convergence`. With `converge` unset this waits forever.
    pub async fn await_state(&mut self, target: MachineState) -> Result<()> {
        let started = Instant::now();

        loop {
            tracing::info!("Waiting for Machine {}...", target);

            let current = self
                .query()
                .await
                .map_err(|e| match e {
                    DriverError::Auth(_) => e,
                    other => DriverError::Convergence {
                        target,
                        source: Box::new(other),
                    },
                })?;

            if current == target {
                tracing::info!("Machine {} reached state {}.", self.record.id, target);
                return Ok(());
            }
            if current == MachineState::Error {
                return Err(DriverError::StateUnavailable { target });
            }

            let elapsed = started.elapsed();
            if let Some(limit) = self.timeouts.converge {
                if elapsed >= limit {
                    return Err(DriverError::Timeout { target, elapsed });
                }
            }

            tracing::debug!(
                "Machine {} is {:?} ({}), next poll in {:?}",
                self.record.id,
                current,
                self.record.status,
                self.timeouts.poll_interval
            );
            tokio::time::sleep(self.timeouts.poll_interval).await;
        }
    }

    /// Issue `operation`, validate its status code, then wait for its target.
    pub async fn execute(&mut self, operation: Operation) -> Result<()> {
        let id = self.record.id.clone();
        tracing::debug!("Issuing {} for server {}", operation.name(), id);

        let response = match operation {
            Operation::PowerOn => self.api.power_on(&id).await?,
            Operation::ShutDown => self.api.shut_down(&id).await?,
            Operation::Reboot => self.api.reboot(&id).await?,
            Operation::Delete => self.api.delete_server(&id).await?,
        };
        let response = mapper::accept(response, operation.accepted())?;
        if response.status == 404 {
            tracing::info!("Server {} was already gone", id);
        }

        match operation.target() {
            Some(target) => self.await_state(target).await,
            None => {
                self.record.clear();
                Ok(())
            }
        }
    }
}
