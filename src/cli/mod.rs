pub mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::driver::DriverTimeouts;
use crate::error::Result;
use crate::store::{MachineStore, STORAGE_PATH_ENV};

#[derive(Parser)]
#[command(name = "pnap-machine")]
#[command(version)]
#[command(about = "Provision docker hosts on phoenixNAP Bare Metal Cloud")]
#[command(long_about = "Create, control and remove phoenixNAP BMC servers as docker hosts.\n\nEach machine is recorded under the storage path together with its SSH key.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding machine records and keys (default: ~/.pnap-machine)
    #[arg(short, long, global = true, env = STORAGE_PATH_ENV)]
    pub storage_path: Option<String>,

    /// Seconds to wait for a server to reach its target state (0 waits forever)
    #[arg(long, global = true, env = "PNAP_MACHINE_TIMEOUT", default_value = "1800")]
    pub timeout: u64,

    /// Seconds between status polls
    #[arg(long, global = true, env = "PNAP_MACHINE_POLL_INTERVAL", default_value = "10")]
    pub poll_interval: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a machine
    Create {
        /// Machine name
        name: String,

        #[command(flatten)]
        flags: CreateArgs,
    },

    /// Power on a machine
    Start { name: String },

    /// Shut down a machine
    Stop { name: String },

    /// Force a machine off
    Kill { name: String },

    /// Reboot a machine
    Restart { name: String },

    /// Delete a machine and its local record
    Rm {
        name: String,

        /// Remove the local record even if the provider call fails
        #[arg(short, long)]
        force: bool,
    },

    /// Show a machine's state
    Status { name: String },

    /// Show the docker URL of a machine
    Url { name: String },

    /// Show the IP address of a machine
    Ip { name: String },

    /// Show the SSH login account of a machine
    SshUsername { name: String },

    /// Print the stored record of a machine as JSON
    Inspect { name: String },

    /// List machines
    Ls,

    /// List the flags accepted by create
    Flags,
}

/// Driver options for `create`. Unset values fall back to their
/// environment variable.
#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// OS ID, e.g. ubuntu/bionic or centos/centos7 [env: PNAP_SERVER_OS]
    #[arg(long = "pnap-server-os")]
    pub server_os: Option<String>,

    /// Location ID, e.g. PHX or ASH [env: PNAP_SERVER_LOCATION]
    #[arg(long = "pnap-server-location")]
    pub server_location: Option<String>,

    /// Server type ID, e.g. s1.c1.medium [env: PNAP_SERVER_TYPE]
    #[arg(long = "pnap-server-type")]
    pub server_type: Option<String>,

    /// Server description [env: PNAP_SERVER_DESCRIPTION]
    #[arg(long = "pnap-server-description")]
    pub server_description: Option<String>,

    /// Server hostname; defaults to the machine name [env: PNAP_SERVER_HOSTNAME]
    #[arg(long = "pnap-server-hostname")]
    pub server_hostname: Option<String>,

    /// Client ID from Application Credentials [env: PNAP_CLIENT_ID]
    #[arg(long = "pnap-client-identifier")]
    pub client_identifier: Option<String>,

    /// Client Secret from Application Credentials [env: PNAP_CLIENT_SECRET]
    #[arg(long = "pnap-client-secret")]
    pub client_secret: Option<String>,
}

impl Cli {
    pub fn timeouts(&self) -> DriverTimeouts {
        DriverTimeouts {
            poll_interval: Duration::from_secs(self.poll_interval.max(1)),
            converge: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
        }
    }

    pub fn store(&self) -> Result<MachineStore> {
        let root: PathBuf = match &self.storage_path {
            Some(raw) => MachineStore::expand_root(raw)?,
            None => MachineStore::default_root()?,
        };
        Ok(MachineStore::new(root))
    }

    pub async fn execute(self) -> Result<()> {
        let store = self.store()?;
        let timeouts = self.timeouts();

        match self.command {
            Commands::Create { name, flags } => {
                commands::create::execute(&store, timeouts, &name, flags).await
            }
            Commands::Start { name } => {
                commands::lifecycle::execute(&store, timeouts, &name, commands::Verb::Start).await
            }
            Commands::Stop { name } => {
                commands::lifecycle::execute(&store, timeouts, &name, commands::Verb::Stop).await
            }
            Commands::Kill { name } => {
                commands::lifecycle::execute(&store, timeouts, &name, commands::Verb::Kill).await
            }
            Commands::Restart { name } => {
                commands::lifecycle::execute(&store, timeouts, &name, commands::Verb::Restart).await
            }
            Commands::Rm { name, force } => {
                commands::lifecycle::remove(&store, timeouts, &name, force).await
            }
            Commands::Status { name } => commands::inspect::status(&store, timeouts, &name).await,
            Commands::Url { name } => commands::inspect::url(&store, &name),
            Commands::Ip { name } => commands::inspect::ip(&store, &name),
            Commands::SshUsername { name } => commands::inspect::ssh_username(&store, &name),
            Commands::Inspect { name } => commands::inspect::inspect(&store, &name),
            Commands::Ls => commands::inspect::list(&store),
            Commands::Flags => commands::inspect::flags(),
        }
    }
}
