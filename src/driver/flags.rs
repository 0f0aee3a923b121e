//! Create flags and the flat option map they are delivered in.

use std::collections::HashMap;

pub const FLAG_SERVER_OS: &str = "pnap-server-os";
pub const FLAG_SERVER_LOCATION: &str = "pnap-server-location";
pub const FLAG_SERVER_TYPE: &str = "pnap-server-type";
pub const FLAG_SERVER_DESCRIPTION: &str = "pnap-server-description";
pub const FLAG_SERVER_HOSTNAME: &str = "pnap-server-hostname";
pub const FLAG_CLIENT_IDENTIFIER: &str = "pnap-client-identifier";
pub const FLAG_CLIENT_SECRET: &str = "pnap-client-secret";

/// A string option the driver accepts at create time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFlag {
    pub name: &'static str,
    pub env_var: &'static str,
    pub usage: &'static str,
    pub default: &'static str,
}

const CREATE_FLAGS: &[CreateFlag] = &[
    CreateFlag {
        name: FLAG_SERVER_OS,
        env_var: "PNAP_SERVER_OS",
        usage: "The server's OS ID used when the server was created (e.g., ubuntu/bionic, centos/centos7).",
        default: "",
    },
    CreateFlag {
        name: FLAG_SERVER_LOCATION,
        env_var: "PNAP_SERVER_LOCATION",
        usage: "Server Location ID. Cannot be changed once a server is created",
        default: "",
    },
    CreateFlag {
        name: FLAG_SERVER_TYPE,
        env_var: "PNAP_SERVER_TYPE",
        usage: "Server type ID. Cannot be changed once a server is created",
        default: "",
    },
    CreateFlag {
        name: FLAG_SERVER_DESCRIPTION,
        env_var: "PNAP_SERVER_DESCRIPTION",
        usage: "Server description",
        default: "",
    },
    CreateFlag {
        name: FLAG_SERVER_HOSTNAME,
        env_var: "PNAP_SERVER_HOSTNAME",
        usage: "Server hostname",
        default: "",
    },
    CreateFlag {
        name: FLAG_CLIENT_IDENTIFIER,
        env_var: "PNAP_CLIENT_ID",
        usage: "Client ID from Application Credentials",
        default: "",
    },
    CreateFlag {
        name: FLAG_CLIENT_SECRET,
        env_var: "PNAP_CLIENT_SECRET",
        usage: "Client Secret from Application Credentials",
        default: "",
    },
];

/// Flags accepted by `create`.
pub fn create_flags() -> &'static [CreateFlag] {
    CREATE_FLAGS
}

/// Flat name → value mapping handed to `set_config_from_flags`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverOptions {
    values: HashMap<String, String>,
}

impl DriverOptions {
    /// Value of `name`, or an empty string when unset.
    pub fn string(&self, name: &str) -> String {
        self.values.get(name).cloned().unwrap_or_default()
    }

    /// Fill every create flag that was not given explicitly from its
    /// environment variable, then from its default.
    pub fn with_env_fallback(mut self) -> Self {
        self.fill_missing(|var| std::env::var(var).ok());
        self
    }

    fn fill_missing(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for flag in create_flags() {
            if self.values.contains_key(flag.name) {
                continue;
            }
            let value = lookup(flag.env_var).unwrap_or_else(|| flag.default.to_string());
            self.values.insert(flag.name.to_string(), value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DriverOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
