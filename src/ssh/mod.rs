//! SSH key provisioning for driver-created machines.
//!
//! Keys are produced with the pure Rust `ssh-key` crate, so creating a
//! machine never shells out to `ssh-keygen`.

pub(crate) mod keys;

pub use keys::{generate_key_pair, read_public_key};
