pub mod cli;
pub mod cloud;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod vault;

#[cfg(feature = "keyring-store")]
pub mod keyring;
