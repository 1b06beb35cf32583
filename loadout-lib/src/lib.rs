//! Versioned plugin profiles.
//!
//! A [`Profile`] is a named, switchable collection of plugin enablement state. Profiles are
//! persisted as short, version-tagged strings through the [`ProfileCodec`], which upgrades
//! anything written by older software into the current in-memory representation.

use thiserror::Error;

pub mod codec;
pub mod config;
pub mod fs;
pub mod profile;
pub mod store;

pub use codec::{Decoded, ProfileCodec, SchemaVersion};
pub use config::{Cfg, CoreConfig};
pub use profile::{Profile, ProfileEntry, StartupPolicy};
pub use store::{LoadReport, ProfileStore};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Codec(#[from] codec::Error),
    #[error(transparent)]
    Profile(#[from] profile::Error),
    #[error(transparent)]
    Store(#[from] store::Error),
    #[error(transparent)]
    Config(#[from] config::Error),
}
