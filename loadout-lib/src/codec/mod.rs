//! Version-tagged serialization of profiles.
//!
//! A serialized profile is `<prefix><payload>`, where the prefix names the schema version the
//! payload was written with. Decoding dispatches on the prefix and always yields the current
//! [`Profile`]; encoding always goes through the newest schema, so re-saving a profile upgrades it.

use std::io;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
    codec::models::{CURRENT_SCHEMA_VERSION, ProfileModel},
    profile::Profile,
};

mod models;
mod payload;

pub use models::SchemaVersion;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed profile: {0}")]
    MalformedPayload(#[from] Malformed),
    #[error("Unknown profile version `{0}`")]
    UnknownProfileVersion(String),
    #[error("Plugin entry {0} appears more than once in the profile")]
    DuplicateEntryId(Uuid),
    #[error("Failed to encode profile: {0}")]
    Encode(#[source] io::Error),
}

/// Structural reasons a payload could not be parsed.
#[derive(Debug, Error)]
pub enum Malformed {
    #[error("missing version prefix")]
    MissingPrefix,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid compressed data: {0}")]
    Compression(#[source] io::Error),
    #[error("invalid profile data: {0}")]
    Json(#[from] serde_json::Error),
}

/// A decoded profile along with how it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub profile: Profile,
    /// The schema version the blob was written with
    pub version: SchemaVersion,
    /// The startup policy had to be derived from the legacy boot flag
    pub migrated: bool,
}

impl Decoded {
    /// Whether re-encoding would change the stored representation.
    pub fn needs_upgrade(&self) -> bool {
        self.migrated || self.version < CURRENT_SCHEMA_VERSION
    }
}

/// Stateless dispatcher between serialized profiles and [`Profile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileCodec;

impl ProfileCodec {
    pub fn decode(blob: &str) -> Result<Profile> {
        Ok(Self::decode_versioned(blob)?.profile)
    }

    pub fn decode_versioned(blob: &str) -> Result<Decoded> {
        let (prefix, payload) = split_prefix(blob.trim());
        if prefix.is_empty() {
            return Err(Malformed::MissingPrefix.into());
        }

        let version = SchemaVersion::from_prefix(prefix)
            .ok_or_else(|| Error::UnknownProfileVersion(prefix.to_string()))?;

        let model = ProfileModel::decode(version, payload)?;
        let migrated = model.has_legacy_startup_state();
        let profile = model.into_current()?;

        debug!(
            "Decoded {version} profile {} ({} entries)",
            profile.id(),
            profile.entries().len()
        );

        Ok(Decoded {
            profile,
            version,
            migrated,
        })
    }

    /// Serialize with the newest schema, regardless of where the profile came from.
    pub fn encode(profile: &Profile) -> Result<String> {
        let model = ProfileModel::from_current(profile);
        let blob = model.encode()?;

        debug!("Encoded profile {} as {}", profile.id(), model.version());

        Ok(blob)
    }
}

/// Split a blob into its version token and payload.
///
/// The token is a run of ASCII letters followed by a run of ASCII digits, e.g. `DP1` or `DP12`.
/// A blob that doesn't start with a letter has no token at all.
fn split_prefix(blob: &str) -> (&str, &str) {
    let letters = blob.bytes().take_while(u8::is_ascii_alphabetic).count();
    if letters == 0 {
        return ("", blob);
    }

    let digits = blob
        .bytes()
        .skip(letters)
        .take_while(u8::is_ascii_digit)
        .count();

    blob.split_at(letters + digits)
}
