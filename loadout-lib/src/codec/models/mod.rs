//! Every schema version a profile has ever been stored with.
//!
//! Versions are append-only: a new schema gets a new [`SchemaVersion`] variant with a prefix that
//! has never been used before, and becomes [`CURRENT_SCHEMA_VERSION`]. Older versions are kept
//! around for decoding only.

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    codec::{Result, models::v1::ProfileModelV1},
    profile::Profile,
};

pub(crate) mod v1;

/// The version every profile is encoded with.
pub(crate) const CURRENT_SCHEMA_VERSION: SchemaVersion = SchemaVersion::V1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum SchemaVersion {
    V1,
}

impl SchemaVersion {
    /// Token that identifies this version on the wire.
    pub fn prefix(self) -> &'static str {
        match self {
            SchemaVersion::V1 => ProfileModelV1::SERIALIZED_PREFIX,
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::iter().find(|version| version.prefix() == prefix)
    }
}

/// A profile exactly as stored by one particular schema version.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ProfileModel {
    V1(ProfileModelV1),
}

impl ProfileModel {
    pub fn decode(version: SchemaVersion, payload: &str) -> Result<Self> {
        match version {
            SchemaVersion::V1 => Ok(Self::V1(ProfileModelV1::decode(payload)?)),
        }
    }

    /// Build the stored form of a profile using the current schema.
    pub fn from_current(profile: &Profile) -> Self {
        Self::V1(ProfileModelV1::from(profile))
    }

    pub fn version(&self) -> SchemaVersion {
        match self {
            Self::V1(_) => SchemaVersion::V1,
        }
    }

    pub fn serialized_prefix(&self) -> &'static str {
        self.version().prefix()
    }

    /// Whether converting to the current model will have to migrate deprecated fields.
    pub fn has_legacy_startup_state(&self) -> bool {
        match self {
            Self::V1(model) => model.startup_policy.is_none(),
        }
    }

    /// Migrate into the current in-memory model.
    pub fn into_current(self) -> Result<Profile> {
        match self {
            Self::V1(model) => model.into_current(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        let payload = match self {
            Self::V1(model) => model.encode_payload()?,
        };

        Ok(format!("{}{payload}", self.serialized_prefix()))
    }
}
