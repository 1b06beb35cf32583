use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
    codec::{Error, Malformed, Result, models::v1::entries::ProfileEntryModel, payload},
    profile::{DEFAULT_PROFILE_NAME, Profile, StartupPolicy},
};

/// Version 1 of the stored profile.
///
/// Field names are kept short since these end up in share strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ProfileModelV1 {
    #[serde(rename = "id", default)]
    pub(crate) id: Uuid,
    #[serde(rename = "n", default = "default_name")]
    pub(crate) name: String,
    /// Superseded by `startup_policy`. Read so older profiles can be migrated, never written.
    #[serde(rename = "b", default, skip_serializing)]
    pub(crate) always_enable_on_boot: bool,
    /// `None` means the profile predates startup policies and `always_enable_on_boot` applies
    #[serde(rename = "p", default, with = "policy_code")]
    pub(crate) startup_policy: Option<StartupPolicy>,
    #[serde(rename = "e", default)]
    pub(crate) is_enabled: bool,
    #[serde(rename = "c", default)]
    pub(crate) color: u32,
    #[serde(rename = "Plugins", default, deserialize_with = "null_as_empty")]
    pub(crate) plugins: Vec<ProfileEntryModel>,
}

impl ProfileModelV1 {
    pub(crate) const SERIALIZED_PREFIX: &'static str = "DP1";

    pub(crate) fn decode(payload: &str) -> Result<Self> {
        let json = payload::unpack(payload)?;

        serde_json::from_slice(&json).map_err(|err| Malformed::Json(err).into())
    }

    pub(crate) fn encode_payload(&self) -> Result<String> {
        let json = serde_json::to_vec(self).map_err(|err| Error::Encode(err.into()))?;

        payload::pack(&json).map_err(Error::Encode)
    }

    pub(crate) fn into_current(self) -> Result<Profile> {
        let startup_policy = migrate_startup_policy(self.startup_policy, self.always_enable_on_boot);

        let mut profile = Profile::with_id(self.id, &self.name);
        profile
            .set_startup_policy(startup_policy)
            .set_is_enabled(self.is_enabled)
            .set_color(self.color);

        for plugin in self.plugins {
            let id = plugin.working_plugin_id;
            profile
                .add_entry(plugin.into())
                .map_err(|_| Error::DuplicateEntryId(id))?;
        }

        Ok(profile)
    }
}

impl From<&Profile> for ProfileModelV1 {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            always_enable_on_boot: false,
            startup_policy: Some(profile.startup_policy),
            is_enabled: profile.is_enabled,
            color: profile.color,
            plugins: profile.entries.iter().map(ProfileEntryModel::from).collect(),
        }
    }
}

/// Resolve the startup policy of a stored profile.
///
/// An explicit policy always wins. Profiles written before policies existed only carry the boot
/// flag, which maps onto the two policies it could express.
pub(crate) fn migrate_startup_policy(
    policy: Option<StartupPolicy>,
    always_enable_on_boot: bool,
) -> StartupPolicy {
    match (policy, always_enable_on_boot) {
        (Some(policy), _) => policy,
        (None, true) => StartupPolicy::AlwaysEnable,
        (None, false) => StartupPolicy::RememberState,
    }
}

fn default_name() -> String {
    DEFAULT_PROFILE_NAME.to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<ProfileEntryModel>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ProfileEntryModel>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Startup policies are stored as their ordinal.
mod policy_code {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    use crate::profile::StartupPolicy;

    pub fn serialize<S>(policy: &Option<StartupPolicy>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        policy.map(to_code).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<StartupPolicy>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<u8>::deserialize(deserializer)?
            .map(|code| {
                from_code(code).ok_or_else(|| {
                    de::Error::invalid_value(
                        de::Unexpected::Unsigned(code.into()),
                        &"a startup policy between 0 and 2",
                    )
                })
            })
            .transpose()
    }

    fn to_code(policy: StartupPolicy) -> u8 {
        match policy {
            StartupPolicy::RememberState => 0,
            StartupPolicy::AlwaysEnable => 1,
            StartupPolicy::AlwaysDisable => 2,
        }
    }

    fn from_code(code: u8) -> Option<StartupPolicy> {
        match code {
            0 => Some(StartupPolicy::RememberState),
            1 => Some(StartupPolicy::AlwaysEnable),
            2 => Some(StartupPolicy::AlwaysDisable),
            _ => None,
        }
    }
}
