use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::ProfileEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ProfileEntryModel {
    #[serde(rename = "InternalName", default)]
    pub(crate) internal_name: Option<String>,
    #[serde(rename = "WorkingPluginId")]
    pub(crate) working_plugin_id: Uuid,
    #[serde(rename = "IsEnabled", default)]
    pub(crate) is_enabled: bool,
}

impl From<&ProfileEntry> for ProfileEntryModel {
    fn from(entry: &ProfileEntry) -> Self {
        Self {
            internal_name: entry.internal_name.clone(),
            working_plugin_id: entry.working_plugin_id,
            is_enabled: entry.is_enabled,
        }
    }
}

impl From<ProfileEntryModel> for ProfileEntry {
    fn from(model: ProfileEntryModel) -> Self {
        Self {
            internal_name: model.internal_name,
            working_plugin_id: model.working_plugin_id,
            is_enabled: model.is_enabled,
        }
    }
}
