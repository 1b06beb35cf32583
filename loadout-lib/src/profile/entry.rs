use getset::{CopyGetters, Getters};
use serde::Serialize;
use uuid::Uuid;

/// One plugin's membership in a [`Profile`](super::Profile).
///
/// The same plugin may be installed more than once, so entries are keyed by
/// `working_plugin_id` rather than by `internal_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters, CopyGetters)]
pub struct ProfileEntry {
    /// Internal name of the plugin, if it has been resolved
    #[getset(get = "pub")]
    pub(crate) internal_name: Option<String>,
    /// Identifies this specific installed instance of the plugin
    #[getset(get_copy = "pub")]
    pub(crate) working_plugin_id: Uuid,
    #[getset(get_copy = "pub")]
    pub(crate) is_enabled: bool,
}

impl ProfileEntry {
    pub fn new(internal_name: Option<&str>, working_plugin_id: Uuid, is_enabled: bool) -> Self {
        Self {
            internal_name: internal_name.map(str::to_string),
            working_plugin_id,
            is_enabled,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
    }

    /// Label used when listing entries. Falls back to the working ID for unresolved plugins.
    pub fn display_name(&self) -> String {
        self.internal_name
            .clone()
            .unwrap_or_else(|| self.working_plugin_id.to_string())
    }
}
