//! The current, normalized in-memory profile.
//!
//! Everything handed out by the [`ProfileCodec`](crate::ProfileCodec) is a [`Profile`]: legacy
//! fields have already been migrated and the startup policy is always resolved.

use clap::ValueEnum;
use getset::{CopyGetters, Getters, Setters};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;
use uuid::Uuid;

mod entry;

pub use entry::ProfileEntry;

/// Name given to profiles that don't carry one.
pub const DEFAULT_PROFILE_NAME: &str = "New Collection";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Plugin entry {0} already exists in this profile")]
    DuplicateEntryId(Uuid),
    #[error("No plugin entry {0} in this profile")]
    EntryNotFound(Uuid),
}

/// Governs what happens to a profile's enabled state when the plugin host starts.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StartupPolicy {
    /// Keep whatever state the profile was last left in
    #[default]
    RememberState,
    AlwaysEnable,
    AlwaysDisable,
}

/// A named, switchable collection of plugin enablement state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters, CopyGetters, Setters)]
pub struct Profile {
    #[getset(get_copy = "pub")]
    pub(crate) id: Uuid,
    #[getset(get = "pub")]
    pub(crate) name: String,
    #[getset(get_copy = "pub", set = "pub")]
    pub(crate) startup_policy: StartupPolicy,
    /// Whether the profile as a whole is currently active
    #[getset(get_copy = "pub", set = "pub")]
    pub(crate) is_enabled: bool,
    /// Display color. Opaque to this crate.
    #[getset(get_copy = "pub", set = "pub")]
    pub(crate) color: u32,
    /// Plugin entries in display order
    #[getset(get = "pub")]
    pub(crate) entries: Vec<ProfileEntry>,
}

impl Profile {
    /// Create a fresh, disabled profile with no entries.
    pub fn new(name: &str) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub(crate) fn with_id(id: Uuid, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            startup_policy: StartupPolicy::default(),
            is_enabled: false,
            color: 0,
            entries: Vec::new(),
        }
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    /// Give this profile a new identity, e.g. when it was imported from somewhere else.
    pub fn regenerate_id(&mut self) -> &mut Self {
        self.id = Uuid::new_v4();
        self
    }

    /// Decide whether the profile should come up enabled, given the state it was last left in.
    pub fn wants_enabled_on_startup(&self, last_state: bool) -> bool {
        match self.startup_policy {
            StartupPolicy::RememberState => last_state,
            StartupPolicy::AlwaysEnable => true,
            StartupPolicy::AlwaysDisable => false,
        }
    }

    // Entries

    /// Append an entry. Working plugin IDs must be unique within a profile.
    pub fn add_entry(&mut self, entry: ProfileEntry) -> Result<()> {
        if self.entry(entry.working_plugin_id).is_some() {
            return Err(Error::DuplicateEntryId(entry.working_plugin_id));
        }

        self.entries.push(entry);

        Ok(())
    }

    /// Update the entry with the given working ID in place, or append a new one if there is none.
    pub fn upsert_entry(
        &mut self,
        internal_name: Option<&str>,
        working_plugin_id: Uuid,
        enabled: bool,
    ) {
        match self.entry_mut(working_plugin_id) {
            Some(existing) => {
                if internal_name.is_some() {
                    existing.internal_name = internal_name.map(str::to_string);
                }
                existing.is_enabled = enabled;
            }
            None => self
                .entries
                .push(ProfileEntry::new(internal_name, working_plugin_id, enabled)),
        }
    }

    pub fn remove_entry(&mut self, working_plugin_id: Uuid) -> Option<ProfileEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.working_plugin_id == working_plugin_id)?;

        Some(self.entries.remove(index))
    }

    pub fn entry(&self, working_plugin_id: Uuid) -> Option<&ProfileEntry> {
        self.entries
            .iter()
            .find(|e| e.working_plugin_id == working_plugin_id)
    }

    fn entry_mut(&mut self, working_plugin_id: Uuid) -> Option<&mut ProfileEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.working_plugin_id == working_plugin_id)
    }

    /// All installed instances of the plugin with the given internal name.
    pub fn entries_named<'a>(
        &'a self,
        internal_name: &'a str,
    ) -> impl Iterator<Item = &'a ProfileEntry> {
        self.entries
            .iter()
            .filter(move |e| e.internal_name.as_deref() == Some(internal_name))
    }

    /// Returns `false` if there is no entry with the given working ID.
    pub fn set_entry_enabled(&mut self, working_plugin_id: Uuid, enabled: bool) -> bool {
        match self.entry_mut(working_plugin_id) {
            Some(entry) => {
                entry.set_enabled(enabled);
                true
            }
            None => false,
        }
    }
}
