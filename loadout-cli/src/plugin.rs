use clap::{Subcommand, ValueEnum};
use loadout_lib::{ProfileEntry, ProfileStore, profile::Error as ProfileError};
use uuid::Uuid;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the plugins in a profile
    List { profile: String },
    /// Add a plugin to a profile
    Add {
        profile: String,
        internal_name: String,
        /// Working ID of the installed plugin. A new one is generated if omitted.
        #[arg(long)]
        id: Option<Uuid>,
        /// Add the plugin without enabling it
        #[arg(long)]
        disabled: bool,
    },
    /// Remove a plugin from a profile
    Remove { profile: String, id: Uuid },
    /// Turn a plugin on or off within a profile
    Toggle {
        profile: String,
        id: Uuid,
        #[arg(value_enum)]
        state: State,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum State {
    On,
    Off,
}

pub fn handle(store: &ProfileStore, cmd: &Command) -> loadout_lib::Result<()> {
    match cmd {
        Command::List { profile } => {
            for entry in crate::profile::find(store, profile)?.entries() {
                println!(
                    "{} {} {}",
                    if entry.is_enabled() { "*" } else { " " },
                    entry.working_plugin_id(),
                    entry.display_name()
                );
            }
        }
        Command::Add {
            profile,
            internal_name,
            id,
            disabled,
        } => {
            let id = id.unwrap_or_else(Uuid::new_v4);
            store.update(profile, |p| {
                p.add_entry(ProfileEntry::new(Some(internal_name.as_str()), id, !disabled))?;
                Ok(())
            })?;
            println!("{id}");
        }
        Command::Remove { profile, id } => {
            store.update(profile, |p| {
                p.remove_entry(*id)
                    .map(|_| ())
                    .ok_or_else(|| ProfileError::EntryNotFound(*id).into())
            })?;
        }
        Command::Toggle { profile, id, state } => {
            store.update(profile, |p| {
                if p.set_entry_enabled(*id, matches!(state, State::On)) {
                    Ok(())
                } else {
                    Err(ProfileError::EntryNotFound(*id).into())
                }
            })?;
        }
    }

    Ok(())
}
