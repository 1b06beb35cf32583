use clap::Subcommand;
use colored::Colorize;
use loadout_lib::{Profile, ProfileCodec, ProfileStore, StartupPolicy, store};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List profiles
    List,
    /// Add a new profile
    New {
        name: String,
        #[arg(long, value_enum)]
        policy: Option<StartupPolicy>,
        /// Display color as hex, e.g. ff00ff00
        #[arg(long, value_parser = parse_color)]
        color: Option<u32>,
    },
    /// Show a profile and its plugins
    Show { name: String },
    /// Enable a profile
    Enable { name: String },
    /// Disable a profile
    Disable { name: String },
    /// Set what happens to a profile when the plugin host starts
    Policy {
        name: String,
        #[arg(value_enum)]
        policy: StartupPolicy,
    },
    /// Rename a profile
    Rename { name: String, new_name: String },
    /// Delete a profile
    Remove { name: String },
    /// Print a profile as a share string
    Export { name: String },
    /// Add a profile from a share string
    Import { share: String },
    /// Print the contents of a share string without storing it
    Decode { share: String },
}

pub fn handle(store: &ProfileStore, cmd: &Command) -> loadout_lib::Result<()> {
    match cmd {
        Command::List => {
            let report = store.list();
            for profile in &report.profiles {
                println!("{}", summary(profile));
            }
            for (path, err) in &report.failed {
                println!("{} {}: {err}", "!".red().bold(), path.display());
            }
        }
        Command::New {
            name,
            policy,
            color,
        } => {
            let profile = store.create(name)?;
            if policy.is_some() || color.is_some() {
                store.update(profile.name(), |p| {
                    if let Some(policy) = policy {
                        p.set_startup_policy(*policy);
                    }
                    if let Some(color) = color {
                        p.set_color(*color);
                    }
                    Ok(())
                })?;
            }
        }
        Command::Show { name } => {
            let profile = find(store, name)?;
            println!("{}", summary(&profile));
            println!("  id: {}", profile.id());
            for entry in profile.entries() {
                let marker = if entry.is_enabled() {
                    "+".green()
                } else {
                    "-".dimmed()
                };
                println!(
                    "  {marker} {} ({})",
                    entry.display_name(),
                    entry.working_plugin_id()
                );
            }
        }
        Command::Enable { name } => set_enabled(store, name, true)?,
        Command::Disable { name } => set_enabled(store, name, false)?,
        Command::Policy { name, policy } => {
            store.update(name, |p| {
                p.set_startup_policy(*policy);
                Ok(())
            })?;
        }
        Command::Rename { name, new_name } => {
            store.rename(name, new_name)?;
        }
        Command::Remove { name } => store.remove(name)?,
        Command::Export { name } => println!("{}", store.export(name)?),
        Command::Import { share } => {
            let profile = store.import(share)?;
            println!("Imported {}", profile.name());
        }
        Command::Decode { share } => {
            let profile = ProfileCodec::decode(share)?;
            match serde_json::to_string_pretty(&profile) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("{err}"),
            }
        }
    }

    Ok(())
}

pub(crate) fn find(store: &ProfileStore, name: &str) -> loadout_lib::Result<Profile> {
    Ok(store
        .get(name)?
        .ok_or_else(|| store::Error::NotFound(name.to_string()))?)
}

fn set_enabled(store: &ProfileStore, name: &str, enabled: bool) -> loadout_lib::Result<()> {
    store.update(name, |p| {
        p.set_is_enabled(enabled);
        Ok(())
    })?;

    Ok(())
}

fn summary(profile: &Profile) -> String {
    let state = if profile.is_enabled() {
        "enabled".green()
    } else {
        "disabled".dimmed()
    };

    format!(
        "{} [{state}] {} plugins, {}, #{:08x}",
        profile.name().bold(),
        profile.entries().len(),
        profile.startup_policy(),
        profile.color()
    )
}

fn parse_color(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s.trim_start_matches('#'), 16).map_err(|err| err.to_string())
}
