use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use colored::Colorize;
use loadout_lib::{CoreConfig, ProfileStore, codec, store};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod plugin;
mod profile;

#[derive(Parser, Debug)]
#[command(name = "loadout")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Override the directory profiles are stored in
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    #[command(flatten)]
    Profile(profile::Command),
    /// Operate on the plugins in a profile
    #[command(subcommand)]
    Plugin(plugin::Command),
    /// Rewrite profiles stored with an older format
    Upgrade,
}

fn main() -> ExitCode {
    // Human friendly panicking in release mode
    human_panic::setup_panic!();

    // Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set up logging: {err}");
    }

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            exit_code(&err).into()
        }
    }
}

fn run(cli: &Cli) -> loadout_lib::Result<()> {
    let mut cfg = CoreConfig::load()?;
    if let Some(dir) = &cli.dir {
        cfg.set_profiles_dir(Some(dir.clone()));
    }
    let store = ProfileStore::new(cfg.into_handle())?;

    match &cli.command {
        Command::Profile(cmd) => profile::handle(&store, cmd),
        Command::Plugin(cmd) => plugin::handle(&store, cmd),
        Command::Upgrade => {
            let upgraded = store.upgrade_all()?;
            for path in &upgraded {
                println!("Upgraded {}", path.display());
            }
            if upgraded.is_empty() {
                println!("All profiles in {} are up to date", store.dir().display());
            }
            Ok(())
        }
    }
}

fn exit_code(err: &loadout_lib::Error) -> sysexits::ExitCode {
    use loadout_lib::Error;

    match err {
        Error::Codec(_) | Error::Profile(_) => sysexits::ExitCode::DataErr,
        Error::Config(_) => sysexits::ExitCode::Config,
        Error::Store(err) => match err {
            store::Error::NotFound(_) => sysexits::ExitCode::NoInput,
            store::Error::DuplicateName(_) | store::Error::InvalidName(_) => {
                sysexits::ExitCode::Usage
            }
            store::Error::Codec(codec::Error::Encode(_)) | store::Error::LoadPanicked => {
                sysexits::ExitCode::Software
            }
            store::Error::Codec(_) | store::Error::Profile(_) => sysexits::ExitCode::DataErr,
            store::Error::Io(_) => sysexits::ExitCode::IoErr,
            store::Error::Config(_) => sysexits::ExitCode::Config,
        },
    }
}
