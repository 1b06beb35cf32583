//! File-backed profile storage.
//!
//! Each profile lives in its own file, named after the profile, holding exactly what the
//! [`ProfileCodec`] produced. Writes go through a temporary file so a crash never leaves a
//! half-written profile behind, and read-modify-write cycles are serialized by a single writer
//! lock per store.

use std::{
    fs,
    io::{self, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use heck::ToSnakeCase;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{
    codec::{self, Decoded, ProfileCodec},
    config::{self, Cfg},
    profile::{self, Profile},
};

const EXTENSION: &str = "profile";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No profile named `{0}`")]
    NotFound(String),
    #[error("A profile named `{0}` already exists")]
    DuplicateName(String),
    #[error("`{0}` can't be used as a profile name")]
    InvalidName(String),
    #[error(transparent)]
    Codec(#[from] codec::Error),
    #[error(transparent)]
    Profile(#[from] profile::Error),
    #[error("Profile storage error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error("Loading the profile panicked")]
    LoadPanicked,
}

/// Result of loading every profile in a store.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully decoded profiles, ordered by file name
    pub profiles: Vec<Profile>,
    /// Files that could not be read or decoded. What to do with them is up to the caller.
    pub failed: Vec<(PathBuf, Error)>,
}

#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
    cfg: Cfg,
    writer: Arc<Mutex<()>>,
}

impl ProfileStore {
    /// Open the store in the directory named by the configuration, creating it if needed.
    pub fn new(cfg: Cfg) -> Result<Self> {
        let dir = cfg.read().profiles_dir()?;
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            cfg,
            writer: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decode every stored profile. Files are decoded in parallel.
    pub fn list(&self) -> LoadReport {
        let mut report = LoadReport::default();

        for (path, result) in self.load_all() {
            match result {
                Ok(decoded) => report.profiles.push(decoded.profile),
                Err(err) => {
                    warn!("Skipping profile {}: {err}", path.display());
                    report.failed.push((path, err));
                }
            }
        }

        report
    }

    pub fn get(&self, name: &str) -> Result<Option<Profile>> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(None);
        }

        Ok(Some(read_profile(&path)?.profile))
    }

    /// Create and store a fresh profile.
    pub fn create(&self, name: &str) -> Result<Profile> {
        let _guard = self.writer.lock();

        let path = self.path_for(name)?;
        if path.exists() {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let profile = Profile::new(name);
        self.write(&path, &profile)?;

        debug!("Created profile: {name}");

        Ok(profile)
    }

    /// Store a profile under its name, replacing an earlier version of the same profile.
    ///
    /// Fails if the file is taken by a different profile whose name maps to the same file.
    pub fn save(&self, profile: &Profile) -> Result<()> {
        let _guard = self.writer.lock();

        let path = self.path_for(profile.name())?;
        if path.exists() && read_profile(&path)?.profile.id() != profile.id() {
            return Err(Error::DuplicateName(profile.name().clone()));
        }

        self.write(&path, profile)
    }

    /// Load a profile, let `f` modify it and store the result.
    ///
    /// No other writer on this store can run between the read and the write. Nothing is written
    /// if `f` fails. The profile is written back to the file it was read from unless `f` renames
    /// it, in which case the file is moved as well.
    pub fn update<F>(&self, name: &str, f: F) -> Result<Profile>
    where
        F: FnOnce(&mut Profile) -> Result<()>,
    {
        let _guard = self.writer.lock();

        let source = self.path_for(name)?;
        if !source.exists() {
            return Err(Error::NotFound(name.to_string()));
        }

        let mut profile = read_profile(&source)?.profile;
        let stored_name = profile.name().clone();
        f(&mut profile)?;

        let target = if *profile.name() == stored_name {
            source.clone()
        } else {
            self.path_for(profile.name())?
        };
        if target != source && target.exists() {
            return Err(Error::DuplicateName(profile.name().clone()));
        }

        self.write(&target, &profile)?;
        if target != source {
            fs::remove_file(&source)?;
        }

        Ok(profile)
    }

    pub fn rename(&self, name: &str, new_name: &str) -> Result<Profile> {
        self.update(name, |profile| {
            profile.set_name(new_name);
            Ok(())
        })
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let _guard = self.writer.lock();

        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(Error::NotFound(name.to_string()));
        }

        fs::remove_file(path)?;

        debug!("Removed profile: {name}");

        Ok(())
    }

    /// Encode a stored profile as a share string.
    pub fn export(&self, name: &str) -> Result<String> {
        let profile = self
            .get(name)?
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        Ok(ProfileCodec::encode(&profile)?)
    }

    /// Store a profile someone shared. It gets a new identity, starts out disabled and is renamed
    /// if its name is already taken.
    pub fn import(&self, share: &str) -> Result<Profile> {
        let mut profile = ProfileCodec::decode(share)?;
        profile.regenerate_id().set_is_enabled(false);

        let _guard = self.writer.lock();

        let base = profile.name().clone();
        let mut suffix = 1u32;
        while self.path_for(profile.name())?.exists() {
            suffix = suffix.saturating_add(1);
            profile.set_name(&format!("{base} ({suffix})"));
        }

        self.write(&self.path_for(profile.name())?, &profile)?;

        debug!("Imported profile: {}", profile.name());

        Ok(profile)
    }

    /// Re-encode every profile that was stored with an older schema or still relies on
    /// deprecated fields. Returns the files that were rewritten.
    pub fn upgrade_all(&self) -> Result<Vec<PathBuf>> {
        let _guard = self.writer.lock();
        let backup = self.cfg.read().backup_on_upgrade();

        let mut upgraded = Vec::new();
        for (path, result) in self.load_all() {
            let decoded = match result {
                Ok(decoded) if decoded.needs_upgrade() => decoded,
                Ok(_) => continue,
                Err(err) => {
                    warn!("Not upgrading {}: {err}", path.display());
                    continue;
                }
            };

            if backup {
                self.backup(&path)?;
            }
            self.write(&path, &decoded.profile)?;

            debug!("Upgraded {} from {}", path.display(), decoded.version);
            upgraded.push(path);
        }

        Ok(upgraded)
    }

    fn load_all(&self) -> Vec<(PathBuf, Result<Decoded>)> {
        let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);

        load_each(&self.profile_paths(), workers, read_profile)
    }

    fn profile_paths(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| {
                entry
                    .inspect_err(|err| warn!("Failed to read profile directory entry: {err}"))
                    .ok()
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .collect()
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let stem = name.to_snake_case();
        if stem.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }

        Ok(self.dir.join(format!("{stem}.{EXTENSION}")))
    }

    fn write(&self, path: &Path, profile: &Profile) -> Result<()> {
        let blob = ProfileCodec::encode(profile)?;

        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(blob.as_bytes())?;
        file.persist(path).map_err(|err| err.error)?;

        debug!("Wrote profile {} to {}", profile.id(), path.display());

        Ok(())
    }

    /// Copy a profile's file next to itself before it gets rewritten
    fn backup(&self, path: &Path) -> Result<()> {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{timestamp}.bak"));

        fs::copy(path, &name)?;

        Ok(())
    }

    #[cfg(test)]
    /// A store that lives entirely inside `dir`.
    pub(crate) fn mock(dir: &Path) -> Self {
        Self::new(crate::CoreConfig::mock(dir).into_handle()).unwrap()
    }
}

fn read_profile(path: &Path) -> Result<Decoded> {
    let blob = fs::read_to_string(path)?;

    Ok(ProfileCodec::decode_versioned(&blob)?)
}

/// Run `load` on every path, at most `workers` at a time. Results keep the order of `paths`.
fn load_each<F>(paths: &[PathBuf], workers: usize, load: F) -> Vec<(PathBuf, Result<Decoded>)>
where
    F: Fn(&Path) -> Result<Decoded> + Sync,
{
    let load = &load;
    let mut loaded = Vec::with_capacity(paths.len());

    for batch in paths.chunks(workers.max(1)) {
        thread::scope(|s| {
            let handles: Vec<_> = batch
                .iter()
                .map(|path| (path, s.spawn(move || load(path.as_path()))))
                .collect();

            for (path, handle) in handles {
                let result = handle.join().unwrap_or_else(|_| {
                    warn!("Loading {} panicked", path.display());
                    Err(Error::LoadPanicked)
                });
                loaded.push((path.clone(), result));
            }
        });
    }

    loaded
}

#[cfg(test)]
mod test {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use flate2::{Compression, write::GzEncoder};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use uuid::Uuid;

    use super::*;
    use crate::profile::{ProfileEntry, StartupPolicy};

    fn legacy_blob(json: &str) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        format!("DP1{}", STANDARD.encode(encoder.finish().unwrap()))
    }

    #[test]
    fn test_create() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());

        let profile = store.create("Savage Raid").unwrap();

        assert!(dir.path().join("savage_raid.profile").exists());
        assert_eq!(store.get("Savage Raid").unwrap(), Some(profile));
    }

    #[test]
    fn test_create_duplicate() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());

        store.create("Test").unwrap();

        assert!(matches!(store.create("Test"), Err(Error::DuplicateName(_))));
        assert!(matches!(store.create("test"), Err(Error::DuplicateName(_))));
    }

    #[test]
    fn test_invalid_name() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());

        assert!(matches!(store.create("!!!"), Err(Error::InvalidName(_))));
    }

    #[test]
    fn test_get_missing() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());

        assert_eq!(store.get("Nothing").unwrap(), None);
    }

    #[test]
    fn test_update() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        store.create("Test").unwrap();
        let id = Uuid::new_v4();

        store
            .update("Test", |p| {
                p.upsert_entry(Some("SimpleTweaksPlugin"), id, true);
                p.set_startup_policy(StartupPolicy::AlwaysEnable);
                Ok(())
            })
            .unwrap();

        let profile = store.get("Test").unwrap().unwrap();
        assert_eq!(profile.startup_policy(), StartupPolicy::AlwaysEnable);
        assert!(profile.entry(id).unwrap().is_enabled());
    }

    #[test]
    fn test_save() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        let mut profile = Profile::new("Savage Raid");

        store.save(&profile).unwrap();
        profile.upsert_entry(Some("A"), Uuid::new_v4(), true);
        store.save(&profile).unwrap();

        assert_eq!(store.get("Savage Raid").unwrap(), Some(profile));
    }

    #[test]
    fn test_save_keeps_other_profile() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        store.create("Foo Bar").unwrap();
        let original = store
            .update("Foo Bar", |p| {
                p.upsert_entry(Some("A"), Uuid::new_v4(), true);
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            store.save(&Profile::new("foo_bar")),
            Err(Error::DuplicateName(_))
        ));
        assert_eq!(store.get("Foo Bar").unwrap(), Some(original));
    }

    #[test]
    fn test_update_keeps_file_of_unnamed_profile() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        let path = dir.path().join("raid.profile");
        let mut unnamed = Profile::new("Raid");
        unnamed.set_name("");
        fs::write(&path, ProfileCodec::encode(&unnamed).unwrap()).unwrap();

        let updated = store
            .update("raid", |p| {
                p.set_is_enabled(true);
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.id(), unnamed.id());
        let stored = read_profile(&path).unwrap().profile;
        assert!(stored.is_enabled());
        assert_eq!(stored.name(), "");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_update_missing() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());

        assert!(matches!(
            store.update("Nothing", |_| Ok(())),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        store.create("Test").unwrap();
        let id = Uuid::new_v4();

        let result = store.update("Test", |p| {
            p.set_is_enabled(true);
            p.add_entry(ProfileEntry::new(Some("A"), id, true))?;
            p.add_entry(ProfileEntry::new(Some("A"), id, true))?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(Error::Profile(profile::Error::DuplicateEntryId(dup))) if dup == id
        ));
        let stored = store.get("Test").unwrap().unwrap();
        assert!(!stored.is_enabled());
        assert!(stored.entries().is_empty());
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        store.create("Test").unwrap();

        thread::scope(|s| {
            for _ in 0..8 {
                let store = store.clone();
                s.spawn(move || {
                    store
                        .update("Test", |p| {
                            p.upsert_entry(None, Uuid::new_v4(), true);
                            Ok(())
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(store.get("Test").unwrap().unwrap().entries().len(), 8);
    }

    #[test]
    fn test_rename() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        let original = store.create("Old").unwrap();
        store.create("Taken").unwrap();

        let renamed = store.rename("Old", "New").unwrap();

        assert_eq!(renamed.id(), original.id());
        assert!(store.get("Old").unwrap().is_none());
        assert_eq!(store.get("New").unwrap().unwrap().name(), "New");
        assert!(matches!(
            store.rename("New", "Taken"),
            Err(Error::DuplicateName(_))
        ));
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        store.create("Test").unwrap();

        store.remove("Test").unwrap();

        assert!(store.get("Test").unwrap().is_none());
        assert!(matches!(store.remove("Test"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_list_reports_failures() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        store.create("Alpha").unwrap();
        store.create("Beta").unwrap();
        fs::write(dir.path().join("broken.profile"), "DP9garbage").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a profile").unwrap();

        let report = store.list();

        let names: Vec<&str> = report.profiles.iter().map(|p| p.name().as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(
            report.failed.first(),
            Some((_, Error::Codec(codec::Error::UnknownProfileVersion(_))))
        ));
    }

    #[test]
    fn test_list_more_profiles_than_workers() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let names: Vec<String> = (0..workers * 2 + 1).map(|i| format!("P{i:03}")).collect();
        for name in &names {
            store.create(name).unwrap();
        }

        let report = store.list();

        let listed: Vec<&String> = report.profiles.iter().map(Profile::name).collect();
        assert_eq!(listed, names.iter().collect::<Vec<_>>());
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_panicked_load_is_reported() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        store.create("Alpha").unwrap();
        store.create("Beta").unwrap();
        store.create("Gamma").unwrap();

        let loaded = load_each(&store.profile_paths(), 2, |path| {
            if path.ends_with("beta.profile") {
                panic!("unreadable");
            }
            read_profile(path)
        });

        assert_eq!(loaded.len(), 3);
        let panicked: Vec<&PathBuf> = loaded
            .iter()
            .filter(|(_, result)| matches!(result, Err(Error::LoadPanicked)))
            .map(|(path, _)| path)
            .collect();
        assert_eq!(panicked, vec![&dir.path().join("beta.profile")]);
    }

    #[test]
    fn test_export_import() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        let original = store.create("Test").unwrap();
        store
            .update("Test", |p| {
                p.set_is_enabled(true);
                p.upsert_entry(Some("A"), Uuid::new_v4(), true);
                Ok(())
            })
            .unwrap();

        let share = store.export("Test").unwrap();
        let first = store.import(&share).unwrap();
        let second = store.import(&share).unwrap();

        assert_eq!(first.name(), "Test (2)");
        assert_eq!(second.name(), "Test (3)");
        assert_ne!(first.id(), original.id());
        assert!(!first.is_enabled());
        assert_eq!(first.entries(), store.get("Test").unwrap().unwrap().entries());
    }

    #[test]
    fn test_upgrade_all() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::mock(dir.path());
        store.create("Current").unwrap();
        let legacy_path = dir.path().join("legacy.profile");
        fs::write(&legacy_path, legacy_blob(r#"{"n":"Legacy","b":true}"#)).unwrap();

        let upgraded = store.upgrade_all().unwrap();

        assert_eq!(upgraded, vec![legacy_path.clone()]);

        let decoded = read_profile(&legacy_path).unwrap();
        assert!(!decoded.needs_upgrade());
        assert_eq!(decoded.profile.startup_policy(), StartupPolicy::AlwaysEnable);

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .count();
        assert_eq!(backups, 1);

        // Nothing left to do
        assert!(store.upgrade_all().unwrap().is_empty());
    }

    #[test]
    fn test_upgrade_without_backup() {
        let dir = tempdir().unwrap();
        let mut cfg = crate::CoreConfig::mock(dir.path());
        cfg.set_backup_on_upgrade(false);
        let store = ProfileStore::new(cfg.into_handle()).unwrap();
        fs::write(
            dir.path().join("legacy.profile"),
            legacy_blob(r#"{"n":"Legacy","b":false}"#),
        )
        .unwrap();

        assert_eq!(store.upgrade_all().unwrap().len(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
