//! Preset library
//!
//! [`PresetLibrary`] owns the library file and every preset file. Each
//! operation changes the in-memory state and writes the affected files
//! before returning, so the CLI and the daemon can share the data directory
//! and a running daemon sees edits through its file watcher.

use crate::config::LibraryPaths;
use crate::error::{PresetError, Result, SettingsError};
use crate::settings::library::LibrarySettings;
use crate::settings::preset::{Preset, DEFAULT_VOLUME};
use crate::settings::{self, SettingsFile};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Preset names double as file stems
fn validate_name(name: &str) -> std::result::Result<(), PresetError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        return Err(PresetError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Whether two paths name the same existing file. Also true for paths that
/// only differ in case on a case-insensitive filesystem.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Preset files in a directory, sorted by file name
fn preset_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Build a library from whatever preset files are in `presets_dir`,
/// creating `Preset_<n>` when there are none.
fn scan_presets(paths: &LibraryPaths) -> Result<LibrarySettings> {
    std::fs::create_dir_all(&paths.presets_dir)?;

    let mut files = preset_files(&paths.presets_dir)?;
    if files.is_empty() {
        let count = std::fs::read_dir(&paths.presets_dir)?.count();
        let name = format!("Preset_{}", count);
        let path = paths.presets_dir.join(format!("{}.json", name));
        tracing::info!("No presets found, creating {:?}", path);
        SettingsFile::new(&path, Preset::new(name)).save()?;
        files.push(path);
    }

    let mut settings = LibrarySettings::default();
    for path in files {
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let preset = SettingsFile::open_or_create(&path, || Preset::new(fallback))?;
        if let Err(e) = settings.insert(&preset.name, path.clone(), None) {
            tracing::warn!("Skipping {:?}: {}", path, e);
        }
    }
    Ok(settings)
}

/// The preset collection and its files
#[derive(Debug)]
pub struct PresetLibrary {
    paths: LibraryPaths,
    settings: SettingsFile<LibrarySettings>,
    presets: BTreeMap<String, SettingsFile<Preset>>,
}

impl PresetLibrary {
    /// Open the library under `paths`, creating whatever is missing.
    ///
    /// The library file is only written when it had to be created, rebuilt or
    /// repaired, so opening a healthy library leaves the data directory as it
    /// was.
    pub fn open(paths: LibraryPaths) -> Result<Self> {
        paths.ensure_directories()?;

        let (mut settings, mut dirty) =
            match SettingsFile::<LibrarySettings>::load(&paths.library_file) {
                Ok(file) => (file, false),
                Err(SettingsError::Read { ref source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    tracing::info!("Creating preset library at {:?}", paths.library_file);
                    (
                        SettingsFile::new(&paths.library_file, scan_presets(&paths)?),
                        true,
                    )
                }
                Err(SettingsError::Parse { source, .. }) => {
                    let moved = settings::backup(&paths.library_file)?;
                    tracing::warn!(
                        "{:?} could not be parsed ({}), rebuilding it from {:?}. The old file was moved to {:?}",
                        paths.library_file,
                        source,
                        paths.presets_dir,
                        moved
                    );
                    (
                        SettingsFile::new(&paths.library_file, scan_presets(&paths)?),
                        true,
                    )
                }
                Err(e) => return Err(e.into()),
            };

        if settings.presets.is_empty() {
            tracing::warn!("Preset library is empty, rescanning {:?}", paths.presets_dir);
            let groups = settings.groups.clone();
            *settings = scan_presets(&paths)?;
            settings.groups = groups;
            dirty = true;
        }

        for fix in settings.repair() {
            tracing::warn!("Preset library: {}", fix);
            dirty = true;
        }

        let mut presets = BTreeMap::new();
        for name in &settings.presets_order {
            let path = &settings.presets[name];
            let mut preset = SettingsFile::open_or_create(path, || Preset::new(name.clone()))?;
            if preset.name != *name {
                tracing::debug!("Preset file {:?} was named '{}'", path, preset.name);
                preset.set_name(name.clone());
                preset.save()?;
            }
            presets.insert(name.clone(), preset);
        }

        if dirty {
            settings.save()?;
        }
        tracing::debug!(
            "Opened {} presets, current: {}",
            presets.len(),
            settings.current_preset
        );

        Ok(Self {
            paths,
            settings,
            presets,
        })
    }

    /// Re-read every file from disk. On any error the current state is kept.
    pub fn reload(&mut self) -> Result<()> {
        let mut settings = SettingsFile::<LibrarySettings>::load(&self.paths.library_file)?;
        for fix in settings.repair() {
            tracing::debug!("Reloaded library needed a fix: {}", fix);
        }
        if settings.presets.is_empty() {
            return Err(PresetError::NothingToCycle.into());
        }

        let mut presets = BTreeMap::new();
        for name in &settings.presets_order {
            let mut preset = SettingsFile::<Preset>::load(&settings.presets[name])?;
            preset.set_name(name.clone());
            presets.insert(name.clone(), preset);
        }

        self.settings = settings;
        self.presets = presets;
        tracing::debug!("Reloaded preset library");
        Ok(())
    }

    pub fn paths(&self) -> &LibraryPaths {
        &self.paths
    }

    pub fn settings(&self) -> &LibrarySettings {
        &self.settings
    }

    /// Presets in display order
    pub fn presets(&self) -> impl Iterator<Item = &Preset> {
        self.settings
            .presets_order
            .iter()
            .filter_map(|name| self.presets.get(name).map(|file| &**file))
    }

    pub fn current_name(&self) -> &str {
        &self.settings.current_preset
    }

    pub fn current(&self) -> std::result::Result<&Preset, PresetError> {
        self.preset(self.current_name())
    }

    pub fn preset(&self, name: &str) -> std::result::Result<&Preset, PresetError> {
        self.presets
            .get(name)
            .map(|file| &**file)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))
    }

    fn preset_path(&self, name: &str) -> PathBuf {
        self.paths.presets_dir.join(format!("{}.json", name))
    }

    /// Apply `f` to the library file and save it
    fn update_settings<R>(
        &mut self,
        f: impl FnOnce(&mut LibrarySettings) -> std::result::Result<R, PresetError>,
    ) -> Result<R> {
        let result = f(&mut *self.settings)?;
        self.settings.save()?;
        Ok(result)
    }

    /// Apply `f` to one preset and save its file
    fn update_preset<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Preset) -> std::result::Result<R, PresetError>,
    ) -> Result<R> {
        let file = self
            .presets
            .get_mut(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;
        let result = f(&mut **file)?;
        file.save()?;
        Ok(result)
    }

    // === Selection ===

    pub fn set_current_preset(&mut self, name: &str) -> Result<()> {
        self.update_settings(|s| s.set_current(name))?;
        tracing::info!("Current preset: {}", name);
        Ok(())
    }

    /// Select the next preset of the active cycle and return its name
    pub fn next_preset(&mut self) -> Result<String> {
        self.step(1)
    }

    /// Select the previous preset of the active cycle and return its name
    pub fn previous_preset(&mut self) -> Result<String> {
        self.step(-1)
    }

    fn step(&mut self, offset: isize) -> Result<String> {
        let name = self.settings.step(offset)?;
        self.set_current_preset(&name)?;
        Ok(name)
    }

    // === Presets ===

    /// Add a preset after `after` (or at the end). An existing file with the
    /// same name is adopted instead of overwritten.
    pub fn add_preset(&mut self, name: &str, after: Option<&str>) -> Result<()> {
        validate_name(name)?;
        if self.settings.contains(name) {
            return Err(PresetError::AlreadyExists(name.to_string()).into());
        }
        if let Some(after) = after {
            self.preset(after)?;
        }

        let path = self.preset_path(name);
        let mut preset = SettingsFile::open_or_create(&path, || Preset::new(name))?;
        if preset.name != name {
            preset.set_name(name);
            preset.save()?;
        }

        self.update_settings(|s| s.insert(name, path, after))?;
        self.presets.insert(name.to_string(), preset);
        tracing::info!("Added preset {}", name);
        Ok(())
    }

    /// Remove a preset and delete its file
    pub fn remove_preset(&mut self, name: &str) -> Result<()> {
        let path = self.update_settings(|s| s.remove(name))?;
        self.presets.remove(name);
        remove_file_if_exists(&path)?;
        tracing::info!("Removed preset {}", name);
        Ok(())
    }

    pub fn move_preset(&mut self, name: &str, after: Option<&str>) -> Result<()> {
        self.update_settings(|s| s.move_preset(name, after))
    }

    /// Rename a preset, moving its file to `<new>.json`
    pub fn rename_preset(&mut self, old: &str, new: &str) -> Result<()> {
        validate_name(new)?;
        let mut data = self.preset(old)?.clone();
        if old == new {
            return Ok(());
        }
        if self.settings.contains(new) {
            return Err(PresetError::AlreadyExists(new.to_string()).into());
        }
        let old_path = self.settings.presets[old].clone();
        let new_path = self.preset_path(new);
        // `attic.json` holding "Attic" renamed to "attic" keeps its own file
        let own_file = same_file(&old_path, &new_path);
        if new_path.exists() && !own_file {
            return Err(PresetError::FileExists(new_path).into());
        }

        data.set_name(new);
        let file = SettingsFile::new(&new_path, data);
        file.save()?;

        if let Err(e) = self.update_settings(|s| s.rename(old, new, new_path.clone())) {
            if !own_file {
                remove_file_if_exists(&new_path)?;
            }
            return Err(e);
        }
        self.presets.remove(old);
        self.presets.insert(new.to_string(), file);
        if !own_file {
            remove_file_if_exists(&old_path)?;
        }

        tracing::info!("Renamed preset {} to {}", old, new);
        Ok(())
    }

    pub fn set_preset_volume(&mut self, name: &str, volume: u8) -> Result<u8> {
        self.update_preset(name, |p| p.set_volume(volume))
    }

    pub fn set_preset_mute(&mut self, name: &str, mute: bool) -> Result<bool> {
        self.update_preset(name, |p| Ok(p.set_mute(mute)))
    }

    /// Flip a preset's mute flag and return the new value
    pub fn toggle_mute(&mut self, name: &str) -> Result<bool> {
        self.update_preset(name, |p| Ok(p.set_mute(!p.mute)))
    }

    // === Sounds ===

    /// Turn a user-supplied sound path into an absolute path of an existing
    /// file. Relative paths are tried against the working directory and then
    /// the sounds directory.
    pub fn resolve_sound_path(&self, path: &Path) -> std::result::Result<PathBuf, PresetError> {
        let cwd = std::env::current_dir().unwrap_or_default();
        self.resolve_sound_path_from(&cwd, path)
    }

    fn resolve_sound_path_from(
        &self,
        cwd: &Path,
        path: &Path,
    ) -> std::result::Result<PathBuf, PresetError> {
        let mut candidates = vec![cwd.join(path)];
        if path.is_relative() {
            candidates.push(self.paths.sounds_dir.join(path));
        }

        candidates
            .iter()
            .filter(|candidate| candidate.is_file())
            .find_map(|candidate| std::fs::canonicalize(candidate).ok())
            .ok_or_else(|| PresetError::SoundFileMissing(path.to_path_buf()))
    }

    /// Add one sound to a preset, muted at the default volume
    pub fn add_sound(&mut self, preset: &str, path: &Path) -> Result<String> {
        let resolved = self.resolve_sound_path(path)?;
        let name = self.update_preset(preset, |p| p.add_sound(resolved, DEFAULT_VOLUME, true))?;
        tracing::info!("Added {} to {}", name, preset);
        Ok(name)
    }

    /// Add several sounds at once. Nothing is added unless all of them can be.
    pub fn add_sounds(&mut self, preset: &str, paths: &[PathBuf]) -> Result<Vec<String>> {
        let resolved = paths
            .iter()
            .map(|path| self.resolve_sound_path(path))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let names = self.update_preset(preset, |p| {
            let mut staged = p.clone();
            let names = resolved
                .into_iter()
                .map(|path| staged.add_sound(path, DEFAULT_VOLUME, true))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            *p = staged;
            Ok(names)
        })?;
        tracing::info!("Added {} sounds to {}", names.len(), preset);
        Ok(names)
    }

    pub fn remove_sound(&mut self, preset: &str, sound: &str) -> Result<()> {
        self.update_preset(preset, |p| p.remove_sound(sound).map(|_| ()))
    }

    pub fn set_sound_volume(&mut self, preset: &str, sound: &str, volume: u8) -> Result<u8> {
        self.update_preset(preset, |p| p.set_sound_volume(sound, volume))
    }

    pub fn set_sound_mute(&mut self, preset: &str, sound: &str, mute: bool) -> Result<bool> {
        self.update_preset(preset, |p| p.set_sound_mute(sound, mute))
    }

    // === Groups ===

    pub fn create_group(&mut self, name: &str, presets: Vec<String>) -> Result<()> {
        validate_name(name)?;
        self.update_settings(|s| s.create_group(name, presets))
    }

    pub fn remove_group(&mut self, name: &str) -> Result<()> {
        self.update_settings(|s| s.groups.remove_group(name).map(|_| ()))
    }

    /// Restrict cycling to a group, or lift the restriction with None
    pub fn set_current_group(&mut self, name: Option<&str>) -> Result<()> {
        self.update_settings(|s| s.groups.set_current_group(name))
    }

    pub fn move_group(&mut self, name: &str, after: Option<&str>) -> Result<()> {
        self.update_settings(|s| s.groups.move_group(name, after))
    }

    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<()> {
        validate_name(new)?;
        self.update_settings(|s| s.groups.rename_group(old, new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MurmurError;
    use tempfile::TempDir;

    fn open() -> (TempDir, PresetLibrary) {
        let dir = tempfile::tempdir().unwrap();
        let library = PresetLibrary::open(LibraryPaths::under(dir.path())).unwrap();
        (dir, library)
    }

    fn names(library: &PresetLibrary) -> Vec<String> {
        library.presets().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Rain").is_ok());
        assert!(validate_name("Rain at night").is_ok());
        for bad in ["", " ", " Rain", "a/b", "a\\b", ".", ".."] {
            assert!(validate_name(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_open_creates_default_preset() {
        let (dir, library) = open();
        assert_eq!(names(&library), ["Preset_0"]);
        assert_eq!(library.current_name(), "Preset_0");
        assert!(dir.path().join("presets/Preset_0.json").exists());
        assert!(dir.path().join("presets_settings.json").exists());
    }

    #[test]
    fn test_open_counts_existing_files_for_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let presets = dir.path().join("presets");
        std::fs::create_dir_all(&presets).unwrap();
        std::fs::write(presets.join("notes.txt"), "hi").unwrap();

        let library = PresetLibrary::open(LibraryPaths::under(dir.path())).unwrap();
        assert_eq!(names(&library), ["Preset_1"]);
    }

    #[test]
    fn test_open_scans_existing_presets_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let presets = dir.path().join("presets");
        std::fs::create_dir_all(&presets).unwrap();
        for (file, name) in [("b.json", "Beach"), ("a.json", "Attic")] {
            SettingsFile::new(presets.join(file), Preset::new(name))
                .save()
                .unwrap();
        }

        let library = PresetLibrary::open(LibraryPaths::under(dir.path())).unwrap();
        assert_eq!(names(&library), ["Attic", "Beach"]);
        assert_eq!(library.current_name(), "Attic");
    }

    #[test]
    fn test_cycle_persists_current() {
        let (dir, mut library) = open();
        library.add_preset("Rain", None).unwrap();
        library.add_preset("Cafe", None).unwrap();

        assert_eq!(library.next_preset().unwrap(), "Rain");
        assert_eq!(library.previous_preset().unwrap(), "Preset_0");
        assert_eq!(library.previous_preset().unwrap(), "Cafe");

        let reopened = PresetLibrary::open(LibraryPaths::under(dir.path())).unwrap();
        assert_eq!(reopened.current_name(), "Cafe");
    }

    #[test]
    fn test_add_preset_after_and_duplicates() {
        let (_dir, mut library) = open();
        library.add_preset("Rain", None).unwrap();
        library.add_preset("Fan", Some("Preset_0")).unwrap();
        assert_eq!(names(&library), ["Preset_0", "Fan", "Rain"]);

        let err = library.add_preset("Rain", None).unwrap_err();
        assert!(matches!(
            err,
            MurmurError::Preset(PresetError::AlreadyExists(_))
        ));
        assert!(library.add_preset("bad/name", None).is_err());
        assert!(library.add_preset("Waves", Some("Nope")).is_err());
    }

    #[test]
    fn test_add_preset_adopts_existing_file() {
        let (dir, mut library) = open();
        let path = dir.path().join("presets/Forest.json");
        let mut stray = Preset::new("Something else");
        stray.set_volume(80).unwrap();
        SettingsFile::new(&path, stray).save().unwrap();

        library.add_preset("Forest", None).unwrap();
        let forest = library.preset("Forest").unwrap();
        assert_eq!(forest.volume, 80);
        assert_eq!(forest.name, "Forest");
    }

    #[test]
    fn test_remove_preset_deletes_file() {
        let (dir, mut library) = open();
        library.add_preset("Rain", None).unwrap();
        library.set_current_preset("Rain").unwrap();

        library.remove_preset("Rain").unwrap();
        assert!(!dir.path().join("presets/Rain.json").exists());
        assert_eq!(library.current_name(), "Preset_0");
        assert!(library.preset("Rain").is_err());

        assert!(matches!(
            library.remove_preset("Preset_0").unwrap_err(),
            MurmurError::Preset(PresetError::LastPreset(_))
        ));
    }

    #[test]
    fn test_rename_preset_moves_file() {
        let (dir, mut library) = open();
        library.add_preset("Rain", None).unwrap();
        library.set_preset_volume("Rain", 70).unwrap();
        library.set_current_preset("Rain").unwrap();

        library.rename_preset("Rain", "Drizzle").unwrap();
        assert_eq!(names(&library), ["Preset_0", "Drizzle"]);
        assert_eq!(library.current_name(), "Drizzle");
        assert_eq!(library.current().unwrap().volume, 70);
        assert!(!dir.path().join("presets/Rain.json").exists());

        let on_disk: Preset = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("presets/Drizzle.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(on_disk.name, "Drizzle");
    }

    #[test]
    fn test_rename_preset_refuses_existing_file() {
        let (dir, mut library) = open();
        std::fs::write(dir.path().join("presets/Taken.json"), "{}").unwrap();
        assert!(matches!(
            library.rename_preset("Preset_0", "Taken").unwrap_err(),
            MurmurError::Preset(PresetError::FileExists(_))
        ));
        assert_eq!(names(&library), ["Preset_0"]);
    }

    #[test]
    fn test_rename_preset_onto_own_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let presets = dir.path().join("presets");
        std::fs::create_dir_all(&presets).unwrap();
        SettingsFile::new(presets.join("attic.json"), Preset::new("Attic"))
            .save()
            .unwrap();

        let mut library = PresetLibrary::open(LibraryPaths::under(dir.path())).unwrap();
        library.rename_preset("Attic", "attic").unwrap();
        assert_eq!(names(&library), ["attic"]);
        assert_eq!(library.settings().presets["attic"], presets.join("attic.json"));

        let on_disk: Preset =
            serde_json::from_str(&std::fs::read_to_string(presets.join("attic.json")).unwrap())
                .unwrap();
        assert_eq!(on_disk.name, "attic");
    }

    #[test]
    fn test_open_leaves_healthy_library_untouched() {
        let (dir, library) = open();
        drop(library);

        // Store both files compactly so any rewrite would show
        let library_file = dir.path().join("presets_settings.json");
        let preset_file = dir.path().join("presets/Preset_0.json");
        for path in [&library_file, &preset_file] {
            let value: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            std::fs::write(path, serde_json::to_string(&value).unwrap()).unwrap();
        }
        let before = (
            std::fs::read_to_string(&library_file).unwrap(),
            std::fs::read_to_string(&preset_file).unwrap(),
        );
        let modified = std::fs::metadata(&library_file).unwrap().modified().unwrap();

        PresetLibrary::open(LibraryPaths::under(dir.path())).unwrap();
        assert_eq!(
            before,
            (
                std::fs::read_to_string(&library_file).unwrap(),
                std::fs::read_to_string(&preset_file).unwrap(),
            )
        );
        assert_eq!(
            std::fs::metadata(&library_file).unwrap().modified().unwrap(),
            modified
        );
    }

    #[test]
    fn test_open_backs_up_unreadable_preset() {
        let (dir, mut library) = open();
        library.add_preset("Rain", None).unwrap();
        drop(library);

        let rain = dir.path().join("presets/Rain.json");
        let hand_edited = r#"{"name": "Rain", "volume": 72.5, "mute": false, "sounds": {}}"#;
        std::fs::write(&rain, hand_edited).unwrap();

        let library = PresetLibrary::open(LibraryPaths::under(dir.path())).unwrap();
        assert_eq!(library.preset("Rain").unwrap().volume, DEFAULT_VOLUME);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("presets/Rain.json.bak")).unwrap(),
            hand_edited
        );
        // The backup is not picked up as a preset
        assert_eq!(names(&library), ["Preset_0", "Rain"]);
    }

    #[test]
    fn test_toggle_mute() {
        let (_dir, mut library) = open();
        assert!(library.current().unwrap().mute);
        assert!(!library.toggle_mute("Preset_0").unwrap());
        assert!(library.toggle_mute("Preset_0").unwrap());
    }

    #[test]
    fn test_sound_paths_resolve_against_sounds_dir() {
        let (dir, mut library) = open();
        let sound = dir.path().join("sounds/rain.ogg");
        std::fs::write(&sound, b"OggS").unwrap();

        let name = library
            .add_sound("Preset_0", Path::new("rain.ogg"))
            .unwrap();
        assert_eq!(name, "rain.ogg");

        let stored = &library.current().unwrap().sounds["rain.ogg"];
        assert!(stored.path.is_absolute());
        assert!(stored.mute);
        assert_eq!(stored.volume, DEFAULT_VOLUME);

        assert!(matches!(
            library
                .add_sound("Preset_0", Path::new("missing.ogg"))
                .unwrap_err(),
            MurmurError::Preset(PresetError::SoundFileMissing(_))
        ));
    }

    #[test]
    fn test_sound_paths_prefer_working_directory() {
        let (dir, library) = open();
        let cwd = tempfile::tempdir().unwrap();
        std::fs::write(cwd.path().join("rain.ogg"), b"OggS").unwrap();
        std::fs::write(dir.path().join("sounds/rain.ogg"), b"OggS").unwrap();
        std::fs::write(dir.path().join("sounds/fan.ogg"), b"OggS").unwrap();

        let rain = library
            .resolve_sound_path_from(cwd.path(), Path::new("rain.ogg"))
            .unwrap();
        assert_eq!(rain, cwd.path().join("rain.ogg").canonicalize().unwrap());

        // Falls back to the sounds directory
        let fan = library
            .resolve_sound_path_from(cwd.path(), Path::new("fan.ogg"))
            .unwrap();
        assert_eq!(fan, dir.path().join("sounds/fan.ogg").canonicalize().unwrap());
    }

    #[test]
    fn test_add_sounds_is_all_or_nothing() {
        let (dir, mut library) = open();
        let a = dir.path().join("sounds/a.wav");
        let b = dir.path().join("sounds/b.wav");
        std::fs::write(&a, b"RIFF").unwrap();
        std::fs::write(&b, b"RIFF").unwrap();
        library.add_sound("Preset_0", &a).unwrap();

        // b.wav is fine but a.wav is already there
        assert!(library.add_sounds("Preset_0", &[b.clone(), a]).is_err());
        assert_eq!(library.current().unwrap().sounds.len(), 1);

        let added = library.add_sounds("Preset_0", &[b]).unwrap();
        assert_eq!(added, ["b.wav"]);
    }

    #[test]
    fn test_reload_picks_up_external_edits() {
        let (dir, mut library) = open();
        let paths = LibraryPaths::under(dir.path());

        let mut other = PresetLibrary::open(paths).unwrap();
        other.add_preset("Rain", None).unwrap();
        other.set_current_preset("Rain").unwrap();

        library.reload().unwrap();
        assert_eq!(library.current_name(), "Rain");
        assert_eq!(names(&library), ["Preset_0", "Rain"]);
    }

    #[test]
    fn test_reload_failure_keeps_state() {
        let (dir, mut library) = open();
        std::fs::write(dir.path().join("presets_settings.json"), "{ broken").unwrap();
        assert!(library.reload().is_err());
        assert_eq!(names(&library), ["Preset_0"]);
    }

    #[test]
    fn test_groups_round_trip_through_disk() {
        let (dir, mut library) = open();
        library.add_preset("Rain", None).unwrap();
        library.add_preset("Cafe", None).unwrap();
        library
            .create_group("Focus", vec!["Cafe".into(), "Rain".into()])
            .unwrap();
        library.set_current_group(Some("Focus")).unwrap();
        library.rename_group("Focus", "Work").unwrap();

        let reopened = PresetLibrary::open(LibraryPaths::under(dir.path())).unwrap();
        let groups = &reopened.settings().groups;
        assert_eq!(groups.current_group.as_deref(), Some("Work"));
        assert_eq!(reopened.settings().active_cycle(), ["Rain", "Cafe"]);
    }
}
