//! JSON settings files
//!
//! Every piece of user data (each preset, the preset library and the hotkey
//! bindings) lives in its own JSON file. [`SettingsFile`] pairs the parsed
//! value with the path it came from and knows how to write it back.
//!
//! Two loading modes exist:
//! - [`SettingsFile::open_or_create`] for startup: a missing or corrupt file
//!   is replaced by defaults and written immediately. A corrupt file is moved
//!   to `<name>.bak` first. A file that parses is left untouched.
//! - [`SettingsFile::load`] for live reloads: any failure is reported and the
//!   caller keeps what it already has.

pub mod groups;
pub mod hotkeys;
pub mod library;
pub mod preset;

use crate::error::SettingsError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// A value persisted as pretty-printed JSON at a fixed path
#[derive(Debug, Clone)]
pub struct SettingsFile<T> {
    path: PathBuf,
    data: T,
}

impl<T> SettingsFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Load `path`, falling back to `create()` when the file is missing or
    /// unparsable. Only a newly created value is written to disk.
    pub fn open_or_create(
        path: impl Into<PathBuf>,
        create: impl FnOnce() -> T,
    ) -> Result<Self, SettingsError> {
        let path = path.into();
        let data = match read_json(&path) {
            Ok(data) => return Ok(Self { path, data }),
            Err(SettingsError::Read { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!("{:?} not found, creating defaults", path);
                create()
            }
            Err(SettingsError::Parse { source, .. }) => {
                let moved = backup(&path)?;
                tracing::warn!(
                    "{:?} could not be parsed ({}), recreating it. The old file was moved to {:?}",
                    path,
                    source,
                    moved
                );
                create()
            }
            Err(e) => return Err(e),
        };

        let file = Self { path, data };
        file.save()?;
        Ok(file)
    }

    /// Strictly load `path`
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let data = read_json(&path)?;
        Ok(Self { path, data })
    }

    /// Wrap a value that has not been written yet
    pub fn new(path: impl Into<PathBuf>, data: T) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Write the value to its path.
    ///
    /// The JSON goes to a temporary file in the same directory which is then
    /// renamed over the target.
    pub fn save(&self) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(&self.data)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        tracing::trace!("Saved {:?}", self.path);
        Ok(())
    }
}

impl<T> SettingsFile<T> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T> Deref for SettingsFile<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for SettingsFile<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

/// Move an unusable settings file aside to `<file name>.bak`, replacing any
/// older backup, and return the backup path
pub fn backup(path: &Path) -> Result<PathBuf, SettingsError> {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    let backup = path.with_file_name(name);

    std::fs::rename(path, &backup).map_err(|source| SettingsError::Write {
        path: backup.clone(),
        source,
    })?;
    Ok(backup)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SettingsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
