//! The preset library file: which presets exist, their order, and which
//! one is playing.
//!
//! Everything here is pure bookkeeping over names and paths. Creating,
//! copying and deleting the preset files themselves is done by
//! [`crate::library::PresetLibrary`].

use super::groups::GroupSettings;
use crate::error::PresetError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Contents of `presets_settings.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySettings {
    /// Preset name -> preset file
    #[serde(default)]
    pub presets: BTreeMap<String, PathBuf>,

    /// Cycling and display order
    #[serde(default)]
    pub presets_order: Vec<String>,

    #[serde(default)]
    pub current_preset: String,

    #[serde(flatten)]
    pub groups: GroupSettings,
}

/// Move `item` to directly after `after` (or to the front when None).
/// Unknown items are left alone.
pub(crate) fn move_after(order: &mut Vec<String>, item: &str, after: Option<&str>) {
    if after == Some(item) {
        return;
    }
    let Some(from) = order.iter().position(|s| s == item) else {
        return;
    };
    let entry = order.remove(from);
    let to = match after {
        Some(after) => match order.iter().position(|s| s == after) {
            Some(idx) => idx + 1,
            None => {
                order.insert(from, entry);
                return;
            }
        },
        None => 0,
    };
    order.insert(to, entry);
}

impl LibrarySettings {
    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    fn require(&self, name: &str) -> Result<(), PresetError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(PresetError::NotFound(name.to_string()))
        }
    }

    /// Presets that next/previous walk through, in order
    pub fn active_cycle(&self) -> Vec<&str> {
        match self.groups.current_members() {
            Some(members) => self
                .presets_order
                .iter()
                .filter(|name| members.contains(*name))
                .map(String::as_str)
                .collect(),
            None => self.presets_order.iter().map(String::as_str).collect(),
        }
    }

    /// Name of the preset `offset` steps away from the current one in the
    /// active cycle, wrapping around at both ends. When the current preset
    /// is outside the cycle the first entry is returned.
    pub fn step(&self, offset: isize) -> Result<String, PresetError> {
        let cycle = self.active_cycle();
        if cycle.is_empty() {
            return Err(PresetError::NothingToCycle);
        }

        let Some(index) = cycle.iter().position(|n| *n == self.current_preset) else {
            return Ok(cycle[0].to_string());
        };

        let len = cycle.len() as isize;
        let target = (index as isize + offset).rem_euclid(len) as usize;
        Ok(cycle[target].to_string())
    }

    pub fn set_current(&mut self, name: &str) -> Result<(), PresetError> {
        self.require(name)?;
        self.current_preset = name.to_string();
        Ok(())
    }

    /// Register a preset file, inserting it after `after` or at the end
    pub fn insert(
        &mut self,
        name: &str,
        path: PathBuf,
        after: Option<&str>,
    ) -> Result<(), PresetError> {
        if self.contains(name) {
            return Err(PresetError::AlreadyExists(name.to_string()));
        }
        let index = match after {
            Some(after) => {
                let idx = self
                    .presets_order
                    .iter()
                    .position(|n| n == after)
                    .ok_or_else(|| PresetError::NotFound(after.to_string()))?;
                idx + 1
            }
            None => self.presets_order.len(),
        };

        self.presets.insert(name.to_string(), path);
        self.presets_order.insert(index, name.to_string());
        if self.current_preset.is_empty() {
            self.current_preset = name.to_string();
        }
        Ok(())
    }

    /// Unregister a preset and return its file path.
    ///
    /// The last remaining preset cannot be removed. Removing the current
    /// preset selects the first remaining one.
    pub fn remove(&mut self, name: &str) -> Result<PathBuf, PresetError> {
        self.require(name)?;
        if self.presets.len() == 1 {
            return Err(PresetError::LastPreset(name.to_string()));
        }

        let path = self
            .presets
            .remove(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;
        self.presets_order.retain(|n| n != name);
        self.groups.forget_preset(name);

        if self.current_preset == name {
            self.current_preset = self.presets_order.first().cloned().unwrap_or_default();
        }
        Ok(path)
    }

    /// Move a preset right after `after`, or to the front when None
    pub fn move_preset(&mut self, name: &str, after: Option<&str>) -> Result<(), PresetError> {
        self.require(name)?;
        if let Some(after) = after {
            self.require(after)?;
        }
        move_after(&mut self.presets_order, name, after);
        Ok(())
    }

    /// Point `old`'s entry at `new` / `new_path`, keeping its position
    pub fn rename(&mut self, old: &str, new: &str, new_path: PathBuf) -> Result<(), PresetError> {
        self.require(old)?;
        if self.contains(new) {
            return Err(PresetError::AlreadyExists(new.to_string()));
        }

        self.presets.remove(old);
        self.presets.insert(new.to_string(), new_path);
        for entry in self.presets_order.iter_mut().filter(|n| n.as_str() == old) {
            *entry = new.to_string();
        }
        if self.current_preset == old {
            self.current_preset = new.to_string();
        }
        self.groups.rename_preset(old, new);
        Ok(())
    }

    /// Create a group after checking that every member exists
    pub fn create_group(&mut self, name: &str, presets: Vec<String>) -> Result<(), PresetError> {
        if let Some(missing) = presets.iter().find(|p| !self.contains(p)) {
            return Err(PresetError::NotFound(missing.clone()));
        }
        self.groups.create_group(name, presets, true)
    }

    /// Bring the file back to a consistent state. Returns a description of
    /// each fix so callers can log them.
    pub fn repair(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();

        let presets = &self.presets;
        let before = self.presets_order.len();
        let mut seen = Vec::with_capacity(before);
        self.presets_order.retain(|name| {
            let keep = presets.contains_key(name) && !seen.contains(name);
            if keep {
                seen.push(name.clone());
            }
            keep
        });
        if self.presets_order.len() != before {
            fixes.push(format!(
                "dropped {} unknown or duplicate entries from presets_order",
                before - self.presets_order.len()
            ));
        }

        for name in self.presets.keys() {
            if !self.presets_order.contains(name) {
                fixes.push(format!("appended '{}' to presets_order", name));
                self.presets_order.push(name.clone());
            }
        }

        if !self.contains(&self.current_preset) {
            let fallback = self.presets_order.first().cloned().unwrap_or_default();
            fixes.push(format!(
                "current preset '{}' is unknown, selecting '{}'",
                self.current_preset, fallback
            ));
            self.current_preset = fallback;
        }

        let presets = &self.presets;
        for (group, members) in self.groups.presets_groups.iter_mut() {
            let before = members.len();
            members.retain(|p| presets.contains_key(p));
            if members.len() != before {
                fixes.push(format!("removed unknown presets from group '{}'", group));
            }
        }

        let groups = &self.groups.presets_groups;
        self.groups.groups_order.retain(|g| groups.contains_key(g));
        for group in self.groups.presets_groups.keys() {
            if !self.groups.groups_order.contains(group) {
                self.groups.groups_order.push(group.clone());
            }
        }
        let stale_group = self
            .groups
            .current_group
            .clone()
            .filter(|g| !self.groups.presets_groups.contains_key(g));
        if let Some(group) = stale_group {
            fixes.push(format!("current group '{}' is unknown, clearing it", group));
            self.groups.current_group = None;
        }

        fixes
    }
}
