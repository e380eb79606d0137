//! Preset groups
//!
//! A group is a named subset of presets. Selecting a group restricts
//! hotkey cycling to its members; with no group selected every preset is
//! in the cycle.

use super::library::move_after;
use crate::error::PresetError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    /// Group name -> member preset names
    #[serde(default)]
    pub presets_groups: BTreeMap<String, Vec<String>>,

    /// Display order of groups
    #[serde(default)]
    pub groups_order: Vec<String>,

    /// Group restricting the cycle, if any
    #[serde(default)]
    pub current_group: Option<String>,
}

impl GroupSettings {
    pub fn contains(&self, group: &str) -> bool {
        self.presets_groups.contains_key(group)
    }

    pub fn members(&self, group: &str) -> Option<&[String]> {
        self.presets_groups.get(group).map(Vec::as_slice)
    }

    /// Members of the selected group, or None when no group is selected
    pub fn current_members(&self) -> Option<&[String]> {
        self.current_group
            .as_deref()
            .and_then(|group| self.members(group))
    }

    /// Add a group. Callers validate that the presets exist.
    pub fn create_group(
        &mut self,
        name: &str,
        presets: Vec<String>,
        to_order: bool,
    ) -> Result<(), PresetError> {
        if self.contains(name) {
            return Err(PresetError::GroupExists(name.to_string()));
        }

        let mut members: Vec<String> = Vec::with_capacity(presets.len());
        for preset in presets {
            if !members.contains(&preset) {
                members.push(preset);
            }
        }

        self.presets_groups.insert(name.to_string(), members);
        if to_order {
            self.groups_order.push(name.to_string());
        }
        Ok(())
    }

    pub fn remove_group(&mut self, name: &str) -> Result<Vec<String>, PresetError> {
        let members = self
            .presets_groups
            .remove(name)
            .ok_or_else(|| PresetError::GroupNotFound(name.to_string()))?;
        self.groups_order.retain(|g| g != name);
        if self.current_group.as_deref() == Some(name) {
            self.current_group = None;
        }
        Ok(members)
    }

    pub fn set_current_group(&mut self, name: Option<&str>) -> Result<(), PresetError> {
        if let Some(name) = name {
            if !self.contains(name) {
                return Err(PresetError::GroupNotFound(name.to_string()));
            }
        }
        self.current_group = name.map(str::to_string);
        Ok(())
    }

    /// Move `name` right after `after`, or to the front when `after` is None
    pub fn move_group(&mut self, name: &str, after: Option<&str>) -> Result<(), PresetError> {
        if !self.contains(name) {
            return Err(PresetError::GroupNotFound(name.to_string()));
        }
        if let Some(after) = after {
            if !self.contains(after) {
                return Err(PresetError::GroupNotFound(after.to_string()));
            }
        }
        if !self.groups_order.iter().any(|g| g == name) {
            self.groups_order.push(name.to_string());
        }
        move_after(&mut self.groups_order, name, after);
        Ok(())
    }

    /// Rename a group in place, keeping its position and selection
    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<(), PresetError> {
        if !self.contains(old) {
            return Err(PresetError::GroupNotFound(old.to_string()));
        }
        if self.contains(new) {
            return Err(PresetError::GroupExists(new.to_string()));
        }

        if let Some(members) = self.presets_groups.remove(old) {
            self.presets_groups.insert(new.to_string(), members);
        }
        for entry in self.groups_order.iter_mut().filter(|g| g.as_str() == old) {
            *entry = new.to_string();
        }
        if self.current_group.as_deref() == Some(old) {
            self.current_group = Some(new.to_string());
        }
        Ok(())
    }

    /// Drop a removed preset from every group
    pub fn forget_preset(&mut self, preset: &str) {
        for members in self.presets_groups.values_mut() {
            members.retain(|p| p != preset);
        }
    }

    /// Follow a preset rename in every group
    pub fn rename_preset(&mut self, old: &str, new: &str) {
        for members in self.presets_groups.values_mut() {
            for member in members.iter_mut().filter(|p| p.as_str() == old) {
                *member = new.to_string();
            }
        }
    }
}
