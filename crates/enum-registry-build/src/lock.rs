//! enums.lock.toml: pinned member values.
//!
//! Values are assigned once and never move. Reordering members in
//! enums.toml is harmless; removing one is a breaking change the build
//! refuses unless `on_remove = "warn"`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::toml_parser::{EnumsConfig, FamilyConfig, FamilyKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    /// RFC 3339 timestamp of the last write
    pub generated_at: String,
    #[serde(default)]
    pub families: Vec<LockedFamily>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedFamily {
    pub name: String,
    pub kind: FamilyKind,
    pub repr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub members: Vec<LockedMember>,
}

/// One pinned member.
///
/// `slot` is the ordinal for enums and the bit index for bitflags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedMember {
    pub name: String,
    pub slot: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Difference between a lock file and the current config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockDiff {
    /// (family, member) present in config but not in lock
    pub added: Vec<(String, String)>,
    /// (family, member) active in lock but missing from config
    pub removed: Vec<(String, String)>,
    /// (family, member) deprecated in lock and back in config
    pub restored: Vec<(String, String)>,
}

impl LockDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.restored.is_empty()
    }
}

impl LockedFamily {
    fn new(family: &FamilyConfig) -> Self {
        Self {
            name: family.name.clone(),
            kind: family.kind,
            repr: family.repr.clone(),
            alias: family.alias.clone(),
            members: Vec::new(),
        }
    }

    pub fn get(&self, member: &str) -> Option<&LockedMember> {
        self.members.iter().find(|m| m.name == member)
    }

    /// The next unassigned slot: one past the largest ordinal, or the
    /// lowest unused bit.
    pub fn next_slot(&self) -> u64 {
        match self.kind {
            FamilyKind::Enum => self.members.iter().map(|m| m.slot).max().unwrap_or(0) + 1,
            FamilyKind::Bitflags => {
                let used: HashSet<u64> = self.members.iter().map(|m| m.slot).collect();
                (0..).find(|bit| !used.contains(bit)).unwrap_or_default()
            }
        }
    }

    /// Pin `member` to the next free slot. Existing members are left alone.
    pub fn add_member(&mut self, member: &str) -> u64 {
        if let Some(existing) = self.get(member) {
            return existing.slot;
        }
        let slot = self.next_slot();
        self.members.push(LockedMember {
            name: member.to_string(),
            slot,
            deprecated: false,
        });
        slot
    }

    /// Members in slot order.
    pub fn sorted_members(&self) -> Vec<&LockedMember> {
        let mut members: Vec<_> = self.members.iter().collect();
        members.sort_by_key(|m| m.slot);
        members
    }
}

impl LockFile {
    /// Pin every member of `config` in declaration order.
    pub fn from_config(config: &EnumsConfig) -> Self {
        let mut lock = Self {
            generated_at: timestamp(),
            families: Vec::new(),
        };
        lock.sync_families(config);
        for family in config.families() {
            for member in &family.members {
                lock.add_member(family, member);
            }
        }
        lock
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LockFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LockFileError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| LockFileError::Parse(e.to_string()))
    }

    /// Write the lock with a fresh timestamp.
    pub fn write_to_file(&mut self, path: impl AsRef<Path>) -> Result<(), LockFileError> {
        let path = path.as_ref();
        self.generated_at = timestamp();

        let body =
            toml::to_string_pretty(self).map_err(|e| LockFileError::Serialize(e.to_string()))?;
        let content = format!(
            "# @generated by enum-registry-build. Do not edit by hand.\n\
             # Pins member values; delete to reassign them (BREAKING CHANGE).\n\n{}",
            body
        );

        std::fs::write(path, content).map_err(|e| LockFileError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn family(&self, name: &str) -> Option<&LockedFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// Look up a member by family and name.
    pub fn get(&self, family: &str, member: &str) -> Option<&LockedMember> {
        self.family(family)?.get(member)
    }

    /// (family, member) pairs kept only for compatibility.
    pub fn deprecated_members(&self) -> impl Iterator<Item = (&str, &LockedMember)> {
        self.members().filter(|(_, m)| m.deprecated)
    }

    /// (family, member) pairs still declared in enums.toml.
    pub fn active_members(&self) -> impl Iterator<Item = (&str, &LockedMember)> {
        self.members().filter(|(_, m)| !m.deprecated)
    }

    fn members(&self) -> impl Iterator<Item = (&str, &LockedMember)> {
        self.families
            .iter()
            .flat_map(|f| f.members.iter().map(move |m| (f.name.as_str(), m)))
    }

    /// Create or refresh the entry for every family in `config`.
    pub fn sync_families(&mut self, config: &EnumsConfig) {
        for family in config.families() {
            self.family_mut(family);
        }
    }

    fn family_mut(&mut self, family: &FamilyConfig) -> &mut LockedFamily {
        let index = match self.families.iter().position(|f| f.name == family.name) {
            Some(index) => index,
            None => {
                self.families.push(LockedFamily::new(family));
                self.families.len() - 1
            }
        };
        let locked = &mut self.families[index];
        // Storage and alias are not pinned; the lock follows the config.
        locked.repr.clone_from(&family.repr);
        locked.alias.clone_from(&family.alias);
        locked
    }

    /// Pin a member of `family`, creating the family entry if needed.
    pub fn add_member(&mut self, family: &FamilyConfig, member: &str) -> u64 {
        self.family_mut(family).add_member(member)
    }

    /// Keep a removed member so its accessor can be generated as deprecated.
    pub fn mark_deprecated(&mut self, family: &str, member: &str) {
        self.set_deprecated(family, member, true);
    }

    /// Clear the deprecation of a member that is back in the config.
    pub fn mark_active(&mut self, family: &str, member: &str) {
        self.set_deprecated(family, member, false);
    }

    fn set_deprecated(&mut self, family: &str, member: &str, deprecated: bool) {
        if let Some(entry) = self
            .families
            .iter_mut()
            .find(|f| f.name == family)
            .and_then(|f| f.members.iter_mut().find(|m| m.name == member))
        {
            entry.deprecated = deprecated;
        }
    }

    /// Compare against the current config.
    pub fn diff(&self, config: &EnumsConfig) -> LockDiff {
        let mut diff = LockDiff::default();

        for family in config.families() {
            let locked = self.family(&family.name);
            for member in &family.members {
                match locked.and_then(|f| f.get(member)) {
                    None => diff.added.push((family.name.clone(), member.clone())),
                    Some(entry) if entry.deprecated => {
                        diff.restored.push((family.name.clone(), member.clone()))
                    }
                    Some(_) => {}
                }
            }
        }

        for locked in &self.families {
            let current: HashSet<&str> = config
                .family(&locked.name)
                .map(|f| f.members.iter().map(String::as_str).collect())
                .unwrap_or_default();
            for member in &locked.members {
                if !member.deprecated && !current.contains(member.name.as_str()) {
                    diff.removed.push((locked.name.clone(), member.name.clone()));
                }
            }
        }

        diff
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Errors reading or writing the lock file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockFileError {
    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
}
