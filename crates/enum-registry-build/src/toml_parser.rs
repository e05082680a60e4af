//! TOML configuration parser for enums.toml.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Storage types a generated family may use.
const STORAGE_TYPES: &[&str] = &["u8", "u16", "u32", "u64"];

/// Behavior when a member is removed from config but exists in lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnRemove {
    /// Fail the build (default, safest)
    #[default]
    Error,
    /// Keep the member as a #[deprecated] accessor
    Warn,
}

/// Which macro a family is generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyKind {
    /// `enumeration!`, ordinals counted from 1
    Enum,
    /// `bitflag_enum!`, one bit per member counted from bit 0
    Bitflags,
}

/// Parsed enums.toml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumsConfig {
    pub on_remove: OnRemove,
    families: Vec<FamilyConfig>,
}

/// One `[[enums]]` or `[[bitflags]]` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyConfig {
    pub kind: FamilyKind,
    /// Definition struct name (e.g. "Permissions")
    pub name: String,
    /// Bitflag alias (e.g. "Permission"); unused for enums
    pub alias: Option<String>,
    /// Storage type
    pub repr: String,
    /// Bitflag member pinned to 0
    pub zero: Option<String>,
    pub separator: Option<String>,
    pub case_insensitive: Option<bool>,
    /// Member names in declaration order
    pub members: Vec<String>,
}

impl FamilyConfig {
    pub fn capacity(&self) -> u64 {
        capacity(self.kind, &self.repr)
    }
}

/// Number of bits (bitflags) or the largest ordinal (enums) `repr` holds.
pub fn capacity(kind: FamilyKind, repr: &str) -> u64 {
    let bits: u32 = match repr {
        "u8" => 8,
        "u16" => 16,
        "u32" => 32,
        _ => 64,
    };
    match kind {
        FamilyKind::Bitflags => u64::from(bits),
        FamilyKind::Enum => u64::MAX >> (64 - bits),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnumsConfig {
    #[serde(default)]
    on_remove: OnRemove,
    #[serde(default)]
    enums: Vec<RawEnum>,
    #[serde(default)]
    bitflags: Vec<RawBitflags>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnum {
    name: String,
    #[serde(default = "default_repr")]
    repr: String,
    separator: Option<String>,
    case_insensitive: Option<bool>,
    members: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBitflags {
    name: String,
    alias: String,
    #[serde(default = "default_repr")]
    repr: String,
    zero: Option<String>,
    separator: Option<String>,
    case_insensitive: Option<bool>,
    members: Vec<String>,
}

fn default_repr() -> String {
    "u32".to_string()
}

impl EnumsConfig {
    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_str(&content)
    }

    /// Parse from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigFileError> {
        let raw: RawEnumsConfig =
            toml::from_str(content).map_err(|e| ConfigFileError::Parse(e.to_string()))?;

        let enums = raw.enums.into_iter().map(|e| FamilyConfig {
            kind: FamilyKind::Enum,
            name: e.name,
            alias: None,
            repr: e.repr,
            zero: None,
            separator: e.separator,
            case_insensitive: e.case_insensitive,
            members: e.members,
        });
        let bitflags = raw.bitflags.into_iter().map(|b| FamilyConfig {
            kind: FamilyKind::Bitflags,
            name: b.name,
            alias: Some(b.alias),
            repr: b.repr,
            zero: b.zero,
            separator: b.separator,
            case_insensitive: b.case_insensitive,
            members: b.members,
        });
        let families: Vec<FamilyConfig> = enums.chain(bitflags).collect();

        Self::validate(&families)?;

        Ok(Self {
            on_remove: raw.on_remove,
            families,
        })
    }

    /// All families, enums first, each group in file order.
    pub fn families(&self) -> impl Iterator<Item = &FamilyConfig> {
        self.families.iter()
    }

    pub fn family(&self, name: &str) -> Option<&FamilyConfig> {
        self.families.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    fn validate(families: &[FamilyConfig]) -> Result<(), ConfigFileError> {
        let mut type_names: HashMap<&str, &str> = HashMap::new();

        for family in families {
            validate_identifier(&family.name, &family.name)?;
            let mut declared = vec![family.name.as_str()];
            if let Some(alias) = &family.alias {
                validate_identifier(&family.name, alias)?;
                declared.push(alias.as_str());
            }
            for type_name in declared {
                if type_names.insert(type_name, family.name.as_str()).is_some() {
                    return Err(ConfigFileError::Validation(format!(
                        "type name '{}' is declared more than once",
                        type_name
                    )));
                }
            }

            if !STORAGE_TYPES.contains(&family.repr.as_str()) {
                return Err(ConfigFileError::Validation(format!(
                    "family '{}': repr '{}' must be one of {}",
                    family.name,
                    family.repr,
                    STORAGE_TYPES.join(", ")
                )));
            }

            if let Some(separator) = &family.separator
                && separator.trim().is_empty()
            {
                return Err(ConfigFileError::Validation(format!(
                    "family '{}': separator cannot be empty",
                    family.name
                )));
            }

            // Names are parse keys once lower-cased.
            let mut seen: HashMap<String, &str> = HashMap::new();
            for member in family.zero.iter().chain(&family.members) {
                validate_identifier(&family.name, member)?;
                if let Some(existing) = seen.insert(member.to_lowercase(), member.as_str()) {
                    return Err(ConfigFileError::Validation(format!(
                        "family '{}': member '{}' collides with '{}'",
                        family.name, member, existing
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Check valid identifier (starts with letter/underscore, contains alphanumeric/_)
fn validate_identifier(family: &str, ident: &str) -> Result<(), ConfigFileError> {
    let mut chars = ident.chars();
    let Some(first) = chars.next() else {
        return Err(ConfigFileError::Validation(format!(
            "family '{}': empty name not allowed",
            family
        )));
    };
    if !first.is_alphabetic() && first != '_' {
        return Err(ConfigFileError::Validation(format!(
            "family '{}': name '{}' must start with letter or underscore",
            family, ident
        )));
    }
    for c in chars {
        if !c.is_alphanumeric() && c != '_' {
            return Err(ConfigFileError::Validation(format!(
                "family '{}': name '{}' contains invalid character '{}'",
                family, ident, c
            )));
        }
    }
    Ok(())
}

/// Errors during config parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_config() {
        let toml = r#"
[[enums]]
name = "Colors"
members = ["Red", "Green", "Blue"]

[[bitflags]]
name = "Permissions"
alias = "Permission"
repr = "u16"
zero = "None"
separator = "|"
members = ["Read", "Write"]
"#;
        let config = EnumsConfig::from_str(toml).unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(config.on_remove, OnRemove::Error);

        let colors = config.family("Colors").unwrap();
        assert_eq!(colors.kind, FamilyKind::Enum);
        assert_eq!(colors.repr, "u32");
        assert_eq!(colors.members, vec!["Red", "Green", "Blue"]);

        let perms = config.family("Permissions").unwrap();
        assert_eq!(perms.kind, FamilyKind::Bitflags);
        assert_eq!(perms.alias.as_deref(), Some("Permission"));
        assert_eq!(perms.zero.as_deref(), Some("None"));
        assert_eq!(perms.separator.as_deref(), Some("|"));
        assert_eq!(perms.capacity(), 16);
    }

    #[test]
    fn empty_config_is_valid() {
        let config = EnumsConfig::from_str("").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn enum_capacity_is_max_ordinal() {
        let config = EnumsConfig::from_str(
            r#"
[[enums]]
name = "Small"
repr = "u8"
members = ["A"]
"#,
        )
        .unwrap();
        assert_eq!(config.family("Small").unwrap().capacity(), 255);
    }

    #[test]
    fn rejects_invalid_identifiers() {
        let cases = ["1Red", "Red-Green", "Red Green", ""];

        for case in cases {
            let toml = format!(
                r#"
[[enums]]
name = "Colors"
members = ["{}"]
"#,
                case
            );
            assert!(
                EnumsConfig::from_str(&toml).is_err(),
                "Should reject: {}",
                case
            );
        }
    }

    #[test]
    fn rejects_case_colliding_members() {
        let toml = r#"
[[bitflags]]
name = "Flags"
alias = "Flag"
members = ["Foo", "FOO"]
"#;
        let err = EnumsConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn zero_member_counts_toward_collisions() {
        let toml = r#"
[[bitflags]]
name = "Flags"
alias = "Flag"
zero = "None"
members = ["none"]
"#;
        assert!(EnumsConfig::from_str(toml).is_err());
    }

    #[test]
    fn rejects_signed_or_unknown_repr() {
        for repr in ["i32", "usize", "u128"] {
            let toml = format!(
                r#"
[[enums]]
name = "Colors"
repr = "{}"
members = ["Red"]
"#,
                repr
            );
            assert!(EnumsConfig::from_str(&toml).is_err(), "Should reject: {}", repr);
        }
    }

    #[test]
    fn rejects_blank_separator() {
        let toml = r#"
[[bitflags]]
name = "Flags"
alias = "Flag"
separator = " "
members = ["A"]
"#;
        let err = EnumsConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("separator"));
    }

    #[test]
    fn rejects_duplicate_type_names() {
        let toml = r#"
[[enums]]
name = "Flag"
members = ["A"]

[[bitflags]]
name = "Flags"
alias = "Flag"
members = ["A"]
"#;
        let err = EnumsConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn on_remove_warn() {
        let toml = r#"
on_remove = "warn"
"#;
        let config = EnumsConfig::from_str(toml).unwrap();
        assert_eq!(config.on_remove, OnRemove::Warn);
    }

    #[test]
    fn on_remove_invalid_value() {
        let toml = r#"
on_remove = "invalid"
"#;
        let err = EnumsConfig::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EnumsConfig::from_file("/nonexistent/enums.toml").unwrap_err();
        assert!(matches!(err, ConfigFileError::Io { .. }));
    }
}
