//! Rust code generation from a config and its lock file.

use std::fmt::Write as _;

use crate::GenerateError;
use crate::lock::{LockFile, LockedFamily};
use crate::toml_parser::{capacity, EnumsConfig, FamilyConfig, FamilyKind};

const DEPRECATED_NOTE: &str = "removed from enums.toml";

/// Generate code for a fresh config (no lock history).
pub fn generate_code(config: &EnumsConfig) -> Result<String, GenerateError> {
    generate_code_from_lock(config, &LockFile::from_config(config))
}

/// Generate one macro invocation per family, members in locked slot order.
///
/// Families present only in the lock (removed under `on_remove = "warn"`)
/// are generated from the lock alone: every member deprecated, no format
/// overrides and no zero member.
pub fn generate_code_from_lock(
    config: &EnumsConfig,
    lock: &LockFile,
) -> Result<String, GenerateError> {
    let mut out = String::new();
    out.push_str("// @generated by enum-registry-build from enums.toml. Do not edit.\n");

    for locked in &lock.families {
        check_capacity(locked)?;
        let family = config.family(&locked.name);
        out.push('\n');
        match locked.kind {
            FamilyKind::Enum => write_enum(&mut out, family, locked),
            FamilyKind::Bitflags => write_bitflags(&mut out, family, locked),
        }
    }

    Ok(out)
}

fn check_capacity(locked: &LockedFamily) -> Result<(), GenerateError> {
    let capacity = capacity(locked.kind, &locked.repr);
    for member in &locked.members {
        let fits = match locked.kind {
            FamilyKind::Enum => member.slot <= capacity,
            FamilyKind::Bitflags => member.slot < capacity,
        };
        if !fits {
            return Err(GenerateError::Overflow {
                family: locked.name.clone(),
                member: member.name.clone(),
                repr: locked.repr.clone(),
            });
        }
    }
    Ok(())
}

fn write_format_attrs(out: &mut String, family: Option<&FamilyConfig>) {
    let Some(family) = family else {
        return;
    };
    if let Some(separator) = &family.separator {
        let _ = writeln!(out, "    #[separator = {:?}]", separator);
    }
    if let Some(case_insensitive) = family.case_insensitive {
        let _ = writeln!(out, "    #[case_insensitive = {}]", case_insensitive);
    }
}

fn write_member(out: &mut String, name: &str, value: &str, deprecated: bool) {
    if deprecated {
        let _ = writeln!(out, "        #[deprecated(note = {:?})]", DEPRECATED_NOTE);
    }
    let _ = writeln!(out, "        {} = {};", name, value);
}

fn write_enum(out: &mut String, family: Option<&FamilyConfig>, locked: &LockedFamily) {
    out.push_str("::enum_registry::enumeration! {\n");
    write_format_attrs(out, family);
    let _ = writeln!(out, "    pub struct {} => {} {{", locked.name, locked.repr);
    for member in locked.sorted_members() {
        write_member(out, &member.name, &member.slot.to_string(), member.deprecated);
    }
    out.push_str("    }\n}\n");
}

fn write_bitflags(out: &mut String, family: Option<&FamilyConfig>, locked: &LockedFamily) {
    let alias = locked.alias.as_deref().unwrap_or(&locked.name);

    out.push_str("::enum_registry::bitflag_enum! {\n");
    write_format_attrs(out, family);
    let _ = writeln!(
        out,
        "    pub struct {} => {}: {} {{",
        locked.name, alias, locked.repr
    );
    if let Some(zero) = family.and_then(|f| f.zero.as_deref()) {
        write_member(out, zero, "0", false);
    }
    for member in locked.sorted_members() {
        write_member(
            out,
            &member.name,
            &format!("1 << {}", member.slot),
            member.deprecated,
        );
    }
    out.push_str("    }\n}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> EnumsConfig {
        EnumsConfig::from_str(toml).unwrap()
    }

    #[test]
    fn generates_enumeration_invocation() {
        let code = generate_code(&config(
            r#"
[[enums]]
name = "Colors"
repr = "u8"
members = ["Red", "Green"]
"#,
        ))
        .unwrap();

        assert!(code.contains("::enum_registry::enumeration! {"));
        assert!(code.contains("pub struct Colors => u8 {"));
        assert!(code.contains("Red = 1;"));
        assert!(code.contains("Green = 2;"));
    }

    #[test]
    fn generates_bitflag_invocation_with_overrides() {
        let code = generate_code(&config(
            r#"
[[bitflags]]
name = "Perms"
alias = "Perm"
repr = "u16"
zero = "None"
separator = "|"
case_insensitive = false
members = ["Read", "Write"]
"#,
        ))
        .unwrap();

        assert!(code.contains("::enum_registry::bitflag_enum! {"));
        assert!(code.contains("#[separator = \"|\"]"));
        assert!(code.contains("#[case_insensitive = false]"));
        assert!(code.contains("pub struct Perms => Perm: u16 {"));
        assert!(code.contains("None = 0;"));
        assert!(code.contains("Read = 1 << 0;"));
        assert!(code.contains("Write = 1 << 1;"));
    }

    #[test]
    fn members_follow_locked_slots_not_config_order() {
        let original = config(
            r#"
[[enums]]
name = "Colors"
members = ["Red", "Green"]
"#,
        );
        let lock = LockFile::from_config(&original);
        let reordered = config(
            r#"
[[enums]]
name = "Colors"
members = ["Green", "Red"]
"#,
        );

        let code = generate_code_from_lock(&reordered, &lock).unwrap();
        assert!(code.contains("Red = 1;"));
        assert!(code.contains("Green = 2;"));
        assert!(code.find("Red = 1").unwrap() < code.find("Green = 2").unwrap());
    }

    #[test]
    fn deprecated_members_carry_attribute() {
        let cfg = config(
            r#"
[[enums]]
name = "Colors"
members = ["Red", "Green"]
"#,
        );
        let mut lock = LockFile::from_config(&cfg);
        lock.mark_deprecated("Colors", "Red");

        let code = generate_code_from_lock(&cfg, &lock).unwrap();
        assert!(code.contains("#[deprecated(note = \"removed from enums.toml\")]\n        Red = 1;"));
        assert!(!code.contains("#[deprecated(note = \"removed from enums.toml\")]\n        Green"));
    }

    #[test]
    fn bit_overflow_is_an_error() {
        let members: Vec<String> = (0..9).map(|i| format!("\"F{}\"", i)).collect();
        let cfg = config(&format!(
            r#"
[[bitflags]]
name = "Flags"
alias = "Flag"
repr = "u8"
members = [{}]
"#,
            members.join(", ")
        ));

        match generate_code(&cfg) {
            Err(GenerateError::Overflow { family, member, repr }) => {
                assert_eq!(family, "Flags");
                assert_eq!(member, "F8");
                assert_eq!(repr, "u8");
            }
            other => panic!("Expected Overflow, got: {:?}", other),
        }
    }

    #[test]
    fn eight_bits_fit_in_u8() {
        let members: Vec<String> = (0..8).map(|i| format!("\"F{}\"", i)).collect();
        let cfg = config(&format!(
            r#"
[[bitflags]]
name = "Flags"
alias = "Flag"
repr = "u8"
members = [{}]
"#,
            members.join(", ")
        ));
        let code = generate_code(&cfg).unwrap();
        assert!(code.contains("F7 = 1 << 7;"));
    }

    #[test]
    fn removed_enum_family_is_fully_deprecated() {
        let cfg = config(
            r#"
[[enums]]
name = "Colors"
members = ["Red"]
"#,
        );
        let mut lock = LockFile::from_config(&cfg);
        lock.mark_deprecated("Colors", "Red");

        let code = generate_code_from_lock(&config(""), &lock).unwrap();
        assert!(code.contains("pub struct Colors => u32 {"));
        assert!(code.contains("#[deprecated"));
    }

    #[test]
    fn removed_bitflag_family_keeps_alias_and_storage() {
        let cfg = config(
            r#"
[[bitflags]]
name = "Perms"
alias = "Perm"
repr = "u8"
zero = "Nothing"
separator = "|"
members = ["Read"]
"#,
        );
        let mut lock = LockFile::from_config(&cfg);
        lock.mark_deprecated("Perms", "Read");

        let code = generate_code_from_lock(&config(""), &lock).unwrap();
        assert!(code.contains("pub struct Perms => Perm: u8 {"));
        assert!(code.contains("Read = 1 << 0;"));
        assert!(!code.contains("Nothing"));
        assert!(!code.contains("#[separator"));
    }
}
