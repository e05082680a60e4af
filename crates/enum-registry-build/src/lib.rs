//! Build-time utilities for enum-registry.
//!
//! This crate provides tools for:
//! - Parsing `enums.toml` configuration files
//! - Managing `enums.lock.toml` lock files that pin member values
//! - Generating Rust code with the `enumeration!` and `bitflag_enum!` macros
//!
//! # Usage in build.rs
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     println!("cargo:rerun-if-changed=enums.toml");
//!     enum_registry_build::generate("enums.toml", "src/generated_enums.rs")
//!         .expect("Failed to generate enums");
//! }
//! ```
//!
//! ```toml
//! # enums.toml
//! on_remove = "error"
//!
//! [[enums]]
//! name = "Colors"        # ordinals 1, 2, 3 ...
//! repr = "u8"
//! members = ["Red", "Green", "Blue"]
//!
//! [[bitflags]]
//! name = "Permissions"   # bits 0, 1, 2 ...
//! alias = "Permission"
//! repr = "u16"
//! zero = "None"
//! separator = "|"
//! members = ["Read", "Write", "Exec"]
//! ```
//!
//! # Lock File Mechanism
//!
//! Stringified names travel over the wire, but values end up in databases,
//! so a member's value must never change once assigned:
//!
//! - First build: writes `enums.lock.toml` with every member's value
//! - Subsequent builds: values come from the lock, not from declaration order
//! - New members: appended to the lock with the next free ordinal or bit
//! - Removed members: **build error** (default) or `#[deprecated]` accessor
//!   (with `on_remove = "warn"`); their values are never reused
//! - More bits than the storage type holds: **build error**
//!
//! To intentionally reassign values, delete the lock file and rebuild.

mod codegen;
mod lock;
mod toml_parser;

pub use codegen::{generate_code, generate_code_from_lock};
pub use lock::{LockDiff, LockFile, LockFileError, LockedFamily, LockedMember};
pub use toml_parser::{ConfigFileError, EnumsConfig, FamilyConfig, FamilyKind, OnRemove};

use std::path::Path;

/// Main entry point for build.rs integration.
///
/// Reads `enums.toml`, reconciles it with `enums.lock.toml` next to it, and
/// writes the generated code to `output_path`.
///
/// # Errors
///
/// Returns an error if:
/// - `enums.toml` cannot be read or parsed
/// - Members were removed and `on_remove = "error"`
/// - A family needs more values than its storage type holds
/// - A locked family moved between `[[enums]]` and `[[bitflags]]`
/// - The lock or output file cannot be written
pub fn generate(
    config_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let config_path = config_path.as_ref();

    // enums.toml -> enums.lock.toml
    let lock_path = config_path.with_extension("lock.toml");

    generate_with_lock(config_path, &lock_path, output_path)
}

/// Generate with explicit lock file path.
pub fn generate_with_lock(
    config_path: impl AsRef<Path>,
    lock_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let config_path = config_path.as_ref();
    let lock_path = lock_path.as_ref();
    let output_path = output_path.as_ref();

    let config = EnumsConfig::from_file(config_path)?;

    let mut lock = if lock_path.exists() {
        let mut lock = LockFile::from_file(lock_path)?;
        reconcile(&config, &mut lock)?;
        lock
    } else {
        LockFile::from_config(&config)
    };

    // Check before touching the lock so a failed build leaves it unchanged.
    let code = generate_code_from_lock(&config, &lock)?;

    lock.write_to_file(lock_path)?;
    std::fs::write(output_path, code).map_err(|e| GenerateError::Io {
        path: output_path.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

/// Apply the config's changes to an existing lock.
fn reconcile(config: &EnumsConfig, lock: &mut LockFile) -> Result<(), GenerateError> {
    // Locked ordinals cannot be reread as bit indices, or the reverse.
    for family in config.families() {
        if let Some(locked) = lock.family(&family.name)
            && locked.kind != family.kind
        {
            return Err(GenerateError::KindChanged {
                family: family.name.clone(),
                locked: locked.kind,
                declared: family.kind,
            });
        }
    }

    let diff = lock.diff(config);

    if !diff.removed.is_empty() {
        match config.on_remove {
            OnRemove::Error => {
                return Err(GenerateError::LockMismatch(format_lock_error(&diff)));
            }
            OnRemove::Warn => {
                for (family, member) in &diff.removed {
                    lock.mark_deprecated(family, member);
                    println!(
                        "cargo:warning=enum-registry: {}::{} was removed from enums.toml and is now deprecated",
                        family, member
                    );
                }
            }
        }
    }

    for (family, member) in &diff.restored {
        lock.mark_active(family, member);
    }

    lock.sync_families(config);
    for (family, member) in &diff.added {
        if let Some(family) = config.family(family) {
            lock.add_member(family, member);
        }
    }

    Ok(())
}

fn format_lock_error(diff: &LockDiff) -> String {
    let mut msg = String::new();
    msg.push_str("enum-registry: Lock file mismatch!\n\n");
    msg.push_str("  Missing in enums.toml (existed in lock):\n");
    for (family, member) in &diff.removed {
        msg.push_str(&format!("    - {}::{}\n", family, member));
    }
    msg.push_str("\n  To fix:\n");
    msg.push_str("    1. Add the member(s) back to enums.toml, OR\n");
    msg.push_str("    2. Set `on_remove = \"warn\"` in enums.toml to deprecate instead, OR\n");
    msg.push_str("    3. Delete enums.lock.toml to reassign values (BREAKING CHANGE!)\n");
    msg
}

/// Errors that can occur during generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigFileError),
    #[error("Lock file error: {0}")]
    Lock(#[from] LockFileError),
    /// Members removed while `on_remove = "error"`
    #[error("{0}")]
    LockMismatch(String),
    /// A member's value does not fit the family's storage type
    #[error("enum-registry: {family}::{member} does not fit in {repr}")]
    Overflow {
        family: String,
        member: String,
        repr: String,
    },
    /// A family moved between `[[enums]]` and `[[bitflags]]`
    #[error(
        "enum-registry: {family} is locked as {locked:?} but declared as {declared:?}; \
         delete enums.lock.toml to reassign its values (BREAKING CHANGE!)"
    )]
    KindChanged {
        family: String,
        locked: FamilyKind,
        declared: FamilyKind,
    },
    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },
}
