//! Text-format options shared by the enum and bitflag facades.
//!
//! A [`FormatConfig`] is set at most once: the first successful
//! [`FormatConfig::configure`] (or the first read, which freezes the
//! defaults) wins and every later attempt is ignored. Caches and previously
//! rendered strings depend on these rules, so they must not change once in
//! use. Libraries should leave configuration to the final binary.
//!
//! Options resolve in this order:
//!
//! 1. explicit per-call options (`stringify_with`, `parse_with`)
//! 2. the definition's [`FormatOverride`] (field by field)
//! 3. the [`FormatConfig`] in use, [`FormatConfig::global`] by default
//! 4. the built-in defaults ([`DEFAULT_SEPARATOR`], [`DEFAULT_CASE_INSENSITIVE`])

use std::borrow::Cow;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Separator used when nothing else is configured.
pub const DEFAULT_SEPARATOR: &str = ",";

/// Parsing ignores case when nothing else is configured.
pub const DEFAULT_CASE_INSENSITIVE: bool = true;

/// How member names are joined and matched.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StringOptions {
    /// Text dividing bitflag names (`Foo,Bar` or `Foo|Bar`).
    pub separator: Cow<'static, str>,
    /// Only affects parsing; stringify always emits the canonical name.
    pub case_insensitive: bool,
}

impl Default for StringOptions {
    fn default() -> Self {
        Self {
            separator: Cow::Borrowed(DEFAULT_SEPARATOR),
            case_insensitive: DEFAULT_CASE_INSENSITIVE,
        }
    }
}

impl StringOptions {
    pub fn new(separator: impl Into<Cow<'static, str>>, case_insensitive: bool) -> Self {
        Self {
            separator: separator.into(),
            case_insensitive,
        }
    }

    /// Reject blank separators.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.separator.trim().is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        Ok(())
    }

    /// Layer a definition override on top of a configuration.
    pub fn resolve(overrides: FormatOverride, config: &FormatConfig) -> Self {
        let base = config.current();
        Self {
            separator: overrides
                .separator
                .map(Cow::Borrowed)
                .unwrap_or_else(|| base.separator.clone()),
            case_insensitive: overrides.case_insensitive.unwrap_or(base.case_insensitive),
        }
    }
}

/// Per-definition defaults that take precedence over the configuration.
///
/// Generated by `#[separator = "..."]` and `#[case_insensitive = ...]` on a
/// definition macro; unset fields fall through to the configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FormatOverride {
    pub separator: Option<&'static str>,
    pub case_insensitive: Option<bool>,
}

impl FormatOverride {
    /// No override at all.
    pub const NONE: Self = Self {
        separator: None,
        case_insensitive: None,
    };

    pub const fn new(separator: Option<&'static str>, case_insensitive: Option<bool>) -> Self {
        Self {
            separator,
            case_insensitive,
        }
    }
}

/// Write-once holder of [`StringOptions`].
///
/// Build one per test or application when isolation matters, or use
/// [`FormatConfig::global`] for the process-wide instance the facades
/// consult by default.
#[derive(Debug, Default)]
pub struct FormatConfig {
    options: OnceLock<StringOptions>,
}

impl FormatConfig {
    pub const fn new() -> Self {
        Self {
            options: OnceLock::new(),
        }
    }

    /// The process-wide configuration.
    pub fn global() -> &'static FormatConfig {
        static GLOBAL: FormatConfig = FormatConfig::new();
        &GLOBAL
    }

    /// Permanently set the options, unless something already did.
    ///
    /// A blank separator is rejected and leaves the configuration untouched.
    /// Otherwise the call succeeds even when it loses to an earlier one; the
    /// earlier options stay in effect.
    pub fn configure(&self, options: StringOptions) -> Result<(), ConfigError> {
        options.validate()?;

        let mut accepted = false;
        let current = self.options.get_or_init(|| {
            accepted = true;
            options.clone()
        });

        if accepted {
            tracing::debug!(
                separator = %current.separator,
                case_insensitive = current.case_insensitive,
                "format options configured"
            );
        } else {
            tracing::trace!(
                separator = %options.separator,
                case_insensitive = options.case_insensitive,
                "format options already set; ignoring"
            );
        }
        Ok(())
    }

    /// The effective options, freezing the defaults if nothing configured them.
    pub fn current(&self) -> &StringOptions {
        self.options.get_or_init(StringOptions::default)
    }

    /// Whether the options are frozen (configured or read).
    #[inline]
    pub fn is_set(&self) -> bool {
        self.options.get().is_some()
    }
}

/// Configure the global options. See [`FormatConfig::configure`].
pub fn configure(
    separator: impl Into<Cow<'static, str>>,
    case_insensitive: bool,
) -> Result<(), ConfigError> {
    FormatConfig::global().configure(StringOptions::new(separator, case_insensitive))
}

/// The effective global options. See [`FormatConfig::current`].
pub fn current() -> &'static StringOptions {
    FormatConfig::global().current()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_comma_and_case_insensitive() {
        let config = FormatConfig::new();
        assert_eq!(config.current().separator, ",");
        assert!(config.current().case_insensitive);
    }

    #[test]
    fn first_configuration_wins() {
        let config = FormatConfig::new();
        config.configure(StringOptions::new(",", true)).unwrap();
        config.configure(StringOptions::new("|", false)).unwrap();

        assert_eq!(config.current(), &StringOptions::new(",", true));
    }

    #[test]
    fn reading_freezes_defaults() {
        let config = FormatConfig::new();
        assert!(!config.is_set());
        let _ = config.current();
        assert!(config.is_set());

        config.configure(StringOptions::new("|", false)).unwrap();
        assert_eq!(config.current(), &StringOptions::default());
    }

    #[test]
    fn blank_separator_is_rejected_and_leaves_config_unset() {
        let config = FormatConfig::new();

        assert_eq!(
            config.configure(StringOptions::new("", true)),
            Err(ConfigError::EmptySeparator)
        );
        assert_eq!(
            config.configure(StringOptions::new("  \t", true)),
            Err(ConfigError::EmptySeparator)
        );
        assert!(!config.is_set());

        // A later valid configuration still takes effect.
        config.configure(StringOptions::new("|", false)).unwrap();
        assert_eq!(config.current().separator, "|");
    }

    #[test]
    fn override_takes_precedence_field_by_field() {
        let config = FormatConfig::new();
        config.configure(StringOptions::new(";", false)).unwrap();

        let resolved = StringOptions::resolve(FormatOverride::new(Some("|"), None), &config);
        assert_eq!(resolved, StringOptions::new("|", false));

        let resolved = StringOptions::resolve(FormatOverride::new(None, Some(true)), &config);
        assert_eq!(resolved, StringOptions::new(";", true));

        let resolved = StringOptions::resolve(FormatOverride::NONE, &config);
        assert_eq!(resolved, StringOptions::new(";", false));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: StringOptions = serde_json::from_str(r#"{"separator":"|"}"#).unwrap();
        assert_eq!(options, StringOptions::new("|", DEFAULT_CASE_INSENSITIVE));

        let options: StringOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, StringOptions::default());
    }
}
