//! Enum facade: name ↔ value for plain, non-combinable members.

use std::any::type_name;
use std::hash::Hash;

use crate::error::ParseError;
use crate::options::{FormatConfig, FormatOverride, StringOptions};
use crate::registry::{Member, Registry, RegistryCache};

/// A zero-sized definition of a plain enumeration.
///
/// Normally implemented by the `enumeration!` macro:
///
/// ```ignore
/// enumeration! {
///     pub struct Colors => Color {
///         Red = Color(1);
///         Green = Color(2);
///     }
/// }
///
/// assert_eq!(Colors::stringify(&Colors.Red()), "Red");
/// assert_eq!(Colors::parse("green", true), Ok(Color(2)));
/// ```
pub trait EnumDefinition: Sized + 'static {
    /// Member value type. `Default` is the result of a lenient parse miss.
    type Value: Clone + Eq + Hash + Default + Send + Sync + 'static;

    /// Every member, obtained by calling each accessor in declaration order.
    fn members() -> Vec<Member<Self::Value>>;

    /// The definition's own registry (a `static` inside the impl).
    fn registry() -> &'static Registry<Self::Value>;

    /// Per-definition text-format defaults.
    fn format_override() -> FormatOverride {
        FormatOverride::NONE
    }

    /// Built caches, discovering the members on first use.
    fn cache() -> &'static RegistryCache<Self::Value> {
        Self::registry().get_or_build(type_name::<Self>(), Self::members)
    }

    /// Effective options under the global configuration.
    fn options() -> StringOptions {
        Self::options_in(FormatConfig::global())
    }

    /// Effective options under a caller-owned configuration.
    fn options_in(config: &FormatConfig) -> StringOptions {
        StringOptions::resolve(Self::format_override(), config)
    }

    /// Canonical name of `value`, or `""` if it is not a member.
    fn stringify(value: &Self::Value) -> &'static str {
        Self::cache().name_of(value).unwrap_or_default()
    }

    /// Parse a member name.
    ///
    /// A miss is an error when `strict`; otherwise it yields
    /// `Self::Value::default()`.
    fn parse(text: &str, strict: bool) -> Result<Self::Value, ParseError> {
        Self::parse_with(text, strict, &Self::options())
    }

    /// [`parse`](Self::parse) with explicit options.
    fn parse_with(
        text: &str,
        strict: bool,
        options: &StringOptions,
    ) -> Result<Self::Value, ParseError> {
        match Self::cache().lookup(text, options.case_insensitive) {
            Some(member) => Ok(member.value.clone()),
            None if strict => Err(ParseError::not_found::<Self>(text)),
            None => Ok(Self::Value::default()),
        }
    }

    /// Every registered value. Order is not part of the contract.
    fn all_values() -> Vec<Self::Value> {
        Self::cache().values().cloned().collect()
    }

    /// Whether `value` is a registered member.
    fn contains_value(value: &Self::Value) -> bool {
        Self::cache().contains_value(value)
    }
}
