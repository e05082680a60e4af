//! Bitflag facade: composition algebra and the multi-name text protocol.
//!
//! A bitflag definition registers single-bit (or zero) members over an
//! unsigned integer. Instances are [`Bitflag<D>`] values; the type parameter
//! is the only link back to the definition, resolved when an instance needs
//! its registry (e.g. to render itself).
//!
//! ## Text protocol
//!
//! ```text
//! stringify(Foo | Baz)  → "Foo,Baz"     non-zero members fully contained, joined
//! stringify(empty)      → "None"        or the declared zero member's name
//! parse(" foo , BAZ ")  → Foo | Baz     tokens trimmed, matched case-insensitively
//! parse("Foo,Qux")      → strict: Err(ValueNotFound "Qux"), lenient: Foo
//! ```

use std::any::type_name;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zerocopy::{FromBytes, IntoBytes};

use crate::bits::Flaggable;
use crate::error::ParseError;
use crate::options::{FormatConfig, FormatOverride, StringOptions};
use crate::registry::{Member, Registry, RegistryCache};

/// Name rendered for the empty set when no zero member is declared.
pub const SYNTHESIZED_ZERO_NAME: &str = "None";

/// A zero-sized definition of a bitflag family.
///
/// Normally implemented by the `bitflag_enum!` macro.
pub trait BitflagDefinition: Sized + 'static {
    /// Raw storage of every instance.
    type Bits: Flaggable;

    /// Every member as raw bits, obtained by calling each accessor in
    /// declaration order.
    fn members() -> Vec<Member<Self::Bits>>;

    /// The definition's own registry (a `static` inside the impl).
    fn registry() -> &'static Registry<Self::Bits>;

    /// Per-definition text-format defaults.
    fn format_override() -> FormatOverride {
        FormatOverride::NONE
    }

    /// Built caches, discovering the members on first use.
    fn cache() -> &'static RegistryCache<Self::Bits> {
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

    /// Wrap raw bits. They need not correspond to registered members.
    #[inline]
    fn from_bits(bits: Self::Bits) -> Bitflag<Self> {
        Bitflag::from_bits(bits)
    }

    /// Name of the empty set: the declared zero member, else `"None"`.
    fn zero_name() -> &'static str {
        Self::cache()
            .name_of(&Self::Bits::ZERO)
            .unwrap_or(SYNTHESIZED_ZERO_NAME)
    }

    /// Render `flags` with the effective options.
    fn stringify(flags: Bitflag<Self>) -> String {
        Self::stringify_with(flags, &Self::options())
    }

    /// Render `flags` with explicit options.
    ///
    /// Bits not covered by any registered member are not rendered.
    fn stringify_with(flags: Bitflag<Self>, options: &StringOptions) -> String {
        let names: Vec<&str> = Self::cache()
            .members()
            .iter()
            .filter(|m| m.value != Self::Bits::ZERO && flags.bits.contains_bits(m.value))
            .map(|m| m.name)
            .collect();

        if names.is_empty() {
            return Self::zero_name().to_string();
        }
        names.join(&*options.separator)
    }

    /// Parse separator-joined member names with the effective options.
    fn parse(text: &str, strict: bool) -> Result<Bitflag<Self>, ParseError> {
        Self::parse_with(text, strict, &Self::options())
    }

    /// Parse separator-joined member names with explicit options.
    ///
    /// Each token is trimmed before lookup. In strict mode the first
    /// unmatched token aborts the parse and nothing accumulated so far is
    /// returned; in lenient mode unmatched tokens are skipped.
    fn parse_with(
        text: &str,
        strict: bool,
        options: &StringOptions,
    ) -> Result<Bitflag<Self>, ParseError> {
        let cache = Self::cache();
        let mut bits = Self::Bits::ZERO;

        for token in text.split(&*options.separator) {
            let token = token.trim();
            match lookup_token::<Self>(cache, token, options.case_insensitive) {
                Some(found) => bits |= found,
                None if strict => return Err(ParseError::not_found::<Self>(token)),
                None => {}
            }
        }

        Ok(Bitflag::from_bits(bits))
    }

    /// Every registered non-zero member fully contained in `flags`.
    ///
    /// Composing the result reproduces every registered bit of `flags`.
    fn decompose(flags: Bitflag<Self>) -> Vec<Bitflag<Self>> {
        Self::cache()
            .members()
            .iter()
            .filter(|m| m.value != Self::Bits::ZERO && flags.bits.contains_bits(m.value))
            .map(|m| Bitflag::from_bits(m.value))
            .collect()
    }

    /// Every registered member. Order is not part of the contract.
    fn all_values() -> Vec<Bitflag<Self>> {
        Self::cache().values().map(|&bits| Bitflag::from_bits(bits)).collect()
    }
}

fn lookup_token<D: BitflagDefinition>(
    cache: &RegistryCache<D::Bits>,
    token: &str,
    case_insensitive: bool,
) -> Option<D::Bits> {
    if let Some(member) = cache.lookup(token, case_insensitive) {
        return Some(member.value);
    }

    // The synthesized zero name parses back to the empty set.
    let zero_is_declared = cache.contains_value(&D::Bits::ZERO);
    let is_zero_name = if case_insensitive {
        token.eq_ignore_ascii_case(SYNTHESIZED_ZERO_NAME)
    } else {
        token == SYNTHESIZED_ZERO_NAME
    };
    (!zero_is_declared && is_zero_name).then_some(D::Bits::ZERO)
}

// =============================================================================
// Bitflag instance
// =============================================================================

/// A set of bits belonging to definition `D`.
///
/// All operations are pure and return new values. The definition is never
/// owned: `D` only tells the instance where its registry lives.
pub struct Bitflag<D: BitflagDefinition> {
    bits: D::Bits,
    _definition: PhantomData<fn() -> D>,
}

impl<D: BitflagDefinition> Bitflag<D> {
    /// Wrap raw bits. They need not correspond to registered members.
    #[inline]
    pub const fn from_bits(bits: D::Bits) -> Self {
        Self {
            bits,
            _definition: PhantomData,
        }
    }

    /// The empty set.
    #[inline]
    pub const fn empty() -> Self {
        Self::from_bits(D::Bits::ZERO)
    }

    /// Raw storage value.
    #[inline]
    pub const fn bits(&self) -> D::Bits {
        self.bits
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.bits == D::Bits::ZERO
    }

    /// Bitwise OR of two sets.
    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self::from_bits(self.bits | other.bits)
    }

    /// Bitwise OR of every set in `parts` (the empty set if there are none).
    pub fn compose(parts: impl IntoIterator<Item = Self>) -> Self {
        parts.into_iter().fold(Self::empty(), Self::union)
    }

    /// Clear every bit of `other`.
    #[inline]
    pub fn remove(self, other: Self) -> Self {
        Self::from_bits(self.bits & !other.bits)
    }

    /// Clear the bits of every set in `removals`.
    ///
    /// Members sharing bits with a removal lose them too, so re-composing
    /// the removals does not necessarily restore the original.
    pub fn subtract(self, removals: impl IntoIterator<Item = Self>) -> Self {
        removals.into_iter().fold(self, Self::remove)
    }

    /// Bitwise AND of two sets.
    #[inline]
    pub fn intersection(self, other: Self) -> Self {
        Self::from_bits(self.bits & other.bits)
    }

    /// True if every bit of `other` is set (so the empty set is always contained).
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.bits.contains_bits(other.bits)
    }

    /// True if every set in `required` is contained.
    pub fn contains_all(self, required: impl IntoIterator<Item = Self>) -> bool {
        required.into_iter().all(|r| self.contains(r))
    }

    /// Registered members fully contained in this set.
    pub fn decompose(self) -> Vec<Self> {
        D::decompose(self)
    }

    /// Storage bytes in native byte order.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_bytes()
    }

    /// Read a set back from native-order storage bytes.
    ///
    /// Returns `None` if `bytes` is not exactly the storage width.
    pub fn read_from_bytes(bytes: &[u8]) -> Option<Self> {
        D::Bits::read_from_bytes(bytes).ok().map(Self::from_bits)
    }
}

impl<D: BitflagDefinition> Clone for Bitflag<D> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: BitflagDefinition> Copy for Bitflag<D> {}

impl<D: BitflagDefinition> PartialEq for Bitflag<D> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<D: BitflagDefinition> Eq for Bitflag<D> {}

impl<D: BitflagDefinition> Hash for Bitflag<D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<D: BitflagDefinition> Default for Bitflag<D> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<D: BitflagDefinition> fmt::Debug for Bitflag<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitflag({:#x}: {})", self.bits, D::stringify(*self))
    }
}

impl<D: BitflagDefinition> fmt::Display for Bitflag<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&D::stringify(*self))
    }
}

impl<D: BitflagDefinition> fmt::LowerHex for Bitflag<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.bits, f)
    }
}

/// Strict parse with the effective options.
impl<D: BitflagDefinition> FromStr for Bitflag<D> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        D::parse(s, true)
    }
}

impl<D: BitflagDefinition> BitOr for Bitflag<D> {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl<D: BitflagDefinition> BitOrAssign for Bitflag<D> {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl<D: BitflagDefinition> BitAnd for Bitflag<D> {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl<D: BitflagDefinition> BitAndAssign for Bitflag<D> {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        *self = self.intersection(rhs);
    }
}

impl<D: BitflagDefinition> Sub for Bitflag<D> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.remove(rhs)
    }
}

impl<D: BitflagDefinition> SubAssign for Bitflag<D> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.remove(rhs);
    }
}

impl<D: BitflagDefinition> FromIterator<Bitflag<D>> for Bitflag<D> {
    fn from_iter<T: IntoIterator<Item = Bitflag<D>>>(iter: T) -> Self {
        Self::compose(iter)
    }
}

/// Names for human-readable formats, raw bits otherwise.
impl<D: BitflagDefinition> Serialize for Bitflag<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&D::stringify(*self))
        } else {
            self.bits.serialize(serializer)
        }
    }
}

/// Strict parse for human-readable formats, raw bits otherwise.
impl<'de, D: BitflagDefinition> Deserialize<'de> for Bitflag<D> {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            D::parse(&text, true).map_err(serde::de::Error::custom)
        } else {
            D::Bits::deserialize(deserializer).map(Self::from_bits)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
