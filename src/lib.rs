//! # Named Enumerations and Bitflags (enum-registry)
//!
//! Gives any closed set of named constants a reversible name ↔ value mapping,
//! without hand-written lookup tables at each call site.
//!
//! ## Design
//!
//! A *definition* is a zero-sized marker type whose accessors each return one
//! member value. The definition macros turn a member list into accessors plus
//! a per-definition [`Registry`], built lazily on first use:
//!
//! ```text
//! Permissions.Read() ──► Bitflag<Permissions>(0b001)
//!                               │
//!   first stringify/parse ──► Registry<u16>: unbuilt ──► built (terminal)
//!                               │
//!                 "Read,Write" ◄┴► 0b011
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use enum_registry::{bitflag_enum, BitflagDefinition};
//!
//! bitflag_enum! {
//!     #[separator = "|"]
//!     pub struct Permissions => Permission: u16 {
//!         Read = 1 << 0;
//!         Write = 1 << 1;
//!         Execute = 1 << 2;
//!     }
//! }
//!
//! let rw = Permissions.Read() | Permissions.Write();
//! assert!(rw.contains(Permissions.Read()));
//! assert_eq!(Permissions::parse("read|write", true).unwrap(), rw);
//! println!("{rw}"); // Read|Write
//! ```

// Lets the definition macros name `::enum_registry` from inside this crate.
extern crate self as enum_registry;

pub mod bitflags;
pub mod bits;
pub mod enumeration;
pub mod error;
pub mod options;
pub mod registry;

pub use bitflags::{Bitflag, BitflagDefinition, SYNTHESIZED_ZERO_NAME};
pub use bits::Flaggable;
pub use enumeration::EnumDefinition;
pub use error::{ConfigError, ParseError};
pub use options::{
    configure, current, FormatConfig, FormatOverride, StringOptions, DEFAULT_CASE_INSENSITIVE,
    DEFAULT_SEPARATOR,
};
pub use registry::{Member, Registry, RegistryCache};

pub use enum_registry_macro::{bitflag_enum, enumeration};
