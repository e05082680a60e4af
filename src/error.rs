//! Recoverable errors returned by the facades and the format configuration.

/// Text could not be mapped to a registered member.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Strict parsing hit a name that no member of `definition` carries.
    #[error("could not associate input `{input}` with a value of {definition}")]
    ValueNotFound {
        definition: &'static str,
        input: String,
    },
}

impl ParseError {
    pub(crate) fn not_found<D>(input: &str) -> Self {
        Self::ValueNotFound {
            definition: std::any::type_name::<D>(),
            input: input.to_string(),
        }
    }

    /// The unmatched input carried by this error.
    pub fn input(&self) -> &str {
        match self {
            Self::ValueNotFound { input, .. } => input,
        }
    }
}

/// Rejected text-format configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("separator cannot be empty")]
    EmptySeparator,
}
