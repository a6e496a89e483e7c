use std::fmt::{Display, Formatter};

/// What to do with algebra constructs that have no SQL translation (e.g., `SERVICE`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnsupportedPolicy {
    /// Fail the translation with [TranslationError::NotImplemented](crate::TranslationError::NotImplemented).
    Reject,
    /// Replace the construct by a relation without rows and record a [Diagnostic].
    #[default]
    EmptyResult,
}

/// The default of [TranslationOptions::max_path_length].
pub const DEFAULT_MAX_PATH_LENGTH: usize = 64;

/// Options that influence the generated SQL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationOptions {
    pub unsupported: UnsupportedPolicy,
    /// The number of steps after which `*` and `+` paths stop extending.
    pub max_path_length: usize,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            unsupported: UnsupportedPolicy::default(),
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

impl TranslationOptions {
    #[must_use]
    pub fn with_unsupported_policy(mut self, policy: UnsupportedPolicy) -> Self {
        self.unsupported = policy;
        self
    }

    #[must_use]
    pub fn with_max_path_length(mut self, length: usize) -> Self {
        self.max_path_length = length.max(1);
        self
    }
}

/// A non-fatal note produced during translation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
