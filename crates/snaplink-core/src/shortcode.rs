use crate::error::ShortenerError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::hash::{Hash, Hasher};

/// A short code identifying a link.
///
/// Codes compare by their textual form regardless of how they were
/// produced, so a generated `abc123` and an alias `abc123` are the same key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ShortCode {
    /// A system-generated short code drawn from the configured alphabet.
    Generated(String),
    /// A caller-chosen alias.
    Custom(String),
}

/// Bounds for caller-chosen aliases.
pub const ALIAS_MIN_LENGTH: usize = 3;
pub const ALIAS_MAX_LENGTH: usize = 20;

/// Codes shadowed by fixed routes of the HTTP surface.
pub const RESERVED_CODES: &[&str] = &["health"];

/// Width of the stored short code column. Generated codes must fit in it too.
pub const MAX_CODE_LENGTH: usize = 20;

impl ShortCode {
    /// Wraps a code produced by a generator.
    pub fn generated(code: impl Into<String>) -> Self {
        Self::Generated(code.into())
    }

    /// Creates an alias after validating it.
    ///
    /// Valid aliases are 3-20 characters, contain only `[a-zA-Z0-9_-]`
    /// and are not one of [`RESERVED_CODES`].
    pub fn alias(code: impl Into<String>) -> Result<Self, ShortenerError> {
        let code = code.into();
        Self::validate_alias(&code)?;
        Ok(Self::Custom(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes read back from storage.
    pub fn new_unchecked(code: impl Into<String>, custom: bool) -> Self {
        if custom {
            Self::Custom(code.into())
        } else {
            Self::Generated(code.into())
        }
    }

    /// Parses a code taken from a request path for lookup.
    ///
    /// Returns `None` when the input could never have been stored, so
    /// callers can answer "not found" without touching the store.
    pub fn lookup(code: &str) -> Option<Self> {
        let well_formed = !code.is_empty()
            && code.len() <= MAX_CODE_LENGTH
            && code.chars().all(is_code_char);
        well_formed.then(|| Self::Generated(code.to_owned()))
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            ShortCode::Generated(s) | ShortCode::Custom(s) => s.as_str(),
        }
    }

    /// Whether the code collides with a fixed route and could never resolve.
    pub fn is_reserved(&self) -> bool {
        RESERVED_CODES.contains(&self.as_str())
    }

    /// Whether this code was chosen by the caller.
    pub fn is_custom(&self) -> bool {
        matches!(self, ShortCode::Custom(_))
    }

    fn validate_alias(code: &str) -> Result<(), ShortenerError> {
        if code.len() < ALIAS_MIN_LENGTH || code.len() > ALIAS_MAX_LENGTH {
            return Err(ShortenerError::InvalidAlias(format!(
                "length must be between {} and {}, got {}",
                ALIAS_MIN_LENGTH,
                ALIAS_MAX_LENGTH,
                code.len()
            )));
        }

        if !code.chars().all(is_code_char) {
            return Err(ShortenerError::InvalidAlias(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                code
            )));
        }

        if RESERVED_CODES.contains(&code) {
            return Err(ShortenerError::InvalidAlias(format!("'{code}' is reserved")));
        }

        Ok(())
    }
}

fn is_code_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl PartialEq for ShortCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ShortCode {}

impl Hash for ShortCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
