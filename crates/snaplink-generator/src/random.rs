use crate::Generator;
use rand::Rng;
use snaplink_core::ShortCode;
use thiserror::Error;

/// Lowercase, uppercase and digits: 62 symbols, about 5.95 bits per character.
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid alphabet: {0}")]
pub struct InvalidAlphabet(String);

/// Draws each character independently and uniformly from an alphabet.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    alphabet: Vec<u8>,
}

impl RandomGenerator {
    /// Creates a generator over `alphabet`.
    ///
    /// Symbols must be URL-safe (`[a-zA-Z0-9_-]`) and appear at most once.
    pub fn new(alphabet: &str) -> Result<Self, InvalidAlphabet> {
        if alphabet.is_empty() {
            return Err(InvalidAlphabet("alphabet is empty".to_string()));
        }

        let mut symbols: Vec<u8> = Vec::with_capacity(alphabet.len());
        for c in alphabet.chars() {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Err(InvalidAlphabet(format!("'{c}' is not allowed in a short code")));
            }
            let byte = c as u8;
            if symbols.contains(&byte) {
                return Err(InvalidAlphabet(format!("'{c}' appears more than once")));
            }
            symbols.push(byte);
        }

        Ok(Self { alphabet: symbols })
    }

    pub fn alphabet_len(&self) -> usize {
        self.alphabet.len()
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.as_bytes().to_vec(),
        }
    }
}

impl Generator for RandomGenerator {
    fn generate(&self, length: usize) -> ShortCode {
        let mut rng = rand::rng();
        let code: String = (0..length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())] as char)
            .collect();
        ShortCode::generated(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generates_requested_length_from_alphabet() {
        let generator = RandomGenerator::default();
        assert_eq!(generator.alphabet_len(), 62);

        for length in [1, 6, 20] {
            let code = generator.generate(length);
            assert_eq!(code.as_str().len(), length);
            assert!(code.as_str().chars().all(|c| DEFAULT_ALPHABET.contains(c)));
            assert!(!code.is_custom());
        }
    }

    #[test]
    fn codes_are_well_spread() {
        let generator = RandomGenerator::default();
        let codes: HashSet<String> = (0..1_000)
            .map(|_| generator.generate(8).as_str().to_owned())
            .collect();
        assert_eq!(codes.len(), 1_000);
    }

    #[test]
    fn single_symbol_alphabet_is_deterministic() {
        let generator = RandomGenerator::new("x").unwrap();
        assert_eq!(generator.generate(4).as_str(), "xxxx");
    }

    #[test]
    fn rejects_bad_alphabets() {
        assert!(RandomGenerator::new("").is_err());
        assert!(RandomGenerator::new("ab/").is_err());
        assert!(RandomGenerator::new("abca").is_err());
        assert!(RandomGenerator::new("é").is_err());
    }
}
