//! Short code generators.

mod random;

pub use random::{InvalidAlphabet, RandomGenerator, DEFAULT_ALPHABET};

use snaplink_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness is settled by the store; a generator only has to make
/// collisions unlikely.
pub trait Generator: Send + Sync + 'static {
    /// Produces a candidate code of exactly `length` characters.
    fn generate(&self, length: usize) -> ShortCode;
}
