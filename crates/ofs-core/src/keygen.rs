//! Pronounceable storage key tokens.
//!
//! Tokens alternate character classes through a small state machine so they read as
//! syllables (`kaybe4zu`). Digits 0 and 1 and the letters `i`, `l` and `o` are left out
//! of the alphabets to avoid visual ambiguity.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub const DEFAULT_KEY_LENGTH: i32 = 8;

const VOWELS: &[u8] = b"aeyu";
const CONSONANTS: &[u8] = b"bcdfghjkmnpqrstvwxz";
const NUMBERS: &[u8] = b"23456789";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyGenError {
    #[error("key length cannot be negative (got {0})")]
    NegativeLength(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Consonant,
    Vowel,
    VowelSecond,
    Number,
}

impl CharClass {
    fn alphabet(self) -> &'static [u8] {
        match self {
            CharClass::Consonant => CONSONANTS,
            CharClass::Vowel | CharClass::VowelSecond => VOWELS,
            CharClass::Number => NUMBERS,
        }
    }

    fn next<R: Rng + ?Sized>(self, rng: &mut R) -> CharClass {
        match self {
            CharClass::Consonant => CharClass::Vowel,
            CharClass::Vowel => {
                if rng.random_bool(0.5) {
                    CharClass::VowelSecond
                } else {
                    CharClass::Number
                }
            }
            CharClass::VowelSecond | CharClass::Number => CharClass::Consonant,
        }
    }
}

/// Generates storage key tokens from one RNG shared by all callers.
///
/// The RNG is seeded once from the operating system and guarded by a mutex, so
/// concurrent requests draw from the same stream instead of reseeding per call.
pub struct KeyGenerator {
    rng: Mutex<StdRng>,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic generator for tests.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Generate a token of exactly `length` characters.
    pub fn generate(&self, length: i32) -> Result<String, KeyGenError> {
        if length < 0 {
            return Err(KeyGenError::NegativeLength(length));
        }

        // A poisoned lock only means another thread panicked mid-draw; the RNG state is still valid.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let mut token = String::with_capacity(length as usize);
        let mut class = CharClass::Consonant;
        for _ in 0..length {
            let alphabet = class.alphabet();
            token.push(alphabet[rng.random_range(0..alphabet.len())] as char);
            class = class.next(&mut *rng);
        }

        Ok(token)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGenerator").finish_non_exhaustive()
    }
}
