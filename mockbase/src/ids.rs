//! Opaque identifier generation.
//!
//! Identifiers follow the push-id layout: 8 characters encoding the
//! millisecond timestamp followed by 12 random characters, all drawn from a
//! 64-character alphabet whose ASCII order matches its numeric order. IDs
//! generated later therefore sort later, and IDs generated within the same
//! millisecond increment the random suffix instead of drawing a new one.

use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Alphabet in ascending ASCII order.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Number of timestamp characters.
const TIME_CHARS: usize = 8;
/// Number of random characters.
const RANDOM_CHARS: usize = 12;
/// Total identifier length.
pub const ID_LENGTH: usize = TIME_CHARS + RANDOM_CHARS;

struct State {
    rng: StdRng,
    last_time_ms: Option<u64>,
    last_random: [u8; RANDOM_CHARS],
}

/// Generator of unique, time-ordered identifiers.
///
/// # Invariants
///
/// - Every identifier is exactly [`ID_LENGTH`] characters long.
/// - Two generators built with the same seed produce the same sequence for
///   the same timestamps.
pub struct IdGenerator {
    state: RefCell<State>,
}

impl IdGenerator {
    /// Create a generator seeded from the operating system.
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Create a deterministic generator.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            state: RefCell::new(State {
                rng,
                last_time_ms: None,
                last_random: [0; RANDOM_CHARS],
            }),
        }
    }

    /// Generate an identifier for the given timestamp.
    pub fn next_id(&self, now_ms: u64) -> String {
        let mut state = self.state.borrow_mut();

        if state.last_time_ms == Some(now_ms) {
            increment(&mut state.last_random);
        } else {
            state.last_time_ms = Some(now_ms);
            let mut random = [0u8; RANDOM_CHARS];
            for slot in &mut random {
                *slot = state.rng.random_range(0..64);
            }
            state.last_random = random;
        }

        let mut id = String::with_capacity(ID_LENGTH);
        let mut time = now_ms;
        let mut time_chars = [0u8; TIME_CHARS];
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[usize::try_from(time % 64).unwrap_or(0)];
            time /= 64;
        }
        id.extend(time_chars.iter().map(|&c| char::from(c)));
        id.extend(
            state
                .last_random
                .iter()
                .map(|&digit| char::from(PUSH_CHARS[usize::from(digit)])),
        );
        id
    }
}

/// Add one to a base-64 digit string, carrying leftwards.
fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator")
            .field("last_time_ms", &self.state.borrow().last_time_ms)
            .finish_non_exhaustive()
    }
}
