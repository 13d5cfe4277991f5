//! Push Id Generator - Time-ordered Child Keys
//!
//! Generates 20-character keys for new children (player ids). The first
//! 8 characters encode the creation time in milliseconds, the remaining
//! 12 are random. Keys sort lexicographically in creation order, so the
//! roster iterates in the order players were added.
//!
//! Two ids generated in the same millisecond reuse the previous random
//! part incremented by one, which keeps them ordered.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use uuid::Uuid;

/// Alphabet in ascending ASCII order.
const PUSH_CHARS: &[u8; 64] =
    b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

#[derive(Debug, Default)]
struct LastId {
    timestamp_ms: u64,
    random: [u8; RANDOM_CHARS],
}

/// Thread-safe generator of push ids.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last: Mutex<LastId>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for the current wall-clock time.
    pub fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.next_id_at(now)
    }

    /// Next id for a given time in Unix milliseconds.
    pub fn next_id_at(&self, timestamp_ms: u64) -> String {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        if timestamp_ms == last.timestamp_ms {
            increment(&mut last.random);
        } else {
            last.timestamp_ms = timestamp_ms;
            let entropy = Uuid::new_v4().into_bytes();
            for (slot, byte) in last.random.iter_mut().zip(entropy) {
                *slot = byte % 64;
            }
        }

        let mut id = String::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut time = timestamp_ms;
        let mut time_chars = [0u8; TIME_CHARS];
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(time % 64) as usize];
            time /= 64;
        }
        id.extend(time_chars.iter().map(|&c| char::from(c)));
        id.extend(
            last.random
                .iter()
                .map(|&digit| char::from(PUSH_CHARS[usize::from(digit)])),
        );
        id
    }
}

/// Add one to a base-64 number stored most significant digit first.
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
