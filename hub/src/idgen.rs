use std::sync::atomic::{AtomicU64, Ordering};

use rand::{Rng, rngs::OsRng};

/// Display ids are 8 characters over a Base58-style uppercase alphabet; the
/// visually ambiguous 0, O, I and L are excluded. 32^8 identifiers make
/// collisions negligible, but callers still retry on the unlikely hit.
const DISPLAY_ID_ALPHABET: &[u8] = b"123456789ABCDEFGHJKMNPQRSTUVWXYZ";
const DISPLAY_ID_LEN: usize = 8;

/// Mints display ids from OS randomness and controller ids from a monotone
/// counter (`controller-N`, easier to eyeball in logs than random strings).
pub struct IdGenerator {
    controller_seq: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            controller_seq: AtomicU64::new(0),
        }
    }

    pub fn mint_display_id(&self) -> String {
        let mut rng = OsRng;
        (0..DISPLAY_ID_LEN)
            .map(|_| DISPLAY_ID_ALPHABET[rng.gen_range(0..DISPLAY_ID_ALPHABET.len())] as char)
            .collect()
    }

    pub fn next_controller_id(&self) -> String {
        let n = self.controller_seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("controller-{n}")
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
