// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entropy sources used to seed request IDs.
//!
//! Starting the ID counter from a random value instead of zero keeps a
//! restarted process from reusing IDs a peer may still hold replies for.

use ring::rand::{SecureRandom, SystemRandom};

/// Source of seed bytes.
pub trait EntropySource {
    /// Fill `buf` entirely with seed bytes.
    fn fill(&mut self, buf: &mut [u8]);
}

/// Draw a 32-bit seed from `source`.
pub fn seed_u32(source: &mut dyn EntropySource) -> u32 {
    let mut bytes = [0u8; 4];
    source.fill(&mut bytes);
    u32::from_ne_bytes(bytes)
}

/// Operating system randomness via `ring::rand::SystemRandom`.
#[derive(Debug)]
pub struct SystemEntropy {
    rng: SystemRandom,
}

impl SystemEntropy {
    /// Create a new system entropy source.
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SystemEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for SystemEntropy {
    fn fill(&mut self, buf: &mut [u8]) {
        if self.rng.fill(buf).is_err() {
            log::warn!("[entropy] System RNG unavailable, seeding from clock");
            fill_from_clock(buf);
        }
    }
}

/// Clock + thread id mix, used when the system RNG fails.
fn fill_from_clock(buf: &mut [u8]) {
    use std::hash::{Hash, Hasher};
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    nanos.hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);
    std::process::id().hash(&mut hasher);

    let mut state = hasher.finish();
    for chunk in buf.chunks_mut(8) {
        let bytes = state.to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
        // splitmix64 step
        state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        state = z ^ (z >> 31);
    }
}

/// Fixed seed, for deterministic tests and simulations.
///
/// Produces the same bytes on every fill: the native-endian seed repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededEntropy(pub u32);

impl EntropySource for SeededEntropy {
    fn fill(&mut self, buf: &mut [u8]) {
        let bytes = self.0.to_ne_bytes();
        for (dst, src) in buf.iter_mut().zip(bytes.iter().cycle()) {
            *dst = *src;
        }
    }
}
