//! Deterministic pseudo-random source for request generation.
//!
//! The generator is Mulberry32: 32 bits of state, advanced by a fixed odd
//! increment and scrambled with two xor-shift-multiply rounds. All arithmetic
//! is wrapping 32-bit, so a seed yields the same stream on every platform.
//! The algorithm and its constants are frozen; changing either changes every
//! derived fixture and idempotency key.

use rand::{RngCore, SeedableRng};

const INCREMENT: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next draw as a float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_u32());
        let low = u64::from(self.next_u32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state as u32)
    }
}

/// Uniform integer in `min..=max`.
pub fn rand_int(rng: &mut Mulberry32, min: u32, max: u32) -> u32 {
    let span = f64::from(max - min + 1);
    (rng.next_f64() * span).floor() as u32 + min
}

/// Uniform float in `[min, max)`.
pub fn rand_float(rng: &mut Mulberry32, min: f64, max: f64) -> f64 {
    rng.next_f64() * (max - min) + min
}

pub fn pick<'a, T>(rng: &mut Mulberry32, choices: &'a [T]) -> &'a T {
    let idx = rand_int(rng, 0, choices.len() as u32 - 1) as usize;
    &choices[idx]
}

/// Round half-up to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}
