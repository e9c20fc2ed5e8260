//! Stable hashing of (virtual user, iteration) coordinates.
//!
//! `seed_for` feeds request content; `bucket_for` re-mixes the same seed
//! through one LCG step and is only used to pick the request kind. The
//! constants are frozen: changing them changes every derived key and body.

use std::fmt;

const VU_MULTIPLIER: u32 = 1_000_003;
const ITER_MULTIPLIER: u32 = 97;
const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub vu: u32,
    pub iter: u32,
}

impl Coordinate {
    pub fn new(vu: u32, iter: u32) -> Self {
        Self { vu, iter }
    }

    pub fn seed(&self) -> u32 {
        seed_for(self.vu, self.iter)
    }

    pub fn bucket(&self, modulus: u32) -> u32 {
        bucket_for(self.vu, self.iter, modulus)
    }

    /// `007-000042` style label used in document ids and correlation ids.
    pub fn label(&self) -> String {
        format!("{:03}-{:06}", self.vu, self.iter)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vu={} iter={}", self.vu, self.iter)
    }
}

pub fn seed_for(vu: u32, iter: u32) -> u32 {
    vu.wrapping_mul(VU_MULTIPLIER)
        .wrapping_add(iter.wrapping_mul(ITER_MULTIPLIER))
}

/// # Panics
/// Panics if `modulus` is zero.
pub fn bucket_for(vu: u32, iter: u32, modulus: u32) -> u32 {
    let mixed = seed_for(vu, iter)
        .wrapping_mul(LCG_MULTIPLIER)
        .wrapping_add(LCG_INCREMENT);
    mixed % modulus
}
