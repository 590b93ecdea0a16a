//! RNG module - seeded piece generation
//!
//! Each piece kind is drawn uniformly and independently of the previous ones.
//! The generator is a small LCG so a game is fully reproducible from its seed.

use crate::types::PieceKind;

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        // Low bits of an LCG cycle with short periods.
        (self.next_u32() >> 16) % max.max(1)
    }
}

/// Uniform piece source with a one-piece preview
#[derive(Debug, Clone)]
pub struct PieceQueue {
    seed: u32,
    rng: SimpleRng,
    next: PieceKind,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed
    pub fn new(seed: u32) -> Self {
        let mut rng = SimpleRng::new(seed);
        let next = Self::pick(&mut rng);
        Self { seed, rng, next }
    }

    fn pick(rng: &mut SimpleRng) -> PieceKind {
        PieceKind::ALL[rng.next_range(PieceKind::ALL.len() as u32) as usize]
    }

    /// The piece the next `draw` will return
    pub fn peek(&self) -> PieceKind {
        self.next
    }

    /// Take the next piece and roll a new preview
    pub fn draw(&mut self) -> PieceKind {
        let kind = self.next;
        self.next = Self::pick(&mut self.rng);
        kind
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}
