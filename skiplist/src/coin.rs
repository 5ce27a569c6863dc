//! Promotion in an OrderedSet is driven by a coin: after a new entry lands on the base level it is
//! copied one level up for every `Heads`, stopping at the first `Tails`.  With a fair coin the
//! number of levels an entry reaches is geometrically distributed with `p = 1/2`, which is what
//! keeps searches logarithmic on average.
//!
//! The coin is a trait so that tests can script the flips and get a fully deterministic shape.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// /////////////////////////////////////////////////////////////////////////////////////////////////
// Coin
// /////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coin {
    Tails,
    Heads,
}

/// A source of coin flips owned by a single OrderedSet.
pub trait CoinSource {
    /// Flip the coin once.
    fn flip(&mut self) -> Coin;

    /// Derive an independent source for a set split off from the owner of `self`.
    fn fork(&mut self) -> Box<dyn CoinSource>;
}

/// A fair coin backed by `StdRng`.
pub struct RandomCoin {
    rng: StdRng,
}

impl RandomCoin {
    /// A coin seeded from the operating system.
    pub fn new() -> Self {
        RandomCoin {
            rng: StdRng::from_entropy(),
        }
    }

    /// A coin whose flips are fully determined by `seed`.
    pub fn seeded(seed: u64) -> Self {
        RandomCoin {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomCoin {
    fn default() -> Self {
        RandomCoin::new()
    }
}

impl CoinSource for RandomCoin {
    fn flip(&mut self) -> Coin {
        if self.rng.gen::<bool>() {
            Coin::Heads
        } else {
            Coin::Tails
        }
    }

    fn fork(&mut self) -> Box<dyn CoinSource> {
        Box::new(RandomCoin::seeded(self.rng.gen()))
    }
}
