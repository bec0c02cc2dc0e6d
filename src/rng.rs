//! Deterministic random source for the host.
//!
//! Every randomized transition (role draw, word draw, avatar draw, id
//! generation) pulls from a [`GameRng`] handed to the state machine, so a
//! seeded host replays the same rounds.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed from the thread RNG. Used when no seed is configured.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.inner);
    }

    #[must_use]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        slice.choose(&mut self.inner)
    }

    /// New ULID string. The random part comes from this generator, the
    /// timestamp from the wall clock.
    pub fn next_id(&mut self) -> String {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        ulid::Ulid::from_parts(millis, self.inner.random::<u128>()).to_string()
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_shuffle() {
        let mut a = GameRng::new(7);
        let mut b = GameRng::new(7);
        let mut xs: Vec<usize> = (0..10).collect();
        let mut ys = xs.clone();
        a.shuffle(&mut xs);
        b.shuffle(&mut ys);
        assert_eq!(xs, ys);
        assert_eq!(a.seed(), 7);
    }

    #[test]
    fn test_next_id_is_unique() {
        let mut rng = GameRng::new(1);
        let a = rng.next_id();
        let b = rng.next_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 26);
    }
}
