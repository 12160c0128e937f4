use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Random source owned by the caller and lent to the planner for id
/// generation, quantity sampling and tag picks.
#[derive(Debug, Clone)]
pub struct SpawnRng {
    inner: ChaCha8Rng,
}

impl SpawnRng {
    pub fn from_entropy() -> Self {
        Self {
            inner: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for SpawnRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RngCore for SpawnRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}
