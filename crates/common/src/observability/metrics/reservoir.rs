//! Fixed-size uniform sample of an unbounded stream (Algorithm R)

use rand::Rng;

/// Keeps a uniform random sample of at most `capacity` values out of every
/// value ever offered.
#[derive(Debug, Clone)]
pub(crate) struct Reservoir {
    capacity: usize,
    samples: Vec<u64>,
    seen: u64,
}

impl Reservoir {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { capacity, samples: Vec::with_capacity(capacity.min(4096)), seen: 0 }
    }

    pub(crate) fn offer<R: Rng + ?Sized>(&mut self, value: u64, rng: &mut R) {
        self.seen += 1;
        if self.samples.len() < self.capacity {
            self.samples.push(value);
            return;
        }

        let slot = rng.gen_range(0..self.seen);
        if let Ok(slot) = usize::try_from(slot) {
            if slot < self.capacity {
                self.samples[slot] = value;
            }
        }
    }

    pub(crate) fn samples(&self) -> &[u64] {
        &self.samples
    }

    pub(crate) fn seen(&self) -> u64 {
        self.seen
    }

    pub(crate) fn clear(&mut self) {
        self.samples.clear();
        self.seen = 0;
    }
}
