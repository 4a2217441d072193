use log::debug;
use num_prime::buffer::NaiveBuffer;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, RwLock};

/// Smallest number of primes the cache holds after its first extension.
const MIN_EXTENSION: usize = 64;

static SHARED: LazyLock<Arc<PrimeSource>> = LazyLock::new(|| Arc::new(PrimeSource::new()));

/// Append-only cache of the primes in ascending order, indexed from 0 (index 0 is 2).
///
/// The cache is published as an immutable `Arc<[u64]>` snapshot. [`PrimeSource::at`] takes the
/// shared side of an `RwLock` to read it, while [`PrimeSource::iter`] holds on to a snapshot and
/// only goes back to the lock once it runs past the end. Growing the cache is serialized by the
/// sieve's `Mutex`, so two callers racing for the same missing index compute it once.
pub struct PrimeSource {
    cache: RwLock<Arc<[u64]>>,
    sieve: Mutex<NaiveBuffer>,
}

impl Default for PrimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for PrimeSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimeSource")
            .field("cached", &self.cached())
            .finish()
    }
}

impl PrimeSource {
    pub fn new() -> Self {
        PrimeSource {
            cache: RwLock::new(Arc::from([])),
            sieve: Mutex::new(NaiveBuffer::new()),
        }
    }

    /// The process-wide instance used by the convenience constructors of
    /// [`FactoredInteger`](crate::FactoredInteger).
    pub fn shared() -> Arc<PrimeSource> {
        Arc::clone(&SHARED)
    }

    /// Returns the prime with the given 0-based index, extending the cache if needed.
    #[inline]
    pub fn at(&self, index: usize) -> u64 {
        match self.lookup(index) {
            Some(prime) => prime,
            None => self.extend_to(index),
        }
    }

    /// Number of primes currently cached.
    pub fn cached(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// All primes in ascending order, without end.
    pub fn iter(&self) -> Primes<'_> {
        Primes {
            source: self,
            snapshot: self.snapshot(),
            index: 0,
        }
    }

    fn snapshot(&self) -> Arc<[u64]> {
        Arc::clone(&self.cache.read().unwrap_or_else(PoisonError::into_inner))
    }

    #[inline(always)]
    fn lookup(&self, index: usize) -> Option<u64> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .copied()
    }

    #[cold]
    fn extend_to(&self, index: usize) -> u64 {
        let mut sieve = self.sieve.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have grown the cache while we waited for the sieve
        if let Some(prime) = self.lookup(index) {
            return prime;
        }
        let count = (index + 1).next_power_of_two().max(MIN_EXTENSION);
        let primes: Arc<[u64]> = sieve.nprimes(count).copied().collect();
        let prime = primes[index];
        debug!(
            "Extended prime cache to {} primes, largest {}",
            primes.len(),
            primes[primes.len() - 1]
        );
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = primes;
        prime
    }
}

/// Iterator returned by [`PrimeSource::iter`].
pub struct Primes<'a> {
    source: &'a PrimeSource,
    snapshot: Arc<[u64]>,
    index: usize,
}

impl Iterator for Primes<'_> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        let prime = match self.snapshot.get(self.index) {
            Some(&prime) => prime,
            None => {
                let prime = self.source.at(self.index);
                self.snapshot = self.source.snapshot();
                prime
            }
        };
        self.index += 1;
        Some(prime)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}
