//! Exact integer factorizations with arithmetic that stays in factored form, and a lazy
//! generator of integer partitions and compositions.

pub mod error;
pub mod factor;
pub mod partition;
pub mod primes;

pub use error::{Error, Result};
pub use factor::{FactoredInteger, PrimePower};
pub use partition::{Mode, Partitions};
pub use primes::PrimeSource;
