use crate::error::{Error, Result};
use crate::primes::PrimeSource;
use derivative::Derivative;
use itertools::EitherOrBoth::{Both, Left, Right};
use itertools::Itertools;
use log::debug;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_prime::Primality::No;
use num_prime::nt_funcs::{is_prime, is_prime64};
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// One `prime^exponent` term of a factorization.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct PrimePower {
    #[serde(serialize_with = "serialize_decimal")]
    pub prime: BigUint,
    pub exponent: u32,
}

impl PrimePower {
    #[inline(always)]
    pub fn new(prime: impl Into<BigUint>, exponent: u32) -> Self {
        PrimePower {
            prime: prime.into(),
            exponent,
        }
    }

    /// `1^0`, which stands in for the whole factorization of 1 so that 1 and 0 have distinct
    /// representations.
    pub fn sentinel() -> Self {
        PrimePower::new(1u32, 0)
    }

    #[inline(always)]
    pub fn is_sentinel(&self) -> bool {
        self.exponent == 0 && self.prime.is_one()
    }

    #[inline]
    pub fn value(&self) -> BigUint {
        self.prime.pow(self.exponent)
    }
}

impl Display for PrimePower {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.exponent > 1 {
            write!(f, "{}^{}", self.prime, self.exponent)
        } else {
            self.prime.fmt(f)
        }
    }
}

/// A non-negative integer together with its prime factorization.
///
/// The factors are sorted by prime with every exponent at least 1. Zero has no factors, and one
/// is represented by the single [`PrimePower::sentinel`]. Instances never change after
/// construction; every operation returns a new one. Equality, hashing and ordering only look at
/// the value.
#[derive(Clone, Debug, Derivative, Serialize)]
#[derivative(PartialEq, Eq, Hash)]
pub struct FactoredInteger {
    #[serde(serialize_with = "serialize_decimal")]
    value: BigUint,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    factors: Arc<[PrimePower]>,
}

fn serialize_decimal<S: Serializer>(
    value: &BigUint,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Selects how [`FactoredInteger::merge`] combines two factorizations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum MergeOp {
    Multiply,
    Gcd,
    Lcm,
}

impl MergeOp {
    #[inline(always)]
    fn combine(self, left: u32, right: u32) -> u32 {
        match self {
            MergeOp::Multiply => left + right,
            MergeOp::Gcd => left.min(right),
            MergeOp::Lcm => left.max(right),
        }
    }

    /// Whether a prime present on only one side survives into the result.
    #[inline(always)]
    fn keeps_unmatched(self) -> bool {
        self != MergeOp::Gcd
    }
}

impl FactoredInteger {
    thread_local! {
        static ZERO: FactoredInteger = FactoredInteger {
            value: BigUint::zero(),
            factors: Arc::from([]),
        };
        static ONE: FactoredInteger = FactoredInteger {
            value: BigUint::one(),
            factors: Arc::from([PrimePower::sentinel()]),
        };
    }

    pub fn zero() -> Self {
        FactoredInteger::ZERO.with(Clone::clone)
    }

    pub fn one() -> Self {
        FactoredInteger::ONE.with(Clone::clone)
    }

    /// Factorizes `number` by trial division over the shared [`PrimeSource`].
    pub fn new(number: impl Into<BigUint>) -> Self {
        Self::with_primes(number.into(), &PrimeSource::shared())
    }

    /// Factorizes `number` by trial division, taking primes in ascending order from `primes`.
    pub fn with_primes(number: BigUint, primes: &PrimeSource) -> Self {
        if number.is_zero() {
            return Self::zero();
        }
        if number.is_one() {
            return Self::one();
        }
        let mut quotient = number.clone();
        let mut factors = Vec::new();
        // The quotient only needs a primality test when it is new
        let mut untested = true;
        for prime in primes.iter() {
            if quotient.is_one() {
                break;
            }
            // Nothing below `prime` divides the quotient, so if prime^2 exceeds it, it is prime
            let past_square_root = quotient.to_u64().is_some_and(|remaining| {
                prime
                    .checked_mul(prime)
                    .is_none_or(|square| square > remaining)
            });
            if past_square_root || (untested && is_probable_prime(&quotient)) {
                factors.push(PrimePower::new(quotient, 1));
                break;
            }
            untested = false;
            let mut exponent = 0;
            while (&quotient % prime).is_zero() {
                quotient /= prime;
                exponent += 1;
            }
            if exponent > 0 {
                factors.push(PrimePower::new(prime, exponent));
                untested = true;
            }
        }
        FactoredInteger {
            value: number,
            factors: factors.into(),
        }
    }

    /// Builds the number whose exponent of the `i`th prime (0-based, so `exponents[0]` belongs
    /// to 2) is `exponents[i]`. An empty list gives 0.
    pub fn from_exponents(exponents: &[u32]) -> Self {
        Self::from_exponents_with_primes(exponents, &PrimeSource::shared())
    }

    pub fn from_exponents_with_primes(exponents: &[u32], primes: &PrimeSource) -> Self {
        if exponents.is_empty() {
            return Self::zero();
        }
        let factors = exponents
            .iter()
            .enumerate()
            .filter(|(_, exponent)| **exponent > 0)
            .map(|(index, exponent)| PrimePower::new(primes.at(index), *exponent))
            .collect_vec();
        let value = factors.iter().map(PrimePower::value).product();
        Self::from_parts(value, factors)
    }

    /// Pairs a value with factors already known to be its sorted factorization, restoring the
    /// sentinel when the factors cancelled down to nothing.
    fn from_parts(value: BigUint, factors: Vec<PrimePower>) -> Self {
        if value.is_zero() {
            Self::zero()
        } else if factors.is_empty() {
            debug_assert!(value.is_one());
            Self::one()
        } else {
            FactoredInteger {
                value,
                factors: factors.into(),
            }
        }
    }

    #[inline(always)]
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    #[inline(always)]
    pub fn factors(&self) -> &[PrimePower] {
        &self.factors
    }

    #[inline(always)]
    pub fn is_zero(&self) -> bool {
        self.factors.is_empty()
    }

    #[inline(always)]
    pub fn is_one(&self) -> bool {
        self.factors.first().is_some_and(PrimePower::is_sentinel)
    }

    /// Inverse of [`FactoredInteger::from_exponents`]: the dense exponent list over 2, 3, 5, ...
    /// up to the largest prime factor. Walks every prime up to that factor, so it is only
    /// practical when the factors are small.
    pub fn to_exponent_vec(&self) -> Vec<u32> {
        if self.is_zero() {
            return vec![];
        }
        if self.is_one() {
            return vec![0];
        }
        let primes = PrimeSource::shared();
        let mut powers = self.factors.iter().peekable();
        let mut exponents = Vec::new();
        for prime in primes.iter() {
            let Some(next) = powers.peek() else {
                break;
            };
            if next.prime == BigUint::from(prime) {
                exponents.push(next.exponent);
                powers.next();
            } else {
                exponents.push(0);
            }
        }
        exponents
    }

    /// Product, gcd or lcm by a sorted merge of both factor lists. A zero operand always gives
    /// zero, including for gcd and lcm.
    fn merge(&self, other: &Self, op: MergeOp) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        if self.is_one() {
            return if op == MergeOp::Gcd {
                self.clone()
            } else {
                other.clone()
            };
        }
        if other.is_one() {
            return if op == MergeOp::Gcd {
                other.clone()
            } else {
                self.clone()
            };
        }
        let value = match op {
            MergeOp::Multiply => &self.value * &other.value,
            MergeOp::Gcd => self.value.gcd(&other.value),
            MergeOp::Lcm => self.value.lcm(&other.value),
        };
        let factors = self
            .factors
            .iter()
            .merge_join_by(other.factors.iter(), |left, right| {
                left.prime.cmp(&right.prime)
            })
            .filter_map(|pair| match pair {
                Both(left, right) => Some(PrimePower::new(
                    left.prime.clone(),
                    op.combine(left.exponent, right.exponent),
                )),
                Left(only) | Right(only) => op.keeps_unmatched().then(|| only.clone()),
            })
            .collect_vec();
        Self::from_parts(value, factors)
    }

    pub fn multiply(&self, other: &Self) -> Self {
        self.merge(other, MergeOp::Multiply)
    }

    /// Greatest common divisor; zero if either argument is zero.
    pub fn gcd(&self, other: &Self) -> Self {
        self.merge(other, MergeOp::Gcd)
    }

    /// Least common multiple; zero if either argument is zero.
    pub fn lcm(&self, other: &Self) -> Self {
        self.merge(other, MergeOp::Lcm)
    }

    /// Integer division discarding the remainder.
    pub fn divide(&self, divisor: &Self) -> Result<Self> {
        if divisor.is_zero() {
            return Err(Error::DivisionByZero);
        }
        if divisor.is_one() || self.is_zero() {
            return Ok(self.clone());
        }
        if let Some(quotient) = self.cancel(divisor) {
            return Ok(quotient);
        }
        debug!("{divisor} does not divide {self}; factorizing the floor quotient");
        Ok(Self::new(&self.value / &divisor.value))
    }

    /// Exact quotient by subtracting exponents, or `None` if `divisor` doesn't divide `self`.
    fn cancel(&self, divisor: &Self) -> Option<Self> {
        let mut factors = Vec::with_capacity(self.factors.len());
        for pair in self
            .factors
            .iter()
            .merge_join_by(divisor.factors.iter(), |left, right| {
                left.prime.cmp(&right.prime)
            })
        {
            match pair {
                Left(kept) => factors.push(kept.clone()),
                Right(_) => return None,
                Both(left, right) => match left.exponent.checked_sub(right.exponent)? {
                    0 => {}
                    exponent => factors.push(PrimePower::new(left.prime.clone(), exponent)),
                },
            }
        }
        Some(Self::from_parts(&self.value / &divisor.value, factors))
    }

    /// Sum with an ordinary integer. The result has to be factorized from scratch.
    pub fn add(&self, other: &BigUint) -> Self {
        if other.is_zero() {
            self.clone()
        } else {
            Self::new(&self.value + other)
        }
    }

    pub fn pow(&self, exponent: i64) -> Result<Self> {
        match exponent {
            ..0 => Err(Error::InvalidExponent(exponent)),
            0 => Ok(Self::one()),
            1 => Ok(self.clone()),
            _ => {
                if self.is_zero() || self.is_one() {
                    return Ok(self.clone());
                }
                let scale =
                    u32::try_from(exponent).map_err(|_| Error::InvalidExponent(exponent))?;
                let factors = self
                    .factors
                    .iter()
                    .map(|power| {
                        power
                            .exponent
                            .checked_mul(scale)
                            .map(|scaled| PrimePower::new(power.prime.clone(), scaled))
                            .ok_or(Error::InvalidExponent(exponent))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(FactoredInteger {
                    value: self.value.pow(scale),
                    factors: factors.into(),
                })
            }
        }
    }

    /// The `root`th root as an exact fraction. Negative roots give the reciprocal of the
    /// positive one. Fails unless every exponent is a multiple of `root`.
    pub fn root(&self, root: i32) -> Result<BigRational> {
        match root.cmp(&0) {
            Ordering::Equal => Err(self.invalid_root(root)),
            Ordering::Greater => Ok(BigRational::from_integer(BigInt::from(
                self.exact_root(root.unsigned_abs())
                    .ok_or_else(|| self.invalid_root(root))?,
            ))),
            Ordering::Less => {
                let inverse = self
                    .exact_root(root.unsigned_abs())
                    .filter(|inverse| !inverse.is_zero())
                    .ok_or_else(|| self.invalid_root(root))?;
                Ok(BigRational::new(BigInt::one(), BigInt::from(inverse)))
            }
        }
    }

    fn exact_root(&self, root: u32) -> Option<BigUint> {
        if self.is_zero() {
            return Some(BigUint::zero());
        }
        self.factors
            .iter()
            .map(|power| {
                power
                    .exponent
                    .is_multiple_of(root)
                    .then(|| power.prime.pow(power.exponent / root))
            })
            .product()
    }

    fn invalid_root(&self, root: i32) -> Error {
        Error::InvalidRoot {
            root,
            value: self.to_string(),
        }
    }

    /// All positive divisors in ascending order; empty for zero.
    pub fn divisors(&self) -> Vec<BigUint> {
        if self.is_zero() {
            return vec![];
        }
        let Some(PrimePower { prime, exponent }) = self.factors.last().filter(|_| !self.is_one())
        else {
            return vec![BigUint::one()];
        };
        let exponent = *exponent;
        let rest = self.drop_prime().divisors();
        let mut divisors = Vec::with_capacity(rest.len() * (exponent as usize + 1));
        divisors.extend(rest.iter().cloned());
        let mut power = BigUint::one();
        for _ in 0..exponent {
            power *= prime;
            divisors.extend(rest.iter().map(|divisor| divisor * &power));
        }
        divisors.sort_unstable();
        divisors
    }

    /// Sum of the divisors.
    pub fn sigma(&self) -> Self {
        self.sigma_k(1)
    }

    /// Sum of the `k`th powers of the divisors, built up one prime power at a time.
    pub fn sigma_k(&self, k: u32) -> Self {
        if self.is_zero() || self.is_one() {
            return self.clone();
        }
        self.factors.iter().fold(Self::one(), |sum, power| {
            let local = if k == 0 {
                Self::new(u64::from(power.exponent) + 1)
            } else {
                // (p^(k(e+1)) - 1) / (p^k - 1), which is always exact
                let prime_k = power.prime.pow(k);
                let numerator = prime_k.pow(power.exponent + 1) - 1u32;
                Self::new(numerator / (prime_k - 1u32))
            };
            sum.multiply(&local)
        })
    }

    /// 1 for 0 and 1, 0 if a prime is repeated, otherwise -1 to the number of primes.
    pub fn moebius(&self) -> i8 {
        if self.value <= BigUint::one() {
            return 1;
        }
        if self.factors.iter().any(|power| power.exponent > 1) {
            0
        } else if self.factors.len().is_multiple_of(2) {
            1
        } else {
            -1
        }
    }

    /// The square-free kernel: the smallest `m` such that `m * self` is a perfect square.
    pub fn core(&self) -> Self {
        let factors = self
            .factors
            .iter()
            .filter(|power| power.exponent % 2 != 0)
            .map(|power| PrimePower::new(power.prime.clone(), 1))
            .collect_vec();
        let value = factors.iter().map(PrimePower::value).product();
        Self::from_parts(value, factors)
    }

    pub fn is_square(&self) -> bool {
        self.factors
            .iter()
            .all(|power| power.exponent.is_multiple_of(2))
    }

    /// Number of prime factors counted with multiplicity.
    pub fn big_omega(&self) -> u64 {
        self.factors
            .iter()
            .map(|power| u64::from(power.exponent))
            .sum()
    }

    /// Number of distinct prime factors.
    pub fn omega(&self) -> usize {
        self.factors
            .iter()
            .filter(|power| power.exponent > 0)
            .count()
    }

    /// Removes the largest prime's whole power. 0 and 1 are returned unchanged.
    pub fn drop_prime(&self) -> Self {
        if self.value <= BigUint::one() {
            return self.clone();
        }
        let kept = self.factors[..self.factors.len() - 1].to_vec();
        let value = kept.iter().map(PrimePower::value).product();
        Self::from_parts(value, kept)
    }

    pub fn max_of<'a>(items: impl IntoIterator<Item = &'a Self>) -> Option<&'a Self> {
        items
            .into_iter()
            .reduce(|best, item| if item > best { item } else { best })
    }

    pub fn min_of<'a>(items: impl IntoIterator<Item = &'a Self>) -> Option<&'a Self> {
        items
            .into_iter()
            .reduce(|best, item| if item < best { item } else { best })
    }
}

impl PartialOrd for FactoredInteger {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FactoredInteger {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl From<u64> for FactoredInteger {
    #[inline(always)]
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<BigUint> for FactoredInteger {
    #[inline(always)]
    fn from(value: BigUint) -> Self {
        Self::new(value)
    }
}

impl FromStr for FactoredInteger {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BigUint::from_str(s.trim())
            .map(Self::new)
            .map_err(|_| Error::Parse(s.to_owned()))
    }
}

/// Deterministic below 2^64; above that a strong probable-prime test, which is all that trial
/// division needs to know it can stop.
fn is_probable_prime(number: &BigUint) -> bool {
    match number.to_u64() {
        Some(small) => is_prime64(small),
        None => is_prime(number, None) != No,
    }
}

impl Display for FactoredInteger {
    /// `value:prime^exp*prime^exp*...`, with 1 written as `1:1`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.value)?;
        if self.is_one() {
            f.write_str("1")
        } else {
            write!(f, "{}", self.factors.iter().join("*"))
        }
    }
}
