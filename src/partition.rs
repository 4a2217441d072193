use itertools::Itertools;
use log::debug;
use std::iter::FusedIterator;

/// Whether the order of parts matters.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Mode {
    /// Parts are non-decreasing, so each multiset of parts appears once.
    Partition,
    /// Every arrangement counts. Only the first part is bounded below by the minimum; the parts
    /// after it only need to be at least 1.
    Composition,
}

/// One level of the nested state: the part chosen at this position, and what is left of the sum
/// including that part.
///
/// Wider than the parts themselves so an exhausted leaf of `u32::MAX` can still step past its
/// `remaining`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Frame {
    remaining: u64,
    part: u64,
}

/// Lazily enumerates the partitions or compositions of `n` whose parts lie in
/// `[min_part, max_part]`.
///
/// Tuples come out in lexicographic order of their parts, so the partitions of 5 start with
/// `[1, 1, 1, 1, 1]` and end with `[5]`. The generator runs forward exactly once.
///
/// `frames[i + 1]` is the continuation of `frames[i]`: it enumerates the parts after the one
/// fixed at depth `i`. A frame without a successor is a leaf.
#[derive(Clone, Debug)]
pub struct Partitions {
    frames: Vec<Frame>,
    max_part: u64,
    mode: Mode,
}

impl Frame {
    /// The part as handed out; only called on frames whose part is within `max_part`.
    #[inline(always)]
    fn emitted_part(&self) -> u32 {
        self.part as u32
    }
}

impl Partitions {
    /// All partitions or compositions of `n` with parts in `[1, n]`.
    pub fn new(n: u32, mode: Mode) -> Self {
        Self::with_bounds(n, 1, n, mode)
    }

    pub fn with_bounds(n: u32, min_part: u32, max_part: u32, mode: Mode) -> Self {
        if min_part == 0 {
            debug!("Partitions of {n} with a zero lower bound; nothing to enumerate");
            return Partitions {
                frames: vec![Frame {
                    remaining: 0,
                    part: 1,
                }],
                max_part: max_part.into(),
                mode,
            };
        }
        let mut partitions = Partitions {
            frames: vec![Frame {
                remaining: n.into(),
                part: min_part.into(),
            }],
            max_part: max_part.into(),
            mode,
        };
        partitions.build_continuation();
        partitions
    }

    #[inline(always)]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline(always)]
    fn continuation_min(&self, part: u64) -> u64 {
        match self.mode {
            Mode::Partition => part,
            Mode::Composition => 1,
        }
    }

    /// Pushes continuation frames below the current deepest one for as long as its part leaves
    /// something over to continue with.
    fn build_continuation(&mut self) {
        while let Some(&Frame { remaining, part }) = self.frames.last()
            && part < remaining
            && part <= self.max_part
        {
            let next_min = self.continuation_min(part);
            self.frames.push(Frame {
                remaining: remaining - part,
                part: next_min,
            });
        }
    }

    /// Cheap check on the outermost level only. A `true` can still be followed by an exhausted
    /// [`next_partition`](Self::next_partition) when the bounds admit no completion; a `false`
    /// is final.
    pub fn has_next(&self) -> bool {
        let Frame { remaining, part } = self.frames[0];
        !(remaining == 0 || part > remaining || part > self.max_part)
    }

    /// Emits the next tuple, or `None` once the sequence is exhausted.
    pub fn next_partition(&mut self) -> Option<Vec<u32>> {
        let mut depth = 0;
        loop {
            let Frame { remaining, part } = self.frames[depth];
            if part == remaining && part <= self.max_part {
                // Leaf: this part completes the sum, and this level has nothing further
                let parts = self.frames[..=depth]
                    .iter()
                    .map(Frame::emitted_part)
                    .collect_vec();
                self.frames[depth].part += 1;
                self.frames.truncate(depth + 1);
                return Some(parts);
            }
            if depth + 1 < self.frames.len() {
                depth += 1;
                continue;
            }
            // The level at `depth` is exhausted; move up to the nearest ancestor that can
            // still take a larger part, and rebuild everything beneath it
            loop {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                let Frame { remaining, part } = self.frames[depth];
                if part < remaining && part < self.max_part {
                    self.frames[depth].part += 1;
                    self.frames.truncate(depth + 1);
                    self.build_continuation();
                    break;
                }
            }
        }
    }

    /// The tuple in progress, without advancing. `None` if the current branch can't be
    /// completed.
    pub fn current(&self) -> Option<Vec<u32>> {
        let mut parts = Vec::with_capacity(self.frames.len());
        for (depth, &Frame { remaining, part }) in self.frames.iter().enumerate() {
            if part > self.max_part {
                return None;
            }
            parts.push(self.frames[depth].emitted_part());
            if part == remaining {
                return Some(parts);
            }
            if depth + 1 == self.frames.len() {
                return None;
            }
        }
        None
    }
}

impl Iterator for Partitions {
    type Item = Vec<u32>;

    #[inline]
    fn next(&mut self) -> Option<Vec<u32>> {
        self.next_partition()
    }
}

impl FusedIterator for Partitions {}

/// Largest part, or 0 for no parts.
pub fn largest_part(parts: &[u32]) -> u32 {
    parts.iter().copied().max().unwrap_or(0)
}

/// How often `part` occurs.
pub fn frequency(parts: &[u32], part: u32) -> usize {
    parts.iter().filter(|p| **p == part).count()
}

/// How many parts are at least `min`.
pub fn frequency_at_least(parts: &[u32], min: u32) -> usize {
    parts.iter().filter(|p| **p >= min).count()
}

/// The conjugate partition, from transposing the Ferrers diagram. Its parts come out
/// non-decreasing, the same order [`Partitions`] uses.
pub fn conjugate(parts: &[u32]) -> Vec<u32> {
    (1..=largest_part(parts))
        .rev()
        .map(|min| frequency_at_least(parts, min) as u32)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::partition::{
        Mode, Partitions, conjugate, frequency, frequency_at_least, largest_part,
    };
    use itertools::Itertools;

    /// p(n), the number of unrestricted partitions.
    const PARTITION_COUNTS: [usize; 13] = [1, 1, 2, 3, 5, 7, 11, 15, 22, 30, 42, 56, 77];

    fn brute_force(n: u32, min: u32, max: u32, mode: Mode) -> Vec<Vec<u32>> {
        fn extend(
            prefix: &mut Vec<u32>,
            left: u32,
            min: u32,
            max: u32,
            mode: Mode,
            out: &mut Vec<Vec<u32>>,
        ) {
            if left == 0 {
                out.push(prefix.clone());
                return;
            }
            let low = match (mode, prefix.last()) {
                (_, None) => min,
                (Mode::Partition, Some(&last)) => last,
                (Mode::Composition, Some(_)) => 1,
            };
            for part in low..=left.min(max) {
                prefix.push(part);
                extend(prefix, left - part, min, max, mode, out);
                prefix.pop();
            }
        }
        let mut out = Vec::new();
        if n > 0 {
            extend(&mut Vec::new(), n, min, max, mode, &mut out);
        }
        out
    }

    #[test]
    fn test_partitions_of_five() {
        let all = Partitions::new(5, Mode::Partition).collect_vec();
        assert_eq!(
            all,
            vec![
                vec![1, 1, 1, 1, 1],
                vec![1, 1, 1, 2],
                vec![1, 1, 3],
                vec![1, 2, 2],
                vec![1, 4],
                vec![2, 3],
                vec![5],
            ]
        );
    }

    #[test]
    fn test_compositions_of_five() {
        let all = Partitions::new(5, Mode::Composition).collect_vec();
        assert_eq!(all.len(), 16);
        assert!(all.iter().all_unique());
        assert!(all.iter().all(|parts| parts.iter().sum::<u32>() == 5));
        assert_eq!(all.first(), Some(&vec![1, 1, 1, 1, 1]));
        assert_eq!(all.last(), Some(&vec![5]));
        assert!(all.contains(&vec![3, 1, 1]));
        assert!(all.contains(&vec![1, 3, 1]));
    }

    #[test]
    fn test_partition_counts() {
        for (n, count) in PARTITION_COUNTS.iter().enumerate().skip(1) {
            assert_eq!(Partitions::new(n as u32, Mode::Partition).count(), *count, "p({n})");
        }
    }

    #[test]
    fn test_composition_counts() {
        for n in 1..=12u32 {
            assert_eq!(
                Partitions::new(n, Mode::Composition).count(),
                1 << (n - 1),
                "compositions of {n}"
            );
        }
    }

    #[test]
    fn test_matches_brute_force() {
        for mode in [Mode::Partition, Mode::Composition] {
            for n in 1..=10 {
                for min in 1..=n + 1 {
                    for max in 1..=n + 1 {
                        let generated = Partitions::with_bounds(n, min, max, mode).collect_vec();
                        assert_eq!(
                            generated,
                            brute_force(n, min, max, mode),
                            "n={n} min={min} max={max} {mode:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_bounded_parts() {
        let all = Partitions::with_bounds(8, 2, 3, Mode::Partition).collect_vec();
        assert_eq!(all, vec![vec![2, 2, 2, 2], vec![2, 3, 3]]);
    }

    #[test]
    fn test_degenerate_bounds() {
        assert!(!Partitions::new(0, Mode::Partition).has_next());
        assert_eq!(Partitions::new(0, Mode::Partition).next(), None);
        let mut inverted = Partitions::with_bounds(5, 4, 3, Mode::Partition);
        assert!(!inverted.has_next());
        assert_eq!(inverted.next(), None);
        let mut zero_min = Partitions::with_bounds(5, 0, 5, Mode::Composition);
        assert!(!zero_min.has_next());
        assert_eq!(zero_min.next(), None);
        let mut too_big = Partitions::with_bounds(5, 6, 9, Mode::Partition);
        assert!(!too_big.has_next());
        assert_eq!(too_big.next(), None);
    }

    #[test]
    fn test_single_part() {
        let mut only = Partitions::with_bounds(5, 5, 5, Mode::Partition);
        assert!(only.has_next());
        assert_eq!(only.next(), Some(vec![5]));
        assert!(!only.has_next());
        assert_eq!(only.next(), None);
    }

    #[test]
    fn test_largest_sum() {
        let mut only = Partitions::with_bounds(u32::MAX, u32::MAX, u32::MAX, Mode::Partition);
        assert_eq!(only.next(), Some(vec![u32::MAX]));
        assert!(!only.has_next());
        assert_eq!(only.next(), None);
        assert_eq!(only.current(), None);
        let near = Partitions::with_bounds(u32::MAX, u32::MAX - 1, u32::MAX, Mode::Composition);
        assert_eq!(
            near.collect_vec(),
            vec![vec![u32::MAX - 1, 1], vec![u32::MAX]]
        );
    }

    #[test]
    fn test_has_next_is_optimistic() {
        // 2 + 2 + ... never reaches 5, but the outer level can't tell
        let mut none_fit = Partitions::with_bounds(5, 2, 2, Mode::Partition);
        assert!(none_fit.has_next());
        assert_eq!(none_fit.next(), None);
    }

    #[test]
    fn test_fused() {
        let mut partitions = Partitions::new(4, Mode::Partition);
        assert_eq!(partitions.by_ref().count(), 5);
        assert_eq!(partitions.next(), None);
        assert_eq!(partitions.next(), None);
        assert!(!partitions.has_next());
    }

    #[test]
    fn test_current_peeks() {
        let mut partitions = Partitions::new(4, Mode::Partition);
        assert_eq!(partitions.current(), Some(vec![1, 1, 1, 1]));
        assert_eq!(partitions.current(), Some(vec![1, 1, 1, 1]));
        assert_eq!(partitions.next(), Some(vec![1, 1, 1, 1]));
        assert_eq!(partitions.next(), Some(vec![1, 1, 2]));
        assert_eq!(partitions.next(), Some(vec![1, 3]));
        assert_eq!(partitions.next(), Some(vec![2, 2]));
        assert_eq!(partitions.next(), Some(vec![4]));
        assert_eq!(partitions.current(), None);
    }

    #[test]
    fn test_part_statistics() {
        let parts = [1, 1, 2, 4];
        assert_eq!(largest_part(&parts), 4);
        assert_eq!(largest_part(&[]), 0);
        assert_eq!(frequency(&parts, 1), 2);
        assert_eq!(frequency(&parts, 3), 0);
        assert_eq!(frequency_at_least(&parts, 2), 2);
    }

    #[test]
    fn test_conjugate() {
        assert_eq!(conjugate(&[1, 1, 2, 4]), vec![1, 1, 2, 4]);
        assert_eq!(conjugate(&[1, 1, 3]), vec![1, 1, 3]);
        assert_eq!(conjugate(&[5]), vec![1, 1, 1, 1, 1]);
        assert_eq!(conjugate(&[1, 2, 2]), vec![2, 3]);
        assert!(conjugate(&[]).is_empty());
        for parts in Partitions::new(9, Mode::Partition) {
            assert_eq!(conjugate(&conjugate(&parts)), parts);
            assert_eq!(conjugate(&parts).iter().sum::<u32>(), 9);
        }
    }

    macro_rules! bounded_count_tests {
        ($($name:ident: $n:expr, $min:expr, $max:expr, $mode:ident => $count:expr;)*) => {
            paste::paste! {
                $(
                    #[test]
                    fn [<test_count_ $name>]() {
                        assert_eq!(
                            Partitions::with_bounds($n, $min, $max, Mode::$mode).count(),
                            $count
                        );
                    }
                )*
            }
        };
    }

    bounded_count_tests! {
        partitions_10_distinct_small: 10, 1, 3, Partition => 14;
        partitions_10_at_least_2: 10, 2, 10, Partition => 12;
        partitions_20: 20, 1, 20, Partition => 627;
        compositions_6_max_2: 6, 1, 2, Composition => 13;
        compositions_10: 10, 1, 10, Composition => 512;
    }
}
