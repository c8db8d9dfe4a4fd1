//! Ratcliff/Obershelp "matching blocks" similarity.
//!
//! The ratio is `2 * M / T`, where `M` is the number of characters covered by
//! the recursively found longest common blocks and `T` is the combined length
//! of both strings. Comparison is per Unicode scalar value.

use std::collections::HashMap;

/// Second sequences at least this long ignore their most popular characters
/// when seeding matches.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Index of one string that other strings are compared against.
///
/// Building the index costs one pass over `b`, so keep the matcher around when
/// the same candidate is compared against many strings.
pub struct SequenceMatcher {
    b: Vec<char>,
    b2j: HashMap<char, Vec<usize>>,
    full_counts: HashMap<char, usize>,
}

impl SequenceMatcher {
    pub fn new(b: &str) -> Self {
        let b: Vec<char> = b.chars().collect();

        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }
        let full_counts = b2j.iter().map(|(c, idx)| (*c, idx.len())).collect();

        if b.len() >= AUTOJUNK_MIN_LEN {
            let popular = b.len() / 100 + 1;
            b2j.retain(|_, indices| indices.len() <= popular);
        }

        SequenceMatcher { b, b2j, full_counts }
    }

    /// Similarity in `[0, 1]` of `a` against the indexed string.
    pub fn ratio(&self, a: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        calculate_ratio(self.matching_characters(&a), a.len() + self.b.len())
    }

    /// `Some(ratio)` when `a` scores at least `cutoff`.
    ///
    /// Two upper bounds are checked first and only skip work, never change
    /// the outcome.
    pub fn ratio_at_least(&self, a: &str, cutoff: f64) -> Option<f64> {
        let a: Vec<char> = a.chars().collect();
        let total = a.len() + self.b.len();

        if calculate_ratio(a.len().min(self.b.len()), total) < cutoff {
            return None;
        }
        if calculate_ratio(self.shared_characters(&a), total) < cutoff {
            return None;
        }

        let ratio = calculate_ratio(self.matching_characters(&a), total);
        (ratio >= cutoff).then_some(ratio)
    }

    /// Size of the multiset intersection of `a` and `b`.
    fn shared_characters(&self, a: &[char]) -> usize {
        let mut available = self.full_counts.clone();
        let mut shared = 0;
        for c in a {
            if let Some(count) = available.get_mut(c) {
                if *count > 0 {
                    *count -= 1;
                    shared += 1;
                }
            }
        }
        shared
    }

    fn matching_characters(&self, a: &[char]) -> usize {
        let mut matched = 0;
        let mut queue = vec![(0, a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, size) = self.find_longest_match(a, alo, ahi, blo, bhi);
            if size == 0 {
                continue;
            }
            matched += size;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + size < ahi && j + size < bhi {
                queue.push((i + size, ahi, j + size, bhi));
            }
        }

        matched
    }

    /// Longest block of `a[alo..ahi]` equal to a block of `b[blo..bhi]`.
    /// Ties go to the earliest start in `a`, then the earliest start in `b`.
    fn find_longest_match(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_j2len = HashMap::new();
            if let Some(indices) = self.b2j.get(&a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = match j.checked_sub(1) {
                        Some(prev) => j2len.get(&prev).copied().unwrap_or(0) + 1,
                        None => 1,
                    };
                    next_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular characters were left out of the index; grow the block over
        // any that sit right next to it.
        while best_i > alo && best_j > blo && a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }
}

fn calculate_ratio(matches: usize, length: usize) -> f64 {
    if length == 0 {
        1.0
    } else {
        2.0 * matches as f64 / length as f64
    }
}

/// Similarity of `a` against `b`.
pub fn ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(b).ratio(a)
}

/// Index and score of the possibility closest to `word`, if any reaches
/// `cutoff`. Equal best scores resolve to the earliest possibility.
pub fn closest_match<'a, I>(word: &str, possibilities: I, cutoff: f64) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let matcher = SequenceMatcher::new(word);
    let mut best: Option<(usize, f64)> = None;

    for (index, possibility) in possibilities.into_iter().enumerate() {
        if let Some(score) = matcher.ratio_at_least(possibility, cutoff) {
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }
    }

    best
}
