use crate::error::{Error, Result};
use fxhash::FxHasher;
use std::{collections::HashMap, hash::BuildHasherDefault, slice::Windows};

/// A `HashMap` w/ `FxHasher`, keyed by owned words.
///
/// `FxHasher` carries no random state, so two profiles built from the same
/// words iterate in the same order.
type FxMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

pub const DNA: &[u8] = b"ACTG";
pub const RNA: &[u8] = b"ACUG";

/// The closed set of symbols used to generate single-substitution neighbours
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet(Vec<u8>);

impl Alphabet {
    /// Build an alphabet, rejecting empty sets and repeated symbols
    pub fn new(symbols: &[u8]) -> Result<Self> {
        if symbols.is_empty() {
            return Err(Error::invalid_config("alphabet needs at least one symbol"));
        }

        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(Error::invalid_config(format!(
                    "alphabet repeats symbol {}",
                    *symbol as char
                )));
            }
        }

        Ok(Self(symbols.to_vec()))
    }

    pub fn dna() -> Self {
        Self(DNA.to_vec())
    }

    pub fn rna() -> Self {
        Self(RNA.to_vec())
    }

    pub fn symbols(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::dna()
    }
}

/// Overlapping windows of length `k` over a symbol sequence, left to right.
///
/// A sequence of length `L` yields exactly `L - k + 1` words, or none when
/// `L < k`. Each word borrows from the sequence, and the iterator can be
/// cloned to walk the words again.
#[derive(Debug, Clone)]
pub struct Words<'a> {
    windows: Option<Windows<'a, u8>>,
}

impl<'a> Words<'a> {
    pub fn new(seq: &'a [u8], k: usize) -> Self {
        // `slice::windows` panics on a zero width
        let windows = (k > 0).then(|| seq.windows(k));
        Self { windows }
    }
}

impl<'a> Iterator for Words<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.windows.as_mut()?.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.windows {
            Some(windows) => windows.size_hint(),
            None => (0, Some(0)),
        }
    }
}

impl ExactSizeIterator for Words<'_> {}

/// Every word reachable from `word` by substituting exactly one position with
/// another symbol of `alphabet`.
///
/// Same-letter substitutions are excluded, so a word over the alphabet has
/// `k * (A - 1)` neighbours and never reproduces itself.
pub fn neighbours<'a>(word: &'a [u8], alphabet: &'a Alphabet) -> impl Iterator<Item = Vec<u8>> + 'a {
    (0..word.len()).flat_map(move |i| {
        alphabet
            .symbols()
            .iter()
            .filter(move |&&symbol| symbol != word[i])
            .map(move |&symbol| {
                let mut neighbour = word.to_vec();
                neighbour[i] = symbol;
                neighbour
            })
    })
}

/// Occurrence counts of the words of a sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordProfile {
    counts: FxMap<Vec<u8>, u64>,
}

impl WordProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the overlapping `k`-length words of `seq`
    pub fn from_seq(seq: &[u8], k: usize) -> Self {
        Words::new(seq, k).collect()
    }

    pub fn add(&mut self, word: &[u8]) {
        self.add_count(word, 1)
    }

    pub fn add_count(&mut self, word: &[u8], count: u64) {
        // Only allocate a key for words not seen yet
        if let Some(freq) = self.counts.get_mut(word) {
            *freq += count;
        } else {
            self.counts.insert(word.to_vec(), count);
        }
    }

    /// Count of `word`, zero when it was never observed
    pub fn get(&self, word: &[u8]) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Number of distinct words
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Number of word occurrences
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u64)> {
        self.counts.iter().map(|(word, &count)| (word.as_slice(), count))
    }

    /// Σ over the words of `self` of `count * other.count`
    pub fn dot(&self, other: &WordProfile) -> f64 {
        self.iter()
            .map(|(word, count)| count as f64 * other.get(word) as f64)
            .sum()
    }

    /// Σ of squared counts
    pub fn self_dot(&self) -> f64 {
        self.counts.values().map(|&count| (count as f64).powi(2)).sum()
    }

    /// Replace every observed word by its single-substitution neighbours,
    /// each neighbour inheriting the count of the word it came from
    pub fn neighbourhood(&self, alphabet: &Alphabet) -> WordProfile {
        let mut expanded = WordProfile::new();

        for (word, count) in self.iter() {
            for neighbour in neighbours(word, alphabet) {
                expanded.add_count(&neighbour, count);
            }
        }
        expanded
    }
}

impl<'a> FromIterator<&'a [u8]> for WordProfile {
    fn from_iter<I: IntoIterator<Item = &'a [u8]>>(iter: I) -> Self {
        let mut profile = WordProfile::new();

        for word in iter {
            profile.add(word);
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_count_and_length() {
        let seq = b"GATTACAGATTACA";
        for k in 1..=seq.len() {
            let words: Vec<&[u8]> = Words::new(seq, k).collect();
            assert_eq!(words.len(), seq.len() - k + 1);
            assert!(words.iter().all(|w| w.len() == k));
        }
    }

    #[test]
    fn last_symbols_rebuild_the_tail() {
        let seq = b"ACGTTGCAAC";
        let k = 4;
        let tail: Vec<u8> = Words::new(seq, k).map(|w| w[k - 1]).collect();
        assert_eq!(tail.as_slice(), &seq[k - 1..]);
    }

    #[test]
    fn short_sequence_has_no_words() {
        assert_eq!(Words::new(b"ACG", 4).count(), 0);
        assert_eq!(Words::new(b"", 1).count(), 0);
        assert_eq!(Words::new(b"ACG", 0).count(), 0);
    }

    #[test]
    fn words_are_restartable() {
        let words = Words::new(b"ACGTA", 2);
        assert_eq!(words.len(), 4);
        let first: Vec<&[u8]> = words.clone().collect();
        let second: Vec<&[u8]> = words.collect();
        assert_eq!(first, second);
        assert_eq!(first[0], b"AC");
        assert_eq!(first[3], b"TA");
    }

    #[test]
    fn profile_counts_overlaps() {
        let profile = WordProfile::from_seq(b"AAAA", 2);
        assert_eq!(profile.get(b"AA"), 3);
        assert_eq!(profile.distinct(), 1);
        assert_eq!(profile.total(), 3);
        assert_eq!(profile.get(b"TT"), 0);
    }

    #[test]
    fn profile_ignores_insertion_order() {
        let forward: WordProfile = [&b"AC"[..], &b"GT"[..], &b"AC"[..]].into_iter().collect();
        let backward: WordProfile = [&b"AC"[..], &b"AC"[..], &b"GT"[..]].into_iter().collect();
        assert_eq!(forward, backward);
        assert_eq!(forward.get(b"AC"), 2);
    }

    #[test]
    fn dot_products() {
        let a = WordProfile::from_seq(b"AAAT", 2);
        let b = WordProfile::from_seq(b"AATT", 2);
        // a = {AA:2, AT:1}, b = {AA:1, AT:1, TT:1}
        assert_eq!(a.dot(&b), 3.0);
        assert_eq!(b.dot(&a), 3.0);
        assert_eq!(a.self_dot(), 5.0);
    }

    #[test]
    fn neighbour_count_excludes_self() {
        let alphabet = Alphabet::dna();
        let all: Vec<Vec<u8>> = neighbours(b"AC", &alphabet).collect();
        assert_eq!(all.len(), 2 * (4 - 1));
        assert!(!all.contains(&b"AC".to_vec()));

        let joined = all
            .iter()
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        insta::assert_snapshot!(joined, @"CC TC GC AA AT AG");
    }

    #[test]
    fn neighbourhood_carries_counts() {
        let profile = WordProfile::from_seq(b"AAA", 2);
        let expanded = profile.neighbourhood(&Alphabet::dna());
        assert_eq!(expanded.distinct(), 6);
        assert_eq!(expanded.get(b"CA"), 2);
        assert_eq!(expanded.get(b"AA"), 0);
        assert_eq!(expanded.total(), 12);
    }

    #[test]
    fn rna_neighbours_use_uracil() {
        let alphabet = Alphabet::rna();
        let all: Vec<Vec<u8>> = neighbours(b"A", &alphabet).collect();
        assert_eq!(all, vec![b"C".to_vec(), b"U".to_vec(), b"G".to_vec()]);
    }

    #[test]
    fn alphabet_validation() {
        assert!(Alphabet::new(b"").is_err());
        assert!(Alphabet::new(b"ACCA").is_err());
        assert_eq!(Alphabet::new(b"ACTG").unwrap(), Alphabet::dna());
    }
}
