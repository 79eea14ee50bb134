//! The D2 family of word-count statistics.
//!
//! Every statistic profiles each sequence of a pair at its own `k` and maps
//! the two profiles to a scalar. Words missing from a profile count as zero.

use crate::error::{Error, Result};
use crate::kmer::{Alphabet, WordProfile};
use crate::sequence::Sequence;
use fxhash::FxHasher;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    hash::BuildHasherDefault,
    io,
    path::Path,
    sync::Arc,
};

type FxMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Whether larger scores mean more alike or less alike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Similarity,
    Dissimilarity,
}

/// A sequence together with the word profile a statistic built for it
#[derive(Debug, Clone)]
pub struct Sample<'a> {
    pub sequence: &'a Sequence,
    pub profile: WordProfile,
}

/// Anything mapping two word profiles to a scalar
pub trait Statistic: Send + Sync {
    /// Word length the sequences are profiled at
    fn k(&self) -> usize;

    fn measure(&self) -> Measure;

    /// Reject inputs this statistic cannot score, before any work starts
    fn check(&self, _sequences: &[Sequence]) -> Result<()> {
        Ok(())
    }

    fn profile<'a>(&self, sequence: &'a Sequence) -> Sample<'a> {
        Sample {
            sequence,
            profile: WordProfile::from_seq(sequence.symbols(), self.k()),
        }
    }

    fn compare(&self, first: &Sample<'_>, second: &Sample<'_>) -> Result<f64>;

    fn score(&self, first: &Sequence, second: &Sequence) -> Result<f64> {
        self.compare(&self.profile(first), &self.profile(second))
    }
}

/// Raw D2: Σ over words of `count1 * count2`
#[derive(Debug, Clone)]
pub struct D2 {
    k: usize,
}

impl D2 {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl Statistic for D2 {
    fn k(&self) -> usize {
        self.k
    }

    fn measure(&self) -> Measure {
        Measure::Similarity
    }

    fn compare(&self, first: &Sample<'_>, second: &Sample<'_>) -> Result<f64> {
        Ok(first.profile.dot(&second.profile))
    }
}

/// D2 over single-substitution neighbourhoods, tolerating point mutations
#[derive(Debug, Clone)]
pub struct D2Neighbourhood {
    k: usize,
    alphabet: Alphabet,
}

impl D2Neighbourhood {
    pub fn new(k: usize, alphabet: Alphabet) -> Self {
        Self { k, alphabet }
    }

    pub fn dna(k: usize) -> Self {
        Self::new(k, Alphabet::dna())
    }

    pub fn rna(k: usize) -> Self {
        Self::new(k, Alphabet::rna())
    }
}

impl Statistic for D2Neighbourhood {
    fn k(&self) -> usize {
        self.k
    }

    fn measure(&self) -> Measure {
        Measure::Similarity
    }

    fn profile<'a>(&self, sequence: &'a Sequence) -> Sample<'a> {
        let observed = WordProfile::from_seq(sequence.symbols(), self.k);
        Sample {
            sequence,
            profile: observed.neighbourhood(&self.alphabet),
        }
    }

    fn compare(&self, first: &Sample<'_>, second: &Sample<'_>) -> Result<f64> {
        Ok(first.profile.dot(&second.profile))
    }
}

/// Expected word probabilities of one sequence under a background model
#[derive(Debug, Clone)]
pub enum WordProbabilities {
    /// Explicit per-word table
    Table(FxMap<Vec<u8>, f64>),
    /// Independent symbols drawn with the given frequencies
    Bernoulli(FxMap<u8, f64>),
}

impl WordProbabilities {
    /// Symbol frequencies of `symbols`, for an i.i.d. background
    pub fn composition(symbols: &[u8]) -> Self {
        let mut counts: FxMap<u8, f64> = FxMap::default();
        for &symbol in symbols {
            *counts.entry(symbol).or_insert(0.0) += 1.0;
        }

        let total = symbols.len() as f64;
        for freq in counts.values_mut() {
            *freq /= total;
        }
        WordProbabilities::Bernoulli(counts)
    }

    pub fn probability(&self, word: &[u8]) -> Option<f64> {
        match self {
            WordProbabilities::Table(table) => table.get(word).copied(),
            WordProbabilities::Bernoulli(freqs) => Some(
                word.iter()
                    .map(|symbol| freqs.get(symbol).copied().unwrap_or(0.0))
                    .product(),
            ),
        }
    }
}

/// Per-sequence background probabilities, keyed by sequence id
#[derive(Debug, Clone, Default)]
pub struct BackgroundModel {
    tables: HashMap<String, WordProbabilities>,
}

impl BackgroundModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, probabilities: WordProbabilities) {
        self.tables.insert(id.into(), probabilities);
    }

    pub fn get(&self, id: &str) -> Option<&WordProbabilities> {
        self.tables.get(id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// An i.i.d. model per sequence, from its own symbol composition
    pub fn bernoulli(sequences: &[Sequence]) -> Self {
        let mut model = Self::new();
        for sequence in sequences {
            model.insert(sequence.id(), WordProbabilities::composition(sequence.symbols()));
        }
        model
    }

    /// Read tables shaped as `{ "id": { "WORD": probability, ... }, ... }`
    pub fn from_json_reader<R: io::Read>(reader: R) -> Result<Self> {
        let raw: HashMap<String, HashMap<String, f64>> = serde_json::from_reader(reader)?;

        let tables = raw
            .into_iter()
            .map(|(id, words)| {
                let table = words
                    .into_iter()
                    .map(|(word, p)| (word.into_bytes(), p))
                    .collect();
                (id, WordProbabilities::Table(table))
            })
            .collect();

        Ok(Self { tables })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::from_json_reader(io::BufReader::new(file))
    }
}

/// D2 after subtracting each count's expectation under a background model.
///
/// Sums over shared words `x * y / sqrt(x² + y²)` with
/// `x = count1 - n * p1` and `y = count2 - m * p2`, where `n` and `m` are
/// the distinct-word counts of the two profiles.
#[derive(Debug, Clone)]
pub struct D2Normalised {
    k: usize,
    background: Arc<BackgroundModel>,
}

impl D2Normalised {
    pub fn new(k: usize, background: Arc<BackgroundModel>) -> Self {
        Self { k, background }
    }

    fn probabilities(&self, sequence: &Sequence) -> Result<&WordProbabilities> {
        self.background.get(sequence.id()).ok_or_else(|| Error::UnknownId {
            id: sequence.id().to_string(),
        })
    }
}

impl Statistic for D2Normalised {
    fn k(&self) -> usize {
        self.k
    }

    fn measure(&self) -> Measure {
        Measure::Similarity
    }

    fn check(&self, sequences: &[Sequence]) -> Result<()> {
        for sequence in sequences {
            self.probabilities(sequence)?;
        }
        Ok(())
    }

    fn compare(&self, first: &Sample<'_>, second: &Sample<'_>) -> Result<f64> {
        let probs1 = self.probabilities(first.sequence)?;
        let probs2 = self.probabilities(second.sequence)?;

        let n = first.profile.distinct() as f64;
        let m = second.profile.distinct() as f64;

        let expected = |probs: &WordProbabilities, sequence: &Sequence, word: &[u8]| {
            probs.probability(word).ok_or_else(|| Error::MissingProbability {
                id: sequence.id().to_string(),
                word: String::from_utf8_lossy(word).into_owned(),
            })
        };

        let mut score = 0.0;

        for (word, count1) in first.profile.iter() {
            let count2 = second.profile.get(word);
            if count2 == 0 {
                continue;
            }

            let normalised1 = count1 as f64 - n * expected(probs1, first.sequence, word)?;
            let normalised2 = count2 as f64 - m * expected(probs2, second.sequence, word)?;

            let norm = (normalised1.powi(2) + normalised2.powi(2)).sqrt();
            if norm == 0.0 {
                return Err(Error::ZeroNormalisation {
                    first: first.sequence.id().to_string(),
                    second: second.sequence.id().to_string(),
                    word: String::from_utf8_lossy(word).into_owned(),
                });
            }

            score += normalised1 * normalised2 / norm;
        }

        Ok(score)
    }
}

/// `|ln(dot(a, b) / sqrt(dot(a, a) * dot(b, b)))|` over any D2 dot product.
///
/// Zero for proportional profiles and growing as they diverge. Profiles with
/// no word in common give [`Error::NoSharedWords`]; any other ratio that is
/// not a finite positive number, such as an empty profile, gives
/// [`Error::UndefinedDissimilarity`].
pub struct LogD2 {
    inner: Box<dyn Statistic>,
}

impl LogD2 {
    pub fn new(inner: Box<dyn Statistic>) -> Self {
        Self { inner }
    }
}

impl Statistic for LogD2 {
    fn k(&self) -> usize {
        self.inner.k()
    }

    fn measure(&self) -> Measure {
        Measure::Dissimilarity
    }

    fn check(&self, sequences: &[Sequence]) -> Result<()> {
        self.inner.check(sequences)
    }

    fn profile<'a>(&self, sequence: &'a Sequence) -> Sample<'a> {
        self.inner.profile(sequence)
    }

    fn compare(&self, first: &Sample<'_>, second: &Sample<'_>) -> Result<f64> {
        let cross = self.inner.compare(first, second)?;
        let self1 = self.inner.compare(first, first)?;
        let self2 = self.inner.compare(second, second)?;

        if cross == 0.0 && self1 > 0.0 && self2 > 0.0 {
            return Err(Error::NoSharedWords {
                first: first.sequence.id().to_string(),
                second: second.sequence.id().to_string(),
                k: self.k(),
            });
        }

        let ratio = cross / (self1 * self2).sqrt();
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(Error::UndefinedDissimilarity {
                first: first.sequence.id().to_string(),
                second: second.sequence.id().to_string(),
            });
        }

        Ok(ratio.ln().abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn pair(a: &str, b: &str) -> (Sequence, Sequence) {
        (Sequence::new("first", a), Sequence::new("second", b))
    }

    /// Every symbol at frequency 0.1, keeping expectations well under one count
    fn sparse_background(sequences: &[Sequence]) -> BackgroundModel {
        let mut model = BackgroundModel::new();
        for sequence in sequences {
            let freqs = b"ACGT".iter().map(|&symbol| (symbol, 0.1)).collect();
            model.insert(sequence.id(), WordProbabilities::Bernoulli(freqs));
        }
        model
    }

    #[test]
    fn raw_d2_worked_examples() {
        let d2 = D2::new(2);

        let (a, b) = pair("AAAA", "AAAA");
        assert_eq!(d2.score(&a, &b).unwrap(), 9.0);

        let (a, b) = pair("AAAA", "TTTT");
        assert_eq!(d2.score(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn neighbourhood_d2_worked_example() {
        // AAA -> {AA:2}; TAA -> {TA:1, AA:1}, see kmer tests for the expansion
        let (a, b) = pair("AAA", "TAA");
        let score = D2Neighbourhood::dna(2).score(&a, &b).unwrap();
        assert_eq!(score, 16.0);
    }

    #[test]
    fn normalised_d2_worked_example() {
        let (a, b) = pair("AAAA", "AAAT");
        let mut model = BackgroundModel::new();
        model.insert("first", WordProbabilities::composition(a.symbols()));
        model.insert("second", WordProbabilities::composition(b.symbols()));

        // a = {AA:3}, n = 1, p(AA) = 1; b = {AA:2, AT:1}, m = 2, p(AA) = 0.5625
        let x: f64 = 3.0 - 1.0;
        let y: f64 = 2.0 - 2.0 * 0.5625;
        let expected = x * y / (x * x + y * y).sqrt();

        let score = D2Normalised::new(2, Arc::new(model)).score(&a, &b).unwrap();
        assert!((score - expected).abs() < TOLERANCE);
    }

    #[test]
    fn every_variant_is_symmetric() {
        let (a, b) = pair("ACGTTGCAACGTAGCTAGGT", "ACGTAGCAACGTTGCTAGCA");
        let background = Arc::new(BackgroundModel::bernoulli(&[a.clone(), b.clone()]));
        let sparse = Arc::new(sparse_background(&[a.clone(), b.clone()]));

        let statistics: Vec<Box<dyn Statistic>> = vec![
            Box::new(D2::new(3)),
            Box::new(D2Neighbourhood::dna(3)),
            Box::new(D2Normalised::new(3, background.clone())),
            Box::new(LogD2::new(Box::new(D2::new(3)))),
            Box::new(LogD2::new(Box::new(D2Neighbourhood::dna(3)))),
            Box::new(LogD2::new(Box::new(D2Normalised::new(3, sparse)))),
        ];

        for statistic in &statistics {
            let forward = statistic.score(&a, &b).unwrap();
            let backward = statistic.score(&b, &a).unwrap();
            assert!((forward - backward).abs() < TOLERANCE);
        }
    }

    #[test]
    fn log_d2_is_zero_for_proportional_profiles() {
        let (a, b) = pair("ACGTACGT", "ACGTACGT");
        let log = LogD2::new(Box::new(D2::new(2)));
        assert!(log.score(&a, &b).unwrap().abs() < TOLERANCE);
        assert_eq!(log.measure(), Measure::Dissimilarity);
    }

    #[test]
    fn log_d2_grows_with_divergence() {
        let log = LogD2::new(Box::new(D2::new(2)));
        let (a, close) = pair("ACGTACGTAC", "ACGTACGTTC");
        let far = Sequence::new("far", "ACCCCGTTTA");
        let near = log.score(&a, &close).unwrap();
        let distant = log.score(&a, &far).unwrap();
        assert!(near > 0.0);
        assert!(distant > near);
    }

    #[test]
    fn log_d2_on_short_sequence_is_undefined() {
        let (a, b) = pair("ACGTACGT", "AC");
        let log = LogD2::new(Box::new(D2::new(3)));
        assert!(matches!(
            log.score(&a, &b),
            Err(Error::UndefinedDissimilarity { .. })
        ));
    }

    #[test]
    fn log_d2_without_shared_words_names_k() {
        let (a, b) = pair("AAAA", "TTTT");
        let log = LogD2::new(Box::new(D2::new(2)));
        let err = log.score(&a, &b).unwrap_err();
        assert!(matches!(err, Error::NoSharedWords { k: 2, .. }));
        assert!(err.to_string().contains("k=2"));
    }

    #[test]
    fn normalised_d2_needs_every_background() {
        let (a, b) = pair("ACGT", "ACGA");
        let background = Arc::new(BackgroundModel::bernoulli(&[a.clone()]));
        let normalised = D2Normalised::new(2, background);

        assert!(normalised.check(&[a.clone()]).is_ok());
        assert!(matches!(
            normalised.check(&[a, b]),
            Err(Error::UnknownId { id }) if id == "second"
        ));
    }

    #[test]
    fn normalised_d2_reports_missing_words() {
        let (a, b) = pair("ACGT", "ACGA");
        let background =
            BackgroundModel::from_json_reader(&br#"{"first": {"AC": 0.1}, "second": {"CG": 0.1}}"#[..])
                .unwrap();
        let normalised = D2Normalised::new(2, Arc::new(background));

        assert!(matches!(
            normalised.score(&a, &b),
            Err(Error::MissingProbability { .. })
        ));
    }

    #[test]
    fn normalised_d2_rejects_zero_norm() {
        let (a, b) = pair("AC", "AC");
        let background = BackgroundModel::from_json_reader(
            &br#"{"first": {"AC": 1.0}, "second": {"AC": 1.0}}"#[..],
        )
        .unwrap();
        let normalised = D2Normalised::new(2, Arc::new(background));

        assert!(matches!(
            normalised.score(&a, &b),
            Err(Error::ZeroNormalisation { .. })
        ));
    }

    #[test]
    fn bernoulli_probabilities() {
        let probs = WordProbabilities::composition(b"AACG");
        assert_eq!(probs.probability(b"A"), Some(0.5));
        assert_eq!(probs.probability(b"AC"), Some(0.125));
        assert_eq!(probs.probability(b"T"), Some(0.0));
    }
}
